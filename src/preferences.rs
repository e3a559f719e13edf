//! User preferences: theme, hidden providers, sort mode and provider options.
//!
//! Stored as JSON. Loading never fails: missing or corrupt data falls back
//! to defaults. Saving writes only when something changed, and a failed
//! write is logged rather than propagated.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use metasearch_core::{ProviderOptions, SortMode};
use serde::{Deserialize, Serialize};

use crate::error::MetasearchError;

/// Persisted user preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Preferences {
    /// Dark theme enabled.
    pub dark: bool,
    /// Provider ids hidden from result views, kept sorted.
    pub hidden_engines: Vec<String>,
    /// Sort policy for result views.
    pub sort_mode: SortMode,
    /// Options sent to each provider, keyed by provider id.
    pub provider_options: BTreeMap<String, ProviderOptions>,
}

impl Preferences {
    /// Whether `engine_id` is hidden.
    pub fn is_hidden(&self, engine_id: &str) -> bool {
        self.hidden_engines.iter().any(|e| e == engine_id)
    }

    /// Hide `engine_id`, or show it again if already hidden.
    ///
    /// Returns `true` if the engine is now hidden.
    pub fn toggle_hidden_engine(&mut self, engine_id: &str) -> bool {
        let was_hidden = self.is_hidden(engine_id);
        if was_hidden {
            self.hidden_engines.retain(|e| e != engine_id);
        } else {
            self.hidden_engines.push(engine_id.to_owned());
        }
        // Files written by hand may be unsorted or hold duplicates.
        self.hidden_engines.sort_unstable();
        self.hidden_engines.dedup();
        !was_hidden
    }

    /// Set the sort policy.
    pub fn set_sort_mode(&mut self, mode: SortMode) {
        self.sort_mode = mode;
    }

    /// Flip the theme. Returns the new value.
    pub fn toggle_dark(&mut self) -> bool {
        self.dark = !self.dark;
        self.dark
    }

    /// Flip a boolean option for `engine_id`. Returns the new value.
    pub fn toggle_option(&mut self, engine_id: &str, flag: &str) -> bool {
        self.provider_options
            .entry(engine_id.to_owned())
            .or_default()
            .toggle_flag(flag)
    }

    /// Options for `engine_id`, empty if none were set.
    pub fn options_for(&self, engine_id: &str) -> ProviderOptions {
        self.provider_options
            .get(engine_id)
            .cloned()
            .unwrap_or_default()
    }
}

/// File-backed preference storage.
#[derive(Debug)]
pub struct PreferenceStore {
    path: PathBuf,
    saved: Option<Preferences>,
}

impl PreferenceStore {
    /// A store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            saved: None,
        }
    }

    /// A store at the default location (`<data_dir>/metasearch/preferences.json`).
    pub fn at_default_path() -> Self {
        Self::new(crate::metasearch_dirs::preferences_file())
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load preferences, degrading to defaults on missing or corrupt data.
    pub fn load(&mut self) -> Preferences {
        let prefs = match read_preferences(&self.path) {
            Ok(Some(prefs)) => prefs,
            Ok(None) => Preferences::default(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "using default preferences");
                Preferences::default()
            }
        };
        self.saved = Some(prefs.clone());
        prefs
    }

    /// Persist `prefs` if they differ from what was last loaded or saved.
    ///
    /// Returns `true` if the file was written.
    pub fn save(&mut self, prefs: &Preferences) -> bool {
        if self.saved.as_ref() == Some(prefs) {
            return false;
        }
        match write_preferences(&self.path, prefs) {
            Ok(()) => {
                self.saved = Some(prefs.clone());
                tracing::debug!(path = %self.path.display(), "preferences saved");
                true
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to save preferences");
                false
            }
        }
    }
}

fn read_preferences(path: &Path) -> Result<Option<Preferences>, MetasearchError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(MetasearchError::Persistence(e.to_string())),
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| MetasearchError::Persistence(format!("corrupt preferences: {e}")))
}

fn write_preferences(path: &Path, prefs: &Preferences) -> Result<(), MetasearchError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| MetasearchError::Persistence(e.to_string()))?;
    }
    let json = serde_json::to_string_pretty(prefs)
        .map_err(|e| MetasearchError::Persistence(e.to_string()))?;
    std::fs::write(path, json).map_err(|e| MetasearchError::Persistence(e.to_string()))
}
