//! Centralized application directory paths for metasearch.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | Data | `~/Library/Application Support/metasearch/` | `~/.local/share/metasearch/` |
//! | Config | `~/Library/Application Support/metasearch/` | `~/.config/metasearch/` |
//!
//! # Environment Overrides
//!
//! - `METASEARCH_DATA_DIR` overrides [`data_dir`]
//! - `METASEARCH_CONFIG_DIR` overrides [`config_dir`]

use std::ffi::OsString;
use std::path::PathBuf;

const APP_DIR: &str = "metasearch";

fn resolve(override_dir: Option<OsString>, base: Option<PathBuf>, fallback: &str) -> PathBuf {
    if let Some(dir) = override_dir.filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    base.map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(fallback))
}

/// Application data root directory (preferences).
///
/// Resolves to `dirs::data_dir()/metasearch/` by default.
#[must_use]
pub fn data_dir() -> PathBuf {
    resolve(
        std::env::var_os("METASEARCH_DATA_DIR"),
        dirs::data_dir(),
        "/tmp/metasearch-data",
    )
}

/// Application config directory.
///
/// Resolves to `dirs::config_dir()/metasearch/` by default.
#[must_use]
pub fn config_dir() -> PathBuf {
    resolve(
        std::env::var_os("METASEARCH_CONFIG_DIR"),
        dirs::config_dir(),
        "/tmp/metasearch-config",
    )
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Preferences file path (`data_dir()/preferences.json`).
#[must_use]
pub fn preferences_file() -> PathBuf {
    data_dir().join("preferences.json")
}
