//! Configuration for the metasearch server and command-line front end.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use metasearch_core::providers::{GitHubProvider, JiraProvider};
use metasearch_core::{CoordinatorConfig, ProviderRegistry, SearchProvider};
use serde::{Deserialize, Serialize};

use crate::error::{MetasearchError, Result};
use crate::render::DateZone;

/// Top-level configuration, read from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetasearchConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Coordinator and cache settings.
    pub search: SearchSettings,
    /// Provider credentials. Only configured providers are registered.
    pub providers: ProvidersConfig,
    /// Terminal display settings.
    pub display: DisplayConfig,
}

/// Terminal display settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// UTC offset for result dates, e.g. `"-05:00"`. Unset uses local time.
    pub utc_offset: Option<String>,
}

impl DisplayConfig {
    /// The configured date zone.
    ///
    /// # Errors
    ///
    /// Returns [`MetasearchError::Config`] if `utc_offset` is not an offset
    /// like `+02:00`.
    pub fn date_zone(&self) -> Result<DateZone> {
        match self.utc_offset.as_deref() {
            None => Ok(DateZone::Local),
            Some(offset) => DateZone::parse(offset).ok_or_else(|| {
                MetasearchError::Config(format!("display.utc_offset: invalid offset {offset:?}"))
            }),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port (`0` auto-assigns; rejected by [`MetasearchConfig::validate`]).
    pub port: u16,
    /// Optional footer HTML handed to front ends.
    pub footer: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 3000,
            footer: None,
        }
    }
}

/// Coordinator and cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Per-provider lookup timeout in milliseconds.
    pub provider_timeout_ms: u64,
    /// Maximum cached lookups. Unset keeps every lookup for the process lifetime.
    pub cache_capacity: Option<u64>,
    /// Custom User-Agent for provider requests.
    pub user_agent: Option<String>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        let core = CoordinatorConfig::default();
        Self {
            provider_timeout_ms: core.provider_timeout_ms,
            cache_capacity: core.cache_capacity,
            user_agent: core.user_agent,
        }
    }
}

impl SearchSettings {
    /// The equivalent core coordinator configuration.
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            provider_timeout_ms: self.provider_timeout_ms,
            cache_capacity: self.cache_capacity,
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Provider credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Jira site credentials.
    pub jira: Option<JiraConfig>,
    /// GitHub credentials.
    pub github: Option<GitHubConfig>,
}

/// `[providers.jira]`
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JiraConfig {
    /// Site origin, e.g. `https://jira.example.com`.
    pub origin: String,
    /// Account user name.
    pub user: String,
    /// API token.
    pub token: String,
}

impl fmt::Debug for JiraConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JiraConfig")
            .field("origin", &self.origin)
            .field("user", &self.user)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// `[providers.github]`
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// Personal access token.
    pub token: String,
    /// API root for GitHub Enterprise. Defaults to `https://api.github.com`.
    pub api_base: Option<String>,
}

impl fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("token", &"<redacted>")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl MetasearchConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MetasearchError::Config`] for a zero port, a zero provider
    /// timeout or a zero cache capacity.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(MetasearchError::Config("server.port must be > 0".into()));
        }
        self.display.date_zone()?;
        self.search
            .coordinator_config()
            .validate()
            .map_err(|e| MetasearchError::Config(format!("search: {e}")))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| MetasearchError::Config(e.to_string()))
    }

    /// Load `path` if it exists, defaults otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| MetasearchError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `<config_dir>/metasearch/config.toml`.
    pub fn default_config_path() -> PathBuf {
        crate::metasearch_dirs::config_file()
    }

    /// Build and initialize a registry of every configured provider.
    ///
    /// # Errors
    ///
    /// Returns [`MetasearchError::Config`] if a provider rejects its credentials.
    pub fn build_registry(&self) -> Result<ProviderRegistry> {
        let http = self.search.coordinator_config();
        let mut builder = ProviderRegistry::builder();

        if let Some(jira) = &self.providers.jira {
            let provider = JiraProvider::new(&http);
            provider
                .init(&serde_json::json!({
                    "origin": jira.origin,
                    "user": jira.user,
                    "token": jira.token,
                }))
                .map_err(|e| MetasearchError::Config(format!("providers.jira: {e}")))?;
            builder = builder.register(Arc::new(provider))?;
        }

        if let Some(github) = &self.providers.github {
            let provider = GitHubProvider::new(&http);
            provider
                .init(&serde_json::json!({
                    "token": github.token,
                    "apiBase": github.api_base,
                }))
                .map_err(|e| MetasearchError::Config(format!("providers.github: {e}")))?;
            builder = builder.register(Arc::new(provider))?;
        }

        let registry = builder.build();
        if registry.is_empty() {
            tracing::warn!("no providers configured; searches will return nothing");
        } else {
            tracing::info!(providers = registry.len(), "providers registered");
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = MetasearchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.search.provider_timeout_ms, 10_000);
        assert!(config.search.cache_capacity.is_none());
    }

    #[test]
    fn validate_rejects_zero_port() {
        let mut config = MetasearchConfig::default();
        config.server.port = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("port"));
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut config = MetasearchConfig::default();
        config.search.provider_timeout_ms = 0;
        assert!(config.validate().unwrap_err().to_string().contains("timeout"));
    }

    #[test]
    fn validate_rejects_zero_capacity() {
        let mut config = MetasearchConfig::default();
        config.search.cache_capacity = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn display_offset_is_parsed_and_validated() {
        let mut config: MetasearchConfig = toml::from_str(
            r#"
            [display]
            utc_offset = "-05:00"
            "#,
        )
        .unwrap();
        assert!(matches!(config.display.date_zone().unwrap(), DateZone::Fixed(_)));
        assert!(config.validate().is_ok());

        config.display.utc_offset = Some("America/New_York".into());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("display.utc_offset"));

        assert_eq!(
            MetasearchConfig::default().display.date_zone().unwrap(),
            DateZone::Local
        );
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: MetasearchConfig = toml::from_str(
            r#"
            [server]
            port = 8080

            [providers.jira]
            origin = "https://jira.example.com"
            user = "ada"
            token = "secret"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.search.provider_timeout_ms, 10_000);
        assert_eq!(config.providers.jira.as_ref().unwrap().user, "ada");
        assert!(config.providers.github.is_none());
    }

    #[test]
    fn save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = MetasearchConfig::default();
        config.server.footer = Some("<a href=\"/about\">About</a>".into());
        config.providers.github = Some(GitHubConfig {
            token: "ghp_test".into(),
            api_base: None,
        });
        config.save_to_file(&path).unwrap();

        let loaded = MetasearchConfig::from_file(&path).unwrap();
        assert_eq!(loaded.server.footer, config.server.footer);
        assert_eq!(loaded.providers.github.unwrap().token, "ghp_test");
    }

    #[test]
    fn from_file_invalid_toml_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is not valid toml {{{").unwrap();
        assert!(matches!(
            MetasearchConfig::from_file(&path),
            Err(MetasearchError::Config(_))
        ));
    }

    #[test]
    fn load_or_default_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = MetasearchConfig::load_or_default(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn debug_redacts_tokens() {
        let jira = JiraConfig {
            origin: "https://jira.example.com".into(),
            user: "ada".into(),
            token: "hunter2".into(),
        };
        let github = GitHubConfig {
            token: "ghp_secret".into(),
            api_base: None,
        };
        assert!(!format!("{jira:?}").contains("hunter2"));
        assert!(!format!("{github:?}").contains("ghp_secret"));
    }

    #[test]
    fn registry_contains_only_configured_providers() {
        let mut config = MetasearchConfig::default();
        assert!(config.build_registry().unwrap().is_empty());

        config.providers.jira = Some(JiraConfig {
            origin: "https://jira.example.com".into(),
            user: "ada".into(),
            token: "secret".into(),
        });
        let registry = config.build_registry().unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.descriptor("jira").is_some());
        assert!(registry.descriptor("github").is_none());
    }

    #[test]
    fn registry_rejects_bad_credentials() {
        let mut config = MetasearchConfig::default();
        config.providers.jira = Some(JiraConfig {
            origin: "not a url".into(),
            user: "ada".into(),
            token: "secret".into(),
        });
        let err = config.build_registry().unwrap_err();
        assert!(err.to_string().contains("providers.jira"));
    }
}
