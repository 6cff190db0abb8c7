//! Application configuration.

use serde::Deserialize;
use std::path::Path;
use url::Url;

/// Hard upper bound on the configurable note length.
pub const MAX_NOTE_CHARS_CAP: usize = 300;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Federation configuration.
    pub federation: FederationConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL, e.g. `sqlite://starling.db?mode=rwc`.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Federation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FederationConfig {
    /// Authoritative host for outward-facing URIs, e.g. `social.example`.
    pub local_domain: String,
    /// Master switch; when false no activities are assembled or delivered.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Reject account creation once one local actor exists.
    #[serde(default)]
    pub single_user: bool,
    /// Reject all new account creation.
    #[serde(default)]
    pub closed_registration: bool,
    /// Input-validation bound for note bodies.
    #[serde(default = "default_note_chars")]
    pub max_note_visible_chars: usize,
    /// Free-form instance metadata.
    #[serde(default)]
    pub node_description: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    1
}

const fn default_true() -> bool {
    true
}

const fn default_note_chars() -> usize {
    150
}

impl FederationConfig {
    /// Effective note length limit, clamped to the hard cap.
    #[must_use]
    pub fn note_char_limit(&self) -> usize {
        self.max_note_visible_chars.min(MAX_NOTE_CHARS_CAP)
    }

    /// Public base URL of this instance.
    ///
    /// # Panics
    /// Never panics for a well-formed `local_domain`.
    #[must_use]
    #[allow(clippy::missing_panics_doc)]
    pub fn base_url(&self) -> Url {
        Url::parse(&format!("https://{}", self.local_domain)).expect("valid local_domain")
    }
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `STARLING_ENV`)
    /// 3. Environment variables with `STARLING_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("STARLING_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("STARLING")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("STARLING")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn federation_config(chars: usize) -> FederationConfig {
        FederationConfig {
            local_domain: "social.example".to_string(),
            enabled: true,
            single_user: false,
            closed_registration: false,
            max_note_visible_chars: chars,
            node_description: None,
        }
    }

    #[test]
    fn test_note_char_limit_clamped() {
        assert_eq!(federation_config(150).note_char_limit(), 150);
        assert_eq!(federation_config(1000).note_char_limit(), MAX_NOTE_CHARS_CAP);
    }

    #[test]
    fn test_base_url() {
        let config = federation_config(150);
        assert_eq!(config.base_url().as_str(), "https://social.example/");
    }
}
