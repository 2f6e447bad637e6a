//! Client configuration, read from the environment (and a `.env` file, if there is one).

use std::path::PathBuf;

use treesync::rest::RestReader;

use crate::gateway::{FunctionCaller, HttpCallGateway};
use crate::paths::{DatabaseLevel, UnknownLevel};
use crate::registration::{CacheError, SignInCache};

pub const LEVEL_VAR: &str = "CLUB_FINES_LEVEL";
pub const CACHE_DIR_VAR: &str = "CLUB_FINES_CACHE_DIR";
pub const FUNCTIONS_URL_VAR: &str = "CLUB_FINES_FUNCTIONS_URL";
pub const DATABASE_URL_VAR: &str = "CLUB_FINES_DATABASE_URL";
pub const PRIVATE_KEY_VAR: &str = "CLUB_FINES_PRIVATE_KEY";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not load .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("CLUB_FINES_LEVEL: {0}")]
    Level(#[from] UnknownLevel),
    #[error("{0} is not set")]
    Missing(&'static str),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClientConfig {
    pub level: DatabaseLevel,
    /// Directory of the registration cache file.
    pub cache_dir: PathBuf,
    /// Base url of the remote procedures, e.g. `https://europe-west1-project.cloudfunctions.net`.
    pub functions_url: Option<String>,
    /// Base url of the remote tree's REST interface.
    pub database_url: Option<String>,
    /// Sent along with every procedure call.
    pub private_key: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            level: DatabaseLevel::default(),
            cache_dir: std::env::temp_dir().join("club-fines"),
            functions_url: None,
            database_url: None,
            private_key: None,
        }
    }
}

impl ClientConfig {
    /// Loads `.env` from the working directory or its parents, then reads the `CLUB_FINES_*` variables.
    /// Unset variables keep their default.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => log::debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e.into()),
        }
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let level = match var(LEVEL_VAR) {
            Some(level) => level.parse()?,
            None => defaults.level,
        };
        let config = Self {
            level,
            cache_dir: var(CACHE_DIR_VAR)
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            functions_url: var(FUNCTIONS_URL_VAR),
            database_url: var(DATABASE_URL_VAR),
            private_key: var(PRIVATE_KEY_VAR),
        };
        log::info!(
            "Using database level {} and cache directory {}",
            config.level,
            config.cache_dir.display()
        );
        Ok(config)
    }
}

impl ClientConfig {
    pub fn function_caller(&self) -> Result<FunctionCaller<HttpCallGateway>, ConfigError> {
        let url = self
            .functions_url
            .as_deref()
            .ok_or(ConfigError::Missing(FUNCTIONS_URL_VAR))?;
        Ok(FunctionCaller::new(
            HttpCallGateway::new(url),
            self.level,
            self.private_key.clone(),
        ))
    }

    pub fn rest_reader(&self) -> Result<RestReader, ConfigError> {
        let url = self
            .database_url
            .as_deref()
            .ok_or(ConfigError::Missing(DATABASE_URL_VAR))?;
        Ok(RestReader::new(url))
    }

    pub fn sign_in_cache(&self) -> Result<SignInCache, CacheError> {
        SignInCache::open(&self.cache_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(vars: &[(&str, &str)]) -> Result<ClientConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_vars(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = from_map(&[]).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_reads_variables() {
        let config = from_map(&[
            (LEVEL_VAR, "debug"),
            (CACHE_DIR_VAR, "/tmp/fines"),
            (FUNCTIONS_URL_VAR, "http://localhost:5001"),
            (PRIVATE_KEY_VAR, "secret"),
            (DATABASE_URL_VAR, " "),
        ])
        .unwrap();
        assert_eq!(config.level, DatabaseLevel::Debug);
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/fines"));
        assert_eq!(config.functions_url.as_deref(), Some("http://localhost:5001"));
        assert_eq!(config.private_key.as_deref(), Some("secret"));
        assert_eq!(config.database_url, None);
    }

    #[test]
    fn test_derived_clients() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig {
            cache_dir: dir.path().join("cache"),
            ..ClientConfig::default()
        };
        assert!(matches!(
            config.function_caller(),
            Err(ConfigError::Missing(FUNCTIONS_URL_VAR))
        ));
        assert!(config.rest_reader().is_err());
        assert_eq!(config.sign_in_cache().unwrap().state(), None);

        let config = ClientConfig {
            functions_url: Some("http://localhost:5001".into()),
            level: DatabaseLevel::Testing,
            ..config
        };
        assert_eq!(config.function_caller().unwrap().level(), DatabaseLevel::Testing);
    }

    #[test]
    fn test_invalid_level() {
        assert!(matches!(
            from_map(&[(LEVEL_VAR, "production")]),
            Err(ConfigError::Level(_))
        ));
    }
}
