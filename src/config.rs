use anyhow::{Context, Result, anyhow};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    JsonFiles,
    Memory,
}

impl StorageBackend {
    fn from_env(raw: &str) -> Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "json" | "file" | "files" => Ok(Self::JsonFiles),
            "memory" | "mem" => Ok(Self::Memory),
            _ => Err(anyhow!("STORAGE_BACKEND must be one of: json, memory")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn from_env(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("development") {
            Self::Development
        } else {
            Self::Production
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub storage: StorageBackend,
    pub environment: Environment,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, so parsing is testable without touching
    /// the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let port = lookup("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse::<u16>()
            .context("PORT must be a valid u16")?;

        let data_dir = PathBuf::from(lookup("DATA_DIR").unwrap_or_else(|| "data".to_string()));

        let storage = StorageBackend::from_env(
            &lookup("STORAGE_BACKEND").unwrap_or_else(|| "json".to_string()),
        )?;

        let environment = Environment::from_env(
            &lookup("APP_ENV")
                .or_else(|| lookup("NODE_ENV"))
                .unwrap_or_else(|| "production".to_string()),
        );

        Ok(Self {
            host,
            port,
            data_dir,
            storage,
            environment,
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn expose_internal_errors(&self) -> bool {
        self.environment == Environment::Development
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.address(), "0.0.0.0:3000");
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.storage, StorageBackend::JsonFiles);
        assert_eq!(config.environment, Environment::Production);
        assert!(!config.expose_internal_errors());
    }

    #[test]
    fn node_env_is_a_fallback_for_app_env() {
        let fallback = config(&[("NODE_ENV", "development")]).unwrap();
        assert!(fallback.expose_internal_errors());

        let both = config(&[("APP_ENV", "production"), ("NODE_ENV", "development")]).unwrap();
        assert_eq!(both.environment, Environment::Production);
    }

    #[test]
    fn invalid_values_fail() {
        assert!(config(&[("PORT", "http")]).is_err());
        assert!(config(&[("STORAGE_BACKEND", "sqlite")]).is_err());
        assert_eq!(
            config(&[("STORAGE_BACKEND", "MEMORY")]).unwrap().storage,
            StorageBackend::Memory
        );
    }
}
