use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

use crate::versioning::retrieval::DEFAULT_TOP_K;

const DEFAULT_EMBEDDING_API_URL: &str = "https://api.openai.com/v1/embeddings";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackendKind {
    Fs,
    Postgres,
}

impl FromStr for StorageBackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fs" | "file" | "filesystem" => Ok(StorageBackendKind::Fs),
            "postgres" | "postgresql" => Ok(StorageBackendKind::Postgres),
            other => bail!("STORAGE_BACKEND must be 'fs' or 'postgres', got '{other}'"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub embedding_api_key: String,
    pub embedding_api_url: String,
    pub embedding_model: String,
    pub storage_backend: StorageBackendKind,
    pub data_dir: PathBuf,
    /// Required when `storage_backend` is Postgres.
    pub database_url: Option<String>,
    pub retrieval_top_k: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("Required environment variable '{key}' is not set"))
        };
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let storage_backend: StorageBackendKind = or_default("STORAGE_BACKEND", "fs").parse()?;
        let database_url = match storage_backend {
            StorageBackendKind::Postgres => Some(require("DATABASE_URL")?),
            StorageBackendKind::Fs => lookup("DATABASE_URL"),
        };

        let retrieval_top_k = or_default("RETRIEVAL_TOP_K", &DEFAULT_TOP_K.to_string())
            .parse::<usize>()
            .context("RETRIEVAL_TOP_K must be a positive integer")?;
        if retrieval_top_k == 0 {
            bail!("RETRIEVAL_TOP_K must be at least 1");
        }

        Ok(Config {
            anthropic_api_key: require("ANTHROPIC_API_KEY")?,
            embedding_api_key: require("EMBEDDING_API_KEY")?,
            embedding_api_url: or_default("EMBEDDING_API_URL", DEFAULT_EMBEDDING_API_URL),
            embedding_model: or_default("EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
            storage_backend,
            data_dir: PathBuf::from(or_default("DATA_DIR", "./data")),
            database_url,
            retrieval_top_k,
            port: or_default("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: or_default("RUST_LOG", "info"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    const KEYS: [(&str, &str); 2] = [("ANTHROPIC_API_KEY", "sk-a"), ("EMBEDDING_API_KEY", "sk-e")];

    #[test]
    fn test_defaults() {
        let config = load(&KEYS).unwrap();
        assert_eq!(config.storage_backend, StorageBackendKind::Fs);
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.retrieval_top_k, 2);
        assert_eq!(config.port, 8080);
        assert_eq!(config.embedding_model, "text-embedding-3-small");
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_missing_api_key_fails() {
        let err = load(&[("ANTHROPIC_API_KEY", "sk-a")]).unwrap_err();
        assert!(err.to_string().contains("EMBEDDING_API_KEY"));
    }

    #[test]
    fn test_postgres_requires_database_url() {
        let mut vars = KEYS.to_vec();
        vars.push(("STORAGE_BACKEND", "postgres"));
        assert!(load(&vars).is_err());

        vars.push(("DATABASE_URL", "postgres://localhost/coach"));
        let config = load(&vars).unwrap();
        assert_eq!(config.storage_backend, StorageBackendKind::Postgres);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/coach")
        );
    }

    #[test]
    fn test_rejects_zero_top_k_and_unknown_backend() {
        let mut vars = KEYS.to_vec();
        vars.push(("RETRIEVAL_TOP_K", "0"));
        assert!(load(&vars).is_err());

        let mut vars = KEYS.to_vec();
        vars.push(("STORAGE_BACKEND", "redis"));
        assert!(load(&vars).is_err());
    }
}
