//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite database file. `None` uses the platform data directory.
    /// Env: `DATABASE_PATH`
    pub database_path: Option<PathBuf>,

    /// Directory holding uploaded photo bytes.
    /// Env: `PHOTO_STORAGE_PATH`
    /// Default: `./photos`
    pub photo_storage_path: PathBuf,

    /// Base URL photo locators are built from.
    /// Env: `PUBLIC_BASE_URL`
    /// Default: `http://localhost:8080`
    pub public_base_url: String,

    /// Maximum photo upload in bytes.
    /// Env: `MAX_PHOTO_SIZE`
    /// Default: 10 MiB
    pub max_photo_size: usize,

    /// JSON member document imported into an empty database at startup.
    /// Env: `SEED_FILE`
    pub seed_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 8080).into(),
            database_path: None,
            photo_storage_path: PathBuf::from("./photos"),
            public_base_url: "http://localhost:8080".to_string(),
            max_photo_size: 10 * 1024 * 1024, // 10 MiB
            seed_file: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(path) = lookup("DATABASE_PATH").filter(|p| !p.is_empty()) {
            config.database_path = Some(PathBuf::from(path));
        }

        if let Some(path) = lookup("PHOTO_STORAGE_PATH") {
            config.photo_storage_path = PathBuf::from(path);
        }

        if let Some(url) = lookup("PUBLIC_BASE_URL") {
            config.public_base_url = url.trim_end_matches('/').to_string();
        }

        if let Some(val) = lookup("MAX_PHOTO_SIZE") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.max_photo_size = n,
                _ => tracing::warn!(value = %val, "Invalid MAX_PHOTO_SIZE, using default"),
            }
        }

        if let Some(path) = lookup("SEED_FILE").filter(|p| !p.is_empty()) {
            config.seed_file = Some(PathBuf::from(path));
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter.

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(vars: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = from_map(&[]);
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.photo_storage_path, PathBuf::from("./photos"));
        assert_eq!(config.max_photo_size, 10 * 1024 * 1024);
        assert!(config.database_path.is_none());
        assert!(config.seed_file.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = from_map(&[
            ("HTTP_ADDR", "127.0.0.1:9000"),
            ("DATABASE_PATH", "/tmp/amity.db"),
            ("PUBLIC_BASE_URL", "https://amity.example/"),
            ("MAX_PHOTO_SIZE", "2048"),
            ("SEED_FILE", "seed.json"),
        ]);
        assert_eq!(config.http_addr, ([127, 0, 0, 1], 9000).into());
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/amity.db")));
        assert_eq!(config.public_base_url, "https://amity.example");
        assert_eq!(config.max_photo_size, 2048);
        assert_eq!(config.seed_file, Some(PathBuf::from("seed.json")));
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = from_map(&[("HTTP_ADDR", "not-an-addr"), ("MAX_PHOTO_SIZE", "0")]);
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.max_photo_size, 10 * 1024 * 1024);
    }
}
