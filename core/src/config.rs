//! Environment-backed configuration.

use std::path::PathBuf;

/// Variable selecting the backend base URL.
pub const API_BASE_ENV: &str = "FACEATTEND_API_BASE";
/// Variable selecting the client-storage file.
pub const STORAGE_PATH_ENV: &str = "FACEATTEND_STORAGE";

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_STORAGE_PATH: &str = ".faceattend/storage.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub base_url: String,
    pub storage_path: PathBuf,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup. Empty values count
    /// as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        Self {
            base_url: get(API_BASE_ENV).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            storage_path: get(STORAGE_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_PATH)),
        }
    }
}
