use std::fs;
use std::path::{Path, PathBuf};

use crate::proxy::ProxyConfig;

const DATA_DIR: &str = ".aisearch_proxy";
const CONFIG_FILE: &str = "config.json";

/// Get data directory path (`~/.aisearch_proxy`), creating it if needed
pub fn get_data_dir() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or("Failed to get user home directory")?;
    let data_dir = home.join(DATA_DIR);

    if !data_dir.exists() {
        fs::create_dir_all(&data_dir)
            .map_err(|e| format!("Failed to create data directory: {}", e))?;
    }

    Ok(data_dir)
}

pub fn default_config_path() -> Result<PathBuf, String> {
    Ok(get_data_dir()?.join(CONFIG_FILE))
}

/// Load proxy config from `path`.
///
/// A missing file is created with defaults so the generated API key
/// survives restarts. Missing fields fall back to their defaults.
pub fn load_app_config(path: &Path) -> Result<ProxyConfig, String> {
    if !path.exists() {
        let config = ProxyConfig::default();
        save_app_config(&config, path)?;
        tracing::info!("Created default config at {}", path.display());
        return Ok(config);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file: {}", e))?;

    serde_json::from_str(&content).map_err(|e| format!("Failed to parse config file: {}", e))
}

/// Save proxy config
pub fn save_app_config(config: &ProxyConfig, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }
    }

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    fs::write(path, content).map_err(|e| format!("Failed to save config: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let first = load_app_config(&path).unwrap();
        assert!(path.exists());
        assert_eq!(first.port, 8045);
        assert!(first.api_key.starts_with("sk-"));

        let second = load_app_config(&path).unwrap();
        assert_eq!(first.api_key, second.api_key);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, r#"{"port": 9000, "api_key": "sk-test"}"#).unwrap();

        let config = load_app_config(&path).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.max_conversation_count, 50);
        assert!(!config.reuse_conversation);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "{not json").unwrap();

        let err = load_app_config(&path).unwrap_err();
        assert!(err.starts_with("Failed to parse config file"));
    }
}
