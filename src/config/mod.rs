//! Application Configuration
//!
//! User settings stored in TOML format.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Backend API settings
    pub api: ApiSettings,
    /// Event stream settings
    pub stream: StreamSettings,
    /// Overlay rendering settings
    pub overlay: OverlaySettings,
}

/// Backend API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL of the recognition backend
    pub base_url: String,
    /// Header carrying the session-correlation id
    pub session_header: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            session_header: "x-session-id".to_string(),
        }
    }
}

/// Event stream settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamSettings {
    /// Maximum reconnection attempts before parking in the error state
    pub reconnect_attempts: u32,
    /// Base reconnection delay in milliseconds (scaled by attempt number)
    pub reconnect_base_delay_ms: u64,
    /// Debounce delay for positional batch bursts in milliseconds
    pub debounce_ms: u64,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            reconnect_attempts: 5,
            reconnect_base_delay_ms: 500,
            debounce_ms: 100,
        }
    }
}

/// Overlay rendering settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlaySettings {
    /// Arrival animation window in milliseconds
    pub animation_window_ms: u64,
    /// Scan sweep period in milliseconds
    pub scan_period_ms: u64,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            animation_window_ms: 1500,
            scan_period_ms: 2400,
        }
    }
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "invoicelens", "InvoiceLens")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    let config_dir = proj_dirs.config_dir().to_path_buf();
    std::fs::create_dir_all(&config_dir)?;

    Ok(config_dir)
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_app_config() {
        let config = AppConfig::default();

        assert_eq!(config.api.base_url, "http://localhost:3000/api");
        assert_eq!(config.api.session_header, "x-session-id");

        assert_eq!(config.stream.reconnect_attempts, 5);
        assert_eq!(config.stream.reconnect_base_delay_ms, 500);
        assert_eq!(config.stream.debounce_ms, 100);

        assert_eq!(config.overlay.animation_window_ms, 1500);
        assert_eq!(config.overlay.scan_period_ms, 2400);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = AppConfig::default();

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config, parsed);
    }

    #[test]
    fn test_config_with_custom_values() {
        let mut config = AppConfig::default();
        config.api.base_url = "https://ocr.example.com/api".to_string();
        config.stream.reconnect_attempts = 8;
        config.overlay.scan_period_ms = 1000;

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.api.base_url, "https://ocr.example.com/api");
        assert_eq!(parsed.stream.reconnect_attempts, 8);
        assert_eq!(parsed.overlay.scan_period_ms, 1000);
    }

    #[test]
    fn test_save_and_load_config() {
        let config = AppConfig::default();
        let temp_file = NamedTempFile::new().unwrap();

        save_config(&config, temp_file.path()).unwrap();
        let loaded = load_config(temp_file.path()).unwrap();

        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid toml {{{{").unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }
}
