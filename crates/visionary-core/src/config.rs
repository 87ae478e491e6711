use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use anyhow::{Result, anyhow};

use crate::ai::gemini::{DEFAULT_API_BASE, DEFAULT_TEXT_MODEL};
use crate::ai::GeminiClient;

/// Environment variables checked for the API key, in order
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    /// Image model used for new sessions
    pub image_model: Option<String>,
    /// Text model used for prompt assist
    pub text_model: Option<String>,
    pub data_dir: Option<PathBuf>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(&config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(&config_path, config_content)?;
        Ok(())
    }

    pub fn save_image_model(model: &str) -> Result<()> {
        let mut config = Self::load().unwrap_or_else(|_| Self::new());
        config.image_model = Some(model.to_string());
        config.save()
    }

    /// Env vars win over the config file; blank values count as unset
    pub fn resolve_api_key(&self) -> Option<String> {
        API_KEY_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .chain(self.api_key.clone())
            .map(|key| key.trim().to_string())
            .find(|key| !key.is_empty())
    }

    /// Where history lives: explicit override, then config, then the platform data dir
    pub fn resolve_data_dir(&self, override_dir: Option<PathBuf>) -> Result<PathBuf> {
        if let Some(dir) = override_dir.or_else(|| self.data_dir.clone()) {
            return Ok(dir);
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow!("Could not determine data directory"))?;
        Ok(data_dir.join("visionary"))
    }

    pub fn gemini_client(&self) -> Option<GeminiClient> {
        let api_key = self.resolve_api_key()?;
        Some(
            GeminiClient::new(&api_key)
                .with_api_base(self.api_base.as_deref().unwrap_or(DEFAULT_API_BASE))
                .with_text_model(self.text_model.as_deref().unwrap_or(DEFAULT_TEXT_MODEL)),
        )
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("visionary").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_partial_config() {
        let config: Config = serde_json::from_str(r#"{ "image_model": "imagen-4" }"#).unwrap();
        assert_eq!(config.image_model.as_deref(), Some("imagen-4"));
        assert!(config.api_key.is_none());
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn test_data_dir_override_wins() {
        let config = Config {
            data_dir: Some(PathBuf::from("/from/config")),
            ..Config::new()
        };
        let dir = config
            .resolve_data_dir(Some(PathBuf::from("/from/flag")))
            .unwrap();
        assert_eq!(dir, PathBuf::from("/from/flag"));
        assert_eq!(config.resolve_data_dir(None).unwrap(), PathBuf::from("/from/config"));
    }
}
