use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    pub google_books_api_key: Option<String>,

    /// Identity used by the CLI for votes and reviews.
    pub user_id: Option<String>,

    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default = "default_review_page_size")]
    pub review_page_size: usize,

    #[serde(default = "default_catalog_max_results")]
    pub catalog_max_results: u32,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("inkreads");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("inkreads.db").to_string_lossy().to_string()
}

fn default_review_page_size() -> usize {
    10
}

fn default_catalog_max_results() -> u32 {
    12
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            google_books_api_key: None,
            user_id: None,
            display_name: None,
            review_page_size: default_review_page_size(),
            catalog_max_results: default_catalog_max_results(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml(&content)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.review_page_size == 0 {
            return Err(AppError::Config(
                "review_page_size must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("inkreads")
            .join("config.toml")
    }
}
