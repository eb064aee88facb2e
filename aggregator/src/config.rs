//! Configuration loading for the case image aggregator
//!
//! Configuration is loaded from:
//! 1. Environment variable CASE_IMAGES_CONFIG_PATH
//! 2. `<config dir>/case-images/config.toml`
//! 3. Default values
//!
//! Credentials may also come from the environment (highest priority):
//! `CASE_IMAGES_API_KEY`, `CASE_IMAGES_ENGINE_ID` and
//! `CASE_IMAGES_GENERATIVE_API_KEY`.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::types::{ImageSize, ImageType, Language, SafeSearch, SearchFilters};

pub const API_KEY_ENV: &str = "CASE_IMAGES_API_KEY";
pub const ENGINE_ID_ENV: &str = "CASE_IMAGES_ENGINE_ID";
pub const GENERATIVE_API_KEY_ENV: &str = "CASE_IMAGES_GENERATIVE_API_KEY";
pub const CONFIG_PATH_ENV: &str = "CASE_IMAGES_CONFIG_PATH";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub custom_search: CustomSearchConfig,
    #[serde(default)]
    pub generative: GenerativeConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// Which image source backs the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Paginated image search API
    #[default]
    CustomSearch,
    /// Text + image generation API
    Generative,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,
}

/// Image search API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomSearchConfig {
    /// API key (overridden by CASE_IMAGES_API_KEY)
    #[serde(default)]
    pub api_key: String,
    /// Search engine identifier (overridden by CASE_IMAGES_ENGINE_ID)
    #[serde(default)]
    pub search_engine_id: String,
    #[serde(default = "default_custom_search_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub safe_search: SafeSearch,
    #[serde(default)]
    pub image_size: ImageSize,
    #[serde(default)]
    pub image_type: ImageType,
}

/// Generation API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerativeConfig {
    /// API key (overridden by CASE_IMAGES_GENERATIVE_API_KEY)
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_generative_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_text_model")]
    pub text_model: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    /// Default language for generated descriptions
    #[serde(default)]
    pub language: Language,
    /// Images generated per request
    #[serde(default = "default_generative_page_size")]
    pub page_size: usize,
}

/// Pagination settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Default result budget per term and call
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Items requested per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Hard ceiling on pages per call
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    /// Pause between successive page requests
    #[serde(default = "default_delay_ms")]
    pub page_delay_ms: u64,
}

/// Archive output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Directory archives are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Pause between successive image downloads
    #[serde(default = "default_delay_ms")]
    pub fetch_delay_ms: u64,
    /// DEFLATE level
    #[serde(default = "default_compression_level")]
    pub compression_level: i64,
}

/// Shared HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_custom_search_endpoint() -> String {
    "https://www.googleapis.com/customsearch/v1".to_string()
}

fn default_generative_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_text_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_image_model() -> String {
    "imagen-4.0-generate-001".to_string()
}

fn default_generative_page_size() -> usize {
    8
}

fn default_max_results() -> usize {
    100
}

fn default_page_size() -> usize {
    10
}

fn default_max_pages() -> usize {
    10
}

fn default_delay_ms() -> u64 {
    100
}

fn default_output_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(std::env::temp_dir)
}

fn default_compression_level() -> i64 {
    6
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("case-images/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for CustomSearchConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            search_engine_id: String::new(),
            endpoint: default_custom_search_endpoint(),
            safe_search: SafeSearch::default(),
            image_size: ImageSize::default(),
            image_type: ImageType::default(),
        }
    }
}

impl CustomSearchConfig {
    pub fn filters(&self) -> SearchFilters {
        SearchFilters {
            safe_search: self.safe_search,
            image_size: self.image_size,
            image_type: self.image_type,
            language: Language::default(),
        }
    }
}

impl Default for GenerativeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: default_generative_endpoint(),
            text_model: default_text_model(),
            image_model: default_image_model(),
            language: Language::default(),
            page_size: default_generative_page_size(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            page_delay_ms: default_delay_ms(),
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            fetch_delay_ms: default_delay_ms(),
            compression_level: default_compression_level(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load() -> Result<Self> {
        let config_path = Self::find_config_path();

        let mut config = match config_path {
            Some(path) if path.exists() => {
                tracing::info!("Loading config from: {}", path.display());
                let content = std::fs::read_to_string(&path)?;
                Self::from_toml(&content)?
            }
            Some(_) => {
                tracing::info!("Config file not found, using defaults");
                Self::default()
            }
            None => {
                tracing::info!("No config path specified, using defaults");
                Self::default()
            }
        };

        config.apply_env_credentials();
        Ok(config)
    }

    /// Parse a TOML document, filling omitted values with defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Credentials from the environment take priority over the file
    pub fn apply_env_credentials(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            self.custom_search.api_key = key;
        }
        if let Ok(id) = std::env::var(ENGINE_ID_ENV) {
            self.custom_search.search_engine_id = id;
        }
        if let Ok(key) = std::env::var(GENERATIVE_API_KEY_ENV) {
            self.generative.api_key = key;
        }
    }

    fn find_config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Some(PathBuf::from(path));
        }

        dirs::config_dir().map(|dir| dir.join("case-images").join("config.toml"))
    }
}
