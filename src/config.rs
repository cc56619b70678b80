use serde::Deserialize;
use std::path::PathBuf;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Which session store backs profiles and memos
    #[serde(default)]
    pub session_backend: SessionBackend,

    /// Lifetime of a session's stored state, in seconds
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Directory holding `outfits.json` and `products.json`
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory of garment cutouts, one file per product id
    #[serde(default = "default_garment_dir")]
    pub garment_dir: PathBuf,

    /// Directory generated try-on images are written to
    #[serde(default = "default_media_dir")]
    pub media_dir: PathBuf,

    /// Base image of the person garments are composited onto
    #[serde(default)]
    pub model_image_path: Option<PathBuf>,

    /// OpenAI API key; external calls are disabled without one
    #[serde(default)]
    pub openai_api_key: Option<String>,

    /// OpenAI-compatible API base URL
    #[serde(default = "default_openai_api_url")]
    pub openai_api_url: String,

    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    #[serde(default = "default_chat_temperature")]
    pub chat_temperature: f64,

    #[serde(default = "default_image_model")]
    pub image_model: String,

    /// Timeout for the outfit selection call
    #[serde(default = "default_chat_timeout_secs")]
    pub chat_timeout_secs: u64,

    /// Timeout for the try-on composition call
    #[serde(default = "default_image_timeout_secs")]
    pub image_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    #[default]
    Redis,
    Memory,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_session_ttl_secs() -> u64 {
    604800 // 1 week
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_garment_dir() -> PathBuf {
    PathBuf::from("data/garments")
}

fn default_media_dir() -> PathBuf {
    PathBuf::from("media")
}

fn default_openai_api_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_chat_temperature() -> f64 {
    0.7
}

fn default_image_model() -> String {
    "gpt-image-1".to_string()
}

fn default_chat_timeout_secs() -> u64 {
    90
}

fn default_image_timeout_secs() -> u64 {
    180
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Path of the swipe deck file
    pub fn outfits_path(&self) -> PathBuf {
        self.data_dir.join("outfits.json")
    }

    /// Path of the product catalog file
    pub fn products_path(&self) -> PathBuf {
        self.data_dir.join("products.json")
    }
}
