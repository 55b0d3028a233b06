use std::env;
use std::path::PathBuf;

use anyhow::{Result, bail};

pub const DEFAULT_GREETING: &str = "👋 Hi! How can I help you with your farming questions today?";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub gemini_api_hostname: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub target_language: String,
    // Compression quality for outgoing photos in the range (0, 1]
    pub image_quality: f32,
    pub image_max_dimension: u32,
    pub media_dir: PathBuf,
    pub greeting: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        // The API key is the only setting read from the environment,
        // everything else is set on the command line.
        let gemini_api_key =
            env::var("GEMINI_API_KEY").unwrap_or_else(|_| "thiswontworkforgemini".to_string());

        Self {
            gemini_api_hostname: String::from("https://generativelanguage.googleapis.com"),
            gemini_api_key,
            gemini_model: String::from("gemini-1.5-flash-latest"),
            target_language: String::from("Malayalam"),
            image_quality: 0.7,
            image_max_dimension: 1024,
            media_dir: PathBuf::from("."),
            greeting: DEFAULT_GREETING.to_string(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.image_quality > 0.0 && self.image_quality <= 1.0) {
            bail!(
                "Image quality must be greater than 0 and at most 1, got {}",
                self.image_quality
            );
        }
        if self.image_max_dimension == 0 {
            bail!("Image max dimension must be greater than 0");
        }
        if self.target_language.trim().is_empty() {
            bail!("Target language can not be empty");
        }
        if self.gemini_model.trim().is_empty() {
            bail!("Gemini model can not be empty");
        }
        Ok(())
    }
}
