//! Test utilities for integration tests
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{ImageFormat, Rgba, RgbaImage};
use serde_json::json;

use sahayi::core::AppConfig;

pub const GENERATE_PATH: &str = "/v1beta/models/gemini-test:generateContent";

/// Config pointing at a mock server with a fake key and model.
pub fn test_config(server_url: &str) -> AppConfig {
    AppConfig {
        gemini_api_hostname: server_url.to_string(),
        gemini_api_key: String::from("test-api-key"),
        gemini_model: String::from("gemini-test"),
        ..AppConfig::default()
    }
}

/// A successful `generateContent` response body with `text` as the
/// first part of the first candidate.
pub fn reply_body(text: &str) -> String {
    json!({
        "candidates": [{
            "content": {"parts": [{"text": text}], "role": "model"},
            "finishReason": "STOP",
            "index": 0
        }],
        "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 40}
    })
    .to_string()
}

/// Writes a PNG photo of a green leaf into `dir` and returns its path.
pub fn write_photo(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let img = RgbaImage::from_pixel(width, height, Rgba([34, 139, 34, 255]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("Failed to encode test photo");
    let path = dir.join(name);
    fs::write(&path, bytes).expect("Failed to write test photo");
    path
}
