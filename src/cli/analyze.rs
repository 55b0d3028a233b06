use std::path::Path;

use anyhow::{Result, bail};

use super::render::print_reply;
use crate::ai::chat::SessionBuilder;
use crate::core::AppConfig;
use crate::gemini::GeminiClient;
use crate::media::FilePicker;

pub async fn run(config: &AppConfig, image: &Path) -> Result<()> {
    if !image.is_file() {
        bail!("No such image file: {}", image.display());
    }

    let gateway = GeminiClient::from_config(config);
    let media = FilePicker::new(image);
    let mut session = SessionBuilder::from_config(config, gateway, media).build();

    session.on_request_image_pick().await;
    print_reply(&mut session)
}
