use anyhow::Result;

use super::render::print_reply;
use crate::ai::chat::SessionBuilder;
use crate::core::AppConfig;
use crate::gemini::GeminiClient;
use crate::media::TerminalPicker;

pub async fn run(config: &AppConfig, question: &str) -> Result<()> {
    let gateway = GeminiClient::from_config(config);
    let media = TerminalPicker::new(&config.media_dir);
    let mut session = SessionBuilder::from_config(config, gateway, media).build();

    session.on_submit_text(question).await;
    print_reply(&mut session)
}
