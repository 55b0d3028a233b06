use async_trait::async_trait;
use handlebars::Handlebars;
use reqwest::Client;

use super::core::{GenerateContentRequest, GenerateContentResponse, generate_content};
use super::{GatewayError, GatewayErrorKind};
use crate::ai::prompt;
use crate::core::AppConfig;
use crate::media::ImagePayload;

pub const TEXT_FALLBACK: &str = "⚠️ Sorry, I couldn't get a reply.";
pub const IMAGE_FALLBACK: &str = "⚠️ Sorry, I couldn't analyze the image. Please try again.";

/// The remote generative language service, one call per turn.
///
/// Implementations must catch every failure and return it as a
/// `GatewayError`. A reply that arrives but has no text is not an
/// error, implementations return fallback text instead so the user
/// always sees something.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Ask a question, instructing the model to answer in
    /// `target_language`.
    async fn send_text(&self, prompt: &str, target_language: &str) -> Result<String, GatewayError>;

    /// Send a photo along with an instruction describing the analysis
    /// to perform.
    async fn send_image(
        &self,
        payload: &ImagePayload,
        instruction: &str,
    ) -> Result<String, GatewayError>;
}

/// Talks to the Gemini `generateContent` API.
pub struct GeminiClient {
    client: Client,
    api_hostname: String,
    api_key: String,
    model: String,
    templates: Handlebars<'static>,
}

impl GeminiClient {
    pub fn new(api_hostname: &str, api_key: &str, model: &str) -> Self {
        Self {
            client: Client::new(),
            api_hostname: api_hostname.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            templates: prompt::templates(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            &config.gemini_api_hostname,
            &config.gemini_api_key,
            &config.gemini_model,
        )
    }

    async fn reply(
        &self,
        request: &GenerateContentRequest,
        fallback: &str,
    ) -> Result<String, GatewayError> {
        let resp = generate_content(
            &self.client,
            request,
            &self.api_hostname,
            &self.api_key,
            &self.model,
        )
        .await?;

        match extract_reply(&resp) {
            Ok(text) => Ok(text),
            Err(err) if err.kind == GatewayErrorKind::EmptyContent => {
                tracing::warn!("{}, using fallback reply", err);
                Ok(fallback.to_string())
            }
            Err(err) => Err(err),
        }
    }
}

fn extract_reply(resp: &GenerateContentResponse) -> Result<String, GatewayError> {
    if let Some(text) = resp.first_text() {
        return Ok(text.to_string());
    }
    // Blocked replies come back with a finish reason such as SAFETY
    let reason = resp
        .candidates
        .first()
        .and_then(|candidate| candidate.finish_reason.as_deref())
        .unwrap_or("none");
    Err(GatewayError::empty_content(format!(
        "No text in the first candidate (finish reason: {})",
        reason
    )))
}

#[async_trait]
impl Gateway for GeminiClient {
    async fn send_text(&self, prompt: &str, target_language: &str) -> Result<String, GatewayError> {
        let instruction = prompt::text_question(&self.templates, target_language, prompt)
            .map_err(|e| GatewayError::invalid_request(e.to_string()))?;
        let request = GenerateContentRequest::text(&instruction);
        self.reply(&request, TEXT_FALLBACK).await
    }

    async fn send_image(
        &self,
        payload: &ImagePayload,
        instruction: &str,
    ) -> Result<String, GatewayError> {
        let request = GenerateContentRequest::image(instruction, payload);
        self.reply(&request, IMAGE_FALLBACK).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    const PATH: &str = "/v1beta/models/gemini-test:generateContent";

    fn reply_body(text: &str) -> String {
        json!({
            "candidates": [{
                "content": {"parts": [{"text": text}], "role": "model"},
                "finishReason": "STOP",
                "index": 0
            }]
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_send_text_wraps_prompt_with_language() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("POST", PATH)
            .match_query(Matcher::UrlEncoded("key".into(), "test-key".into()))
            .match_body(Matcher::Json(json!({
                "contents": [{"parts": [{
                    "text": "Please answer the following question in Malayalam: What pest is on my banana leaf?"
                }]}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(reply_body("Use neem oil spray"))
            .create();

        let client = GeminiClient::new(&server.url(), "test-key", "gemini-test");
        let result = client
            .send_text("What pest is on my banana leaf?", "Malayalam")
            .await;

        mock.assert();
        assert_eq!(result.unwrap(), "Use neem oil spray");
    }

    #[tokio::test]
    async fn test_send_image_inlines_payload() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("POST", PATH)
            .match_query(Matcher::UrlEncoded("key".into(), "test-key".into()))
            .match_body(Matcher::Json(json!({
                "contents": [{"parts": [
                    {"text": "Analyze this"},
                    {"inline_data": {"mime_type": "image/jpeg", "data": "/9j/AAAA"}}
                ]}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(reply_body("Leaf spot disease"))
            .create();

        let client = GeminiClient::new(&server.url(), "test-key", "gemini-test");
        let payload = ImagePayload::jpeg(String::from("/9j/AAAA"));
        let result = client.send_image(&payload, "Analyze this").await;

        mock.assert();
        assert_eq!(result.unwrap(), "Leaf spot disease");
    }

    #[tokio::test]
    async fn test_missing_text_uses_text_fallback() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("POST", PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#)
            .create();

        let client = GeminiClient::new(&server.url(), "test-key", "gemini-test");
        let result = client.send_text("Hello", "Malayalam").await;

        assert_eq!(result.unwrap(), TEXT_FALLBACK);
    }

    #[tokio::test]
    async fn test_missing_text_uses_image_fallback() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("POST", PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("{}")
            .create();

        let client = GeminiClient::new(&server.url(), "test-key", "gemini-test");
        let payload = ImagePayload::jpeg(String::from("AAAA"));
        let result = client.send_image(&payload, "Analyze this").await;

        assert_eq!(result.unwrap(), IMAGE_FALLBACK);
    }

    #[tokio::test]
    async fn test_http_failure_is_an_error_not_a_fallback() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("POST", PATH)
            .match_query(Matcher::Any)
            .with_status(403)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": {"code": 403, "message": "Generative Language API has not been used"}}"#)
            .create();

        let client = GeminiClient::new(&server.url(), "test-key", "gemini-test");
        let err = client.send_text("Hello", "Malayalam").await.unwrap_err();

        assert_eq!(err.kind, GatewayErrorKind::Http);
        assert_eq!(err.http_status, Some(403));
    }

    #[test]
    fn test_extract_reply_empty() {
        let resp = GenerateContentResponse::default();
        let err = extract_reply(&resp).unwrap_err();
        assert_eq!(err.kind, GatewayErrorKind::EmptyContent);
        assert!(err.message.ends_with("(finish reason: none)"));
    }

    #[test]
    fn test_extract_reply_blocked() {
        let resp: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }))
        .unwrap();
        let err = extract_reply(&resp).unwrap_err();
        assert_eq!(err.kind, GatewayErrorKind::EmptyContent);
        assert!(err.message.contains("SAFETY"));
    }

    #[test]
    fn test_from_config() {
        let config = AppConfig {
            gemini_api_hostname: String::from("http://localhost:9999"),
            gemini_api_key: String::from("k"),
            gemini_model: String::from("m"),
            ..AppConfig::default()
        };
        let client = GeminiClient::from_config(&config);
        assert_eq!(client.api_hostname, "http://localhost:9999");
        assert_eq!(client.api_key, "k");
        assert_eq!(client.model, "m");
    }
}
