use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::GatewayError;
use crate::media::ImagePayload;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

// Object {
//     "contents": Array [
//         Object {
//             "parts": Array [
//                 Object { "text": String("Analyze this...") },
//                 Object { "inline_data": Object {
//                     "mime_type": String("image/jpeg"),
//                     "data": String("/9j/4AAQ...")
//                 } }
//             ]
//         }
//     ]
// }
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(untagged)]
pub enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

impl Part {
    pub fn text(text: &str) -> Self {
        Part::Text {
            text: text.to_string(),
        }
    }

    pub fn image(payload: &ImagePayload) -> Self {
        Part::InlineData {
            inline_data: InlineData {
                mime_type: payload.mime_type.clone(),
                data: payload.data.clone(),
            },
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Content {
    pub parts: Vec<Part>,
}

/// A single shot request, there is never more than one entry in
/// `contents` since prior turns are not sent back to the service.
#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

impl GenerateContentRequest {
    pub fn new(parts: Vec<Part>) -> Self {
        Self {
            contents: vec![Content { parts }],
        }
    }

    pub fn text(prompt: &str) -> Self {
        Self::new(vec![Part::text(prompt)])
    }

    pub fn image(instruction: &str, payload: &ImagePayload) -> Self {
        Self::new(vec![Part::text(instruction), Part::image(payload)])
    }
}

// The response is deeply nested and every level is optional as far
// as we're concerned. Anything missing is treated as empty content.
#[derive(Deserialize, Debug, Default)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug, Default)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
    #[serde(default, rename = "finishReason")]
    pub finish_reason: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug, Default)]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// The text of the first part of the first candidate, if any.
    /// An empty string counts as no text.
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
            .filter(|text| !text.is_empty())
    }
}

#[derive(Deserialize, Debug)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize, Debug)]
struct ErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()?
        .error
        .message
        .filter(|msg| !msg.is_empty())
}

/// Sends a `generateContent` request. The API key is passed as the
/// `key` query parameter.
pub async fn generate_content(
    client: &Client,
    request: &GenerateContentRequest,
    api_hostname: &str,
    api_key: &str,
    model: &str,
) -> Result<GenerateContentResponse, GatewayError> {
    let url = format!(
        "{}/v1beta/models/{}:generateContent",
        api_hostname.trim_end_matches("/"),
        model
    );
    tracing::debug!("POST {}", url);

    let response = client
        .post(url)
        .query(&[("key", api_key)])
        .header("Content-Type", "application/json")
        .json(request)
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message =
            error_message(&body).unwrap_or_else(|| format!("API error: {}", status.as_u16()));
        tracing::error!("Gemini API error {}: {}", status, body);
        return Err(GatewayError::http(status.as_u16(), message));
    }

    serde_json::from_str::<GenerateContentResponse>(&body).map_err(|e| {
        tracing::error!("Parsing Gemini response failed for {}\nError:{}", body, e);
        GatewayError::malformed(format!("Invalid response from Gemini: {}", e)).with_status(status.as_u16())
    })
}
