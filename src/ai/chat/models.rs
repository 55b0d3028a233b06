//! The core models for a chat session: transcript entries, the
//! transcript itself and notices shown outside of the transcript.
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::media::ImagePayload;

pub const IMAGE_CAPTION: &str = "📷 Image sent for analysis.";

/// Time derived message identifier. Milliseconds since the epoch,
/// bumped when needed so ids are strictly increasing in insertion
/// order even within the same clock tick.
#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(i64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq)]
pub enum Origin {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "bot")]
    Bot,
}

/// A transcript entry. Messages can only be created by appending to
/// a `Transcript` and are never changed afterwards.
#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct Message {
    id: MessageId,
    text: String,
    origin: Origin,
    created_at: DateTime<Utc>,
    // Only ever set on user messages from an image turn
    #[serde(skip_serializing_if = "Option::is_none")]
    attachment: Option<ImagePayload>,
}

impl Message {
    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn is_bot(&self) -> bool {
        self.origin == Origin::Bot
    }

    pub fn attachment(&self) -> Option<&ImagePayload> {
        self.attachment.as_ref()
    }
}

/// The ordered, append only log of messages in a session.
#[derive(Clone, Debug, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transcript starting with a single bot greeting.
    pub fn seeded(greeting: &str) -> Self {
        let mut transcript = Self::new();
        transcript.push_bot(greeting);
        transcript
    }

    fn next_id(&self) -> MessageId {
        let now = Utc::now().timestamp_millis();
        match self.messages.last() {
            Some(last) if last.id.0 >= now => MessageId(last.id.0 + 1),
            _ => MessageId(now),
        }
    }

    fn push(&mut self, text: &str, origin: Origin, attachment: Option<ImagePayload>) -> &Message {
        let msg = Message {
            id: self.next_id(),
            text: text.to_string(),
            origin,
            created_at: Utc::now(),
            attachment,
        };
        self.messages.push(msg);
        &self.messages[self.messages.len() - 1]
    }

    pub fn push_user(&mut self, text: &str) -> &Message {
        self.push(text, Origin::User, None)
    }

    pub fn push_user_image(&mut self, caption: &str, payload: ImagePayload) -> &Message {
        self.push(caption, Origin::User, Some(payload))
    }

    pub fn push_bot(&mut self, text: &str) -> &Message {
        self.push(text, Origin::Bot, None)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }
}

/// An ephemeral, user facing message that is never added to the
/// transcript.
#[derive(Clone, Serialize, Debug, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn new(title: &str, message: &str) -> Self {
        Self {
            title: title.to_string(),
            message: message.to_string(),
        }
    }

    pub fn permission_denied() -> Self {
        Self::new(
            "Permission Denied",
            "You've refused to allow this app to access your photos.",
        )
    }

    pub fn text_failed() -> Self {
        Self::new(
            "Error",
            "Failed to get a reply. Please check your API key and ensure the Generative Language API is enabled.",
        )
    }

    pub fn image_failed() -> Self {
        Self::new(
            "Error",
            "Failed to analyze the image. Please check your API key and network connection.",
        )
    }

    pub fn image_unreadable(reason: &str) -> Self {
        Self::new("Error", &format!("Could not use that photo. {}", reason))
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}
