//! Acquiring photos from the user's device for image analysis turns.
//!
//! Access to media is always gated by an explicit permission check
//! before anything is read. A successful acquisition yields an
//! `ImagePayload` that is already compressed and encoded for
//! transport so it can be inlined in a request as is.
pub mod compress;
pub mod picker;

pub use compress::{CompressionSettings, compress};
pub use picker::{FilePicker, TerminalPicker};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const JPEG_MIME_TYPE: &str = "image/jpeg";

/// An image ready to be sent inline. `data` is the base64 encoded
/// binary in the standard alphabet.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct ImagePayload {
    pub data: String,
    pub mime_type: String,
}

impl ImagePayload {
    pub fn jpeg(data: String) -> Self {
        Self {
            data,
            mime_type: JPEG_MIME_TYPE.to_string(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("Permission to access photos was denied")]
    PermissionDenied,
    // Not really an error, the user backed out of the picker
    #[error("Image selection was cancelled")]
    Cancelled,
    #[error("Could not read image: {0}")]
    Unreadable(String),
    #[error("Could not decode image: {0}")]
    Decode(String),
    #[error("Could not encode image: {0}")]
    Encode(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

/// A device media library the user can pick a photo from.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Ask for authorization to read from the media library.
    async fn request_permission(&self) -> Permission;

    /// Let the user pick an image. Returns `None` when the user
    /// cancels the picker.
    async fn pick(&self) -> Result<Option<Vec<u8>>, MediaError>;

    /// Obtain a user selected image, compressed for upload. Never
    /// touches the picker unless permission was granted.
    async fn acquire_image(
        &self,
        settings: &CompressionSettings,
    ) -> Result<ImagePayload, MediaError> {
        if self.request_permission().await == Permission::Denied {
            tracing::warn!("Media library permission denied");
            return Err(MediaError::PermissionDenied);
        }

        let bytes = self.pick().await?.ok_or(MediaError::Cancelled)?;
        tracing::debug!("Picked image of {} bytes", bytes.len());

        compress(&bytes, settings)
    }
}
