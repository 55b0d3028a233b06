pub mod client;
pub mod core;
pub mod error;

pub use client::*;
pub use self::core::{GenerateContentRequest, GenerateContentResponse, generate_content};
pub use error::*;
