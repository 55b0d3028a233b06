pub mod ai;
pub mod cli;
pub mod core;
pub mod gemini;
pub mod media;
