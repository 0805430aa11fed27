//! Prompt assembly and token streaming

pub mod prompt;
pub mod streamer;

pub use prompt::PromptBuilder;
pub use streamer::{GenerationStreamer, StreamEvent, TokenStream};
