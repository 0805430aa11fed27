//! Core domain types

pub mod chat;
pub mod document;

pub use chat::{ChatMessage, Role};
pub use document::{Chunk, Document, DocumentStatus, VectorRecord};
