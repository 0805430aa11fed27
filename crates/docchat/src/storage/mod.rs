//! Persistence for chat transcripts

pub mod session;

pub use session::{ChatSession, SessionStore};
