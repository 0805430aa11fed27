//! Query-time retrieval

pub mod planner;

pub use planner::{RetrievalContext, RetrievalPlanner, ScoredChunk};
