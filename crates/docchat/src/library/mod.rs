//! Document library: registry and consistency manager

pub mod manager;
pub mod registry;

pub use manager::LibraryManager;
pub use registry::Library;
