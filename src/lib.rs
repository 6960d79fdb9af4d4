//! Fetch Cache Library
//!
//! A node-local, versioned download cache. Remote resources are fetched once
//! per version into a cache directory shared by every process on the host and
//! copied out to the paths callers ask for. Processes coordinate through OS
//! file locks, and stale versions are cleaned up in the background.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
