//! Common types and utilities shared across catfetch crates.
//!
//! This crate holds the workspace error type and the logging initialiser so
//! that every other crate can depend on it without pulling in the HTTP or
//! rendering stacks.
//!
//! # Overview
//!
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`CatfetchError`] and [`Result`]: Shared error handling
//!
//! # Examples
//!
//! ```rust
//! use catfetch_common::{CatfetchError, Result};
//!
//! fn check(path: &str) -> Result<()> {
//!     if path.is_empty() {
//!         return Err(CatfetchError::Config("empty resource path".into()));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check("/cats").is_ok());
//! assert!(check("").is_err());
//! ```

pub mod observability;

/// Error types used across the catfetch workspace.
#[derive(thiserror::Error, Debug)]
pub enum CatfetchError {
    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The request never resolved to a response.
    #[error("Dispatch error: {0}")]
    Dispatch(String),

    /// A response body could not be parsed as its declared content type.
    #[error("Render error: {0}")]
    Render(String),

    /// A render cycle task panicked or was aborted by the runtime.
    #[error("Render cycle task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Anything else bubbling up from helpers that report through `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenient alias for results that use [`CatfetchError`].
pub type Result<T> = std::result::Result<T, CatfetchError>;
