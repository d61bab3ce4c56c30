//! Centralized error handling for teamster
//!
//! Every failure the catalog engine can produce is locally recoverable: a bad
//! image degrades a single catalog entry, an unreadable image directory falls
//! back to the last good snapshot, and a failed peer sync is only reported.
//!
//! # Error Categories
//!
//! - **Catalog Errors**: image directory scanning and thumbnail generation
//! - **Peer Config Errors**: reading and rewriting the Teams configuration file
//! - **Application Errors**: configuration, I/O and HTTP mapping

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for catalog engine Results
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Convenience type alias for peer configuration Results
pub type PeerConfigResult<T> = Result<T, PeerConfigError>;
