//! Source image discovery
//!
//! The image store walks the configured image directory, gives every accepted
//! image a stable identity and keeps the result as an immutable snapshot that
//! catalog builds read without holding any lock.

pub mod record;
pub mod store;

pub use record::{ACCEPTED_EXTENSIONS, ImageIdentity, ImageRecord};
pub use store::{ImageSnapshot, ImageStore, ScanDelta};
