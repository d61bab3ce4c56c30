//! Service layer
//!
//! Services own the engine components and are handed to the web layer as
//! explicit dependencies.

pub mod catalog;

pub use catalog::{CatalogService, HealthReport, HealthStatus};
