//! HTTP request handlers
//!
//! Handlers stay thin and delegate to the catalog service.

pub mod catalog;
pub mod health;
pub mod images;
pub mod index;
