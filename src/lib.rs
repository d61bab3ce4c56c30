//! teamster: custom background service for Teams for Linux
//!
//! Serves a catalog of local background images with lazily generated,
//! persisted thumbnails, and optionally points the Teams configuration at
//! this service.

pub mod assets;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod images;
pub mod peer_config;
pub mod services;
pub mod thumbnails;
pub mod utils;
pub mod web;
