//! Configuration default values
//!
//! This module contains all the default values for configuration options,
//! making them easily changeable in one central location.
// Storage defaults
pub const DEFAULT_IMAGE_DIR: &str = "./images";
pub const DEFAULT_THUMBNAIL_DIR: &str = "./thumbs";
pub const DEFAULT_THUMBNAIL_SIZE: (u32, u32) = (128, 128);

// Web server defaults
pub const DEFAULT_LISTEN_ADDRESS: &str = "::1";
pub const DEFAULT_PORT: u16 = 6789;

// Teams integration defaults
pub const DEFAULT_TEAMS_VERSION: u8 = 2;
pub const DEFAULT_FETCH_INTERVAL: u64 = 60;
pub const DEFAULT_IGNORE_TEAMS_IMAGES: bool = true;
pub const DEFAULT_UPDATE_TEAMS_CONFIG: bool = false;

// Thumbnail cache defaults
pub const DEFAULT_THUMBNAIL_FAILURE_BACKOFF: &str = "30s";

// Locations relative to the user's configuration directory
pub const CONFIG_DIR_ENV: &str = "XDG_CONFIG_DIR";
pub const APP_CONFIG_FILE: &str = "teamster/config.toml";
pub const TEAMS_CONFIG_FILE: &str = "teams-for-linux/config.json";
