use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub mod defaults;
pub mod duration_serde;

use defaults::*;

/// Which generation of the Teams client consumes the catalog
///
/// Version 1 expects a bare array of entries served from the root, version 2
/// (the "evergreen" client) expects an object wrapping the entries and URLs
/// under the evergreen asset prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TeamsVersion {
    V1,
    V2,
}

impl TeamsVersion {
    /// URL prefix the client prepends to every asset request
    pub fn url_prefix(self) -> &'static str {
        match self {
            Self::V1 => "",
            Self::V2 => "/evergreen-assets/backgroundimages",
        }
    }
}

impl TryFrom<u8> for TeamsVersion {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::V1),
            2 => Ok(Self::V2),
            other => Err(format!("unsupported teams_version {other}, expected 1 or 2")),
        }
    }
}

impl From<TeamsVersion> for u8 {
    fn from(version: TeamsVersion) -> Self {
        match version {
            TeamsVersion::V1 => 1,
            TeamsVersion::V2 => 2,
        }
    }
}

/// What the catalog does with an image whose thumbnail cannot be produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThumbnailFailurePolicy {
    /// Keep the entry and leave out its thumbnail reference
    #[default]
    Include,
    /// Leave the entry out of the catalog entirely
    Omit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_image_dir")]
    pub image_dir: PathBuf,
    #[serde(default = "default_thumbnail_dir")]
    pub thumbnail_dir: PathBuf,
    /// Bounding box (width, height) thumbnails are shrunk to fit
    #[serde(default = "default_thumbnail_size")]
    pub thumbnail_size: (u32, u32),

    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_teams_version")]
    pub teams_version: TeamsVersion,
    /// Seconds between catalog fetches by the Teams client
    #[serde(default = "default_fetch_interval")]
    pub fetch_interval: u64,
    /// Hide the backgrounds bundled with Teams
    #[serde(default = "default_ignore_teams_images")]
    pub ignore_teams_images: bool,
    /// Mirror the settings above into the Teams configuration file
    #[serde(default = "default_update_teams_config")]
    pub update_teams_config: bool,
    #[serde(default = "default_teams_config_path")]
    pub teams_config_path: PathBuf,

    #[serde(
        default = "default_thumbnail_failure_backoff",
        with = "duration_serde::duration"
    )]
    pub thumbnail_failure_backoff: Duration,
    #[serde(default)]
    pub thumbnail_failure_policy: ThumbnailFailurePolicy,
}

fn default_image_dir() -> PathBuf {
    PathBuf::from(DEFAULT_IMAGE_DIR)
}

fn default_thumbnail_dir() -> PathBuf {
    PathBuf::from(DEFAULT_THUMBNAIL_DIR)
}

fn default_thumbnail_size() -> (u32, u32) {
    DEFAULT_THUMBNAIL_SIZE
}

fn default_listen_address() -> String {
    DEFAULT_LISTEN_ADDRESS.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_teams_version() -> TeamsVersion {
    TeamsVersion::try_from(DEFAULT_TEAMS_VERSION).unwrap_or(TeamsVersion::V2)
}

fn default_fetch_interval() -> u64 {
    DEFAULT_FETCH_INTERVAL
}

fn default_ignore_teams_images() -> bool {
    DEFAULT_IGNORE_TEAMS_IMAGES
}

fn default_update_teams_config() -> bool {
    DEFAULT_UPDATE_TEAMS_CONFIG
}

fn default_teams_config_path() -> PathBuf {
    config_base_dir().join(TEAMS_CONFIG_FILE)
}

fn default_thumbnail_failure_backoff() -> Duration {
    humantime::parse_duration(DEFAULT_THUMBNAIL_FAILURE_BACKOFF).unwrap_or(Duration::from_secs(30))
}

/// Base directory for per-user configuration files
///
/// `XDG_CONFIG_DIR` wins when set, then the platform configuration directory,
/// then the current directory.
pub fn config_base_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return PathBuf::from(dir);
    }
    dirs::config_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Absolute form of `path` with `.` and `..` resolved, following symlinks when it exists
fn normalized(path: &Path) -> PathBuf {
    let absolute = std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf());

    let mut resolved = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other),
        }
    }
    resolved
}

/// Default location of teamster's own configuration file
pub fn default_config_file() -> PathBuf {
    config_base_dir().join(APP_CONFIG_FILE)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image_dir: default_image_dir(),
            thumbnail_dir: default_thumbnail_dir(),
            thumbnail_size: default_thumbnail_size(),
            listen_address: default_listen_address(),
            port: default_port(),
            teams_version: default_teams_version(),
            fetch_interval: default_fetch_interval(),
            ignore_teams_images: default_ignore_teams_images(),
            update_teams_config: default_update_teams_config(),
            teams_config_path: default_teams_config_path(),
            thumbnail_failure_backoff: default_thumbnail_failure_backoff(),
            thumbnail_failure_policy: ThumbnailFailurePolicy::default(),
        }
    }
}

impl Config {
    pub fn load_from_file(config_file: &Path) -> Result<Self> {
        let config = if config_file.exists() {
            let contents = std::fs::read_to_string(config_file)
                .with_context(|| format!("Failed to read config file {}", config_file.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", config_file.display()))?
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            if let Some(parent) = config_file.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(config_file, contents)?;
            info!("Created default config file: {}", config_file.display());
            default_config
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the catalog engine cannot work with
    pub fn validate(&self) -> Result<()> {
        let (width, height) = self.thumbnail_size;
        if width == 0 || height == 0 {
            anyhow::bail!("thumbnail_size must be non-zero, got {}x{}", width, height);
        }
        // Thumbnails inside the image directory would be scanned as images
        if normalized(&self.thumbnail_dir).starts_with(normalized(&self.image_dir)) {
            anyhow::bail!(
                "thumbnail_dir {} must not be the image_dir {} or inside it",
                self.thumbnail_dir.display(),
                self.image_dir.display()
            );
        }
        Ok(())
    }

    /// Base URL the Teams client uses to reach this service
    pub fn service_base_url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            image_dir = "/srv/backgrounds"
            teams_version = 1
            thumbnail_failure_policy = "omit"
            "#,
        )
        .unwrap();

        assert_eq!(config.image_dir, PathBuf::from("/srv/backgrounds"));
        assert_eq!(config.teams_version, TeamsVersion::V1);
        assert_eq!(config.thumbnail_failure_policy, ThumbnailFailurePolicy::Omit);
        assert_eq!(config.port, 6789);
        assert_eq!(config.thumbnail_size, (128, 128));
        assert_eq!(config.fetch_interval, 60);
        assert_eq!(config.thumbnail_failure_backoff, Duration::from_secs(30));
    }

    #[test]
    fn test_rejects_unknown_teams_version() {
        let result: Result<Config, _> = toml::from_str("teams_version = 3");
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file_writes_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let config = Config::load_from_file(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.port, DEFAULT_PORT);

        let reloaded = Config::load_from_file(&path).unwrap();
        assert_eq!(reloaded.teams_version, config.teams_version);
        assert_eq!(reloaded.thumbnail_failure_backoff, config.thumbnail_failure_backoff);
        assert_eq!(reloaded.teams_config_path, config.teams_config_path);
    }

    #[test]
    fn test_validate_rejects_zero_thumbnail_size() {
        let config = Config {
            thumbnail_size: (0, 128),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_thumbnails_inside_image_dir() {
        let temp_dir = TempDir::new().unwrap();
        let image_dir = temp_dir.path().join("bg");
        std::fs::create_dir_all(&image_dir).unwrap();

        for thumbnail_dir in [
            image_dir.clone(),
            image_dir.join(".thumbs"),
            temp_dir.path().join("other").join("..").join("bg").join("thumbs"),
        ] {
            let config = Config {
                image_dir: image_dir.clone(),
                thumbnail_dir,
                ..Config::default()
            };
            assert!(config.validate().is_err(), "{:?}", config.thumbnail_dir);
        }

        let sibling = Config {
            image_dir: image_dir.clone(),
            thumbnail_dir: temp_dir.path().join("bg-thumbs"),
            ..Config::default()
        };
        assert!(sibling.validate().is_ok());
    }

    #[test]
    fn test_service_base_url() {
        let config = Config {
            port: 7000,
            ..Config::default()
        };
        assert_eq!(config.service_base_url(), "http://localhost:7000");
    }
}
