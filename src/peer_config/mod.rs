//! Teams configuration synchronization
//!
//! Teams for Linux reads the custom background service address from its own
//! JSON configuration file. When enabled, a fixed set of teamster settings is
//! mirrored into that file. Every other key in the file is left untouched and
//! the file is only rewritten when a mirrored value actually differs.

use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::errors::{PeerConfigError, PeerConfigResult};
use crate::utils::write_atomic;

/// Settings mirrored into the Teams configuration, one variant per key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirroredSetting {
    ServiceBaseUrl,
    IgnoreBuiltinBackgrounds,
    FetchInterval,
}

impl MirroredSetting {
    pub const ALL: [MirroredSetting; 3] = [
        MirroredSetting::ServiceBaseUrl,
        MirroredSetting::IgnoreBuiltinBackgrounds,
        MirroredSetting::FetchInterval,
    ];

    /// Key in the Teams configuration document
    pub fn key(self) -> &'static str {
        match self {
            Self::ServiceBaseUrl => "customBGServiceBaseUrl",
            Self::IgnoreBuiltinBackgrounds => "customBGServiceIgnoreMSDefaults",
            Self::FetchInterval => "customBGServiceConfigFetchInterval",
        }
    }

    /// Value this setting takes for the given settings
    pub fn value(self, settings: &PeerSettings) -> Value {
        match self {
            Self::ServiceBaseUrl => Value::from(settings.base_url.clone()),
            Self::IgnoreBuiltinBackgrounds => Value::from(settings.ignore_teams_images),
            Self::FetchInterval => Value::from(settings.fetch_interval),
        }
    }
}

/// The subset of teamster's configuration Teams needs to know about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerSettings {
    pub base_url: String,
    pub ignore_teams_images: bool,
    pub fetch_interval: u64,
}

impl PeerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: config.service_base_url(),
            ignore_teams_images: config.ignore_teams_images,
            fetch_interval: config.fetch_interval,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Every mirrored value already matched, nothing was written
    Unchanged,
    /// The file was rewritten; Teams must be restarted to pick it up
    Updated,
}

pub struct PeerConfigSync;

impl PeerConfigSync {
    /// Merge `settings` into the Teams configuration at `path`
    ///
    /// A missing file counts as an empty document. A file that is not a JSON
    /// object is reported as malformed and left as is.
    pub async fn sync(settings: &PeerSettings, path: &Path) -> PeerConfigResult<SyncOutcome> {
        let location = path.display().to_string();
        let current = read_document(path, &location).await?;

        let mut merged = current.clone();
        for setting in MirroredSetting::ALL {
            merged.insert(setting.key().to_string(), setting.value(settings));
        }

        if merged == current {
            debug!("Teams config {} already up to date", location);
            return Ok(SyncOutcome::Unchanged);
        }

        let bytes = serde_json::to_vec_pretty(&Value::Object(merged))
            .map_err(|e| PeerConfigError::unwritable(&location, e.to_string()))?;
        write_atomic(path, bytes)
            .await
            .map_err(|e| PeerConfigError::unwritable(&location, e.to_string()))?;

        info!("Updated Teams config {}", location);
        warn!("Teams configuration changed, restart Teams for Linux to apply it");
        Ok(SyncOutcome::Updated)
    }
}

async fn read_document(path: &Path, location: &str) -> PeerConfigResult<Map<String, Value>> {
    let contents = match tokio::fs::read(path).await {
        Ok(contents) => contents,
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
            debug!("Teams config {} does not exist yet", location);
            return Ok(Map::new());
        }
        Err(e) => return Err(PeerConfigError::unwritable(location, e.to_string())),
    };

    match serde_json::from_slice(&contents) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(PeerConfigError::malformed(
            location,
            format!("expected a JSON object, found {}", json_kind(&other)),
        )),
        Err(e) => Err(PeerConfigError::malformed(location, e.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
