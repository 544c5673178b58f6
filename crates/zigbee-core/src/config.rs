//! Service cluster configuration stored as JSON

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::fs;
use zcl_protocol::Side;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Identity and behavior switches of one service cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub cluster_id: u16,
    /// Application profile; absent means the transport picks its default
    #[serde(default)]
    pub profile_id: Option<u16>,
    pub side: Side,
    #[serde(default)]
    pub check_direction: bool,
}

impl ClusterConfig {
    #[must_use]
    pub fn new(cluster_id: u16, side: Side) -> Self {
        Self {
            cluster_id,
            profile_id: None,
            side,
            check_direction: false,
        }
    }

    #[must_use]
    pub fn with_profile(mut self, profile_id: u16) -> Self {
        self.profile_id = Some(profile_id);
        self
    }
}

/// Load a single cluster configuration
#[allow(clippy::missing_errors_doc)]
pub async fn load_config(path: &Path) -> Result<ClusterConfig, ConfigError> {
    let contents = fs::read_to_string(path).await?;
    let config: ClusterConfig = serde_json::from_str(&contents)?;
    tracing::debug!(
        "Loaded cluster {:#06x} ({:?}) config from {:?}",
        config.cluster_id,
        config.side,
        path
    );
    Ok(config)
}

/// Load a list of cluster configurations; a missing file yields an empty list
#[allow(clippy::missing_errors_doc)]
pub async fn load_configs(path: &Path) -> Result<Vec<ClusterConfig>, ConfigError> {
    match fs::read_to_string(path).await {
        Ok(contents) => {
            let configs: Vec<ClusterConfig> = serde_json::from_str(&contents)?;
            tracing::info!("Loaded {} cluster configs from {:?}", configs.len(), path);
            Ok(configs)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No cluster config file at {:?}", path);
            Ok(Vec::new())
        }
        Err(e) => Err(e.into()),
    }
}

/// Save cluster configurations atomically
#[allow(clippy::missing_errors_doc)]
pub async fn save_configs(path: &Path, configs: &[ClusterConfig]) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let json = serde_json::to_string_pretty(configs)?;

    // write to a temp file, then rename over the target
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, &json).await?;
    fs::rename(&tmp_path, path).await?;

    tracing::debug!("Saved {} cluster configs to {:?}", configs.len(), path);
    Ok(())
}
