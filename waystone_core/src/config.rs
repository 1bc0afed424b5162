//! Server and view configuration.
//!
//! Loaded from `server_config.json` with support for an environment variable
//! override (`WAYSTONES_CONFIG_PATH`).

use std::{
    env, fs, io,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::Deserialize;
use thiserror::Error;
use waystone_proto::PlayerId;

pub const BUILTIN_SERVER_CONFIG: &str = include_str!("data/server_config.json");

pub const CONFIG_PATH_ENV: &str = "WAYSTONES_CONFIG_PATH";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub data_dir: PathBuf,
    /// Players holding the override capability.
    pub operators: Vec<PlayerId>,
    pub cost: CostConfig,
    pub view: ViewConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 41100),
            data_dir: PathBuf::from("waystone_data"),
            operators: Vec::new(),
            cost: CostConfig::default(),
            view: ViewConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn builtin() -> Arc<Self> {
        Arc::new(
            serde_json::from_str(BUILTIN_SERVER_CONFIG)
                .expect("builtin server config should parse"),
        )
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = ServerConfig::from_json_str(&contents)?;
        Ok(config)
    }
}

/// Experience-level cost settings for selections.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    pub blocks_per_level: f64,
    pub minimum_cost: f64,
    pub maximum_cost: f64,
    /// Flat cost when origin and target are in different dimensions.
    pub dimensional_warp_cost: f64,
    pub warp_stone_multiplier: f64,
    pub inventory_item_multiplier: f64,
    pub global_multiplier: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            blocks_per_level: 1000.0,
            minimum_cost: 0.0,
            maximum_cost: 3.0,
            dimensional_warp_cost: 3.0,
            warp_stone_multiplier: 1.0,
            inventory_item_multiplier: 1.0,
            global_multiplier: 1.0,
        }
    }
}

/// Layout numbers the list view derives its page size from.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub min_page_size: usize,
    pub content_fraction: f32,
    pub header_height: u32,
    pub footer_height: u32,
    pub entry_height: u32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            min_page_size: 4,
            content_fraction: 0.6,
            header_height: 64,
            footer_height: 25,
            entry_height: 25,
        }
    }
}

impl ViewConfig {
    /// Number of rows that fit in a viewport of the given height.
    pub fn page_fit(&self, viewport_height: u32) -> usize {
        let content = (viewport_height as f32 * self.content_fraction) as u32;
        let rows = content
            .saturating_sub(self.header_height)
            .saturating_sub(self.footer_height)
            / self.entry_height.max(1);
        rows as usize
    }

    /// `clamp(fit, minimum, list length)`; the minimum wins for short lists.
    pub fn page_size(&self, fit: usize, list_len: usize) -> usize {
        self.min_page_size.max(1).max(fit.min(list_len))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse server config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read server config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Where the active configuration came from.
#[derive(Debug, Clone)]
pub struct ConfigMetadata {
    path: Option<PathBuf>,
}

impl ConfigMetadata {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }
}

/// Load the server configuration from the override path, falling back to the
/// builtin copy when the file is missing or malformed.
pub fn load_server_config_from_env() -> (Arc<ServerConfig>, ConfigMetadata) {
    if let Some(path) = env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from) {
        match ServerConfig::from_file(&path) {
            Ok(config) => {
                tracing::info!(
                    target: "waystones::config",
                    path = %path.display(),
                    "server_config.loaded=file"
                );
                return (Arc::new(config), ConfigMetadata::new(Some(path)));
            }
            Err(err) => {
                tracing::warn!(
                    target: "waystones::config",
                    path = %path.display(),
                    error = %err,
                    "server_config.load_failed"
                );
            }
        }
    }

    let config = ServerConfig::builtin();
    tracing::info!(target: "waystones::config", "server_config.loaded=builtin");
    (config, ConfigMetadata::new(None))
}
