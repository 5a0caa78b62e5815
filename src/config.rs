//! Worker configuration.
//!
//! Loaded from a TOML file; every section has defaults so an empty file (or
//! no file at all) yields a working loopback setup.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Default port of the host's call gateway.
pub const DEFAULT_GATEWAY_PORT: u16 = 25333;

/// Default port of the worker's callback listener.
pub const DEFAULT_CALLBACK_PORT: u16 = 25334;

/// Interface the harvesting worker registers under.
pub const HARVEST_INTERFACE: &str = "udem.taln.wrapper.ACLInterface";

/// Interface the embedding worker registers under.
pub const EMBEDDING_INTERFACE: &str = "udem.taln.wrapper.vectors.VecInterface";

/// Top-level worker configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub harvest: HarvestConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

/// Gateway connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Loopback address shared by the gateway and the callback listener
    #[serde(default = "default_address")]
    pub address: String,
    /// Port of the host's gateway
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    /// Port the worker listens on for calls; 0 picks an ephemeral port
    #[serde(default = "default_callback_port")]
    pub callback_port: u16,
    /// How long to wait for the gateway to accept the connection
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_gateway_port(),
            callback_port: default_callback_port(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl GatewayConfig {
    pub fn gateway_addr(&self) -> Result<SocketAddr> {
        parse_addr(&self.address, self.port)
    }

    pub fn callback_addr(&self) -> Result<SocketAddr> {
        parse_addr(&self.address, self.callback_port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Harvesting worker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    #[serde(default = "default_harvest_interface")]
    pub interface: String,
    /// File or directory holding the raw corpus records
    #[serde(default = "default_corpus_path")]
    pub corpus_path: PathBuf,
    /// Open the corpus before registering instead of on the first call
    #[serde(default)]
    pub preload: bool,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            interface: default_harvest_interface(),
            corpus_path: default_corpus_path(),
            preload: false,
        }
    }
}

/// Embedding worker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_interface")]
    pub interface: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Where downloaded model files are kept
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub show_download_progress: bool,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            interface: default_embedding_interface(),
            model: default_model(),
            cache_dir: None,
            show_download_progress: true,
        }
    }
}

fn default_address() -> String {
    "127.0.0.1".to_string()
}
fn default_gateway_port() -> u16 {
    DEFAULT_GATEWAY_PORT
}
fn default_callback_port() -> u16 {
    DEFAULT_CALLBACK_PORT
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_harvest_interface() -> String {
    HARVEST_INTERFACE.to_string()
}
fn default_corpus_path() -> PathBuf {
    PathBuf::from("data/anthology")
}
fn default_embedding_interface() -> String {
    EMBEDDING_INTERFACE.to_string()
}
fn default_model() -> String {
    crate::embedding::DEFAULT_MODEL.to_string()
}
fn default_true() -> bool {
    true
}

fn parse_addr(address: &str, port: u16) -> Result<SocketAddr> {
    format!("{}:{}", address, port)
        .parse()
        .map_err(|e| Error::Config(format!("invalid address '{}:{}': {}", address, port, e)))
}

impl WorkerConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: WorkerConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty TOML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.gateway.port == 0 {
            return Err(Error::Config("gateway.port must be greater than 0".to_string()));
        }
        self.gateway.gateway_addr()?;
        if self.harvest.interface.trim().is_empty() {
            return Err(Error::Config("harvest.interface must not be empty".to_string()));
        }
        if self.embedding.interface.trim().is_empty() {
            return Err(Error::Config(
                "embedding.interface must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
