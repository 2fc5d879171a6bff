//! Server configuration.
//!
//! Read from a YAML file (`MINIHTTP_CONFIG`, default `minihttp.yaml`).
//! Every field has a default, so a missing file or a partial file is fine:
//!
//! ```yaml
//! server:
//!   ip: 0.0.0.0
//!   port: 35000
//!   timeout_secs: 5.0
//!   keep_alive: true
//! static_files:
//!   path_prefix: /resource
//!   root: frontend
//! catalog:
//!   root_dir: pic
//! log_level: debug
//! log_file: app.log
//! ```
//!
//! `LISTEN=ip:port` in the environment overrides the bind address.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "minihttp.yaml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub static_files: Option<StaticConfig>,
    pub catalog: Option<CatalogConfig>,
    /// Default filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Log file written next to stderr; `null` disables it.
    pub log_file: Option<PathBuf>,
    /// File the config was read from, `None` when defaults were used.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub ip: String,
    pub port: u16,
    /// Bound on every individual socket read and write, and the idle
    /// timeout between keep-alive requests.
    pub timeout_secs: f64,
    pub keep_alive: bool,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StaticConfig {
    pub path_prefix: String,
    pub root: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub root_dir: PathBuf,
    pub database_file: String,
    pub json_indent: usize,
    pub path_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            static_files: None,
            catalog: None,
            log_level: "debug".to_string(),
            log_file: Some(PathBuf::from("app.log")),
            source: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ip: "0.0.0.0".to_string(),
            port: 35000,
            timeout_secs: 5.0,
            keep_alive: true,
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            path_prefix: "/resource".to_string(),
            root: PathBuf::from("frontend"),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("pic"),
            database_file: "db.json".to_string(),
            json_indent: 2,
            path_prefix: "/api".to_string(),
        }
    }
}

impl Config {
    /// Loads the file named by `MINIHTTP_CONFIG` (or the default path) and
    /// applies the `LISTEN` override.
    pub fn load() -> Result<Self> {
        let path = std::env::var("MINIHTTP_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let mut cfg = Self::from_file(Path::new(&path))?;
        if let Ok(listen) = std::env::var("LISTEN") {
            cfg.server.apply_listen(&listen)?;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Reads a YAML file; a file that does not exist yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let mut cfg = Self::from_yaml_str(&text)
            .with_context(|| format!("parse config {}", path.display()))?;
        cfg.source = Some(path.to_path_buf());
        Ok(cfg)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        // An empty document deserializes to null, not a mapping.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn validate(&self) -> Result<()> {
        let timeout = self.server.timeout_secs;
        if !timeout.is_finite() || timeout <= 0.0 {
            bail!("server.timeout_secs must be a positive number, got {timeout}");
        }
        Ok(())
    }
}

impl ServerConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    /// Per-operation timeout; falls back to the default for values
    /// `validate` would reject.
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs)
            .ok()
            .filter(|d| !d.is_zero())
            .unwrap_or(Duration::from_secs(5))
    }

    /// Replaces ip and port from an `ip:port` string.
    pub fn apply_listen(&mut self, listen: &str) -> Result<()> {
        let (ip, port) = listen
            .rsplit_once(':')
            .with_context(|| format!("LISTEN must be ip:port, got {listen:?}"))?;
        self.port = port
            .parse()
            .with_context(|| format!("invalid port in LISTEN {listen:?}"))?;
        self.ip = ip.to_string();
        Ok(())
    }
}
