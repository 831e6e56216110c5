//! Server configuration.
//!
//! Values come from an optional TOML file with CLI flags layered on top;
//! a flag always wins over the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::accessor::HTTP_CHUNK_SIZE;

/// Settings for the `serve` subcommand.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServeConfig {
    /// Address to listen on.
    pub bind: String,

    /// Directory served as the site root.
    pub root: PathBuf,

    /// File served for `/`.
    pub index: String,

    /// Body chunk size for streamed responses.
    pub chunk_size: usize,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            root: PathBuf::from("."),
            index: "index.html".to_string(),
            chunk_size: HTTP_CHUNK_SIZE,
        }
    }
}

impl ServeConfig {
    /// Parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.chunk_size > 0, "chunk_size must be non-zero");
        anyhow::ensure!(!self.index.is_empty(), "index must be non-empty");
        Ok(())
    }
}

/// Expand a leading tilde to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();

    if path_str == "~" {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
    } else if let Some(rest) = path_str.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            home.join(rest)
        } else {
            path.to_path_buf()
        }
    } else {
        path.to_path_buf()
    }
}
