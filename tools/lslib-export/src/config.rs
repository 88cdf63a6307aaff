//! lslib.toml configuration

use anyhow::{Context, Result};
use lslib_profile::GameId;
use serde::Deserialize;
use std::path::Path;

use crate::divine::ConverterSettings;

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG: &str = "lslib.toml";

/// lslib.toml structure
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub converter: ConverterSettings,
    pub export: ExportSection,
}

/// Export defaults section
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ExportSection {
    /// Target game when neither the command line nor the scene names one
    pub game: Option<GameId>,
}

impl ToolConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config: {}", path.display()))
    }

    /// Parse configuration from string
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse lslib.toml")
    }

    /// Load configuration, falling back to defaults when the file is absent
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Game used when the scene does not provide one
    pub fn default_game(&self) -> GameId {
        self.export.game.unwrap_or_default()
    }
}
