//! Project configuration file support for drillpad.
//!
//! Loads configuration from `drillpad.toml` in the working directory.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use drillpad_engine::EngineConfig;
use drillpad_generator::{CommandGenerator, GeneratorConfig};

/// The config file name
pub const CONFIG_FILE_NAME: &str = "drillpad.toml";

/// Project-level configuration loaded from `drillpad.toml`
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Corpus chunks file (JSON array) used for retrieval
    pub corpus: Option<String>,
    /// Engine tuning knobs
    #[serde(default)]
    pub engine: EngineConfig,
    /// Optional external generator backend
    #[serde(default)]
    pub generator: GeneratorSettings,
}

/// External generator backend. When `command` is unset the engine runs the
/// heuristic path only.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct GeneratorSettings {
    /// Program to invoke for generated turns
    pub command: Option<String>,
    /// Extra arguments passed before the system prompt
    #[serde(default)]
    pub args: Vec<String>,
    /// Hard deadline in seconds before falling back to the heuristic
    pub timeout_secs: Option<u64>,
    /// Model name forwarded to the backend
    pub model: Option<String>,
}

impl ProjectConfig {
    /// Load configuration from the working directory.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(working_dir: &Path) -> Result<Option<Self>> {
        let config_path = working_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(Some(config))
    }

    /// Build the generator from config, if one is configured.
    pub fn generator(&self) -> Option<(CommandGenerator, GeneratorConfig)> {
        let command = self.generator.command.as_deref()?;
        let backend = CommandGenerator::new(command).with_args(self.generator.args.clone());

        let mut config = GeneratorConfig::default();
        if let Some(secs) = self.generator.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(model) = &self.generator.model {
            config = config.with_model(model.clone());
        }
        Some((backend, config))
    }
}
