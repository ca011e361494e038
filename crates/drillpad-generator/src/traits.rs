use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while running an external generator
#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("Failed to spawn generator process: {0}")]
    SpawnFailed(#[from] std::io::Error),

    #[error("Generator timed out after {0:?}")]
    Timeout(Duration),

    #[error("Generator exited with code {0}")]
    NonZeroExit(i32),

    #[error("Generator produced no usable output")]
    EmptyOutput,

    #[error("Generator configuration error: {0}")]
    ConfigError(String),
}

/// Configuration for a generator invocation
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Hard deadline for the call. The heuristic path takes over on overrun.
    pub timeout: Duration,
    /// Additional environment variables
    pub env_vars: HashMap<String, String>,
    /// Model name to pass through (if the backend supports it)
    pub model: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            env_vars: HashMap::new(),
            model: None,
        }
    }
}

impl GeneratorConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_env(mut self, key: String, value: String) -> Self {
        self.env_vars.insert(key, value);
        self
    }
}

/// The abstraction over an optional external question generator.
///
/// Implementations receive a system prompt plus the serialized turn input and
/// return raw model text. Parsing and validation happen in the caller so a
/// malformed response can never leak to the user.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Human-readable name of the backend (e.g. "command")
    fn name(&self) -> &str;

    /// Produce raw model text for one turn
    async fn generate(
        &self,
        system_prompt: &str,
        input_json: &str,
        config: &GeneratorConfig,
    ) -> Result<String, GeneratorError>;
}
