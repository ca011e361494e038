use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::{Generator, GeneratorConfig, GeneratorError};

/// A generator backed by an external command.
///
/// The command receives the system prompt as its first argument and the
/// serialized turn input on stdin, and is expected to print the model
/// response on stdout. Anything else is a failure the caller recovers from.
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
}

impl CommandGenerator {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}

#[async_trait]
impl Generator for CommandGenerator {
    fn name(&self) -> &str {
        "command"
    }

    async fn generate(
        &self,
        system_prompt: &str,
        input_json: &str,
        config: &GeneratorConfig,
    ) -> Result<String, GeneratorError> {
        let start = Instant::now();

        debug!(
            program = %self.program,
            timeout_secs = config.timeout.as_secs(),
            "Spawning generator process"
        );

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(system_prompt)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        for (key, value) in &config.env_vars {
            cmd.env(key, value);
        }
        if let Some(ref model) = config.model {
            cmd.env("DRILLPAD_MODEL", model);
        }

        let mut child = cmd.spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input_json.as_bytes()).await?;
            // Closing stdin signals end of input.
            drop(stdin);
        }

        let output = match timeout(config.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    program = %self.program,
                    elapsed_ms = start.elapsed().as_millis(),
                    "Generator timed out"
                );
                return Err(GeneratorError::Timeout(config.timeout));
            }
        };

        debug!(
            exit_code = output.status.code().unwrap_or(-1),
            duration_ms = start.elapsed().as_millis(),
            "Generator process completed"
        );

        if !output.status.success() {
            return Err(GeneratorError::NonZeroExit(
                output.status.code().unwrap_or(-1),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout.is_empty() {
            return Err(GeneratorError::EmptyOutput);
        }
        Ok(stdout)
    }
}
