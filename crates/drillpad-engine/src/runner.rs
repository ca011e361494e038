use serde_json::Value;
use tracing::{debug, warn};

use drillpad_corpus::CorpusIndex;
use drillpad_generator::{Generator, GeneratorConfig};

use crate::config::EngineConfig;
use crate::memory::SessionMemory;
use crate::orchestrator::heuristic_turn;
use crate::turn::{TurnInput, TurnOutput};

const SYSTEM_PROMPT: &str = "You are an elite system design interviewer. Given the candidate's \
last answer, their diagram, and the session memory, respond with the next interviewer move. \
Be specific, quantitative, and skeptical. Output ONLY valid JSON with the fields \
interviewerMessage, intent, target, evaluation, nextActions. No prose outside the JSON object.";

/// Runs one turn: try the configured generator first, fall back to the
/// deterministic heuristic on any failure. The fallback is silent from the
/// caller's perspective; failures surface only in the logs.
pub struct TurnRunner<'a> {
    corpus: &'a CorpusIndex,
    config: EngineConfig,
    generator: Option<&'a dyn Generator>,
    generator_config: GeneratorConfig,
}

impl<'a> TurnRunner<'a> {
    pub fn new(corpus: &'a CorpusIndex, config: EngineConfig) -> Self {
        Self {
            corpus,
            config,
            generator: None,
            generator_config: GeneratorConfig::default(),
        }
    }

    pub fn with_generator(
        mut self,
        generator: &'a dyn Generator,
        generator_config: GeneratorConfig,
    ) -> Self {
        self.generator = Some(generator);
        self.generator_config = generator_config;
        self
    }

    /// Process one turn. Never fails: a broken generator, malformed generator
    /// output, or an empty message all degrade to [`heuristic_turn`]. When the
    /// generator path succeeds, the memory snapshot passes through unchanged;
    /// only the heuristic path advances it.
    pub async fn process_turn(
        &self,
        input: &TurnInput,
        memory: SessionMemory,
    ) -> (TurnOutput, SessionMemory) {
        if let Some(generator) = self.generator {
            match self.try_generator(generator, input, &memory).await {
                Some(output) => return (output, memory),
                None => {
                    debug!("Falling back to heuristic turn");
                }
            }
        }
        heuristic_turn(input, memory, self.corpus, &self.config)
    }

    async fn try_generator(
        &self,
        generator: &dyn Generator,
        input: &TurnInput,
        memory: &SessionMemory,
    ) -> Option<TurnOutput> {
        let payload = match serde_json::to_string(&GeneratorPayload { input, memory }) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "Failed to serialize turn payload");
                return None;
            }
        };

        let raw = match generator
            .generate(SYSTEM_PROMPT, &payload, &self.generator_config)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!(generator = generator.name(), error = %e, "Generator failed");
                return None;
            }
        };

        let output = parse_turn_output(&raw)?;
        if output.interviewer_message.trim().is_empty() {
            warn!(generator = generator.name(), "Generator returned an empty message");
            return None;
        }
        debug!(generator = generator.name(), "Generator turn accepted");
        Some(output)
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct GeneratorPayload<'a> {
    input: &'a TurnInput,
    memory: &'a SessionMemory,
}

/// Extract the JSON object from raw generator output: everything from the
/// first `{` to the last `}`, tolerating prose or code fences around it.
/// Unknown fields are ignored and missing fields take their defaults, so a
/// partially conforming response still counts.
fn parse_turn_output(raw: &str) -> Option<TurnOutput> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    let slice = &raw[start..=end];

    // Reject things that are JSON but not an object, like a bare string
    // containing braces.
    let value: Value = match serde_json::from_str(slice) {
        Ok(v) => v,
        Err(e) => {
            debug!(error = %e, "Generator output is not parseable JSON");
            return None;
        }
    };
    if !value.is_object() {
        return None;
    }
    match serde_json::from_value(value) {
        Ok(output) => Some(output),
        Err(e) => {
            debug!(error = %e, "Generator JSON does not match the turn contract");
            None
        }
    }
}
