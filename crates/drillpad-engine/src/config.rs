use serde::{Deserialize, Serialize};

use crate::topics::NoOpPolicy;

/// Thematic lenses appended to retried retrieval queries so a rejected
/// question comes back from a different direction.
pub const ANGLES: [&str; 5] = ["ops", "failure", "metrics", "tradeoff", "cost"];

/// Tunable knobs of the turn orchestrator. Defaults match the shipped
/// behavior; callers override via their config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Bounded-retry budget for the anti-repeat ladder.
    pub max_attempts: usize,
    /// How many chunks each retrieval pulls for the composer to window over.
    pub retrieval_k: usize,
    pub no_op: NoOpPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retrieval_k: 10,
            no_op: NoOpPolicy::default(),
        }
    }
}
