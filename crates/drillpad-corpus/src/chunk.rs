use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// A pre-segmented unit of corpus text. Produced by the offline corpus build;
/// this crate only consumes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    #[serde(default)]
    pub doc_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Top-N keywords extracted at build time. Strongest retrieval signal.
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub text: String,
}

/// A scored retrieval result. Ephemeral: recomputed per query, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub id: String,
    pub title: String,
    pub tags: Vec<String>,
    pub text: String,
    pub score: i64,
}

/// Load a chunk file (a JSON array of chunks) from disk.
pub fn load_chunks(path: &Path) -> Result<Vec<Chunk>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read chunk file {}", path.display()))?;
    let chunks: Vec<Chunk> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse chunk file {}", path.display()))?;
    Ok(chunks)
}
