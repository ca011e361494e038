use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Represents each line type in the transcript JSONL file.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TranscriptLine {
    SessionStart {
        timestamp: DateTime<Utc>,
        session_id: String,
        pack_title: String,
    },
    Turn {
        timestamp: DateTime<Utc>,
        user_text: String,
        change_summary: String,
        interviewer_message: String,
        intent: String,
        answer_quality: u8,
        difficulty: u8,
    },
    SessionEnd {
        timestamp: DateTime<Utc>,
        turns: usize,
        covered_sections: Vec<String>,
    },
}

/// Writes interview transcripts as JSONL to ~/.local/share/drillpad/transcripts/.
pub struct TranscriptWriter {
    file: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl TranscriptWriter {
    /// Create a new TranscriptWriter. The file name combines the current UTC
    /// timestamp with a short hash of the session id.
    pub fn new(session_id: &str) -> io::Result<Self> {
        let dir = Self::transcripts_dir()?;
        Self::create_in(session_id, dir)
    }

    /// Create a TranscriptWriter in a custom directory (useful for testing).
    pub fn create_in(session_id: &str, dir: PathBuf) -> io::Result<Self> {
        fs::create_dir_all(&dir)?;

        let now = Utc::now();
        let timestamp_str = now.format("%Y-%m-%dT%H-%M-%SZ").to_string();

        let mut hasher = Sha256::new();
        hasher.update(session_id.as_bytes());
        let hash = hex::encode(hasher.finalize());
        let short_hash = &hash[..6];

        let path = dir.join(format!("{timestamp_str}_{short_hash}.jsonl"));
        let file = File::create(&path)?;

        Ok(Self {
            file: Mutex::new(BufWriter::new(file)),
            path,
        })
    }

    fn transcripts_dir() -> io::Result<PathBuf> {
        let data_dir = dirs::data_dir().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "could not determine data directory")
        })?;
        Ok(data_dir.join("drillpad").join("transcripts"))
    }

    /// Returns the path to the transcript file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line. Write failures are logged, never fatal; losing a
    /// transcript line must not break the interview.
    pub fn write(&self, line: &TranscriptLine) {
        let json = match serde_json::to_string(line) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize transcript line");
                return;
            }
        };
        let mut file = match self.file.lock() {
            Ok(file) => file,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writeln!(file, "{json}").and_then(|_| file.flush()) {
            tracing::warn!(error = %e, "Failed to write transcript line");
        }
    }
}
