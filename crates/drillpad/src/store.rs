use std::fs::{File, OpenOptions};
use std::path::PathBuf;

use anyhow::{Context, Result};

use drillpad_engine::SessionMemory;

/// Exclusive advisory lock on a session, held across one turn's
/// read-modify-write. Advisory file locks serialize concurrent `drillpad`
/// processes on the same session, not just tasks inside one process.
pub struct SessionLock {
    #[allow(dead_code)]
    file: File,
    lock_path: PathBuf,
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        // The lock releases with the file handle; removing the marker file
        // is best effort.
        let _ = std::fs::remove_file(&self.lock_path);
    }
}

/// Persists session memory as one JSON file per session id.
pub struct StateStore {
    sessions_dir: PathBuf,
}

impl StateStore {
    /// Create a StateStore using the default data directory.
    pub fn new() -> Result<Self> {
        let data_dir = dirs::data_dir().with_context(|| "Could not determine data directory")?;
        let sessions_dir = data_dir.join("drillpad").join("sessions");
        Ok(Self { sessions_dir })
    }

    /// Create a StateStore with a custom directory (useful for testing).
    pub fn with_dir(sessions_dir: PathBuf) -> Self {
        Self { sessions_dir }
    }

    pub fn sessions_dir(&self) -> &PathBuf {
        &self.sessions_dir
    }

    fn session_path(&self, id: &str) -> PathBuf {
        // File-system safe session file name.
        let safe: String = id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.sessions_dir.join(format!("{safe}.json"))
    }

    /// Acquire the per-session lock, blocking until any other holder (in this
    /// process or another) releases it. Hold the guard across load/save so two
    /// turns on the same session can't interleave.
    pub fn lock_session(&self, id: &str) -> Result<SessionLock> {
        std::fs::create_dir_all(&self.sessions_dir).with_context(|| {
            format!("Failed to create sessions dir: {}", self.sessions_dir.display())
        })?;
        let lock_path = self.session_path(id).with_extension("lock");
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .open(&lock_path)
            .with_context(|| format!("Failed to open session lock: {}", lock_path.display()))?;

        #[cfg(unix)]
        {
            use fs2::FileExt;
            file.lock_exclusive()
                .with_context(|| format!("Failed to lock session: {}", lock_path.display()))?;
        }

        Ok(SessionLock { file, lock_path })
    }

    /// Load the memory for a session, or a fresh one if none exists yet.
    pub fn load(&self, id: &str) -> Result<SessionMemory> {
        let path = self.session_path(id);
        if !path.exists() {
            return Ok(SessionMemory::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read session state: {}", path.display()))?;
        let memory = serde_json::from_str(&content)
            .with_context(|| format!("Corrupt session state: {}", path.display()))?;
        Ok(memory)
    }

    /// Persist the memory for a session.
    pub fn save(&self, id: &str, memory: &SessionMemory) -> Result<()> {
        std::fs::create_dir_all(&self.sessions_dir).with_context(|| {
            format!("Failed to create sessions dir: {}", self.sessions_dir.display())
        })?;
        let path = self.session_path(id);
        let content = serde_json::to_string_pretty(memory)?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write session state: {}", path.display()))?;
        Ok(())
    }

    /// Remove a session's state. Missing state is not an error.
    pub fn reset(&self, id: &str) -> Result<()> {
        let path = self.session_path(id);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove session state: {}", path.display()))?;
        }
        Ok(())
    }
}
