//! On-disk mirror of the `SYSTEM_PAUSED` config key (spec §6). The admin
//! pause/resume endpoints write both the `ConfigStore` row and this file;
//! the file lets a freshly-started process know the paused state before
//! its config cache has warmed, without adding a synchronous DB read to
//! every request path.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PauseState {
    pub paused: bool,
    pub paused_at: Option<DateTime<Utc>>,
    pub paused_by: Option<String>,
    pub reason: Option<String>,
    pub resumed_at: Option<DateTime<Utc>>,
    pub resumed_by: Option<String>,
}

impl PauseState {
    pub fn read(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Atomic write-temp-then-rename (spec §5), so a crash mid-write never
    /// leaves a half-written pause-state file for the next reader.
    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        let tmp_path = path.with_extension("tmp");
        std::fs::write(&tmp_path, serde_json::to_vec_pretty(self)?)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    pub fn paused(by: String, reason: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            paused: true,
            paused_at: Some(now),
            paused_by: Some(by),
            reason,
            resumed_at: None,
            resumed_by: None,
        }
    }

    pub fn resumed(by: String, now: DateTime<Utc>) -> Self {
        Self {
            paused: false,
            paused_at: None,
            paused_by: None,
            reason: None,
            resumed_at: Some(now),
            resumed_by: Some(by),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_disk() {
        let dir = std::env::temp_dir().join(format!("ticketops-pause-state-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("pause_state.json");

        let state = PauseState::paused("operator@example.com".to_string(), Some("maintenance".to_string()), Utc::now());
        state.write(&path).unwrap();

        let read_back = PauseState::read(&path).unwrap();
        assert!(read_back.paused);
        assert_eq!(read_back.paused_by.as_deref(), Some("operator@example.com"));
        assert_eq!(read_back.reason.as_deref(), Some("maintenance"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_file_reads_as_none() {
        let path = std::env::temp_dir().join("ticketops-pause-state-missing-marker.json");
        std::fs::remove_file(&path).ok();
        assert!(PauseState::read(&path).is_none());
    }
}
