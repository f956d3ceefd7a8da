//! Host-local PID lockfile, the cross-process half of the scheduler
//! singleton guard (spec §5, §9 Open Question: no cluster-wide lock, a
//! single-replica deploy is accepted). Grounded on
//! `original_source/app/utils/scheduler.py`'s `_scheduler_lock_file`.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

/// Held for the process lifetime; removes the lockfile on drop so a clean
/// shutdown doesn't leave a stale PID behind.
pub struct LockfileGuard {
    path: PathBuf,
}

impl Drop for LockfileGuard {
    fn drop(&mut self) {
        if std::fs::remove_file(&self.path).is_ok() {
            info!(path = %self.path.display(), "scheduler lockfile removed");
        }
    }
}

/// Returns `Ok(None)` if another process already holds the lockfile (its
/// PID is logged), `Ok(Some(guard))` once this process has acquired it.
pub fn acquire_lockfile(path: &Path) -> anyhow::Result<Option<LockfileGuard>> {
    if path.exists() {
        let existing_pid = std::fs::read_to_string(path).unwrap_or_default();
        warn!(pid = %existing_pid.trim(), "scheduler already running, refusing to start a second instance");
        return Ok(None);
    }

    let tmp_path = path.with_extension("tmp");
    {
        let mut tmp = std::fs::File::create(&tmp_path)?;
        write!(tmp, "{}", std::process::id())?;
        tmp.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)?;

    info!(path = %path.display(), pid = std::process::id(), "scheduler lockfile acquired");
    Ok(Some(LockfileGuard { path: path.to_path_buf() }))
}
