//! Snapshot file persistence.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};

use toolcrib_lending::{Clock, LedgerEngine, LedgerSnapshot};

/// How long a mutating command waits for another `toolcrib` process to finish.
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(10);

const LOCK_RETRY: Duration = Duration::from_millis(50);

/// Exclusive claim on a snapshot file, held as a `<snapshot>.lock` sibling.
///
/// The lock file is removed when the guard drops.
#[derive(Debug)]
pub struct SnapshotLock {
    path: PathBuf,
    _file: File,
}

impl SnapshotLock {
    /// Wait up to `timeout` for exclusive access to the snapshot at `snapshot`.
    pub fn acquire(snapshot: &Path, timeout: Duration) -> Result<Self> {
        let path = lock_path(snapshot);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let started = Instant::now();
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok(Self { path, _file: file }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if started.elapsed() >= timeout {
                        bail!(
                            "timed out waiting for {}; remove it if no other toolcrib is running",
                            path.display()
                        );
                    }
                    thread::sleep(LOCK_RETRY);
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("failed to create {}", path.display()));
                }
            }
        }
    }
}

impl Drop for SnapshotLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release snapshot lock");
        }
    }
}

fn lock_path(snapshot: &Path) -> PathBuf {
    let mut name = OsString::from(snapshot.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}

/// Load the ledger from `path`, or start empty when the file does not exist.
pub fn load<C: Clock>(path: &Path, clock: C) -> Result<LedgerEngine<C>> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "no snapshot found; starting with an empty crib");
        return Ok(LedgerEngine::new(clock));
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    let snapshot = LedgerSnapshot::from_json(&raw)
        .with_context(|| format!("failed to parse snapshot {}", path.display()))?;
    let engine = LedgerEngine::restore(snapshot, clock)
        .with_context(|| format!("snapshot {} is inconsistent", path.display()))?;
    Ok(engine)
}

/// Write the ledger to `path`, replacing any previous snapshot atomically.
pub fn save<C: Clock>(path: &Path, engine: &LedgerEngine<C>) -> Result<()> {
    let json = engine.snapshot().to_json()?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to move snapshot into place at {}", path.display()))?;

    tracing::debug!(path = %path.display(), "snapshot saved");
    Ok(())
}

/// Run one mutation against the snapshot at `path` under [`SnapshotLock`].
///
/// The snapshot is read after the lock is taken and written back only when
/// `mutate` succeeds.
pub fn update<C, T>(
    path: &Path,
    clock: C,
    mutate: impl FnOnce(&LedgerEngine<C>) -> Result<T>,
) -> Result<T>
where
    C: Clock,
{
    let _lock = SnapshotLock::acquire(path, LOCK_TIMEOUT)?;
    let engine = load(path, clock)?;
    let out = mutate(&engine)?;
    save(path, &engine)?;
    Ok(out)
}
