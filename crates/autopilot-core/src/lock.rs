use crate::paths::AutopilotPaths;
use fs2::FileExt;
use std::fs::{File, OpenOptions};

/// Exclusive cycle lock backed by `.git/autopilot/LOCK`.
/// Released when dropped.
pub struct CycleLock {
    _file: File,
}

impl CycleLock {
    /// Try to acquire the cycle lock (non-blocking).
    /// Fails if another cycle holds it.
    pub fn acquire(paths: &AutopilotPaths) -> anyhow::Result<Self> {
        paths.ensure_layout()?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&paths.lock_file)
            .map_err(|e| {
                anyhow::anyhow!("cannot open lock file {}: {}", paths.lock_file.display(), e)
            })?;

        file.try_lock_exclusive().map_err(|_| {
            anyhow::anyhow!(
                "another autopilot cycle is running ({})",
                paths.lock_file.display()
            )
        })?;

        Ok(Self { _file: file })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_and_drop() {
        let tmp = tempfile::tempdir().unwrap();
        let p = AutopilotPaths::discover(tmp.path());

        let lock = CycleLock::acquire(&p).unwrap();
        assert!(CycleLock::acquire(&p).is_err());
        drop(lock);
        let _again = CycleLock::acquire(&p).unwrap();
    }
}
