//! # File Lock Adapter
//!
//! Uses `fs2` for cross-platform file locking (flock on Unix, LockFileEx on
//! Windows). The store file itself is the lock subject, so every process
//! that opens the same path contends on the same lock regardless of how it
//! got the handle.

use std::fs::File;
use std::io;

use crate::ports::outbound::FileLocking;

/// Blocking whole-file exclusive lock via the platform flock primitive.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlockAdapter;

impl FileLocking for FlockAdapter {
    fn lock_exclusive(&self, file: &File) -> io::Result<()> {
        fs2::FileExt::lock_exclusive(file)
    }

    fn unlock(&self, file: &File) -> io::Result<()> {
        fs2::FileExt::unlock(file)
    }
}

/// Scope guard holding the exclusive lock for the duration of a store call.
///
/// Releases on drop, so early returns (replay detection) and error unwinds
/// leave the file unlocked.
pub struct LockGuard<'a, L: FileLocking + ?Sized> {
    locking: &'a L,
    file: &'a File,
}

impl<'a, L: FileLocking + ?Sized> LockGuard<'a, L> {
    /// Block until the exclusive lock is granted.
    pub fn acquire(locking: &'a L, file: &'a File) -> io::Result<Self> {
        locking.lock_exclusive(file)?;
        Ok(Self { locking, file })
    }
}

impl<L: FileLocking + ?Sized> Drop for LockGuard<'_, L> {
    fn drop(&mut self) {
        if let Err(err) = self.locking.unlock(self.file) {
            tracing::warn!("failed to release store lock: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::path::PathBuf;

    fn temp_file(test_name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "replay_lock_{}_{}",
            test_name,
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        path
    }

    fn open(path: &PathBuf) -> File {
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)
            .unwrap()
    }

    #[test]
    fn test_guard_excludes_second_handle() {
        let path = temp_file("excludes");
        let first = open(&path);
        let second = open(&path);

        let guard = LockGuard::acquire(&FlockAdapter, &first).unwrap();
        assert!(fs2::FileExt::try_lock_exclusive(&second).is_err());

        drop(guard);
        assert!(fs2::FileExt::try_lock_exclusive(&second).is_ok());

        fs2::FileExt::unlock(&second).unwrap();
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let path = temp_file("releases");
        let file = open(&path);

        {
            let _guard = LockGuard::acquire(&FlockAdapter, &file).unwrap();
        }

        // Reacquirable immediately after the guard scope ends.
        let _guard = LockGuard::acquire(&FlockAdapter, &file).unwrap();
        let _ = std::fs::remove_file(&path);
    }
}
