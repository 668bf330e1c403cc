use std::fs::{File, OpenOptions};
use tracing::debug;
use crate::core::error::{Error, Result};
use crate::storage::layout::StorageLayout;

/// Single writer guarantee. Held for the lifetime of an `IndexWriter` and
/// released on drop.
pub struct FileLock {
    pub file: File,
}

impl FileLock {
    pub fn acquire(storage: &StorageLayout) -> Result<Self> {
        let lock_path = storage.lock_path();
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| Error::write_failure(format!("cannot open {}: {}", lock_path.display(), e)))?;

        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            use libc::{flock, LOCK_EX, LOCK_NB};

            let fd = file.as_raw_fd();
            // SAFETY: fd is owned by `file` and stays open while the lock is held
            if unsafe { flock(fd, LOCK_EX | LOCK_NB) } != 0 {
                return Err(Error::write_failure(format!(
                    "index at {} is locked by another writer", storage.base_dir.display()
                )));
            }
        }

        debug!(path = %lock_path.display(), "write lock acquired");
        Ok(FileLock { file })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            use libc::{flock, LOCK_UN};

            let fd = self.file.as_raw_fd();
            unsafe {
                flock(fd, LOCK_UN);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use tempfile::tempdir;

    #[test]
    fn test_second_lock_fails_until_released() {
        let dir = tempdir().unwrap();
        let storage = StorageLayout::new(dir.path().to_path_buf());
        storage.create_dirs().unwrap();

        let first = FileLock::acquire(&storage).unwrap();
        let err = FileLock::acquire(&storage).err().unwrap();
        assert_eq!(err.kind, ErrorKind::WriteFailure);

        drop(first);
        assert!(FileLock::acquire(&storage).is_ok());
    }
}
