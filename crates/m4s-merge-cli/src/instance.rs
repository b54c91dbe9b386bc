use std::env;
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::process;

use fs4::FileExt;
use tracing::debug;

/// Exclusive advisory lock that keeps two runs from working on the same cache
/// at once. The OS releases it when the holder exits, however it exits.
#[derive(Debug)]
pub struct InstanceLock {
    file: File,
    path: PathBuf,
}

impl InstanceLock {
    pub fn acquire(name: &str) -> io::Result<InstanceLock> {
        InstanceLock::acquire_at(&env::temp_dir().join(format!("{}.lock", name)))
    }

    pub fn acquire_at(path: &Path) -> io::Result<InstanceLock> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;

        if let Err(err) = file.try_lock_exclusive() {
            if !is_contended(&err) {
                return Err(err);
            }
            return Err(io::Error::new(
                io::ErrorKind::WouldBlock,
                format!("another instance holds {}", path.display()),
            ));
        }

        // A killed holder leaves its pid behind.
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        writeln!(file, "{}", process::id())?;
        debug!("Acquired instance lock {}", path.display());
        Ok(InstanceLock {
            file,
            path: path.to_path_buf(),
        })
    }
}

// ERROR_LOCK_VIOLATION
const WINDOWS_LOCK_VIOLATION: i32 = 33;

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || (cfg!(windows) && err.raw_os_error() == Some(WINDOWS_LOCK_VIOLATION))
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
        debug!("Released instance lock {}", self.path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_second_acquire_fails_until_release() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("m4s-merge.lock");

        let first = InstanceLock::acquire_at(&path).unwrap();
        let second = InstanceLock::acquire_at(&path);
        assert_eq!(second.unwrap_err().kind(), io::ErrorKind::WouldBlock);

        drop(first);
        assert!(InstanceLock::acquire_at(&path).is_ok());
    }

    #[test]
    fn test_leftover_lock_file_does_not_block() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("m4s-merge.lock");

        // A run killed mid-merge leaves its lock file on disk.
        fs::write(&path, "999999\n").unwrap();

        let lock = InstanceLock::acquire_at(&path).unwrap();
        assert_eq!(
            InstanceLock::acquire_at(&path).unwrap_err().kind(),
            io::ErrorKind::WouldBlock
        );
        drop(lock);

        let pid = fs::read_to_string(&path).unwrap();
        assert_eq!(pid.trim(), process::id().to_string());
    }
}
