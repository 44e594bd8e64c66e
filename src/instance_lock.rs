//! Single instance lock using a Unix socket.
//!
//! Two node processes with the same device name would drive the same lines
//! and answer on the same channels. The lock is a Unix socket named after the
//! device; the OS releases it when the process dies.

use std::io;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstanceLockError {
    #[error("another node named {0:?} is already running")]
    AlreadyRunning(String),

    #[error("failed to acquire instance lock: {0}")]
    Io(#[from] io::Error),
}

/// Held for as long as the node runs; the socket file is removed on drop.
pub struct InstanceLock {
    _listener: UnixListener,
    path: PathBuf,
}

impl InstanceLock {
    /// Acquire the lock for `device_name` in the runtime directory.
    pub fn acquire(device_name: &str) -> Result<Self, InstanceLockError> {
        let dir = std::env::var("XDG_RUNTIME_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir());
        Self::acquire_in(&dir, device_name)
    }

    pub fn acquire_in(dir: &Path, device_name: &str) -> Result<Self, InstanceLockError> {
        let path = Self::socket_path(dir, device_name);

        if path.exists() {
            if UnixStream::connect(&path).is_ok() {
                return Err(InstanceLockError::AlreadyRunning(device_name.to_string()));
            }
            // Left behind by a killed process.
            let _ = std::fs::remove_file(&path);
        }

        match UnixListener::bind(&path) {
            Ok(listener) => Ok(Self {
                _listener: listener,
                path,
            }),
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                Err(InstanceLockError::AlreadyRunning(device_name.to_string()))
            }
            Err(e) => Err(InstanceLockError::Io(e)),
        }
    }

    pub fn socket_path(dir: &Path, device_name: &str) -> PathBuf {
        dir.join(format!("element-node-{}.sock", device_name))
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "element-node-lock-{}-{}",
            tag,
            uuid::Uuid::new_v4().simple()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_socket_path() {
        let path = InstanceLock::socket_path(Path::new("/run/user/1000"), "salon");
        assert_eq!(path, PathBuf::from("/run/user/1000/element-node-salon.sock"));
    }

    #[test]
    fn test_second_instance_is_refused() {
        let dir = scratch_dir("second");
        let lock = InstanceLock::acquire_in(&dir, "salon").unwrap();
        assert!(matches!(
            InstanceLock::acquire_in(&dir, "salon"),
            Err(InstanceLockError::AlreadyRunning(_))
        ));
        assert!(InstanceLock::acquire_in(&dir, "kitchen").is_ok());

        drop(lock);
        assert!(InstanceLock::acquire_in(&dir, "salon").is_ok());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
