//! Durable secret store backed by an env file.

use super::env_file::{EnvFile, is_valid_key_name};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access secret file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid key name: {0:?}")]
    InvalidKey(String),
}

/// Secret store owning the backing file, the in-process view of its contents,
/// and the locks that serialize writers.
///
/// Readers never take the write lock; they observe either the value before or
/// after a write, never a partial one.
#[derive(Debug)]
pub struct SecretStore {
    path: PathBuf,
    view: Arc<RwLock<HashMap<String, String>>>,
    write_lock: Arc<Mutex<()>>,
    key_locks: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SecretStore {
    /// Open the store at `path`, creating the file (and parent directories) if missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let io_err = |source| StoreError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                write_atomic(&path, "").map_err(io_err)?;
                tracing::info!(path = %path.display(), "Created secret file");
                String::new()
            }
            Err(e) => return Err(io_err(e)),
        };

        let view = EnvFile::parse(&content)
            .entries()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Ok(Self {
            path,
            view: Arc::new(RwLock::new(view)),
            write_lock: Arc::new(Mutex::new(())),
            key_locks: std::sync::Mutex::new(HashMap::new()),
        })
    }

    /// Seed the view from process environment variables for keys the file
    /// does not set. Seeded values are not written to the file.
    #[must_use]
    pub fn with_env_fallback<'a>(self, keys: impl IntoIterator<Item = &'a str>) -> Self {
        {
            let mut view = self.view.write().unwrap_or_else(PoisonError::into_inner);
            for key in keys {
                if view.contains_key(key) {
                    continue;
                }
                if let Ok(value) = std::env::var(key)
                    && !value.trim().is_empty()
                {
                    tracing::debug!(key, "Using secret from process environment");
                    view.insert(key.to_string(), value.trim().to_string());
                }
            }
        }
        self
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current value for a key. `Some("")` means the key was cleared.
    pub fn get(&self, key: &str) -> Option<String> {
        self.view
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Durably write `value` under `key` and refresh the view.
    ///
    /// Writers are serialized. The file is replaced atomically and synced
    /// on the blocking pool, and the view is refreshed in the same blocking
    /// call while the write lock is still held. Once started, a write runs
    /// to completion even if this future is dropped.
    pub async fn set_atomic(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if !is_valid_key_name(key) {
            return Err(StoreError::InvalidKey(key.to_string()));
        }

        let guard = Arc::clone(&self.write_lock).lock_owned().await;

        let path = self.path.clone();
        let view = Arc::clone(&self.view);
        let (key, value) = (key.to_string(), value.to_string());
        let write = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            replace_entry(&path, &view, key, value)
        });

        write.await.map_err(|e| StoreError::Io {
            path: self.path.clone(),
            source: io::Error::other(e),
        })?
    }

    /// Acquire the transaction guard for one key.
    ///
    /// Holders of the guard for the same key run one at a time; guards for
    /// different keys are independent. The store write lock is separate, so a
    /// held key guard never blocks writes to other keys.
    pub async fn lock_key(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.key_locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(key.to_string()).or_default())
        };
        lock.lock_owned().await
    }
}

/// Read-modify-write of one entry, then the view refresh. Blocking.
fn replace_entry(
    path: &Path,
    view: &RwLock<HashMap<String, String>>,
    key: String,
    value: String,
) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(io_err(e)),
    };

    let mut file = EnvFile::parse(&content);
    file.set(&key, &value);
    write_atomic(path, &file.render()).map_err(io_err)?;

    tracing::debug!(key = %key, cleared = value.is_empty(), "Secret written");
    view.write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(key, value);
    Ok(())
}

/// Replace `path` with `content`: temp file in the same directory, fsync, rename.
fn write_atomic(path: &Path, content: &str) -> io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;

    // Restrictive permissions on Unix
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }

    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
