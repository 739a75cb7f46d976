//! Persistence for the bearer token.
//!
//! The session store is the only component that touches a [`SessionStorage`].  The file-backed
//! implementation keeps the token in a single file; the in-memory implementation backs tests and
//! ephemeral sessions.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};

const TOKEN_FILE_NAME: &str = ".confidant-token";

/// Load, save, and clear a single persisted bearer token.
pub trait SessionStorage: Send {
    /// Return the persisted token, if any.
    fn load(&self) -> Result<Option<String>>;

    /// Persist `token`, replacing any previous value.
    fn save(&mut self, token: &str) -> Result<()>;

    /// Remove the persisted token.  Clearing an empty store succeeds.
    fn clear(&mut self) -> Result<()>;
}

/// Token storage in a single file.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Store the token at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The default token location: CONFIDANT_TOKEN_FILE if set, otherwise a dotfile in the
    /// user's home directory, otherwise a dotfile in the working directory.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = env::var("CONFIDANT_TOKEN_FILE") {
            return PathBuf::from(path);
        }
        match env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(TOKEN_FILE_NAME),
            None => PathBuf::from(TOKEN_FILE_NAME),
        }
    }

    /// Where the token lives.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                if token.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(token.to_string()))
                }
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::io(
                format!("failed to read token file {}", self.path.display()),
                err,
            )),
        }
    }

    fn save(&mut self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .map_err(|err| Error::io("failed to create token directory", err))?;
        }
        let mut file = open_private(&self.path)
            .map_err(|err| Error::io("failed to create token file", err))?;
        file.write_all(token.as_bytes())
            .map_err(|err| Error::io("failed to write token file", err))
    }

    fn clear(&mut self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::io("failed to remove token file", err)),
        }
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> io::Result<fs::File> {
    fs::File::create(path)
}

/// Token storage that lives only as long as the process.
///
/// Clones share the same slot, so a test can keep one handle and give the other to a
/// session store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    token: Arc<Mutex<Option<String>>>,
}

impl MemoryStorage {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `token`.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Arc::new(Mutex::new(Some(token.into()))),
        }
    }

    /// Peek at the current value.
    pub fn snapshot(&self) -> Option<String> {
        self.slot().clone()
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        // A poisoned slot still holds a valid Option.
        self.token.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.slot().clone())
    }

    fn save(&mut self, token: &str) -> Result<()> {
        *self.slot() = Some(token.to_string());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        *self.slot() = None;
        Ok(())
    }
}
