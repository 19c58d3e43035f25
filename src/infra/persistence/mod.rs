//! Storage for the persisted authentication flag.
//!
//! Only `{ "isAuthenticated": bool }` is ever written. Users, applications
//! and wallets stay in memory for the lifetime of the session.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::domain::{AppError, AuthPersistence, PersistedAuth};

/// Keeps the flag in process memory; used when no state file is configured
#[derive(Debug, Default)]
pub struct MemoryAuthPersistence {
    state: Mutex<Option<PersistedAuth>>,
}

impl MemoryAuthPersistence {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuthPersistence for MemoryAuthPersistence {
    fn load(&self) -> Result<Option<PersistedAuth>, AppError> {
        Ok(*self.state.lock().unwrap_or_else(|p| p.into_inner()))
    }

    fn save(&self, state: PersistedAuth) -> Result<(), AppError> {
        *self.state.lock().unwrap_or_else(|p| p.into_inner()) = Some(state);
        Ok(())
    }

    fn clear(&self) -> Result<(), AppError> {
        *self.state.lock().unwrap_or_else(|p| p.into_inner()) = None;
        Ok(())
    }
}

/// JSON file holding the flag across process restarts
#[derive(Debug, Clone)]
pub struct FileAuthPersistence {
    path: PathBuf,
}

impl FileAuthPersistence {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn io_error(e: std::io::Error) -> AppError {
    AppError::Persistence(e.to_string())
}

impl AuthPersistence for FileAuthPersistence {
    fn load(&self) -> Result<Option<PersistedAuth>, AppError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(e)),
        };

        match serde_json::from_reader(BufReader::new(file)) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                // A corrupt flag file is treated as "never signed in"
                warn!(path = %self.path.display(), error = %e, "Discarding unreadable auth state");
                Ok(None)
            }
        }
    }

    fn save(&self, state: PersistedAuth) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }

        // Write to temp file first, then rename
        let temp_path = self.path.with_extension("tmp");
        {
            let file = File::create(&temp_path).map_err(io_error)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, &state)?;
            writer.flush().map_err(io_error)?;
        }
        fs::rename(&temp_path, &self.path).map_err(io_error)?;

        debug!(path = %self.path.display(), authenticated = state.is_authenticated, "Auth state saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), AppError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(e)),
        }
    }
}
