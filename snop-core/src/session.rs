//! Session identity store.
//!
//! One opaque identifier per profile scopes every history call. It is created
//! on first use and then read back unchanged for as long as the storage lives.
//! Storage failures never surface: the store falls back to an identifier that
//! lives only as long as the process.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use chrono::Utc;
use uuid::Uuid;

use crate::error::SnopError;

pub const SESSION_PREFIX: &str = "snop-session-";

/// Random component plus a millisecond timestamp.
pub fn generate_session_id() -> String {
    format!(
        "{}{}-{}",
        SESSION_PREFIX,
        Uuid::new_v4().simple(),
        Utc::now().timestamp_millis()
    )
}

pub trait SessionStore: Send + Sync {
    /// Return the stored identifier, creating and persisting one if absent.
    fn get_or_create(&self) -> String;
}

/// Keeps the identifier in memory only. Used by tests and embedders without storage.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    id: Mutex<Option<String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Mutex::new(Some(id.into())),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn get_or_create(&self) -> String {
        let mut guard = self.id.lock().unwrap_or_else(|e| e.into_inner());
        guard.get_or_insert_with(generate_session_id).clone()
    }
}

/// A single file holding a single key, the profile-scoped equivalent of
/// browser local storage.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    fallback: OnceLock<String>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fallback: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored identifier, or `None` when the file is missing or blank.
    pub fn read(&self) -> Result<Option<String>, SnopError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => {
                let id = raw.trim();
                Ok((!id.is_empty()).then(|| id.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SnopError::Session(format!(
                "cannot read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    pub fn write(&self, id: &str) -> Result<(), SnopError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, id)?;
        Ok(())
    }

    fn process_fallback(&self, candidate: String) -> String {
        self.fallback.get_or_init(|| candidate).clone()
    }
}

impl SessionStore for FileSessionStore {
    fn get_or_create(&self) -> String {
        if let Some(id) = self.fallback.get() {
            return id.clone();
        }

        match self.read() {
            Ok(Some(id)) => return id,
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Session storage unavailable, using process-only id: {}", e);
                return self.process_fallback(generate_session_id());
            }
        }

        let id = generate_session_id();
        if let Err(e) = self.write(&id) {
            tracing::warn!(
                "Failed to persist session id to {}: {}",
                self.path.display(),
                e
            );
            return self.process_fallback(id);
        }
        tracing::info!("Created new chat session {}", id);
        id
    }
}
