//! Session store: the persisted bearer token and cached current user.
//!
//! # Design
//! Stores expose a small key/value contract over two keys, `token` (the raw
//! string) and `user` (the user document exactly as the server sent it). The client reads the token
//! through the store on every request build, so the store is the single
//! source of truth. Methods take `&self`; implementations use interior
//! mutability so one store can be shared behind an `Arc`.

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::SessionError;
use crate::types::{Document, User};

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

/// Persisted login state consulted by `NotflixClient`.
pub trait SessionStore {
    /// The current bearer token, if logged in.
    fn token(&self) -> Result<Option<String>, SessionError>;

    /// The cached current-user record, if logged in.
    fn user(&self) -> Result<Option<Document<User>>, SessionError>;

    /// Store both keys, replacing any previous session.
    fn set(&self, token: &str, user: &Document<User>) -> Result<(), SessionError>;

    /// Replace the cached user, leaving the token alone.
    fn set_user(&self, user: &Document<User>) -> Result<(), SessionError>;

    /// Remove every persisted key.
    fn clear(&self) -> Result<(), SessionError>;
}

impl<S: SessionStore + ?Sized> SessionStore for Arc<S> {
    fn token(&self) -> Result<Option<String>, SessionError> {
        (**self).token()
    }

    fn user(&self) -> Result<Option<Document<User>>, SessionError> {
        (**self).user()
    }

    fn set(&self, token: &str, user: &Document<User>) -> Result<(), SessionError> {
        (**self).set(token, user)
    }

    fn set_user(&self, user: &Document<User>) -> Result<(), SessionError> {
        (**self).set_user(user)
    }

    fn clear(&self) -> Result<(), SessionError> {
        (**self).clear()
    }
}

type Entries = BTreeMap<String, String>;

fn token_from(entries: &Entries) -> Option<String> {
    entries.get(TOKEN_KEY).filter(|t| !t.is_empty()).cloned()
}

fn user_from(entries: &Entries) -> Result<Option<Document<User>>, SessionError> {
    entries
        .get(USER_KEY)
        .map(|raw| serde_json::from_str(raw).map_err(|e| SessionError::Corrupt(e.to_string())))
        .transpose()
}

fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, SessionError> {
    serde_json::to_string(value).map_err(|e| SessionError::Serialize(e.to_string()))
}

/// In-process store. Lost when the process exits.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: RwLock<Entries>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value of `key`, as a browser storage `getItem` would return it.
    pub fn get_raw(&self, key: &str) -> Result<Option<String>, SessionError> {
        let entries = self.entries.read().map_err(|_| SessionError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    pub fn is_empty(&self) -> Result<bool, SessionError> {
        let entries = self.entries.read().map_err(|_| SessionError::Poisoned)?;
        Ok(entries.is_empty())
    }
}

impl SessionStore for MemorySessionStore {
    fn token(&self) -> Result<Option<String>, SessionError> {
        let entries = self.entries.read().map_err(|_| SessionError::Poisoned)?;
        Ok(token_from(&entries))
    }

    fn user(&self) -> Result<Option<Document<User>>, SessionError> {
        let entries = self.entries.read().map_err(|_| SessionError::Poisoned)?;
        user_from(&entries)
    }

    fn set(&self, token: &str, user: &Document<User>) -> Result<(), SessionError> {
        let encoded = encode(user)?;
        let mut entries = self.entries.write().map_err(|_| SessionError::Poisoned)?;
        entries.insert(TOKEN_KEY.to_string(), token.to_string());
        entries.insert(USER_KEY.to_string(), encoded);
        Ok(())
    }

    fn set_user(&self, user: &Document<User>) -> Result<(), SessionError> {
        let encoded = encode(user)?;
        let mut entries = self.entries.write().map_err(|_| SessionError::Poisoned)?;
        entries.insert(USER_KEY.to_string(), encoded);
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        self.entries.write().map_err(|_| SessionError::Poisoned)?.clear();
        Ok(())
    }
}

/// Store backed by a JSON object file, so a session survives restarts.
///
/// Every operation re-reads the file; a missing file is an empty session.
/// Writes go to a uniquely named sibling temp file first and are renamed into
/// place, so readers in any process see either the old or the new session.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Entries, SessionError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(Entries::new()),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| SessionError::Corrupt(e.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, entries: &Entries) -> Result<(), SessionError> {
        let raw = encode(entries)?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(raw.as_bytes())?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut Entries)) -> Result<(), SessionError> {
        let _guard = self.lock.lock().map_err(|_| SessionError::Poisoned)?;
        let mut entries = self.load()?;
        apply(&mut entries);
        self.store(&entries)
    }
}

impl SessionStore for FileSessionStore {
    fn token(&self) -> Result<Option<String>, SessionError> {
        let _guard = self.lock.lock().map_err(|_| SessionError::Poisoned)?;
        Ok(token_from(&self.load()?))
    }

    fn user(&self) -> Result<Option<Document<User>>, SessionError> {
        let _guard = self.lock.lock().map_err(|_| SessionError::Poisoned)?;
        user_from(&self.load()?)
    }

    fn set(&self, token: &str, user: &Document<User>) -> Result<(), SessionError> {
        let encoded = encode(user)?;
        self.update(|entries| {
            entries.insert(TOKEN_KEY.to_string(), token.to_string());
            entries.insert(USER_KEY.to_string(), encoded);
        })?;
        debug!(path = %self.path.display(), "session written");
        Ok(())
    }

    fn set_user(&self, user: &Document<User>) -> Result<(), SessionError> {
        let encoded = encode(user)?;
        self.update(|entries| {
            entries.insert(USER_KEY.to_string(), encoded);
        })
    }

    fn clear(&self) -> Result<(), SessionError> {
        let _guard = self.lock.lock().map_err(|_| SessionError::Poisoned)?;
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        debug!(path = %self.path.display(), "session cleared");
        Ok(())
    }
}
