//! Persistence of the session counters in browser local storage.
//!
//! The record is plain JSON under `STORAGE_KEY`:
//! `{"tries":3,"success":0,"fail":3,"last":"miss","firstHitAt":null,"ended":false}`.
//! Anything that does not decode into that shape, or that breaks the counter
//! invariants, is rejected so the caller can fall back to a fresh session.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::{Outcome, SessionState};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage is not available in this environment")]
    Unavailable,
    #[error("storage access failed: {0}")]
    Access(String),
    #[error("stored record is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("stored record is inconsistent: {0}")]
    Invalid(&'static str),
    #[error("could not encode record: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Minimal string key-value store, the shape of `window.localStorage`.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// `window.localStorage` for the current origin.
pub struct LocalStorage {
    inner: web_sys::Storage,
}

impl LocalStorage {
    pub fn open() -> Result<Self, StoreError> {
        let win = web_sys::window().ok_or(StoreError::Unavailable)?;
        let inner = win
            .local_storage()
            .map_err(|e| StoreError::Access(format!("{e:?}")))?
            .ok_or(StoreError::Unavailable)?;
        Ok(Self { inner })
    }
}

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner
            .get_item(key)
            .map_err(|e| StoreError::Access(format!("{e:?}")))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner
            .set_item(key, value)
            .map_err(|e| StoreError::Access(format!("{e:?}")))
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.inner
            .remove_item(key)
            .map_err(|e| StoreError::Access(format!("{e:?}")))
    }
}

/// In-memory store. Used when local storage is blocked (private browsing,
/// sandboxed iframes) and in native tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    items: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(key: &str, value: &str) -> Self {
        let mut store = Self::new();
        store.items.insert(key.to_owned(), value.to_owned());
        store
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.items.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.items.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.items.remove(key);
        Ok(())
    }
}

// --- Record codec -------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum LastRecord {
    Hit,
    Miss,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedRecord {
    tries: u32,
    success: u32,
    fail: u32,
    #[serde(default)]
    last: Option<LastRecord>,
    #[serde(default)]
    first_hit_at: Option<u32>,
    ended: bool,
}

impl From<&SessionState> for PersistedRecord {
    fn from(s: &SessionState) -> Self {
        Self {
            tries: s.attempts,
            success: s.success_count,
            fail: s.failure_count,
            last: s.last_outcome.map(|o| match o {
                Outcome::Hit => LastRecord::Hit,
                Outcome::Miss => LastRecord::Miss,
            }),
            first_hit_at: s.first_success_attempt,
            ended: s.terminal,
        }
    }
}

impl PersistedRecord {
    fn into_state(self) -> Result<SessionState, StoreError> {
        if self.success.checked_add(self.fail) != Some(self.tries) {
            return Err(StoreError::Invalid("success + fail does not equal tries"));
        }
        if self.ended != self.first_hit_at.is_some() {
            return Err(StoreError::Invalid("ended disagrees with firstHitAt"));
        }
        match self.first_hit_at {
            Some(at) if at == 0 || at > self.tries => {
                return Err(StoreError::Invalid("firstHitAt outside 1..=tries"));
            }
            Some(_) if self.success == 0 => {
                return Err(StoreError::Invalid("firstHitAt set without a success"));
            }
            None if self.success > 0 => {
                return Err(StoreError::Invalid("success recorded without firstHitAt"));
            }
            _ => {}
        }
        let last_ok = match self.last {
            None => self.tries == 0,
            Some(LastRecord::Hit) => self.success > 0,
            Some(LastRecord::Miss) => self.fail > 0,
        };
        if !last_ok {
            return Err(StoreError::Invalid("last outcome disagrees with counters"));
        }
        Ok(SessionState {
            attempts: self.tries,
            success_count: self.success,
            failure_count: self.fail,
            last_outcome: self.last.map(|l| match l {
                LastRecord::Hit => Outcome::Hit,
                LastRecord::Miss => Outcome::Miss,
            }),
            first_success_attempt: self.first_hit_at,
            terminal: self.ended,
        })
    }
}

pub fn encode_state(state: &SessionState) -> Result<String, StoreError> {
    serde_json::to_string(&PersistedRecord::from(state)).map_err(StoreError::Serialize)
}

pub fn decode_state(raw: &str) -> Result<SessionState, StoreError> {
    let record: PersistedRecord = serde_json::from_str(raw).map_err(StoreError::Parse)?;
    record.into_state()
}

/// Reads the record under `key`. `Ok(None)` means nothing was stored.
pub fn load_state(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<SessionState>, StoreError> {
    match store.get(key)? {
        Some(raw) => decode_state(&raw).map(Some),
        None => Ok(None),
    }
}

pub fn save_state(
    store: &mut dyn KeyValueStore,
    key: &str,
    state: &SessionState,
) -> Result<(), StoreError> {
    let raw = encode_state(state)?;
    store.set(key, &raw)
}
