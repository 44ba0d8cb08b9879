use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::io::{DraftStorage, StorageError};
use crate::state::diff::SessionDiff;

const KEY_PREFIX: &str = "bulkedit:draft:";

/// Which user and which view a draft belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DraftScope {
    pub user_id: String,
    pub view_path: String,
}

impl DraftScope {
    pub fn new(user_id: impl Into<String>, view_path: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            view_path: view_path.into(),
        }
    }

    /// The pair is encoded as a JSON array, so separators inside either part
    /// cannot make two scopes share a key.
    pub fn key(&self) -> String {
        format!("{KEY_PREFIX}{}", json!([self.user_id, self.view_path]))
    }
}

/// Persisted layout: `{ "expires": "<RFC 3339>", "data": { row: { field: edit } } }`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DraftEntry {
    pub expires: DateTime<Utc>,
    pub data: SessionDiff,
}

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Expiring draft persistence on top of a `DraftStorage` backend.
/// Expiry is lazy: a stale entry is removed the next time it is read.
pub struct DraftStore {
    storage: Box<dyn DraftStorage>,
    clock: Box<dyn Clock>,
}

impl DraftStore {
    pub fn new(storage: impl DraftStorage + 'static) -> Self {
        Self::with_clock(storage, SystemClock)
    }

    pub fn with_clock(storage: impl DraftStorage + 'static, clock: impl Clock + 'static) -> Self {
        Self {
            storage: Box::new(storage),
            clock: Box::new(clock),
        }
    }

    pub fn get(&mut self, scope: &DraftScope) -> Result<Option<SessionDiff>, StorageError> {
        let key = scope.key();
        let Some(raw) = self.storage.read(&key)? else {
            return Ok(None);
        };

        let entry: DraftEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(%key, error = %err, "discarding malformed draft");
                self.storage.remove(&key)?;
                return Ok(None);
            }
        };

        if self.clock.now() > entry.expires {
            debug!(%key, expires = %entry.expires, "draft expired");
            self.storage.remove(&key)?;
            return Ok(None);
        }

        let mut data = entry.data;
        data.normalize();
        Ok(Some(data).filter(|data| !data.is_empty()))
    }

    /// Writes `value` with a fresh expiry, or removes the entry when `value`
    /// holds no edits.
    pub fn set(
        &mut self,
        scope: &DraftScope,
        value: &SessionDiff,
        ttl: Duration,
    ) -> Result<(), StorageError> {
        let key = scope.key();
        if value.is_empty() {
            return self.storage.remove(&key);
        }

        let entry = DraftEntry {
            expires: add_duration(self.clock.now(), ttl),
            data: value.clone(),
        };
        let json = serde_json::to_string(&entry)?;
        self.storage.write(&key, &json)
    }

    pub fn remove(&mut self, scope: &DraftScope) -> Result<(), StorageError> {
        self.storage.remove(&scope.key())
    }

    /// Sweeps every expired or unreadable draft. Returns how many were removed.
    pub fn purge_expired(&mut self) -> Result<usize, StorageError> {
        let now = self.clock.now();
        let mut removed = 0;
        for key in self.storage.keys()? {
            if !key.starts_with(KEY_PREFIX) {
                continue;
            }
            let Some(raw) = self.storage.read(&key)? else {
                continue;
            };
            let stale = serde_json::from_str::<DraftEntry>(&raw)
                .map(|entry| now > entry.expires)
                .unwrap_or(true);
            if stale {
                self.storage.remove(&key)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn add_duration(at: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(by)
        .ok()
        .and_then(|delta| at.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
