use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Fingerprint;

/// Second-granularity UTC timestamp; lexical order matches chronological order.
const VERSION_ID_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Identifier of one archived snapshot, e.g. `20240131-235959`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(String);

impl VersionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn from_datetime(at: &DateTime<Utc>) -> Self {
        Self(at.format(VERSION_ID_FORMAT).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// HTTP cache validators used for conditional requests.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Validators {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

impl Validators {
    pub fn new(etag: Option<String>, last_modified: Option<String>) -> Self {
        Self {
            etag,
            last_modified,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.etag.is_none() && self.last_modified.is_none()
    }
}

/// Persisted watcher state. A missing or unreadable file maps to `default()`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchState {
    pub url: Option<String>,
    pub content_fingerprint: Option<Fingerprint>,
    pub validator_etag: Option<String>,
    pub validator_last_modified: Option<String>,
    /// Unix seconds of the last completed check.
    pub last_checked_at: Option<i64>,
    pub last_version_id: Option<VersionId>,
}

impl WatchState {
    pub fn validators(&self) -> Validators {
        Validators::new(
            self.validator_etag.clone(),
            self.validator_last_modified.clone(),
        )
    }

    /// Overwrites stored validators with the fresh ones; a validator the
    /// server did not send keeps its previous value.
    pub fn apply_validators(&mut self, fresh: Validators) {
        if let Some(etag) = fresh.etag {
            self.validator_etag = Some(etag);
        }
        if let Some(last_modified) = fresh.last_modified {
            self.validator_last_modified = Some(last_modified);
        }
    }
}
