//! Persisted "last successful sync" timestamp.
//!
//! Stored as a single line `yyyy-MM-dd HH:mm:ss` in UTC. Reads fall back to
//! the configured default when the file is absent or unusable; writes treat
//! permission problems as fatal and everything else as retry-next-run.

use std::io;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::state::StateSlot;

pub const CURSOR_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct SyncCursor<S> {
    slot: S,
    default_value: String,
}

impl<S: StateSlot> SyncCursor<S> {
    pub fn new(slot: S, default_value: impl Into<String>) -> Self {
        Self {
            slot,
            default_value: default_value.into(),
        }
    }

    pub fn slot(&self) -> &S {
        &self.slot
    }

    pub fn get(&self) -> Result<DateTime<Utc>> {
        match self.slot.load() {
            Ok(Some(raw)) => match parse_timestamp(&raw) {
                Some(ts) => return Ok(ts),
                None => warn!(
                    path = %self.slot.location().display(),
                    value = raw.trim(),
                    "sync cursor is unparsable, using default"
                ),
            },
            Ok(None) => debug!(
                path = %self.slot.location().display(),
                "no sync cursor yet, using default"
            ),
            Err(e) => warn!(
                path = %self.slot.location().display(),
                error = %e,
                "sync cursor is unreadable, using default"
            ),
        }

        parse_timestamp(&self.default_value).ok_or_else(|| {
            Error::config(format!(
                "sync.default_last_run '{}' is not a valid timestamp",
                self.default_value
            ))
        })
    }

    /// Persist `timestamp` in UTC. Returns whether the value was written.
    pub fn set<Tz: TimeZone>(&self, timestamp: DateTime<Tz>) -> Result<bool> {
        let value = format_timestamp(&timestamp.with_timezone(&Utc));
        match self.slot.save(&value) {
            Ok(()) => {
                debug!(cursor = %value, "sync cursor advanced");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => Err(Error::StateWrite {
                path: self.slot.location().to_path_buf(),
                source: e,
            }),
            Err(e) => {
                warn!(
                    path = %self.slot.location().display(),
                    error = %e,
                    "could not persist sync cursor; next run resumes from the previous one"
                );
                Ok(false)
            }
        }
    }
}

pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(CURSOR_FORMAT).to_string()
}

/// Accepts the canonical format, RFC 3339, or a bare date (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, CURSOR_FORMAT) {
        return Some(naive.and_utc());
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
