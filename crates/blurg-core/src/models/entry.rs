//! Entry model

use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Display format for entry timestamps, shared with the wire protocol.
pub const ENTRY_DATE_FORMAT: &str = "%m-%d-%Y %H:%M";

/// Largest entry text, in bytes, that a diary accepts.
///
/// Local and remote diaries share the limit so every local entry can be
/// uploaded when the diary is promoted.
pub const MAX_ENTRY_BYTES: usize = 512 * 1024;

/// Identifier of an entry within one diary.
///
/// Ids start at 1 and are assigned as `max + 1` by the storing backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(u64);

impl EntryId {
    pub const FIRST: Self = Self(1);

    /// Wrap a raw id, rejecting zero.
    #[must_use]
    pub const fn new(raw: u64) -> Option<Self> {
        if raw == 0 {
            None
        } else {
            Some(Self(raw))
        }
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The following id, or `None` once ids are exhausted.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(raw) => Some(Self(raw)),
            None => None,
        }
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Text that is not a positive integer id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid entry id: {0:?}")]
pub struct ParseEntryIdError(String);

impl FromStr for EntryId {
    type Err = ParseEntryIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| ParseEntryIdError(s.to_string()))
    }
}

/// One diary record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    /// Text as stored, including the storage newline
    pub text: String,
    /// Minute-precision local time
    pub timestamp: NaiveDateTime,
    pub author: String,
    /// Set when entries from several diaries are shown together
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diary_name: Option<String>,
}

impl Entry {
    #[must_use]
    pub fn new(
        id: EntryId,
        text: impl Into<String>,
        timestamp: NaiveDateTime,
        author: impl Into<String>,
    ) -> Self {
        Self {
            id,
            text: text.into(),
            timestamp: truncate_to_minute(timestamp),
            author: author.into(),
            diary_name: None,
        }
    }

    /// Tag the entry with the diary it was read from.
    #[must_use]
    pub fn in_diary(mut self, name: impl Into<String>) -> Self {
        self.diary_name = Some(name.into());
        self
    }

    /// Text without the single trailing newline added on storage.
    #[must_use]
    pub fn body(&self) -> &str {
        self.text.strip_suffix('\n').unwrap_or(&self.text)
    }

    /// Timestamp rendered as `MM-DD-YYYY HH:MM`.
    #[must_use]
    pub fn date_str(&self) -> String {
        self.timestamp.format(ENTRY_DATE_FORMAT).to_string()
    }
}

/// Drop seconds and sub-second precision.
#[must_use]
pub fn truncate_to_minute(timestamp: NaiveDateTime) -> NaiveDateTime {
    timestamp
        .with_second(0)
        .and_then(|value| value.with_nanosecond(0))
        .unwrap_or(timestamp)
}

/// Current local time at minute precision.
#[must_use]
pub fn now_minute() -> NaiveDateTime {
    truncate_to_minute(Local::now().naive_local())
}

/// Parse a `MM-DD-YYYY HH:MM` timestamp.
pub fn parse_entry_date(value: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(value.trim(), ENTRY_DATE_FORMAT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn entry_id_rejects_zero() {
        assert!(EntryId::new(0).is_none());
        assert!("0".parse::<EntryId>().is_err());
        assert!("-3".parse::<EntryId>().is_err());
        assert_eq!("42".parse::<EntryId>().unwrap().get(), 42);
    }

    #[test]
    fn entry_id_next_stops_at_the_last_id() {
        assert_eq!(EntryId::FIRST.next(), EntryId::new(2));
        assert_eq!(EntryId::new(u64::MAX).unwrap().next(), None);
    }

    #[test]
    fn entry_timestamp_is_truncated_to_minute() {
        let entry = Entry::new(EntryId::FIRST, "hi\n", at(12, 30, 59), "alice");
        assert_eq!(entry.timestamp, at(12, 30, 0));
        assert_eq!(entry.date_str(), "01-01-2021 12:30");
    }

    #[test]
    fn body_strips_one_storage_newline() {
        let entry = Entry::new(EntryId::FIRST, "two\n\n", at(1, 0, 0), "bob");
        assert_eq!(entry.body(), "two\n");
        let bare = Entry::new(EntryId::FIRST, "bare", at(1, 0, 0), "bob");
        assert_eq!(bare.body(), "bare");
    }

    #[test]
    fn entry_date_round_trips_through_display_format() {
        let parsed = parse_entry_date("12-31-2020 23:59").unwrap();
        assert_eq!(
            parsed,
            NaiveDate::from_ymd_opt(2020, 12, 31)
                .unwrap()
                .and_hms_opt(23, 59, 0)
                .unwrap()
        );
        assert!(parse_entry_date("2020-12-31 23:59").is_err());
    }
}
