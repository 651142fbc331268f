//! Data models for blurg

mod entry;

pub use entry::{
    now_minute, parse_entry_date, truncate_to_minute, Entry, EntryId, ParseEntryIdError,
    ENTRY_DATE_FORMAT, MAX_ENTRY_BYTES,
};
