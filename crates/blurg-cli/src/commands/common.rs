use std::io::{self, IsTerminal, Read};

use blurg_core::{Entry, EntryId};
use serde::Serialize;

use crate::error::CliError;

/// Width of the name column in `blurg diaries`
const NAME_COLUMN_WIDTH: usize = 15;
const DAY_FORMAT: &str = "%m-%d-%Y";

#[derive(Debug, Serialize)]
pub struct EntryListItem {
    pub id: u64,
    pub date: String,
    pub author: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diary: Option<String>,
}

pub fn entry_to_list_item(entry: &Entry) -> EntryListItem {
    EntryListItem {
        id: entry.id.get(),
        date: entry.date_str(),
        author: entry.author.clone(),
        text: entry.body().to_string(),
        diary: entry.diary_name.clone(),
    }
}

/// Header, body and a blank separator line per entry.
pub fn format_entry_lines(entries: &[Entry]) -> Vec<String> {
    let mut lines = Vec::with_capacity(entries.len() * 3);
    for entry in entries {
        lines.push(format!(
            "[{} (#{}) by {}]",
            entry.date_str(),
            entry.id,
            entry.author
        ));
        lines.push(entry.body().to_string());
        lines.push(String::new());
    }
    lines
}

/// Feed lines carry the diary name in the header.
pub fn format_feed_lines(entries: &[Entry]) -> Vec<String> {
    let mut lines = Vec::with_capacity(entries.len() * 3);
    for entry in entries {
        lines.push(format!(
            "[{} {} (#{}) by {}]",
            entry.diary_name.as_deref().unwrap_or("?"),
            entry.date_str(),
            entry.id,
            entry.author
        ));
        lines.push(entry.body().to_string());
        lines.push(String::new());
    }
    lines
}

/// One `blurg diaries` row. `None` entries means the server could not be
/// reached.
pub fn format_diary_line(
    name: &str,
    is_current: bool,
    is_remote: bool,
    entries: Option<&[Entry]>,
) -> String {
    let label = if is_current {
        format!("* {name}")
    } else {
        name.to_string()
    };
    let summary = match entries {
        None => "(*cannot connect to server*)".to_string(),
        Some(entries) => match (entries.first(), entries.last()) {
            (Some(first), Some(last)) => format!(
                "({} entries, from {} to {})",
                entries.len(),
                first.timestamp.format(DAY_FORMAT),
                last.timestamp.format(DAY_FORMAT)
            ),
            _ => "(0 entries)".to_string(),
        },
    };
    let line = format!("{label:<width$} {summary}", width = NAME_COLUMN_WIDTH);
    if is_remote {
        format!("{line} (remote)")
    } else {
        line
    }
}

pub fn parse_entry_ids(raw_ids: &[String]) -> Result<Vec<EntryId>, CliError> {
    raw_ids
        .iter()
        .map(|raw| {
            raw.trim()
                .parse::<EntryId>()
                .map_err(|_| CliError::InvalidId(raw.clone()))
        })
        .collect()
}

pub fn resolve_entry_text(text_parts: &[String]) -> Result<String, CliError> {
    if let Some(text) = normalize_text(&text_parts.join(" ")) {
        return Ok(text);
    }

    if let Some(text) = read_piped_stdin()? {
        return Ok(text);
    }

    Err(CliError::EmptyText)
}

pub fn normalize_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_text(&buffer))
}
