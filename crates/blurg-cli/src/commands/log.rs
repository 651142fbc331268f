use blurg_core::{EntryStore, Registry};

use crate::commands::common::resolve_entry_text;
use crate::error::CliError;

pub fn run_log(
    registry: &Registry,
    text_parts: &[String],
    author: Option<&str>,
) -> Result<(), CliError> {
    let text = resolve_entry_text(text_parts)?;
    let (diary, id) = registry.log(&text, author)?;
    tracing::debug!(diary = diary.name(), %id, "Logged entry");

    println!("Logged to {} diary", diary.name());
    Ok(())
}
