use blurg_core::{EntryStore, Registry};

use crate::commands::common::format_diary_line;
use crate::error::CliError;

pub fn run_diaries(registry: &Registry) -> Result<(), CliError> {
    let current = registry.current_name()?;
    let listing = registry.diaries()?;

    for diary in &listing.local {
        let entries = diary
            .list(None)
            .map_err(|error| error.in_diary(diary.name()))?;
        println!(
            "{}",
            format_diary_line(diary.name(), diary.name() == current, false, Some(entries.as_slice()))
        );
    }

    for diary in &listing.remote {
        let entries = match diary.list(None) {
            Ok(entries) => Some(entries),
            Err(error) if error.is_unreachable() => {
                tracing::debug!(diary = diary.name(), %error, "Server unreachable");
                None
            }
            Err(error) => return Err(error.in_diary(diary.name()).into()),
        };
        println!(
            "{}",
            format_diary_line(
                diary.name(),
                diary.name() == current,
                true,
                entries.as_deref()
            )
        );
    }

    Ok(())
}
