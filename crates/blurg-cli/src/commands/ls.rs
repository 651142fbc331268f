use blurg_core::{EntryStore, Registry};

use crate::commands::common::{entry_to_list_item, format_entry_lines, EntryListItem};
use crate::error::CliError;

pub fn run_ls(registry: &Registry, author: Option<&str>, as_json: bool) -> Result<(), CliError> {
    let diary = registry.current()?;
    let entries = diary
        .list(author)
        .map_err(|error| error.in_diary(diary.name()))?;

    if as_json {
        let json_items = entries
            .iter()
            .map(entry_to_list_item)
            .collect::<Vec<EntryListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else {
        for line in format_entry_lines(&entries) {
            println!("{line}");
        }
    }

    Ok(())
}
