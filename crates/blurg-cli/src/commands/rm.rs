use blurg_core::{EntryStore, Registry};

use crate::commands::common::parse_entry_ids;
use crate::error::CliError;

pub fn run_rm(registry: &Registry, raw_ids: &[String]) -> Result<(), CliError> {
    let ids = parse_entry_ids(raw_ids)?;
    let diary = registry.current()?;

    for id in ids {
        diary
            .remove(id)
            .map_err(|error| error.in_diary(diary.name()))?;
        println!("Removed entry {id}");
    }
    Ok(())
}
