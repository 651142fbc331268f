use blurg_core::Registry;

use crate::commands::common::format_feed_lines;
use crate::error::CliError;

pub fn run_feed(registry: &Registry, limit: usize) -> Result<(), CliError> {
    let entries = registry.feed(limit)?;
    for line in format_feed_lines(&entries) {
        println!("{line}");
    }
    Ok(())
}
