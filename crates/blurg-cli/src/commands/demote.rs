use blurg_core::Registry;

use crate::error::CliError;

pub fn run_demote(registry: &Registry, name: &str) -> Result<(), CliError> {
    registry.demote(name)?;
    println!("Demotion was a success.");
    Ok(())
}
