use blurg_core::Registry;

use crate::error::CliError;

pub fn run_wipe(registry: &Registry, name: &str) -> Result<(), CliError> {
    registry.delete(name)?;
    println!("Wiped {name}");
    Ok(())
}
