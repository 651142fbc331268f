use blurg_core::Registry;

use crate::error::CliError;

pub fn run_connect(registry: &Registry, url: &str, user: &str, key: &str) -> Result<(), CliError> {
    let name = registry.connect(url, user, key)?;
    registry.switch(&name)?;
    println!("Switched to {name} diary.");
    Ok(())
}
