use blurg_core::Registry;

use crate::error::CliError;

pub fn run_promote(registry: &Registry, name: &str, url: &str, user: &str) -> Result<(), CliError> {
    let key = registry.promote(name, url, user)?;
    println!("Promoted {name} to a remote diary.");
    println!("secret diary key: {key}");
    Ok(())
}
