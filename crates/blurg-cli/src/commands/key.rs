use blurg_core::Registry;

use crate::error::CliError;

pub fn run_key(registry: &Registry) -> Result<(), CliError> {
    let name = registry.current_name()?;
    let key = registry.key(&name)?;
    println!("secret diary key: {key}");
    Ok(())
}
