use blurg_core::Registry;

use crate::error::CliError;

/// Switch diaries. With a server URL and user, a diary that does not exist
/// yet is created on the server first and its key printed.
pub fn run_switch(
    registry: &Registry,
    name: &str,
    remote: Option<&str>,
    user: Option<&str>,
) -> Result<(), CliError> {
    let new_key = match (remote, user) {
        (Some(url), Some(user)) if !registry.exists(name) => {
            Some(registry.create_remote(name, url, user)?)
        }
        (Some(_), None) | (None, Some(_)) => {
            return Err(CliError::Config(
                "--remote and --user must be given together".to_string(),
            ));
        }
        _ => None,
    };

    registry.switch(name)?;
    println!("Switched to {name} diary.");
    if let Some(key) = new_key {
        println!("secret diary key: {key}");
    }
    Ok(())
}
