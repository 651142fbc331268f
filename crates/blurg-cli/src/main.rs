mod cli;
mod error;

mod commands;


use blurg_core::{ClientSettings, Registry};
use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::connect::run_connect;
use crate::commands::demote::run_demote;
use crate::commands::diaries::run_diaries;
use crate::commands::feed::run_feed;
use crate::commands::key::run_key;
use crate::commands::log::run_log;
use crate::commands::ls::run_ls;
use crate::commands::promote::run_promote;
use crate::commands::rm::run_rm;
use crate::commands::switch::run_switch;
use crate::commands::wipe::run_wipe;
use crate::error::CliError;

fn main() {
    if let Err(error) = run() {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("blurg=warn".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let settings =
        ClientSettings::from_env(cli.base_dir, dirs::home_dir()).map_err(CliError::Config)?;
    let registry = Registry::open(settings)?;

    match cli.command {
        Commands::Log { text, author } => run_log(&registry, &text, author.as_deref())?,
        Commands::Rm { ids } => run_rm(&registry, &ids)?,
        Commands::Ls { author, json } => run_ls(&registry, author.as_deref(), json)?,
        Commands::Switch { name, remote, user } => {
            run_switch(&registry, &name, remote.as_deref(), user.as_deref())?;
        }
        Commands::Diaries => run_diaries(&registry)?,
        Commands::Wipe { name } => run_wipe(&registry, &name)?,
        Commands::Connect { remote, user, key } => run_connect(&registry, &remote, &user, &key)?,
        Commands::Key => run_key(&registry)?,
        Commands::Promote { name, remote, user } => {
            run_promote(&registry, &name, &remote, &user)?;
        }
        Commands::Demote { name } => run_demote(&registry, &name)?,
        Commands::Feed { limit } => run_feed(&registry, limit)?,
    }

    Ok(())
}
