pub mod cli;
pub mod core;
pub mod providers;

use crate::core::config::AppConfig;
use anyhow::Result;
use tracing::{debug, info};

pub enum AppCommand {
    Screen,
    List {
        search: Option<String>,
    },
    Convert {
        amount: String,
        from: Option<String>,
        to: Option<String>,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("fxconv starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let provider = providers::OpenErApiProvider::from_config(&config.provider);

    match command {
        AppCommand::Screen => cli::screen::run(&config, &provider).await,
        AppCommand::List { search } => cli::list::run(&config, &provider, search.as_deref()).await,
        AppCommand::Convert { amount, from, to } => {
            cli::convert::run(&config, &provider, &amount, from.as_deref(), to.as_deref()).await
        }
    }
}
