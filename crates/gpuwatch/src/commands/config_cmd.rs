//! `gpuwatch config`: show the effective configuration or its path.

use crate::cli::{ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;

pub fn handle(cmd: &ConfigCommand, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        ConfigCommand::Show => {
            let cfg = config::load(global)?;
            let rendered = cfg
                .to_toml()
                .map_err(|e| CliError::from_config(e, &config::effective_path(global)))?;
            print!("{rendered}");
        }
        ConfigCommand::Path => {
            println!("{}", config::effective_path(global).display());
        }
    }
    Ok(())
}
