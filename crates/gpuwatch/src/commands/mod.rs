//! Command handlers, one module per subcommand.

pub mod config_cmd;
pub mod fields;
pub mod watch;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Watch(args) => watch::handle(&args, global).await,
        Command::Fields => fields::handle(&mut std::io::stdout()),
        Command::Config(sub) => config_cmd::handle(&sub, global),
    }
}
