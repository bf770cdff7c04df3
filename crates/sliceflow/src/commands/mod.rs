//! Command dispatch: bridges CLI args -> scenario / controller -> output.

pub mod check;
pub mod config_cmd;
pub mod resolve;
pub mod run;
pub mod slices;

use clap::CommandFactory;

use crate::cli::{Cli, Command, GlobalOpts};
use crate::config;
use crate::error::CliError;

pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    tracing::debug!(command = ?cmd, "dispatching command");
    match cmd {
        // No scenario needed
        Command::Config(args) => config_cmd::handle(args, global),
        Command::Completions(args) => {
            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "sliceflow", &mut std::io::stdout());
            Ok(())
        }

        Command::Check(args) => check::handle(&args, global),
        Command::Slices => slices::handle(&config::open_workspace(global, None)?, global),
        Command::Resolve(args) => {
            resolve::handle(&config::open_workspace(global, None)?, &args, global)
        }
        Command::Run(args) => run::handle(&config::open_workspace(global, None)?, &args).await,
    }
}
