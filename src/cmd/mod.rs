//! Subcommand dispatch and execution.
//!
//! [`dispatch`] routes the parsed CLI to the matching handler: [`run`],
//! [`init`], [`validate`], [`health`] or [`echo`]. Each handler lives in
//! its own submodule.

pub mod echo;
pub mod health;
pub mod init;
pub mod run;
pub mod validate;

use crate::cli::{Cli, Commands};
use crate::error::ForwarderError;

pub async fn dispatch(cli: Cli) -> Result<(), ForwarderError> {
    match cli.command {
        Some(Commands::Run(args)) => run::execute(*args).await,
        Some(Commands::Init(ref args)) => init::execute(args),
        Some(Commands::Validate(ref args)) => validate::execute(args),
        Some(Commands::Health(args)) => health::execute(args).await,
        Some(Commands::Echo(args)) => echo::execute(args).await,
        None => {
            print_welcome();
            Ok(())
        }
    }
}

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        "\n  forwarder v{version}: HTTP replay proxy\n\n  \
         No command provided. To get started:\n\n    \
         forwarder init                  Generate a starter config\n    \
         forwarder run                   Start the proxy (auto-detects ./forwarder.yaml)\n    \
         forwarder run -c routes.json    Start with a specific config file\n    \
         forwarder --help                See all commands and options\n"
    );
}
