use clap::Parser;

use crate::cli::SwarmCli;

/// Initialise logging and parse the CLI for the `swarm` binary.
///
/// Logs at `info` unless `RUST_LOG` says otherwise. Exits the process on invalid flags.
pub fn init() -> SwarmCli {
    if let Err(e) =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .try_init()
    {
        eprintln!("Logging was already initialised: {e}");
    }

    SwarmCli::parse()
}
