mod cli;
mod handlers;
mod utils;

use clap::Parser;
use tracing::Level;

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Version => {
            println!("hsplug {}", env!("CARGO_PKG_VERSION"));
            println!("hsplug-core {}", hsplug_core::VERSION);
        }

        Command::Discover {
            timeout,
            listen,
            broadcast,
        } => handlers::handle_discover(timeout, listen, broadcast).await,

        Command::Device {
            target,
            port,
            timeout,
            mode,
            utc_offset,
            command,
        } => handlers::handle_device(target, port, timeout, mode, utc_offset, command).await,
    }
}
