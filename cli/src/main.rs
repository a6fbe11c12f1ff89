use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod dump;
mod error;
mod hex;
mod html;
mod output;
mod render;
mod utils;

use error::{Error, Result};

#[derive(Parser)]
#[command(name = "derview")]
#[command(version, about = "Investigate ASN.1 DER encoded data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display structure in HTML
    Html {
        #[command(flatten)]
        config: html::Config,
    },
    /// Display structure as an indented tree or JSON
    Dump {
        #[command(flatten)]
        config: dump::Config,
    },
    /// Hex dump of the raw bytes
    Hexdump {
        #[command(flatten)]
        config: hex::Config,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Html { .. } => "html",
            Commands::Dump { .. } => "dump",
            Commands::Hexdump { .. } => "hexdump",
        }
    }

    fn execute(self) -> Result<()> {
        match self {
            Commands::Html { config } => html::execute(config),
            Commands::Dump { config } => dump::execute(config),
            Commands::Hexdump { config } => hex::execute(config),
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let name = cli.command.name();

    match cli.command.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("derview: {}: {}", name, e);
            if let Error::Usage(_) = e {
                let mut command = Cli::command();
                if let Some(sub) = command.find_subcommand_mut(name) {
                    let _ = sub.print_help();
                }
            }
            ExitCode::FAILURE
        }
    }
}
