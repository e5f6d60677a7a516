pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "dealbot",
    about = "Dealbot operator CLI",
    long_about = "Inspect Dealbot configuration, dropdown catalogs, and runtime readiness.",
    after_help = "Examples:\n  dealbot doctor --json\n  dealbot config\n  dealbot catalog"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, messaging credentials, and CRM/LLM readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Print the dropdown catalogs the bot validates deal fields against")]
    Catalog,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Catalog => {
            commands::CommandResult { exit_code: 0, output: commands::catalog::run() }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
