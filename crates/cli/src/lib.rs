pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "leadly",
    about = "Leadly operator CLI",
    long_about = "Classify customer replies, inspect effective configuration, and check provider readiness.",
    after_help = "Examples:\n  leadly classify --lead-id L-100 --name \"Dana Reyes\" --org \"Harbor Labs\" --program \"Spring Cohort\" reply.txt\n  leadly config\n  leadly doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Classify one reply through the keyword fast path and AI fallback chain"
    )]
    Classify(ClassifyArgs),
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config and report provider credential readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

#[derive(Debug, clap::Args)]
pub struct ClassifyArgs {
    #[arg(help = "File holding the raw reply text; reads stdin when omitted")]
    pub reply_file: Option<PathBuf>,
    #[arg(long, help = "Lead identifier in the record store")]
    pub lead_id: String,
    #[arg(long, help = "Lead's name, embedded in the classification prompt")]
    pub name: String,
    #[arg(long = "org", help = "Lead's organization")]
    pub organization: String,
    #[arg(long, help = "Program or offering the lead was quoted for")]
    pub program: String,
    #[arg(long, help = "Email subject line, if any")]
    pub subject: Option<String>,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Classify(args) => commands::classify::run(&args),
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
