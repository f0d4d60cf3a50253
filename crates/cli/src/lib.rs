pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "procure",
    about = "Procure operator CLI",
    long_about = "Route purchase requests through approval, render their history, and operate the procurement database.",
    after_help = "Examples:\n  procure migrate\n  procure seed\n  procure route pr-seed-001\n  procure history pr-seed-001\n  procure doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic role holders and sample request, then verify them")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, DB connectivity, schema state, and role resolution")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Build and store the approval steps for a purchase request")]
    Route {
        #[arg(help = "Identifier of the purchase request to route")]
        request_id: String,
        #[arg(long, help = "Notify the request's subscribers with this comment after routing")]
        comment: Option<String>,
    },
    #[command(about = "Render a purchase request's display fields and stored approval steps")]
    History {
        #[arg(help = "Identifier of the purchase request to render")]
        request_id: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Route { request_id, comment } => {
            commands::route::run(&request_id, comment.as_deref())
        }
        Command::History { request_id } => commands::history::run(&request_id),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
