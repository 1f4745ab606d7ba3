pub mod commands;

use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use fleetgate_core::approvals::ApprovalAction;

use crate::commands::remote::{ApiTarget, API_TOKEN_ENV, API_URL_ENV, DEFAULT_API_URL};

#[derive(Debug, Parser)]
#[command(
    name = "fleetgate",
    about = "Fleetgate operator CLI",
    long_about = "Operate the vehicle booking approval service: migrations, demo data, \
                  config inspection, readiness checks and the approval queue.",
    after_help = "Examples:\n  fleetgate doctor --json\n  fleetgate seed\n  \
                  fleetgate pending --token $TOKEN\n  fleetgate approve 12"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct ApiArgs {
    #[arg(
        long,
        env = API_URL_ENV,
        default_value = DEFAULT_API_URL,
        help = "Base URL of the booking API"
    )]
    url: String,
    #[arg(
        long,
        env = API_TOKEN_ENV,
        hide_env_values = true,
        help = "Bearer token from POST /auth/login"
    )]
    token: Option<String>,
    #[arg(long, default_value_t = 10, help = "Request timeout in seconds")]
    timeout_secs: u64,
}

impl ApiArgs {
    fn target(self) -> ApiTarget {
        ApiTarget {
            url: self.url,
            token: self.token,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demo accounts, vehicles and sample bookings (idempotent)")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, database connectivity and schema version")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "List bookings waiting on the caller's decision")]
    Pending {
        #[arg(long, help = "List every pending booking (administrators only)")]
        all: bool,
        #[command(flatten)]
        api: ApiArgs,
    },
    #[command(about = "Approve the current stage of a booking")]
    Approve {
        id: i64,
        #[command(flatten)]
        api: ApiArgs,
    },
    #[command(about = "Reject a booking at its current stage")]
    Reject {
        id: i64,
        #[command(flatten)]
        api: ApiArgs,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            let (output, passed) = commands::doctor::run(json);
            commands::CommandResult { exit_code: if passed { 0 } else { 1 }, output }
        }
        Command::Pending { all, api } => commands::pending::run(&api.target(), all),
        Command::Approve { id, api } => {
            commands::decide::run(&api.target(), id, ApprovalAction::Approve)
        }
        Command::Reject { id, api } => {
            commands::decide::run(&api.target(), id, ApprovalAction::Reject)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
