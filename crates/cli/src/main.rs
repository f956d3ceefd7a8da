//! Operator CLI: trigger a job out of cadence, inspect or flip the
//! global pause (spec §1, §6). Server lifecycle itself is `ticketops-server`'s
//! job, not this binary's — this is strictly the remote-control client.

use clap::{Parser, Subcommand};
use ticketops_cli::ApiClient;

#[derive(Parser)]
#[command(name = "ticketops")]
#[command(about = "Ticket orchestration engine operator CLI")]
struct Cli {
    /// Base URL of the running ticketops-server
    #[arg(long, default_value = "http://localhost:8080", global = true)]
    server_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Trigger a single worker pass out of its usual cadence
    RunJob {
        /// process_webhooks, assign_unassigned, alert_overdue,
        /// end_of_shift_notifications, auto_unassign_after_shift,
        /// sync_status, or import_existing
        name: String,
    },
    /// Pause automatic assignment and mirroring
    Pause {
        /// Operator name recorded in the pause-state file
        #[arg(long)]
        actor: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Resume automatic assignment and mirroring
    Resume {
        #[arg(long)]
        actor: String,
    },
    /// Print the current pause state
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = ApiClient::new(cli.server_url);

    match cli.command {
        Commands::RunJob { name } => {
            let response = client.trigger_job(&name).await?;
            println!("{name}: success={}", response.success);
        }
        Commands::Pause { actor, reason } => {
            let response = client.pause(&actor, reason.as_deref()).await?;
            println!("paused: success={}", response.success);
        }
        Commands::Resume { actor } => {
            let response = client.resume(&actor).await?;
            println!("resumed: success={}", response.success);
        }
        Commands::Status => {
            let status = client.status().await?;
            println!("{status:#?}");
        }
    }

    Ok(())
}
