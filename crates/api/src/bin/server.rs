//! Server entry point: loads `SystemConfig`, wires every repository and
//! client, acquires the scheduler's PID lockfile, starts the cadence
//! scheduler, and serves the axum router (spec §5, §6, §9).

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ticketops_api::server::{build_router, AppState};
use ticketops_common::clock::SystemClock;
use ticketops_common::config::SystemConfig;
use ticketops_ingestion::WebhookIngester;
use ticketops_messaging::MessagingGatewayClient;
use ticketops_scheduler::{acquire_lockfile, Scheduler, SchedulerDeps};
use ticketops_storage::{
    CounterRepository, IncidentRepository, OperatorRepository, PostgresConfigStore, ReassignmentRepository,
    WebhookRepository,
};
use ticketops_ticketsvc::TicketSvcClient;
use ticketops_workers::{escalation, shift, sync, EscalationWorker, ShiftLifecycleWorker, SyncWorker};

#[derive(Parser)]
#[command(name = "ticketops-server")]
#[command(about = "ISP support-ticket orchestration engine")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server and the background scheduler
    Serve,
    /// Validate the configuration file and exit
    ValidateConfig,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("ticketops={level},tower_http=info")))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref().unwrap_or("info"));

    let config = SystemConfig::load(&cli.config).context("failed to load configuration")?;

    if matches!(cli.command, Some(Commands::ValidateConfig)) {
        println!("configuration is valid");
        return Ok(());
    }

    info!(bind_addr = %config.bind_addr, "starting ticket-ops server");

    let pool = ticketops_storage::connect(&config.database_url).await?;

    let incidents = Arc::new(IncidentRepository::new(pool.clone()));
    let operators = Arc::new(OperatorRepository::new(pool.clone()));
    let counters = Arc::new(CounterRepository::new(pool.clone()));
    let reassignments = Arc::new(ReassignmentRepository::new(pool.clone()));
    let webhooks = Arc::new(WebhookRepository::new(pool.clone()));
    let config_store: Arc<dyn ticketops_common::config::ConfigStore> =
        Arc::new(PostgresConfigStore::new(pool.clone()));
    let clock: Arc<dyn ticketops_common::clock::Clock> = Arc::new(SystemClock);

    let ticketsvc = Arc::new(TicketSvcClient::new(
        config.ticketsvc.base_url.clone(),
        config.ticketsvc.login.clone(),
        config.ticketsvc.password.clone(),
    ));
    let messaging = Arc::new(MessagingGatewayClient::new(
        config.messaging.base_url.clone(),
        config.messaging.api_key.clone(),
        config.messaging.instance_name.clone(),
    ));

    let ingestion = Arc::new(WebhookIngester::new(ticketops_ingestion::Deps {
        webhooks: webhooks.clone(),
        incidents: incidents.clone(),
        operators: operators.clone(),
        counters: counters.clone(),
        reassignments: reassignments.clone(),
        config: config_store.clone(),
        clock: clock.clone(),
        ticketsvc: ticketsvc.clone(),
        messaging: messaging.clone(),
        support_group_id: config.ticketsvc.support_group_id.clone(),
    }));

    let sync_worker = Arc::new(SyncWorker::new(sync::Deps {
        incidents: incidents.clone(),
        webhooks: webhooks.clone(),
        operators: operators.clone(),
        reassignments: reassignments.clone(),
        config: config_store.clone(),
        clock: clock.clone(),
        ticketsvc: ticketsvc.clone(),
        messaging: messaging.clone(),
    }));

    let escalation_worker = Arc::new(EscalationWorker::new(escalation::Deps {
        incidents: incidents.clone(),
        operators: operators.clone(),
        config: config_store.clone(),
        clock: clock.clone(),
        ticketsvc: ticketsvc.clone(),
        messaging: messaging.clone(),
        support_group_id: config.ticketsvc.support_group_id.clone(),
    }));

    let shift_worker = Arc::new(ShiftLifecycleWorker::new(shift::Deps {
        incidents: incidents.clone(),
        operators: operators.clone(),
        reassignments: reassignments.clone(),
        config: config_store.clone(),
        clock: clock.clone(),
        ticketsvc: ticketsvc.clone(),
        messaging: messaging.clone(),
    }));

    let lockfile_guard = acquire_lockfile(&config.scheduler.lockfile_path)?;
    if lockfile_guard.is_none() {
        error!("another scheduler instance holds the lockfile; starting HTTP server only");
    }

    let scheduler = Arc::new(Scheduler::new(SchedulerDeps {
        ingestion: ingestion.clone(),
        sync: sync_worker.clone(),
        escalation: escalation_worker.clone(),
        shift: shift_worker.clone(),
        counters: counters.clone(),
        config: config_store.clone(),
        clock: clock.clone(),
        support_group_id: config.ticketsvc.support_group_id.clone(),
    }));

    if lockfile_guard.is_some() {
        scheduler.start()?;
    }

    let state = AppState {
        ingestion,
        sync: sync_worker,
        escalation: escalation_worker,
        shift: shift_worker,
        config: config_store,
        pause_state_path: config.scheduler.pause_state_path.clone(),
        support_group_id: config.ticketsvc.support_group_id.clone(),
    };

    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    axum::serve(listener, router).await.context("server error")?;

    // Keeps the guard alive for the process lifetime; dropped on shutdown
    // so the lockfile is removed.
    drop(lockfile_guard);
    Ok(())
}
