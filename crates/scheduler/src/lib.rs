//! Singleton-guarded periodic scheduler (spec §4.K), grounded on
//! `original_source/app/utils/scheduler.py`'s `init_scheduler`: one
//! `tokio::time::interval` loop per cadence row, each gated the same way
//! the original gates its APScheduler jobs (working hours, weekday,
//! pause state, config-driven reset hours).

pub mod lockfile;
pub mod pause_state;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, instrument};

use ticketops_common::clock::{in_working_hours, parse_hhmm_to_minute, Clock};
use ticketops_common::config::{defaults, keys, ConfigStore};
use ticketops_ingestion::WebhookIngester;
use ticketops_storage::CounterRepository;
use ticketops_workers::{EscalationWorker, ShiftLifecycleWorker, SyncWorker};

pub use lockfile::{acquire_lockfile, LockfileGuard};
pub use pause_state::PauseState;

/// Process-local guard against a double `Scheduler::start` (spec §5: the
/// scheduler is a process-local singleton, not a cluster-wide one).
static STARTED: AtomicBool = AtomicBool::new(false);

pub struct Scheduler {
    ingestion: Arc<WebhookIngester>,
    sync: Arc<SyncWorker>,
    escalation: Arc<EscalationWorker>,
    shift: Arc<ShiftLifecycleWorker>,
    counters: Arc<CounterRepository>,
    config: Arc<dyn ConfigStore>,
    clock: Arc<dyn Clock>,
    support_group_id: String,
}

pub struct SchedulerDeps {
    pub ingestion: Arc<WebhookIngester>,
    pub sync: Arc<SyncWorker>,
    pub escalation: Arc<EscalationWorker>,
    pub shift: Arc<ShiftLifecycleWorker>,
    pub counters: Arc<CounterRepository>,
    pub config: Arc<dyn ConfigStore>,
    pub clock: Arc<dyn Clock>,
    pub support_group_id: String,
}

impl Scheduler {
    pub fn new(deps: SchedulerDeps) -> Self {
        Self {
            ingestion: deps.ingestion,
            sync: deps.sync,
            escalation: deps.escalation,
            shift: deps.shift,
            counters: deps.counters,
            config: deps.config,
            clock: deps.clock,
            support_group_id: deps.support_group_id,
        }
    }

    /// Spawns every cadence job as a background task. Returns an error if
    /// a scheduler has already been started in this process (the
    /// in-process half of the singleton guard; the other half is the PID
    /// lockfile acquired separately via [`acquire_lockfile`]).
    #[instrument(skip(self))]
    pub fn start(self: Arc<Self>) -> anyhow::Result<()> {
        if STARTED.swap(true, Ordering::SeqCst) {
            anyhow::bail!("scheduler already started in this process");
        }

        info!("starting ticket-ops scheduler, timezone America/Argentina/Buenos_Aires");

        self.clone().spawn_interval("process_webhooks", 3 * 60, {
            let this = self.clone();
            move || {
                let this = this.clone();
                async move { this.run_process_webhooks().await }
            }
        });

        self.clone().spawn_interval("assign_unassigned", 3 * 60, {
            let this = self.clone();
            move || {
                let this = this.clone();
                async move { this.run_assign_unassigned().await }
            }
        });

        self.clone().spawn_interval("alert_overdue", 3 * 60, {
            let this = self.clone();
            move || {
                let this = this.clone();
                async move { this.run_alert_overdue().await }
            }
        });

        self.clone().spawn_interval("end_of_shift_notifications", 60 * 60, {
            let this = self.clone();
            move || {
                let this = this.clone();
                async move { this.run_end_of_shift().await }
            }
        });

        self.clone().spawn_interval("auto_unassign_after_shift", 40 * 60, {
            let this = self.clone();
            move || {
                let this = this.clone();
                async move { this.run_auto_unassign().await }
            }
        });

        self.clone().spawn_interval("sync_status", 5 * 60, {
            let this = self.clone();
            move || {
                let this = this.clone();
                async move { this.run_sync_status().await }
            }
        });

        self.clone().spawn_interval("import_existing_tickets", 5 * 60, {
            let this = self.clone();
            move || {
                let this = this.clone();
                async move { this.run_import_existing().await }
            }
        });

        self.clone().spawn_interval("reopen_checker", 2 * 60, {
            let this = self.clone();
            move || {
                let this = this.clone();
                async move { this.run_reopen_checker().await }
            }
        });

        self.clone().spawn_interval("reset_assignment_counters", 60, {
            let this = self.clone();
            move || {
                let this = this.clone();
                async move { this.run_reset_assignment_counters().await }
            }
        });

        Ok(())
    }

    fn spawn_interval<F, Fut>(self: Arc<Self>, name: &'static str, period_secs: u64, mut job: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(period_secs));
            loop {
                ticker.tick().await;
                info!(job = name, "cron job tick");
                job().await;
            }
        });
    }

    /// Working-hours gate shared by the webhook-processing cadence (spec
    /// §4.K, mirroring the Python scheduler's weekday/weekend hour check).
    async fn in_working_hours(&self) -> bool {
        let now_local = self.clock.now_local();
        let weekday_start = self.deps_str(keys::SEMANA_HORA_INICIO, defaults::SEMANA_HORA_INICIO).await;
        let weekday_end = self.deps_str(keys::SEMANA_HORA_FIN, defaults::SEMANA_HORA_FIN).await;
        let weekend_start = self.deps_str(keys::FINDE_HORA_INICIO, defaults::FINDE_HORA_INICIO).await;
        let weekend_end = self.deps_str(keys::FINDE_HORA_FIN, defaults::FINDE_HORA_FIN).await;

        in_working_hours(
            &now_local,
            (parse_hhmm_to_minute(&weekday_start), parse_hhmm_to_minute(&weekday_end)),
            (parse_hhmm_to_minute(&weekend_start), parse_hhmm_to_minute(&weekend_end)),
        )
    }

    async fn deps_str(&self, key: &str, default: &str) -> String {
        self.config.get_str(key, default).await
    }

    async fn run_process_webhooks(&self) {
        if !self.in_working_hours().await {
            info!("outside working hours, skipping process_webhooks");
            return;
        }
        match self.ingestion.materialize_incidents().await {
            Ok(summary) => info!(?summary, "process_webhooks materialized incidents"),
            Err(err) => error!(error = %err, "process_webhooks materialization failed"),
        }
        match self.ingestion.mirror_unmirrored().await {
            Ok(summary) => info!(?summary, "process_webhooks mirrored incidents"),
            Err(err) => error!(error = %err, "process_webhooks mirror failed"),
        }
    }

    async fn run_assign_unassigned(&self) {
        if self.config.get_bool(keys::SYSTEM_PAUSED, defaults::SYSTEM_PAUSED).await {
            return;
        }
        match self.ingestion.assign_unassigned_remote(&self.support_group_id).await {
            Ok(count) => info!(assigned = count, "assign_unassigned completed"),
            Err(err) => error!(error = %err, "assign_unassigned failed"),
        }
    }

    async fn run_alert_overdue(&self) {
        if !self.config.get_bool(keys::WHATSAPP_ENABLED, defaults::WHATSAPP_ENABLED).await {
            return;
        }
        match self.escalation.run_once().await {
            Ok(summary) => info!(?summary, "alert_overdue completed"),
            Err(err) => error!(error = %err, "alert_overdue failed"),
        }
    }

    async fn run_end_of_shift(&self) {
        match self.shift.send_end_of_shift_summaries().await {
            Ok(sent) => info!(sent, "end_of_shift_notifications completed"),
            Err(err) => error!(error = %err, "end_of_shift_notifications failed"),
        }
    }

    async fn run_auto_unassign(&self) {
        match self.shift.auto_unassign_after_shift().await {
            Ok(count) => info!(count, "auto_unassign_after_shift completed"),
            Err(err) => error!(error = %err, "auto_unassign_after_shift failed"),
        }
    }

    async fn run_sync_status(&self) {
        match self.sync.run_once().await {
            Ok(summary) => info!(?summary, "sync_status completed"),
            Err(err) => error!(error = %err, "sync_status failed"),
        }
    }

    async fn run_import_existing(&self) {
        match self.ingestion.import_existing_tickets(&self.support_group_id).await {
            Ok(summary) => info!(?summary, "import_existing_tickets completed"),
            Err(err) => error!(error = %err, "import_existing_tickets failed"),
        }
    }

    async fn run_reopen_checker(&self) {
        match self.sync.run_reopen_check().await {
            Ok(summary) => info!(?summary, "reopen_checker completed"),
            Err(err) => error!(error = %err, "reopen_checker failed"),
        }
    }

    /// Resets every assignment counter once per configured shift hour,
    /// guarded to the first couple minutes of that hour (spec §4.K,
    /// `ASSIGNMENT_RESET_HOURS`).
    async fn run_reset_assignment_counters(&self) {
        let now_local = self.clock.now_local();
        let reset_hours = self.config.get_csv_ints(keys::ASSIGNMENT_RESET_HOURS, defaults::ASSIGNMENT_RESET_HOURS).await;
        use chrono::Timelike;
        let hour = now_local.hour() as i64;
        let minute = now_local.minute();

        if reset_hours.contains(&hour) && minute <= 2 {
            match self.counters.reset_all().await {
                Ok(_) => info!(hour, "assignment counters reset"),
                Err(err) => error!(error = %err, "failed to reset assignment counters"),
            }
        }
    }
}
