//! Reconciliation + SLA state machine (spec §4.H). Polls the remote
//! platform for each locally-mirrored open incident, detects reassignment,
//! advances the monotonic SLA flag, and runs the reopen-window state
//! machine `OPEN -> WAITING_TO_CLOSE -> CLOSED`.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use ticketops_common::clock::{parse_ticket_timestamp_clamped, Clock};
use ticketops_common::config::{defaults, keys, ConfigStore};
use ticketops_common::error::Result;
use ticketops_common::types::{Incident, OperatorId, ReassignmentType};
use ticketops_messaging::{templates, MessagingGatewayClient};
use ticketops_storage::reassignments::NewReassignment;
use ticketops_storage::{IncidentRepository, OperatorRepository, ReassignmentRepository, WebhookRepository};
use ticketops_ticketsvc::{RemoteTicket, TicketSvcClient};

pub struct Deps {
    pub incidents: Arc<IncidentRepository>,
    pub webhooks: Arc<WebhookRepository>,
    pub operators: Arc<OperatorRepository>,
    pub reassignments: Arc<ReassignmentRepository>,
    pub config: Arc<dyn ConfigStore>,
    pub clock: Arc<dyn Clock>,
    pub ticketsvc: Arc<TicketSvcClient>,
    pub messaging: Arc<MessagingGatewayClient>,
}

#[derive(Debug, Default)]
pub struct SyncSummary {
    pub reconciled: u32,
    pub reassigned: u32,
    pub closed: u32,
    pub reopened: u32,
    pub skipped: u32,
}

pub struct SyncWorker {
    deps: Deps,
}

impl SyncWorker {
    pub fn new(deps: Deps) -> Self {
        Self { deps }
    }

    /// Full reconciliation pass over every open, mirrored incident (spec
    /// §4.H, steps 1-6).
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> Result<SyncSummary> {
        let mut summary = SyncSummary::default();
        for incident in self.deps.incidents.list_open_with_external_id().await? {
            match self.reconcile_one(incident).await {
                Ok(outcome) => {
                    summary.reconciled += 1;
                    if outcome.reassigned {
                        summary.reassigned += 1;
                    }
                    if outcome.closed {
                        summary.closed += 1;
                    }
                    if outcome.reopened {
                        summary.reopened += 1;
                    }
                }
                Err(err) => {
                    warn!(error = %err, "skipping incident this round");
                    summary.skipped += 1;
                }
            }
        }
        Ok(summary)
    }

    /// Higher-frequency pass restricted to step 4 of §4.H (the reopen
    /// window), over the set `{remote_closed_at != null && !is_closed}`.
    #[instrument(skip(self))]
    pub async fn run_reopen_check(&self) -> Result<SyncSummary> {
        let mut summary = SyncSummary::default();
        for mut incident in self.deps.incidents.list_reopen_window_candidates().await? {
            let Some(external_id) = incident.external_ticket_id.clone() else { continue };
            let remote = match self.deps.ticketsvc.get_ticket(&external_id).await {
                Ok(t) => t,
                Err(_) => {
                    summary.skipped += 1;
                    continue;
                }
            };

            match self.apply_reopen_window(&mut incident, &remote).await {
                Ok(outcome) => {
                    self.deps.incidents.update(&incident).await?;
                    summary.reconciled += 1;
                    if outcome.closed {
                        summary.closed += 1;
                    }
                    if outcome.reopened {
                        summary.reopened += 1;
                    }
                }
                Err(err) => {
                    warn!(error = %err, "reopen check failed for incident");
                    summary.skipped += 1;
                }
            }
        }
        Ok(summary)
    }

    async fn reconcile_one(&self, mut incident: Incident) -> Result<StepOutcome> {
        let Some(external_id) = incident.external_ticket_id.clone() else {
            return Ok(StepOutcome::default());
        };
        let remote = self.deps.ticketsvc.get_ticket(&external_id).await?;

        let mut outcome = StepOutcome::default();
        outcome.reassigned = self.detect_reassignment(&mut incident, &remote).await?;
        self.apply_sla(&mut incident, &remote).await;

        let window_outcome = self.apply_reopen_window(&mut incident, &remote).await?;
        outcome.closed = window_outcome.closed;
        outcome.reopened = window_outcome.reopened;

        self.deps.incidents.update(&incident).await?;
        Ok(outcome)
    }

    /// Step 2: reassignment detection.
    async fn detect_reassignment(&self, incident: &mut Incident, remote: &RemoteTicket) -> Result<bool> {
        if remote.assign_to == incident.assigned_to {
            return Ok(false);
        }

        let previous = incident.assigned_to;
        let new_assignee = remote.assign_to;

        self.deps
            .reassignments
            .append(NewReassignment {
                ticket_id: incident.id,
                from_operator_id: previous,
                to_operator_id: new_assignee,
                reason: "remote assignment changed".to_string(),
                reassignment_type: ReassignmentType::SplynxSync,
                created_by: "sync_worker".to_string(),
                notification_sent: false,
            })
            .await?;

        incident.assigned_to = new_assignee;

        if let Some(new_id) = new_assignee {
            self.notify_reassignment(incident, new_id, previous).await;
        }
        if let Some(old_id) = previous {
            self.notify_removed(incident, old_id).await;
        }

        Ok(true)
    }

    async fn notify_reassignment(&self, incident: &Incident, new_id: OperatorId, previous: Option<OperatorId>) {
        if !self.messaging_enabled().await {
            return;
        }
        let Ok(Some(operator)) = self.deps.operators.get(new_id).await else { return };
        if !operator.receives_alerts() {
            return;
        }
        let Some(phone) = &operator.whatsapp_number else { return };

        let message = match previous {
            None => templates::single_assignment(
                &operator.name,
                incident.id,
                &incident.subject,
                &incident.customer_ref,
                incident.priority,
            ),
            Some(prev_id) => {
                let from_name = self
                    .deps
                    .operators
                    .get(prev_id)
                    .await
                    .ok()
                    .flatten()
                    .map(|o| o.name)
                    .unwrap_or_else(|| format!("operador {prev_id}"));
                templates::reassignment(
                    &operator.name,
                    &from_name,
                    incident.id,
                    &incident.subject,
                    &incident.customer_ref,
                    incident.priority,
                )
            }
        };
        self.deps.messaging.send_text(phone, &message).await;
    }

    async fn notify_removed(&self, incident: &Incident, old_id: OperatorId) {
        if !self.messaging_enabled().await {
            return;
        }
        let Ok(Some(operator)) = self.deps.operators.get(old_id).await else { return };
        if !operator.receives_alerts() {
            return;
        }
        let Some(phone) = &operator.whatsapp_number else { return };
        let message = templates::removed_from_operator(&operator.name, incident.id, &incident.subject, &incident.customer_ref);
        self.deps.messaging.send_text(phone, &message).await;
    }

    async fn messaging_enabled(&self) -> bool {
        self.deps.config.get_bool(keys::WHATSAPP_ENABLED, defaults::WHATSAPP_ENABLED).await
    }

    /// Step 3: last-update parsing and the monotonic SLA flag (I-3).
    async fn apply_sla(&self, incident: &mut Incident, remote: &RemoteTicket) {
        let now = self.deps.clock.now_utc();
        let last_update = remote
            .updated_at
            .as_deref()
            .and_then(|raw| parse_ticket_timestamp_clamped(raw, now))
            .or_else(|| remote.created_at.as_deref().and_then(|raw| parse_ticket_timestamp_clamped(raw, now)))
            .unwrap_or(incident.last_update);

        incident.last_update = last_update;
        let minutes_since_update = (now - last_update).num_minutes();
        incident.response_time_minutes = Some(minutes_since_update);

        if !incident.is_closed {
            let threshold = self.deps.config.get_int(keys::TICKET_ALERT_THRESHOLD_MINUTES, defaults::TICKET_ALERT_THRESHOLD_MINUTES).await;
            if !incident.exceeded_threshold && minutes_since_update > threshold {
                incident.exceeded_threshold = true;
            }
        }
    }

    /// Steps 4-6: the reopen-window state machine.
    async fn apply_reopen_window(&self, incident: &mut Incident, remote: &RemoteTicket) -> Result<StepOutcome> {
        let now = self.deps.clock.now_utc();
        let mut outcome = StepOutcome::default();

        if !remote.closed {
            if incident.remote_closed_at.is_some() {
                // GR closure never arrived inside the window, or the
                // remote flipped back open; clear the pending window.
                incident.remote_closed_at = None;
            }
            return Ok(outcome);
        }

        let matching_closure = match incident.ingestion_ticket_number {
            Some(n) => self.deps.webhooks.find_close_by_ticket_number(n).await?,
            None => None,
        };

        if matching_closure.is_some() {
            self.finalize_closure(incident, remote, now);
            outcome.closed = true;
            return Ok(outcome);
        }

        match incident.remote_closed_at {
            None => {
                incident.remote_closed_at = Some(now);
            }
            Some(started_at) => {
                let window = self
                    .deps
                    .config
                    .get_int(keys::TICKET_REOPEN_WINDOW_MINUTES, defaults::TICKET_REOPEN_WINDOW_MINUTES)
                    .await;
                let elapsed = (now - started_at).num_minutes();
                if elapsed < window {
                    // still inside the window, nothing to do this round
                } else {
                    self.reopen(incident).await?;
                    outcome.reopened = true;
                }
            }
        }

        Ok(outcome)
    }

    fn finalize_closure(&self, incident: &mut Incident, remote: &RemoteTicket, now: chrono::DateTime<Utc>) {
        incident.is_closed = true;
        incident.closed_at = Some(
            remote
                .updated_at
                .as_deref()
                .and_then(|raw| parse_ticket_timestamp_clamped(raw, now))
                .unwrap_or(now),
        );
        incident.remote_closed_at = None;
        let created = incident
            .created_at
            .or_else(|| parse_ticket_timestamp_clamped(&incident.created_at_raw, now));
        if let Some(created) = created {
            incident.resolution_time_minutes = incident
                .closed_at
                .map(|closed| (closed - created).num_minutes());
        }
        incident.status_label = if remote.status_id.as_deref() == Some("3") {
            "SUCCESS".to_string()
        } else {
            "CLOSED".to_string()
        };
        // exceeded_threshold is deliberately left untouched (I-2/I-3).
    }

    async fn reopen(&self, incident: &mut Incident) -> Result<()> {
        let Some(external_id) = incident.external_ticket_id.clone() else { return Ok(()) };
        self.deps.ticketsvc.reopen_ticket(&external_id).await?;
        incident.recreado += 1;
        incident.remote_closed_at = None;

        if self.messaging_enabled().await {
            if let Some(assignee) = incident.assigned_to {
                if let Ok(Some(operator)) = self.deps.operators.get(assignee).await {
                    if operator.receives_alerts() {
                        if let Some(phone) = &operator.whatsapp_number {
                            let message =
                                templates::reopened(&operator.name, incident.id, &incident.subject, &incident.customer_ref);
                            self.deps.messaging.send_text(phone, &message).await;
                        }
                    }
                }
            }
        }
        info!(incident_id = incident.id, "ticket reopened after expired window");
        Ok(())
    }
}

#[derive(Default)]
struct StepOutcome {
    reassigned: bool,
    closed: bool,
    reopened: bool,
}
