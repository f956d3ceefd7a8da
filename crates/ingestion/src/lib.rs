//! Webhook ingestion and idempotent materialization (spec §4.F). Two
//! append paths persist raw payloads; two materialization passes turn
//! them into canonical `Incident` rows and, separately, mirror those
//! rows onto the remote ticketing platform.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use ticketops_assignment::{AssignmentDecision, AssignmentEngine, AssignmentInput};
use ticketops_common::clock::{parse_ticket_timestamp_clamped, Clock};
use ticketops_common::config::{keys, ConfigStore};
use ticketops_common::error::Result;
use ticketops_common::types::{OperatorId, ReassignmentType, WebhookKind};
use ticketops_messaging::{templates, MessagingGatewayClient};
use ticketops_storage::incidents::{CreateOutcome, NewIncident};
use ticketops_storage::reassignments::NewReassignment;
use ticketops_storage::{
    CounterRepository, IncidentRepository, OperatorRepository, ReassignmentRepository, WebhookRepository,
};
pub use ticketops_storage::webhooks::NewWebhookRecord;
use ticketops_ticketsvc::TicketSvcClient;

pub struct Deps {
    pub webhooks: Arc<WebhookRepository>,
    pub incidents: Arc<IncidentRepository>,
    pub operators: Arc<OperatorRepository>,
    pub counters: Arc<CounterRepository>,
    pub reassignments: Arc<ReassignmentRepository>,
    pub config: Arc<dyn ConfigStore>,
    pub clock: Arc<dyn Clock>,
    pub ticketsvc: Arc<TicketSvcClient>,
    pub messaging: Arc<MessagingGatewayClient>,
    pub support_group_id: String,
}

pub struct WebhookIngester {
    deps: Deps,
}

#[derive(Debug, Default)]
pub struct MaterializeSummary {
    pub incidents_created: u32,
    pub skipped_filtered: u32,
    pub duplicates: u32,
}

#[derive(Debug, Default)]
pub struct MirrorSummary {
    pub mirrored: u32,
    pub failed: u32,
}

#[derive(Debug, Default)]
pub struct ImportSummary {
    pub imported: u32,
    pub skipped: u32,
    pub errors: u32,
}

impl WebhookIngester {
    pub fn new(deps: Deps) -> Self {
        Self { deps }
    }

    /// Raw persistence for `/api/hooks/nuevo-ticket` (spec §6).
    pub async fn record_new(&self, record: NewWebhookRecord) -> Result<()> {
        self.deps.webhooks.record(record).await?;
        Ok(())
    }

    /// Raw persistence for `/api/hooks/cierre-ticket` (spec §6).
    pub async fn record_close(&self, record: NewWebhookRecord) -> Result<()> {
        self.deps.webhooks.record(record).await?;
        Ok(())
    }

    /// Raw persistence for `/api/hooks/splynx/ticket-update` (spec §6):
    /// arbitrary payload, stored for async processing only.
    pub async fn record_splynx_update(&self, record: NewWebhookRecord) -> Result<()> {
        self.deps.webhooks.record(record).await?;
        Ok(())
    }

    /// First materialization pass (spec §4.F): unprocessed `new` webhook
    /// records become canonical `Incident` rows, oldest first.
    #[instrument(skip(self))]
    pub async fn materialize_incidents(&self) -> Result<MaterializeSummary> {
        let allowed_reason = self
            .deps
            .config
            .get_str(keys::WEBHOOK_MOTIVO_PERMITIDO, ticketops_common::config::defaults::WEBHOOK_MOTIVO_PERMITIDO)
            .await;
        let now = self.deps.clock.now_utc();

        let mut summary = MaterializeSummary::default();
        for record in self.deps.webhooks.list_unprocessed(WebhookKind::New).await? {
            let reason_matches = record
                .contact_reason
                .as_deref()
                .map(|r| r.trim().eq_ignore_ascii_case(allowed_reason.trim()))
                .unwrap_or(false);

            if !reason_matches {
                self.deps.webhooks.mark_processed(record.id).await?;
                summary.skipped_filtered += 1;
                continue;
            }

            let customer_ref = record.customer_ref.clone().unwrap_or_default();
            let display_name = record
                .user_name
                .clone()
                .or_else(|| record.company.clone())
                .unwrap_or_else(|| "Cliente".to_string());
            let subject = record
                .contact_reason
                .clone()
                .unwrap_or_else(|| "Sin motivo".to_string());
            let created_at_raw = record.created_at_raw.clone().unwrap_or_else(|| now.to_rfc3339());
            let created_at = parse_ticket_timestamp_clamped(&created_at_raw, now);

            let outcome = self
                .deps
                .incidents
                .create(NewIncident {
                    customer_ref,
                    display_name,
                    subject,
                    created_at_raw,
                    created_at,
                    ingestion_ticket_number: Some(record.numero_ticket),
                })
                .await?;

            match outcome {
                CreateOutcome::Created(_) => summary.incidents_created += 1,
                CreateOutcome::Duplicate => {
                    info!(webhook_id = record.id, "duplicate incident creation timestamp, skipping insert");
                    summary.duplicates += 1;
                }
            }

            self.deps.webhooks.mark_processed(record.id).await?;
        }
        Ok(summary)
    }

    /// Second materialization pass (spec §4.F): mirrors locally-created
    /// incidents onto the remote ticketing platform and assigns them.
    #[instrument(skip(self))]
    pub async fn mirror_unmirrored(&self) -> Result<MirrorSummary> {
        if self.deps.config.get_bool(keys::SYSTEM_PAUSED, ticketops_common::config::defaults::SYSTEM_PAUSED).await {
            return Ok(MirrorSummary::default());
        }

        let mut summary = MirrorSummary::default();
        for incident in self.deps.incidents.list_unmirrored().await? {
            let decision = self.resolve_assignee(None).await?;

            let created = self
                .deps
                .ticketsvc
                .create_ticket(ticketops_ticketsvc::CreateTicketRequest {
                    customer_id: &incident.customer_ref,
                    subject: &incident.subject,
                    note: &incident.subject,
                    created_at: &incident.created_at_raw,
                    priority: ticketops_ticketsvc::TicketPriority::Medium,
                    status_id: "1",
                    group_id: &self.deps.support_group_id,
                    type_id: "1",
                    assign_to: decision.operator_id,
                })
                .await;

            let Ok(external_id) = created else {
                warn!(incident_id = incident.id, "failed to mirror incident to remote platform");
                summary.failed += 1;
                continue;
            };

            let mut updated = incident;
            updated.external_ticket_id = Some(external_id);
            updated.is_created_remote = true;
            updated.assigned_to = Some(decision.operator_id);
            self.deps.incidents.update(&updated).await?;

            self.deps
                .reassignments
                .append(NewReassignment {
                    ticket_id: updated.id,
                    from_operator_id: None,
                    to_operator_id: Some(decision.operator_id),
                    reason: format!("{:?}", decision.branch),
                    reassignment_type: ReassignmentType::AutoAssignment,
                    created_by: "system".to_string(),
                    notification_sent: false,
                })
                .await?;

            if let Some(operator) = self.deps.operators.get(decision.operator_id).await? {
                if operator.receives_alerts() {
                    if let Some(phone) = &operator.whatsapp_number {
                        let message = templates::single_assignment(
                            &operator.name,
                            updated.id,
                            &updated.subject,
                            &updated.customer_ref,
                            updated.priority,
                        );
                        self.deps.messaging.send_text(phone, &message).await;
                    }
                }
            }

            summary.mirrored += 1;
        }
        Ok(summary)
    }

    /// `assign_unassigned` job (spec §4.G/§4.K): walks the remote
    /// platform's own unassigned-ticket list and assigns each one,
    /// independent of local mirroring.
    #[instrument(skip(self))]
    pub async fn assign_unassigned_remote(&self, group_id: &str) -> Result<u32> {
        if self.deps.config.get_bool(keys::SYSTEM_PAUSED, ticketops_common::config::defaults::SYSTEM_PAUSED).await {
            return Ok(0);
        }

        let mut assigned = 0u32;
        for ticket in self.deps.ticketsvc.list_unassigned(group_id).await? {
            let decision = self.resolve_assignee(None).await?;
            if self
                .deps
                .ticketsvc
                .update_assignment(&ticket.id, decision.operator_id)
                .await
                .is_err()
            {
                warn!(ticket_id = %ticket.id, "failed to assign unassigned remote ticket");
                continue;
            }

            if let Some(incident) = self.deps.incidents.find_by_external_ticket_id(&ticket.id).await? {
                let mut updated = incident;
                updated.assigned_to = Some(decision.operator_id);
                self.deps.incidents.update(&updated).await?;

                self.deps
                    .reassignments
                    .append(NewReassignment {
                        ticket_id: updated.id,
                        from_operator_id: None,
                        to_operator_id: Some(decision.operator_id),
                        reason: format!("{:?}", decision.branch),
                        reassignment_type: ReassignmentType::AutoAssignment,
                        created_by: "system".to_string(),
                        notification_sent: false,
                    })
                    .await?;
            }

            assigned += 1;
        }
        Ok(assigned)
    }

    /// `import_existing_tickets` job (spec §4.K, SPEC_FULL §2): lists every
    /// ticket in the configured support group on the remote platform,
    /// unassigned and assigned alike, and creates a minimal local Incident
    /// row (`is_created_remote = true`) for any one the local mirror
    /// doesn't already know about. Grounded in `original_source/app/utils/
    /// import_existing_tickets.py`'s "seed DB from Splynx, skip what's
    /// already there" pass — this never assigns or reassigns, it only
    /// backfills rows.
    #[instrument(skip(self))]
    pub async fn import_existing_tickets(&self, group_id: &str) -> Result<ImportSummary> {
        let mut summary = ImportSummary::default();
        let mut tickets = self.deps.ticketsvc.list_unassigned(group_id).await?;
        tickets.extend(self.deps.ticketsvc.list_assigned(group_id).await?);

        for ticket in tickets {
            if self.deps.incidents.find_by_external_ticket_id(&ticket.id).await?.is_some() {
                summary.skipped += 1;
                continue;
            }

            let customer_ref = ticket.customer_id.clone().unwrap_or_default();
            let subject = ticket.subject.clone().unwrap_or_else(|| "Sin asunto".to_string());

            match self
                .deps
                .incidents
                .ensure_minimal_for_alert(&ticket.id, &customer_ref, &subject, ticket.assign_to)
                .await
            {
                Ok(_) => summary.imported += 1,
                Err(_) => {
                    warn!(ticket_id = %ticket.id, "failed to import existing remote ticket");
                    summary.errors += 1;
                }
            }
        }

        info!(imported = summary.imported, skipped = summary.skipped, errors = summary.errors, "import_existing_tickets complete");
        Ok(summary)
    }

    /// Shared with the `assign_unassigned` job in `workers`: resolves the
    /// next assignee given already-fetched operator/counter state.
    pub async fn resolve_assignee(&self, ticket_note: Option<&str>) -> Result<AssignmentDecision> {
        let now_local = self.deps.clock.now_local();
        let is_weekend = ticketops_common::clock::is_weekend(&now_local);
        let finde_start = self.deps.config.get_str(keys::FINDE_HORA_INICIO, ticketops_common::config::defaults::FINDE_HORA_INICIO).await;
        let finde_end = self.deps.config.get_str(keys::FINDE_HORA_FIN, ticketops_common::config::defaults::FINDE_HORA_FIN).await;
        let in_finde_hours = ticketops_common::clock::in_working_hours(
            &now_local,
            (0, 0),
            (
                ticketops_common::clock::parse_hhmm_to_minute(&finde_start),
                ticketops_common::clock::parse_hhmm_to_minute(&finde_end),
            ),
        );
        let persona_guardia_finde: OperatorId = self
            .deps
            .config
            .get_int(keys::PERSONA_GUARDIA_FINDE, 0)
            .await;

        let operators = self.deps.operators.list_all().await?;
        let schedule_rows = self
            .deps
            .operators
            .schedules_of_type(ticketops_common::types::ScheduleType::Assignment)
            .await?;
        let minute = ticketops_common::clock::minute_of_day(&now_local);
        let weekday = ticketops_common::clock::day_of_week(&now_local);
        let schedule_eligible_ids: Vec<OperatorId> = schedule_rows
            .iter()
            .filter(|s| s.day_of_week == weekday && s.contains_minute(minute))
            .map(|s| s.person_id)
            .collect();

        // Afternoon/day shift candidate lists are themselves schedule-driven:
        // any operator with a `work`-type schedule whose window lands in
        // the afternoon (>= 13:00) or morning (< 13:00) half of the day.
        let work_rows = self
            .deps
            .operators
            .schedules_of_type(ticketops_common::types::ScheduleType::Work)
            .await?;
        let afternoon_shift_ids: Vec<OperatorId> = work_rows
            .iter()
            .filter(|s| s.day_of_week == weekday && s.start_minute >= 13 * 60)
            .map(|s| s.person_id)
            .collect();
        let day_shift_ids: Vec<OperatorId> = work_rows
            .iter()
            .filter(|s| s.day_of_week == weekday && s.start_minute < 13 * 60)
            .map(|s| s.person_id)
            .collect();

        let counters = self.deps.counters.list_all().await?;

        let input = AssignmentInput {
            is_weekend,
            in_finde_hours,
            persona_guardia_finde,
            ticket_note,
            afternoon_shift_ids: &afternoon_shift_ids,
            day_shift_ids: &day_shift_ids,
            schedule_eligible_ids: &schedule_eligible_ids,
            operators: &operators,
            counters: &counters,
        };
        let decision = AssignmentEngine::get_next_assignee(&input);

        if !self.deps.config.get_bool(keys::SYSTEM_PAUSED, false).await {
            if let Err(e) = self.deps.counters.commit(decision.operator_id).await {
                warn!(operator_id = decision.operator_id, error = %e, "failed to commit assignment counter, round-robin count will drift");
            }
        }

        Ok(decision)
    }
}
