//! Shift-lifecycle worker (spec §4.J): weekday-only end-of-shift summaries
//! and the auto-unassign sweep that runs an hour after a shift ends.

use std::sync::Arc;

use chrono::{Datelike, Weekday};
use tracing::{instrument, warn};

use ticketops_common::clock::{minute_of_day, Clock};
use ticketops_common::config::{defaults, keys, ConfigStore};
use ticketops_common::error::Result;
use ticketops_common::types::{ReassignmentType, ScheduleType};
use ticketops_messaging::{templates, templates::OverdueItem, MessagingGatewayClient};
use ticketops_storage::reassignments::NewReassignment;
use ticketops_storage::{IncidentRepository, OperatorRepository, ReassignmentRepository};
use ticketops_ticketsvc::TicketSvcClient;

pub struct Deps {
    pub incidents: Arc<IncidentRepository>,
    pub operators: Arc<OperatorRepository>,
    pub reassignments: Arc<ReassignmentRepository>,
    pub config: Arc<dyn ConfigStore>,
    pub clock: Arc<dyn Clock>,
    pub ticketsvc: Arc<TicketSvcClient>,
    pub messaging: Arc<MessagingGatewayClient>,
}

#[derive(Debug, Default)]
pub struct ShiftSummary {
    pub summaries_sent: u32,
    pub auto_unassigned: u32,
}

/// Overnight shifts (those starting at local midnight and running to 08:00)
/// are excluded from the end-of-shift summary (spec §4.J).
const OVERNIGHT_START_MINUTE: u16 = 0;
const OVERNIGHT_END_MINUTE: u16 = 8 * 60;

pub struct ShiftLifecycleWorker {
    deps: Deps,
}

impl ShiftLifecycleWorker {
    pub fn new(deps: Deps) -> Self {
        Self { deps }
    }

    /// Runs both weekday-only actions; used by the CLI's ad-hoc job
    /// runner. The scheduler itself calls the two actions separately,
    /// since they run on different cadences (spec §4.K).
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> Result<ShiftSummary> {
        Ok(ShiftSummary {
            summaries_sent: self.send_end_of_shift_summaries().await?,
            auto_unassigned: self.auto_unassign_after_shift().await?,
        })
    }

    fn is_weekday(&self) -> bool {
        !matches!(self.deps.clock.now_local().weekday(), Weekday::Sat | Weekday::Sun)
    }

    /// For each `work`-type schedule ending within the notification window,
    /// sends the assignee a summary of their still-open tickets.
    #[instrument(skip(self))]
    pub async fn send_end_of_shift_summaries(&self) -> Result<u32> {
        if !self.is_weekday() {
            return Ok(0);
        }
        let now_local = self.deps.clock.now_local();
        let now_minute = minute_of_day(&now_local);
        let weekday = now_local.weekday().num_days_from_monday() as u8;
        let notify_before = self
            .deps
            .config
            .get_int(keys::END_OF_SHIFT_NOTIFICATION_MINUTES, defaults::END_OF_SHIFT_NOTIFICATION_MINUTES)
            .await as i32;

        let mut sent = 0u32;
        for schedule in self.deps.operators.schedules_of_type(ScheduleType::Work).await? {
            if schedule.day_of_week != weekday {
                continue;
            }
            if schedule.start_minute >= OVERNIGHT_START_MINUTE && schedule.end_minute <= OVERNIGHT_END_MINUTE {
                continue;
            }
            if !schedule.contains_minute(now_minute) {
                continue;
            }

            let notification_minute = schedule.end_minute as i32 - notify_before;
            if (now_minute as i32 - notification_minute).abs() > 2 {
                continue;
            }

            let Ok(Some(operator)) = self.deps.operators.get(schedule.person_id).await else { continue };
            if !operator.receives_alerts() {
                continue;
            }
            let Some(phone) = &operator.whatsapp_number else { continue };

            let open = self.deps.incidents.list_open_by_operator(schedule.person_id).await?;
            let items: Vec<OverdueItem> = open
                .iter()
                .map(|i| OverdueItem {
                    ticket_id: i.id,
                    subject: i.subject.clone(),
                    customer: i.customer_ref.clone(),
                    minutes_overdue: (self.deps.clock.now_utc() - i.last_update).num_minutes(),
                })
                .collect();

            let shift_end = format!("{:02}:{:02}", schedule.end_minute / 60, schedule.end_minute % 60);
            let message = templates::end_of_shift_summary(&operator.name, &items, &shift_end);
            if self.deps.messaging.send_text(phone, &message).await {
                sent += 1;
            } else {
                warn!(person_id = schedule.person_id, "failed to send end-of-shift summary");
            }
        }
        Ok(sent)
    }

    /// Unassigns tickets whose assignee's `work` shift ended 60-90 minutes
    /// ago (spec §4.J), so a forgotten ticket doesn't sit with an
    /// off-shift operator indefinitely.
    #[instrument(skip(self))]
    pub async fn auto_unassign_after_shift(&self) -> Result<u32> {
        if !self.is_weekday() {
            return Ok(0);
        }
        let now_local = self.deps.clock.now_local();
        let now_minute = minute_of_day(&now_local) as i64;
        let weekday = now_local.weekday().num_days_from_monday() as u8;

        let mut unassigned = 0u32;
        for schedule in self.deps.operators.schedules_of_type(ScheduleType::Work).await? {
            if schedule.day_of_week != weekday {
                continue;
            }
            let minutes_since_shift_end = now_minute - schedule.end_minute as i64;
            if !(60..=90).contains(&minutes_since_shift_end) {
                continue;
            }

            for incident in self.deps.incidents.list_open_by_operator(schedule.person_id).await? {
                let Some(external_id) = incident.external_ticket_id.clone() else { continue };
                if self.deps.ticketsvc.update_assignment(&external_id, 0).await.is_err() {
                    warn!(incident_id = incident.id, "failed to auto-unassign ticket after shift end");
                    continue;
                }

                let mut updated = incident;
                let previous = updated.assigned_to;
                updated.assigned_to = None;
                self.deps.incidents.update(&updated).await?;

                let shift_end_label = format!("{:02}:{:02}", schedule.end_minute / 60, schedule.end_minute % 60);
                self.deps
                    .reassignments
                    .append(NewReassignment {
                        ticket_id: updated.id,
                        from_operator_id: previous,
                        to_operator_id: None,
                        reason: format!("auto_unassign_after_shift_end_{shift_end_label}"),
                        reassignment_type: ReassignmentType::AutoUnassignAfterShift,
                        created_by: "system".to_string(),
                        notification_sent: false,
                    })
                    .await?;

                unassigned += 1;
            }
        }
        Ok(unassigned)
    }
}
