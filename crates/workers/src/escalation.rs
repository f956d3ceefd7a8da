//! Overdue alerting + pre-alert notifications (spec §4.I). Both passes
//! walk the same `list_assigned` snapshot but fire on different windows
//! and write to different idempotency columns, so they're kept separate
//! rather than folded into one branch-heavy loop.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{instrument, warn};

use ticketops_common::clock::{parse_ticket_timestamp_clamped, Clock};
use ticketops_common::config::{defaults, keys, ConfigStore};
use ticketops_common::error::Result;
use ticketops_common::types::OperatorId;
use ticketops_messaging::{templates, templates::OverdueItem, MessagingGatewayClient};
use ticketops_storage::{IncidentRepository, OperatorRepository};
use ticketops_ticketsvc::{RemoteTicket, TicketSvcClient};

pub struct Deps {
    pub incidents: Arc<IncidentRepository>,
    pub operators: Arc<OperatorRepository>,
    pub config: Arc<dyn ConfigStore>,
    pub clock: Arc<dyn Clock>,
    pub ticketsvc: Arc<TicketSvcClient>,
    pub messaging: Arc<MessagingGatewayClient>,
    pub support_group_id: String,
}

#[derive(Debug, Default)]
pub struct EscalationSummary {
    pub overdue_notified: u32,
    pub pre_alerts_sent: u32,
    pub suppressed: u32,
}

pub struct EscalationWorker {
    deps: Deps,
}

/// A remote ticket annotated with the local timing fields derived from it,
/// shared between the overdue pass and the pre-alert pass.
struct Timed<'a> {
    ticket: &'a RemoteTicket,
    minutes_since_creation: i64,
    minutes_since_update: i64,
}

impl EscalationWorker {
    pub fn new(deps: Deps) -> Self {
        Self { deps }
    }

    #[instrument(skip(self))]
    pub async fn run_once(&self) -> Result<EscalationSummary> {
        if !self.deps.config.get_bool(keys::WHATSAPP_ENABLED, defaults::WHATSAPP_ENABLED).await {
            return Ok(EscalationSummary::default());
        }

        let now = self.deps.clock.now_utc();
        let tickets = self.deps.ticketsvc.list_assigned(&self.deps.support_group_id).await?;
        let timed: Vec<Timed> = tickets
            .iter()
            .filter_map(|t| self.time_ticket(t, now))
            .collect();

        let mut summary = EscalationSummary::default();
        summary.merge(self.run_overdue_pass(&timed, now).await?);
        summary.merge(self.run_pre_alert_pass(&timed, now).await?);
        Ok(summary)
    }

    fn time_ticket<'a>(&self, ticket: &'a RemoteTicket, now: DateTime<Utc>) -> Option<Timed<'a>> {
        let created = ticket
            .created_at
            .as_deref()
            .and_then(|raw| parse_ticket_timestamp_clamped(raw, now))?;
        let updated = ticket
            .updated_at
            .as_deref()
            .and_then(|raw| parse_ticket_timestamp_clamped(raw, now))
            .unwrap_or(created);

        Some(Timed {
            ticket,
            minutes_since_creation: (updated - created).num_minutes(),
            minutes_since_update: (now - updated).num_minutes(),
        })
    }

    /// Suppression rules shared by both passes (spec §4.I): an OutHouse
    /// status within its grace window, a too-recent update, or
    /// notifications disabled for the assignee.
    async fn suppressed(&self, item: &Timed<'_>) -> bool {
        let outhouse_grace = self.deps.config.get_int(keys::OUTHOUSE_NO_ALERT_MINUTES, defaults::OUTHOUSE_NO_ALERT_MINUTES).await;
        // status_id "6" is OutHouse on the remote platform (spec §4.I).
        if item.ticket.status_id.as_deref() == Some("6") && item.minutes_since_update < outhouse_grace {
            return true;
        }
        let update_threshold = self
            .deps
            .config
            .get_int(keys::TICKET_UPDATE_THRESHOLD_MINUTES, defaults::TICKET_UPDATE_THRESHOLD_MINUTES)
            .await;
        if item.minutes_since_update < update_threshold {
            return true;
        }
        match item.ticket.assign_to {
            Some(id) => match self.deps.operators.get(id).await {
                Ok(Some(op)) => !op.receives_alerts(),
                _ => true,
            },
            None => true,
        }
    }

    /// Overdue pass: fires once `minutes_since_creation` crosses the
    /// alert threshold, re-fires after `TICKET_RENOTIFICATION_INTERVAL_MINUTES`.
    async fn run_overdue_pass(&self, timed: &[Timed<'_>], now: DateTime<Utc>) -> Result<EscalationSummary> {
        let threshold = self.deps.config.get_int(keys::TICKET_ALERT_THRESHOLD_MINUTES, defaults::TICKET_ALERT_THRESHOLD_MINUTES).await;
        let renotify_interval = self
            .deps
            .config
            .get_int(keys::TICKET_RENOTIFICATION_INTERVAL_MINUTES, defaults::TICKET_RENOTIFICATION_INTERVAL_MINUTES)
            .await;

        let mut summary = EscalationSummary::default();
        let mut buckets: HashMap<OperatorId, Vec<(&Timed, OverdueItem)>> = HashMap::new();

        for item in timed.iter().filter(|i| i.minutes_since_creation >= threshold) {
            if self.suppressed(item).await {
                summary.suppressed += 1;
                continue;
            }
            let Some(assignee) = item.ticket.assign_to else { continue };

            let incident = self
                .deps
                .incidents
                .ensure_minimal_for_alert(
                    &item.ticket.id,
                    item.ticket.customer_id.as_deref().unwrap_or(""),
                    item.ticket.subject.as_deref().unwrap_or("Sin motivo"),
                    Some(assignee),
                )
                .await?;

            if let Some(last_sent) = incident.last_alert_sent_at {
                if (now - last_sent).num_minutes() < renotify_interval {
                    summary.suppressed += 1;
                    continue;
                }
            }

            buckets.entry(assignee).or_default().push((
                item,
                OverdueItem {
                    ticket_id: incident.id,
                    subject: incident.subject.clone(),
                    customer: incident.customer_ref.clone(),
                    minutes_overdue: item.minutes_since_creation,
                },
            ));
        }

        for (operator_id, bucket) in buckets {
            let Ok(Some(operator)) = self.deps.operators.get(operator_id).await else { continue };
            let Some(phone) = &operator.whatsapp_number else { continue };

            let overdue_items: Vec<OverdueItem> = bucket.iter().map(|(_, i)| i.clone()).collect();
            let message = templates::overdue_group(&operator.name, &overdue_items);
            let sent = self.deps.messaging.send_text(phone, &message).await;
            if !sent {
                warn!(operator_id, "failed to send overdue group alert");
                continue;
            }

            for (_, overdue) in &bucket {
                if let Ok(Some(mut incident)) = self.deps.incidents.get(overdue.ticket_id).await {
                    if incident.first_alert_sent_at.is_none() {
                        incident.first_alert_sent_at = Some(now);
                    }
                    incident.last_alert_sent_at = Some(now);
                    incident.alert_count += 1;
                    self.deps.incidents.update(&incident).await?;
                }
            }
            summary.overdue_notified += bucket.len() as u32;
        }

        Ok(summary)
    }

    /// Pre-alert pass: a single warning shot in the window
    /// `[threshold - TICKET_PRE_ALERT_MINUTES, threshold)`, idempotent on
    /// `pre_alert_sent_at` rather than the renotification interval.
    async fn run_pre_alert_pass(&self, timed: &[Timed<'_>], now: DateTime<Utc>) -> Result<EscalationSummary> {
        let threshold = self.deps.config.get_int(keys::TICKET_ALERT_THRESHOLD_MINUTES, defaults::TICKET_ALERT_THRESHOLD_MINUTES).await;
        let pre_alert_minutes = self.deps.config.get_int(keys::TICKET_PRE_ALERT_MINUTES, defaults::TICKET_PRE_ALERT_MINUTES).await;
        let window_start = threshold - pre_alert_minutes;

        let mut summary = EscalationSummary::default();
        let mut buckets: HashMap<OperatorId, Vec<(i64, OverdueItem)>> = HashMap::new();

        for item in timed
            .iter()
            .filter(|i| i.minutes_since_creation >= window_start && i.minutes_since_creation < threshold)
        {
            if self.suppressed(item).await {
                summary.suppressed += 1;
                continue;
            }
            let Some(assignee) = item.ticket.assign_to else { continue };

            let incident = self
                .deps
                .incidents
                .ensure_minimal_for_alert(
                    &item.ticket.id,
                    item.ticket.customer_id.as_deref().unwrap_or(""),
                    item.ticket.subject.as_deref().unwrap_or("Sin motivo"),
                    Some(assignee),
                )
                .await?;

            if incident.pre_alert_sent_at.is_some() {
                summary.suppressed += 1;
                continue;
            }

            let minutes_remaining = threshold - item.minutes_since_creation;
            buckets.entry(assignee).or_default().push((
                minutes_remaining,
                OverdueItem {
                    ticket_id: incident.id,
                    subject: incident.subject.clone(),
                    customer: incident.customer_ref.clone(),
                    minutes_overdue: item.minutes_since_creation,
                },
            ));
        }

        for (operator_id, bucket) in buckets {
            let Ok(Some(operator)) = self.deps.operators.get(operator_id).await else { continue };
            let Some(phone) = &operator.whatsapp_number else { continue };

            let minutes_remaining = bucket.iter().map(|(m, _)| *m).min().unwrap_or(pre_alert_minutes);
            let items: Vec<OverdueItem> = bucket.iter().map(|(_, i)| i.clone()).collect();
            let message = templates::pre_alert_group(&operator.name, &items, minutes_remaining);
            let sent = self.deps.messaging.send_text(phone, &message).await;
            if !sent {
                warn!(operator_id, "failed to send pre-alert");
                continue;
            }

            for (_, item) in &bucket {
                if let Ok(Some(mut incident)) = self.deps.incidents.get(item.ticket_id).await {
                    incident.pre_alert_sent_at = Some(now);
                    self.deps.incidents.update(&incident).await?;
                }
            }
            summary.pre_alerts_sent += bucket.len() as u32;
        }

        Ok(summary)
    }
}

impl EscalationSummary {
    fn merge(&mut self, other: EscalationSummary) {
        self.overdue_notified += other.overdue_notified;
        self.pre_alerts_sent += other.pre_alerts_sent;
        self.suppressed += other.suppressed;
    }
}
