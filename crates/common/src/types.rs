//! Shared domain entities (spec §3). These are storage-agnostic; the
//! `storage` crate maps them to and from Postgres rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type IncidentId = i64;
pub type OperatorId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReassignmentType {
    AutoAssignment,
    SplynxSync,
    Manual,
    AutoUnassignAfterShift,
    EndOfShift,
    Audit,
    ReopenReassignment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleType {
    Work,
    Assignment,
    Alert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookKind {
    New,
    Close,
    /// Arbitrary remote-platform update payload, persisted for async
    /// processing only (spec §6, `/api/hooks/splynx/ticket-update`).
    Splynx,
}

/// Canonical local representation of a support ticket (spec §3, "Incident").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentId,
    pub customer_ref: String,
    pub display_name: String,
    pub subject: String,
    /// Free-form originating creation string, preserved verbatim (I1 key).
    pub created_at_raw: String,
    /// Best-effort parse of `created_at_raw`, normalized to UTC.
    pub created_at: Option<DateTime<Utc>>,
    pub external_ticket_id: Option<String>,
    pub status_label: String,
    pub priority: Priority,
    pub is_created_remote: bool,
    pub assigned_to: Option<OperatorId>,
    pub closed_at: Option<DateTime<Utc>>,
    pub is_closed: bool,
    pub last_update: DateTime<Utc>,
    pub ingestion_ticket_number: Option<i64>,

    // SLA fields
    pub exceeded_threshold: bool,
    pub response_time_minutes: Option<i64>,
    pub first_alert_sent_at: Option<DateTime<Utc>>,
    pub last_alert_sent_at: Option<DateTime<Utc>>,
    pub pre_alert_sent_at: Option<DateTime<Utc>>,
    pub resolution_time_minutes: Option<i64>,
    pub alert_count: i32,

    /// Reopen-window marker (spec §4.H).
    pub remote_closed_at: Option<DateTime<Utc>>,
    pub recreado: i32,

    // Audit request fields
    pub audit_requested: bool,
    pub audit_status: Option<AuditStatus>,
    pub audit_requested_at: Option<DateTime<Utc>>,
    pub audit_requested_by: Option<String>,
    pub audit_reviewed_at: Option<DateTime<Utc>>,
    pub audit_reviewed_by: Option<String>,
    pub audit_notified: bool,
}

/// Raw inbound webhook payload, persisted verbatim (spec §3, "WebhookRecord").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookRecord {
    pub id: i64,
    pub kind: WebhookKind,
    pub numero_ticket: i64,
    pub company: Option<String>,
    pub channel: Option<String>,
    pub contact_reason: Option<String>,
    pub customer_ref: Option<String>,
    pub phone: Option<String>,
    pub user_name: Option<String>,
    pub created_at_raw: Option<String>,
    pub closed_at_raw: Option<String>,
    /// Arbitrary payload for `WebhookKind::Splynx` records; unused by
    /// `new`/`close` records, which materialize into typed columns instead.
    pub raw_payload: Option<serde_json::Value>,
    pub received_at: DateTime<Utc>,
    pub processed: bool,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorConfig {
    pub person_id: OperatorId,
    pub name: String,
    pub whatsapp_number: Option<String>,
    pub is_active: bool,
    pub is_paused: bool,
    pub assignment_paused: bool,
    pub notifications_enabled: bool,
    pub paused_at: Option<DateTime<Utc>>,
    pub paused_reason: Option<String>,
}

impl OperatorConfig {
    /// Invariant from spec §3: `is_paused ∨ assignment_paused ∨ ¬is_active`
    /// makes an operator ineligible for new assignments.
    pub fn assignable(&self) -> bool {
        self.is_active && !self.is_paused && !self.assignment_paused
    }

    /// Invariant from spec §3: paused or notifications-disabled operators
    /// never receive alert messages.
    pub fn receives_alerts(&self) -> bool {
        !self.is_paused && self.notifications_enabled
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OperatorSchedule {
    pub person_id: OperatorId,
    /// 0 = Monday .. 6 = Sunday, matching `chrono::Weekday::num_days_from_monday`.
    pub day_of_week: u8,
    pub start_minute: u16,
    pub end_minute: u16,
    pub schedule_type: ScheduleType,
}

impl OperatorSchedule {
    /// Start inclusive, end exclusive; never crosses midnight (spec §3).
    pub fn contains_minute(&self, minute_of_day: u16) -> bool {
        self.start_minute <= minute_of_day && minute_of_day < self.end_minute
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AssignmentCounter {
    pub person_id: OperatorId,
    pub ticket_count: i64,
    pub last_assigned: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReassignmentHistory {
    pub id: i64,
    pub ticket_id: IncidentId,
    pub from_operator_id: Option<OperatorId>,
    pub to_operator_id: Option<OperatorId>,
    pub reason: String,
    pub reassignment_type: ReassignmentType,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub notification_sent: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub old_value: Option<serde_json::Value>,
    pub new_value: Option<serde_json::Value>,
    pub performed_by: String,
    pub ip: Option<String>,
    pub performed_at: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigValueType {
    Int,
    Bool,
    String,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    pub value_type: ConfigValueType,
    pub category: String,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}
