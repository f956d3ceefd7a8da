use serde::{Deserialize, Serialize};

/// Remote ticket record as returned by `get_ticket`/`list_unassigned`/
/// `list_assigned` (spec §4.C). TicketSvc answers both booleans and the
/// strings `"0"`/`"1"` for `closed`, and either `assign_to` or
/// `assigned_to` for the assignee field, so this type is deserialized
/// through a tolerant probe in `client.rs` rather than a derive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteTicket {
    pub id: String,
    pub closed: bool,
    pub status_id: Option<String>,
    pub updated_at: Option<String>,
    pub created_at: Option<String>,
    pub assign_to: Option<i64>,
    pub subject: Option<String>,
    pub customer_id: Option<String>,
    pub priority: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl std::fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TicketPriority::Low => "low",
            TicketPriority::Medium => "medium",
            TicketPriority::High => "high",
            TicketPriority::Urgent => "urgent",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateTicketRequest<'a> {
    pub customer_id: &'a str,
    pub subject: &'a str,
    pub note: &'a str,
    pub created_at: &'a str,
    pub priority: TicketPriority,
    pub status_id: &'a str,
    pub group_id: &'a str,
    pub type_id: &'a str,
    pub assign_to: i64,
}
