//! Plain parameterized string builders, one per notification intent
//! (spec §4.D). No templating DSL per the project's non-goals.

use ticketops_common::{IncidentId, Priority};

#[derive(Clone)]
pub struct OverdueItem {
    pub ticket_id: IncidentId,
    pub subject: String,
    pub customer: String,
    pub minutes_overdue: i64,
}

pub fn overdue_group(operator_name: &str, items: &[OverdueItem]) -> String {
    let mut lines = vec![format!(
        "Hola {operator_name}, tenes {} ticket(s) sin atender:",
        items.len()
    )];
    for item in items {
        lines.push(format!(
            "- #{} {} ({}) — {} min sin actualizar",
            item.ticket_id, item.subject, item.customer, item.minutes_overdue
        ));
    }
    lines.join("\n")
}

pub fn pre_alert_group(operator_name: &str, items: &[OverdueItem], minutes_remaining: i64) -> String {
    let mut lines = vec![format!(
        "Hola {operator_name}, en {minutes_remaining} min estos tickets van a vencer:"
    )];
    for item in items {
        lines.push(format!("- #{} {} ({})", item.ticket_id, item.subject, item.customer));
    }
    lines.join("\n")
}

pub fn end_of_shift_summary(operator_name: &str, items: &[OverdueItem], shift_end: &str) -> String {
    let mut lines = vec![format!(
        "Hola {operator_name}, tu turno termina a las {shift_end}. Tickets abiertos pendientes:"
    )];
    for item in items {
        lines.push(format!("- #{} {} ({})", item.ticket_id, item.subject, item.customer));
    }
    if items.is_empty() {
        lines.push("No tenes tickets abiertos.".to_string());
    }
    lines.join("\n")
}

pub fn single_assignment(
    operator_name: &str,
    ticket_id: IncidentId,
    subject: &str,
    customer: &str,
    priority: Priority,
) -> String {
    format!(
        "Hola {operator_name}, se te asigno el ticket #{ticket_id}: {subject} ({customer}). Prioridad: {priority:?}"
    )
}

pub fn reassignment(
    new_op_name: &str,
    from_op_name: &str,
    ticket_id: IncidentId,
    subject: &str,
    customer: &str,
    priority: Priority,
) -> String {
    format!(
        "Hola {new_op_name}, se te reasigno el ticket #{ticket_id} (antes de {from_op_name}): {subject} ({customer}). Prioridad: {priority:?}"
    )
}

pub fn removed_from_operator(
    operator_name: &str,
    ticket_id: IncidentId,
    subject: &str,
    customer: &str,
) -> String {
    format!("Hola {operator_name}, el ticket #{ticket_id} ({subject}, {customer}) ya no esta asignado a vos.")
}

pub fn reopened(operator_name: &str, ticket_id: IncidentId, subject: &str, customer: &str) -> String {
    format!(
        "Hola {operator_name}, el ticket #{ticket_id} ({subject}, {customer}) se reabrio automaticamente."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overdue_group_lists_every_item() {
        let items = vec![
            OverdueItem { ticket_id: 1, subject: "a".into(), customer: "c1".into(), minutes_overdue: 70 },
            OverdueItem { ticket_id: 2, subject: "b".into(), customer: "c2".into(), minutes_overdue: 90 },
        ];
        let msg = overdue_group("Ana", &items);
        assert!(msg.contains("#1"));
        assert!(msg.contains("#2"));
        assert!(msg.contains("2 ticket"));
    }

    #[test]
    fn end_of_shift_summary_handles_empty() {
        let msg = end_of_shift_summary("Ana", &[], "18:00");
        assert!(msg.contains("No tenes tickets"));
    }
}
