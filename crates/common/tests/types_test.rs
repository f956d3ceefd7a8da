use ticketops_common::types::*;

#[test]
fn operator_assignable_requires_active_and_unpaused() {
    let mut op = OperatorConfig {
        person_id: 1,
        name: "Jane".to_string(),
        whatsapp_number: None,
        is_active: true,
        is_paused: false,
        assignment_paused: false,
        notifications_enabled: true,
        paused_at: None,
        paused_reason: None,
    };
    assert!(op.assignable());

    op.is_paused = true;
    assert!(!op.assignable());
    op.is_paused = false;

    op.assignment_paused = true;
    assert!(!op.assignable());
    op.assignment_paused = false;

    op.is_active = false;
    assert!(!op.assignable());
}

#[test]
fn operator_receives_alerts_requires_notifications_and_unpaused() {
    let mut op = OperatorConfig {
        person_id: 2,
        name: "Bob".to_string(),
        whatsapp_number: Some("+5491100000000".to_string()),
        is_active: true,
        is_paused: false,
        assignment_paused: false,
        notifications_enabled: true,
        paused_at: None,
        paused_reason: None,
    };
    assert!(op.receives_alerts());

    op.notifications_enabled = false;
    assert!(!op.receives_alerts());
    op.notifications_enabled = true;

    op.is_paused = true;
    assert!(!op.receives_alerts());
}

#[test]
fn schedule_window_is_start_inclusive_end_exclusive() {
    let schedule = OperatorSchedule {
        person_id: 3,
        day_of_week: 0,
        start_minute: 480,
        end_minute: 1200,
        schedule_type: ScheduleType::Assignment,
    };

    assert!(!schedule.contains_minute(479));
    assert!(schedule.contains_minute(480));
    assert!(schedule.contains_minute(1199));
    assert!(!schedule.contains_minute(1200));
}

#[test]
fn priority_defaults_to_medium() {
    assert_eq!(Priority::default(), Priority::Medium);
}

#[test]
fn webhook_kind_variants_are_distinguishable() {
    assert_ne!(WebhookKind::New, WebhookKind::Close);
    assert_ne!(WebhookKind::Close, WebhookKind::Splynx);
}
