use ticketops_common::config::{keys, ConfigStore, ConfigValue};
use ticketops_common::types::WebhookKind;
use ticketops_storage::{CreateOutcome, IncidentRepository, NewIncident, NewWebhookRecord, PostgresConfigStore, WebhookRepository};

// Helper to get an ISOLATED test database URL
fn get_test_db_url() -> String {
    std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must be set (use docker-compose.test.yml)")
}

async fn setup_test_pool() -> sqlx::PgPool {
    ticketops_storage::connect(&get_test_db_url())
        .await
        .expect("failed to connect to test database")
}

#[tokio::test]
#[ignore] // Run only when test services are available
async fn test_connect_runs_migrations() {
    let pool = setup_test_pool().await;
    assert!(pool.acquire().await.is_ok());
}

#[tokio::test]
#[ignore]
async fn test_create_incident_is_idempotent_on_duplicate_timestamp() {
    let pool = setup_test_pool().await;
    let repo = IncidentRepository::new(pool.clone());

    let build = || NewIncident {
        customer_ref: "test-customer-1".to_string(),
        display_name: "Test Customer".to_string(),
        subject: "soporte_tecnico".to_string(),
        created_at_raw: "2026-01-01 10:00:00".to_string(),
        created_at: None,
        ingestion_ticket_number: Some(90001),
    };

    let first = repo.create(build()).await.expect("first create should succeed");
    assert!(matches!(first, CreateOutcome::Created(_)));

    let second = repo.create(build()).await.expect("duplicate create should not error");
    assert!(matches!(second, CreateOutcome::Duplicate));

    sqlx::query("DELETE FROM incidents WHERE customer_ref = $1")
        .bind("test-customer-1")
        .execute(&pool)
        .await
        .ok();
}

#[tokio::test]
#[ignore]
async fn test_webhook_record_round_trips() {
    let pool = setup_test_pool().await;
    let repo = WebhookRepository::new(pool.clone());

    let record = repo
        .record(NewWebhookRecord {
            kind: WebhookKind::New,
            numero_ticket: 90002,
            company: Some("Acme".to_string()),
            channel: Some("whatsapp".to_string()),
            contact_reason: Some("soporte_tecnico".to_string()),
            customer_ref: Some("test-customer-2".to_string()),
            phone: Some("+5491100000000".to_string()),
            user_name: Some("Jane Doe".to_string()),
            created_at_raw: Some("2026-01-01 10:00:00".to_string()),
            closed_at_raw: None,
            raw_payload: None,
        })
        .await
        .expect("failed to record webhook");

    assert_eq!(record.numero_ticket, 90002);
    assert!(!record.processed);

    sqlx::query("DELETE FROM webhook_records WHERE numero_ticket = $1")
        .bind(90002_i64)
        .execute(&pool)
        .await
        .ok();
}

#[tokio::test]
#[ignore]
async fn test_config_store_caches_then_invalidates_on_write() {
    let pool = setup_test_pool().await;
    let store = PostgresConfigStore::new(pool.clone());

    store
        .set(keys::TICKET_ALERT_THRESHOLD_MINUTES, ConfigValue::Int(45), "sla", "test_user")
        .await
        .expect("failed to set config value");

    let value = store
        .get_raw(keys::TICKET_ALERT_THRESHOLD_MINUTES)
        .await
        .expect("failed to read config value");
    assert_eq!(value, Some(ConfigValue::Int(45)));

    store
        .set(keys::TICKET_ALERT_THRESHOLD_MINUTES, ConfigValue::Int(90), "sla", "test_user")
        .await
        .expect("failed to update config value");

    let updated = store
        .get_raw(keys::TICKET_ALERT_THRESHOLD_MINUTES)
        .await
        .expect("failed to re-read config value");
    assert_eq!(updated, Some(ConfigValue::Int(90)));

    sqlx::query("DELETE FROM config_entries WHERE key = $1")
        .bind(keys::TICKET_ALERT_THRESHOLD_MINUTES)
        .execute(&pool)
        .await
        .ok();
}
