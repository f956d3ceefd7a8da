//! Postgres-backed repository layer (spec §4.E). One module per entity
//! in spec §3, following the teacher's `storage::postgres::PostgresClient`
//! shape but with real typed queries in place of its `todo!()` stub.

pub mod audit;
pub mod config_store;
pub mod counters;
pub mod incidents;
pub mod operators;
pub mod pool;
pub mod reassignments;
pub mod webhooks;

pub use audit::AuditRepository;
pub use config_store::PostgresConfigStore;
pub use counters::CounterRepository;
pub use incidents::{CreateOutcome, IncidentRepository};
pub use operators::OperatorRepository;
pub use pool::connect;
pub use reassignments::ReassignmentRepository;
pub use webhooks::WebhookRepository;
