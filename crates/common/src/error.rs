use thiserror::Error;

/// Domain error taxonomy shared by every crate that touches an Incident,
/// a remote call, or the admin surface (spec §7).
#[derive(Error, Debug)]
pub enum TicketOpsError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("remote ticket service error: {0}")]
    Remote(#[from] RemoteError),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("operator {0} is ineligible for assignment")]
    OperatorIneligible(i64),

    #[error("entity not found: {0}")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for TicketOpsError {
    fn from(err: anyhow::Error) -> Self {
        TicketOpsError::Unknown(err.to_string())
    }
}

/// Errors surfaced by the TicketSvc and MessagingGateway HTTP clients.
#[derive(Error, Debug, Clone)]
pub enum RemoteError {
    #[error("authentication expired")]
    AuthExpired,

    #[error("remote entity not found")]
    NotFound,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

pub type Result<T> = std::result::Result<T, TicketOpsError>;
