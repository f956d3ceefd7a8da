//! Shared domain types, configuration, clock/calendar helpers, and the
//! error taxonomy used by every other crate in the workspace.

pub mod clock;
pub mod config;
pub mod error;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock, LOCAL_TZ};
pub use config::{ConfigStore, ConfigValue, SystemConfig};
pub use error::{RemoteError, Result, TicketOpsError};
pub use types::*;
