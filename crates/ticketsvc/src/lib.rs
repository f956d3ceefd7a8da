//! REST client for the remote ticketing platform (spec §4.C). Mirrors the
//! shape of the teacher's outbound API wrappers: a struct holding a
//! `reqwest::Client`, the configured base URL, and a lock-guarded token.

mod client;
mod model;

pub use client::TicketSvcClient;
pub use model::{CreateTicketRequest, RemoteTicket, TicketPriority};
