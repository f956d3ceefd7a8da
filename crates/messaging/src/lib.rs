//! Outbound WhatsApp notifications (spec §4.D). `MessagingGatewayClient`
//! speaks the gateway's plain `POST /message/sendText/{instance}` surface;
//! `templates` renders the fixed set of plain-text message intents.

mod client;
pub mod templates;

pub use client::MessagingGatewayClient;
