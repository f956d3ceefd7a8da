//! Two distinct configuration layers (SPEC_FULL §1, "Configuration"):
//!
//! - [`SystemConfig`]: deploy-time settings (DB url, base urls, credentials,
//!   bind address) loaded once from TOML + environment, the way the
//!   teacher's `SystemConfig::load` does.
//! - [`ConfigStore`]: the runtime, admin-mutable key/value layer of spec
//!   §4.A, cached in-process and invalidated on every write. The trait
//!   lives here; the Postgres-backed implementation lives in `storage`
//!   (it needs a pool, which this crate deliberately does not depend on).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;
use crate::types::ConfigValueType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    pub bind_addr: String,
    pub database_url: String,
    pub ticketsvc: TicketSvcConfig,
    pub messaging: MessagingConfig,
    pub scheduler: SchedulerFileConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketSvcConfig {
    pub base_url: String,
    pub login: String,
    pub password: String,
    pub ssl_verify: bool,
    pub support_group_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    pub base_url: String,
    pub api_key: String,
    pub instance_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerFileConfig {
    pub lockfile_path: PathBuf,
    pub pause_state_path: PathBuf,
}

impl SystemConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SystemConfig = toml::from_str(&content)?;
        Ok(config.apply_env_overrides())
    }

    /// Overlay environment variables enumerated in spec §6 on top of the
    /// TOML-loaded defaults, env taking precedence.
    fn apply_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("SPLYNX_BASE_URL") {
            self.ticketsvc.base_url = v;
        }
        if let Ok(v) = std::env::var("SPLYNX_USER") {
            self.ticketsvc.login = v;
        }
        if let Ok(v) = std::env::var("SPLYNX_PASSWORD") {
            self.ticketsvc.password = v;
        }
        if let Ok(v) = std::env::var("SPLYNX_SSL_VERIFY") {
            self.ticketsvc.ssl_verify = v.parse().unwrap_or(true);
        }
        if let Ok(v) = std::env::var("EVOLUTION_API_BASE_URL") {
            self.messaging.base_url = v;
        }
        if let Ok(v) = std::env::var("EVOLUTION_API_KEY") {
            self.messaging.api_key = v;
        }
        if let Ok(v) = std::env::var("EVOLUTION_INSTANCE_NAME") {
            self.messaging.instance_name = v;
        }
        if let (Ok(host), Ok(port), Ok(name), Ok(user), Ok(password)) = (
            std::env::var("DB_HOST"),
            std::env::var("DB_PORT"),
            std::env::var("DB_NAME"),
            std::env::var("DB_USER"),
            std::env::var("DB_PASSWORD"),
        ) {
            self.database_url =
                format!("postgres://{user}:{password}@{host}:{port}/{name}");
        }
        self
    }
}

/// Known runtime config keys (spec §4.A). Centralized so callers never
/// typo a key name.
pub mod keys {
    pub const TICKET_ALERT_THRESHOLD_MINUTES: &str = "TICKET_ALERT_THRESHOLD_MINUTES";
    pub const TICKET_UPDATE_THRESHOLD_MINUTES: &str = "TICKET_UPDATE_THRESHOLD_MINUTES";
    pub const TICKET_RENOTIFICATION_INTERVAL_MINUTES: &str =
        "TICKET_RENOTIFICATION_INTERVAL_MINUTES";
    pub const END_OF_SHIFT_NOTIFICATION_MINUTES: &str = "END_OF_SHIFT_NOTIFICATION_MINUTES";
    pub const OUTHOUSE_NO_ALERT_MINUTES: &str = "OUTHOUSE_NO_ALERT_MINUTES";
    pub const TICKET_PRE_ALERT_MINUTES: &str = "TICKET_PRE_ALERT_MINUTES";
    pub const TICKET_REOPEN_WINDOW_MINUTES: &str = "TICKET_REOPEN_WINDOW_MINUTES";
    pub const FINDE_HORA_INICIO: &str = "FINDE_HORA_INICIO";
    pub const FINDE_HORA_FIN: &str = "FINDE_HORA_FIN";
    pub const SEMANA_HORA_INICIO: &str = "SEMANA_HORA_INICIO";
    pub const SEMANA_HORA_FIN: &str = "SEMANA_HORA_FIN";
    pub const ASSIGNMENT_RESET_HOURS: &str = "ASSIGNMENT_RESET_HOURS";
    pub const PERSONA_GUARDIA_FINDE: &str = "PERSONA_GUARDIA_FINDE";
    pub const WEBHOOK_MOTIVO_PERMITIDO: &str = "WEBHOOK_MOTIVO_PERMITIDO";
    pub const WHATSAPP_ENABLED: &str = "WHATSAPP_ENABLED";
    pub const SYSTEM_PAUSED: &str = "SYSTEM_PAUSED";
}

/// Documented defaults for the keys above, applied when a row is absent
/// from the `ConfigEntry` table (spec §4.A).
pub mod defaults {
    pub const TICKET_ALERT_THRESHOLD_MINUTES: i64 = 60;
    pub const TICKET_UPDATE_THRESHOLD_MINUTES: i64 = 60;
    pub const TICKET_RENOTIFICATION_INTERVAL_MINUTES: i64 = 60;
    pub const END_OF_SHIFT_NOTIFICATION_MINUTES: i64 = 60;
    pub const OUTHOUSE_NO_ALERT_MINUTES: i64 = 120;
    pub const TICKET_PRE_ALERT_MINUTES: i64 = 15;
    pub const TICKET_REOPEN_WINDOW_MINUTES: i64 = 7;
    pub const FINDE_HORA_INICIO: &str = "09:00";
    pub const FINDE_HORA_FIN: &str = "21:00";
    pub const SEMANA_HORA_INICIO: &str = "08:00";
    pub const SEMANA_HORA_FIN: &str = "20:00";
    pub const ASSIGNMENT_RESET_HOURS: &str = "8,16";
    pub const WEBHOOK_MOTIVO_PERMITIDO: &str = "soporte_tecnico";
    pub const WHATSAPP_ENABLED: bool = true;
    pub const SYSTEM_PAUSED: bool = false;
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Int(i64),
    Bool(bool),
    Str(String),
    Json(serde_json::Value),
}

impl ConfigValue {
    pub fn value_type(&self) -> ConfigValueType {
        match self {
            ConfigValue::Int(_) => ConfigValueType::Int,
            ConfigValue::Bool(_) => ConfigValueType::Bool,
            ConfigValue::Str(_) => ConfigValueType::String,
            ConfigValue::Json(_) => ConfigValueType::Json,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(v) => Some(*v),
            ConfigValue::Str(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(v) => Some(*v),
            ConfigValue::Str(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<String> {
        match self {
            ConfigValue::Str(v) => Some(v.clone()),
            ConfigValue::Int(v) => Some(v.to_string()),
            ConfigValue::Bool(v) => Some(v.to_string()),
            _ => None,
        }
    }
}

/// Seam for the runtime key/value config layer (spec §4.A). Implemented
/// against Postgres in `storage::config_store::PostgresConfigStore`.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get_raw(&self, key: &str) -> Result<Option<ConfigValue>>;

    /// Writes the value, bumps `updated_at`/`updated_by`, and drops the
    /// row from whatever cache the implementation keeps before returning.
    async fn set(
        &self,
        key: &str,
        value: ConfigValue,
        category: &str,
        updated_by: &str,
    ) -> Result<()>;

    async fn clear_cache(&self);

    async fn get_int(&self, key: &str, default: i64) -> i64 {
        self.get_raw(key)
            .await
            .ok()
            .flatten()
            .and_then(|v| v.as_int())
            .unwrap_or(default)
    }

    async fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get_raw(key)
            .await
            .ok()
            .flatten()
            .and_then(|v| v.as_bool())
            .unwrap_or(default)
    }

    async fn get_str(&self, key: &str, default: &str) -> String {
        self.get_raw(key)
            .await
            .ok()
            .flatten()
            .and_then(|v| v.as_str())
            .unwrap_or_else(|| default.to_string())
    }

    /// CSV-of-integers helper, used for `ASSIGNMENT_RESET_HOURS` (default "8,16").
    async fn get_csv_ints(&self, key: &str, default: &str) -> Vec<i64> {
        let raw = self.get_str(key, default).await;
        raw.split(',')
            .filter_map(|s| s.trim().parse::<i64>().ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_value_as_int_parses_string_fallback() {
        let v = ConfigValue::Str("42".into());
        assert_eq!(v.as_int(), Some(42));
    }

    #[test]
    fn config_value_type_roundtrips() {
        assert_eq!(ConfigValue::Bool(true).value_type(), ConfigValueType::Bool);
        assert_eq!(
            ConfigValue::Json(serde_json::json!({})).value_type(),
            ConfigValueType::Json
        );
    }
}
