//! Thin HTTP client for the operator CLI (teacher precedent:
//! `crates/cli/src/api_client.rs::ApiClient`), talking to the same
//! `ticketops-api` server a webhook would hit.

use anyhow::{bail, Result};
use serde::Deserialize;
use serde_json::json;

pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Deserialize, Debug)]
pub struct TriggerResponse {
    pub success: bool,
}

#[derive(Deserialize, Debug)]
pub struct SystemStatusResponse {
    pub paused: bool,
    pub paused_at: Option<String>,
    pub paused_by: Option<String>,
    pub reason: Option<String>,
    pub resumed_at: Option<String>,
    pub resumed_by: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), client: reqwest::Client::new() }
    }

    pub async fn trigger_job(&self, job: &str) -> Result<TriggerResponse> {
        let url = format!("{}/api/tickets/{job}", self.base_url);
        let response = self.client.post(&url).send().await?;
        if !response.status().is_success() {
            bail!("job trigger failed: {}", response.status());
        }
        Ok(response.json().await?)
    }

    pub async fn status(&self) -> Result<SystemStatusResponse> {
        let url = format!("{}/api/system/status", self.base_url);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            bail!("status request failed: {}", response.status());
        }
        Ok(response.json().await?)
    }

    pub async fn pause(&self, actor: &str, reason: Option<&str>) -> Result<TriggerResponse> {
        let url = format!("{}/api/system/pause", self.base_url);
        let response = self.client.post(&url).json(&json!({"actor": actor, "reason": reason})).send().await?;
        if !response.status().is_success() {
            bail!("pause request failed: {}", response.status());
        }
        Ok(response.json().await?)
    }

    pub async fn resume(&self, actor: &str) -> Result<TriggerResponse> {
        let url = format!("{}/api/system/resume", self.base_url);
        let response = self.client.post(&url).json(&json!({"actor": actor})).send().await?;
        if !response.status().is_success() {
            bail!("resume request failed: {}", response.status());
        }
        Ok(response.json().await?)
    }
}
