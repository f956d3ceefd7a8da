use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use ticketops_common::error::RemoteError;
use tokio::sync::RwLock;
use tracing::{instrument, warn};

use crate::model::{CreateTicketRequest, RemoteTicket, TicketPriority};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Thin wrapper over the remote ticketing platform's REST surface (spec
/// §4.C). The bearer token is shared state behind a lock; a 401 triggers
/// at most one concurrent refresh (spec §5).
pub struct TicketSvcClient {
    http: reqwest::Client,
    base_url: String,
    login: String,
    password: String,
    token: RwLock<Option<String>>,
}

impl TicketSvcClient {
    pub fn new(base_url: impl Into<String>, login: impl Into<String>, password: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .expect("reqwest client builder should not fail with static config");
        Self {
            http,
            base_url: base_url.into(),
            login: login.into(),
            password: password.into(),
            token: RwLock::new(None),
        }
    }

    #[instrument(skip(self))]
    pub async fn login(&self) -> Result<String, RemoteError> {
        let url = format!("{}/admin/auth/tokens", self.base_url);
        let body = json!({
            "auth_type": "admin",
            "login": self.login,
            "password": self.password,
        });
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(RemoteError::Transport(format!(
                "login failed with status {}",
                resp.status()
            )));
        }
        let parsed: Value = resp
            .json()
            .await
            .map_err(|e| RemoteError::Protocol(e.to_string()))?;
        let access_token = parsed
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| RemoteError::Protocol("login response missing access_token".into()))?
            .to_string();

        *self.token.write().await = Some(access_token.clone());
        Ok(access_token)
    }

    async fn auth_header(&self) -> Result<String, RemoteError> {
        let existing = self.token.read().await.clone();
        let token = match existing {
            Some(t) => t,
            None => self.login().await?,
        };
        Ok(format!("Splynx-EA (access_token={token})"))
    }

    /// Sends one request, refreshing the token and retrying exactly once
    /// on 401 (spec §4.C). Treats 200/201/202/204 as success and
    /// synthesizes `{}` on an empty body.
    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, RemoteError> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempted_refresh = false;

        loop {
            let auth = self.auth_header().await?;
            let mut req = self.http.request(method.clone(), &url).header("Authorization", auth);
            if let Some(b) = &body {
                req = req.json(b);
            }
            let resp = req.send().await.map_err(|e| RemoteError::Transport(e.to_string()))?;
            let status = resp.status();

            if status == StatusCode::UNAUTHORIZED {
                if !attempted_refresh {
                    attempted_refresh = true;
                    *self.token.write().await = None;
                    continue;
                }
                // Already refreshed once this request and still 401'd:
                // the worker aborts this round rather than retrying forever.
                return Err(RemoteError::AuthExpired);
            }
            if status == StatusCode::NOT_FOUND {
                return Err(RemoteError::NotFound);
            }
            if !status.is_success() {
                return Err(RemoteError::Transport(format!("status {status}")));
            }

            let bytes = resp.bytes().await.map_err(|e| RemoteError::Transport(e.to_string()))?;
            if bytes.is_empty() {
                return Ok(json!({}));
            }
            return serde_json::from_slice(&bytes).map_err(|e| RemoteError::Protocol(e.to_string()));
        }
    }

    fn parse_ticket(value: &Value) -> Result<RemoteTicket, RemoteError> {
        let closed_raw = value
            .get("closed")
            .cloned()
            .unwrap_or(Value::String("0".into()));
        let closed = match closed_raw {
            Value::Bool(b) => b,
            Value::String(s) => s == "1",
            Value::Number(n) => n.as_i64() == Some(1),
            _ => false,
        };
        let assign_to = value
            .get("assign_to")
            .or_else(|| value.get("assigned_to"))
            .and_then(|v| {
                v.as_i64().or_else(|| v.as_str().and_then(|s| s.parse().ok()))
            })
            .filter(|id| *id != 0);

        Ok(RemoteTicket {
            id: value
                .get("id")
                .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                .ok_or_else(|| RemoteError::Protocol("ticket missing id".into()))?,
            closed,
            status_id: value.get("status_id").and_then(Value::as_str).map(str::to_string),
            updated_at: value.get("updated_at").and_then(Value::as_str).map(str::to_string),
            created_at: value.get("created_at").and_then(Value::as_str).map(str::to_string),
            assign_to,
            subject: value.get("subject").and_then(Value::as_str).map(str::to_string),
            customer_id: value.get("customer_id").and_then(Value::as_str).map(str::to_string),
            priority: value.get("priority").and_then(Value::as_str).map(str::to_string),
        })
    }

    #[instrument(skip(self))]
    pub async fn get_ticket(&self, id: &str) -> Result<RemoteTicket, RemoteError> {
        let path = format!("/admin/support/tickets/{id}");
        let value = self.request(Method::GET, &path, None).await?;
        Self::parse_ticket(&value)
    }

    #[instrument(skip(self))]
    pub async fn list_unassigned(&self, group_id: &str) -> Result<Vec<RemoteTicket>, RemoteError> {
        self.list_by_group(group_id, false).await
    }

    #[instrument(skip(self))]
    pub async fn list_assigned(&self, group_id: &str) -> Result<Vec<RemoteTicket>, RemoteError> {
        self.list_by_group(group_id, true).await
    }

    async fn list_by_group(&self, group_id: &str, assigned: bool) -> Result<Vec<RemoteTicket>, RemoteError> {
        let path = format!("/admin/support/tickets?group_id={group_id}");
        let value = self.request(Method::GET, &path, None).await?;
        let items = value.as_array().cloned().unwrap_or_default();
        let tickets: Vec<RemoteTicket> = items
            .iter()
            .filter_map(|v| Self::parse_ticket(v).ok())
            .filter(|t| !t.closed && (t.assign_to.is_some() == assigned))
            .collect();
        Ok(tickets)
    }

    #[instrument(skip(self, req))]
    pub async fn create_ticket(&self, req: CreateTicketRequest<'_>) -> Result<String, RemoteError> {
        let body = json!({
            "customer_id": req.customer_id,
            "subject": req.subject,
            "note": req.note,
            "created_at": req.created_at,
            "priority": req.priority.to_string(),
            "status_id": req.status_id,
            "group_id": req.group_id,
            "type_id": req.type_id,
            "assign_to": req.assign_to,
        });
        let value = self.request(Method::POST, "/admin/support/tickets", Some(body)).await?;
        value
            .get("id")
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
            .ok_or_else(|| RemoteError::Protocol("create_ticket response missing id".into()))
    }

    #[instrument(skip(self))]
    pub async fn update_assignment(&self, ticket_id: &str, assign_to: i64) -> Result<(), RemoteError> {
        let path = format!("/admin/support/tickets/{ticket_id}");
        let body = json!({ "assign_to": assign_to });
        self.request(Method::PUT, &path, Some(body)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn reopen_ticket(&self, ticket_id: &str) -> Result<(), RemoteError> {
        let path = format!("/admin/support/tickets/{ticket_id}");
        let body = json!({ "closed": 0, "status_id": 1 });
        self.request(Method::PUT, &path, Some(body)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn logged_in_client(server: &MockServer) -> TicketSvcClient {
        Mock::given(method("POST"))
            .and(path("/admin/auth/tokens"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "tok-1" })))
            .mount(server)
            .await;
        TicketSvcClient::new(server.uri(), "admin", "secret")
    }

    #[tokio::test]
    async fn login_stores_token() {
        let server = MockServer::start().await;
        let client = logged_in_client(&server).await;
        let token = client.login().await.unwrap();
        assert_eq!(token, "tok-1");
    }

    #[tokio::test]
    async fn get_ticket_parses_string_closed_flag() {
        let server = MockServer::start().await;
        let client = logged_in_client(&server).await;
        Mock::given(method("GET"))
            .and(path("/admin/support/tickets/77"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "77",
                "closed": "1",
                "assign_to": "0",
            })))
            .mount(&server)
            .await;

        let ticket = client.get_ticket("77").await.unwrap();
        assert!(ticket.closed);
        assert_eq!(ticket.assign_to, None);
    }

    #[tokio::test]
    async fn retries_once_after_401() {
        let server = MockServer::start().await;
        let client = logged_in_client(&server).await;

        Mock::given(method("GET"))
            .and(path("/admin/support/tickets/5"))
            .respond_with(ResponseTemplate::new(401))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/admin/auth/tokens"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "tok-2" })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/admin/support/tickets/5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "5", "closed": false })))
            .mount(&server)
            .await;

        let ticket = client.get_ticket("5").await.unwrap();
        assert_eq!(ticket.id, "5");
    }
}
