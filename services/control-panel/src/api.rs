//! REST endpoints of Polypheny-Control

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::auth::basic_auth_header;
use crate::config::ClientType;
use crate::error::{ControlPanelError, Result};
use crate::io::{HttpClient, HttpResponse};
use crate::message::{ClientId, Status, VersionInfo};
use crate::settings::{ConfigRecord, FormData};

/// Fire-and-forget control requests issued by the dashboard buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlAction {
    Start,
    Stop,
    Restart,
    Update,
    PurgePolyphenyFolder,
    PolyfierStart,
    PolyfierStopForcefully,
    PolyfierStopGracefully,
}

impl ControlAction {
    /// Endpoint path relative to the server root
    pub fn path(&self) -> &'static str {
        match self {
            ControlAction::Start => "control/start",
            ControlAction::Stop => "control/stop",
            ControlAction::Restart => "control/restart",
            ControlAction::Update => "control/update",
            ControlAction::PurgePolyphenyFolder => "control/purgePolyphenyFolder",
            ControlAction::PolyfierStart => "polyfier/start",
            ControlAction::PolyfierStopForcefully => "polyfier/stopForcefully",
            ControlAction::PolyfierStopGracefully => "polyfier/stopGracefully",
        }
    }
}

/// Client for the Polypheny-Control REST API
///
/// When credentials are set, a `401` answer triggers one re-authentication
/// against the site root followed by one retry of the request.
pub struct ControlApi {
    base_url: String,
    credentials: Option<(String, String)>,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for ControlApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlApi")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.credentials.is_some())
            .finish()
    }
}

impl ControlApi {
    /// `base_url` must end in `/`
    pub fn new(base_url: impl Into<String>, http: Arc<dyn HttpClient>) -> Self {
        Self {
            base_url: base_url.into(),
            credentials: None,
            http,
        }
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.credentials = Some((username.to_string(), password.to_string()));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Authenticate with the configured credentials so the HTTP client holds
    /// a session cookie; does nothing without credentials
    pub async fn login(&self) -> Result<()> {
        let Some((username, password)) = &self.credentials else {
            return Ok(());
        };
        let header = basic_auth_header(username, password);
        let response = self.http.get_with_auth(&self.base_url, &header).await?;
        if !response.is_success() {
            return Err(ControlPanelError::Authentication(format!(
                "credentials for {} rejected with status {}",
                username, response.status
            )));
        }
        tracing::debug!("Authenticated as {}", username);
        Ok(())
    }

    /// Log in again after the server dropped the session; returns whether
    /// the request is worth retrying
    async fn reauthenticate(&self) -> Result<bool> {
        if self.credentials.is_none() {
            return Ok(false);
        }
        tracing::info!("Session expired, re-authenticating");
        match self.login().await {
            Ok(()) => Ok(true),
            Err(ControlPanelError::Authentication(msg)) => {
                tracing::warn!("Re-authentication failed: {}", msg);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn get(&self, path: &str, client_id: ClientId) -> Result<HttpResponse> {
        let url = self.url(path);
        let id = client_id.to_string();
        let query = [("clientId", id.as_str())];

        let mut response = self.http.get(&url, &query).await?;
        if response.status == 401 && self.reauthenticate().await? {
            response = self.http.get(&url, &query).await?;
        }
        expect_success(url, response)
    }

    async fn post(&self, path: &str, params: &[(&str, &str)]) -> Result<HttpResponse> {
        let url = self.url(path);

        let mut response = self.http.post_form(&url, params).await?;
        if response.status == 401 && self.reauthenticate().await? {
            response = self.http.post_form(&url, params).await?;
        }
        expect_success(url, response)
    }

    /// Trigger a control action
    pub async fn send(&self, action: ControlAction, client_id: ClientId) -> Result<()> {
        tracing::debug!("Sending {:?} for client {}", action, client_id);
        let id = client_id.to_string();
        self.post(action.path(), &[("clientId", id.as_str())]).await?;
        Ok(())
    }

    /// Trigger an update of Polypheny-DB and Polypheny-UI
    ///
    /// The server is only updated from `idling`; any other status fails with
    /// [`ControlPanelError::NotIdle`] before anything is posted.
    pub async fn start_update(&self, client_id: ClientId) -> Result<()> {
        let status = self.status(client_id).await?;
        if status != Status::Idling {
            return Err(ControlPanelError::NotIdle {
                status: status.to_string(),
            });
        }
        self.send(ControlAction::Update, client_id).await
    }

    /// Poll `control/status` every `interval` until it reports `idling`
    pub async fn wait_until_idle(&self, client_id: ClientId, interval: Duration) -> Result<()> {
        loop {
            let status = self.status(client_id).await?;
            if status == Status::Idling {
                return Ok(());
            }
            tracing::debug!("Waiting for idling, status is {}", status);
            tokio::time::sleep(interval).await;
        }
    }

    /// Announce what kind of client sits behind `client_id`
    pub async fn set_client_type(&self, client_id: ClientId, client_type: ClientType) -> Result<()> {
        let id = client_id.to_string();
        self.post(
            "client/type",
            &[("clientId", id.as_str()), ("clientType", client_type.as_str())],
        )
        .await?;
        tracing::debug!("Registered client {} as {}", client_id, client_type.as_str());
        Ok(())
    }

    /// Version of the Polypheny-Control server itself (plain text)
    pub async fn control_version(&self, client_id: ClientId) -> Result<String> {
        let response = self.get("control/controlVersion", client_id).await?;
        Ok(response.body.trim().to_string())
    }

    pub async fn status(&self, client_id: ClientId) -> Result<Status> {
        let response = self.get("control/status", client_id).await?;
        let status = match serde_json::from_str::<String>(&response.body) {
            Ok(status) => status,
            Err(_) => response.body.trim().to_string(),
        };
        Ok(Status::from(status.as_str()))
    }

    pub async fn version(&self, client_id: ClientId) -> Result<VersionInfo> {
        let response = self.get("control/version", client_id).await?;
        let value: Value = serde_json::from_str(&response.body)?;
        let object = value.as_object().ok_or_else(|| {
            ControlPanelError::InvalidMessage(format!(
                "expected a version object, got: {}",
                response.body
            ))
        })?;
        Ok(VersionInfo::from_object(object))
    }

    pub async fn pdb_branches(&self, client_id: ClientId) -> Result<Vec<String>> {
        let response = self.get("control/pdbBranches", client_id).await?;
        Ok(serde_json::from_str(&response.body)?)
    }

    pub async fn pui_branches(&self, client_id: ClientId) -> Result<Vec<String>> {
        let response = self.get("control/puiBranches", client_id).await?;
        Ok(serde_json::from_str(&response.body)?)
    }

    /// Current configuration; non-string values are kept as their JSON text
    pub async fn get_config(&self, client_id: ClientId) -> Result<ConfigRecord> {
        let response = self.get("config/get", client_id).await?;
        let values: serde_json::Map<String, Value> = serde_json::from_str(&response.body)?;
        Ok(values
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect())
    }

    pub async fn set_config(&self, client_id: ClientId, config: &FormData) -> Result<()> {
        let id = client_id.to_string();
        let config = serde_json::to_string(config)?;
        self.post(
            "config/set",
            &[("clientId", id.as_str()), ("config", config.as_str())],
        )
        .await?;
        tracing::debug!("Saved configuration for client {}", client_id);
        Ok(())
    }
}

fn expect_success(url: String, response: HttpResponse) -> Result<HttpResponse> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(ControlPanelError::UnexpectedStatus {
            status: response.status,
            url,
        })
    }
}
