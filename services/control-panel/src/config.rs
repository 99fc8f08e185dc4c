//! Configuration types for the control panel client

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::settings::{FieldKind, FormField};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default)]
    pub client_type: ClientType,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default = "default_settings_form")]
    pub settings_form: Vec<FormField>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            credentials: Credentials::default(),
            client_type: ClientType::default(),
            output: OutputConfig::default(),
            reconnect: ReconnectConfig::default(),
            settings_form: default_settings_form(),
        }
    }
}

impl Config {
    /// Read the password from the environment when `password_env` is set
    pub fn resolve_secrets(&mut self) -> crate::Result<()> {
        if let Some(var) = &self.credentials.password_env {
            let password = std::env::var(var).map_err(|_| {
                crate::ControlPanelError::Config(format!(
                    "Environment variable {} is not set",
                    var
                ))
            })?;
            tracing::debug!("Resolved password from environment variable {}", var);
            self.credentials.password = Some(password);
        }
        Ok(())
    }
}

/// Location of the Polypheny-Control server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Use https/wss instead of http/ws
    #[serde(default)]
    pub secure: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            secure: false,
        }
    }
}

impl ServerConfig {
    /// Base URL for REST requests, always ending in `/`
    pub fn base_url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}:{}/", scheme, self.host, self.port)
    }

    /// URL of the server's push socket
    pub fn socket_url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{}://{}:{}/socket/", scheme, self.host, self.port)
    }
}

/// Basic auth credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Name of an environment variable holding the password
    #[serde(default)]
    pub password_env: Option<String>,
}

impl Credentials {
    /// Username and password, if both are known
    pub fn pair(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(password)) => Some((user.as_str(), password.as_str())),
            _ => None,
        }
    }
}

/// Kind of client announced to the server via `client/type`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientType {
    #[default]
    Browser,
    Benchmarker,
}

impl ClientType {
    /// Wire name expected by the server
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientType::Browser => "BROWSER",
            ClientType::Benchmarker => "BENCHMARKER",
        }
    }
}

/// Output panel settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            max_lines: default_max_lines(),
        }
    }
}

/// Configuration for reconnecting the push socket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_reconnect_interval")]
    pub interval_seconds: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_seconds: default_reconnect_interval(),
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8070
}

fn default_max_lines() -> usize {
    1000
}

fn default_reconnect_interval() -> u64 {
    3
}

/// Fields shown on the settings page of a stock Polypheny-Control install
pub fn default_settings_form() -> Vec<FormField> {
    vec![
        FormField::new("pcrtl.pdbms.branch", FieldKind::PdbBranch),
        FormField::new("pcrtl.ui.branch", FieldKind::PuiBranch),
        FormField::new(
            "pcrtl.buildmode",
            FieldKind::Select(vec!["both".into(), "pdb".into(), "pui".into()]),
        ),
        FormField::new(
            "pcrtl.clean.mode",
            FieldKind::Select(vec![
                "never".into(),
                "branchChange".into(),
                "always".into(),
            ]),
        ),
        FormField::new("pcrtl.java.heap", FieldKind::Text),
        FormField::new("pcrtl.java.options", FieldKind::Text),
        FormField::new("pcrtl.pdbms.args", FieldKind::Text),
    ]
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::ControlPanelError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}
