//! Login against Polypheny-Control
//!
//! The server protects every page with Basic auth and hands out a session
//! cookie on the first accepted request. Logging in is therefore a single
//! authenticated GET of the site root; afterwards the cookie store of the
//! HTTP client carries the session.

use std::sync::Arc;

use base64::Engine;

use crate::io::HttpClient;

/// `Authorization` header value for Basic auth
pub fn basic_auth_header(name: &str, password: &str) -> String {
    let token =
        base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", name, password));
    format!("Basic {}", token)
}

/// Where the login page sends the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// The dashboard at the site root
    Root(String),
}

/// State of the login page
pub struct LoginPage {
    base_url: String,
    http: Arc<dyn HttpClient>,
    invalid_visible: bool,
    location: Option<Navigation>,
}

impl std::fmt::Debug for LoginPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginPage")
            .field("base_url", &self.base_url)
            .field("invalid_visible", &self.invalid_visible)
            .field("location", &self.location)
            .finish()
    }
}

impl LoginPage {
    /// `base_url` is the site root and must end in `/`
    pub fn new(base_url: impl Into<String>, http: Arc<dyn HttpClient>) -> Self {
        Self {
            base_url: base_url.into(),
            http,
            invalid_visible: false,
            location: None,
        }
    }

    /// Whether the "invalid credentials" message is shown
    pub fn invalid_visible(&self) -> bool {
        self.invalid_visible
    }

    /// Navigation triggered by the page, if any
    pub fn location(&self) -> Option<&Navigation> {
        self.location.as_ref()
    }

    /// Submit the login form; returns true if the credentials were accepted
    ///
    /// Any non-2xx status and any transport failure count as rejected.
    pub async fn login(&mut self, name: &str, password: &str) -> bool {
        let header = basic_auth_header(name, password);
        match self.http.get_with_auth(&self.base_url, &header).await {
            Ok(response) if response.is_success() => {
                tracing::info!("Logged in as {}", name);
                self.invalid_visible = false;
                self.location = Some(Navigation::Root(self.base_url.clone()));
                true
            }
            Ok(response) => {
                tracing::debug!("Login as {} rejected with status {}", name, response.status);
                self.invalid_visible = true;
                false
            }
            Err(e) => {
                tracing::debug!("Login request failed: {}", e);
                self.invalid_visible = true;
                false
            }
        }
    }

    /// Skip the form when the session is already authenticated
    ///
    /// Navigates only on status 200 with a body of exactly `true`.
    pub async fn check_authentication(&mut self) -> bool {
        let url = format!("{}session/is_authenticated", self.base_url);
        match self.http.get(&url, &[]).await {
            Ok(response) if response.status == 200 && response.body == "true" => {
                tracing::debug!("Session is already authenticated");
                self.location = Some(Navigation::Root(self.base_url.clone()));
                true
            }
            Ok(response) => {
                tracing::debug!(
                    "Session not authenticated: status={} body={:?}",
                    response.status,
                    response.body
                );
                false
            }
            Err(e) => {
                tracing::error!("Session check failed: {}", e);
                false
            }
        }
    }
}
