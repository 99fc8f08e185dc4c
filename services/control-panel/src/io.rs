//! HTTP client abstraction for testability

use async_trait::async_trait;

use crate::error::{ControlPanelError, Result};

/// HTTP response from a request
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Abstraction over HTTP client for dependency injection
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait HttpClient: Send + Sync {
    /// Send a GET request with query parameters
    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<HttpResponse>;

    /// Send a GET request carrying an `Authorization` header
    async fn get_with_auth(&self, url: &str, authorization: &str) -> Result<HttpResponse>;

    /// Send a POST request with form-encoded body
    async fn post_form(&self, url: &str, params: &[(&str, &str)]) -> Result<HttpResponse>;
}

/// Production HTTP client using reqwest
///
/// Keeps a cookie store so the session cookie handed out on login is sent
/// with every later request.
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| ControlPanelError::Http(format!("Building HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    async fn finish(method: &str, url: &str, response: reqwest::Response) -> Result<HttpResponse> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ControlPanelError::Http(format!("Reading response body: {}", e)))?;

        tracing::debug!("{} {} -> {} ({} bytes)", method, url, status, body.len());
        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<HttpResponse> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| ControlPanelError::Http(format!("GET {} failed: {}", url, e)))?;

        Self::finish("GET", url, response).await
    }

    async fn get_with_auth(&self, url: &str, authorization: &str) -> Result<HttpResponse> {
        tracing::debug!("GET {} (authenticated)", url);
        let response = self
            .client
            .get(url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .send()
            .await
            .map_err(|e| ControlPanelError::Http(format!("GET {} failed: {}", url, e)))?;

        Self::finish("GET", url, response).await
    }

    async fn post_form(&self, url: &str, params: &[(&str, &str)]) -> Result<HttpResponse> {
        tracing::debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .form(params)
            .send()
            .await
            .map_err(|e| ControlPanelError::Http(format!("POST {} failed: {}", url, e)))?;

        Self::finish("POST", url, response).await
    }
}
