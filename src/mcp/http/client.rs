//! HTTP client configuration and shared API call functionality for Planday.
//!
//! This module provides:
//! - Environment-based configuration (URLs, client id, refresh token)
//! - Shared HTTP client with timeouts, bearer authentication and the client id header
//! - OpenTelemetry integration for request tracing
//! - `ApiRequest`, the endpoint descriptor every tool builds

use std::{env, sync::Arc, sync::LazyLock, time::Duration};

use anyhow::{Result, anyhow};
use http::Extensions;
use reqwest::{Request, Response, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, Result as MiddlewareResult};
use reqwest_tracing::{
    ReqwestOtelSpanBackend, TracingMiddleware, default_on_request_end, reqwest_otel_span,
};
use serde_json::Value;
use tracing::Span;

use crate::mcp::{auth::SessionAuthority, error::PlandayError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// Load configuration from environment variables
pub static PLANDAY_CLIENT_ID: LazyLock<Result<String>> = LazyLock::new(|| {
    env::var("PLANDAY_CLIENT_ID").map_err(|e| anyhow!("PLANDAY_CLIENT_ID must be set: {e}"))
});

pub static PLANDAY_API_BASE_URL: LazyLock<Result<String>> = LazyLock::new(|| {
    Ok(env::var("PLANDAY_API_BASE_URL")
        .unwrap_or_else(|_| "https://openapi.planday.com".to_string())
        .trim_end_matches('/')
        .to_string())
});

pub static PLANDAY_TOKEN_URL: LazyLock<Result<String>> = LazyLock::new(|| {
    Ok(env::var("PLANDAY_TOKEN_URL")
        .unwrap_or_else(|_| "https://id.planday.com/connect/token".to_string()))
});

pub static BIND_ADDRESS: LazyLock<Result<String>> = LazyLock::new(|| {
    Ok(env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string()))
});

/// Optional; when present the server authenticates at startup.
pub static PLANDAY_REFRESH_TOKEN: LazyLock<Option<String>> = LazyLock::new(|| {
    env::var("PLANDAY_REFRESH_TOKEN")
        .ok()
        .filter(|token| !token.trim().is_empty())
});

// Custom Tracing Backend for Reqwest to integrate with OpenTelemetry.
// Only used as a type parameter of TracingMiddleware, which dead code analysis misses.
// Headers stay out of the span, they carry the bearer token.
#[allow(dead_code)]
struct CustomTracing;

impl ReqwestOtelSpanBackend for CustomTracing {
    fn on_request_start(req: &Request, _extension: &mut Extensions) -> Span {
        reqwest_otel_span!(name = "planday-api-request", req)
    }

    fn on_request_end(
        span: &Span,
        outcome: &MiddlewareResult<Response>,
        _extension: &mut Extensions,
    ) {
        default_on_request_end(span, outcome);
    }
}

/// Describes one GET against the Planday open API, relative to the base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    path: String,
    query: Vec<(String, String)>,
    timeout: Option<Duration>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
            timeout: None,
        }
    }

    #[must_use]
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn query_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Performs authenticated calls, pulling a bearer token from the shared
/// `SessionAuthority` for every request.
pub struct PlandayClient {
    http: ClientWithMiddleware,
    authority: Arc<SessionAuthority>,
    base_url: String,
    client_id: String,
}

impl PlandayClient {
    /// # Errors
    /// `MissingConfig` when required environment variables are absent,
    /// `Http` when the underlying client cannot be built.
    pub fn from_env(authority: Arc<SessionAuthority>) -> Result<Self, PlandayError> {
        let base_url = PLANDAY_API_BASE_URL
            .as_ref()
            .map_err(|e| PlandayError::MissingConfig(e.to_string()))?;
        let client_id = PLANDAY_CLIENT_ID
            .as_ref()
            .map_err(|e| PlandayError::MissingConfig(e.to_string()))?;
        Self::new(authority, base_url, client_id)
    }

    /// # Errors
    /// `Http` when the underlying client cannot be built.
    pub fn new(
        authority: Arc<SessionAuthority>,
        base_url: &str,
        client_id: &str,
    ) -> Result<Self, PlandayError> {
        let client = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        let http = ClientBuilder::new(client)
            .with(TracingMiddleware::<CustomTracing>::new())
            .build();

        Ok(Self {
            http,
            authority,
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
        })
    }

    pub fn authority(&self) -> &Arc<SessionAuthority> {
        &self.authority
    }

    /// Makes an authenticated request to the Planday open API.
    ///
    /// # Errors
    /// * `Unauthenticated` - No session, or Planday rejected the bearer token
    /// * `NotFound` - The endpoint answered 404
    /// * `Api` - Any other non-success status
    /// * `Http` / `HttpMiddleware` - Network failures
    pub async fn call(&self, request: &ApiRequest) -> Result<Value, PlandayError> {
        let token = self.authority.require_access_token().await?;
        let url = format!("{}{}", self.base_url, request.path);

        let mut builder = self
            .http
            .get(&url)
            .bearer_auth(token)
            .header("X-ClientId", self.client_id.as_str())
            .query(&request.query);

        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;
        match response.status() {
            StatusCode::UNAUTHORIZED => Err(PlandayError::Unauthenticated),
            StatusCode::NOT_FOUND => Err(PlandayError::NotFound(request.path.clone())),
            status if !status.is_success() => Err(PlandayError::Api {
                status: status.as_u16(),
                path: request.path.clone(),
            }),
            _ => Ok(response.json().await?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_opt_skips_absent_values() {
        let request = ApiRequest::get("/scheduling/v1.0/shifts")
            .query("from", "2026-03-02")
            .query_opt("departmentId", None::<i64>)
            .query_opt("employeeId", Some(5));

        assert_eq!(request.path, "/scheduling/v1.0/shifts");
        assert_eq!(
            request.query,
            [
                ("from".to_string(), "2026-03-02".to_string()),
                ("employeeId".to_string(), "5".to_string()),
            ]
        );
    }

    #[test]
    fn bind_address_is_a_socket_address() {
        let address = BIND_ADDRESS.as_ref().unwrap();
        assert!(address.parse::<std::net::SocketAddr>().is_ok());
    }

    #[test]
    fn timeout_is_per_request() {
        let request = ApiRequest::get("/payroll/v1.0/payroll").timeout(Duration::from_secs(60));
        assert_eq!(request.timeout, Some(Duration::from_secs(60)));
        assert_eq!(ApiRequest::get("/hr/v1.0/employees").timeout, None);
    }
}
