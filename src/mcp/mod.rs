//! Planday Model Context Protocol implementation.
//!
//! This crate provides MCP tools for interacting with Planday's open API.
//! The implementation is organized into:
//!
//! - `auth`: The shared session and token refresh
//! - `error`: Error types and conversions
//! - `http`: HTTP client and API communication
//! - `models`: Planday response shapes
//! - `resolve`: Foreign-key to name resolution for primary records
//! - `tools`: Individual MCP tools for specific Planday operations
//!
//! The main entry point is the `PlandayMCPFactory` which provides the MCP server
//! implementation and manages all tools.

pub mod auth;
pub mod error;
pub mod http;
pub mod models;
pub mod resolve;
pub mod tools;

use std::sync::Arc;

use axum::http::request;
use rmcp::{
    ErrorData, RoleServer, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Implementation, InitializeRequestParam, InitializeResult,
        ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use tracing::info;

use crate::mcp::http::PlandayClient;

// Tool modules and commonly used tool types
use crate::mcp::tools::{
    absence::{self, AbsenceRecordsRequest},
    auth::{self as auth_tools, AuthenticateRequest},
    payroll::{self, PayrollRequest},
    shifts::{self, ShiftsRequest},
};

/// One instance per MCP session; all instances share the same client and
/// therefore the same Planday session.
#[derive(Clone)]
pub struct PlandayMCPFactory {
    client: Arc<PlandayClient>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl PlandayMCPFactory {
    pub fn new(client: Arc<PlandayClient>) -> Self {
        Self {
            client,
            tool_router: Self::tool_router(),
        }
    }

    // Thin delegating methods so the `tool_router` proc-macro (which scans
    // this impl block) can discover and register the tools.

    #[tool(
        description = "Authenticate with Planday using a refresh token from an API application. Must be called before any other Planday tool unless the server was started with a refresh token."
    )]
    async fn authenticate(
        &self,
        params: Parameters<AuthenticateRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        auth_tools::authenticate(self.client.authority(), params).await
    }

    #[tool(description = "Report whether a Planday session exists and when its access token expires.")]
    async fn get_authentication_status(&self) -> Result<CallToolResult, ErrorData> {
        auth_tools::get_authentication_status(self.client.authority()).await
    }

    #[tool(description = "Forget the current Planday session. Tools will require authenticating again.")]
    async fn clear_session(&self) -> Result<CallToolResult, ErrorData> {
        auth_tools::clear_session(self.client.authority()).await
    }

    #[tool(
        description = "Get scheduled shifts between two dates (YYYY-MM-DD), optionally for one department or employee. Each shift includes the employee, department, position and shift type names."
    )]
    async fn get_shifts(
        &self,
        params: Parameters<ShiftsRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        shifts::get_shifts(&self.client, params).await
    }

    #[tool(
        description = "Get absence records between two dates (YYYY-MM-DD), optionally for one employee or a set of statuses. Each record includes the employee name."
    )]
    async fn get_absence_records(
        &self,
        params: Parameters<AbsenceRecordsRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        absence::get_absence_records(&self.client, params).await
    }

    #[tool(
        description = "Get shift payroll for one or more departments between two dates (YYYY-MM-DD). Each line includes the employee, department, position and employee group names."
    )]
    async fn get_payroll(
        &self,
        params: Parameters<PayrollRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        payroll::get_payroll(&self.client, params).await
    }
}

#[tool_handler]
impl ServerHandler for PlandayMCPFactory {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Planday workforce management MCP Server: shifts, absence and payroll with resolved employee, department and position names. Authenticate first."
                    .to_string(),
            ),
        }
    }

    async fn initialize(
        &self,
        _request: InitializeRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<InitializeResult, ErrorData> {
        if let Some(http_request_part) = context.extensions.get::<request::Parts>() {
            let initialize_uri = &http_request_part.uri;
            let user_agent = http_request_part
                .headers
                .get(axum::http::header::USER_AGENT)
                .and_then(|value| value.to_str().ok());
            info!(%initialize_uri, ?user_agent, "initialize from http server");
        }
        Ok(self.get_info())
    }
}
