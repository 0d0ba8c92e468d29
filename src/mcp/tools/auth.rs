//! Tools for managing the shared Planday session.

use anyhow::Result;
use rmcp::{ErrorData, handler::server::wrapper::Parameters, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::mcp::auth::SessionAuthority;

#[derive(Serialize, Deserialize, JsonSchema)]
pub struct AuthenticateRequest {
    #[schemars(
        description = "Planday refresh token, generated when connecting an API application in Planday (Settings > API access)."
    )]
    pub refresh_token: String,
}

pub async fn authenticate(
    authority: &SessionAuthority,
    Parameters(args): Parameters<AuthenticateRequest>,
) -> Result<CallToolResult, ErrorData> {
    let confirmation = authority.authenticate(&args.refresh_token).await?;

    Ok(CallToolResult::structured(json!({
        "authenticated": true,
        "access_token_expires_at": confirmation.expires_at.to_rfc3339(),
    })))
}

pub async fn get_authentication_status(
    authority: &SessionAuthority,
) -> Result<CallToolResult, ErrorData> {
    let status = authority.status().await;

    Ok(CallToolResult::structured(json!({
        "authenticated": status.authenticated,
        "access_token_expires_at": status.token_expires_at.map(|at| at.to_rfc3339()),
    })))
}

pub async fn clear_session(authority: &SessionAuthority) -> Result<CallToolResult, ErrorData> {
    authority.clear_session().await;

    Ok(CallToolResult::structured(json!({ "authenticated": false })))
}
