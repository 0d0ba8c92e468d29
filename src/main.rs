use std::sync::Arc;

use anyhow::{Result, anyhow};
use axum::{Router, serve};
use dotenv::dotenv;
use rmcp::transport::{
    StreamableHttpServerConfig, StreamableHttpService,
    streamable_http_server::session::local::LocalSessionManager,
};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod mcp;
use mcp::{
    PlandayMCPFactory,
    auth::{OAuthExchanger, SessionAuthority},
    http::{BIND_ADDRESS, PLANDAY_CLIENT_ID, PLANDAY_REFRESH_TOKEN, PLANDAY_TOKEN_URL, PlandayClient},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load variables from .env file if it exists into the environment
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".to_string().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Fail fast on missing configuration
    let client_id = PLANDAY_CLIENT_ID
        .as_ref()
        .map_err(|e| anyhow!("Failed to load PLANDAY_CLIENT_ID: {e}"))?;
    let token_url = PLANDAY_TOKEN_URL
        .as_ref()
        .map_err(|e| anyhow!("Failed to load PLANDAY_TOKEN_URL: {e}"))?;

    // One session shared by every MCP session the service creates
    let exchanger = OAuthExchanger::new(client_id, token_url)?;
    let authority = Arc::new(SessionAuthority::new(Arc::new(exchanger)));
    let client = Arc::new(PlandayClient::from_env(Arc::clone(&authority))?);

    if let Some(refresh_token) = PLANDAY_REFRESH_TOKEN.as_deref() {
        match authority.authenticate(refresh_token).await {
            Ok(confirmation) => {
                info!(expires_at = %confirmation.expires_at, "authenticated from PLANDAY_REFRESH_TOKEN");
            }
            Err(e) => warn!(error = %e, "PLANDAY_REFRESH_TOKEN was rejected, tools will require authenticate"),
        }
    }

    // Setting up the Streamable HTTP Service
    info!("Setting up the Streamable HTTP Service for the Planday MCP Factory");
    let service = StreamableHttpService::new(
        move || Ok(PlandayMCPFactory::new(Arc::clone(&client))),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    );

    // Starting the server... Setting up the router and TCP listener
    let bind_address = BIND_ADDRESS
        .as_ref()
        .map_err(|e| anyhow!("Failed to load BIND_ADDRESS: {e}"))?;
    info!("Starting server on {}", bind_address);
    let router = Router::new().nest_service("/mcp", service);
    let tcp_listener = TcpListener::bind(bind_address.as_str()).await?;

    // Graceful shutdown on CTRL+C
    let shutdown = async {
        signal::ctrl_c().await.unwrap_or_else(|e| {
            eprintln!("failed to install CTRL+C handler: {e}");
        });
    };

    // Finally start the server with graceful shutdown
    serve(tcp_listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
