//! Refresh-token grant against the Planday identity server.

use std::time::Duration;

use async_trait::async_trait;
use oauth2::{
    AuthType, ClientId, EndpointNotSet, EndpointSet, RefreshToken, RequestTokenError,
    TokenResponse, TokenUrl, basic::BasicClient,
};
use tracing::debug;

use crate::mcp::error::PlandayError;

/// Used when the identity server omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

type PlandayOAuthClient =
    BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Result of one successful exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub expires_in: Duration,
}

/// Turns a long-lived refresh token into a short-lived access token.
///
/// One call is one request. Implementations never retry.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    async fn exchange(&self, refresh_token: &str) -> Result<TokenGrant, PlandayError>;
}

pub struct OAuthExchanger {
    client: PlandayOAuthClient,
    http: reqwest::Client,
}

impl OAuthExchanger {
    /// # Errors
    /// Returns `MissingConfig` when the token URL is not a valid URL and
    /// `Http` when the underlying client cannot be built.
    pub fn new(client_id: &str, token_url: &str) -> Result<Self, PlandayError> {
        let token_url = TokenUrl::new(token_url.to_string())
            .map_err(|e| PlandayError::MissingConfig(format!("Invalid token URL: {e}")))?;

        // Planday identifies the application by client_id in the form body
        let client = BasicClient::new(ClientId::new(client_id.to_string()))
            .set_auth_type(AuthType::RequestBody)
            .set_token_uri(token_url);

        let http = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client, http })
    }
}

#[async_trait]
impl TokenExchanger for OAuthExchanger {
    async fn exchange(&self, refresh_token: &str) -> Result<TokenGrant, PlandayError> {
        let response = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| match e {
                RequestTokenError::ServerResponse(resp) => {
                    PlandayError::ExchangeFailed(resp.to_string())
                }
                RequestTokenError::Request(e) => {
                    PlandayError::ExchangeFailed(format!("request failed: {e}"))
                }
                RequestTokenError::Parse(e, _) => {
                    PlandayError::ExchangeFailed(format!("unreadable token response: {e}"))
                }
                RequestTokenError::Other(msg) => PlandayError::ExchangeFailed(msg),
            })?;

        let expires_in = response.expires_in().unwrap_or_else(|| {
            debug!("token response carried no expires_in, assuming one hour");
            DEFAULT_TOKEN_LIFETIME
        });

        Ok(TokenGrant {
            access_token: response.access_token().secret().clone(),
            expires_in,
        })
    }
}
