use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::AuthConfig;
use crate::error::{Error, Result};
use crate::types::Claims;

const TOKEN_PATH: &str = "/api/login/oauth/access_token";
const AUTHORIZE_PATH: &str = "/login/oauth/authorize";
const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Access token issued by the identity provider for an authorization code.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: i64,
}

/// Trades a one-time authorization code for an access token.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    async fn exchange_code(&self, code: &str, state: &str) -> Result<AccessToken>;
}

#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    token_type: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    expires_in: i64,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// HTTP client for the identity provider's OAuth token endpoint.
pub struct ProviderClient {
    client: reqwest::Client,
    endpoint: String,
    client_id: String,
    client_secret: String,
}

impl ProviderClient {
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(EXCHANGE_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        })
    }
}

#[async_trait]
impl TokenExchange for ProviderClient {
    async fn exchange_code(&self, code: &str, state: &str) -> Result<AccessToken> {
        if code.is_empty() {
            return Err(Error::ExchangeFailed("missing authorization code".into()));
        }

        let url = format!("{}{TOKEN_PATH}", self.endpoint);
        let resp = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("state", state),
            ])
            .send()
            .await
            .map_err(|e| Error::ExchangeFailed(e.to_string()))?;

        let status = resp.status();
        let body: TokenEndpointResponse = resp
            .json()
            .await
            .map_err(|e| Error::ExchangeFailed(format!("HTTP {status}: {e}")))?;

        // The provider reports rejected codes in the body, sometimes with a 200.
        if let Some(error) = body.error.filter(|e| !e.is_empty()) {
            let message = body
                .error_description
                .filter(|d| !d.is_empty())
                .unwrap_or(error);
            return Err(Error::ExchangeFailed(message));
        }
        if !status.is_success() {
            return Err(Error::ExchangeFailed(format!("HTTP {status}")));
        }
        if body.access_token.is_empty() {
            return Err(Error::ExchangeFailed(
                "identity provider returned no access token".into(),
            ));
        }

        Ok(AccessToken {
            access_token: body.access_token,
            token_type: body.token_type,
            refresh_token: body.refresh_token,
            expires_in: body.expires_in,
        })
    }
}

/// Resolves authorization codes into verified claims.
pub struct IdentityVerifier {
    exchange: Arc<dyn TokenExchange>,
    key: DecodingKey,
    validation: Validation,
    endpoint: String,
    client_id: String,
}

impl IdentityVerifier {
    pub fn new(config: &AuthConfig, exchange: Arc<dyn TokenExchange>) -> Result<Self> {
        let pem = config.public_key_pem()?;
        let key = DecodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| Error::Config(format!("invalid public key: {e}")))?;

        let mut validation = Validation::new(Algorithm::RS256);
        if config.client_id.is_empty() {
            validation.validate_aud = false;
        } else {
            validation.set_audience(&[&config.client_id]);
        }

        Ok(Self {
            exchange,
            key,
            validation,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
        })
    }

    /// Single attempt; codes are single-use so failures are never retried.
    pub async fn exchange_code(&self, code: &str, state: &str) -> Result<AccessToken> {
        self.exchange.exchange_code(code, state).await.inspect_err(|e| {
            warn!("Authorization code exchange failed: {e}");
        })
    }

    /// Verifies the token signature and expiry and decodes its identity fields.
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            warn!("Token verification failed: {e}");
            Error::TokenInvalid(e.to_string())
        })?;

        let claims = data.claims;
        if claims.principal.owner.is_empty() || claims.principal.name.is_empty() {
            warn!("Token verification failed: token carries no identity");
            return Err(Error::TokenInvalid("token carries no identity".into()));
        }

        debug!(
            "Verified token for {}",
            claims.principal.qualified_name()
        );
        Ok(claims)
    }

    /// The provider page that starts the authorization-code flow.
    #[must_use]
    pub fn sign_in_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}{AUTHORIZE_PATH}?client_id={}&response_type=code&redirect_uri={}&scope=read&state={}",
            self.endpoint,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(state),
        )
    }
}
