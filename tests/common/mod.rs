//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request, StatusCode, header};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use chatgate::auth::{AccessGate, AccessToken, MemorySessionStore, TokenExchange};
use chatgate::config::AuthConfig;
use chatgate::error::{Error, Result};
use chatgate::server::{AppState, create_router};
use chatgate::store::{SqliteStore, Store};
use chatgate::types::StoreConfig;

pub const SIGNING_KEY: &str = include_str!("../fixtures/signing_key.pem");
pub const PUBLIC_KEY: &str = include_str!("../fixtures/signing_key.pub.pem");
pub const PUBLIC_HOST: &str = "chat.example.com";
/// Address every test request arrives from, as if through a local reverse proxy.
pub const PEER: [u8; 4] = [127, 0, 0, 1];

pub fn auth_config(endpoint: &str, public_domain: &str) -> AuthConfig {
    AuthConfig {
        endpoint: endpoint.to_string(),
        client_id: "client-123".to_string(),
        client_secret: "secret".to_string(),
        organization: "acme".to_string(),
        application: "app-chat".to_string(),
        public_key: Some(PUBLIC_KEY.to_string()),
        public_domain: public_domain.to_string(),
        trusted_proxies: vec![IpAddr::from(PEER)],
        ..Default::default()
    }
}

/// An RS256 identity token as the provider would issue it.
pub fn sign_token(name: &str, is_admin: bool, role: &str) -> String {
    sign_token_in("acme", name, is_admin, role)
}

pub fn sign_token_in(owner: &str, name: &str, is_admin: bool, role: &str) -> String {
    let payload = json!({
        "owner": owner,
        "name": name,
        "id": format!("id-{name}"),
        "displayName": name.to_uppercase(),
        "email": format!("{name}@example.com"),
        "isAdmin": is_admin,
        "type": role,
        "aud": ["client-123"],
        "exp": Utc::now().timestamp() + 3600,
    });
    let key = EncodingKey::from_rsa_pem(SIGNING_KEY.as_bytes()).unwrap();
    encode(&Header::new(Algorithm::RS256), &payload, &key).unwrap()
}

/// Maps authorization codes to access tokens; unknown codes are refused.
pub struct StaticExchange {
    grants: Vec<(String, String)>,
}

impl StaticExchange {
    pub fn new(grants: &[(&str, &str)]) -> Self {
        Self {
            grants: grants
                .iter()
                .map(|(code, token)| (code.to_string(), token.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl TokenExchange for StaticExchange {
    async fn exchange_code(&self, code: &str, _state: &str) -> Result<AccessToken> {
        let token = self
            .grants
            .iter()
            .find(|(c, _)| c == code)
            .map(|(_, token)| token.clone())
            .ok_or_else(|| Error::ExchangeFailed("invalid authorization code".into()))?;

        Ok(AccessToken {
            access_token: token,
            token_type: "Bearer".to_string(),
            refresh_token: String::new(),
            expires_in: 3600,
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<SqliteStore>,
    _temp_dir: TempDir,
}

impl TestApp {
    pub fn new(config: AuthConfig, exchange: Arc<dyn TokenExchange>, with_default: bool) -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = Arc::new(SqliteStore::new(temp_dir.path().join("chatgate.db")).unwrap());
        store.initialize().unwrap();
        if with_default {
            store
                .create_store_config(&StoreConfig {
                    owner: config.tenant.clone(),
                    name: "default".to_string(),
                    display_name: "Default Store".to_string(),
                    is_default: true,
                    created_time: Utc::now(),
                })
                .unwrap();
        }

        let sessions = Arc::new(
            MemorySessionStore::new(config.session_ttl())
                .with_anonymous_ttl(config.anonymous_session_ttl()),
        );
        let proxies = config.trusted_proxies.clone();
        let gate = AccessGate::from_config(&config, store.clone(), exchange, sessions).unwrap();
        let state = AppState::new(store.clone(), gate).with_trusted_proxies(proxies);
        let router = create_router(Arc::new(state));

        Self {
            router,
            store,
            _temp_dir: temp_dir,
        }
    }

    pub async fn send(&self, mut request: Request<Body>) -> TestResponse {
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((PEER, 40000))));
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// The `name=value` pair from `Set-Cookie`, ready to send back as `Cookie`.
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
    }
}

pub fn request(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder().method(method).uri(uri)
}
