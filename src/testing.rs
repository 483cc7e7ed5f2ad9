//! Shared fixtures for unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::{Value, json};

use crate::auth::{AccessToken, TokenExchange};
use crate::config::AuthConfig;
use crate::error::{Error, Result};
use crate::store::{SqliteStore, Store};
use crate::types::{Principal, StoreConfig};

pub const SIGNING_KEY: &str = include_str!("../tests/fixtures/signing_key.pem");
pub const PUBLIC_KEY: &str = include_str!("../tests/fixtures/signing_key.pub.pem");
pub const OTHER_SIGNING_KEY: &str = include_str!("../tests/fixtures/other_key.pem");

pub fn auth_config(public_domain: &str) -> AuthConfig {
    AuthConfig {
        endpoint: "https://door.example.com".to_string(),
        client_id: "client-123".to_string(),
        client_secret: "secret".to_string(),
        organization: "acme".to_string(),
        application: "app-chat".to_string(),
        public_key: Some(PUBLIC_KEY.to_string()),
        public_domain: public_domain.to_string(),
        ..Default::default()
    }
}

pub fn token_payload(name: &str, is_admin: bool, role: &str) -> Value {
    json!({
        "owner": "acme",
        "name": name,
        "id": format!("id-{name}"),
        "displayName": name.to_uppercase(),
        "email": format!("{name}@example.com"),
        "isAdmin": is_admin,
        "type": role,
        "createdTime": "2024-01-01T00:00:00Z",
        "aud": ["client-123"],
        "exp": Utc::now().timestamp() + 3600,
    })
}

pub fn sign_token(payload: &Value) -> String {
    sign_token_with(payload, SIGNING_KEY)
}

pub fn sign_token_with(payload: &Value, key_pem: &str) -> String {
    let key = EncodingKey::from_rsa_pem(key_pem.as_bytes()).unwrap();
    encode(&Header::new(Algorithm::RS256), payload, &key).unwrap()
}

pub fn principal(owner: &str, name: &str) -> Principal {
    Principal {
        owner: owner.to_string(),
        name: name.to_string(),
        id: String::new(),
        display_name: String::new(),
        email: String::new(),
        avatar: String::new(),
        is_admin: false,
        role: "chat-user".to_string(),
        created_time: None,
    }
}

pub fn memory_store(tenant: &str, with_default: bool) -> Arc<SqliteStore> {
    let store = SqliteStore::open_in_memory().unwrap();
    store.initialize().unwrap();
    if with_default {
        store
            .create_store_config(&StoreConfig {
                owner: tenant.to_string(),
                name: "default".to_string(),
                display_name: "Default Store".to_string(),
                is_default: true,
                created_time: Utc::now(),
            })
            .unwrap();
    }
    Arc::new(store)
}

/// Exchange that answers every code with a fixed outcome.
pub struct FakeExchange {
    outcome: std::result::Result<String, String>,
    calls: AtomicUsize,
}

impl FakeExchange {
    pub fn ok(access_token: &str) -> Self {
        Self {
            outcome: Ok(access_token.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenExchange for FakeExchange {
    async fn exchange_code(&self, _code: &str, _state: &str) -> Result<AccessToken> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Ok(token) => Ok(AccessToken {
                access_token: token.clone(),
                token_type: "Bearer".to_string(),
                refresh_token: String::new(),
                expires_in: 3600,
            }),
            Err(message) => Err(Error::ExchangeFailed(message.clone())),
        }
    }
}
