use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{
    Extension, Router,
    routing::{get, post},
};

use super::{account, chats};
use crate::auth::{AccessGate, TrustedProxies};
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub gate: Arc<AccessGate>,
    pub trusted_proxies: TrustedProxies,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, gate: AccessGate) -> Self {
        Self {
            store,
            gate: Arc::new(gate),
            trusted_proxies: TrustedProxies::default(),
        }
    }

    #[must_use]
    pub fn with_trusted_proxies(mut self, proxies: Vec<IpAddr>) -> Self {
        self.trusted_proxies = TrustedProxies::new(proxies);
        self
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Account
        .route("/signin", post(account::signin))
        .route("/signout", post(account::signout))
        .route("/get-account", get(account::get_account))
        .route("/signin-url", get(account::signin_url))
        // Conversations
        .route("/get-chats", get(chats::get_chats))
        .route("/get-messages", get(chats::get_messages))
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", api_router())
        .layer(Extension(state.trusted_proxies.clone()))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
