//! # Chatgate
//!
//! Session establishment and identity bootstrap for a chat service, usable
//! both as a standalone binary and as a library.
//!
//! A visitor either completes the identity provider's authorization-code
//! flow or, on the configured public host, is admitted under a stable
//! anonymous identity. Either way they end up with a server-side session and
//! at least one conversation to resume into.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! chatgate = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::path::Path;
//! use chatgate::auth::{AccessGate, MemorySessionStore, ProviderClient};
//! use chatgate::config::AuthConfig;
//! use chatgate::server::{AppState, create_router};
//! use chatgate::store::{SqliteStore, Store};
//!
//! let config = AuthConfig::load(Path::new("./data/chatgate.toml")).unwrap();
//! let store = Arc::new(SqliteStore::new(Path::new("./data/chatgate.db")).unwrap());
//! store.initialize().unwrap();
//!
//! let sessions = Arc::new(MemorySessionStore::new(config.session_ttl()));
//! let exchange = Arc::new(ProviderClient::new(&config).unwrap());
//! let gate = AccessGate::from_config(&config, store.clone(), exchange, sessions).unwrap();
//!
//! let router = create_router(Arc::new(AppState::new(store, gate)));
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `chatgate` binary. Disable with `default-features = false`.

pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod enrich;
pub mod error;
pub mod server;
pub mod store;
pub mod types;

#[cfg(test)]
mod testing;
