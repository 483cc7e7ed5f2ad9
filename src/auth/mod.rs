mod gate;
mod identity;
mod middleware;
mod policy;
mod session;

pub use gate::{AccessGate, Account};
pub use identity::{AccessToken, IdentityVerifier, ProviderClient, TokenExchange};
pub use middleware::{
    RequestHost, SESSION_COOKIE, SessionCookie, TrustedProxies, clear_session_cookie,
    session_cookie,
};
pub use policy::{TrustPolicy, anonymous_name};
pub use session::{MAX_SESSION_TTL, MemorySessionStore, SessionHandle, SessionManager};
