use std::sync::Arc;

use tracing::info;

use super::identity::{IdentityVerifier, TokenExchange};
use super::policy::TrustPolicy;
use super::session::{SessionHandle, SessionManager};
use crate::bootstrap::ConversationBootstrapper;
use crate::config::AuthConfig;
use crate::enrich::BasicEnricher;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Claims, ClientInfo};

/// Claims resolved for a request, together with the session they live in.
#[derive(Debug, Clone)]
pub struct Account {
    pub claims: Claims,
    pub handle: SessionHandle,
    /// True when the session was created by this call and the client must be told its handle.
    pub new_session: bool,
}

/// Decides, per request, between an existing session, an anonymous session and a sign-in demand.
///
/// Public mode applies only when a public domain is configured and the
/// request's host matches it; every other request is gated.
pub struct AccessGate {
    public_domain: String,
    policy: TrustPolicy,
    verifier: IdentityVerifier,
    bootstrapper: ConversationBootstrapper,
    sessions: Arc<dyn SessionManager>,
}

impl AccessGate {
    pub fn new(
        public_domain: impl Into<String>,
        policy: TrustPolicy,
        verifier: IdentityVerifier,
        bootstrapper: ConversationBootstrapper,
        sessions: Arc<dyn SessionManager>,
    ) -> Self {
        Self {
            public_domain: public_domain.into(),
            policy,
            verifier,
            bootstrapper,
            sessions,
        }
    }

    /// Wires the gate from configuration, with the offline enricher.
    pub fn from_config(
        config: &AuthConfig,
        store: Arc<dyn Store>,
        exchange: Arc<dyn TokenExchange>,
        sessions: Arc<dyn SessionManager>,
    ) -> Result<Self> {
        let policy = TrustPolicy::new(
            config.organization.clone(),
            config.anonymous_display_name.clone(),
            config.anonymous_avatar.clone(),
        );
        let verifier = IdentityVerifier::new(config, exchange)?;
        let bootstrapper =
            ConversationBootstrapper::new(store, Arc::new(BasicEnricher), config.tenant.clone());

        Ok(Self::new(
            config.public_domain.clone(),
            policy,
            verifier,
            bootstrapper,
            sessions,
        ))
    }

    #[must_use]
    pub fn verifier(&self) -> &IdentityVerifier {
        &self.verifier
    }

    /// Storage namespace that owns conversations created through this gate.
    #[must_use]
    pub fn tenant(&self) -> &str {
        self.bootstrapper.tenant()
    }

    #[must_use]
    pub fn is_public_host(&self, host: Option<&str>) -> bool {
        !self.public_domain.is_empty()
            && host.is_some_and(|h| h.eq_ignore_ascii_case(&self.public_domain))
    }

    /// Resolves the caller's account, admitting anonymous visitors on the public host.
    pub fn get_account(
        &self,
        host: Option<&str>,
        handle: Option<&SessionHandle>,
        client: &ClientInfo,
    ) -> Result<Account> {
        if let Some(handle) = handle {
            if let Some(claims) = self.sessions.get_claims(handle) {
                return Ok(Account {
                    claims,
                    handle: handle.clone(),
                    new_session: false,
                });
            }
        }

        if !self.is_public_host(host) {
            return Err(Error::MustSignIn);
        }

        let principal = self.policy.derive_anonymous_identity(client);
        self.bootstrapper
            .ensure_initial_conversation(&principal, client)?;

        // Session only: anonymous principals are never registered with the identity provider.
        let claims = Claims::new(principal);
        let handle = SessionHandle::generate();
        self.sessions.set_claims(&handle, Some(claims.clone()));

        info!(
            "Established anonymous session for {}",
            claims.principal.qualified_name()
        );
        Ok(Account {
            claims,
            handle,
            new_session: true,
        })
    }

    /// Completes the authorization-code flow and binds the verified claims to a fresh session.
    pub async fn sign_in(
        &self,
        code: &str,
        state: &str,
        previous: Option<&SessionHandle>,
        client: &ClientInfo,
    ) -> Result<Account> {
        let token = self.verifier.exchange_code(code, state).await?;
        let claims = self.verifier.verify_token(&token.access_token)?;
        let mut claims = self.policy.assign_role(claims);

        self.bootstrapper
            .ensure_initial_conversation(&claims.principal, client)?;

        claims.access_token = Some(token.access_token);

        if let Some(previous) = previous {
            self.sessions.set_claims(previous, None);
        }
        let handle = SessionHandle::generate();
        self.sessions.set_claims(&handle, Some(claims.clone()));

        info!(
            "{} signed in as {}",
            claims.principal.qualified_name(),
            claims.principal.role
        );
        Ok(Account {
            claims,
            handle,
            new_session: true,
        })
    }

    /// Clears the session. Clearing an absent or empty session succeeds.
    pub fn sign_out(&self, handle: Option<&SessionHandle>) {
        if let Some(handle) = handle {
            self.sessions.set_claims(handle, None);
        }
    }
}
