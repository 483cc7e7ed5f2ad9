use chrono::{SubsecRound, Utc};
use sha2::{Digest, Sha256};

use crate::types::{Claims, ClientInfo, Principal, ROLE_ANONYMOUS_USER, ROLE_CHAT_USER};

const ANONYMOUS_PREFIX: &str = "u-";

/// Derives effective roles and anonymous identities.
#[derive(Debug, Clone)]
pub struct TrustPolicy {
    organization: String,
    anonymous_display_name: String,
    anonymous_avatar: String,
}

impl TrustPolicy {
    pub fn new(
        organization: impl Into<String>,
        anonymous_display_name: impl Into<String>,
        anonymous_avatar: impl Into<String>,
    ) -> Self {
        Self {
            organization: organization.into(),
            anonymous_display_name: anonymous_display_name.into(),
            anonymous_avatar: anonymous_avatar.into(),
        }
    }

    /// Forces non-administrators down to `chat-user`. Administrator claims pass through untouched.
    #[must_use]
    pub fn assign_role(&self, mut claims: Claims) -> Claims {
        if !claims.principal.is_admin {
            claims.principal.role = ROLE_CHAT_USER.to_string();
        }
        claims
    }

    /// A stable pseudonymous principal for a visitor that never signed in.
    #[must_use]
    pub fn derive_anonymous_identity(&self, client: &ClientInfo) -> Principal {
        let name = anonymous_name(&client.fingerprint());

        Principal {
            owner: self.organization.clone(),
            id: name.clone(),
            name,
            display_name: self.anonymous_display_name.clone(),
            email: String::new(),
            avatar: self.anonymous_avatar.clone(),
            is_admin: false,
            role: ROLE_ANONYMOUS_USER.to_string(),
            created_time: Some(Utc::now().trunc_subsecs(0)),
        }
    }
}

/// `u-` followed by the hex SHA-256 of the fingerprint.
#[must_use]
pub fn anonymous_name(fingerprint: &str) -> String {
    let digest = Sha256::digest(fingerprint.as_bytes());
    format!("{ANONYMOUS_PREFIX}{}", hex::encode(digest))
}
