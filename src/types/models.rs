use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Effective role of a signed-in principal that is not an administrator.
pub const ROLE_CHAT_USER: &str = "chat-user";
/// Role of a fingerprint-derived principal.
pub const ROLE_ANONYMOUS_USER: &str = "anonymous-user";

pub const SEED_AUTHOR: &str = "AI";
pub const SEED_REPLY_TO: &str = "Welcome";

const RANDOM_NAME_LENGTH: usize = 12;
const INITIAL_CHAT_DISPLAY_NAME: &str = "New Chat - 1";
const DEFAULT_CATEGORY: &str = "Default Category";
const CHAT_TYPE_AI: &str = "AI";

/// An authenticated or pseudonymous identity.
///
/// Field names follow the identity provider's JWT payload so the same struct
/// decodes tokens and serializes account responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(rename = "type", default)]
    pub role: String,
    #[serde(default, deserialize_with = "deserialize_optional_time")]
    pub created_time: Option<DateTime<Utc>>,
}

impl Principal {
    /// The `owner/name` form used as a conversation member identifier.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Verified or derived attributes of the principal bound to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(flatten)]
    pub principal: Principal,
    /// Bearer token for calls back to the identity provider. Never sent to clients.
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing)]
    pub exp: Option<i64>,
}

impl Claims {
    #[must_use]
    pub fn new(principal: Principal) -> Self {
        Self {
            principal,
            access_token: None,
            exp: None,
        }
    }
}

/// A named configuration namespace that governs AI behaviour for a thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    pub owner: String,
    pub name: String,
    pub display_name: String,
    pub is_default: bool,
    pub created_time: DateTime<Utc>,
}

impl StoreConfig {
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Transport-level facts about the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip: String,
    pub user_agent: String,
}

impl ClientInfo {
    pub fn new(ip: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            user_agent: user_agent.into(),
        }
    }

    /// `ip|user_agent`, the input to anonymous identity derivation.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        format!("{}|{}", self.ip, self.user_agent)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub owner: String,
    pub name: String,
    pub created_time: DateTime<Utc>,
    pub updated_time: DateTime<Utc>,
    pub display_name: String,
    pub store: String,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub user: String,
    /// `owner/name` of the creating principal.
    pub user1: String,
    pub user2: String,
    pub users: Vec<String>,
    pub client_ip: String,
    pub user_agent: String,
    pub client_ip_desc: String,
    pub user_agent_desc: String,
    pub message_count: i64,
}

impl Conversation {
    /// Builds the first conversation for `principal` inside the `owner` tenant.
    ///
    /// Enrichment descriptions are left empty for the caller to fill in.
    pub fn initial(
        owner: &str,
        principal: &Principal,
        store: &StoreConfig,
        client: &ClientInfo,
    ) -> Result<Self> {
        require("conversation owner", owner)?;
        require("principal owner", &principal.owner)?;
        require("principal name", &principal.name)?;
        require("store name", &store.name)?;

        // Millisecond precision survives a storage round trip unchanged.
        let now = Utc::now().trunc_subsecs(3);
        let member = principal.qualified_name();

        Ok(Self {
            owner: owner.to_string(),
            name: format!("chat_{}", random_name()),
            created_time: now,
            updated_time: now,
            display_name: INITIAL_CHAT_DISPLAY_NAME.to_string(),
            store: store.id(),
            category: DEFAULT_CATEGORY.to_string(),
            kind: CHAT_TYPE_AI.to_string(),
            user: principal.name.clone(),
            user1: member.clone(),
            user2: String::new(),
            users: vec![member],
            client_ip: client.ip.clone(),
            user_agent: client.user_agent.clone(),
            client_ip_desc: String::new(),
            user_agent_desc: String::new(),
            message_count: 0,
        })
    }

    /// Whether `principal` created this conversation. Names are only unique within an owner.
    #[must_use]
    pub fn belongs_to(&self, principal: &Principal) -> bool {
        self.user1 == principal.qualified_name()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorScore {
    pub vector: String,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub owner: String,
    pub name: String,
    pub created_time: DateTime<Utc>,
    pub user: String,
    pub chat: String,
    pub reply_to: String,
    pub author: String,
    pub text: String,
    pub vector_scores: Vec<VectorScore>,
}

impl Message {
    /// The empty AI welcome message that opens a freshly bootstrapped conversation.
    ///
    /// Timestamped one millisecond after the conversation so ordering never
    /// depends on when the write happens.
    pub fn seed(conversation: &Conversation) -> Result<Self> {
        require("conversation name", &conversation.name)?;
        require("conversation user", &conversation.user)?;

        Ok(Self {
            owner: conversation.owner.clone(),
            name: format!("message_{}", random_name()),
            created_time: conversation.created_time + Duration::milliseconds(1),
            user: conversation.user.clone(),
            chat: conversation.name.clone(),
            reply_to: SEED_REPLY_TO.to_string(),
            author: SEED_AUTHOR.to_string(),
            text: String::new(),
            vector_scores: Vec::new(),
        })
    }
}

/// Random lowercase hex suffix for generated resource names.
#[must_use]
pub fn random_name() -> String {
    Uuid::new_v4().simple().to_string()[..RANDOM_NAME_LENGTH].to_string()
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{field} cannot be empty")));
    }
    Ok(())
}

fn deserialize_optional_time<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .filter(|s| !s.is_empty())
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc)))
}
