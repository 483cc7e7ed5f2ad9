//! First-conversation bootstrap.
//!
//! Every principal that completes sign-in (or is admitted anonymously) must
//! own at least one conversation to resume into. [`ConversationBootstrapper`]
//! creates that conversation and its empty welcome message exactly once per
//! principal. Re-running it is a no-op as soon as any conversation exists,
//! including a conversation left without its seed message by an earlier
//! partial failure.
//!
//! Check-and-create runs under a per-principal lock, so concurrent requests
//! handled by the same process cannot both create a first conversation.
//! Separate processes sharing one database are not coordinated.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::enrich::Enricher;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{ClientInfo, Conversation, Message, Principal};

#[derive(Debug)]
pub enum BootstrapOutcome {
    /// The principal already owned a conversation; nothing was written.
    AlreadyBootstrapped,
    Created(Conversation),
}

pub struct ConversationBootstrapper {
    store: Arc<dyn Store>,
    enricher: Arc<dyn Enricher>,
    tenant: String,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ConversationBootstrapper {
    pub fn new(store: Arc<dyn Store>, enricher: Arc<dyn Enricher>, tenant: impl Into<String>) -> Self {
        Self {
            store,
            enricher,
            tenant: tenant.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    /// Creates the principal's first conversation and seed message unless one already exists.
    ///
    /// Fails with [`Error::NoDefaultStore`] when the tenant has no store config.
    /// No rollback is attempted if the seed message cannot be written.
    pub fn ensure_initial_conversation(
        &self,
        principal: &Principal,
        client: &ClientInfo,
    ) -> Result<BootstrapOutcome> {
        let member = principal.qualified_name();
        let key = format!("{}/{member}", self.tenant);
        let lock = self.acquire(&key);

        let result = {
            let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
            self.bootstrap(principal, &member, client)
        };

        self.release(&key, lock);
        result
    }

    fn bootstrap(
        &self,
        principal: &Principal,
        member: &str,
        client: &ClientInfo,
    ) -> Result<BootstrapOutcome> {
        let existing = self.store.list_conversations_by_member(&self.tenant, member)?;
        if !existing.is_empty() {
            debug!("{member} already owns {} conversation(s)", existing.len());
            return Ok(BootstrapOutcome::AlreadyBootstrapped);
        }

        let store = self
            .store
            .get_default_store_config(&self.tenant)?
            .ok_or_else(|| Error::NoDefaultStore {
                owner: self.tenant.clone(),
            })?;

        let mut chat = Conversation::initial(&self.tenant, principal, &store, client)?;
        chat.client_ip_desc = self.enricher.describe_ip(&chat.client_ip);
        chat.user_agent_desc = self.enricher.describe_user_agent(&chat.user_agent);
        self.store.create_conversation(&chat)?;

        let message = Message::seed(&chat)?;
        self.store.create_message(&message).inspect_err(|e| {
            warn!(
                "Seed message for conversation {} could not be written: {e}",
                chat.name
            );
        })?;

        info!("Created initial conversation {} for {member}", chat.name);
        Ok(BootstrapOutcome::Created(chat))
    }

    fn locks(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<Mutex<()>>>> {
        self.locks.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn acquire(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks()
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn release(&self, key: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks();
        // Only the map and this caller hold it: nobody is waiting.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::enrich::BasicEnricher;
    use crate::store::SqliteStore;
    use crate::testing::{memory_store, principal};
    use crate::types::*;

    fn bootstrapper(store: Arc<dyn Store>) -> ConversationBootstrapper {
        ConversationBootstrapper::new(store, Arc::new(BasicEnricher), "admin")
    }

    fn client() -> ClientInfo {
        ClientInfo::new("127.0.0.1", "curl/8.4.0")
    }

    /// Delegates to SQLite but refuses to write messages.
    struct MessageWriteFails(Arc<SqliteStore>);

    impl Store for MessageWriteFails {
        fn initialize(&self) -> Result<()> {
            self.0.initialize()
        }
        fn create_store_config(&self, store: &StoreConfig) -> Result<()> {
            self.0.create_store_config(store)
        }
        fn get_default_store_config(&self, owner: &str) -> Result<Option<StoreConfig>> {
            self.0.get_default_store_config(owner)
        }
        fn list_store_configs(&self, owner: &str) -> Result<Vec<StoreConfig>> {
            self.0.list_store_configs(owner)
        }
        fn create_conversation(&self, chat: &Conversation) -> Result<()> {
            self.0.create_conversation(chat)
        }
        fn get_conversation(&self, owner: &str, name: &str) -> Result<Option<Conversation>> {
            self.0.get_conversation(owner, name)
        }
        fn list_conversations_by_member(&self, owner: &str, member: &str) -> Result<Vec<Conversation>> {
            self.0.list_conversations_by_member(owner, member)
        }
        fn create_message(&self, _message: &Message) -> Result<()> {
            Err(Error::Storage(rusqlite::Error::QueryReturnedNoRows))
        }
        fn list_messages(&self, owner: &str, chat: &str) -> Result<Vec<Message>> {
            self.0.list_messages(owner, chat)
        }
    }

    #[test]
    fn test_creates_conversation_and_seed_message() {
        let store = memory_store("admin", true);
        let bootstrapper = bootstrapper(store.clone());
        let alice = principal("acme", "alice");

        let outcome = bootstrapper.ensure_initial_conversation(&alice, &client()).unwrap();
        let BootstrapOutcome::Created(chat) = outcome else {
            panic!("expected a new conversation");
        };

        assert_eq!(chat.owner, "admin");
        assert_eq!(chat.store, "admin/default");
        assert_eq!(chat.users, vec!["acme/alice".to_string()]);
        assert_eq!(chat.client_ip_desc, "Loopback");
        assert_eq!(chat.user_agent_desc, "curl");
        assert_eq!(chat.message_count, 0);

        let messages = store.list_messages("admin", &chat.name).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].author, "AI");
        assert_eq!(messages[0].text, "");
        assert_eq!(messages[0].reply_to, "Welcome");
        assert!(messages[0].created_time > chat.created_time);
    }

    #[test]
    fn test_second_call_is_noop() {
        let store = memory_store("admin", true);
        let bootstrapper = bootstrapper(store.clone());
        let alice = principal("acme", "alice");

        bootstrapper.ensure_initial_conversation(&alice, &client()).unwrap();
        let outcome = bootstrapper.ensure_initial_conversation(&alice, &client()).unwrap();

        assert!(matches!(outcome, BootstrapOutcome::AlreadyBootstrapped));
        assert_eq!(store.list_conversations_by_member("admin", "acme/alice").unwrap().len(), 1);
    }

    #[test]
    fn test_principals_bootstrap_independently() {
        let store = memory_store("admin", true);
        let bootstrapper = bootstrapper(store.clone());

        bootstrapper.ensure_initial_conversation(&principal("acme", "alice"), &client()).unwrap();
        let outcome = bootstrapper
            .ensure_initial_conversation(&principal("acme", "bob"), &client())
            .unwrap();

        assert!(matches!(outcome, BootstrapOutcome::Created(_)));
        assert_eq!(store.list_conversations_by_member("admin", "acme/bob").unwrap().len(), 1);
    }

    #[test]
    fn test_missing_default_store() {
        let store = memory_store("admin", false);
        let bootstrapper = bootstrapper(store.clone());

        let result = bootstrapper.ensure_initial_conversation(&principal("acme", "alice"), &client());

        assert!(matches!(result, Err(Error::NoDefaultStore { ref owner }) if owner == "admin"));
        assert!(store.list_conversations_by_member("admin", "acme/alice").unwrap().is_empty());
    }

    #[test]
    fn test_default_store_of_other_tenant_not_used() {
        let store = memory_store("someone-else", true);
        let bootstrapper = bootstrapper(store);

        let result = bootstrapper.ensure_initial_conversation(&principal("acme", "alice"), &client());
        assert!(matches!(result, Err(Error::NoDefaultStore { .. })));
    }

    #[test]
    fn test_partial_failure_still_idempotent() {
        let sqlite = memory_store("admin", true);
        let failing = bootstrapper(Arc::new(MessageWriteFails(sqlite.clone())));
        let alice = principal("acme", "alice");

        let result = failing.ensure_initial_conversation(&alice, &client());
        assert!(matches!(result, Err(Error::Storage(_))));

        // The orphaned conversation stays and counts as bootstrapped.
        let chats = sqlite.list_conversations_by_member("admin", "acme/alice").unwrap();
        assert_eq!(chats.len(), 1);
        assert!(sqlite.list_messages("admin", &chats[0].name).unwrap().is_empty());

        let retry = bootstrapper(sqlite.clone())
            .ensure_initial_conversation(&alice, &client())
            .unwrap();
        assert!(matches!(retry, BootstrapOutcome::AlreadyBootstrapped));
        assert_eq!(sqlite.list_conversations_by_member("admin", "acme/alice").unwrap().len(), 1);
    }

    #[test]
    fn test_concurrent_bootstrap_creates_one_conversation() {
        let store = memory_store("admin", true);
        let bootstrapper = Arc::new(bootstrapper(store.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let bootstrapper = bootstrapper.clone();
                thread::spawn(move || {
                    bootstrapper
                        .ensure_initial_conversation(&principal("acme", "alice"), &client())
                        .unwrap()
                })
            })
            .collect();

        let created = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|outcome| matches!(outcome, BootstrapOutcome::Created(_)))
            .count();

        assert_eq!(created, 1);
        assert_eq!(store.list_conversations_by_member("admin", "acme/alice").unwrap().len(), 1);
        assert!(bootstrapper.locks().is_empty());
    }

    #[test]
    fn test_same_name_in_other_organization_bootstraps_separately() {
        let store = memory_store("admin", true);
        let bootstrapper = bootstrapper(store.clone());

        bootstrapper
            .ensure_initial_conversation(&principal("acme", "alice"), &client())
            .unwrap();
        let outcome = bootstrapper
            .ensure_initial_conversation(&principal("beta", "alice"), &client())
            .unwrap();

        let BootstrapOutcome::Created(chat) = outcome else {
            panic!("beta/alice must get a conversation of its own");
        };
        assert_eq!(chat.users, vec!["beta/alice".to_string()]);

        let chats = store.list_conversations_by_member("admin", "beta/alice").unwrap();
        assert_eq!(chats.len(), 1);
        assert!(chats.iter().all(|c| c.users == vec!["beta/alice".to_string()]));
        assert_eq!(store.list_conversations_by_member("admin", "acme/alice").unwrap().len(), 1);
    }
}
