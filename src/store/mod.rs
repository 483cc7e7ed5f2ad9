mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the persistence interface for store configs, conversations and messages.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Store config operations
    fn create_store_config(&self, store: &StoreConfig) -> Result<()>;
    /// The owner's store flagged as default, falling back to the first store by name.
    fn get_default_store_config(&self, owner: &str) -> Result<Option<StoreConfig>>;
    fn list_store_configs(&self, owner: &str) -> Result<Vec<StoreConfig>>;

    // Conversation operations
    fn create_conversation(&self, chat: &Conversation) -> Result<()>;
    fn get_conversation(&self, owner: &str, name: &str) -> Result<Option<Conversation>>;
    /// Conversations created by `member` (`owner/name`), newest first.
    fn list_conversations_by_member(&self, owner: &str, member: &str) -> Result<Vec<Conversation>>;

    // Message operations
    fn create_message(&self, message: &Message) -> Result<()>;
    /// Oldest first.
    fn list_messages(&self, owner: &str, chat: &str) -> Result<Vec<Message>>;
}
