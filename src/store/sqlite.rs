use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

const STORE_COLUMNS: &str = "owner, name, display_name, is_default, created_time";

const CHAT_COLUMNS: &str = "owner, name, created_time, updated_time, display_name, store, category, type,
     user, user1, user2, users, client_ip, user_agent, client_ip_desc, user_agent_desc, message_count";

const MESSAGE_COLUMNS: &str =
    "owner, name, created_time, user, chat, reply_to, author, text, vector_scores";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// An in-memory database, used by tests and throwaway deployments.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn parse_json_column<T: serde::de::DeserializeOwned + Default>(raw: &str) -> T {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::error!("Invalid JSON column in database: '{}' - {}", raw, e);
        T::default()
    })
}

fn map_insert_error(err: rusqlite::Error) -> Error {
    match err {
        rusqlite::Error::SqliteFailure(ref e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Error::AlreadyExists
        }
        e => Error::from(e),
    }
}

fn store_from_row(row: &Row<'_>) -> rusqlite::Result<StoreConfig> {
    Ok(StoreConfig {
        owner: row.get(0)?,
        name: row.get(1)?,
        display_name: row.get(2)?,
        is_default: row.get(3)?,
        created_time: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn chat_from_row(row: &Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        owner: row.get(0)?,
        name: row.get(1)?,
        created_time: parse_datetime(&row.get::<_, String>(2)?),
        updated_time: parse_datetime(&row.get::<_, String>(3)?),
        display_name: row.get(4)?,
        store: row.get(5)?,
        category: row.get(6)?,
        kind: row.get(7)?,
        user: row.get(8)?,
        user1: row.get(9)?,
        user2: row.get(10)?,
        users: parse_json_column(&row.get::<_, String>(11)?),
        client_ip: row.get(12)?,
        user_agent: row.get(13)?,
        client_ip_desc: row.get(14)?,
        user_agent_desc: row.get(15)?,
        message_count: row.get(16)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        owner: row.get(0)?,
        name: row.get(1)?,
        created_time: parse_datetime(&row.get::<_, String>(2)?),
        user: row.get(3)?,
        chat: row.get(4)?,
        reply_to: row.get(5)?,
        author: row.get(6)?,
        text: row.get(7)?,
        vector_scores: parse_json_column(&row.get::<_, String>(8)?),
    })
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Store config operations

    fn create_store_config(&self, store: &StoreConfig) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO stores (owner, name, display_name, is_default, created_time)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    store.owner,
                    store.name,
                    store.display_name,
                    store.is_default,
                    format_datetime(&store.created_time),
                ],
            )
            .map_err(map_insert_error)?;
        Ok(())
    }

    fn get_default_store_config(&self, owner: &str) -> Result<Option<StoreConfig>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {STORE_COLUMNS} FROM stores WHERE owner = ?1
                 ORDER BY is_default DESC, name LIMIT 1"
            ),
            params![owner],
            store_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_store_configs(&self, owner: &str) -> Result<Vec<StoreConfig>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {STORE_COLUMNS} FROM stores WHERE owner = ?1 ORDER BY name"
        ))?;

        let rows = stmt.query_map(params![owner], store_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Conversation operations

    fn create_conversation(&self, chat: &Conversation) -> Result<()> {
        let users = serde_json::to_string(&chat.users)?;
        self.conn()
            .execute(
                &format!(
                    "INSERT INTO chats ({CHAT_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
                ),
                params![
                    chat.owner,
                    chat.name,
                    format_datetime(&chat.created_time),
                    format_datetime(&chat.updated_time),
                    chat.display_name,
                    chat.store,
                    chat.category,
                    chat.kind,
                    chat.user,
                    chat.user1,
                    chat.user2,
                    users,
                    chat.client_ip,
                    chat.user_agent,
                    chat.client_ip_desc,
                    chat.user_agent_desc,
                    chat.message_count,
                ],
            )
            .map_err(map_insert_error)?;
        Ok(())
    }

    fn get_conversation(&self, owner: &str, name: &str) -> Result<Option<Conversation>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {CHAT_COLUMNS} FROM chats WHERE owner = ?1 AND name = ?2"),
            params![owner, name],
            chat_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_conversations_by_member(&self, owner: &str, member: &str) -> Result<Vec<Conversation>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats WHERE owner = ?1 AND user1 = ?2
             ORDER BY created_time DESC, name"
        ))?;

        let rows = stmt.query_map(params![owner, member], chat_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Message operations

    fn create_message(&self, message: &Message) -> Result<()> {
        let vector_scores = serde_json::to_string(&message.vector_scores)?;
        self.conn()
            .execute(
                &format!(
                    "INSERT INTO messages ({MESSAGE_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
                ),
                params![
                    message.owner,
                    message.name,
                    format_datetime(&message.created_time),
                    message.user,
                    message.chat,
                    message.reply_to,
                    message.author,
                    message.text,
                    vector_scores,
                ],
            )
            .map_err(map_insert_error)?;
        Ok(())
    }

    fn list_messages(&self, owner: &str, chat: &str) -> Result<Vec<Message>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE owner = ?1 AND chat = ?2
             ORDER BY created_time, name"
        ))?;

        let rows = stmt.query_map(params![owner, chat], message_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }
}
