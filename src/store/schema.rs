pub const SCHEMA: &str = r#"
-- Configuration namespaces that govern AI behaviour; each tenant needs a default
CREATE TABLE IF NOT EXISTS stores (
    owner TEXT NOT NULL,
    name TEXT NOT NULL,
    display_name TEXT NOT NULL DEFAULT '',
    is_default INTEGER NOT NULL DEFAULT 0,
    created_time TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (owner, name)
);

-- Conversation threads, functionally scoped to the creating principal via user/users
CREATE TABLE IF NOT EXISTS chats (
    owner TEXT NOT NULL,
    name TEXT NOT NULL,
    created_time TEXT DEFAULT (datetime('now')),
    updated_time TEXT DEFAULT (datetime('now')),
    display_name TEXT NOT NULL DEFAULT '',
    store TEXT NOT NULL,
    category TEXT NOT NULL DEFAULT '',
    type TEXT NOT NULL DEFAULT '',
    user TEXT NOT NULL,
    user1 TEXT NOT NULL DEFAULT '',
    user2 TEXT NOT NULL DEFAULT '',
    users TEXT NOT NULL DEFAULT '[]',   -- JSON array of owner/name members
    client_ip TEXT NOT NULL DEFAULT '',
    user_agent TEXT NOT NULL DEFAULT '',
    client_ip_desc TEXT NOT NULL DEFAULT '',
    user_agent_desc TEXT NOT NULL DEFAULT '',
    message_count INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (owner, name)
);

-- Messages are append-only
CREATE TABLE IF NOT EXISTS messages (
    owner TEXT NOT NULL,
    name TEXT NOT NULL,
    created_time TEXT DEFAULT (datetime('now')),
    user TEXT NOT NULL,
    chat TEXT NOT NULL,
    reply_to TEXT NOT NULL DEFAULT '',
    author TEXT NOT NULL,
    text TEXT NOT NULL DEFAULT '',
    vector_scores TEXT NOT NULL DEFAULT '[]',   -- JSON array, opaque at this layer
    PRIMARY KEY (owner, name),
    FOREIGN KEY (owner, chat) REFERENCES chats(owner, name) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_chats_owner_member ON chats(owner, user1);
CREATE INDEX IF NOT EXISTS idx_messages_chat ON messages(owner, chat);
"#;
