use rusqlite::Connection;
use tracing::info;

use crate::error::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE zones (
                id          TEXT PRIMARY KEY,
                entity_id   TEXT NOT NULL UNIQUE,
                metadata    TEXT,
                created_at  INTEGER NOT NULL
            );

            CREATE TABLE threads (
                id                TEXT PRIMARY KEY,
                zone_id           TEXT NOT NULL REFERENCES zones(id),
                resolved          INTEGER NOT NULL DEFAULT 0,
                resolved_by       TEXT,
                resolved_at       INTEGER,
                created_at        INTEGER NOT NULL,
                last_activity_at  INTEGER NOT NULL,
                position          TEXT,
                metadata          TEXT
            );

            CREATE INDEX idx_threads_activity
                ON threads(zone_id, last_activity_at, id);

            CREATE INDEX idx_threads_resolved
                ON threads(zone_id, resolved);

            CREATE TABLE messages (
                id           TEXT PRIMARY KEY,
                thread_id    TEXT NOT NULL REFERENCES threads(id),
                author_id    TEXT NOT NULL,
                body         TEXT NOT NULL,
                mentions     TEXT NOT NULL DEFAULT '[]',
                links        TEXT NOT NULL DEFAULT '[]',
                attachments  TEXT NOT NULL DEFAULT '[]',
                is_edited    INTEGER NOT NULL DEFAULT 0,
                is_deleted   INTEGER NOT NULL DEFAULT 0,
                resolved     INTEGER NOT NULL DEFAULT 0,
                resolved_by  TEXT,
                resolved_at  INTEGER,
                created_at   INTEGER NOT NULL,
                edited_at    INTEGER
            );

            CREATE INDEX idx_messages_thread
                ON messages(thread_id, created_at, id);

            CREATE INDEX idx_messages_author
                ON messages(author_id);

            CREATE TABLE reactions (
                id          TEXT PRIMARY KEY,
                message_id  TEXT NOT NULL REFERENCES messages(id),
                user_id     TEXT NOT NULL,
                emoji       TEXT NOT NULL,
                created_at  INTEGER NOT NULL,
                UNIQUE(message_id, emoji, user_id)
            );

            CREATE INDEX idx_reactions_message_emoji
                ON reactions(message_id, emoji);

            CREATE TABLE typing_indicators (
                thread_id   TEXT NOT NULL REFERENCES threads(id),
                user_id     TEXT NOT NULL,
                updated_at  INTEGER NOT NULL,
                expires_at  INTEGER NOT NULL,
                PRIMARY KEY (thread_id, user_id)
            );

            CREATE INDEX idx_typing_expires
                ON typing_indicators(expires_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }
}
