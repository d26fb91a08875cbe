use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                email       TEXT UNIQUE,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE listings (
                id               INTEGER PRIMARY KEY AUTOINCREMENT,
                seller_id        TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title            TEXT NOT NULL,
                author           TEXT NOT NULL,
                isbn             TEXT NOT NULL DEFAULT '',
                cover_image_url  TEXT NOT NULL DEFAULT '',
                price_cents      INTEGER NOT NULL,
                condition        TEXT NOT NULL,
                category         TEXT NOT NULL DEFAULT 'General',
                course_code      TEXT,
                is_active        INTEGER NOT NULL DEFAULT 1,
                created_at       TEXT NOT NULL
            );

            CREATE INDEX idx_listings_created ON listings(created_at);
            CREATE INDEX idx_listings_seller ON listings(seller_id);

            CREATE TABLE conversations (
                id          TEXT PRIMARY KEY,
                listing_id  INTEGER NOT NULL REFERENCES listings(id) ON DELETE CASCADE,
                buyer_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                seller_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL,
                UNIQUE(listing_id, buyer_id)
            );

            CREATE TABLE messages (
                id               TEXT PRIMARY KEY,
                conversation_id  TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                sender_id        TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                content          TEXT NOT NULL,
                created_at       TEXT NOT NULL
            );

            CREATE INDEX idx_messages_conversation
                ON messages(conversation_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
