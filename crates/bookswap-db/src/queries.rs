use crate::Database;
use crate::models::{ConversationRow, ListingRow, MessageRow, NewListing, UserRow};
use anyhow::Result;
use rusqlite::{Connection, Row};

const LISTING_SELECT: &str = "
    SELECT l.id, l.seller_id, u.username, u.email, l.title, l.author, l.isbn,
           l.cover_image_url, l.price_cents, l.condition, l.category, l.course_code,
           l.is_active, l.created_at
    FROM listings l
    JOIN users u ON l.seller_id = u.id";

const CONVERSATION_SELECT: &str = "
    SELECT c.id, c.listing_id, l.title, c.buyer_id, b.username, c.seller_id, s.username, c.created_at
    FROM conversations c
    JOIN listings l ON c.listing_id = l.id
    JOIN users b ON c.buyer_id = b.id
    JOIN users s ON c.seller_id = s.id";

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        email: Option<&str>,
        password_hash: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, password) VALUES (?1, ?2, ?3, ?4)",
                (id, username, email, password_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    // -- Listings --

    pub fn insert_listing(&self, listing: &NewListing<'_>) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO listings
                    (seller_id, title, author, isbn, cover_image_url, price_cents,
                     condition, category, course_code, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    listing.seller_id,
                    listing.title,
                    listing.author,
                    listing.isbn,
                    listing.cover_image_url,
                    listing.price_cents,
                    listing.condition,
                    listing.category,
                    listing.course_code,
                    listing.created_at,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// All listings, newest first. Equal timestamps fall back to the later id.
    pub fn list_listings(&self) -> Result<Vec<ListingRow>> {
        self.with_conn(|conn| {
            let sql = format!("{LISTING_SELECT} ORDER BY l.created_at DESC, l.id DESC");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], listing_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_listing(&self, id: i64) -> Result<Option<ListingRow>> {
        self.with_conn(|conn| {
            let sql = format!("{LISTING_SELECT} WHERE l.id = ?1");
            let row = conn.query_row(&sql, [id], listing_from_row).optional()?;
            Ok(row)
        })
    }

    /// Deletes the listing only if `seller_id` owns it. Returns false when no
    /// row matched, which callers cannot tell apart from a missing listing.
    pub fn delete_listing_for_seller(&self, id: i64, seller_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "DELETE FROM listings WHERE id = ?1 AND seller_id = ?2",
                rusqlite::params![id, seller_id],
            )?;
            Ok(affected > 0)
        })
    }

    // -- Conversations --

    /// Returns the (listing, buyer) conversation, creating it with `id` if none
    /// exists yet. The bool is true when a new row was inserted.
    pub fn get_or_create_conversation(
        &self,
        id: &str,
        listing_id: i64,
        buyer_id: &str,
        seller_id: &str,
        created_at: &str,
    ) -> Result<(ConversationRow, bool)> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let inserted = tx.execute(
                "INSERT INTO conversations (id, listing_id, buyer_id, seller_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(listing_id, buyer_id) DO NOTHING",
                rusqlite::params![id, listing_id, buyer_id, seller_id, created_at],
            )? > 0;

            let sql = format!("{CONVERSATION_SELECT} WHERE c.listing_id = ?1 AND c.buyer_id = ?2");
            let row = tx.query_row(&sql, rusqlite::params![listing_id, buyer_id], conversation_from_row)?;

            tx.commit()?;
            Ok((row, inserted))
        })
    }

    pub fn list_conversations_for_user(&self, user_id: &str) -> Result<Vec<ConversationRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{CONVERSATION_SELECT} WHERE c.buyer_id = ?1 OR c.seller_id = ?1
                 ORDER BY c.created_at DESC, c.rowid DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], conversation_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Looks a conversation up only among those `user_id` takes part in.
    pub fn get_conversation_for_participant(
        &self,
        id: &str,
        user_id: &str,
    ) -> Result<Option<ConversationRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{CONVERSATION_SELECT} WHERE c.id = ?1 AND (c.buyer_id = ?2 OR c.seller_id = ?2)"
            );
            let row = conn
                .query_row(&sql, rusqlite::params![id, user_id], conversation_from_row)
                .optional()?;
            Ok(row)
        })
    }

    // -- Messages --

    pub fn insert_message(
        &self,
        id: &str,
        conversation_id: &str,
        sender_id: &str,
        content: &str,
        created_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, conversation_id, sender_id, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, conversation_id, sender_id, content, created_at],
            )?;
            Ok(())
        })
    }

    /// Messages of a conversation, oldest first.
    pub fn get_messages(&self, conversation_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            // JOIN users to fetch the sender's username in a single query
            let mut stmt = conn.prepare(
                "SELECT m.id, m.conversation_id, m.sender_id, u.username, m.content, m.created_at
                 FROM messages m
                 LEFT JOIN users u ON m.sender_id = u.id
                 WHERE m.conversation_id = ?1
                 ORDER BY m.created_at ASC, m.rowid ASC",
            )?;

            let rows = stmt
                .query_map([conversation_id], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        conversation_id: row.get(1)?,
                        sender_id: row.get(2)?,
                        sender_username: row
                            .get::<_, Option<String>>(3)?
                            .unwrap_or_else(|| "unknown".to_string()),
                        content: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // `column` is always one of the fixed names passed above.
    let sql = format!("SELECT id, username, email, password, created_at FROM users WHERE {column} = ?1");
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn listing_from_row(row: &Row<'_>) -> rusqlite::Result<ListingRow> {
    Ok(ListingRow {
        id: row.get(0)?,
        seller_id: row.get(1)?,
        seller_username: row.get(2)?,
        seller_email: row.get(3)?,
        title: row.get(4)?,
        author: row.get(5)?,
        isbn: row.get(6)?,
        cover_image_url: row.get(7)?,
        price_cents: row.get(8)?,
        condition: row.get(9)?,
        category: row.get(10)?,
        course_code: row.get(11)?,
        is_active: row.get(12)?,
        created_at: row.get(13)?,
    })
}

fn conversation_from_row(row: &Row<'_>) -> rusqlite::Result<ConversationRow> {
    Ok(ConversationRow {
        id: row.get(0)?,
        listing_id: row.get(1)?,
        listing_title: row.get(2)?,
        buyer_id: row.get(3)?,
        buyer_username: row.get(4)?,
        seller_id: row.get(5)?,
        seller_username: row.get(6)?,
        created_at: row.get(7)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
