use crate::models::{MessageDetailRow, MessageRow, ProfileColumns, UserRow};
use crate::Database;
use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row};

/// Current time in the format every timestamp column uses.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

// Both participants are joined so a detail read is a single query.
const MESSAGE_DETAIL_SELECT: &str = "
    SELECT m.id, m.body, m.sent_at, m.read_at,
           f.username, f.first_name, f.last_name, f.phone,
           t.username, t.first_name, t.last_name, t.phone
    FROM messages m
    JOIN users f ON m.from_username = f.username
    JOIN users t ON m.to_username = t.username";

impl Database {
    // -- Users --

    /// Returns false if the username is already taken.
    pub fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        first_name: &str,
        last_name: &str,
        phone: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (username, password, first_name, last_name, phone, join_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(username) DO NOTHING",
                rusqlite::params![username, password_hash, first_name, last_name, phone, now_timestamp()],
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn get_user(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, username))
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT username, password, first_name, last_name, phone, join_at, last_login_at
                 FROM users ORDER BY username",
            )?;
            let rows = stmt
                .query_map([], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns false if the user does not exist.
    pub fn update_login_timestamp(&self, username: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET last_login_at = ?2 WHERE username = ?1",
                rusqlite::params![username, now_timestamp()],
            )?;
            Ok(changed == 1)
        })
    }

    // -- Messages --

    pub fn insert_message(
        &self,
        id: &str,
        from_username: &str,
        to_username: &str,
        body: &str,
    ) -> Result<MessageRow> {
        let sent_at = now_timestamp();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, from_username, to_username, body, sent_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, from_username, to_username, body, sent_at],
            )?;
            Ok(())
        })?;

        Ok(MessageRow {
            id: id.to_string(),
            from_username: from_username.to_string(),
            to_username: to_username.to_string(),
            body: body.to_string(),
            sent_at,
            read_at: None,
        })
    }

    pub fn get_message(&self, id: &str) -> Result<Option<MessageDetailRow>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE m.id = ?1", MESSAGE_DETAIL_SELECT);
            let row = conn.query_row(&sql, [id], map_message_detail).optional()?;
            Ok(row)
        })
    }

    /// Set `read_at` if it is still unset and return the stored value.
    /// A message that is already read keeps its first timestamp.
    /// Returns None if no message has this id.
    pub fn mark_read(&self, id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let read_at = conn
                .query_row(
                    "UPDATE messages SET read_at = COALESCE(read_at, ?2)
                     WHERE id = ?1
                     RETURNING read_at",
                    rusqlite::params![id, now_timestamp()],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            Ok(read_at)
        })
    }

    /// Messages received by `username`, oldest first.
    pub fn messages_to(&self, username: &str) -> Result<Vec<MessageDetailRow>> {
        self.with_conn(|conn| query_message_details(conn, "m.to_username", username))
    }

    /// Messages sent by `username`, oldest first.
    pub fn messages_from(&self, username: &str) -> Result<Vec<MessageDetailRow>> {
        self.with_conn(|conn| query_message_details(conn, "m.from_username", username))
    }
}

fn query_user(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT username, password, first_name, last_name, phone, join_at, last_login_at
         FROM users WHERE username = ?1",
    )?;

    let row = stmt.query_row([username], map_user).optional()?;
    Ok(row)
}

fn query_message_details(
    conn: &Connection,
    column: &str,
    username: &str,
) -> Result<Vec<MessageDetailRow>> {
    let sql = format!("{} WHERE {} = ?1 ORDER BY m.sent_at, m.rowid", MESSAGE_DETAIL_SELECT, column);
    let mut stmt = conn.prepare(&sql)?;

    let rows = stmt
        .query_map([username], map_message_detail)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        username: row.get(0)?,
        password: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        phone: row.get(4)?,
        join_at: row.get(5)?,
        last_login_at: row.get(6)?,
    })
}

fn map_message_detail(row: &Row<'_>) -> rusqlite::Result<MessageDetailRow> {
    Ok(MessageDetailRow {
        id: row.get(0)?,
        body: row.get(1)?,
        sent_at: row.get(2)?,
        read_at: row.get(3)?,
        from: ProfileColumns {
            username: row.get(4)?,
            first_name: row.get(5)?,
            last_name: row.get(6)?,
            phone: row.get(7)?,
        },
        to: ProfileColumns {
            username: row.get(8)?,
            first_name: row.get(9)?,
            last_name: row.get(10)?,
            phone: row.get(11)?,
        },
    })
}
