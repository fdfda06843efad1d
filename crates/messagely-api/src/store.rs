use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use messagely_db::Database;
use messagely_db::models::{MessageDetailRow, MessageRow, ProfileColumns, UserRow};
use messagely_types::models::{Message, MessageDetail, UserDetail, UserProfile};

use crate::access::MessageStore;

impl MessageStore for Database {
    fn get_message(&self, id: Uuid) -> Result<Option<MessageDetail>> {
        Database::get_message(self, &id.to_string())?
            .map(message_detail_from_row)
            .transpose()
    }

    fn find_user(&self, username: &str) -> Result<Option<UserProfile>> {
        Ok(self.get_user(username)?.map(profile_from_user))
    }

    fn create_message(&self, from: &str, to: &str, body: &str) -> Result<Message> {
        let id = Uuid::new_v4();
        let row = self.insert_message(&id.to_string(), from, to, body)?;
        message_from_row(row)
    }

    fn mark_read(&self, id: Uuid) -> Result<Option<DateTime<Utc>>> {
        Database::mark_read(self, &id.to_string())?
            .map(|read_at| parse_timestamp(&read_at, "read_at"))
            .transpose()
    }
}

pub fn profile_from_user(row: UserRow) -> UserProfile {
    UserProfile {
        username: row.username,
        first_name: row.first_name,
        last_name: row.last_name,
        phone: row.phone,
    }
}

pub fn user_detail_from_row(row: UserRow) -> Result<UserDetail> {
    Ok(UserDetail {
        join_at: parse_timestamp(&row.join_at, "join_at")?,
        last_login_at: row
            .last_login_at
            .as_deref()
            .map(|ts| parse_timestamp(ts, "last_login_at"))
            .transpose()?,
        username: row.username,
        first_name: row.first_name,
        last_name: row.last_name,
        phone: row.phone,
    })
}

pub fn message_detail_from_row(row: MessageDetailRow) -> Result<MessageDetail> {
    Ok(MessageDetail {
        id: row.id.parse().with_context(|| format!("corrupt message id '{}'", row.id))?,
        sent_at: parse_timestamp(&row.sent_at, "sent_at")?,
        read_at: row.read_at.as_deref().map(|ts| parse_timestamp(ts, "read_at")).transpose()?,
        body: row.body,
        from_user: profile_from_columns(row.from),
        to_user: profile_from_columns(row.to),
    })
}

fn message_from_row(row: MessageRow) -> Result<Message> {
    Ok(Message {
        id: row.id.parse().with_context(|| format!("corrupt message id '{}'", row.id))?,
        sent_at: parse_timestamp(&row.sent_at, "sent_at")?,
        read_at: row.read_at.as_deref().map(|ts| parse_timestamp(ts, "read_at")).transpose()?,
        from_username: row.from_username,
        to_username: row.to_username,
        body: row.body,
    })
}

fn profile_from_columns(cols: ProfileColumns) -> UserProfile {
    UserProfile {
        username: cols.username,
        first_name: cols.first_name,
        last_name: cols.last_name,
        phone: cols.phone,
    }
}

fn parse_timestamp(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("corrupt {} '{}'", field, value))
}
