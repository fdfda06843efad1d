use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Public projection of a user, embedded in message details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

/// Full user record as shown to its owner. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDetail {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub join_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// A message as created: participants by username only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub from_username: String,
    pub to_username: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

/// A message with both participants' profiles resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDetail {
    pub id: Uuid,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    pub from_user: UserProfile,
    pub to_user: UserProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadState {
    Unread,
    Read,
}

impl ReadState {
    pub fn from_read_at(read_at: Option<&DateTime<Utc>>) -> Self {
        match read_at {
            Some(_) => ReadState::Read,
            None => ReadState::Unread,
        }
    }
}

impl Message {
    pub fn read_state(&self) -> ReadState {
        ReadState::from_read_at(self.read_at.as_ref())
    }
}

impl MessageDetail {
    pub fn read_state(&self) -> ReadState {
        ReadState::from_read_at(self.read_at.as_ref())
    }

    /// Whether `username` is the sender or the recipient.
    pub fn involves(&self, username: &str) -> bool {
        self.from_user.username == username || self.to_user.username == username
    }
}
