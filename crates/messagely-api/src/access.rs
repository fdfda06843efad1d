//! Authorization rules for reading, sending and marking messages read.
//!
//! The caller's identity arrives already authenticated; this layer only
//! decides whether that identity may perform the operation. Existence is
//! always checked before the relationship to the message, so a missing
//! message is reported as `NotFound` regardless of who asks.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use messagely_types::api::ReadReceipt;
use messagely_types::models::{Message, MessageDetail, UserProfile};

/// Persistence operations the access layer needs.
pub trait MessageStore: Send + Sync {
    /// The message with both participants' profiles; None if the id is unknown.
    fn get_message(&self, id: Uuid) -> anyhow::Result<Option<MessageDetail>>;

    /// Resolves a username to its profile; None if no such user is registered.
    fn find_user(&self, username: &str) -> anyhow::Result<Option<UserProfile>>;

    /// Persists a new unread message stamped with the current time.
    fn create_message(&self, from: &str, to: &str, body: &str) -> anyhow::Result<Message>;

    /// Sets `read_at` once and returns the stored value; None if the id is unknown.
    fn mark_read(&self, id: Uuid) -> anyhow::Result<Option<DateTime<Utc>>>;
}

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Message with id of {0} does not exist.")]
    NotFound(Uuid),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("message store failure: {0:#}")]
    Store(#[from] anyhow::Error),
}

pub struct MessageAccessControl<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: MessageStore + ?Sized> MessageAccessControl<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Sender and recipient may both read a message.
    pub fn get_message(&self, caller: &str, id: Uuid) -> Result<MessageDetail, AccessError> {
        let message = self.store.get_message(id)?.ok_or(AccessError::NotFound(id))?;

        if !message.involves(caller) {
            warn!(caller, message_id = %id, "denied read of message");
            return Err(AccessError::Forbidden(
                "You can only access this message if you are associated with it.",
            ));
        }

        Ok(message)
    }

    /// Self-addressed messages are rejected.
    pub fn create_message(
        &self,
        caller: &str,
        to_username: &str,
        body: &str,
    ) -> Result<Message, AccessError> {
        if body.trim().is_empty() {
            return Err(AccessError::Validation("Message body must not be empty.".into()));
        }
        if to_username == caller {
            return Err(AccessError::Validation("You cannot send a message to yourself.".into()));
        }
        if self.store.find_user(to_username)?.is_none() {
            return Err(AccessError::Validation(format!(
                "User '{}' does not exist.",
                to_username
            )));
        }

        let message = self.store.create_message(caller, to_username, body)?;
        info!(message_id = %message.id, from = caller, to = to_username, "message created");
        Ok(message)
    }

    /// Only the recipient may mark a message read. Repeated calls return the
    /// timestamp of the first one.
    pub fn mark_read(&self, caller: &str, id: Uuid) -> Result<ReadReceipt, AccessError> {
        let message = self.store.get_message(id)?.ok_or(AccessError::NotFound(id))?;

        if message.to_user.username != caller {
            warn!(caller, message_id = %id, "denied mark-read of message");
            return Err(AccessError::Forbidden(
                "Only the user the message is intended for can mark the message as read.",
            ));
        }

        let read_at = self.store.mark_read(id)?.ok_or(AccessError::NotFound(id))?;
        Ok(ReadReceipt { id, read_at })
    }
}
