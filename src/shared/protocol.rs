/**
 * Client Wire Protocol
 *
 * This module defines the JSON messages exchanged with browser clients over
 * the persistent WebSocket channel. Every frame is a JSON object tagged by
 * `type`.
 *
 * # Example
 *
 * ```json
 * // Client -> Server
 * {"type": "request-lock", "item_id": "42", "field": "title", "content": "Buy milk"}
 * {"type": "edit-content", "item_id": "42", "field": "title", "content": "Buy oat milk"}
 * {"type": "request-unlock", "item_id": "42"}
 * {"type": "query-locks"}
 *
 * // Server -> Client
 * {"type": "initialize-locks", "item_ids": ["42"]}
 * {"type": "lock-granted", "item_id": "42", "field": "title"}
 * {"type": "lock-denied", "item_id": "42"}
 * ```
 */
use crate::shared::event::LockEvent;
use crate::shared::lock::ItemId;
use crate::shared::SharedError;
use serde::{Deserialize, Serialize};

/// Request sent by a client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Ask for the edit lock on an item
    RequestLock {
        item_id: ItemId,
        #[serde(default)]
        field: String,
        #[serde(default)]
        content: String,
    },
    /// Give the lock back
    RequestUnlock { item_id: ItemId },
    /// Live-typing update from the lock owner
    EditContent {
        item_id: ItemId,
        #[serde(default)]
        field: String,
        #[serde(default)]
        content: String,
    },
    /// Ask for the set of currently locked items
    QueryLocks,
}

impl ClientMessage {
    /// Parse a text frame
    pub fn parse(text: &str) -> Result<Self, SharedError> {
        let message = serde_json::from_str::<Self>(text)?;
        if let Some(item_id) = message.item_id() {
            if item_id.trim().is_empty() {
                return Err(SharedError::validation("item_id", "item id cannot be empty"));
            }
        }
        Ok(message)
    }

    /// Item the request refers to, if any
    pub fn item_id(&self) -> Option<&str> {
        match self {
            Self::RequestLock { item_id, .. }
            | Self::RequestUnlock { item_id }
            | Self::EditContent { item_id, .. } => Some(item_id),
            Self::QueryLocks => None,
        }
    }
}

/// Message pushed to a client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Every currently locked item; sent on connect and on `query-locks`
    InitializeLocks { item_ids: Vec<ItemId> },
    /// Private: the requester now owns the lock
    LockAcquired { item_id: ItemId, field: String },
    /// Private: the item is held by someone else
    LockDenied { item_id: ItemId },
    /// Someone else locked an item
    LockGranted { item_id: ItemId, field: String },
    /// An item was unlocked
    LockReleased { item_id: ItemId },
    /// Unsaved content typed by the owner of an item
    ContentChanged {
        item_id: ItemId,
        field: String,
        content: String,
    },
    /// Persisted data changed; reload it
    RefreshTableData,
    /// Private: the request could not be carried out
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        item_id: Option<ItemId>,
        message: String,
    },
}

impl ServerMessage {
    /// Serialize into a text frame
    pub fn to_json(&self) -> Result<String, SharedError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn error(item_id: Option<&str>, message: impl Into<String>) -> Self {
        Self::Error {
            item_id: item_id.map(str::to_string),
            message: message.into(),
        }
    }
}

impl From<LockEvent> for ServerMessage {
    fn from(event: LockEvent) -> Self {
        match event {
            LockEvent::LockGranted { item_id, field } => Self::LockGranted { item_id, field },
            LockEvent::LockReleased { item_id } => Self::LockReleased { item_id },
            LockEvent::ContentChanged { item_id, field, content } => {
                Self::ContentChanged { item_id, field, content }
            }
            LockEvent::RefreshTableData => Self::RefreshTableData,
        }
    }
}
