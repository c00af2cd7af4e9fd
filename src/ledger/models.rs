use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, Type};
use std::fmt;
use uuid::Uuid;

/// Release lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "release_state", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReleaseState {
    Pending,
    Published,
    Error,
    Deleted,
}

impl ReleaseState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseState::Pending => "pending",
            ReleaseState::Published => "published",
            ReleaseState::Error => "error",
            ReleaseState::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ReleaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Release entity - a published or pending music track
///
/// INVARIANT: state == Pending implies a non-empty `tx`
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Release {
    pub id: Uuid,
    pub title: String,
    /// Profile address of the releasing artist
    pub artist_address: String,
    pub state: ReleaseState,
    /// Submitted release transaction
    pub tx: Option<String>,
    pub contract_address: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Release {
    pub fn new_pending(title: String, artist_address: String, tx: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title,
            artist_address,
            state: ReleaseState::Pending,
            tx: Some(tx),
            contract_address: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state == ReleaseState::Pending
    }

    /// Transaction id, if one is present and non-blank
    pub fn pending_tx(&self) -> Option<&str> {
        non_blank(self.tx.as_deref())
    }
}

/// Profile entity - an artist/listener profile whose on-chain record may be
/// awaiting confirmation
///
/// INVARIANT: update_pending implies a non-empty `pending_tx`
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub display_name: String,
    /// On-chain profile contract, None until the first publication completes
    pub profile_address: Option<String>,
    pub update_pending: bool,
    pub pending_tx: Option<String>,
    pub update_error: Option<String>,
    /// Profile that invited this one
    pub invited_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn new_pending(display_name: String, invited_by: Option<Uuid>, tx: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            display_name,
            profile_address: None,
            update_pending: true,
            pending_tx: Some(tx),
            update_error: None,
            invited_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// A profile with no address yet is being created, not updated
    pub fn is_new(&self) -> bool {
        non_blank(self.profile_address.as_deref()).is_none()
    }

    pub fn pending_tx(&self) -> Option<&str> {
        non_blank(self.pending_tx.as_deref())
    }
}

/// Social feed entry
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FeedMessage {
    pub id: Uuid,
    pub sender_address: String,
    pub release_id: Option<Uuid>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl FeedMessage {
    pub fn new(sender_address: String, release_id: Option<Uuid>, message: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender_address,
            release_id,
            message,
            created_at: Utc::now(),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
