pub mod records;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canned message used when a friend request is sent with empty text.
pub const DEFAULT_REQUEST_MESSAGE: &str = "would like to add you as a friend";

const TIME_DISPLAY_FORMAT: &str = "%m-%d %H:%M";

#[derive(Eq, PartialEq, Ord, PartialOrd, Hash, Clone, Debug, Serialize, Deserialize, Default)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct FriendRequest {
    pub from: UserId,
    pub from_name: String,
    pub to: UserId,
    pub msg: String,
    pub time: DateTime<Utc>,
}

impl FriendRequest {
    pub fn new(
        from: UserId,
        from_name: impl Into<String>,
        to: UserId,
        msg: impl Into<String>,
    ) -> Self {
        let msg = msg.into();
        Self {
            from,
            from_name: from_name.into(),
            to,
            msg: if msg.is_empty() {
                DEFAULT_REQUEST_MESSAGE.to_string()
            } else {
                msg
            },
            time: Utc::now(),
        }
    }
}

/// Success/decline result paired with the human-readable explanation the
/// host dispatcher forwards to the platform.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct Outcome {
    pub ok: bool,
    pub message: String,
}

impl Outcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }
    pub fn declined(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct FriendEntry {
    pub id: UserId,
    /// None when the friend has since deregistered.
    pub name: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct PendingEntry {
    pub from: UserId,
    pub from_name: String,
    pub msg: String,
    pub time: DateTime<Utc>,
}

impl PendingEntry {
    pub fn time_display(&self) -> String {
        self.time.format(TIME_DISPLAY_FORMAT).to_string()
    }
}

/// Read-only snapshot of one user produced by DescribeUser.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq, Default)]
pub struct UserSummary {
    pub name: String,
    pub friends: Vec<FriendEntry>,
    pub pending: Vec<PendingEntry>,
}
