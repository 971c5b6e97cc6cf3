use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{FriendRequest, UserId};

/// The full persisted relationship graph: user ID to user record.
pub type Graph = BTreeMap<UserId, UserRecord>;

/// Durable per-user record. Every field defaults so records written by
/// older revisions of the data file remain loadable.
#[derive(Clone, Debug, Serialize, Deserialize, Default, Eq, PartialEq)]
pub struct UserRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub friends: BTreeSet<UserId>,
    #[serde(default)]
    pub inbox: BTreeMap<UserId, FriendRequest>,
}

impl UserRecord {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}
