use std::collections::btree_map::Entry;
use std::sync::Arc;

use amity_common::records::{Graph, UserRecord};
use amity_common::{FriendEntry, FriendRequest, Outcome, PendingEntry, UserId, UserSummary};
use tracing::warn;

use crate::error::StoreError;
use crate::store::RelationStore;

const NOT_REGISTERED: &str = "you are not registered yet";

/// Friend-relationship business logic. Every mutating operation runs its
/// whole read-modify-write (including the save) under the store's exclusive
/// section, and rolls the in-memory change back when the save fails, so
/// memory and disk always agree from the caller's point of view.
pub struct RelationService {
    store: Arc<RelationStore>,
}

enum EnsureUndo {
    RemoveRecord,
    RestoreName(String),
    Nothing,
}

impl RelationService {
    pub fn new(store: Arc<RelationStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &RelationStore {
        &self.store
    }

    /// Idempotent registration, implicitly triggered by any command from the
    /// user. Re-registering updates the stored display name if it changed.
    /// Persists on every call so name updates are captured.
    pub async fn ensure_user(&self, id: &UserId, display_name: &str) -> Outcome {
        let mut graph = self.store.lock().await;
        let undo = match graph.entry(id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(UserRecord::named(display_name));
                EnsureUndo::RemoveRecord
            }
            Entry::Occupied(slot) => {
                let record = slot.into_mut();
                if record.name == display_name {
                    EnsureUndo::Nothing
                } else {
                    EnsureUndo::RestoreName(std::mem::replace(
                        &mut record.name,
                        display_name.to_string(),
                    ))
                }
            }
        };
        if let Err(err) = self.store.save(&graph) {
            match undo {
                EnsureUndo::RemoveRecord => {
                    graph.remove(id);
                }
                EnsureUndo::RestoreName(name) => {
                    if let Some(record) = graph.get_mut(id) {
                        record.name = name;
                    }
                }
                EnsureUndo::Nothing => {}
            }
            return persist_declined(&err);
        }
        match undo {
            EnsureUndo::RemoveRecord => Outcome::success(format!("registered as {display_name}")),
            EnsureUndo::RestoreName(_) => {
                Outcome::success(format!("display name updated to {display_name}"))
            }
            EnsureUndo::Nothing => Outcome::success("already registered"),
        }
    }

    /// Queues a friend request in the recipient's inbox. Senders with
    /// unresolved requests sitting in their own inbox must clear them first;
    /// that throttle is deliberate policy, not a technical necessity.
    pub async fn send_request(&self, from: &UserId, to: &UserId, msg: &str) -> Outcome {
        let mut graph = self.store.lock().await;
        if from == to {
            return Outcome::declined("you cannot send a friend request to yourself");
        }
        let Some(sender) = graph.get(from) else {
            return Outcome::declined(NOT_REGISTERED);
        };
        let sender_name = sender.name.clone();
        let Some(target) = graph.get(to) else {
            return Outcome::declined(format!(
                "user {to} is not registered (they must have used the bot at least once)"
            ));
        };
        let target_name = target.name.clone();
        if !sender.inbox.is_empty() {
            return Outcome::declined(
                "you have pending friend requests to handle before sending new ones",
            );
        }
        if sender.friends.contains(to) {
            return Outcome::success(format!("{target_name} is already your friend"));
        }
        if target.inbox.contains_key(from) {
            return Outcome::declined(format!(
                "request already sent, waiting for {target_name} to respond"
            ));
        }

        let request = FriendRequest::new(from.clone(), sender_name, to.clone(), msg);
        if let Some(target) = graph.get_mut(to) {
            target.inbox.insert(from.clone(), request);
        }
        if let Err(err) = self.store.save(&graph) {
            if let Some(target) = graph.get_mut(to) {
                target.inbox.remove(from);
            }
            return persist_declined(&err);
        }
        Outcome::success(format!("friend request sent to {target_name}({to})"))
    }

    /// Resolves the pending request from `sender` in `recipient`'s inbox.
    /// Accepting links both users symmetrically; either way the request is
    /// deleted, so a resolved request is never observable afterwards.
    pub async fn resolve_request(
        &self,
        recipient: &UserId,
        sender: &UserId,
        accept: bool,
    ) -> Outcome {
        let mut graph = self.store.lock().await;
        let Some(record) = graph.get(recipient) else {
            return Outcome::declined(NOT_REGISTERED);
        };
        if !record.inbox.contains_key(sender) {
            return Outcome::declined("request not found or already processed");
        }
        let Some(sender_name) = graph.get(sender).map(|r| r.name.clone()) else {
            return Outcome::declined("the requester is no longer registered");
        };

        let request = graph
            .get_mut(recipient)
            .and_then(|r| r.inbox.remove(sender));
        if !accept {
            if let Err(err) = self.store.save(&graph) {
                restore_inbox_entry(&mut graph, recipient, sender, request);
                return persist_declined(&err);
            }
            return Outcome::success(format!("you declined the request from {sender_name}"));
        }

        // insert() reports whether the link was newly added, so rollback
        // only removes what this call created.
        let recipient_added = graph
            .get_mut(recipient)
            .is_some_and(|r| r.friends.insert(sender.clone()));
        let sender_added = graph
            .get_mut(sender)
            .is_some_and(|r| r.friends.insert(recipient.clone()));
        if let Err(err) = self.store.save(&graph) {
            if recipient_added {
                if let Some(r) = graph.get_mut(recipient) {
                    r.friends.remove(sender);
                }
            }
            if sender_added {
                if let Some(r) = graph.get_mut(sender) {
                    r.friends.remove(recipient);
                }
            }
            restore_inbox_entry(&mut graph, recipient, sender, request);
            return persist_declined(&err);
        }
        Outcome::success(format!("you and {sender_name} are now friends"))
    }

    /// Removes the symmetric friendship between `owner` and `friend`. A
    /// friend that has since deregistered is tolerated; only the owner-side
    /// link needs to exist.
    pub async fn remove_friend(&self, owner: &UserId, friend: &UserId) -> Outcome {
        let mut graph = self.store.lock().await;
        let Some(record) = graph.get_mut(owner) else {
            return Outcome::declined(NOT_REGISTERED);
        };
        if !record.friends.remove(friend) {
            return Outcome::declined(format!("{friend} is not your friend"));
        }
        let reverse_removed = graph
            .get_mut(friend)
            .is_some_and(|r| r.friends.remove(owner));
        let friend_name = graph.get(friend).map(|r| r.name.clone());
        if let Err(err) = self.store.save(&graph) {
            if let Some(r) = graph.get_mut(owner) {
                r.friends.insert(friend.clone());
            }
            if reverse_removed {
                if let Some(r) = graph.get_mut(friend) {
                    r.friends.insert(owner.clone());
                }
            }
            return persist_declined(&err);
        }
        let display = friend_name.unwrap_or_else(|| friend.to_string());
        Outcome::success(format!("removed {display} from your friends"))
    }

    /// Read-only snapshot of one user: resolved friend names (None for
    /// since-deregistered friends) and pending inbox entries.
    pub async fn summary(&self, id: &UserId) -> Option<UserSummary> {
        let graph = self.store.lock().await;
        let record = graph.get(id)?;
        let friends = record
            .friends
            .iter()
            .map(|fid| FriendEntry {
                id: fid.clone(),
                name: graph.get(fid).map(|r| r.name.clone()),
            })
            .collect();
        let pending = record
            .inbox
            .values()
            .map(|req| PendingEntry {
                from: req.from.clone(),
                from_name: req.from_name.clone(),
                msg: req.msg.clone(),
                time: req.time,
            })
            .collect();
        Some(UserSummary {
            name: record.name.clone(),
            friends,
            pending,
        })
    }

    /// The string-boundary form of [`RelationService::summary`].
    pub async fn describe_user(&self, id: &UserId) -> Outcome {
        match self.summary(id).await {
            None => Outcome::declined(NOT_REGISTERED),
            Some(summary) => Outcome::success(render_summary(&summary)),
        }
    }

    /// One final flush for process shutdown.
    pub async fn flush(&self) -> Result<(), StoreError> {
        self.store.flush().await
    }
}

fn restore_inbox_entry(
    graph: &mut Graph,
    recipient: &UserId,
    sender: &UserId,
    request: Option<FriendRequest>,
) {
    if let (Some(record), Some(request)) = (graph.get_mut(recipient), request) {
        record.inbox.insert(sender.clone(), request);
    }
}

fn persist_declined(err: &StoreError) -> Outcome {
    warn!(%err, "rolled back relation change after failed save");
    Outcome::declined(format!("could not save changes, nothing was modified: {err}"))
}

fn render_summary(summary: &UserSummary) -> String {
    let friends = if summary.friends.is_empty() {
        "none".to_string()
    } else {
        summary
            .friends
            .iter()
            .map(|f| match &f.name {
                Some(name) => format!("{}({})", name, f.id),
                None => format!("<unregistered>({})", f.id),
            })
            .collect::<Vec<_>>()
            .join(", ")
    };
    let pending = if summary.pending.is_empty() {
        "none".to_string()
    } else {
        summary
            .pending
            .iter()
            .map(|p| format!("{}({}) [{}]: {}", p.from_name, p.from, p.time_display(), p.msg))
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "{}'s info:\nfriends: {friends}\npending requests: {pending}",
        summary.name
    )
}
