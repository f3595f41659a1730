//! Secondary-index maintenance for user back-references.
//!
//! Each user referenced by a group carries a `groups` list naming the
//! groups it belongs to. The store offers no multi-key transactions, so a
//! fan-out of per-user read-modify-write cycles can land partially; this
//! module's job is to dispatch those cycles concurrently and fold every
//! outcome into exactly one result per call, reporting precisely which
//! users were updated and which were not.

use futures::future::join_all;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{IndexError, IndexPropagationError};
use crate::group::Group;
use crate::store::{from_json, to_json, KeyValueStore};
use crate::user::UserRecord;


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexDirection {
    Attach,
    Detach,
}

impl fmt::Display for IndexDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexDirection::Attach => write!(f, "attach"),
            IndexDirection::Detach => write!(f, "detach"),
        }
    }
}

pub struct IndexMaintainer {
    store: Arc<dyn KeyValueStore>,
    user_prefix: String,
}

impl IndexMaintainer {
    pub fn new(store: Arc<dyn KeyValueStore>, user_prefix: impl Into<String>) -> Self {
        Self {
            store,
            user_prefix: user_prefix.into(),
        }
    }

    /// Users whose back-reference list a group touches: `admins ∪ users`,
    /// deduplicated in first-seen order. Pads carry no back-reference.
    pub fn affected_users(group: &Group) -> Vec<String> {
        let mut affected: Vec<String> = Vec::new();
        for id in group.admins.iter().chain(group.users.iter()) {
            if !affected.contains(id) {
                affected.push(id.clone());
            }
        }
        affected
    }

    /// Fan the group membership out to every affected user's `groups` list.
    ///
    /// All per-user updates are dispatched concurrently and their outcomes
    /// aggregated into a single completion: `Ok` with the updated ids when
    /// every update landed, otherwise one [`IndexPropagationError`] naming
    /// the ids that updated and the per-id failures. A failing user never
    /// stops the remaining updates from being attempted and reported.
    pub async fn propagate(
        &self,
        direction: IndexDirection,
        group: &Group,
    ) -> Result<Vec<String>, IndexPropagationError> {
        let affected = Self::affected_users(group);

        let updates = affected.iter().map(|user_id| {
            let user_id = user_id.clone();
            async move {
                let result = self.update_user(direction, &user_id, &group.id).await;
                (user_id, result)
            }
        });
        let outcomes = join_all(updates).await;

        let mut updated = Vec::new();
        let mut failed = Vec::new();
        for (user_id, result) in outcomes {
            match result {
                Ok(()) => updated.push(user_id),
                Err(err) => failed.push((user_id, err)),
            }
        }

        if failed.is_empty() {
            debug!(
                group = %group.id,
                %direction,
                users = updated.len(),
                "back-reference propagation complete"
            );
            Ok(updated)
        } else {
            warn!(
                group = %group.id,
                %direction,
                updated = updated.len(),
                failed = failed.len(),
                "back-reference propagation partially failed"
            );
            Err(IndexPropagationError {
                direction,
                group_id: group.id.clone(),
                updated,
                failed,
                compensation_failures: Vec::new(),
            })
        }
    }

    /// Detach a single user, used for the repository's compensating step.
    pub async fn detach_user(&self, user_id: &str, group_id: &str) -> Result<(), IndexError> {
        self.update_user(IndexDirection::Detach, user_id, group_id).await
    }

    async fn update_user(
        &self,
        direction: IndexDirection,
        user_id: &str,
        group_id: &str,
    ) -> Result<(), IndexError> {
        let key = format!("{}{}", self.user_prefix, user_id);

        let mut record: UserRecord = match self.store.get(&key).await? {
            Some(value) => from_json(&key, value).map_err(IndexError::Store)?,
            None => match direction {
                // The record existed when references were checked but is
                // gone now; attaching to nothing is a real failure.
                IndexDirection::Attach => {
                    return Err(IndexError::MissingUser(user_id.to_string()))
                }
                // Nothing left to detach from.
                IndexDirection::Detach => return Ok(()),
            },
        };

        let changed = match direction {
            IndexDirection::Attach => record.attach_group(group_id),
            IndexDirection::Detach => record.detach_group(group_id),
        };

        if changed {
            let value = to_json(&key, &record).map_err(IndexError::Store)?;
            self.store.set(&key, value).await?;
        }
        Ok(())
    }
}
