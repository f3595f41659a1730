//! Group persistence orchestration.
//!
//! One call runs: normalize → resolve id → batch existence check over every
//! referenced id → group record write → back-reference propagation. The
//! ordering bounds the window of inconsistency but cannot close it, since
//! the store has no multi-key atomicity; the one step that can leave the
//! group and its secondary indexes out of sync reports exactly what landed.

use futures::future::try_join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{GroupError, StoreError};
use crate::group::{normalize, Group, GroupInput, Visibility};
use crate::ids::{IdGenerator, UuidIdGenerator};
use crate::index::{IndexDirection, IndexMaintainer};
use crate::store::{from_json, to_json, KeyValueStore};


/// Store namespaces. Nobody outside this module builds keys.
pub const GROUP_PREFIX: &str = "group:";
pub const USER_PREFIX: &str = "user:";
pub const PAD_PREFIX: &str = "pad:";

/// Concurrent existence check over a batch of store keys. Returns the
/// subset that did not resolve; a store failure propagates as an error
/// instead of masquerading as a missing entry.
pub async fn check_all(
    store: &dyn KeyValueStore,
    keys: &[String],
) -> Result<Vec<String>, StoreError> {
    let lookups = keys.iter().map(|key| async move {
        let present = store.exists(key).await?;
        Ok::<_, StoreError>((key.clone(), present))
    });
    let results = try_join_all(lookups).await?;

    Ok(results
        .into_iter()
        .filter(|(_, present)| !present)
        .map(|(key, _)| key)
        .collect())
}

pub struct GroupRepository {
    store: Arc<dyn KeyValueStore>,
    ids: Arc<dyn IdGenerator>,
    index: IndexMaintainer,
    op_timeout: Option<Duration>,
}

impl GroupRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            index: IndexMaintainer::new(store.clone(), USER_PREFIX),
            store,
            ids: Arc::new(UuidIdGenerator),
            op_timeout: None,
        }
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Deadline applied to each public operation. Elapsing surfaces
    /// [`GroupError::Timeout`]; writes dispatched before the deadline may
    /// already have landed.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = Some(timeout);
        self
    }

    fn group_key(id: &str) -> String {
        format!("{GROUP_PREFIX}{id}")
    }

    /// Create a group under a freshly generated id.
    pub async fn create(&self, input: &GroupInput) -> Result<Group, GroupError> {
        self.timed(self.upsert(input, None)).await
    }

    /// Re-run the creation path against an existing id. The id must already
    /// denote a stored group; full-replace semantics, no field merging.
    pub async fn create_with_id(&self, input: &GroupInput, id: &str) -> Result<Group, GroupError> {
        self.timed(self.upsert(input, Some(id))).await
    }

    /// Alias of [`create_with_id`](Self::create_with_id); callers resend
    /// unchanged fields.
    pub async fn update(&self, input: &GroupInput, id: &str) -> Result<Group, GroupError> {
        self.create_with_id(input, id).await
    }

    pub async fn read(&self, id: &str) -> Result<Group, GroupError> {
        self.timed(self.read_inner(id)).await
    }

    /// Delete a group and every back-reference pointing at it.
    ///
    /// Fail-closed: the group record is removed only after detachment
    /// succeeded for every affected user, so a propagation failure leaves
    /// the record in place for a retry.
    pub async fn delete(&self, id: &str) -> Result<(), GroupError> {
        self.timed(async {
            let group = self.read_inner(id).await?;

            self.index
                .propagate(IndexDirection::Detach, &group)
                .await?;

            self.store.delete(&Self::group_key(id)).await?;
            debug!(group = %id, "group deleted");
            Ok(())
        })
        .await
    }

    async fn read_inner(&self, id: &str) -> Result<Group, GroupError> {
        let key = Self::group_key(id);
        match self.store.get(&key).await? {
            Some(value) => Ok(from_json(&key, value)?),
            None => Err(GroupError::NotFound(id.to_string())),
        }
    }

    async fn upsert(&self, input: &GroupInput, existing_id: Option<&str>) -> Result<Group, GroupError> {
        // Normalization is pure; validation failures never reach the store.
        let id = match existing_id {
            Some(id) => id.to_string(),
            None => self.ids.generate(),
        };
        let group = normalize(input, id)?;

        if existing_id.is_some() && !self.store.exists(&Self::group_key(&group.id)).await? {
            return Err(GroupError::NotFound(group.id.clone()));
        }

        self.check_references(&group).await?;

        let key = Self::group_key(&group.id);
        self.store.set(&key, to_json(&key, &group)?).await?;
        debug!(group = %group.id, "group record written");

        match self.index.propagate(IndexDirection::Attach, &group).await {
            Ok(_) => Ok(group),
            Err(mut err) => {
                // Saga compensation, best effort and only for a fresh
                // create; in edit mode the prior record is already gone.
                if existing_id.is_none() {
                    err.compensation_failures =
                        self.compensate_create(&group, &err.updated).await;
                }
                warn!(
                    group = %group.id,
                    updated = err.updated.len(),
                    failed = err.failed.len(),
                    compensation_failures = err.compensation_failures.len(),
                    "attach propagation failed"
                );
                Err(GroupError::IndexPropagation(err))
            }
        }
    }

    /// Verify every referenced admin/user/pad id as one deduplicated batch.
    async fn check_references(&self, group: &Group) -> Result<(), GroupError> {
        let mut refs: Vec<(String, String)> = Vec::new();
        let user_keys = group
            .admins
            .iter()
            .chain(group.users.iter())
            .map(|id| (id.clone(), format!("{USER_PREFIX}{id}")));
        let pad_keys = group.pads.iter().map(|id| (id.clone(), format!("{PAD_PREFIX}{id}")));
        for (id, key) in user_keys.chain(pad_keys) {
            if !refs.iter().any(|(_, seen)| seen == &key) {
                refs.push((id, key));
            }
        }

        let keys: Vec<String> = refs.iter().map(|(_, key)| key.clone()).collect();
        let missing_keys = check_all(self.store.as_ref(), &keys).await?;
        if missing_keys.is_empty() {
            return Ok(());
        }

        let missing = refs
            .into_iter()
            .filter(|(_, key)| missing_keys.contains(key))
            .map(|(id, _)| id)
            .collect();
        Err(GroupError::Reference { missing })
    }

    /// Roll back a fresh create whose attach fan-out landed partially:
    /// detach the users that did attach, then drop the group record.
    /// Failures here are reported, not retried.
    async fn compensate_create(&self, group: &Group, attached: &[String]) -> Vec<String> {
        let mut failures = Vec::new();
        for user_id in attached {
            if let Err(err) = self.index.detach_user(user_id, &group.id).await {
                failures.push(format!("detach {user_id}: {err}"));
            }
        }
        if let Err(err) = self.store.delete(&Self::group_key(&group.id)).await {
            failures.push(format!("remove group record: {err}"));
        }
        failures
    }

    async fn timed<T>(
        &self,
        op: impl std::future::Future<Output = Result<T, GroupError>>,
    ) -> Result<T, GroupError> {
        match self.op_timeout {
            Some(limit) => match tokio::time::timeout(limit, op).await {
                Ok(result) => result,
                Err(_) => Err(GroupError::Timeout { waited: limit }),
            },
            None => op.await,
        }
    }

    // Incremental-edit surface declared upstream without semantics; each
    // returns `Unimplemented` until the intended behavior is settled.

    pub async fn attach_pad(&self, _group_id: &str, _pad_id: &str) -> Result<(), GroupError> {
        Err(GroupError::Unimplemented("attach_pad"))
    }

    pub async fn detach_pad(&self, _group_id: &str, _pad_id: &str) -> Result<(), GroupError> {
        Err(GroupError::Unimplemented("detach_pad"))
    }

    pub async fn attach_user(&self, _group_id: &str, _user_id: &str) -> Result<(), GroupError> {
        Err(GroupError::Unimplemented("attach_user"))
    }

    pub async fn detach_user(&self, _group_id: &str, _user_id: &str) -> Result<(), GroupError> {
        Err(GroupError::Unimplemented("detach_user"))
    }

    pub async fn set_password(
        &self,
        _group_id: &str,
        _password: Option<&str>,
    ) -> Result<(), GroupError> {
        Err(GroupError::Unimplemented("set_password"))
    }

    pub async fn set_visibility(
        &self,
        _group_id: &str,
        _visibility: Visibility,
    ) -> Result<(), GroupError> {
        Err(GroupError::Unimplemented("set_visibility"))
    }

    pub async fn archive(&self, _group_id: &str) -> Result<(), GroupError> {
        Err(GroupError::Unimplemented("archive"))
    }
}
