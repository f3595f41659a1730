//! Contract with externally-owned user records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The slice of a user record this crate touches.
///
/// `groups` is the denormalized back-reference list of group ids the user
/// belongs to, and this crate is its sole writer. Everything else on the
/// record belongs to the user service and is carried through read-modify-
/// write cycles untouched via the flattened map.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserRecord {
    /// Add `group_id` to the back-reference list. Returns `false` when it
    /// was already present.
    pub fn attach_group(&mut self, group_id: &str) -> bool {
        if self.groups.iter().any(|g| g == group_id) {
            return false;
        }
        self.groups.push(group_id.to_string());
        true
    }

    /// Remove every occurrence of `group_id`. Returns `false` when none
    /// was present.
    pub fn detach_group(&mut self, group_id: &str) -> bool {
        let before = self.groups.len();
        self.groups.retain(|g| g != group_id);
        self.groups.len() != before
    }
}
