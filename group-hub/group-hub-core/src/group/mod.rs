//! Group entity and input normalization.
//!
//! Normalization is pure and local: loosely-typed caller input becomes a
//! canonical [`Group`] with defaults applied, without ever touching the
//! store. Whether the referenced ids exist is checked separately by the
//! repository, since that requires store round-trips.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GroupError;

#[cfg(test)]
mod tests;

/// Access-control mode of a group.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Invite-only.
    #[default]
    Restricted,
    /// Password-gated.
    Private,
    /// Open via link.
    Public,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Restricted => "restricted",
            Visibility::Private => "private",
            Visibility::Public => "public",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "restricted" => Visibility::Restricted,
            "private" => Visibility::Private,
            "public" => Visibility::Public,
            _ => Visibility::Restricted,
        }
    }
}

/// Canonical group entity as persisted under the group key namespace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Group {
    pub id: String,
    pub name: String,
    /// Deduplicated, first-seen order; always contains the creating admin.
    pub admins: Vec<String>,
    pub users: Vec<String>,
    pub pads: Vec<String>,
    pub visibility: Visibility,
    /// Meaningful only under `Private`; `None` is the no-password sentinel.
    pub password: Option<String>,
    pub readonly: bool,
}

impl Group {
    /// Re-expand this group into input form. Feeding the result back through
    /// [`normalize`] with the same id reproduces the group unchanged.
    pub fn as_input(&self) -> GroupInput {
        GroupInput {
            name: Some(Value::String(self.name.clone())),
            admin: self.admins.first().cloned().map(Value::String),
            admins: self.admins.iter().cloned().map(Value::String).collect(),
            users: self.users.iter().cloned().map(Value::String).collect(),
            pads: self.pads.iter().cloned().map(Value::String).collect(),
            visibility: Some(Value::String(self.visibility.as_str().to_string())),
            password: self.password.clone().map(Value::String),
            readonly: Some(Value::Bool(self.readonly)),
        }
    }
}

/// Loosely-typed creation/update input.
///
/// Fields arrive as raw JSON values so duck-typed callers are filtered in
/// one place instead of type checks sprinkled through call sites.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupInput {
    pub name: Option<Value>,
    pub admin: Option<Value>,
    #[serde(default)]
    pub admins: Vec<Value>,
    #[serde(default)]
    pub users: Vec<Value>,
    #[serde(default)]
    pub pads: Vec<Value>,
    pub visibility: Option<Value>,
    pub password: Option<Value>,
    pub readonly: Option<Value>,
}

fn required_string(value: Option<&Value>, field: &str) -> Result<String, GroupError> {
    match value.and_then(Value::as_str) {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        _ => Err(GroupError::Validation(format!(
            "{field} must be a non-empty string"
        ))),
    }
}

/// Keep only string entries, deduplicated in first-seen order. Non-string
/// entries are dropped, not rejected.
fn string_entries<'a>(values: impl IntoIterator<Item = &'a Value>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        if let Some(s) = value.as_str() {
            if !out.iter().any(|seen| seen == s) {
                out.push(s.to_string());
            }
        }
    }
    out
}

/// Turn raw input into a canonical [`Group`] under the given id.
///
/// Fails only on a missing/empty `name` or `admin`; every optional field
/// falls back to its default when absent or of the wrong type.
pub fn normalize(input: &GroupInput, id: String) -> Result<Group, GroupError> {
    let name = required_string(input.name.as_ref(), "name")?;
    let admin = required_string(input.admin.as_ref(), "admin")?;

    let mut admins = vec![admin];
    for entry in string_entries(&input.admins) {
        if !admins.contains(&entry) {
            admins.push(entry);
        }
    }

    let visibility = input
        .visibility
        .as_ref()
        .and_then(Value::as_str)
        .map(Visibility::from_str)
        .unwrap_or_default();

    Ok(Group {
        id,
        name,
        admins,
        users: string_entries(&input.users),
        pads: string_entries(&input.pads),
        visibility,
        password: input
            .password
            .as_ref()
            .and_then(Value::as_str)
            .map(str::to_string),
        readonly: input
            .readonly
            .as_ref()
            .and_then(Value::as_bool)
            .unwrap_or(false),
    })
}
