use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Opaque identifier assigned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EntityStatus {
    Pending,
    Approved,
    Rejected,
    Published,
    Blocked,
    Deleted,
}

impl EntityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityStatus::Pending => "pending",
            EntityStatus::Approved => "approved",
            EntityStatus::Rejected => "rejected",
            EntityStatus::Published => "published",
            EntityStatus::Blocked => "blocked",
            EntityStatus::Deleted => "deleted",
        }
    }
}

impl fmt::Display for EntityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {what}: {value}")]
pub struct ParseKindError {
    what: &'static str,
    value: String,
}

impl FromStr for EntityStatus {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(EntityStatus::Pending),
            "approved" => Ok(EntityStatus::Approved),
            "rejected" => Ok(EntityStatus::Rejected),
            "published" => Ok(EntityStatus::Published),
            "blocked" => Ok(EntityStatus::Blocked),
            "deleted" => Ok(EntityStatus::Deleted),
            _ => Err(ParseKindError {
                what: "status",
                value: s.to_string(),
            }),
        }
    }
}

/// A single attribute value. Anything nested (arrays, objects) is rejected at
/// the API boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Timestamp(DateTime<Utc>),
    Text(String),
}

impl Scalar {
    /// Text form used by category matching and search. Timestamps render as
    /// RFC 3339; `Null` has none.
    pub fn text_form(&self) -> Option<Cow<'_, str>> {
        match self {
            Scalar::Null => None,
            Scalar::Text(s) => Some(Cow::Borrowed(s)),
            Scalar::Bool(b) => Some(Cow::Owned(b.to_string())),
            Scalar::Int(n) => Some(Cow::Owned(n.to_string())),
            Scalar::Float(x) => Some(Cow::Owned(x.to_string())),
            Scalar::Timestamp(ts) => Some(Cow::Owned(ts.to_rfc3339())),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Total order used by the projector's sort. Values of different kinds
    /// compare by kind rank so the order stays deterministic.
    pub fn sort_cmp(&self, other: &Scalar) -> Ordering {
        match (self, other) {
            (Scalar::Int(a), Scalar::Int(b)) => a.cmp(b),
            (Scalar::Int(a), Scalar::Float(b)) => cmp_int_float(*a, *b),
            (Scalar::Float(a), Scalar::Int(b)) => cmp_int_float(*b, *a).reverse(),
            // -0.0 and 0.0 are equal, as they are to Int(0); NaN keeps its total position.
            (Scalar::Float(a), Scalar::Float(b)) => a.partial_cmp(b).unwrap_or_else(|| a.total_cmp(b)),
            (Scalar::Bool(a), Scalar::Bool(b)) => a.cmp(b),
            (Scalar::Timestamp(a), Scalar::Timestamp(b)) => a.cmp(b),
            (Scalar::Text(a), Scalar::Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
            (Scalar::Null, Scalar::Null) => Ordering::Equal,
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Scalar::Bool(_) => 0,
            Scalar::Int(_) | Scalar::Float(_) => 1,
            Scalar::Timestamp(_) => 2,
            Scalar::Text(_) => 3,
            Scalar::Null => 4,
        }
    }
}

/// Exact comparison of an integer with a float, without rounding the integer.
fn cmp_int_float(int: i64, float: f64) -> Ordering {
    // 2^63, the first float past i64::MAX.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if float.is_nan() {
        return (int as f64).total_cmp(&float);
    }
    if float >= LIMIT {
        return Ordering::Less;
    }
    if float < -LIMIT {
        return Ordering::Greater;
    }
    let whole = float.trunc();
    match int.cmp(&(whole as i64)) {
        Ordering::Equal => whole.partial_cmp(&float).unwrap_or(Ordering::Equal),
        ord => ord,
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Int(n)
    }
}

impl From<DateTime<Utc>> for Scalar {
    fn from(ts: DateTime<Utc>) -> Self {
        Scalar::Timestamp(ts)
    }
}

/// A domain record (listing, shop, user, verification request).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub status: EntityStatus,
    #[serde(default)]
    pub attributes: BTreeMap<String, Scalar>,
}

impl Entity {
    pub fn new(id: impl Into<EntityId>, status: EntityStatus) -> Self {
        Self {
            id: id.into(),
            status,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<Scalar>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn attr(&self, key: &str) -> Option<&Scalar> {
        self.attributes.get(key)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Validate,
    Reject,
    Publish,
    Unpublish,
    Block,
    Unblock,
    Delete,
    Restore,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Validate => "validate",
            ActionKind::Reject => "reject",
            ActionKind::Publish => "publish",
            ActionKind::Unpublish => "unpublish",
            ActionKind::Block => "block",
            ActionKind::Unblock => "unblock",
            ActionKind::Delete => "delete",
            ActionKind::Restore => "restore",
        }
    }

    /// Status a target is left in once the backend confirms the action.
    /// `None` means the entity is gone.
    pub fn resulting_status(&self) -> Option<EntityStatus> {
        match self {
            ActionKind::Validate => Some(EntityStatus::Approved),
            ActionKind::Reject => Some(EntityStatus::Rejected),
            ActionKind::Publish => Some(EntityStatus::Published),
            ActionKind::Unpublish => Some(EntityStatus::Approved),
            ActionKind::Block => Some(EntityStatus::Blocked),
            ActionKind::Unblock => Some(EntityStatus::Approved),
            ActionKind::Restore => Some(EntityStatus::Pending),
            ActionKind::Delete => None,
        }
    }

    /// Restore only makes sense after a soft delete; nothing else does.
    pub fn applies_to(&self, status: EntityStatus) -> bool {
        match self {
            ActionKind::Restore => status == EntityStatus::Deleted,
            _ => status != EntityStatus::Deleted,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "validate" => Ok(ActionKind::Validate),
            "reject" => Ok(ActionKind::Reject),
            "publish" => Ok(ActionKind::Publish),
            "unpublish" => Ok(ActionKind::Unpublish),
            "block" => Ok(ActionKind::Block),
            "unblock" => Ok(ActionKind::Unblock),
            "delete" => Ok(ActionKind::Delete),
            "restore" => Ok(ActionKind::Restore),
            _ => Err(ParseKindError {
                what: "action",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub batch_id: Uuid,
    pub kind: ActionKind,
    pub target_ids: Vec<EntityId>,
}

impl ActionRequest {
    /// Build a request; repeated ids keep their first position only.
    pub fn new(kind: ActionKind, target_ids: impl IntoIterator<Item = EntityId>) -> Self {
        let mut seen = std::collections::HashSet::new();
        let target_ids = target_ids
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();
        Self {
            batch_id: Uuid::new_v4(),
            kind,
            target_ids,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.target_ids.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub id: EntityId,
    pub succeeded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Informational message the backend attached to a successful call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ActionOutcome {
    pub fn success(id: EntityId, message: Option<String>) -> Self {
        Self {
            id,
            succeeded: true,
            error_message: None,
            message,
        }
    }

    pub fn failure(id: EntityId, error_message: impl Into<String>) -> Self {
        Self {
            id,
            succeeded: false,
            error_message: Some(error_message.into()),
            message: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionBatchResult {
    pub batch_id: Uuid,
    pub kind: ActionKind,
    pub success_count: usize,
    pub failure_count: usize,
    pub outcomes: Vec<ActionOutcome>,
}

impl ActionBatchResult {
    pub fn from_outcomes(batch_id: Uuid, kind: ActionKind, outcomes: Vec<ActionOutcome>) -> Self {
        let success_count = outcomes.iter().filter(|o| o.succeeded).count();
        Self {
            batch_id,
            kind,
            success_count,
            failure_count: outcomes.len() - success_count,
            outcomes,
        }
    }

    /// Some targets went through and some did not.
    pub fn is_partial_failure(&self) -> bool {
        self.failure_count > 0 && self.success_count > 0
    }

    pub fn failed(&self) -> impl Iterator<Item = &ActionOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded)
    }

    pub fn succeeded_ids(&self) -> impl Iterator<Item = &EntityId> {
        self.outcomes.iter().filter(|o| o.succeeded).map(|o| &o.id)
    }
}
