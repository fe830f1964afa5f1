//! Gate decisions and ownership rules

use serde_json::Value;

use crate::domain::auth::value_objects::UserId;
use crate::domain::catalog::lookup::{RecordAttributes, RecordKind};

use super::errors::AccessError;

/// Outcome of a single gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allowed,
    Denied,
    NotFound,
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allowed)
    }

    pub fn into_result(self) -> Result<(), AccessError> {
        match self {
            GateDecision::Allowed => Ok(()),
            GateDecision::Denied => Err(AccessError::Forbidden),
            GateDecision::NotFound => Err(AccessError::NotFoundForCheck),
        }
    }
}

/// Where an ownership check reads its lookup key from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Named path parameter, e.g. `id` in `/courses/{id}`
    PathParam(String),
    /// Top-level field of the JSON request body
    BodyField(String),
}

impl KeySource {
    pub fn path(name: impl Into<String>) -> Self {
        KeySource::PathParam(name.into())
    }

    pub fn body(name: impl Into<String>) -> Self {
        KeySource::BodyField(name.into())
    }

    pub fn reads_body(&self) -> bool {
        matches!(self, KeySource::BodyField(_))
    }
}

/// Attribute path to the owner id inside a looked-up record, e.g. `course.instructorId`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerField(Vec<String>);

impl OwnerField {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Resolve the owner id; `None` when a segment is missing or the leaf is not an id
    pub fn resolve(&self, attributes: &RecordAttributes) -> Option<UserId> {
        let (first, rest) = self.0.split_first()?;
        let mut current = attributes.get(first)?;
        for segment in rest {
            current = current.as_object()?.get(segment)?;
        }
        match current {
            Value::Number(n) => n.as_i64().map(UserId),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

impl std::fmt::Display for OwnerField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// Configuration of one ownership gate: which record to load, how to reach it and
/// where its owner id lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipRule {
    pub kind: RecordKind,
    pub related: Vec<RecordKind>,
    pub key_source: KeySource,
    pub owner_field: OwnerField,
}

impl OwnershipRule {
    pub fn new(kind: RecordKind, key_source: KeySource, owner_field: OwnerField) -> Self {
        Self {
            kind,
            related: Vec::new(),
            key_source,
            owner_field,
        }
    }

    /// Traverse related records in order before reading the owner field
    pub fn through(mut self, related: impl IntoIterator<Item = RecordKind>) -> Self {
        self.related = related.into_iter().collect();
        self
    }
}
