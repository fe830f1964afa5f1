//! Record lookup used by ownership checks

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Attribute map of a looked-up record, related records embedded under their kind name
pub type RecordAttributes = serde_json::Map<String, serde_json::Value>;

/// Kinds of record an ownership rule can address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    User,
    Course,
    Assignment,
    Submission,
}

impl RecordKind {
    /// Name the record is embedded under when traversed as a related record
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::User => "user",
            RecordKind::Course => "course",
            RecordKind::Assignment => "assignment",
            RecordKind::Submission => "submission",
        }
    }

    /// Attribute holding a reference to a record of this kind
    pub fn reference_field(&self) -> &'static str {
        match self {
            RecordKind::User => "userId",
            RecordKind::Course => "courseId",
            RecordKind::Assignment => "assignmentId",
            RecordKind::Submission => "submissionId",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LookupError {
    #[error("Record lookup failed: {message}")]
    Backend { message: String },

    #[error("Record lookup timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

/// Resolves a record and an ordered chain of related records.
///
/// `lookup(Assignment, "4", &[Course])` yields the assignment's attributes with the
/// owning course embedded as `"course": {...}`. Each related kind is reached through
/// the previous record's `<kind>Id` attribute and nested inside it, so
/// `lookup(Submission, k, &[Assignment, Course])` ends in `assignment.course`.
/// A dangling reference embeds `null`.
#[async_trait]
pub trait RecordLookup: Send + Sync {
    async fn lookup(
        &self,
        kind: RecordKind,
        key: &str,
        related: &[RecordKind],
    ) -> Result<Option<RecordAttributes>, LookupError>;
}
