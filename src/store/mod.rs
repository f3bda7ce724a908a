//! Keyed document collections.
//!
//! Documents are JSON objects addressed by `(collection, id)` and carry a
//! version counter. Writes are merge patches applied atomically per document
//! under a version precondition, so a read followed by a write can be closed
//! with compare-and-swap instead of trusting the read.

pub mod memory;
pub mod mysql;
pub mod object;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

pub use memory::MemoryDocumentStore;
pub use mysql::MySqlDocumentStore;

pub type Body = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub version: u64,
    pub body: Body,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("version conflict on {collection}/{id}")]
    Conflict { collection: String, id: String },

    #[error("malformed document {collection}/{id}: {reason}")]
    Malformed {
        collection: String,
        id: String,
        reason: String,
    },

    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// What the stored document must look like for a write to go through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// Write unconditionally, creating the document if needed
    Any,
    /// Document must not exist yet
    Absent,
    /// Document must exist at exactly this version
    Version(u64),
}

impl Expect {
    /// Precondition matching a previous read: the version it saw, or absence
    pub fn from_read(doc: Option<&Document>) -> Self {
        match doc {
            Some(d) => Expect::Version(d.version),
            None => Expect::Absent,
        }
    }

    pub(crate) fn admits(&self, current: Option<u64>) -> bool {
        match (self, current) {
            (Expect::Any, _) => true,
            (Expect::Absent, None) => true,
            (Expect::Version(v), Some(cur)) => *v == cur,
            _ => false,
        }
    }
}

/// Equality filter on a top-level field
#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub(crate) fn matches(&self, body: &Body) -> bool {
        body.get(&self.field) == Some(&self.value)
    }
}

/// Segmented path into a document. Segments are kept separate so keys that
/// contain dots are never split by accident.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl From<&str> for FieldPath {
    fn from(dotted: &str) -> Self {
        FieldPath::new(dotted.split('.'))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    Set(Value),
    /// Replaced with the store's clock at apply time
    ServerTimestamp,
    /// Adds to the current number, treating a missing field as zero
    Increment(i64),
    /// Appends each element that is not already present
    ArrayUnion(Vec<Value>),
}

/// A set of field operations applied as one merge. Fields the patch does
/// not mention are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergePatch {
    ops: Vec<(FieldPath, FieldOp)>,
}

impl MergePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, path: impl Into<FieldPath>, value: impl Into<Value>) -> Self {
        self.ops.push((path.into(), FieldOp::Set(value.into())));
        self
    }

    pub fn server_timestamp(mut self, path: impl Into<FieldPath>) -> Self {
        self.ops.push((path.into(), FieldOp::ServerTimestamp));
        self
    }

    pub fn increment(mut self, path: impl Into<FieldPath>, by: i64) -> Self {
        self.ops.push((path.into(), FieldOp::Increment(by)));
        self
    }

    pub fn array_union(mut self, path: impl Into<FieldPath>, values: Vec<Value>) -> Self {
        self.ops.push((path.into(), FieldOp::ArrayUnion(values)));
        self
    }

    pub fn ops(&self) -> &[(FieldPath, FieldOp)] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Apply every operation in order onto `body`
    pub fn apply(&self, body: &mut Body, now: DateTime<Utc>) {
        for (path, op) in &self.ops {
            let Some((last, parents)) = path.segments().split_last() else {
                continue;
            };

            let mut target = &mut *body;
            for segment in parents {
                let entry = target
                    .entry(segment.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                if !entry.is_object() {
                    *entry = Value::Object(Map::new());
                }
                target = match entry.as_object_mut() {
                    Some(obj) => obj,
                    None => unreachable!("entry was just made an object"),
                };
            }

            let value = match op {
                FieldOp::Set(v) => v.clone(),
                FieldOp::ServerTimestamp => Value::String(server_timestamp(now)),
                FieldOp::Increment(by) => {
                    let current = target.get(last).and_then(Value::as_i64).unwrap_or(0);
                    Value::from(current + by)
                }
                FieldOp::ArrayUnion(items) => {
                    let mut current = match target.remove(last) {
                        Some(Value::Array(a)) => a,
                        _ => Vec::new(),
                    };
                    for item in items {
                        if !current.contains(item) {
                            current.push(item.clone());
                        }
                    }
                    Value::Array(current)
                }
            };
            target.insert(last.clone(), value);
        }
    }
}

/// Canonical text form of a store-assigned timestamp
pub fn server_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Authoritative read of one document
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Documents whose top-level fields equal every filter value
    async fn find(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>, StoreError>;

    /// Atomically apply `patch` if the stored document satisfies `expect`.
    /// Returns the new version, or [`StoreError::Conflict`].
    async fn merge(
        &self,
        collection: &str,
        id: &str,
        patch: &MergePatch,
        expect: Expect,
    ) -> Result<u64, StoreError>;
}
