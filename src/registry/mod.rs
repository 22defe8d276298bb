use std::fmt;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::error::RegistryError;

mod mem_registry;

pub use mem_registry::MemRegistry;

const PLAN_COLLECTIONS: &str = "Plan/Collections";
const TARGET_TODO: &str = "Target/ToDo";
const TARGET_FINISHED: &str = "Target/Finished";
const TARGET_FAILED: &str = "Target/Failed";

pub fn collection_path(database: &str, collection_id: &str) -> String {
    format!("{PLAN_COLLECTIONS}/{database}/{collection_id}")
}

pub fn collection_attr_path(database: &str, collection_id: &str, attr: &str) -> String {
    format!("{}/{attr}", collection_path(database, collection_id))
}

pub fn shard_path(database: &str, collection_id: &str, shard: &str) -> String {
    format!("{}/shards/{shard}", collection_path(database, collection_id))
}

pub fn todo_job_path(job_id: u64) -> String {
    format!("{TARGET_TODO}/{job_id}")
}

pub fn finished_job_path(job_id: u64) -> String {
    format!("{TARGET_FINISHED}/{job_id}")
}

pub fn failed_job_path(job_id: u64) -> String {
    format!("{TARGET_FAILED}/{job_id}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryOperation {
    Set { path: String, value: Value },
    Delete { path: String },
}

impl RegistryOperation {
    pub fn set(path: impl Into<String>, value: Value) -> Self {
        Self::Set {
            path: path.into(),
            value,
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::Delete { path: path.into() }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::Set { path, .. } | Self::Delete { path } => path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// The key currently holds exactly `value`.
    Value { path: String, value: Value },
    /// `empty == true`: the key is absent. `empty == false`: the key is present.
    Empty { path: String, empty: bool },
}

impl Precondition {
    pub fn value(path: impl Into<String>, value: Value) -> Self {
        Self::Value {
            path: path.into(),
            value,
        }
    }

    pub fn empty(path: impl Into<String>) -> Self {
        Self::Empty {
            path: path.into(),
            empty: true,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::Value { path, .. } | Self::Empty { path, .. } => path,
        }
    }

    pub fn holds(&self, current: Option<&Value>) -> bool {
        match self {
            Self::Value { value, .. } => current == Some(value),
            Self::Empty { empty, .. } => current.is_none() == *empty,
        }
    }
}

/// Mutations and the preconditions guarding them, committed all-or-nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WriteTransaction {
    pub operations: Vec<RegistryOperation>,
    pub preconditions: Vec<Precondition>,
}

impl WriteTransaction {
    pub fn new(operations: Vec<RegistryOperation>, preconditions: Vec<Precondition>) -> Self {
        Self {
            operations,
            preconditions,
        }
    }

    /// Encodes the transaction as the registry's write envelope:
    /// `[{path: operation, ...}, {path: precondition, ...}]`.
    ///
    /// Several preconditions may target the same path; the last one wins in
    /// the envelope, so callers that rely on duplicates must submit the
    /// structured form.
    pub fn to_wire(&self) -> Value {
        let mut ops = Map::new();
        for op in self.operations.iter() {
            let encoded = match op {
                RegistryOperation::Set { value, .. } => json!({"op": "set", "new": value}),
                RegistryOperation::Delete { .. } => json!({"op": "delete"}),
            };
            ops.insert(op.path().to_string(), encoded);
        }

        let mut preconds = Map::new();
        for p in self.preconditions.iter() {
            let encoded = match p {
                Precondition::Value { value, .. } => json!({ "old": value }),
                Precondition::Empty { empty, .. } => json!({ "oldEmpty": empty }),
            };
            preconds.insert(p.path().to_string(), encoded);
        }

        Value::Array(vec![Value::Object(ops), Value::Object(preconds)])
    }
}

impl fmt::Display for WriteTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_wire())
    }
}

/// The replicated configuration store.
///
/// `write` either applies every operation of the transaction or none of them.
#[async_trait]
pub trait Registry: Send + Sync {
    async fn get(&self, path: &str) -> Result<Option<Value>, RegistryError>;
    async fn write(&self, tx: &WriteTransaction) -> Result<(), RegistryError>;
}
