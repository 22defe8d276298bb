use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{Registry, RegistryOperation, WriteTransaction};
use crate::error::RegistryError;

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut node = root;
    for seg in split_path(path) {
        node = node.as_object()?.get(seg)?;
    }

    Some(node)
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }

    match node {
        Value::Object(m) => m,
        _ => unreachable!(),
    }
}

fn set(root: &mut Value, path: &str, value: Value) {
    let segs: Vec<&str> = split_path(path).collect();
    let Some((last, parents)) = segs.split_last() else {
        *root = value;
        return;
    };

    let mut node = root;
    for seg in parents {
        node = ensure_object(node)
            .entry(seg.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    ensure_object(node).insert(last.to_string(), value);
}

fn delete(root: &mut Value, path: &str) {
    let segs: Vec<&str> = split_path(path).collect();
    let Some((last, parents)) = segs.split_last() else {
        *root = Value::Object(Map::new());
        return;
    };

    let mut node = root;
    for seg in parents {
        match node.as_object_mut().and_then(|m| m.get_mut(*seg)) {
            Some(child) => node = child,
            None => return,
        }
    }

    if let Some(m) = node.as_object_mut() {
        m.remove(*last);
    }
}

/// A registry held in process memory as one JSON tree.
pub struct MemRegistry {
    root: RwLock<Value>,
}

impl Default for MemRegistry {
    fn default() -> Self {
        Self::new(Value::Object(Map::new()))
    }
}

impl MemRegistry {
    pub fn new(root: Value) -> Self {
        Self {
            root: RwLock::new(root),
        }
    }

    pub fn snapshot(&self) -> Value {
        self.root.read().clone()
    }

    pub fn get_sync(&self, path: &str) -> Option<Value> {
        lookup(&self.root.read(), path).cloned()
    }

    /// Writes without preconditions, for seeding state.
    pub fn put(&self, path: &str, value: Value) {
        set(&mut self.root.write(), path, value);
    }

    pub fn commit(&self, tx: &WriteTransaction) -> Result<(), RegistryError> {
        let mut root = self.root.write();

        for p in tx.preconditions.iter() {
            if !p.holds(lookup(&root, p.path())) {
                warn!("precondition failed on {}: {:?}", p.path(), p);
                return Err(RegistryError::PreconditionFailed {
                    path: p.path().to_string(),
                });
            }
        }

        for op in tx.operations.iter() {
            match op {
                RegistryOperation::Set { path, value } => set(&mut root, path, value.clone()),
                RegistryOperation::Delete { path } => delete(&mut root, path),
            }
        }

        debug!(
            "committed {} operations under {} preconditions",
            tx.operations.len(),
            tx.preconditions.len()
        );
        Ok(())
    }
}

#[async_trait]
impl Registry for MemRegistry {
    async fn get(&self, path: &str) -> Result<Option<Value>, RegistryError> {
        Ok(self.get_sync(path))
    }

    async fn write(&self, tx: &WriteTransaction) -> Result<(), RegistryError> {
        self.commit(tx)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::registry::Precondition;

    #[test]
    fn test_put_get_delete() {
        let reg = MemRegistry::default();
        reg.put("Plan/Collections/db/100/replicationFactor", json!(2));

        assert_eq!(
            reg.get_sync("Plan/Collections/db/100/replicationFactor"),
            Some(json!(2))
        );
        assert_eq!(
            reg.get_sync("Plan/Collections/db/100"),
            Some(json!({"replicationFactor": 2}))
        );
        assert_eq!(reg.get_sync("Plan/Collections/db/101"), None);

        delete(&mut reg.root.write(), "Plan/Collections/db/100/replicationFactor");
        assert_eq!(reg.get_sync("Plan/Collections/db/100"), Some(json!({})));

        // deleting under a missing parent is a no-op
        delete(&mut reg.root.write(), "Plan/Nope/x");
    }

    #[test]
    fn test_commit_is_atomic() {
        let reg = MemRegistry::default();
        reg.put("a/b", json!("x"));

        let tx = WriteTransaction::new(
            vec![
                RegistryOperation::set("a/c", json!(1)),
                RegistryOperation::delete("a/b"),
            ],
            vec![
                Precondition::value("a/b", json!("x")),
                Precondition::value("a/d", json!("missing")),
            ],
        );

        let before = reg.snapshot();
        assert_eq!(
            reg.commit(&tx),
            Err(RegistryError::PreconditionFailed {
                path: "a/d".to_string()
            })
        );
        assert_eq!(reg.snapshot(), before);
    }

    #[tokio::test]
    async fn test_write_applies_all_operations() {
        let reg = MemRegistry::default();
        reg.put("a/b", json!("x"));

        let tx = WriteTransaction::new(
            vec![
                RegistryOperation::set("a/c", json!(1)),
                RegistryOperation::delete("a/b"),
            ],
            vec![Precondition::value("a/b", json!("x")), Precondition::empty("a/c")],
        );

        reg.write(&tx).await.unwrap();
        assert_eq!(reg.get("a").await.unwrap(), Some(json!({"c": 1})));

        // replay is rejected: a/c is no longer empty
        assert!(reg.write(&tx).await.is_err());
    }
}
