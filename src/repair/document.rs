//! Status documents describing repair operations to operators.
//!
//! These are reporting views only. Field names follow what operator tooling
//! expects (`distributeShardsLike` for the proto collection name and so on),
//! and the documents are never turned back into operations.

use serde::Serialize;
use serde_json::Value;

use super::operation::{
    BeginRepairsOperation, FinishRepairsOperation, FixServerOrderOperation, MoveShardOperation,
    RepairOperation, ServerId, ShardWithProto,
};
use crate::error::RepairError;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BeginRepairsDocument<'a> {
    database: &'a str,
    collection: &'a str,
    distribute_shards_like: &'a str,
    rename_distribute_shards_like: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FixServerOrderDocument<'a> {
    database: &'a str,
    collection: &'a str,
    distribute_shards_like: &'a str,
    shard: &'a str,
    distribute_shards_like_shard: &'a str,
    leader: &'a str,
    followers: &'a [ServerId],
    distribute_shards_like_followers: &'a [ServerId],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MoveShardDocument<'a> {
    database: &'a str,
    collection: &'a str,
    shard: &'a str,
    from: &'a str,
    to: &'a str,
    is_leader: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ShardDocument<'a> {
    shard: &'a str,
    proto_shard: &'a str,
    db_servers: &'a [ServerId],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FinishRepairsDocument<'a> {
    database: &'a str,
    collection: &'a str,
    distribute_shards_like: &'a str,
    shards: Vec<ShardDocument<'a>>,
}

#[derive(Serialize)]
enum RepairOperationDocument<'a> {
    #[serde(rename = "BeginRepairsOperation")]
    BeginRepairs(BeginRepairsDocument<'a>),
    #[serde(rename = "FixServerOrderOperation")]
    FixServerOrder(FixServerOrderDocument<'a>),
    #[serde(rename = "MoveShardOperation")]
    MoveShard(MoveShardDocument<'a>),
    #[serde(rename = "FinishRepairsOperation")]
    FinishRepairs(FinishRepairsDocument<'a>),
}

impl<'a> From<&'a BeginRepairsOperation> for BeginRepairsDocument<'a> {
    fn from(op: &'a BeginRepairsOperation) -> Self {
        Self {
            database: &op.database,
            collection: &op.collection_name,
            distribute_shards_like: &op.proto_collection_name,
            rename_distribute_shards_like: op.rename_distribute_shards_like,
        }
    }
}

impl<'a> From<&'a FixServerOrderOperation> for FixServerOrderDocument<'a> {
    fn from(op: &'a FixServerOrderOperation) -> Self {
        Self {
            database: &op.database,
            collection: &op.collection_name,
            distribute_shards_like: &op.proto_collection_name,
            shard: &op.shard,
            distribute_shards_like_shard: &op.proto_shard,
            leader: &op.leader,
            followers: &op.followers,
            distribute_shards_like_followers: &op.proto_followers,
        }
    }
}

impl<'a> From<&'a MoveShardOperation> for MoveShardDocument<'a> {
    fn from(op: &'a MoveShardOperation) -> Self {
        Self {
            database: &op.database,
            collection: &op.collection_name,
            shard: &op.shard,
            from: &op.from,
            to: &op.to,
            is_leader: op.is_leader,
        }
    }
}

impl<'a> From<&'a ShardWithProto> for ShardDocument<'a> {
    fn from(s: &'a ShardWithProto) -> Self {
        Self {
            shard: &s.shard,
            proto_shard: &s.proto_shard,
            db_servers: &s.db_servers,
        }
    }
}

impl<'a> From<&'a FinishRepairsOperation> for FinishRepairsDocument<'a> {
    fn from(op: &'a FinishRepairsOperation) -> Self {
        Self {
            database: &op.database,
            collection: &op.collection_name,
            distribute_shards_like: &op.proto_collection_name,
            shards: op.shards.iter().map(ShardDocument::from).collect(),
        }
    }
}

impl<'a> From<&'a RepairOperation> for RepairOperationDocument<'a> {
    fn from(op: &'a RepairOperation) -> Self {
        match op {
            RepairOperation::BeginRepairs(op) => Self::BeginRepairs(op.into()),
            RepairOperation::FixServerOrder(op) => Self::FixServerOrder(op.into()),
            RepairOperation::MoveShard(op) => Self::MoveShard(op.into()),
            RepairOperation::FinishRepairs(op) => Self::FinishRepairs(op.into()),
        }
    }
}

/// Renders `op` as `{"<kind>Operation": {...}}`.
pub fn to_document(op: &RepairOperation) -> Result<Value, RepairError> {
    Ok(serde_json::to_value(RepairOperationDocument::from(op))?)
}
