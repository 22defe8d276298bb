use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

pub type DatabaseId = String;
pub type CollectionId = String;
pub type CollectionName = String;
pub type ShardId = String;
pub type ServerId = String;
/// Leader first, followers after it, in plan order.
pub type DbServers = Vec<ServerId>;

/// Moves a collection's `distributeShardsLike` to `repairingDistributeShardsLike`
/// and aligns its replication factor with the proto collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeginRepairsOperation {
    pub database: DatabaseId,
    pub collection_id: CollectionId,
    pub collection_name: CollectionName,
    pub proto_collection_id: CollectionId,
    pub proto_collection_name: CollectionName,
    pub collection_replication_factor: u64,
    pub proto_replication_factor: u64,
    /// False when a previous attempt already renamed the attribute.
    pub rename_distribute_shards_like: bool,
}

/// Reorders one shard's followers to match its proto shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixServerOrderOperation {
    pub database: DatabaseId,
    pub collection_id: CollectionId,
    pub collection_name: CollectionName,
    pub proto_collection_id: CollectionId,
    pub proto_collection_name: CollectionName,
    pub shard: ShardId,
    pub proto_shard: ShardId,
    pub leader: ServerId,
    pub followers: Vec<ServerId>,
    pub proto_followers: Vec<ServerId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveShardOperation {
    pub database: DatabaseId,
    pub collection_id: CollectionId,
    pub collection_name: CollectionName,
    pub shard: ShardId,
    pub from: ServerId,
    pub to: ServerId,
    pub is_leader: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShardWithProto {
    pub shard: ShardId,
    pub proto_shard: ShardId,
    pub db_servers: DbServers,
}

impl ShardWithProto {
    pub fn new(
        shard: impl Into<ShardId>,
        proto_shard: impl Into<ShardId>,
        db_servers: DbServers,
    ) -> Self {
        Self {
            shard: shard.into(),
            proto_shard: proto_shard.into(),
            db_servers,
        }
    }
}

/// Restores `distributeShardsLike` once every shard matches its proto shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishRepairsOperation {
    pub database: DatabaseId,
    pub collection_id: CollectionId,
    pub collection_name: CollectionName,
    pub proto_collection_id: CollectionId,
    pub proto_collection_name: CollectionName,
    pub shards: Vec<ShardWithProto>,
    pub replication_factor: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RepairOperation {
    BeginRepairs(BeginRepairsOperation),
    FixServerOrder(FixServerOrderOperation),
    MoveShard(MoveShardOperation),
    FinishRepairs(FinishRepairsOperation),
}

impl RepairOperation {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::BeginRepairs(_) => "BeginRepairsOperation",
            Self::FixServerOrder(_) => "FixServerOrderOperation",
            Self::MoveShard(_) => "MoveShardOperation",
            Self::FinishRepairs(_) => "FinishRepairsOperation",
        }
    }

    pub fn database(&self) -> &str {
        match self {
            Self::BeginRepairs(op) => &op.database,
            Self::FixServerOrder(op) => &op.database,
            Self::MoveShard(op) => &op.database,
            Self::FinishRepairs(op) => &op.database,
        }
    }

    pub fn collection_name(&self) -> &str {
        match self {
            Self::BeginRepairs(op) => &op.collection_name,
            Self::FixServerOrder(op) => &op.collection_name,
            Self::MoveShard(op) => &op.collection_name,
            Self::FinishRepairs(op) => &op.collection_name,
        }
    }
}

impl From<BeginRepairsOperation> for RepairOperation {
    fn from(op: BeginRepairsOperation) -> Self {
        Self::BeginRepairs(op)
    }
}

impl From<FixServerOrderOperation> for RepairOperation {
    fn from(op: FixServerOrderOperation) -> Self {
        Self::FixServerOrder(op)
    }
}

impl From<MoveShardOperation> for RepairOperation {
    fn from(op: MoveShardOperation) -> Self {
        Self::MoveShard(op)
    }
}

impl From<FinishRepairsOperation> for RepairOperation {
    fn from(op: FinishRepairsOperation) -> Self {
        Self::FinishRepairs(op)
    }
}

fn server_list(servers: &[ServerId]) -> String {
    format!("[{}]", servers.iter().join(", "))
}

impl fmt::Display for BeginRepairsOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BeginRepairsOperation")?;
        writeln!(f, "{{ database: {}", self.database)?;
        writeln!(f, ", collection: {} ({})", self.collection_name, self.collection_id)?;
        writeln!(
            f,
            ", protoCollection: {} ({})",
            self.proto_collection_name, self.proto_collection_id
        )?;
        writeln!(f, ", collectionReplicationFactor: {}", self.collection_replication_factor)?;
        writeln!(f, ", protoReplicationFactor: {}", self.proto_replication_factor)?;
        writeln!(f, ", renameDistributeShardsLike: {}", self.rename_distribute_shards_like)?;
        write!(f, "}}")
    }
}

impl fmt::Display for FixServerOrderOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "FixServerOrderOperation")?;
        writeln!(f, "{{ database: {}", self.database)?;
        writeln!(f, ", collection: {} ({})", self.collection_name, self.collection_id)?;
        writeln!(
            f,
            ", protoCollection: {} ({})",
            self.proto_collection_name, self.proto_collection_id
        )?;
        writeln!(f, ", shard: {}", self.shard)?;
        writeln!(f, ", protoShard: {}", self.proto_shard)?;
        writeln!(f, ", leader: {}", self.leader)?;
        writeln!(f, ", followers: {}", server_list(&self.followers))?;
        writeln!(f, ", protoFollowers: {}", server_list(&self.proto_followers))?;
        write!(f, "}}")
    }
}

impl fmt::Display for MoveShardOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "MoveShardOperation")?;
        writeln!(f, "{{ database: {}", self.database)?;
        writeln!(f, ", collection: {} ({})", self.collection_name, self.collection_id)?;
        writeln!(f, ", shard: {}", self.shard)?;
        writeln!(f, ", from: {}", self.from)?;
        writeln!(f, ", to: {}", self.to)?;
        writeln!(f, ", isLeader: {}", self.is_leader)?;
        write!(f, "}}")
    }
}

impl fmt::Display for ShardWithProto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ shard: {}, protoShard: {}, dbServers: {} }}",
            self.shard,
            self.proto_shard,
            server_list(&self.db_servers)
        )
    }
}

impl fmt::Display for FinishRepairsOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "FinishRepairsOperation")?;
        writeln!(f, "{{ database: {}", self.database)?;
        writeln!(f, ", collection: {} ({})", self.collection_name, self.collection_id)?;
        writeln!(
            f,
            ", protoCollection: {} ({})",
            self.proto_collection_name, self.proto_collection_id
        )?;
        writeln!(f, ", shards:")?;
        if self.shards.is_empty() {
            writeln!(f, "  []")?;
        } else {
            for (i, shard) in self.shards.iter().enumerate() {
                let lead = if i == 0 { "[" } else { "," };
                writeln!(f, "  {lead} {shard}")?;
            }
            writeln!(f, "  ]")?;
        }
        writeln!(f, ", replicationFactor: {}", self.replication_factor)?;
        write!(f, "}}")
    }
}

impl fmt::Display for RepairOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BeginRepairs(op) => fmt::Display::fmt(op, f),
            Self::FixServerOrder(op) => fmt::Display::fmt(op, f),
            Self::MoveShard(op) => fmt::Display::fmt(op, f),
            Self::FinishRepairs(op) => fmt::Display::fmt(op, f),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn servers(list: &[&str]) -> Vec<ServerId> {
        list.iter().map(|s| s.to_string()).collect()
    }

    pub(crate) fn begin_op(rename: bool, rf: u64, proto_rf: u64) -> BeginRepairsOperation {
        BeginRepairsOperation {
            database: "db".to_string(),
            collection_id: "100".to_string(),
            collection_name: "orders".to_string(),
            proto_collection_id: "99".to_string(),
            proto_collection_name: "customers".to_string(),
            collection_replication_factor: rf,
            proto_replication_factor: proto_rf,
            rename_distribute_shards_like: rename,
        }
    }

    pub(crate) fn fix_op(followers: &[&str], proto_followers: &[&str]) -> FixServerOrderOperation {
        FixServerOrderOperation {
            database: "db".to_string(),
            collection_id: "100".to_string(),
            collection_name: "orders".to_string(),
            proto_collection_id: "99".to_string(),
            proto_collection_name: "customers".to_string(),
            shard: "s1".to_string(),
            proto_shard: "ps1".to_string(),
            leader: "S1".to_string(),
            followers: servers(followers),
            proto_followers: servers(proto_followers),
        }
    }

    pub(crate) fn move_op() -> MoveShardOperation {
        MoveShardOperation {
            database: "db".to_string(),
            collection_id: "100".to_string(),
            collection_name: "orders".to_string(),
            shard: "s1".to_string(),
            from: "S2".to_string(),
            to: "S4".to_string(),
            is_leader: false,
        }
    }

    pub(crate) fn finish_op(shards: Vec<ShardWithProto>) -> FinishRepairsOperation {
        FinishRepairsOperation {
            database: "db".to_string(),
            collection_id: "100".to_string(),
            collection_name: "orders".to_string(),
            proto_collection_id: "99".to_string(),
            proto_collection_name: "customers".to_string(),
            shards,
            replication_factor: 2,
        }
    }

    #[test]
    fn test_follower_order_matters_for_equality() {
        let a = fix_op(&["S2", "S3"], &["S3", "S2"]);
        let b = fix_op(&["S3", "S2"], &["S3", "S2"]);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());

        let mut c = a.clone();
        c.proto_followers.reverse();
        assert_ne!(a, c);
    }

    #[test]
    fn test_equality_is_field_wise() {
        assert_eq!(begin_op(true, 2, 3), begin_op(true, 2, 3));
        assert_ne!(begin_op(true, 2, 3), begin_op(false, 2, 3));
        assert_ne!(begin_op(true, 2, 3), begin_op(true, 2, 2));

        let mut m = move_op();
        assert_eq!(m, move_op());
        m.is_leader = true;
        assert_ne!(m, move_op());

        let f1 = finish_op(vec![ShardWithProto::new("s1", "ps1", servers(&["A", "B"]))]);
        let f2 = finish_op(vec![ShardWithProto::new("s1", "ps1", servers(&["B", "A"]))]);
        assert_ne!(f1, f2);
        assert_ne!(
            RepairOperation::from(f1.clone()),
            RepairOperation::from(begin_op(true, 2, 2))
        );
        assert_eq!(RepairOperation::from(f1.clone()), RepairOperation::FinishRepairs(f1));
    }

    #[test]
    fn test_kind_name() {
        assert_eq!(
            RepairOperation::from(begin_op(true, 2, 2)).kind_name(),
            "BeginRepairsOperation"
        );
        assert_eq!(
            RepairOperation::from(fix_op(&[], &[])).kind_name(),
            "FixServerOrderOperation"
        );
        assert_eq!(RepairOperation::from(move_op()).kind_name(), "MoveShardOperation");
        assert_eq!(
            RepairOperation::from(finish_op(vec![])).kind_name(),
            "FinishRepairsOperation"
        );
    }

    #[test]
    fn test_display_begin() {
        let expected = "BeginRepairsOperation\n\
                        { database: db\n\
                        , collection: orders (100)\n\
                        , protoCollection: customers (99)\n\
                        , collectionReplicationFactor: 2\n\
                        , protoReplicationFactor: 3\n\
                        , renameDistributeShardsLike: true\n\
                        }";
        assert_eq!(begin_op(true, 2, 3).to_string(), expected);
        assert_eq!(RepairOperation::from(begin_op(true, 2, 3)).to_string(), expected);
    }

    #[test]
    fn test_display_fix_server_order_keeps_order() {
        let rendered = fix_op(&["S2", "S3"], &["S3", "S2"]).to_string();
        assert!(rendered.starts_with("FixServerOrderOperation\n"));
        assert!(rendered.contains(", leader: S1\n"));
        assert!(rendered.contains(", followers: [S2, S3]\n"));
        assert!(rendered.contains(", protoFollowers: [S3, S2]\n"));
        assert!(rendered.ends_with('}'));
    }

    #[test]
    fn test_display_move_shard() {
        let expected = "MoveShardOperation\n\
                        { database: db\n\
                        , collection: orders (100)\n\
                        , shard: s1\n\
                        , from: S2\n\
                        , to: S4\n\
                        , isLeader: false\n\
                        }";
        assert_eq!(move_op().to_string(), expected);
    }

    #[test]
    fn test_display_finish_repairs() {
        let op = finish_op(vec![
            ShardWithProto::new("s1", "ps1", servers(&["A", "B"])),
            ShardWithProto::new("s2", "ps2", servers(&["B", "A"])),
        ]);
        let expected = "FinishRepairsOperation\n\
                        { database: db\n\
                        , collection: orders (100)\n\
                        , protoCollection: customers (99)\n\
                        , shards:\n  \
                        [ { shard: s1, protoShard: ps1, dbServers: [A, B] }\n  \
                        , { shard: s2, protoShard: ps2, dbServers: [B, A] }\n  \
                        ]\n\
                        , replicationFactor: 2\n\
                        }";
        assert_eq!(op.to_string(), expected);

        let empty = finish_op(vec![]).to_string();
        assert!(empty.contains(", shards:\n  []\n"));
    }

    #[test]
    fn test_plan_file_format() {
        let json = r#"{"moveShard": {
            "database": "db", "collectionId": "100", "collectionName": "orders",
            "shard": "s1", "from": "S2", "to": "S4", "isLeader": false
        }}"#;
        let op: RepairOperation = serde_json::from_str(json).unwrap();
        assert_eq!(op, RepairOperation::MoveShard(move_op()));
    }
}
