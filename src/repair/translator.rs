use derivative::Derivative;
use serde_json::Value;
use tracing::debug;
use typed_builder::TypedBuilder;

use super::job::MoveShardJob;
use super::operation::{
    BeginRepairsOperation, FinishRepairsOperation, FixServerOrderOperation, MoveShardOperation,
    RepairOperation, ServerId,
};
use super::providers::{self, JobIdProvider, ServerIdProvider, TimestampProvider};
use crate::error::RepairError;
use crate::registry::{
    collection_attr_path, shard_path, todo_job_path, Precondition, RegistryOperation,
    WriteTransaction,
};

const DISTRIBUTE_SHARDS_LIKE: &str = "distributeShardsLike";
const REPAIRING_DISTRIBUTE_SHARDS_LIKE: &str = "repairingDistributeShardsLike";
const REPLICATION_FACTOR: &str = "replicationFactor";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub transaction: WriteTransaction,
    /// Set only for operations that queue a job.
    pub job_id: Option<u64>,
}

impl Translation {
    fn without_job(transaction: WriteTransaction) -> Self {
        Self {
            transaction,
            job_id: None,
        }
    }
}

fn server_array(leader: &ServerId, followers: &[ServerId]) -> Value {
    std::iter::once(leader)
        .chain(followers.iter())
        .map(|s| Value::String(s.clone()))
        .collect()
}

/// Turns repair operations into registry write transactions.
///
/// Translation does not touch the registry. Job ids, job timestamps and the
/// creator name come from the providers so tests can pin them.
#[derive(Derivative, TypedBuilder)]
#[derivative(Debug)]
pub struct TransactionTranslator {
    #[derivative(Debug = "ignore")]
    #[builder(default_code = r#"Box::new(providers::next_job_id) as JobIdProvider"#)]
    job_id: JobIdProvider,
    #[derivative(Debug = "ignore")]
    #[builder(default_code = r#"Box::new(providers::now) as TimestampProvider"#)]
    job_timestamp: TimestampProvider,
    #[derivative(Debug = "ignore")]
    #[builder(default_code = r#"Box::new(providers::self_name) as ServerIdProvider"#)]
    server_id: ServerIdProvider,
}

impl Default for TransactionTranslator {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl TransactionTranslator {
    pub fn translate(&self, op: &RepairOperation) -> Result<Translation, RepairError> {
        let ret = match op {
            RepairOperation::BeginRepairs(op) => Translation::without_job(self.begin_repairs(op)),
            RepairOperation::FixServerOrder(op) => {
                Translation::without_job(self.fix_server_order(op))
            }
            RepairOperation::MoveShard(op) => self.move_shard(op)?,
            RepairOperation::FinishRepairs(op) => Translation::without_job(self.finish_repairs(op)),
        };

        debug!(
            "translated {} into {} operations, {} preconditions",
            op.kind_name(),
            ret.transaction.operations.len(),
            ret.transaction.preconditions.len()
        );
        Ok(ret)
    }

    fn begin_repairs(&self, op: &BeginRepairsOperation) -> WriteTransaction {
        let attr = |name: &str| collection_attr_path(&op.database, &op.collection_id, name);
        let distribute_shards_like = attr(DISTRIBUTE_SHARDS_LIKE);
        let repairing_distribute_shards_like = attr(REPAIRING_DISTRIBUTE_SHARDS_LIKE);
        let replication_factor = attr(REPLICATION_FACTOR);
        let proto_replication_factor =
            collection_attr_path(&op.database, &op.proto_collection_id, REPLICATION_FACTOR);

        let proto_id = Value::from(op.proto_collection_id.as_str());
        let collection_rf = Value::from(op.collection_replication_factor);
        let proto_rf = Value::from(op.proto_replication_factor);

        let mut preconditions = if op.rename_distribute_shards_like {
            vec![
                Precondition::value(&distribute_shards_like, proto_id.clone()),
                Precondition::empty(&repairing_distribute_shards_like),
            ]
        } else {
            // an earlier attempt already renamed the attribute
            vec![
                Precondition::value(&repairing_distribute_shards_like, proto_id.clone()),
                Precondition::empty(&distribute_shards_like),
            ]
        };

        preconditions.push(Precondition::value(&replication_factor, collection_rf));
        preconditions.push(Precondition::value(&proto_replication_factor, proto_rf.clone()));

        let mut operations = vec![];
        if op.rename_distribute_shards_like {
            operations.push(RegistryOperation::set(
                &repairing_distribute_shards_like,
                proto_id,
            ));
            operations.push(RegistryOperation::delete(&distribute_shards_like));

            // While distributeShardsLike is set the proto's replication factor is
            // the effective one, so the local value may only change together with
            // the rename.
            if op.collection_replication_factor != op.proto_replication_factor {
                operations.push(RegistryOperation::set(&replication_factor, proto_rf));
            } else {
                // TODO: review whether this is the minimal precondition when the
                // proto's factor can change between planning and commit.
                preconditions.push(Precondition::value(&replication_factor, proto_rf));
            }
        }

        WriteTransaction::new(operations, preconditions)
    }

    fn fix_server_order(&self, op: &FixServerOrderOperation) -> WriteTransaction {
        let shard = shard_path(&op.database, &op.collection_id, &op.shard);
        let proto_shard = shard_path(&op.database, &op.proto_collection_id, &op.proto_shard);

        let current = server_array(&op.leader, &op.followers);
        let wanted = server_array(&op.leader, &op.proto_followers);

        WriteTransaction::new(
            vec![RegistryOperation::set(&shard, wanted.clone())],
            vec![
                Precondition::value(&shard, current),
                Precondition::value(proto_shard, wanted),
            ],
        )
    }

    fn move_shard(&self, op: &MoveShardOperation) -> Result<Translation, RepairError> {
        let job_id = (self.job_id)();
        let created = (self.job_timestamp)();
        let doc = MoveShardJob::new(job_id, created, (self.server_id)(), op)?.to_document()?;

        let key = todo_job_path(job_id);
        Ok(Translation {
            transaction: WriteTransaction::new(
                vec![RegistryOperation::set(&key, doc)],
                vec![Precondition::empty(key)],
            ),
            job_id: Some(job_id),
        })
    }

    fn finish_repairs(&self, op: &FinishRepairsOperation) -> WriteTransaction {
        let attr = |name: &str| collection_attr_path(&op.database, &op.collection_id, name);
        let distribute_shards_like = attr(DISTRIBUTE_SHARDS_LIKE);
        let repairing_distribute_shards_like = attr(REPAIRING_DISTRIBUTE_SHARDS_LIKE);

        let proto_id = Value::from(op.proto_collection_id.as_str());
        let rf = Value::from(op.replication_factor);

        let mut preconditions = vec![
            Precondition::value(&repairing_distribute_shards_like, proto_id.clone()),
            Precondition::empty(&distribute_shards_like),
            Precondition::value(attr(REPLICATION_FACTOR), rf.clone()),
            Precondition::value(
                collection_attr_path(&op.database, &op.proto_collection_id, REPLICATION_FACTOR),
                rf,
            ),
        ];

        for s in op.shards.iter() {
            let servers: Value = s.db_servers.iter().map(|x| Value::from(x.as_str())).collect();

            preconditions.push(Precondition::value(
                shard_path(&op.database, &op.collection_id, &s.shard),
                servers.clone(),
            ));
            preconditions.push(Precondition::value(
                shard_path(&op.database, &op.proto_collection_id, &s.proto_shard),
                servers,
            ));
        }

        WriteTransaction::new(
            vec![
                RegistryOperation::set(&distribute_shards_like, proto_id),
                RegistryOperation::delete(&repairing_distribute_shards_like),
            ],
            preconditions,
        )
    }
}
