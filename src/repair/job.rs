use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::operation::MoveShardOperation;
use crate::error::RepairError;

const ISO_FORMAT: &str = "%FT%TZ";
const MOVE_SHARD_JOB_TYPE: &str = "moveShard";

/// Formats `ts` as extended ISO-8601 UTC with second precision.
pub fn extended_iso_string(ts: DateTime<Utc>) -> Result<String, RepairError> {
    let s = ts.format(ISO_FORMAT).to_string();
    if s.is_empty() {
        return Err(RepairError::Timestamp);
    }

    Ok(s)
}

/// The document queued under `Target/ToDo/<jobId>` for the job runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveShardJob {
    pub r#type: &'static str,
    pub database: String,
    pub collection: String,
    pub shard: String,
    pub from_server: String,
    pub to_server: String,
    pub job_id: String,
    pub time_created: String,
    pub creator: String,
    pub is_leader: bool,
}

impl MoveShardJob {
    pub fn new(
        job_id: u64,
        created: DateTime<Utc>,
        creator: impl Into<String>,
        op: &MoveShardOperation,
    ) -> Result<Self, RepairError> {
        Ok(Self {
            r#type: MOVE_SHARD_JOB_TYPE,
            database: op.database.clone(),
            collection: op.collection_id.clone(),
            shard: op.shard.clone(),
            from_server: op.from.clone(),
            to_server: op.to.clone(),
            job_id: job_id.to_string(),
            time_created: extended_iso_string(created)?,
            creator: creator.into(),
            is_leader: op.is_leader,
        })
    }

    pub fn to_document(&self) -> Result<Value, RepairError> {
        Ok(serde_json::to_value(self)?)
    }
}

pub fn build_move_job_document(
    job_id: u64,
    created: DateTime<Utc>,
    creator: &str,
    op: &MoveShardOperation,
) -> Result<Value, RepairError> {
    MoveShardJob::new(job_id, created, creator, op)?.to_document()
}
