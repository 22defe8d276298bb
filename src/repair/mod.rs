pub mod document;
pub mod executor;
pub mod job;
pub mod operation;
pub mod providers;
pub mod translator;

pub use document::to_document;
pub use executor::{AppliedOperation, ExecutorSettings, RepairExecutor, RepairReport};
pub use job::{build_move_job_document, extended_iso_string, MoveShardJob};
pub use operation::{
    BeginRepairsOperation, FinishRepairsOperation, FixServerOrderOperation, MoveShardOperation,
    RepairOperation, ShardWithProto,
};
pub use translator::{TransactionTranslator, Translation};
