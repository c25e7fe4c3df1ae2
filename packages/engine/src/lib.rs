mod backend;
mod batch;
mod command;
mod config;
mod error;
mod reconcile;
mod sql;
mod types;

pub use backend::{AsyncBatchConnection, AsyncBatchReader, BatchConnection, BatchReader};
pub use batch::{
    BatchAssembler, BatchPreparer, BoundParameter, ExecutableBatch, ModificationBatch,
    ParameterDirection, TryAdd,
};
pub use command::{
    ColumnModification, MutationKind, RowMutationCommand, StoredProcedure, TableName, TypeMapping,
    ValueGeneration,
};
pub use config::{BatchConfig, ScriptLengthEstimate};
pub use error::{BatchError, ConcurrencyConflict, ConfigError, ExecutionError, UpdateFailure};
pub use reconcile::{consume, consume_async};
pub use sql::{GeneratedStatements, OutputClauseSqlGenerator, ResultSetMapping, StatementGenerator};
pub use types::Value;
