mod column;
mod row;

pub use column::{ColumnModification, TypeMapping, ValueGeneration};
pub(crate) use row::KeyConditionParameter;
pub use row::{MutationKind, RowMutationCommand, StoredProcedure, TableName};
