mod dialect;
mod generator;
mod result_mapping;

pub use generator::{GeneratedStatements, OutputClauseSqlGenerator, StatementGenerator};
pub use result_mapping::ResultSetMapping;

pub(crate) use dialect::STATEMENT_COUNT_PARAMETER;
pub(crate) use dialect::PARAMETER_PREFIX;
pub(crate) use dialect::is_representable;
