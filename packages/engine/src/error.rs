use thiserror::Error;

/// Error reported by a connection or reader while a batch round trip is in
/// flight.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutionError {
    #[error("{message}")]
    Store { message: String },
    #[error("execution was cancelled")]
    Cancelled,
}

impl ExecutionError {
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }
}

/// An affected-row check produced a count other than the expected one.
#[derive(Debug, Clone, PartialEq, Error)]
#[error(
    "command {position} against `{table}` expected to affect {expected_rows} row(s) but affected {actual_rows}; the row may have been modified or deleted since it was loaded"
)]
pub struct ConcurrencyConflict {
    pub position: usize,
    pub table: String,
    pub expected_rows: u64,
    pub actual_rows: u64,
    pub entries: Vec<String>,
}

/// Any other failure while executing a batch or consuming its results,
/// decorated with the commands it affected.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("an error occurred while saving {}: {source}", describe_target(.position, .table))]
pub struct UpdateFailure {
    pub position: Option<usize>,
    pub table: Option<String>,
    pub entries: Vec<String>,
    #[source]
    pub source: ExecutionError,
}

fn describe_target(position: &Option<usize>, table: &Option<String>) -> String {
    match (position, table) {
        (Some(position), Some(table)) => format!("command {position} against `{table}`"),
        _ => "the batch".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BatchError {
    #[error("the batch has already been finalized")]
    AlreadyFinalized,
    #[error("the batch must be finalized before it is executed")]
    NotFinalized,
    #[error(
        "command {position} against `{table}` expected a result set but the reader reported none"
    )]
    MissingResultSet { position: usize, table: String },
    #[error("command against `{table}` cannot be rendered: {reason}")]
    InvalidCommand { table: String, reason: String },
    #[error(transparent)]
    Concurrency(ConcurrencyConflict),
    #[error(transparent)]
    Update(UpdateFailure),
    #[error("the operation was cancelled")]
    Cancelled,
}

impl From<ConcurrencyConflict> for BatchError {
    fn from(value: ConcurrencyConflict) -> Self {
        Self::Concurrency(value)
    }
}

impl From<UpdateFailure> for BatchError {
    fn from(value: UpdateFailure) -> Self {
        Self::Update(value)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid batch configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid batch configuration: {0}")]
    Invalid(String),
}
