use crate::sql::ResultSetMapping;

use super::params::BoundParameter;

/// A finalized batch: one round trip worth of SQL and parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutableBatch {
    pub command_text: String,
    /// Column parameters in command order, then key-condition parameters,
    /// then the statement-count trailer.
    pub parameters: Vec<BoundParameter>,
    pub result_set_mappings: Vec<ResultSetMapping>,
    pub statement_count: usize,
    pub requires_transaction: bool,
    pub more_batches_expected: bool,
}

impl ExecutableBatch {
    /// Whether the executor must wrap this batch in a transaction.
    pub fn needs_transaction(&self) -> bool {
        self.requires_transaction || self.more_batches_expected
    }

    pub fn parameter(&self, name: &str) -> Option<&BoundParameter> {
        self.parameters
            .iter()
            .find(|parameter| parameter.name == name)
    }
}
