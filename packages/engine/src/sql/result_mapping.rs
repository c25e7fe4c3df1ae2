/// What one command contributes to the batch's result sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultSetMapping {
    NoResults,
    /// A single-row, single-value result set holding the affected row count.
    RowsAffectedOnly,
    /// One result row for this command. `is_last` closes the result set;
    /// otherwise the next command's row follows in the same set.
    ResultRow { is_last: bool },
    /// Values come back through output parameters instead of a result set.
    OutputParameters {
        rows_affected_parameter: Option<String>,
    },
}

impl ResultSetMapping {
    pub fn has_result_row(&self) -> bool {
        matches!(self, Self::RowsAffectedOnly | Self::ResultRow { .. })
    }

    pub fn is_last_in_result_set(&self) -> bool {
        match self {
            Self::RowsAffectedOnly => true,
            Self::ResultRow { is_last } => *is_last,
            Self::NoResults | Self::OutputParameters { .. } => false,
        }
    }
}
