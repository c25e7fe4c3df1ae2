use std::fmt;

use crate::error::ExecutionError;
use crate::sql::is_representable;
use crate::Value;

use super::column::ColumnModification;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName {
    pub name: String,
    pub schema: Option<String>,
}

impl TableName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
        }
    }

    pub fn with_schema(name: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: Some(schema.into()),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{schema}.{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Insert,
    Update,
    Delete,
}

/// A stored procedure that executes the command instead of generated DML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredProcedure {
    pub name: String,
    pub schema: Option<String>,
}

impl StoredProcedure {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
        }
    }
}

/// One row's complete write intent.
///
/// The column list is fixed at construction; only read-column values change
/// afterwards, when results are propagated back.
#[derive(Debug, Clone, PartialEq)]
pub struct RowMutationCommand {
    table: TableName,
    kind: MutationKind,
    columns: Vec<ColumnModification>,
    rows_affected_column: Option<String>,
    entries: Vec<String>,
    procedure: Option<StoredProcedure>,
    output_clause_supported: bool,
    pub(crate) rows_affected_parameter_name: Option<String>,
    pub(crate) key_condition_parameters: Vec<KeyConditionParameter>,
}

/// A parameter that exists only for the predicate of a read-back selection.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct KeyConditionParameter {
    pub(crate) column_index: usize,
    pub(crate) name: String,
}

impl RowMutationCommand {
    pub fn new(table: TableName, kind: MutationKind, columns: Vec<ColumnModification>) -> Self {
        Self {
            table,
            kind,
            columns,
            rows_affected_column: None,
            entries: Vec::new(),
            procedure: None,
            output_clause_supported: true,
            rows_affected_parameter_name: None,
            key_condition_parameters: Vec::new(),
        }
    }

    pub fn insert(table: TableName, columns: Vec<ColumnModification>) -> Self {
        Self::new(table, MutationKind::Insert, columns)
    }

    pub fn update(table: TableName, columns: Vec<ColumnModification>) -> Self {
        Self::new(table, MutationKind::Update, columns)
    }

    pub fn delete(table: TableName, columns: Vec<ColumnModification>) -> Self {
        Self::new(table, MutationKind::Delete, columns)
    }

    /// Descriptions of the entities behind this row, used in error reports.
    pub fn with_entries(mut self, entries: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.entries = entries.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_stored_procedure(mut self, procedure: StoredProcedure) -> Self {
        self.procedure = Some(procedure);
        self
    }

    /// Names the procedure output that reports how many rows were affected.
    pub fn with_rows_affected_column(mut self, column: impl Into<String>) -> Self {
        self.rows_affected_column = Some(column.into());
        self
    }

    /// Marks the target table as unable to use a value-returning clause,
    /// e.g. because it carries triggers.
    pub fn without_output_clause(mut self) -> Self {
        self.output_clause_supported = false;
        self
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    pub fn kind(&self) -> MutationKind {
        self.kind
    }

    pub fn columns(&self) -> &[ColumnModification] {
        &self.columns
    }

    pub(crate) fn columns_mut(&mut self) -> &mut [ColumnModification] {
        &mut self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnModification> {
        self.columns
            .iter()
            .find(|column| column.column_name == name)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn procedure(&self) -> Option<&StoredProcedure> {
        self.procedure.as_ref()
    }

    pub fn rows_affected_column(&self) -> Option<&str> {
        self.rows_affected_column.as_deref()
    }

    pub fn output_clause_supported(&self) -> bool {
        self.output_clause_supported
    }

    pub fn write_columns(&self) -> impl Iterator<Item = &ColumnModification> {
        self.columns.iter().filter(|column| column.is_write)
    }

    pub fn read_columns(&self) -> impl Iterator<Item = &ColumnModification> {
        self.columns.iter().filter(|column| column.is_read)
    }

    pub fn condition_columns(&self) -> impl Iterator<Item = &ColumnModification> {
        self.columns.iter().filter(|column| column.is_condition)
    }

    pub fn has_read_columns(&self) -> bool {
        self.columns.iter().any(|column| column.is_read)
    }

    /// Whether the same multi-row `INSERT` can carry both commands.
    pub fn has_same_insert_shape(&self, other: &Self) -> bool {
        self.kind == MutationKind::Insert
            && other.kind == MutationKind::Insert
            && self.table == other.table
            && self
                .write_columns()
                .map(|column| column.column_name.as_str())
                .eq(other.write_columns().map(|column| column.column_name.as_str()))
            && self
                .read_columns()
                .map(|column| column.column_name.as_str())
                .eq(other.read_columns().map(|column| column.column_name.as_str()))
    }

    /// Why the store could not execute this command as written, if so.
    ///
    /// Updates and deletes without a predicate would touch the whole table.
    pub(crate) fn rendering_defect(&self) -> Option<String> {
        if self.kind != MutationKind::Insert
            && self.procedure.is_none()
            && self.condition_columns().next().is_none()
        {
            return Some(format!("{:?} has no condition columns", self.kind));
        }
        self.columns
            .iter()
            .find(|column| {
                !is_representable(&column.value) || !is_representable(&column.original_value)
            })
            .map(|column| format!("column `{}` holds a non-finite real", column.column_name))
    }

    /// Copies one returned row into the read columns, in column order.
    pub(crate) fn propagate_results(&mut self, values: Vec<Value>) -> Result<(), ExecutionError> {
        let read_count = self.read_columns().count();
        if read_count == 0 {
            return Ok(());
        }
        if values.len() != read_count {
            return Err(ExecutionError::store(format!(
                "result row for `{}` has {} value(s) but {read_count} read column(s) were expected",
                self.table,
                values.len()
            )));
        }
        for (column, value) in self
            .columns
            .iter_mut()
            .filter(|column| column.is_read)
            .zip(values)
        {
            column.value = value;
        }
        Ok(())
    }
}
