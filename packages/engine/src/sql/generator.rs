use crate::command::{ColumnModification, MutationKind, RowMutationCommand, ValueGeneration};
use crate::Value;

use super::dialect::{
    append_ident, append_literal, append_schema_qualified, append_table_name, escape_sql_string,
    AUTOCOMMIT_PREFACE, INSERTED_ALIAS, JSON_FRAGMENT_FUNCTION, JSON_MERGE_FUNCTION,
    OUTPUT_PARAMETER_SUFFIX, ROWS_AFFECTED_EXPR, STATEMENT_TERMINATOR,
};
use super::result_mapping::ResultSetMapping;

/// SQL appended for one or more commands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GeneratedStatements {
    /// One entry per command, in command order.
    pub result_set_mappings: Vec<ResultSetMapping>,
    pub statement_count: usize,
}

impl GeneratedStatements {
    fn single(mapping: ResultSetMapping, statement_count: usize) -> Self {
        Self {
            result_set_mappings: vec![mapping],
            statement_count,
        }
    }

    fn extend(&mut self, other: Self) {
        self.result_set_mappings.extend(other.result_set_mappings);
        self.statement_count += other.statement_count;
    }
}

/// Renders row mutation commands into store SQL.
///
/// Placeholders are taken from the parameter names already assigned to each
/// column; a column without a name is inlined as a literal.
pub trait StatementGenerator {
    fn append_insert_operation(
        &self,
        sql: &mut String,
        command: &RowMutationCommand,
    ) -> GeneratedStatements;

    fn append_update_operation(
        &self,
        sql: &mut String,
        command: &RowMutationCommand,
    ) -> GeneratedStatements;

    fn append_delete_operation(
        &self,
        sql: &mut String,
        command: &RowMutationCommand,
    ) -> GeneratedStatements;

    /// Renders inserts that share table and column shape.
    fn append_bulk_insert_operation(
        &self,
        sql: &mut String,
        commands: &[&RowMutationCommand],
    ) -> GeneratedStatements;

    fn append_stored_procedure_call(
        &self,
        sql: &mut String,
        command: &RowMutationCommand,
    ) -> GeneratedStatements;

    fn append_next_sequence_value_operation(
        &self,
        sql: &mut String,
        name: &str,
        schema: Option<&str>,
    );

    fn append_obtain_next_sequence_value_operation(
        &self,
        sql: &mut String,
        name: &str,
        schema: Option<&str>,
    );

    /// Final command text for a batch body.
    fn render_command_text(&self, body: &str, requires_transaction: bool) -> String;

    /// Indices of key columns that need a parameter of their own to locate
    /// the row again after it was written.
    fn key_condition_columns(&self, command: &RowMutationCommand) -> Vec<usize>;

    fn append_command(&self, sql: &mut String, command: &RowMutationCommand) -> GeneratedStatements {
        if command.procedure().is_some() {
            return self.append_stored_procedure_call(sql, command);
        }
        match command.kind() {
            MutationKind::Insert => self.append_insert_operation(sql, command),
            MutationKind::Update => self.append_update_operation(sql, command),
            MutationKind::Delete => self.append_delete_operation(sql, command),
        }
    }
}

/// Generator for a store that returns values through an `OUTPUT` clause
/// placed ahead of `VALUES` and `WHERE`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputClauseSqlGenerator;

impl OutputClauseSqlGenerator {
    pub fn new() -> Self {
        Self
    }

    fn append_insert_header(&self, sql: &mut String, command: &RowMutationCommand) {
        sql.push_str("INSERT INTO ");
        append_table_name(sql, command.table());
        let mut write_columns = command.write_columns().peekable();
        if write_columns.peek().is_some() {
            sql.push_str(" (");
            for (index, column) in write_columns.enumerate() {
                if index > 0 {
                    sql.push_str(", ");
                }
                append_ident(sql, &column.column_name);
            }
            sql.push(')');
        }
    }

    fn append_values_row(&self, sql: &mut String, command: &RowMutationCommand) {
        sql.push('(');
        for (index, column) in command.write_columns().enumerate() {
            if index > 0 {
                sql.push_str(", ");
            }
            self.append_current_value(sql, column);
        }
        sql.push(')');
    }

    fn append_values_clause(&self, sql: &mut String, command: &RowMutationCommand) {
        if command.write_columns().next().is_none() {
            sql.push_str(" DEFAULT VALUES");
        } else {
            sql.push_str(" VALUES ");
            self.append_values_row(sql, command);
        }
    }

    fn append_current_value(&self, sql: &mut String, column: &ColumnModification) {
        if let ValueGeneration::Sequence { name, schema } = &column.generation {
            self.append_next_sequence_value_operation(sql, name, schema.as_deref());
            return;
        }
        debug_assert!(
            !(column.type_mapping.requires_literal && column.parameter_name.is_some()),
            "literal-only column `{}` was given a parameter",
            column.column_name
        );
        match column.parameter_name() {
            Some(name) => sql.push_str(name),
            None => append_literal(sql, &column.value, &column.type_mapping),
        }
    }

    fn append_original_value(&self, sql: &mut String, column: &ColumnModification) {
        match column.original_parameter_name() {
            Some(name) => sql.push_str(name),
            None => append_literal(sql, &column.original_value, &column.type_mapping),
        }
    }

    /// `OUTPUT INSERTED."a", INSERTED."b"`, or `OUTPUT 1` when the row only
    /// has to be observed.
    fn append_output_clause(&self, sql: &mut String, command: &RowMutationCommand) {
        sql.push_str(" OUTPUT ");
        let mut read_columns = command.read_columns().peekable();
        if read_columns.peek().is_none() {
            sql.push('1');
            return;
        }
        for (index, column) in read_columns.enumerate() {
            if index > 0 {
                sql.push_str(", ");
            }
            sql.push_str(INSERTED_ALIAS);
            sql.push('.');
            append_ident(sql, &column.column_name);
        }
    }

    fn append_set_clause(&self, sql: &mut String, command: &RowMutationCommand) {
        debug_assert!(
            command.write_columns().next().is_some(),
            "update against `{}` has no write columns",
            command.table()
        );
        sql.push_str(" SET ");
        for (index, column) in command.write_columns().enumerate() {
            if index > 0 {
                sql.push_str(", ");
            }
            append_ident(sql, &column.column_name);
            sql.push_str(" = ");
            match &column.json_path {
                Some(path) => self.append_json_merge(sql, column, path),
                None => self.append_current_value(sql, column),
            }
        }
    }

    /// `JSON_MODIFY("col", 'strict $.path', value)`; strict mode makes a
    /// missing key an error instead of a silent no-op.
    fn append_json_merge(&self, sql: &mut String, column: &ColumnModification, path: &str) {
        sql.push_str(JSON_MERGE_FUNCTION);
        sql.push('(');
        append_ident(sql, &column.column_name);
        sql.push_str(", 'strict ");
        let path = path.trim();
        if !path.starts_with('$') {
            sql.push_str("$.");
        }
        sql.push_str(&escape_sql_string(path));
        sql.push_str("', ");
        let is_fragment = matches!(
            &column.value,
            Value::Json(serde_json::Value::Object(_) | serde_json::Value::Array(_))
        );
        if is_fragment {
            sql.push_str(JSON_FRAGMENT_FUNCTION);
            sql.push('(');
            self.append_current_value(sql, column);
            sql.push(')');
        } else {
            self.append_current_value(sql, column);
        }
        sql.push(')');
    }

    fn append_where_clause(&self, sql: &mut String, command: &RowMutationCommand) {
        let mut conditions = command.condition_columns().peekable();
        debug_assert!(
            conditions.peek().is_some(),
            "{:?} against `{}` has no condition columns",
            command.kind(),
            command.table()
        );
        if conditions.peek().is_none() {
            // matches nothing, so the affected-row check fails instead
            sql.push_str(" WHERE 1 = 0");
            return;
        }
        sql.push_str(" WHERE ");
        for (index, column) in conditions.enumerate() {
            if index > 0 {
                sql.push_str(" AND ");
            }
            self.append_where_condition(sql, column);
        }
    }

    fn append_where_condition(&self, sql: &mut String, column: &ColumnModification) {
        append_ident(sql, &column.column_name);
        if column.original_value.is_null() {
            sql.push_str(" IS NULL");
        } else {
            sql.push_str(" = ");
            self.append_original_value(sql, column);
        }
    }

    fn append_read_columns(&self, sql: &mut String, command: &RowMutationCommand) {
        for (index, column) in command.read_columns().enumerate() {
            if index > 0 {
                sql.push_str(", ");
            }
            append_ident(sql, &column.column_name);
        }
    }

    fn append_rows_affected_select(&self, sql: &mut String) {
        sql.push_str("SELECT ");
        sql.push_str(ROWS_AFFECTED_EXPR);
        sql.push_str(STATEMENT_TERMINATOR);
    }

    /// Reads back the inserted row on a table that cannot use `OUTPUT`.
    fn append_inserted_row_selection(&self, sql: &mut String, command: &RowMutationCommand) {
        sql.push_str("SELECT ");
        self.append_read_columns(sql, command);
        sql.push_str(" FROM ");
        append_table_name(sql, command.table());
        sql.push_str(" WHERE ");
        sql.push_str(ROWS_AFFECTED_EXPR);
        sql.push_str(" = 1");
        if let Some(ordering) = generated_key_column(command) {
            sql.push_str(" ORDER BY ");
            append_ident(sql, &ordering.column_name);
            sql.push_str(" DESC LIMIT 1");
        } else {
            for key_condition in &command.key_condition_parameters {
                let column = &command.columns()[key_condition.column_index];
                sql.push_str(" AND ");
                append_ident(sql, &column.column_name);
                sql.push_str(" = ");
                sql.push_str(&key_condition.name);
            }
            for column in command
                .columns()
                .iter()
                .enumerate()
                .filter(|(index, column)| {
                    is_write_only_key(column)
                        && !command
                            .key_condition_parameters
                            .iter()
                            .any(|key| key.column_index == *index)
                })
                .map(|(_, column)| column)
            {
                sql.push_str(" AND ");
                append_ident(sql, &column.column_name);
                if column.value.is_null() {
                    sql.push_str(" IS NULL");
                } else {
                    sql.push_str(" = ");
                    append_literal(sql, &column.value, &column.type_mapping);
                }
            }
        }
        sql.push_str(STATEMENT_TERMINATOR);
    }

    /// Reads back an updated row on a table that cannot use `OUTPUT`.
    fn append_updated_row_selection(&self, sql: &mut String, command: &RowMutationCommand) {
        sql.push_str("SELECT ");
        self.append_read_columns(sql, command);
        sql.push_str(" FROM ");
        append_table_name(sql, command.table());
        sql.push_str(" WHERE ");
        sql.push_str(ROWS_AFFECTED_EXPR);
        sql.push_str(" = 1");
        for column in command.columns().iter().filter(|column| column.is_key) {
            sql.push_str(" AND ");
            self.append_where_condition(sql, column);
        }
        sql.push_str(STATEMENT_TERMINATOR);
    }
}

impl StatementGenerator for OutputClauseSqlGenerator {
    fn append_insert_operation(
        &self,
        sql: &mut String,
        command: &RowMutationCommand,
    ) -> GeneratedStatements {
        debug_assert_eq!(command.kind(), MutationKind::Insert);
        self.append_insert_header(sql, command);
        if !command.has_read_columns() {
            self.append_values_clause(sql, command);
            sql.push_str(STATEMENT_TERMINATOR);
            return GeneratedStatements::single(ResultSetMapping::NoResults, 1);
        }

        if command.output_clause_supported() {
            self.append_output_clause(sql, command);
            self.append_values_clause(sql, command);
            sql.push_str(STATEMENT_TERMINATOR);
            return GeneratedStatements::single(ResultSetMapping::ResultRow { is_last: true }, 1);
        }

        self.append_values_clause(sql, command);
        sql.push_str(STATEMENT_TERMINATOR);
        self.append_inserted_row_selection(sql, command);
        GeneratedStatements::single(ResultSetMapping::ResultRow { is_last: true }, 2)
    }

    fn append_update_operation(
        &self,
        sql: &mut String,
        command: &RowMutationCommand,
    ) -> GeneratedStatements {
        debug_assert_eq!(command.kind(), MutationKind::Update);
        sql.push_str("UPDATE ");
        append_table_name(sql, command.table());
        self.append_set_clause(sql, command);

        if command.output_clause_supported() {
            self.append_output_clause(sql, command);
            self.append_where_clause(sql, command);
            sql.push_str(STATEMENT_TERMINATOR);
            return GeneratedStatements::single(ResultSetMapping::ResultRow { is_last: true }, 1);
        }

        self.append_where_clause(sql, command);
        sql.push_str(STATEMENT_TERMINATOR);
        if command.has_read_columns() {
            self.append_updated_row_selection(sql, command);
            GeneratedStatements::single(ResultSetMapping::ResultRow { is_last: true }, 2)
        } else {
            self.append_rows_affected_select(sql);
            GeneratedStatements::single(ResultSetMapping::RowsAffectedOnly, 2)
        }
    }

    fn append_delete_operation(
        &self,
        sql: &mut String,
        command: &RowMutationCommand,
    ) -> GeneratedStatements {
        debug_assert_eq!(command.kind(), MutationKind::Delete);
        sql.push_str("DELETE FROM ");
        append_table_name(sql, command.table());

        if command.output_clause_supported() {
            sql.push_str(" OUTPUT 1");
            self.append_where_clause(sql, command);
            sql.push_str(STATEMENT_TERMINATOR);
            return GeneratedStatements::single(ResultSetMapping::ResultRow { is_last: true }, 1);
        }

        self.append_where_clause(sql, command);
        sql.push_str(STATEMENT_TERMINATOR);
        self.append_rows_affected_select(sql);
        GeneratedStatements::single(ResultSetMapping::RowsAffectedOnly, 2)
    }

    fn append_bulk_insert_operation(
        &self,
        sql: &mut String,
        commands: &[&RowMutationCommand],
    ) -> GeneratedStatements {
        let Some(first) = commands.first() else {
            return GeneratedStatements::default();
        };
        debug_assert!(
            commands.iter().all(|command| first.has_same_insert_shape(command)),
            "bulk insert commands must share table and column shape"
        );

        if commands.len() == 1 {
            return self.append_insert_operation(sql, first);
        }

        // Without a bulk read-back mechanism each row needs its own statement.
        if first.has_read_columns() || first.write_columns().next().is_none() {
            let mut generated = GeneratedStatements::default();
            for command in commands {
                generated.extend(self.append_insert_operation(sql, command));
            }
            return generated;
        }

        self.append_insert_header(sql, first);
        sql.push_str(" VALUES ");
        for (index, command) in commands.iter().enumerate() {
            if index > 0 {
                sql.push_str(", ");
            }
            self.append_values_row(sql, command);
        }
        sql.push_str(STATEMENT_TERMINATOR);
        GeneratedStatements {
            result_set_mappings: vec![ResultSetMapping::NoResults; commands.len()],
            statement_count: 1,
        }
    }

    fn append_stored_procedure_call(
        &self,
        sql: &mut String,
        command: &RowMutationCommand,
    ) -> GeneratedStatements {
        let Some(procedure) = command.procedure() else {
            debug_assert!(false, "command against `{}` has no procedure", command.table());
            return GeneratedStatements::default();
        };
        sql.push_str("EXEC ");
        append_schema_qualified(sql, &procedure.name, procedure.schema.as_deref());

        let mut first = true;
        let mut separator = |sql: &mut String| {
            sql.push_str(if first { " " } else { ", " });
            first = false;
        };
        for column in command.columns() {
            if column.is_read {
                separator(sql);
                match column.parameter_name() {
                    Some(name) => sql.push_str(name),
                    None => sql.push_str("NULL"),
                }
                sql.push_str(OUTPUT_PARAMETER_SUFFIX);
            } else if column.is_write {
                separator(sql);
                self.append_current_value(sql, column);
            }
            if column.is_condition {
                separator(sql);
                self.append_original_value(sql, column);
            }
        }
        if let Some(name) = &command.rows_affected_parameter_name {
            separator(sql);
            sql.push_str(name);
            sql.push_str(OUTPUT_PARAMETER_SUFFIX);
        }
        sql.push_str(STATEMENT_TERMINATOR);

        let mapping = if command.has_read_columns() || command.rows_affected_parameter_name.is_some()
        {
            ResultSetMapping::OutputParameters {
                rows_affected_parameter: command.rows_affected_parameter_name.clone(),
            }
        } else {
            ResultSetMapping::NoResults
        };
        GeneratedStatements::single(mapping, 1)
    }

    fn append_next_sequence_value_operation(
        &self,
        sql: &mut String,
        name: &str,
        schema: Option<&str>,
    ) {
        append_schema_qualified(sql, name, schema);
        sql.push_str(".NEXTVAL");
    }

    fn append_obtain_next_sequence_value_operation(
        &self,
        sql: &mut String,
        name: &str,
        schema: Option<&str>,
    ) {
        sql.push_str("SELECT ");
        self.append_next_sequence_value_operation(sql, name, schema);
        sql.push_str(STATEMENT_TERMINATOR);
    }

    fn render_command_text(&self, body: &str, requires_transaction: bool) -> String {
        if requires_transaction {
            return body.to_string();
        }
        let mut text = String::with_capacity(AUTOCOMMIT_PREFACE.len() + body.len());
        text.push_str(AUTOCOMMIT_PREFACE);
        text.push_str(body);
        text
    }

    fn key_condition_columns(&self, command: &RowMutationCommand) -> Vec<usize> {
        if command.output_clause_supported()
            || command.procedure().is_some()
            || command.kind() != MutationKind::Insert
            || !command.has_read_columns()
            || generated_key_column(command).is_some()
        {
            return Vec::new();
        }
        command
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, column)| {
                is_write_only_key(column)
                    && !column.value.is_null()
                    && !column.type_mapping.requires_literal
            })
            .map(|(index, _)| index)
            .collect()
    }
}

fn generated_key_column(command: &RowMutationCommand) -> Option<&ColumnModification> {
    command
        .columns()
        .iter()
        .find(|column| column.is_key && column.is_read && column.generation != ValueGeneration::None)
}

fn is_write_only_key(column: &ColumnModification) -> bool {
    column.is_key && column.is_write && !column.is_read
}
