//! Drains the result sets of an executed batch and writes returned values
//! back into its commands.
//!
//! The reader is walked strictly in command order. Every result-bearing
//! mapping entry reads one row; a `ResultRow { is_last: false }` entry leaves
//! the current result set open for the next command, while a closing entry
//! drains the set and treats any further row as an extra affected row.

use crate::backend::{AsyncBatchReader, BatchReader};
use crate::command::RowMutationCommand;
use crate::error::{BatchError, ConcurrencyConflict, ExecutionError, UpdateFailure};
use crate::sql::ResultSetMapping;
use crate::Value;

pub fn consume(
    commands: &mut [RowMutationCommand],
    mappings: &[ResultSetMapping],
    reader: &mut dyn BatchReader,
) -> Result<(), BatchError> {
    debug_assert_eq!(commands.len(), mappings.len());
    let mut result_set_open = false;
    for (position, mapping) in mappings.iter().enumerate() {
        if !mapping.has_result_row() {
            continue;
        }
        if !result_set_open {
            let advanced = reader
                .next_result()
                .map_err(|error| classify_failure(error, Some(position), commands))?;
            if !advanced {
                return Err(missing_result_set(position, commands));
            }
        }
        let row = reader
            .read_row()
            .map_err(|error| classify_failure(error, Some(position), commands))?;
        let mut extra_rows = 0;
        if row.is_some() && closes_row_set(mapping) {
            while reader
                .read_row()
                .map_err(|error| classify_failure(error, Some(position), commands))?
                .is_some()
            {
                extra_rows += 1;
            }
        }
        apply_result_row(commands, position, mapping, row, extra_rows)?;
        result_set_open = !mapping.is_last_in_result_set();
    }

    let trailing = reader
        .next_result()
        .map_err(|error| classify_failure(error, None, commands))?;
    if trailing {
        warn_trailing_result_set(mappings.len());
    }

    apply_output_parameters(commands, mappings, |name| reader.output_parameter(name))
}

/// Asynchronous mirror of [`consume`].
pub async fn consume_async(
    commands: &mut [RowMutationCommand],
    mappings: &[ResultSetMapping],
    reader: &mut dyn AsyncBatchReader,
) -> Result<(), BatchError> {
    debug_assert_eq!(commands.len(), mappings.len());
    let mut result_set_open = false;
    for (position, mapping) in mappings.iter().enumerate() {
        if !mapping.has_result_row() {
            continue;
        }
        if !result_set_open {
            let advanced = reader
                .next_result()
                .await
                .map_err(|error| classify_failure(error, Some(position), commands))?;
            if !advanced {
                return Err(missing_result_set(position, commands));
            }
        }
        let row = reader
            .read_row()
            .await
            .map_err(|error| classify_failure(error, Some(position), commands))?;
        let mut extra_rows = 0;
        if row.is_some() && closes_row_set(mapping) {
            while reader
                .read_row()
                .await
                .map_err(|error| classify_failure(error, Some(position), commands))?
                .is_some()
            {
                extra_rows += 1;
            }
        }
        apply_result_row(commands, position, mapping, row, extra_rows)?;
        result_set_open = !mapping.is_last_in_result_set();
    }

    let trailing = reader
        .next_result()
        .await
        .map_err(|error| classify_failure(error, None, commands))?;
    if trailing {
        warn_trailing_result_set(mappings.len());
    }

    apply_output_parameters(commands, mappings, |name| reader.output_parameter(name))
}

/// Cancellation passes through; anything else becomes an [`UpdateFailure`]
/// carrying the entries of the command at `position`, or of the whole batch
/// when no command can be blamed.
pub(crate) fn classify_failure(
    error: ExecutionError,
    position: Option<usize>,
    commands: &[RowMutationCommand],
) -> BatchError {
    if error == ExecutionError::Cancelled {
        return BatchError::Cancelled;
    }
    let command = position.and_then(|position| commands.get(position));
    let entries = match command {
        Some(command) => command.entries().to_vec(),
        None => commands
            .iter()
            .flat_map(|command| command.entries().iter().cloned())
            .collect(),
    };
    UpdateFailure {
        position: command.and(position),
        table: command.map(|command| command.table().to_string()),
        entries,
        source: error,
    }
    .into()
}

/// A row set that belongs to a single command; any row past the first means
/// the statement touched more than one row.
fn closes_row_set(mapping: &ResultSetMapping) -> bool {
    matches!(mapping, ResultSetMapping::ResultRow { is_last: true })
}

fn apply_result_row(
    commands: &mut [RowMutationCommand],
    position: usize,
    mapping: &ResultSetMapping,
    row: Option<Vec<Value>>,
    extra_rows: u64,
) -> Result<(), BatchError> {
    match mapping {
        ResultSetMapping::RowsAffectedOnly => {
            let actual = match row.as_deref() {
                None => 0,
                Some([count]) => count.as_integer().ok_or_else(|| {
                    classify_failure(
                        ExecutionError::store(format!(
                            "rows-affected count returned a non-integer value: {count:?}"
                        )),
                        Some(position),
                        commands,
                    )
                })?,
                Some(values) => {
                    return Err(classify_failure(
                        ExecutionError::store(format!(
                            "rows-affected count returned {} value(s) instead of one",
                            values.len()
                        )),
                        Some(position),
                        commands,
                    ))
                }
            };
            check_rows_affected(commands, position, actual)
        }
        ResultSetMapping::ResultRow { .. } => {
            let Some(values) = row else {
                return Err(concurrency_conflict(commands, position, 0));
            };
            if extra_rows > 0 {
                return Err(concurrency_conflict(commands, position, 1 + extra_rows));
            }
            commands[position]
                .propagate_results(values)
                .map_err(|error| classify_failure(error, Some(position), commands))
        }
        ResultSetMapping::NoResults | ResultSetMapping::OutputParameters { .. } => Ok(()),
    }
}

/// Output parameters are only readable once the result sets are drained.
fn apply_output_parameters(
    commands: &mut [RowMutationCommand],
    mappings: &[ResultSetMapping],
    output: impl Fn(&str) -> Option<Value>,
) -> Result<(), BatchError> {
    for (position, mapping) in mappings.iter().enumerate() {
        let ResultSetMapping::OutputParameters {
            rows_affected_parameter,
        } = mapping
        else {
            continue;
        };
        if let Some(name) = rows_affected_parameter {
            let Some(count) = output(name) else {
                let column = commands[position].rows_affected_column().unwrap_or(name.as_str());
                let message = format!("rows-affected output `{column}` ({name}) was not returned");
                return Err(classify_failure(
                    ExecutionError::store(message),
                    Some(position),
                    commands,
                ));
            };
            check_rows_affected(commands, position, count.as_integer().unwrap_or(0))?;
        }

        let mut missing = None;
        for column in commands[position].columns_mut() {
            if !column.is_read {
                continue;
            }
            let Some(name) = column.parameter_name.as_deref() else {
                continue;
            };
            match output(name) {
                Some(value) => column.value = value,
                None => {
                    missing = Some(name.to_string());
                    break;
                }
            }
        }
        if let Some(name) = missing {
            return Err(classify_failure(
                ExecutionError::store(format!("output parameter `{name}` was not returned")),
                Some(position),
                commands,
            ));
        }
    }
    Ok(())
}

fn check_rows_affected(
    commands: &[RowMutationCommand],
    position: usize,
    actual: i64,
) -> Result<(), BatchError> {
    if actual == 1 {
        return Ok(());
    }
    Err(concurrency_conflict(
        commands,
        position,
        u64::try_from(actual).unwrap_or(0),
    ))
}

fn concurrency_conflict(
    commands: &[RowMutationCommand],
    position: usize,
    actual_rows: u64,
) -> BatchError {
    let command = &commands[position];
    tracing::debug!(
        position,
        table = %command.table(),
        actual_rows,
        "affected-row check failed"
    );
    ConcurrencyConflict {
        position,
        table: command.table().to_string(),
        expected_rows: 1,
        actual_rows,
        entries: command.entries().to_vec(),
    }
    .into()
}

fn missing_result_set(position: usize, commands: &[RowMutationCommand]) -> BatchError {
    BatchError::MissingResultSet {
        position,
        table: commands[position].table().to_string(),
    }
}

fn warn_trailing_result_set(expected_entries: usize) {
    tracing::warn!(
        expected_entries,
        "batch returned more result sets than its commands account for"
    );
}
