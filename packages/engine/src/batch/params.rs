use crate::command::{KeyConditionParameter, RowMutationCommand, TypeMapping};
use crate::sql::PARAMETER_PREFIX;
use crate::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterDirection {
    Input,
    Output,
    InputOutput,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundParameter {
    pub name: String,
    pub value: Value,
    pub type_mapping: TypeMapping,
    pub direction: ParameterDirection,
}

impl BoundParameter {
    fn input(name: &str, value: &Value, type_mapping: &TypeMapping) -> Self {
        Self {
            name: name.to_string(),
            value: value.clone(),
            type_mapping: type_mapping.clone(),
            direction: ParameterDirection::Input,
        }
    }
}

/// Issues `@p0`, `@p1`, ... in registration order. The count issued is the
/// number of parameter slots the batch uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ParameterNameGenerator {
    next_ordinal: usize,
}

impl ParameterNameGenerator {
    pub(crate) fn generate(&mut self) -> String {
        let name = format!("{PARAMETER_PREFIX}{}", self.next_ordinal);
        self.next_ordinal += 1;
        name
    }

    pub(crate) fn issued(&self) -> usize {
        self.next_ordinal
    }
}

/// Gives every value of `command` that travels as a parameter its name.
/// Returns the number of names issued.
pub(crate) fn assign_parameter_names(
    command: &mut RowMutationCommand,
    key_condition_columns: &[usize],
    names: &mut ParameterNameGenerator,
) -> usize {
    let before = names.issued();
    clear_parameter_names(command);

    let is_procedure = command.procedure().is_some();
    for column in command.columns_mut() {
        let takes_current = if is_procedure {
            column.is_read || column.uses_current_value_parameter()
        } else {
            column.uses_current_value_parameter()
        };
        if takes_current {
            column.parameter_name = Some(names.generate());
        }
        if column.uses_original_value_parameter() {
            column.original_parameter_name = Some(names.generate());
        }
    }

    if is_procedure && command.rows_affected_column().is_some() {
        command.rows_affected_parameter_name = Some(names.generate());
    }

    command.key_condition_parameters = key_condition_columns
        .iter()
        .map(|column_index| KeyConditionParameter {
            column_index: *column_index,
            name: names.generate(),
        })
        .collect();

    names.issued() - before
}

pub(crate) fn clear_parameter_names(command: &mut RowMutationCommand) {
    for column in command.columns_mut() {
        column.parameter_name = None;
        column.original_parameter_name = None;
    }
    command.rows_affected_parameter_name = None;
    command.key_condition_parameters.clear();
}

/// Column parameters of one command in column order, output slots included.
pub(crate) fn bind_column_parameters(command: &RowMutationCommand, out: &mut Vec<BoundParameter>) {
    for column in command.columns() {
        if let Some(name) = column.parameter_name() {
            let (value, direction) = match (column.is_read, column.is_write) {
                (true, true) => (column.value.clone(), ParameterDirection::InputOutput),
                (true, false) => (Value::Null, ParameterDirection::Output),
                _ => (column.value.clone(), ParameterDirection::Input),
            };
            out.push(BoundParameter {
                name: name.to_string(),
                value,
                type_mapping: column.type_mapping.clone(),
                direction,
            });
        }
        if let Some(name) = column.original_parameter_name() {
            out.push(BoundParameter::input(
                name,
                &column.original_value,
                &column.type_mapping,
            ));
        }
    }
    if let Some(name) = &command.rows_affected_parameter_name {
        out.push(BoundParameter {
            name: name.clone(),
            value: Value::Null,
            type_mapping: TypeMapping::new("int"),
            direction: ParameterDirection::Output,
        });
    }
}

pub(crate) fn bind_key_condition_parameters(
    command: &RowMutationCommand,
    out: &mut Vec<BoundParameter>,
) {
    for key_condition in &command.key_condition_parameters {
        let column = &command.columns()[key_condition.column_index];
        out.push(BoundParameter::input(
            &key_condition.name,
            &column.value,
            &column.type_mapping,
        ));
    }
}
