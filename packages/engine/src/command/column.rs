use serde::{Deserialize, Serialize};

use crate::Value;

/// Store-side description of a column type, as far as rendering cares.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeMapping {
    pub store_type: String,
    /// The store cannot bind this type as a parameter; values are inlined.
    pub requires_literal: bool,
    pub is_unicode: bool,
    pub is_json: bool,
}

impl TypeMapping {
    pub fn new(store_type: impl Into<String>) -> Self {
        Self {
            store_type: store_type.into(),
            requires_literal: false,
            is_unicode: false,
            is_json: false,
        }
    }

    pub fn literal_only(store_type: impl Into<String>) -> Self {
        Self {
            requires_literal: true,
            ..Self::new(store_type)
        }
    }

    pub fn unicode(store_type: impl Into<String>) -> Self {
        Self {
            is_unicode: true,
            ..Self::new(store_type)
        }
    }

    pub fn json(store_type: impl Into<String>) -> Self {
        Self {
            is_unicode: true,
            is_json: true,
            ..Self::new(store_type)
        }
    }
}

impl Default for TypeMapping {
    fn default() -> Self {
        Self::new("sql_variant")
    }
}

/// How the store produces a value for a column on insert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueGeneration {
    #[default]
    None,
    Identity,
    Sequence {
        name: String,
        schema: Option<String>,
    },
}

/// One column's participation in one row write.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnModification {
    pub column_name: String,
    pub is_key: bool,
    pub is_read: bool,
    pub is_write: bool,
    /// Participates in the `WHERE` clause with its original value.
    pub is_condition: bool,
    pub is_nullable: bool,
    pub value: Value,
    pub original_value: Value,
    pub type_mapping: TypeMapping,
    /// Path inside a JSON column for a partial update.
    pub json_path: Option<String>,
    pub generation: ValueGeneration,
    pub(crate) parameter_name: Option<String>,
    pub(crate) original_parameter_name: Option<String>,
}

impl ColumnModification {
    fn blank(column_name: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
            is_key: false,
            is_read: false,
            is_write: false,
            is_condition: false,
            is_nullable: true,
            value: Value::Null,
            original_value: Value::Null,
            type_mapping: TypeMapping::default(),
            json_path: None,
            generation: ValueGeneration::None,
            parameter_name: None,
            original_parameter_name: None,
        }
    }

    /// A column whose current value is sent to the store.
    pub fn write(column_name: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = value.into();
        Self {
            is_write: true,
            original_value: value.clone(),
            value,
            ..Self::blank(column_name)
        }
    }

    /// A column populated from the response after execution.
    pub fn read(column_name: impl Into<String>) -> Self {
        Self {
            is_read: true,
            ..Self::blank(column_name)
        }
    }

    /// A key column identifying the row through its original value.
    pub fn key(column_name: impl Into<String>, original_value: impl Into<Value>) -> Self {
        let original_value = original_value.into();
        Self {
            is_key: true,
            is_condition: true,
            is_nullable: false,
            value: original_value.clone(),
            original_value,
            ..Self::blank(column_name)
        }
    }

    /// A store-generated identity key, read back after an insert.
    pub fn identity_key(column_name: impl Into<String>) -> Self {
        Self {
            is_key: true,
            is_read: true,
            is_nullable: false,
            generation: ValueGeneration::Identity,
            ..Self::blank(column_name)
        }
    }

    /// A key drawn from a sequence inside the insert and read back afterwards.
    pub fn sequence_key(
        column_name: impl Into<String>,
        sequence: impl Into<String>,
        schema: Option<&str>,
    ) -> Self {
        Self {
            is_key: true,
            is_read: true,
            is_write: true,
            is_nullable: false,
            generation: ValueGeneration::Sequence {
                name: sequence.into(),
                schema: schema.map(str::to_string),
            },
            ..Self::blank(column_name)
        }
    }

    /// An optimistic-concurrency token: written with `current`, checked
    /// against `original`.
    pub fn concurrency_token(
        column_name: impl Into<String>,
        current: impl Into<Value>,
        original: impl Into<Value>,
    ) -> Self {
        Self {
            is_write: true,
            is_condition: true,
            value: current.into(),
            original_value: original.into(),
            ..Self::blank(column_name)
        }
    }

    pub fn as_key(mut self) -> Self {
        self.is_key = true;
        self.is_nullable = false;
        self
    }

    pub fn with_read(mut self) -> Self {
        self.is_read = true;
        self
    }

    pub fn with_condition(mut self, original_value: impl Into<Value>) -> Self {
        self.is_condition = true;
        self.original_value = original_value.into();
        self
    }

    pub fn with_type_mapping(mut self, type_mapping: TypeMapping) -> Self {
        self.type_mapping = type_mapping;
        self
    }

    pub fn with_json_path(mut self, path: impl Into<String>) -> Self {
        self.json_path = Some(path.into());
        self
    }

    pub fn with_nullable(mut self, is_nullable: bool) -> Self {
        self.is_nullable = is_nullable;
        self
    }

    pub fn parameter_name(&self) -> Option<&str> {
        self.parameter_name.as_deref()
    }

    pub fn original_parameter_name(&self) -> Option<&str> {
        self.original_parameter_name.as_deref()
    }

    pub fn is_sequence_generated(&self) -> bool {
        matches!(self.generation, ValueGeneration::Sequence { .. })
    }

    /// Whether the current value occupies a parameter slot.
    ///
    /// Read columns are populated from the response and never send their
    /// current value; nulls and literal-only types are inlined.
    pub fn uses_current_value_parameter(&self) -> bool {
        self.is_write
            && !self.is_read
            && !self.type_mapping.requires_literal
            && !self.value.is_null()
    }

    /// Whether the original value occupies a parameter slot in a predicate.
    pub fn uses_original_value_parameter(&self) -> bool {
        self.is_condition
            && !self.type_mapping.requires_literal
            && !self.original_value.is_null()
    }
}

#[cfg(test)]
mod tests {
    use super::{ColumnModification, TypeMapping, ValueGeneration};
    use crate::Value;

    #[test]
    fn read_write_column_never_takes_a_current_value_slot() {
        let column = ColumnModification::sequence_key("id", "order_ids", None);
        assert!(column.is_read && column.is_write);
        assert!(!column.uses_current_value_parameter());
        assert!(column.is_sequence_generated());
    }

    #[test]
    fn literal_only_and_null_values_are_inlined() {
        let literal = ColumnModification::write("shape", "POINT(1 2)")
            .with_type_mapping(TypeMapping::literal_only("geometry"));
        assert!(!literal.uses_current_value_parameter());

        let null = ColumnModification::write("note", Value::Null);
        assert!(!null.uses_current_value_parameter());

        let plain = ColumnModification::write("name", "a");
        assert!(plain.uses_current_value_parameter());
    }

    #[test]
    fn key_uses_original_value_predicate() {
        let key = ColumnModification::key("id", 5);
        assert!(key.is_key && key.is_condition && !key.is_write);
        assert!(key.uses_original_value_parameter());
        assert_eq!(key.generation, ValueGeneration::None);

        let stale = ColumnModification::concurrency_token("version", 2, Value::Null);
        assert!(!stale.uses_original_value_parameter());
        assert!(stale.uses_current_value_parameter());
    }
}
