use std::fmt::Write as _;

use crate::command::{TableName, TypeMapping};
use crate::Value;

pub(crate) const STATEMENT_TERMINATOR: &str = ";\n";
pub(crate) const AUTOCOMMIT_PREFACE: &str = "SET IMPLICIT_TRANSACTIONS OFF;\n";
pub(crate) const OUTPUT_PARAMETER_SUFFIX: &str = " OUTPUT";
pub(crate) const ROWS_AFFECTED_EXPR: &str = "@@ROWCOUNT";
pub(crate) const INSERTED_ALIAS: &str = "INSERTED";
pub(crate) const JSON_MERGE_FUNCTION: &str = "JSON_MODIFY";
pub(crate) const JSON_FRAGMENT_FUNCTION: &str = "JSON_QUERY";
pub(crate) const PARAMETER_PREFIX: &str = "@p";
pub(crate) const STATEMENT_COUNT_PARAMETER: &str = "@__statement_count";

pub(crate) fn append_ident(sql: &mut String, value: &str) {
    sql.push('"');
    for ch in value.chars() {
        if ch == '"' {
            sql.push('"');
        }
        sql.push(ch);
    }
    sql.push('"');
}

pub(crate) fn append_table_name(sql: &mut String, table: &TableName) {
    append_schema_qualified(sql, &table.name, table.schema.as_deref());
}

pub(crate) fn append_schema_qualified(sql: &mut String, name: &str, schema: Option<&str>) {
    if let Some(schema) = schema {
        append_ident(sql, schema);
        sql.push('.');
    }
    append_ident(sql, name);
}

pub(crate) fn escape_sql_string(value: &str) -> String {
    value.replace('\'', "''")
}

/// Whether the store has a literal or parameter form for `value`. It has
/// none for NaN and the infinities.
pub(crate) fn is_representable(value: &Value) -> bool {
    match value {
        Value::Real(value) => value.is_finite(),
        _ => true,
    }
}

/// Renders `value` as an inline literal of the given type.
pub(crate) fn append_literal(sql: &mut String, value: &Value, type_mapping: &TypeMapping) {
    debug_assert!(is_representable(value), "{value:?} has no literal form");
    match value {
        Value::Null => sql.push_str("NULL"),
        Value::Boolean(value) => sql.push(if *value { '1' } else { '0' }),
        Value::Integer(value) => {
            let _ = write!(sql, "{value}");
        }
        Value::Real(value) => {
            let _ = write!(sql, "{value:?}");
        }
        Value::Text(value) => append_string_literal(sql, value, type_mapping.is_unicode),
        Value::Blob(bytes) => {
            sql.push_str("0x");
            for byte in bytes {
                let _ = write!(sql, "{byte:02X}");
            }
        }
        Value::Json(json) => append_string_literal(sql, &json.to_string(), true),
    }
}

fn append_string_literal(sql: &mut String, value: &str, unicode: bool) {
    if unicode {
        sql.push('N');
    }
    sql.push('\'');
    sql.push_str(&escape_sql_string(value));
    sql.push('\'');
}

#[cfg(test)]
mod tests {
    use super::{append_ident, append_literal, append_table_name, is_representable};
    use crate::command::{TableName, TypeMapping};
    use crate::Value;

    fn literal(value: Value, mapping: &TypeMapping) -> String {
        let mut sql = String::new();
        append_literal(&mut sql, &value, mapping);
        sql
    }

    #[test]
    fn identifiers_double_embedded_quotes() {
        let mut sql = String::new();
        append_ident(&mut sql, "a\"b");
        assert_eq!(sql, "\"a\"\"b\"");
        sql.clear();
        append_table_name(&mut sql, &TableName::with_schema("orders", "sales"));
        assert_eq!(sql, "\"sales\".\"orders\"");
    }

    #[test]
    fn literals_follow_store_syntax() {
        let plain = TypeMapping::new("varchar(20)");
        assert_eq!(literal(Value::Null, &plain), "NULL");
        assert_eq!(literal(Value::Boolean(true), &plain), "1");
        assert_eq!(literal(Value::Integer(-4), &plain), "-4");
        assert_eq!(literal(Value::Real(1.0), &plain), "1.0");
        assert_eq!(literal(Value::Text("it's".to_string()), &plain), "'it''s'");
        assert_eq!(
            literal(Value::Text("x".to_string()), &TypeMapping::unicode("nvarchar(20)")),
            "N'x'"
        );
        assert_eq!(literal(Value::Blob(vec![0x0a, 0xff]), &plain), "0x0AFF");
        assert_eq!(
            literal(Value::Json(serde_json::json!({"a": 1})), &plain),
            "N'{\"a\":1}'"
        );
    }

    #[test]
    fn non_finite_reals_have_no_store_form() {
        assert!(is_representable(&Value::Real(-0.5)));
        assert!(is_representable(&Value::Null));
        assert!(!is_representable(&Value::Real(f64::NAN)));
        assert!(!is_representable(&Value::Real(f64::INFINITY)));
        assert!(!is_representable(&Value::Real(f64::NEG_INFINITY)));
    }
}
