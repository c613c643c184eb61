//! Schema-driven coercion of raw fields into typed values
//!
//! Pure functions only: no I/O and no shared state, so tasks call them
//! concurrently on their own records.

use crate::error::{LoadError, Result};
use crate::schema::{ColumnType, TableSchema};
use crate::stream::RawRecord;

/// One coerced field
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i32),
    Double(f64),
    String(String),
}

impl Value {
    pub fn as_integer(&self) -> Option<i32> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Integer(_) => ColumnType::Integer,
            Value::Double(_) => ColumnType::Double,
            Value::String(_) => ColumnType::String,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::String(v) => f.write_str(v),
        }
    }
}

/// A record after coercion, one value per schema column
#[derive(Debug, Clone, PartialEq)]
pub struct TypedRow {
    pub line: u64,
    pub values: Vec<Value>,
}

impl TypedRow {
    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Why a single field was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub expected: ColumnType,
    pub value: String,
}

/// Coerce one raw field according to `ty`
///
/// Numeric literals are taken as-is: surrounding whitespace, an empty string
/// or a value outside the `i32` range is rejected.
pub fn coerce_field(raw: &str, ty: ColumnType) -> std::result::Result<Value, FieldError> {
    let reject = || FieldError {
        expected: ty,
        value: raw.to_string(),
    };

    match ty {
        ColumnType::Integer => raw.parse::<i32>().map(Value::Integer).map_err(|_| reject()),
        ColumnType::Double => raw.parse::<f64>().map(Value::Double).map_err(|_| reject()),
        ColumnType::String => Ok(Value::String(raw.to_string())),
    }
}

/// Coerce a whole record against `schema`
///
/// The field count is checked before any field is parsed; the first
/// offending column is reported.
pub fn coerce_record(schema: &TableSchema, record: &RawRecord) -> Result<TypedRow> {
    if record.fields.len() != schema.len() {
        return Err(LoadError::FieldCount {
            line: record.line,
            expected: schema.len(),
            actual: record.fields.len(),
        });
    }

    let values = schema
        .columns
        .iter()
        .zip(&record.fields)
        .map(|(column, raw)| {
            coerce_field(raw, column.ty).map_err(|e| LoadError::MalformedField {
                line: record.line,
                column: column.name.to_string(),
                value: e.value,
                expected: e.expected.as_str(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(TypedRow {
        line: record.line,
        values,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::schema::{DATE, SUPPLIER};

    fn raw(line: u64, text: &str) -> RawRecord {
        RawRecord::parse(line, text)
    }

    #[test]
    fn test_integer_literals() {
        assert_eq!(coerce_field("42", ColumnType::Integer), Ok(Value::Integer(42)));
        assert_eq!(coerce_field("-7", ColumnType::Integer), Ok(Value::Integer(-7)));
        assert_eq!(
            coerce_field("2147483647", ColumnType::Integer),
            Ok(Value::Integer(i32::MAX))
        );
    }

    #[test]
    fn test_integer_rejections() {
        for bad in ["", "abc", "12x", " 12", "2147483648", "1.5"] {
            let err = coerce_field(bad, ColumnType::Integer).unwrap_err();
            assert_eq!(err.expected, ColumnType::Integer);
            assert_eq!(err.value, bad);
        }
    }

    #[test]
    fn test_double_literals() {
        assert_eq!(coerce_field("3.25", ColumnType::Double), Ok(Value::Double(3.25)));
        assert_eq!(coerce_field("-1e3", ColumnType::Double), Ok(Value::Double(-1000.0)));
        assert!(coerce_field("", ColumnType::Double).is_err());
        assert!(coerce_field("1,5", ColumnType::Double).is_err());
    }

    #[test]
    fn test_string_passthrough() {
        assert_eq!(
            coerce_field("  padded  ", ColumnType::String),
            Ok(Value::String("  padded  ".to_string()))
        );
        assert_eq!(coerce_field("", ColumnType::String), Ok(Value::String(String::new())));
    }

    #[test]
    fn test_date_record() {
        let record = raw(
            1,
            "19920101|January 1, 1992|Wednesday|January|1992|199201|Jan1992|4|1|1|1|1|Winter|0|0|1|1",
        );
        let row = coerce_record(&DATE, &record).unwrap();

        assert_eq!(row.len(), 17);
        assert_eq!(row.get(0).unwrap().as_integer(), Some(19920101));
        assert_eq!(row.get(2).unwrap().as_str(), Some("Wednesday"));
        assert_eq!(row.get(4).unwrap().as_integer(), Some(1992));
    }

    #[test]
    fn test_rendering_back_matches_source_fields() {
        let text = "7|Supplier#000000007|s,4E|PERU     0|PERU|AMERICA|27-715-681-1215";
        let record = raw(1, text);
        let row = coerce_record(&SUPPLIER, &record).unwrap();

        let rendered: Vec<String> = row.values.iter().map(|v| v.to_string()).collect();
        assert_eq!(rendered, record.fields);
    }

    #[test]
    fn test_field_count_mismatch() {
        let record = raw(9, "1|Supplier#1|addr");
        let err = coerce_record(&SUPPLIER, &record).unwrap_err();
        assert!(matches!(
            err,
            LoadError::FieldCount {
                line: 9,
                expected: 7,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_reports_first_bad_column() {
        let record = raw(3, "x|Supplier#3|addr|city|nation|region|phone");
        match coerce_record(&SUPPLIER, &record).unwrap_err() {
            LoadError::MalformedField {
                line,
                column,
                value,
                expected,
            } => {
                assert_eq!(line, 3);
                assert_eq!(column, "s_suppkey");
                assert_eq!(value, "x");
                assert_eq!(expected, "INTEGER");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
