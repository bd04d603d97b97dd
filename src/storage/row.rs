use crate::error::{DbError, DbResult};
use crate::value::{CompositeKind, Value};

/// Declared type of a column. Composite columns carry the type of their
/// elements, so every value stored in one column compares with every other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Double,
    Varchar,
    Boolean,
    Char(usize),
    Array(Box<ColumnType>),
    Row(Vec<ColumnType>),
}

impl ColumnType {
    /// Scalar type names. ARRAY and ROW types are built by the parser.
    pub fn from_str(s: &str) -> Option<Self> {
        let upper = s.trim().to_uppercase();
        if upper.starts_with("CHAR(") || upper.starts_with("CHARACTER(") {
            if let (Some(start), Some(end)) = (upper.find('('), upper.find(')')) {
                if let Ok(sz) = upper[start + 1..end].trim().parse::<usize>() {
                    return Some(ColumnType::Char(sz));
                }
            }
            return None;
        }
        match upper.as_str() {
            "INTEGER" | "INT" | "BIGINT" => Some(ColumnType::Integer),
            "DOUBLE" | "DOUBLE PRECISION" | "FLOAT" | "REAL" => Some(ColumnType::Double),
            "VARCHAR" | "TEXT" | "CHARACTER VARYING" => Some(ColumnType::Varchar),
            "BOOLEAN" | "BOOL" => Some(ColumnType::Boolean),
            "CHAR" | "CHARACTER" => Some(ColumnType::Char(1)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> String {
        match self {
            ColumnType::Integer => "BIGINT".into(),
            ColumnType::Double => "DOUBLE PRECISION".into(),
            ColumnType::Varchar => "CHARACTER VARYING".into(),
            ColumnType::Boolean => "BOOLEAN".into(),
            ColumnType::Char(size) => format!("CHARACTER({})", size),
            ColumnType::Array(element) => format!("{} ARRAY", element.as_str()),
            ColumnType::Row(fields) => {
                format!("ROW({})", fields.iter().map(ColumnType::as_str).collect::<Vec<_>>().join(", "))
            }
        }
    }

    /// Convert a literal into a value of this column type.
    pub fn coerce(&self, value: Value, column: &str) -> DbResult<Value> {
        let invalid = |v: &Value| {
            DbError::InvalidValue(format!("value {} for column '{}' is not a valid {}", v, column, self.as_str()))
        };
        match (self, value) {
            (_, Value::Null) => Ok(Value::Null),
            (ColumnType::Integer, Value::Integer(i)) => Ok(Value::Integer(i)),
            (ColumnType::Integer, Value::Double(d)) if d.fract() == 0.0 && d.abs() < 9.0e18 => Ok(Value::Integer(d as i64)),
            (ColumnType::Double, Value::Double(d)) => Ok(Value::Double(d)),
            (ColumnType::Double, Value::Integer(i)) => Ok(Value::Double(i as f64)),
            (ColumnType::Varchar, Value::Varchar(s) | Value::Char(s)) => Ok(Value::Varchar(s)),
            (ColumnType::Boolean, Value::Boolean(b)) => Ok(Value::Boolean(b)),
            (ColumnType::Char(len), Value::Varchar(s) | Value::Char(s)) => {
                let mut s: String = s.chars().take(*len).collect();
                let pad = len.saturating_sub(s.chars().count());
                s.push_str(&" ".repeat(pad));
                Ok(Value::Char(s))
            }
            (ColumnType::Array(element), Value::Composite(c)) if c.kind() == CompositeKind::Array => {
                let values = c
                    .values()
                    .iter()
                    .map(|v| element.coerce(v.clone(), column))
                    .collect::<DbResult<Vec<_>>>()?;
                Ok(Value::array(values))
            }
            (ColumnType::Row(fields), Value::Composite(c))
                if c.kind() == CompositeKind::Row && c.len() == fields.len() =>
            {
                let values = fields
                    .iter()
                    .zip(c.values())
                    .map(|(ty, v)| ty.coerce(v.clone(), column))
                    .collect::<DbResult<Vec<_>>>()?;
                Ok(Value::row(values))
            }
            (_, other) => Err(invalid(&other)),
        }
    }
}

/// Identifier of a stored row within its table.
pub type RowId = u64;

#[derive(Debug, Clone, PartialEq)]
pub struct RowData(pub Vec<Value>);

impl RowData {
    /// Extract the values at `positions`, in order.
    pub fn project(&self, positions: &[usize]) -> Vec<Value> {
        positions.iter().map(|p| self.0.get(*p).cloned().unwrap_or(Value::Null)).collect()
    }

    pub fn memory(&self) -> usize {
        self.0.iter().map(Value::memory).sum()
    }
}

/// Build a `RowData` from literal values according to the declared column
/// types. Returns an error if any value cannot be converted or the counts do
/// not match.
pub fn build_row_data(values: Vec<Value>, columns: &[(String, ColumnType)]) -> DbResult<RowData> {
    if values.len() != columns.len() {
        return Err(DbError::InvalidValue(format!("Expected {} values, got {}", columns.len(), values.len())));
    }
    let cols = values
        .into_iter()
        .zip(columns.iter())
        .map(|(v, (name, ty))| ty.coerce(v, name))
        .collect::<DbResult<Vec<_>>>()?;
    Ok(RowData(cols))
}

#[derive(Debug, Clone)]
pub struct Row {
    pub key: RowId,
    pub data: RowData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_type_names() {
        assert_eq!(ColumnType::from_str("int"), Some(ColumnType::Integer));
        assert_eq!(ColumnType::from_str("CHAR(4)"), Some(ColumnType::Char(4)));
        assert_eq!(ColumnType::from_str("character varying"), Some(ColumnType::Varchar));
        assert_eq!(ColumnType::from_str("blob"), None);
        for ty in [ColumnType::Integer, ColumnType::Double, ColumnType::Char(3)] {
            assert_eq!(ColumnType::from_str(&ty.as_str()), Some(ty));
        }
        assert_eq!(ColumnType::from_str("ARRAY"), None);
    }

    #[test]
    fn composite_type_names() {
        let ty = ColumnType::Row(vec![ColumnType::Integer, ColumnType::Array(Box::new(ColumnType::Varchar))]);
        assert_eq!(ty.as_str(), "ROW(BIGINT, CHARACTER VARYING ARRAY)");
    }

    #[test]
    fn array_elements_take_the_element_type() {
        let ty = ColumnType::Array(Box::new(ColumnType::Double));
        let coerced = ty.coerce(Value::array(vec![Value::Integer(1), Value::Null]), "a").unwrap();
        assert_eq!(coerced, Value::array(vec![Value::Double(1.0), Value::Null]));
        assert!(ty.coerce(Value::array(vec![Value::Integer(1), Value::varchar("y")]), "a").is_err());
        assert!(ty.coerce(Value::row(vec![Value::Integer(1)]), "a").is_err());
    }

    #[test]
    fn row_values_must_match_the_declared_fields() {
        let ty = ColumnType::Row(vec![ColumnType::Integer, ColumnType::Varchar]);
        assert!(ty.coerce(Value::row(vec![Value::Integer(1), Value::varchar("x")]), "r").is_ok());
        assert!(ty.coerce(Value::row(vec![Value::Integer(1)]), "r").is_err());
        assert!(ty.coerce(Value::row(vec![Value::varchar("x"), Value::Integer(1)]), "r").is_err());
    }

    #[test]
    fn char_values_are_padded_and_truncated() {
        assert_eq!(ColumnType::Char(4).coerce(Value::varchar("ab"), "c").unwrap(), Value::Char("ab  ".into()));
        assert_eq!(ColumnType::Char(1).coerce(Value::varchar("ab"), "c").unwrap(), Value::Char("a".into()));
    }

    #[test]
    fn build_row_rejects_wrong_types() {
        let cols = vec![("id".to_string(), ColumnType::Integer), ("ok".to_string(), ColumnType::Boolean)];
        assert!(build_row_data(vec![Value::Integer(1), Value::Boolean(true)], &cols).is_ok());
        assert!(build_row_data(vec![Value::varchar("x"), Value::Boolean(true)], &cols).is_err());
        assert!(build_row_data(vec![Value::Integer(1)], &cols).is_err());
    }

    #[test]
    fn project_picks_positions() {
        let row = RowData(vec![Value::Integer(1), Value::varchar("a"), Value::Null]);
        assert_eq!(row.project(&[2, 0]), vec![Value::Null, Value::Integer(1)]);
    }
}
