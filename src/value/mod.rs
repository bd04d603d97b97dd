mod compare;
mod composite;

pub use compare::{Collation, CompareMode, SqlOrdering};
pub use composite::{Composite, CompositeKind};

use std::cmp::Ordering;
use std::fmt;

use crate::error::{DbError, DbResult};

/// Estimated size of a reference slot, in bytes.
pub const MEMORY_POINTER: usize = 8;
const MEMORY_NUMBER: usize = 24;
const MEMORY_STRING: usize = 94;

const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;

/// SQL type tag of a value. Codes are stable and seed composite hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Null,
    Char,
    Varchar,
    Boolean,
    Integer,
    Double,
    Array,
    Row,
}

impl ValueType {
    pub fn code(self) -> i32 {
        match self {
            ValueType::Null => 0,
            ValueType::Char => 1,
            ValueType::Varchar => 2,
            ValueType::Boolean => 8,
            ValueType::Integer => 12,
            ValueType::Double => 15,
            ValueType::Array => 40,
            ValueType::Row => 41,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueType::Null => "NULL",
            ValueType::Char => "CHARACTER",
            ValueType::Varchar => "CHARACTER VARYING",
            ValueType::Boolean => "BOOLEAN",
            ValueType::Integer => "BIGINT",
            ValueType::Double => "DOUBLE PRECISION",
            ValueType::Array => "ARRAY",
            ValueType::Row => "ROW",
        }
    }
}

/// Which operand of a binary operation exposed a NULL first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullSide {
    Left,
    Right,
}

/// An immutable SQL value.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Varchar(String),
    /// Fixed-length text; trailing spaces are not significant.
    Char(String),
    Composite(Composite),
}

impl Value {
    pub fn array(values: Vec<Value>) -> Value {
        Value::Composite(Composite::new(CompositeKind::Array, values))
    }

    pub fn row(values: Vec<Value>) -> Value {
        Value::Composite(Composite::new(CompositeKind::Row, values))
    }

    pub fn varchar(s: impl Into<String>) -> Value {
        Value::Varchar(s.into())
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Integer(_) => ValueType::Integer,
            Value::Double(_) => ValueType::Double,
            Value::Varchar(_) => ValueType::Varchar,
            Value::Char(_) => ValueType::Char,
            Value::Composite(c) => c.value_type(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Three-valued comparison. Returns `Unknown` when a NULL decides the
    /// outcome; fails when the two values cannot be compared at all.
    pub fn compare_with_null(
        &self,
        other: &Value,
        for_equality: bool,
        mode: &CompareMode,
    ) -> DbResult<SqlOrdering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => Ok(SqlOrdering::Unknown),
            (Value::Composite(l), Value::Composite(r)) => l.compare_with_null(r, for_equality, mode),
            (Value::Composite(_), _) | (_, Value::Composite(_)) => Err(type_mismatch(self, other)),
            _ => self.compare_scalar(other, mode).map(SqlOrdering::from),
        }
    }

    /// Total ordering where NULL equals NULL and sorts before everything else.
    /// Used for index ordering and NOT DISTINCT key matching.
    pub fn compare_type_safe(&self, other: &Value, mode: &CompareMode) -> DbResult<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Ok(Ordering::Equal),
            (Value::Null, _) => Ok(Ordering::Less),
            (_, Value::Null) => Ok(Ordering::Greater),
            (Value::Composite(l), Value::Composite(r)) => l.compare_type_safe(r, mode),
            (Value::Composite(_), _) | (_, Value::Composite(_)) => Err(type_mismatch(self, other)),
            _ => self.compare_scalar(other, mode),
        }
    }

    fn compare_scalar(&self, other: &Value, mode: &CompareMode) -> DbResult<Ordering> {
        use Value::*;
        let ord = match (self, other) {
            (Boolean(a), Boolean(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Double(a), Double(b)) => compare_f64(*a, *b),
            (Integer(a), Double(b)) => compare_int_double(*a, *b),
            (Double(a), Integer(b)) => compare_int_double(*b, *a).reverse(),
            (Varchar(a), Varchar(b)) => mode.compare_str(a, b),
            (Char(a), Char(b)) => mode.compare_str(trim_pad(a), trim_pad(b)),
            (Char(a), Varchar(b)) => mode.compare_str(trim_pad(a), b),
            (Varchar(a), Char(b)) => mode.compare_str(a, trim_pad(b)),
            _ => return Err(type_mismatch(self, other)),
        };
        Ok(ord)
    }

    /// True if this value is NULL or holds a NULL anywhere in its structure.
    pub fn contains_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Composite(c) => c.contains_null(),
            _ => false,
        }
    }

    /// Which operand first exposes a NULL, walking composites in order.
    /// `None` when no position decides.
    pub fn first_null_side(&self, other: &Value) -> Option<NullSide> {
        match (self, other) {
            (Value::Null, _) => Some(NullSide::Left),
            (_, Value::Null) => Some(NullSide::Right),
            (Value::Composite(l), Value::Composite(r)) => l.first_null_side(r),
            _ => None,
        }
    }

    pub fn value_with_first_null<'a>(&'a self, other: &'a Value) -> Option<&'a Value> {
        self.first_null_side(other).map(|side| match side {
            NullSide::Left => self,
            NullSide::Right => other,
        })
    }

    /// Structural hash, consistent with equality under every collation.
    pub fn hash_code(&self) -> i32 {
        match self {
            Value::Null => 0,
            Value::Boolean(b) => {
                if *b {
                    1231
                } else {
                    1237
                }
            }
            Value::Integer(i) => hash_i64(*i),
            Value::Double(d) => hash_f64(*d),
            Value::Varchar(s) => hash_str(s),
            Value::Char(s) => hash_str(trim_pad(s)),
            Value::Composite(c) => c.hash_code(),
        }
    }

    /// Estimated memory footprint in bytes.
    pub fn memory(&self) -> usize {
        match self {
            Value::Null | Value::Boolean(_) => 0,
            Value::Integer(_) | Value::Double(_) => MEMORY_NUMBER,
            Value::Varchar(s) | Value::Char(s) => MEMORY_STRING + s.chars().count() * 2,
            Value::Composite(c) => c.memory(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        self.value_type() == other.value_type()
            && matches!(self.compare_type_safe(other, &CompareMode::default()), Ok(Ordering::Equal))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Boolean(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Double(d) => write!(f, "{:?}", d),
            Value::Varchar(s) | Value::Char(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Value::Composite(c) => {
                match c.kind() {
                    CompositeKind::Array => f.write_str("ARRAY [")?,
                    CompositeKind::Row => f.write_str("ROW (")?,
                }
                for (i, v) in c.values().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                match c.kind() {
                    CompositeKind::Array => f.write_str("]"),
                    CompositeKind::Row => f.write_str(")"),
                }
            }
        }
    }
}

pub(crate) fn type_mismatch(left: &Value, right: &Value) -> DbError {
    DbError::TypeMismatch {
        left: left.value_type().name().to_string(),
        right: right.value_type().name().to_string(),
    }
}

fn trim_pad(s: &str) -> &str {
    s.trim_end_matches(' ')
}

// NaN sorts above every number and equals itself; -0.0 equals 0.0.
fn compare_f64(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        _ => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

fn compare_int_double(i: i64, d: f64) -> Ordering {
    if d.is_nan() || d >= TWO_POW_63 {
        return Ordering::Less;
    }
    if d < -TWO_POW_63 {
        return Ordering::Greater;
    }
    let t = d.trunc();
    match i.cmp(&(t as i64)) {
        Ordering::Equal if d > t => Ordering::Less,
        Ordering::Equal if d < t => Ordering::Greater,
        ord => ord,
    }
}

fn hash_i64(i: i64) -> i32 {
    (i ^ ((i as u64) >> 32) as i64) as i32
}

fn hash_f64(d: f64) -> i32 {
    if d.is_finite() && d.fract() == 0.0 && (-TWO_POW_63..TWO_POW_63).contains(&d) {
        return hash_i64(d as i64);
    }
    let bits = if d.is_nan() { f64::NAN.to_bits() } else { d.to_bits() };
    hash_i64(bits as i64)
}

fn hash_str(s: &str) -> i32 {
    s.chars()
        .flat_map(char::to_lowercase)
        .fold(0i32, |h, c| h.wrapping_mul(31).wrapping_add(c as i32))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode() -> CompareMode {
        CompareMode::default()
    }

    #[test]
    fn null_is_unknown_in_both_modes() {
        let one = Value::Integer(1);
        assert_eq!(one.compare_with_null(&Value::Null, true, &mode()).unwrap(), SqlOrdering::Unknown);
        assert_eq!(Value::Null.compare_with_null(&one, false, &mode()).unwrap(), SqlOrdering::Unknown);
    }

    #[test]
    fn integer_and_double_compare_exactly() {
        let m = mode();
        assert_eq!(Value::Integer(1).compare_with_null(&Value::Double(1.0), true, &m).unwrap(), SqlOrdering::Equal);
        assert_eq!(Value::Integer(1).compare_with_null(&Value::Double(1.5), false, &m).unwrap(), SqlOrdering::Less);
        assert_eq!(Value::Integer(-1).compare_with_null(&Value::Double(-1.5), false, &m).unwrap(), SqlOrdering::Greater);
        assert_eq!(Value::Double(f64::INFINITY).compare_with_null(&Value::Integer(i64::MAX), false, &m).unwrap(), SqlOrdering::Greater);
        assert_eq!(Value::Integer(7).hash_code(), Value::Double(7.0).hash_code());
    }

    #[test]
    fn nan_and_negative_zero() {
        let m = mode();
        assert_eq!(Value::Double(f64::NAN).compare_type_safe(&Value::Double(f64::NAN), &m).unwrap(), Ordering::Equal);
        assert_eq!(Value::Double(f64::NAN).compare_type_safe(&Value::Double(1e300), &m).unwrap(), Ordering::Greater);
        assert_eq!(Value::Double(-0.0).compare_type_safe(&Value::Double(0.0), &m).unwrap(), Ordering::Equal);
        assert_eq!(Value::Double(-0.0).hash_code(), Value::Double(0.0).hash_code());
    }

    #[test]
    fn char_ignores_trailing_spaces() {
        let m = mode();
        let padded = Value::Char("ab  ".into());
        assert_eq!(padded.compare_type_safe(&Value::Char("ab".into()), &m).unwrap(), Ordering::Equal);
        assert_eq!(padded.compare_type_safe(&Value::varchar("ab"), &m).unwrap(), Ordering::Equal);
        assert_eq!(padded.hash_code(), Value::varchar("ab").hash_code());
    }

    #[test]
    fn text_hash_agrees_with_ignore_case_equality() {
        let m = CompareMode::new(Collation::IgnoreCase);
        let a = Value::varchar("Straße");
        let b = Value::varchar("STRAßE");
        assert_eq!(a.compare_with_null(&b, true, &m).unwrap(), SqlOrdering::Equal);
        assert_eq!(a.hash_code(), b.hash_code());
    }

    #[test]
    fn scalar_kind_mismatch_is_an_error() {
        let err = Value::Boolean(true).compare_with_null(&Value::Integer(1), true, &mode());
        assert!(matches!(err, Err(DbError::TypeMismatch { .. })));
    }

    #[test]
    fn null_sorts_first_in_type_safe_order() {
        let m = mode();
        assert_eq!(Value::Null.compare_type_safe(&Value::Null, &m).unwrap(), Ordering::Equal);
        assert_eq!(Value::Null.compare_type_safe(&Value::Integer(i64::MIN), &m).unwrap(), Ordering::Less);
    }

    #[test]
    fn display_renders_sql_literals() {
        let v = Value::row(vec![Value::Integer(1), Value::varchar("it's"), Value::array(vec![Value::Null, Value::Boolean(true)])]);
        assert_eq!(v.to_string(), "ROW (1, 'it''s', ARRAY [NULL, TRUE])");
    }

    #[test]
    fn scalar_memory_estimates() {
        assert_eq!(Value::Null.memory(), 0);
        assert_eq!(Value::Integer(5).memory(), 24);
        assert_eq!(Value::varchar("abc").memory(), 100);
    }
}
