use std::cmp::Ordering;
use std::sync::{Arc, OnceLock};

use crate::error::{DbError, DbResult};
use super::{CompareMode, NullSide, SqlOrdering, Value, ValueType, MEMORY_POINTER};

const MEMORY_COMPOSITE: usize = 72;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositeKind {
    Array,
    Row,
}

/// ARRAY or ROW value: a fixed sequence of child values.
///
/// Children are never reassigned after construction. Clones share the child
/// slice. The hash is computed once on first use; `OnceLock` guarantees a
/// concurrent reader sees either nothing or the fully computed value.
#[derive(Debug, Clone)]
pub struct Composite {
    kind: CompositeKind,
    values: Arc<[Value]>,
    hash: OnceLock<i32>,
}

impl Composite {
    pub fn new(kind: CompositeKind, values: Vec<Value>) -> Self {
        Composite { kind, values: values.into(), hash: OnceLock::new() }
    }

    pub fn kind(&self) -> CompositeKind {
        self.kind
    }

    pub fn value_type(&self) -> ValueType {
        match self.kind {
            CompositeKind::Array => ValueType::Array,
            CompositeKind::Row => ValueType::Row,
        }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn hash_code(&self) -> i32 {
        *self.hash.get_or_init(|| {
            self.values
                .iter()
                .fold(self.value_type().code(), |h, v| h.wrapping_mul(31).wrapping_add(v.hash_code()))
        })
    }

    fn check_comparable(&self, other: &Composite) -> DbResult<()> {
        if self.kind != other.kind {
            return Err(DbError::TypeMismatch {
                left: self.value_type().name().to_string(),
                right: other.value_type().name().to_string(),
            });
        }
        if self.kind == CompositeKind::Row && self.len() != other.len() {
            return Err(DbError::ColumnCountMismatch);
        }
        Ok(())
    }

    pub fn compare_with_null(
        &self,
        other: &Composite,
        for_equality: bool,
        mode: &CompareMode,
    ) -> DbResult<SqlOrdering> {
        self.check_comparable(other)?;
        if for_equality {
            // arrays of different length are simply not equal
            if self.len() != other.len() {
                return Ok(SqlOrdering::Greater);
            }
            let mut has_null = false;
            for (l, r) in self.values.iter().zip(other.values.iter()) {
                match l.compare_with_null(r, true, mode)? {
                    SqlOrdering::Equal => {}
                    SqlOrdering::Unknown => has_null = true,
                    definite => return Ok(definite),
                }
            }
            return Ok(if has_null { SqlOrdering::Unknown } else { SqlOrdering::Equal });
        }
        for (l, r) in self.values.iter().zip(other.values.iter()) {
            match l.compare_with_null(r, false, mode)? {
                SqlOrdering::Equal => {}
                decided => return Ok(decided),
            }
        }
        Ok(self.len().cmp(&other.len()).into())
    }

    pub fn compare_type_safe(&self, other: &Composite, mode: &CompareMode) -> DbResult<Ordering> {
        self.check_comparable(other)?;
        for (l, r) in self.values.iter().zip(other.values.iter()) {
            match l.compare_type_safe(r, mode)? {
                Ordering::Equal => {}
                decided => return Ok(decided),
            }
        }
        Ok(self.len().cmp(&other.len()))
    }

    pub fn contains_null(&self) -> bool {
        self.values.iter().any(Value::contains_null)
    }

    pub fn first_null_side(&self, other: &Composite) -> Option<NullSide> {
        self.values
            .iter()
            .zip(other.values.iter())
            .find_map(|(l, r)| l.first_null_side(r))
    }

    pub fn memory(&self) -> usize {
        MEMORY_COMPOSITE
            + self.values.len() * MEMORY_POINTER
            + self.values.iter().map(Value::memory).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(vals: &[i64]) -> Vec<Value> {
        vals.iter().map(|v| Value::Integer(*v)).collect()
    }

    #[test]
    fn hash_is_order_sensitive_and_stable() {
        let a = Composite::new(CompositeKind::Array, ints(&[1, 2]));
        let b = Composite::new(CompositeKind::Array, ints(&[2, 1]));
        assert_ne!(a.hash_code(), b.hash_code());
        assert_eq!(a.hash_code(), a.hash_code());
        assert_eq!(a.hash_code(), a.clone().hash_code());
    }

    #[test]
    fn array_and_row_hash_differently() {
        let a = Composite::new(CompositeKind::Array, ints(&[1, 2]));
        let r = Composite::new(CompositeKind::Row, ints(&[1, 2]));
        assert_ne!(a.hash_code(), r.hash_code());
    }

    #[test]
    fn empty_array_hash_is_its_type_code() {
        let empty = Composite::new(CompositeKind::Array, vec![]);
        assert_eq!(empty.hash_code(), 40);
        assert!(empty.hash.get().is_some());
    }

    #[test]
    fn later_inequality_overrides_earlier_null() {
        let m = CompareMode::default();
        let a = Composite::new(CompositeKind::Row, vec![Value::Null, Value::Integer(1)]);
        let b = Composite::new(CompositeKind::Row, vec![Value::Integer(5), Value::Integer(2)]);
        assert_eq!(a.compare_with_null(&b, true, &m).unwrap(), SqlOrdering::Less);
    }

    #[test]
    fn first_null_side_walks_prefix() {
        let a = Composite::new(CompositeKind::Row, vec![Value::Integer(1), Value::Integer(2)]);
        let b = Composite::new(CompositeKind::Row, vec![Value::Integer(1), Value::Null]);
        assert_eq!(a.first_null_side(&b), Some(NullSide::Right));
        assert_eq!(b.first_null_side(&a), Some(NullSide::Left));
        assert_eq!(a.first_null_side(&a), None);
    }

    #[test]
    fn memory_counts_slots_and_children() {
        let a = Composite::new(CompositeKind::Array, ints(&[1, 2, 3]));
        assert_eq!(a.memory(), 72 + 3 * 8 + 3 * 24);
        let nested = Composite::new(CompositeKind::Array, vec![Value::Composite(a.clone()), Value::Null]);
        assert_eq!(nested.memory(), 72 + 2 * 8 + a.memory());
    }
}
