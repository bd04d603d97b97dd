use crate::error::{DbError, DbResult};
use crate::value::{CompareMode, SqlOrdering, Value};
use std::cmp::Ordering;

/// Whether NULL-containing key tuples of a unique constraint may repeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullsDistinct {
    /// A key holding any NULL never collides with another key (SQL default).
    #[default]
    Distinct,
    /// NULL is treated as a value equal to itself.
    NotDistinct,
}

impl NullsDistinct {
    pub fn sql(&self) -> &'static str {
        match self {
            NullsDistinct::Distinct => "NULLS DISTINCT",
            NullsDistinct::NotDistinct => "NULLS NOT DISTINCT",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().replace('_', " ").as_str() {
            "DISTINCT" | "NULLS DISTINCT" => Some(NullsDistinct::Distinct),
            "NOT DISTINCT" | "NULLS NOT DISTINCT" => Some(NullsDistinct::NotDistinct),
            _ => None,
        }
    }
}

/// Equality test an index applies to decide whether two key tuples are
/// duplicates. Holds no mutable state and may be shared between any number
/// of concurrent lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPredicate {
    nulls_distinct: NullsDistinct,
    mode: CompareMode,
}

impl KeyPredicate {
    pub fn new(nulls_distinct: NullsDistinct, mode: CompareMode) -> Self {
        KeyPredicate { nulls_distinct, mode }
    }

    pub fn nulls_distinct(&self) -> NullsDistinct {
        self.nulls_distinct
    }

    pub fn compare_mode(&self) -> &CompareMode {
        &self.mode
    }

    /// True when `key` cannot collide with any other key under this predicate.
    pub fn never_conflicts(&self, key: &[Value]) -> bool {
        self.nulls_distinct == NullsDistinct::Distinct && key.iter().any(Value::contains_null)
    }

    pub fn conflicts(&self, a: &[Value], b: &[Value]) -> DbResult<bool> {
        if a.len() != b.len() {
            return Err(DbError::ColumnCountMismatch);
        }
        if self.never_conflicts(a) || self.never_conflicts(b) {
            return Ok(false);
        }
        for (x, y) in a.iter().zip(b) {
            let equal = match self.nulls_distinct {
                NullsDistinct::Distinct => x.compare_with_null(y, true, &self.mode)? == SqlOrdering::Equal,
                NullsDistinct::NotDistinct => x.compare_type_safe(y, &self.mode)? == Ordering::Equal,
            };
            if !equal {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
