use std::cmp::Ordering;

/// Outcome of a three-valued SQL comparison.
///
/// `Unknown` is produced whenever a NULL decides the result; it is never
/// confused with a real ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlOrdering {
    Less,
    Equal,
    Greater,
    Unknown,
}

impl SqlOrdering {
    /// Integer form used by sort operators; `Unknown` maps outside -1..=1.
    pub const UNKNOWN: i32 = i32::MIN;

    pub fn as_i32(self) -> i32 {
        match self {
            SqlOrdering::Less => -1,
            SqlOrdering::Equal => 0,
            SqlOrdering::Greater => 1,
            SqlOrdering::Unknown => Self::UNKNOWN,
        }
    }

    pub fn is_unknown(self) -> bool {
        self == SqlOrdering::Unknown
    }

    pub fn is_definite(self) -> bool {
        !self.is_unknown()
    }

    pub fn reverse(self) -> Self {
        match self {
            SqlOrdering::Less => SqlOrdering::Greater,
            SqlOrdering::Greater => SqlOrdering::Less,
            other => other,
        }
    }
}

impl From<Ordering> for SqlOrdering {
    fn from(ord: Ordering) -> Self {
        match ord {
            Ordering::Less => SqlOrdering::Less,
            Ordering::Equal => SqlOrdering::Equal,
            Ordering::Greater => SqlOrdering::Greater,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Collation {
    #[default]
    Binary,
    IgnoreCase,
}

impl Collation {
    pub fn name(&self) -> &'static str {
        match self {
            Collation::Binary => "BINARY",
            Collation::IgnoreCase => "IGNORE_CASE",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "BINARY" | "OFF" => Some(Collation::Binary),
            "IGNORE_CASE" | "IGNORECASE" => Some(Collation::IgnoreCase),
            _ => None,
        }
    }
}

/// Ordering context handed to every comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompareMode {
    pub collation: Collation,
}

impl CompareMode {
    pub fn new(collation: Collation) -> Self {
        CompareMode { collation }
    }

    pub fn compare_str(&self, a: &str, b: &str) -> Ordering {
        match self.collation {
            Collation::Binary => a.cmp(b),
            Collation::IgnoreCase => a
                .chars()
                .flat_map(char::to_lowercase)
                .cmp(b.chars().flat_map(char::to_lowercase)),
        }
    }
}
