use std::cmp::Ordering;

use log::debug;

use crate::constraints::{KeyPredicate, NullsDistinct};
use crate::error::{DbError, DbResult};
use crate::storage::row::RowId;
use crate::value::{CompareMode, Value, MEMORY_POINTER};
use super::{Index, IndexColumn, IndexOwner, SortOrder};

#[derive(Debug, Clone)]
struct Entry {
    key: Vec<Value>,
    row: RowId,
}

/// Index held in memory as a vector of `(key, row)` entries kept sorted by
/// key (NULLs first, per-column direction) and then by row id.
#[derive(Debug)]
pub struct MemoryIndex {
    name: String,
    schema: String,
    table: String,
    columns: Vec<IndexColumn>,
    unique: bool,
    nulls_distinct: NullsDistinct,
    owner: IndexOwner,
    mode: CompareMode,
    entries: Vec<Entry>,
    dropped: bool,
}

impl MemoryIndex {
    pub fn new(
        name: &str,
        schema: &str,
        table: &str,
        columns: Vec<IndexColumn>,
        unique: bool,
        nulls_distinct: NullsDistinct,
        owner: IndexOwner,
    ) -> Self {
        MemoryIndex {
            name: name.to_string(),
            schema: schema.to_string(),
            table: table.to_string(),
            columns,
            unique,
            nulls_distinct,
            owner,
            mode: CompareMode::default(),
            entries: Vec::new(),
            dropped: false,
        }
    }

    pub fn with_compare_mode(mut self, mode: CompareMode) -> Self {
        self.mode = mode;
        self
    }

    fn check_live(&self) -> DbResult<()> {
        if self.dropped {
            return Err(DbError::Invalidated(self.name.clone()));
        }
        Ok(())
    }

    fn compare_keys(&self, a: &[Value], b: &[Value]) -> DbResult<Ordering> {
        for ((col, x), y) in self.columns.iter().zip(a).zip(b) {
            let ord = x.compare_type_safe(y, &self.mode)?;
            let ord = match col.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return Ok(ord);
            }
        }
        Ok(Ordering::Equal)
    }

    /// First entry whose key is not less than `key`.
    fn lower_bound(&self, key: &[Value]) -> DbResult<usize> {
        let (mut lo, mut hi) = (0, self.entries.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.compare_keys(&self.entries[mid].key, key)? == Ordering::Less {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        Ok(lo)
    }

}

impl Index for MemoryIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> &str {
        &self.schema
    }

    fn table_name(&self) -> &str {
        &self.table
    }

    fn columns(&self) -> &[IndexColumn] {
        &self.columns
    }

    fn is_unique(&self) -> bool {
        self.unique
    }

    fn nulls_distinct(&self) -> NullsDistinct {
        self.nulls_distinct
    }

    fn owner(&self) -> &IndexOwner {
        &self.owner
    }

    fn locate_conflict(&self, key: &[Value], predicate: &KeyPredicate) -> DbResult<Option<RowId>> {
        self.check_live()?;
        if key.len() != self.columns.len() {
            return Err(DbError::ColumnCountMismatch);
        }
        if predicate.never_conflicts(key) {
            return Ok(None);
        }
        // Candidates are the entries ordered equal to `key`; NULL sorts equal
        // to NULL here, so the predicate makes the final call.
        let mut pos = self.lower_bound(key)?;
        while pos < self.entries.len() {
            let entry = &self.entries[pos];
            if self.compare_keys(&entry.key, key)? != Ordering::Equal {
                break;
            }
            if predicate.conflicts(&entry.key, key)? {
                return Ok(Some(entry.row));
            }
            pos += 1;
        }
        Ok(None)
    }

    fn add(&mut self, key: Vec<Value>, row: RowId) -> DbResult<()> {
        self.check_live()?;
        if key.len() != self.columns.len() {
            return Err(DbError::ColumnCountMismatch);
        }
        let mut pos = self.lower_bound(&key)?;
        while pos < self.entries.len()
            && self.compare_keys(&self.entries[pos].key, &key)? == Ordering::Equal
            && self.entries[pos].row < row
        {
            pos += 1;
        }
        self.entries.insert(pos, Entry { key, row });
        Ok(())
    }

    fn remove(&mut self, key: &[Value], row: RowId) -> DbResult<bool> {
        self.check_live()?;
        let mut pos = self.lower_bound(key)?;
        while pos < self.entries.len() && self.compare_keys(&self.entries[pos].key, key)? == Ordering::Equal {
            if self.entries[pos].row == row {
                self.entries.remove(pos);
                return Ok(true);
            }
            pos += 1;
        }
        Ok(false)
    }

    fn row_count(&self) -> usize {
        self.entries.len()
    }

    fn drop_index(&mut self) {
        debug!("dropping index {} ({} entries)", self.name, self.entries.len());
        self.entries = Vec::new();
        self.dropped = true;
    }

    fn transfer_ownership(&mut self, owner: IndexOwner) {
        debug!("index {}: ownership {} -> {}", self.name, self.owner, owner);
        self.owner = owner;
    }

    fn memory(&self) -> usize {
        self.entries
            .iter()
            .map(|e| MEMORY_POINTER * 2 + e.key.iter().map(Value::memory).sum::<usize>())
            .sum()
    }
}
