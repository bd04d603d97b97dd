pub mod memory;

pub use memory::MemoryIndex;

use std::fmt;

use crate::constraints::{KeyPredicate, NullsDistinct};
use crate::error::DbResult;
use crate::sql::ident::{quote_identifier, quote_qualified};
use crate::storage::row::RowId;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// One key column of an index or constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexColumn {
    pub name: String,
    /// Position of the column in its table.
    pub position: usize,
    pub order: SortOrder,
}

impl IndexColumn {
    pub fn new(name: impl Into<String>, position: usize, order: SortOrder) -> Self {
        IndexColumn { name: name.into(), position, order }
    }

    pub fn sql(&self) -> String {
        match self.order {
            SortOrder::Asc => quote_identifier(&self.name),
            SortOrder::Desc => format!("{} DESC", quote_identifier(&self.name)),
        }
    }
}

/// Render `"A", "B" DESC`.
pub fn write_columns(columns: &[IndexColumn]) -> String {
    columns.iter().map(IndexColumn::sql).collect::<Vec<_>>().join(", ")
}

/// Object responsible for an index's lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOwner {
    /// Created on its own with CREATE INDEX; lives until dropped or the table goes.
    Table,
    /// Created for (or handed over to) the named constraint.
    Constraint(String),
}

impl fmt::Display for IndexOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexOwner::Table => f.write_str("table"),
            IndexOwner::Constraint(name) => write!(f, "constraint {}", name),
        }
    }
}

/// A physical index as seen by the constraint layer.
///
/// Duplicate detection is delegated here: the caller supplies the
/// [`KeyPredicate`] that decides whether two key tuples collide.
pub trait Index: fmt::Debug {
    fn name(&self) -> &str;

    fn schema(&self) -> &str;

    fn table_name(&self) -> &str;

    fn columns(&self) -> &[IndexColumn];

    fn is_unique(&self) -> bool;

    /// NULL handling the index was created with; meaningful for unique indexes.
    fn nulls_distinct(&self) -> NullsDistinct;

    fn owner(&self) -> &IndexOwner;

    /// Find a stored row whose key collides with `key` under `predicate`.
    fn locate_conflict(&self, key: &[Value], predicate: &KeyPredicate) -> DbResult<Option<RowId>>;

    fn add(&mut self, key: Vec<Value>, row: RowId) -> DbResult<()>;

    fn remove(&mut self, key: &[Value], row: RowId) -> DbResult<bool>;

    fn row_count(&self) -> usize;

    /// Release all storage. The index must not be used afterwards.
    fn drop_index(&mut self);

    fn transfer_ownership(&mut self, owner: IndexOwner);

    fn memory(&self) -> usize;

    fn sql(&self) -> String {
        quote_qualified(self.schema(), self.name())
    }

    fn create_sql(&self) -> String {
        let kind = if self.is_unique() {
            format!("UNIQUE {} INDEX", self.nulls_distinct().sql())
        } else {
            "INDEX".to_string()
        };
        format!(
            "CREATE {} {} ON {}({})",
            kind,
            self.sql(),
            quote_qualified(self.schema(), self.table_name()),
            write_columns(self.columns())
        )
    }
}
