// src/sql/ast.rs
use crate::constraints::NullsDistinct;
use crate::index::SortOrder;
use crate::storage::row::ColumnType;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ColumnType,
    pub not_null: bool,
}

/// PRIMARY KEY or UNIQUE, declared inline on a column, in the table body or
/// through ALTER TABLE.
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueDef {
    pub name: Option<String>,
    pub comment: Option<String>,
    pub primary_key: bool,
    /// `None` when the statement had no NULLS clause.
    pub nulls_distinct: Option<NullsDistinct>,
    pub columns: Vec<(String, SortOrder)>,
    /// Index named by a trailing `INDEX` clause.
    pub index: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyDef {
    pub name: Option<String>,
    pub comment: Option<String>,
    pub columns: Vec<String>,
    pub ref_table: String,
    /// Empty means the referenced table's primary key.
    pub ref_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableConstraintDef {
    Unique(UniqueDef),
    ForeignKey(ForeignKeyDef),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexDef {
    pub name: String,
    pub table_name: String,
    pub unique: bool,
    pub nulls_distinct: Option<NullsDistinct>,
    pub columns: Vec<(String, SortOrder)>,
}

/// `column = literal`, the only filter DELETE and SELECT understand.
#[derive(Debug, Clone, PartialEq)]
pub struct Equals {
    pub column: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateTable {
        table_name: String,
        columns: Vec<ColumnDef>,
        constraints: Vec<TableConstraintDef>,
        if_not_exists: bool,
    },
    CreateIndex(IndexDef),
    AlterTableAddConstraint {
        table_name: String,
        constraint: TableConstraintDef,
    },
    AlterTableDropConstraint {
        table_name: String,
        constraint_name: String,
        if_exists: bool,
    },
    DropTable {
        table_name: String,
        if_exists: bool,
    },
    DropIndex {
        index_name: String,
        if_exists: bool,
    },
    Insert {
        table_name: String,
        rows: Vec<Vec<Value>>,
    },
    Delete {
        table_name: String,
        selection: Option<Equals>,
    },
    Select {
        table_name: String,
        selection: Option<Equals>,
    },
    /// Write the catalog as a replayable script.
    Script { path: String },
    /// Replay a script into the current catalog.
    RunScript { path: String },
    Exit,
}
