pub mod foreign_key;
pub mod key;
pub mod not_null;
pub mod unique;

pub use foreign_key::ForeignKeyConstraint;
pub use key::{KeyPredicate, NullsDistinct};
pub use unique::UniqueConstraint;

use crate::catalog::{Catalog, TableInfo};
use crate::error::{DbError, DbResult};
use crate::storage::row::RowData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintType {
    PrimaryKey,
    Unique,
    ForeignKey,
}

impl ConstraintType {
    pub fn sql_name(&self) -> &'static str {
        match self {
            ConstraintType::PrimaryKey => "PRIMARY KEY",
            ConstraintType::Unique => "UNIQUE",
            ConstraintType::ForeignKey => "FOREIGN KEY",
        }
    }
}

/// Whether a constraint is responsible for its backing index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOwnership {
    Owned,
    Shared,
}

/// Identity every schema object carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectId {
    pub id: u32,
    pub name: String,
    pub schema: String,
}

impl ObjectId {
    pub fn new(id: u32, name: impl Into<String>, schema: impl Into<String>) -> Self {
        ObjectId { id, name: name.into(), schema: schema.into() }
    }
}

/// Behaviour each constraint kind supplies explicitly.
pub trait ConstraintValidator {
    /// Called for every row added to (`new_row`) or removed from (`old_row`)
    /// `table`, before the change is applied.
    fn check_row(
        &self,
        catalog: &Catalog,
        table: &TableInfo,
        old_row: Option<&RowData>,
        new_row: Option<&RowData>,
    ) -> DbResult<()>;

    /// Validate rows already present when the constraint is added.
    fn check_existing_data(&self, catalog: &Catalog) -> DbResult<()>;

    fn create_sql(&self) -> DbResult<String>;

    /// Tear the constraint down: dependents, table link, index, metadata.
    /// The object is invalid afterwards.
    fn remove_children_and_resources(&mut self, catalog: &mut Catalog) -> DbResult<()>;
}

#[derive(Debug, Clone)]
pub enum Constraint {
    Unique(UniqueConstraint),
    ForeignKey(ForeignKeyConstraint),
}

impl Constraint {
    pub fn object_id(&self) -> &ObjectId {
        match self {
            Constraint::Unique(c) => c.object_id(),
            Constraint::ForeignKey(c) => c.object_id(),
        }
    }

    pub fn name(&self) -> &str {
        &self.object_id().name
    }

    pub fn id(&self) -> u32 {
        self.object_id().id
    }

    pub fn constraint_type(&self) -> DbResult<ConstraintType> {
        match self {
            Constraint::Unique(c) => c.constraint_type(),
            Constraint::ForeignKey(c) => c.table().map(|_| ConstraintType::ForeignKey),
        }
    }

    pub fn table(&self) -> DbResult<&str> {
        match self {
            Constraint::Unique(c) => c.table(),
            Constraint::ForeignKey(c) => c.table(),
        }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            Constraint::Unique(c) => c.is_valid(),
            Constraint::ForeignKey(c) => c.is_valid(),
        }
    }

    pub fn uses_index(&self, index: &str) -> DbResult<bool> {
        match self {
            Constraint::Unique(c) => c.uses_index(index),
            Constraint::ForeignKey(c) => c.table().map(|_| false),
        }
    }

    /// Backing index, for constraints that have one.
    pub fn index(&self) -> DbResult<Option<&str>> {
        match self {
            Constraint::Unique(c) => c.index().map(Some),
            Constraint::ForeignKey(c) => c.table().map(|_| None),
        }
    }

    /// Name of the constraint this one depends on, if any.
    pub fn referenced_constraint(&self) -> Option<&str> {
        match self {
            Constraint::Unique(_) => None,
            Constraint::ForeignKey(c) => c.referenced_constraint().ok(),
        }
    }

    pub fn set_index_owner(&mut self) -> DbResult<()> {
        match self {
            Constraint::Unique(c) => c.set_index_owner(),
            Constraint::ForeignKey(c) => Err(DbError::InvalidValue(format!(
                "foreign key {} has no index to own",
                c.object_id().name
            ))),
        }
    }

    pub fn as_unique(&self) -> Option<&UniqueConstraint> {
        match self {
            Constraint::Unique(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_foreign_key(&self) -> Option<&ForeignKeyConstraint> {
        match self {
            Constraint::ForeignKey(c) => Some(c),
            _ => None,
        }
    }
}

impl ConstraintValidator for Constraint {
    fn check_row(
        &self,
        catalog: &Catalog,
        table: &TableInfo,
        old_row: Option<&RowData>,
        new_row: Option<&RowData>,
    ) -> DbResult<()> {
        match self {
            Constraint::Unique(c) => c.check_row(catalog, table, old_row, new_row),
            Constraint::ForeignKey(c) => c.check_row(catalog, table, old_row, new_row),
        }
    }

    fn check_existing_data(&self, catalog: &Catalog) -> DbResult<()> {
        match self {
            Constraint::Unique(c) => c.check_existing_data(catalog),
            Constraint::ForeignKey(c) => c.check_existing_data(catalog),
        }
    }

    fn create_sql(&self) -> DbResult<String> {
        match self {
            Constraint::Unique(c) => c.create_sql(),
            Constraint::ForeignKey(c) => c.create_sql(),
        }
    }

    fn remove_children_and_resources(&mut self, catalog: &mut Catalog) -> DbResult<()> {
        match self {
            Constraint::Unique(c) => c.remove_children_and_resources(catalog),
            Constraint::ForeignKey(c) => c.remove_children_and_resources(catalog),
        }
    }
}
