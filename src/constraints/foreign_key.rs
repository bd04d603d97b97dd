use log::info;

use crate::catalog::{Catalog, TableInfo};
use crate::error::{DbError, DbResult};
use crate::index::{write_columns, IndexColumn};
use crate::sql::ident::{quote_qualified, quote_string};
use crate::storage::row::RowData;
use crate::value::{CompareMode, SqlOrdering, Value};
use super::{ConstraintValidator, KeyPredicate, NullsDistinct, ObjectId};

#[derive(Debug, Clone, PartialEq)]
struct ForeignKeyBinding {
    table: String,
    columns: Vec<IndexColumn>,
    ref_table: String,
    ref_columns: Vec<IndexColumn>,
    ref_constraint: String,
}

/// FOREIGN KEY referencing a primary key or unique constraint. Matching is
/// MATCH SIMPLE: a child key holding any NULL is not checked. Deleting a
/// referenced parent row is refused.
#[derive(Debug, Clone)]
pub struct ForeignKeyConstraint {
    id: ObjectId,
    comment: Option<String>,
    binding: Option<ForeignKeyBinding>,
}

impl ForeignKeyConstraint {
    pub fn new(
        id: ObjectId,
        table: &str,
        columns: Vec<IndexColumn>,
        ref_table: &str,
        ref_columns: Vec<IndexColumn>,
        ref_constraint: &str,
    ) -> Self {
        ForeignKeyConstraint {
            id,
            comment: None,
            binding: Some(ForeignKeyBinding {
                table: table.to_string(),
                columns,
                ref_table: ref_table.to_string(),
                ref_columns,
                ref_constraint: ref_constraint.to_string(),
            }),
        }
    }

    pub fn with_comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment;
        self
    }

    fn binding(&self) -> DbResult<&ForeignKeyBinding> {
        self.binding.as_ref().ok_or_else(|| DbError::Invalidated(self.id.name.clone()))
    }

    pub fn object_id(&self) -> &ObjectId {
        &self.id
    }

    pub fn is_valid(&self) -> bool {
        self.binding.is_some()
    }

    pub fn table(&self) -> DbResult<&str> {
        Ok(&self.binding()?.table)
    }

    pub fn columns(&self) -> DbResult<&[IndexColumn]> {
        Ok(&self.binding()?.columns)
    }

    pub fn ref_table(&self) -> DbResult<&str> {
        Ok(&self.binding()?.ref_table)
    }

    pub fn ref_columns(&self) -> DbResult<&[IndexColumn]> {
        Ok(&self.binding()?.ref_columns)
    }

    pub fn referenced_constraint(&self) -> DbResult<&str> {
        Ok(&self.binding()?.ref_constraint)
    }

    fn child_key(&self, row: &RowData) -> DbResult<Vec<Value>> {
        let positions: Vec<usize> = self.binding()?.columns.iter().map(|c| c.position).collect();
        Ok(row.project(&positions))
    }

    fn check_parent_exists(&self, catalog: &Catalog, row: &RowData) -> DbResult<()> {
        let binding = self.binding()?;
        let key = self.child_key(row)?;
        if key.iter().any(Value::contains_null) {
            return Ok(());
        }
        let parent = catalog.get_constraint(&binding.ref_constraint)?;
        let index_name = parent
            .index()?
            .ok_or_else(|| DbError::ConstraintNotFound(binding.ref_constraint.clone()))?;
        let predicate = KeyPredicate::new(NullsDistinct::NotDistinct, catalog.config().compare_mode);
        if catalog.get_index(index_name)?.locate_conflict(&key, &predicate)?.is_none() {
            return Err(DbError::ForeignKeyViolation(format!(
                "{}: no row in {} with ({}) = ({})",
                self.id.name,
                binding.ref_table,
                write_columns(&binding.ref_columns),
                render_key(&key)
            )));
        }
        Ok(())
    }

    fn check_no_children(&self, catalog: &Catalog, old_row: &RowData, new_row: Option<&RowData>) -> DbResult<()> {
        let binding = self.binding()?;
        let mode = catalog.config().compare_mode;
        let ref_positions: Vec<usize> = binding.ref_columns.iter().map(|c| c.position).collect();
        let parent_key = old_row.project(&ref_positions);
        if let Some(new_row) = new_row {
            if keys_equal(&parent_key, &new_row.project(&ref_positions), &mode)? {
                return Ok(());
            }
        }
        let child = catalog.get_table(&binding.table)?;
        for (_, data) in child.rows() {
            if keys_equal(&self.child_key(data)?, &parent_key, &mode)? {
                return Err(DbError::ForeignKeyViolation(format!(
                    "{}: ({}) = ({}) is still referenced from {}",
                    self.id.name,
                    write_columns(&binding.ref_columns),
                    render_key(&parent_key),
                    binding.table
                )));
            }
        }
        Ok(())
    }

    fn invalidate(&mut self) {
        self.binding = None;
    }
}

fn keys_equal(a: &[Value], b: &[Value], mode: &CompareMode) -> DbResult<bool> {
    for (x, y) in a.iter().zip(b) {
        if x.compare_with_null(y, true, mode)? != SqlOrdering::Equal {
            return Ok(false);
        }
    }
    Ok(true)
}

pub(crate) fn render_key(key: &[Value]) -> String {
    key.iter().map(Value::to_string).collect::<Vec<_>>().join(", ")
}

impl ConstraintValidator for ForeignKeyConstraint {
    fn check_row(
        &self,
        catalog: &Catalog,
        table: &TableInfo,
        old_row: Option<&RowData>,
        new_row: Option<&RowData>,
    ) -> DbResult<()> {
        let binding = self.binding()?;
        if table.name == binding.table {
            if let Some(row) = new_row {
                self.check_parent_exists(catalog, row)?;
            }
        }
        if table.name == binding.ref_table {
            if let Some(row) = old_row {
                self.check_no_children(catalog, row, new_row)?;
            }
        }
        Ok(())
    }

    fn check_existing_data(&self, catalog: &Catalog) -> DbResult<()> {
        let child = catalog.get_table(self.table()?)?;
        for (_, data) in child.rows() {
            self.check_parent_exists(catalog, data)?;
        }
        Ok(())
    }

    fn create_sql(&self) -> DbResult<String> {
        let binding = self.binding()?;
        let mut sql = format!(
            "ALTER TABLE {} ADD CONSTRAINT {}",
            quote_qualified(&self.id.schema, &binding.table),
            quote_qualified(&self.id.schema, &self.id.name)
        );
        if let Some(comment) = &self.comment {
            sql.push_str(" COMMENT ");
            sql.push_str(&quote_string(comment));
        }
        sql.push_str(&format!(
            " FOREIGN KEY({}) REFERENCES {}({})",
            write_columns(&binding.columns),
            quote_qualified(&self.id.schema, &binding.ref_table),
            write_columns(&binding.ref_columns)
        ));
        Ok(sql)
    }

    fn remove_children_and_resources(&mut self, catalog: &mut Catalog) -> DbResult<()> {
        let binding = self.binding()?.clone();
        catalog.detach_constraint(&binding.table, &self.id.name);
        catalog.detach_constraint(&binding.ref_table, &self.id.name);
        catalog.remove_meta(self.id.id);
        info!("foreign key {} on {} removed", self.id.name, binding.table);
        self.invalidate();
        Ok(())
    }
}
