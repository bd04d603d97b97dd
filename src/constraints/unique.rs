use log::{debug, info};

use crate::catalog::{Catalog, TableInfo};
use crate::config::SqlFormat;
use crate::error::{DbError, DbResult};
use crate::index::{write_columns, IndexColumn};
use crate::sql::ident::{quote_qualified, quote_string};
use crate::storage::row::RowData;
use crate::value::CompareMode;
use super::{ConstraintType, ConstraintValidator, IndexOwnership, KeyPredicate, NullsDistinct, ObjectId};

#[derive(Debug, Clone, PartialEq)]
struct UniqueBinding {
    table: String,
    columns: Vec<IndexColumn>,
    index: String,
    ownership: IndexOwnership,
}

/// A PRIMARY KEY or UNIQUE constraint. Always backed by a unique index,
/// which does the actual duplicate detection.
///
/// Once torn down the constraint is invalid and every accessor that needs
/// its binding fails with [`DbError::Invalidated`].
#[derive(Debug, Clone)]
pub struct UniqueConstraint {
    id: ObjectId,
    comment: Option<String>,
    primary_key: bool,
    nulls_distinct: NullsDistinct,
    format: SqlFormat,
    binding: Option<UniqueBinding>,
}

impl UniqueConstraint {
    pub fn new(
        id: ObjectId,
        table: &str,
        primary_key: bool,
        columns: Vec<IndexColumn>,
        index: &str,
        ownership: IndexOwnership,
        nulls_distinct: NullsDistinct,
    ) -> Self {
        UniqueConstraint {
            id,
            comment: None,
            primary_key,
            nulls_distinct,
            format: SqlFormat::default(),
            binding: Some(UniqueBinding {
                table: table.to_string(),
                columns,
                index: index.to_string(),
                ownership,
            }),
        }
    }

    pub fn with_comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment;
        self
    }

    pub fn with_format(mut self, format: SqlFormat) -> Self {
        self.format = format;
        self
    }

    fn binding(&self) -> DbResult<&UniqueBinding> {
        self.binding.as_ref().ok_or_else(|| DbError::Invalidated(self.id.name.clone()))
    }

    pub fn object_id(&self) -> &ObjectId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.id.name
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn is_primary_key(&self) -> DbResult<bool> {
        self.binding()?;
        Ok(self.primary_key)
    }

    pub fn constraint_type(&self) -> DbResult<ConstraintType> {
        Ok(if self.is_primary_key()? { ConstraintType::PrimaryKey } else { ConstraintType::Unique })
    }

    pub fn nulls_distinct(&self) -> DbResult<NullsDistinct> {
        self.binding()?;
        Ok(self.nulls_distinct)
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

    pub fn index(&self) -> DbResult<&str> {
        Ok(&self.binding()?.index)
    }

    pub fn uses_index(&self, index: &str) -> DbResult<bool> {
        Ok(self.binding()?.index == index)
    }

    pub fn is_index_owner(&self) -> DbResult<bool> {
        Ok(self.binding()?.ownership == IndexOwnership::Owned)
    }

    /// Take over responsibility for the backing index.
    pub fn set_index_owner(&mut self) -> DbResult<()> {
        let name = self.id.name.clone();
        let binding = self.binding.as_mut().ok_or(DbError::Invalidated(name))?;
        binding.ownership = IndexOwnership::Owned;
        Ok(())
    }

    pub fn referenced_columns(&self) -> DbResult<Vec<&str>> {
        Ok(self.binding()?.columns.iter().map(|c| c.name.as_str()).collect())
    }

    /// Checked before the row is written.
    pub fn is_before(&self) -> bool {
        true
    }

    pub fn rebuild(&self) -> DbResult<()> {
        self.binding().map(|_| ())
    }

    /// Predicate the backing index uses to detect duplicates. Primary keys
    /// never hold NULL, so the policy only matters for UNIQUE.
    pub fn key_predicate(&self, mode: CompareMode) -> DbResult<KeyPredicate> {
        let policy = if self.is_primary_key()? { NullsDistinct::NotDistinct } else { self.nulls_distinct };
        Ok(KeyPredicate::new(policy, mode))
    }

    /// Render the ALTER TABLE statement that recreates this constraint on
    /// `for_table`. The backing index is named only when `internal_index` is
    /// set and the target is the constraint's own table. A shared index is
    /// named too, so replay binds the same one.
    pub fn create_sql_for_copy(&self, for_table: &str, quoted_name: &str, internal_index: bool) -> DbResult<String> {
        let binding = self.binding()?;
        let mut sql = format!(
            "ALTER TABLE {} ADD CONSTRAINT {}",
            quote_qualified(&self.id.schema, for_table),
            quoted_name
        );
        if let Some(comment) = &self.comment {
            sql.push_str(" COMMENT ");
            sql.push_str(&quote_string(comment));
        }
        sql.push(' ');
        sql.push_str(self.constraint_type()?.sql_name());
        if !self.primary_key {
            if self.format.emits_nulls_clause(self.nulls_distinct) {
                sql.push(' ');
                sql.push_str(self.nulls_distinct.sql());
            }
            sql.push(' ');
        }
        sql.push('(');
        sql.push_str(&write_columns(&binding.columns));
        sql.push(')');
        if internal_index && for_table == binding.table {
            sql.push_str(" INDEX ");
            sql.push_str(&quote_qualified(&self.id.schema, &binding.index));
        }
        Ok(sql)
    }

    pub fn create_sql_without_indexes(&self) -> DbResult<String> {
        let table = self.table()?;
        self.create_sql_for_copy(table, &quote_qualified(&self.id.schema, &self.id.name), false)
    }

    /// Attribute equality, ignoring the object id.
    pub fn same_definition(&self, other: &UniqueConstraint) -> bool {
        self.id.name == other.id.name
            && self.id.schema == other.id.schema
            && self.comment == other.comment
            && self.primary_key == other.primary_key
            && self.nulls_distinct == other.nulls_distinct
            && self.binding == other.binding
    }

    fn invalidate(&mut self) {
        self.binding = None;
    }
}

impl ConstraintValidator for UniqueConstraint {
    fn check_row(
        &self,
        _catalog: &Catalog,
        _table: &TableInfo,
        _old_row: Option<&RowData>,
        _new_row: Option<&RowData>,
    ) -> DbResult<()> {
        // the unique index check is enough
        self.binding().map(|_| ())
    }

    fn check_existing_data(&self, _catalog: &Catalog) -> DbResult<()> {
        // duplicates already surfaced when the unique index was built
        self.binding().map(|_| ())
    }

    fn create_sql(&self) -> DbResult<String> {
        let table = self.table()?;
        self.create_sql_for_copy(table, &quote_qualified(&self.id.schema, &self.id.name), true)
    }

    fn remove_children_and_resources(&mut self, catalog: &mut Catalog) -> DbResult<()> {
        let binding = self.binding()?.clone();
        if binding.ownership == IndexOwnership::Owned && !catalog.has_index(&binding.index) {
            return Err(DbError::IndexNotFound(binding.index));
        }
        let dependents = catalog.constraints_referencing(&binding.table, &self.id.name)?;
        for dependent in dependents {
            debug!("constraint {}: removing dependent {}", self.id.name, dependent);
            catalog.drop_constraint(&dependent)?;
        }
        catalog.detach_constraint(&binding.table, &self.id.name);
        if binding.ownership == IndexOwnership::Owned {
            catalog.remove_index_or_transfer_ownership(&binding.table, &binding.index)?;
        }
        catalog.remove_meta(self.id.id);
        info!("constraint {} on {} removed", self.id.name, binding.table);
        self.invalidate();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NullsClauseStyle;
    use crate::index::SortOrder;

    fn unique(primary_key: bool, ownership: IndexOwnership, nulls: NullsDistinct) -> UniqueConstraint {
        UniqueConstraint::new(
            ObjectId::new(3, "UQ_T", "PUBLIC"),
            "T",
            primary_key,
            vec![IndexColumn::new("A", 0, SortOrder::Asc), IndexColumn::new("B", 1, SortOrder::Desc)],
            "UQ_T_INDEX",
            ownership,
            nulls,
        )
    }

    #[test]
    fn uses_exactly_its_index() {
        let c = unique(false, IndexOwnership::Owned, NullsDistinct::Distinct);
        assert!(c.uses_index("UQ_T_INDEX").unwrap());
        assert!(!c.uses_index("OTHER").unwrap());
        assert_eq!(c.constraint_type().unwrap(), ConstraintType::Unique);
        assert_eq!(c.referenced_columns().unwrap(), vec!["A", "B"]);
    }

    #[test]
    fn unique_sql_with_owned_index() {
        let c = unique(false, IndexOwnership::Owned, NullsDistinct::NotDistinct);
        assert_eq!(
            c.create_sql().unwrap(),
            "ALTER TABLE \"PUBLIC\".\"T\" ADD CONSTRAINT \"PUBLIC\".\"UQ_T\" UNIQUE NULLS NOT DISTINCT (\"A\", \"B\" DESC) INDEX \"PUBLIC\".\"UQ_T_INDEX\""
        );
        assert_eq!(
            c.create_sql_without_indexes().unwrap(),
            "ALTER TABLE \"PUBLIC\".\"T\" ADD CONSTRAINT \"PUBLIC\".\"UQ_T\" UNIQUE NULLS NOT DISTINCT (\"A\", \"B\" DESC)"
        );
    }

    #[test]
    fn primary_key_sql_has_no_nulls_clause() {
        let c = unique(true, IndexOwnership::Shared, NullsDistinct::Distinct).with_comment(Some("main key".into()));
        assert_eq!(
            c.create_sql().unwrap(),
            "ALTER TABLE \"PUBLIC\".\"T\" ADD CONSTRAINT \"PUBLIC\".\"UQ_T\" COMMENT 'main key' PRIMARY KEY(\"A\", \"B\" DESC) INDEX \"PUBLIC\".\"UQ_T_INDEX\""
        );
    }

    #[test]
    fn nulls_clause_omitted_when_default_and_configured_so() {
        let format = SqlFormat { nulls_clause: NullsClauseStyle::IfNonDefault, default_nulls_distinct: NullsDistinct::Distinct };
        let c = unique(false, IndexOwnership::Shared, NullsDistinct::Distinct).with_format(format);
        assert!(c.create_sql().unwrap().contains(" UNIQUE (\"A\", \"B\" DESC)"));
        assert!(c.create_sql_without_indexes().unwrap().ends_with("UNIQUE (\"A\", \"B\" DESC)"));
    }

    #[test]
    fn copy_to_other_table_skips_index() {
        let c = unique(false, IndexOwnership::Owned, NullsDistinct::Distinct);
        let sql = c.create_sql_for_copy("T_COPY", "\"PUBLIC\".\"UQ_COPY\"", true).unwrap();
        assert!(sql.starts_with("ALTER TABLE \"PUBLIC\".\"T_COPY\" ADD CONSTRAINT \"PUBLIC\".\"UQ_COPY\""));
        assert!(!sql.contains(" INDEX "));
    }

    #[test]
    fn primary_key_predicate_is_not_distinct() {
        let pk = unique(true, IndexOwnership::Owned, NullsDistinct::Distinct);
        assert_eq!(pk.key_predicate(CompareMode::default()).unwrap().nulls_distinct(), NullsDistinct::NotDistinct);
        let uq = unique(false, IndexOwnership::Owned, NullsDistinct::Distinct);
        assert_eq!(uq.key_predicate(CompareMode::default()).unwrap().nulls_distinct(), NullsDistinct::Distinct);
    }

    #[test]
    fn invalidated_constraint_fails_fast() {
        let mut c = unique(false, IndexOwnership::Owned, NullsDistinct::Distinct);
        c.invalidate();
        assert!(!c.is_valid());
        assert!(matches!(c.columns(), Err(DbError::Invalidated(_))));
        assert!(matches!(c.uses_index("UQ_T_INDEX"), Err(DbError::Invalidated(_))));
        assert!(matches!(c.create_sql(), Err(DbError::Invalidated(_))));
        assert!(matches!(c.set_index_owner(), Err(DbError::Invalidated(_))));
        assert!(matches!(c.rebuild(), Err(DbError::Invalidated(_))));
        assert!(matches!(c.constraint_type(), Err(DbError::Invalidated(_))));
        assert!(matches!(c.nulls_distinct(), Err(DbError::Invalidated(_))));
        assert!(matches!(c.is_primary_key(), Err(DbError::Invalidated(_))));
        assert!(matches!(c.key_predicate(CompareMode::default()), Err(DbError::Invalidated(_))));
        assert_eq!(c.name(), "UQ_T");
    }

    #[test]
    fn shared_index_is_named_for_own_table_only() {
        let c = unique(false, IndexOwnership::Shared, NullsDistinct::Distinct);
        assert!(c.create_sql().unwrap().ends_with(" INDEX \"PUBLIC\".\"UQ_T_INDEX\""));
        assert!(!c.create_sql_for_copy("T_COPY", "\"PUBLIC\".\"UQ_COPY\"", true).unwrap().contains(" INDEX "));
    }

    #[test]
    fn checked_before_write() {
        let c = unique(false, IndexOwnership::Owned, NullsDistinct::Distinct);
        assert!(c.is_before());
        assert!(c.rebuild().is_ok());
    }

    #[test]
    fn ownership_can_be_taken_over() {
        let mut c = unique(false, IndexOwnership::Shared, NullsDistinct::Distinct);
        assert!(!c.is_index_owner().unwrap());
        c.set_index_owner().unwrap();
        assert!(c.is_index_owner().unwrap());
    }
}
