pub mod script;

use std::collections::{BTreeMap, HashMap};

use log::{debug, info, warn};

use crate::config::{EngineConfig, DEFAULT_CONFIG};
use crate::constraints::foreign_key::render_key;
use crate::constraints::not_null::NotNullConstraint;
use crate::constraints::{
    Constraint, ConstraintValidator, ForeignKeyConstraint, IndexOwnership, KeyPredicate, NullsDistinct,
    ObjectId, UniqueConstraint,
};
use crate::error::{DbError, DbResult};
use crate::index::{Index, IndexColumn, IndexOwner, MemoryIndex, SortOrder};
use crate::sql::ast::{ColumnDef, ForeignKeyDef, IndexDef, UniqueDef};
use crate::sql::ident::{quote_identifier, quote_qualified};
use crate::storage::row::{build_row_data, ColumnType, RowData, RowId};
use crate::value::{CompareMode, Value};

/// In-memory representation of a table with its rows.
#[derive(Debug, Clone)]
pub struct TableInfo {
    pub id: u32,
    pub name: String,
    pub schema: String,
    pub columns: Vec<(String, ColumnType)>,
    pub not_null: Vec<bool>,
    /// Constraints declared on the table plus foreign keys referencing it.
    pub constraints: Vec<String>,
    pub indexes: Vec<String>,
    rows: BTreeMap<RowId, RowData>,
    next_row: RowId,
}

impl TableInfo {
    pub fn column_position(&self, name: &str) -> DbResult<usize> {
        self.columns
            .iter()
            .position(|(c, _)| c == name)
            .ok_or_else(|| DbError::ColumnNotFound(format!("{}.{}", self.name, name)))
    }

    /// Rows in insertion order.
    pub fn rows(&self) -> impl Iterator<Item = (RowId, &RowData)> + '_ {
        self.rows.iter().map(|(id, data)| (*id, data))
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Estimated bytes held by the stored rows.
    pub fn memory(&self) -> usize {
        self.rows.values().map(RowData::memory).sum()
    }

    pub fn create_sql(&self) -> String {
        let columns = self
            .columns
            .iter()
            .zip(&self.not_null)
            .map(|((name, ty), not_null)| {
                let mut col = format!("{} {}", quote_identifier(name), ty.as_str());
                if *not_null {
                    col.push_str(" NOT NULL");
                }
                col
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE TABLE {}({})", quote_qualified(&self.schema, &self.name), columns)
    }

    fn resolve_columns(&self, columns: &[(String, SortOrder)]) -> DbResult<Vec<IndexColumn>> {
        if columns.is_empty() {
            return Err(DbError::InvalidValue("empty column list".into()));
        }
        columns
            .iter()
            .map(|(name, order)| Ok(IndexColumn::new(name.clone(), self.column_position(name)?, *order)))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaType {
    Table,
    Index,
    Constraint,
}

/// One schema object as it would be recreated: its DDL keyed by object id.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaRecord {
    pub id: u32,
    pub object_type: MetaType,
    pub name: String,
    pub sql: String,
}

/// Tables, constraints, indexes and the metadata rows describing them.
pub struct Catalog {
    config: EngineConfig,
    tables: HashMap<String, TableInfo>,
    constraints: HashMap<String, Constraint>,
    indexes: HashMap<String, Box<dyn Index>>,
    meta: BTreeMap<u32, MetaRecord>,
    next_id: u32,
}

impl Default for Catalog {
    fn default() -> Self {
        Catalog::new(DEFAULT_CONFIG.clone())
    }
}

fn key_positions(columns: &[IndexColumn]) -> Vec<usize> {
    columns.iter().map(|c| c.position).collect()
}

/// Load every row of `table` into `index`, rejecting duplicates when a
/// predicate is given.
fn populate_index(
    index: &mut dyn Index,
    table: &TableInfo,
    predicate: Option<&KeyPredicate>,
    label: &str,
) -> DbResult<()> {
    let positions = key_positions(index.columns());
    for (row_id, data) in table.rows() {
        let key = data.project(&positions);
        if let Some(predicate) = predicate {
            if index.locate_conflict(&key, predicate)?.is_some() {
                return Err(DbError::DuplicateKey { constraint: label.to_string(), key: render_key(&key) });
            }
        }
        index.add(key, row_id)?;
    }
    Ok(())
}

impl Catalog {
    pub fn new(config: EngineConfig) -> Self {
        Catalog {
            config,
            tables: HashMap::new(),
            constraints: HashMap::new(),
            indexes: HashMap::new(),
            meta: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn compare_mode(&self) -> CompareMode {
        self.config.compare_mode
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn get_table(&self, name: &str) -> DbResult<&TableInfo> {
        self.tables.get(name).ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }

    fn get_table_mut(&mut self, name: &str) -> DbResult<&mut TableInfo> {
        self.tables.get_mut(name).ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Tables in creation order.
    pub fn tables(&self) -> Vec<&TableInfo> {
        let mut tables: Vec<&TableInfo> = self.tables.values().collect();
        tables.sort_by_key(|t| t.id);
        tables
    }

    pub fn get_constraint(&self, name: &str) -> DbResult<&Constraint> {
        self.constraints.get(name).ok_or_else(|| DbError::ConstraintNotFound(name.to_string()))
    }

    pub fn has_constraint(&self, name: &str) -> bool {
        self.constraints.contains_key(name)
    }

    pub fn get_index(&self, name: &str) -> DbResult<&dyn Index> {
        self.indexes
            .get(name)
            .map(|index| index.as_ref())
            .ok_or_else(|| DbError::IndexNotFound(name.to_string()))
    }

    fn get_index_mut(&mut self, name: &str) -> DbResult<&mut Box<dyn Index>> {
        self.indexes.get_mut(name).ok_or_else(|| DbError::IndexNotFound(name.to_string()))
    }

    pub fn has_index(&self, name: &str) -> bool {
        self.indexes.contains_key(name)
    }

    /// Estimated bytes held by all rows and index entries.
    pub fn memory(&self) -> usize {
        let rows: usize = self.tables.values().map(TableInfo::memory).sum();
        let entries: usize = self.indexes.values().map(|index| index.memory()).sum();
        rows + entries
    }

    /// Metadata rows in object id order.
    pub fn meta_records(&self) -> impl Iterator<Item = &MetaRecord> {
        self.meta.values()
    }

    pub fn create_table(&mut self, name: &str, columns: &[ColumnDef]) -> DbResult<()> {
        if self.tables.contains_key(name) {
            return Err(DbError::AlreadyExists(name.to_string()));
        }
        if columns.is_empty() {
            return Err(DbError::InvalidValue(format!("table {} has no columns", name)));
        }
        for (i, col) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == col.name) {
                return Err(DbError::AlreadyExists(format!("{}.{}", name, col.name)));
            }
        }
        let id = self.allocate_id();
        let table = TableInfo {
            id,
            name: name.to_string(),
            schema: self.config.schema.clone(),
            columns: columns.iter().map(|c| (c.name.clone(), c.ty.clone())).collect(),
            not_null: columns.iter().map(|c| c.not_null).collect(),
            constraints: Vec::new(),
            indexes: Vec::new(),
            rows: BTreeMap::new(),
            next_row: 1,
        };
        self.add_meta(id, MetaType::Table, name, table.create_sql());
        self.tables.insert(name.to_string(), table);
        info!("created table {} with {} columns", name, columns.len());
        Ok(())
    }

    /// CREATE [UNIQUE] INDEX. The index belongs to its table.
    pub fn create_index(&mut self, def: &IndexDef) -> DbResult<()> {
        if self.indexes.contains_key(&def.name) {
            return Err(DbError::AlreadyExists(def.name.clone()));
        }
        let mode = self.compare_mode();
        let policy = def.nulls_distinct.unwrap_or(self.config.default_nulls_distinct);
        let table = self.get_table(&def.table_name)?;
        let columns = table.resolve_columns(&def.columns)?;
        let mut index = MemoryIndex::new(
            &def.name,
            &self.config.schema,
            &def.table_name,
            columns,
            def.unique,
            policy,
            IndexOwner::Table,
        )
        .with_compare_mode(mode);
        let predicate = KeyPredicate::new(policy, mode);
        populate_index(&mut index, table, def.unique.then_some(&predicate), &def.name)?;

        let sql = index.create_sql();
        let id = self.allocate_id();
        self.get_table_mut(&def.table_name)?.indexes.push(def.name.clone());
        self.add_meta(id, MetaType::Index, &def.name, sql);
        self.indexes.insert(def.name.clone(), Box::new(index));
        info!("created index {} on {}", def.name, def.table_name);
        Ok(())
    }

    fn primary_key_of(&self, table: &TableInfo) -> Option<String> {
        table
            .constraints
            .iter()
            .filter_map(|name| self.constraints.get(name))
            .filter_map(Constraint::as_unique)
            .find(|c| matches!(c.is_primary_key(), Ok(true)) && matches!(c.table(), Ok(t) if t == table.name))
            .map(|c| c.name().to_string())
    }

    /// Whether `index` can back a key over `columns` of `table`.
    fn index_compatible(
        &self,
        index: &str,
        table: &str,
        columns: &[IndexColumn],
        policy: NullsDistinct,
        primary_key: bool,
    ) -> bool {
        self.indexes.get(index).is_some_and(|idx| {
            idx.table_name() == table
                && idx.is_unique()
                && idx.columns() == columns
                && (primary_key || idx.nulls_distinct() == policy)
        })
    }

    fn owned_index_name(&self, constraint: &str, id: u32) -> String {
        let name = format!("{}_INDEX", constraint);
        if self.indexes.contains_key(&name) {
            format!("{}_{}", name, id)
        } else {
            name
        }
    }

    /// Add a PRIMARY KEY or UNIQUE constraint and return its name.
    ///
    /// An existing unique index over the same columns (and, for UNIQUE, the
    /// same NULLS policy) is shared; otherwise the constraint gets an index of
    /// its own, built from the rows already in the table.
    pub fn add_unique_constraint(&mut self, table_name: &str, def: &UniqueDef) -> DbResult<String> {
        let id = self.allocate_id();
        let name = def.name.clone().unwrap_or_else(|| format!("CONSTRAINT_{}", id));
        if self.constraints.contains_key(&name) {
            return Err(DbError::AlreadyExists(name));
        }
        let mode = self.compare_mode();
        let schema = self.config.schema.clone();
        let policy = def.nulls_distinct.unwrap_or(self.config.default_nulls_distinct);
        let table = self.get_table(table_name)?;
        let columns = table.resolve_columns(&def.columns)?;

        if def.primary_key {
            if let Some(existing) = self.primary_key_of(table) {
                return Err(DbError::AlreadyExists(format!("primary key {} on {}", existing, table_name)));
            }
            for (_, data) in table.rows() {
                if let Some(col) = columns.iter().find(|c| data.0[c.position].is_null()) {
                    return Err(DbError::NullViolation(format!("{}.{}", table_name, col.name)));
                }
            }
        }

        let (index_name, ownership) = match &def.index {
            Some(index) if self.indexes.contains_key(index) => {
                if !self.index_compatible(index, table_name, &columns, policy, def.primary_key) {
                    return Err(DbError::InvalidValue(format!("index {} cannot back constraint {}", index, name)));
                }
                (index.clone(), IndexOwnership::Shared)
            }
            Some(index) => (index.clone(), IndexOwnership::Owned),
            None => {
                let reusable = table
                    .indexes
                    .iter()
                    .find(|index| self.index_compatible(index, table_name, &columns, policy, def.primary_key))
                    .cloned();
                match reusable {
                    Some(index) => (index, IndexOwnership::Shared),
                    None => (self.owned_index_name(&name, id), IndexOwnership::Owned),
                }
            }
        };

        let constraint = UniqueConstraint::new(
            ObjectId::new(id, &name, &schema),
            table_name,
            def.primary_key,
            columns.clone(),
            &index_name,
            ownership,
            policy,
        )
        .with_comment(def.comment.clone())
        .with_format(self.config.sql_format());

        let new_index = if ownership == IndexOwnership::Owned {
            let mut index = MemoryIndex::new(
                &index_name,
                &schema,
                table_name,
                columns.clone(),
                true,
                policy,
                IndexOwner::Constraint(name.clone()),
            )
            .with_compare_mode(mode);
            populate_index(&mut index, table, Some(&constraint.key_predicate(mode)?), &name)?;
            Some(index)
        } else {
            None
        };
        constraint.check_existing_data(self)?;
        let sql = constraint.create_sql()?;

        let table = self.get_table_mut(table_name)?;
        table.constraints.push(name.clone());
        if new_index.is_some() {
            table.indexes.push(index_name.clone());
        }
        if def.primary_key {
            for col in &columns {
                table.not_null[col.position] = true;
            }
        }
        let (table_id, table_sql) = (table.id, table.create_sql());
        if def.primary_key {
            self.update_meta(table_id, table_sql);
        }
        if let Some(index) = new_index {
            self.indexes.insert(index_name.clone(), Box::new(index));
        }
        self.add_meta(id, MetaType::Constraint, &name, sql);
        self.constraints.insert(name.clone(), Constraint::Unique(constraint));
        info!(
            "added {} {} on {} ({} index {})",
            if def.primary_key { "primary key" } else { "unique constraint" },
            name,
            table_name,
            if ownership == IndexOwnership::Owned { "owned" } else { "shared" },
            index_name
        );
        Ok(name)
    }

    /// Unique constraint of `table` over exactly the named columns.
    fn unique_key_matching(&self, table: &TableInfo, columns: &[String]) -> Option<String> {
        table
            .constraints
            .iter()
            .filter_map(|name| self.constraints.get(name))
            .filter_map(Constraint::as_unique)
            .find(|c| {
                matches!(c.table(), Ok(t) if t == table.name)
                    && c.columns().is_ok_and(|cols| {
                        cols.len() == columns.len() && cols.iter().all(|col| columns.contains(&col.name))
                    })
            })
            .map(|c| c.name().to_string())
    }

    pub fn add_foreign_key(&mut self, table_name: &str, def: &ForeignKeyDef) -> DbResult<String> {
        let id = self.allocate_id();
        let name = def.name.clone().unwrap_or_else(|| format!("CONSTRAINT_{}", id));
        if self.constraints.contains_key(&name) {
            return Err(DbError::AlreadyExists(name));
        }
        let table = self.get_table(table_name)?;
        let parent = self.get_table(&def.ref_table)?;
        let parent_key = if def.ref_columns.is_empty() {
            self.primary_key_of(parent)
        } else {
            self.unique_key_matching(parent, &def.ref_columns)
        };
        let parent_key =
            parent_key.ok_or_else(|| DbError::ConstraintNotFound(format!("unique key on {}", def.ref_table)))?;
        let parent_columns = self
            .get_constraint(&parent_key)?
            .as_unique()
            .ok_or_else(|| DbError::ConstraintNotFound(parent_key.clone()))?
            .columns()?;
        if def.columns.len() != parent_columns.len() {
            return Err(DbError::ColumnCountMismatch);
        }

        // pair child columns with the parent key in the parent's index order
        let mut columns = Vec::with_capacity(parent_columns.len());
        let mut ref_columns = Vec::with_capacity(parent_columns.len());
        for (i, parent_col) in parent_columns.iter().enumerate() {
            let j = if def.ref_columns.is_empty() {
                i
            } else {
                def.ref_columns
                    .iter()
                    .position(|c| *c == parent_col.name)
                    .ok_or_else(|| DbError::ColumnNotFound(format!("{}.{}", def.ref_table, parent_col.name)))?
            };
            let child = &def.columns[j];
            columns.push(IndexColumn::new(child.clone(), table.column_position(child)?, SortOrder::Asc));
            ref_columns.push(IndexColumn::new(parent_col.name.clone(), parent_col.position, SortOrder::Asc));
        }

        let fk = ForeignKeyConstraint::new(
            ObjectId::new(id, &name, &self.config.schema),
            table_name,
            columns,
            &def.ref_table,
            ref_columns,
            &parent_key,
        )
        .with_comment(def.comment.clone());
        fk.check_existing_data(self)?;
        let sql = fk.create_sql()?;

        self.get_table_mut(table_name)?.constraints.push(name.clone());
        if def.ref_table != table_name {
            self.get_table_mut(&def.ref_table)?.constraints.push(name.clone());
        }
        self.add_meta(id, MetaType::Constraint, &name, sql);
        self.constraints.insert(name.clone(), Constraint::ForeignKey(fk));
        info!("added foreign key {} on {} referencing {}", name, table_name, parent_key);
        Ok(name)
    }

    /// Remove a constraint along with everything depending on it. The
    /// returned object is invalidated. On failure the constraint stays
    /// registered.
    pub fn drop_constraint(&mut self, name: &str) -> DbResult<Constraint> {
        let mut constraint = self
            .constraints
            .remove(name)
            .ok_or_else(|| DbError::ConstraintNotFound(name.to_string()))?;
        if let Err(err) = constraint.remove_children_and_resources(self) {
            warn!("dropping constraint {} failed: {}", name, err);
            self.constraints.insert(name.to_string(), constraint);
            return Err(err);
        }
        Ok(constraint)
    }

    /// DROP INDEX. Refused while a constraint still uses the index.
    pub fn drop_index(&mut self, name: &str) -> DbResult<()> {
        let table = self.get_index(name)?.table_name().to_string();
        if let Some(user) = self.constraints.values().find(|c| matches!(c.uses_index(name), Ok(true))) {
            return Err(DbError::IndexBelongsToConstraint {
                index: name.to_string(),
                constraint: user.name().to_string(),
            });
        }
        self.remove_index(&table, name)
    }

    pub fn drop_table(&mut self, name: &str) -> DbResult<()> {
        let constraints = self.get_table(name)?.constraints.clone();
        for constraint in constraints {
            // foreign keys may already be gone with the key they referenced
            if self.constraints.contains_key(&constraint) {
                self.drop_constraint(&constraint)?;
            }
        }
        let indexes = self.get_table(name)?.indexes.clone();
        for index in indexes {
            if self.indexes.contains_key(&index) {
                self.remove_index(name, &index)?;
            }
        }
        let table = self.tables.remove(name).ok_or_else(|| DbError::TableNotFound(name.to_string()))?;
        self.remove_meta(table.id);
        info!("dropped table {} ({} rows)", name, table.rows.len());
        Ok(())
    }

    fn index_predicates(&self, table: &TableInfo, index: &dyn Index) -> DbResult<Vec<(String, KeyPredicate)>> {
        let mode = self.compare_mode();
        let mut predicates = table
            .constraints
            .iter()
            .filter_map(|name| self.constraints.get(name))
            .filter_map(Constraint::as_unique)
            .filter(|c| matches!(c.uses_index(index.name()), Ok(true)))
            .map(|c| c.key_predicate(mode).map(|predicate| (c.name().to_string(), predicate)))
            .collect::<DbResult<Vec<_>>>()?;
        if predicates.is_empty() {
            predicates.push((index.name().to_string(), KeyPredicate::new(index.nulls_distinct(), mode)));
        }
        Ok(predicates)
    }

    /// Validate and store one row. Fails without changing anything on a
    /// NULL in a NOT NULL column, a foreign key miss or a duplicate key.
    pub fn insert_row(&mut self, table_name: &str, values: Vec<Value>) -> DbResult<RowId> {
        let table = self.get_table(table_name)?;
        let data = build_row_data(values, &table.columns)?;
        NotNullConstraint.validate_insert(table, &data)?;
        for name in &table.constraints {
            self.get_constraint(name)?.check_row(self, table, None, Some(&data))?;
        }

        let mut keys = Vec::with_capacity(table.indexes.len());
        for index_name in &table.indexes {
            let index = self.get_index(index_name)?;
            let key = data.project(&key_positions(index.columns()));
            if index.is_unique() {
                for (label, predicate) in self.index_predicates(table, index)? {
                    if index.locate_conflict(&key, &predicate)?.is_some() {
                        warn!("rejected duplicate key ({}) for {}", render_key(&key), label);
                        return Err(DbError::DuplicateKey { constraint: label, key: render_key(&key) });
                    }
                }
            }
            keys.push((index_name.clone(), key));
        }

        let table = self.get_table_mut(table_name)?;
        let row_id = table.next_row;
        table.next_row += 1;
        table.rows.insert(row_id, data);
        for (index_name, key) in keys {
            self.get_index_mut(&index_name)?.add(key, row_id)?;
        }
        debug!("inserted row {} into {}", row_id, table_name);
        Ok(row_id)
    }

    /// Delete every row `filter` accepts. Stops at the first row a constraint
    /// refuses to let go; rows deleted before it stay deleted.
    pub fn delete_rows<F>(&mut self, table_name: &str, mut filter: F) -> DbResult<usize>
    where
        F: FnMut(&RowData) -> DbResult<bool>,
    {
        let mut targets = Vec::new();
        for (row_id, data) in self.get_table(table_name)?.rows() {
            if filter(data)? {
                targets.push(row_id);
            }
        }
        for row_id in &targets {
            let table = self.get_table(table_name)?;
            let Some(data) = table.rows.get(row_id) else { continue };
            for name in &table.constraints {
                self.get_constraint(name)?.check_row(self, table, Some(data), None)?;
            }
            let keys = table
                .indexes
                .iter()
                .map(|name| Ok((name.clone(), data.project(&key_positions(self.get_index(name)?.columns())))))
                .collect::<DbResult<Vec<_>>>()?;
            self.get_table_mut(table_name)?.rows.remove(row_id);
            for (index_name, key) in keys {
                self.get_index_mut(&index_name)?.remove(&key, *row_id)?;
            }
        }
        debug!("deleted {} rows from {}", targets.len(), table_name);
        Ok(targets.len())
    }

    /// Names of constraints registered on `table` that depend on `constraint`.
    pub(crate) fn constraints_referencing(&self, table: &str, constraint: &str) -> DbResult<Vec<String>> {
        Ok(self
            .get_table(table)?
            .constraints
            .iter()
            .filter(|name| {
                self.constraints.get(*name).and_then(|c| c.referenced_constraint()) == Some(constraint)
            })
            .cloned()
            .collect())
    }

    pub(crate) fn detach_constraint(&mut self, table: &str, constraint: &str) {
        if let Some(table) = self.tables.get_mut(table) {
            table.constraints.retain(|c| c != constraint);
        }
    }

    /// Hand `index` to another constraint of `table` that uses it, or drop it
    /// when no such constraint is left.
    pub(crate) fn remove_index_or_transfer_ownership(&mut self, table: &str, index: &str) -> DbResult<()> {
        let heir = self.tables.get(table).and_then(|t| {
            t.constraints
                .iter()
                .find(|name| self.constraints.get(*name).is_some_and(|c| matches!(c.uses_index(index), Ok(true))))
                .cloned()
        });
        let Some(heir) = heir else {
            return self.remove_index(table, index);
        };
        let constraint = self
            .constraints
            .get_mut(&heir)
            .ok_or_else(|| DbError::ConstraintNotFound(heir.clone()))?;
        constraint.set_index_owner()?;
        let (id, sql) = (constraint.id(), constraint.create_sql()?);
        self.get_index_mut(index)?.transfer_ownership(IndexOwner::Constraint(heir.clone()));
        self.update_meta(id, sql);
        info!("index {} handed over to {}", index, heir);
        Ok(())
    }

    fn remove_index(&mut self, table: &str, name: &str) -> DbResult<()> {
        let mut index = self.indexes.remove(name).ok_or_else(|| DbError::IndexNotFound(name.to_string()))?;
        index.drop_index();
        if let Some(table) = self.tables.get_mut(table) {
            table.indexes.retain(|i| i != name);
        }
        self.meta.retain(|_, m| !(m.object_type == MetaType::Index && m.name == name));
        info!("dropped index {}", name);
        Ok(())
    }

    fn add_meta(&mut self, id: u32, object_type: MetaType, name: &str, sql: String) {
        debug!("meta {}: {}", id, sql);
        self.meta.insert(id, MetaRecord { id, object_type, name: name.to_string(), sql });
    }

    pub(crate) fn update_meta(&mut self, id: u32, sql: String) {
        if let Some(record) = self.meta.get_mut(&id) {
            debug!("meta {} updated: {}", id, sql);
            record.sql = sql;
        }
    }

    pub(crate) fn remove_meta(&mut self, id: u32) {
        self.meta.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::ConstraintType;

    fn column(name: &str, ty: ColumnType) -> ColumnDef {
        ColumnDef { name: name.into(), ty, not_null: false }
    }

    fn unique_def(name: &str, primary_key: bool, columns: &[&str]) -> UniqueDef {
        UniqueDef {
            name: Some(name.into()),
            comment: None,
            primary_key,
            nulls_distinct: None,
            columns: columns.iter().map(|c| (c.to_string(), SortOrder::Asc)).collect(),
            index: None,
        }
    }

    fn catalog_with_table() -> Catalog {
        let mut catalog = Catalog::default();
        catalog
            .create_table("T", &[column("ID", ColumnType::Integer), column("NAME", ColumnType::Varchar)])
            .unwrap();
        catalog
    }

    #[test]
    fn primary_key_marks_columns_not_null() {
        let mut catalog = catalog_with_table();
        catalog.add_unique_constraint("T", &unique_def("PK_T", true, &["ID"])).unwrap();
        let table = catalog.get_table("T").unwrap();
        assert_eq!(table.not_null, vec![true, false]);
        assert_eq!(catalog.get_constraint("PK_T").unwrap().constraint_type().unwrap(), ConstraintType::PrimaryKey);
        let table_meta = catalog.meta_records().find(|m| m.object_type == MetaType::Table).unwrap();
        assert!(table_meta.sql.contains("\"ID\" BIGINT NOT NULL"));

        let err = catalog.insert_row("T", vec![Value::Null, Value::varchar("x")]).unwrap_err();
        assert!(matches!(err, DbError::NullViolation(_)));
    }

    #[test]
    fn second_primary_key_is_refused() {
        let mut catalog = catalog_with_table();
        catalog.add_unique_constraint("T", &unique_def("PK_T", true, &["ID"])).unwrap();
        let res = catalog.add_unique_constraint("T", &unique_def("PK_T2", true, &["NAME"]));
        assert!(matches!(res, Err(DbError::AlreadyExists(_))));
    }

    #[test]
    fn constraint_over_existing_duplicates_fails() {
        let mut catalog = catalog_with_table();
        catalog.insert_row("T", vec![Value::Integer(1), Value::varchar("a")]).unwrap();
        catalog.insert_row("T", vec![Value::Integer(1), Value::varchar("b")]).unwrap();
        let res = catalog.add_unique_constraint("T", &unique_def("UQ_ID", false, &["ID"]));
        assert!(matches!(res, Err(DbError::DuplicateKey { .. })));
        assert!(!catalog.has_constraint("UQ_ID"));
        assert!(catalog.get_table("T").unwrap().indexes.is_empty());
    }

    #[test]
    fn compatible_index_is_shared() {
        let mut catalog = catalog_with_table();
        catalog
            .create_index(&IndexDef {
                name: "IDX_ID".into(),
                table_name: "T".into(),
                unique: true,
                nulls_distinct: Some(NullsDistinct::Distinct),
                columns: vec![("ID".into(), SortOrder::Asc)],
            })
            .unwrap();
        catalog.add_unique_constraint("T", &unique_def("UQ_ID", false, &["ID"])).unwrap();
        let uq = catalog.get_constraint("UQ_ID").unwrap().as_unique().unwrap();
        assert_eq!(uq.index().unwrap(), "IDX_ID");
        assert!(!uq.is_index_owner().unwrap());
        assert_eq!(catalog.get_table("T").unwrap().indexes, vec!["IDX_ID".to_string()]);
    }

    #[test]
    fn index_of_another_table_cannot_back_constraint() {
        let mut catalog = catalog_with_table();
        catalog.create_table("U", &[column("ID", ColumnType::Integer)]).unwrap();
        catalog
            .create_index(&IndexDef {
                name: "IDX_U".into(),
                table_name: "U".into(),
                unique: true,
                nulls_distinct: None,
                columns: vec![("ID".into(), SortOrder::Asc)],
            })
            .unwrap();
        let mut def = unique_def("UQ_ID", false, &["ID"]);
        def.index = Some("IDX_U".into());
        let res = catalog.add_unique_constraint("T", &def);
        assert!(matches!(res, Err(DbError::InvalidValue(_))));
        assert!(!catalog.has_constraint("UQ_ID"));

        // without the clause the other table's index is not picked up either
        catalog.add_unique_constraint("T", &unique_def("UQ_ID", false, &["ID"])).unwrap();
        assert!(catalog.get_constraint("UQ_ID").unwrap().as_unique().unwrap().is_index_owner().unwrap());
        catalog.insert_row("T", vec![Value::Integer(1), Value::varchar("a")]).unwrap();
        let err = catalog.insert_row("T", vec![Value::Integer(1), Value::varchar("b")]).unwrap_err();
        assert!(matches!(err, DbError::DuplicateKey { .. }));
    }

    #[test]
    fn failed_drop_keeps_constraint() {
        let mut catalog = catalog_with_table();
        catalog.add_unique_constraint("T", &unique_def("UQ_ID", false, &["ID"])).unwrap();
        catalog.indexes.remove("UQ_ID_INDEX");
        let res = catalog.drop_constraint("UQ_ID");
        assert!(matches!(res, Err(DbError::IndexNotFound(_))));
        let uq = catalog.get_constraint("UQ_ID").unwrap();
        assert!(uq.is_valid());
        assert!(catalog.get_table("T").unwrap().constraints.contains(&"UQ_ID".to_string()));
        assert!(catalog.meta_records().any(|m| m.name == "UQ_ID"));
    }

    #[test]
    fn delete_removes_index_entries() {
        let mut catalog = catalog_with_table();
        catalog.add_unique_constraint("T", &unique_def("UQ_ID", false, &["ID"])).unwrap();
        catalog.insert_row("T", vec![Value::Integer(1), Value::varchar("a")]).unwrap();
        let deleted = catalog.delete_rows("T", |_| Ok(true)).unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(catalog.get_index("UQ_ID_INDEX").unwrap().row_count(), 0);
        catalog.insert_row("T", vec![Value::Integer(1), Value::varchar("again")]).unwrap();
    }

    #[test]
    fn memory_counts_rows_and_index_entries() {
        let mut catalog = catalog_with_table();
        assert_eq!(catalog.memory(), 0);
        catalog.insert_row("T", vec![Value::Integer(1), Value::varchar("abc")]).unwrap();
        let table_only = catalog.get_table("T").unwrap().memory();
        assert_eq!(table_only, 24 + 100);
        assert_eq!(catalog.memory(), table_only);

        catalog.add_unique_constraint("T", &unique_def("UQ_ID", false, &["ID"])).unwrap();
        let index = catalog.get_index("UQ_ID_INDEX").unwrap().memory();
        assert!(index > 0);
        assert_eq!(catalog.memory(), table_only + index);

        catalog.delete_rows("T", |_| Ok(true)).unwrap();
        assert_eq!(catalog.memory(), 0);
    }
}
