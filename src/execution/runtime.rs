use log::{debug, info};

use crate::catalog::Catalog;
use crate::error::{DbError, DbResult};
use crate::sql::ast::{Equals, Statement, TableConstraintDef};
use crate::storage::row::{Row, RowData};
use crate::value::{CompareMode, SqlOrdering, Value};

/// What a statement produced.
#[derive(Debug)]
pub enum StatementOutcome {
    Done(String),
    Rows { header: Vec<String>, rows: Vec<Row> },
    Exit,
}

pub fn add_constraint(catalog: &mut Catalog, table_name: &str, def: &TableConstraintDef) -> DbResult<String> {
    match def {
        TableConstraintDef::Unique(u) => catalog.add_unique_constraint(table_name, u),
        TableConstraintDef::ForeignKey(f) => catalog.add_foreign_key(table_name, f),
    }
}

/// Resolve `WHERE column = literal` to a column position.
fn resolve_selection(catalog: &Catalog, table_name: &str, selection: Option<Equals>) -> DbResult<Option<(usize, Value)>> {
    match selection {
        Some(eq) => Ok(Some((catalog.get_table(table_name)?.column_position(&eq.column)?, eq.value))),
        None => Ok(None),
    }
}

/// Rows whose column is NULL never match.
fn row_matches(row: &RowData, selection: Option<&(usize, Value)>, mode: &CompareMode) -> DbResult<bool> {
    match selection {
        None => Ok(true),
        Some((pos, value)) => Ok(row.0[*pos].compare_with_null(value, true, mode)? == SqlOrdering::Equal),
    }
}

pub fn execute_insert(catalog: &mut Catalog, table_name: &str, rows: Vec<Vec<Value>>) -> DbResult<usize> {
    let mut inserted = 0;
    for values in rows {
        catalog.insert_row(table_name, values)?;
        inserted += 1;
    }
    Ok(inserted)
}

pub fn execute_delete(catalog: &mut Catalog, table_name: &str, selection: Option<Equals>) -> DbResult<usize> {
    let selection = resolve_selection(catalog, table_name, selection)?;
    let mode = catalog.config().compare_mode;
    catalog.delete_rows(table_name, |row| row_matches(row, selection.as_ref(), &mode))
}

pub fn execute_select(catalog: &Catalog, table_name: &str, selection: Option<Equals>) -> DbResult<Vec<Row>> {
    let selection = resolve_selection(catalog, table_name, selection)?;
    let mode = catalog.config().compare_mode;
    let mut out = Vec::new();
    for (key, data) in catalog.get_table(table_name)?.rows() {
        if row_matches(data, selection.as_ref(), &mode)? {
            out.push(Row { key, data: data.clone() });
        }
    }
    Ok(out)
}

pub fn handle_statement(catalog: &mut Catalog, stmt: Statement) -> DbResult<StatementOutcome> {
    debug!("executing {:?}", stmt);
    let outcome = match stmt {
        Statement::CreateTable { table_name, columns, constraints, if_not_exists } => {
            if if_not_exists && catalog.has_table(&table_name) {
                return Ok(StatementOutcome::Done(format!("Table '{}' already exists", table_name)));
            }
            catalog.create_table(&table_name, &columns)?;
            for def in &constraints {
                if let Err(e) = add_constraint(catalog, &table_name, def) {
                    catalog.drop_table(&table_name)?;
                    return Err(e);
                }
            }
            format!("Table '{}' created", table_name)
        }
        Statement::CreateIndex(def) => {
            catalog.create_index(&def)?;
            format!("Index '{}' created", def.name)
        }
        Statement::AlterTableAddConstraint { table_name, constraint } => {
            let name = add_constraint(catalog, &table_name, &constraint)?;
            format!("Constraint '{}' added", name)
        }
        Statement::AlterTableDropConstraint { table_name, constraint_name, if_exists } => {
            if if_exists && !catalog.has_constraint(&constraint_name) {
                return Ok(StatementOutcome::Done(format!("Constraint '{}' does not exist", constraint_name)));
            }
            if catalog.get_constraint(&constraint_name)?.table()? != table_name {
                return Err(DbError::ConstraintNotFound(format!("{} on {}", constraint_name, table_name)));
            }
            catalog.drop_constraint(&constraint_name)?;
            format!("Constraint '{}' dropped", constraint_name)
        }
        Statement::DropTable { table_name, if_exists } => {
            if if_exists && !catalog.has_table(&table_name) {
                return Ok(StatementOutcome::Done(format!("Table '{}' does not exist", table_name)));
            }
            catalog.drop_table(&table_name)?;
            format!("Table '{}' dropped", table_name)
        }
        Statement::DropIndex { index_name, if_exists } => {
            if if_exists && !catalog.has_index(&index_name) {
                return Ok(StatementOutcome::Done(format!("Index '{}' does not exist", index_name)));
            }
            catalog.drop_index(&index_name)?;
            format!("Index '{}' dropped", index_name)
        }
        Statement::Insert { table_name, rows } => {
            let count = execute_insert(catalog, &table_name, rows)?;
            format!("{} row(s) inserted into '{}'", count, table_name)
        }
        Statement::Delete { table_name, selection } => {
            let count = execute_delete(catalog, &table_name, selection)?;
            format!("{} row(s) deleted from '{}'", count, table_name)
        }
        Statement::Select { table_name, selection } => {
            let rows = execute_select(catalog, &table_name, selection)?;
            let header = catalog.get_table(&table_name)?.columns.iter().map(|(c, _)| c.clone()).collect();
            return Ok(StatementOutcome::Rows { header, rows });
        }
        Statement::Script { path } => {
            catalog.save_script(&path)?;
            format!("Script written to {}", path)
        }
        Statement::RunScript { path } => {
            let count = catalog.run_script(&path)?;
            format!("{} statement(s) executed from {}", count, path)
        }
        Statement::Exit => return Ok(StatementOutcome::Exit),
    };
    info!("{}", outcome);
    Ok(StatementOutcome::Done(outcome))
}

pub fn format_header(header: &[String]) -> String {
    header.join(" | ")
}

pub fn format_row(row: &Row) -> String {
    row.data.0.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" | ")
}
