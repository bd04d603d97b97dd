use crate::catalog::TableInfo;
use crate::error::{DbError, DbResult};
use crate::storage::row::RowData;
use crate::value::Value;

/// Column-level NOT NULL check, applied before any index lookup. Primary key
/// columns are always NOT NULL, so NULL never reaches a primary key index.
pub struct NotNullConstraint;

impl NotNullConstraint {
    pub fn validate_insert(&self, table: &TableInfo, row: &RowData) -> DbResult<()> {
        for ((val, nn), (name, _)) in row.0.iter().zip(table.not_null.iter()).zip(table.columns.iter()) {
            if *nn && matches!(val, Value::Null) {
                return Err(DbError::NullViolation(format!("{}.{}", table.name, name)));
            }
        }
        Ok(())
    }
}
