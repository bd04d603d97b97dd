use thiserror::Error;
use std::io;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("table '{0}' not found")]
    TableNotFound(String),
    #[error("column '{0}' not found")]
    ColumnNotFound(String),
    #[error("constraint '{0}' not found")]
    ConstraintNotFound(String),
    #[error("index '{0}' not found")]
    IndexNotFound(String),
    #[error("object '{0}' already exists")]
    AlreadyExists(String),
    #[error("unique index or primary key violation: {constraint} ({key})")]
    DuplicateKey { constraint: String, key: String },
    #[error("null value in column '{0}' violates not-null constraint")]
    NullViolation(String),
    #[error("data type mismatch: cannot compare {left} with {right}")]
    TypeMismatch { left: String, right: String },
    #[error("column count does not match")]
    ColumnCountMismatch,
    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),
    #[error("index '{index}' belongs to constraint '{constraint}'")]
    IndexBelongsToConstraint { index: String, constraint: String },
    #[error("object '{0}' was invalidated and can no longer be used")]
    Invalidated(String),
    #[error("parse error: {0}")]
    ParseError(String),
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type DbResult<T> = Result<T, DbError>;
