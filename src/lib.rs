pub mod catalog;
pub mod config;
pub mod constraints;
pub mod error;
pub mod execution;
pub mod index;
pub mod sql;
pub mod storage;
pub mod value;
