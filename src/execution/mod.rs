pub mod runtime;

pub use runtime::{handle_statement, StatementOutcome};
