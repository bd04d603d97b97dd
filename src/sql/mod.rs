pub mod ast;
pub mod ident;
pub mod parser;
