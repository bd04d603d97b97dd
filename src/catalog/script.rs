use std::fs;
use std::path::Path;

use chrono::Local;
use log::info;

use crate::config::EngineConfig;
use crate::error::DbResult;
use crate::execution::runtime::handle_statement;
use crate::sql::ident::quote_qualified;
use crate::sql::parser::parse_statement;
use super::{Catalog, MetaType};

impl Catalog {
    /// Statements that rebuild this catalog: tables, then their rows, then
    /// indexes and constraints in creation order. Constraints come after the
    /// data so replaying them validates it again.
    pub fn script(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .meta_records()
            .filter(|m| m.object_type == MetaType::Table)
            .map(|m| m.sql.clone())
            .collect();
        for table in self.tables() {
            if table.row_count() == 0 {
                continue;
            }
            let rows = table
                .rows()
                .map(|(_, data)| {
                    let values = data.0.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ");
                    format!("({})", values)
                })
                .collect::<Vec<_>>()
                .join(", ");
            out.push(format!("INSERT INTO {} VALUES {}", quote_qualified(&table.schema, &table.name), rows));
        }
        out.extend(
            self.meta_records()
                .filter(|m| m.object_type != MetaType::Table)
                .map(|m| m.sql.clone()),
        );
        out
    }

    pub fn save_script(&self, path: impl AsRef<Path>) -> DbResult<()> {
        let statements = self.script();
        let mut text = format!("-- keyguard script {}\n", Local::now().format("%Y-%m-%d %H:%M:%S"));
        for statement in &statements {
            text.push_str(statement);
            text.push_str(";\n");
        }
        fs::write(path.as_ref(), text)?;
        info!("wrote {} statements to {}", statements.len(), path.as_ref().display());
        Ok(())
    }

    /// Build a fresh catalog from a script written by [`Catalog::save_script`].
    pub fn load_script(path: impl AsRef<Path>, config: EngineConfig) -> DbResult<Catalog> {
        let mut catalog = Catalog::new(config);
        catalog.run_script(path)?;
        Ok(catalog)
    }

    /// Execute every statement of a script file against this catalog.
    pub fn run_script(&mut self, path: impl AsRef<Path>) -> DbResult<usize> {
        let text = fs::read_to_string(path.as_ref())?;
        let statements = split_statements(&text);
        for statement in &statements {
            handle_statement(self, parse_statement(statement)?)?;
        }
        info!("ran {} statements from {}", statements.len(), path.as_ref().display());
        Ok(statements.len())
    }
}

/// Split script text on `;`, ignoring separators inside quotes and
/// dropping `--` comment lines.
pub fn split_statements(text: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut at_line_start = true;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None if at_line_start && c == '-' && chars.peek() == Some(&'-') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
                continue;
            }
            None if c == ';' => {
                let stmt = current.trim();
                if !stmt.is_empty() {
                    statements.push(stmt.to_string());
                }
                current.clear();
            }
            None => {
                if c == '\'' || c == '"' {
                    quote = Some(c);
                }
                current.push(c);
            }
        }
        at_line_start = c == '\n' || (at_line_start && c.is_whitespace() && quote.is_none());
    }
    let stmt = current.trim();
    if !stmt.is_empty() {
        statements.push(stmt.to_string());
    }
    statements
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_outside_quotes_only() {
        let text = "-- header\nCREATE TABLE T(A INT);\nINSERT INTO T VALUES ('a;b');\n  -- note\nDROP TABLE T";
        assert_eq!(
            split_statements(text),
            vec!["CREATE TABLE T(A INT)", "INSERT INTO T VALUES ('a;b')", "DROP TABLE T"]
        );
    }

    #[test]
    fn doubled_quotes_stay_inside_literal() {
        let text = "INSERT INTO T VALUES ('it''s;here');";
        assert_eq!(split_statements(text), vec!["INSERT INTO T VALUES ('it''s;here')"]);
    }
}
