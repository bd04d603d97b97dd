/// Quote an identifier for generated SQL: `a"b` becomes `"a""b"`.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn quote_qualified(schema: &str, name: &str) -> String {
    format!("{}.{}", quote_identifier(schema), quote_identifier(name))
}

pub fn quote_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
