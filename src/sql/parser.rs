use nom::branch::alt;
use nom::bytes::complete::{tag_no_case, take_while};
use nom::character::complete::{char, digit0, digit1, multispace0, one_of, satisfy};
use nom::combinator::{eof, opt, recognize, value};
use nom::error::{Error, ErrorKind};
use nom::multi::{many0, separated_list0, separated_list1};
use nom::sequence::{delimited, preceded, terminated};
use nom::{IResult, Parser};

use crate::constraints::NullsDistinct;
use crate::error::{DbError, DbResult};
use crate::index::SortOrder;
use crate::sql::ast::{
    ColumnDef, Equals, ForeignKeyDef, IndexDef, Statement, TableConstraintDef, UniqueDef,
};
use crate::storage::row::ColumnType;
use crate::value::Value;

type PResult<'a, T> = IResult<&'a str, T>;

fn fail<T>(input: &str, kind: ErrorKind) -> PResult<'_, T> {
    Err(nom::Err::Error(Error::new(input, kind)))
}

fn ws(input: &str) -> PResult<'_, &str> {
    multispace0(input)
}

/// Case-insensitive keyword that must not run into a following word.
fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    move |input: &'a str| {
        let (rest, _) = ws(input)?;
        let parsed: PResult<'a, &'a str> = tag_no_case(kw).parse(rest);
        let (rest, matched) = parsed?;
        if rest.chars().next().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            return fail(input, ErrorKind::Tag);
        }
        Ok((rest, matched))
    }
}

fn symbol<'a>(c: char) -> impl FnMut(&'a str) -> PResult<'a, char> {
    move |input: &'a str| preceded(ws, char(c)).parse(input)
}

/// Body of a `quote`-delimited token; a doubled quote stands for itself.
fn quoted(input: &str, quote: char) -> PResult<'_, String> {
    let Some(body) = input.strip_prefix(quote) else {
        return fail(input, ErrorKind::Char);
    };
    let mut out = String::new();
    let mut chars = body.char_indices();
    while let Some((i, c)) = chars.next() {
        if c != quote {
            out.push(c);
        } else if body[i + 1..].starts_with(quote) {
            out.push(quote);
            chars.next();
        } else {
            return Ok((&body[i + 1..], out));
        }
    }
    fail(input, ErrorKind::Char)
}

/// Unquoted identifiers are folded to upper case, quoted ones kept as is.
fn identifier(input: &str) -> PResult<'_, String> {
    let (input, _) = ws(input)?;
    if input.starts_with('"') {
        return quoted(input, '"');
    }
    let word: PResult<'_, &str> = recognize((
        satisfy(|c| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    ))
    .parse(input);
    let (rest, word) = word?;
    Ok((rest, word.to_uppercase()))
}

/// `name` or `schema.name`; the schema part is dropped.
fn qualified_name(input: &str) -> PResult<'_, String> {
    let (input, first) = identifier(input)?;
    let (input, second) = opt(preceded(symbol('.'), identifier)).parse(input)?;
    Ok((input, second.unwrap_or(first)))
}

fn string_text(input: &str) -> PResult<'_, String> {
    let (input, _) = ws(input)?;
    quoted(input, '\'')
}

fn if_exists(input: &str) -> PResult<'_, bool> {
    opt((keyword("IF"), keyword("EXISTS"))).map(|o| o.is_some()).parse(input)
}

fn if_not_exists(input: &str) -> PResult<'_, bool> {
    opt((keyword("IF"), keyword("NOT"), keyword("EXISTS"))).map(|o| o.is_some()).parse(input)
}

fn number(input: &str) -> PResult<'_, Value> {
    let (input, _) = ws(input)?;
    let text: PResult<'_, &str> = recognize((
        opt(one_of("+-")),
        digit1,
        opt((char('.'), digit0)),
        opt((one_of("eE"), opt(one_of("+-")), digit1)),
    ))
    .parse(input);
    let (rest, text) = text?;
    if !text.contains(['.', 'e', 'E']) {
        if let Ok(i) = text.parse::<i64>() {
            return Ok((rest, Value::Integer(i)));
        }
    }
    match text.parse::<f64>() {
        Ok(d) => Ok((rest, Value::Double(d))),
        Err(_) => fail(input, ErrorKind::Float),
    }
}

fn special_double(input: &str) -> PResult<'_, Value> {
    alt((
        value(Value::Double(f64::NAN), keyword("NAN")),
        value(Value::Double(f64::INFINITY), keyword("INF")),
        value(Value::Double(f64::NEG_INFINITY), (symbol('-'), keyword("INF"))),
    ))
    .parse(input)
}

fn literal_list<'a>(open: char, close: char) -> impl FnMut(&'a str) -> PResult<'a, Vec<Value>> {
    move |input: &'a str| delimited(symbol(open), separated_list0(symbol(','), literal), symbol(close)).parse(input)
}

/// NULL, TRUE/FALSE, numbers, 'strings', ARRAY [..] and ROW (..).
pub fn literal(input: &str) -> PResult<'_, Value> {
    alt((
        value(Value::Null, keyword("NULL")),
        value(Value::Boolean(true), keyword("TRUE")),
        value(Value::Boolean(false), keyword("FALSE")),
        preceded(keyword("ARRAY"), literal_list('[', ']')).map(Value::array),
        preceded(keyword("ROW"), literal_list('(', ')')).map(Value::row),
        string_text.map(Value::Varchar),
        number,
        special_double,
    ))
    .parse(input)
}

fn scalar_type(input: &str) -> PResult<'_, ColumnType> {
    let (input, word) = identifier(input)?;
    if word == "ROW" {
        let (rest, fields) =
            delimited(symbol('('), separated_list1(symbol(','), column_type), symbol(')')).parse(input)?;
        return Ok((rest, ColumnType::Row(fields)));
    }
    let (input, word) = if word == "DOUBLE" {
        (opt(keyword("PRECISION")).parse(input)?.0, word)
    } else if word == "CHARACTER" {
        match keyword("VARYING").parse(input) {
            Ok((rest, _)) => (rest, "VARCHAR".to_string()),
            Err(_) => (input, word),
        }
    } else {
        (input, word)
    };
    let (rest, size) = opt(delimited(symbol('('), preceded(ws, digit1), symbol(')'))).parse(input)?;
    let ty = match (word.as_str(), size) {
        ("CHAR" | "CHARACTER", Some(n)) => n.parse().ok().map(ColumnType::Char),
        _ => ColumnType::from_str(&word),
    };
    match ty {
        Some(ty) => Ok((rest, ty)),
        None => fail(input, ErrorKind::Verify),
    }
}

/// A scalar or ROW type followed by any number of `ARRAY` suffixes.
fn column_type(input: &str) -> PResult<'_, ColumnType> {
    let (input, base) = scalar_type(input)?;
    let (input, depth) = many0(keyword("ARRAY")).parse(input)?;
    let ty = depth.iter().fold(base, |ty, _| ColumnType::Array(Box::new(ty)));
    Ok((input, ty))
}

fn sort_order(input: &str) -> PResult<'_, SortOrder> {
    opt(alt((value(SortOrder::Desc, keyword("DESC")), value(SortOrder::Asc, keyword("ASC")))))
        .map(Option::unwrap_or_default)
        .parse(input)
}

fn index_columns(input: &str) -> PResult<'_, Vec<(String, SortOrder)>> {
    delimited(symbol('('), separated_list1(symbol(','), (identifier, sort_order)), symbol(')')).parse(input)
}

fn column_names(input: &str) -> PResult<'_, Vec<String>> {
    delimited(symbol('('), separated_list1(symbol(','), identifier), symbol(')')).parse(input)
}

fn nulls_clause(input: &str) -> PResult<'_, NullsDistinct> {
    preceded(
        keyword("NULLS"),
        alt((
            value(NullsDistinct::NotDistinct, (keyword("NOT"), keyword("DISTINCT"))),
            value(NullsDistinct::Distinct, keyword("DISTINCT")),
        )),
    )
    .parse(input)
}

fn unique_def(primary_key: bool, nulls_distinct: Option<NullsDistinct>, columns: Vec<(String, SortOrder)>) -> UniqueDef {
    UniqueDef { name: None, comment: None, primary_key, nulls_distinct, columns, index: None }
}

fn primary_key_body(input: &str) -> PResult<'_, TableConstraintDef> {
    let (input, _) = (keyword("PRIMARY"), keyword("KEY")).parse(input)?;
    let (input, columns) = index_columns(input)?;
    let (input, index) = opt(preceded(keyword("INDEX"), qualified_name)).parse(input)?;
    let def = UniqueDef { index, ..unique_def(true, None, columns) };
    Ok((input, TableConstraintDef::Unique(def)))
}

fn unique_body(input: &str) -> PResult<'_, TableConstraintDef> {
    let (input, _) = keyword("UNIQUE")(input)?;
    let (input, nulls) = opt(nulls_clause).parse(input)?;
    let (input, _) = opt(keyword("KEY")).parse(input)?;
    let (input, columns) = index_columns(input)?;
    let (input, index) = opt(preceded(keyword("INDEX"), qualified_name)).parse(input)?;
    let def = UniqueDef { index, ..unique_def(false, nulls, columns) };
    Ok((input, TableConstraintDef::Unique(def)))
}

fn references(input: &str) -> PResult<'_, (String, Vec<String>)> {
    let (input, _) = keyword("REFERENCES")(input)?;
    let (input, table) = qualified_name(input)?;
    let (input, columns) = opt(column_names).parse(input)?;
    Ok((input, (table, columns.unwrap_or_default())))
}

fn foreign_key_body(input: &str) -> PResult<'_, TableConstraintDef> {
    let (input, _) = (keyword("FOREIGN"), keyword("KEY")).parse(input)?;
    let (input, columns) = column_names(input)?;
    let (input, (ref_table, ref_columns)) = references(input)?;
    Ok((
        input,
        TableConstraintDef::ForeignKey(ForeignKeyDef { name: None, comment: None, columns, ref_table, ref_columns }),
    ))
}

/// `[CONSTRAINT name] [COMMENT 'text'] PRIMARY KEY | UNIQUE | FOREIGN KEY ...`
fn table_constraint(input: &str) -> PResult<'_, TableConstraintDef> {
    let (input, name) = opt(preceded(keyword("CONSTRAINT"), qualified_name)).parse(input)?;
    let (input, comment) = opt(preceded(keyword("COMMENT"), string_text)).parse(input)?;
    let (input, mut def) = alt((primary_key_body, unique_body, foreign_key_body)).parse(input)?;
    match &mut def {
        TableConstraintDef::Unique(u) => {
            u.name = name;
            u.comment = comment;
        }
        TableConstraintDef::ForeignKey(f) => {
            f.name = name;
            f.comment = comment;
        }
    }
    Ok((input, def))
}

#[derive(Debug, Clone)]
enum ColumnOption {
    NotNull,
    Nullable,
    PrimaryKey,
    Unique(Option<NullsDistinct>),
    References(String, Vec<String>),
}

fn column_option(input: &str) -> PResult<'_, ColumnOption> {
    alt((
        value(ColumnOption::NotNull, (keyword("NOT"), keyword("NULL"))),
        value(ColumnOption::Nullable, keyword("NULL")),
        value(ColumnOption::PrimaryKey, (keyword("PRIMARY"), keyword("KEY"))),
        preceded(keyword("UNIQUE"), opt(nulls_clause)).map(ColumnOption::Unique),
        references.map(|(t, c)| ColumnOption::References(t, c)),
    ))
    .parse(input)
}

enum TableElement {
    Column(ColumnDef, Vec<TableConstraintDef>),
    Constraint(TableConstraintDef),
}

fn column_def(input: &str) -> PResult<'_, TableElement> {
    let (input, name) = identifier(input)?;
    let (input, ty) = column_type(input)?;
    let (input, options) = many0(column_option).parse(input)?;
    let mut not_null = false;
    let mut constraints = Vec::new();
    for option in options {
        match option {
            ColumnOption::NotNull => not_null = true,
            ColumnOption::Nullable => {}
            ColumnOption::PrimaryKey => constraints.push(TableConstraintDef::Unique(unique_def(
                true,
                None,
                vec![(name.clone(), SortOrder::Asc)],
            ))),
            ColumnOption::Unique(nulls) => constraints.push(TableConstraintDef::Unique(unique_def(
                false,
                nulls,
                vec![(name.clone(), SortOrder::Asc)],
            ))),
            ColumnOption::References(ref_table, ref_columns) => {
                constraints.push(TableConstraintDef::ForeignKey(ForeignKeyDef {
                    name: None,
                    comment: None,
                    columns: vec![name.clone()],
                    ref_table,
                    ref_columns,
                }))
            }
        }
    }
    Ok((input, TableElement::Column(ColumnDef { name, ty, not_null }, constraints)))
}

fn create_table(input: &str) -> PResult<'_, Statement> {
    let (input, _) = (keyword("CREATE"), keyword("TABLE")).parse(input)?;
    let (input, if_not_exists) = if_not_exists(input)?;
    let (input, table_name) = qualified_name(input)?;
    let (input, elements) = delimited(
        symbol('('),
        separated_list1(symbol(','), alt((table_constraint.map(TableElement::Constraint), column_def))),
        symbol(')'),
    )
    .parse(input)?;
    let mut columns = Vec::new();
    let mut constraints = Vec::new();
    for element in elements {
        match element {
            TableElement::Column(col, inline) => {
                columns.push(col);
                constraints.extend(inline);
            }
            TableElement::Constraint(c) => constraints.push(c),
        }
    }
    Ok((input, Statement::CreateTable { table_name, columns, constraints, if_not_exists }))
}

fn create_index(input: &str) -> PResult<'_, Statement> {
    let (input, _) = keyword("CREATE")(input)?;
    let (input, unique) = opt(preceded(keyword("UNIQUE"), opt(nulls_clause))).parse(input)?;
    let (input, _) = keyword("INDEX")(input)?;
    let (input, name) = qualified_name(input)?;
    let (input, _) = keyword("ON")(input)?;
    let (input, table_name) = qualified_name(input)?;
    let (input, columns) = index_columns(input)?;
    Ok((
        input,
        Statement::CreateIndex(IndexDef {
            name,
            table_name,
            unique: unique.is_some(),
            nulls_distinct: unique.flatten(),
            columns,
        }),
    ))
}

fn alter_table(input: &str) -> PResult<'_, Statement> {
    let (input, _) = (keyword("ALTER"), keyword("TABLE")).parse(input)?;
    let (input, table_name) = qualified_name(input)?;
    let table = table_name.clone();
    alt((
        preceded(keyword("ADD"), table_constraint)
            .map(move |constraint| Statement::AlterTableAddConstraint { table_name: table.clone(), constraint }),
        preceded((keyword("DROP"), keyword("CONSTRAINT")), (if_exists, qualified_name)).map(
            move |(if_exists, constraint_name)| Statement::AlterTableDropConstraint {
                table_name: table_name.clone(),
                constraint_name,
                if_exists,
            },
        ),
    ))
    .parse(input)
}

fn drop_statement(input: &str) -> PResult<'_, Statement> {
    let (input, _) = keyword("DROP")(input)?;
    alt((
        preceded(keyword("TABLE"), (if_exists, qualified_name))
            .map(|(if_exists, table_name)| Statement::DropTable { table_name, if_exists }),
        preceded(keyword("INDEX"), (if_exists, qualified_name))
            .map(|(if_exists, index_name)| Statement::DropIndex { index_name, if_exists }),
    ))
    .parse(input)
}

fn insert(input: &str) -> PResult<'_, Statement> {
    let (input, _) = (keyword("INSERT"), keyword("INTO")).parse(input)?;
    let (input, table_name) = qualified_name(input)?;
    let (input, _) = keyword("VALUES")(input)?;
    let (input, rows) = separated_list1(symbol(','), literal_list('(', ')')).parse(input)?;
    Ok((input, Statement::Insert { table_name, rows }))
}

fn where_equals(input: &str) -> PResult<'_, Option<Equals>> {
    opt(preceded(keyword("WHERE"), (identifier, preceded(symbol('='), literal))))
        .map(|o| o.map(|(column, value)| Equals { column, value }))
        .parse(input)
}

fn delete(input: &str) -> PResult<'_, Statement> {
    let (input, _) = (keyword("DELETE"), keyword("FROM")).parse(input)?;
    let (input, table_name) = qualified_name(input)?;
    let (input, selection) = where_equals(input)?;
    Ok((input, Statement::Delete { table_name, selection }))
}

fn select(input: &str) -> PResult<'_, Statement> {
    let (input, _) = (keyword("SELECT"), symbol('*'), keyword("FROM")).parse(input)?;
    let (input, table_name) = qualified_name(input)?;
    let (input, selection) = where_equals(input)?;
    Ok((input, Statement::Select { table_name, selection }))
}

fn script(input: &str) -> PResult<'_, Statement> {
    alt((
        preceded((keyword("SCRIPT"), keyword("TO")), string_text).map(|path| Statement::Script { path }),
        preceded((keyword("RUNSCRIPT"), keyword("FROM")), string_text).map(|path| Statement::RunScript { path }),
    ))
    .parse(input)
}

fn exit(input: &str) -> PResult<'_, Statement> {
    value(Statement::Exit, alt((keyword("EXIT"), keyword("QUIT")))).parse(input)
}

fn statement(input: &str) -> PResult<'_, Statement> {
    alt((
        create_table,
        create_index,
        alter_table,
        drop_statement,
        insert,
        delete,
        select,
        script,
        exit,
    ))
    .parse(input)
}

pub fn parse_statement(input: &str) -> DbResult<Statement> {
    let text = input.trim().trim_end_matches(';');
    match terminated(statement, (ws, eof)).parse(text) {
        Ok((_, stmt)) => Ok(stmt),
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
            let near: String = e.input.trim_start().chars().take(24).collect();
            if near.is_empty() {
                Err(DbError::ParseError(format!("unexpected end of statement: {}", text)))
            } else {
                Err(DbError::ParseError(format!("syntax error near '{}'", near)))
            }
        }
        Err(nom::Err::Incomplete(_)) => Err(DbError::ParseError("incomplete statement".into())),
    }
}
