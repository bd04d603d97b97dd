use keyguard::catalog::Catalog;
use keyguard::error::{DbError, DbResult};
use keyguard::execution::{handle_statement, StatementOutcome};
use keyguard::sql::parser::parse_statement;

fn run(catalog: &mut Catalog, sql: &str) -> DbResult<StatementOutcome> {
    handle_statement(catalog, parse_statement(sql)?)
}

fn setup() -> Catalog {
    let mut catalog = Catalog::default();
    run(&mut catalog, "CREATE TABLE users (id INT PRIMARY KEY, email VARCHAR UNIQUE)").unwrap();
    run(&mut catalog, "CREATE TABLE orders (id INT PRIMARY KEY, user_id INT REFERENCES users (id))").unwrap();
    run(&mut catalog, "INSERT INTO users VALUES (1, 'a@x'), (2, 'b@x')").unwrap();
    catalog
}

#[test]
fn child_row_needs_parent() {
    let mut catalog = setup();
    run(&mut catalog, "INSERT INTO orders VALUES (100, 1)").unwrap();
    let res = run(&mut catalog, "INSERT INTO orders VALUES (101, 9)");
    assert!(matches!(res, Err(DbError::ForeignKeyViolation(_))));
    assert_eq!(catalog.get_table("ORDERS").unwrap().row_count(), 1);
}

#[test]
fn null_reference_is_not_checked() {
    let mut catalog = setup();
    run(&mut catalog, "INSERT INTO orders VALUES (100, NULL)").unwrap();
}

#[test]
fn composite_key_with_partial_null_is_accepted() {
    let mut catalog = Catalog::default();
    run(&mut catalog, "CREATE TABLE p (a INT, b INT, PRIMARY KEY (a, b))").unwrap();
    run(&mut catalog, "CREATE TABLE c (x INT, y INT, FOREIGN KEY (x, y) REFERENCES p (a, b))").unwrap();
    run(&mut catalog, "INSERT INTO p VALUES (1, 1)").unwrap();
    run(&mut catalog, "INSERT INTO c VALUES (1, 1), (5, NULL)").unwrap();
    assert!(run(&mut catalog, "INSERT INTO c VALUES (5, 5)").is_err());
}

#[test]
fn reference_columns_pair_by_name() {
    let mut catalog = Catalog::default();
    run(&mut catalog, "CREATE TABLE p (a INT, b INT, CONSTRAINT uq_ab UNIQUE (a, b))").unwrap();
    run(&mut catalog, "CREATE TABLE c (x INT, y INT)").unwrap();
    run(&mut catalog, "ALTER TABLE c ADD CONSTRAINT fk FOREIGN KEY (y, x) REFERENCES p (b, a)").unwrap();
    run(&mut catalog, "INSERT INTO p VALUES (1, 2)").unwrap();
    // x pairs with a, y with b
    run(&mut catalog, "INSERT INTO c VALUES (1, 2)").unwrap();
    assert!(run(&mut catalog, "INSERT INTO c VALUES (2, 1)").is_err());
    let fk = catalog.get_constraint("FK").unwrap().as_foreign_key().unwrap();
    assert_eq!(fk.referenced_constraint().unwrap(), "UQ_AB");
}

#[test]
fn referenced_row_cannot_be_deleted() {
    let mut catalog = setup();
    run(&mut catalog, "INSERT INTO orders VALUES (100, 1)").unwrap();
    let res = run(&mut catalog, "DELETE FROM users WHERE id = 1");
    assert!(matches!(res, Err(DbError::ForeignKeyViolation(_))));
    run(&mut catalog, "DELETE FROM users WHERE id = 2").unwrap();
    run(&mut catalog, "DELETE FROM orders").unwrap();
    run(&mut catalog, "DELETE FROM users WHERE id = 1").unwrap();
    assert_eq!(catalog.get_table("USERS").unwrap().row_count(), 0);
}

#[test]
fn existing_orphans_block_the_constraint() {
    let mut catalog = Catalog::default();
    run(&mut catalog, "CREATE TABLE p (id INT PRIMARY KEY)").unwrap();
    run(&mut catalog, "CREATE TABLE c (pid INT)").unwrap();
    run(&mut catalog, "INSERT INTO c VALUES (7)").unwrap();
    let res = run(&mut catalog, "ALTER TABLE c ADD CONSTRAINT fk FOREIGN KEY (pid) REFERENCES p");
    assert!(matches!(res, Err(DbError::ForeignKeyViolation(_))));
    assert!(!catalog.has_constraint("FK"));
    assert!(catalog.get_table("P").unwrap().constraints.iter().all(|c| c != "FK"));
}

#[test]
fn reference_needs_a_unique_key() {
    let mut catalog = Catalog::default();
    run(&mut catalog, "CREATE TABLE p (id INT, other INT)").unwrap();
    run(&mut catalog, "CREATE TABLE c (pid INT)").unwrap();
    let res = run(&mut catalog, "ALTER TABLE c ADD FOREIGN KEY (pid) REFERENCES p (other)");
    assert!(matches!(res, Err(DbError::ConstraintNotFound(_))));
    let res = run(&mut catalog, "ALTER TABLE c ADD FOREIGN KEY (pid) REFERENCES p");
    assert!(matches!(res, Err(DbError::ConstraintNotFound(_))));
}

#[test]
fn self_reference() {
    let mut catalog = Catalog::default();
    run(&mut catalog, "CREATE TABLE emp (id INT PRIMARY KEY, boss INT)").unwrap();
    run(&mut catalog, "ALTER TABLE emp ADD CONSTRAINT fk_boss FOREIGN KEY (boss) REFERENCES emp (id)").unwrap();
    run(&mut catalog, "INSERT INTO emp VALUES (1, NULL)").unwrap();
    run(&mut catalog, "INSERT INTO emp VALUES (2, 1)").unwrap();
    assert!(run(&mut catalog, "INSERT INTO emp VALUES (3, 9)").is_err());
    assert!(run(&mut catalog, "DELETE FROM emp WHERE id = 1").is_err());
    run(&mut catalog, "DROP TABLE emp").unwrap();
    assert_eq!(catalog.meta_records().count(), 0);
}
