use keyguard::catalog::Catalog;
use keyguard::config::EngineConfig;
use keyguard::constraints::NullsDistinct;
use keyguard::error::{DbError, DbResult};
use keyguard::execution::{handle_statement, StatementOutcome};
use keyguard::sql::parser::parse_statement;

fn run(catalog: &mut Catalog, sql: &str) -> DbResult<StatementOutcome> {
    handle_statement(catalog, parse_statement(sql)?)
}

#[test]
fn distinct_nulls_may_repeat() {
    let mut catalog = Catalog::default();
    run(&mut catalog, "CREATE TABLE t (a INT, b INT, CONSTRAINT uq UNIQUE (a, b))").unwrap();
    run(&mut catalog, "INSERT INTO t VALUES (1, NULL)").unwrap();
    run(&mut catalog, "INSERT INTO t VALUES (1, NULL)").unwrap();
    run(&mut catalog, "INSERT INTO t VALUES (NULL, NULL), (NULL, NULL)").unwrap();
    run(&mut catalog, "INSERT INTO t VALUES (1, 2)").unwrap();
    let res = run(&mut catalog, "INSERT INTO t VALUES (1, 2)");
    assert!(matches!(res, Err(DbError::DuplicateKey { constraint, .. }) if constraint == "UQ"));
    assert_eq!(catalog.get_table("T").unwrap().row_count(), 5);
}

#[test]
fn not_distinct_nulls_collide() {
    let mut catalog = Catalog::default();
    run(&mut catalog, "CREATE TABLE t (a INT, b INT, CONSTRAINT uq UNIQUE NULLS NOT DISTINCT (a, b))").unwrap();
    run(&mut catalog, "INSERT INTO t VALUES (1, NULL)").unwrap();
    let res = run(&mut catalog, "INSERT INTO t VALUES (1, NULL)");
    assert!(matches!(res, Err(DbError::DuplicateKey { .. })));
    run(&mut catalog, "INSERT INTO t VALUES (2, NULL)").unwrap();
    run(&mut catalog, "INSERT INTO t VALUES (NULL, NULL)").unwrap();
    assert!(run(&mut catalog, "INSERT INTO t VALUES (NULL, NULL)").is_err());
}

#[test]
fn configured_default_policy_applies_without_clause() {
    let config = EngineConfig::default().with_nulls_distinct(NullsDistinct::NotDistinct);
    let mut catalog = Catalog::new(config);
    run(&mut catalog, "CREATE TABLE t (a INT UNIQUE)").unwrap();
    run(&mut catalog, "INSERT INTO t VALUES (NULL)").unwrap();
    assert!(matches!(run(&mut catalog, "INSERT INTO t VALUES (NULL)"), Err(DbError::DuplicateKey { .. })));

    let name = catalog.get_table("T").unwrap().constraints[0].clone();
    let uq = catalog.get_constraint(&name).unwrap().as_unique().unwrap();
    assert_eq!(uq.nulls_distinct().unwrap(), NullsDistinct::NotDistinct);
}

#[test]
fn explicit_clause_overrides_configuration() {
    let config = EngineConfig::default().with_nulls_distinct(NullsDistinct::NotDistinct);
    let mut catalog = Catalog::new(config);
    run(&mut catalog, "CREATE TABLE t (a INT, UNIQUE NULLS DISTINCT (a))").unwrap();
    run(&mut catalog, "INSERT INTO t VALUES (NULL), (NULL)").unwrap();
}

#[test]
fn primary_key_rejects_null() {
    let mut catalog = Catalog::default();
    run(&mut catalog, "CREATE TABLE t (a INT, b INT, PRIMARY KEY (a, b))").unwrap();
    let res = run(&mut catalog, "INSERT INTO t VALUES (1, NULL)");
    assert!(matches!(res, Err(DbError::NullViolation(_))));
    run(&mut catalog, "INSERT INTO t VALUES (1, 1)").unwrap();
    assert!(matches!(run(&mut catalog, "INSERT INTO t VALUES (1, 1)"), Err(DbError::DuplicateKey { .. })));
}

#[test]
fn primary_key_over_existing_nulls_fails() {
    let mut catalog = Catalog::default();
    run(&mut catalog, "CREATE TABLE t (a INT)").unwrap();
    run(&mut catalog, "INSERT INTO t VALUES (1), (NULL)").unwrap();
    let res = run(&mut catalog, "ALTER TABLE t ADD CONSTRAINT pk PRIMARY KEY (a)");
    assert!(matches!(res, Err(DbError::NullViolation(_))));
    assert!(!catalog.has_constraint("PK"));
    assert_eq!(catalog.get_table("T").unwrap().not_null, vec![false]);
}

#[test]
fn policy_decides_whether_existing_rows_are_duplicates() {
    let mut catalog = Catalog::default();
    run(&mut catalog, "CREATE TABLE t (a INT, b INT)").unwrap();
    run(&mut catalog, "INSERT INTO t VALUES (1, NULL), (1, NULL)").unwrap();

    let res = run(&mut catalog, "ALTER TABLE t ADD CONSTRAINT strict UNIQUE NULLS NOT DISTINCT (a, b)");
    assert!(matches!(res, Err(DbError::DuplicateKey { .. })));
    assert!(!catalog.has_index("STRICT_INDEX"));

    run(&mut catalog, "ALTER TABLE t ADD CONSTRAINT lenient UNIQUE NULLS DISTINCT (a, b)").unwrap();
    assert_eq!(catalog.get_index("LENIENT_INDEX").unwrap().row_count(), 2);
}

#[test]
fn composite_keys_follow_the_same_policy() {
    let mut catalog = Catalog::default();
    run(&mut catalog, "CREATE TABLE t (tags INT ARRAY UNIQUE)").unwrap();
    run(&mut catalog, "INSERT INTO t VALUES (ARRAY [1, NULL])").unwrap();
    run(&mut catalog, "INSERT INTO t VALUES (ARRAY [1, NULL])").unwrap();
    run(&mut catalog, "INSERT INTO t VALUES (ARRAY [1, 2])").unwrap();
    assert!(run(&mut catalog, "INSERT INTO t VALUES (ARRAY [1, 2])").is_err());
    // a longer array is a different key
    run(&mut catalog, "INSERT INTO t VALUES (ARRAY [1, 2, 3])").unwrap();
}

#[test]
fn ignore_case_collation_detects_duplicates() {
    let config = EngineConfig::default().with_collation(keyguard::value::Collation::IgnoreCase);
    let mut catalog = Catalog::new(config);
    run(&mut catalog, "CREATE TABLE t (name VARCHAR UNIQUE)").unwrap();
    run(&mut catalog, "INSERT INTO t VALUES ('Alice')").unwrap();
    assert!(matches!(run(&mut catalog, "INSERT INTO t VALUES ('ALICE')"), Err(DbError::DuplicateKey { .. })));
}
