mod common;

use common::init_logs;
use litebind::{Connection, Error};
use tempfile::TempDir;

#[test]
fn create_database() {
    init_logs();
    let dir = TempDir::new().expect("Failed to create scratch directory");
    let db_path = dir.path().join("creation.sqlite");
    assert!(
        !db_path.exists(),
        "Database file should not exist before open"
    );
    let connection = Connection::open(&db_path);
    assert!(connection.is_ready(), "Could not open the database");
    assert!(
        db_path.exists(),
        "Database file should be created after open"
    );
}

#[test]
fn unreachable_path_is_not_ready() {
    init_logs();
    let dir = TempDir::new().expect("Failed to create scratch directory");
    let db_path = dir.path().join("missing").join("nested.sqlite");
    let connection = Connection::open(&db_path);
    assert!(
        !connection.is_ready(),
        "Opening inside a non-existent directory should not be ready"
    );
    assert_eq!(connection.last_insert_row_id(), -1);
}

#[test]
fn last_insert_row_id_tracks_inserts() {
    init_logs();
    let dir = TempDir::new().expect("Failed to create scratch directory");
    let connection = Connection::open(dir.path().join("rowid.sqlite"));
    assert!(connection.is_ready(), "Could not open the database");
    connection
        .prepare_statement("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT)")
        .execute()
        .expect("Failed to create the table");

    let mut insert = connection.prepare_statement("INSERT INTO notes (body) VALUES (?1)");
    assert!(insert.is_valid());
    insert.bind_text(1, "first").expect("Failed to bind body");
    insert.execute().expect("Failed to insert");
    assert_eq!(connection.last_insert_row_id(), 1);

    let mut insert = connection.prepare_statement("INSERT INTO notes (id, body) VALUES (?1, ?2)");
    insert.bind_int(1, 42).expect("Failed to bind id");
    insert.bind_text(2, "second").expect("Failed to bind body");
    insert.execute().expect("Failed to insert");
    assert_eq!(connection.last_insert_row_id(), 42);
}

#[test]
fn statements_from_not_ready_connection_are_invalid() {
    init_logs();
    let dir = TempDir::new().expect("Failed to create scratch directory");
    let connection = Connection::open(dir.path().join("missing").join("nested.sqlite"));
    assert!(!connection.is_ready());

    let mut statement = connection.prepare_statement("SELECT 1");
    assert!(!statement.is_valid());
    assert!(matches!(statement.execute(), Err(Error::StatementInvalid)));
    assert!(matches!(statement.next_row(), Err(Error::StatementInvalid)));
    assert!(matches!(
        statement.bind_int(1, 7),
        Err(Error::StatementInvalid)
    ));
    assert!(matches!(
        statement.bind_text(1, "x"),
        Err(Error::StatementInvalid)
    ));
    assert_eq!(statement.text_at(0), None);
    assert_eq!(statement.int_at(0), 0);
    assert_eq!(statement.double_at(0), 0.0);
    assert_eq!(statement.blob_at(0), None);
}

#[test]
fn statement_keeps_engine_handle_alive_after_connection_drop() {
    init_logs();
    let dir = TempDir::new().expect("Failed to create scratch directory");
    let connection = Connection::open(dir.path().join("outlive.sqlite"));
    assert!(connection.is_ready(), "Could not open the database");
    connection
        .prepare_statement("CREATE TABLE t (v TEXT)")
        .execute()
        .expect("Failed to create the table");
    connection
        .prepare_statement("INSERT INTO t (v) VALUES ('kept')")
        .execute()
        .expect("Failed to insert");

    let mut select = connection.prepare_statement("SELECT v FROM t");
    assert!(select.is_valid());
    drop(connection);

    // The engine handle is shared, the statement keeps it open.
    assert!(select.next_row().expect("Step after connection drop failed"));
    assert_eq!(select.text_at(0).as_deref(), Some("kept"));
    assert!(!select.next_row().expect("Exhaustion step failed"));
}
