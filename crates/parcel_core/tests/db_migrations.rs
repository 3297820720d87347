use parcel_core::db::migrations::{current_user_version, latest_version};
use parcel_core::db::{open_db, open_db_in_memory, DbError};
use parcel_core::{NewParcel, ParcelRepository, ParcelStatus, SqliteParcelStore};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(current_user_version(&conn).unwrap(), latest_version());
    assert_table_exists(&conn, "parcel");
    assert_table_exists(&conn, "sqlite_sequence");
}

#[test]
fn opening_same_database_twice_keeps_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tracker.db");

    let conn_first = open_db(&path).unwrap();
    let number = SqliteParcelStore::try_new(&conn_first)
        .unwrap()
        .add(&NewParcel::new(
            1,
            ParcelStatus::Registered,
            "kept",
            "2024-05-01T10:00:00Z",
        ))
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(current_user_version(&conn_second).unwrap(), latest_version());
    let store = SqliteParcelStore::try_new(&conn_second).unwrap();
    assert_eq!(store.get(number).unwrap().address, "kept");
}

#[test]
fn opening_database_with_existing_parcel_table_adopts_it() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tracker.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE parcel (
            number INTEGER PRIMARY KEY AUTOINCREMENT,
            client INTEGER NOT NULL,
            status TEXT NOT NULL,
            address TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        INSERT INTO parcel (client, status, address, created_at)
        VALUES (7, 'sent', 'legacy', '2023-01-01T00:00:00Z');",
    )
    .unwrap();
    drop(conn);

    let conn = open_db(&path).unwrap();
    assert_eq!(current_user_version(&conn).unwrap(), latest_version());
    let store = SqliteParcelStore::try_new(&conn).unwrap();
    let parcels = store.get_by_client(7).unwrap();
    assert_eq!(parcels.len(), 1);
    assert_eq!(parcels[0].status, ParcelStatus::Sent);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
