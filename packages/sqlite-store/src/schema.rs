//! Schema setup and migrations for the SQLite backend.
//!
//! Migrations are embedded at compile time with `include_str!` and applied
//! through SQLite's `user_version` pragma via `rusqlite_migration`.

use rusqlite::Connection;
use rusqlite_migration::{Migrations, M};

use quill_store::Error;

/// All schema migrations, applied in order.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        M::up(include_str!("migrations/001_initial_schema.sql")),
        // Future migrations go here as new M::up(...) entries.
    ])
}

/// Opens (or creates) a database at `path`, configured and migrated.
pub fn open_database(path: &str) -> Result<Connection, Error> {
    let mut conn = Connection::open(path).map_err(Error::backend)?;
    configure_and_migrate(&mut conn)?;
    Ok(conn)
}

/// Opens an in-memory database, configured and migrated.
pub fn open_in_memory() -> Result<Connection, Error> {
    let mut conn = Connection::open_in_memory().map_err(Error::backend)?;
    configure_and_migrate(&mut conn)?;
    Ok(conn)
}

fn configure_and_migrate(conn: &mut Connection) -> Result<(), Error> {
    // WAL keeps concurrent readers cheap; NORMAL synchronous is safe
    // under WAL.
    conn.pragma_update(None, "journal_mode", "WAL")
        .map_err(Error::backend)?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .map_err(Error::backend)?;

    migrations().to_latest(conn).map_err(Error::backend)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_validate() {
        migrations().validate().unwrap();
    }

    #[test]
    fn schema_has_the_documents_table() {
        let conn = open_in_memory().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'documents'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }
}
