//! SQLite implementation of [`DocumentStore`].

mod schema;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once};

use chrono::{DateTime, Duration, Utc};
use percent_encoding::percent_decode_str;
use rusqlite::{params, Connection, OptionalExtension};
use url::Url;

use quill_store::{name, register_store, stamp, Document, DocumentStore, Error, MAX_CONTENT_SIZE};

/// Connection state shared by a store and all of its copies.
///
/// Copies refcount the connection: the last handle to close releases it,
/// after which every handle in the lineage reports
/// [`Error::Closed`].
struct Shared {
    conn: Mutex<Option<Connection>>,
    handles: Mutex<usize>,
}

/// An implementation of [`DocumentStore`] using a SQLite database.
///
/// Versions live in a single append-only `documents` table keyed by
/// `(name, stamp)`; an update is an `INSERT`, the newest version is an
/// `ORDER BY stamp DESC LIMIT 1` scan. Timestamps are stored in the
/// fixed-width [`stamp`] rendering so the TEXT column sorts
/// chronologically.
///
/// `SqliteDocumentStore` is registered with the scheme `sqlite`. The URI
/// path is the database file; the special path `:memory:` opens a private
/// in-memory database:
///
/// ```rust
/// quill_sqlite_store::register();
/// let store = quill_store::new_store("sqlite::memory:").unwrap();
/// store.update("/Front Page", "welcome!").unwrap();
/// ```
///
/// On first open the schema is created (and later migrated) automatically.
/// The database is used from a single connection guarded by a mutex and
/// shared across copies, so operations within one lineage serialize.
pub struct SqliteDocumentStore {
    shared: Arc<Shared>,
    closed: AtomicBool,
}

/// Registers the `sqlite` scheme with the store registry. Safe to call
/// more than once.
pub fn register() {
    static REGISTER: Once = Once::new();
    REGISTER.call_once(|| {
        register_store("sqlite", |target: &Url| {
            if let Some(host) = target.host_str() {
                if !host.is_empty() {
                    return Err(Error::Uri {
                        uri: target.to_string(),
                        message: format!("unexpected host {:?} in sqlite store URI", host),
                    });
                }
            }
            // Url keeps the path percent-encoded; decode it so database
            // files with spaces or non-ASCII names resolve correctly.
            let path = percent_decode_str(target.path())
                .decode_utf8()
                .map_err(|err| Error::Uri {
                    uri: target.to_string(),
                    message: format!("undecodable path: {}", err),
                })?;
            let store = if path == ":memory:" {
                SqliteDocumentStore::open_in_memory()?
            } else {
                SqliteDocumentStore::open(&path)?
            };
            Ok(Box::new(store))
        });
    });
}

impl SqliteDocumentStore {
    /// Opens (or creates) the database file at `path`.
    pub fn open(path: &str) -> Result<SqliteDocumentStore, Error> {
        Ok(SqliteDocumentStore::wrap(schema::open_database(path)?))
    }

    /// Opens a private in-memory database, mainly for tests.
    pub fn open_in_memory() -> Result<SqliteDocumentStore, Error> {
        Ok(SqliteDocumentStore::wrap(schema::open_in_memory()?))
    }

    fn wrap(conn: Connection) -> SqliteDocumentStore {
        SqliteDocumentStore {
            shared: Arc::new(Shared {
                conn: Mutex::new(Some(conn)),
                handles: Mutex::new(1),
            }),
            closed: AtomicBool::new(false),
        }
    }

    fn check_open(&self) -> Result<(), Error> {
        if self.closed.load(Ordering::SeqCst) {
            Err(Error::Closed)
        } else {
            Ok(())
        }
    }

    /// Runs `body` against the shared connection, enforcing the Closed
    /// contract for this handle and for a lineage whose last handle has
    /// already released the connection.
    fn with_conn<T>(&self, body: impl FnOnce(&Connection) -> Result<T, Error>) -> Result<T, Error> {
        self.check_open()?;
        let guard = self.shared.conn.lock().expect("sqlite store lock poisoned");
        match guard.as_ref() {
            Some(conn) => body(conn),
            None => Err(Error::Closed),
        }
    }

    fn fetch_documents(
        conn: &Connection,
        name: &str,
        sql: &str,
    ) -> Result<Vec<Document>, Error> {
        let mut stmt = conn.prepare(sql).map_err(Error::backend)?;
        let rows = stmt
            .query_map(params![name], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(Error::backend)?;

        let mut documents = Vec::new();
        for row in rows {
            let (content, rendered) = row.map_err(Error::backend)?;
            documents.push(Document {
                name: name.to_string(),
                content,
                timestamp: stamp::parse(&rendered).map_err(Error::backend)?,
            });
        }
        Ok(documents)
    }

    /// Inserts one version row. A primary key conflict means a timestamp
    /// collision; nudge forward so both versions survive. Returns the new
    /// version count.
    fn insert_version(
        conn: &Connection,
        name: &str,
        content: &str,
        mut timestamp: DateTime<Utc>,
    ) -> Result<usize, Error> {
        loop {
            let inserted = conn.execute(
                "INSERT INTO documents (name, content, stamp) VALUES (?1, ?2, ?3)",
                params![name, content, stamp::render(&timestamp)],
            );
            match inserted {
                Ok(_) => break,
                Err(rusqlite::Error::SqliteFailure(failure, _))
                    if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    timestamp += Duration::nanoseconds(1);
                }
                Err(err) => return Err(Error::backend(err)),
            }
        }
        log::debug!("inserted version of {:?}", name);

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM documents WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .map_err(Error::backend)?;
        Ok(count as usize)
    }

    fn document_exists(conn: &Connection, name: &str) -> Result<bool, Error> {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM documents WHERE name = ?1)",
            params![name],
            |row| row.get(0),
        )
        .map_err(Error::backend)
    }
}

/// Escapes `%`, `_` and `\` so a Name can be spliced into a LIKE pattern.
/// All three are legal segment characters.
fn escape_like(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl DocumentStore for SqliteDocumentStore {
    fn get(&self, name: &str) -> Result<Document, Error> {
        self.check_open()?;
        if !name::validate(name) {
            return Err(Error::invalid_name(name));
        }
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT content, stamp FROM documents
                         WHERE name = ?1 ORDER BY stamp DESC LIMIT 1",
                    params![name],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
                )
                .optional()
                .map_err(Error::backend)?;

            match row {
                Some((content, rendered)) => Ok(Document {
                    name: name.to_string(),
                    content,
                    timestamp: stamp::parse(&rendered).map_err(Error::backend)?,
                }),
                None => Err(Error::not_found(name)),
            }
        })
    }

    fn get_all(&self, name: &str) -> Result<Vec<Document>, Error> {
        self.check_open()?;
        if !name::validate(name) {
            return Err(Error::invalid_name(name));
        }
        self.with_conn(|conn| {
            let documents = Self::fetch_documents(
                conn,
                name,
                "SELECT content, stamp FROM documents WHERE name = ?1 ORDER BY stamp DESC",
            )?;
            if documents.is_empty() {
                return Err(Error::not_found(name));
            }
            Ok(documents)
        })
    }

    fn update(&self, name: &str, content: &str) -> Result<usize, Error> {
        self.check_open()?;
        if !name::validate(name) {
            return Err(Error::invalid_name(name));
        }
        if content.len() >= MAX_CONTENT_SIZE {
            return Err(Error::ContentTooLarge {
                size: content.len(),
            });
        }
        self.with_conn(|conn| Self::insert_version(conn, name, content, Utc::now()))
    }

    fn revert(&self, name: &str, timestamp: DateTime<Utc>) -> Result<usize, Error> {
        self.check_open()?;
        if !name::validate(name) {
            return Err(Error::invalid_name(name));
        }
        self.with_conn(|conn| {
            if !Self::document_exists(conn, name)? {
                return Err(Error::not_found(name));
            }
            conn.execute(
                "DELETE FROM documents WHERE name = ?1 AND stamp >= ?2",
                params![name, stamp::render(&timestamp)],
            )
            .map_err(Error::backend)
        })
    }

    fn truncate(&self, name: &str, timestamp: DateTime<Utc>) -> Result<usize, Error> {
        self.check_open()?;
        if !name::validate(name) {
            return Err(Error::invalid_name(name));
        }
        self.with_conn(|conn| {
            if !Self::document_exists(conn, name)? {
                return Err(Error::not_found(name));
            }
            conn.execute(
                "DELETE FROM documents WHERE name = ?1 AND stamp <= ?2",
                params![name, stamp::render(&timestamp)],
            )
            .map_err(Error::backend)
        })
    }

    fn get_descendants(&self, ancestor: &str) -> Result<Vec<String>, Error> {
        self.check_open()?;
        if !ancestor.is_empty() && !name::validate(ancestor) {
            return Err(Error::invalid_name(ancestor));
        }
        self.with_conn(|conn| {
            let pattern = format!("{}/%", escape_like(ancestor));
            let mut stmt = conn
                .prepare(
                    "SELECT DISTINCT name FROM documents
                         WHERE name LIKE ?1 ESCAPE '\\' ORDER BY name ASC",
                )
                .map_err(Error::backend)?;
            let rows = stmt
                .query_map(params![pattern], |row| row.get::<_, String>(0))
                .map_err(Error::backend)?;

            let mut names = Vec::new();
            for row in rows {
                names.push(row.map_err(Error::backend)?);
            }
            Ok(names)
        })
    }

    fn clear(&self) -> Result<(), Error> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM documents", [])
                .map_err(Error::backend)?;
            log::debug!("cleared all documents");
            Ok(())
        })
    }

    fn copy(&self) -> Result<Box<dyn DocumentStore>, Error> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::Closed);
        }
        let mut handles = self
            .shared
            .handles
            .lock()
            .expect("sqlite store lock poisoned");
        if *handles == 0 {
            return Err(Error::Closed);
        }
        *handles += 1;
        Ok(Box::new(SqliteDocumentStore {
            shared: Arc::clone(&self.shared),
            closed: AtomicBool::new(false),
        }))
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut handles = self
            .shared
            .handles
            .lock()
            .expect("sqlite store lock poisoned");
        *handles -= 1;
        if *handles == 0 {
            // Last handle: release the connection for the whole lineage.
            *self.shared.conn.lock().expect("sqlite store lock poisoned") = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_store::{contract_tests, new_store};

    fn factory() -> Box<dyn DocumentStore> {
        Box::new(SqliteDocumentStore::open_in_memory().unwrap())
    }

    #[test]
    fn satisfies_the_store_contract() {
        contract_tests::run_all(&factory);
    }

    #[test]
    fn like_wildcards_in_names_do_not_leak() {
        // '%' and '_' are legal segment characters and must match
        // literally in descendant lookups.
        let store = factory();
        store.update("/a%b", "x").unwrap();
        store.update("/a%b/c", "x").unwrap();
        store.update("/axb/d", "x").unwrap();
        store.update("/a_b/e", "x").unwrap();

        assert_eq!(store.get_descendants("/a%b").unwrap(), vec!["/a%b/c".to_string()]);
        assert_eq!(store.get_descendants("/a_b").unwrap(), vec!["/a_b/e".to_string()]);
    }

    #[test]
    fn colliding_timestamps_preserve_both_versions() {
        use chrono::TimeZone;

        let store = SqliteDocumentStore::open_in_memory().unwrap();
        let ts = Utc.with_ymd_and_hms(2015, 3, 14, 9, 26, 53).unwrap();

        store
            .with_conn(|conn| SqliteDocumentStore::insert_version(conn, "/x", "first", ts))
            .unwrap();
        store
            .with_conn(|conn| SqliteDocumentStore::insert_version(conn, "/x", "second", ts))
            .unwrap();

        let all = store.get_all("/x").unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].content, "second");
        assert_eq!(all[0].timestamp, ts + Duration::nanoseconds(1));
        assert_eq!(store.get("/x").unwrap(), all[0]);
    }

    #[test]
    fn versions_survive_reopening_the_database() {
        register();
        let dir = tempfile::tempdir().unwrap();
        let uri = format!("sqlite://{}/wiki.db", dir.path().display());

        let store = new_store(&uri).unwrap();
        store.update("/foo", "persisted").unwrap();
        store.close();

        let reopened = new_store(&uri).unwrap();
        assert_eq!(reopened.get("/foo").unwrap().content, "persisted");
    }

    #[test]
    fn uri_paths_are_percent_decoded() {
        register();
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("my wiki.db");

        let store = new_store(&format!("sqlite://{}", db.display())).unwrap();
        store.update("/page", "hello").unwrap();
        store.close();

        assert!(db.is_file());
        assert!(!dir.path().join("my%20wiki.db").exists());
    }

    #[test]
    fn registry_serves_in_memory_databases() {
        register();
        let store = new_store("sqlite::memory:").unwrap();
        store.update("/foo", "bar").unwrap();
        assert_eq!(store.get("/foo").unwrap().content, "bar");

        // Each URI lookup is an independent database.
        let other = new_store("sqlite::memory:").unwrap();
        assert!(other.get("/foo").unwrap_err().is_not_found());
    }

    #[test]
    fn last_close_releases_the_connection() {
        let store = factory();
        store.update("/foo", "bar").unwrap();

        let copy = store.copy().unwrap();
        store.close();
        assert!(matches!(store.get("/foo").unwrap_err(), Error::Closed));
        // The copy holds the connection open.
        assert_eq!(copy.get("/foo").unwrap().content, "bar");

        copy.close();
        assert!(matches!(copy.get("/foo").unwrap_err(), Error::Closed));
    }

    #[test]
    fn stamps_round_trip_through_the_stamp_column() {
        let store = factory();
        store.update("/foo", "bar").unwrap();
        let doc = store.get("/foo").unwrap();
        let all = store.get_all("/foo").unwrap();
        assert_eq!(all[0].timestamp, doc.timestamp);
    }
}
