//! In-memory implementation of [`DocumentStore`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once, RwLock};

use chrono::{DateTime, Duration, Utc};

use crate::{name, register_store, Document, DocumentStore, Error, MAX_CONTENT_SIZE};

/// Version history for one Name, ordered oldest to newest by the map.
type History = BTreeMap<DateTime<Utc>, String>;

/// An implementation of [`DocumentStore`] backed by process memory.
///
/// Nothing is persisted: the store lives exactly as long as its copy
/// lineage. It is the reference implementation for the contract test
/// suite, and useful for tests and ephemeral wikis.
///
/// `MemoryDocumentStore` is registered with the scheme `memory`; the URI
/// takes no host, path or options:
///
/// ```rust
/// quill_store::MemoryDocumentStore::register();
/// let store = quill_store::new_store("memory:").unwrap();
/// ```
///
/// Every `new_store("memory:")` call creates an independent store; only
/// [`copy`](DocumentStore::copy) shares data. Closing a handle only closes
/// that handle; the shared data survives until the last handle is dropped.
pub struct MemoryDocumentStore {
    documents: Arc<RwLock<BTreeMap<String, History>>>,
    closed: AtomicBool,
}

impl MemoryDocumentStore {
    pub fn new() -> MemoryDocumentStore {
        MemoryDocumentStore {
            documents: Arc::new(RwLock::new(BTreeMap::new())),
            closed: AtomicBool::new(false),
        }
    }

    /// Registers the `memory` scheme with the store registry. Safe to call
    /// more than once.
    pub fn register() {
        static REGISTER: Once = Once::new();
        REGISTER.call_once(|| {
            register_store("memory", |_| Ok(Box::new(MemoryDocumentStore::new())));
        });
    }

    fn check_open(&self) -> Result<(), Error> {
        if self.closed.load(Ordering::SeqCst) {
            Err(Error::Closed)
        } else {
            Ok(())
        }
    }

    /// Inserts a version, nudging a colliding timestamp forward so no
    /// version is ever dropped. Returns the new version count.
    fn record_version(history: &mut History, mut timestamp: DateTime<Utc>, content: &str) -> usize {
        while history.contains_key(&timestamp) {
            timestamp += Duration::nanoseconds(1);
        }
        history.insert(timestamp, content.to_string());
        history.len()
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> MemoryDocumentStore {
        MemoryDocumentStore::new()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn get(&self, name: &str) -> Result<Document, Error> {
        self.check_open()?;
        if !name::validate(name) {
            return Err(Error::invalid_name(name));
        }

        let documents = self.documents.read().expect("memory store lock poisoned");
        let (timestamp, content) = documents
            .get(name)
            .and_then(|history| history.last_key_value())
            .ok_or_else(|| Error::not_found(name))?;

        Ok(Document {
            name: name.to_string(),
            content: content.clone(),
            timestamp: *timestamp,
        })
    }

    fn get_all(&self, name: &str) -> Result<Vec<Document>, Error> {
        self.check_open()?;
        if !name::validate(name) {
            return Err(Error::invalid_name(name));
        }

        let documents = self.documents.read().expect("memory store lock poisoned");
        let history = documents.get(name).ok_or_else(|| Error::not_found(name))?;
        if history.is_empty() {
            return Err(Error::not_found(name));
        }

        Ok(history
            .iter()
            .rev()
            .map(|(timestamp, content)| Document {
                name: name.to_string(),
                content: content.clone(),
                timestamp: *timestamp,
            })
            .collect())
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

        let mut documents = self.documents.write().expect("memory store lock poisoned");
        let history = documents.entry(name.to_string()).or_default();
        Ok(Self::record_version(history, Utc::now(), content))
    }

    fn revert(&self, name: &str, timestamp: DateTime<Utc>) -> Result<usize, Error> {
        self.check_open()?;
        if !name::validate(name) {
            return Err(Error::invalid_name(name));
        }

        let mut documents = self.documents.write().expect("memory store lock poisoned");
        let history = documents
            .get_mut(name)
            .ok_or_else(|| Error::not_found(name))?;

        let discard: Vec<DateTime<Utc>> = history.range(timestamp..).map(|(ts, _)| *ts).collect();
        for ts in &discard {
            history.remove(ts);
        }
        if history.is_empty() {
            documents.remove(name);
        }
        Ok(discard.len())
    }

    fn truncate(&self, name: &str, timestamp: DateTime<Utc>) -> Result<usize, Error> {
        self.check_open()?;
        if !name::validate(name) {
            return Err(Error::invalid_name(name));
        }

        let mut documents = self.documents.write().expect("memory store lock poisoned");
        let history = documents
            .get_mut(name)
            .ok_or_else(|| Error::not_found(name))?;

        let discard: Vec<DateTime<Utc>> = history.range(..=timestamp).map(|(ts, _)| *ts).collect();
        for ts in &discard {
            history.remove(ts);
        }
        if history.is_empty() {
            documents.remove(name);
        }
        Ok(discard.len())
    }

    fn get_descendants(&self, ancestor: &str) -> Result<Vec<String>, Error> {
        self.check_open()?;
        if !ancestor.is_empty() && !name::validate(ancestor) {
            return Err(Error::invalid_name(ancestor));
        }

        let prefix = format!("{}/", ancestor);
        let documents = self.documents.read().expect("memory store lock poisoned");
        Ok(documents
            .keys()
            .filter(|name| name.starts_with(&prefix))
            .cloned()
            .collect())
    }

    fn clear(&self) -> Result<(), Error> {
        self.check_open()?;
        self.documents
            .write()
            .expect("memory store lock poisoned")
            .clear();
        Ok(())
    }

    fn copy(&self) -> Result<Box<dyn DocumentStore>, Error> {
        self.check_open()?;
        Ok(Box::new(MemoryDocumentStore {
            documents: Arc::clone(&self.documents),
            closed: AtomicBool::new(false),
        }))
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
