//! Flat-file implementation of [`DocumentStore`].

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once, RwLock};

use chrono::{DateTime, Duration, Utc};
use percent_encoding::percent_decode_str;
use url::Url;
use walkdir::WalkDir;

use quill_store::{name, register_store, stamp, Document, DocumentStore, Error, MAX_CONTENT_SIZE};

/// An implementation of [`DocumentStore`] using a standard UNIX
/// filesystem. A document corresponds to a directory at the path given by
/// its Name segments, and each version is a file under that directory
/// named by its timestamp in the fixed-width [`stamp`] rendering, so a
/// sorted directory listing is the version history.
///
/// `FileDocumentStore` is primarily for development. It has several
/// limitations:
///
/// - no Windows support (`\/:*?"<>|` are forbidden in Windows filenames
///   but legal in Name segments)
/// - no cross-process concurrency; only one instance and its copies may
///   use a root directory at a time. Safety within a process comes from a
///   reader/writer lock shared between all copies of an instance.
/// - the lock covers the whole instance, not individual documents, so
///   modifying one document blocks access to all the others
/// - lock acquisition has no timeout, so an operation can in principle
///   block forever
///
/// The on-disk layout is an implementation detail, not a compatibility
/// promise.
///
/// `FileDocumentStore` is registered with the scheme `file`:
///
/// ```rust
/// quill_file_store::register();
/// let dir = tempfile::tempdir().unwrap();
/// let store = quill_store::new_store(&format!("file://{}", dir.path().display())).unwrap();
/// store.update("/Front Page", "welcome!").unwrap();
/// ```
///
/// The URI takes no options, user info or host, and the path must be
/// absolute: in `file://quill/docs` the `quill` part would parse as a
/// host, so a nonempty host is rejected at construction time. The target
/// directory must be readable and writable by the current user.
pub struct FileDocumentStore {
    root: PathBuf,
    /// Lock shared between this store and all of its copies.
    lock: Arc<RwLock<()>>,
    closed: AtomicBool,
}

/// Registers the `file` scheme with the store registry. Safe to call more
/// than once.
pub fn register() {
    static REGISTER: Once = Once::new();
    REGISTER.call_once(|| {
        register_store("file", |target: &Url| {
            if let Some(host) = target.host_str() {
                if !host.is_empty() {
                    return Err(Error::Uri {
                        uri: target.to_string(),
                        message: format!("unexpected host {:?} in file store URI", host),
                    });
                }
            }
            // Url keeps the path percent-encoded; decode it so a root
            // like /var/my docs maps to the real directory.
            let root = percent_decode_str(target.path())
                .decode_utf8()
                .map_err(|err| Error::Uri {
                    uri: target.to_string(),
                    message: format!("undecodable path: {}", err),
                })?;
            Ok(Box::new(FileDocumentStore::new(root.into_owned())))
        });
    });
}

impl FileDocumentStore {
    /// Creates a store rooted at `root`. The directory is created lazily
    /// on the first write.
    pub fn new(root: impl Into<PathBuf>) -> FileDocumentStore {
        FileDocumentStore {
            root: root.into(),
            lock: Arc::new(RwLock::new(())),
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

    /// The directory holding the versions of `name`. Only meaningful for
    /// validated names.
    fn document_dir(&self, name: &str) -> PathBuf {
        let mut dir = self.root.clone();
        for segment in name::to_segments(name) {
            dir.push(segment);
        }
        dir
    }

    /// Version filenames under `dir`, sorted oldest to newest. The fixed
    /// width of the stamp rendering makes the lexicographic sort
    /// chronological. Stray files whose names do not parse as version
    /// stamps are not versions and are skipped.
    fn sorted_versions(dir: &Path) -> io::Result<Vec<String>> {
        let mut versions = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Ok(file_name) = entry.file_name().into_string() {
                if stamp::parse(&file_name).is_ok() {
                    versions.push(file_name);
                }
            }
        }
        versions.sort();
        Ok(versions)
    }

    fn read_version(&self, name: &str, dir: &Path, file_name: &str) -> Result<Document, Error> {
        let content = fs::read_to_string(dir.join(file_name))?;
        let timestamp = stamp::parse(file_name).map_err(Error::backend)?;
        Ok(Document {
            name: name.to_string(),
            content,
            timestamp,
        })
    }

    /// Writes one version file. The timestamp is the identity of the
    /// version, so a taken filename nudges forward rather than
    /// overwriting.
    fn write_version(dir: &Path, mut timestamp: DateTime<Utc>, content: &str) -> io::Result<()> {
        let mut path = dir.join(stamp::render(&timestamp));
        while path.exists() {
            timestamp += Duration::nanoseconds(1);
            path = dir.join(stamp::render(&timestamp));
        }
        log::debug!("writing {}", path.display());
        fs::write(&path, content)
    }

    /// Maps the directory-missing case onto the contract's NotFound.
    fn missing_as_not_found(name: &str, err: io::Error) -> Error {
        if err.kind() == io::ErrorKind::NotFound {
            Error::not_found(name)
        } else {
            Error::from(err)
        }
    }
}

impl DocumentStore for FileDocumentStore {
    fn get(&self, name: &str) -> Result<Document, Error> {
        self.check_open()?;
        if !name::validate(name) {
            return Err(Error::invalid_name(name));
        }
        let _guard = self.lock.read().expect("file store lock poisoned");

        let dir = self.document_dir(name);
        log::debug!("reading newest version under {}", dir.display());
        let versions =
            Self::sorted_versions(&dir).map_err(|err| Self::missing_as_not_found(name, err))?;
        match versions.last() {
            Some(newest) => self.read_version(name, &dir, newest),
            None => Err(Error::not_found(name)),
        }
    }

    fn get_all(&self, name: &str) -> Result<Vec<Document>, Error> {
        self.check_open()?;
        if !name::validate(name) {
            return Err(Error::invalid_name(name));
        }
        let _guard = self.lock.read().expect("file store lock poisoned");

        let dir = self.document_dir(name);
        let versions =
            Self::sorted_versions(&dir).map_err(|err| Self::missing_as_not_found(name, err))?;
        if versions.is_empty() {
            return Err(Error::not_found(name));
        }

        versions
            .iter()
            .rev()
            .map(|file_name| self.read_version(name, &dir, file_name))
            .collect()
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
        let _guard = self.lock.write().expect("file store lock poisoned");

        let dir = self.document_dir(name);
        fs::create_dir_all(&dir)?;
        Self::write_version(&dir, Utc::now(), content)?;

        Ok(Self::sorted_versions(&dir)?.len())
    }

    fn revert(&self, name: &str, timestamp: DateTime<Utc>) -> Result<usize, Error> {
        self.check_open()?;
        if !name::validate(name) {
            return Err(Error::invalid_name(name));
        }
        let _guard = self.lock.write().expect("file store lock poisoned");

        let dir = self.document_dir(name);
        let versions =
            Self::sorted_versions(&dir).map_err(|err| Self::missing_as_not_found(name, err))?;
        if versions.is_empty() {
            return Err(Error::not_found(name));
        }

        let mut discarded = 0;
        for file_name in versions.iter().rev() {
            let version = stamp::parse(file_name).map_err(Error::backend)?;
            if version < timestamp {
                break;
            }
            fs::remove_file(dir.join(file_name))?;
            discarded += 1;
        }
        Ok(discarded)
    }

    fn truncate(&self, name: &str, timestamp: DateTime<Utc>) -> Result<usize, Error> {
        self.check_open()?;
        if !name::validate(name) {
            return Err(Error::invalid_name(name));
        }
        let _guard = self.lock.write().expect("file store lock poisoned");

        let dir = self.document_dir(name);
        let versions =
            Self::sorted_versions(&dir).map_err(|err| Self::missing_as_not_found(name, err))?;
        if versions.is_empty() {
            return Err(Error::not_found(name));
        }

        let mut discarded = 0;
        for file_name in &versions {
            let version = stamp::parse(file_name).map_err(Error::backend)?;
            if version > timestamp {
                break;
            }
            fs::remove_file(dir.join(file_name))?;
            discarded += 1;
        }
        Ok(discarded)
    }

    fn get_descendants(&self, ancestor: &str) -> Result<Vec<String>, Error> {
        self.check_open()?;
        if !ancestor.is_empty() && !name::validate(ancestor) {
            return Err(Error::invalid_name(ancestor));
        }
        let _guard = self.lock.read().expect("file store lock poisoned");

        let start = self.document_dir(ancestor);
        if !start.is_dir() {
            return Ok(Vec::new());
        }

        // A name exists iff its directory holds at least one version file;
        // directories emptied by revert/truncate are skipped, as are stray
        // files whose names do not parse as version stamps.
        let mut names = BTreeSet::new();
        for entry in WalkDir::new(&start).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(file_name) = entry.file_name().to_str() else {
                continue;
            };
            if stamp::parse(file_name).is_err() {
                continue;
            }
            let Some(parent) = entry.path().parent() else {
                continue;
            };
            let Ok(relative) = parent.strip_prefix(&self.root) else {
                continue;
            };
            let segments: Option<Vec<&str>> = relative
                .components()
                .map(|component| component.as_os_str().to_str())
                .collect();
            let Some(segments) = segments else { continue };
            if segments.is_empty() {
                continue;
            }

            let name = format!("/{}", segments.join("/"));
            if name != ancestor && name::validate(&name) {
                names.insert(name);
            }
        }

        Ok(names.into_iter().collect())
    }

    fn clear(&self) -> Result<(), Error> {
        self.check_open()?;
        let _guard = self.lock.write().expect("file store lock poisoned");

        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                fs::remove_dir_all(entry.path())?;
            } else {
                fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }

    fn copy(&self) -> Result<Box<dyn DocumentStore>, Error> {
        self.check_open()?;
        Ok(Box::new(FileDocumentStore {
            root: self.root.clone(),
            lock: Arc::clone(&self.lock),
            closed: AtomicBool::new(false),
        }))
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
