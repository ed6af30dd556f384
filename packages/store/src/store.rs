//! The DocumentStore contract.

use chrono::{DateTime, Utc};

use crate::{Document, Error};

/// A Name-addressable store of immutable document versions.
///
/// Modifying a document never edits or overwrites an existing version; a
/// new version is always created. Versions are identified and ordered by
/// timestamp. For maintenance, a document can be reverted to an older
/// version (discarding newer ones) or its history truncated to a version
/// (discarding older ones); history is only ever trimmed from the ends,
/// never the middle.
///
/// # Errors
///
/// Some error conditions are implementation-agnostic and every backend
/// must signal them with the matching [`Error`] variant: [`Error::NotFound`],
/// [`Error::InvalidName`], [`Error::ContentTooLarge`] and [`Error::Closed`].
/// Any other error value has backend-specific meaning and can appear from
/// any operation; callers must treat it as an opaque failure.
///
/// # Consistency
///
/// A store and its [`copy`](DocumentStore::copy) descendants need only be
/// eventually consistent with each other. Read-your-writes consistency
/// against a single handle is useful (the contract test suite relies on
/// it) but not mandatory across handles. Because versions are immutable
/// there are no conflicting writes: two racing updates to one Name simply
/// produce two versions ordered by their store-assigned timestamps.
///
/// In the event of a timestamp collision a store must preserve both
/// versions. If the colliding versions are the most recent, the choice
/// [`get`](DocumentStore::get) makes is backend-specific but must be
/// deterministic across repeated calls, and must match index 0 of
/// [`get_all`](DocumentStore::get_all).
///
/// # Blocking
///
/// Operations are synchronous and block the calling thread until the
/// backend considers them complete. What "complete" means (local disk
/// durability, database commit, a replication acknowledgment tier) is the
/// backend's choice. No operation takes a timeout; callers wanting bounded
/// latency must enforce it externally.
///
/// Implementations are `Send + Sync`; instance-wide locking shared across
/// a copy lineage is an acceptable strategy.
///
/// Timestamps carry at least single-second precision; backends must store
/// and compare at least that much.
///
/// Every [`Document`] a store emits must be valid: a Name that passes
/// [`name::validate`](crate::name::validate), content under
/// [`MAX_CONTENT_SIZE`](crate::MAX_CONTENT_SIZE), and a UTC timestamp.
pub trait DocumentStore: Send + Sync {
    /// Returns the document at `name`, at its newest version.
    ///
    /// Fails with [`Error::InvalidName`] if `name` fails validation, and
    /// [`Error::NotFound`] if no version of `name` exists.
    fn get(&self, name: &str) -> Result<Document, Error>;

    /// Returns all versions of the document at `name`, from newest
    /// (index 0) to oldest.
    ///
    /// Same error conditions as [`get`](DocumentStore::get).
    fn get_all(&self, name: &str) -> Result<Vec<Document>, Error>;

    /// Creates a new version of the document at `name` with the given
    /// content, timestamped by the store. Returns the number of versions
    /// now stored (so the first write of a Name returns 1).
    ///
    /// Updating a Name that does not exist creates its first version.
    /// Content of [`MAX_CONTENT_SIZE`](crate::MAX_CONTENT_SIZE) bytes or
    /// more fails with [`Error::ContentTooLarge`]; a backend choosing to
    /// accept oversized content anyway must still return it unmodified
    /// from [`get`](DocumentStore::get) and
    /// [`get_all`](DocumentStore::get_all).
    fn update(&self, name: &str, content: &str) -> Result<usize, Error>;

    /// Reverts the document at `name` to `timestamp`, discarding every
    /// version from that time or later. Returns the number of versions
    /// discarded.
    ///
    /// Reverting to the timestamp of the oldest version (or any earlier
    /// time) deletes the document entirely; afterwards the Name behaves
    /// exactly like one that never existed. Reverting a Name with no
    /// history fails with [`Error::NotFound`].
    fn revert(&self, name: &str, timestamp: DateTime<Utc>) -> Result<usize, Error>;

    /// Truncates the history of the document at `name`, discarding every
    /// version from `timestamp` or earlier. Returns the number of
    /// versions discarded.
    ///
    /// Truncating to the timestamp of the newest version (or any later
    /// time) deletes the document entirely. Truncating a Name with no
    /// history fails with [`Error::NotFound`].
    fn truncate(&self, name: &str, timestamp: DateTime<Utc>) -> Result<usize, Error>;

    /// Returns every existing Name that is a strict descendant of
    /// `ancestor` in the segment hierarchy, sorted ascending. The
    /// ancestor itself is never included.
    ///
    /// The empty string is accepted as the root prefix (every Name is a
    /// descendant of the root); it is the one exception to the rule that
    /// an empty Name is invalid. A missing or deleted ancestor simply
    /// yields whatever descendants exist, possibly none.
    fn get_descendants(&self, ancestor: &str) -> Result<Vec<String>, Error>;

    /// Deletes every version of every document. Intended for maintenance
    /// and test setup only.
    fn clear(&self) -> Result<(), Error>;

    /// Returns a new handle using the same underlying storage as the
    /// receiver. Copying is a lightweight operation and the contract
    /// imposes no limit on the number of copies; a backend that has one
    /// must document and signal it via an error return.
    fn copy(&self) -> Result<Box<dyn DocumentStore>, Error>;

    /// Closes this handle, releasing any backend resources tied to it.
    /// After closing, every other operation on this handle fails with
    /// [`Error::Closed`]; backends that refcount shared resources may
    /// extend that to sibling handles once the last one closes. Closing
    /// an already-closed handle has no effect.
    fn close(&self);
}
