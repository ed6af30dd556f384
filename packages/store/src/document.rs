//! The Document value type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::name;

/// The maximum size of a Document's content in bytes. A Document's content
/// must be less than this length.
pub const MAX_CONTENT_SIZE: usize = 512 * 1024;

/// A single version of a single wiki page. Every page is UTF-8 Markdown.
/// The storage and persistence of Documents is handled by a
/// [`DocumentStore`](crate::DocumentStore); Documents themselves are
/// immutable snapshots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// The key by which this Document can be retrieved from its store. A
    /// Name is unique across a store instance and its copies (ignoring
    /// versions), and is never reassigned to a different logical page.
    ///
    /// The format is a nonempty sequence of `/`-prefixed segments of
    /// printable ASCII; see [`name::validate`]. The last segment is the
    /// Document's title.
    pub name: String,

    /// The body of the Document. The store treats this as opaque text; the
    /// surrounding service interprets it as Markdown. Must be shorter than
    /// [`MAX_CONTENT_SIZE`] bytes.
    pub content: String,

    /// The UTC instant at which this version was added to its store.
    /// Assigned by the store at write time, never by the caller. Versions
    /// of a Name are ordered by this field.
    pub timestamp: DateTime<Utc>,
}

impl Document {
    /// The display title of the page: the final segment of the Name.
    pub fn title(&self) -> &str {
        name::to_segments(&self.name).last().copied().unwrap_or("")
    }

    /// Whether this Document satisfies the invariants every store must
    /// uphold for the Documents it emits: a valid Name and in-bounds
    /// content. (The timestamp is UTC by construction.)
    pub fn is_valid(&self) -> bool {
        name::validate(&self.name) && self.content.len() < MAX_CONTENT_SIZE
    }
}
