//! Stream identity and category derivation.

use std::fmt;

/// Sigil marking reserved internal streams (e.g. `$all`).
pub const INTERNAL_SIGIL: char = '$';

/// Name of a logical event stream.
///
/// Streams are identified by a globally unique name; the physical table
/// name and the optional category are both derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamName(String);

impl StreamName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is a reserved internal stream (`$`-prefixed).
    pub fn is_internal(&self) -> bool {
        self.0.starts_with(INTERNAL_SIGIL)
    }
}

impl fmt::Display for StreamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StreamName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A named stream together with its pending events.
///
/// Immutable once built: appending more events means building a new
/// `Stream` with the same name.
#[derive(Debug, Clone)]
pub struct Stream<E> {
    name: StreamName,
    events: Vec<E>,
}

impl<E> Stream<E> {
    pub fn new(name: StreamName, events: Vec<E>) -> Self {
        Self { name, events }
    }

    pub fn name(&self) -> &StreamName {
        &self.name
    }

    pub fn events(&self) -> &[E] {
        &self.events
    }
}

/// Derives a stream's category from its name.
///
/// The category is the prefix before the first separator:
/// `transaction-add` belongs to category `transaction`, while a name
/// without the separator has no category.
#[derive(Debug, Clone)]
pub struct CategoryDetector {
    separator: char,
}

impl CategoryDetector {
    pub fn new(separator: char) -> Self {
        Self { separator }
    }

    pub fn detect(&self, stream_name: &str) -> Option<String> {
        stream_name
            .split_once(self.separator)
            .map(|(head, _)| head)
            .filter(|head| !head.is_empty())
            .map(str::to_string)
    }
}

impl Default for CategoryDetector {
    fn default() -> Self {
        Self::new('-')
    }
}
