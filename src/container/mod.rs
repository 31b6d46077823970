//! Read-only access to the named entries of an archive.
//!
//! The low-level compiled-help format (directory chunks, LZX-compressed
//! content sections) is decoded elsewhere. Everything in this crate consumes
//! archives through the [`Container`] trait.

mod directory;
mod memory;

pub use directory::DirectoryContainer;
pub use memory::MemoryContainer;

use std::collections::HashMap;

use crate::error::Result;

/// A thread-safe, read-only store of named entries.
///
/// Implementations must allow concurrent reads from multiple threads so
/// several previews of one archive can be produced in parallel.
pub trait Container: Send + Sync {
    /// Names of all entries, in storage order where the backend has one.
    fn list_entries(&self) -> Result<Vec<String>>;

    /// Raw bytes of an entry.
    ///
    /// Fails with [`Error::EntryNotFound`](crate::Error::EntryNotFound) if
    /// `name` is not an entry of this container.
    fn read_entry(&self, name: &str) -> Result<Vec<u8>>;

    /// Declared size of an entry in bytes.
    fn entry_size(&self, name: &str) -> Result<u64> {
        Ok(self.read_entry(name)?.len() as u64)
    }

    /// Returns true if `name` is listed by this container.
    fn contains(&self, name: &str) -> bool {
        self.list_entries()
            .map(|entries| entries.iter().any(|e| e == name))
            .unwrap_or(false)
    }
}

impl<C: Container + ?Sized> Container for &C {
    fn list_entries(&self) -> Result<Vec<String>> {
        (**self).list_entries()
    }

    fn read_entry(&self, name: &str) -> Result<Vec<u8>> {
        (**self).read_entry(name)
    }

    fn entry_size(&self, name: &str) -> Result<u64> {
        (**self).entry_size(name)
    }

    fn contains(&self, name: &str) -> bool {
        (**self).contains(name)
    }
}

/// Lookup table from reference spellings to container entry names.
///
/// Help compilers run on case-insensitive file systems, so pages routinely
/// spell a reference differently from the stored entry. Lookup tries the
/// exact name first, then an ASCII case-insensitive match. Leading slashes
/// are ignored on both sides. When several entries fold to the same key the
/// first listed one wins.
#[derive(Debug, Clone, Default)]
pub struct EntryIndex {
    exact: HashMap<String, String>,
    folded: HashMap<String, String>,
}

impl EntryIndex {
    /// Build an index over the given entry names.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut index = Self::default();
        for entry in entries {
            let entry = entry.into();
            let key = strip_root(&entry).to_string();
            index
                .folded
                .entry(key.to_ascii_lowercase())
                .or_insert_with(|| entry.clone());
            index.exact.entry(key).or_insert(entry);
        }
        index
    }

    /// Build an index from a container's entry list.
    pub fn from_container<C: Container + ?Sized>(container: &C) -> Result<Self> {
        Ok(Self::new(container.list_entries()?))
    }

    /// Resolve a normalized archive path to the container's entry name.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        let key = strip_root(name);
        if key.is_empty() {
            return None;
        }
        self.exact
            .get(key)
            .or_else(|| self.folded.get(&key.to_ascii_lowercase()))
            .map(String::as_str)
    }

    /// Returns true if `name` resolves to an entry.
    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Number of distinct entries.
    pub fn len(&self) -> usize {
        self.exact.len()
    }

    /// Returns true if the index has no entries.
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }
}

fn strip_root(name: &str) -> &str {
    name.trim_start_matches('/')
}
