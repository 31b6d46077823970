use std::collections::BTreeMap;

use super::Container;
use crate::error::{Error, Result};

/// An in-memory container backed by an ordered map of entry names to bytes.
#[derive(Debug, Clone, Default)]
pub struct MemoryContainer {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, replacing any previous entry with the same name.
    pub fn insert(&mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.entries.insert(name.into(), data.into());
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_entry(mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.insert(name, data);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Container for MemoryContainer {
    fn list_entries(&self) -> Result<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }

    fn read_entry(&self, name: &str) -> Result<Vec<u8>> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| Error::EntryNotFound(name.to_string()))
    }

    fn entry_size(&self, name: &str) -> Result<u64> {
        self.entries
            .get(name)
            .map(|data| data.len() as u64)
            .ok_or_else(|| Error::EntryNotFound(name.to_string()))
    }

    fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_container_read() {
        let container = MemoryContainer::new()
            .with_entry("index.htm", "<html></html>")
            .with_entry("pic.png", vec![0x89, b'P', b'N', b'G']);

        assert_eq!(container.read_entry("index.htm").unwrap(), b"<html></html>");
        assert_eq!(container.entry_size("pic.png").unwrap(), 4);
        assert!(container.contains("pic.png"));
        assert_eq!(
            container.list_entries().unwrap(),
            vec!["index.htm".to_string(), "pic.png".to_string()]
        );
    }

    #[test]
    fn test_memory_container_missing_entry() {
        let container = MemoryContainer::new();
        assert!(matches!(
            container.read_entry("missing.html"),
            Err(Error::EntryNotFound(name)) if name == "missing.html"
        ));
        assert!(matches!(
            container.entry_size("missing.html"),
            Err(Error::EntryNotFound(_))
        ));
    }
}
