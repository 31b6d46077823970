use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use super::Container;
use crate::error::{Error, Result};

/// A container over an archive that has already been extracted to disk.
///
/// Entry names are paths relative to the root directory, joined with `/`.
/// Names that would escape the root are rejected.
#[derive(Debug, Clone)]
pub struct DirectoryContainer {
    root: PathBuf,
}

impl DirectoryContainer {
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("not a directory: {}", root.display()),
            ));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name.trim_start_matches('/'));
        let mut path = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                _ => return Err(Error::InvalidEntryName(name.to_string())),
            }
        }
        Ok(path)
    }
}

impl Container for DirectoryContainer {
    fn list_entries(&self) -> Result<Vec<String>> {
        let mut entries = Vec::new();
        let mut stack = vec![(self.root.clone(), String::new())];

        while let Some((dir, prefix)) = stack.pop() {
            let mut children: Vec<_> = fs::read_dir(&dir)?.collect::<io::Result<_>>()?;
            children.sort_by_key(|e| e.file_name());

            for child in children {
                let Some(file_name) = child.file_name().to_str().map(str::to_string) else {
                    continue;
                };
                let name = if prefix.is_empty() {
                    file_name
                } else {
                    format!("{prefix}/{file_name}")
                };
                if child.file_type()?.is_dir() {
                    stack.push((child.path(), name));
                } else {
                    entries.push(name);
                }
            }
        }

        entries.sort();
        Ok(entries)
    }

    fn read_entry(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.entry_path(name)?;
        if !path.is_file() {
            return Err(Error::EntryNotFound(name.to_string()));
        }
        Ok(fs::read(path)?)
    }

    fn entry_size(&self, name: &str) -> Result<u64> {
        let path = self.entry_path(name)?;
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Ok(meta.len()),
            Ok(_) => Err(Error::EntryNotFound(name.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(Error::EntryNotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn contains(&self, name: &str) -> bool {
        self.entry_path(name).is_ok_and(|p| p.is_file())
    }
}
