//! Resource access: opening a changelog name as a byte stream
//!
//! The parser never touches the filesystem directly; it asks a
//! [`ResourceAccessor`] to open names. That keeps the parser testable
//! against in-memory fixtures and lets embedders serve changelogs from
//! archives or remote stores.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::PathBuf;

/// Opens a named resource as a byte stream. The stream is dropped (and
/// thereby released) on every parse exit path.
pub trait ResourceAccessor {
    fn open(&self, path: &str) -> io::Result<Box<dyn Read>>;
}

/// Accessor serving files from the filesystem, optionally relative to a
/// root directory.
#[derive(Debug, Default)]
pub struct FileSystemResourceAccessor {
    root: Option<PathBuf>,
}

impl FileSystemResourceAccessor {
    pub fn new() -> Self {
        Self { root: None }
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }
}

impl ResourceAccessor for FileSystemResourceAccessor {
    fn open(&self, path: &str) -> io::Result<Box<dyn Read>> {
        let full_path = match &self.root {
            Some(root) => root.join(path),
            None => PathBuf::from(path),
        };
        Ok(Box::new(File::open(full_path)?))
    }
}

/// In-memory accessor used by tests and by embedders that carry changelog
/// content inline.
#[derive(Debug, Default)]
pub struct MemoryResourceAccessor {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryResourceAccessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) -> &mut Self {
        self.files.insert(path.into(), content.into());
        self
    }
}

impl ResourceAccessor for MemoryResourceAccessor {
    fn open(&self, path: &str) -> io::Result<Box<dyn Read>> {
        match self.files.get(path) {
            Some(content) => Ok(Box::new(Cursor::new(content.clone()))),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("No such resource: {path}"),
            )),
        }
    }
}
