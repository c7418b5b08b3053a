//! # Output Sinks
//!
//! Where a prepared tree is materialized. The tree only ever asks a sink to
//! create a directory or write a file at a path relative to the sink root,
//! parents first.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Destination for materialized entries.
pub trait OutputSink {
    fn create_directory(&mut self, path: &Path) -> io::Result<()>;
    fn write_file(&mut self, path: &Path, bytes: &[u8]) -> io::Result<()>;
}

/// Writes below a root directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsSink {
    root: PathBuf,
}

impl FsSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl OutputSink for FsSink {
    fn create_directory(&mut self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(self.root.join(path))
    }

    fn write_file(&mut self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        fs::write(self.root.join(path), bytes)
    }
}

/// One recorded sink operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEntry {
    Directory(PathBuf),
    File(PathBuf, Vec<u8>),
}

impl SinkEntry {
    pub fn path(&self) -> &Path {
        match self {
            Self::Directory(path) | Self::File(path, _) => path,
        }
    }
}

/// Records operations in order. Used in tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    entries: Vec<SinkEntry>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[SinkEntry] {
        &self.entries
    }

    /// Contents of the file written at `path`, if any.
    pub fn file(&self, path: impl AsRef<Path>) -> Option<&[u8]> {
        self.entries.iter().find_map(|e| match e {
            SinkEntry::File(p, bytes) if p == path.as_ref() => Some(bytes.as_slice()),
            _ => None,
        })
    }

    pub fn file_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, SinkEntry::File(..)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl OutputSink for MemorySink {
    fn create_directory(&mut self, path: &Path) -> io::Result<()> {
        self.entries.push(SinkEntry::Directory(path.to_path_buf()));
        Ok(())
    }

    fn write_file(&mut self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        self.entries
            .push(SinkEntry::File(path.to_path_buf(), bytes.to_vec()));
        Ok(())
    }
}
