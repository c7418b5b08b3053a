//! # Writable Tree
//!
//! The bundle is a tree of [`Writable`] nodes under a single root
//! [`Directory`]. Building the tree does no I/O. Output happens in two
//! steps:
//!
//! 1. [`Directory::prepare`] resolves every node's relative path and signs
//!    every [`SignedArchive`], producing a [`PreparedTree`]. Preparing is
//!    pure and can be repeated; a signing failure here means nothing has
//!    been written yet.
//! 2. [`PreparedTree::materialize`] consumes the prepared tree and writes
//!    its entries depth-first, each directory before its children.

use std::path::{Path, PathBuf};

use crate::error::TreeError;
use crate::signing::SignedArchive;
use crate::sink::OutputSink;

/// A node of the distribution tree.
#[derive(Debug)]
pub enum Writable {
    Directory(Directory),
    Archive(Archive),
    Signed(SignedArchive),
}

impl Writable {
    pub fn name(&self) -> &str {
        match self {
            Self::Directory(d) => d.name(),
            Self::Archive(a) => a.name(),
            Self::Signed(s) => s.name(),
        }
    }

    fn prepare_into(&self, parent: &Path, out: &mut Vec<PreparedEntry>) -> Result<(), TreeError> {
        let path = parent.join(self.name());
        match self {
            Self::Directory(dir) => {
                out.push(PreparedEntry::Directory(path.clone()));
                for child in &dir.children {
                    child.prepare_into(&path, out)?;
                }
            }
            Self::Archive(archive) => out.push(PreparedEntry::File {
                path,
                bytes: archive.payload().to_vec(),
            }),
            Self::Signed(signed) => {
                let signature = signed.signature_file().map_err(|source| TreeError::Signing {
                    path: path.display().to_string(),
                    source,
                })?;
                out.push(PreparedEntry::Directory(path.clone()));
                let contents = [signed.archive().payload().to_vec(), signature];
                for (name, bytes) in signed.artifact_names().into_iter().zip(contents) {
                    out.push(PreparedEntry::File {
                        path: path.join(name),
                        bytes,
                    });
                }
            }
        }
        Ok(())
    }
}

impl From<Directory> for Writable {
    fn from(d: Directory) -> Self {
        Self::Directory(d)
    }
}

impl From<Archive> for Writable {
    fn from(a: Archive) -> Self {
        Self::Archive(a)
    }
}

impl From<SignedArchive> for Writable {
    fn from(s: SignedArchive) -> Self {
        Self::Signed(s)
    }
}

/// Node names become single path components.
pub(crate) fn validate_name(name: &str) -> Result<(), TreeError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(TreeError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// An ordered collection of uniquely named children.
#[derive(Debug)]
pub struct Directory {
    name: String,
    children: Vec<Writable>,
}

impl Directory {
    pub fn new(name: impl Into<String>) -> Result<Self, TreeError> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            name,
            children: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a child. Insertion order is preserved.
    ///
    /// # Errors
    ///
    /// `TreeError::DuplicateName` if a child with the same name exists.
    pub fn add_writable(&mut self, node: impl Into<Writable>) -> Result<(), TreeError> {
        let node = node.into();
        if self.get(node.name()).is_some() {
            return Err(TreeError::DuplicateName {
                directory: self.name.clone(),
                name: node.name().to_string(),
            });
        }
        self.children.push(node);
        Ok(())
    }

    pub fn children(&self) -> &[Writable] {
        &self.children
    }

    pub fn get(&self, name: &str) -> Option<&Writable> {
        self.children.iter().find(|c| c.name() == name)
    }

    /// The child directory called `name`, if there is one.
    pub fn directory(&self, name: &str) -> Option<&Directory> {
        match self.get(name) {
            Some(Writable::Directory(d)) => Some(d),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Resolve paths below `context` and compute all signatures.
    pub fn prepare(&self, context: &Path) -> Result<PreparedTree, TreeError> {
        let mut entries = Vec::new();
        let path = context.join(&self.name);
        entries.push(PreparedEntry::Directory(path.clone()));
        for child in &self.children {
            child.prepare_into(&path, &mut entries)?;
        }
        Ok(PreparedTree { entries })
    }
}

/// A named byte payload, materialized as a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    name: String,
    payload: Vec<u8>,
}

impl Archive {
    pub fn new(name: impl Into<String>, payload: Vec<u8>) -> Result<Self, TreeError> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self { name, payload })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// One resolved output entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreparedEntry {
    Directory(PathBuf),
    File { path: PathBuf, bytes: Vec<u8> },
}

impl PreparedEntry {
    pub fn path(&self) -> &Path {
        match self {
            Self::Directory(path) | Self::File { path, .. } => path,
        }
    }
}

/// A fully resolved and signed tree, in write order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTree {
    entries: Vec<PreparedEntry>,
}

impl PreparedTree {
    pub fn entries(&self) -> &[PreparedEntry] {
        &self.entries
    }

    pub fn file_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, PreparedEntry::File { .. }))
            .count()
    }

    /// Write every entry to `sink`, parents before children. Returns the
    /// number of files written.
    pub fn materialize(self, sink: &mut dyn OutputSink) -> Result<usize, TreeError> {
        let mut files = 0;
        for entry in self.entries {
            match entry {
                PreparedEntry::Directory(path) => {
                    sink.create_directory(&path).map_err(|source| TreeError::Io {
                        path: path.display().to_string(),
                        source,
                    })?;
                }
                PreparedEntry::File { path, bytes } => {
                    sink.write_file(&path, &bytes).map_err(|source| TreeError::Io {
                        path: path.display().to_string(),
                        source,
                    })?;
                    files += 1;
                }
            }
        }
        tracing::debug!(files, "Materialized distribution tree");
        Ok(files)
    }
}
