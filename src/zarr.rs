//! Paths within a Zarr and the file entries fed into a checksum tree
mod entrypath;
use crate::errors::EntryNameError;
pub use entrypath::*;
use std::fmt;

/// The path of a directory within a Zarr, relative to the Zarr's root
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum DirPath {
    Root,
    Path(EntryPath),
}

impl DirPath {
    /// Return the number of directories above this one; the root has depth 0
    pub fn depth(&self) -> usize {
        match self {
            DirPath::Root => 0,
            DirPath::Path(ep) => ep.depth(),
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, DirPath::Root)
    }

    pub fn join1(&self, s: &str) -> Result<EntryPath, EntryNameError> {
        match self {
            DirPath::Root => EntryPath::from_name(s),
            DirPath::Path(ep) => ep.join1(s),
        }
    }
}

impl fmt::Display for DirPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirPath::Root => f.write_str("."),
            DirPath::Path(ep) => <EntryPath as fmt::Display>::fmt(ep, f),
        }
    }
}

impl From<EntryPath> for DirPath {
    fn from(ep: EntryPath) -> DirPath {
        DirPath::Path(ep)
    }
}

/// A file in a Zarr, ready to be added to a
/// [`ZarrChecksumTree`][crate::checksum::ZarrChecksumTree]
///
/// Unlike [`ZarrChecksum`][crate::checksum::ZarrChecksum], `path` is the
/// file's full path relative to the root of the Zarr rather than just its
/// final component.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ZarrArchiveFile {
    pub path: EntryPath,
    pub size: u64,
    /// Hex MD5 digest of the file's contents (or the object's ETag)
    pub digest: String,
}
