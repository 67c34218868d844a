use super::digest::{ZarrDirectoryDigest, EMPTY_CHECKSUM};
use super::manifest::{ZarrChecksum, ZarrChecksumManifest};
use crate::errors::DigestError;
use crate::zarr::{DirPath, EntryPath, ZarrArchiveFile};
use log::debug;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

/// The checksums gathered so far for the entries of one directory
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ZarrChecksumNode {
    pub path: DirPath,
    pub checksums: ZarrChecksumManifest,
}

/// A tree of checksums for the files in a Zarr, from which the checksum for
/// the whole Zarr is computed.
///
/// Add file checksums in any order with [`add_leaf()`][Self::add_leaf] or
/// [`add_file()`][Self::add_file], then call [`process()`][Self::process].
/// Directories are checksummed deepest first, each one's checksum being added
/// to its parent's node, so that a directory is only checksummed after all of
/// its descendants have been.
#[derive(Clone, Debug, Default)]
pub struct ZarrChecksumTree {
    queue: BinaryHeap<QueueEntry>,
    nodes: HashMap<DirPath, ZarrChecksumNode>,
}

impl ZarrChecksumTree {
    pub fn new() -> Self {
        ZarrChecksumTree::default()
    }

    /// True iff no directories are waiting to be checksummed
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn get_node(&mut self, path: DirPath) -> &mut ZarrChecksumNode {
        let queue = &mut self.queue;
        self.nodes.entry(path).or_insert_with_key(|path| {
            queue.push(QueueEntry::new(path.clone()));
            ZarrChecksumNode {
                path: path.clone(),
                checksums: ZarrChecksumManifest::new(),
            }
        })
    }

    /// Add the checksum for the file at `path` to the node for the file's
    /// parent directory
    pub fn add_leaf(&mut self, path: &EntryPath, size: u64, digest: String) {
        let name = path.file_name().to_owned();
        self.get_node(path.parent())
            .checksums
            .files
            .push(ZarrChecksum { digest, name, size });
    }

    /// Add the checksum for the directory at `path` to the node for the
    /// directory's parent.  `digest` must be a serialized
    /// [`ZarrDirectoryDigest`].
    pub fn add_node(&mut self, path: &EntryPath, size: u64, digest: String) {
        let name = path.file_name().to_owned();
        self.get_node(path.parent())
            .checksums
            .directories
            .push(ZarrChecksum { digest, name, size });
    }

    pub fn add_file(&mut self, file: ZarrArchiveFile) {
        self.add_leaf(&file.path, file.size, file.digest);
    }

    /// Remove & return the deepest node in the tree.  Among nodes of equal
    /// depth, the one whose path sorts first as a string is returned.
    pub fn pop_deepest(&mut self) -> Option<ZarrChecksumNode> {
        let QueueEntry { path, .. } = self.queue.pop()?;
        self.nodes.remove(&path)
    }

    /// Checksum every directory in the tree and return the checksum of the
    /// root.  If no files were added, [`EMPTY_CHECKSUM`] is returned.
    pub fn process(self) -> Result<ZarrDirectoryDigest, DigestError> {
        self.process_with(|_, _| ())
    }

    /// Like [`process()`][Self::process], but `on_directory` is called with
    /// each directory's path and checksum as soon as it is computed
    pub fn process_with<F>(
        mut self,
        mut on_directory: F,
    ) -> Result<ZarrDirectoryDigest, DigestError>
    where
        F: FnMut(&DirPath, &ZarrDirectoryDigest),
    {
        while let Some(mut node) = self.pop_deepest() {
            debug!("Processing {}", node.path);
            let digest = node.checksums.generate_digest()?;
            debug!("Computed checksum for directory {}: {digest}", node.path);
            on_directory(&node.path, &digest);
            match node.path {
                DirPath::Root => return Ok(digest),
                DirPath::Path(ref path) => self.add_node(path, digest.size, digest.digest()),
            }
        }
        Ok(EMPTY_CHECKSUM.clone())
    }
}

impl Extend<ZarrArchiveFile> for ZarrChecksumTree {
    fn extend<I: IntoIterator<Item = ZarrArchiveFile>>(&mut self, iter: I) {
        for file in iter {
            self.add_file(file);
        }
    }
}

impl FromIterator<ZarrArchiveFile> for ZarrChecksumTree {
    fn from_iter<I: IntoIterator<Item = ZarrArchiveFile>>(iter: I) -> Self {
        let mut tree = ZarrChecksumTree::new();
        tree.extend(iter);
        tree
    }
}

/// Heap entry ordering directories deepest-first, then by path string
#[derive(Clone, Debug, Eq, PartialEq)]
struct QueueEntry {
    depth: usize,
    key: String,
    path: DirPath,
}

impl QueueEntry {
    fn new(path: DirPath) -> QueueEntry {
        QueueEntry {
            depth: path.depth(),
            key: path.to_string(),
            path,
        }
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &QueueEntry) -> Ordering {
        self.depth
            .cmp(&other.depth)
            .then_with(|| other.key.cmp(&self.key))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &QueueEntry) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
