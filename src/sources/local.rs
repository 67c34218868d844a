use super::jobstack::JobStack;
use crate::checksum::{ZarrChecksumTree, ZarrDirectoryDigest};
use crate::errors::{ChecksumError, FSError};
use crate::util::md5_file;
use crate::zarr::{DirPath, EntryPath, ZarrArchiveFile};
use log::{debug, info, trace, warn};
use std::collections::VecDeque;
use std::io::ErrorKind;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;

/// Default number of worker threads used to digest local files
pub const DEFAULT_THREADS: NonZeroUsize = match NonZeroUsize::new(8) {
    Some(n) => n,
    None => unreachable!(),
};

/// Options for checksumming a Zarr on the local filesystem
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct LocalOptions {
    /// Number of worker threads used to list directories & digest files.  If
    /// this is 1, the Zarr is traversed sequentially on the current thread.
    pub threads: NonZeroUsize,
}

impl Default for LocalOptions {
    fn default() -> LocalOptions {
        LocalOptions {
            threads: DEFAULT_THREADS,
        }
    }
}

/// A Zarr stored as a directory tree on the local filesystem
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct LocalZarr {
    path: PathBuf,
}

impl LocalZarr {
    /// Fails if `path` does not exist or is not a directory
    pub fn new<P: AsRef<Path>>(path: P) -> Result<LocalZarr, FSError> {
        let path = path.as_ref();
        let md = match fs_err::metadata(path) {
            Ok(md) => md,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(FSError::root_not_found(path))
            }
            Err(e) => return Err(FSError::stat_error(path, e)),
        };
        if !md.is_dir() {
            return Err(FSError::not_dir_root(path));
        }
        Ok(LocalZarr { path: path.into() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn root_entry(&self) -> LocalEntry {
        LocalEntry::Directory {
            path: self.path.clone(),
            relpath: DirPath::Root,
        }
    }

    /// Iterate over the files in the Zarr breadth-first, digesting each one
    /// on the current thread.  Empty directories yield nothing.
    pub fn files(&self) -> Files {
        Files {
            queue: VecDeque::from([self.root_entry()]),
        }
    }

    /// Compute the checksum of the Zarr
    pub fn checksum(&self, opts: LocalOptions) -> Result<ZarrDirectoryDigest, ChecksumError> {
        Ok(self.checksum_tree(opts)?.process()?)
    }

    /// Digest every file in the Zarr and return the unprocessed checksum tree.
    ///
    /// With more than one thread, directories are listed and files digested
    /// by a pool of worker threads that hand back file checksums over a
    /// channel.  After the first error, no further jobs are started, the
    /// remaining results are drained, and the error is returned.
    pub fn checksum_tree(&self, opts: LocalOptions) -> Result<ZarrChecksumTree, ChecksumError> {
        info!("Discovering files in {} ...", self.path.display());
        if opts.threads.get() == 1 {
            let mut tree = ZarrChecksumTree::new();
            for file in self.files() {
                tree.add_file(file?);
            }
            return Ok(tree);
        }
        let stack = JobStack::new([self.root_entry()]);
        let (sender, receiver) = channel();
        let outcome = crossbeam_utils::thread::scope(|scope| {
            for thread_no in 0..opts.threads.get() {
                let stack = &stack;
                let sender = sender.clone();
                scope.spawn(move |_| {
                    trace!("[{thread_no}] Starting thread");
                    let r = stack.handle_many_jobs(|entry| {
                        trace!("[{thread_no}] Popped {entry:?} from stack");
                        let output = match entry {
                            LocalEntry::Directory { path, relpath } => {
                                match list_directory(&path, &relpath) {
                                    Ok(entries) => {
                                        for e in &entries {
                                            trace!("[{thread_no}] Pushing {e:?} onto stack");
                                        }
                                        return Ok(entries);
                                    }
                                    Err(e) => Err(e),
                                }
                            }
                            LocalEntry::File { path, relpath } => digest_file(path, relpath),
                        };
                        // Once shut down, only errors are sent
                        if output.is_err() {
                            stack.shutdown();
                        } else if stack.is_shutdown() {
                            return Ok(Vec::new());
                        }
                        trace!("[{thread_no}] Sending {output:?} to output");
                        match sender.send(output) {
                            Ok(()) => Ok(Vec::new()),
                            Err(e) => Err(e),
                        }
                    });
                    if r.is_err() {
                        warn!("[{thread_no}] Failed to send; exiting");
                    }
                    trace!("[{thread_no}] Ending thread");
                });
            }
            drop(sender);
            // Receive everything, even after an error, so that all workers
            // run to completion
            let mut tree = ZarrChecksumTree::new();
            let mut err = None;
            for r in receiver {
                match r {
                    Ok(file) if err.is_none() => tree.add_file(file),
                    Ok(_) => (),
                    Err(e) => {
                        err.get_or_insert(e);
                    }
                }
            }
            match err {
                Some(e) => Err(e),
                None => Ok(tree),
            }
        });
        match outcome {
            Ok(r) => Ok(r?),
            Err(_) => Err(ChecksumError::WorkerPanic),
        }
    }
}

/// Iterator over the files of a [`LocalZarr`], returned by
/// [`LocalZarr::files()`]
#[derive(Debug)]
pub struct Files {
    queue: VecDeque<LocalEntry>,
}

impl Iterator for Files {
    type Item = Result<ZarrArchiveFile, FSError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.queue.pop_front()? {
                LocalEntry::Directory { path, relpath } => match list_directory(&path, &relpath) {
                    Ok(entries) => self.queue.extend(entries),
                    Err(e) => return Some(Err(e)),
                },
                LocalEntry::File { path, relpath } => return Some(digest_file(path, relpath)),
            }
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum LocalEntry {
    File { path: PathBuf, relpath: EntryPath },
    Directory { path: PathBuf, relpath: DirPath },
}

fn list_directory(path: &Path, relpath: &DirPath) -> Result<Vec<LocalEntry>, FSError> {
    let mut entries = Vec::new();
    for p in fs_err::read_dir(path).map_err(|e| FSError::readdir_error(path, e))? {
        let p = p.map_err(|e| FSError::readdir_error(path, e))?;
        let entry_path = p.path();
        let ftype = p
            .file_type()
            .map_err(|e| FSError::stat_error(&entry_path, e))?;
        let is_dir = ftype.is_dir()
            || (ftype.is_symlink()
                && fs_err::metadata(&entry_path)
                    .map_err(|e| FSError::stat_error(&entry_path, e))?
                    .is_dir());
        let Some(name) = p.file_name().to_str().map(String::from) else {
            return Err(FSError::undecodable_name(entry_path));
        };
        let entry_relpath = relpath
            .join1(&name)
            .expect("DirEntry.file_name() should not be . or .. nor contain /");
        entries.push(if is_dir {
            LocalEntry::Directory {
                path: entry_path,
                relpath: entry_relpath.into(),
            }
        } else {
            LocalEntry::File {
                path: entry_path,
                relpath: entry_relpath,
            }
        });
    }
    Ok(entries)
}

fn digest_file(path: PathBuf, relpath: EntryPath) -> Result<ZarrArchiveFile, FSError> {
    let size = fs_err::metadata(&path)
        .map_err(|e| FSError::stat_error(&path, e))?
        .len();
    let digest = md5_file(&path)?;
    debug!("Computed checksum for file {relpath}: {digest}");
    Ok(ZarrArchiveFile {
        path: relpath,
        size,
        digest,
    })
}
