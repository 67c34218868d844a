use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error returned when a string is not a valid Zarr directory checksum of the
/// form `{md5}-{count}--{size}`
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("Invalid Zarr directory checksum: {0:?}")]
pub struct InvalidZarrChecksum(pub String);

/// Error returned when a directory's checksum cannot be computed
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum DigestError {
    #[error(transparent)]
    Invalid(#[from] InvalidZarrChecksum),

    #[error("Total file {field} of directory does not fit in a 64-bit integer")]
    Overflow { field: &'static str },
}

/// Error returned when trying to construct an
/// [`EntryPath`][crate::zarr::EntryPath] from an invalid, nonnormalized, or
/// undecodable path
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("Invalid Zarr entry path: {0:?}")]
pub struct EntryPathError(pub PathBuf);

/// Error returned when trying to join an
/// [`EntryPath`][crate::zarr::EntryPath] with a string that is not a single
/// path component
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("Invalid path name: {0:?}")]
pub struct EntryNameError(pub String);

/// Error raised while enumerating or digesting the files of a local Zarr
///
/// The `source` of each I/O variant comes from [`fs_err`] and so already
/// names the path involved.
#[derive(Debug, Error)]
pub enum FSError {
    #[error("Zarr root does not exist: {}", .path.display())]
    RootNotFound { path: PathBuf },

    #[error("Root path of traversal is not a directory: {}", .path.display())]
    NotDirRoot { path: PathBuf },

    #[error("Error digesting file: {source}")]
    MD5FileError { path: PathBuf, source: io::Error },

    #[error("Error stat'ing file: {source}")]
    StatError { path: PathBuf, source: io::Error },

    #[error("Error reading directory: {source}")]
    ReaddirError { path: PathBuf, source: io::Error },

    #[error("Could not decode file name: {}", .path.display())]
    UndecodableName { path: PathBuf },

    #[error(transparent)]
    EntryPath(#[from] EntryPathError),
}

impl FSError {
    pub(crate) fn root_not_found<P: AsRef<Path>>(path: P) -> Self {
        FSError::RootNotFound {
            path: path.as_ref().into(),
        }
    }

    pub(crate) fn not_dir_root<P: AsRef<Path>>(path: P) -> Self {
        FSError::NotDirRoot {
            path: path.as_ref().into(),
        }
    }

    pub(crate) fn md5_file_error<P: AsRef<Path>>(path: P, source: io::Error) -> Self {
        FSError::MD5FileError {
            path: path.as_ref().into(),
            source,
        }
    }

    pub(crate) fn stat_error<P: AsRef<Path>>(path: P, source: io::Error) -> Self {
        FSError::StatError {
            path: path.as_ref().into(),
            source,
        }
    }

    pub(crate) fn readdir_error<P: AsRef<Path>>(path: P, source: io::Error) -> Self {
        FSError::ReaddirError {
            path: path.as_ref().into(),
            source,
        }
    }

    pub(crate) fn undecodable_name<P: AsRef<Path>>(path: P) -> Self {
        FSError::UndecodableName {
            path: path.as_ref().into(),
        }
    }
}

/// Error raised while listing the objects of a Zarr stored in S3
#[derive(Debug, Error)]
pub enum S3Error {
    #[error("Invalid S3 URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: &'static str },

    #[error("Invalid S3 endpoint URL {url:?}: {source}")]
    InvalidEndpoint {
        url: String,
        source: url::ParseError,
    },

    #[error("Cannot address bucket {bucket:?}: {reason}")]
    InvalidBucket { bucket: String, reason: String },

    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Failed to list objects in bucket {bucket:?} under prefix {prefix:?}: {source}")]
    Request {
        bucket: String,
        prefix: String,
        source: reqwest::Error,
    },

    #[error("Failed to parse listing of bucket {bucket:?}: {source}")]
    Parse {
        bucket: String,
        source: quick_xml::DeError,
    },

    #[error("Object key {key:?} is not under prefix {prefix:?}")]
    KeyOutsidePrefix { key: String, prefix: String },

    #[error("URL-encoded object key {key:?} does not decode to UTF-8")]
    UndecodableKey { key: String },

    #[error("Object key {key:?} is not a valid Zarr entry path")]
    BadKey {
        key: String,
        source: EntryPathError,
    },
}

/// Error raised by a complete checksumming operation
#[derive(Debug, Error)]
pub enum ChecksumError {
    #[error(transparent)]
    FS(#[from] FSError),

    #[error(transparent)]
    S3(#[from] S3Error),

    #[error(transparent)]
    Digest(#[from] DigestError),

    #[error("A checksumming worker thread panicked")]
    WorkerPanic,
}
