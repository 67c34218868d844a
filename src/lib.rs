//! Compute the Dandi Zarr checksum of a directory tree, whether stored on the
//! local filesystem or under a prefix in an S3 bucket.
//!
//! The checksum of a directory is the MD5 digest of a canonical JSON listing
//! of its immediate files and subdirectories, together with the total number
//! of files and bytes beneath it, in the form `{md5}-{count}--{size}`.
pub mod checksum;
pub mod errors;
pub mod report;
pub mod sources;
mod util;
pub mod zarr;
pub use crate::checksum::{
    compile_checksum, try_compile_checksum, ZarrChecksumTree, ZarrDirectoryDigest, EMPTY_CHECKSUM,
};
pub use crate::errors::ChecksumError;
pub use crate::report::DigestReport;
pub use crate::sources::{
    LocalOptions, LocalZarr, S3Credentials, S3Options, S3Url, S3Zarr,
};
