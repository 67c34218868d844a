//! Computing Zarr checksums from the checksums of individual files
mod digest;
mod json;
mod manifest;
mod tree;
pub use self::digest::*;
pub use self::manifest::*;
pub use self::tree::*;
use crate::errors::{ChecksumError, DigestError};
use crate::zarr::ZarrArchiveFile;

/// Compute the checksum of a Zarr from the complete collection of its files
pub fn compile_checksum<I>(iter: I) -> Result<ZarrDirectoryDigest, DigestError>
where
    I: IntoIterator<Item = ZarrArchiveFile>,
{
    iter.into_iter().collect::<ZarrChecksumTree>().process()
}

/// Like [`compile_checksum()`], but the first `Err` in `iter` aborts the
/// computation before any directories are checksummed
pub fn try_compile_checksum<I, E>(iter: I) -> Result<ZarrDirectoryDigest, ChecksumError>
where
    I: IntoIterator<Item = Result<ZarrArchiveFile, E>>,
    ChecksumError: From<E>,
{
    let mut tree = ZarrChecksumTree::new();
    for file in iter {
        tree.add_file(file?);
    }
    Ok(tree.process()?)
}
