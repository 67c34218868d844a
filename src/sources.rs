//! Sources of Zarr file checksums: local directories and S3 prefixes
mod jobstack;
pub mod local;
pub mod s3;
pub use self::local::{LocalOptions, LocalZarr};
pub use self::s3::{S3Credentials, S3Options, S3Url, S3Zarr};
