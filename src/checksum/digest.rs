use super::manifest::ZarrChecksumManifest;
use crate::errors::InvalidZarrChecksum;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// The checksum of a Zarr directory containing no files, i.e., the digest of
/// an empty [`ZarrChecksumManifest`]
pub static EMPTY_CHECKSUM: LazyLock<ZarrDirectoryDigest> = LazyLock::new(|| {
    ZarrChecksumManifest::default()
        .generate_digest()
        .expect("An empty manifest should always have a digest")
});

/// The parsed form of a Zarr directory checksum, which is serialized as
/// `{md5}-{count}--{size}`
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ZarrDirectoryDigest {
    /// 32-character lowercase hex MD5 digest of the directory's manifest
    pub md5: String,
    /// Total number of files beneath the directory
    pub count: u64,
    /// Total size in bytes of all files beneath the directory
    pub size: u64,
}

impl ZarrDirectoryDigest {
    /// Parse a checksum string, or return [`EMPTY_CHECKSUM`] if `s` is `None`
    pub fn parse(s: Option<&str>) -> Result<ZarrDirectoryDigest, InvalidZarrChecksum> {
        match s {
            Some(s) => s.parse(),
            None => Ok(EMPTY_CHECKSUM.clone()),
        }
    }

    /// Return the serialized form of the checksum
    pub fn digest(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ZarrDirectoryDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}--{}", self.md5, self.count, self.size)
    }
}

impl FromStr for ZarrDirectoryDigest {
    type Err = InvalidZarrChecksum;

    fn from_str(s: &str) -> Result<ZarrDirectoryDigest, InvalidZarrChecksum> {
        let invalid = || InvalidZarrChecksum(s.to_owned());
        let (md5, rest) = s.split_once('-').ok_or_else(invalid)?;
        let (count, size) = rest.split_once("--").ok_or_else(invalid)?;
        if md5.len() != 32 || !md5.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(invalid());
        }
        Ok(ZarrDirectoryDigest {
            md5: md5.to_owned(),
            count: parse_decimal(count).ok_or_else(invalid)?,
            size: parse_decimal(size).ok_or_else(invalid)?,
        })
    }
}

// `u64::from_str` accepts a leading `+` and leading zeros, neither of which
// survives reformatting.
fn parse_decimal(s: &str) -> Option<u64> {
    let all_digits = !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if all_digits && (s == "0" || !s.starts_with('0')) {
        s.parse().ok()
    } else {
        None
    }
}
