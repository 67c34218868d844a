use super::digest::ZarrDirectoryDigest;
use super::json::manifest_json;
use crate::errors::DigestError;
use crate::util::md5_string;

/// The checksum of a single file or directory within a Zarr directory
///
/// For a file, `digest` is the hex MD5 of the file's contents; for a
/// directory, it is the serialized [`ZarrDirectoryDigest`] of that directory.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ZarrChecksum {
    pub digest: String,
    /// Final path component of the file or directory
    pub name: String,
    pub size: u64,
}

impl ZarrChecksum {
    fn sort_key(&self) -> &str {
        &self.name
    }
}

/// The checksums of all the entries directly inside a Zarr directory; the MD5
/// of this manifest's canonical serialization is the directory's checksum.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ZarrChecksumManifest {
    pub directories: Vec<ZarrChecksum>,
    pub files: Vec<ZarrChecksum>,
}

impl ZarrChecksumManifest {
    pub fn new() -> Self {
        ZarrChecksumManifest::default()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.directories.is_empty()
    }

    /// Sort the directory & file entries by name.  The sort is stable, and
    /// entries' digests and sizes do not affect the ordering.
    pub fn sort(&mut self) {
        self.files.sort_by(|a, b| a.sort_key().cmp(b.sort_key()));
        self.directories.sort_by(|a, b| a.sort_key().cmp(b.sort_key()));
    }

    /// Sort the manifest and compute the aggregate checksum of its entries.
    ///
    /// Fails if a directory entry's digest is not a valid
    /// [`ZarrDirectoryDigest`] or if the total file count or size does not
    /// fit in a `u64`.
    pub fn generate_digest(&mut self) -> Result<ZarrDirectoryDigest, DigestError> {
        self.sort();
        let mut count = Total::new("count");
        let mut size = Total::new("size");
        for f in &self.files {
            count.add(1)?;
            size.add(f.size)?;
        }
        for d in &self.directories {
            count.add(d.digest.parse::<ZarrDirectoryDigest>()?.count)?;
            size.add(d.size)?;
        }
        let (count, size) = (count.value, size.value);
        let md5 = md5_string(&manifest_json(self));
        Ok(ZarrDirectoryDigest { md5, count, size })
    }
}

struct Total {
    field: &'static str,
    value: u64,
}

impl Total {
    fn new(field: &'static str) -> Total {
        Total { field, value: 0 }
    }

    fn add(&mut self, n: u64) -> Result<(), DigestError> {
        self.value = self
            .value
            .checked_add(n)
            .ok_or(DigestError::Overflow { field: self.field })?;
        Ok(())
    }
}
