use crate::errors::FSError;
use md5::{Digest, Md5};
use std::io::Read;
use std::path::Path;

/// Size of the buffer used when streaming a file through MD5
const CHUNK_SIZE: usize = 8192;

pub(crate) fn md5_string(s: &str) -> String {
    hex::encode(Md5::digest(s))
}

/// Compute the hex MD5 digest of a file's contents without loading the whole
/// file into memory
pub(crate) fn md5_file<P: AsRef<Path>>(path: P) -> Result<String, FSError> {
    let path = path.as_ref();
    let mut file = fs_err::File::open(path).map_err(|e| FSError::md5_file_error(path, e))?;
    let mut hasher = Md5::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file
            .read(&mut buf)
            .map_err(|e| FSError::md5_file_error(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_matches::assert_matches;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_md5_string() {
        assert_eq!(md5_string(""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(
            md5_string(r#"{"directories":[],"files":[]}"#),
            "481a2f77ab786a0f45aafd5db0971caa"
        );
    }

    #[test]
    fn test_md5_file_empty() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("empty");
        fs::write(&path, b"").unwrap();
        assert_eq!(md5_file(&path).unwrap(), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_md5_file_spans_chunks() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("big");
        let data = "0123456789abcdef".repeat(1500);
        fs::write(&path, &data).unwrap();
        assert_eq!(md5_file(&path).unwrap(), md5_string(&data));
    }

    #[test]
    fn test_md5_file_missing() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nonexistent");
        let r = md5_file(&path);
        assert_matches!(r, Err(FSError::MD5FileError { path: p, .. }) => {
            assert_eq!(p, path);
        });
    }
}
