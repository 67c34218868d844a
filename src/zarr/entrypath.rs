use super::DirPath;
use crate::errors::{EntryNameError, EntryPathError};
use std::fmt;
use std::path::{Component, Path};

/// A normalized, nonempty, forward-slash-separated UTF-8 encoded relative path
#[derive(Clone, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct EntryPath(Vec<String>);

impl EntryPath {
    /// Return the basename of the path
    pub fn file_name(&self) -> &str {
        self.0
            .last()
            .expect("Invariant violated: EntryPath is empty")
    }

    /// Return the directory containing the path.  For a single-component
    /// path, this is [`DirPath::Root`].
    ///
    /// ```
    /// # use zarr_checksum::zarr::{DirPath, EntryPath};
    /// let path = EntryPath::try_from("foo/bar/baz").unwrap();
    /// assert_eq!(path.parent().to_string(), "foo/bar");
    /// let path = EntryPath::try_from("foo").unwrap();
    /// assert_eq!(path.parent(), DirPath::Root);
    /// ```
    pub fn parent(&self) -> DirPath {
        match self.0.split_last() {
            Some((_, rest)) if !rest.is_empty() => DirPath::Path(EntryPath(rest.to_vec())),
            _ => DirPath::Root,
        }
    }

    /// Return the number of components in the path, which is also the number
    /// of directories (counting the root) that contain it
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Append a single path component
    pub fn join1(&self, s: &str) -> Result<EntryPath, EntryNameError> {
        let mut parts = self.0.clone();
        parts.push(check_name(s)?);
        Ok(EntryPath(parts))
    }

    /// Construct a single-component path, i.e., an entry directly in the
    /// root of the Zarr
    pub(super) fn from_name(s: &str) -> Result<EntryPath, EntryNameError> {
        Ok(EntryPath(vec![check_name(s)?]))
    }
}

impl fmt::Debug for EntryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0.join("/").escape_debug())
    }
}

impl fmt::Display for EntryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// Parses a relative path, dropping `.` components and empty components from
/// doubled or trailing slashes.  Absolute paths, `..` components, non-UTF-8
/// components, and paths with no components are rejected.
impl TryFrom<&Path> for EntryPath {
    type Error = EntryPathError;

    fn try_from(path: &Path) -> Result<EntryPath, EntryPathError> {
        let parts = path
            .components()
            .filter(|c| *c != Component::CurDir)
            .map(|c| match c {
                Component::Normal(part) => part.to_str().map(String::from),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .filter(|parts| !parts.is_empty())
            .ok_or_else(|| EntryPathError(path.into()))?;
        Ok(EntryPath(parts))
    }
}

impl TryFrom<&str> for EntryPath {
    type Error = EntryPathError;

    fn try_from(path: &str) -> Result<EntryPath, EntryPathError> {
        Path::new(path).try_into()
    }
}

fn check_name(s: &str) -> Result<String, EntryNameError> {
    if s.is_empty() || s == "." || s == ".." || s.contains('/') {
        Err(EntryNameError(s.to_owned()))
    } else {
        Ok(s.to_owned())
    }
}
