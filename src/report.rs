//! Reporting the checksum of every directory in a Zarr
use crate::checksum::{ZarrChecksumTree, ZarrDirectoryDigest, EMPTY_CHECKSUM};
use crate::errors::DigestError;
use crate::zarr::{DirPath, EntryPath};
use std::collections::BTreeMap;
use std::fmt;
use termtree::Tree;

/// The checksums of all directories in a Zarr, as computed while processing
/// a [`ZarrChecksumTree`]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DigestReport {
    digests: BTreeMap<DirPath, ZarrDirectoryDigest>,
}

impl DigestReport {
    pub fn from_tree(tree: ZarrChecksumTree) -> Result<DigestReport, DigestError> {
        let mut digests = BTreeMap::new();
        tree.process_with(|path, digest| {
            digests.insert(path.clone(), digest.clone());
        })?;
        Ok(DigestReport { digests })
    }

    /// The checksum of the whole Zarr
    pub fn checksum(&self) -> &ZarrDirectoryDigest {
        self.digests.get(&DirPath::Root).unwrap_or(&EMPTY_CHECKSUM)
    }

    pub fn get(&self, path: &DirPath) -> Option<&ZarrDirectoryDigest> {
        self.digests.get(path)
    }

    /// Number of directories in the report, including the root
    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    /// Arrange the directory checksums as a tree rooted at `.`, with each
    /// directory's subdirectories sorted by name
    pub fn to_tree(&self) -> Tree<String> {
        let mut children: BTreeMap<DirPath, Vec<&EntryPath>> = BTreeMap::new();
        for path in self.digests.keys() {
            if let DirPath::Path(ep) = path {
                children.entry(ep.parent()).or_default().push(ep);
            }
        }
        build_tree(
            &DirPath::Root,
            ".",
            self.checksum(),
            &children,
            &self.digests,
        )
    }
}

fn build_tree(
    path: &DirPath,
    name: &str,
    digest: &ZarrDirectoryDigest,
    children: &BTreeMap<DirPath, Vec<&EntryPath>>,
    digests: &BTreeMap<DirPath, ZarrDirectoryDigest>,
) -> Tree<String> {
    let mut tree = Tree::new(format!("{name} {digest}"));
    for &ep in children.get(path).into_iter().flatten() {
        let subpath = DirPath::Path(ep.clone());
        if let Some(subdigest) = digests.get(&subpath) {
            tree.push(build_tree(
                &subpath,
                ep.file_name(),
                subdigest,
                children,
                digests,
            ));
        }
    }
    tree
}

impl fmt::Display for DigestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_tree())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::zarr::ZarrArchiveFile;

    fn tree_of(files: &[(&str, &str, u64)]) -> ZarrChecksumTree {
        files
            .iter()
            .map(|&(path, digest, size)| ZarrArchiveFile {
                path: EntryPath::try_from(path).unwrap(),
                size,
                digest: digest.into(),
            })
            .collect()
    }

    #[test]
    fn test_sample_report() {
        let tree = tree_of(&[
            ("arr_1/0", "fba4dee03a51bde314e9713b00284a93", 431),
            ("arr_1/.zarray", "9e30a0a1a465e24220d4132fdd544634", 315),
            (".zgroup", "e20297935e73dd0154104d4ea53040ab", 24),
            ("arr_0/0", "ed4e934a474f1d2096846c6248f18c00", 431),
            ("arr_0/.zarray", "9e30a0a1a465e24220d4132fdd544634", 315),
        ]);
        let report = DigestReport::from_tree(tree).unwrap();
        assert_eq!(report.len(), 3);
        assert_eq!(
            report.checksum().digest(),
            "4313ab36412db2981c3ed391b38604d6-5--1516"
        );
        let arr_0 = report
            .get(&DirPath::from(EntryPath::try_from("arr_0").unwrap()))
            .unwrap();
        assert_eq!(arr_0.count, 2);
        assert_eq!(arr_0.size, 746);
        let rendered = report.to_string();
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], ". 4313ab36412db2981c3ed391b38604d6-5--1516");
        assert!(lines[1].ends_with(&format!("arr_0 {arr_0}")));
        assert!(lines[2].contains("arr_1 "));
    }

    #[test]
    fn test_nested_report_order() {
        let tree = tree_of(&[
            ("b/y/f", "415290769594460e2e485922904f345d", 1),
            ("a/z/f", "415290769594460e2e485922904f345d", 1),
            ("a/x/f", "415290769594460e2e485922904f345d", 1),
        ]);
        let report = DigestReport::from_tree(tree).unwrap();
        assert_eq!(report.len(), 6);
        let rendered = report.to_string();
        let names = rendered
            .lines()
            .map(|ln| {
                ln.trim_start_matches(|c: char| !c.is_ascii_alphanumeric() && c != '.')
                    .split(' ')
                    .next()
                    .unwrap_or_default()
            })
            .collect::<Vec<_>>();
        assert_eq!(names, [".", "a", "x", "z", "b", "y"]);
    }

    #[test]
    fn test_empty_report() {
        let report = DigestReport::from_tree(ZarrChecksumTree::new()).unwrap();
        assert!(report.is_empty());
        assert_eq!(report.checksum(), &*EMPTY_CHECKSUM);
        assert_eq!(
            report.to_string().trim_end(),
            ". 481a2f77ab786a0f45aafd5db0971caa-0--0"
        );
    }
}
