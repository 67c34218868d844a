use assert_matches::assert_matches;
use fs_extra::dir;
use rstest::rstest;
use std::fs::create_dir_all;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};
use zarr_checksum::errors::FSError;
use zarr_checksum::zarr::{DirPath, EntryPath};
use zarr_checksum::{DigestReport, LocalOptions, LocalZarr};

const SAMPLE_CHECKSUM: &str = "72a85b122ee3b9a370a63dabbc47abd6-5--444";

enum TestCase {
    Permanent {
        path: PathBuf,
        checksum: &'static str,
    },
    Temporary {
        dir: TempDir,
        checksum: &'static str,
    },
}

impl TestCase {
    fn path(&self) -> &Path {
        match self {
            TestCase::Permanent { path, .. } => path,
            TestCase::Temporary { dir, .. } => dir.path(),
        }
    }

    fn checksum(&self) -> &'static str {
        match self {
            TestCase::Permanent { checksum, .. } => checksum,
            TestCase::Temporary { checksum, .. } => checksum,
        }
    }
}

fn sample_path() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("data");
    path.push("sample.zarr");
    path
}

fn sample1() -> TestCase {
    TestCase::Permanent {
        path: sample_path(),
        checksum: SAMPLE_CHECKSUM,
    }
}

/// The sample plus some empty directories, which do not affect the checksum
fn sample2() -> TestCase {
    let tmp_path = tempdir().unwrap();
    let opts = dir::CopyOptions {
        content_only: true,
        ..dir::CopyOptions::default()
    };
    dir::copy(sample_path(), tmp_path.path(), &opts).unwrap();
    create_dir_all(tmp_path.path().join("arr_2")).unwrap();
    create_dir_all(tmp_path.path().join("arr_3").join("foo")).unwrap();
    TestCase::Temporary {
        dir: tmp_path,
        checksum: SAMPLE_CHECKSUM,
    }
}

fn empty_dir() -> TestCase {
    TestCase::Temporary {
        dir: tempdir().unwrap(),
        checksum: "481a2f77ab786a0f45aafd5db0971caa-0--0",
    }
}

fn subdir() -> TestCase {
    TestCase::Permanent {
        path: sample_path().join("arr_0"),
        checksum: "13f8c0df46a580d354e5fb0ad0acecd7-2--210",
    }
}

fn opts(threads: usize) -> LocalOptions {
    LocalOptions {
        threads: NonZeroUsize::new(threads).unwrap(),
    }
}

#[rstest]
#[case::sample(sample1())]
#[case::sample_with_empty_dirs(sample2())]
#[case::empty(empty_dir())]
#[case::subdir(subdir())]
fn test_local_checksum(#[case] case: TestCase, #[values(1, 2, 8)] threads: usize) {
    let zarr = LocalZarr::new(case.path()).unwrap();
    assert_eq!(
        zarr.checksum(opts(threads)).unwrap().digest(),
        case.checksum()
    );
}

#[test]
fn test_default_options() {
    let case = sample1();
    let zarr = LocalZarr::new(case.path()).unwrap();
    assert_eq!(
        zarr.checksum(LocalOptions::default()).unwrap().digest(),
        case.checksum()
    );
}

#[test]
fn test_files() {
    let zarr = LocalZarr::new(sample_path()).unwrap();
    let mut files = zarr
        .files()
        .map(|r| {
            let f = r.unwrap();
            (f.path.to_string(), f.digest, f.size)
        })
        .collect::<Vec<_>>();
    files.sort();
    assert_eq!(
        files,
        [
            (
                String::from(".zgroup"),
                String::from("e20297935e73dd0154104d4ea53040ab"),
                24
            ),
            (
                String::from("arr_0/.zarray"),
                String::from("bf7138ede595d4000cf48d3778b4629c"),
                194
            ),
            (
                String::from("arr_0/0"),
                String::from("6443e90c52d73712c7d4b8b09d3d32a1"),
                16
            ),
            (
                String::from("arr_1/.zarray"),
                String::from("bf7138ede595d4000cf48d3778b4629c"),
                194
            ),
            (
                String::from("arr_1/0"),
                String::from("1345385333f3a9809640e82423f05c0e"),
                16
            ),
        ]
    );
}

#[test]
fn test_report() {
    let case = sample2();
    let zarr = LocalZarr::new(case.path()).unwrap();
    let report = DigestReport::from_tree(zarr.checksum_tree(opts(4)).unwrap()).unwrap();
    assert_eq!(report.checksum().digest(), case.checksum());
    // Empty directories are never checksummed
    assert_eq!(report.len(), 3);
    let arr_1 = DirPath::from(EntryPath::try_from("arr_1").unwrap());
    assert_eq!(
        report.get(&arr_1).unwrap().digest(),
        "4d2bf893da1ec12c0b9788997af6f29f-2--210"
    );
    let arr_2 = DirPath::from(EntryPath::try_from("arr_2").unwrap());
    assert_eq!(report.get(&arr_2), None);
}

#[test]
fn test_nonexistent_root() {
    let tmp_path = tempdir().unwrap();
    let missing = tmp_path.path().join("nowhere.zarr");
    assert_matches!(LocalZarr::new(&missing), Err(FSError::RootNotFound { path }) => {
        assert_eq!(path, missing);
    });
}

#[test]
fn test_file_root() {
    assert_matches!(
        LocalZarr::new(sample_path().join(".zgroup")),
        Err(FSError::NotDirRoot { .. })
    );
}

#[test]
fn test_root_not_expanded() {
    let tmp_path = tempdir().unwrap();
    let literal = tmp_path.path().join("$HOME").join("~");
    assert_matches!(LocalZarr::new(&literal), Err(FSError::RootNotFound { path }) => {
        assert_eq!(path, literal);
    });
    create_dir_all(&literal).unwrap();
    let zarr = LocalZarr::new(&literal).unwrap();
    assert_eq!(
        zarr.checksum(opts(1)).unwrap().digest(),
        "481a2f77ab786a0f45aafd5db0971caa-0--0"
    );
}
