//! Canonical serialization of a directory manifest.
//!
//! The MD5 of this exact byte sequence is a directory's checksum, so the
//! layout must not change: no whitespace, `directories` before `files`,
//! entry fields in the order `digest`, `name`, `size`, and every non-ASCII
//! or non-printable character escaped as `\uXXXX` (UTF-16 code units,
//! lowercase hex).
use super::manifest::{ZarrChecksum, ZarrChecksumManifest};
use std::fmt::{Error, Write};

pub(super) fn manifest_json(manifest: &ZarrChecksumManifest) -> String {
    let mut buf = String::new();
    write_manifest(manifest, &mut buf).expect("Writing to a String should not fail");
    buf
}

fn write_manifest<W: Write>(manifest: &ZarrChecksumManifest, writer: &mut W) -> Result<(), Error> {
    writer.write_str(r#"{"directories":"#)?;
    write_entries(&manifest.directories, writer)?;
    writer.write_str(r#","files":"#)?;
    write_entries(&manifest.files, writer)?;
    writer.write_char('}')?;
    Ok(())
}

fn write_entries<W: Write>(entries: &[ZarrChecksum], writer: &mut W) -> Result<(), Error> {
    writer.write_char('[')?;
    for (i, entry) in entries.iter().enumerate() {
        if i > 0 {
            writer.write_char(',')?;
        }
        writer.write_str(r#"{"digest":"#)?;
        write_json_str(&entry.digest, writer)?;
        writer.write_str(r#","name":"#)?;
        write_json_str(&entry.name, writer)?;
        write!(writer, r#","size":{}}}"#, entry.size)?;
    }
    writer.write_char(']')?;
    Ok(())
}

fn write_json_str<W: Write>(s: &str, writer: &mut W) -> Result<(), Error> {
    writer.write_char('"')?;
    for c in s.chars() {
        match c {
            '"' => writer.write_str("\\\"")?,
            '\\' => writer.write_str(r"\\")?,
            '\x08' => writer.write_str("\\b")?,
            '\x0C' => writer.write_str("\\f")?,
            '\n' => writer.write_str("\\n")?,
            '\r' => writer.write_str("\\r")?,
            '\t' => writer.write_str("\\t")?,
            ' '..='~' => writer.write_char(c)?,
            c => {
                let mut buf = [0u16; 2];
                for b in c.encode_utf16(&mut buf) {
                    write!(writer, "\\u{b:04x}")?;
                }
            }
        }
    }
    writer.write_char('"')?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("foobar", r#""foobar""#)]
    #[case("foo / bar", r#""foo / bar""#)]
    #[case("foo\"bar", r#""foo\"bar""#)]
    #[case("foo\\bar", r#""foo\\bar""#)]
    #[case("foo\x08\x0C\n\r\tbar", r#""foo\b\f\n\r\tbar""#)]
    #[case("foo\x0B\x1B\x7Fbar", r#""foo\u000b\u001b\u007fbar""#)]
    #[case("foo\u{2014}bar", r#""foo\u2014bar""#)]
    #[case("foo\u{1F410}bar", r#""foo\ud83d\udc10bar""#)]
    fn test_write_json_str(#[case] s: &str, #[case] json: &str) {
        let mut buf = String::new();
        write_json_str(s, &mut buf).unwrap();
        assert_eq!(buf, json);
    }

    #[test]
    fn test_manifest_json() {
        let manifest = ZarrChecksumManifest {
            directories: vec![ZarrChecksum {
                digest: "0987654321fedcba0987654321fedcba-23--65537".into(),
                name: "quux".into(),
                size: 65537,
            }],
            files: vec![
                ZarrChecksum {
                    digest: "abcdef0123456789abcdef0123456789".into(),
                    name: "bar".into(),
                    size: 42,
                },
                ZarrChecksum {
                    digest: "0123456789abcdef0123456789abcdef".into(),
                    name: "foo".into(),
                    size: 69105,
                },
            ],
        };
        assert_eq!(
            manifest_json(&manifest),
            r#"{"directories":[{"digest":"0987654321fedcba0987654321fedcba-23--65537","name":"quux","size":65537}],"files":[{"digest":"abcdef0123456789abcdef0123456789","name":"bar","size":42},{"digest":"0123456789abcdef0123456789abcdef","name":"foo","size":69105}]}"#
        );
    }

    #[test]
    fn test_manifest_json_empty() {
        assert_eq!(
            manifest_json(&ZarrChecksumManifest::default()),
            r#"{"directories":[],"files":[]}"#
        );
    }
}
