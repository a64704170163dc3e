use crate::domain::{E2mc2Error, E2mc2Result, ExpansionField};
use crate::serialization::ascii_bytes;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

const ENTRY_MODE: u32 = 0o644;

const BLOCK_SIZE: usize = 512;

/// Probes whether `path` starts with a tar header block carrying a valid checksum, or with
/// the two zero blocks of an empty archive.
pub(crate) fn is_tar_archive(path: &Path) -> bool {
    let Ok(mut file) = File::open(path) else {
        return false;
    };
    let mut block = [0_u8; BLOCK_SIZE];
    if file.read_exact(&mut block).is_err() {
        return false;
    }

    if block.iter().all(|byte| *byte == 0) {
        return file.read_exact(&mut block).is_ok() && block.iter().all(|byte| *byte == 0);
    }

    let header = tar::Header::from_byte_slice(&block);
    let mut recomputed = header.clone();
    recomputed.set_cksum();
    matches!(
        (header.cksum(), recomputed.cksum()),
        (Ok(stored), Ok(expected)) if stored == expected
    )
}

/// Reads the four expansion entries out of a tar archive, keyed by logical field.
pub(crate) fn read_archive_entries(path: &Path) -> E2mc2Result<HashMap<ExpansionField, String>> {
    let file = File::open(path).map_err(|source| {
        E2mc2Error::io_system(
            "IO.ARCHIVE_OPEN",
            format!("failed to open archive '{}': {}", path.display(), source),
        )
    })?;
    let mut archive = tar::Archive::new(file);
    let entries = archive.entries().map_err(|source| archive_read_error(path, source))?;

    let mut contents = HashMap::new();
    for entry in entries {
        let mut entry = entry.map_err(|source| archive_read_error(path, source))?;
        let entry_path = entry
            .path()
            .map_err(|source| archive_read_error(path, source))?
            .into_owned();
        let Some(name) = entry_path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        let Some(field) = ExpansionField::from_file_name(name) else {
            warn!(
                "ignoring unexpected entry '{}' in archive '{}'",
                entry_path.display(),
                path.display()
            );
            continue;
        };

        let mut text = String::new();
        entry.read_to_string(&mut text).map_err(|source| {
            E2mc2Error::format(
                "FORMAT.ARCHIVE_ENTRY_TEXT",
                format!(
                    "archive entry '{}' in '{}' is not text: {}",
                    name,
                    path.display(),
                    source
                ),
            )
        })?;
        ascii_bytes(&text, name)?;
        debug!("read archive entry '{}' ({} bytes)", name, text.len());
        contents.insert(field, text);
    }

    Ok(contents)
}

/// Writes the given (file name, content) pairs as a tar archive at `path`.
pub(crate) fn write_archive(path: &Path, entries: &[(&str, String)]) -> E2mc2Result<()> {
    let mut payloads = Vec::with_capacity(entries.len());
    for (name, content) in entries {
        payloads.push((*name, ascii_bytes(content, name)?));
    }

    let file = File::create(path).map_err(|source| {
        E2mc2Error::io_system(
            "IO.ARCHIVE_CREATE",
            format!("failed to create archive '{}': {}", path.display(), source),
        )
    })?;
    let mut builder = tar::Builder::new(file);

    for (name, payload) in payloads {
        let mut header = tar::Header::new_ustar();
        header
            .set_path(name)
            .map_err(|source| archive_write_error(path, source))?;
        header.set_size(payload.len() as u64);
        header.set_mode(ENTRY_MODE);
        header.set_mtime(0);
        header.set_cksum();
        builder
            .append(&header, payload)
            .map_err(|source| archive_write_error(path, source))?;
        debug!("appended archive entry '{}' ({} bytes)", name, payload.len());
    }

    builder
        .into_inner()
        .map_err(|source| archive_write_error(path, source))?;
    Ok(())
}

fn archive_read_error(path: &Path, source: std::io::Error) -> E2mc2Error {
    E2mc2Error::format(
        "FORMAT.ARCHIVE_READ",
        format!("failed to read archive '{}': {}", path.display(), source),
    )
}

fn archive_write_error(path: &Path, source: std::io::Error) -> E2mc2Error {
    E2mc2Error::io_system(
        "IO.ARCHIVE_WRITE",
        format!("failed to write archive '{}': {}", path.display(), source),
    )
}

#[cfg(test)]
mod tests {
    use super::{is_tar_archive, read_archive_entries, write_archive};
    use crate::domain::{E2mc2ErrorCategory, ExpansionField};
    use std::fs::{self, File};
    use tempfile::TempDir;

    #[test]
    fn entries_carry_exact_sizes_and_names() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("ce.tar");
        write_archive(
            &path,
            &[
                ("lat.in", "lattice\n".to_string()),
                ("eci.out", "0.100000\n".to_string()),
            ],
        )
        .expect("archive should be written");

        let mut archive = tar::Archive::new(File::open(&path).expect("archive should open"));
        let sizes = archive
            .entries()
            .expect("entries should list")
            .map(|entry| {
                let entry = entry.expect("entry should read");
                (
                    entry.path().expect("path").to_string_lossy().into_owned(),
                    entry.header().size().expect("size"),
                )
            })
            .collect::<Vec<_>>();
        assert_eq!(
            sizes,
            vec![("lat.in".to_string(), 8), ("eci.out".to_string(), 9)]
        );
        assert!(is_tar_archive(&path));
    }

    #[test]
    fn entries_are_matched_on_final_path_component() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("nested.tar");
        {
            let mut builder =
                tar::Builder::new(File::create(&path).expect("archive should be created"));
            for (name, body) in [("run/gs_str.out", "gs\n"), ("run/notes.txt", "ignored\n")] {
                let mut header = tar::Header::new_ustar();
                header.set_path(name).expect("path should be set");
                header.set_size(body.len() as u64);
                header.set_mode(0o644);
                header.set_cksum();
                builder
                    .append(&header, body.as_bytes())
                    .expect("entry should append");
            }
            builder.finish().expect("archive should finish");
        }

        let entries = read_archive_entries(&path).expect("entries should read");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[&ExpansionField::GroundState], "gs\n");
    }

    #[test]
    fn non_ascii_payload_is_rejected_before_writing() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("bad.tar");
        let error = write_archive(&path, &[("lat.in", "α-Fe\n".to_string())])
            .expect_err("non-ascii should fail");

        assert_eq!(error.category(), E2mc2ErrorCategory::InputValidation);
        assert!(!path.exists());
    }

    #[test]
    fn non_ascii_entry_is_rejected_on_read() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("accented.tar");
        {
            let mut builder =
                tar::Builder::new(File::create(&path).expect("archive should be created"));
            let body = "3.0 Å\n".as_bytes();
            let mut header = tar::Header::new_ustar();
            header.set_path("lat.in").expect("path should be set");
            header.set_size(body.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append(&header, body).expect("entry should append");
            builder.finish().expect("archive should finish");
        }

        let error = read_archive_entries(&path).expect_err("non-ascii entry should fail");
        assert_eq!(error.category(), E2mc2ErrorCategory::InputValidation);
        assert_eq!(error.placeholder(), "INPUT.NON_ASCII");
    }

    #[test]
    fn empty_archive_is_still_an_archive() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("empty.tar");
        tar::Builder::new(File::create(&path).expect("archive should be created"))
            .finish()
            .expect("archive should finish");

        assert!(is_tar_archive(&path));
        assert!(read_archive_entries(&path).expect("entries should read").is_empty());
    }

    #[test]
    fn plain_text_is_not_an_archive() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("doc.json");
        fs::write(&path, "{\"lat\": \"\"}").expect("file should be written");
        assert!(!is_tar_archive(&path));

        let long = temp.path().join("long.json");
        fs::write(&long, format!("{{\"lat\": \"{}\"}}", "x".repeat(2048)))
            .expect("file should be written");
        assert!(!is_tar_archive(&long));
        assert!(!is_tar_archive(&temp.path().join("missing.tar")));
    }
}
