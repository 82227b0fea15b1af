//! Integration tests for the archive extraction contract.
//!
//! Archives are synthesized in memory so the tests cover the real tar/gzip
//! decode paths without touching the network.

use std::{io::Write, path::Path};

use flate2::{write::GzEncoder, Compression, GzBuilder};
use harvester::download::extract_archive;
use tempfile::tempdir;

/// The default allow-list used throughout.
fn keep() -> Vec<String> { vec!["tex".to_string(), "bib".to_string()] }

/// Builds a gzipped tar archive from `(name, content)` pairs.
fn tarball(files: &[(&str, &[u8])]) -> Vec<u8> {
  let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
  for (name, content) in files {
    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    // Write the member name straight into the header: `append_data`/`set_path`
    // reject `..`, so traversal fixtures like `../evil.tex` can't go through it.
    let name_bytes = name.as_bytes();
    header.as_gnu_mut().unwrap().name[..name_bytes.len()].copy_from_slice(name_bytes);
    header.set_cksum();
    builder.append(&header, *content).unwrap();
  }
  builder.into_inner().unwrap().finish().unwrap()
}

/// Gzips `content` with the given FNAME header (or none).
fn single_gzip(name: Option<&str>, content: &[u8]) -> Vec<u8> {
  let builder = GzBuilder::new();
  let builder = match name {
    Some(name) => builder.filename(name),
    None => builder,
  };
  let mut encoder = builder.write(Vec::new(), Compression::default());
  encoder.write_all(content).unwrap();
  encoder.finish().unwrap()
}

#[test]
fn tar_archive_is_filtered_to_the_allow_list() -> anyhow::Result<()> {
  let scratch = tempdir()?;
  let dest = tempdir()?;

  let tex = vec![b'x'; 50_000];
  let png = vec![0u8; 1_450_000];
  let bytes = tarball(&[("main.tex", tex.as_slice()), ("fig1.png", png.as_slice())]);

  let (size_before, size_after) =
    extract_archive(&bytes, scratch.path(), dest.path(), &keep(), "fallback.tex")?;

  assert_eq!(size_before, 1_500_000);
  assert_eq!(size_after, 50_000);
  assert!(dest.path().join("main.tex").exists());
  assert!(!dest.path().join("fig1.png").exists());
  Ok(())
}

#[test]
fn size_after_never_exceeds_size_before() {
  let scratch = tempdir().unwrap();
  let dest = tempdir().unwrap();

  let bytes = tarball(&[
    ("a.tex", &[1u8; 300][..]),
    ("b.bib", &[2u8; 200][..]),
    ("notes.txt", &[3u8; 5_000][..]),
  ]);
  let (size_before, size_after) =
    extract_archive(&bytes, scratch.path(), dest.path(), &keep(), "fallback.tex").unwrap();

  assert!(size_after <= size_before);
  assert_eq!(size_before, 5_500);
  assert_eq!(size_after, 500);
}

#[test]
fn nested_member_paths_are_preserved() {
  let scratch = tempdir().unwrap();
  let dest = tempdir().unwrap();

  let bytes = tarball(&[("sections/intro.tex", &[1u8; 100][..])]);
  extract_archive(&bytes, scratch.path(), dest.path(), &keep(), "fallback.tex").unwrap();

  assert!(dest.path().join("sections/intro.tex").exists());
}

#[test]
fn zero_allow_listed_members_succeed_with_zero_size_after() {
  let scratch = tempdir().unwrap();
  let dest = tempdir().unwrap();

  let bytes = tarball(&[("fig1.png", &[0u8; 1_000][..]), ("fig2.png", &[0u8; 2_000][..])]);
  let (size_before, size_after) =
    extract_archive(&bytes, scratch.path(), dest.path(), &keep(), "fallback.tex").unwrap();

  assert_eq!(size_before, 3_000);
  assert_eq!(size_after, 0);
}

#[test]
fn traversal_members_are_never_written() {
  let scratch = tempdir().unwrap();
  let dest_parent = tempdir().unwrap();
  let dest = dest_parent.path().join("dest");
  std::fs::create_dir_all(&dest).unwrap();

  let bytes = tarball(&[("../evil.tex", &[1u8; 100][..]), ("fine.tex", &[2u8; 100][..])]);
  let (size_before, size_after) =
    extract_archive(&bytes, scratch.path(), &dest, &keep(), "fallback.tex").unwrap();

  // The escaping member is skipped entirely; the well-behaved one survives.
  assert_eq!(size_before, 100);
  assert_eq!(size_after, 100);
  assert!(dest.join("fine.tex").exists());
  assert!(!dest_parent.path().join("evil.tex").exists());
  assert!(!Path::new("evil.tex").exists());
}

#[test]
fn scratch_directories_never_persist() {
  let scratch = tempdir().unwrap();
  let dest = tempdir().unwrap();

  // Success path.
  let bytes = tarball(&[("main.tex", &[1u8; 10][..])]);
  extract_archive(&bytes, scratch.path(), dest.path(), &keep(), "fallback.tex").unwrap();
  assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);

  // Failure path.
  let garbage = b"definitely not an archive";
  extract_archive(garbage, scratch.path(), dest.path(), &keep(), "fallback.tex").unwrap_err();
  assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[test]
fn single_gzip_member_is_named_from_the_header() -> anyhow::Result<()> {
  let scratch = tempdir()?;
  let dest = tempdir()?;

  let content = b"\\documentclass{article}".as_slice();
  let bytes = single_gzip(Some("paper.tex"), content);
  let (size_before, size_after) =
    extract_archive(&bytes, scratch.path(), dest.path(), &keep(), "fallback.tex")?;

  assert_eq!(size_before, content.len() as u64);
  assert_eq!(size_after, content.len() as u64);
  assert!(dest.path().join("paper.tex").exists());
  Ok(())
}

#[test]
fn single_gzip_without_header_name_uses_the_fallback() {
  let scratch = tempdir().unwrap();
  let dest = tempdir().unwrap();

  let bytes = single_gzip(None, b"content");
  extract_archive(&bytes, scratch.path(), dest.path(), &keep(), "1706-03762v1.tex").unwrap();

  assert!(dest.path().join("1706-03762v1.tex").exists());
}

#[test]
fn single_gzip_with_disallowed_extension_keeps_nothing() {
  let scratch = tempdir().unwrap();
  let dest = tempdir().unwrap();

  let bytes = single_gzip(Some("paper.pdf"), &[0u8; 400]);
  let (size_before, size_after) =
    extract_archive(&bytes, scratch.path(), dest.path(), &keep(), "fallback.tex").unwrap();

  assert_eq!(size_before, 400);
  assert_eq!(size_after, 0);
  assert!(!dest.path().join("paper.pdf").exists());
}

#[test]
fn corrupt_bytes_are_an_error_not_a_panic() {
  let scratch = tempdir().unwrap();
  let dest = tempdir().unwrap();

  let result =
    extract_archive(&[0x1f, 0x8b, 0xff, 0x00], scratch.path(), dest.path(), &keep(), "f.tex");
  assert!(result.is_err());
}

#[test]
fn rerunning_overwrites_the_destination() {
  let scratch = tempdir().unwrap();
  let dest = tempdir().unwrap();

  let first = tarball(&[("main.tex", &[1u8; 100][..])]);
  let second = tarball(&[("main.tex", &[2u8; 60][..])]);
  extract_archive(&first, scratch.path(), dest.path(), &keep(), "f.tex").unwrap();
  extract_archive(&second, scratch.path(), dest.path(), &keep(), "f.tex").unwrap();

  let content = std::fs::read(dest.path().join("main.tex")).unwrap();
  assert_eq!(content, vec![2u8; 60]);
}
