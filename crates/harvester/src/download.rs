//! Archive download, extraction, and size accounting.
//!
//! For each version of a paper the e-print endpoint serves either a gzipped
//! tar container or a single gzip-compressed file. Both shapes pass through
//! the same procedure: every member is extracted into a per-version scratch
//! directory, the declared sizes are summed into `size_before`, members whose
//! extension is on the allow-list are copied into the permanent destination,
//! and their sizes are summed into `size_after`. The scratch directory is
//! removed before the call returns, on the failure path as much as on the
//! success path.
//!
//! Archive member names are untrusted input: entries that would escape the
//! scratch root (absolute paths, `..` segments) are skipped rather than
//! written.

use std::{ffi::OsStr, io::Read};

use flate2::read::GzDecoder;
use tar::Archive;

use super::*;

/// e-print download endpoint, addressed as `{id}v{version}`.
const EPRINT_ENDPOINT: &str = "https://arxiv.org/e-print";

/// Result of one per-version download-and-extract attempt.
///
/// `size_before` and `size_after` are zero whenever `success` is false. The
/// invariant `size_after <= size_before` holds by construction: the filter
/// only ever removes members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionOutcome {
  /// Version number this outcome belongs to
  pub version:     u32,
  /// Whether fetch and extraction both succeeded
  pub success:     bool,
  /// Sum of all extracted member sizes in bytes
  pub size_before: u64,
  /// Sum of the allow-listed member sizes in bytes
  pub size_after:  u64,
}

impl VersionOutcome {
  /// The zero-sized failure outcome for a version.
  pub fn failed(version: u32) -> Self {
    Self { version, success: false, size_before: 0, size_after: 0 }
  }
}

/// Sums a set of per-version outcomes into the per-paper view: overall
/// success (at least one version succeeded) and the two byte totals.
pub fn summarize_versions(outcomes: &[VersionOutcome]) -> (bool, u64, u64) {
  let success = outcomes.iter().any(|o| o.success);
  let size_before = outcomes.iter().map(|o| o.size_before).sum();
  let size_after = outcomes.iter().map(|o| o.size_after).sum();
  (success, size_before, size_after)
}

/// Downloads versioned source archives and extracts the allow-listed files.
pub struct Downloader {
  /// Internal web client reused for all requests.
  client:          reqwest::Client,
  /// Root directory receiving per-paper source trees.
  output_dir:      PathBuf,
  /// Filename extensions retained during filtering.
  keep_extensions: Vec<String>,
}

impl Downloader {
  /// Creates a downloader writing under `output_dir`.
  pub fn new(
    output_dir: PathBuf,
    keep_extensions: Vec<String>,
    timeout: Duration,
  ) -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
      .build()?;
    Ok(Self { client, output_dir, keep_extensions })
  }

  /// Fetches and extracts one version of a paper.
  ///
  /// Filtered files land in `{output}/{dashed}/tex/{dashed}v{version}/`. Any
  /// failure — transport, HTTP status, undecodable archive, filesystem —
  /// yields the zero-sized failure outcome for this version and leaves the
  /// other versions untouched.
  pub async fn fetch_version(&self, id: &ArxivId, version: u32) -> VersionOutcome {
    let url = format!("{EPRINT_ENDPOINT}/{}", id.versioned(version));
    debug!("Fetching source archive via: {url}");

    let response = match self.client.get(&url).send().await.and_then(|r| r.error_for_status()) {
      Ok(response) => response,
      Err(e) => {
        warn!("Archive fetch for {} failed: {e}", id.versioned(version));
        return VersionOutcome::failed(version);
      },
    };
    let bytes = match response.bytes().await {
      Ok(bytes) => bytes,
      Err(e) => {
        warn!("Reading archive body for {} failed: {e}", id.versioned(version));
        return VersionOutcome::failed(version);
      },
    };

    let dest = self
      .output_dir
      .join(id.dashed())
      .join("tex")
      .join(format!("{}v{version}", id.dashed()));
    let fallback = format!("{}v{version}.tex", id.dashed());

    match extract_archive(&bytes, &std::env::temp_dir(), &dest, &self.keep_extensions, &fallback) {
      Ok((size_before, size_after)) => {
        info!(
          "Version {version} of {id}: {size_before} bytes before, {size_after} bytes after \
           filtering"
        );
        VersionOutcome { version, success: true, size_before, size_after }
      },
      Err(e) => {
        warn!("Extraction for {} failed: {e}", id.versioned(version));
        VersionOutcome::failed(version)
      },
    }
  }
}

/// Extracts an archive fully into a scratch directory under `scratch_root`,
/// copies the allow-listed members into `dest`, and returns
/// `(size_before, size_after)`.
///
/// The archive may be a gzipped tar container or a single gzip-compressed
/// file; `fallback_name` names the single member when the gzip header carries
/// no filename. The scratch directory is removed before returning, whether
/// extraction succeeded or not.
pub fn extract_archive(
  bytes: &[u8],
  scratch_root: &Path,
  dest: &Path,
  keep_extensions: &[String],
  fallback_name: &str,
) -> Result<(u64, u64)> {
  let scratch = tempfile::Builder::new().prefix("harvester-").tempdir_in(scratch_root)?;

  let result = extract_into(bytes, scratch.path(), dest, keep_extensions, fallback_name);
  // Explicit close so a cleanup failure is surfaced instead of ignored by Drop.
  let cleanup = scratch.close();

  let sizes = result?;
  cleanup?;
  Ok(sizes)
}

/// Extraction body, separated so [`extract_archive`] can clean the scratch
/// directory on every exit path.
fn extract_into(
  bytes: &[u8],
  scratch: &Path,
  dest: &Path,
  keep_extensions: &[String],
  fallback_name: &str,
) -> Result<(u64, u64)> {
  match unpack_tarball(bytes, scratch) {
    Ok(members) => {
      let size_before = members.iter().map(|(_, size)| size).sum();
      let mut size_after = 0;

      for (relative, size) in &members {
        if !extension_allowed(relative, keep_extensions) {
          continue;
        }
        let target = dest.join(relative);
        if let Some(parent) = target.parent() {
          std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(scratch.join(relative), &target)?;
        size_after += size;
      }
      Ok((size_before, size_after))
    },
    // Not a tar container; fall back to the single-gzip shape.
    Err(HarvesterError::Archive(_)) =>
      unpack_single_gzip(bytes, scratch, dest, keep_extensions, fallback_name),
    Err(e) => Err(e),
  }
}

/// Unpacks every regular file of a gzipped tar into `scratch`, returning the
/// relative path and declared size of each member.
///
/// Member sizes come from the tar headers, not from re-measuring the files on
/// disk. Members whose names would escape the scratch root are skipped.
fn unpack_tarball(bytes: &[u8], scratch: &Path) -> Result<Vec<(PathBuf, u64)>> {
  let mut archive = Archive::new(GzDecoder::new(bytes));
  let mut members = Vec::new();

  let entries =
    archive.entries().map_err(|e| HarvesterError::Archive(format!("not a tar archive: {e}")))?;
  for entry in entries {
    let mut entry = entry.map_err(|e| HarvesterError::Archive(format!("corrupt tar entry: {e}")))?;
    if !entry.header().entry_type().is_file() {
      continue;
    }

    let raw_path = entry
      .path()
      .map_err(|e| HarvesterError::Archive(format!("unreadable member name: {e}")))?
      .into_owned();
    let Some(relative) = sanitize_member_path(&raw_path) else {
      warn!("Skipping archive member escaping the scratch root: {}", raw_path.display());
      continue;
    };
    let size = entry
      .header()
      .size()
      .map_err(|e| HarvesterError::Archive(format!("unreadable member size: {e}")))?;

    let target = scratch.join(&relative);
    if let Some(parent) = target.parent() {
      std::fs::create_dir_all(parent)?;
    }
    // A plain Io error here must fail the version instead of triggering the
    // single-gzip fallback: the bytes already proved to be a tar container.
    entry.unpack(&target)?;
    members.push((relative, size));
  }

  Ok(members)
}

/// Decompresses a single-gzip archive: the content is one member whose name
/// comes from the gzip FNAME header, defaulting to `fallback_name`.
fn unpack_single_gzip(
  bytes: &[u8],
  scratch: &Path,
  dest: &Path,
  keep_extensions: &[String],
  fallback_name: &str,
) -> Result<(u64, u64)> {
  let mut decoder = GzDecoder::new(bytes);
  let mut content = Vec::new();
  decoder
    .read_to_end(&mut content)
    .map_err(|e| HarvesterError::Archive(format!("not a gzip stream: {e}")))?;

  // The header is only parsed once decompression has started.
  let name = decoder
    .header()
    .and_then(|h| h.filename())
    .map(|raw| String::from_utf8_lossy(raw).into_owned())
    .and_then(|raw| Path::new(&raw).file_name().map(|n| n.to_string_lossy().into_owned()))
    .unwrap_or_else(|| fallback_name.to_string());

  let size_before = content.len() as u64;
  std::fs::write(scratch.join(&name), &content)?;

  let mut size_after = 0;
  if extension_allowed(Path::new(&name), keep_extensions) {
    std::fs::create_dir_all(dest)?;
    std::fs::write(dest.join(&name), &content)?;
    size_after = size_before;
  }
  Ok((size_before, size_after))
}

/// Rebuilds a member path from its normal components, rejecting anything that
/// could land outside the extraction root.
fn sanitize_member_path(path: &Path) -> Option<PathBuf> {
  if path.is_absolute() {
    return None;
  }
  let mut sanitized = PathBuf::new();
  for component in path.components() {
    match component {
      std::path::Component::Normal(part) => sanitized.push(part),
      std::path::Component::CurDir => {},
      // ParentDir, RootDir, Prefix: all escape routes.
      _ => return None,
    }
  }
  if sanitized.as_os_str().is_empty() {
    None
  } else {
    Some(sanitized)
  }
}

/// Whether a member's filename extension is on the allow-list.
fn extension_allowed(path: &Path, keep_extensions: &[String]) -> bool {
  path
    .extension()
    .and_then(OsStr::to_str)
    .map(|ext| keep_extensions.iter().any(|keep| keep.eq_ignore_ascii_case(ext)))
    .unwrap_or(false)
}
