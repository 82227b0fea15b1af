//! arXiv identifier parsing and normalization.
//!
//! arXiv identifiers appear in two surface encodings depending on the
//! endpoint: the dot form (`1706.03762`) used by the API, the abstract page,
//! and the e-print download endpoint, and the dash form (`1706-03762`) used
//! for filesystem-safe directory names and reference keys. [`ArxivId`] parses
//! either form into one canonical value, so the rest of the pipeline never
//! has to care which encoding an input arrived in.
//!
//! # Examples
//!
//! ```
//! use harvester::identifier::ArxivId;
//!
//! let dotted: ArxivId = "1706.03762".parse().unwrap();
//! let dashed: ArxivId = "1706-03762".parse().unwrap();
//! assert_eq!(dotted, dashed);
//!
//! assert_eq!(dotted.dot(), "1706.03762");
//! assert_eq!(dotted.dashed(), "1706-03762");
//! assert_eq!(dotted.versioned(3), "1706.03762v3");
//! ```

use super::*;

lazy_static! {
  /// New-style identifier, dot or dash separated: `YYMM[.-]NNNNN`.
  static ref ARXIV_ID: Regex = Regex::new(r"^(\d{4})[.-](\d{4,5})$").unwrap();
}

/// A normalized arXiv paper identifier.
///
/// Stores the year-month prefix and the sequence number separately so both
/// surface encodings can be produced without re-parsing. Construction goes
/// through [`FromStr`], which accepts either encoding; [`Display`] renders
/// the canonical dot form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArxivId {
  /// Year-month prefix, e.g. `1706`
  prefix: String,
  /// Sequence number within the month, e.g. `03762`
  number: String,
}

impl ArxivId {
  /// The dot-separated form used by the arXiv API, abstract page, and
  /// e-print endpoints, e.g. `1706.03762`.
  pub fn dot(&self) -> String { format!("{}.{}", self.prefix, self.number) }

  /// The dash-separated, filesystem-safe form used for directory names and
  /// reference keys, e.g. `1706-03762`.
  pub fn dashed(&self) -> String { format!("{}-{}", self.prefix, self.number) }

  /// The versioned identifier used to address one revision on the e-print
  /// endpoint, e.g. `1706.03762v3`.
  pub fn versioned(&self, version: u32) -> String { format!("{}v{version}", self.dot()) }
}

impl FromStr for ArxivId {
  type Err = HarvesterError;

  fn from_str(s: &str) -> Result<Self> {
    let captures = ARXIV_ID.captures(s.trim()).ok_or(HarvesterError::InvalidIdentifier)?;
    Ok(Self { prefix: captures[1].to_string(), number: captures[2].to_string() })
  }
}

impl Display for ArxivId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.dot()) }
}

impl TryFrom<String> for ArxivId {
  type Error = HarvesterError;

  fn try_from(value: String) -> Result<Self> { value.parse() }
}

impl From<ArxivId> for String {
  fn from(id: ArxivId) -> Self { id.dot() }
}
