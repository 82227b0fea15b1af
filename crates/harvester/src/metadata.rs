//! Bibliographic metadata collection and JSON document output.
//!
//! For each paper the pipeline writes two documents next to the source tree:
//! `metadata.json` (title, authors, abstract, venue, submission dates) and
//! `references.json` (the cited papers that themselves live on arXiv). The
//! bibliographic fields come from the arXiv Atom lookup; the venue and the
//! reference list come from a single Semantic Scholar graph API call.
//!
//! The Semantic Scholar call is strictly best-effort: a non-success status,
//! an unreachable host, or a payload of an unexpected shape all produce the
//! `None` sentinel, and the caller writes an empty reference list. Nothing in
//! this module can fail a paper that downloaded successfully — except the
//! final filesystem write itself.

use super::*;
use crate::client::PaperSummary;

/// Graph API paper endpoint, addressed as `arXiv:{id}`.
const GRAPH_ENDPOINT: &str = "https://api.semanticscholar.org/graph/v1/paper";
/// Field selection for the single metadata/reference query.
const GRAPH_FIELDS: &str = "venue,journal,publicationVenue,references.externalIds,\
                            references.title,references.authors,references.publicationDate,\
                            references.paperId";

/// Bibliographic fields written to `metadata.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperMetadata {
  /// The paper's full title
  pub paper_title:       String,
  /// Author names in listing order
  pub authors:           Vec<String>,
  /// Full abstract text
  #[serde(rename = "abstract")]
  pub abstract_text:     String,
  /// Venue name, empty when neither source knows one
  pub publication_venue: String,
  /// Date of the first version, when known
  pub submission_date:   Option<NaiveDate>,
  /// Publication date of each version, in version order
  pub revised_dates:     Vec<NaiveDate>,
}

/// One cited paper, kept only when it carries an arXiv identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
  /// Dashed identifier of the cited paper
  pub arxiv_id:            String,
  /// Title of the cited paper
  pub paper_title:         String,
  /// Author names of the cited paper
  pub authors:             Vec<String>,
  /// Publication date as reported by Semantic Scholar
  pub submission_date:     Option<String>,
  /// Semantic Scholar's own paper id
  pub semantic_scholar_id: Option<String>,
}

/// What one graph API call yields.
#[derive(Debug, Clone, Default)]
pub struct ScholarRecord {
  /// Venue name after the fallback chain, possibly empty
  pub publication_venue: String,
  /// Cited papers that live on arXiv, in API order
  pub references:        Vec<Reference>,
}

/// Raw graph API response shape; only the queried fields.
#[derive(Debug, Deserialize)]
struct GraphResponse {
  /// Legacy venue string
  venue:             Option<String>,
  /// Journal sub-record
  journal:           Option<GraphJournal>,
  /// Structured venue sub-record, preferred when present
  #[serde(rename = "publicationVenue")]
  publication_venue: Option<GraphVenue>,
  /// Reference list; absent when the service has none
  #[serde(default)]
  references:        Vec<GraphReference>,
}

/// Journal sub-record of the graph response.
#[derive(Debug, Deserialize)]
struct GraphJournal {
  /// Journal name
  name: Option<String>,
}

/// Structured venue sub-record of the graph response.
#[derive(Debug, Deserialize)]
struct GraphVenue {
  /// Venue name
  name: Option<String>,
}

/// One reference entry of the graph response.
#[derive(Debug, Deserialize)]
struct GraphReference {
  /// External identifier map; only the arXiv key is used
  #[serde(rename = "externalIds")]
  external_ids:     Option<GraphExternalIds>,
  /// Title of the cited paper
  title:            Option<String>,
  /// Authors of the cited paper
  #[serde(default)]
  authors:          Vec<GraphAuthor>,
  /// Publication date string
  #[serde(rename = "publicationDate")]
  publication_date: Option<String>,
  /// Semantic Scholar paper id
  #[serde(rename = "paperId")]
  paper_id:         Option<String>,
}

/// External identifier map of a reference.
#[derive(Debug, Deserialize)]
struct GraphExternalIds {
  /// arXiv identifier in dot form, when the cited paper is on arXiv
  #[serde(rename = "ArXiv")]
  arxiv: Option<String>,
}

/// Author record of a reference.
#[derive(Debug, Deserialize)]
struct GraphAuthor {
  /// Author name
  name: Option<String>,
}

/// Client for the Semantic Scholar graph API.
pub struct SemanticScholar {
  /// Internal web client reused for all requests.
  client:  reqwest::Client,
  /// Optional API key for higher rate limits.
  api_key: Option<String>,
}

impl SemanticScholar {
  /// Creates a client with the given fixed request timeout and optional key.
  pub fn new(timeout: Duration, api_key: Option<String>) -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
      .build()?;
    Ok(Self { client, api_key })
  }

  /// Queries venue and references for a paper in one call.
  ///
  /// Every failure mode — transport, non-success status, malformed payload —
  /// is logged and collapsed into `None`; the caller records zero references
  /// and proceeds.
  pub async fn fetch(&self, id: &ArxivId) -> Option<ScholarRecord> {
    let url = format!("{GRAPH_ENDPOINT}/arXiv:{}", id.dot());
    debug!("Fetching from Semantic Scholar via: {url}");

    let mut request = self.client.get(&url).query(&[("fields", GRAPH_FIELDS)]);
    if let Some(key) = &self.api_key {
      request = request.header("x-api-key", key);
    }

    let response = match request.send().await {
      Ok(response) => response,
      Err(e) => {
        warn!("Semantic Scholar request for {id} failed: {e}");
        return None;
      },
    };
    if !response.status().is_success() {
      warn!("Semantic Scholar returned {} for {id}", response.status());
      return None;
    }

    let payload: GraphResponse = match response.json().await {
      Ok(payload) => payload,
      Err(e) => {
        warn!("Unexpected Semantic Scholar payload for {id}: {e}");
        return None;
      },
    };

    Some(ScholarRecord {
      publication_venue: resolve_venue(&payload),
      references:        payload.references.into_iter().filter_map(convert_reference).collect(),
    })
  }
}

/// Venue fallback chain: structured venue, then the legacy string, then the
/// journal name.
fn resolve_venue(payload: &GraphResponse) -> String {
  payload
    .publication_venue
    .as_ref()
    .and_then(|v| v.name.clone())
    .filter(|name| !name.is_empty())
    .or_else(|| payload.venue.clone().filter(|name| !name.is_empty()))
    .or_else(|| payload.journal.as_ref().and_then(|j| j.name.clone()))
    .unwrap_or_default()
}

/// Keeps a reference only when it carries an arXiv identifier.
fn convert_reference(reference: GraphReference) -> Option<Reference> {
  let arxiv: ArxivId = reference.external_ids?.arxiv?.parse().ok()?;
  Some(Reference {
    arxiv_id:            arxiv.dashed(),
    paper_title:         reference.title.unwrap_or_default().trim().to_string(),
    authors:             reference.authors.into_iter().filter_map(|a| a.name).collect(),
    submission_date:     reference.publication_date,
    semantic_scholar_id: reference.paper_id,
  })
}

/// Assembles the two documents from whatever the sources yielded.
///
/// The Atom summary provides title/authors/abstract; the scholar record
/// provides venue and references; the scraped history provides the version
/// dates, with the Atom publication date as the submission-date fallback.
pub fn build_documents(
  summary: Option<&PaperSummary>,
  scholar: Option<ScholarRecord>,
  revised_dates: &[NaiveDate],
) -> (PaperMetadata, Vec<Reference>) {
  let scholar = scholar.unwrap_or_default();
  let submission_date =
    revised_dates.first().copied().or_else(|| summary.map(|s| s.published.date_naive()));

  let metadata = PaperMetadata {
    paper_title: summary.map(|s| s.title.clone()).unwrap_or_default(),
    authors: summary.map(|s| s.authors.clone()).unwrap_or_default(),
    abstract_text: summary.map(|s| s.abstract_text.clone()).unwrap_or_default(),
    publication_venue: scholar.publication_venue,
    submission_date,
    revised_dates: revised_dates.to_vec(),
  };
  (metadata, scholar.references)
}

/// Writes `metadata.json` and `references.json` into `paper_dir`.
///
/// Both documents are two-space indented and fully rewritten on every call,
/// so re-running a paper replaces earlier content instead of appending.
pub fn write_documents(
  paper_dir: &Path,
  metadata: &PaperMetadata,
  references: &[Reference],
) -> Result<()> {
  std::fs::create_dir_all(paper_dir)?;

  let metadata_path = paper_dir.join("metadata.json");
  std::fs::write(&metadata_path, serde_json::to_string_pretty(metadata)? + "\n")?;
  debug!("Wrote {}", metadata_path.display());

  let references_path = paper_dir.join("references.json");
  std::fs::write(&references_path, serde_json::to_string_pretty(&references)? + "\n")?;
  debug!("Wrote {}", references_path.display());

  Ok(())
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  /// Payload shaped like a real graph API response.
  const GRAPH_JSON: &str = r#"{
    "paperId": "204e3073870fae3d05bcbc2f6a8e263d9b72e776",
    "venue": "Neural Information Processing Systems",
    "journal": {"name": "ArXiv", "volume": "abs/1706.03762"},
    "publicationVenue": {"name": "Neural Information Processing Systems"},
    "references": [
      {
        "paperId": "abc123",
        "externalIds": {"ArXiv": "1607.06450", "DBLP": "journals/corr/BaKH16"},
        "title": "Layer Normalization",
        "authors": [{"authorId": "1", "name": "Jimmy Ba"}, {"authorId": "2", "name": "J. Kiros"}],
        "publicationDate": "2016-07-21"
      },
      {
        "paperId": "def456",
        "externalIds": {"DOI": "10.1162/neco.1997.9.8.1735"},
        "title": "Long Short-Term Memory",
        "authors": [{"authorId": "3", "name": "S. Hochreiter"}]
      }
    ]
  }"#;

  #[test]
  fn only_arxiv_references_survive_conversion() {
    let payload: GraphResponse = serde_json::from_str(GRAPH_JSON).unwrap();
    let references: Vec<Reference> =
      payload.references.into_iter().filter_map(convert_reference).collect();

    assert_eq!(references.len(), 1);
    assert_eq!(references[0].arxiv_id, "1607-06450");
    assert_eq!(references[0].paper_title, "Layer Normalization");
    assert_eq!(references[0].authors, ["Jimmy Ba", "J. Kiros"]);
  }

  #[test]
  fn missing_references_field_yields_empty_list() {
    let payload: GraphResponse = serde_json::from_str(r#"{"venue": "NeurIPS"}"#).unwrap();
    assert!(payload.references.is_empty());
  }

  #[test]
  fn venue_falls_back_from_structured_to_legacy_to_journal() {
    let structured: GraphResponse = serde_json::from_str(GRAPH_JSON).unwrap();
    assert_eq!(resolve_venue(&structured), "Neural Information Processing Systems");

    let legacy: GraphResponse = serde_json::from_str(r#"{"venue": "ICLR"}"#).unwrap();
    assert_eq!(resolve_venue(&legacy), "ICLR");

    let journal_only: GraphResponse =
      serde_json::from_str(r#"{"journal": {"name": "Nature"}}"#).unwrap();
    assert_eq!(resolve_venue(&journal_only), "Nature");

    let nothing: GraphResponse = serde_json::from_str("{}").unwrap();
    assert_eq!(resolve_venue(&nothing), "");
  }

  #[test]
  fn documents_survive_a_missing_scholar_record() {
    let summary = PaperSummary {
      title:          "Attention Is All You Need".to_string(),
      authors:        vec!["Ashish Vaswani".to_string()],
      abstract_text:  "The dominant sequence transduction models...".to_string(),
      published:      Utc.with_ymd_and_hms(2017, 6, 12, 17, 57, 34).unwrap(),
      latest_version: 7,
    };

    let (metadata, references) = build_documents(Some(&summary), None, &[]);
    assert_eq!(metadata.paper_title, "Attention Is All You Need");
    assert_eq!(metadata.publication_venue, "");
    assert_eq!(metadata.submission_date, NaiveDate::from_ymd_opt(2017, 6, 12));
    assert!(references.is_empty());
  }

  #[test]
  fn first_revised_date_wins_over_atom_published() {
    let summary = PaperSummary {
      title:          "t".to_string(),
      authors:        vec![],
      abstract_text:  String::new(),
      published:      Utc.with_ymd_and_hms(2017, 6, 12, 0, 0, 0).unwrap(),
      latest_version: 2,
    };
    let dates =
      [NaiveDate::from_ymd_opt(2017, 6, 10).unwrap(), NaiveDate::from_ymd_opt(2017, 6, 19).unwrap()];

    let (metadata, _) = build_documents(Some(&summary), None, &dates);
    assert_eq!(metadata.submission_date, NaiveDate::from_ymd_opt(2017, 6, 10));
    assert_eq!(metadata.revised_dates.len(), 2);
  }

  #[test]
  fn rerunning_overwrites_documents_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let (metadata, _) = build_documents(None, None, &[]);

    let many = vec![Reference {
      arxiv_id:            "1607-06450".to_string(),
      paper_title:         "Layer Normalization".to_string(),
      authors:             vec![],
      submission_date:     None,
      semantic_scholar_id: None,
    }];
    write_documents(dir.path(), &metadata, &many).unwrap();
    write_documents(dir.path(), &metadata, &[]).unwrap();

    let content = std::fs::read_to_string(dir.path().join("references.json")).unwrap();
    let parsed: Vec<Reference> = serde_json::from_str(&content).unwrap();
    assert!(parsed.is_empty(), "second write must replace, not append");
  }

  #[test]
  fn documents_are_two_space_indented() {
    let dir = tempfile::tempdir().unwrap();
    let (metadata, references) = build_documents(None, None, &[]);
    write_documents(dir.path(), &metadata, &references).unwrap();

    let content = std::fs::read_to_string(dir.path().join("metadata.json")).unwrap();
    assert!(content.starts_with("{\n  \""));
  }
}
