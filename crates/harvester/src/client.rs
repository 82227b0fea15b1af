//! Client for the arXiv archive source.
//!
//! Two endpoints are involved in discovering what to download:
//!
//! - The Atom API (`export.arxiv.org/api/query`) answers one query per paper
//!   with title, authors, abstract, publication date, and — through the
//!   trailing `vN` on the entry id — the latest version number.
//! - The abstract page (`arxiv.org/abs/{id}`) carries a submission-history
//!   block whose date tokens give the publication date of every version.
//!
//! Both lookups degrade to an absent result on network or parse failure
//! rather than raising a terminating error; the caller assumes a single
//! version when discovery comes up empty.
//!
//! # Examples
//!
//! ```no_run
//! use harvester::{client::ArxivClient, prelude::*};
//!
//! # async fn example() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let client = ArxivClient::new(std::time::Duration::from_secs(60))?;
//! let id: ArxivId = "1706.03762".parse()?;
//!
//! if let Some(summary) = client.fetch_summary(&id).await {
//!   println!("{} ({} versions)", summary.title, summary.latest_version);
//! }
//! # Ok(())
//! # }
//! ```

use quick_xml::de::from_str;
use scraper::{Html, Selector};

use super::*;

/// Query endpoint of the arXiv Atom API.
const ATOM_ENDPOINT: &str = "http://export.arxiv.org/api/query";
/// Abstract page base, scraped for the submission history.
const ABS_ENDPOINT: &str = "https://arxiv.org/abs";

lazy_static! {
  /// Trailing version marker on an Atom entry id, e.g. `...1706.03762v7`.
  static ref VERSION_SUFFIX: Regex = Regex::new(r"v(\d+)$").unwrap();
  /// Submission-history date token, e.g. `Mon, 12 Jun 2017 17:57:34 UTC`.
  static ref HISTORY_DATE: Regex = Regex::new(
    r"[A-Z][a-z]{2},\s+(\d{1,2})\s+([A-Z][a-z]{2})\s+(\d{4})\s+\d{2}:\d{2}:\d{2}\s+UTC"
  )
  .unwrap();
}

/// Internal representation of the arXiv API's Atom feed response.
#[derive(Debug, Deserialize)]
struct Feed {
  /// A `Feed` may contain multiple entries; a lookup by id yields at most one
  #[serde(rename = "entry", default)]
  entries: Vec<Entry>,
}

/// Internal representation of a paper entry from arXiv's API response.
#[derive(Debug, Deserialize)]
struct Entry {
  /// arXiv URL including the latest version, e.g.
  /// `http://arxiv.org/abs/1706.03762v7`
  #[serde(rename = "id")]
  entry_id:  String,
  /// Paper title (may contain LaTeX markup)
  title:     String,
  /// Paper abstract (may contain LaTeX markup)
  summary:   String,
  /// Publication date of the first version
  published: DateTime<Utc>,
  /// List of paper authors
  #[serde(rename = "author", default)]
  authors:   Vec<EntryAuthor>,
}

/// Internal representation of an author from arXiv's API response.
#[derive(Debug, Deserialize)]
struct EntryAuthor {
  /// Author's full name
  name: String,
}

/// What one Atom lookup yields: the bibliographic basics plus the latest
/// version number, fetched once per paper and reused by both the metadata
/// collector and the downloader.
#[derive(Debug, Clone)]
pub struct PaperSummary {
  /// Paper title
  pub title:          String,
  /// Author names in listing order
  pub authors:        Vec<String>,
  /// Abstract text
  pub abstract_text:  String,
  /// Publication date of the first version
  pub published:      DateTime<Utc>,
  /// Highest known version number (1 when the entry id carries no marker)
  pub latest_version: u32,
}

/// Client for the arXiv Atom API and abstract pages.
pub struct ArxivClient {
  /// Internal web client reused for all requests.
  client: reqwest::Client,
}

impl ArxivClient {
  /// Creates a client with the given fixed request timeout.
  pub fn new(timeout: Duration) -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
      .build()?;
    Ok(Self { client })
  }

  /// Fetches the Atom entry for a paper.
  ///
  /// Returns `None` when the paper is unknown, the request fails, or the
  /// response cannot be parsed — all three are logged and treated alike, per
  /// the "absent means assume one version" policy.
  pub async fn fetch_summary(&self, id: &ArxivId) -> Option<PaperSummary> {
    let url = format!("{ATOM_ENDPOINT}?id_list={}&max_results=1", id.dot());
    debug!("Fetching from arXiv via: {url}");

    let response = match self.client.get(&url).send().await.and_then(|r| r.error_for_status()) {
      Ok(response) => response,
      Err(e) => {
        warn!("arXiv API request for {id} failed: {e}");
        return None;
      },
    };
    let body = match response.text().await {
      Ok(body) => body,
      Err(e) => {
        warn!("Reading arXiv API response for {id} failed: {e}");
        return None;
      },
    };

    trace!("arXiv response: {body}");

    let feed: Feed = match from_str(&body) {
      Ok(feed) => feed,
      Err(e) => {
        warn!("Failed to parse arXiv feed for {id}: {e}");
        return None;
      },
    };
    let entry = feed.entries.into_iter().next()?;

    Some(PaperSummary {
      latest_version: parse_latest_version(&entry.entry_id),
      title:          entry.title.trim().to_string(),
      authors:        entry.authors.into_iter().map(|a| a.name).collect(),
      abstract_text:  entry.summary.trim().to_string(),
      published:      entry.published,
    })
  }

  /// Fetches the publication date of every version by scraping the abstract
  /// page's submission-history block.
  ///
  /// Returns an empty list on any failure; the dates are enrichment, not a
  /// prerequisite for downloading.
  pub async fn version_dates(&self, id: &ArxivId) -> Vec<NaiveDate> {
    let url = format!("{ABS_ENDPOINT}/{}", id.dot());
    debug!("Fetching submission history via: {url}");

    let body = match self.client.get(&url).send().await.and_then(|r| r.error_for_status()) {
      Ok(response) => match response.text().await {
        Ok(body) => body,
        Err(e) => {
          warn!("Reading abstract page for {id} failed: {e}");
          return Vec::new();
        },
      },
      Err(e) => {
        warn!("Abstract page request for {id} failed: {e}");
        return Vec::new();
      },
    };

    parse_submission_dates(&body)
  }
}

/// Extracts the trailing version number from an Atom entry id, defaulting to
/// 1 when no marker is present.
fn parse_latest_version(entry_id: &str) -> u32 {
  VERSION_SUFFIX
    .captures(entry_id)
    .and_then(|cap| cap.get(1))
    .and_then(|m| m.as_str().parse().ok())
    .unwrap_or(1)
}

/// Pulls the per-version date tokens out of an abstract page.
///
/// The submission history renders one `Day, DD Mon YYYY hh:mm:ss UTC` token
/// per version, in version order.
fn parse_submission_dates(html: &str) -> Vec<NaiveDate> {
  let document = Html::parse_document(html);
  let selector = match Selector::parse("div.submission-history") {
    Ok(selector) => selector,
    Err(_) => return Vec::new(),
  };

  let Some(history) = document.select(&selector).next() else {
    return Vec::new();
  };
  let text: String = history.text().collect();

  HISTORY_DATE
    .captures_iter(&text)
    .filter_map(|cap| {
      let token = format!("{:02} {} {}", cap[1].parse::<u32>().ok()?, &cap[2], &cap[3]);
      NaiveDate::parse_from_str(&token, "%d %b %Y").ok()
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  /// Trimmed-down copy of a real Atom response for `1706.03762`.
  const FEED_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>http://arxiv.org/abs/1706.03762v7</id>
    <published>2017-06-12T17:57:34Z</published>
    <title>Attention Is All You Need</title>
    <summary>  The dominant sequence transduction models are based on complex
recurrent or convolutional neural networks.
</summary>
    <author><name>Ashish Vaswani</name></author>
    <author><name>Noam Shazeer</name></author>
  </entry>
</feed>"#;

  #[test]
  fn feed_parses_into_summary_fields() {
    let feed: Feed = from_str(FEED_XML).unwrap();
    let entry = &feed.entries[0];
    assert_eq!(entry.title, "Attention Is All You Need");
    assert_eq!(entry.authors.len(), 2);
    assert_eq!(parse_latest_version(&entry.entry_id), 7);
  }

  #[test]
  fn empty_feed_parses_to_no_entries() {
    let feed: Feed =
      from_str(r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>query</title></feed>"#).unwrap();
    assert!(feed.entries.is_empty());
  }

  #[test]
  fn entry_id_without_version_marker_defaults_to_one() {
    assert_eq!(parse_latest_version("http://arxiv.org/abs/1706.03762"), 1);
  }

  #[test]
  fn submission_history_dates_are_extracted_in_order() {
    let html = r#"<html><body>
      <div class="submission-history">
        <b>[v1]</b> Mon, 12 Jun 2017 17:57:34 UTC (1,000 KB)<br/>
        <b>[v2]</b> Mon, 19 Jun 2017 16:49:45 UTC (1,100 KB)<br/>
        <b>[v3]</b> Tue, 5 Dec 2017 22:05:48 UTC (1,200 KB)
      </div>
    </body></html>"#;

    let dates = parse_submission_dates(html);
    assert_eq!(dates, vec![
      NaiveDate::from_ymd_opt(2017, 6, 12).unwrap(),
      NaiveDate::from_ymd_opt(2017, 6, 19).unwrap(),
      NaiveDate::from_ymd_opt(2017, 12, 5).unwrap(),
    ]);
  }

  #[test]
  fn pages_without_history_yield_no_dates() {
    assert!(parse_submission_dates("<html><body><p>no history here</p></body></html>").is_empty());
  }

  // Hits the live API; run with `cargo test -- --ignored` when online.
  #[ignore]
  #[tracing_test::traced_test]
  #[tokio::test]
  async fn live_summary_fetch() {
    let client = ArxivClient::new(Duration::from_secs(60)).unwrap();
    let id: ArxivId = "1706.03762".parse().unwrap();
    let summary = client.fetch_summary(&id).await.unwrap();
    assert!(summary.title.contains("Attention"));
    assert!(summary.latest_version >= 5);
  }
}
