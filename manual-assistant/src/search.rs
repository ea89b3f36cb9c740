//! Document search against the Azure AI Search index of vehicle manuals.
//!
//! The search tool never fails from the assistant's point of view: provider
//! errors are rendered into the tool output text so the assistant can relay
//! them to the user.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::SearchConfig;
use crate::error::{SearchError, ServiceError, ServiceResult, format_error_chain};
use crate::i18n::I18n;

/// Content excerpts longer than this many characters are cut and suffixed with `...`
pub const MAX_EXCERPT_CHARS: usize = 150;

/// Document search as seen by the tool executor
#[async_trait]
pub trait DocumentSearch: Send + Sync {
    /// Search for `query` about vehicle `model` from `year` and return a
    /// plain-text summary suitable as a tool output.
    async fn search(&self, model: &str, year: &str, query: &str) -> String;
}

/// One normalized search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    #[serde(rename = "url_manual")]
    pub url: String,
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
}

/// Semantic query payload for the `docs/search` endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    search: String,
    query_type: &'static str,
    semantic_configuration: &'a str,
    captions: &'static str,
    top: usize,
    answers: String,
    query_language: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    value: Vec<SearchDocument>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchDocument {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default, deserialize_with = "lenient_page")]
    page: Option<String>,
}

/// Indexes store the page either as a number or as a string
fn lenient_page<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

impl From<SearchDocument> for SearchResult {
    fn from(doc: SearchDocument) -> Self {
        Self {
            url: doc.url,
            title: doc.title,
            content: truncate_content(&doc.content),
            page: doc.page,
        }
    }
}

/// Search client for the manuals index
pub struct SearchService {
    client: Client,
    config: SearchConfig,
    i18n: Arc<I18n>,
}

impl SearchService {
    pub fn new(config: SearchConfig, i18n: Arc<I18n>) -> ServiceResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ServiceError::Internal {
                message: format!("Failed to build search HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            config,
            i18n,
        })
    }

    /// Query the provider and normalize the top hits
    pub async fn fetch(
        &self,
        model: &str,
        year: &str,
        query: &str,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let url = &self.config.endpoint;
        let request = SearchRequest {
            search: format!("{} {} {}", query, model, year),
            query_type: "semantic",
            semantic_configuration: &self.config.semantic_configuration,
            captions: "extractive",
            top: self.config.top_k,
            answers: format!("extractive|count-{}", self.config.answers_count),
            query_language: &self.config.query_language,
        };

        debug!(query = %request.search, top = request.top, "Sending document search");

        let response = self
            .client
            .post(url)
            .header("api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| SearchError::Connection {
                url: url.clone(),
                source: e,
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(SearchError::Api { status, message });
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::InvalidResponse { source: e })?;

        Ok(select_top(body.value, self.config.top_k))
    }

    fn spawn_snapshot(&self, results: &[SearchResult]) {
        let Some(path) = self.config.snapshot_path.clone() else {
            return;
        };
        let results = results.to_vec();
        tokio::spawn(async move {
            if let Err(e) = write_snapshot(&path, &results).await {
                metrics::counter!("search_snapshot_failures_total").increment(1);
                warn!(path = %path.display(), error = %e, "Failed to write search snapshot");
            }
        });
    }
}

#[async_trait]
impl DocumentSearch for SearchService {
    async fn search(&self, model: &str, year: &str, query: &str) -> String {
        match self.fetch(model, year, query).await {
            Ok(results) => {
                metrics::counter!("search_requests_total", "outcome" => "ok").increment(1);
                info!(
                    model = %model,
                    year = %year,
                    results = results.len(),
                    "Document search completed"
                );
                self.spawn_snapshot(&results);
                format_results(&results, &self.i18n)
            }
            Err(e) => {
                metrics::counter!("search_requests_total", "outcome" => "error").increment(1);
                let error = format_error_chain(&e);
                warn!(error = %error, "Document search failed");
                self.i18n.text_with("search-error", &[("error", error.as_str())])
            }
        }
    }
}

/// Keep the first `top_k` provider documents, in provider order
fn select_top(documents: Vec<SearchDocument>, top_k: usize) -> Vec<SearchResult> {
    documents
        .into_iter()
        .take(top_k)
        .map(SearchResult::from)
        .collect()
}

/// Cap an excerpt at [`MAX_EXCERPT_CHARS`] characters
pub fn truncate_content(content: &str) -> String {
    match content.char_indices().nth(MAX_EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

/// Render results as the plain-text summary handed back to the assistant
pub fn format_results(results: &[SearchResult], i18n: &I18n) -> String {
    if results.is_empty() {
        return i18n.text("search-no-results");
    }

    let mut output = i18n.text("search-intro");
    output.push('\n');

    for result in results {
        output.push('\n');
        for line in [
            i18n.text_with("search-result-title", &[("title", result.title.as_str())]),
            i18n.text_with("search-result-url", &[("url", result.url.as_str())]),
            i18n.text_with(
                "search-result-description",
                &[("description", result.content.as_str())],
            ),
        ] {
            output.push_str(&line);
            output.push('\n');
        }
        if let Some(page) = &result.page {
            output.push_str(&i18n.text_with("search-result-page", &[("page", page.as_str())]));
            output.push('\n');
        }
    }

    output
}

/// Replace `path` with the results as pretty-printed JSON.
///
/// The JSON is written to a uniquely named sibling file that is then renamed
/// over `path`; readers only ever see a complete snapshot.
pub async fn write_snapshot(path: &Path, results: &[SearchResult]) -> std::io::Result<()> {
    let json = serde_json::to_vec_pretty(results)?;
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || replace_file(&path, &json))
        .await
        .map_err(std::io::Error::other)?
}

fn replace_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    // Dropping the temp file on an early return removes it
    let mut tmp = tempfile::Builder::new()
        .prefix(".snapshot-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(contents)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
