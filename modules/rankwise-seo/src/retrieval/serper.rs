// Live search results (Serper / Google Search) as a retriever.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use super::{RetrievedDocument, Retriever};

const SERPER_URL: &str = "https://google.serper.dev/search";

#[derive(Debug, serde::Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SerperResult>,
}

#[derive(Debug, serde::Deserialize)]
struct SerperResult {
    #[serde(default)]
    link: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
}

pub struct SerperRetriever {
    api_key: Option<String>,
    max_results: usize,
    client: reqwest::Client,
}

impl SerperRetriever {
    /// Without a key every query returns no results.
    pub fn new(api_key: Option<String>, max_results: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            api_key,
            max_results,
            client,
        })
    }
}

#[async_trait]
impl Retriever for SerperRetriever {
    async fn relevant_documents(&self, query: &str) -> Result<Vec<RetrievedDocument>> {
        let Some(api_key) = &self.api_key else {
            warn!(query, "Search API key not configured; returning empty results");
            return Ok(Vec::new());
        };
        info!(query, max_results = self.max_results, "search: querying serper");

        let resp = self
            .client
            .post(SERPER_URL)
            .header("X-API-KEY", api_key)
            .json(&json!({ "q": query, "num": self.max_results }))
            .send()
            .await
            .context("Serper API request failed")?;

        let status = resp.status();
        let body = resp.text().await.context("Failed to read Serper response")?;
        let documents = parse_response(status, &body)?;

        info!(query, count = documents.len(), "search: complete");
        Ok(documents)
    }
}

/// Error statuses fail even when the body happens to be JSON.
fn parse_response(status: reqwest::StatusCode, body: &str) -> Result<Vec<RetrievedDocument>> {
    if !status.is_success() {
        bail!("Serper search failed ({status}): {body}");
    }
    let data: SerperResponse = serde_json::from_str(body).context("Failed to parse Serper response")?;
    Ok(data
        .organic
        .into_iter()
        .enumerate()
        .map(|(i, r)| into_document(i + 1, r))
        .collect())
}

fn into_document(rank: usize, result: SerperResult) -> RetrievedDocument {
    let mut metadata = Map::new();
    metadata.insert("source".into(), Value::from("serp"));
    metadata.insert("rank".into(), Value::from(rank));
    metadata.insert("url".into(), Value::from(result.link));
    metadata.insert("title".into(), Value::from(result.title));
    RetrievedDocument {
        content: result.snippet,
        metadata,
        score: None,
    }
}
