// Qdrant vector store over its REST API.
// Collections are created on first write with cosine distance, sized to the
// embedding model's output.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ai_client::EmbedAgent;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use rankwise_common::DocumentPayload;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use super::{RetrievalStore, RetrievedDocument, Retriever};

const CONTENT_KEY: &str = "page_content";
const METADATA_KEY: &str = "metadata";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<ScoredPoint>,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    score: f32,
    #[serde(default)]
    payload: Map<String, Value>,
}

impl From<ScoredPoint> for RetrievedDocument {
    fn from(point: ScoredPoint) -> Self {
        let mut payload = point.payload;
        let content = match payload.remove(CONTENT_KEY) {
            Some(Value::String(s)) => s,
            _ => String::new(),
        };
        let metadata = match payload.remove(METADATA_KEY) {
            Some(Value::Object(m)) => m,
            _ => Map::new(),
        };
        Self {
            content,
            metadata,
            score: Some(point.score),
        }
    }
}

#[derive(Clone)]
pub struct QdrantStore {
    base_url: String,
    api_key: Option<String>,
    embedder: Arc<dyn EmbedAgent>,
    client: reqwest::Client,
    known_collections: Arc<Mutex<HashSet<String>>>,
}

impl QdrantStore {
    pub fn new(base_url: &str, api_key: Option<String>, embedder: Arc<dyn EmbedAgent>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;
        info!(url = base_url, "Initialized Qdrant client");
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            embedder,
            client,
            known_collections: Arc::new(Mutex::new(HashSet::new())),
        })
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/collections/{}", self.base_url, collection)
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    fn is_known(&self, collection: &str) -> bool {
        self.known_collections
            .lock()
            .map(|set| set.contains(collection))
            .unwrap_or(false)
    }

    fn mark_known(&self, collection: &str) {
        if let Ok(mut set) = self.known_collections.lock() {
            set.insert(collection.to_string());
        }
    }

    async fn ensure_collection(&self, collection: &str, dimensions: usize) -> Result<()> {
        if self.is_known(collection) {
            return Ok(());
        }

        let url = self.collection_url(collection);
        let resp = self
            .request(reqwest::Method::GET, &url)
            .send()
            .await
            .context("Qdrant collection lookup failed")?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            info!(collection, dimensions, "Creating Qdrant collection");
            let resp = self
                .request(reqwest::Method::PUT, &url)
                .json(&json!({ "vectors": { "size": dimensions, "distance": "Cosine" } }))
                .send()
                .await
                .context("Qdrant collection create failed")?;
            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                bail!("Qdrant refused to create {collection} ({status}): {body}");
            }
        } else if !resp.status().is_success() {
            bail!("Qdrant collection lookup for {collection} returned {}", resp.status());
        }

        self.mark_known(collection);
        Ok(())
    }

    async fn search(&self, collection: &str, query: &str, top_k: usize) -> Result<Vec<RetrievedDocument>> {
        let vector = self.embedder.embed(query).await.context("Failed to embed query")?;
        let resp = self
            .request(reqwest::Method::POST, &format!("{}/points/search", self.collection_url(collection)))
            .json(&json!({ "vector": vector, "limit": top_k, "with_payload": true }))
            .send()
            .await
            .context("Qdrant search request failed")?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            debug!(collection, "Collection does not exist yet; no results");
            return Ok(Vec::new());
        }
        if !resp.status().is_success() {
            bail!("Qdrant search on {collection} returned {}", resp.status());
        }

        let data: SearchResponse = resp.json().await.context("Failed to parse Qdrant search response")?;
        Ok(data.result.into_iter().map(RetrievedDocument::from).collect())
    }
}

#[async_trait]
impl RetrievalStore for QdrantStore {
    async fn add_documents(&self, collection: &str, documents: &[DocumentPayload]) -> Result<Vec<String>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }
        debug!(collection, count = documents.len(), "Adding documents");

        let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
        let vectors = self
            .embedder
            .embed_batch(&texts)
            .await
            .context("Failed to embed documents")?;
        let dimensions = vectors.first().map(Vec::len).unwrap_or_default();
        self.ensure_collection(collection, dimensions).await?;

        let ids: Vec<String> = documents.iter().map(|_| Uuid::new_v4().to_string()).collect();
        let points: Vec<Value> = documents
            .iter()
            .zip(vectors)
            .zip(&ids)
            .map(|((doc, vector), id)| {
                json!({
                    "id": id,
                    "vector": vector,
                    "payload": { CONTENT_KEY: doc.content, METADATA_KEY: doc.metadata },
                })
            })
            .collect();

        let resp = self
            .request(
                reqwest::Method::PUT,
                &format!("{}/points?wait=true", self.collection_url(collection)),
            )
            .json(&json!({ "points": points }))
            .send()
            .await
            .context("Qdrant upsert request failed")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("Qdrant upsert into {collection} failed ({status}): {body}");
        }

        info!(collection, count = ids.len(), "Added documents");
        Ok(ids)
    }

    fn retriever(&self, collection: &str, top_k: usize) -> Arc<dyn Retriever> {
        Arc::new(QdrantRetriever {
            store: self.clone(),
            collection: collection.to_string(),
            top_k,
        })
    }
}

struct QdrantRetriever {
    store: QdrantStore,
    collection: String,
    top_k: usize,
}

#[async_trait]
impl Retriever for QdrantRetriever {
    async fn relevant_documents(&self, query: &str) -> Result<Vec<RetrievedDocument>> {
        self.store.search(&self.collection, query, self.top_k).await
    }
}
