//! Retrieval collaborators: a document store that indexes into named
//! collections, and retrievers that answer similarity queries.

mod qdrant;
mod serper;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use rankwise_common::DocumentPayload;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use qdrant::QdrantStore;
pub use serper::SerperRetriever;

/// Documents returned per retriever unless configured otherwise.
pub const DEFAULT_TOP_K: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub score: Option<f32>,
}

#[async_trait]
pub trait Retriever: Send + Sync {
    async fn relevant_documents(&self, query: &str) -> Result<Vec<RetrievedDocument>>;
}

#[async_trait]
pub trait RetrievalStore: Send + Sync {
    /// Index `documents` into `collection`, returning the assigned ids in input order.
    async fn add_documents(&self, collection: &str, documents: &[DocumentPayload]) -> Result<Vec<String>>;

    /// Similarity retriever over one collection.
    fn retriever(&self, collection: &str, top_k: usize) -> Arc<dyn Retriever>;
}

/// Internal, competitor, then search results, concatenated in that order.
pub struct CombinedRetriever {
    internal: Arc<dyn Retriever>,
    competitor: Option<Arc<dyn Retriever>>,
    search: Option<Arc<dyn Retriever>>,
}

impl CombinedRetriever {
    pub fn new(
        internal: Arc<dyn Retriever>,
        competitor: Option<Arc<dyn Retriever>>,
        search: Option<Arc<dyn Retriever>>,
    ) -> Self {
        Self {
            internal,
            competitor,
            search,
        }
    }

    /// Wire retrievers from `store`. The competitor collection is skipped when
    /// it is the default collection.
    pub fn build(
        store: &dyn RetrievalStore,
        default_collection: &str,
        competitor_collection: Option<&str>,
        search: Option<Arc<dyn Retriever>>,
        top_k: usize,
    ) -> Self {
        let internal = store.retriever(default_collection, top_k);
        let competitor = competitor_collection
            .filter(|name| *name != default_collection)
            .map(|name| store.retriever(name, top_k));

        info!(
            default_collection,
            competitor_collection = competitor_collection.unwrap_or("none"),
            competitor = competitor.is_some(),
            search = search.is_some(),
            "Combined retriever initialized"
        );
        Self::new(internal, competitor, search)
    }

    pub fn has_competitor(&self) -> bool {
        self.competitor.is_some()
    }

    pub fn has_search(&self) -> bool {
        self.search.is_some()
    }
}

#[async_trait]
impl Retriever for CombinedRetriever {
    async fn relevant_documents(&self, query: &str) -> Result<Vec<RetrievedDocument>> {
        let mut documents = self.internal.relevant_documents(query).await?;
        if let Some(competitor) = &self.competitor {
            documents.extend(competitor.relevant_documents(query).await?);
        }
        if let Some(search) = &self.search {
            documents.extend(search.relevant_documents(query).await?);
        }
        debug!(query, count = documents.len(), "Combined retrieval complete");
        Ok(documents)
    }
}
