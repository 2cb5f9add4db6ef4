// Test doubles for the two collaborator boundaries:
// - ScriptedModel (CompletionModel): prompt-routed rules, then a FIFO queue
// - MemoryRetrievalStore (RetrievalStore): per-collection Vec, substring retrieval

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use ai_client::{AiError, CompletionModel};
use anyhow::Result;
use async_trait::async_trait;
use rankwise_common::DocumentPayload;

use crate::retrieval::{RetrievalStore, RetrievedDocument, Retriever};

type Reply = Result<String, AiError>;

fn unavailable(message: &str) -> AiError {
    AiError::Api {
        status: 503,
        body: message.to_string(),
    }
}

// ---------------------------------------------------------------------------
// ScriptedModel
// ---------------------------------------------------------------------------

/// Canned completions. A prompt containing a registered needle gets that
/// rule's next reply (the last reply repeats); anything else pops the queue.
/// An exhausted queue answers with a 503.
#[derive(Default)]
pub struct ScriptedModel {
    rules: Mutex<Vec<(String, VecDeque<Reply>)>>,
    queue: Mutex<VecDeque<Reply>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route prompts containing `needle` to `reply`. Repeated calls with the
    /// same needle queue further replies.
    pub fn on(&self, needle: &str, reply: impl Into<String>) -> &Self {
        self.add_rule(needle, Ok(reply.into()));
        self
    }

    pub fn on_failure(&self, needle: &str, message: &str) -> &Self {
        self.add_rule(needle, Err(unavailable(message)));
        self
    }

    fn add_rule(&self, needle: &str, reply: Reply) {
        let mut rules = self.rules.lock().unwrap();
        match rules.iter_mut().find(|(n, _)| n == needle) {
            Some((_, replies)) => replies.push_back(reply),
            None => rules.push((needle.to_string(), VecDeque::from([reply]))),
        }
    }

    pub fn push_reply(&self, reply: impl Into<String>) -> &Self {
        self.queue.lock().unwrap().push_back(Ok(reply.into()));
        self
    }

    pub fn push_failure(&self, message: &str) -> &Self {
        self.queue.lock().unwrap().push_back(Err(unavailable(message)));
        self
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    /// Calls whose prompt contained `needle`.
    pub fn calls_matching(&self, needle: &str) -> usize {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.contains(needle))
            .count()
    }

    fn next_reply(&self, prompt: &str) -> Reply {
        let mut rules = self.rules.lock().unwrap();
        if let Some((_, replies)) = rules.iter_mut().find(|(needle, _)| prompt.contains(needle.as_str())) {
            return if replies.len() > 1 {
                replies.pop_front().unwrap_or_else(|| Err(unavailable("no reply")))
            } else {
                replies
                    .front()
                    .map(clone_reply)
                    .unwrap_or_else(|| Err(unavailable("no reply")))
            };
        }
        drop(rules);

        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(unavailable("ScriptedModel: no scripted reply left")))
    }
}

fn clone_reply(reply: &Reply) -> Reply {
    match reply {
        Ok(text) => Ok(text.clone()),
        Err(AiError::Api { status, body }) => Err(AiError::Api {
            status: *status,
            body: body.clone(),
        }),
        Err(other) => Err(unavailable(&other.to_string())),
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String, AiError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.next_reply(prompt)
    }
}

// ---------------------------------------------------------------------------
// MemoryRetrievalStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub id: String,
    pub document: DocumentPayload,
}

/// In-memory store. Ids are sequential across collections (`doc-1`, `doc-2`, ...).
/// Retrieval is a case-insensitive substring match on content.
#[derive(Default)]
pub struct MemoryRetrievalStore {
    collections: Arc<Mutex<BTreeMap<String, Vec<StoredDocument>>>>,
    next_id: Mutex<usize>,
    retrievers_built: Mutex<Vec<String>>,
}

impl MemoryRetrievalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn documents(&self, collection: &str) -> Vec<StoredDocument> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Collections a retriever was requested for, in request order.
    pub fn retrievers_built(&self) -> Vec<String> {
        self.retrievers_built.lock().unwrap().clone()
    }
}

#[async_trait]
impl RetrievalStore for MemoryRetrievalStore {
    async fn add_documents(&self, collection: &str, documents: &[DocumentPayload]) -> Result<Vec<String>> {
        let mut next_id = self.next_id.lock().unwrap();
        let mut collections = self.collections.lock().unwrap();
        let stored = collections.entry(collection.to_string()).or_default();

        let mut ids = Vec::with_capacity(documents.len());
        for document in documents {
            *next_id += 1;
            let id = format!("doc-{}", *next_id);
            stored.push(StoredDocument {
                id: id.clone(),
                document: document.clone(),
            });
            ids.push(id);
        }
        Ok(ids)
    }

    fn retriever(&self, collection: &str, top_k: usize) -> Arc<dyn Retriever> {
        self.retrievers_built.lock().unwrap().push(collection.to_string());
        Arc::new(MemoryRetriever {
            collections: self.collections.clone(),
            collection: collection.to_string(),
            top_k,
        })
    }
}

struct MemoryRetriever {
    collections: Arc<Mutex<BTreeMap<String, Vec<StoredDocument>>>>,
    collection: String,
    top_k: usize,
}

#[async_trait]
impl Retriever for MemoryRetriever {
    async fn relevant_documents(&self, query: &str) -> Result<Vec<RetrievedDocument>> {
        let query = query.to_lowercase();
        let collections = self.collections.lock().unwrap();
        Ok(collections
            .get(&self.collection)
            .into_iter()
            .flatten()
            .filter(|stored| stored.document.content.to_lowercase().contains(&query))
            .take(self.top_k)
            .map(|stored| RetrievedDocument {
                content: stored.document.content.clone(),
                metadata: stored.document.metadata.clone(),
                score: None,
            })
            .collect())
    }
}
