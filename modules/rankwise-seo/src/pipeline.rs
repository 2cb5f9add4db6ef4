//! `SeoPipeline`: the façade one processing cycle goes through.
//!
//! Holds one instance of each generator, the remediation orchestrator, the
//! shared ledger, and the retrieval wiring. The combined retriever is built
//! on first use and reused afterwards. Ingestion is not deduplicated:
//! ingesting the same documents twice indexes them twice.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use ai_client::CompletionModel;
use rankwise_common::{AuditIssue, ChangeLogEntry, ChangeType, Config, DocumentPayload, RankwiseError};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::PipelineError;
use crate::generators::{
    AnomalyAnalysisResult, AnomalyAnalyzer, AnomalyRequest, ContentRefresher, FaqGenerator,
    MetaDescriptionRequest, MetaDescriptionResult, MetaDescriptionRewriter, PromptSettings,
    SchemaInjector,
};
use crate::ledger::{Ledger, LedgerSnapshot};
use crate::orchestrator::{PageContext, RemediationOrchestrator};
use crate::retrieval::{CombinedRetriever, RetrievalStore, Retriever, DEFAULT_TOP_K};
use crate::validator::DEFAULT_MAX_RETRIES;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub default_collection: String,
    pub competitor_collection: String,
    pub max_retries: u32,
    pub faq_target: usize,
    pub top_k: usize,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_collection: config.default_collection.clone(),
            competitor_collection: config.competitor_collection(),
            max_retries: config.validation_max_retries,
            faq_target: config.faq_target_count,
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            default_collection: "seo_content".to_string(),
            competitor_collection: "seo_content_competitors".to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            faq_target: PromptSettings::default().faq_target,
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// Documents supplied to one cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeoContext {
    #[serde(default)]
    pub site_documents: Vec<DocumentPayload>,
    #[serde(default)]
    pub competitor_documents: Vec<DocumentPayload>,
    #[serde(default)]
    pub new_scraped_content: Vec<DocumentPayload>,
}

/// Ledger contents at the end of a cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub change_log: Vec<ChangeLogEntry>,
    pub audit_issues: Vec<AuditIssue>,
}

impl From<LedgerSnapshot> for CycleReport {
    fn from(snapshot: LedgerSnapshot) -> Self {
        Self {
            change_log: snapshot.change_log,
            audit_issues: snapshot.audit_issues,
        }
    }
}

pub struct SeoPipeline {
    settings: PipelineSettings,
    store: Arc<dyn RetrievalStore>,
    search: Option<Arc<dyn Retriever>>,
    retriever: OnceLock<Arc<CombinedRetriever>>,
    anomaly_analyzer: AnomalyAnalyzer,
    meta_description_rewriter: MetaDescriptionRewriter,
    orchestrator: RemediationOrchestrator,
    ledger: Arc<Ledger>,
}

impl SeoPipeline {
    pub fn new(
        model: Arc<dyn CompletionModel>,
        store: Arc<dyn RetrievalStore>,
        settings: PipelineSettings,
    ) -> Self {
        let prompt_settings = PromptSettings {
            faq_target: settings.faq_target,
        };
        let retries = settings.max_retries;
        let ledger = Arc::new(Ledger::new());

        let orchestrator = RemediationOrchestrator::new(
            Arc::new(ContentRefresher::new(model.clone()).with_max_retries(retries)),
            Arc::new(
                FaqGenerator::new(model.clone())
                    .with_max_retries(retries)
                    .with_settings(prompt_settings),
            ),
            Arc::new(SchemaInjector::new(model.clone()).with_max_retries(retries)),
            ledger.clone(),
        );

        Self {
            anomaly_analyzer: AnomalyAnalyzer::new(model.clone()).with_max_retries(retries),
            meta_description_rewriter: MetaDescriptionRewriter::new(model).with_max_retries(retries),
            orchestrator,
            ledger,
            store,
            search: None,
            retriever: OnceLock::new(),
            settings,
        }
    }

    /// Live search results join the combined retriever. Only effective
    /// before the retriever is first built.
    pub fn with_search(mut self, search: Arc<dyn Retriever>) -> Self {
        self.search = Some(search);
        self
    }

    /// Record into an existing ledger, e.g. one restored from disk.
    pub fn with_ledger(mut self, ledger: Arc<Ledger>) -> Self {
        self.orchestrator = self.orchestrator.with_ledger(ledger.clone());
        self.ledger = ledger;
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn report(&self) -> CycleReport {
        self.ledger.snapshot().into()
    }

    /// The combined retriever, built on first call.
    pub fn retriever(&self) -> Arc<CombinedRetriever> {
        self.retriever
            .get_or_init(|| {
                Arc::new(CombinedRetriever::build(
                    self.store.as_ref(),
                    &self.settings.default_collection,
                    Some(&self.settings.competitor_collection),
                    self.search.clone(),
                    self.settings.top_k,
                ))
            })
            .clone()
    }

    pub async fn ingest_documents(&self, documents: &[DocumentPayload]) -> Result<Vec<String>, PipelineError> {
        self.ingest(&self.settings.default_collection, documents).await
    }

    pub async fn ingest_competitor_documents(
        &self,
        documents: &[DocumentPayload],
    ) -> Result<Vec<String>, PipelineError> {
        self.ingest(&self.settings.competitor_collection, documents).await
    }

    async fn ingest(&self, collection: &str, documents: &[DocumentPayload]) -> Result<Vec<String>, PipelineError> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }
        info!(collection, count = documents.len(), "Ingesting documents");
        self.store
            .add_documents(collection, documents)
            .await
            .map_err(|e| PipelineError::Ingest {
                collection: collection.to_string(),
                source: RankwiseError::from(e),
            })
    }

    /// Diagnose the page's metrics, then remediate. Returns the diagnosis.
    pub async fn run_anomaly_workflow(
        &self,
        page: &PageContext,
        metrics: &str,
        recent_changes: &str,
    ) -> Result<AnomalyAnalysisResult, PipelineError> {
        let analysis = self
            .anomaly_analyzer
            .generate(&AnomalyRequest {
                page_metrics: metrics.to_string(),
                competitor_context: page.competitor_insights.clone(),
                recent_changes: recent_changes.to_string(),
            })
            .await
            .map_err(|source| PipelineError::Analysis {
                page_id: page.page_id.clone(),
                source,
            })?;

        self.orchestrator.handle_anomaly(page, &analysis).await?;
        Ok(analysis)
    }

    /// Propose a rewritten meta description as a pending change.
    pub async fn generate_meta_description(
        &self,
        page_id: &str,
        request: &MetaDescriptionRequest,
    ) -> Result<Uuid, PipelineError> {
        let MetaDescriptionResult { meta_description, notes } = self
            .meta_description_rewriter
            .generate(request)
            .await
            .map_err(|source| PipelineError::MetaDescription {
                page_id: page_id.to_string(),
                source,
            })?;

        let payload = BTreeMap::from([
            ("meta_description".to_string(), meta_description),
            ("notes".to_string(), notes),
        ]);
        Ok(self
            .ledger
            .record_change(ChangeLogEntry::new(page_id, ChangeType::MetaDescription, payload)))
    }

    /// Ingest everything in `context`, make sure the retriever exists, and
    /// report the ledger.
    pub async fn process_cycle(&self, context: &SeoContext) -> Result<CycleReport, PipelineError> {
        info!("Starting SEO cycle");
        self.ingest_documents(&context.site_documents).await?;
        self.ingest_competitor_documents(&context.competitor_documents).await?;
        self.ingest_documents(&context.new_scraped_content).await?;
        self.retriever();
        info!("SEO cycle complete");
        Ok(self.report())
    }
}
