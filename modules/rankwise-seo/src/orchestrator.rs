//! Turns an anomaly diagnosis into audit issues and proposed changes.
//!
//! Per anomaly: record the audit issue, then run content refresh if any
//! recommended action mentions "content", then FAQ generation followed by
//! schema injection if any action mentions "faq". Matching is a
//! case-insensitive substring test on the action text. Steps run one after
//! another; the first failure stops the run and earlier records stay.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rankwise_common::{AuditIssue, ChangeLogEntry, ChangeType};
use tracing::{info, warn};

use crate::error::{GenerationError, OrchestrationError};
use crate::generators::{
    AnomalyAnalysisResult, ContentRefreshRequest, ContentRefresher, FaqGenerator, FaqRequest,
    SchemaInjectionRequest, SchemaInjector,
};
use crate::ledger::Ledger;

const CONTENT_KEYWORD: &str = "content";
const FAQ_KEYWORD: &str = "faq";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemediationStep {
    ContentRefresh,
    FaqGeneration,
    SchemaInjection,
}

impl fmt::Display for RemediationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContentRefresh => write!(f, "content refresh"),
            Self::FaqGeneration => write!(f, "FAQ generation"),
            Self::SchemaInjection => write!(f, "schema injection"),
        }
    }
}

/// The page an anomaly was observed on.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub page_id: String,
    pub page_content: String,
    pub topic: String,
    pub competitor_insights: String,
}

/// True if any action contains `keyword`, ignoring case.
pub fn mentions(actions: &[String], keyword: &str) -> bool {
    let keyword = keyword.to_lowercase();
    actions.iter().any(|action| action.to_lowercase().contains(&keyword))
}

pub fn needs_content_refresh(analysis: &AnomalyAnalysisResult) -> bool {
    mentions(&analysis.recommended_actions, CONTENT_KEYWORD)
}

pub fn needs_faq_update(analysis: &AnomalyAnalysisResult) -> bool {
    mentions(&analysis.recommended_actions, FAQ_KEYWORD)
}

pub struct RemediationOrchestrator {
    content_refresher: Arc<ContentRefresher>,
    faq_generator: Arc<FaqGenerator>,
    schema_injector: Arc<SchemaInjector>,
    ledger: Arc<Ledger>,
}

impl RemediationOrchestrator {
    pub fn new(
        content_refresher: Arc<ContentRefresher>,
        faq_generator: Arc<FaqGenerator>,
        schema_injector: Arc<SchemaInjector>,
        ledger: Arc<Ledger>,
    ) -> Self {
        Self {
            content_refresher,
            faq_generator,
            schema_injector,
            ledger,
        }
    }

    /// Same generators, different ledger.
    pub fn with_ledger(mut self, ledger: Arc<Ledger>) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub async fn handle_anomaly(
        &self,
        page: &PageContext,
        analysis: &AnomalyAnalysisResult,
    ) -> Result<(), OrchestrationError> {
        info!(page_id = %page.page_id, "Handling anomaly");

        self.ledger.record_issue(AuditIssue::new(
            &page.page_id,
            analysis.likely_causes.join("; "),
            analysis.recommended_actions.clone(),
        ));

        let refresh = needs_content_refresh(analysis);
        let faq = needs_faq_update(analysis);
        info!(page_id = %page.page_id, refresh, faq, "Remediation plan");

        if refresh {
            self.refresh_content(page).await?;
        }
        if faq {
            self.update_faqs(page).await?;
        }

        Ok(())
    }

    async fn refresh_content(&self, page: &PageContext) -> Result<(), OrchestrationError> {
        let step = RemediationStep::ContentRefresh;
        let refresh = self
            .content_refresher
            .generate(&ContentRefreshRequest {
                page_content: page.page_content.clone(),
                topic: page.topic.clone(),
                competitor_insights: page.competitor_insights.clone(),
            })
            .await
            .map_err(|source| abort(page, step, source))?;

        let payload = BTreeMap::from([
            ("sections_to_improve".to_string(), refresh.sections_to_improve.join("\n")),
            ("suggested_updates".to_string(), refresh.suggested_updates.join("\n")),
        ]);
        self.ledger
            .record_change(ChangeLogEntry::new(&page.page_id, ChangeType::ContentRefresh, payload));
        Ok(())
    }

    /// FAQ generation always continues into schema injection.
    async fn update_faqs(&self, page: &PageContext) -> Result<(), OrchestrationError> {
        let faqs = self
            .faq_generator
            .generate(&FaqRequest {
                page_content: page.page_content.clone(),
                topic: page.topic.clone(),
            })
            .await
            .map_err(|source| abort(page, RemediationStep::FaqGeneration, source))?;

        let faq_json = serde_json::to_string(&faqs)
            .map_err(|source| payload_error(page, RemediationStep::FaqGeneration, source))?;
        self.ledger.record_change(ChangeLogEntry::new(
            &page.page_id,
            ChangeType::FaqUpdate,
            BTreeMap::from([("faqs".to_string(), faq_json)]),
        ));

        let schema = self
            .schema_injector
            .generate(&SchemaInjectionRequest {
                page_content: page.page_content.clone(),
                faqs: faqs.faqs,
                business_info: String::new(),
            })
            .await
            .map_err(|source| abort(page, RemediationStep::SchemaInjection, source))?;

        let schema_json = serde_json::to_string(&schema)
            .map_err(|source| payload_error(page, RemediationStep::SchemaInjection, source))?;
        self.ledger.record_change(ChangeLogEntry::new(
            &page.page_id,
            ChangeType::SchemaUpdate,
            BTreeMap::from([("schema".to_string(), schema_json)]),
        ));
        Ok(())
    }
}

fn abort(page: &PageContext, step: RemediationStep, source: GenerationError) -> OrchestrationError {
    warn!(page_id = %page.page_id, %step, error = %source, "Remediation aborted");
    OrchestrationError::Aborted {
        page_id: page.page_id.clone(),
        step,
        source,
    }
}

fn payload_error(page: &PageContext, step: RemediationStep, source: serde_json::Error) -> OrchestrationError {
    OrchestrationError::Payload {
        page_id: page.page_id.clone(),
        step,
        source,
    }
}
