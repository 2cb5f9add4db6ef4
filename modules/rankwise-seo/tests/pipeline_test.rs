//! SeoPipeline tests against the in-memory store and a scripted model.

use std::sync::Arc;

use serde_json::json;

use rankwise_common::{ChangeType, Config, DocumentPayload};
use rankwise_seo::generators::MetaDescriptionRequest;
use rankwise_seo::retrieval::Retriever;
use rankwise_seo::testing::{MemoryRetrievalStore, ScriptedModel};
use rankwise_seo::{Ledger, PageContext, PipelineError, PipelineSettings, SeoContext, SeoPipeline};

const ANALYST_PROMPT: &str = "SEO analyst";
const FAQ_PROMPT: &str = "SEO content strategist";
const SCHEMA_PROMPT: &str = "structured data expert";
const META_PROMPT: &str = "improving meta descriptions";
const REPAIR_PROMPT: &str = "failed validation";

fn pipeline(model: &Arc<ScriptedModel>, store: &Arc<MemoryRetrievalStore>) -> SeoPipeline {
    SeoPipeline::new(model.clone(), store.clone(), PipelineSettings::default())
}

fn doc(content: &str) -> DocumentPayload {
    DocumentPayload::new(content).with_metadata("source", "test")
}

fn page() -> PageContext {
    PageContext {
        page_id: "heat-pumps".into(),
        page_content: "We install cold-climate heat pumps.".into(),
        topic: "heat pumps".into(),
        competitor_insights: "Rivals rank for 'heat pump rebates'.".into(),
    }
}

// ---------------------------------------------------------------------------
// Cycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cycle_routes_documents_to_collections() {
    let model = Arc::new(ScriptedModel::new());
    let store = Arc::new(MemoryRetrievalStore::new());
    let pipeline = pipeline(&model, &store);

    let context = SeoContext {
        site_documents: vec![doc("Heat pump pricing"), doc("About us")],
        competitor_documents: vec![doc("Rival heat pump rebates")],
        new_scraped_content: vec![doc("Fresh heat pump review")],
    };
    let report = pipeline.process_cycle(&context).await.unwrap();

    assert_eq!(store.documents("seo_content").len(), 3);
    assert_eq!(store.documents("seo_content_competitors").len(), 1);
    assert!(report.change_log.is_empty());
    assert!(report.audit_issues.is_empty());
    assert_eq!(model.calls(), 0);

    let docs = pipeline.retriever().relevant_documents("heat pump").await.unwrap();
    let contents: Vec<_> = docs.iter().map(|d| d.content.as_str()).collect();
    assert_eq!(
        contents,
        vec!["Heat pump pricing", "Fresh heat pump review", "Rival heat pump rebates"]
    );
}

#[tokio::test]
async fn retriever_is_built_once() {
    let model = Arc::new(ScriptedModel::new());
    let store = Arc::new(MemoryRetrievalStore::new());
    let pipeline = pipeline(&model, &store);

    pipeline.process_cycle(&SeoContext::default()).await.unwrap();
    pipeline.process_cycle(&SeoContext::default()).await.unwrap();
    pipeline.retriever();

    assert_eq!(
        store.retrievers_built(),
        vec!["seo_content".to_string(), "seo_content_competitors".to_string()]
    );
}

#[tokio::test]
async fn repeated_ingestion_duplicates_documents() {
    let model = Arc::new(ScriptedModel::new());
    let store = Arc::new(MemoryRetrievalStore::new());
    let pipeline = pipeline(&model, &store);

    let context = SeoContext {
        site_documents: vec![doc("Heat pump pricing")],
        ..Default::default()
    };
    pipeline.process_cycle(&context).await.unwrap();
    pipeline.process_cycle(&context).await.unwrap();

    let stored = store.documents("seo_content");
    assert_eq!(stored.len(), 2);
    assert_ne!(stored[0].id, stored[1].id);
}

#[tokio::test]
async fn empty_ingest_returns_no_ids() {
    let model = Arc::new(ScriptedModel::new());
    let store = Arc::new(MemoryRetrievalStore::new());
    let pipeline = pipeline(&model, &store);

    let ids = pipeline.ingest_documents(&[]).await.unwrap();
    assert!(ids.is_empty());
    assert!(store.documents("seo_content").is_empty());

    let ids = pipeline
        .ingest_competitor_documents(&[doc("a"), doc("b")])
        .await
        .unwrap();
    assert_eq!(ids, vec!["doc-1", "doc-2"]);
}

// ---------------------------------------------------------------------------
// Anomaly workflow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn anomaly_workflow_analyzes_then_remediates() {
    let model = Arc::new(ScriptedModel::new());
    model.on(
        ANALYST_PROMPT,
        json!({
            "likely_causes": ["Competitors answer common questions"],
            "recommended_actions": ["Add an FAQ section"]
        })
        .to_string(),
    );
    model.on(
        FAQ_PROMPT,
        json!({"faqs": [{"question": "How long does install take?", "answer": "Two days."}]}).to_string(),
    );
    model.on(SCHEMA_PROMPT, json!({"schema_json": {"@type": "FAQPage"}}).to_string());
    let store = Arc::new(MemoryRetrievalStore::new());
    let pipeline = pipeline(&model, &store);

    let analysis = pipeline
        .run_anomaly_workflow(&page(), "clicks -40% week over week", "Removed FAQ block")
        .await
        .unwrap();

    assert_eq!(analysis.recommended_actions, vec!["Add an FAQ section"]);
    let analyst_prompt = &model.prompts()[0];
    assert!(analyst_prompt.contains("clicks -40% week over week"));
    assert!(analyst_prompt.contains("Rivals rank for 'heat pump rebates'."));

    let report = pipeline.report();
    assert_eq!(report.audit_issues.len(), 1);
    assert_eq!(report.audit_issues[0].summary, "Competitors answer common questions");
    let types: Vec<_> = report.change_log.iter().map(|e| e.change_type).collect();
    assert_eq!(types, vec![ChangeType::FaqUpdate, ChangeType::SchemaUpdate]);
}

#[tokio::test]
async fn failed_analysis_records_nothing() {
    let model = Arc::new(ScriptedModel::new());
    model.on_failure(ANALYST_PROMPT, "upstream timeout");
    let store = Arc::new(MemoryRetrievalStore::new());
    let pipeline = pipeline(&model, &store);

    let err = pipeline
        .run_anomaly_workflow(&page(), "clicks -40%", "")
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Analysis { ref page_id, .. } if page_id == "heat-pumps"));
    assert!(pipeline.report().audit_issues.is_empty());
    assert_eq!(model.calls(), 1);
}

// ---------------------------------------------------------------------------
// Meta description
// ---------------------------------------------------------------------------

fn meta_request() -> MetaDescriptionRequest {
    MetaDescriptionRequest {
        page_content: "We install cold-climate heat pumps.".into(),
        current_description: "Heat pumps.".into(),
        target_keywords: "heat pump installation, Minneapolis".into(),
    }
}

#[tokio::test]
async fn meta_description_is_logged_as_pending_change() {
    let model = Arc::new(ScriptedModel::new());
    model.on(
        META_PROMPT,
        json!({
            "meta_description": "Cold-climate heat pump installation in Minneapolis. Free quotes.",
            "notes": "Leads with the primary keyword."
        })
        .to_string(),
    );
    let store = Arc::new(MemoryRetrievalStore::new());
    let pipeline = pipeline(&model, &store);

    let id = pipeline.generate_meta_description("heat-pumps", &meta_request()).await.unwrap();

    let entry = pipeline.ledger().get(id).unwrap();
    assert_eq!(entry.change_type, ChangeType::MetaDescription);
    assert_eq!(
        entry.payload["meta_description"],
        "Cold-climate heat pump installation in Minneapolis. Free quotes."
    );
    assert_eq!(entry.payload["notes"], "Leads with the primary keyword.");
}

#[tokio::test]
async fn overlong_meta_description_is_repaired() {
    let model = Arc::new(ScriptedModel::new());
    model.on(
        META_PROMPT,
        json!({ "meta_description": "x".repeat(201), "notes": "too long" }).to_string(),
    );
    model.on(
        REPAIR_PROMPT,
        json!({ "meta_description": "Heat pump installs in Minneapolis.", "notes": "trimmed" }).to_string(),
    );
    let store = Arc::new(MemoryRetrievalStore::new());
    let pipeline = pipeline(&model, &store);

    let id = pipeline.generate_meta_description("heat-pumps", &meta_request()).await.unwrap();

    let entry = pipeline.ledger().get(id).unwrap();
    assert_eq!(entry.payload["notes"], "trimmed");
    assert_eq!(model.calls(), 2);
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shared_ledger_sees_pipeline_records() {
    let model = Arc::new(ScriptedModel::new());
    model.on(
        ANALYST_PROMPT,
        json!({"likely_causes": ["Seasonality"], "recommended_actions": ["Wait"]}).to_string(),
    );
    let store = Arc::new(MemoryRetrievalStore::new());
    let ledger = Arc::new(Ledger::new());
    let pipeline = pipeline(&model, &store).with_ledger(ledger.clone());

    pipeline.run_anomaly_workflow(&page(), "flat", "").await.unwrap();

    assert_eq!(ledger.audit_issues().len(), 1);
    assert!(ledger.change_log().is_empty());
}

#[test]
fn settings_follow_config() {
    let config = Config::from_lookup(|key| match key {
        "OPENAI_API_KEY" => Some("sk-test".into()),
        "SEO_COLLECTION" => Some("acme".into()),
        "VALIDATION_MAX_RETRIES" => Some("4".into()),
        "FAQ_TARGET_COUNT" => Some("8".into()),
        _ => None,
    })
    .unwrap();

    let settings = PipelineSettings::from_config(&config);
    assert_eq!(settings.default_collection, "acme");
    assert_eq!(settings.competitor_collection, "acme_competitors");
    assert_eq!(settings.max_retries, 4);
    assert_eq!(settings.faq_target, 8);
}
