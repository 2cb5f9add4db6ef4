//! Remediation tests: AnomalyAnalysisResult → RemediationOrchestrator → ledger.
//!
//! Each test scripts the model per prompt, runs `handle_anomaly`, and asserts
//! on the audit issues and change log left behind. No network.

use std::sync::Arc;

use serde_json::json;

use rankwise_common::{ChangeStatus, ChangeType};
use rankwise_seo::error::GenerationError;
use rankwise_seo::generators::{AnomalyAnalysisResult, ContentRefresher, FaqGenerator, SchemaInjector};
use rankwise_seo::testing::ScriptedModel;
use rankwise_seo::{Ledger, OrchestrationError, PageContext, RemediationOrchestrator, RemediationStep, TaskKind};

const CONTENT_PROMPT: &str = "SEO content editor";
const FAQ_PROMPT: &str = "SEO content strategist";
const SCHEMA_PROMPT: &str = "structured data expert";
const REPAIR_PROMPT: &str = "failed validation";

fn page() -> PageContext {
    PageContext {
        page_id: "heat-pumps".into(),
        page_content: "We install cold-climate heat pumps across the Twin Cities.".into(),
        topic: "heat pump installation".into(),
        competitor_insights: "Competitors publish rebate calculators.".into(),
    }
}

fn analysis(actions: &[&str]) -> AnomalyAnalysisResult {
    AnomalyAnalysisResult {
        likely_causes: vec!["Thin content".into(), "Missing structured data".into()],
        recommended_actions: actions.iter().map(|a| a.to_string()).collect(),
    }
}

fn refresh_reply() -> String {
    json!({
        "sections_to_improve": ["Pricing", "Rebates"],
        "suggested_updates": ["Add 2025 prices", "Link the state rebate"]
    })
    .to_string()
}

fn faq_reply() -> String {
    json!({
        "faqs": [
            {"question": "Do heat pumps work below zero?", "answer": "Cold-climate models do."},
            {"question": "Are there rebates?", "answer": "Yes, up to $8,000."}
        ]
    })
    .to_string()
}

fn schema_reply() -> String {
    json!({ "schema_json": { "@context": "https://schema.org", "@type": "FAQPage" } }).to_string()
}

fn orchestrator(model: &Arc<ScriptedModel>, ledger: &Arc<Ledger>) -> RemediationOrchestrator {
    RemediationOrchestrator::new(
        Arc::new(ContentRefresher::new(model.clone())),
        Arc::new(FaqGenerator::new(model.clone())),
        Arc::new(SchemaInjector::new(model.clone())),
        ledger.clone(),
    )
}

fn change_types(ledger: &Ledger) -> Vec<ChangeType> {
    ledger.change_log().iter().map(|e| e.change_type).collect()
}

// ---------------------------------------------------------------------------
// Audit issue
// ---------------------------------------------------------------------------

#[tokio::test]
async fn audit_issue_is_always_recorded() {
    let model = Arc::new(ScriptedModel::new());
    let ledger = Arc::new(Ledger::new());

    orchestrator(&model, &ledger)
        .handle_anomaly(&page(), &analysis(&["Monitor page speed"]))
        .await
        .unwrap();

    let issues = ledger.audit_issues();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].page_id, "heat-pumps");
    assert_eq!(issues[0].summary, "Thin content; Missing structured data");
    assert_eq!(issues[0].recommended_actions, vec!["Monitor page speed"]);
    assert!(ledger.change_log().is_empty());
    assert_eq!(model.calls(), 0);
}

// ---------------------------------------------------------------------------
// Triggers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn content_keyword_triggers_refresh_only() {
    let model = Arc::new(ScriptedModel::new());
    model.on(CONTENT_PROMPT, refresh_reply());
    let ledger = Arc::new(Ledger::new());

    orchestrator(&model, &ledger)
        .handle_anomaly(&page(), &analysis(&["CONTENT overhaul needed"]))
        .await
        .unwrap();

    assert_eq!(change_types(&ledger), vec![ChangeType::ContentRefresh]);
    let entry = &ledger.change_log()[0];
    assert_eq!(entry.payload["sections_to_improve"], "Pricing\nRebates");
    assert_eq!(entry.payload["suggested_updates"], "Add 2025 prices\nLink the state rebate");
    assert_eq!(entry.status, ChangeStatus::Pending);
    assert_eq!(model.calls_matching(FAQ_PROMPT), 0);
}

#[tokio::test]
async fn faq_keyword_always_chains_into_schema_injection() {
    let model = Arc::new(ScriptedModel::new());
    model.on(FAQ_PROMPT, faq_reply());
    model.on(SCHEMA_PROMPT, schema_reply());
    let ledger = Arc::new(Ledger::new());

    orchestrator(&model, &ledger)
        .handle_anomaly(&page(), &analysis(&["Update FAQ section"]))
        .await
        .unwrap();

    assert_eq!(change_types(&ledger), vec![ChangeType::FaqUpdate, ChangeType::SchemaUpdate]);

    let log = ledger.change_log();
    let faqs: serde_json::Value = serde_json::from_str(&log[0].payload["faqs"]).unwrap();
    assert_eq!(faqs["faqs"].as_array().unwrap().len(), 2);
    let schema: serde_json::Value = serde_json::from_str(&log[1].payload["schema"]).unwrap();
    assert_eq!(schema["schema_json"]["@type"], "FAQPage");

    // The schema prompt is built from the freshly generated FAQs.
    let schema_prompt = model
        .prompts()
        .into_iter()
        .find(|p| p.contains(SCHEMA_PROMPT))
        .unwrap();
    assert!(schema_prompt.contains("Do heat pumps work below zero?"));
    assert_eq!(model.calls_matching(CONTENT_PROMPT), 0);
}

#[tokio::test]
async fn both_triggers_run_in_fixed_order() {
    let model = Arc::new(ScriptedModel::new());
    model.on(CONTENT_PROMPT, refresh_reply());
    model.on(FAQ_PROMPT, faq_reply());
    model.on(SCHEMA_PROMPT, schema_reply());
    let ledger = Arc::new(Ledger::new());

    orchestrator(&model, &ledger)
        .handle_anomaly(&page(), &analysis(&["Refresh the content", "Add more FAQ coverage"]))
        .await
        .unwrap();

    assert_eq!(
        change_types(&ledger),
        vec![ChangeType::ContentRefresh, ChangeType::FaqUpdate, ChangeType::SchemaUpdate]
    );
    assert_eq!(ledger.audit_issues().len(), 1);
}

#[tokio::test]
async fn substring_match_is_not_whole_word() {
    let model = Arc::new(ScriptedModel::new());
    model.on(CONTENT_PROMPT, refresh_reply());
    let ledger = Arc::new(Ledger::new());

    orchestrator(&model, &ledger)
        .handle_anomaly(&page(), &analysis(&["Rewrite the page's contentious claims"]))
        .await
        .unwrap();

    assert_eq!(change_types(&ledger), vec![ChangeType::ContentRefresh]);
}

// ---------------------------------------------------------------------------
// Aborts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn schema_failure_keeps_earlier_records() {
    let model = Arc::new(ScriptedModel::new());
    model.on(CONTENT_PROMPT, refresh_reply());
    model.on(FAQ_PROMPT, faq_reply());
    model.on_failure(SCHEMA_PROMPT, "rate limited");
    let ledger = Arc::new(Ledger::new());

    let err = orchestrator(&model, &ledger)
        .handle_anomaly(&page(), &analysis(&["Refresh content", "Add FAQ"]))
        .await
        .unwrap_err();

    match err {
        OrchestrationError::Aborted { page_id, step, source } => {
            assert_eq!(page_id, "heat-pumps");
            assert_eq!(step, RemediationStep::SchemaInjection);
            assert!(matches!(source, GenerationError::Upstream { task: TaskKind::SchemaInjection, .. }));
        }
        other => panic!("expected abort, got {other:?}"),
    }

    assert_eq!(ledger.audit_issues().len(), 1);
    assert_eq!(change_types(&ledger), vec![ChangeType::ContentRefresh, ChangeType::FaqUpdate]);
}

#[tokio::test]
async fn refresh_failure_skips_faq_branch() {
    let model = Arc::new(ScriptedModel::new());
    model.on(CONTENT_PROMPT, "I would rather not answer in JSON.");
    model.on(REPAIR_PROMPT, "Still no JSON, sorry.");
    model.on(FAQ_PROMPT, faq_reply());
    let ledger = Arc::new(Ledger::new());

    let err = orchestrator(&model, &ledger)
        .handle_anomaly(&page(), &analysis(&["Refresh content", "Add FAQ"]))
        .await
        .unwrap_err();

    let OrchestrationError::Aborted { step, source, .. } = err else {
        panic!("expected abort");
    };
    assert_eq!(step, RemediationStep::ContentRefresh);
    assert_eq!(source.raw_output(), Some("Still no JSON, sorry."));
    assert_eq!(model.calls_matching(REPAIR_PROMPT), 2);

    assert_eq!(ledger.audit_issues().len(), 1);
    assert!(ledger.change_log().is_empty());
    assert_eq!(model.calls_matching(FAQ_PROMPT), 0);
}
