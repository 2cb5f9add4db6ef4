//! Prompt templates, one per generation task.

pub fn faq(topic: &str, page_content: &str, target_count: usize) -> String {
    format!(
        "You are an expert SEO content strategist.\n\
         Topic: {topic}\n\
         Page Content:\n{page_content}\n\n\
         Write {target_count} FAQ entries that fit the topic and the page. \
         Return a JSON object with key 'faqs' whose value is an array of objects \
         with 'question' and 'answer' fields."
    )
}

pub fn meta_description(page_content: &str, current_description: &str, target_keywords: &str) -> String {
    format!(
        "You are an SEO specialist improving meta descriptions.\n\
         Current Description: {current_description}\n\
         Target Keywords: {target_keywords}\n\
         Page Content:\n{page_content}\n\n\
         Write a compelling meta description under 160 characters that works the target keywords in naturally. \
         Return JSON with keys 'meta_description' and 'notes' (the rationale)."
    )
}

pub fn content_refresh(page_content: &str, topic: &str, competitor_insights: &str) -> String {
    format!(
        "You are an SEO content editor.\n\
         Topic: {topic}\n\
         Competitor Insights:\n{competitor_insights}\n\
         Page Content:\n{page_content}\n\n\
         Identify sections that are outdated or thin. \
         Return JSON with keys 'sections_to_improve' (list of strings) and 'suggested_updates' (list of strings)."
    )
}

pub fn schema_injection(page_content: &str, faqs_json: &str, business_info: &str) -> String {
    format!(
        "You are a structured data expert.\n\
         Page Content:\n{page_content}\n\
         FAQs:\n{faqs_json}\n\
         Business Info:\n{business_info}\n\n\
         Choose the most appropriate JSON-LD markup for this page. \
         Return JSON with a 'schema_json' key whose value is the JSON-LD object."
    )
}

pub fn anomaly_analysis(page_metrics: &str, competitor_context: &str, recent_changes: &str) -> String {
    format!(
        "You are an SEO analyst investigating a performance anomaly.\n\
         Page Metrics:\n{page_metrics}\n\
         Competitor Context:\n{competitor_context}\n\
         Recent Changes:\n{recent_changes}\n\n\
         List the likely causes and the actions you recommend next. \
         Return JSON with keys 'likely_causes' and 'recommended_actions', both lists of strings."
    )
}

/// Appended to every structured prompt.
pub fn schema_hint(schema: &str) -> String {
    format!("\n\nThe response must be a single JSON document matching this JSON schema:\n{schema}")
}
