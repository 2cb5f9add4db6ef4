use std::sync::Arc;

/// Turns a failing candidate into the prompt for the next model call.
pub type RepairStrategy = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Ask the model to restate its previous answer as schema-valid JSON.
pub fn default_repair_prompt(previous_output: &str) -> String {
    format!(
        "The previous response failed validation. \
         Return ONLY valid JSON that matches the requested schema, with no commentary or code fences. \
         Previous response was:\n{previous_output}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repair_prompt_embeds_previous_output_verbatim() {
        let previous = "Sure! Here are your FAQs:\n{\"faqs\": [";
        let prompt = default_repair_prompt(previous);
        assert!(prompt.contains(previous));
        assert!(prompt.contains("Return ONLY valid JSON"));
        assert!(prompt.ends_with(previous));
    }
}
