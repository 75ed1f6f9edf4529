//! Two-stage query classification (spec §4.1 "Routing rules"): a
//! deterministic keyword pass, falling back to the LLM with a strict
//! JSON schema when the keyword pass isn't confident enough.

use crate::data::Intent;
use crate::ports::{JsonSchemaRequest, Llm};
use serde::Deserialize;

const LLM_CONFIDENCE_THRESHOLD: f64 = 0.8;
const CLASSIFY_SCHEMA: &str = "orchestrator_classify_v1";

#[derive(Debug, Clone)]
pub struct Classification {
    pub intent: Intent,
    pub confidence: f64,
}

/// Deterministic rules in the exact tie-break order spec §4.1 documents:
/// the first matching rule wins.
fn classify_by_keywords(query: &str) -> Classification {
    let lower = query.to_lowercase();
    let has_possessive = lower.contains("my ") || lower.contains("our ");

    if contains_any(&lower, &["image", "photo", "picture", "screenshot"]) {
        return Classification { intent: Intent::DocumentSearch, confidence: 0.95 };
    }
    if contains_any(&lower, &["compare", "versus", " vs ", "difference between"]) {
        return Classification { intent: Intent::Comparison, confidence: 0.85 };
    }
    if contains_any(&lower, &["summarize", "summary of", "tl;dr", "give me a summary"]) {
        return Classification { intent: Intent::Summarization, confidence: 0.85 };
    }
    if has_possessive && contains_any(&lower, &["document", "file", "doc", "report", "notes"]) {
        return Classification { intent: Intent::DocumentSearch, confidence: 0.85 };
    }
    if !has_possessive && (lower.starts_with("what is") || lower.starts_with("what's") || lower.starts_with("how does")) {
        return Classification { intent: Intent::GeneralKnowledge, confidence: 0.85 };
    }
    Classification { intent: Intent::DocumentSearch, confidence: 0.6 }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

#[derive(Debug, Deserialize)]
struct LlmClassification {
    intent: String,
    confidence: f64,
}

fn parse_intent(raw: &str) -> Option<Intent> {
    match raw.to_uppercase().as_str() {
        "DOCUMENT_SEARCH" => Some(Intent::DocumentSearch),
        "GENERAL_KNOWLEDGE" => Some(Intent::GeneralKnowledge),
        "SYSTEM_META" => Some(Intent::SystemMeta),
        "COMPARISON" => Some(Intent::Comparison),
        "SUMMARIZATION" => Some(Intent::Summarization),
        "ANALYSIS" => Some(Intent::Analysis),
        "CLARIFICATION_NEEDED" => Some(Intent::ClarificationNeeded),
        _ => None,
    }
}

/// Classify `query`: keyword rules first, deferring to the LLM only when
/// the keyword confidence is below [`LLM_CONFIDENCE_THRESHOLD`].
pub async fn classify(llm: &dyn Llm, query: &str) -> Classification {
    let keyword_result = classify_by_keywords(query);
    if keyword_result.confidence >= LLM_CONFIDENCE_THRESHOLD {
        return keyword_result;
    }

    let prompt = format!(
        "Classify the user query's intent. Respond with strict JSON \
         {{intent: one of DOCUMENT_SEARCH|GENERAL_KNOWLEDGE|SYSTEM_META|COMPARISON|SUMMARIZATION|ANALYSIS|CLARIFICATION_NEEDED, \
         confidence: number 0..1}}.\n\nQuery: {query}"
    );
    let request = JsonSchemaRequest { prompt, schema_name: CLASSIFY_SCHEMA, temperature: 0.0, max_tokens: 128 };

    match llm.generate_json(request).await {
        Ok(raw) => match serde_json::from_str::<LlmClassification>(&raw).ok().and_then(|parsed| parse_intent(&parsed.intent).map(|intent| (intent, parsed.confidence))) {
            Some((intent, confidence)) => Classification { intent, confidence },
            None => keyword_result,
        },
        Err(_) => keyword_result,
    }
}
