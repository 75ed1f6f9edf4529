//! Summarization stage (spec §4.3 stage 5): strict-JSON LLM call with a
//! greedy brace-matching fallback and a truncated-text last resort.

use crate::config::LlmConfig;
use crate::ports::{JsonSchemaRequest, Llm};
use serde::Deserialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Deserialize)]
struct RawSummary {
    summary: String,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    entities: Vec<String>,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default = "default_document_type")]
    document_type: String,
}

fn default_document_type() -> String {
    "other".to_string()
}

/// Parsed summarization output, flattened into the shapes the graph-update
/// and document stages need.
#[derive(Debug, Clone)]
pub struct SummaryResult {
    pub summary: String,
    pub keywords: BTreeSet<String>,
    pub entities: Vec<String>,
    pub topics: BTreeSet<String>,
    pub document_type: String,
    /// Set when parsing the LLM's JSON response failed and a fallback
    /// summary had to be used (spec §4.3 stage 5).
    pub partial_index: bool,
}

const SUMMARIZE_SCHEMA: &str = "ingest_summarize_v1";

pub async fn summarize(llm: &dyn Llm, content: &str, config: &LlmConfig) -> SummaryResult {
    let prompt = format!(
        "Summarize the following document. Respond with strict JSON matching \
         {{summary: string, keywords: string[5..10], entities: string[], topics: string[5..10], \
         document_type: string, relationships?: object[]}}.\n\nDocument:\n{content}"
    );
    let request = JsonSchemaRequest {
        prompt,
        schema_name: SUMMARIZE_SCHEMA,
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    };

    let raw = match llm.generate_json(request).await {
        Ok(raw) => raw,
        Err(_) => return fallback_summary(content),
    };

    parse_summary(&raw).unwrap_or_else(|| fallback_summary(content))
}

fn parse_summary(raw: &str) -> Option<SummaryResult> {
    if let Ok(parsed) = serde_json::from_str::<RawSummary>(raw) {
        return Some(into_result(parsed, false));
    }
    // Greedy brace-matching: take the substring from the first `{` to the
    // last `}` and retry, in case the model wrapped the JSON in prose.
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<RawSummary>(&raw[start..=end]).ok().map(|parsed| into_result(parsed, false))
}

fn into_result(raw: RawSummary, partial_index: bool) -> SummaryResult {
    SummaryResult {
        summary: raw.summary,
        keywords: raw.keywords.into_iter().collect(),
        entities: raw.entities,
        topics: raw.topics.into_iter().collect(),
        document_type: raw.document_type,
        partial_index,
    }
}

fn fallback_summary(content: &str) -> SummaryResult {
    let truncated: String = content.chars().take(500).collect();
    SummaryResult {
        summary: truncated,
        keywords: BTreeSet::new(),
        entities: Vec::new(),
        topics: BTreeSet::new(),
        document_type: "other".to_string(),
        partial_index: true,
    }
}
