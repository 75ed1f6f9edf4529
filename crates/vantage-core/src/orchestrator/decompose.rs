//! Complex-query decomposition (spec §4.1 "Complex-query decomposition").

use crate::ports::{JsonSchemaRequest, Llm};
use serde::Deserialize;

const COMPLEXITY_CUE_PHRASES: &[&str] = &["as well as", "in addition", "compared to", "both", "either", "not only"];
const DECOMPOSE_SCHEMA: &str = "orchestrator_decompose_v1";

/// Heuristic complexity score: cue phrases + question marks + `and`
/// conjunctions (spec §4.1).
pub fn complexity_score(query: &str) -> usize {
    let lower = query.to_lowercase();
    let cue_hits = COMPLEXITY_CUE_PHRASES.iter().filter(|phrase| lower.contains(**phrase)).count();
    let question_marks = query.matches('?').count();
    let and_conjunctions = lower.split_whitespace().filter(|w| *w == "and").count();
    cue_hits + question_marks + and_conjunctions
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubQuery {
    pub id: String,
    pub query: String,
    pub purpose: String,
    pub priority: u32,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// Decompose `query` into at most `max_subqueries` sub-queries via a
/// strict JSON list schema; on parse failure, the caller should fall back
/// to the single-query path (empty result signals that).
pub async fn decompose(llm: &dyn Llm, query: &str, max_subqueries: usize) -> Vec<SubQuery> {
    let prompt = format!(
        "Decompose this complex query into at most {max_subqueries} independent \
         sub-queries. Respond with a strict JSON array of \
         {{id, query, purpose, priority, dependencies?}}.\n\nQuery: {query}"
    );
    let request = JsonSchemaRequest { prompt, schema_name: DECOMPOSE_SCHEMA, temperature: 0.2, max_tokens: 1024 };

    let raw = match llm.generate_json(request).await {
        Ok(raw) => raw,
        Err(_) => return Vec::new(),
    };

    let mut subqueries: Vec<SubQuery> = serde_json::from_str(&raw).unwrap_or_default();
    subqueries.truncate(max_subqueries);
    subqueries.sort_by_key(|s| s.priority);
    subqueries
}

/// Order sub-queries so dependencies run before dependents, keeping
/// priority as the tie-break within each wave (a simple topological pass
/// since the schema only expects shallow dependency chains).
pub fn order_by_dependencies(mut subqueries: Vec<SubQuery>) -> Vec<SubQuery> {
    let mut ordered = Vec::with_capacity(subqueries.len());
    let mut placed: std::collections::HashSet<String> = std::collections::HashSet::new();

    while !subqueries.is_empty() {
        let (ready, rest): (Vec<_>, Vec<_>) = subqueries.into_iter().partition(|s| s.dependencies.iter().all(|d| placed.contains(d)));
        if ready.is_empty() {
            // Circular or unresolved dependency: drain the rest in priority order rather than looping forever.
            ordered.extend(rest);
            break;
        }
        for sub in &ready {
            placed.insert(sub.id.clone());
        }
        ordered.extend(ready);
        subqueries = rest;
    }
    ordered
}
