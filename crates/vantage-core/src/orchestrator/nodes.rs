//! Orchestrator nodes (spec §4.1): one function per named state-machine
//! node, each taking the shared dependency bundle and mutating
//! [`WorkflowState`] in place.

use crate::attachment::AttachmentPipeline;
use crate::confidence::{score, ConfidenceInputs};
use crate::config::{SearchConfig, WorkflowConfig};
use crate::data::{Intent, ScoredDocument, Session, SessionTurn, TurnRole, WorkflowState};
use crate::error::{EngineError, EngineResult};
use crate::graph::GraphStore;
use crate::memory::MemoryCoordinator;
use crate::orchestrator::classify::classify;
use crate::orchestrator::decompose::{complexity_score, decompose, order_by_dependencies};
use crate::ports::{Embedder, Filters, Llm};
use crate::retrieval::pipeline::{RetrievalPipeline, RetrievalRequest};
use std::sync::Arc;
use uuid::Uuid;

/// Everything a node needs, bundled once by [`crate::orchestrator::driver::Driver`]
/// (stands in for the process-scoped `Services` composition root, spec §9).
pub struct NodeDeps {
    pub memory: Arc<MemoryCoordinator>,
    pub retrieval: Arc<RetrievalPipeline>,
    pub attachment: Arc<AttachmentPipeline>,
    pub llm: Arc<dyn Llm>,
    pub embedder: Arc<dyn Embedder>,
    pub graph: Arc<GraphStore>,
    pub search_config: SearchConfig,
    pub workflow_config: WorkflowConfig,
}

pub async fn load_context(state: &mut WorkflowState, deps: &NodeDeps, user_id: Option<&str>, session_id: Option<&str>) -> EngineResult<()> {
    let query_embedding = deps.embedder.embed(&state.query).await?;
    let context = deps.memory.load_context(user_id, session_id, &query_embedding, "strategy").await?;

    if context.degraded {
        state.mark_degraded("session store unavailable, used process-local fallback");
    }
    state.session_context = session_id.map(|id| {
        let mut session = Session::new(id.to_string(), user_id.map(String::from), context.session_turns.len().max(1));
        for turn in context.session_turns {
            session.push_turn(turn);
        }
        session
    });
    state.user_preferences = Some(crate::data::UserPreferences {
        preferred_strategy: context.procedural_preferences.iter().find(|p| p.data_key.starts_with("strategy:")).map(|p| p.data_key.trim_start_matches("strategy:").to_string()),
        should_rerank: true,
        topic_weights: context.topic_preferences,
    });
    state.record_step("load_context", "loaded", None);
    Ok(())
}

pub async fn classify_node(state: &mut WorkflowState, deps: &NodeDeps) -> EngineResult<()> {
    if state.query.is_empty() || state.query.chars().count() > 1000 {
        return Err(EngineError::input_invalid("query must be 1..=1000 characters"));
    }
    let result = classify(deps.llm.as_ref(), &state.query).await;
    state.intent = Some(result.intent);
    state.classification_confidence = result.confidence;
    state.record_step("classify", "classified", Some(format!("{:?}", result.intent)));
    Ok(())
}

/// Which node `classify` routes to next (spec §4.1 "State machine").
pub fn route_after_classify(state: &WorkflowState) -> &'static str {
    if !state.attached_documents.is_empty() {
        return "document_attach_path";
    }
    match state.intent {
        Some(Intent::GeneralKnowledge) => "direct_answer",
        Some(Intent::ClarificationNeeded) => "clarify",
        Some(Intent::Summarization) | Some(Intent::Analysis) | Some(Intent::Comparison) => "analyze_or_summarize",
        _ => "retrieve",
    }
}

pub async fn retrieve(state: &mut WorkflowState, deps: &NodeDeps, filters: Filters, top_k: usize) -> EngineResult<()> {
    let complexity = complexity_score(&state.query);
    if complexity >= deps.workflow_config.complexity_decompose_threshold {
        let subqueries = decompose(deps.llm.as_ref(), &state.query, deps.workflow_config.max_decomposed_subqueries).await;
        if !subqueries.is_empty() {
            let ordered = order_by_dependencies(subqueries);
            let mut merged: Vec<ScoredDocument> = Vec::new();
            for sub in ordered {
                let request = RetrievalRequest { query: sub.query, filters: filters.clone(), top_k, strategy: None, entity_names: state.extracted_entities.clone() };
                if let Ok(outcome) = deps.retrieval.retrieve(request).await {
                    merged.extend(outcome.results);
                }
            }
            merged.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
            merged.truncate(top_k);
            state.search_results = merged;
            state.record_step("retrieve", "decomposed", Some(format!("complexity={complexity}")));
            return Ok(());
        }
        // JSON parsing failed: fall back to the single-query path below.
    }

    let request = RetrievalRequest { query: state.query.clone(), filters, top_k, strategy: None, entity_names: state.extracted_entities.clone() };
    let outcome = deps.retrieval.retrieve(request).await?;
    if outcome.degraded {
        state.mark_degraded("retrieval fell back to a single-source search");
    }
    state.search_results = outcome.results;
    state.record_step("retrieve", "searched", Some(format!("{} results", state.search_results.len())));
    Ok(())
}

pub fn explain(state: &mut WorkflowState, deps: &NodeDeps) {
    if state.extracted_entities.is_empty() {
        return;
    }
    let expansion = crate::graph::expand(&deps.graph, &state.extracted_entities, deps.search_config.graph_max_hops as u32);
    state.graph_context = Some(crate::data::GraphContext {
        nodes: expansion.original.iter().chain(expansion.expanded.iter()).map(|id| (id.clone(), id.clone(), "entity".to_string())).collect(),
        links: expansion.paths,
        related_document_ids: expansion.related_document_ids,
    });
    state.record_step("explain", "graph_expanded", None);
}

pub async fn document_attach_path(state: &mut WorkflowState, deps: &NodeDeps) -> EngineResult<()> {
    let answer = deps.attachment.answer_with_attachments(&state.query, &state.attached_documents).await?;
    state.response = answer.answer;
    state.confidence = answer.confidence;
    state.steps.extend(answer.steps);
    state.record_step("document_attach_path", "answered", None);
    Ok(())
}

pub async fn direct_answer(state: &mut WorkflowState, deps: &NodeDeps) -> EngineResult<()> {
    let response = deps.llm.generate(&state.query, 0.3, 1024).await?;
    state.response = response;
    state.record_step("direct_answer", "generated", None);
    Ok(())
}

pub async fn clarify(state: &mut WorkflowState, _deps: &NodeDeps) -> EngineResult<()> {
    state.response = format!("Could you clarify what you mean by \"{}\"?", state.query);
    state.confidence = 0.5;
    state.record_step("clarify", "asked_for_clarification", None);
    Ok(())
}

pub async fn quality_check(state: &mut WorkflowState, deps: &NodeDeps) -> EngineResult<()> {
    let top_source_score = state.search_results.first().map(|d| d.score as f64).unwrap_or(0.0);
    let inputs = ConfidenceInputs { answer: &state.response, source_count: state.search_results.len(), top_source_score, retrieval_quality: None };
    state.confidence = score(&inputs);
    if state.confidence < deps.workflow_config.quality_check_min_confidence {
        state.mark_degraded("answer confidence below the configured quality threshold");
    }
    state.record_step("quality_check", "scored", Some(format!("{:.2}", state.confidence)));
    Ok(())
}

pub async fn answer_synthesize(state: &mut WorkflowState, deps: &NodeDeps) -> EngineResult<()> {
    if state.search_results.is_empty() {
        state.response = "I couldn't find any relevant documents for that query.".to_string();
    } else {
        let context: String = state
            .search_results
            .iter()
            .map(|r| format!("[{}] {}", r.document.filename, r.document.detailed_summary))
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = format!("Answer the question using the documents below, citing filenames.\n\nQuestion: {}\n\nDocuments:\n{context}", state.query);
        state.response = deps.llm.generate(&prompt, 0.3, 1024).await?;
    }
    let top_source_score = state.search_results.first().map(|d| d.score as f64).unwrap_or(0.0);
    let inputs = ConfidenceInputs { answer: &state.response, source_count: state.search_results.len(), top_source_score, retrieval_quality: None };
    state.confidence = score(&inputs);
    state.record_step("answer_synthesize", "synthesized", None);
    Ok(())
}

pub async fn persist(state: &mut WorkflowState, deps: &NodeDeps, user_id: Option<&str>, session_id: Option<&str>) -> EngineResult<()> {
    let user_turn = SessionTurn { role: TurnRole::User, content: state.query.clone(), timestamp: chrono::Utc::now(), sources: None, confidence: None };
    let assistant_turn =
        SessionTurn { role: TurnRole::Assistant, content: state.response.clone(), timestamp: chrono::Utc::now(), sources: Some(state.search_results.iter().map(|r| r.document.id.clone()).collect()), confidence: Some(state.confidence) };

    if let Some(session_id) = session_id {
        deps.memory.push_turn(session_id, user_id, user_turn).await;
        deps.memory.push_turn(session_id, user_id, assistant_turn).await;
    }

    let query_embedding = deps.embedder.embed(&state.query).await.unwrap_or_default();
    let episode = crate::data::Episode::new(
        Uuid::new_v4().to_string(),
        user_id.map(String::from),
        state.query.clone(),
        query_embedding,
        state.response.clone(),
        state.search_results.iter().map(|r| r.document.id.clone()).collect(),
        state.confidence,
    );
    deps.memory.record(user_id, None, None, &episode, None).await?;
    state.record_step("persist", "stored", None);
    Ok(())
}
