//! Node-transition driver (spec §4.1): walks the state machine edges,
//! wrapping each node in the documented timeout/retry/circuit-breaker
//! envelope and streaming [`Event`]s over a bounded channel.

use crate::config::WorkflowConfig;
use crate::data::WorkflowState;
use crate::error::{EngineError, EngineResult};
use crate::orchestrator::breaker::CircuitBreaker;
use crate::orchestrator::events::{Event, FinalResult};
use crate::orchestrator::nodes::{self, NodeDeps};
use crate::ports::Filters;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One request to the orchestrator (spec §4.1 contract: `process(request)`).
pub struct Request {
    pub request_id: String,
    pub query: String,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub attached_documents: Vec<String>,
    pub filters: Filters,
    pub top_k: usize,
}

type NodeFuture<'r> = Pin<Box<dyn Future<Output = EngineResult<()>> + Send + 'r>>;

pub struct Driver {
    deps: Arc<NodeDeps>,
    config: WorkflowConfig,
    breakers: HashMap<&'static str, CircuitBreaker>,
}

const RETRIABLE_STAGES: &[&str] = &["load_context", "classify", "retrieve", "document_attach_path", "direct_answer", "answer_synthesize", "persist"];

impl Driver {
    pub fn new(deps: Arc<NodeDeps>, config: WorkflowConfig) -> Self {
        let breakers = RETRIABLE_STAGES.iter().map(|stage| (*stage, CircuitBreaker::new(config.breaker_threshold, config.breaker_cooldown()))).collect();
        Self { deps, config, breakers }
    }

    /// Run one request to completion, streaming progress events through
    /// `events` and returning the final result. Mirrors
    /// `process(request) -> stream<Event> + finalResult` (spec §4.1).
    /// `cancellation` is propagated to every downstream node call (spec
    /// §5): cancelling it aborts the in-flight node and the request
    /// terminates with [`EngineError::Cancelled`].
    pub async fn process(&self, request: Request, events: mpsc::Sender<Event>, cancellation: CancellationToken) -> EngineResult<FinalResult> {
        let started = Instant::now();
        let mut state = WorkflowState::new(request.request_id.clone(), request.query.clone());
        state.attached_documents = request.attached_documents.clone();

        let result = self.run_state_machine(&mut state, &request, &events, &cancellation).await;

        if let Err(e) = &result {
            state.error = Some(e.to_string());
            let _ = events.send(Event::Error { kind: format!("{e:?}"), message: e.to_string() }).await;
            // Cancellation is terminal: no further events follow the error (spec §8 scenario 3).
            if matches!(e, EngineError::Cancelled) {
                return Err(EngineError::Cancelled);
            }
        }

        let final_result = FinalResult {
            response: state.response.clone(),
            results: state.search_results.clone(),
            confidence: state.confidence,
            steps: state.steps.clone(),
            routing_path: state.routing_path.clone(),
            intent: state.intent,
            search_time_ms: 0,
            total_time_ms: started.elapsed().as_millis() as u64,
            suggested_followups: None,
            graph_context: state.graph_context.clone(),
        };
        let _ = events.send(Event::Confidence { score: final_result.confidence }).await;
        let _ = events.send(Event::Complete { final_result: final_result.clone() }).await;
        result?;
        Ok(final_result)
    }

    async fn run_state_machine(&self, state: &mut WorkflowState, request: &Request, events: &mpsc::Sender<Event>, cancellation: &CancellationToken) -> EngineResult<()> {
        let user_id = request.user_id.clone();
        let session_id = request.session_id.clone();
        let deps = &self.deps;

        self.run_node("load_context", events, cancellation, state, |s: &mut WorkflowState| -> NodeFuture<'_> { Box::pin(nodes::load_context(s, deps, user_id.as_deref(), session_id.as_deref())) }).await?;

        self.run_node("classify", events, cancellation, state, |s: &mut WorkflowState| -> NodeFuture<'_> { Box::pin(nodes::classify_node(s, deps)) }).await?;

        let next = nodes::route_after_classify(state);
        match next {
            "document_attach_path" => {
                self.run_node("document_attach_path", events, cancellation, state, |s: &mut WorkflowState| -> NodeFuture<'_> { Box::pin(nodes::document_attach_path(s, deps)) }).await?;
            }
            "direct_answer" => {
                self.run_node("direct_answer", events, cancellation, state, |s: &mut WorkflowState| -> NodeFuture<'_> { Box::pin(nodes::direct_answer(s, deps)) }).await?;
                self.run_node("quality_check", events, cancellation, state, |s: &mut WorkflowState| -> NodeFuture<'_> { Box::pin(nodes::quality_check(s, deps)) }).await?;
            }
            "clarify" => {
                self.run_node("clarify", events, cancellation, state, |s: &mut WorkflowState| -> NodeFuture<'_> { Box::pin(nodes::clarify(s, deps)) }).await?;
            }
            "analyze_or_summarize" | "retrieve" => {
                let filters = request.filters.clone();
                let top_k = request.top_k;
                self.run_node("retrieve", events, cancellation, state, move |s: &mut WorkflowState| -> NodeFuture<'_> { Box::pin(nodes::retrieve(s, deps, filters.clone(), top_k)) }).await?;
                let _ = events.send(Event::PartialResults { docs: state.search_results.clone() }).await;
                nodes::explain(state, deps);
                if let Some(graph) = &state.graph_context {
                    let _ = events.send(Event::Graph { nodes: graph.nodes.clone(), links: graph.links.clone() }).await;
                }
                self.run_node("answer_synthesize", events, cancellation, state, |s: &mut WorkflowState| -> NodeFuture<'_> { Box::pin(nodes::answer_synthesize(s, deps)) }).await?;

                // Open Question #1 (spec §13): one retry of retrieve+synthesize,
                // query unmutated, when confidence is below threshold.
                if state.confidence < self.config.quality_check_min_confidence {
                    let filters = request.filters.clone();
                    let top_k = request.top_k;
                    self.run_node("retrieve", events, cancellation, state, move |s: &mut WorkflowState| -> NodeFuture<'_> { Box::pin(nodes::retrieve(s, deps, filters.clone(), top_k)) }).await?;
                    self.run_node("answer_synthesize", events, cancellation, state, |s: &mut WorkflowState| -> NodeFuture<'_> { Box::pin(nodes::answer_synthesize(s, deps)) }).await?;
                }
            }
            _ => unreachable!("route_after_classify returned an unknown node name"),
        }

        if !state.response.is_empty() {
            let _ = events.send(Event::AnswerChunk { text: state.response.clone() }).await;
        }

        self.run_node("persist", events, cancellation, state, |s: &mut WorkflowState| -> NodeFuture<'_> { Box::pin(nodes::persist(s, deps, user_id.as_deref(), session_id.as_deref())) }).await?;
        Ok(())
    }

    /// Per-node timeout + retry-with-exponential-backoff + circuit breaker
    /// (spec §4.1 "Failure semantics"): 2 retries at 1s/2s/4s backoff, a
    /// 20s default node timeout, breaker trips after
    /// `breaker_threshold` consecutive failures and cools down for
    /// `breaker_cooldown_ms`.
    async fn run_node(
        &self,
        stage: &'static str,
        events: &mpsc::Sender<Event>,
        cancellation: &CancellationToken,
        state: &mut WorkflowState,
        call: impl for<'r> Fn(&'r mut WorkflowState) -> NodeFuture<'r>,
    ) -> EngineResult<()> {
        if cancellation.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        if let Some(breaker) = self.breakers.get(stage) {
            if breaker.is_open() {
                return Err(EngineError::Unavailable(format!("{stage} circuit breaker is open")));
            }
        }

        let mut attempt: u32 = 0;
        loop {
            let _ = events.send(Event::Step { stage: stage.to_string(), action: "started".to_string(), details: None }).await;

            let result = tokio::select! {
                biased;
                _ = cancellation.cancelled() => Err(EngineError::Cancelled),
                outcome = tokio::time::timeout(self.config.node_timeout(), call(state)) => match outcome {
                    Ok(inner) => inner,
                    Err(_) => Err(EngineError::Timeout(self.config.node_timeout())),
                },
            };

            match result {
                Ok(()) => {
                    if let Some(breaker) = self.breakers.get(stage) {
                        breaker.record_success();
                    }
                    return Ok(());
                }
                Err(EngineError::Cancelled) => {
                    return Err(EngineError::Cancelled);
                }
                Err(e) if e.retriable() && attempt < self.config.retries => {
                    if let Some(breaker) = self.breakers.get(stage) {
                        breaker.record_failure();
                    }
                    let backoff = Duration::from_secs(1u64 << attempt);
                    tracing::warn!(stage, attempt, "node failed, retrying after {backoff:?}: {e}");
                    tokio::select! {
                        _ = cancellation.cancelled() => return Err(EngineError::Cancelled),
                        _ = tokio::time::sleep(backoff) => {}
                    }
                    attempt += 1;
                }
                Err(e) => {
                    if let Some(breaker) = self.breakers.get(stage) {
                        breaker.record_failure();
                    }
                    return Err(e);
                }
            }
        }
    }
}
