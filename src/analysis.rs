use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::{AnalysisBackend, AnalyzeRequest, ExplanationBackend};
use crate::config::LayoutConfig;
use crate::dispatch::Dispatch;
use crate::error::{FlexError, MalformedGraph};
use crate::explain::{ExplanationCache, ExplanationEntry};
use crate::graph::{Graph, GraphNode};
use crate::layout::{Layout, LayoutStats, layout};
use crate::normalize::{Feedback, NormalizedAnalysis, normalize_analysis};
use crate::util::truncate_chars;

const HISTORY_LIMIT: usize = 32;
const PREVIEW_CHARS: usize = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    Submitting,
    Success,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted(u64),
    Ignored,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HistoryOutcome {
    Succeeded { nodes: usize, faulty: usize },
    Failed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    pub generation: u64,
    pub code_preview: String,
    pub intent: String,
    pub outcome: HistoryOutcome,
}

enum Message {
    Analyzed {
        generation: u64,
        result: Result<Value, FlexError>,
    },
    LaidOut {
        generation: u64,
        layout: Layout,
    },
}

/// Network results and layout runs are tagged with the generation that started them;
/// `poll` drops any whose generation is no longer current.
pub struct AnalysisController {
    backend: Arc<dyn AnalysisBackend>,
    dispatch: Arc<dyn Dispatch>,
    layout_config: LayoutConfig,
    explanations: ExplanationCache,
    state: RequestState,
    generation: u64,
    last_request: Option<AnalyzeRequest>,
    graph: Option<Graph>,
    layout_pending: bool,
    layout_stats: Option<LayoutStats>,
    graph_issues: Vec<MalformedGraph>,
    feedback: Option<Feedback>,
    feedback_issue: Option<FlexError>,
    last_error: Option<FlexError>,
    selected: Option<String>,
    history: VecDeque<HistoryEntry>,
    tx: Sender<Message>,
    rx: Receiver<Message>,
}

impl AnalysisController {
    pub fn new(
        backend: Arc<dyn AnalysisBackend>,
        explainer: Arc<dyn ExplanationBackend>,
        dispatch: Arc<dyn Dispatch>,
        layout_config: LayoutConfig,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            explanations: ExplanationCache::new(explainer, Arc::clone(&dispatch)),
            backend,
            dispatch,
            layout_config,
            state: RequestState::Idle,
            generation: 0,
            last_request: None,
            graph: None,
            layout_pending: false,
            layout_stats: None,
            graph_issues: Vec::new(),
            feedback: None,
            feedback_issue: None,
            last_error: None,
            selected: None,
            history: VecDeque::new(),
            tx,
            rx,
        }
    }

    pub fn submit(&mut self, code: impl Into<String>, intent: impl Into<String>) -> SubmitOutcome {
        if self.state == RequestState::Submitting {
            debug!(generation = self.generation, "submission ignored, one is in flight");
            return SubmitOutcome::Ignored;
        }

        self.generation += 1;
        self.state = RequestState::Submitting;
        self.last_error = None;

        let request = AnalyzeRequest {
            code: code.into(),
            intent: intent.into(),
        };
        self.last_request = Some(request.clone());
        info!(
            generation = self.generation,
            code_bytes = request.code.len(),
            "submitting analysis"
        );

        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        let generation = self.generation;
        self.dispatch.dispatch(Box::new(move || {
            let result = backend
                .analyze(&request)
                .map_err(|error| FlexError::analysis(&error));
            let _ = tx.send(Message::Analyzed { generation, result });
        }));

        SubmitOutcome::Submitted(self.generation)
    }

    pub fn retry(&mut self) -> SubmitOutcome {
        match self.last_request.clone() {
            Some(request) => self.submit(request.code, request.intent),
            None => SubmitOutcome::Ignored,
        }
    }

    pub fn acknowledge(&mut self) {
        if matches!(self.state, RequestState::Success | RequestState::Error) {
            self.state = RequestState::Idle;
        }
    }

    pub fn poll(&mut self) -> bool {
        let mut changed = self.explanations.poll();

        while let Ok(message) = self.rx.try_recv() {
            match message {
                Message::Analyzed { generation, result } => {
                    if generation != self.generation {
                        debug!(generation, current = self.generation, "dropping stale analysis");
                        continue;
                    }
                    match result.and_then(|payload| normalize_analysis(&payload)) {
                        Ok(normalized) => self.accept(normalized),
                        Err(error) => self.fail(error),
                    }
                    changed = true;
                }
                Message::LaidOut { generation, layout } => {
                    if generation != self.generation || !self.layout_pending {
                        debug!(generation, current = self.generation, "dropping stale layout");
                        continue;
                    }
                    self.layout_pending = false;
                    self.layout_stats = Some(layout.stats);
                    self.graph = Some(layout.graph);
                    changed = true;
                }
            }
        }

        changed
    }

    fn accept(&mut self, normalized: NormalizedAnalysis) {
        let NormalizedAnalysis {
            build,
            feedback,
            feedback_issue,
        } = normalized;
        let faulty = build.graph.faulty_nodes().count();
        info!(
            generation = self.generation,
            nodes = build.graph.len(),
            edges = build.graph.edges().len(),
            faulty,
            dropped_edges = build.issues.len(),
            "analysis succeeded"
        );

        self.record(HistoryOutcome::Succeeded {
            nodes: build.graph.len(),
            faulty,
        });
        self.graph = Some(build.graph);
        self.graph_issues = build.issues;
        self.layout_stats = None;
        self.feedback = Some(feedback);
        self.feedback_issue = feedback_issue;
        self.selected = None;
        self.explanations.reset();
        self.state = RequestState::Success;
        self.dispatch_layout();
    }

    fn fail(&mut self, error: FlexError) {
        warn!(generation = self.generation, %error, "analysis failed");
        self.record(HistoryOutcome::Failed(error.to_string()));
        self.last_error = Some(error);
        self.state = RequestState::Error;

        // The kept graph may have lost its layout run to this generation.
        if self.layout_pending {
            self.dispatch_layout();
        }
    }

    fn dispatch_layout(&mut self) {
        let Some(graph) = self.graph.clone() else {
            return;
        };

        self.layout_pending = true;
        let config = self.layout_config;
        let tx = self.tx.clone();
        let generation = self.generation;
        self.dispatch.dispatch(Box::new(move || {
            let layout = layout(&graph, &config);
            let _ = tx.send(Message::LaidOut { generation, layout });
        }));
    }

    fn record(&mut self, outcome: HistoryOutcome) {
        let Some(request) = &self.last_request else {
            return;
        };

        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(HistoryEntry {
            generation: self.generation,
            code_preview: preview(&request.code),
            intent: request.intent.clone(),
            outcome,
        });
    }

    pub fn select_node(&mut self, node_id: &str) -> Option<ExplanationEntry> {
        let label = self.graph.as_ref()?.node(node_id)?.label.clone();
        self.selected = Some(node_id.to_owned());
        Some(self.explanations.request(&label))
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected_node(&self) -> Option<&GraphNode> {
        let selected = self.selected.as_deref()?;
        self.graph.as_ref()?.node(selected)
    }

    pub fn selected_explanation(&self) -> Option<&ExplanationEntry> {
        let node = self.selected_node()?;
        self.explanations.get(&node.label)
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn graph(&self) -> Option<&Graph> {
        self.graph.as_ref()
    }

    pub fn is_layout_pending(&self) -> bool {
        self.layout_pending
    }

    pub fn layout_stats(&self) -> Option<&LayoutStats> {
        self.layout_stats.as_ref()
    }

    pub fn graph_issues(&self) -> &[MalformedGraph] {
        &self.graph_issues
    }

    pub fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref()
    }

    pub fn feedback_issue(&self) -> Option<&FlexError> {
        self.feedback_issue.as_ref()
    }

    pub fn last_error(&self) -> Option<&FlexError> {
        self.last_error.as_ref()
    }

    pub fn history(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> {
        self.history.iter()
    }

    pub fn explanations(&self) -> &ExplanationCache {
        &self.explanations
    }
}

fn preview(code: &str) -> String {
    let first_line = code.lines().find(|line| !line.trim().is_empty()).unwrap_or("");
    truncate_chars(first_line.trim(), PREVIEW_CHARS)
}
