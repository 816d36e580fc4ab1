use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

use tracing::{debug, info, warn};

use crate::client::ExplanationBackend;
use crate::dispatch::Dispatch;
use crate::error::FlexError;
use crate::normalize::{Explanation, normalize_explanation};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExplanationState {
    Pending,
    Ready(Explanation),
    Failed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExplanationEntry {
    pub label: String,
    pub state: ExplanationState,
}

impl ExplanationEntry {
    fn pending(label: &str) -> Self {
        Self {
            label: label.to_owned(),
            state: ExplanationState::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, ExplanationState::Pending)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, ExplanationState::Failed(_))
    }

    pub fn value(&self) -> Option<&Explanation> {
        match &self.state {
            ExplanationState::Ready(explanation) => Some(explanation),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            ExplanationState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

struct Completion {
    epoch: u64,
    label: String,
    result: Result<Explanation, FlexError>,
}

/// Completions carry the epoch they were issued under; `reset` starts a new epoch, so
/// answers meant for a previous graph are dropped by `poll`.
pub struct ExplanationCache {
    backend: Arc<dyn ExplanationBackend>,
    dispatch: Arc<dyn Dispatch>,
    entries: HashMap<String, ExplanationEntry>,
    epoch: u64,
    fetches_issued: u64,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
}

impl ExplanationCache {
    pub fn new(backend: Arc<dyn ExplanationBackend>, dispatch: Arc<dyn Dispatch>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            backend,
            dispatch,
            entries: HashMap::new(),
            epoch: 0,
            fetches_issued: 0,
            tx,
            rx,
        }
    }

    pub fn request(&mut self, label: &str) -> ExplanationEntry {
        if let Some(entry) = self.entries.get(label)
            && !entry.is_failed()
        {
            return entry.clone();
        }

        if label.trim().is_empty() {
            let entry = ExplanationEntry {
                label: label.to_owned(),
                state: ExplanationState::Failed("node has no label to explain".to_owned()),
            };
            self.entries.insert(label.to_owned(), entry.clone());
            return entry;
        }

        let entry = ExplanationEntry::pending(label);
        self.entries.insert(label.to_owned(), entry.clone());
        self.fetches_issued += 1;
        debug!(label, epoch = self.epoch, "fetching explanation");

        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        let epoch = self.epoch;
        let label = label.to_owned();
        self.dispatch.dispatch(Box::new(move || {
            let result = backend
                .explain(&label)
                .and_then(|payload| normalize_explanation(&payload))
                .map_err(|error| FlexError::explanation(&label, &error));
            let _ = tx.send(Completion {
                epoch,
                label,
                result,
            });
        }));

        entry
    }

    pub fn poll(&mut self) -> bool {
        let mut changed = false;

        while let Ok(completion) = self.rx.try_recv() {
            if completion.epoch != self.epoch {
                debug!(
                    label = %completion.label,
                    epoch = completion.epoch,
                    "dropping explanation from a previous analysis"
                );
                continue;
            }

            let Some(entry) = self.entries.get_mut(&completion.label) else {
                continue;
            };
            if !entry.is_pending() {
                continue;
            }

            entry.state = match completion.result {
                Ok(explanation) => {
                    debug!(label = %completion.label, "explanation ready");
                    ExplanationState::Ready(explanation)
                }
                Err(error) => {
                    warn!(%error, "explanation lookup failed");
                    ExplanationState::Failed(error.to_string())
                }
            };
            changed = true;
        }

        changed
    }

    pub fn reset(&mut self) {
        self.epoch += 1;
        if !self.entries.is_empty() {
            info!(
                discarded = self.entries.len(),
                epoch = self.epoch,
                "explanation cache reset"
            );
        }
        self.entries.clear();
    }

    pub fn get(&self, label: &str) -> Option<&ExplanationEntry> {
        self.entries.get(label)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn in_flight(&self) -> usize {
        self.entries.values().filter(|entry| entry.is_pending()).count()
    }

    pub fn fetches_issued(&self) -> u64 {
        self.fetches_issued
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::FakeExplainer;
    use crate::dispatch::testing::ManualDispatch;

    fn cache_with(explainer: FakeExplainer) -> (ExplanationCache, Arc<FakeExplainer>, Arc<ManualDispatch>) {
        let explainer = Arc::new(explainer);
        let dispatch = Arc::new(ManualDispatch::default());
        let cache = ExplanationCache::new(explainer.clone(), dispatch.clone());
        (cache, explainer, dispatch)
    }

    #[test]
    fn rapid_requests_for_one_label_coalesce() {
        let (mut cache, explainer, dispatch) = cache_with(FakeExplainer::default());

        let first = cache.request("Move Up");
        let second = cache.request("Move Up");

        assert!(first.is_pending());
        assert_eq!(first, second);
        assert_eq!(dispatch.pending(), 1);
        assert_eq!(cache.fetches_issued(), 1);

        dispatch.run_all();
        assert!(cache.poll());

        let ready = cache.request("Move Up");
        assert_eq!(
            ready.value(),
            Some(&Explanation::plain("Move Up explained"))
        );
        assert_eq!(cache.get("Move Up"), Some(&ready));
        assert_eq!(explainer.calls(), vec!["Move Up"]);
        assert_eq!(dispatch.pending(), 0);
    }

    #[test]
    fn different_labels_fetch_concurrently() {
        let (mut cache, _explainer, dispatch) = cache_with(FakeExplainer::default());

        cache.request("Insert");
        cache.request("Swap");

        assert_eq!(dispatch.pending(), 2);
        assert_eq!(cache.in_flight(), 2);

        dispatch.run_next();
        cache.poll();
        assert!(cache.get("Insert").unwrap().value().is_some());
        assert!(cache.get("Swap").unwrap().is_pending());
    }

    #[test]
    fn failures_stay_with_their_label() {
        let (mut cache, explainer, dispatch) = cache_with(FakeExplainer::failing_on(&["Swap"]));

        cache.request("Insert");
        cache.request("Swap");
        dispatch.run_all();
        cache.poll();

        assert!(cache.get("Insert").unwrap().value().is_some());
        let failed = cache.get("Swap").unwrap();
        assert!(failed.error().unwrap().contains("503 Service Unavailable"));

        let retry = cache.request("Swap");
        assert!(retry.is_pending());
        assert_eq!(dispatch.pending(), 1);
        assert_eq!(cache.fetches_issued(), 3);

        dispatch.run_all();
        cache.poll();
        assert_eq!(explainer.calls(), vec!["Insert", "Swap", "Swap"]);
        assert!(cache.get("Swap").unwrap().is_failed());
        assert!(cache.get("Insert").unwrap().value().is_some());
    }

    #[test]
    fn reset_discards_entries_and_late_answers() {
        let (mut cache, explainer, dispatch) = cache_with(FakeExplainer::default());

        cache.request("Insert");
        cache.reset();
        assert!(cache.is_empty());

        dispatch.run_all();
        assert!(!cache.poll());
        assert!(cache.get("Insert").is_none());

        let fresh = cache.request("Insert");
        assert!(fresh.is_pending());
        dispatch.run_all();
        cache.poll();
        assert!(cache.get("Insert").unwrap().value().is_some());
        assert_eq!(explainer.calls().len(), 2);
    }

    #[test]
    fn blank_labels_are_not_fetched() {
        let (mut cache, explainer, dispatch) = cache_with(FakeExplainer::default());

        let entry = cache.request("  ");

        assert!(entry.is_failed());
        assert_eq!(dispatch.pending(), 0);
        assert!(explainer.calls().is_empty());
        assert_eq!(cache.fetches_issued(), 0);
    }
}
