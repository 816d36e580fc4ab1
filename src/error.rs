use thiserror::Error;

/// A structural problem found while building a graph. The offending edge is dropped and
/// the build carries on.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MalformedGraph {
    #[error("edge {from} -> {to} references unknown node {missing:?}")]
    UnknownEndpoint {
        from: String,
        to: String,
        missing: String,
    },
    #[error("self-loop on node {node:?} is not flagged as allowed")]
    SelfLoop { node: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FlexError {
    #[error(transparent)]
    MalformedGraph(#[from] MalformedGraph),
    #[error("unrecognized feedback shape: {0}")]
    UnrecognizedFeedbackShape(String),
    #[error("explanation for {label:?} unavailable: {reason}")]
    ExplanationFetchFailed { label: String, reason: String },
    #[error("analysis request failed: {0}")]
    AnalysisRequestFailed(String),
}

impl FlexError {
    pub fn analysis(error: &anyhow::Error) -> Self {
        Self::AnalysisRequestFailed(format!("{error:#}"))
    }

    pub fn explanation(label: &str, error: &anyhow::Error) -> Self {
        Self::ExplanationFetchFailed {
            label: label.to_owned(),
            reason: format!("{error:#}"),
        }
    }
}
