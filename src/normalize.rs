use anyhow::{Result, anyhow};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::FlexError;
use crate::graph::{Graph, GraphBuild, GraphEdge, NodeSpec};

pub const NO_FEEDBACK: &str = "No feedback available";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Feedback {
    pub summary: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendations: Vec<String>,
}

impl Feedback {
    pub fn placeholder() -> Self {
        Self {
            summary: NO_FEEDBACK.to_owned(),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeedbackShape {
    Legacy {
        explanation: String,
    },
    Structured {
        summary: String,
        strengths: Vec<String>,
        weaknesses: Vec<String>,
        recommendations: Vec<String>,
    },
    Unrecognized(String),
}

impl FeedbackShape {
    pub fn detect(value: Option<&Value>) -> Self {
        let Some(value) = value else {
            return Self::Unrecognized("feedback is missing".to_owned());
        };
        let Some(object) = value.as_object() else {
            return Self::Unrecognized(format!("expected an object, found {}", kind(value)));
        };

        if let Some(explanation) = present(object, "explanation") {
            return Self::Legacy {
                explanation: text_or_json(explanation),
            };
        }

        if let Some(summary) = present(object, "summary") {
            return Self::Structured {
                summary: text_or_json(summary),
                strengths: string_list(object.get("strengths")),
                weaknesses: string_list(object.get("weaknesses")),
                recommendations: string_list(object.get("recommendations")),
            };
        }

        let mut keys = object.keys().map(String::as_str).collect::<Vec<_>>();
        keys.sort_unstable();
        Self::Unrecognized(format!(
            "object has neither `explanation` nor `summary` (keys: [{}])",
            keys.join(", ")
        ))
    }

    pub fn into_feedback(self) -> Result<Feedback, FlexError> {
        match self {
            Self::Legacy { explanation } => Ok(Feedback {
                summary: explanation,
                ..Feedback::default()
            }),
            Self::Structured {
                summary,
                strengths,
                weaknesses,
                recommendations,
            } => Ok(Feedback {
                summary,
                strengths,
                weaknesses,
                recommendations,
            }),
            Self::Unrecognized(reason) => Err(FlexError::UnrecognizedFeedbackShape(reason)),
        }
    }
}

pub fn normalize_feedback(value: Option<&Value>) -> (Feedback, Option<FlexError>) {
    match FeedbackShape::detect(value).into_feedback() {
        Ok(feedback) => (feedback, None),
        Err(error) => {
            warn!(%error, "falling back to placeholder feedback");
            (Feedback::placeholder(), Some(error))
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedAnalysis {
    pub build: GraphBuild,
    pub feedback: Feedback,
    pub feedback_issue: Option<FlexError>,
}

pub fn normalize_analysis(payload: &Value) -> Result<NormalizedAnalysis, FlexError> {
    let object = payload.as_object().ok_or_else(|| {
        FlexError::AnalysisRequestFailed(format!(
            "analysis response was {}, expected an object",
            kind(payload)
        ))
    })?;

    let nodes = array(object, "nodes")
        .iter()
        .filter_map(|raw| {
            let spec = node_spec(raw);
            if spec.is_none() {
                warn!(node = %raw, "skipping node without an id");
            }
            spec
        })
        .collect::<Vec<_>>();

    let edges = array(object, "edges")
        .iter()
        .filter_map(|raw| {
            let edge = edge_spec(raw);
            if edge.is_none() {
                warn!(edge = %raw, "skipping edge without both endpoints");
            }
            edge
        })
        .collect::<Vec<_>>();

    let mut build = Graph::build(nodes, edges);
    for (node_id, message) in faults(object.get("faults")) {
        build.graph = build.graph.with_error(&node_id, Some(&message));
    }

    let (feedback, feedback_issue) = normalize_feedback(object.get("high_level_feedback"));

    Ok(NormalizedAnalysis {
        build,
        feedback,
        feedback_issue,
    })
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Explanation {
    pub description: String,
    pub concepts: Vec<String>,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
}

impl Explanation {
    pub fn plain(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }
}

pub fn normalize_explanation(payload: &Value) -> Result<Explanation> {
    if let Some(error) = payload.get("error").filter(|value| !value.is_null()) {
        return Err(anyhow!("explanation backend reported: {}", text_or_json(error)));
    }

    match payload.get("explanation") {
        Some(Value::String(text)) => Ok(Explanation::plain(text.trim())),
        Some(Value::Object(object)) => {
            let description = present(object, "description")
                .map(|value| text_or_json(value).trim().to_owned())
                .ok_or_else(|| anyhow!("structured explanation has no description"))?;
            Ok(Explanation {
                description,
                concepts: string_list(object.get("concepts")),
                issues: string_list(object.get("issues")),
                suggestions: string_list(object.get("suggestions")),
            })
        }
        Some(other) => Err(anyhow!(
            "explanation was {}, expected a string or an object",
            kind(other)
        )),
        None => Err(anyhow!("response has no explanation")),
    }
}

fn node_spec(raw: &Value) -> Option<NodeSpec> {
    let object = raw.as_object()?;
    let data = object.get("data").and_then(Value::as_object);

    let id = object.get("id").and_then(scalar_text)?;
    if id.is_empty() {
        return None;
    }

    let label = lookup(object, data, "label")
        .and_then(scalar_text)
        .filter(|label| !label.trim().is_empty())
        .unwrap_or_else(|| id.clone());
    let error = lookup(object, data, "error")
        .or_else(|| lookup(object, data, "fault"))
        .and_then(scalar_text);

    Some(NodeSpec { id, label, error })
}

fn edge_spec(raw: &Value) -> Option<GraphEdge> {
    let object = raw.as_object()?;
    let source = object.get("source").and_then(scalar_text)?;
    let target = object.get("target").and_then(scalar_text)?;
    let allow_self_loop = object
        .get("self_loop")
        .or_else(|| object.get("selfLoop"))
        .and_then(Value::as_bool)
        .unwrap_or(false);

    Some(GraphEdge {
        source,
        target,
        allow_self_loop,
    })
}

fn faults(value: Option<&Value>) -> Vec<(String, String)> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| {
                let object = item.as_object()?;
                let node = ["node", "id", "node_id"]
                    .iter()
                    .find_map(|key| object.get(*key).and_then(scalar_text))?;
                let message = ["message", "error"]
                    .iter()
                    .find_map(|key| object.get(*key).and_then(scalar_text))?;
                Some((node, message))
            })
            .collect(),
        Some(Value::Object(map)) => map
            .iter()
            .filter_map(|(node, message)| Some((node.clone(), scalar_text(message)?)))
            .collect(),
        _ => Vec::new(),
    }
}

fn lookup<'a>(
    object: &'a Map<String, Value>,
    data: Option<&'a Map<String, Value>>,
    key: &str,
) -> Option<&'a Value> {
    object
        .get(key)
        .or_else(|| data.and_then(|data| data.get(key)))
}

fn present<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    object.get(key).filter(|value| !value.is_null())
}

fn array<'a>(object: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    object
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn text_or_json(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_owned)
            .collect(),
        Some(Value::String(single)) if !single.trim().is_empty() => vec![single.clone()],
        _ => Vec::new(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::MalformedGraph;

    #[test]
    fn legacy_feedback_becomes_summary() {
        let (feedback, issue) = normalize_feedback(Some(&json!({ "explanation": "ok" })));

        assert_eq!(
            feedback,
            Feedback {
                summary: "ok".to_owned(),
                strengths: Vec::new(),
                weaknesses: Vec::new(),
                recommendations: Vec::new(),
            }
        );
        assert!(issue.is_none());
    }

    #[test]
    fn explanation_key_wins_over_summary() {
        let shape = FeedbackShape::detect(Some(&json!({
            "explanation": "legacy",
            "summary": "structured",
        })));

        assert_eq!(
            shape,
            FeedbackShape::Legacy {
                explanation: "legacy".to_owned()
            }
        );
    }

    #[test]
    fn structured_feedback_defaults_missing_lists() {
        let (feedback, issue) = normalize_feedback(Some(&json!({
            "summary": "Heap insert is mostly correct.",
            "weaknesses": ["swap skips the root", 7, "off by one"],
        })));

        assert!(issue.is_none());
        assert_eq!(feedback.summary, "Heap insert is mostly correct.");
        assert!(feedback.strengths.is_empty());
        assert_eq!(feedback.weaknesses, vec!["swap skips the root", "off by one"]);
        assert!(feedback.recommendations.is_empty());
    }

    #[test]
    fn unrecognized_shapes_fall_back_to_placeholder() {
        for value in [
            None,
            Some(json!("just text")),
            Some(json!({ "verdict": "fine" })),
            Some(json!({ "summary": null })),
        ] {
            let (feedback, issue) = normalize_feedback(value.as_ref());

            assert_eq!(feedback, Feedback::placeholder());
            assert!(matches!(
                issue,
                Some(FlexError::UnrecognizedFeedbackShape(_))
            ));
        }
    }

    #[test]
    fn analysis_payload_with_react_flow_nodes() {
        let payload = json!({
            "nodes": [
                { "id": "1", "data": { "label": "Insert" }, "position": { "x": 5, "y": 9 } },
                { "id": 2, "label": "Swap", "error": "division by zero" },
                { "label": "no id" },
            ],
            "edges": [
                { "id": "e1-2", "source": "1", "target": 2 },
                { "source": "3", "target": "9" },
                { "source": "1" },
            ],
            "high_level_feedback": { "summary": "Looks fine" },
        });

        let normalized = normalize_analysis(&payload).unwrap();
        let graph = &normalized.build.graph;

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.node("1").unwrap().label, "Insert");
        assert!(graph.node("1").unwrap().placement().is_none());
        assert_eq!(
            graph.node("2").unwrap().error.as_deref(),
            Some("division by zero")
        );
        assert_eq!(graph.edges(), &[GraphEdge::new("1", "2")]);
        assert_eq!(
            normalized.build.issues,
            vec![MalformedGraph::UnknownEndpoint {
                from: "3".to_owned(),
                to: "9".to_owned(),
                missing: "3".to_owned(),
            }]
        );
        assert_eq!(normalized.feedback.summary, "Looks fine");
    }

    #[test]
    fn separate_fault_annotations_are_applied() {
        let payload = json!({
            "nodes": [{ "id": "a" }, { "id": "b", "label": "Move Up" }],
            "edges": [],
            "faults": [{ "node": "b", "message": "heap property violated" }],
            "high_level_feedback": { "explanation": "see node b" },
        });

        let normalized = normalize_analysis(&payload).unwrap();
        let graph = &normalized.build.graph;

        assert_eq!(graph.node("a").unwrap().label, "a");
        assert_eq!(
            graph.node("b").unwrap().error.as_deref(),
            Some("heap property violated")
        );
    }

    #[test]
    fn missing_lists_are_empty_and_non_objects_fail() {
        let normalized = normalize_analysis(&json!({})).unwrap();
        assert!(normalized.build.graph.is_empty());
        assert_eq!(normalized.feedback, Feedback::placeholder());

        let error = normalize_analysis(&json!([1, 2])).unwrap_err();
        assert!(matches!(error, FlexError::AnalysisRequestFailed(_)));
    }

    #[test]
    fn flat_explanation_is_wrapped() {
        let explanation = normalize_explanation(&json!({
            "explanation": "  Moves the new key towards the root.  "
        }))
        .unwrap();

        assert_eq!(
            explanation,
            Explanation::plain("Moves the new key towards the root.")
        );
    }

    #[test]
    fn structured_explanation_is_kept() {
        let explanation = normalize_explanation(&json!({
            "explanation": {
                "description": "Swaps parent and child.",
                "concepts": ["heap order"],
                "suggestions": ["compare before swapping"],
            }
        }))
        .unwrap();

        assert_eq!(explanation.description, "Swaps parent and child.");
        assert_eq!(explanation.concepts, vec!["heap order"]);
        assert!(explanation.issues.is_empty());
        assert_eq!(explanation.suggestions, vec!["compare before swapping"]);
    }

    #[test]
    fn structured_explanation_tolerates_null_and_mixed_lists() {
        let explanation = normalize_explanation(&json!({
            "explanation": {
                "description": "Swaps parent and child.",
                "concepts": null,
                "issues": ["off by one", 5, null, "wrong index"],
            }
        }))
        .unwrap();

        assert_eq!(explanation.description, "Swaps parent and child.");
        assert!(explanation.concepts.is_empty());
        assert_eq!(explanation.issues, vec!["off by one", "wrong index"]);
        assert!(explanation.suggestions.is_empty());
    }

    #[test]
    fn explanation_failures() {
        assert!(normalize_explanation(&json!({ "error": "rate limited" })).is_err());
        assert!(normalize_explanation(&json!({})).is_err());
        assert!(normalize_explanation(&json!({ "explanation": 4 })).is_err());
        assert!(normalize_explanation(&json!({ "explanation": { "concepts": [] } })).is_err());
        assert!(
            normalize_explanation(&json!({ "explanation": { "description": null } })).is_err()
        );
    }
}
