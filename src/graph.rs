use std::collections::BTreeMap;

use eframe::egui::Vec2;
use tracing::{debug, warn};

use crate::error::MalformedGraph;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeSpec {
    pub id: String,
    pub label: String,
    pub error: Option<String>,
}

impl NodeSpec {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            error: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub rank: usize,
    pub order_in_rank: usize,
    pub position: Vec2,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub error: Option<String>,
    pub(crate) placement: Option<Placement>,
}

impl GraphNode {
    pub fn is_faulty(&self) -> bool {
        self.error.is_some()
    }

    pub fn placement(&self) -> Option<Placement> {
        self.placement
    }

    pub fn rank(&self) -> Option<usize> {
        self.placement.map(|placement| placement.rank)
    }

    pub fn order_in_rank(&self) -> Option<usize> {
        self.placement.map(|placement| placement.order_in_rank)
    }

    pub fn position(&self) -> Option<Vec2> {
        self.placement.map(|placement| placement.position)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub allow_self_loop: bool,
}

impl GraphEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            allow_self_loop: false,
        }
    }

    pub fn self_loop(node: impl Into<String>) -> Self {
        let node = node.into();
        Self {
            source: node.clone(),
            target: node,
            allow_self_loop: true,
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Graph {
    pub(crate) nodes: BTreeMap<String, GraphNode>,
    pub(crate) edges: Vec<GraphEdge>,
}

/// Result of [`Graph::build`]: the usable graph plus every problem that was recovered from.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphBuild {
    pub graph: Graph,
    pub issues: Vec<MalformedGraph>,
}

impl Graph {
    pub fn build(
        raw_nodes: impl IntoIterator<Item = NodeSpec>,
        raw_edges: impl IntoIterator<Item = GraphEdge>,
    ) -> GraphBuild {
        let mut nodes = BTreeMap::new();
        for spec in raw_nodes {
            let node = GraphNode {
                id: spec.id.clone(),
                label: spec.label,
                error: clean_error(spec.error),
                placement: None,
            };
            if let Some(previous) = nodes.insert(spec.id, node) {
                debug!(node = %previous.id, "duplicate node id, keeping last");
            }
        }

        let mut edges = Vec::new();
        let mut issues = Vec::new();
        for edge in raw_edges {
            let missing = [&edge.source, &edge.target]
                .into_iter()
                .find(|id| !nodes.contains_key(id.as_str()))
                .cloned();

            let issue = if let Some(missing) = missing {
                Some(MalformedGraph::UnknownEndpoint {
                    from: edge.source.clone(),
                    to: edge.target.clone(),
                    missing,
                })
            } else if edge.is_self_loop() && !edge.allow_self_loop {
                Some(MalformedGraph::SelfLoop {
                    node: edge.source.clone(),
                })
            } else {
                None
            };

            match issue {
                Some(issue) => {
                    warn!(%issue, "dropping malformed edge");
                    issues.push(issue);
                }
                None => edges.push(edge),
            }
        }

        GraphBuild {
            graph: Self { nodes, edges },
            issues,
        }
    }

    pub fn with_error(&self, node_id: &str, message: Option<&str>) -> Self {
        let mut next = self.clone();
        match next.nodes.get_mut(node_id) {
            Some(node) => node.error = clean_error(message.map(str::to_owned)),
            None => debug!(node = node_id, "fault annotation for unknown node ignored"),
        }
        next
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn faulty_nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values().filter(|node| node.is_faulty())
    }

    pub fn successors<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.edges
            .iter()
            .filter(move |edge| edge.source == id)
            .map(|edge| edge.target.as_str())
    }

    pub fn is_laid_out(&self) -> bool {
        self.nodes.values().all(|node| node.placement.is_some())
    }
}

fn clean_error(error: Option<String>) -> Option<String> {
    error
        .map(|message| message.trim().to_owned())
        .filter(|message| !message.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert_swap() -> Vec<NodeSpec> {
        vec![NodeSpec::new("1", "Insert"), NodeSpec::new("2", "Swap")]
    }

    #[test]
    fn build_keeps_valid_edges() {
        let build = Graph::build(insert_swap(), vec![GraphEdge::new("1", "2")]);

        assert!(build.issues.is_empty());
        assert_eq!(build.graph.len(), 2);
        assert_eq!(build.graph.edges(), &[GraphEdge::new("1", "2")]);
        assert!(!build.graph.is_laid_out());
    }

    #[test]
    fn edge_to_unknown_node_is_dropped_and_reported() {
        let nodes = vec![
            NodeSpec::new("1", "Insert"),
            NodeSpec::new("2", "Swap"),
            NodeSpec::new("3", "Move Up"),
        ];
        let edges = vec![GraphEdge::new("1", "2"), GraphEdge::new("3", "9")];

        let build = Graph::build(nodes, edges);

        assert_eq!(
            build.issues,
            vec![MalformedGraph::UnknownEndpoint {
                from: "3".to_owned(),
                to: "9".to_owned(),
                missing: "9".to_owned(),
            }]
        );
        assert_eq!(build.graph.len(), 3);
        assert_eq!(build.graph.edges(), &[GraphEdge::new("1", "2")]);
    }

    #[test]
    fn duplicate_node_ids_keep_the_last_one() {
        let nodes = vec![
            NodeSpec::new("1", "Insert"),
            NodeSpec::new("1", "Insert again").with_error("boom"),
        ];

        let build = Graph::build(nodes, Vec::new());

        assert_eq!(build.graph.len(), 1);
        let node = build.graph.node("1").unwrap();
        assert_eq!(node.label, "Insert again");
        assert_eq!(node.error.as_deref(), Some("boom"));
    }

    #[test]
    fn self_loops_need_the_flag() {
        let nodes = vec![NodeSpec::new("a", "loop")];
        let edges = vec![GraphEdge::new("a", "a"), GraphEdge::self_loop("a")];

        let build = Graph::build(nodes, edges);

        assert_eq!(
            build.issues,
            vec![MalformedGraph::SelfLoop {
                node: "a".to_owned()
            }]
        );
        assert_eq!(build.graph.edges(), &[GraphEdge::self_loop("a")]);
    }

    #[test]
    fn blank_errors_are_not_faults() {
        let nodes = vec![
            NodeSpec::new("1", "ok").with_error("   "),
            NodeSpec::new("2", "bad").with_error("division by zero"),
        ];

        let graph = Graph::build(nodes, Vec::new()).graph;

        assert!(!graph.node("1").unwrap().is_faulty());
        assert!(graph.node("2").unwrap().is_faulty());
        let faulty = graph.faulty_nodes().map(|node| node.id.as_str()).collect::<Vec<_>>();
        assert_eq!(faulty, vec!["2"]);
    }

    #[test]
    fn with_error_is_a_pure_update() {
        let graph = Graph::build(insert_swap(), Vec::new()).graph;

        let annotated = graph.with_error("2", Some("index out of range"));
        assert_eq!(
            annotated.node("2").unwrap().error.as_deref(),
            Some("index out of range")
        );
        assert!(graph.node("2").unwrap().error.is_none());

        let cleared = annotated.with_error("2", None);
        assert!(!cleared.node("2").unwrap().is_faulty());

        let unchanged = graph.with_error("missing", Some("ignored"));
        assert_eq!(unchanged, graph);
    }

    #[test]
    fn successors_follow_edge_direction() {
        let build = Graph::build(
            insert_swap(),
            vec![GraphEdge::new("1", "2"), GraphEdge::new("2", "1")],
        );
        let graph = build.graph;

        assert_eq!(graph.successors("1").collect::<Vec<_>>(), vec!["2"]);
        assert_eq!(graph.successors("2").collect::<Vec<_>>(), vec!["1"]);
    }
}
