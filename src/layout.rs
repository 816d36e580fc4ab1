use std::collections::{HashMap, HashSet};

use eframe::egui::{Vec2, vec2};
use tracing::debug;

use crate::config::{LayoutConfig, Orientation};
use crate::graph::{Graph, Placement};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LayoutStats {
    pub ranks: usize,
    pub reversed_edges: Vec<(String, String)>,
    pub sweeps: usize,
    pub crossings: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Layout {
    pub graph: Graph,
    pub stats: LayoutStats,
}

/// Acyclic ranking view of a graph. Index order equals lexical id order.
struct Skeleton<'a> {
    ids: Vec<&'a str>,
    successors: Vec<Vec<usize>>,
    predecessors: Vec<Vec<usize>>,
    reversed: Vec<(usize, usize)>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

pub fn layout(graph: &Graph, config: &LayoutConfig) -> Layout {
    if graph.is_empty() {
        return Layout {
            graph: graph.clone(),
            stats: LayoutStats::default(),
        };
    }

    let skeleton = Skeleton::new(graph);
    let ranks = assign_ranks(&skeleton);
    let mut rank_order = build_rank_buckets(&ranks);
    let sweeps = minimize_crossings(&mut rank_order, &skeleton, config.sweeps);
    let crossings = total_crossings(&rank_order, &skeleton);

    let mut next = graph.clone();
    for (rank, members) in rank_order.iter().enumerate() {
        for (order_in_rank, &index) in members.iter().enumerate() {
            let position = coordinate(rank, order_in_rank, members.len(), config);
            if let Some(node) = next.nodes.get_mut(skeleton.ids[index]) {
                node.placement = Some(Placement {
                    rank,
                    order_in_rank,
                    position,
                });
            }
        }
    }

    let stats = LayoutStats {
        ranks: rank_order.len(),
        reversed_edges: skeleton
            .reversed
            .iter()
            .map(|&(source, target)| {
                (
                    skeleton.ids[source].to_owned(),
                    skeleton.ids[target].to_owned(),
                )
            })
            .collect(),
        sweeps,
        crossings,
    };
    debug!(
        nodes = graph.len(),
        ranks = stats.ranks,
        reversed = stats.reversed_edges.len(),
        sweeps = stats.sweeps,
        crossings = stats.crossings,
        "graph laid out"
    );

    Layout { graph: next, stats }
}

impl<'a> Skeleton<'a> {
    fn new(graph: &'a Graph) -> Self {
        let ids = graph.nodes.keys().map(String::as_str).collect::<Vec<_>>();
        let index_by_id = ids
            .iter()
            .enumerate()
            .map(|(index, id)| (*id, index))
            .collect::<HashMap<_, _>>();

        // Flagged self-loops render but never constrain ranks.
        let mut edges = graph
            .edges
            .iter()
            .filter(|edge| !edge.is_self_loop())
            .filter_map(|edge| {
                let source = index_by_id.get(edge.source.as_str())?;
                let target = index_by_id.get(edge.target.as_str())?;
                Some((*source, *target))
            })
            .collect::<Vec<_>>();
        edges.sort_unstable();
        edges.dedup();

        let mut outgoing = vec![Vec::new(); ids.len()];
        for &(source, target) in &edges {
            outgoing[source].push(target);
        }

        let reversed = back_edges(&outgoing);
        let reversed_set = reversed.iter().copied().collect::<HashSet<_>>();

        let mut acyclic = edges
            .iter()
            .map(|&(source, target)| {
                if reversed_set.contains(&(source, target)) {
                    (target, source)
                } else {
                    (source, target)
                }
            })
            .collect::<Vec<_>>();
        acyclic.sort_unstable();
        acyclic.dedup();

        let mut successors = vec![Vec::new(); ids.len()];
        let mut predecessors = vec![Vec::new(); ids.len()];
        for &(source, target) in &acyclic {
            successors[source].push(target);
            predecessors[target].push(source);
        }

        Self {
            ids,
            successors,
            predecessors,
            reversed,
        }
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

/// Iterative DFS in index order; an edge into a node still on the stack closes a cycle.
fn back_edges(outgoing: &[Vec<usize>]) -> Vec<(usize, usize)> {
    let mut marks = vec![Mark::Unvisited; outgoing.len()];
    let mut back = Vec::new();

    for root in 0..outgoing.len() {
        if marks[root] != Mark::Unvisited {
            continue;
        }

        marks[root] = Mark::OnStack;
        let mut stack = vec![(root, 0usize)];
        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            if let Some(&next) = outgoing[node].get(frame.1) {
                frame.1 += 1;
                match marks[next] {
                    Mark::Unvisited => {
                        marks[next] = Mark::OnStack;
                        stack.push((next, 0));
                    }
                    Mark::OnStack => back.push((node, next)),
                    Mark::Done => {}
                }
            } else {
                marks[node] = Mark::Done;
                stack.pop();
            }
        }
    }

    back
}

fn assign_ranks(skeleton: &Skeleton<'_>) -> Vec<usize> {
    let n = skeleton.len();
    let mut in_degree = skeleton
        .predecessors
        .iter()
        .map(Vec::len)
        .collect::<Vec<_>>();
    let mut queue = (0..n).filter(|&v| in_degree[v] == 0).collect::<Vec<_>>();
    let mut ranks = vec![0usize; n];

    let mut head = 0;
    while head < queue.len() {
        let u = queue[head];
        head += 1;

        for &v in &skeleton.successors[u] {
            ranks[v] = ranks[v].max(ranks[u] + 1);
            in_degree[v] -= 1;
            if in_degree[v] == 0 {
                queue.push(v);
            }
        }
    }

    ranks
}

fn build_rank_buckets(ranks: &[usize]) -> Vec<Vec<usize>> {
    let rank_count = ranks.iter().copied().max().map_or(0, |max| max + 1);
    let mut buckets = vec![Vec::new(); rank_count];
    for (v, &rank) in ranks.iter().enumerate() {
        buckets[rank].push(v);
    }
    buckets
}

fn relative_positions(rank_order: &[Vec<usize>], n: usize) -> Vec<f64> {
    let mut positions = vec![0.0; n];
    for members in rank_order {
        let len = members.len() as f64;
        for (slot, &v) in members.iter().enumerate() {
            positions[v] = (slot as f64 + 0.5) / len;
        }
    }
    positions
}

fn barycenter_sweep(
    members: &mut Vec<usize>,
    neighbors: &[Vec<usize>],
    positions: &mut [f64],
) -> bool {
    let len = members.len() as f64;
    let mut scored = members
        .iter()
        .enumerate()
        .map(|(slot, &v)| {
            let adjacent = &neighbors[v];
            let score = if adjacent.is_empty() {
                (slot as f64 + 0.5) / len
            } else {
                adjacent.iter().map(|&nb| positions[nb]).sum::<f64>() / adjacent.len() as f64
            };
            (v, score)
        })
        .collect::<Vec<_>>();

    scored.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

    let reordered = scored.into_iter().map(|(v, _)| v).collect::<Vec<_>>();
    if reordered == *members {
        return false;
    }

    *members = reordered;
    for (slot, &v) in members.iter().enumerate() {
        positions[v] = (slot as f64 + 0.5) / len;
    }
    true
}

/// Runs up to `max_sweeps` top-down/bottom-up pairs, stopping once a pair changes nothing.
fn minimize_crossings(
    rank_order: &mut [Vec<usize>],
    skeleton: &Skeleton<'_>,
    max_sweeps: usize,
) -> usize {
    if rank_order.len() <= 1 {
        return 0;
    }

    let mut positions = relative_positions(rank_order, skeleton.len());
    let mut performed = 0;

    for _ in 0..max_sweeps {
        performed += 1;
        let mut changed = false;

        for members in rank_order.iter_mut().skip(1) {
            changed |= barycenter_sweep(members, &skeleton.predecessors, &mut positions);
        }

        let last = rank_order.len() - 1;
        for members in rank_order[..last].iter_mut().rev() {
            changed |= barycenter_sweep(members, &skeleton.successors, &mut positions);
        }

        if !changed {
            break;
        }
    }

    performed
}

fn count_crossings(upper: &[usize], lower: &[usize], skeleton: &Skeleton<'_>) -> usize {
    let lower_slot = lower
        .iter()
        .enumerate()
        .map(|(slot, &v)| (v, slot))
        .collect::<HashMap<_, _>>();

    let mut segments = Vec::new();
    for (upper_slot, &u) in upper.iter().enumerate() {
        for v in &skeleton.successors[u] {
            if let Some(&slot) = lower_slot.get(v) {
                segments.push((upper_slot, slot));
            }
        }
    }

    let mut crossings = 0;
    for (i, &(a1, b1)) in segments.iter().enumerate() {
        for &(a2, b2) in &segments[i + 1..] {
            if (a1 < a2 && b1 > b2) || (a1 > a2 && b1 < b2) {
                crossings += 1;
            }
        }
    }
    crossings
}

fn total_crossings(rank_order: &[Vec<usize>], skeleton: &Skeleton<'_>) -> usize {
    rank_order
        .windows(2)
        .map(|pair| count_crossings(&pair[0], &pair[1], skeleton))
        .sum()
}

fn coordinate(rank: usize, order_in_rank: usize, rank_len: usize, config: &LayoutConfig) -> Vec2 {
    let across = order_in_rank as f32 - (rank_len.saturating_sub(1) as f32 / 2.0);
    let along = rank as f32;
    let pitch_x = config.node_width + config.gap_x;
    let pitch_y = config.node_height + config.gap_y;

    match config.orientation {
        Orientation::Vertical => vec2(across * pitch_x, along * pitch_y),
        Orientation::Horizontal => vec2(along * pitch_x, across * pitch_y),
    }
}
