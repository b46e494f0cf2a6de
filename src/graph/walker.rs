use crate::error::{LineageError, Result};
use crate::graph::{CommitGraph, NodeId};
use std::collections::{HashSet, VecDeque};
use std::str::FromStr;

/// One enumerated traversal path, as revision hashes in visit order.
pub type Path = Vec<String>;

/// Which edges a traversal follows from the start node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Follow parent edges, towards the origin of the history.
    Backward,
    /// Follow child edges, towards the most recent commits.
    Forward,
}

impl FromStr for Direction {
    type Err = LineageError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "backward" => Ok(Direction::Backward),
            "forward" => Ok(Direction::Forward),
            other => Err(LineageError::InvalidDirection(other.to_string())),
        }
    }
}

/// Enumerates every path from `start` via BFS until a break condition is hit
/// or no unvisited edges remain.
///
/// Edges are tracked as (node, next) pairs so that converging branches do
/// not reprocess a common suffix: each reachable edge lands in exactly one
/// returned path. A node whose `break_condition` is true terminates its
/// branch: the edge leading to it is consumed but the node is neither
/// appended nor expanded.
pub fn enumerate_paths(
    graph: &CommitGraph,
    start: &str,
    direction: Direction,
    break_condition: Option<&dyn Fn(&str) -> bool>,
) -> Result<Vec<Path>> {
    let start_id = graph
        .node(start)
        .ok_or_else(|| LineageError::UnknownStartNode(start.to_string()))?;

    let next_hops = |node: NodeId| match direction {
        Direction::Backward => graph.predecessors(node),
        Direction::Forward => graph.successors(node),
    };

    let mut paths: Vec<Vec<NodeId>> = vec![vec![start_id]];
    let mut visited: HashSet<(NodeId, NodeId)> = HashSet::new();
    // (frontier node, cursor into its next-hop candidates)
    let mut queue: VecDeque<(NodeId, usize)> = VecDeque::from([(start_id, 0)]);

    while let Some(front) = queue.front_mut() {
        let (node, cursor) = *front;
        let candidates = next_hops(node);
        if cursor >= candidates.len() {
            queue.pop_front();
            continue;
        }
        front.1 += 1;
        let next = candidates[cursor];

        if !visited.insert((node, next)) {
            continue;
        }

        if break_condition.is_some_and(|breaks| breaks(graph.hash(next))) {
            continue;
        }

        // extend the path that currently ends at `node`, or open a new one
        // at this branch point
        match paths.iter_mut().find(|p| p.last() == Some(&node)) {
            Some(path) => path.push(next),
            None => paths.push(vec![node, next]),
        }
        queue.push_back((next, 0));
    }

    Ok(paths
        .into_iter()
        .map(|p| p.into_iter().map(|id| graph.hash(id).to_string()).collect())
        .collect())
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &[&str])]) -> CommitGraph {
        CommitGraph::from_commits(edges.iter().map(|(rev, parents)| {
            (
                rev.to_string(),
                parents.iter().map(|p| p.to_string()).collect(),
            )
        }))
    }

    /// Linear history a → b → c → d plus a branch c → e (so d and e are
    /// both children of c), merged nowhere.
    fn branched() -> CommitGraph {
        graph(&[
            ("a", &[]),
            ("b", &["a"]),
            ("c", &["b"]),
            ("d", &["c"]),
            ("e", &["c"]),
        ])
    }

    fn edge_set(paths: &[Path]) -> HashSet<(String, String)> {
        let mut edges = HashSet::new();
        for p in paths {
            for pair in p.windows(2) {
                edges.insert((pair[0].clone(), pair[1].clone()));
            }
        }
        edges
    }

    fn edge_count(paths: &[Path]) -> usize {
        paths.iter().map(|p| p.len().saturating_sub(1)).sum()
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!("backward".parse::<Direction>().unwrap(), Direction::Backward);
        assert_eq!("forward".parse::<Direction>().unwrap(), Direction::Forward);
        let err = "sideways".parse::<Direction>().unwrap_err();
        assert!(
            matches!(err, LineageError::InvalidDirection(ref d) if d == "sideways"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn test_unknown_start_node() {
        let g = branched();
        let err = enumerate_paths(&g, "zzz", Direction::Backward, None).unwrap_err();
        assert!(matches!(err, LineageError::UnknownStartNode(_)), "unexpected error: {err}");
    }

    #[test]
    fn test_backward_walk_from_linear_tip() {
        let g = branched();
        let paths = enumerate_paths(&g, "d", Direction::Backward, None).unwrap();
        assert_eq!(paths, vec![vec!["d", "c", "b", "a"]], "single linear path");
    }

    #[test]
    fn test_forward_walk_branches_into_two_paths() {
        let g = branched();
        let paths = enumerate_paths(&g, "a", Direction::Forward, None).unwrap();
        let edges = edge_set(&paths);
        assert_eq!(edge_count(&paths), edges.len(), "no edge appears twice");
        assert_eq!(edges.len(), 4, "all reachable edges covered");
        assert!(edges.contains(&("c".to_string(), "d".to_string())));
        assert!(edges.contains(&("c".to_string(), "e".to_string())));
    }

    #[test]
    fn test_paths_partition_reachable_edges_on_merge() {
        // diamond with a merge: every edge exactly once even though two
        // frontiers converge on "a"
        let g = graph(&[
            ("a", &[]),
            ("b", &["a"]),
            ("d", &["a"]),
            ("c", &["b", "d"]),
        ]);
        let paths = enumerate_paths(&g, "c", Direction::Backward, None).unwrap();
        let edges = edge_set(&paths);
        assert_eq!(edge_count(&paths), edges.len(), "no edge appears twice");
        assert_eq!(edges.len(), 4, "c→b, c→d, b→a, d→a each visited once");
    }

    #[test]
    fn test_always_false_break_matches_unconstrained_walk() {
        let g = branched();
        let unconstrained = enumerate_paths(&g, "d", Direction::Backward, None).unwrap();
        let never = |_: &str| false;
        let with_predicate =
            enumerate_paths(&g, "d", Direction::Backward, Some(&never)).unwrap();
        assert_eq!(unconstrained, with_predicate);
    }

    #[test]
    fn test_break_on_everything_yields_single_node_path() {
        let g = branched();
        let always = |_: &str| true;
        let paths = enumerate_paths(&g, "d", Direction::Backward, Some(&always)).unwrap();
        assert_eq!(paths, vec![vec!["d"]], "branch stops before the first hop");
    }

    #[test]
    fn test_break_truncates_branch_excluding_break_node() {
        let g = branched();
        let stop_at_b = |hash: &str| hash == "b";
        let paths = enumerate_paths(&g, "d", Direction::Backward, Some(&stop_at_b)).unwrap();
        assert_eq!(
            paths,
            vec![vec!["d", "c"]],
            "path ends just before the break node"
        );
    }

    #[test]
    fn test_start_without_edges_yields_single_node_path() {
        let g = graph(&[("solo", &[])]);
        let paths = enumerate_paths(&g, "solo", Direction::Backward, None).unwrap();
        assert_eq!(paths, vec![vec!["solo"]]);
    }
}
