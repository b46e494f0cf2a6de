pub mod projector;
pub mod walker;

use std::collections::{HashMap, VecDeque};
use tracing::debug;

pub type NodeId = usize;

/// Commit DAG over an arena of id-indexed adjacency lists. Nodes are commit
/// revision hashes, edges point from parent to child. The graph knows
/// nothing about files, dates, or issues.
#[derive(Debug)]
pub struct CommitGraph {
    index: HashMap<String, NodeId>,
    hashes: Vec<String>,
    parents: Vec<Vec<NodeId>>,
    children: Vec<Vec<NodeId>>,
}

impl CommitGraph {
    /// Builds the graph from `(revision, parent revisions)` pairs. Parent
    /// hashes that are not themselves in the commit set mark the boundary of
    /// the mined history; their edges are skipped.
    pub fn from_commits<I>(commits: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        let commits: Vec<(String, Vec<String>)> = commits.into_iter().collect();

        let mut index: HashMap<String, NodeId> = HashMap::new();
        let mut hashes: Vec<String> = Vec::new();
        for (revision, _) in &commits {
            if !index.contains_key(revision) {
                index.insert(revision.clone(), hashes.len());
                hashes.push(revision.clone());
            }
        }

        let mut parents: Vec<Vec<NodeId>> = vec![Vec::new(); hashes.len()];
        let mut children: Vec<Vec<NodeId>> = vec![Vec::new(); hashes.len()];
        for (revision, parent_hashes) in &commits {
            let child = index[revision.as_str()];
            for parent in parent_hashes {
                match index.get(parent.as_str()) {
                    Some(&pid) => {
                        parents[child].push(pid);
                        children[pid].push(child);
                    }
                    None => debug!(
                        parent = %parent,
                        commit = %revision,
                        "parent outside the mined history, skipping edge"
                    ),
                }
            }
        }

        CommitGraph { index, hashes, parents, children }
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    pub fn node(&self, hash: &str) -> Option<NodeId> {
        self.index.get(hash).copied()
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.index.contains_key(hash)
    }

    pub fn hash(&self, id: NodeId) -> &str {
        &self.hashes[id]
    }

    pub fn predecessors(&self, id: NodeId) -> &[NodeId] {
        &self.parents[id]
    }

    pub fn successors(&self, id: NodeId) -> &[NodeId] {
        &self.children[id]
    }

    /// Directed reachability: is there a parent→child path from `from` to
    /// `to`? False when either hash is unknown.
    pub fn has_path(&self, from: &str, to: &str) -> bool {
        let (Some(from), Some(to)) = (self.node(from), self.node(to)) else {
            return false;
        };
        if from == to {
            return true;
        }
        let mut seen = vec![false; self.hashes.len()];
        seen[from] = true;
        let mut queue = VecDeque::from([from]);
        while let Some(node) = queue.pop_front() {
            for &child in &self.children[node] {
                if child == to {
                    return true;
                }
                if !seen[child] {
                    seen[child] = true;
                    queue.push_back(child);
                }
            }
        }
        false
    }

    /// Every shortest path between two commits, ignoring edge direction.
    /// Paths run from `from` to `to`; empty when no connection exists or a
    /// hash is unknown.
    pub fn shortest_paths_undirected(&self, from: &str, to: &str) -> Vec<Vec<NodeId>> {
        let (Some(from), Some(to)) = (self.node(from), self.node(to)) else {
            return Vec::new();
        };
        if from == to {
            return vec![vec![from]];
        }

        // BFS layering, keeping every same-distance predecessor so all tied
        // paths can be expanded afterwards.
        let n = self.hashes.len();
        let mut dist: Vec<Option<usize>> = vec![None; n];
        let mut level_preds: Vec<Vec<NodeId>> = vec![Vec::new(); n];
        dist[from] = Some(0);
        let mut queue = VecDeque::from([from]);
        while let Some(node) = queue.pop_front() {
            let Some(d) = dist[node] else { continue };
            if dist[to].is_some_and(|dt| d + 1 > dt) {
                break;
            }
            for &next in self.parents[node].iter().chain(self.children[node].iter()) {
                match dist[next] {
                    None => {
                        dist[next] = Some(d + 1);
                        level_preds[next].push(node);
                        queue.push_back(next);
                    }
                    Some(dn) if dn == d + 1 => {
                        if !level_preds[next].contains(&node) {
                            level_preds[next].push(node);
                        }
                    }
                    Some(_) => {}
                }
            }
        }

        if dist[to].is_none() {
            return Vec::new();
        }

        // Expand the predecessor DAG from `to` back to `from`.
        let mut paths = Vec::new();
        let mut stack = vec![to];
        self.expand_paths(from, &level_preds, &mut stack, &mut paths);
        paths
    }

    fn expand_paths(
        &self,
        from: NodeId,
        level_preds: &[Vec<NodeId>],
        stack: &mut Vec<NodeId>,
        paths: &mut Vec<Vec<NodeId>>,
    ) {
        let Some(&node) = stack.last() else { return };
        if node == from {
            let mut path: Vec<NodeId> = stack.clone();
            path.reverse();
            paths.push(path);
            return;
        }
        for &pred in &level_preds[node] {
            stack.push(pred);
            self.expand_paths(from, level_preds, stack, paths);
            stack.pop();
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
