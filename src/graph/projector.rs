use crate::analyzers::renames::{cached_renames, CommitRenames, RenameCache};
use crate::graph::{CommitGraph, NodeId};
use crate::store::ProjectStore;
use std::collections::HashSet;
use tracing::debug;

/// Result of projecting a historical file set onto the release: the
/// translated names and whether a direction-monotonic path carried them
/// there. Callers must check `valid` before trusting `files`.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub files: HashSet<String>,
    pub valid: bool,
}

/// Projects the files changed by a historical commit onto the release's
/// namespace.
///
/// Tries every undirected shortest path between the release commit and the
/// historical commit, walking each from the historical end towards the
/// release. A hop to a parent moves backward in time and undoes that
/// commit's renames (new name → old name); a hop to a child moves forward
/// in time and applies the child commit's renames (old name → new name) and
/// drops its deletions. A path is valid only while the hops stay
/// direction-monotonic: after the first forward-in-time hop no further
/// backward-in-time hop may occur. The first fully valid path wins; if none
/// is valid (or no path exists) the original set is returned unprojected.
pub fn project_files(
    graph: &CommitGraph,
    store: &ProjectStore,
    cache: &mut RenameCache,
    changed_files: &HashSet<String>,
    from_commit: &str,
    release_commit: &str,
) -> Projection {
    let paths = graph.shortest_paths_undirected(release_commit, from_commit);
    if paths.is_empty() {
        debug!(from = %from_commit, release = %release_commit, "no path to release");
        return Projection { files: changed_files.clone(), valid: false };
    }

    for path in &paths {
        let mut current = changed_files.clone();
        let mut valid = true;
        let mut moved_forward_in_time = false;

        for i in (1..path.len()).rev() {
            let here = path[i];
            let toward = path[i - 1];

            if graph.predecessors(here).contains(&toward) {
                // stepping to a parent: backward in time, undo this commit
                if moved_forward_in_time {
                    valid = false;
                    break;
                }
                let renames = renames_of(graph, store, cache, here);
                for (old, new) in &renames.renames {
                    if current.remove(new) {
                        current.insert(old.clone());
                    }
                }
            } else if graph.successors(here).contains(&toward) {
                // stepping to a child: forward in time, replay that commit
                moved_forward_in_time = true;
                let renames = renames_of(graph, store, cache, toward);
                for (old, new) in &renames.renames {
                    if current.remove(old) {
                        current.insert(new.clone());
                    }
                }
                for deleted in &renames.deletions {
                    current.remove(deleted);
                }
            }
        }

        if valid {
            return Projection { files: current, valid: true };
        }
    }

    Projection { files: changed_files.clone(), valid: false }
}

fn renames_of<'a>(
    graph: &CommitGraph,
    store: &ProjectStore,
    cache: &'a mut RenameCache,
    node: NodeId,
) -> &'a CommitRenames {
    let revision = graph.hash(node);
    let actions = store.actions_of(revision);
    cached_renames(cache, revision, &actions)
}

// ─── Tests ────────────────────────────────────────────────────────────────────
