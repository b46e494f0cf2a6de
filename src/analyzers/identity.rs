use crate::analyzers::renames::{cached_renames, RenameCache};
use crate::error::Result;
use crate::graph::CommitGraph;
use crate::store::{CommitRecord, ProjectStore};
use crate::types::RenameEvent;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Result of resolving every release file's identity across history.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityOutcome {
    /// Release file → date of its latest surviving addition.
    pub first_occurrences: HashMap<String, DateTime<Utc>>,
    /// Any historical path → the release file it represents. Release files
    /// map to themselves.
    pub aliases: HashMap<String, String>,
    /// Release file → its most recent rename transition.
    pub rename_events: HashMap<String, RenameEvent>,
}

/// Walks the full reachable history newest→oldest, following renames
/// backward to build the alias map and collect file-addition dates.
///
/// Merge commits are excluded from alias propagation (their rename
/// direction is ambiguous); the fallback scan for files the walk missed
/// deliberately allows them. A rename whose old and new names already alias
/// different release files would corrupt the map; it is logged and
/// rejected, and processing continues.
pub fn resolve_identities(
    store: &ProjectStore,
    graph: &CommitGraph,
    cache: &mut RenameCache,
    origin_paths: &[Vec<String>],
    release_files: &[String],
    release: &str,
) -> Result<IdentityOutcome> {
    let release_set: HashSet<&str> = release_files.iter().map(|s| s.as_str()).collect();

    let mut aliases: HashMap<String, String> = release_files
        .iter()
        .map(|f| (f.clone(), f.clone()))
        .collect();
    let mut rename_events: HashMap<String, RenameEvent> = HashMap::new();
    let mut additions: HashMap<String, Vec<DateTime<Utc>>> = HashMap::new();

    for commit in commits_newest_first(store, origin_paths)? {
        if commit.is_merge() {
            continue;
        }
        let actions = store.actions_of(&commit.revision);
        let renames = cached_renames(cache, &commit.revision, &actions);

        for (old, new) in &renames.renames {
            if let (Some(target_old), Some(target_new)) = (aliases.get(old), aliases.get(new)) {
                if target_old != target_new {
                    warn!(
                        revision = %commit.revision,
                        alias = %old,
                        kept = %target_old,
                        rejected = %target_new,
                        "rename would overwrite alias target, skipping"
                    );
                    continue;
                }
            }

            // propagate only towards names that resolve to a release file
            if let Some(target) = aliases.get(new).cloned() {
                if release_set.contains(target.as_str()) {
                    aliases.insert(old.clone(), target.clone());
                }
                // newest transition wins; older ones along the chain are
                // already superseded
                if let Some(parent) = commit.parents.first() {
                    rename_events.entry(target).or_insert_with(|| RenameEvent {
                        parent_revision: parent.clone(),
                        old_path: old.clone(),
                    });
                }
            }
        }

        // additions come from three sources: surplus duplicate-rename
        // targets, direct additions, and copy targets
        for added in renames
            .ambiguous_additions
            .iter()
            .chain(renames.additions.iter())
        {
            additions
                .entry(added.clone())
                .or_default()
                .push(commit.committer_date);
        }
    }

    // attribute addition dates through the alias map
    let mut candidate_dates: HashMap<String, Vec<DateTime<Utc>>> = HashMap::new();
    for (file, dates) in &additions {
        if let Some(target) = aliases.get(file) {
            candidate_dates
                .entry(target.clone())
                .or_default()
                .extend(dates.iter().copied());
        }
    }

    for file in release_files {
        if candidate_dates.contains_key(file) {
            continue;
        }
        match fallback_first_occurrence(store, graph, cache, file, release) {
            Some(date) => {
                candidate_dates.insert(file.clone(), vec![date]);
            }
            None => warn!(file = %file, "no addition event found, file has no first occurrence"),
        }
    }

    // several candidate dates mean the lineage restarted (add, delete,
    // re-add): the latest surviving addition wins
    let first_occurrences = candidate_dates
        .into_iter()
        .filter_map(|(file, dates)| dates.into_iter().max().map(|d| (file, d)))
        .collect();

    Ok(IdentityOutcome { first_occurrences, aliases, rename_events })
}

/// Unique commits of the walked paths, newest committer date first.
fn commits_newest_first<'a>(
    store: &'a ProjectStore,
    origin_paths: &[Vec<String>],
) -> Result<Vec<&'a CommitRecord>> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut commits: Vec<&CommitRecord> = Vec::new();
    for path in origin_paths {
        for revision in path {
            if seen.insert(revision.as_str()) {
                commits.push(store.commit(revision)?);
            }
        }
    }
    commits.sort_by(|a, b| {
        b.committer_date
            .cmp(&a.committer_date)
            .then(b.author_date.cmp(&a.author_date))
    });
    Ok(commits)
}

/// Last-resort scan for a release file the primary walk found no addition
/// for (broken or truncated alias chain): re-scan all commits reachable to
/// the release newest-first, following renames backward by name, and take
/// the first addition of the (possibly renamed) needle. Merge commits are
/// allowed here, unlike in the primary walk.
fn fallback_first_occurrence(
    store: &ProjectStore,
    graph: &CommitGraph,
    cache: &mut RenameCache,
    file: &str,
    release: &str,
) -> Option<DateTime<Utc>> {
    let mut needle = file.to_string();

    for commit in store.commits_desc() {
        if !graph.has_path(&commit.revision, release) {
            continue;
        }
        let actions = store.actions_of(&commit.revision);
        let renames = cached_renames(cache, &commit.revision, &actions);

        if renames.additions.iter().any(|f| *f == needle) {
            debug!(file = %file, revision = %commit.revision, "fallback found addition");
            return Some(commit.committer_date);
        }

        let mut renamed = needle.clone();
        for (old, new) in &renames.renames {
            if *new == needle {
                renamed = old.clone();
            }
        }
        if renames.ambiguous_additions.contains(&renamed) {
            debug!(file = %file, revision = %commit.revision, "fallback found duplicate-rename addition");
            return Some(commit.committer_date);
        }
        needle = renamed;
    }
    None
}

// ─── Tests ────────────────────────────────────────────────────────────────────
