use crate::store::{ActionMode, FileActionRecord};
use std::collections::HashMap;

/// Per-commit classification of file actions into the events the lineage
/// engines consume. Safe to cache by commit id; the classification is a
/// pure function of the commit's file actions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitRenames {
    /// Unambiguous renames as (old path, new path).
    pub renames: Vec<(String, String)>,
    /// Surplus targets of duplicate renames, treated as brand-new files.
    pub ambiguous_additions: Vec<String>,
    /// Paths added by the commit: direct additions and copy targets.
    pub additions: Vec<String>,
    /// Paths deleted by the commit.
    pub deletions: Vec<String>,
}

/// Session-scoped memo of per-commit classifications, shared by every
/// traversal that revisits the same commits.
pub type RenameCache = HashMap<String, CommitRenames>;

/// Classifies one commit's file actions.
///
/// Rename detection sometimes reports the same old path renamed to several
/// new paths (A→B, A→C). Only the target with the minimum edit distance to
/// the old name is kept as the true rename (this captures package moves
/// like org.apache.math → org.apache.math3); every other target counts as
/// a new file. Ties keep the first-encountered target.
pub fn resolve_renames(actions: &[&FileActionRecord]) -> CommitRenames {
    // old path → candidate new paths, in encounter order
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    let mut result = CommitRenames::default();

    for fa in actions {
        match fa.mode {
            ActionMode::Rename => {
                let Some(old) = fa.old_file.as_deref() else {
                    continue;
                };
                match groups.iter_mut().find(|(o, _)| o == old) {
                    Some((_, news)) => news.push(fa.file.clone()),
                    None => groups.push((old.to_string(), vec![fa.file.clone()])),
                }
            }
            ActionMode::Add | ActionMode::Copy => result.additions.push(fa.file.clone()),
            ActionMode::Delete => result.deletions.push(fa.file.clone()),
            ActionMode::Modify => {}
        }
    }

    for (old, news) in groups {
        if let [single] = news.as_slice() {
            result.renames.push((old, single.clone()));
            continue;
        }

        let mut min_dist = usize::MAX;
        let mut probable = 0;
        for (i, new) in news.iter().enumerate() {
            let d = levenshtein(&old, new);
            if d < min_dist {
                min_dist = d;
                probable = i;
            }
        }
        for (i, new) in news.into_iter().enumerate() {
            if i == probable {
                result.renames.push((old.clone(), new));
            } else {
                result.ambiguous_additions.push(new);
            }
        }
    }

    result
}

/// Looks up the cached classification for a commit, computing it on first
/// use.
pub fn cached_renames<'a>(
    cache: &'a mut RenameCache,
    revision: &str,
    actions: &[&FileActionRecord],
) -> &'a CommitRenames {
    if !cache.contains_key(revision) {
        cache.insert(revision.to_string(), resolve_renames(actions));
    }
    &cache[revision]
}

/// Levenshtein edit distance, two-row Wagner-Fischer over bytes (paths are
/// ASCII in practice).
pub fn levenshtein(a: &str, b: &str) -> usize {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr: Vec<usize> = vec![0; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

// ─── Tests ────────────────────────────────────────────────────────────────────
