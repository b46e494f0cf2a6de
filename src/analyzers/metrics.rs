use crate::error::Result;
use crate::store::{CommitRecord, ProjectStore};
use crate::types::{
    ChangeMetricsRecord, LinkedIssue, Snapshot, CHANGE_TYPES, SNAPSHOT_METRICS, SNAPSHOT_MISSING,
};
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};

// Metric pairs whose difference is tracked alongside the base metrics.
const DERIVED_METRICS: &[(&str, &str, &str)] = &[
    ("tna-tnpa", "tna", "tnpa"),
    ("tna-tnla", "tna", "tnla"),
    ("tnm-tnpm", "tnm", "tnpm"),
    ("tnm-tnlm", "tnm", "tnlm"),
];

const BASE_METRICS: &[&str] = &[
    "wmc", "dit", "rfc", "noc", "cbo", "lcom5", "nii", "noi",
    "tna", "tnpa", "tnla", "tloc", "tnm", "tnlpm", "tnpm", "tnlm",
];

/// Everything the windowed change walk produces: per-file metric lists plus
/// the static-metric snapshots the delta matrix is built from later.
#[derive(Debug)]
pub struct ChangeWalkOutcome {
    pub change_metrics: BTreeMap<String, ChangeMetricsRecord>,
    pub snapshots: Vec<Snapshot>,
}

/// Walks the windowed change paths and accumulates per-file time series.
///
/// Traversal runs newest→oldest, so contributions are collected in that
/// order and every list is reversed once at the end, leaving the records
/// reading oldest→newest. Merge commits are skipped (all their changes reappear on
/// the traversed branches). A commit contributes once per path occurrence,
/// matching the path enumeration it is driven by.
pub fn collect_change_metrics(
    store: &ProjectStore,
    aliases: &HashMap<String, String>,
    first_occurrences: &HashMap<String, DateTime<Utc>>,
    release_files: &[String],
    release: &CommitRecord,
    change_paths: &[Vec<String>],
    snapshot_window_days: i64,
) -> Result<ChangeWalkOutcome> {
    let mut records: BTreeMap<String, ChangeMetricsRecord> = release_files
        .iter()
        .map(|f| (f.clone(), ChangeMetricsRecord::default()))
        .collect();
    let mut snapshots: Vec<Snapshot> = Vec::new();
    // primed one day past the window so the release commit itself is sampled
    let mut last_sampled = release.committer_date + Duration::days(snapshot_window_days + 1);

    for path in change_paths {
        for revision in path {
            let commit = store.commit(revision)?;
            if commit.is_merge() {
                continue;
            }

            let actions = store.actions_of(revision);
            // hunks across the whole commit, not just the matching action
            let commit_hunks: usize = actions.iter().map(|fa| fa.hunks).sum();
            let mut touched_release_file = false;

            for fa in &actions {
                let Some(target) = aliases.get(&fa.file) else {
                    continue;
                };
                let Some(record) = records.get_mut(target) else {
                    continue;
                };
                touched_release_file = true;

                for issue_id in &commit.linked_issue_ids {
                    let issue = store.issue(issue_id)?;
                    record.linked_issues.push(LinkedIssue {
                        external_id: issue.external_id.clone(),
                        priority: issue.priority.clone(),
                        issue_type: issue.issue_type.clone(),
                    });
                }

                record.authors.push(commit.author.clone());
                record.revisions.push(commit.revision.clone());
                record.lines_added.push(fa.lines_added);
                record.lines_deleted.push(fa.lines_deleted);
                record.changesets.push(commit_hunks);
                record.commit_messages.push(commit.message.clone());
                // weighted-age inputs: days since the file appeared, days
                // until the release
                if let Some(first) = first_occurrences.get(target) {
                    record.ages.push((commit.committer_date - *first).num_days());
                }
                record
                    .days_from_release
                    .push((release.committer_date - commit.committer_date).num_days());
            }

            if touched_release_file {
                add_refactorings(store, aliases, &mut records, commit);
            }

            if let Some(parent) = commit.parents.first() {
                add_change_types(store, aliases, &mut records, parent, commit)?;
            }

            if last_sampled - Duration::days(snapshot_window_days) >= commit.committer_date {
                last_sampled = commit.committer_date;
                snapshots.push(take_snapshot(store, aliases, commit)?);
            }
        }
    }

    // traversal ran newest→oldest; flip every series into reading order
    for record in records.values_mut() {
        record.change_types.reverse();
        record.authors.reverse();
        record.revisions.reverse();
        record.lines_added.reverse();
        record.lines_deleted.reverse();
        record.changesets.reverse();
        record.ages.reverse();
        record.linked_issues.reverse();
        record.commit_messages.reverse();
        record.days_from_release.reverse();
        record.refactorings.reverse();
    }

    for (file, record) in records.iter_mut() {
        if let Some(first) = first_occurrences.get(file) {
            record.age = Some((release.committer_date - *first).num_days());
            record.first_occurrence = Some(*first);
        }
    }

    Ok(ChangeWalkOutcome { change_metrics: records, snapshots })
}

/// Refactoring types whose post-state lands in an aliased file, recorded
/// once per commit occurrence.
fn add_refactorings(
    store: &ProjectStore,
    aliases: &HashMap<String, String>,
    records: &mut BTreeMap<String, ChangeMetricsRecord>,
    commit: &CommitRecord,
) {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    for refactoring in store.refactorings_of(&commit.revision) {
        let Some(state_id) = refactoring.entity_state_after.as_deref() else {
            continue;
        };
        let Ok(state) = store.entity_state(state_id) else {
            continue;
        };
        let Some(target) = aliases.get(&state.file_path) else {
            continue;
        };
        if seen.insert((target.clone(), refactoring.refactoring_type.clone())) {
            if let Some(record) = records.get_mut(target) {
                record.refactorings.push(refactoring.refactoring_type.clone());
            }
        }
    }
}

/// Classifier output for the (parent, commit) pair, normalized over the full
/// change-type taxonomy.
fn add_change_types(
    store: &ProjectStore,
    aliases: &HashMap<String, String>,
    records: &mut BTreeMap<String, ChangeMetricsRecord>,
    parent: &str,
    commit: &CommitRecord,
) -> Result<()> {
    let Some(changes) = store.commit_changes(parent, &commit.revision) else {
        return Ok(());
    };
    for (file, counts) in &changes.classification {
        let Some(target) = aliases.get(file) else {
            continue;
        };
        let Some(record) = records.get_mut(target) else {
            continue;
        };
        let mut normalized: BTreeMap<String, i64> =
            CHANGE_TYPES.iter().map(|ct| (ct.to_string(), 0)).collect();
        for (change_type, count) in counts {
            *normalized.entry(change_type.to_lowercase()).or_insert(0) += count;
        }
        record.change_types.push(normalized);
    }
    Ok(())
}

/// Averages the class metrics of the commit's entity states per aliased
/// file and derives the tracked difference metrics.
fn take_snapshot(
    store: &ProjectStore,
    aliases: &HashMap<String, String>,
    commit: &CommitRecord,
) -> Result<Snapshot> {
    // file path → metric → (sum, count)
    let mut sums: HashMap<&str, HashMap<&str, (f64, usize)>> = HashMap::new();

    for state_id in &commit.entity_state_ids {
        let state = store.entity_state(state_id)?;
        if state.ce_type != "class" || !aliases.contains_key(&state.file_path) {
            continue;
        }
        let per_file = sums.entry(state.file_path.as_str()).or_default();
        for &metric in BASE_METRICS {
            if let Some(value) = state.metrics.get(metric.to_uppercase().as_str()) {
                let entry = per_file.entry(metric).or_insert((0.0, 0));
                entry.0 += value;
                entry.1 += 1;
            }
        }
    }

    let mut snapshot: Snapshot = Snapshot::new();
    for (file, metrics) in sums {
        let mut averaged: BTreeMap<String, f64> = metrics
            .into_iter()
            .map(|(name, (sum, count))| (name.to_string(), sum / count as f64))
            .collect();
        for (derived, minuend, subtrahend) in DERIVED_METRICS {
            if let (Some(a), Some(b)) = (averaged.get(*minuend), averaged.get(*subtrahend)) {
                averaged.insert(derived.to_string(), a - b);
            }
        }
        averaged.retain(|name, value| {
            SNAPSHOT_METRICS.contains(&name.as_str()) && *value != 0.0
        });
        let Some(target) = aliases.get(file) else {
            continue;
        };
        snapshot.insert(target.clone(), averaged);
    }
    Ok(snapshot)
}

/// Builds the per-metric delta matrix from the collected snapshots:
/// snapshots are put in chronological order, paired off two at a time, and
/// each pair contributes one absolute delta per metric per file, or the
/// missing-data sentinel when the file is absent from either snapshot.
pub fn snapshot_deltas(
    snapshots: &[Snapshot],
    release_files: &[String],
) -> BTreeMap<String, BTreeMap<String, Vec<f64>>> {
    let mut deltas: BTreeMap<String, BTreeMap<String, Vec<f64>>> = BTreeMap::new();
    for metric in SNAPSHOT_METRICS {
        let per_file = deltas.entry(metric.to_string()).or_default();
        for file in release_files {
            per_file.insert(file.clone(), Vec::new());
        }
    }

    // collection order was newest→oldest
    let chronological: Vec<&Snapshot> = snapshots.iter().rev().collect();

    for pair in chronological.chunks_exact(2) {
        let (older, newer) = (pair[0], pair[1]);
        for file in release_files {
            let both = older.get(file).zip(newer.get(file));
            for metric in SNAPSHOT_METRICS {
                let value = match both {
                    Some((before, after)) => match (before.get(*metric), after.get(*metric)) {
                        (Some(a), Some(b)) => Some((a - b).abs()),
                        _ => None,
                    },
                    None => Some(SNAPSHOT_MISSING),
                };
                let series = deltas
                    .get_mut(*metric)
                    .and_then(|per_file| per_file.get_mut(file));
                if let (Some(series), Some(value)) = (series, value) {
                    series.push(value);
                }
            }
        }
    }
    deltas
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{
        ActionMode, CodeEntityStateRecord, CommitChangesRecord, FileActionRecord, IssueRecord,
        RefactoringRecord,
    };
    use chrono::TimeZone;

    fn day(n: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, 1, 12, 0, 0).unwrap() + Duration::days(n as i64)
    }

    fn commit(rev: &str, n: u32, parents: &[&str]) -> CommitRecord {
        CommitRecord::new(rev, day(n), parents.iter().map(|p| p.to_string()).collect())
    }

    fn modify(id: &str, rev: &str, file: &str, added: i64, deleted: i64) -> FileActionRecord {
        let mut fa = FileActionRecord::new(id, rev, file, ActionMode::Modify);
        fa.lines_added = added;
        fa.lines_deleted = deleted;
        fa.hunks = 1;
        fa
    }

    fn self_aliases(files: &[&str]) -> HashMap<String, String> {
        files.iter().map(|f| (f.to_string(), f.to_string())).collect()
    }

    /// release r (day 40) ← c2 (day 30) ← c1 (day 10), Foo.java touched by
    /// both historical commits, first occurrence day 0
    fn linear_fixture() -> (ProjectStore, CommitRecord, Vec<Vec<String>>) {
        let mut c1 = commit("c1", 10, &[]);
        c1.author = "alice".to_string();
        c1.message = "first change".to_string();
        let mut c2 = commit("c2", 30, &["c1"]);
        c2.author = "bob".to_string();
        c2.message = "second change".to_string();
        let r = commit("r", 40, &["c2"]);
        let release = r.clone();
        let store = ProjectStore::new(
            vec![c1, c2, r],
            vec![
                modify("fa1", "c1", "Foo.java", 10, 1),
                modify("fa2", "c2", "Foo.java", 5, 2),
            ],
            vec![], vec![], vec![], vec![],
        );
        let paths = vec![vec!["r".to_string(), "c2".to_string(), "c1".to_string()]];
        (store, release, paths)
    }

    #[test]
    fn test_series_read_oldest_to_newest() {
        let (store, release, paths) = linear_fixture();
        let aliases = self_aliases(&["Foo.java"]);
        let first: HashMap<String, DateTime<Utc>> =
            [("Foo.java".to_string(), day(0))].into_iter().collect();

        let outcome = collect_change_metrics(
            &store, &aliases, &first, &["Foo.java".to_string()], &release, &paths, 14,
        )
        .unwrap();
        let record = &outcome.change_metrics["Foo.java"];
        assert_eq!(record.authors, vec!["alice", "bob"], "oldest first");
        assert_eq!(record.revisions, vec!["c1", "c2"]);
        assert_eq!(record.lines_added, vec![10, 5]);
        assert_eq!(record.lines_deleted, vec![1, 2]);
        assert_eq!(record.ages, vec![10, 30], "days since first occurrence");
        assert_eq!(record.days_from_release, vec![30, 10], "days until release");
        assert_eq!(record.commit_messages, vec!["first change", "second change"]);
    }

    #[test]
    fn test_scalar_age_and_first_occurrence() {
        let (store, release, paths) = linear_fixture();
        let aliases = self_aliases(&["Foo.java"]);
        let first: HashMap<String, DateTime<Utc>> =
            [("Foo.java".to_string(), day(0))].into_iter().collect();

        let outcome = collect_change_metrics(
            &store, &aliases, &first, &["Foo.java".to_string()], &release, &paths, 14,
        )
        .unwrap();
        let record = &outcome.change_metrics["Foo.java"];
        assert_eq!(record.age, Some(40), "release is 40 days after first occurrence");
        assert_eq!(record.first_occurrence, Some(day(0)));
    }

    #[test]
    fn test_merge_commits_skipped() {
        let mut c1 = commit("c1", 10, &[]);
        c1.author = "alice".to_string();
        let c2 = commit("c2", 12, &[]);
        let m = commit("m", 20, &["c1", "c2"]);
        let r = commit("r", 40, &["m"]);
        let release = r.clone();
        let store = ProjectStore::new(
            vec![c1, c2, m, r],
            vec![
                modify("fa1", "c1", "Foo.java", 1, 0),
                modify("fa2", "m", "Foo.java", 7, 7),
            ],
            vec![], vec![], vec![], vec![],
        );
        let paths = vec![vec!["r".to_string(), "m".to_string(), "c1".to_string()]];
        let aliases = self_aliases(&["Foo.java"]);
        let first: HashMap<String, DateTime<Utc>> =
            [("Foo.java".to_string(), day(0))].into_iter().collect();

        let outcome = collect_change_metrics(
            &store, &aliases, &first, &["Foo.java".to_string()], &release, &paths, 14,
        )
        .unwrap();
        let record = &outcome.change_metrics["Foo.java"];
        assert_eq!(
            record.revisions,
            vec!["c1"],
            "the merge commit's action must not be counted"
        );
    }

    #[test]
    fn test_changesets_count_hunks_of_whole_commit() {
        let mut c1 = commit("c1", 10, &[]);
        c1.author = "alice".to_string();
        let r = commit("r", 40, &["c1"]);
        let release = r.clone();
        let mut other = modify("fa2", "c1", "Other.java", 1, 1);
        other.hunks = 3;
        let store = ProjectStore::new(
            vec![c1, r],
            vec![modify("fa1", "c1", "Foo.java", 1, 0), other],
            vec![], vec![], vec![], vec![],
        );
        let paths = vec![vec!["r".to_string(), "c1".to_string()]];
        let aliases = self_aliases(&["Foo.java"]);

        let outcome = collect_change_metrics(
            &store, &aliases, &HashMap::new(), &["Foo.java".to_string()], &release, &paths, 14,
        )
        .unwrap();
        assert_eq!(
            outcome.change_metrics["Foo.java"].changesets,
            vec![4],
            "1 hunk in Foo.java plus 3 in Other.java"
        );
    }

    #[test]
    fn test_linked_issues_and_refactorings_recorded() {
        let mut c1 = commit("c1", 10, &[]);
        c1.linked_issue_ids.push("I1".to_string());
        let r = commit("r", 40, &["c1"]);
        let release = r.clone();
        let issue = IssueRecord {
            id: "I1".to_string(),
            external_id: "PROJ-9".to_string(),
            issue_type: "Improvement".to_string(),
            issue_type_verified: None,
            priority: "Minor".to_string(),
            created_at: day(1),
            status: "Open".to_string(),
            resolution: None,
        };
        let refactoring = RefactoringRecord {
            commit: "c1".to_string(),
            refactoring_type: "extract_method".to_string(),
            entity_state_after: Some("ces1".to_string()),
        };
        let state = CodeEntityStateRecord {
            id: "ces1".to_string(),
            ce_type: "method".to_string(),
            long_name: "Foo.bar()".to_string(),
            file_path: "Foo.java".to_string(),
            metrics: HashMap::new(),
        };
        let store = ProjectStore::new(
            vec![c1, r],
            vec![modify("fa1", "c1", "Foo.java", 1, 0)],
            vec![issue],
            vec![refactoring],
            vec![state],
            vec![],
        );
        let paths = vec![vec!["r".to_string(), "c1".to_string()]];
        let aliases = self_aliases(&["Foo.java"]);

        let outcome = collect_change_metrics(
            &store, &aliases, &HashMap::new(), &["Foo.java".to_string()], &release, &paths, 14,
        )
        .unwrap();
        let record = &outcome.change_metrics["Foo.java"];
        assert_eq!(record.linked_issues.len(), 1);
        assert_eq!(record.linked_issues[0].external_id, "PROJ-9");
        assert_eq!(record.refactorings, vec!["extract_method"]);
    }

    #[test]
    fn test_change_types_normalized_over_taxonomy() {
        let c1 = commit("c1", 10, &[]);
        let c2 = commit("c2", 30, &["c1"]);
        let r = commit("r", 40, &["c2"]);
        let release = r.clone();
        let changes = CommitChangesRecord {
            old_revision: "c1".to_string(),
            new_revision: "c2".to_string(),
            classification: [(
                "Foo.java".to_string(),
                [("STATEMENT_INSERT".to_string(), 4)].into_iter().collect(),
            )]
            .into_iter()
            .collect(),
        };
        let store = ProjectStore::new(
            vec![c1, c2, r],
            vec![modify("fa1", "c2", "Foo.java", 1, 0)],
            vec![], vec![], vec![],
            vec![changes],
        );
        let paths = vec![vec!["r".to_string(), "c2".to_string(), "c1".to_string()]];
        let aliases = self_aliases(&["Foo.java"]);

        let outcome = collect_change_metrics(
            &store, &aliases, &HashMap::new(), &["Foo.java".to_string()], &release, &paths, 14,
        )
        .unwrap();
        let record = &outcome.change_metrics["Foo.java"];
        assert_eq!(record.change_types.len(), 1);
        let entry = &record.change_types[0];
        assert_eq!(entry["statement_insert"], 4, "observed counts folded in lowercased");
        assert_eq!(entry["statement_delete"], 0, "taxonomy seeded at zero");
        assert_eq!(entry.len(), CHANGE_TYPES.len());
    }

    fn class_state(id: &str, file: &str, metric: &str, value: f64) -> CodeEntityStateRecord {
        CodeEntityStateRecord {
            id: id.to_string(),
            ce_type: "class".to_string(),
            long_name: format!("{file}::Class"),
            file_path: file.to_string(),
            metrics: [(metric.to_string(), value)].into_iter().collect(),
        }
    }

    #[test]
    fn test_snapshot_window_limits_sampling() {
        // commits 5 days apart with a 14-day window: only the first (the
        // newest) gets sampled
        let mut c1 = commit("c1", 30, &[]);
        c1.entity_state_ids.push("s1".to_string());
        let mut c2 = commit("c2", 35, &["c1"]);
        c2.entity_state_ids.push("s2".to_string());
        let mut r = commit("r", 36, &["c2"]);
        r.entity_state_ids.push("s3".to_string());
        let release = r.clone();
        let store = ProjectStore::new(
            vec![c1, c2, r],
            vec![],
            vec![], vec![],
            vec![
                class_state("s1", "Foo.java", "WMC", 10.0),
                class_state("s2", "Foo.java", "WMC", 12.0),
                class_state("s3", "Foo.java", "WMC", 14.0),
            ],
            vec![],
        );
        let paths = vec![vec!["r".to_string(), "c2".to_string(), "c1".to_string()]];
        let aliases = self_aliases(&["Foo.java"]);

        let outcome = collect_change_metrics(
            &store, &aliases, &HashMap::new(), &["Foo.java".to_string()], &release, &paths, 14,
        )
        .unwrap();
        assert_eq!(
            outcome.snapshots.len(),
            1,
            "commits within the window of the last sample are skipped"
        );
        assert_eq!(outcome.snapshots[0]["Foo.java"]["wmc"], 14.0, "release commit sampled first");
    }

    #[test]
    fn test_snapshot_averages_classes_and_derives_differences() {
        let mut c1 = commit("c1", 10, &[]);
        c1.entity_state_ids.extend(["s1".to_string(), "s2".to_string(), "s3".to_string()]);
        let release = c1.clone();
        let mut with_both = class_state("s1", "Foo.java", "TNA", 10.0);
        with_both.metrics.insert("TNPA".to_string(), 4.0);
        let mut second = class_state("s2", "Foo.java", "TNA", 20.0);
        second.metrics.insert("TNPA".to_string(), 6.0);
        // file entity states are not classes and must be ignored
        let mut file_state = class_state("s3", "Foo.java", "TNA", 99.0);
        file_state.ce_type = "file".to_string();
        let store = ProjectStore::new(
            vec![c1],
            vec![],
            vec![], vec![],
            vec![with_both, second, file_state],
            vec![],
        );
        let paths = vec![vec!["c1".to_string()]];
        let aliases = self_aliases(&["Foo.java"]);

        let outcome = collect_change_metrics(
            &store, &aliases, &HashMap::new(), &["Foo.java".to_string()], &release, &paths, 14,
        )
        .unwrap();
        let metrics = &outcome.snapshots[0]["Foo.java"];
        assert_eq!(metrics["tna"], 15.0, "two classes averaged");
        assert_eq!(metrics["tnpa"], 5.0);
        assert_eq!(metrics["tna-tnpa"], 10.0, "difference derived from the averages");
    }

    #[test]
    fn test_snapshot_deltas_pair_disjointly_with_sentinel() {
        let files = vec!["Foo.java".to_string()];
        // collection order newest→oldest: s4, s3, s2, s1
        let snap = |v: Option<f64>| -> Snapshot {
            let mut s = Snapshot::new();
            if let Some(v) = v {
                s.insert(
                    "Foo.java".to_string(),
                    [("wmc".to_string(), v)].into_iter().collect(),
                );
            }
            s
        };
        let snapshots = vec![snap(Some(9.0)), snap(None), snap(Some(5.0)), snap(Some(2.0))];

        let deltas = snapshot_deltas(&snapshots, &files);
        let series = &deltas["wmc"]["Foo.java"];
        // chronological: 2.0, 5.0, missing, 9.0 → pairs (2,5) and (missing,9)
        assert_eq!(series.len(), 2);
        assert_eq!(series[0], 3.0, "first pair: |2 - 5|");
        assert_eq!(series[1], SNAPSHOT_MISSING, "missing data yields the sentinel");
    }

    #[test]
    fn test_snapshot_deltas_odd_snapshot_dropped() {
        let files = vec!["Foo.java".to_string()];
        let mut s = Snapshot::new();
        s.insert(
            "Foo.java".to_string(),
            [("wmc".to_string(), 1.0)].into_iter().collect(),
        );
        let deltas = snapshot_deltas(&[s], &files);
        assert!(
            deltas["wmc"]["Foo.java"].is_empty(),
            "a single unpaired snapshot produces no deltas"
        );
    }
}
