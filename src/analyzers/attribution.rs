use crate::analyzers::renames::RenameCache;
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::filters;
use crate::graph::projector::project_files;
use crate::graph::CommitGraph;
use crate::store::{ActionMode, CommitRecord, ProjectStore};
use crate::types::InducingRecord;
use chrono::Months;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Commit label set by the manual fix validation pass.
pub const LABEL_VALIDATED_BUGFIX: &str = "validated_bugfix";
/// Commit label set by the adjusted SZZ labeling run.
pub const LABEL_SZZ_BUGFIX: &str = "adjustedszz_bugfix";
/// Commit label for issue-link-only bugfix detection.
pub const LABEL_ISSUEONLY_BUGFIX: &str = "issueonly_bugfix";

const SZZ_HARD_SUSPECT: &str = "hard_suspect";

pub type Attribution = BTreeMap<String, Vec<InducingRecord>>;

/// Induction-based attribution: for every bug issue fixed after the release
/// by a validated fix, follow the recorded blame edges to the inducing file
/// actions and translate the blamed paths through the alias map.
///
/// Every inducing commit of an issue must have a path to the release; the
/// only exemption is a partial fix, where the inducing commit is itself a
/// validated fix for the same issue. One unreachable non-exempt inducing
/// commit discards the issue from *all* files; the inducing set is
/// computed in full before anything is attributed.
pub fn induced_issues(
    store: &ProjectStore,
    graph: &CommitGraph,
    config: &AnalysisConfig,
    aliases: &HashMap<String, String>,
    release: &CommitRecord,
) -> Result<Attribution> {
    let fixed_issues = validated_fixed_issues(store, release)?;

    // blame id (inducing commit + issue) → blamed path → records
    let mut inducing: BTreeMap<String, BTreeMap<String, Vec<InducingRecord>>> = BTreeMap::new();
    let mut skipped: BTreeSet<String> = BTreeSet::new();

    for issue_id in &fixed_issues {
        let issue = store.issue(issue_id)?;
        let mut have_path = true;
        let mut blame_ids: Vec<String> = Vec::new();

        for fix_commit in store.commits_desc() {
            if fix_commit.committer_date <= release.committer_date
                || !fix_commit.fixed_issue_ids.iter().any(|id| id == issue_id)
            {
                continue;
            }

            for fa in store.actions_of(&fix_commit.revision) {
                if fa.mode != ActionMode::Modify {
                    continue;
                }
                for inducing_action in store.inducing_actions_for(&fa.id) {
                    for relation in &inducing_action.induces {
                        if relation.change_action_id != fa.id
                            || relation.label != config.induction_label
                            || relation.szz_type == SZZ_HARD_SUSPECT
                        {
                            continue;
                        }

                        let blame_commit = inducing_action.commit.as_str();
                        let blame_file = inducing_action.file.as_str();
                        let blame_id = format!("{}_{}", blame_commit, issue.external_id);
                        blame_ids.push(blame_id.clone());

                        if !graph.has_path(blame_commit, &release.revision) {
                            let blamed = store.commit(blame_commit)?;
                            // partial-fix exemption
                            if !blamed.fixed_issue_ids.iter().any(|id| id == issue_id) {
                                have_path = false;
                                debug!(
                                    blame = %blame_commit,
                                    issue = %issue.external_id,
                                    "inducing commit has no path to release, skipping issue"
                                );
                            }
                        } else if !aliases.contains_key(blame_file) {
                            // an unaliased production file points at a gap
                            // in the alias map
                            if filters::is_production_file(blame_file) {
                                debug!(
                                    blame = %blame_commit,
                                    file = %blame_file,
                                    issue = %issue.external_id,
                                    "blamed file resolves to no release file or alias"
                                );
                            }
                            skipped.insert(issue.external_id.clone());
                        } else {
                            inducing
                                .entry(blame_id)
                                .or_default()
                                .entry(blame_file.to_string())
                                .or_default()
                                .push(InducingRecord {
                                    issue_id: issue.external_id.clone(),
                                    fixed_at: fix_commit.committer_date,
                                    fix_revision: fix_commit.revision.clone(),
                                    priority: issue.priority.to_lowercase(),
                                    issue_type: issue
                                        .issue_type_verified
                                        .as_deref()
                                        .unwrap_or_default()
                                        .to_lowercase(),
                                    created_at: issue.created_at,
                                });
                        }
                    }
                }
            }
        }

        if !have_path {
            skipped.insert(issue.external_id.clone());
            for blame_id in &blame_ids {
                // may be absent when the relation was a hard suspect
                if inducing.remove(blame_id).is_some() {
                    debug!(blame = %blame_id, "removing attribution, issue has unreachable inducing commit");
                }
            }
        }
    }

    let mut ret: Attribution = BTreeMap::new();
    for by_file in inducing.into_values() {
        for (file, records) in by_file {
            let Some(release_file) = aliases.get(&file) else {
                continue;
            };
            let list = ret.entry(release_file.clone()).or_default();
            for record in records {
                if !list.contains(&record) {
                    debug!(issue = %record.issue_id, file = %release_file, "attributing issue");
                    skipped.remove(&record.issue_id);
                    list.push(record);
                }
            }
        }
    }
    if !skipped.is_empty() {
        debug!(count = skipped.len(), "issues skipped during induction-based attribution");
    }
    Ok(ret)
}

/// Fix-window attribution: attribute every bug issue whose fix commits land
/// within the configured window after the release to the release files the
/// fixes project onto. No induction step: every modified Java file of a
/// fix counts.
pub fn fix_window_issues(
    store: &ProjectStore,
    graph: &CommitGraph,
    config: &AnalysisConfig,
    cache: &mut RenameCache,
    release_files: &[String],
    release: &CommitRecord,
) -> Result<Attribution> {
    windowed_attribution(store, graph, config, cache, release_files, release, FixWindow::Szz)
}

/// Fix-window attribution restricted to fix actions that carry at least one
/// recorded inducing relation of the configured label; otherwise identical
/// to [`fix_window_issues`].
pub fn fix_window_issues_induced(
    store: &ProjectStore,
    graph: &CommitGraph,
    config: &AnalysisConfig,
    cache: &mut RenameCache,
    release_files: &[String],
    release: &CommitRecord,
) -> Result<Attribution> {
    windowed_attribution(
        store, graph, config, cache, release_files, release,
        FixWindow::InductionFiltered,
    )
}

#[derive(Clone, Copy, PartialEq)]
enum FixWindow {
    Szz,
    InductionFiltered,
}

impl FixWindow {
    fn label(self) -> &'static str {
        match self {
            FixWindow::Szz => LABEL_SZZ_BUGFIX,
            FixWindow::InductionFiltered => LABEL_ISSUEONLY_BUGFIX,
        }
    }

    fn issue_ids(self, commit: &CommitRecord) -> &[String] {
        match self {
            FixWindow::Szz => &commit.szz_issue_ids,
            FixWindow::InductionFiltered => &commit.linked_issue_ids,
        }
    }
}

fn windowed_attribution(
    store: &ProjectStore,
    graph: &CommitGraph,
    config: &AnalysisConfig,
    cache: &mut RenameCache,
    release_files: &[String],
    release: &CommitRecord,
    variant: FixWindow,
) -> Result<Attribution> {
    let window_end = release.committer_date + Months::new(config.fix_window_months);
    let release_set: HashSet<&str> = release_files.iter().map(|s| s.as_str()).collect();

    // bug issues fixed inside the window
    let mut fixed_issues: BTreeSet<String> = BTreeSet::new();
    for commit in store.commits_desc() {
        if commit.committer_date <= release.committer_date
            || commit.committer_date >= window_end
            || !commit.has_label(variant.label())
        {
            continue;
        }
        for issue_id in variant.issue_ids(commit) {
            let issue = store.issue(issue_id)?;
            if issue.issue_type.eq_ignore_ascii_case("bug") && issue.is_resolved_and_fixed() {
                fixed_issues.insert(issue.id.clone());
            }
        }
    }

    let mut ret: Attribution = release_files
        .iter()
        .map(|f| (f.clone(), Vec::new()))
        .collect();

    for issue_id in &fixed_issues {
        let issue = store.issue(issue_id)?;
        for fix_commit in store.commits_desc() {
            if fix_commit.committer_date <= release.committer_date
                || fix_commit.committer_date >= window_end
                || !fix_commit.has_label(variant.label())
                || !variant.issue_ids(fix_commit).iter().any(|id| id == issue_id)
            {
                continue;
            }

            let mut changed: HashSet<String> = HashSet::new();
            for fa in store.actions_of(&fix_commit.revision) {
                if fa.mode != ActionMode::Modify || !filters::is_java_file(&fa.file) {
                    continue;
                }
                if variant == FixWindow::InductionFiltered
                    && !store.inducing_actions_for(&fa.id).iter().any(|inducing| {
                        inducing.induces.iter().any(|r| {
                            r.change_action_id == fa.id && r.label == config.fix_window_label
                        })
                    })
                {
                    continue;
                }
                changed.insert(fa.file.clone());
            }

            if variant == FixWindow::InductionFiltered && changed.is_empty() {
                continue;
            }

            let projection = project_files(
                graph, store, cache, &changed,
                &fix_commit.revision, &release.revision,
            );
            if !projection.valid
                || !projection.files.iter().any(|f| release_set.contains(f.as_str()))
            {
                continue;
            }

            for file in &projection.files {
                let Some(list) = ret.get_mut(file) else {
                    continue;
                };
                let record = InducingRecord {
                    issue_id: issue.external_id.clone(),
                    fixed_at: fix_commit.committer_date,
                    fix_revision: fix_commit.revision.clone(),
                    priority: issue.priority.to_lowercase(),
                    issue_type: issue.issue_type.to_lowercase(),
                    created_at: issue.created_at,
                };
                if !list.contains(&record) {
                    list.push(record);
                }
            }
        }
    }

    Ok(ret)
}

fn validated_fixed_issues(store: &ProjectStore, release: &CommitRecord) -> Result<BTreeSet<String>> {
    let mut fixed: BTreeSet<String> = BTreeSet::new();
    for commit in store.commits_desc() {
        if commit.committer_date <= release.committer_date
            || !commit.has_label(LABEL_VALIDATED_BUGFIX)
            || commit.fixed_issue_ids.is_empty()
        {
            continue;
        }
        for issue_id in &commit.fixed_issue_ids {
            let issue = store.issue(issue_id)?;
            let verified_bug = issue
                .issue_type_verified
                .as_deref()
                .is_some_and(|t| t.eq_ignore_ascii_case("bug"));
            if verified_bug && issue.is_resolved_and_fixed() {
                fixed.insert(issue.id.clone());
            }
        }
    }
    Ok(fixed)
}

// ─── Tests ────────────────────────────────────────────────────────────────────
