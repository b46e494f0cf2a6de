use crate::error::{LineageError, Result};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

// ─── Records ──────────────────────────────────────────────────────────────────

/// What a file action did to its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionMode {
    Add,
    Modify,
    Delete,
    Rename,
    Copy,
}

/// One commit as mined from the version control system, together with the
/// issue links and labels produced by the upstream labeling pipeline.
#[derive(Debug, Clone)]
pub struct CommitRecord {
    pub revision: String,
    pub parents: Vec<String>,
    pub committer_date: DateTime<Utc>,
    pub author_date: DateTime<Utc>,
    pub author: String,
    pub message: String,
    /// Labels such as "validated_bugfix", "adjustedszz_bugfix",
    /// "issueonly_bugfix".
    pub labels: HashSet<String>,
    /// Manually validated commit → issue links.
    pub fixed_issue_ids: Vec<String>,
    /// Heuristically linked issues (commit message references).
    pub linked_issue_ids: Vec<String>,
    /// Issue links produced by the SZZ labeling run.
    pub szz_issue_ids: Vec<String>,
    /// Code entity states captured at this commit.
    pub entity_state_ids: Vec<String>,
}

impl CommitRecord {
    pub fn new(revision: impl Into<String>, committer_date: DateTime<Utc>, parents: Vec<String>) -> Self {
        CommitRecord {
            revision: revision.into(),
            parents,
            committer_date,
            author_date: committer_date,
            author: String::new(),
            message: String::new(),
            labels: HashSet::new(),
            fixed_issue_ids: Vec::new(),
            linked_issue_ids: Vec::new(),
            szz_issue_ids: Vec::new(),
            entity_state_ids: Vec::new(),
        }
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}

/// A blame edge recorded on the *inducing* file action, pointing at the
/// fixing action it is suspected to have caused.
#[derive(Debug, Clone)]
pub struct InducingRelation {
    pub change_action_id: String,
    pub label: String,
    pub szz_type: String,
}

/// One file touched by one commit.
#[derive(Debug, Clone)]
pub struct FileActionRecord {
    pub id: String,
    pub commit: String,
    pub file: String,
    /// Source path for renames and copies.
    pub old_file: Option<String>,
    pub mode: ActionMode,
    pub lines_added: i64,
    pub lines_deleted: i64,
    pub hunks: usize,
    pub induces: Vec<InducingRelation>,
}

impl FileActionRecord {
    pub fn new(
        id: impl Into<String>,
        commit: impl Into<String>,
        file: impl Into<String>,
        mode: ActionMode,
    ) -> Self {
        FileActionRecord {
            id: id.into(),
            commit: commit.into(),
            file: file.into(),
            old_file: None,
            mode,
            lines_added: 0,
            lines_deleted: 0,
            hunks: 0,
            induces: Vec::new(),
        }
    }
}

/// Issue tracker record.
#[derive(Debug, Clone)]
pub struct IssueRecord {
    pub id: String,
    pub external_id: String,
    pub issue_type: String,
    /// Manually verified type, when the validation pass ran.
    pub issue_type_verified: Option<String>,
    pub priority: String,
    pub created_at: DateTime<Utc>,
    pub status: String,
    pub resolution: Option<String>,
}

impl IssueRecord {
    /// The issue reached a terminal state and was resolved as fixed.
    pub fn is_resolved_and_fixed(&self) -> bool {
        let closed = self.status.eq_ignore_ascii_case("resolved")
            || self.status.eq_ignore_ascii_case("closed");
        let fixed = self
            .resolution
            .as_deref()
            .is_some_and(|r| r.eq_ignore_ascii_case("fixed"));
        closed && fixed
    }
}

/// One refactoring detected at a commit, with the code entity state it
/// produced.
#[derive(Debug, Clone)]
pub struct RefactoringRecord {
    pub commit: String,
    pub refactoring_type: String,
    pub entity_state_after: Option<String>,
}

/// State of a code entity (file or class) at one commit, with its static
/// metric vector. Metric names are upper-case.
#[derive(Debug, Clone)]
pub struct CodeEntityStateRecord {
    pub id: String,
    pub ce_type: String,
    pub long_name: String,
    pub file_path: String,
    pub metrics: HashMap<String, f64>,
}

/// Change-type classification between two adjacent commits:
/// file path → change-type name → count.
#[derive(Debug, Clone)]
pub struct CommitChangesRecord {
    pub old_revision: String,
    pub new_revision: String,
    pub classification: HashMap<String, HashMap<String, i64>>,
}

// ─── Store ────────────────────────────────────────────────────────────────────

/// In-memory, indexed view of one project's mined records. Loading the
/// records from wherever they live is the caller's concern; the store only
/// answers the queries the engines need.
///
/// Lookups of *referenced* records (commits, issues, entity states) fail
/// with [`LineageError::NotFound`] when the record is missing; the metrics
/// depend on complete provenance. Queries where absence is an expected
/// outcome (file actions of a commit, a classification for a commit pair)
/// return empty collections or `None`.
#[derive(Debug)]
pub struct ProjectStore {
    commits: Vec<CommitRecord>,
    commit_index: HashMap<String, usize>,
    desc_order: Vec<usize>,
    actions: Vec<FileActionRecord>,
    actions_by_commit: HashMap<String, Vec<usize>>,
    induced_by: HashMap<String, Vec<usize>>,
    issues: HashMap<String, IssueRecord>,
    refactorings_by_commit: HashMap<String, Vec<RefactoringRecord>>,
    entity_states: HashMap<String, CodeEntityStateRecord>,
    commit_changes: HashMap<(String, String), CommitChangesRecord>,
}

impl ProjectStore {
    pub fn new(
        commits: Vec<CommitRecord>,
        actions: Vec<FileActionRecord>,
        issues: Vec<IssueRecord>,
        refactorings: Vec<RefactoringRecord>,
        entity_states: Vec<CodeEntityStateRecord>,
        commit_changes: Vec<CommitChangesRecord>,
    ) -> Self {
        let commit_index: HashMap<String, usize> = commits
            .iter()
            .enumerate()
            .map(|(i, c)| (c.revision.clone(), i))
            .collect();

        // newest first, author date as tiebreak
        let mut desc_order: Vec<usize> = (0..commits.len()).collect();
        desc_order.sort_by(|&a, &b| {
            let (ca, cb) = (&commits[a], &commits[b]);
            cb.committer_date
                .cmp(&ca.committer_date)
                .then(cb.author_date.cmp(&ca.author_date))
        });

        let mut actions_by_commit: HashMap<String, Vec<usize>> = HashMap::new();
        let mut induced_by: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, fa) in actions.iter().enumerate() {
            actions_by_commit.entry(fa.commit.clone()).or_default().push(i);
            for relation in &fa.induces {
                induced_by
                    .entry(relation.change_action_id.clone())
                    .or_default()
                    .push(i);
            }
        }

        let mut refactorings_by_commit: HashMap<String, Vec<RefactoringRecord>> = HashMap::new();
        for r in refactorings {
            refactorings_by_commit.entry(r.commit.clone()).or_default().push(r);
        }

        ProjectStore {
            commits,
            commit_index,
            desc_order,
            actions,
            actions_by_commit,
            induced_by,
            issues: issues.into_iter().map(|i| (i.id.clone(), i)).collect(),
            refactorings_by_commit,
            entity_states: entity_states.into_iter().map(|e| (e.id.clone(), e)).collect(),
            commit_changes: commit_changes
                .into_iter()
                .map(|cc| ((cc.old_revision.clone(), cc.new_revision.clone()), cc))
                .collect(),
        }
    }

    pub fn commit(&self, revision: &str) -> Result<&CommitRecord> {
        self.commit_index
            .get(revision)
            .map(|&i| &self.commits[i])
            .ok_or_else(|| LineageError::not_found("commit", revision))
    }

    pub fn contains_commit(&self, revision: &str) -> bool {
        self.commit_index.contains_key(revision)
    }

    /// All commits, newest committer date first.
    pub fn commits_desc(&self) -> impl Iterator<Item = &CommitRecord> {
        self.desc_order.iter().map(|&i| &self.commits[i])
    }

    /// File actions of one commit, in record order. Empty when the commit
    /// touched no files or is unknown.
    pub fn actions_of(&self, revision: &str) -> Vec<&FileActionRecord> {
        self.actions_by_commit
            .get(revision)
            .map(|ids| ids.iter().map(|&i| &self.actions[i]).collect())
            .unwrap_or_default()
    }

    pub fn issue(&self, id: &str) -> Result<&IssueRecord> {
        self.issues
            .get(id)
            .ok_or_else(|| LineageError::not_found("issue", id))
    }

    pub fn refactorings_of(&self, revision: &str) -> &[RefactoringRecord] {
        self.refactorings_by_commit
            .get(revision)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn entity_state(&self, id: &str) -> Result<&CodeEntityStateRecord> {
        self.entity_states
            .get(id)
            .ok_or_else(|| LineageError::not_found("code entity state", id))
    }

    /// Classification between two adjacent commits; absence is a normal
    /// outcome (the classifier does not cover every pair).
    pub fn commit_changes(&self, old_revision: &str, new_revision: &str) -> Option<&CommitChangesRecord> {
        self.commit_changes
            .get(&(old_revision.to_string(), new_revision.to_string()))
    }

    /// File actions carrying at least one inducing relation that blames them
    /// for `action_id`. The caller still has to match the relation's label
    /// and suspicion level.
    pub fn inducing_actions_for(&self, action_id: &str) -> Vec<&FileActionRecord> {
        self.induced_by
            .get(action_id)
            .map(|ids| ids.iter().map(|&i| &self.actions[i]).collect())
            .unwrap_or_default()
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(n: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, n, 12, 0, 0).unwrap()
    }

    fn store_with_two_commits() -> ProjectStore {
        let c1 = CommitRecord::new("aaa", day(1), vec![]);
        let c2 = CommitRecord::new("bbb", day(2), vec!["aaa".to_string()]);
        let mut fix = FileActionRecord::new("fa2", "bbb", "src/main/java/A.java", ActionMode::Modify);
        fix.lines_added = 3;
        let mut inducing = FileActionRecord::new("fa1", "aaa", "src/main/java/A.java", ActionMode::Add);
        inducing.induces.push(InducingRelation {
            change_action_id: "fa2".to_string(),
            label: "JLMIV+R".to_string(),
            szz_type: "inducing".to_string(),
        });
        ProjectStore::new(
            vec![c1, c2],
            vec![fix, inducing],
            vec![],
            vec![],
            vec![],
            vec![],
        )
    }

    #[test]
    fn test_commit_lookup_and_not_found() {
        let store = store_with_two_commits();
        assert_eq!(store.commit("aaa").unwrap().revision, "aaa");
        let err = store.commit("zzz").unwrap_err();
        assert!(
            err.to_string().contains("zzz"),
            "NotFound error should carry the id: {err}"
        );
    }

    #[test]
    fn test_commits_desc_orders_newest_first() {
        let store = store_with_two_commits();
        let order: Vec<&str> = store.commits_desc().map(|c| c.revision.as_str()).collect();
        assert_eq!(order, vec!["bbb", "aaa"], "newest committer date must come first");
    }

    #[test]
    fn test_actions_of_unknown_commit_is_empty() {
        let store = store_with_two_commits();
        assert!(store.actions_of("zzz").is_empty());
        assert_eq!(store.actions_of("bbb").len(), 1);
    }

    #[test]
    fn test_inducing_index_points_back_at_blamed_action() {
        let store = store_with_two_commits();
        let inducing = store.inducing_actions_for("fa2");
        assert_eq!(inducing.len(), 1, "fa1 blames fa2");
        assert_eq!(inducing[0].id, "fa1");
        assert!(store.inducing_actions_for("fa1").is_empty(), "nothing blames fa1");
    }

    #[test]
    fn test_commit_changes_absence_is_none() {
        let store = store_with_two_commits();
        assert!(store.commit_changes("aaa", "bbb").is_none());
    }

    #[test]
    fn test_issue_resolved_and_fixed() {
        let issue = IssueRecord {
            id: "1".to_string(),
            external_id: "PROJ-1".to_string(),
            issue_type: "Bug".to_string(),
            issue_type_verified: None,
            priority: "Major".to_string(),
            created_at: day(1),
            status: "Closed".to_string(),
            resolution: Some("Fixed".to_string()),
        };
        assert!(issue.is_resolved_and_fixed());

        let open = IssueRecord {
            status: "Open".to_string(),
            ..issue.clone()
        };
        assert!(!open.is_resolved_and_fixed(), "open issues are not fixed");

        let wont_fix = IssueRecord {
            resolution: Some("Won't Fix".to_string()),
            ..issue
        };
        assert!(!wont_fix.is_resolved_and_fixed(), "non-fixed resolutions do not count");
    }

    #[test]
    fn test_author_date_breaks_committer_ties() {
        let mut c1 = CommitRecord::new("aaa", day(5), vec![]);
        c1.author_date = day(1);
        let mut c2 = CommitRecord::new("bbb", day(5), vec![]);
        c2.author_date = day(3);
        let store = ProjectStore::new(vec![c1, c2], vec![], vec![], vec![], vec![], vec![]);
        let order: Vec<&str> = store.commits_desc().map(|c| c.revision.as_str()).collect();
        assert_eq!(order, vec!["bbb", "aaa"], "later author date wins the tie");
    }
}
