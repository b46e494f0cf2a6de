use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

// ─── Constants ────────────────────────────────────────────────────────────────

/// Change-type taxonomy used to normalize classifier output. Every
/// classification entry is seeded with all of these at zero before the
/// observed counts are added.
pub const CHANGE_TYPES: &[&str] = &[
    "additional_class",
    "additional_functionality",
    "additional_object_state",
    "alternative_part_delete",
    "alternative_part_insert",
    "attribute_renaming",
    "attribute_type_change",
    "class_renaming",
    "comment_delete",
    "comment_insert",
    "comment_move",
    "comment_update",
    "condition_expression_change",
    "decreasing_accessibility_change",
    "doc_delete",
    "doc_insert",
    "doc_update",
    "increasing_accessibility_change",
    "method_renaming",
    "parameter_delete",
    "parameter_insert",
    "parameter_ordering_change",
    "parameter_renaming",
    "parameter_type_change",
    "parent_class_change",
    "parent_class_delete",
    "parent_class_insert",
    "parent_interface_change",
    "parent_interface_delete",
    "parent_interface_insert",
    "removed_class",
    "removed_functionality",
    "removed_object_state",
    "removing_attribute_modifiability",
    "removing_class_derivability",
    "removing_method_overridability",
    "return_type_change",
    "return_type_delete",
    "return_type_insert",
    "statement_delete",
    "statement_insert",
    "statement_ordering_change",
    "statement_parent_change",
    "statement_update",
    "unclassified_change",
];

/// Object-oriented metrics tracked by the windowed snapshot sampler.
/// The hyphenated names are differences computed at sampling time from the
/// averaged base metrics.
pub const SNAPSHOT_METRICS: &[&str] = &[
    "wmc", "dit", "rfc", "noc", "cbo", "lcom5", "nii", "noi",
    "tna", "tnpa", "tna-tnpa", "tna-tnla", "tloc",
    "tnm", "tnlpm", "tnm-tnpm", "tnm-tnlm",
];

/// Sentinel written into a snapshot delta series when either snapshot of a
/// pair has no data for the file.
pub const SNAPSHOT_MISSING: f64 = -1.0;

// ─── Attribution output ───────────────────────────────────────────────────────

/// One defect attributed to a release file: the fixed issue plus the
/// bug-fixing commit it was matched through. Deduplicated per file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InducingRecord {
    pub issue_id: String,
    pub fixed_at: DateTime<Utc>,
    pub fix_revision: String,
    pub priority: String,
    pub issue_type: String,
    pub created_at: DateTime<Utc>,
}

// ─── Change metrics output ────────────────────────────────────────────────────

/// Issue metadata linked to a commit that touched a release file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkedIssue {
    pub external_id: String,
    pub priority: String,
    pub issue_type: String,
}

/// Per-release-file change history, all lists ordered oldest to newest.
/// The list indices line up across `authors`, `revisions`, `lines_added`,
/// `lines_deleted`, `changesets`, `commit_messages` and `days_from_release`
/// (one entry per file-touching commit); `ages` can be shorter when the
/// file has no resolvable first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChangeMetricsRecord {
    pub change_types: Vec<BTreeMap<String, i64>>,
    pub authors: Vec<String>,
    pub revisions: Vec<String>,
    pub lines_added: Vec<i64>,
    pub lines_deleted: Vec<i64>,
    pub changesets: Vec<usize>,
    pub ages: Vec<i64>,
    pub linked_issues: Vec<LinkedIssue>,
    pub commit_messages: Vec<String>,
    pub days_from_release: Vec<i64>,
    pub refactorings: Vec<String>,
    pub age: Option<i64>,
    pub first_occurrence: Option<DateTime<Utc>>,
}

// ─── Identity output ──────────────────────────────────────────────────────────

/// The most recent rename transition of a release file: what the file was
/// called one hop back, and at which parent revision that name was current.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenameEvent {
    pub parent_revision: String,
    pub old_path: String,
}

/// A snapshot of averaged per-file class metrics at one sampled commit.
pub type Snapshot = BTreeMap<String, BTreeMap<String, f64>>;
