use crate::analyzers::attribution::{
    fix_window_issues, fix_window_issues_induced, induced_issues, Attribution,
};
use crate::analyzers::identity::{resolve_identities, IdentityOutcome};
use crate::analyzers::metrics::{collect_change_metrics, snapshot_deltas, ChangeWalkOutcome};
use crate::analyzers::renames::RenameCache;
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::filters;
use crate::graph::walker::{enumerate_paths, Direction, Path};
use crate::graph::CommitGraph;
use crate::store::{CommitRecord, ProjectStore};
use crate::types::{ChangeMetricsRecord, RenameEvent};
use chrono::{DateTime, Months, Utc};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// One analysis session for one target release.
///
/// Construction selects the release files, walks the full history back to
/// the origin, and resolves every file's identity (alias map, first
/// occurrences, rename events) plus the windowed change metrics. The
/// attribution passes run on demand. All caches are scoped to the session
/// and never shared.
#[derive(Debug)]
pub struct ReleaseSession<'a> {
    store: &'a ProjectStore,
    graph: &'a CommitGraph,
    config: AnalysisConfig,
    release: &'a CommitRecord,
    release_files: Vec<String>,
    identity: IdentityOutcome,
    change_walk: ChangeWalkOutcome,
    rename_cache: RenameCache,
}

impl<'a> ReleaseSession<'a> {
    pub fn new(
        store: &'a ProjectStore,
        graph: &'a CommitGraph,
        config: AnalysisConfig,
        release_hash: &str,
    ) -> Result<Self> {
        let release = store.commit(release_hash)?;

        // release files: java file entity states of the release commit
        let mut release_files: Vec<String> = Vec::new();
        for state_id in &release.entity_state_ids {
            let state = store.entity_state(state_id)?;
            if state.ce_type == "file" && filters::accepts(&state.long_name, config.production_only)
            {
                release_files.push(state.long_name.clone());
            }
        }
        release_files.sort();
        release_files.dedup();
        debug!(
            release = %release_hash,
            files = release_files.len(),
            "selected release files"
        );

        let origin_paths = enumerate_paths(graph, release_hash, Direction::Backward, None)?;

        let cutoff = release.committer_date - Months::new(config.metrics_window_months);
        let break_before_cutoff = |revision: &str| match store.commit(revision) {
            Ok(commit) => commit.committer_date < cutoff,
            Err(_) => {
                warn!(revision = %revision, "commit on path missing from store, truncating walk");
                true
            }
        };
        let change_paths: Vec<Path> = enumerate_paths(
            graph,
            release_hash,
            Direction::Backward,
            Some(&break_before_cutoff),
        )?;

        let mut rename_cache = RenameCache::new();
        let identity = resolve_identities(
            store,
            graph,
            &mut rename_cache,
            &origin_paths,
            &release_files,
            release_hash,
        )?;

        let change_walk = collect_change_metrics(
            store,
            &identity.aliases,
            &identity.first_occurrences,
            &release_files,
            release,
            &change_paths,
            config.snapshot_window_days,
        )?;

        Ok(ReleaseSession {
            store,
            graph,
            config,
            release,
            release_files,
            identity,
            change_walk,
            rename_cache,
        })
    }

    pub fn release_files(&self) -> &[String] {
        &self.release_files
    }

    pub fn release_revision(&self) -> &str {
        &self.release.revision
    }

    pub fn release_date(&self) -> DateTime<Utc> {
        self.release.committer_date
    }

    /// Date of the file's latest surviving addition, if one was found.
    pub fn first_occurred(&self, file: &str) -> Option<DateTime<Utc>> {
        self.identity.first_occurrences.get(file).copied()
    }

    /// The release file a historical path resolves to, if any.
    pub fn alias_of(&self, path: &str) -> Option<&str> {
        self.identity.aliases.get(path).map(String::as_str)
    }

    /// The file's most recent rename transition, if it was ever renamed.
    pub fn rename_event(&self, file: &str) -> Option<&RenameEvent> {
        self.identity.rename_events.get(file)
    }

    /// Per-file change history over the metrics window.
    pub fn change_metrics(&self) -> &BTreeMap<String, ChangeMetricsRecord> {
        &self.change_walk.change_metrics
    }

    /// Absolute-delta matrix of the windowed static-metric snapshots.
    pub fn dambros_deltas(&self) -> BTreeMap<String, BTreeMap<String, Vec<f64>>> {
        snapshot_deltas(&self.change_walk.snapshots, &self.release_files)
    }

    /// Induction-based defect attribution (validated fixes, blame edges,
    /// alias translation).
    pub fn issues(&self) -> Result<Attribution> {
        induced_issues(
            self.store,
            self.graph,
            &self.config,
            &self.identity.aliases,
            self.release,
        )
    }

    /// Fix-window attribution without the induction step.
    pub fn issues_six_months_szz(&mut self) -> Result<Attribution> {
        fix_window_issues(
            self.store,
            self.graph,
            &self.config,
            &mut self.rename_cache,
            &self.release_files,
            self.release,
        )
    }

    /// Fix-window attribution restricted to fix actions with a recorded
    /// inducing relation.
    pub fn issues_six_months_szzr(&mut self) -> Result<Attribution> {
        fix_window_issues_induced(
            self.store,
            self.graph,
            &self.config,
            &mut self.rename_cache,
            &self.release_files,
            self.release,
        )
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
