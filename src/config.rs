use crate::error::{LineageError, Result};
use serde::Deserialize;
use std::path::Path;

/// All settings that can be placed in a .git-lineage.yml config file.
/// Every field is optional; omitted fields fall back to the defaults the
/// reference datasets were built with.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct AnalysisConfig {
    /// How many months after the release the fix-window attribution passes
    /// look for bug-fixing commits.
    pub fix_window_months: u32,

    /// How many months of history before the release the change-metric
    /// walk covers.
    pub metrics_window_months: u32,

    /// Minimum spacing in days between two static-metric snapshots.
    pub snapshot_window_days: i64,

    /// Inducing-relation label accepted by the induction-based attribution.
    pub induction_label: String,

    /// Inducing-relation label required by the induction-filtered
    /// fix-window attribution.
    pub fix_window_label: String,

    /// Restrict release files to production code (drop test/example trees).
    pub production_only: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            fix_window_months:     6,
            metrics_window_months: 6,
            snapshot_window_days:  14,
            induction_label:       "JLMIV+R".to_string(),
            fix_window_label:      "JL+R".to_string(),
            production_only:       true,
        }
    }
}

impl AnalysisConfig {
    /// Validates semantic constraints that serde cannot enforce.
    ///
    /// Returns a human-readable error describing exactly what is wrong.
    /// Called automatically by [`load_config`].
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.fix_window_months == 0 {
            return Err("Invalid 'fix_window_months' value: 0. \
                 The attribution window must span at least one month"
                .to_string());
        }
        if self.metrics_window_months == 0 {
            return Err("Invalid 'metrics_window_months' value: 0. \
                 The change-metric window must span at least one month"
                .to_string());
        }
        if self.snapshot_window_days < 1 {
            return Err(format!(
                "Invalid 'snapshot_window_days' value: {}. \
                 Snapshots need at least one day of spacing",
                self.snapshot_window_days
            ));
        }
        if self.induction_label.trim().is_empty() {
            return Err("Invalid 'induction_label': must not be empty".to_string());
        }
        if self.fix_window_label.trim().is_empty() {
            return Err("Invalid 'fix_window_label': must not be empty".to_string());
        }
        Ok(())
    }
}

/// Reads, parses, and validates a YAML config file from `path`.
pub fn load_config(path: &Path) -> Result<AnalysisConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        LineageError::Config(format!("Cannot read config file '{}': {e}", path.display()))
    })?;
    let cfg: AnalysisConfig = serde_yaml::from_str(&content).map_err(|e| {
        LineageError::Config(format!("Invalid config file '{}': {e}", path.display()))
    })?;
    cfg.validate()
        .map_err(|e| LineageError::Config(format!("Config file '{}': {e}", path.display())))?;
    Ok(cfg)
}

/// Annotated YAML template for callers that want to ship a starter file.
pub static TEMPLATE: &str = r#"# git-lineage configuration file
#
# All settings are optional. Omit any field to use the built-in default,
# which matches the settings the reference datasets were built with.

# ── Attribution windows ────────────────────────────────────────────────────────

# Months after the release in which bug-fixing commits are matched.
# fix_window_months: 6

# Months of history before the release covered by the change-metric walk.
# metrics_window_months: 6

# ── Static-metric snapshots ────────────────────────────────────────────────────

# Minimum spacing in days between two snapshots of the class metrics.
snapshot_window_days: 14

# ── Inducing-relation labels ───────────────────────────────────────────────────

# Label accepted by the induction-based attribution (validated, java-filtered
# blame).
# induction_label: "JLMIV+R"

# Label required by the induction-filtered fix-window attribution.
# fix_window_label: "JL+R"

# ── Release file selection ─────────────────────────────────────────────────────

# Restrict release files to production code (drop test/example trees).
# production_only: true
"#;

/// Writes the config template to `output_path`, or prints it to stdout.
pub fn write_template(output_path: Option<&Path>) -> Result<()> {
    match output_path {
        Some(path) => std::fs::write(path, TEMPLATE).map_err(|e| {
            LineageError::Config(format!(
                "Cannot write config template to '{}': {e}",
                path.display()
            ))
        }),
        None => {
            print!("{TEMPLATE}");
            Ok(())
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
