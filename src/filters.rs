use once_cell::sync::Lazy;
use regex::Regex;

// Test scaffolding, examples and tooling live under these path segments in
// the projects we mine; they never ship in a release.
static NON_PRODUCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(^|/)(tests?|testing|examples?|samples?|tools?)(/|$)").unwrap()
});

static GENERATED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(^|/)(package-info\.java|module-info\.java)$").unwrap()
});

/// True for any Java source file.
pub fn is_java_file(path: &str) -> bool {
    path.ends_with(".java")
}

/// True for Java files that belong to the shipped production code: excludes
/// test/example/tool trees and declaration-only files.
pub fn is_production_file(path: &str) -> bool {
    is_java_file(path) && !NON_PRODUCTION.is_match(path) && !GENERATED.is_match(path)
}

/// Applies either filter depending on the session setting.
pub fn accepts(path: &str, production_only: bool) -> bool {
    if production_only {
        is_production_file(path)
    } else {
        is_java_file(path)
    }
}
