//! Matching: does an entry apply to a path, and is a path ignored?
//!
//! Entries are compiled once at normalization time (glob strings become
//! [`GlobPattern`]s; invalid syntax surfaces as a validation error naming
//! the key). Queries then run over compiled patterns only.
//!
//! Two separate algebras live here:
//!
//! - **Per-entry match**: the entry's `files` side matches when any element
//!   matches (AND-sequences need every member); its `ignores` side can then
//!   take the match away, using the same ordered fold as global ignores.
//! - **The ignore fold**: patterns apply left to right. A non-negated match
//!   flips the state to ignored, a negated match flips it back, and the
//!   final state decides. Predicates can ignore but never re-include.
//!
//! The ancestor-directory rule for *global* ignores (an ignored directory
//! ignores everything below it) is the array's top-down walk, built on
//! [`should_ignore`] with the directory flag set.

use std::path::{Component, Path};
use std::sync::Arc;

use crate::error::PerfigError;
use crate::pattern::GlobPattern;
use crate::types::{ConfigEntry, FilePattern, Pattern, PredicateFn};

/// A pattern ready for matching.
#[derive(Clone)]
pub(crate) enum CompiledPattern {
    Glob(GlobPattern),
    Predicate(PredicateFn),
}

impl std::fmt::Debug for CompiledPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompiledPattern::Glob(g) => f.debug_tuple("Glob").field(g).finish(),
            CompiledPattern::Predicate(_) => f.debug_tuple("Predicate").finish(),
        }
    }
}

/// One compiled `files` element.
#[derive(Clone, Debug)]
pub(crate) enum CompiledFilePattern {
    One(CompiledPattern),
    All(Vec<CompiledPattern>),
}

/// An entry with its patterns compiled.
#[derive(Clone, Debug)]
pub(crate) struct CompiledEntry {
    pub(crate) entry: ConfigEntry,
    pub(crate) files: Option<Vec<CompiledFilePattern>>,
    pub(crate) ignores: Option<Vec<CompiledPattern>>,
}

impl CompiledEntry {
    pub(crate) fn compile(entry: ConfigEntry) -> Result<Self, PerfigError> {
        let files = entry
            .files
            .as_ref()
            .map(|list| {
                list.iter()
                    .map(compile_file_pattern)
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;
        let ignores = entry
            .ignores
            .as_ref()
            .map(|list| {
                list.iter()
                    .map(|pattern| compile_pattern(pattern, "ignores"))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;
        Ok(CompiledEntry {
            entry,
            files,
            ignores,
        })
    }
}

fn compile_file_pattern(pattern: &FilePattern) -> Result<CompiledFilePattern, PerfigError> {
    match pattern {
        FilePattern::One(p) => Ok(CompiledFilePattern::One(compile_pattern(p, "files")?)),
        FilePattern::All(members) => Ok(CompiledFilePattern::All(
            members
                .iter()
                .map(|p| compile_pattern(p, "files"))
                .collect::<Result<Vec<_>, _>>()?,
        )),
    }
}

fn compile_pattern(pattern: &Pattern, key: &str) -> Result<CompiledPattern, PerfigError> {
    match pattern {
        Pattern::Glob(text) => GlobPattern::parse(text)
            .map(CompiledPattern::Glob)
            .map_err(|e| PerfigError::validation(key, e.to_string())),
        Pattern::Predicate(f) => Ok(CompiledPattern::Predicate(Arc::clone(f))),
    }
}

/// Forward-slash path of `path` relative to `base_path`. `None` when the
/// path escapes the base — such paths are treated as globally ignored.
pub(crate) fn relative_to(base_path: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(base_path).ok()?;
    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(parts.join("/"))
}

/// Does the entry apply to this file? The `files` side must match and the
/// entry's own `ignores` must not exclude it. Files-less entries apply to
/// anything their `ignores` does not exclude.
pub(crate) fn entry_applies(
    compiled: &CompiledEntry,
    absolute_path: &Path,
    relative_path: &str,
) -> Result<bool, PerfigError> {
    let Some(files) = &compiled.files else {
        if !compiled.entry.is_universal() {
            return Ok(false);
        }
        return Ok(match &compiled.ignores {
            Some(ignores) => !should_ignore(ignores, absolute_path, relative_path, false),
            None => true,
        });
    };

    if files.is_empty() {
        return Err(PerfigError::InvalidFiles);
    }

    let mut matched = files
        .iter()
        .any(|fp| file_pattern_matches(fp, absolute_path, relative_path));
    if matched && let Some(ignores) = &compiled.ignores {
        matched = !should_ignore(ignores, absolute_path, relative_path, false);
    }
    Ok(matched)
}

/// The `files` side alone, ignoring the entry's `ignores` — whether the
/// config *speaks about* this file.
pub(crate) fn entry_files_match(
    compiled: &CompiledEntry,
    absolute_path: &Path,
    relative_path: &str,
) -> Result<bool, PerfigError> {
    let Some(files) = &compiled.files else {
        return Ok(false);
    };
    if files.is_empty() {
        return Err(PerfigError::InvalidFiles);
    }
    Ok(files
        .iter()
        .any(|fp| file_pattern_matches(fp, absolute_path, relative_path)))
}

fn file_pattern_matches(
    pattern: &CompiledFilePattern,
    absolute_path: &Path,
    relative_path: &str,
) -> bool {
    match pattern {
        CompiledFilePattern::One(p) => pattern_matches_path(p, absolute_path, relative_path),
        CompiledFilePattern::All(members) => {
            !members.is_empty()
                && members
                    .iter()
                    .all(|p| pattern_matches_path(p, absolute_path, relative_path))
        }
    }
}

/// `files`-side evaluation of one pattern: negated globs invert.
fn pattern_matches_path(
    pattern: &CompiledPattern,
    absolute_path: &Path,
    relative_path: &str,
) -> bool {
    match pattern {
        CompiledPattern::Glob(glob) => {
            let hit = glob.matches(relative_path, false);
            if glob.negated() { !hit } else { hit }
        }
        CompiledPattern::Predicate(f) => f(absolute_path),
    }
}

/// The ordered gitignore fold. Strings see the relative path, predicates
/// the absolute one. Predicates act only while the state is included.
pub(crate) fn should_ignore(
    patterns: &[CompiledPattern],
    absolute_path: &Path,
    relative_path: &str,
    is_dir: bool,
) -> bool {
    let mut ignored = false;
    for pattern in patterns {
        match pattern {
            CompiledPattern::Predicate(f) => {
                if !ignored {
                    ignored = f(absolute_path);
                }
            }
            CompiledPattern::Glob(glob) => {
                if !ignored {
                    if !glob.negated() && glob.matches(relative_path, is_dir) {
                        ignored = true;
                    }
                } else if glob.negated() && glob.matches(relative_path, is_dir) {
                    ignored = false;
                }
            }
        }
    }
    ignored
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compile(entry: ConfigEntry) -> CompiledEntry {
        CompiledEntry::compile(entry).unwrap()
    }

    fn compile_ignores(patterns: &[&str]) -> Vec<CompiledPattern> {
        patterns
            .iter()
            .map(|text| compile_pattern(&Pattern::glob(*text), "ignores").unwrap())
            .collect()
    }

    fn abs(rel: &str) -> std::path::PathBuf {
        Path::new("/base").join(rel)
    }

    #[test]
    fn relative_to_strips_the_base() {
        let base = Path::new("/base");
        assert_eq!(
            relative_to(base, Path::new("/base/a/b.js")).as_deref(),
            Some("a/b.js")
        );
        assert_eq!(relative_to(base, Path::new("/base")).as_deref(), Some(""));
    }

    #[test]
    fn relative_to_detects_escapes() {
        let base = Path::new("/base");
        assert_eq!(relative_to(base, Path::new("/elsewhere/a.js")), None);
        assert_eq!(relative_to(base, Path::new("/base/../a.js")), None);
    }

    #[test]
    fn files_match_any_element() {
        let entry = compile(ConfigEntry::new().files(["**/*.js", "**/*.ts"]));
        assert!(entry_applies(&entry, &abs("foo.ts"), "foo.ts").unwrap());
        assert!(!entry_applies(&entry, &abs("foo.md"), "foo.md").unwrap());
    }

    #[test]
    fn and_sequence_requires_every_member() {
        let entry = compile(
            ConfigEntry::new().files(vec![FilePattern::all(["*.and.*", "*.js"])]),
        );
        assert!(entry_applies(&entry, &abs("foo.and.js"), "foo.and.js").unwrap());
        assert!(!entry_applies(&entry, &abs("foo.and.ts"), "foo.and.ts").unwrap());
        assert!(!entry_applies(&entry, &abs("foo.js"), "foo.js").unwrap());
    }

    #[test]
    fn negated_files_pattern_inverts() {
        let entry = compile(
            ConfigEntry::new().files(vec![FilePattern::all(["**/*.js", "!**/*.min.js"])]),
        );
        assert!(entry_applies(&entry, &abs("app.js"), "app.js").unwrap());
        assert!(!entry_applies(&entry, &abs("app.min.js"), "app.min.js").unwrap());
    }

    #[test]
    fn entry_ignores_take_the_match_away() {
        let entry = compile(
            ConfigEntry::new()
                .files(["**/*.js"])
                .ignores(["**/*.test.js"]),
        );
        assert!(entry_applies(&entry, &abs("app.js"), "app.js").unwrap());
        assert!(!entry_applies(&entry, &abs("app.test.js"), "app.test.js").unwrap());
    }

    #[test]
    fn entry_ignores_respect_negation_order() {
        let entry = compile(
            ConfigEntry::new()
                .files(["**/*.js"])
                .ignores(["**/*.test.js", "!foo.test.js"]),
        );
        assert!(!entry_applies(&entry, &abs("bar.test.js"), "bar.test.js").unwrap());
        assert!(entry_applies(&entry, &abs("foo.test.js"), "foo.test.js").unwrap());
    }

    #[test]
    fn files_less_entry_applies_everywhere() {
        let entry = compile(ConfigEntry::new().value("defs", json!({"name": "cfg"})));
        assert!(entry_applies(&entry, &abs("anything.txt"), "anything.txt").unwrap());
    }

    #[test]
    fn files_less_entry_with_ignores_is_excludable() {
        let entry = compile(
            ConfigEntry::new()
                .ignores(["vendor/"])
                .value("defs", json!({})),
        );
        assert!(entry_applies(&entry, &abs("app.js"), "app.js").unwrap());
        assert!(!entry_applies(&entry, &abs("vendor/app.js"), "vendor/app.js").unwrap());
    }

    #[test]
    fn global_ignore_shaped_entry_never_applies() {
        let entry = compile(ConfigEntry::new().ignores(["dist/"]));
        assert!(!entry_applies(&entry, &abs("app.js"), "app.js").unwrap());
    }

    #[test]
    fn empty_files_is_invalid_at_query_time() {
        let entry = compile(ConfigEntry::new().files(Vec::<&str>::new()));
        let err = entry_applies(&entry, &abs("app.js"), "app.js").unwrap_err();
        assert!(matches!(err, PerfigError::InvalidFiles));
    }

    #[test]
    fn explicit_match_ignores_the_ignores() {
        let entry = compile(
            ConfigEntry::new()
                .files(["**/*.js"])
                .ignores(["skip.js"]),
        );
        assert!(!entry_applies(&entry, &abs("skip.js"), "skip.js").unwrap());
        assert!(entry_files_match(&entry, &abs("skip.js"), "skip.js").unwrap());
    }

    #[test]
    fn predicate_files_see_the_absolute_path() {
        let entry = compile(ConfigEntry::new().files(vec![FilePattern::One(
            Pattern::predicate(|p: &Path| p.starts_with("/base")),
        )]));
        assert!(entry_applies(&entry, &abs("x.html"), "x.html").unwrap());
        assert!(!entry_applies(&entry, Path::new("/other/x.html"), "x.html").unwrap());
    }

    #[test]
    fn fold_last_match_wins() {
        let ignores = compile_ignores(&["**/*.txt", "!a.txt"]);
        assert!(should_ignore(&ignores, &abs("b.txt"), "b.txt", false));
        assert!(!should_ignore(&ignores, &abs("a.txt"), "a.txt", false));
    }

    #[test]
    fn fold_negation_before_match_is_inert() {
        let ignores = compile_ignores(&["!a.txt", "**/*.txt"]);
        assert!(should_ignore(&ignores, &abs("a.txt"), "a.txt", false));
    }

    #[test]
    fn fold_reignore_after_negation() {
        let ignores = compile_ignores(&["**/*.txt", "!a.txt", "a.txt"]);
        assert!(should_ignore(&ignores, &abs("a.txt"), "a.txt", false));
    }

    #[test]
    fn fold_directory_only_pattern_reaches_files_through_ancestors() {
        let ignores = compile_ignores(&["foo/"]);
        assert!(should_ignore(&ignores, &abs("foo/a.js"), "foo/a.js", false));
        assert!(!should_ignore(&ignores, &abs("foo"), "foo", false));
        assert!(should_ignore(&ignores, &abs("foo"), "foo", true));
    }

    #[test]
    fn fold_predicates_ignore_but_never_reinclude() {
        let banned: PredicateFn = Arc::new(|p: &Path| p.to_string_lossy().contains("secret"));
        let patterns = vec![
            CompiledPattern::Predicate(Arc::clone(&banned)),
            compile_pattern(&Pattern::glob("!**/secret.js"), "ignores").unwrap(),
        ];
        // The negated glob re-includes after the predicate ignored it.
        assert!(!should_ignore(
            &patterns,
            &abs("secret.js"),
            "secret.js",
            false
        ));

        let patterns = vec![
            compile_pattern(&Pattern::glob("**/*.js"), "ignores").unwrap(),
            CompiledPattern::Predicate(banned),
        ];
        // Predicates cannot re-include: state stays ignored.
        assert!(should_ignore(&patterns, &abs("app.js"), "app.js", false));
    }

    #[test]
    fn invalid_glob_names_the_key() {
        let err = CompiledEntry::compile(ConfigEntry::new().files(["foo["])).unwrap_err();
        assert!(matches!(
            err,
            PerfigError::Validation { ref key, .. } if key == "files"
        ));
    }
}
