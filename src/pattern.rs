//! Gitignore-style evaluation of a single glob pattern.
//!
//! A pattern is compiled once and then matched against forward-slash paths
//! relative to the array's base path. The flavor is gitignore with matchBase:
//!
//! - `!` marks the pattern as negated. The engine always matches the
//!   remainder; callers consult [`negated()`](GlobPattern::negated) (the
//!   ignore fold) or invert the result (the `files` side).
//! - A trailing `/` restricts the pattern to directories. Matched against a
//!   file, it matches iff some proper ancestor directory matches.
//! - A trailing `/**` matches the directory itself and every descendant.
//! - A trailing `/*` matches direct children of the prefix, not the prefix.
//! - A leading `/` anchors to the base path. Any other `/` in the pattern
//!   anchors too (gitignore rule); a pattern with no `/` floats and matches
//!   its basename at any depth.
//! - Dotfiles are not special-cased: `*` matches `.eslintrc.js`.

use globset::{GlobBuilder, GlobMatcher};

/// One compiled gitignore-style pattern.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    negated: bool,
    dir_only: bool,
    root_anchored: bool,
    matcher: GlobMatcher,
    /// For `x/**` patterns: matches `x` itself when the target is a directory.
    prefix_matcher: Option<GlobMatcher>,
}

impl GlobPattern {
    /// Compile `source`. Fails on invalid glob syntax.
    pub fn parse(source: &str) -> Result<Self, globset::Error> {
        let mut core = source;

        let negated = core.starts_with('!');
        if negated {
            core = &core[1..];
        }

        let dir_only = core.len() > 1 && core.ends_with('/');
        if dir_only {
            core = &core[..core.len() - 1];
        }

        let root_anchored = core.starts_with('/');
        if root_anchored {
            core = &core[1..];
        }

        // Slash-less patterns float: `*.js` matches at any depth.
        let glob_text = if root_anchored || core.contains('/') {
            core.to_string()
        } else {
            format!("**/{core}")
        };

        let matcher = compile(&glob_text)?;
        let prefix_matcher = match glob_text.strip_suffix("/**") {
            Some(prefix) if !prefix.is_empty() => Some(compile(prefix)?),
            _ => None,
        };

        Ok(GlobPattern {
            source: source.to_string(),
            negated,
            dir_only,
            root_anchored,
            matcher,
            prefix_matcher,
        })
    }

    /// The pattern text as written, including any `!` and trailing `/`.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn negated(&self) -> bool {
        self.negated
    }

    pub fn directory_only(&self) -> bool {
        self.dir_only
    }

    pub fn root_anchored(&self) -> bool {
        self.root_anchored
    }

    pub fn double_star_suffix(&self) -> bool {
        self.prefix_matcher.is_some()
    }

    pub fn single_star_suffix(&self) -> bool {
        !self.double_star_suffix() && self.core_text().ends_with("/*")
    }

    fn core_text(&self) -> &str {
        let mut core = self.source.as_str();
        if self.negated {
            core = &core[1..];
        }
        if self.dir_only {
            core = &core[..core.len() - 1];
        }
        core
    }

    /// Match the pattern core (negation is *not* applied here) against a
    /// path relative to the base, with `is_dir` telling whether the path
    /// names a directory.
    pub fn matches(&self, relative_path: &str, is_dir: bool) -> bool {
        if self.dir_only && !is_dir {
            // Directory-only patterns reach a file through its ancestors.
            return ancestor_dirs(relative_path).any(|dir| self.matches_target(dir, true));
        }
        self.matches_target(relative_path, is_dir)
    }

    fn matches_target(&self, target: &str, is_dir: bool) -> bool {
        if target.is_empty() {
            return false;
        }
        if self.matcher.is_match(target) {
            return true;
        }
        // `x/**` names the directory `x` as well as its contents.
        is_dir
            && self
                .prefix_matcher
                .as_ref()
                .is_some_and(|m| m.is_match(target))
    }
}

fn compile(text: &str) -> Result<GlobMatcher, globset::Error> {
    Ok(GlobBuilder::new(text)
        .literal_separator(true)
        .build()?
        .compile_matcher())
}

/// Proper ancestor directories of a relative path: `a/b/c` → `a`, `a/b`.
fn ancestor_dirs(relative_path: &str) -> impl Iterator<Item = &str> {
    relative_path.match_indices('/').map(|(i, _)| &relative_path[..i])
}
