//! The [`ConfigArray`]: ordered entries, two-phase lifecycle, cached queries.
//!
//! An array is built from [`ConfigSource`]s and a base path, then goes
//! through a one-way transition:
//!
//! 1. **Mutable** — [`push`](ConfigArray::push) appends sources; every query
//!    fails with `NotNormalized`.
//! 2. **Frozen** — after [`normalize`](ConfigArray::normalize) (or
//!    [`normalize_sync`](ConfigArray::normalize_sync)) queries work and
//!    `push` fails with `NotExtensible`.
//!
//! Normalization flattens the sources, runs the `preprocess_config` hook,
//! validates each entry against the schema, and compiles every glob. It is
//! idempotent, and a failed or cancelled normalization leaves the array
//! mutable with nothing half-applied.
//!
//! # Resolution
//!
//! [`get_config`](ConfigArray::get_config) walks the entries in order,
//! collects the ones that apply, and folds their user keys through the
//! schema: files-less (universal) entries form the base of the result and
//! `files`-bearing entries are folded on top, so a file-specific entry
//! always overrides a universal one. A file nothing speaks about — no
//! `files` pattern matches it, even before per-entry `ignores` — resolves
//! to `None`.
//!
//! Results are cached per path, and interned by the matched-entry index
//! set: two files matching the same entries share one `Arc`.
//!
//! # Ignoring
//!
//! Entries carrying only `ignores` feed an array-wide ignore list with
//! gitignore semantics: patterns apply in order, `!` re-includes, and an
//! ignored directory swallows everything below it — re-including a
//! descendant is not enough, only re-including the ancestor itself is.
//! Paths outside the base path are always ignored.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Map;

use crate::error::PerfigError;
use crate::matcher::{self, CompiledEntry, CompiledPattern};
use crate::normalize;
use crate::schema::Schema;
use crate::types::{
    ArrayView, ConfigArrayOptions, ConfigEntry, ConfigSource, ExtraConfigTypes, FilePattern,
    FinalizeFn, Pattern, PreprocessFn, ResolvedConfig,
};

/// An ordered list of config entries that resolves per-file configuration.
///
/// `X` is the context type handed to factories during normalization;
/// arrays without factories can leave it at the default `()`.
pub struct ConfigArray<X = ()> {
    base_path: PathBuf,
    schema: Schema,
    extra_config_types: ExtraConfigTypes,
    preprocess_config: Option<PreprocessFn>,
    finalize_config: Option<FinalizeFn>,
    sources: Vec<ConfigSource<X>>,
    normalized: Option<Normalized>,
}

/// Everything that exists only in the frozen phase.
struct Normalized {
    entries: Vec<CompiledEntry>,
    /// Concatenated `ignores` of global-ignore entries, document order.
    global_ignores: Vec<CompiledPattern>,
    /// Per-path results, including `None` for ignored/unmatched paths.
    config_cache: RefCell<HashMap<PathBuf, Option<Arc<ResolvedConfig>>>>,
    /// One shared config per matched-entry index set.
    intern_cache: RefCell<HashMap<Vec<usize>, Arc<ResolvedConfig>>>,
    /// Per-directory ignore verdicts for the ancestor walk.
    directory_cache: RefCell<HashMap<String, bool>>,
}

impl<X> ConfigArray<X> {
    pub fn new(sources: Vec<ConfigSource<X>>, options: ConfigArrayOptions) -> Self {
        let ConfigArrayOptions {
            base_path,
            schema,
            extra_config_types,
            preprocess_config,
            finalize_config,
        } = options;
        ConfigArray {
            base_path,
            schema,
            extra_config_types,
            preprocess_config,
            finalize_config,
            sources,
            normalized: None,
        }
    }

    /// The absolute root against which string patterns are matched.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn is_normalized(&self) -> bool {
        self.normalized.is_some()
    }

    /// Append a source. Only valid before normalization.
    pub fn push(&mut self, source: impl Into<ConfigSource<X>>) -> Result<(), PerfigError> {
        if self.normalized.is_some() {
            return Err(PerfigError::NotExtensible);
        }
        self.sources.push(source.into());
        Ok(())
    }

    /// Normalize, awaiting deferred factories. Idempotent; on failure the
    /// array stays mutable.
    pub async fn normalize(&mut self, context: &X) -> Result<(), PerfigError>
    where
        X: Sync,
    {
        if self.normalized.is_some() {
            return Ok(());
        }
        let flat =
            normalize::flatten_async(&self.sources, context, self.extra_config_types).await?;
        self.finish_normalize(flat)
    }

    /// Normalize without suspending. Deferred factories are
    /// `AsyncNotSupported`. Idempotent; on failure the array stays mutable.
    pub fn normalize_sync(&mut self, context: &X) -> Result<(), PerfigError> {
        if self.normalized.is_some() {
            return Ok(());
        }
        let flat = normalize::flatten_sync(&self.sources, context, self.extra_config_types)?;
        self.finish_normalize(flat)
    }

    /// Preprocess, validate and compile the flattened entries, then commit.
    /// Committing last keeps a failed run invisible.
    fn finish_normalize(&mut self, flat: Vec<ConfigEntry>) -> Result<(), PerfigError> {
        let view = ArrayView {
            base_path: &self.base_path,
            extra_config_types: self.extra_config_types,
        };
        let mut entries = Vec::with_capacity(flat.len());
        for entry in flat {
            let entry = match &self.preprocess_config {
                Some(hook) => hook(entry, view),
                None => entry,
            };
            self.schema.validate_entry(&entry)?;
            entries.push(CompiledEntry::compile(entry)?);
        }

        let mut global_ignores = Vec::new();
        for compiled in &entries {
            if compiled.entry.is_global_ignores()
                && let Some(ignores) = &compiled.ignores
            {
                global_ignores.extend(ignores.iter().cloned());
            }
        }

        self.normalized = Some(Normalized {
            entries,
            global_ignores,
            config_cache: RefCell::new(HashMap::new()),
            intern_cache: RefCell::new(HashMap::new()),
            directory_cache: RefCell::new(HashMap::new()),
        });
        Ok(())
    }

    fn resolved(&self) -> Result<&Normalized, PerfigError> {
        self.normalized.as_ref().ok_or(PerfigError::NotNormalized)
    }

    /// The effective configuration for `file_path`, or `None` when the file
    /// is ignored or not spoken about by any `files` pattern.
    ///
    /// Results are shared: the same path — or another path matching the
    /// same set of entries — returns the same `Arc`.
    pub fn get_config(
        &self,
        file_path: impl AsRef<Path>,
    ) -> Result<Option<Arc<ResolvedConfig>>, PerfigError> {
        let resolved = self.resolved()?;
        let file_path = file_path.as_ref();

        let Some(relative) = matcher::relative_to(&self.base_path, file_path) else {
            return Ok(None);
        };
        if self.file_ignored(resolved, file_path, &relative) {
            return Ok(None);
        }

        if let Some(cached) = resolved.config_cache.borrow().get(file_path) {
            return Ok(cached.clone());
        }

        let result = self.resolve_config(resolved, file_path, &relative)?;
        resolved
            .config_cache
            .borrow_mut()
            .insert(file_path.to_path_buf(), result.clone());
        Ok(result)
    }

    fn resolve_config(
        &self,
        resolved: &Normalized,
        file_path: &Path,
        relative: &str,
    ) -> Result<Option<Arc<ResolvedConfig>>, PerfigError> {
        // Universal entries form the base of the fold; files-bearing entries
        // override them regardless of document position.
        let mut universal = Vec::new();
        let mut ordinary = Vec::new();
        for (index, compiled) in resolved.entries.iter().enumerate() {
            if compiled.entry.is_global_ignores() {
                continue;
            }
            if matcher::entry_applies(compiled, file_path, relative)? {
                if compiled.files.is_none() {
                    universal.push(index);
                } else {
                    ordinary.push(index);
                }
            }
        }

        // A file nothing speaks about gets no config, universal entries or
        // not. "Speaks about" disregards per-entry ignores.
        if ordinary.is_empty() && !self.explicit_match(resolved, file_path, relative)? {
            return Ok(None);
        }

        let indices: Vec<usize> = universal.into_iter().chain(ordinary).collect();
        if let Some(shared) = resolved.intern_cache.borrow().get(&indices) {
            return Ok(Some(Arc::clone(shared)));
        }

        let mut values = Map::new();
        for &index in &indices {
            values = self.schema.merge(&values, &resolved.entries[index].entry.values);
        }

        let mut config = ResolvedConfig { values };
        if let Some(hook) = &self.finalize_config {
            let view = ArrayView {
                base_path: &self.base_path,
                extra_config_types: self.extra_config_types,
            };
            config = hook(config, view);
        }

        let shared = Arc::new(config);
        resolved
            .intern_cache
            .borrow_mut()
            .insert(indices, Arc::clone(&shared));
        Ok(Some(shared))
    }

    /// Is `file_path` excluded by the global ignores (or outside the base)?
    pub fn is_file_ignored(&self, file_path: impl AsRef<Path>) -> Result<bool, PerfigError> {
        let resolved = self.resolved()?;
        let file_path = file_path.as_ref();
        let Some(relative) = matcher::relative_to(&self.base_path, file_path) else {
            return Ok(true);
        };
        Ok(self.file_ignored(resolved, file_path, &relative))
    }

    /// Is `directory_path` excluded by the global ignores? A trailing slash
    /// on the input is fine.
    pub fn is_directory_ignored(
        &self,
        directory_path: impl AsRef<Path>,
    ) -> Result<bool, PerfigError> {
        let resolved = self.resolved()?;
        let Some(relative) = matcher::relative_to(&self.base_path, directory_path.as_ref()) else {
            return Ok(true);
        };
        Ok(self.directory_ignored(resolved, &relative))
    }

    /// Does some entry's `files` match this path, before that entry's own
    /// `ignores` are considered — is the file *spoken about* at all?
    pub fn is_explicit_match(&self, file_path: impl AsRef<Path>) -> Result<bool, PerfigError> {
        let resolved = self.resolved()?;
        let file_path = file_path.as_ref();
        let Some(relative) = matcher::relative_to(&self.base_path, file_path) else {
            return Ok(false);
        };
        self.explicit_match(resolved, file_path, &relative)
    }

    /// Every non-negated glob mentioned in any `files`, document order.
    pub fn files(&self) -> Result<Vec<String>, PerfigError> {
        let resolved = self.resolved()?;
        let mut patterns = Vec::new();
        for compiled in &resolved.entries {
            for file_pattern in compiled.entry.files.iter().flatten() {
                match file_pattern {
                    FilePattern::One(pattern) => push_files_glob(&mut patterns, pattern),
                    FilePattern::All(members) => {
                        for pattern in members {
                            push_files_glob(&mut patterns, pattern);
                        }
                    }
                }
            }
        }
        Ok(patterns)
    }

    /// Every glob (negated included) from global-ignore entries, document
    /// order.
    pub fn ignores(&self) -> Result<Vec<String>, PerfigError> {
        let resolved = self.resolved()?;
        let mut patterns = Vec::new();
        for compiled in &resolved.entries {
            if !compiled.entry.is_global_ignores() {
                continue;
            }
            for pattern in compiled.entry.ignores.iter().flatten() {
                if let Pattern::Glob(text) = pattern {
                    patterns.push(text.clone());
                }
            }
        }
        Ok(patterns)
    }

    fn explicit_match(
        &self,
        resolved: &Normalized,
        file_path: &Path,
        relative: &str,
    ) -> Result<bool, PerfigError> {
        for compiled in &resolved.entries {
            if matcher::entry_files_match(compiled, file_path, relative)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn file_ignored(&self, resolved: &Normalized, absolute: &Path, relative: &str) -> bool {
        if let Some((parent, _)) = relative.rsplit_once('/')
            && self.directory_ignored(resolved, parent)
        {
            return true;
        }
        matcher::should_ignore(&resolved.global_ignores, absolute, relative, false)
    }

    /// Top-down ancestor walk: the first ignored ancestor decides, so a
    /// negated pattern for a descendant cannot escape an ignored ancestor.
    fn directory_ignored(&self, resolved: &Normalized, relative_dir: &str) -> bool {
        if relative_dir.is_empty() {
            return false;
        }
        let mut checked = String::new();
        for part in relative_dir.split('/') {
            if !checked.is_empty() {
                checked.push('/');
            }
            checked.push_str(part);

            let cached = resolved
                .directory_cache
                .borrow()
                .get(checked.as_str())
                .copied();
            let ignored = match cached {
                Some(ignored) => ignored,
                None => {
                    let absolute = self.base_path.join(&checked);
                    let ignored = matcher::should_ignore(
                        &resolved.global_ignores,
                        &absolute,
                        &checked,
                        true,
                    );
                    resolved
                        .directory_cache
                        .borrow_mut()
                        .insert(checked.clone(), ignored);
                    ignored
                }
            };
            if ignored {
                return true;
            }
        }
        false
    }
}

fn push_files_glob(patterns: &mut Vec<String>, pattern: &Pattern) {
    if let Pattern::Glob(text) = pattern
        && !text.starts_with('!')
    {
        patterns.push(text.clone());
    }
}
