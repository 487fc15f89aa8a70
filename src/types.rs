//! Core types that define what a config entry is and how arrays are built.
//!
//! The input to a [`ConfigArray`](crate::ConfigArray) is a list of
//! [`ConfigSource`]s — a tagged union of the shapes a config can arrive in:
//!
//! | Shape | Meaning |
//! |-------|---------|
//! | [`Entry`](ConfigSource::Entry) | A plain [`ConfigEntry`], used as-is |
//! | [`List`](ConfigSource::List) | A nested list, flattened in place |
//! | [`Factory`](ConfigSource::Factory) | A function of the context, invoked during normalization |
//! | [`DeferredFactory`](ConfigSource::DeferredFactory) | A function returning a future, awaited during async normalization |
//!
//! Lists and factories are opt-in via [`ExtraConfigTypes`]; plain entries
//! always work. Factories receive the **context** value handed to
//! `normalize`/`normalize_sync` — the context type is a type parameter of
//! the array (default `()`), so a linter can thread its own state through
//! without the resolver knowing anything about it.
//!
//! # Entries
//!
//! A [`ConfigEntry`] carries an optional `name`, the `files` and `ignores`
//! pattern lists, and an open-ended map of user keys. What the user keys
//! *mean* is the schema's business (see [`Schema`](crate::Schema)); the
//! entry just holds them. Entries classify by shape:
//!
//! - **Ordinary** — has `files`; applies when a files pattern matches.
//! - **Files-less** — no `files` but at least one user key; applies to every
//!   file its own `ignores` (if any) does not exclude.
//! - **Global-ignore** — only `ignores` (a `name` is allowed); feeds the
//!   array-wide ignore algebra and contributes nothing else.
//!
//! # Patterns
//!
//! A [`Pattern`] is either a gitignore-style glob string (matched against
//! the path relative to the array's base path) or a predicate function
//! (handed the absolute path). A `files` element is a [`FilePattern`]:
//! a single pattern, or an AND-sequence that applies only when every member
//! matches the same path.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::{Map, Value};

use crate::schema::Schema;

/// A predicate over an absolute file path.
pub type PredicateFn = Arc<dyn Fn(&Path) -> bool + Send + Sync>;

/// A config factory: invoked with the normalization context.
pub type FactoryFn<X> = Arc<dyn Fn(&X) -> ConfigSource<X> + Send + Sync>;

/// A deferred config factory: produces a future resolved during async
/// normalization.
pub type AsyncFactoryFn<X> = Arc<dyn Fn(&X) -> BoxFuture<'static, ConfigSource<X>> + Send + Sync>;

/// One pattern: a glob string or a predicate.
#[derive(Clone)]
pub enum Pattern {
    /// A gitignore-style glob, matched against the base-relative path.
    Glob(String),
    /// A predicate, handed the absolute path.
    Predicate(PredicateFn),
}

impl Pattern {
    pub fn glob(text: impl Into<String>) -> Self {
        Pattern::Glob(text.into())
    }

    pub fn predicate(f: impl Fn(&Path) -> bool + Send + Sync + 'static) -> Self {
        Pattern::Predicate(Arc::new(f))
    }
}

impl From<&str> for Pattern {
    fn from(text: &str) -> Self {
        Pattern::Glob(text.to_string())
    }
}

impl From<String> for Pattern {
    fn from(text: String) -> Self {
        Pattern::Glob(text)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Glob(text) => write!(f, "Glob({text:?})"),
            Pattern::Predicate(_) => write!(f, "Predicate(..)"),
        }
    }
}

/// One element of `files`: a single pattern, or an AND-sequence where every
/// member must match.
#[derive(Clone, Debug)]
pub enum FilePattern {
    One(Pattern),
    All(Vec<Pattern>),
}

impl FilePattern {
    /// An AND-sequence: matches iff every member matches the same path.
    pub fn all<I>(patterns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Pattern>,
    {
        FilePattern::All(patterns.into_iter().map(Into::into).collect())
    }
}

impl From<Pattern> for FilePattern {
    fn from(pattern: Pattern) -> Self {
        FilePattern::One(pattern)
    }
}

impl From<&str> for FilePattern {
    fn from(text: &str) -> Self {
        FilePattern::One(text.into())
    }
}

impl From<String> for FilePattern {
    fn from(text: String) -> Self {
        FilePattern::One(text.into())
    }
}

/// One config entry: applicability patterns plus an open map of user keys.
///
/// Built with consuming setters:
///
/// ```ignore
/// let entry = ConfigEntry::new()
///     .name("js-rules")
///     .files(["**/*.js"])
///     .ignores(["**/*.min.js"])
///     .value("language", "js");
/// ```
#[derive(Clone, Debug, Default)]
pub struct ConfigEntry {
    pub name: Option<String>,
    pub files: Option<Vec<FilePattern>>,
    pub ignores: Option<Vec<Pattern>>,
    pub values: Map<String, Value>,
}

impl ConfigEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn files<I>(mut self, files: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<FilePattern>,
    {
        self.files = Some(files.into_iter().map(Into::into).collect());
        self
    }

    pub fn ignores<I>(mut self, ignores: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Pattern>,
    {
        self.ignores = Some(ignores.into_iter().map(Into::into).collect());
        self
    }

    /// Set a user key. The schema decides how it validates and merges.
    pub fn value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Global-ignore entry: only `ignores` set. A `name` is metadata and
    /// does not change the classification.
    pub(crate) fn is_global_ignores(&self) -> bool {
        self.files.is_none() && self.ignores.is_some() && self.values.is_empty()
    }

    /// Files-less entry: no `files`, but user keys to contribute.
    pub(crate) fn is_universal(&self) -> bool {
        self.files.is_none() && !self.values.is_empty()
    }
}

/// A pre-normalization config shape. See the [module docs](self).
pub enum ConfigSource<X = ()> {
    Entry(ConfigEntry),
    List(Vec<ConfigSource<X>>),
    Factory(FactoryFn<X>),
    DeferredFactory(AsyncFactoryFn<X>),
}

impl<X> ConfigSource<X> {
    pub fn factory(f: impl Fn(&X) -> ConfigSource<X> + Send + Sync + 'static) -> Self {
        ConfigSource::Factory(Arc::new(f))
    }

    pub fn deferred_factory(
        f: impl Fn(&X) -> BoxFuture<'static, ConfigSource<X>> + Send + Sync + 'static,
    ) -> Self {
        ConfigSource::DeferredFactory(Arc::new(f))
    }
}

impl<X> From<ConfigEntry> for ConfigSource<X> {
    fn from(entry: ConfigEntry) -> Self {
        ConfigSource::Entry(entry)
    }
}

impl<X> From<Vec<ConfigSource<X>>> for ConfigSource<X> {
    fn from(items: Vec<ConfigSource<X>>) -> Self {
        ConfigSource::List(items)
    }
}

// Manual impl: `X` itself is never cloned, only shared factory pointers.
impl<X> Clone for ConfigSource<X> {
    fn clone(&self) -> Self {
        match self {
            ConfigSource::Entry(entry) => ConfigSource::Entry(entry.clone()),
            ConfigSource::List(items) => ConfigSource::List(items.clone()),
            ConfigSource::Factory(f) => ConfigSource::Factory(Arc::clone(f)),
            ConfigSource::DeferredFactory(f) => ConfigSource::DeferredFactory(Arc::clone(f)),
        }
    }
}

impl<X> fmt::Debug for ConfigSource<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Entry(entry) => f.debug_tuple("Entry").field(entry).finish(),
            ConfigSource::List(items) => f.debug_tuple("List").field(items).finish(),
            ConfigSource::Factory(_) => write!(f, "Factory(..)"),
            ConfigSource::DeferredFactory(_) => write!(f, "DeferredFactory(..)"),
        }
    }
}

/// Which extra config shapes the array accepts. Plain entries always work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtraConfigTypes {
    pub arrays: bool,
    pub functions: bool,
}

impl ExtraConfigTypes {
    /// Accept both nested lists and factories.
    pub fn all() -> Self {
        ExtraConfigTypes {
            arrays: true,
            functions: true,
        }
    }
}

/// Read-only view of the owning array, handed to hooks so they can see
/// where relative paths are rooted.
#[derive(Debug, Clone, Copy)]
pub struct ArrayView<'a> {
    pub base_path: &'a Path,
    pub extra_config_types: ExtraConfigTypes,
}

/// Rewrites each flattened entry before validation. Default: identity.
pub type PreprocessFn = Arc<dyn Fn(ConfigEntry, ArrayView<'_>) -> ConfigEntry + Send + Sync>;

/// Rewrites the merged config before it is cached. Default: identity.
pub type FinalizeFn = Arc<dyn Fn(ResolvedConfig, ArrayView<'_>) -> ResolvedConfig + Send + Sync>;

/// Options for [`ConfigArray::new`](crate::ConfigArray::new).
///
/// `base_path` must be absolute; it is the root against which string
/// patterns are matched. Everything else has a working default.
#[derive(Clone)]
pub struct ConfigArrayOptions {
    pub(crate) base_path: PathBuf,
    pub(crate) schema: Schema,
    pub(crate) extra_config_types: ExtraConfigTypes,
    pub(crate) preprocess_config: Option<PreprocessFn>,
    pub(crate) finalize_config: Option<FinalizeFn>,
}

impl ConfigArrayOptions {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        ConfigArrayOptions {
            base_path: base_path.into(),
            schema: Schema::default(),
            extra_config_types: ExtraConfigTypes::default(),
            preprocess_config: None,
            finalize_config: None,
        }
    }

    /// Replace the default (accept-everything) schema.
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    pub fn extra_config_types(mut self, extra: ExtraConfigTypes) -> Self {
        self.extra_config_types = extra;
        self
    }

    /// Hook run on every flattened entry before validation.
    pub fn preprocess_config(
        mut self,
        f: impl Fn(ConfigEntry, ArrayView<'_>) -> ConfigEntry + Send + Sync + 'static,
    ) -> Self {
        self.preprocess_config = Some(Arc::new(f));
        self
    }

    /// Hook run on the merged config before it is cached.
    pub fn finalize_config(
        mut self,
        f: impl Fn(ResolvedConfig, ArrayView<'_>) -> ResolvedConfig + Send + Sync + 'static,
    ) -> Self {
        self.finalize_config = Some(Arc::new(f));
        self
    }
}

/// The merged configuration for one file: user keys only — `name`, `files`
/// and `ignores` never propagate into the result.
///
/// Serializes as the plain key/value object, so a resolved config can be
/// dumped straight to JSON for debugging or tooling output.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
#[serde(transparent)]
pub struct ResolvedConfig {
    pub values: Map<String, Value>,
}

impl ResolvedConfig {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}
