//! Per-file configuration resolution. Give an ordered list of config
//! entries with gitignore-style patterns, ask what applies to a file.
//!
//! Perfig is the resolver core of a linter-shaped tool: the tool decides
//! where configs come from and what the keys mean; perfig decides, for any
//! absolute path, **which entries apply**, **what the merged configuration
//! is**, and **whether the path is ignored**.
//!
//! ```
//! use perfig::{ConfigArray, ConfigArrayOptions, ConfigEntry};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), perfig::PerfigError> {
//! let mut array = ConfigArray::new(
//!     vec![
//!         ConfigEntry::new()
//!             .files(["**/*.js"])
//!             .value("language", "js")
//!             .into(),
//!         ConfigEntry::new().ignores(["dist/"]).into(),
//!     ],
//!     ConfigArrayOptions::new("/srv/project"),
//! );
//! array.normalize_sync(&())?;
//!
//! let config = array.get_config("/srv/project/app.js")?.unwrap();
//! assert_eq!(config.get("language"), Some(&json!("js")));
//! assert!(array.is_file_ignored("/srv/project/dist/app.js")?);
//! # Ok(())
//! # }
//! ```
//!
//! # Why perfig
//!
//! Tools that run per file — linters, formatters, build pipelines — all
//! need the same answer: "given this file, what settings apply?" The usual
//! approach couples that question to the tool's config loading, and the
//! pattern subtleties (negation ordering, directory patterns, `!`
//! re-includes that should *not* escape an ignored ancestor) get
//! reimplemented, slightly differently, every time.
//!
//! Perfig is that answer as a standalone, purely in-memory library. It
//! reads no files and walks no directories; you hand it entries, it hands
//! you decisions. The pattern semantics are the familiar gitignore ones,
//! so a `.gitignore`-literate user can predict what a config does.
//!
//! # Entries
//!
//! A [`ConfigEntry`] pairs applicability with payload:
//!
//! - **`files`** — glob strings, predicates, or AND-sequences. The entry
//!   applies when any element matches (an AND-sequence needs every member).
//! - **`ignores`** — patterns that take the match away, with gitignore
//!   negation: later `!patterns` re-include.
//! - **user keys** — anything else, as `serde_json` values. A
//!   user-extensible [`Schema`] says how each key validates and merges.
//!
//! Three shapes fall out of what an entry carries:
//!
//! | Shape | Carries | Behavior |
//! |-------|---------|----------|
//! | Ordinary | `files` | Applies where `files` matches |
//! | Files-less | user keys, no `files` | Base settings for every resolved file |
//! | Global-ignore | only `ignores` | Feeds the array-wide ignore list |
//!
//! Global ignores follow gitignore's directory rule: once a directory is
//! ignored, nothing below it can be re-included — only re-including the
//! directory itself escapes.
//!
//! # Lifecycle
//!
//! A [`ConfigArray`] starts mutable: [`push`](ConfigArray::push) appends,
//! queries fail. [`normalize`](ConfigArray::normalize) (or
//! [`normalize_sync`](ConfigArray::normalize_sync)) flattens nested lists,
//! invokes factories with a caller-supplied context, validates every entry
//! against the schema, compiles every glob — and freezes the array. From
//! then on queries work, mutation fails, and results are cached: asking the
//! same path twice, or two paths matched by the same entries, returns the
//! same shared config.
//!
//! Factories make an array dynamic: a [`ConfigSource::Factory`] computes
//! entries from the context at normalization time, and a
//! [`ConfigSource::DeferredFactory`] does so asynchronously (the only
//! suspension point in the crate). Both are opt-in via
//! [`ExtraConfigTypes`], as are nested lists.
//!
//! # Errors
//!
//! Everything fallible returns [`PerfigError`]. The taxonomy is small and
//! stable — lifecycle misuse (`NotNormalized`, `NotExtensible`), config
//! shape (`UnexpectedArray`, `UnexpectedFunction`, `InvalidReturn`,
//! `AsyncNotSupported`), schema failures (`Validation`, always naming the
//! key), and the lazily-raised `InvalidFiles`. See [`error`] for details.

pub mod error;
pub mod pattern;
pub mod schema;
pub mod types;

mod array;
mod matcher;
mod normalize;

#[cfg(test)]
mod fixtures;

pub use array::ConfigArray;
pub use error::PerfigError;
pub use pattern::GlobPattern;
pub use schema::{MergeStrategy, PropertySchema, Schema, UnknownKeys, ValidateStrategy};
pub use types::{
    ArrayView, ConfigArrayOptions, ConfigEntry, ConfigSource, ExtraConfigTypes, FilePattern,
    Pattern, ResolvedConfig,
};
