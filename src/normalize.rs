//! Normalization: flatten config sources into a plain list of entries.
//!
//! Operates on in-memory [`ConfigSource`] trees with no I/O. Rules:
//!
//! 1. A plain entry is yielded as-is.
//! 2. A list is traversed recursively (requires arrays enabled).
//! 3. A factory is invoked with the context and its return value traversed
//!    (requires functions enabled). A factory returning another factory is
//!    an error; factories nested *inside* a returned list are fine.
//! 4. A deferred factory is awaited by the async variant; the sync variant
//!    rejects it with `AsyncNotSupported`.
//!
//! Both variants share the same traversal shape; the async one is boxed
//! because it recurses.

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::error::PerfigError;
use crate::types::{ConfigEntry, ConfigSource, ExtraConfigTypes};

/// Flatten `sources` without suspending. Deferred factories are an error.
pub(crate) fn flatten_sync<X>(
    sources: &[ConfigSource<X>],
    context: &X,
    extra: ExtraConfigTypes,
) -> Result<Vec<ConfigEntry>, PerfigError> {
    let mut entries = Vec::new();
    for source in sources {
        expand_sync(source, context, extra, &mut entries)?;
    }
    Ok(entries)
}

/// Flatten `sources`, awaiting deferred factories as they are encountered.
pub(crate) async fn flatten_async<X: Sync>(
    sources: &[ConfigSource<X>],
    context: &X,
    extra: ExtraConfigTypes,
) -> Result<Vec<ConfigEntry>, PerfigError> {
    let mut entries = Vec::new();
    for source in sources {
        expand_async(source, context, extra, &mut entries).await?;
    }
    Ok(entries)
}

fn expand_sync<X>(
    source: &ConfigSource<X>,
    context: &X,
    extra: ExtraConfigTypes,
    entries: &mut Vec<ConfigEntry>,
) -> Result<(), PerfigError> {
    match source {
        ConfigSource::Entry(entry) => {
            entries.push(entry.clone());
            Ok(())
        }
        ConfigSource::List(items) => {
            if !extra.arrays {
                return Err(PerfigError::UnexpectedArray);
            }
            for item in items {
                expand_sync(item, context, extra, entries)?;
            }
            Ok(())
        }
        ConfigSource::Factory(factory) => {
            if !extra.functions {
                return Err(PerfigError::UnexpectedFunction);
            }
            expand_produced_sync(&factory(context), context, extra, entries)
        }
        ConfigSource::DeferredFactory(_) => {
            if !extra.functions {
                return Err(PerfigError::UnexpectedFunction);
            }
            Err(PerfigError::AsyncNotSupported)
        }
    }
}

fn expand_produced_sync<X>(
    produced: &ConfigSource<X>,
    context: &X,
    extra: ExtraConfigTypes,
    entries: &mut Vec<ConfigEntry>,
) -> Result<(), PerfigError> {
    match produced {
        ConfigSource::Factory(_) | ConfigSource::DeferredFactory(_) => {
            Err(PerfigError::InvalidReturn)
        }
        other => expand_sync(other, context, extra, entries),
    }
}

fn expand_async<'a, X: Sync>(
    source: &'a ConfigSource<X>,
    context: &'a X,
    extra: ExtraConfigTypes,
    entries: &'a mut Vec<ConfigEntry>,
) -> BoxFuture<'a, Result<(), PerfigError>> {
    async move {
        match source {
            ConfigSource::Entry(entry) => {
                entries.push(entry.clone());
                Ok(())
            }
            ConfigSource::List(items) => {
                if !extra.arrays {
                    return Err(PerfigError::UnexpectedArray);
                }
                for item in items {
                    expand_async(item, context, extra, entries).await?;
                }
                Ok(())
            }
            ConfigSource::Factory(factory) => {
                if !extra.functions {
                    return Err(PerfigError::UnexpectedFunction);
                }
                expand_produced_async(factory(context), context, extra, entries).await
            }
            ConfigSource::DeferredFactory(factory) => {
                if !extra.functions {
                    return Err(PerfigError::UnexpectedFunction);
                }
                let produced = factory(context).await;
                expand_produced_async(produced, context, extra, entries).await
            }
        }
    }
    .boxed()
}

async fn expand_produced_async<X: Sync>(
    produced: ConfigSource<X>,
    context: &X,
    extra: ExtraConfigTypes,
    entries: &mut Vec<ConfigEntry>,
) -> Result<(), PerfigError> {
    match &produced {
        ConfigSource::Factory(_) | ConfigSource::DeferredFactory(_) => {
            Err(PerfigError::InvalidReturn)
        }
        other => expand_async(other, context, extra, entries).await,
    }
}
