//! Applying a batch of change records: deletes first, then writes.

use std::collections::BTreeSet;
use std::sync::Arc;

use strata_core::{
    CacheError, ChangeRecord, Clipper, DependencyCache, DiagnosticEvent, Diagnostics, Element,
    ElementCache, ElementKind, ExpiredTiles, GeometryFactory, Matchers, MemoryElementCache,
    OsmId, Progress, ProgressSnapshot, RowDeleter, RowInserter,
};
use strata_writer::{ProcessElement, WriterContext, WriterError, WriterPool};
use thiserror::Error;

use crate::deleter::Deleter;

/// Errors aborting an update.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// A writer pool failed to complete.
    #[error("writing {kind}s failed")]
    Writer {
        /// Element kind of the failed pool.
        kind: ElementKind,
        /// Underlying pool error.
        #[source]
        source: WriterError,
    },
}

/// Collaborators and settings for [`apply_changes`].
pub struct UpdateContext {
    matchers: Matchers,
    deleter: Arc<dyn RowDeleter>,
    diagnostics: Arc<dyn Diagnostics>,
    writer: WriterContext,
    expired: Option<Arc<ExpiredTiles>>,
    workers: usize,
}

impl UpdateContext {
    /// Delete from and insert into `store`, reporting to `diagnostics`.
    pub fn new<S>(matchers: Matchers, store: Arc<S>, diagnostics: Arc<dyn Diagnostics>) -> Self
    where
        S: RowDeleter + RowInserter + 'static,
    {
        let inserter: Arc<dyn RowInserter> = Arc::clone(&store) as Arc<dyn RowInserter>;
        let writer = WriterContext::new(inserter, Arc::clone(&diagnostics));
        Self {
            matchers,
            deleter: store,
            diagnostics,
            writer,
            expired: None,
            workers: 1,
        }
    }

    /// Clip written geometries with `limiter`.
    #[must_use]
    pub fn with_limiter(mut self, limiter: Arc<dyn Clipper>) -> Self {
        self.writer = self.writer.with_limiter(limiter);
        self
    }

    /// Record tiles touched by deletes and writes in `expired`.
    #[must_use]
    pub fn with_expired_tiles(mut self, expired: Arc<ExpiredTiles>) -> Self {
        self.writer = self.writer.with_expired_tiles(Arc::clone(&expired));
        self.expired = Some(expired);
        self
    }

    /// Build geometries with builders from `factory`.
    #[must_use]
    pub fn with_factory(mut self, factory: Arc<dyn GeometryFactory>) -> Self {
        self.writer = self.writer.with_factory(factory);
        self
    }

    /// Run each writer pool with `workers` tasks.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Counters of elements processed by the writers.
    #[must_use]
    pub fn progress(&self) -> &Arc<Progress> {
        self.writer.progress()
    }
}

/// Outcome of [`apply_changes`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpdateReport {
    /// Records consumed.
    pub records: usize,
    /// Records passed to the deleter.
    pub deletes: usize,
    /// Elements queued for writing, per kind.
    pub queued: ProgressSnapshot,
    /// Elements processed by the writers, per kind.
    pub processed: ProgressSnapshot,
}

/// Element ids awaiting a rewrite.
#[derive(Debug, Default)]
struct Pending {
    nodes: BTreeSet<OsmId>,
    ways: BTreeSet<OsmId>,
    relations: BTreeSet<OsmId>,
}

/// Apply `records` in order against `cache` and `deps`, then rewrite every
/// added, modified or affected element.
///
/// Deletes and cache updates run sequentially. Writers run afterwards,
/// relations first so their member ways are known to be materialised before
/// the way writer sees them.
///
/// # Errors
/// [`UpdateError::Writer`] when a writer pool fails. Per-element failures are
/// reported through the context's diagnostics instead.
///
/// # Panics
/// Panics when a writer pool is started outside a tokio runtime.
pub async fn apply_changes(
    records: &[ChangeRecord],
    cache: &mut MemoryElementCache,
    deps: &mut DependencyCache,
    context: &UpdateContext,
) -> Result<UpdateReport, UpdateError> {
    let mut report = UpdateReport::default();
    let mut pending = Pending::default();

    for record in records {
        if record.delete {
            let mut deleter = Deleter::new(
                &*cache,
                deps,
                context.deleter.as_ref(),
                &context.matchers,
                context.diagnostics.as_ref(),
            );
            if let Some(expired) = &context.expired {
                deleter = deleter.with_expired_tiles(expired);
            }
            deleter.delete(record);
            report.deletes += 1;
        }
        apply_to_cache(record, cache, deps, &mut pending);
        report.records += 1;
    }
    log::debug!(
        "pending rewrites: {} nodes, {} ways, {} relations",
        pending.nodes.len(),
        pending.ways.len(),
        pending.relations.len()
    );

    let writer = context
        .writer
        .clone()
        .with_materialized(cache.shared_materialized());
    let workers = context.workers;
    let diagnostics = context.diagnostics.as_ref();

    let pool = WriterPool::relations(
        Arc::clone(&context.matchers.polygons),
        writer.clone(),
        workers,
    );
    report.queued.relations = queue(
        &pool,
        ElementKind::Relation,
        &pending.relations,
        diagnostics,
        |id| {
            let Some(mut relation) = found(cache.relation(id))? else {
                return Ok(None);
            };
            cache.hydrate_relation(&mut relation)?;
            Ok(Some(relation))
        },
    )
    .await;
    finish(pool, ElementKind::Relation).await?;

    let pool = WriterPool::ways(&context.matchers, writer.clone(), workers);
    report.queued.ways = queue(&pool, ElementKind::Way, &pending.ways, diagnostics, |id| {
        let Some(mut way) = found(cache.way(id))? else {
            return Ok(None);
        };
        cache.hydrate_way(&mut way)?;
        Ok(Some(way))
    })
    .await;
    finish(pool, ElementKind::Way).await?;

    let pool = WriterPool::nodes(Arc::clone(&context.matchers.points), writer, workers);
    report.queued.nodes = queue(&pool, ElementKind::Node, &pending.nodes, diagnostics, |id| {
        found(cache.node(id))
    })
    .await;
    finish(pool, ElementKind::Node).await?;

    report.processed = context.progress().snapshot();
    Ok(report)
}

/// Store the record's new state and note which elements need rewriting.
fn apply_to_cache(
    record: &ChangeRecord,
    cache: &mut MemoryElementCache,
    deps: &mut DependencyCache,
    pending: &mut Pending,
) {
    match &record.element {
        Element::Node(node) => {
            if record.add {
                cache.put_node(node.clone());
                pending.nodes.insert(node.id);
            } else if record.delete {
                cache.remove_node(node.id);
                pending.nodes.remove(&node.id);
            }
            if record.modify {
                for way in deps.coords.dependents(node.id) {
                    pending.ways.insert(way);
                    pending.relations.extend(deps.ways.dependents(way));
                }
            }
        }
        Element::Way(way) => {
            if record.add {
                cache.put_way(way.clone());
                deps.add_from_way(way);
                pending.ways.insert(way.id);
            } else if record.delete {
                cache.remove_way(way.id);
                pending.ways.remove(&way.id);
            }
            if record.modify {
                pending.relations.extend(deps.ways.dependents(way.id));
            }
        }
        Element::Relation(relation) => {
            if record.add {
                cache.put_relation(relation.clone());
                deps.add_from_relation(relation);
                pending.relations.insert(relation.id);
            } else if record.delete {
                cache.remove_relation(relation.id);
                pending.relations.remove(&relation.id);
            }
        }
    }
}

/// Treat absence as `None`.
fn found<T>(lookup: Result<T, CacheError>) -> Result<Option<T>, CacheError> {
    match lookup {
        Ok(element) => Ok(Some(element)),
        Err(error) if error.is_not_found() => Ok(None),
        Err(error) => Err(error),
    }
}

/// Load and queue each pending id, returning how many were queued.
///
/// Ids no longer cached, typically deleted later in the batch, are skipped
/// quietly; lookup or hydration failures are reported.
async fn queue<P, F>(
    pool: &WriterPool<P>,
    kind: ElementKind,
    ids: &BTreeSet<OsmId>,
    diagnostics: &dyn Diagnostics,
    mut load: F,
) -> u64
where
    P: ProcessElement,
    F: FnMut(OsmId) -> Result<Option<P::Element>, CacheError>,
{
    let mut queued = 0;
    for &id in ids {
        match load(id) {
            Ok(Some(element)) => {
                if pool.send(element).await.is_err() {
                    break;
                }
                queued += 1;
            }
            Ok(None) => log::debug!("skipping rewrite of missing {kind} {id}"),
            Err(error) => diagnostics.report(DiagnosticEvent::HydrationFailed { kind, id, error }),
        }
    }
    queued
}

async fn finish<P: ProcessElement>(pool: WriterPool<P>, kind: ElementKind) -> Result<(), UpdateError> {
    pool.finish()
        .await
        .map_err(|source| UpdateError::Writer { kind, source })
}
