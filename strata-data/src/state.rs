//! Persistence of the element and dependency caches between runs.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use strata_core::{
    DependencyCache, ElementCache, MaterializedLines, MemoryElementCache, Node, OsmId, Relation,
    Way,
};
use thiserror::Error;

use crate::fs;

/// Errors raised while loading or saving cache state.
#[derive(Debug, Error)]
pub enum CacheStateError {
    /// Reading the state file failed.
    #[error("failed to read cache state {path}")]
    Read {
        /// State file path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Writing the state file failed.
    #[error("failed to write cache state {path}")]
    Write {
        /// State file path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The state could not be encoded or decoded.
    #[error("cache state {path} is not valid JSON")]
    Json {
        /// State file path.
        path: Utf8PathBuf,
        /// Source error produced by `serde_json`.
        #[source]
        source: serde_json::Error,
    },
}

/// Serialisable snapshot of everything an update needs from earlier runs.
///
/// Ways and relations are stored without hydrated coordinates or resolved
/// members; those are rebuilt from the cached nodes on demand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheState {
    /// Cached nodes.
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Cached ways.
    #[serde(default)]
    pub ways: Vec<Way>,
    /// Cached relations.
    #[serde(default)]
    pub relations: Vec<Relation>,
    /// Ways already represented by relation rows.
    #[serde(default)]
    pub materialized: Vec<OsmId>,
    /// Reverse references observed so far.
    #[serde(default)]
    pub dependencies: DependencyCache,
}

impl CacheState {
    /// Snapshot `cache` and `deps`, with every list in ascending id order.
    #[must_use]
    pub fn capture(cache: &MemoryElementCache, deps: &DependencyCache) -> Self {
        Self {
            nodes: cache.nodes().into_iter().cloned().collect(),
            ways: cache.ways().into_iter().cloned().collect(),
            relations: cache.relations().into_iter().cloned().collect(),
            materialized: cache.materialized().ids(),
            dependencies: deps.clone(),
        }
    }

    /// Rebuild the element cache and return it with the dependency cache.
    #[must_use]
    pub fn restore(self) -> (MemoryElementCache, DependencyCache) {
        let mut cache = MemoryElementCache::new();
        for node in self.nodes {
            cache.put_node(node);
        }
        for way in self.ways {
            cache.put_way(way);
        }
        for relation in self.relations {
            cache.put_relation(relation);
        }
        cache.set_materialized(self.materialized.into_iter().collect::<MaterializedLines>());
        (cache, self.dependencies)
    }

    /// Load state from `path`.
    ///
    /// # Errors
    /// Fails when the file cannot be read or does not hold valid state.
    pub fn load(path: &Utf8Path) -> Result<Self, CacheStateError> {
        let json = fs::read_to_string(path).map_err(|source| CacheStateError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let state: Self = serde_json::from_str(&json).map_err(|source| CacheStateError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!(
            "loaded {} nodes, {} ways and {} relations from {path}",
            state.nodes.len(),
            state.ways.len(),
            state.relations.len()
        );
        Ok(state)
    }

    /// Load state from `path`, starting empty when the file does not exist.
    ///
    /// # Errors
    /// Fails for any problem other than the file being absent.
    pub fn load_or_default(path: &Utf8Path) -> Result<Self, CacheStateError> {
        match Self::load(path) {
            Err(CacheStateError::Read { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                log::info!("no cache state at {path}, starting empty");
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Write state to `path`, replacing any previous file.
    ///
    /// # Errors
    /// Fails when the state cannot be encoded or the file cannot be written.
    pub fn save(&self, path: &Utf8Path) -> Result<(), CacheStateError> {
        let json = serde_json::to_vec_pretty(self).map_err(|source| CacheStateError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, &json).map_err(|source| CacheStateError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}
