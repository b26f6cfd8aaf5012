//! Apply command implementation for the Strata CLI.

use std::io::Write;
use std::num::NonZeroUsize;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use geo::{Coord, Rect};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use strata_core::{
    AreaLimiter, DEFAULT_EXPIRE_ZOOM, ExpiredTiles, LogDiagnostics, MAX_EXPIRE_ZOOM, MappingConfig,
    Matchers, TileCoord, write_tile_list,
};
use strata_data::{CacheState, SqliteRowStore, fs, read_change_records};
use strata_diff::{UpdateContext, UpdateReport, apply_changes};

use crate::{
    ARG_CHANGES, ARG_DATABASE, ARG_EXPIRE_TILES, ARG_EXPIRE_ZOOM, ARG_LIMIT_TO, ARG_MAPPING,
    ARG_STATE, ARG_WORKERS, CliError, ENV_CHANGES, ENV_DATABASE, ENV_MAPPING, ENV_STATE,
};

/// CLI arguments for the `apply` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Apply a JSON-lines change file: delete stale rows, rewrite \
                 changed elements into the row database and persist the \
                 updated element cache. Paths can come from CLI flags, \
                 configuration files, or environment variables.",
    about = "Apply a change file to the materialised tables"
)]
#[ortho_config(prefix = "STRATA")]
pub(crate) struct ApplyArgs {
    /// Cache state file, created when absent.
    #[arg(long = ARG_STATE, value_name = "path")]
    #[serde(default)]
    pub(crate) state: Option<Utf8PathBuf>,
    /// JSON-lines change file.
    #[arg(long = ARG_CHANGES, value_name = "path")]
    #[serde(default)]
    pub(crate) changes: Option<Utf8PathBuf>,
    /// JSON tag mapping describing the output tables.
    #[arg(long = ARG_MAPPING, value_name = "path")]
    #[serde(default)]
    pub(crate) mapping: Option<Utf8PathBuf>,
    /// SQLite database holding the materialised rows.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Write touched tiles as `z/x/y` lines to this file.
    #[arg(long = ARG_EXPIRE_TILES, value_name = "path")]
    #[serde(default)]
    pub(crate) expire_tiles: Option<Utf8PathBuf>,
    /// Zoom level of the expired tile list.
    #[arg(long = ARG_EXPIRE_ZOOM, value_name = "zoom")]
    #[serde(default)]
    pub(crate) expire_zoom: Option<u8>,
    /// Clip output to `minlon,minlat,maxlon,maxlat`.
    #[arg(long = ARG_LIMIT_TO, value_name = "bbox")]
    #[serde(default)]
    pub(crate) limit_to: Option<String>,
    /// Writer tasks per element kind.
    #[arg(long = ARG_WORKERS, value_name = "count")]
    #[serde(default)]
    pub(crate) workers: Option<usize>,
}

impl ApplyArgs {
    pub(crate) fn into_config(self) -> Result<ApplyConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ApplyConfig::try_from(merged)
    }
}

/// Resolved `apply` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ApplyConfig {
    pub(crate) state: Utf8PathBuf,
    pub(crate) changes: Utf8PathBuf,
    pub(crate) mapping: Utf8PathBuf,
    pub(crate) database: Utf8PathBuf,
    pub(crate) expire_tiles: Option<Utf8PathBuf>,
    pub(crate) expire_zoom: u8,
    /// Longitude/latitude coverage box.
    pub(crate) limit_to: Option<Rect<f64>>,
    pub(crate) workers: usize,
}

impl ApplyConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        Self::require_existing(&self.changes, ARG_CHANGES)?;
        Self::require_existing(&self.mapping, ARG_MAPPING)?;
        Ok(())
    }

    fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
        match fs::file_is_file(path) {
            Ok(true) => Ok(()),
            Ok(false) => Err(CliError::MissingSourceFile {
                field,
                path: path.to_path_buf(),
            }),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                Err(CliError::MissingSourceFile {
                    field,
                    path: path.to_path_buf(),
                })
            }
            Err(source) => Err(CliError::InspectSourcePath {
                field,
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

impl TryFrom<ApplyArgs> for ApplyConfig {
    type Error = CliError;

    fn try_from(args: ApplyArgs) -> Result<Self, Self::Error> {
        let state = args.state.ok_or(CliError::MissingArgument {
            field: ARG_STATE,
            env: ENV_STATE,
        })?;
        let changes = args.changes.ok_or(CliError::MissingArgument {
            field: ARG_CHANGES,
            env: ENV_CHANGES,
        })?;
        let mapping = args.mapping.ok_or(CliError::MissingArgument {
            field: ARG_MAPPING,
            env: ENV_MAPPING,
        })?;
        let database = args.database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env: ENV_DATABASE,
        })?;

        let expire_zoom = args.expire_zoom.unwrap_or(DEFAULT_EXPIRE_ZOOM);
        if expire_zoom > MAX_EXPIRE_ZOOM {
            return Err(CliError::InvalidExpireZoom {
                zoom: expire_zoom,
                max: MAX_EXPIRE_ZOOM,
            });
        }
        let limit_to = args.limit_to.as_deref().map(parse_bbox).transpose()?;
        let workers = args
            .workers
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, NonZeroUsize::get))
            .max(1);

        Ok(Self {
            state,
            changes,
            mapping,
            database,
            expire_tiles: args.expire_tiles,
            expire_zoom,
            limit_to,
            workers,
        })
    }
}

/// Parse `minlon,minlat,maxlon,maxlat` into a rectangle.
pub(crate) fn parse_bbox(value: &str) -> Result<Rect<f64>, CliError> {
    let invalid = || CliError::InvalidBoundingBox {
        value: value.to_owned(),
    };
    let numbers = value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid())?;
    let [min_x, min_y, max_x, max_y] = numbers.as_slice() else {
        return Err(invalid());
    };
    let ordered = min_x < max_x && min_y < max_y;
    let finite = numbers.iter().all(|number| number.is_finite());
    if !(ordered && finite) {
        return Err(invalid());
    }
    Ok(Rect::new(
        Coord { x: *min_x, y: *min_y },
        Coord { x: *max_x, y: *max_y },
    ))
}

/// Outcome of one `apply` run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ApplySummary {
    pub(crate) report: UpdateReport,
    pub(crate) expired_tiles: usize,
}

pub(super) fn run_apply(args: ApplyArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_apply_with(args, &mut stdout)
}

pub(super) fn run_apply_with(args: ApplyArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = resolve_apply_config(args)?;
    let summary = execute_apply(&config)?;
    write_summary(writer, &summary)
}

fn resolve_apply_config(args: ApplyArgs) -> Result<ApplyConfig, CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    Ok(config)
}

pub(crate) fn execute_apply(config: &ApplyConfig) -> Result<ApplySummary, CliError> {
    let matchers = load_mapping(&config.mapping)?;
    let records = read_change_records(&config.changes).map_err(|source| CliError::Changes {
        path: config.changes.clone(),
        source,
    })?;
    let (mut cache, mut deps) = CacheState::load_or_default(&config.state)?.restore();
    let store = Arc::new(SqliteRowStore::open(&config.database)?);

    let mut context = UpdateContext::new(matchers, store, Arc::new(LogDiagnostics))
        .with_workers(config.workers);
    if let Some(bbox) = config.limit_to {
        context = context.with_limiter(Arc::new(AreaLimiter::from_wgs84_bbox(bbox)));
    }
    let tiles = config
        .expire_tiles
        .as_ref()
        .map(|_| Arc::new(ExpiredTiles::new(config.expire_zoom)));
    if let Some(tiles) = &tiles {
        context = context.with_expired_tiles(Arc::clone(tiles));
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.workers)
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    let report = runtime.block_on(apply_changes(&records, &mut cache, &mut deps, &context))?;
    log::info!(
        "applied {} change records from {}",
        report.records,
        config.changes
    );

    CacheState::capture(&cache, &deps).save(&config.state)?;

    let mut expired_tiles = 0;
    if let (Some(path), Some(tiles)) = (&config.expire_tiles, tiles) {
        let drained = tiles.drain();
        write_expired_tiles(path, &drained)?;
        expired_tiles = drained.len();
    }
    Ok(ApplySummary {
        report,
        expired_tiles,
    })
}

fn load_mapping(path: &Utf8Path) -> Result<Matchers, CliError> {
    let json = fs::read_to_string(path).map_err(|source| CliError::ReadMapping {
        path: path.to_path_buf(),
        source,
    })?;
    MappingConfig::from_json(&json)
        .and_then(|mapping| mapping.matchers())
        .map_err(|source| CliError::InvalidMapping {
            path: path.to_path_buf(),
            source,
        })
}

fn write_expired_tiles(path: &Utf8Path, tiles: &[TileCoord]) -> Result<(), CliError> {
    let failed = |source| CliError::WriteExpiredTiles {
        path: path.to_path_buf(),
        source,
    };
    let mut buffer = Vec::new();
    write_tile_list(tiles, &mut buffer).map_err(failed)?;
    fs::write(path, &buffer).map_err(failed)
}

fn write_summary(writer: &mut dyn Write, summary: &ApplySummary) -> Result<(), CliError> {
    let ApplySummary {
        report,
        expired_tiles,
    } = summary;
    writeln!(
        writer,
        "applied {} records ({} deletes); wrote {} nodes, {} ways, {} relations; expired {} tiles",
        report.records,
        report.deletes,
        report.processed.nodes,
        report.processed.ways,
        report.processed.relations,
        expired_tiles
    )
    .map_err(CliError::WriteSummary)
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<ApplyConfig, CliError> {
    let merged = ApplyArgs::merge_from_layers(layers).map_err(CliError::from)?;
    ApplyConfig::try_from(merged)
}
