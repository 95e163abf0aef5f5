//! Drives tag edits over every track of one album directory

use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use log::{info, warn};
use rayon::{ThreadPoolBuilder, prelude::*};

use crate::{
    codec,
    config::ScanConfig,
    domain::{
        album::{AlbumContext, TrackFile},
        tag::AlbumImage,
    },
    edit::{self, FieldStatus},
    storage::{
        error::{DirectoryError, RewriteError},
        fs::{album_name, list_directory},
        rewrite,
    },
};

mod overrides;
mod report;

pub use overrides::Overrides;
pub use report::{BatchReport, TrackReport, TrackStatus};

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub scan: ScanConfig,
    /// Tracks processed at the same time; values below 1 count as 1
    pub jobs: usize,
    /// Checked before each track; once set, remaining tracks are skipped
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            jobs: 1,
            cancel: None,
        }
    }
}

impl BatchOptions {
    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

/// Read-only state shared by every track of a run
struct AlbumRun<'a> {
    album: &'a AlbumContext,
    cover: Option<&'a AlbumImage>,
    overrides: &'a [(String, String)],
}

/// Sets album, title and cover on every track in `dir` and applies
/// `overrides`.
///
/// Only problems with the directory itself are errors. Anything that goes
/// wrong with a single track is recorded in the report and the remaining
/// tracks are still processed.
pub fn process_directory(
    dir: &Path,
    overrides: &Overrides,
    options: &BatchOptions,
) -> Result<BatchReport, DirectoryError> {
    let mut warnings = Vec::new();

    let listing = list_directory(dir, &options.scan)?;
    if listing.entries == 0 {
        return Err(DirectoryError::Empty(dir.to_path_buf()));
    }
    let recovered = recover_stages(&listing.stages, &mut warnings);
    let listing = if recovered.is_empty() {
        listing
    } else {
        list_directory(dir, &options.scan)?
    };

    let album = AlbumContext {
        name: album_name(dir)?,
        cover: listing.cover().map(Path::to_path_buf),
    };
    info!("Album name: {}", album.name);
    match &album.cover {
        Some(cover) => info!("Album cover: {}", cover.display()),
        None => info!("Album cover: none"),
    }

    let cover = match album.cover.as_deref().map(edit::load_cover).transpose() {
        Ok(cover) => cover,
        Err(e) => {
            let msg = format!("cover image could not be read, none embedded: {e}");
            warn!("{msg}");
            warnings.push(msg);
            None
        }
    };

    let (accepted, rejected_overrides) = overrides.resolve();
    for name in &rejected_overrides {
        warn!("Invalid option: {name}");
    }

    let tracks: Vec<TrackFile> = listing.tracks.into_iter().map(TrackFile::new).collect();
    let run = AlbumRun {
        album: &album,
        cover: cover.as_ref(),
        overrides: &accepted,
    };
    let (track_reports, leftovers): (Vec<_>, Vec<_>) =
        run_tracks(&tracks, &run, options).into_iter().unzip();

    // only stages this run has seen; another writer's stage is not ours
    let mut stages = listing.stages;
    stages.extend(leftovers.into_iter().flatten());
    let swept = sweep_stages(stages, &mut warnings);

    Ok(BatchReport {
        directory: dir.to_path_buf(),
        album,
        recovered,
        rejected_overrides,
        tracks: track_reports,
        swept,
        warnings,
    })
}

/// Processes `tracks` on a pool of `options.jobs` threads, keeping the
/// results in track order. Each result carries the staging file its
/// rewrite left behind, if any.
fn run_tracks(
    tracks: &[TrackFile],
    run: &AlbumRun,
    options: &BatchOptions,
) -> Vec<(TrackReport, Option<PathBuf>)> {
    let process = |track: &TrackFile| {
        if options.is_cancelled() {
            (TrackReport::skipped(track, "batch cancelled"), None)
        } else {
            process_track(track, run)
        }
    };

    match ThreadPoolBuilder::new()
        .num_threads(options.jobs.max(1))
        .build()
    {
        Ok(pool) => pool.install(|| tracks.par_iter().map(process).collect()),
        Err(e) => {
            warn!("could not start worker threads, processing tracks one at a time: {e}");
            tracks.iter().map(process).collect()
        }
    }
}

fn process_track(track: &TrackFile, run: &AlbumRun) -> (TrackReport, Option<PathBuf>) {
    info!("Editing file: {}", track.path.display());

    let bytes = match std::fs::read(&track.path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("cannot read {}: {e}", track.path.display());
            let report = TrackReport::new(
                track,
                TrackStatus::Failed {
                    reason: format!("cannot read file: {e}"),
                },
                Vec::new(),
            );
            return (report, None);
        }
    };

    let parsed = codec::decode(&bytes).and_then(|tag| {
        let (_, payload) = codec::split_payload(&bytes)?;
        Ok((tag, payload))
    });
    let (current, payload) = match parsed {
        Ok(parts) => parts,
        Err(e) => {
            warn!("skipping {}: {e}", track.path.display());
            return (TrackReport::skipped(track, e.to_string()), None);
        }
    };

    let edits = edit::track_edits(run.album, track, run.cover, run.overrides);
    let (tag, fields) = edit::apply_edits(current, &edits);
    for field in &fields {
        match &field.status {
            FieldStatus::Applied => info!("Overriding {}: {:?}", field.field, field.value),
            FieldStatus::Skipped { reason } => warn!("Skipping {}: {reason}", field.field),
        }
    }

    let (status, leftover) = match rewrite::commit(&track.path, &tag, payload) {
        Ok(leftover) => (TrackStatus::Committed, leftover),
        Err(e) => {
            warn!("failed to rewrite {}: {e}", track.path.display());
            let leftover = match &e {
                RewriteError::RollbackFailed { stage, .. } => Some(stage.clone()),
                _ => None,
            };
            let status = TrackStatus::Failed {
                reason: e.to_string(),
            };
            (status, leftover)
        }
    };
    (TrackReport::new(track, status, fields), leftover)
}

fn recover_stages(stages: &[PathBuf], warnings: &mut Vec<String>) -> Vec<PathBuf> {
    let mut recovered = Vec::new();
    for stage in stages {
        match rewrite::recover_stage(stage) {
            Ok(Some(original)) => recovered.push(original),
            Ok(None) => {}
            Err(e) => {
                let msg = format!("could not restore {}: {e}", stage.display());
                warn!("{msg}");
                warnings.push(msg);
            }
        }
    }
    recovered
}

/// Deletes the given staging files that sit next to their originals. Runs
/// only after every track has finished.
fn sweep_stages(stages: Vec<PathBuf>, warnings: &mut Vec<String>) -> Vec<PathBuf> {
    let mut swept = Vec::new();
    for stage in stages {
        if !stage.exists() {
            continue;
        }
        match rewrite::sweep_stage(&stage) {
            Ok(true) => swept.push(stage),
            Ok(false) => {
                let msg = format!(
                    "kept {}: it is the only copy of its original",
                    stage.display()
                );
                warn!("{msg}");
                warnings.push(msg);
            }
            Err(e) => {
                let msg = format!("could not delete {}: {e}", stage.display());
                warn!("{msg}");
                warnings.push(msg);
            }
        }
    }
    swept
}
