use std::path::PathBuf;

use serde::Serialize;

use crate::{
    domain::album::{AlbumContext, TrackFile},
    edit::FieldReport,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrackStatus {
    Committed,
    /// The file was left untouched
    Skipped { reason: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackReport {
    pub path: PathBuf,
    pub title: String,
    #[serde(flatten)]
    pub status: TrackStatus,
    pub fields: Vec<FieldReport>,
}

impl TrackReport {
    pub fn new(track: &TrackFile, status: TrackStatus, fields: Vec<FieldReport>) -> Self {
        Self {
            path: track.path.clone(),
            title: track.title.clone(),
            status,
            fields,
        }
    }

    pub fn skipped(track: &TrackFile, reason: impl Into<String>) -> Self {
        Self::new(
            track,
            TrackStatus::Skipped {
                reason: reason.into(),
            },
            Vec::new(),
        )
    }

    pub fn is_committed(&self) -> bool {
        self.status == TrackStatus::Committed
    }
}

/// Everything that happened while processing one album directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub directory: PathBuf,
    pub album: AlbumContext,
    /// Originals restored from stages left by an interrupted run
    pub recovered: Vec<PathBuf>,
    /// Override names that are not tag fields
    pub rejected_overrides: Vec<String>,
    pub tracks: Vec<TrackReport>,
    /// Staging files deleted after processing
    pub swept: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

impl BatchReport {
    pub fn committed(&self) -> usize {
        self.tracks.iter().filter(|t| t.is_committed()).count()
    }
}
