use std::path::PathBuf;

use thiserror::Error;

use crate::codec::error::CodecError;

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("failed to encode tag: {0}")]
    Codec(#[from] CodecError),

    #[error("could not move {} aside: {source}", path.display())]
    Stage {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("writing {} failed, original restored: {source}", path.display())]
    RolledBack {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(
        "writing {} failed and the original could not be put back, it is kept at {}: {source}",
        path.display(),
        stage.display()
    )]
    RollbackFailed {
        path: PathBuf,
        stage: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("cannot read directory {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("directory {} is empty", .0.display())]
    Empty(PathBuf),

    #[error("cannot derive an album name from {}", .0.display())]
    NoAlbumName(PathBuf),
}
