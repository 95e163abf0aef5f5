use std::path::{Path, PathBuf};

use serde::Serialize;

/// Album-level facts derived once per directory and shared read-only by
/// every track of that directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlbumContext {
    pub name: String,
    pub cover: Option<PathBuf>,
}

/// A track candidate with the title derived from its file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackFile {
    pub path: PathBuf,
    pub title: String,
}

impl TrackFile {
    pub fn new(path: PathBuf) -> Self {
        let title = title_from_path(&path);
        Self { path, title }
    }
}

/// File name without its extension
pub fn title_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_file_stem() {
        assert_eq!(TrackFile::new(PathBuf::from("/music/AlbumX/01.mp3")).title, "01");
        assert_eq!(
            TrackFile::new(PathBuf::from("Intro. Part 1.mp3")).title,
            "Intro. Part 1"
        );
    }
}
