//! Module to classify the entries of an album directory

use walkdir::WalkDir;

use std::path::{Path, PathBuf};

use crate::{
    config::ScanConfig,
    storage::{error::DirectoryError, rewrite::is_staging_file},
};

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Files of one album directory, each list in listing order
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DirectoryListing {
    pub tracks: Vec<PathBuf>,
    pub covers: Vec<PathBuf>,
    pub stages: Vec<PathBuf>,
    /// Number of entries seen, classified or not
    pub entries: usize,
}

impl DirectoryListing {
    /// First cover candidate by listing order
    pub fn cover(&self) -> Option<&Path> {
        self.covers.first().map(PathBuf::as_path)
    }
}

/// Lists the files directly inside `dir`, sorted by file name.
///
/// A track-extension file whose name carries a generated staging suffix
/// is a leftover stage, never a track.
pub fn list_directory(dir: &Path, config: &ScanConfig) -> Result<DirectoryListing, DirectoryError> {
    let meta = std::fs::metadata(dir).map_err(|source| DirectoryError::Unreadable {
        path: dir.to_path_buf(),
        source,
    })?;
    if !meta.is_dir() {
        return Err(DirectoryError::NotADirectory(dir.to_path_buf()));
    }

    let dir_str = dir.to_string_lossy();
    let mut listing = DirectoryListing::default();

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(err) if err.depth() == 0 => {
                return Err(DirectoryError::Unreadable {
                    path: dir.to_path_buf(),
                    source: err.into(),
                });
            }
            Err(err) => {
                log::warn!("error while listing dir {dir_str}, skipping an entry: {err}");
                continue;
            }
        };
        listing.entries += 1;

        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        if has_extension(&path, &config.track_extensions) {
            if is_staging_file(&path) {
                listing.stages.push(path);
            } else {
                listing.tracks.push(path);
            }
        } else if has_extension(&path, &config.cover_extensions) {
            listing.covers.push(path);
        }
    }

    Ok(listing)
}

/// Album name of `dir`: its own name, or for `.` the last segment of the
/// working directory.
pub fn album_name(dir: &Path) -> Result<String, DirectoryError> {
    if let Some(name) = dir.file_name() {
        return Ok(name.to_string_lossy().into_owned());
    }

    let resolved = if dir == Path::new(".") {
        std::env::current_dir()
    } else {
        std::fs::canonicalize(dir)
    }
    .map_err(|source| DirectoryError::Unreadable {
        path: dir.to_path_buf(),
        source,
    })?;

    resolved
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| DirectoryError::NoAlbumName(dir.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::storage::rewrite::staging_path;

    #[test]
    fn classifies_tracks_covers_and_stages() -> anyhow::Result<()> {
        let tmp = TempDir::new()?;
        let root = tmp.path();

        let song1 = root.join("01.mp3");
        let song2 = root.join("02.MP3");
        let stage = staging_path(&song1);
        let cover = root.join("cover.jpg");
        let notes = root.join("notes.txt");
        for path in [&song1, &song2, &stage, &cover, &notes] {
            std::fs::write(path, b"x")?;
        }
        std::fs::create_dir(root.join("sub.mp3"))?;

        let listing = list_directory(root, &ScanConfig::default())?;

        assert_eq!(listing.tracks, vec![song1, song2]);
        assert_eq!(listing.covers, vec![cover]);
        assert_eq!(listing.stages, vec![stage]);
        assert_eq!(listing.entries, 6);
        Ok(())
    }

    #[test]
    fn marker_in_a_user_file_name_is_still_a_track() -> anyhow::Result<()> {
        let tmp = TempDir::new()?;
        let live = tmp.path().join("Live_TEMP_Mix.mp3");
        let cover = tmp.path().join("cover_TEMP_20240101120000000000000-0.jpg");
        std::fs::write(&live, b"x")?;
        std::fs::write(&cover, b"x")?;

        let listing = list_directory(tmp.path(), &ScanConfig::default())?;
        assert_eq!(listing.tracks, vec![live]);
        assert_eq!(listing.covers, vec![cover]);
        assert!(listing.stages.is_empty());
        Ok(())
    }

    #[test]
    fn first_cover_by_name_wins() -> anyhow::Result<()> {
        let tmp = TempDir::new()?;
        std::fs::write(tmp.path().join("b.png"), b"png")?;
        std::fs::write(tmp.path().join("a.jpg"), b"jpg")?;

        let listing = list_directory(tmp.path(), &ScanConfig::default())?;
        assert_eq!(listing.cover(), Some(tmp.path().join("a.jpg").as_path()));
        Ok(())
    }

    #[test]
    fn missing_directory_is_unreadable() {
        let tmp = TempDir::new().unwrap();
        let err = list_directory(&tmp.path().join("nope"), &ScanConfig::default()).unwrap_err();
        assert!(matches!(err, DirectoryError::Unreadable { .. }));
    }

    #[test]
    fn file_is_not_a_directory() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("01.mp3");
        std::fs::write(&file, b"x").unwrap();
        let err = list_directory(&file, &ScanConfig::default()).unwrap_err();
        assert!(matches!(err, DirectoryError::NotADirectory(_)));
    }

    #[test]
    fn album_name_comes_from_directory() -> anyhow::Result<()> {
        let tmp = TempDir::new()?;
        let album = tmp.path().join("AlbumX");
        std::fs::create_dir_all(album.join("sub"))?;

        assert_eq!(album_name(&album)?, "AlbumX");
        assert_eq!(album_name(&album.join("sub").join(".."))?, "AlbumX");
        Ok(())
    }

    #[test]
    fn album_name_of_dot_is_working_directory_name() -> anyhow::Result<()> {
        let cwd = std::env::current_dir()?;
        let expected = cwd.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(album_name(Path::new("."))?, expected);
        Ok(())
    }
}
