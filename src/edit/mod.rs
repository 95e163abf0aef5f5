//! Applies field edits to a tag

use serde::Serialize;

use crate::domain::{
    album::{AlbumContext, TrackFile},
    tag::{AlbumImage, Tag, TagField},
};

mod cover;

pub use cover::{load_cover, mime_for_image};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    /// A value computed by the batch itself (album name, title)
    Set { field: TagField, value: String },
    /// A caller-supplied value, resolved by name
    Override { name: String, value: String },
    /// Embed this cover; `None` keeps whatever image the tag already has
    Cover(Option<AlbumImage>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FieldStatus {
    Applied,
    Skipped { reason: String },
}

/// Outcome of one override on one track
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldReport {
    pub field: String,
    pub value: String,
    #[serde(flatten)]
    pub status: FieldStatus,
}

/// Applies `edits` in order to `current`, or to a fresh tag if there is
/// none. A rejected override is reported and skipped; everything else
/// still applies.
pub fn apply_edits(current: Option<Tag>, edits: &[Edit]) -> (Tag, Vec<FieldReport>) {
    let mut tag = current.unwrap_or_default();
    let mut reports = Vec::new();

    for edit in edits {
        match edit {
            Edit::Set { field, value } => {
                if let Err(e) = tag.set(*field, value) {
                    log::warn!("could not set {field}: {e}");
                }
            }
            Edit::Override { name, value } => {
                let status = match tag.set_by_name(name, value) {
                    Ok(_) => FieldStatus::Applied,
                    Err(e) => FieldStatus::Skipped {
                        reason: e.to_string(),
                    },
                };
                reports.push(FieldReport {
                    field: name.clone(),
                    value: value.clone(),
                    status,
                });
            }
            Edit::Cover(Some(image)) => tag.set_album_image(image.clone()),
            Edit::Cover(None) => {}
        }
    }

    (tag, reports)
}

/// Edit sequence for one track of an album.
///
/// The album name is applied again after the overrides, so it always
/// ends up as the directory-derived value.
pub fn track_edits(
    album: &AlbumContext,
    track: &TrackFile,
    cover: Option<&AlbumImage>,
    overrides: &[(String, String)],
) -> Vec<Edit> {
    let album_edit = Edit::Set {
        field: TagField::Album,
        value: album.name.clone(),
    };

    let mut edits = vec![
        album_edit.clone(),
        Edit::Set {
            field: TagField::Title,
            value: track.title.clone(),
        },
        Edit::Cover(cover.cloned()),
    ];
    edits.extend(overrides.iter().map(|(name, value)| Edit::Override {
        name: name.clone(),
        value: value.clone(),
    }));
    edits.push(album_edit);
    edits
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn over(name: &str, value: &str) -> Edit {
        Edit::Override {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    fn image(bytes: &[u8]) -> AlbumImage {
        AlbumImage {
            data: bytes.to_vec(),
            mime_type: "image/png".to_string(),
        }
    }

    #[test]
    fn fresh_tag_is_created_when_missing() {
        let (tag, reports) = apply_edits(None, &[over("artist", "A B")]);
        assert_eq!(tag.text(TagField::Artist), Some("A B"));
        assert_eq!(reports[0].status, FieldStatus::Applied);
    }

    #[test]
    fn later_edits_win() {
        let (tag, _) = apply_edits(None, &[over("title", "one"), over("title", "two")]);
        assert_eq!(tag.text(TagField::Title), Some("two"));
    }

    #[test]
    fn invalid_override_is_skipped_and_others_apply() {
        let mut current = Tag::new();
        current.set(TagField::Track, "4").unwrap();

        let (tag, reports) = apply_edits(
            Some(current),
            &[over("track", "four"), over("artist", "X"), over("bpm", "120")],
        );

        assert_eq!(tag.track(), Some(4));
        assert_eq!(tag.text(TagField::Artist), Some("X"));
        assert!(matches!(reports[0].status, FieldStatus::Skipped { .. }));
        assert_eq!(reports[1].status, FieldStatus::Applied);
        assert!(matches!(
            &reports[2].status,
            FieldStatus::Skipped { reason } if reason.contains("unknown field")
        ));
    }

    #[test]
    fn missing_cover_keeps_existing_image() {
        let mut current = Tag::new();
        current.set_album_image(image(b"old"));

        let (tag, _) = apply_edits(Some(current.clone()), &[Edit::Cover(None)]);
        assert_eq!(tag.album_image(), Some(&image(b"old")));

        let (tag, _) = apply_edits(Some(current), &[Edit::Cover(Some(image(b"new")))]);
        assert_eq!(tag.album_image(), Some(&image(b"new")));
    }

    #[test]
    fn album_override_does_not_stick() {
        let album = AlbumContext {
            name: "AlbumX".to_string(),
            cover: None,
        };
        let track = TrackFile::new(PathBuf::from("AlbumX/01.mp3"));
        let overrides = vec![
            ("album".to_string(), "Other".to_string()),
            ("title".to_string(), "Renamed".to_string()),
        ];

        let edits = track_edits(&album, &track, None, &overrides);
        let (tag, reports) = apply_edits(None, &edits);

        assert_eq!(tag.text(TagField::Album), Some("AlbumX"));
        assert_eq!(tag.text(TagField::Title), Some("Renamed"));
        assert!(reports.iter().all(|r| r.status == FieldStatus::Applied));
    }

    #[test]
    fn standard_order_sets_album_title_and_cover() {
        let album = AlbumContext {
            name: "AlbumX".to_string(),
            cover: Some(PathBuf::from("AlbumX/cover.png")),
        };
        let track = TrackFile::new(PathBuf::from("AlbumX/02.mp3"));
        let cover = image(b"png");

        let edits = track_edits(&album, &track, Some(&cover), &[]);
        let (tag, reports) = apply_edits(None, &edits);

        assert!(reports.is_empty());
        assert_eq!(tag.text(TagField::Album), Some("AlbumX"));
        assert_eq!(tag.text(TagField::Title), Some("02"));
        assert_eq!(tag.album_image(), Some(&cover));
    }
}
