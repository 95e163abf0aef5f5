use std::{fmt, str::FromStr};

use serde::Serialize;
use thiserror::Error;

use super::genre;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TagError {
    #[error("invalid value {value:?} for field {field}: {reason}")]
    Validation {
        field: TagField,
        value: String,
        reason: &'static str,
    },

    #[error("unknown field '{0}'")]
    UnknownField(String),
}

/// Named fields a caller may set on a [`Tag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TagField {
    Track,
    Artist,
    Title,
    Album,
    Year,
    Genre,
    Comment,
    Lyrics,
    Composer,
    Publisher,
    OriginalArtist,
    AlbumArtist,
    Copyright,
    Url,
    Encoder,
}

impl TagField {
    pub const ALL: [TagField; 15] = [
        TagField::Track,
        TagField::Artist,
        TagField::Title,
        TagField::Album,
        TagField::Year,
        TagField::Genre,
        TagField::Comment,
        TagField::Lyrics,
        TagField::Composer,
        TagField::Publisher,
        TagField::OriginalArtist,
        TagField::AlbumArtist,
        TagField::Copyright,
        TagField::Url,
        TagField::Encoder,
    ];

    /// Name used on the command line and in config files
    pub fn as_str(&self) -> &'static str {
        match self {
            TagField::Track => "track",
            TagField::Artist => "artist",
            TagField::Title => "title",
            TagField::Album => "album",
            TagField::Year => "year",
            TagField::Genre => "genre",
            TagField::Comment => "comment",
            TagField::Lyrics => "lyrics",
            TagField::Composer => "composer",
            TagField::Publisher => "publisher",
            TagField::OriginalArtist => "originalArtist",
            TagField::AlbumArtist => "albumArtist",
            TagField::Copyright => "copyright",
            TagField::Url => "url",
            TagField::Encoder => "encoder",
        }
    }
}

impl fmt::Display for TagField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TagField {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TagField::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| TagError::UnknownField(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumImage {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// A frame the tag carries but does not model, kept verbatim so that
/// rewriting a file never drops metadata written by other tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpaqueFrame {
    pub id: [u8; 4],
    pub flags: [u8; 2],
    pub body: Vec<u8>,
}

/// In-memory metadata tag of one audio file.
///
/// Every field is unset by default. Setters validate before touching any
/// state, so a failed set leaves the tag unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tag {
    track: Option<u32>,
    artist: Option<String>,
    title: Option<String>,
    album: Option<String>,
    year: Option<String>,
    genre: Option<u32>,
    comment: Option<String>,
    lyrics: Option<String>,
    composer: Option<String>,
    publisher: Option<String>,
    original_artist: Option<String>,
    album_artist: Option<String>,
    copyright: Option<String>,
    url: Option<String>,
    encoder: Option<String>,
    album_image: Option<AlbumImage>,
    opaque: Vec<OpaqueFrame>,
}

impl Tag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self) -> Option<u32> {
        self.track
    }

    pub fn year(&self) -> Option<&str> {
        self.year.as_deref()
    }

    pub fn genre(&self) -> Option<u32> {
        self.genre
    }

    pub fn genre_description(&self) -> Option<&'static str> {
        self.genre.map(genre::description)
    }

    pub fn album_image(&self) -> Option<&AlbumImage> {
        self.album_image.as_ref()
    }

    pub fn opaque_frames(&self) -> &[OpaqueFrame] {
        &self.opaque
    }

    /// Value of a free-text field, `None` for track, year and genre
    pub fn text(&self, field: TagField) -> Option<&str> {
        let slot = match field {
            TagField::Artist => &self.artist,
            TagField::Title => &self.title,
            TagField::Album => &self.album,
            TagField::Comment => &self.comment,
            TagField::Lyrics => &self.lyrics,
            TagField::Composer => &self.composer,
            TagField::Publisher => &self.publisher,
            TagField::OriginalArtist => &self.original_artist,
            TagField::AlbumArtist => &self.album_artist,
            TagField::Copyright => &self.copyright,
            TagField::Url => &self.url,
            TagField::Encoder => &self.encoder,
            TagField::Track | TagField::Year | TagField::Genre => return None,
        };
        slot.as_deref()
    }

    /// Display form of any field
    pub fn get(&self, field: TagField) -> Option<String> {
        match field {
            TagField::Track => self.track.map(|t| t.to_string()),
            TagField::Year => self.year.clone(),
            TagField::Genre => self.genre.map(|g| g.to_string()),
            other => self.text(other).map(str::to_string),
        }
    }

    fn text_slot_mut(&mut self, field: TagField) -> Option<&mut Option<String>> {
        let slot = match field {
            TagField::Artist => &mut self.artist,
            TagField::Title => &mut self.title,
            TagField::Album => &mut self.album,
            TagField::Comment => &mut self.comment,
            TagField::Lyrics => &mut self.lyrics,
            TagField::Composer => &mut self.composer,
            TagField::Publisher => &mut self.publisher,
            TagField::OriginalArtist => &mut self.original_artist,
            TagField::AlbumArtist => &mut self.album_artist,
            TagField::Copyright => &mut self.copyright,
            TagField::Url => &mut self.url,
            TagField::Encoder => &mut self.encoder,
            TagField::Track | TagField::Year | TagField::Genre => return None,
        };
        Some(slot)
    }

    /// Parses and stores `value` for `field`.
    ///
    /// An empty value clears a text field. Track, year and genre must
    /// always carry a valid value.
    pub fn set(&mut self, field: TagField, value: &str) -> Result<(), TagError> {
        let invalid = |reason| TagError::Validation {
            field,
            value: value.to_string(),
            reason,
        };

        if value.contains('\0') {
            return Err(invalid("contains a NUL character"));
        }

        match field {
            TagField::Track => {
                let track = value
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| invalid("expected a non-negative integer"))?;
                self.track = Some(track);
            }
            TagField::Genre => {
                let code = value
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| invalid("expected a non-negative genre code"))?;
                self.genre = Some(code);
            }
            TagField::Year => {
                if value.len() != 4 || !value.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid("expected a 4-digit year"));
                }
                self.year = Some(value.to_string());
            }
            TagField::Url if value.chars().any(|c| u32::from(c) > 0xFF) => {
                return Err(invalid("URL must be ISO-8859-1 text"));
            }
            text => {
                if let Some(slot) = self.text_slot_mut(text) {
                    *slot = (!value.is_empty()).then(|| value.to_string());
                }
            }
        }
        Ok(())
    }

    /// Like [`Tag::set`], resolving the field from its name first
    pub fn set_by_name(&mut self, name: &str, value: &str) -> Result<TagField, TagError> {
        let field = name.parse::<TagField>()?;
        self.set(field, value)?;
        Ok(field)
    }

    pub fn set_genre(&mut self, code: u32) {
        self.genre = Some(code);
    }

    pub fn set_album_image(&mut self, image: AlbumImage) {
        self.album_image = Some(image);
    }

    pub fn push_opaque(&mut self, frame: OpaqueFrame) {
        self.opaque.push(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_round_trip_through_from_str() {
        for field in TagField::ALL {
            assert_eq!(field.as_str().parse::<TagField>(), Ok(field));
        }
    }

    #[test]
    fn unknown_field_name_is_rejected() {
        let mut tag = Tag::new();
        let err = tag.set_by_name("bpm", "120").unwrap_err();
        assert_eq!(err, TagError::UnknownField("bpm".to_string()));
        assert_eq!(tag, Tag::new());
    }

    #[test]
    fn field_names_are_case_sensitive() {
        assert!("Artist".parse::<TagField>().is_err());
        assert!("albumartist".parse::<TagField>().is_err());
    }

    #[test]
    fn invalid_track_leaves_previous_value() {
        let mut tag = Tag::new();
        tag.set(TagField::Track, "7").unwrap();

        let err = tag.set(TagField::Track, "seven").unwrap_err();
        assert!(matches!(
            err,
            TagError::Validation {
                field: TagField::Track,
                ..
            }
        ));
        assert_eq!(tag.track(), Some(7));
    }

    #[test]
    fn negative_track_is_rejected() {
        let mut tag = Tag::new();
        assert!(tag.set(TagField::Track, "-1").is_err());
        assert_eq!(tag.track(), None);
    }

    #[test]
    fn genre_code_derives_description() {
        let mut tag = Tag::new();
        tag.set(TagField::Genre, "17").unwrap();
        assert_eq!(tag.genre(), Some(17));
        assert_eq!(tag.genre_description(), Some("Rock"));

        tag.set(TagField::Genre, "200").unwrap();
        assert_eq!(tag.genre_description(), Some(genre::UNKNOWN_GENRE));

        tag.set(TagField::Genre, "300").unwrap();
        assert_eq!(tag.genre(), Some(300));
        assert_eq!(tag.genre_description(), Some(genre::UNKNOWN_GENRE));

        assert!(tag.set(TagField::Genre, "rock").is_err());
        assert!(tag.set(TagField::Genre, "-3").is_err());
        assert_eq!(tag.genre(), Some(300));
    }

    #[test]
    fn year_must_have_four_digits() {
        let mut tag = Tag::new();
        assert!(tag.set(TagField::Year, "99").is_err());
        assert!(tag.set(TagField::Year, "2k24").is_err());
        tag.set(TagField::Year, "1999").unwrap();
        assert_eq!(tag.year(), Some("1999"));
    }

    #[test]
    fn empty_text_clears_field() {
        let mut tag = Tag::new();
        tag.set(TagField::Artist, "Someone").unwrap();
        tag.set(TagField::Artist, "").unwrap();
        assert_eq!(tag.text(TagField::Artist), None);
    }

    #[test]
    fn nul_characters_are_rejected() {
        let mut tag = Tag::new();
        assert!(tag.set(TagField::Comment, "a\0b").is_err());
        assert_eq!(tag.text(TagField::Comment), None);
    }

    #[test]
    fn url_rejects_characters_outside_latin1() {
        let mut tag = Tag::new();
        assert!(tag.set(TagField::Url, "https://example.com/\u{4e2d}").is_err());
        tag.set(TagField::Url, "https://example.com/caf\u{e9}").unwrap();
    }

    #[test]
    fn get_renders_every_field() {
        let mut tag = Tag::new();
        for field in TagField::ALL {
            let value = match field {
                TagField::Track => "3",
                TagField::Year => "2001",
                TagField::Genre => "8",
                _ => "value",
            };
            tag.set(field, value).unwrap();
            assert_eq!(tag.get(field).as_deref(), Some(value));
        }
    }
}
