//! ID3v2.4 tag codec.
//!
//! Only version 2.4 tags are decoded. Encoding always produces a 2.4 tag
//! with UTF-8 text, no padding and no footer, so the output for a given
//! [`Tag`] is deterministic.

use crate::domain::{
    genre,
    tag::{AlbumImage, OpaqueFrame, Tag, TagField},
};

pub mod error;
mod frame;

use error::CodecError;
use frame::*;

const TAG_FLAG_UNSYNC: u8 = 0x80;
const TAG_FLAG_EXTENDED: u8 = 0x40;
const TAG_FLAG_EXPERIMENTAL: u8 = 0x20;
const TAG_FLAG_FOOTER: u8 = 0x10;

const PICTURE_TYPE_FRONT_COVER: u8 = 3;
const LANGUAGE: &[u8; 3] = b"eng";

/// Frame ID carrying each text-like field
fn frame_id(field: TagField) -> &'static [u8; 4] {
    match field {
        TagField::Track => b"TRCK",
        TagField::Artist => b"TPE1",
        TagField::Title => b"TIT2",
        TagField::Album => b"TALB",
        TagField::Year => b"TDRC",
        TagField::Genre => b"TCON",
        TagField::Comment => b"COMM",
        TagField::Lyrics => b"USLT",
        TagField::Composer => b"TCOM",
        TagField::Publisher => b"TPUB",
        TagField::OriginalArtist => b"TOPE",
        TagField::AlbumArtist => b"TPE2",
        TagField::Copyright => b"TCOP",
        TagField::Url => b"WXXX",
        TagField::Encoder => b"TENC",
    }
}

fn field_for_frame(id: &[u8; 4]) -> Option<TagField> {
    TagField::ALL
        .into_iter()
        .find(|field| frame_id(*field) == id)
}

struct Header {
    major: u8,
    flags: u8,
    /// Size of everything between header and footer
    size: usize,
}

impl Header {
    fn parse(bytes: &[u8]) -> Result<Option<Header>, CodecError> {
        if bytes.len() < 3 || &bytes[..3] != b"ID3" {
            return Ok(None);
        }
        if bytes.len() < HEADER_LEN {
            return Err(CodecError::malformed("truncated tag header"));
        }
        let major = bytes[3];
        if major == 0xFF || bytes[4] == 0xFF {
            return Err(CodecError::malformed("invalid tag version"));
        }
        let size = read_syncsafe(&bytes[6..10])?;
        Ok(Some(Header {
            major,
            flags: bytes[5],
            size,
        }))
    }

    fn total_len(&self) -> usize {
        let footer = if self.major >= 4 && self.flags & TAG_FLAG_FOOTER != 0 {
            HEADER_LEN
        } else {
            0
        };
        HEADER_LEN + self.size + footer
    }
}

/// Separates a leading ID3v2 tag block from the audio payload.
///
/// Returns the length of the tag block, if there is one, and the bytes
/// that follow it.
pub fn split_payload(bytes: &[u8]) -> Result<(Option<usize>, &[u8]), CodecError> {
    match Header::parse(bytes)? {
        None => Ok((None, bytes)),
        Some(header) => {
            let len = header.total_len();
            if len > bytes.len() {
                return Err(CodecError::malformed(format!(
                    "tag size {len} exceeds file length {}",
                    bytes.len()
                )));
            }
            Ok((Some(len), &bytes[len..]))
        }
    }
}

/// Decodes the tag at the start of `bytes`, `None` if there is none.
pub fn decode(bytes: &[u8]) -> Result<Option<Tag>, CodecError> {
    let Some(header) = Header::parse(bytes)? else {
        return Ok(None);
    };
    if header.major != 4 {
        return Err(CodecError::UnsupportedVersion(header.major));
    }
    let known_flags =
        TAG_FLAG_UNSYNC | TAG_FLAG_EXTENDED | TAG_FLAG_EXPERIMENTAL | TAG_FLAG_FOOTER;
    if header.flags & !known_flags != 0 {
        return Err(CodecError::malformed(format!(
            "unknown tag flags {:#04x}",
            header.flags
        )));
    }

    let body = bytes
        .get(HEADER_LEN..HEADER_LEN + header.size)
        .ok_or_else(|| CodecError::malformed("tag size exceeds file length"))?;
    let tag_unsync = header.flags & TAG_FLAG_UNSYNC != 0;

    let mut pos = 0;
    if header.flags & TAG_FLAG_EXTENDED != 0 {
        let ext_len = body
            .get(..4)
            .ok_or_else(|| CodecError::malformed("truncated extended header"))
            .and_then(read_syncsafe)?;
        if ext_len < 6 || ext_len > body.len() {
            return Err(CodecError::malformed("invalid extended header size"));
        }
        pos = ext_len;
    }

    let mut tag = Tag::new();
    let mut seen: Vec<TagField> = Vec::new();
    let mut image_seen = false;

    while pos + FRAME_HEADER_LEN <= body.len() {
        if body[pos] == 0 {
            // padding
            break;
        }
        let id: [u8; 4] = [body[pos], body[pos + 1], body[pos + 2], body[pos + 3]];
        if !is_valid_frame_id(&id) {
            return Err(CodecError::malformed(format!(
                "invalid frame id {:?}",
                String::from_utf8_lossy(&id)
            )));
        }
        let size = read_syncsafe(&body[pos + 4..pos + 8])?;
        let flags = [body[pos + 8], body[pos + 9]];
        pos += FRAME_HEADER_LEN;

        let id_str = String::from_utf8_lossy(&id).into_owned();
        let frame_body = body.get(pos..pos + size).ok_or_else(|| {
            CodecError::malformed(format!("frame {id_str} length {size} exceeds tag"))
        })?;
        pos += size;

        let consumed = if &id == b"APIC" && !image_seen {
            let content = frame_content(&id_str, flags[1], tag_unsync, frame_body)?;
            let image = decode_picture(&content)?;
            image_seen = true;
            tag.set_album_image(image);
            true
        } else if let Some(field) = field_for_frame(&id).filter(|f| !seen.contains(f)) {
            let content = frame_content(&id_str, flags[1], tag_unsync, frame_body)?;
            let applied = apply_frame(&mut tag, field, &id_str, &content)?;
            if applied {
                seen.push(field);
            }
            applied
        } else {
            false
        };

        if !consumed {
            let mut flags = flags;
            if tag_unsync {
                // the body stays unsynchronised, so the frame must say so
                flags[1] |= FLAG_UNSYNC;
            }
            tag.push_opaque(OpaqueFrame {
                id,
                flags,
                body: frame_body.to_vec(),
            });
        }
    }

    Ok(Some(tag))
}

/// Stores a known frame's content in `tag`. Returns `false` when the
/// content does not fit the model, in which case the caller keeps the
/// frame verbatim.
fn apply_frame(
    tag: &mut Tag,
    field: TagField,
    id: &str,
    content: &[u8],
) -> Result<bool, CodecError> {
    match field {
        TagField::Comment | TagField::Lyrics => {
            let (&encoding, rest) = content
                .split_first()
                .ok_or_else(|| CodecError::malformed(format!("frame {id} is empty")))?;
            let rest = rest
                .get(3..)
                .ok_or_else(|| CodecError::malformed(format!("frame {id} is truncated")))?;
            let (description, text) = split_terminated(encoding, rest);
            let description = decode_text(encoding, description)?;
            let text = decode_text(encoding, text)?;
            let text = text.trim_end_matches('\0');
            if !description.is_empty() {
                return Ok(false);
            }
            Ok(tag.set(field, text).is_ok())
        }
        TagField::Url => {
            let (&encoding, rest) = content
                .split_first()
                .ok_or_else(|| CodecError::malformed(format!("frame {id} is empty")))?;
            let (description, url) = split_terminated(encoding, rest);
            let description = decode_text(encoding, description)?;
            if !description.is_empty() {
                return Ok(false);
            }
            let (url, _) = split_terminated(ENCODING_LATIN1, url);
            Ok(tag.set(field, &decode_latin1(url)).is_ok())
        }
        TagField::Track => {
            let text = decode_text_frame(id, content)?;
            let number = text.split('/').next().unwrap_or_default();
            Ok(tag.set(field, number).is_ok())
        }
        TagField::Year => {
            let text = decode_text_frame(id, content)?;
            let year = text.get(..4).unwrap_or_default();
            Ok(tag.set(field, year).is_ok())
        }
        TagField::Genre => {
            let text = decode_text_frame(id, content)?;
            match parse_genre(&text) {
                Some(code) => {
                    tag.set_genre(code);
                    Ok(true)
                }
                None => Ok(false),
            }
        }
        text_field => {
            let text = decode_text_frame(id, content)?;
            Ok(tag.set(text_field, &text).is_ok())
        }
    }
}

/// Accepts `(17)Rock`, `(17)`, `17` and `Rock`
fn parse_genre(text: &str) -> Option<u32> {
    let text = text.trim();
    if let Some(rest) = text.strip_prefix('(') {
        let (code, _) = rest.split_once(')')?;
        return code.parse().ok();
    }
    text.parse().ok().or_else(|| genre::code_for(text))
}

fn decode_picture(content: &[u8]) -> Result<AlbumImage, CodecError> {
    let (&encoding, rest) = content
        .split_first()
        .ok_or_else(|| CodecError::malformed("frame APIC is empty"))?;
    // validate the marker before relying on it for the description
    decode_text(encoding, &[])?;
    let (mime, rest) = split_terminated(ENCODING_LATIN1, rest);
    let (_picture_type, rest) = rest
        .split_first()
        .ok_or_else(|| CodecError::malformed("frame APIC is truncated"))?;
    let (_description, data) = split_terminated(encoding, rest);
    Ok(AlbumImage {
        data: data.to_vec(),
        mime_type: decode_latin1(mime),
    })
}

fn text_body(text: &str) -> Vec<u8> {
    let mut body = Vec::with_capacity(text.len() + 1);
    body.push(ENCODING_UTF8);
    body.extend_from_slice(text.as_bytes());
    body
}

fn field_body(tag: &Tag, field: TagField) -> Option<Vec<u8>> {
    match field {
        TagField::Genre => {
            let code = tag.genre()?;
            let description = tag.genre_description()?;
            Some(text_body(&format!("({code}){description}")))
        }
        TagField::Comment | TagField::Lyrics => {
            let text = tag.text(field)?;
            let mut body = vec![ENCODING_UTF8];
            body.extend_from_slice(LANGUAGE);
            body.push(0);
            body.extend_from_slice(text.as_bytes());
            Some(body)
        }
        TagField::Url => {
            let url = tag.text(field)?;
            let mut body = vec![ENCODING_UTF8, 0];
            body.extend(encode_latin1(url));
            Some(body)
        }
        other => tag.get(other).map(|value| text_body(&value)),
    }
}

fn picture_body(image: &AlbumImage) -> Vec<u8> {
    let mut body = Vec::with_capacity(image.data.len() + image.mime_type.len() + 4);
    body.push(ENCODING_UTF8);
    body.extend(encode_latin1(&image.mime_type));
    body.push(0);
    body.push(PICTURE_TYPE_FRONT_COVER);
    body.push(0);
    body.extend_from_slice(&image.data);
    body
}

/// Encodes `tag` as a complete ID3v2.4 block, header included.
///
/// Unset fields produce no frame, and a tag with nothing set encodes to
/// an empty block.
pub fn encode(tag: &Tag) -> Result<Vec<u8>, CodecError> {
    let mut frames = Vec::new();

    for field in TagField::ALL {
        if let Some(body) = field_body(tag, field) {
            write_frame(&mut frames, frame_id(field), [0, 0], &body)?;
        }
    }
    if let Some(image) = tag.album_image() {
        write_frame(&mut frames, b"APIC", [0, 0], &picture_body(image))?;
    }
    for opaque in tag.opaque_frames() {
        write_frame(&mut frames, &opaque.id, opaque.flags, &opaque.body)?;
    }

    if frames.is_empty() {
        return Ok(frames);
    }

    let size = write_syncsafe(frames.len()).ok_or_else(|| CodecError::TooLarge {
        id: "ID3".to_string(),
        len: frames.len(),
    })?;
    let mut out = Vec::with_capacity(HEADER_LEN + frames.len());
    out.extend_from_slice(b"ID3");
    out.extend_from_slice(&[4, 0, 0]);
    out.extend_from_slice(&size);
    out.extend_from_slice(&frames);
    Ok(out)
}
