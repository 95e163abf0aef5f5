//! Low-level pieces of the ID3v2.4 layout: syncsafe integers, text
//! encodings and frame headers.

use super::error::CodecError;

pub const HEADER_LEN: usize = 10;
pub const FRAME_HEADER_LEN: usize = 10;

/// Largest value a 4-byte syncsafe integer can hold
pub const SYNCSAFE_MAX: usize = (1 << 28) - 1;

pub const ENCODING_LATIN1: u8 = 0;
pub const ENCODING_UTF16_BOM: u8 = 1;
pub const ENCODING_UTF16_BE: u8 = 2;
pub const ENCODING_UTF8: u8 = 3;

// frame format flags (second flag byte)
pub const FLAG_GROUPING: u8 = 0x40;
pub const FLAG_COMPRESSION: u8 = 0x08;
pub const FLAG_ENCRYPTION: u8 = 0x04;
pub const FLAG_UNSYNC: u8 = 0x02;
pub const FLAG_DATA_LENGTH: u8 = 0x01;

pub fn read_syncsafe(bytes: &[u8]) -> Result<usize, CodecError> {
    if bytes.len() != 4 || bytes.iter().any(|b| b & 0x80 != 0) {
        return Err(CodecError::malformed("invalid syncsafe integer"));
    }
    Ok(bytes
        .iter()
        .fold(0usize, |acc, b| (acc << 7) | usize::from(*b)))
}

pub fn write_syncsafe(value: usize) -> Option<[u8; 4]> {
    if value > SYNCSAFE_MAX {
        return None;
    }
    Some([
        ((value >> 21) & 0x7F) as u8,
        ((value >> 14) & 0x7F) as u8,
        ((value >> 7) & 0x7F) as u8,
        (value & 0x7F) as u8,
    ])
}

pub fn is_valid_frame_id(id: &[u8]) -> bool {
    id.len() == 4 && id.iter().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/// Reverses unsynchronisation: every `FF 00` pair becomes `FF`.
pub fn resynchronise(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut prev_ff = false;
    for &b in data {
        if prev_ff && b == 0x00 {
            prev_ff = false;
            continue;
        }
        out.push(b);
        prev_ff = b == 0xFF;
    }
    out
}

/// Frame content with grouping byte and data length indicator removed and
/// unsynchronisation reversed.
pub fn frame_content(
    id: &str,
    format_flags: u8,
    tag_unsync: bool,
    body: &[u8],
) -> Result<Vec<u8>, CodecError> {
    if format_flags & (FLAG_COMPRESSION | FLAG_ENCRYPTION) != 0 {
        return Err(CodecError::malformed(format!(
            "frame {id} is compressed or encrypted"
        )));
    }

    let mut skip = 0;
    if format_flags & FLAG_GROUPING != 0 {
        skip += 1;
    }
    if format_flags & FLAG_DATA_LENGTH != 0 {
        skip += 4;
    }
    let content = body
        .get(skip..)
        .ok_or_else(|| CodecError::malformed(format!("frame {id} is truncated")))?;

    if tag_unsync || format_flags & FLAG_UNSYNC != 0 {
        Ok(resynchronise(content))
    } else {
        Ok(content.to_vec())
    }
}

fn is_wide(encoding: u8) -> bool {
    encoding == ENCODING_UTF16_BOM || encoding == ENCODING_UTF16_BE
}

/// Splits `data` at the first string terminator of the given encoding.
/// Returns the string bytes and everything after the terminator.
pub fn split_terminated(encoding: u8, data: &[u8]) -> (&[u8], &[u8]) {
    if is_wide(encoding) {
        let mut i = 0;
        while i + 1 < data.len() {
            if data[i] == 0 && data[i + 1] == 0 {
                return (&data[..i], &data[i + 2..]);
            }
            i += 2;
        }
        (data, &[])
    } else {
        match data.iter().position(|b| *b == 0) {
            Some(i) => (&data[..i], &data[i + 1..]),
            None => (data, &[]),
        }
    }
}

pub fn decode_text(encoding: u8, data: &[u8]) -> Result<String, CodecError> {
    match encoding {
        ENCODING_LATIN1 => Ok(decode_latin1(data)),
        ENCODING_UTF16_BOM => match data {
            [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes),
            [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes),
            [] => Ok(String::new()),
            _ => decode_utf16(data, u16::from_le_bytes),
        },
        ENCODING_UTF16_BE => decode_utf16(data, u16::from_be_bytes),
        ENCODING_UTF8 => String::from_utf8(data.to_vec())
            .map_err(|_| CodecError::malformed("invalid UTF-8 text")),
        other => Err(CodecError::malformed(format!(
            "unsupported text encoding marker {other}"
        ))),
    }
}

pub fn decode_latin1(data: &[u8]) -> String {
    data.iter().map(|b| char::from(*b)).collect()
}

fn decode_utf16(data: &[u8], unit: fn([u8; 2]) -> u16) -> Result<String, CodecError> {
    if data.len() % 2 != 0 {
        return Err(CodecError::malformed("odd-length UTF-16 text"));
    }
    let units = data.chunks_exact(2).map(|c| unit([c[0], c[1]]));
    char::decode_utf16(units)
        .collect::<Result<String, _>>()
        .map_err(|_| CodecError::malformed("invalid UTF-16 text"))
}

/// ISO-8859-1 bytes of `s`; characters outside Latin-1 become `?`
pub fn encode_latin1(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

/// First value of a (possibly multi-valued) text frame body, where the
/// first byte is the encoding marker.
pub fn decode_text_frame(id: &str, content: &[u8]) -> Result<String, CodecError> {
    let (&encoding, text) = content
        .split_first()
        .ok_or_else(|| CodecError::malformed(format!("frame {id} is empty")))?;
    // validate the encoding even when the body holds no text
    decode_text(encoding, &[])?;
    let (first, _) = split_terminated(encoding, text);
    decode_text(encoding, first)
}

pub fn write_frame(
    out: &mut Vec<u8>,
    id: &[u8; 4],
    flags: [u8; 2],
    body: &[u8],
) -> Result<(), CodecError> {
    let size = write_syncsafe(body.len()).ok_or_else(|| CodecError::TooLarge {
        id: String::from_utf8_lossy(id).into_owned(),
        len: body.len(),
    })?;
    out.extend_from_slice(id);
    out.extend_from_slice(&size);
    out.extend_from_slice(&flags);
    out.extend_from_slice(body);
    Ok(())
}
