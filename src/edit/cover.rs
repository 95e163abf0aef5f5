use std::path::Path;

use crate::domain::tag::AlbumImage;

/// Reads a cover image and works out its MIME type
pub fn load_cover(path: &Path) -> std::io::Result<AlbumImage> {
    let data = std::fs::read(path)?;
    let mime_type = mime_for_image(path, &data);
    log::debug!(
        "loaded cover {} ({} bytes, {})",
        path.to_string_lossy(),
        data.len(),
        mime_type
    );
    Ok(AlbumImage { data, mime_type })
}

/// Sniffs the image signature, falling back to the file extension.
pub fn mime_for_image(path: &Path, data: &[u8]) -> String {
    let default = || mime_guess::from_path(path).first_or_octet_stream().to_string();
    mime_from_magic(data)
        .map(str::to_string)
        .unwrap_or_else(default)
}

fn mime_from_magic(data: &[u8]) -> Option<&'static str> {
    match data {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some("image/png"),
        [b'G', b'I', b'F', b'8', ..] => Some("image/gif"),
        [b'B', b'M', ..] => Some("image/bmp"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_wins_over_extension() {
        let png = b"\x89PNG\r\n\x1a\n....";
        assert_eq!(mime_for_image(Path::new("cover.jpg"), png), "image/png");
    }

    #[test]
    fn extension_is_used_for_unknown_content() {
        assert_eq!(mime_for_image(Path::new("cover.jpg"), b"???"), "image/jpeg");
        assert_eq!(mime_for_image(Path::new("cover.png"), b""), "image/png");
        assert_eq!(
            mime_for_image(Path::new("cover"), b"???"),
            "application/octet-stream"
        );
    }

    #[test]
    fn load_cover_reads_bytes() -> anyhow::Result<()> {
        let tmp = tempfile::TempDir::new()?;
        let path = tmp.path().join("a.jpg");
        std::fs::write(&path, b"\xFF\xD8\xFFjpeg")?;

        let image = load_cover(&path)?;
        assert_eq!(image.data, b"\xFF\xD8\xFFjpeg");
        assert_eq!(image.mime_type, "image/jpeg");
        Ok(())
    }
}
