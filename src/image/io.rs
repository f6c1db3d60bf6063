//! Decoding and persistence helpers built on the `image` crate.

use crate::util::{SlideMatchResult, SolveError};
use image::{ImageFormat, RgbImage};
use std::path::Path;

/// Decodes encoded bytes into an 8-bit, 3-channel image.
///
/// `locator` names the origin of the bytes for error reporting. Alpha is
/// dropped and images with a zero dimension are rejected.
pub fn decode_rgb(bytes: &[u8], locator: &str) -> SlideMatchResult<RgbImage> {
    let img = image::load_from_memory(bytes).map_err(|err| SolveError::Decode {
        locator: locator.to_owned(),
        reason: err.to_string(),
    })?;
    if img.width() == 0 || img.height() == 0 {
        return Err(SolveError::Decode {
            locator: locator.to_owned(),
            reason: format!("degenerate image {}x{}", img.width(), img.height()),
        });
    }
    Ok(img.to_rgb8())
}

/// Loads a raster file from disk as an 8-bit, 3-channel image.
pub fn load_rgb<P: AsRef<Path>>(path: P) -> SlideMatchResult<RgbImage> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|err| SolveError::NotFound {
        what: format!("{}: {err}", path.display()),
    })?;
    Ok(img.to_rgb8())
}

/// Writes an image as PNG regardless of the path's extension.
pub fn save_png<P: AsRef<Path>>(img: &RgbImage, path: P) -> SlideMatchResult<()> {
    let path = path.as_ref();
    img.save_with_format(path, ImageFormat::Png)
        .map_err(|err| SolveError::io(path, err))
}

/// Encodes an image as PNG into memory.
pub fn encode_png(img: &RgbImage) -> SlideMatchResult<Vec<u8>> {
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .map_err(|err| SolveError::Io {
            path: "<memory>".into(),
            reason: err.to_string(),
        })?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::{decode_rgb, encode_png};
    use crate::util::SolveError;
    use image::{Rgb, RgbImage};

    #[test]
    fn decode_round_trips_png_bytes() {
        let img = RgbImage::from_fn(7, 5, |x, y| Rgb([x as u8 * 30, y as u8 * 40, 9]));
        let bytes = encode_png(&img).unwrap();
        let decoded = decode_rgb(&bytes, "mem").unwrap();
        assert_eq!(decoded, img);
    }

    #[test]
    fn decode_reports_locator() {
        let err = decode_rgb(b"not an image", "http://host/bg.png").unwrap_err();
        match err {
            SolveError::Decode { locator, .. } => assert_eq!(locator, "http://host/bg.png"),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
