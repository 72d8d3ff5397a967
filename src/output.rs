//! Image decoding, PNG encoding and base64 transport helpers

use base64::Engine;
use image::imageops::FilterType;
use image::{DynamicImage, ImageEncoder, ImageFormat, RgbaImage};
use std::io::{self, Cursor};
use std::path::Path;

/// Prefix accepted (and stripped) in front of base64 image payloads.
const DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Error type for decoding image payloads
#[derive(Debug)]
pub enum DecodeError {
    /// Payload was not valid base64
    Base64(base64::DecodeError),
    /// Bytes could not be decoded as an image
    Image(image::ImageError),
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Base64(e) => write!(f, "Base64 error: {}", e),
            DecodeError::Image(e) => write!(f, "Image decode error: {}", e),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::Base64(e) => Some(e),
            DecodeError::Image(e) => Some(e),
        }
    }
}

impl From<base64::DecodeError> for DecodeError {
    fn from(e: base64::DecodeError) -> Self {
        DecodeError::Base64(e)
    }
}

impl From<image::ImageError> for DecodeError {
    fn from(e: image::ImageError) -> Self {
        DecodeError::Image(e)
    }
}

/// Decode raw image bytes into RGBA, reporting the detected container format.
///
/// The format is `None` when the container could not be sniffed but the
/// decoder still succeeded.
pub fn decode_image(bytes: &[u8]) -> Result<(RgbaImage, Option<ImageFormat>), DecodeError> {
    let format = image::guess_format(bytes).ok();
    let image = image::load_from_memory(bytes)?;
    Ok((image.to_rgba8(), format))
}

/// Encode an RGBA image as PNG bytes.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut png_bytes = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
    encoder.write_image(image.as_raw(), image.width(), image.height(), image::ColorType::Rgba8)?;
    Ok(png_bytes)
}

/// Encode an image in the given container format, falling back to PNG when
/// the format has no encoder for RGBA data.
pub fn encode_as(image: &RgbaImage, format: Option<ImageFormat>) -> Result<Vec<u8>, image::ImageError> {
    match format {
        Some(ImageFormat::Png) | None => encode_png(image),
        Some(format) => {
            let mut bytes = Vec::new();
            let dynamic = DynamicImage::ImageRgba8(image.clone());
            match dynamic.write_to(&mut Cursor::new(&mut bytes), format) {
                Ok(()) => Ok(bytes),
                Err(e) => {
                    tracing::warn!("Cannot re-encode tile as {:?} ({}), using PNG", format, e);
                    encode_png(image)
                }
            }
        }
    }
}

/// Encode an image as a base64 PNG payload (no data URI prefix).
pub fn image_to_base64(image: &RgbaImage) -> Result<String, image::ImageError> {
    let png_bytes = encode_png(image)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(png_bytes))
}

/// Decode a base64 image payload. A leading `data:image/png;base64,` is tolerated.
pub fn image_from_base64(payload: &str) -> Result<RgbaImage, DecodeError> {
    let trimmed = payload.trim();
    let raw = trimmed.strip_prefix(DATA_URI_PREFIX).unwrap_or(trimmed);
    let bytes = base64::engine::general_purpose::STANDARD.decode(raw)?;
    let (image, _) = decode_image(&bytes)?;
    Ok(image)
}

/// Scale image by integer factor using nearest-neighbor interpolation.
///
/// Any other filter would smear the single-cell pixel encoding.
pub fn scale_image(image: &RgbaImage, factor: u32) -> RgbaImage {
    if factor <= 1 {
        return image.clone();
    }
    let (w, h) = image.dimensions();
    image::imageops::resize(image, w * factor, h * factor, FilterType::Nearest)
}

/// Write raw bytes to a file, creating parent directories if needed.
pub fn write_bytes(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_base64_roundtrip_preserves_pixels() {
        let mut img = RgbaImage::new(3, 3);
        img.put_pixel(1, 1, Rgba([10, 20, 30, 255]));

        let payload = image_to_base64(&img).unwrap();
        let decoded = image_from_base64(&payload).unwrap();

        assert_eq!(decoded.dimensions(), (3, 3));
        assert_eq!(*decoded.get_pixel(1, 1), Rgba([10, 20, 30, 255]));
        assert_eq!(decoded.get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn test_base64_accepts_data_uri_prefix() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 255]));
        let payload = format!("{}{}", DATA_URI_PREFIX, image_to_base64(&img).unwrap());
        assert!(image_from_base64(&payload).is_ok());
    }

    #[test]
    fn test_invalid_base64_is_reported() {
        let err = image_from_base64("@@not base64@@").unwrap_err();
        assert!(matches!(err, DecodeError::Base64(_)));
    }

    #[test]
    fn test_valid_base64_invalid_image() {
        let payload = base64::engine::general_purpose::STANDARD.encode(b"definitely not a png");
        let err = image_from_base64(&payload).unwrap_err();
        assert!(matches!(err, DecodeError::Image(_)));
    }

    #[test]
    fn test_decode_reports_png_format() {
        let img = RgbaImage::new(2, 2);
        let bytes = encode_png(&img).unwrap();
        let (_, format) = decode_image(&bytes).unwrap();
        assert_eq!(format, Some(ImageFormat::Png));
    }

    #[test]
    fn test_scale_image_nearest() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        let scaled = scale_image(&img, 3);
        assert_eq!(scaled.dimensions(), (6, 3));
        assert_eq!(*scaled.get_pixel(2, 2), Rgba([255, 0, 0, 255]));
        assert_eq!(scaled.get_pixel(3, 0)[3], 0);
    }
}
