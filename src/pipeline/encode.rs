//! Decoding and format-dispatched encoding.
//!
//! The decoder sniffs the container format from the payload; the encoder
//! dispatches on the requested IIIF format. JPEG output is fixed at quality
//! 85, the remaining formats use their encoder defaults.

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, ImageReader};

use crate::error::IiifError;
use crate::iiif::params::Format;

/// JPEG output quality.
pub const JPEG_QUALITY: u8 = 85;

/// Decode source bytes into the request's image handle.
pub fn decode(source: &[u8]) -> Result<DynamicImage, IiifError> {
    image::load_from_memory(source)
        .map_err(|e| IiifError::Internal(format!("failed to decode source image: {}", e)))
}

/// Read image dimensions without decoding the pixel data.
///
/// Used by the info path, which only needs `(width, height)`.
pub fn dimensions(source: &[u8]) -> Result<(u32, u32), IiifError> {
    ImageReader::new(Cursor::new(source))
        .with_guessed_format()
        .map_err(|e| IiifError::Internal(format!("failed to sniff image format: {}", e)))?
        .into_dimensions()
        .map_err(|e| IiifError::Internal(format!("failed to read image dimensions: {}", e)))
}

/// Encode the image in the requested output format.
pub fn encode(img: &DynamicImage, format: Format) -> Result<Bytes, IiifError> {
    let mut buf = Vec::new();

    let result = match format {
        Format::Jpg => {
            let mut encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
            encoder.encode_image(img)
        }
        Format::Png => img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png),
        Format::Tif => img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Tiff),
        Format::Webp | Format::Gif => {
            // These encoders only take RGB(A) input; luminance output from
            // the quality stage is widened first.
            let target = if format == Format::Webp {
                ImageFormat::WebP
            } else {
                ImageFormat::Gif
            };
            match img {
                DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => {
                    img.write_to(&mut Cursor::new(&mut buf), target)
                }
                _ => DynamicImage::ImageRgb8(img.to_rgb8())
                    .write_to(&mut Cursor::new(&mut buf), target),
            }
        }
    };

    result.map_err(|e| {
        IiifError::Internal(format!("failed to encode {} output: {}", format.as_str(), e))
    })?;

    Ok(Bytes::from(buf))
}
