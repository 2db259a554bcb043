//! The IIIF transformation pipeline.
//!
//! A request's decoded image flows through a fixed stage order:
//!
//! ```text
//! decode -> region -> size -> rotation -> quality -> encode
//! ```
//!
//! Each stage owns the single image handle and hands it to the next; there
//! is exactly one decoded image alive per request. Stages fail independently
//! with the error kinds of [`crate::error::IiifError`].
//!
//! The rotation angle is validated up front, before any pixel work: a
//! request that is both oversized and unsupported in angle reports the
//! rotation error. This ordering is part of the server's documented
//! behaviour.

mod encode;
mod stages;

pub use encode::{decode, dimensions, encode, JPEG_QUALITY};
pub use stages::{apply_quality, apply_region, apply_rotation, apply_size, validate_rotation};

use bytes::Bytes;
use image::DynamicImage;

use crate::error::IiifError;
use crate::iiif::params::ImageRequest;

/// Run the pixel stages over an already-decoded image.
pub fn process(
    img: DynamicImage,
    request: &ImageRequest,
    max_pixels: u64,
) -> Result<DynamicImage, IiifError> {
    validate_rotation(&request.rotation)?;

    let img = apply_region(img, &request.region)?;
    let img = apply_size(img, &request.size, max_pixels)?;
    let img = apply_rotation(img, &request.rotation)?;
    Ok(apply_quality(img, request.quality))
}

/// Decode, transform and encode in one step.
///
/// This is the synchronous CPU-bound core of an image request; callers run
/// it on the blocking pool.
pub fn render(source: &[u8], request: &ImageRequest, max_pixels: u64) -> Result<Bytes, IiifError> {
    let img = decode(source)?;
    let img = process(img, request, max_pixels)?;
    encode(&img, request.format)
}
