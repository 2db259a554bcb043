//! Geometry and colour stages of the transformation pipeline.
//!
//! Each stage consumes and returns the request's single decoded image
//! handle. Stage order is fixed by [`crate::pipeline::process`]:
//! region, size, rotation, quality.

use image::imageops::FilterType;
use image::DynamicImage;

use crate::error::IiifError;
use crate::iiif::params::{Quality, RegionSpec, RotationSpec, SizeSpec};

// =============================================================================
// Region
// =============================================================================

/// Crop the image to the requested region.
///
/// Percentages resolve against the source dimensions with flooring; the
/// resolved rectangle must satisfy `0 <= x`, `0 <= y`, `w > 0`, `h > 0`,
/// `x + w <= W`, `y + h <= H`.
pub fn apply_region(img: DynamicImage, region: &RegionSpec) -> Result<DynamicImage, IiifError> {
    let width = img.width();
    let height = img.height();

    let (x, y, w, h): (i64, i64, i64, i64) = match region {
        RegionSpec::Full => return Ok(img),
        RegionSpec::Square => {
            let side = width.min(height) as i64;
            if width > height {
                (((width - height) / 2) as i64, 0, side, side)
            } else {
                (0, ((height - width) / 2) as i64, side, side)
            }
        }
        RegionSpec::Absolute { x, y, w, h } => (*x as i64, *y as i64, *w as i64, *h as i64),
        RegionSpec::Percent { x, y, w, h } => (
            (width as f64 * x / 100.0) as i64,
            (height as f64 * y / 100.0) as i64,
            (width as f64 * w / 100.0) as i64,
            (height as f64 * h / 100.0) as i64,
        ),
    };

    if x < 0 || y < 0 || w <= 0 || h <= 0 || x + w > width as i64 || y + h > height as i64 {
        return Err(IiifError::InvalidRegion {
            x,
            y,
            w,
            h,
            width,
            height,
        });
    }

    Ok(img.crop_imm(x as u32, y as u32, w as u32, h as u32))
}

// =============================================================================
// Size
// =============================================================================

/// Resize the image to the requested size.
///
/// All scale arithmetic truncates toward zero. Every spec except `Exact`
/// derives both axes from a single ratio, so the aspect ratio is preserved
/// within a pixel. The output pixel count must stay within `max_pixels`.
pub fn apply_size(
    img: DynamicImage,
    size: &SizeSpec,
    max_pixels: u64,
) -> Result<DynamicImage, IiifError> {
    let width = img.width() as u64;
    let height = img.height() as u64;

    let (new_width, new_height): (u64, u64) = match size {
        SizeSpec::Full => {
            if width * height > max_pixels {
                return Err(IiifError::SizeTooLarge {
                    width,
                    height,
                    max_pixels,
                });
            }
            return Ok(img);
        }
        SizeSpec::Max => {
            if width * height <= max_pixels {
                return Ok(img);
            }
            let scale = (max_pixels as f64 / (width * height) as f64).sqrt();
            (
                (width as f64 * scale) as u64,
                (height as f64 * scale) as u64,
            )
        }
        SizeSpec::Percent(p) => (
            (width as f64 * p / 100.0) as u64,
            (height as f64 * p / 100.0) as u64,
        ),
        SizeSpec::WidthOnly(w) => {
            let w = *w as u64;
            (w, (height as f64 * (w as f64 / width as f64)) as u64)
        }
        SizeSpec::HeightOnly(h) => {
            let h = *h as u64;
            ((width as f64 * (h as f64 / height as f64)) as u64, h)
        }
        SizeSpec::Exact { w, h } => (*w as u64, *h as u64),
        SizeSpec::Confined { w, h } => {
            let ratio = (*w as f64 / width as f64).min(*h as f64 / height as f64);
            (
                (width as f64 * ratio) as u64,
                (height as f64 * ratio) as u64,
            )
        }
        SizeSpec::Distorted { w, h } => {
            let ratio = (*w as f64 / width as f64).max(*h as f64 / height as f64);
            (
                (width as f64 * ratio) as u64,
                (height as f64 * ratio) as u64,
            )
        }
    };

    if new_width == 0 || new_height == 0 {
        return Err(IiifError::SizeInvalid(format!(
            "computed dimensions {}x{} from \"{}\"",
            new_width, new_height, size
        )));
    }
    if new_width * new_height > max_pixels {
        return Err(IiifError::SizeTooLarge {
            width: new_width,
            height: new_height,
            max_pixels,
        });
    }

    Ok(img.resize_exact(new_width as u32, new_height as u32, FilterType::Lanczos3))
}

// =============================================================================
// Rotation
// =============================================================================

/// Check that the rotation angle is one of the four supported values.
pub fn validate_rotation(rotation: &RotationSpec) -> Result<(), IiifError> {
    match rotation.angle {
        0 | 90 | 180 | 270 => Ok(()),
        angle => Err(IiifError::RotationUnsupported { angle }),
    }
}

/// Mirror horizontally (if requested), then rotate by the given quarter
/// turns.
pub fn apply_rotation(
    img: DynamicImage,
    rotation: &RotationSpec,
) -> Result<DynamicImage, IiifError> {
    validate_rotation(rotation)?;

    let img = if rotation.mirror { img.fliph() } else { img };

    Ok(match rotation.angle {
        90 => img.rotate90(),
        180 => img.rotate180(),
        270 => img.rotate270(),
        _ => img,
    })
}

// =============================================================================
// Quality
// =============================================================================

/// Apply the output colour treatment.
///
/// `bitonal` keeps the behaviour of the original service: a saturating
/// linear shift of the luminance channel by -128 rather than a true
/// threshold.
pub fn apply_quality(img: DynamicImage, quality: Quality) -> DynamicImage {
    match quality {
        Quality::Default | Quality::Color => img,
        Quality::Gray => DynamicImage::ImageLuma8(img.to_luma8()),
        Quality::Bitonal => {
            let mut luma = img.to_luma8();
            for pixel in luma.pixels_mut() {
                pixel.0[0] = pixel.0[0].saturating_sub(128);
            }
            DynamicImage::ImageLuma8(luma)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
