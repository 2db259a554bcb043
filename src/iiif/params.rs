//! IIIF Image API 3.0 request parsing.
//!
//! This module turns a URL path of the form
//! `<identifier>/<region>/<size>/<rotation>/<quality>.<format>` (or
//! `<identifier>/info.json`) into a typed request value.
//!
//! # Parsing contract
//!
//! 1. The path is canonicalised lexically (empty, `.` and `..` segments
//!    collapse). If the canonical form differs from the input the request is
//!    rejected with `InvalidPath`.
//! 2. The canonical path is percent-decoded exactly once; malformed escapes
//!    or invalid UTF-8 reject with `InvalidEncoding`.
//! 3. A `/info.json` suffix selects an info request; anything else must match
//!    the image grammar below or is rejected with `InvalidRequest`.
//!
//! ```text
//! region   = full | square | N,N,N,N | pct:F,F,F,F
//! size     = full | max | N, | ,N | N,N | !N,N | ^N,N | pct:F
//! rotation = !?N
//! quality  = default | color | gray | bitonal
//! format   = jpg | png | webp | gif | tif
//! ```
//!
//! Parsing is purely lexical: the rotation angle accepts any integer here and
//! is range-checked by the pipeline, as are region bounds and size limits.

use std::fmt;
use std::str::FromStr;

use crate::error::IiifError;

// =============================================================================
// Request Types
// =============================================================================

/// The rectangular subset of the source image to return.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionSpec {
    /// The whole image
    Full,
    /// Centred square of side `min(W, H)`
    Square,
    /// Explicit pixel rectangle
    Absolute { x: u32, y: u32, w: u32, h: u32 },
    /// Rectangle expressed as percentages of the source dimensions
    Percent { x: f64, y: f64, w: f64, h: f64 },
}

/// The target pixel dimensions of the returned image.
#[derive(Debug, Clone, PartialEq)]
pub enum SizeSpec {
    /// Post-region dimensions, rejected if over the pixel budget
    Full,
    /// Post-region dimensions, scaled down to the pixel budget if needed
    Max,
    /// Uniform percentage scale
    Percent(f64),
    /// Target width, height follows the aspect ratio (`N,`)
    WidthOnly(u32),
    /// Target height, width follows the aspect ratio (`,N`)
    HeightOnly(u32),
    /// Exact dimensions, may distort (`N,N`)
    Exact { w: u32, h: u32 },
    /// Best fit inside the box, aspect preserved (`!N,N`)
    Confined { w: u32, h: u32 },
    /// Smallest cover of the box, aspect preserved (`^N,N`)
    Distorted { w: u32, h: u32 },
}

/// Rotation with an optional horizontal mirror applied first.
///
/// The angle is lexical at this point; only 0/90/180/270 survive the
/// pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationSpec {
    pub mirror: bool,
    pub angle: u32,
}

/// Output colour treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Default,
    Color,
    Gray,
    Bitonal,
}

/// Output encoding format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Jpg,
    Png,
    Webp,
    Gif,
    Tif,
}

/// A fully parsed image request.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest {
    pub identifier: String,
    pub region: RegionSpec,
    pub size: SizeSpec,
    pub rotation: RotationSpec,
    pub quality: Quality,
    pub format: Format,
}

/// A parsed IIIF path: either an info descriptor or an image derivation.
#[derive(Debug, Clone, PartialEq)]
pub enum IiifRequest {
    Info { identifier: String },
    Image(ImageRequest),
}

// =============================================================================
// Path Entry Point
// =============================================================================

/// Parse the path portion after the `/iiif/<version>/` prefix.
///
/// The input is the raw (still percent-encoded) path without a leading
/// slash.
pub fn parse_path(raw: &str) -> Result<IiifRequest, IiifError> {
    let canonical = clean_path(raw);
    if canonical != raw {
        return Err(IiifError::InvalidPath);
    }

    let decoded = decode_path(&canonical)?;

    if let Some(identifier) = decoded.strip_suffix("/info.json") {
        if identifier.is_empty() {
            return Err(IiifError::InvalidRequest(
                "info request is missing an identifier".to_string(),
            ));
        }
        return Ok(IiifRequest::Info {
            identifier: identifier.to_string(),
        });
    }
    if decoded == "info.json" {
        return Err(IiifError::InvalidRequest(
            "info request is missing an identifier".to_string(),
        ));
    }

    Ok(IiifRequest::Image(decoded.parse()?))
}

/// Lexically canonicalise a path: drop empty and `.` segments, resolve `..`
/// against the accumulated prefix. Rooted semantics, so `..` at the top is
/// dropped rather than kept.
fn clean_path(path: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            s => stack.push(s),
        }
    }
    stack.join("/")
}

/// Percent-decode the path once.
///
/// Escapes must be well-formed (`%` followed by two hex digits) and the
/// result must be valid UTF-8.
fn decode_path(path: &str) -> Result<String, IiifError> {
    let bytes = path.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if i + 2 >= bytes.len()
                || !bytes[i + 1].is_ascii_hexdigit()
                || !bytes[i + 2].is_ascii_hexdigit()
            {
                return Err(IiifError::InvalidEncoding);
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    urlencoding::decode(path)
        .map(|s| s.into_owned())
        .map_err(|_| IiifError::InvalidEncoding)
}

// =============================================================================
// Component Parsers
// =============================================================================

impl FromStr for ImageRequest {
    type Err = IiifError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        // The identifier is greedy: everything up to the last four
        // slash-delimited components.
        let mut rev = path.rsplitn(5, '/');
        let tail = rev.next().unwrap_or("");
        let rotation = rev.next();
        let size = rev.next();
        let region = rev.next();
        let identifier = rev.next();

        let (Some(rotation), Some(size), Some(region), Some(identifier)) =
            (rotation, size, region, identifier)
        else {
            return Err(invalid(path));
        };
        if identifier.is_empty() {
            return Err(invalid(path));
        }

        let (quality, format) = tail.rsplit_once('.').ok_or_else(|| invalid(path))?;

        Ok(ImageRequest {
            identifier: identifier.to_string(),
            region: region.parse()?,
            size: size.parse()?,
            rotation: rotation.parse()?,
            quality: quality.parse()?,
            format: format.parse()?,
        })
    }
}

impl FromStr for RegionSpec {
    type Err = IiifError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(RegionSpec::Full),
            "square" => Ok(RegionSpec::Square),
            _ => {
                if let Some(rest) = s.strip_prefix("pct:") {
                    let v = parse_decimal_list(rest, 4)
                        .ok_or_else(|| invalid_component("region", s))?;
                    Ok(RegionSpec::Percent {
                        x: v[0],
                        y: v[1],
                        w: v[2],
                        h: v[3],
                    })
                } else {
                    let v =
                        parse_integer_list(s, 4).ok_or_else(|| invalid_component("region", s))?;
                    Ok(RegionSpec::Absolute {
                        x: v[0],
                        y: v[1],
                        w: v[2],
                        h: v[3],
                    })
                }
            }
        }
    }
}

impl FromStr for SizeSpec {
    type Err = IiifError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || invalid_component("size", s);

        match s {
            "full" => return Ok(SizeSpec::Full),
            "max" => return Ok(SizeSpec::Max),
            _ => {}
        }

        if let Some(rest) = s.strip_prefix("pct:") {
            return parse_decimal(rest).map(SizeSpec::Percent).ok_or_else(err);
        }
        if let Some(rest) = s.strip_prefix('!') {
            let v = parse_integer_list(rest, 2).ok_or_else(err)?;
            return Ok(SizeSpec::Confined { w: v[0], h: v[1] });
        }
        if let Some(rest) = s.strip_prefix('^') {
            let v = parse_integer_list(rest, 2).ok_or_else(err)?;
            return Ok(SizeSpec::Distorted { w: v[0], h: v[1] });
        }
        if let Some(rest) = s.strip_suffix(',') {
            return parse_integer(rest).map(SizeSpec::WidthOnly).ok_or_else(err);
        }
        if let Some(rest) = s.strip_prefix(',') {
            return parse_integer(rest).map(SizeSpec::HeightOnly).ok_or_else(err);
        }
        if s.contains(',') {
            let v = parse_integer_list(s, 2).ok_or_else(err)?;
            return Ok(SizeSpec::Exact { w: v[0], h: v[1] });
        }

        Err(err())
    }
}

impl FromStr for RotationSpec {
    type Err = IiifError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (mirror, digits) = match s.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let angle = parse_integer(digits).ok_or_else(|| invalid_component("rotation", s))?;
        Ok(RotationSpec { mirror, angle })
    }
}

impl FromStr for Quality {
    type Err = IiifError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Quality::Default),
            "color" => Ok(Quality::Color),
            "gray" => Ok(Quality::Gray),
            "bitonal" => Ok(Quality::Bitonal),
            _ => Err(IiifError::InvalidRequest(format!(
                "unsupported quality \"{}\": supported are default, color, gray, bitonal",
                s
            ))),
        }
    }
}

impl FromStr for Format {
    type Err = IiifError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jpg" => Ok(Format::Jpg),
            "png" => Ok(Format::Png),
            "webp" => Ok(Format::Webp),
            "gif" => Ok(Format::Gif),
            "tif" => Ok(Format::Tif),
            _ => Err(IiifError::InvalidRequest(format!(
                "unsupported format \"{}\": supported are jpg, png, webp, gif, tif",
                s
            ))),
        }
    }
}

impl Format {
    /// File extension / IIIF path suffix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Jpg => "jpg",
            Format::Png => "png",
            Format::Webp => "webp",
            Format::Gif => "gif",
            Format::Tif => "tif",
        }
    }

    /// Content-Type served for this format.
    ///
    /// `jpg` is deliberately not canonicalised to `image/jpeg`; clients of
    /// the original service depend on the verbatim value.
    pub fn media_type(&self) -> &'static str {
        match self {
            Format::Jpg => "image/jpg",
            Format::Png => "image/png",
            Format::Webp => "image/webp",
            Format::Gif => "image/gif",
            Format::Tif => "image/tif",
        }
    }
}

impl Quality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Default => "default",
            Quality::Color => "color",
            Quality::Gray => "gray",
            Quality::Bitonal => "bitonal",
        }
    }
}

// =============================================================================
// Lexical Helpers
// =============================================================================

fn invalid(path: &str) -> IiifError {
    IiifError::InvalidRequest(format!("path \"{}\" does not match the IIIF grammar", path))
}

fn invalid_component(kind: &str, value: &str) -> IiifError {
    IiifError::InvalidRequest(format!("invalid {} \"{}\"", kind, value))
}

/// Non-negative integer made of ASCII digits only.
fn parse_integer(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Non-negative decimal number: digits with at most one dot.
fn parse_decimal(s: &str) -> Option<f64> {
    if s.is_empty() {
        return None;
    }
    let mut dots = 0;
    for b in s.bytes() {
        match b {
            b'0'..=b'9' => {}
            b'.' => {
                dots += 1;
                if dots > 1 {
                    return None;
                }
            }
            _ => return None,
        }
    }
    s.parse().ok()
}

fn parse_integer_list(s: &str, expected: usize) -> Option<Vec<u32>> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != expected {
        return None;
    }
    parts.iter().map(|p| parse_integer(p)).collect()
}

fn parse_decimal_list(s: &str, expected: usize) -> Option<Vec<f64>> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != expected {
        return None;
    }
    parts.iter().map(|p| parse_decimal(p)).collect()
}

// =============================================================================
// Stringification
// =============================================================================
//
// `Display` produces the canonical path form, so for every syntactically
// legal request `parse(stringify(req)) == req`.

impl fmt::Display for RegionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionSpec::Full => write!(f, "full"),
            RegionSpec::Square => write!(f, "square"),
            RegionSpec::Absolute { x, y, w, h } => write!(f, "{},{},{},{}", x, y, w, h),
            RegionSpec::Percent { x, y, w, h } => write!(f, "pct:{},{},{},{}", x, y, w, h),
        }
    }
}

impl fmt::Display for SizeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeSpec::Full => write!(f, "full"),
            SizeSpec::Max => write!(f, "max"),
            SizeSpec::Percent(p) => write!(f, "pct:{}", p),
            SizeSpec::WidthOnly(w) => write!(f, "{},", w),
            SizeSpec::HeightOnly(h) => write!(f, ",{}", h),
            SizeSpec::Exact { w, h } => write!(f, "{},{}", w, h),
            SizeSpec::Confined { w, h } => write!(f, "!{},{}", w, h),
            SizeSpec::Distorted { w, h } => write!(f, "^{},{}", w, h),
        }
    }
}

impl fmt::Display for RotationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mirror {
            write!(f, "!{}", self.angle)
        } else {
            write!(f, "{}", self.angle)
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for ImageRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}.{}",
            self.identifier, self.region, self.size, self.rotation, self.quality, self.format
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
