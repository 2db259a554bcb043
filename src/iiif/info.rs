//! IIIF `info.json` descriptor builder.
//!
//! Produces the Image API 3.0 information document for a source image. The
//! document is built from the image dimensions alone; tiles, profile and
//! feature lists are fixed by the server's compliance level.

use serde::Serialize;

/// JSON-LD context for the Image API 3.0.
pub const CONTEXT: &str = "http://iiif.io/api/image/3/context.json";

/// Protocol identifier carried in every descriptor.
pub const PROTOCOL: &str = "http://iiif.io/api/image";

/// The `info.json` document.
#[derive(Debug, Serialize)]
pub struct ImageInfo {
    #[serde(rename = "@context")]
    pub context: &'static str,

    /// Fully qualified URL of the image endpoint
    pub id: String,

    #[serde(rename = "type")]
    pub kind: &'static str,

    pub protocol: &'static str,

    /// Width of the source image in pixels
    pub width: u32,

    /// Height of the source image in pixels
    pub height: u32,

    /// Preferred derivative sizes (full, half, quarter)
    pub sizes: Vec<SizeEntry>,

    /// Tiling hint for deep-zoom clients
    pub tiles: Vec<TileEntry>,

    /// Compliance level, in both the bare and the `profiles/` form
    pub profile: Vec<&'static str>,

    #[serde(rename = "extraFormats")]
    pub extra_formats: Vec<&'static str>,

    #[serde(rename = "extraQualities")]
    pub extra_qualities: Vec<&'static str>,

    #[serde(rename = "extraFeatures")]
    pub extra_features: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct SizeEntry {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Serialize)]
pub struct TileEntry {
    pub width: u32,

    #[serde(rename = "scaleFactors")]
    pub scale_factors: Vec<u32>,
}

impl ImageInfo {
    /// Build the descriptor for an image of the given dimensions.
    ///
    /// `base_url` is the advertised server origin (`scheme://host:port`),
    /// `version` the configured URL-prefix label.
    pub fn new(base_url: &str, version: &str, identifier: &str, width: u32, height: u32) -> Self {
        ImageInfo {
            context: CONTEXT,
            id: format!(
                "{}/iiif/{}/{}",
                base_url,
                version,
                identifier.trim_matches('/')
            ),
            kind: "sc:Manifest",
            protocol: PROTOCOL,
            width,
            height,
            sizes: vec![
                SizeEntry { width, height },
                SizeEntry {
                    width: width / 2,
                    height: height / 2,
                },
                SizeEntry {
                    width: width / 4,
                    height: height / 4,
                },
            ],
            tiles: vec![TileEntry {
                width: 512,
                scale_factors: vec![1, 2, 4, 8],
            }],
            profile: vec![
                "http://iiif.io/api/image/3/level2.json",
                "http://iiif.io/api/image/3/profiles/level2.json",
            ],
            extra_formats: vec!["jpg", "png", "webp", "gif"],
            extra_qualities: vec!["default", "color", "gray", "bitonal"],
            extra_features: vec![
                "regionByPct",
                "regionSquare",
                "sizeByWhListed",
                "sizeByPct",
                "sizeByW",
                "sizeByH",
                "sizeByConfinedWh",
                "sizeByDistortedWh",
                "rotationBy90s",
            ],
        }
    }
}
