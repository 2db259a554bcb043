//! IIIF Image API 3.0 request model.
//!
//! This module owns the protocol surface of the server: the typed request
//! grammar (`params`) and the `info.json` descriptor (`info`). It is purely
//! lexical; pixel semantics live in the [`crate::pipeline`] module.

pub mod info;
pub mod params;

pub use info::{ImageInfo, SizeEntry, TileEntry};
pub use params::{
    parse_path, Format, IiifRequest, ImageRequest, Quality, RegionSpec, RotationSpec, SizeSpec,
};
