//! # SHPZ - Lossy compact encoding for ESRI Shapefile geometry
//!
//! A library for parsing and writing ESRI Shapefile containers and for
//! re-expressing their polygon/polyline geometry in a compact, bit-packed,
//! lossy format. Coordinates survive to roughly 0.09 degrees; Z and M
//! values are kept as 32-bit floats.
//!
//! ## Example
//!
//! ```rust,ignore
//! let data = std::fs::read("input.shp")?;
//! let model = shpz::parse(&data)?;
//! let compact = shpz::compress(&model)?;
//! let restored = shpz::decompress(&compact)?;
//! let container = shpz::encode(&restored)?;
//! ```

pub mod bitview;
pub mod bytestream;
pub mod codec;
pub mod compress;
pub mod converter;
pub mod decompress;
pub mod error;
pub mod parser;
pub mod types;
pub mod writer;

// Re-export main types for convenient access
pub use bitview::BitView;
pub use bytestream::ByteStream;
pub use compress::{compress, Compressor};
pub use converter::Converter;
pub use decompress::{decompress, Decompressor};
pub use error::{ShpzError, ShpzResult};
pub use parser::{parse, ShapefileParser};
pub use types::*;
pub use writer::{encode, ShapefileWriter};
