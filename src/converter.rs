//! Abstract converter trait for Shapefile models.
//!
//! This module defines the `Converter` trait that turns a `ShapefileData`
//! model into an output representation. The container writer and the
//! compact compressor both implement it.

use crate::error::ShpzResult;
use crate::types::ShapefileData;

/// A trait for converting Shapefile models to other formats.
///
/// # Type Parameter
///
/// * `Output` - The type of the conversion output (e.g., `Vec<u8>` for
///   binary formats).
///
/// # Example
///
/// ```ignore
/// use shpz::{Converter, Compressor, ShapefileWriter};
///
/// let compact = Compressor::new().convert(&model)?;
/// let container = ShapefileWriter::new().convert(&model)?;
/// ```
pub trait Converter {
    /// The output type of the conversion.
    type Output;

    /// Converts the given model to the output format.
    ///
    /// # Arguments
    ///
    /// * `data` - The Shapefile model to convert.
    ///
    /// # Returns
    ///
    /// Returns the converted output on success, or an error if conversion fails.
    fn convert(&self, data: &ShapefileData) -> ShpzResult<Self::Output>;
}
