//! Shapefile container writer.
//!
//! Serializes a [`ShapefileData`] model back into the ESRI container layout:
//! the fixed 100-byte header followed by one numbered record per shape.
//! Record numbers and lengths are recomputed from the shapes being written.

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use tracing::{debug, trace};

use crate::converter::Converter;
use crate::error::{ShpzError, ShpzResult};
use crate::types::*;

/// Converter that produces a Shapefile container from a model.
///
/// # Example
///
/// ```ignore
/// use shpz::{Converter, ShapefileWriter};
///
/// let bytes = ShapefileWriter::new().convert(&model)?;
/// std::fs::write("output.shp", bytes)?;
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ShapefileWriter;

impl ShapefileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Converter for ShapefileWriter {
    type Output = Vec<u8>;

    /// # Errors
    ///
    /// Returns `ShpzError::UnsupportedType` if a non-null record's shape type
    /// differs from the file's shape type, and `ShpzError::Format` if a
    /// shape's Z/M or part-type arrays do not match its point/part counts.
    fn convert(&self, data: &ShapefileData) -> ShpzResult<Self::Output> {
        for record in &data.records {
            let shape_type = record.shape.shape_type();
            if shape_type != ShapeType::Null && shape_type != data.shape_type {
                return Err(ShpzError::UnsupportedType(shape_type));
            }
        }

        let byte_length = HEADER_LEN
            + data
                .records
                .iter()
                .map(|r| RECORD_HEADER_LEN + r.shape.content_length_bytes())
                .sum::<usize>();
        debug!(
            "Writing {} records of {} ({} bytes)",
            data.records.len(),
            data.shape_type,
            byte_length
        );

        let mut buf = Vec::with_capacity(byte_length);
        buf.write_i32::<BigEndian>(FILE_CODE)?;
        for _ in 0..5 {
            buf.write_i32::<BigEndian>(0)?;
        }
        buf.write_i32::<BigEndian>((byte_length / 2) as i32)?;
        buf.write_i32::<LittleEndian>(data.version)?;
        buf.write_i32::<LittleEndian>(data.shape_type.as_i32())?;
        write_bbox(&mut buf, &data.bbox)?;
        write_range(&mut buf, &data.z_range)?;
        write_range(&mut buf, &data.m_range)?;

        for (i, record) in data.records.iter().enumerate() {
            let length = record.shape.content_length_words();
            trace!("Record {}: {} ({} words)", i + 1, record.shape.shape_type(), length);

            buf.write_i32::<BigEndian>(i as i32 + 1)?;
            buf.write_i32::<BigEndian>(length)?;
            write_shape(&mut buf, &record.shape)?;
        }

        Ok(buf)
    }
}

/// Encodes a model into a Shapefile container.
pub fn encode(data: &ShapefileData) -> ShpzResult<Vec<u8>> {
    ShapefileWriter::new().convert(data)
}

fn write_shape(buf: &mut Vec<u8>, shape: &Shape) -> ShpzResult<()> {
    let shape_type = shape.shape_type();
    buf.write_i32::<LittleEndian>(shape_type.as_i32())?;

    match shape {
        Shape::Null => {}
        Shape::Point(point) => write_point(buf, point)?,
        Shape::PointM { point, m } => {
            write_point(buf, point)?;
            buf.write_f64::<LittleEndian>(*m)?;
        }
        Shape::PointZ { point, z, m } => {
            write_point(buf, point)?;
            buf.write_f64::<LittleEndian>(*z)?;
            if let Some(m) = m {
                buf.write_f64::<LittleEndian>(*m)?;
            }
        }
        _ => {
            if let Some(content) = shape.poly() {
                write_poly(buf, shape_type, content)?;
            }
        }
    }

    Ok(())
}

fn write_poly(buf: &mut Vec<u8>, shape_type: ShapeType, content: &PolyContent) -> ShpzResult<()> {
    let n = content.point_count();

    write_bbox(buf, &content.bbox)?;
    if shape_type.has_parts() {
        buf.write_i32::<LittleEndian>(content.part_count() as i32)?;
    }
    buf.write_i32::<LittleEndian>(n as i32)?;

    if shape_type.has_parts() {
        for &offset in &content.parts {
            buf.write_i32::<LittleEndian>(offset as i32)?;
        }
    }

    if shape_type == ShapeType::MultiPatch {
        match &content.part_types {
            Some(types) if types.len() == content.part_count() => {
                for &t in types {
                    buf.write_i32::<LittleEndian>(t)?;
                }
            }
            Some(types) => {
                return Err(ShpzError::Format(format!(
                    "{} part types for {} parts",
                    types.len(),
                    content.part_count()
                )))
            }
            None => {
                for _ in 0..content.part_count() {
                    buf.write_i32::<LittleEndian>(0)?;
                }
            }
        }
    }

    for point in &content.points {
        write_point(buf, point)?;
    }

    // Z types always carry a Z block; missing values are written as zeros.
    if shape_type.has_z() {
        match &content.z {
            Some(z) => write_values(buf, z, n, "z")?,
            None => write_values(buf, &ValueArray::new(vec![0.0; n]), n, "z")?,
        }
    }

    if shape_type.has_m() {
        if let Some(m) = &content.m {
            write_values(buf, m, n, "m")?;
        }
    }

    Ok(())
}

fn write_point(buf: &mut Vec<u8>, point: &Point) -> ShpzResult<()> {
    buf.write_f64::<LittleEndian>(point.x)?;
    buf.write_f64::<LittleEndian>(point.y)?;
    Ok(())
}

fn write_bbox(buf: &mut Vec<u8>, bbox: &BoundingBox) -> ShpzResult<()> {
    buf.write_f64::<LittleEndian>(bbox.min_x)?;
    buf.write_f64::<LittleEndian>(bbox.min_y)?;
    buf.write_f64::<LittleEndian>(bbox.max_x)?;
    buf.write_f64::<LittleEndian>(bbox.max_y)?;
    Ok(())
}

fn write_range(buf: &mut Vec<u8>, range: &ValueRange) -> ShpzResult<()> {
    buf.write_f64::<LittleEndian>(range.min)?;
    buf.write_f64::<LittleEndian>(range.max)?;
    Ok(())
}

fn write_values(buf: &mut Vec<u8>, values: &ValueArray, n: usize, what: &str) -> ShpzResult<()> {
    if values.values.len() != n {
        return Err(ShpzError::Format(format!(
            "{} {} values for {} points",
            values.values.len(),
            what,
            n
        )));
    }
    write_range(buf, &values.range)?;
    for &v in &values.values {
        buf.write_f64::<LittleEndian>(v)?;
    }
    Ok(())
}
