//! Shapefile container parser.
//!
//! This module decodes the ESRI Shapefile binary container into the
//! in-memory [`ShapefileData`] model. The header and record headers are
//! big-endian, everything else is little-endian.

use tracing::{debug, info, trace, warn};

use crate::bytestream::ByteStream;
use crate::error::{ShpzError, ShpzResult};
use crate::types::*;

/// Parser for Shapefile container data.
///
/// The parser reads from a `ByteStream` positioned at the start of the
/// container and produces a `ShapefileData` holding every record.
pub struct ShapefileParser<'a> {
    /// The byte stream to read from.
    bs: &'a mut ByteStream<'a>,
}

/// Fixed header fields, in file order.
struct Header {
    word_length: i32,
    version: i32,
    shape_type: ShapeType,
    bbox: BoundingBox,
    z_range: ValueRange,
    m_range: ValueRange,
}

impl<'a> ShapefileParser<'a> {
    pub fn new(bs: &'a mut ByteStream<'a>) -> Self {
        Self { bs }
    }

    /// Parses the container and returns the model.
    ///
    /// A record whose content cannot be decoded is logged and replaced by
    /// [`Shape::Null`]; parsing continues with the next record.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file code is not 9994
    /// - The header shape type is not a known ESRI type
    /// - The header or a record header is truncated
    pub fn parse(mut self) -> ShpzResult<ShapefileData> {
        let header = self.parse_header()?;
        let records = self.parse_records(header.word_length)?;

        Ok(ShapefileData {
            file_code: FILE_CODE,
            word_length: header.word_length,
            version: header.version,
            shape_type: header.shape_type,
            bbox: header.bbox,
            z_range: header.z_range,
            m_range: header.m_range,
            records,
        })
    }

    fn parse_header(&mut self) -> ShpzResult<Header> {
        debug!("--- Header ---");

        let file_code = self.bs.read_i32_be()?;
        if file_code != FILE_CODE {
            return Err(ShpzError::InvalidFileCode(file_code));
        }

        // Five unused big-endian integers
        self.bs.skip(20)?;

        let word_length = self.bs.read_i32_be()?;
        let version = self.bs.read_i32_le()?;
        let code = self.bs.read_i32_le()?;
        let shape_type = ShapeType::from_i32(code).ok_or(ShpzError::InvalidShapeType(code))?;
        info!(
            "File length: {} bytes, version: {}, shape type: {}",
            word_length as i64 * 2,
            version,
            shape_type
        );

        let bbox = read_bbox(self.bs)?;
        let z_range = read_range(self.bs)?;
        let m_range = read_range(self.bs)?;
        debug!("Bounds: {:?}, z: {:?}, m: {:?}", bbox, z_range, m_range);

        Ok(Header {
            word_length,
            version,
            shape_type,
            bbox,
            z_range,
            m_range,
        })
    }

    fn parse_records(&mut self, word_length: i32) -> ShpzResult<Vec<ShapeRecord>> {
        debug!("--- Records ---");

        let declared = word_length.max(0) as usize * 2;
        let buffer_len = self.bs.position() + self.bs.remaining();
        let end = if declared > buffer_len {
            warn!(
                "Declared file length {} exceeds buffer length {}; reading to end of buffer",
                declared, buffer_len
            );
            buffer_len
        } else {
            declared
        };

        let mut records = Vec::new();
        while self.bs.position() < end {
            let number = self.bs.read_i32_be()?;
            let length = self.bs.read_i32_be()?;
            if length < 0 {
                return Err(ShpzError::Format(format!(
                    "record {} has negative content length {}",
                    number, length
                )));
            }

            let content_len = length as usize * 2;
            let available = content_len.min(self.bs.remaining());
            if available < content_len {
                warn!(
                    "Record {} declares {} content bytes but only {} remain",
                    number, content_len, available
                );
            }
            let content = self.bs.read_bytes(available)?;

            let shape = match read_shape(&mut ByteStream::new(content)) {
                Ok(shape) => shape,
                Err(e) => {
                    warn!("Record {} is malformed ({}); treating it as Null", number, e);
                    Shape::Null
                }
            };
            trace!(
                "Record {}: {} ({} words, {} points)",
                number,
                shape.shape_type(),
                length,
                shape.points().len()
            );

            records.push(ShapeRecord {
                number,
                length,
                shape,
            });
        }

        info!("Parsed {} records", records.len());
        Ok(records)
    }
}

/// Parses a complete Shapefile container held in memory.
pub fn parse(data: &[u8]) -> ShpzResult<ShapefileData> {
    let mut bs = ByteStream::new(data);
    ShapefileParser::new(&mut bs).parse()
}

/// Decodes one record's shape content, starting at its type tag.
fn read_shape(bs: &mut ByteStream<'_>) -> ShpzResult<Shape> {
    let code = bs.read_i32_le()?;
    let shape_type = ShapeType::from_i32(code).ok_or(ShpzError::InvalidShapeType(code))?;

    let shape = match shape_type {
        ShapeType::Null => Shape::Null,
        ShapeType::Point => Shape::Point(read_point(bs)?),
        ShapeType::PointM => {
            let point = read_point(bs)?;
            let m = bs.read_f64_le()?;
            Shape::PointM { point, m }
        }
        ShapeType::PointZ => {
            let point = read_point(bs)?;
            let z = bs.read_f64_le()?;
            // The measure is optional for PointZ
            let m = if bs.remaining() >= 8 {
                Some(bs.read_f64_le()?)
            } else {
                None
            };
            Shape::PointZ { point, z, m }
        }
        _ => {
            let content = read_poly(bs, shape_type)?;
            Shape::from_poly(shape_type, content).ok_or(ShpzError::InvalidShapeType(code))?
        }
    };

    Ok(shape)
}

fn read_poly(bs: &mut ByteStream<'_>, shape_type: ShapeType) -> ShpzResult<PolyContent> {
    let bbox = read_bbox(bs)?;

    let num_parts = if shape_type.has_parts() {
        read_count(bs, "part")?
    } else {
        0
    };
    let num_points = read_count(bs, "point")?;

    // Reject counts the remaining content cannot possibly hold before
    // allocating for them.
    if num_parts * 4 + num_points * 16 > bs.remaining() {
        return Err(ShpzError::EndOfStream);
    }

    let mut parts: Vec<u32> = Vec::with_capacity(num_parts);
    for _ in 0..num_parts {
        let offset = bs.read_i32_le()?;
        let previous = parts.last().copied().unwrap_or(0) as i32;
        if offset < previous || offset as usize > num_points {
            return Err(ShpzError::Format(format!(
                "part offset {} out of order or beyond {} points",
                offset, num_points
            )));
        }
        parts.push(offset as u32);
    }

    let part_types = if shape_type == ShapeType::MultiPatch {
        let mut types = Vec::with_capacity(num_parts);
        for _ in 0..num_parts {
            types.push(bs.read_i32_le()?);
        }
        Some(types)
    } else {
        None
    };

    let mut points = Vec::with_capacity(num_points);
    for _ in 0..num_points {
        points.push(read_point(bs)?);
    }

    let z = if shape_type.has_z() {
        Some(read_values(bs, num_points)?)
    } else {
        None
    };

    // The M block is optional for Z types; only read it if it fits.
    let m = if shape_type.has_m() && bs.remaining() >= 16 + num_points * 8 {
        Some(read_values(bs, num_points)?)
    } else {
        None
    };

    trace!(
        "  {} parts, {} points, z: {}, m: {}",
        num_parts,
        num_points,
        z.is_some(),
        m.is_some()
    );

    Ok(PolyContent {
        bbox,
        parts,
        part_types,
        points,
        z,
        m,
    })
}

fn read_count(bs: &mut ByteStream<'_>, what: &str) -> ShpzResult<usize> {
    let count = bs.read_i32_le()?;
    usize::try_from(count).map_err(|_| ShpzError::Format(format!("negative {} count {}", what, count)))
}

fn read_point(bs: &mut ByteStream<'_>) -> ShpzResult<Point> {
    let x = bs.read_f64_le()?;
    let y = bs.read_f64_le()?;
    Ok(Point::new(x, y).clamped())
}

fn read_bbox(bs: &mut ByteStream<'_>) -> ShpzResult<BoundingBox> {
    Ok(BoundingBox {
        min_x: bs.read_f64_le()?,
        min_y: bs.read_f64_le()?,
        max_x: bs.read_f64_le()?,
        max_y: bs.read_f64_le()?,
    })
}

fn read_range(bs: &mut ByteStream<'_>) -> ShpzResult<ValueRange> {
    Ok(ValueRange {
        min: bs.read_f64_le()?,
        max: bs.read_f64_le()?,
    })
}

fn read_values(bs: &mut ByteStream<'_>, count: usize) -> ShpzResult<ValueArray> {
    let range = read_range(bs)?;
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(bs.read_f64_le()?);
    }
    Ok(ValueArray { range, values })
}
