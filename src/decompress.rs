//! Compact-format decompressor.
//!
//! Reverses [`crate::compress`]: reads the header and part tables, unpacks
//! the anchor/delta stream, and rebuilds an approximate [`ShapefileData`]
//! whose bounds are recomputed from the reconstructed points.

use tracing::{debug, info, trace, warn};

use crate::bitview::{self, BitView, INT12_BITS, INT6_BITS};
use crate::bytestream::ByteStream;
use crate::codec::*;
use crate::error::{ShpzError, ShpzResult};
use crate::types::*;

/// Decompressor for compact buffers.
pub struct Decompressor<'a> {
    /// The byte stream to read from.
    bs: &'a mut ByteStream<'a>,
}

/// Fixed compact header fields.
#[derive(Debug)]
struct CompactHeader {
    version: u8,
    shape_type: ShapeType,
    record_count: usize,
    file_code: i32,
    shapefile_version: i32,
}

/// Sequential field reader over the unpacked payload.
struct FieldReader {
    view: BitView,
    pos: usize,
    bit_len: usize,
}

impl FieldReader {
    fn take(&mut self, width: usize) -> ShpzResult<usize> {
        if self.pos + width > self.bit_len {
            return Err(ShpzError::Format(format!(
                "unexpected end of point data at bit {} of {}",
                self.pos, self.bit_len
            )));
        }
        let at = self.pos;
        self.pos += width;
        Ok(at)
    }

    fn wide(&mut self) -> ShpzResult<i32> {
        let at = self.take(INT12_BITS)?;
        Ok(self.view.get_int12(at))
    }

    fn narrow(&mut self) -> ShpzResult<i32> {
        let at = self.take(INT6_BITS)?;
        Ok(self.view.get_int6(at))
    }

    /// Decodes one part in the stage-2 domain, up to its terminator.
    fn read_part(&mut self) -> ShpzResult<Vec<(i32, i32)>> {
        let mut points = Vec::new();
        loop {
            let x = self.wide()?;
            if x == PART_END {
                return Ok(points);
            }
            let y = self.wide()?;
            let (mut cx, mut cy) = (x, y);
            points.push((cx, cy));

            loop {
                let dx = self.narrow()?;
                if dx == SPAN_END {
                    break;
                }
                let dy = self.narrow()?;
                cx += dx;
                cy += dy;
                if cx.abs() > MAX_COORD || cy.abs() > MAX_COORD {
                    return Err(ShpzError::Format(format!(
                        "delta leaves 12-bit range at ({}, {})",
                        cx, cy
                    )));
                }
                points.push((cx, cy));
            }
        }
    }
}

impl<'a> Decompressor<'a> {
    pub fn new(bs: &'a mut ByteStream<'a>) -> Self {
        Self { bs }
    }

    /// Decompresses the buffer into a reconstructed model.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The version byte is not 1 or 2
    /// - The shape type byte is not a known ESRI type
    /// - The buffer is truncated
    /// - The point stream disagrees with the part tables
    pub fn decompress(mut self) -> ShpzResult<ShapefileData> {
        let header = self.read_header()?;
        let tables = self.read_part_tables(header.record_count)?;
        let total_points: usize = tables.iter().flatten().map(|&n| n as usize).sum();

        let mut reader = self.read_payload()?;
        let (z, m) = self.read_measures(&header, total_points)?;

        let mut shapes = Vec::with_capacity(tables.len());
        let mut offset = 0;
        for (i, table) in tables.iter().enumerate() {
            if table.is_empty() {
                shapes.push(Shape::Null);
                continue;
            }

            let mut parts = Vec::with_capacity(table.len());
            for &count in table {
                let part = reader.read_part()?;
                if part.len() != count as usize {
                    return Err(ShpzError::Format(format!(
                        "record {} part holds {} points, table says {}",
                        i + 1,
                        part.len(),
                        count
                    )));
                }
                parts.push(
                    part.into_iter()
                        .map(|(x, y)| {
                            Point::new(
                                dequantize(x * STAGE2_DIVISOR),
                                dequantize(y * STAGE2_DIVISOR),
                            )
                        })
                        .collect::<Vec<_>>(),
                );
            }

            let count: usize = table.iter().map(|&n| n as usize).sum();
            // A record without Z or M was padded with NaN.
            let slice = |values: &Option<Vec<f64>>| {
                values
                    .as_ref()
                    .map(|v| v[offset..offset + count].to_vec())
                    .filter(|v| !v.iter().all(|x| x.is_nan()))
            };
            let content = PolyContent::from_parts(parts, slice(&z), slice(&m));
            offset += count;

            if !header.shape_type.is_compressible() {
                return Err(ShpzError::UnsupportedType(header.shape_type));
            }
            let shape = Shape::from_poly(header.shape_type, content)
                .ok_or(ShpzError::UnsupportedType(header.shape_type))?;
            trace!("Record {}: {} parts, {} points", i + 1, table.len(), count);
            shapes.push(shape);
        }

        if reader.pos != reader.bit_len {
            warn!(
                "{} trailing bits after the last part",
                reader.bit_len - reader.pos
            );
        }

        let mut data =
            ShapefileData::from_shapes(header.shape_type, header.shapefile_version, shapes);
        data.file_code = header.file_code;

        info!(
            "Decompressed {} records ({} points)",
            data.records.len(),
            total_points
        );
        Ok(data)
    }

    fn read_header(&mut self) -> ShpzResult<CompactHeader> {
        let version = self.bs.read_u8()?;
        if version != VERSION_PLAIN && version != VERSION_ZM {
            return Err(ShpzError::UnsupportedVersion(version));
        }

        let code = self.bs.read_u8()? as i32;
        let shape_type = ShapeType::from_i32(code).ok_or(ShpzError::InvalidShapeType(code))?;
        let record_count = self.bs.read_u32_le()? as usize;
        let file_code = self.bs.read_i32_le()?;
        let shapefile_version = self.bs.read_i32_le()?;

        let header = CompactHeader {
            version,
            shape_type,
            record_count,
            file_code,
            shapefile_version,
        };
        debug!("Compact header: {:?}", header);
        Ok(header)
    }

    fn read_part_tables(&mut self, record_count: usize) -> ShpzResult<Vec<Vec<u32>>> {
        // Every table entry takes at least two bytes.
        let mut tables = Vec::with_capacity(record_count.min(self.bs.remaining() / 2));
        for _ in 0..record_count {
            let part_count = self.bs.read_u16_le()? as usize;
            let mut table = Vec::with_capacity(part_count);
            for _ in 0..part_count {
                table.push(self.bs.read_u32_le()?);
            }
            tables.push(table);
        }
        Ok(tables)
    }

    fn read_payload(&mut self) -> ShpzResult<FieldReader> {
        let bit_len = self.bs.read_u32_le()? as usize;
        let bytes = self.bs.read_bytes(bitview::byte_len(bit_len))?;
        debug!("Point payload: {} bits", bit_len);

        Ok(FieldReader {
            view: BitView::from_bytes(bytes.to_vec()),
            pos: 0,
            bit_len,
        })
    }

    /// Reads the trailing Z and M arrays of a version 2 buffer.
    ///
    /// Z types carry a Z array then an M array, M types carry a single M
    /// array, and every other type carries none.
    fn read_measures(
        &mut self,
        header: &CompactHeader,
        total_points: usize,
    ) -> ShpzResult<(Option<Vec<f64>>, Option<Vec<f64>>)> {
        if header.version == VERSION_PLAIN || total_points == 0 {
            if self.bs.has_more_bytes() {
                warn!("Ignoring {} trailing bytes", self.bs.remaining());
            }
            return Ok((None, None));
        }

        let has_z = header.shape_type.has_z();
        let has_m = header.shape_type.has_m();
        let section = (has_z as usize + has_m as usize) * total_points * 4;
        if self.bs.remaining() < section {
            debug!(
                "Z/M section needs {} bytes, {} remain",
                section,
                self.bs.remaining()
            );
            return Err(ShpzError::EndOfStream);
        }

        let mut read_array = || -> ShpzResult<Vec<f64>> {
            let mut values = Vec::with_capacity(total_points);
            for _ in 0..total_points {
                values.push(self.bs.read_f32_le()? as f64);
            }
            Ok(values)
        };
        let z = if has_z { Some(read_array()?) } else { None };
        let m = if has_m { Some(read_array()?) } else { None };

        if self.bs.has_more_bytes() {
            warn!(
                "Ignoring {} bytes after the Z/M section",
                self.bs.remaining()
            );
        }
        debug!("Z array: {}, M array: {}", z.is_some(), m.is_some());
        Ok((z, m))
    }
}

/// Decompresses a compact buffer into a reconstructed model.
pub fn decompress(data: &[u8]) -> ShpzResult<ShapefileData> {
    let mut bs = ByteStream::new(data);
    Decompressor::new(&mut bs).decompress()
}
