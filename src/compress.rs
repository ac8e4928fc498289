//! Compact-format compressor.
//!
//! Quantizes every polygon/polyline point, delta-encodes the resulting
//! stream into 12-bit anchors and 6-bit deltas, and packs it with
//! [`BitView`] behind a small header and a per-record part table. Z and M
//! values are carried unquantized as trailing `f32` arrays.

use byteorder::{LittleEndian, WriteBytesExt};
use tracing::{debug, info, trace};

use crate::bitview::BitView;
use crate::codec::*;
use crate::converter::Converter;
use crate::error::{ShpzError, ShpzResult};
use crate::types::*;

/// Converter that produces the compact representation of a model.
///
/// Records outside the polygon/polyline family, or whose type differs from
/// the file's, are kept as empty part tables and decompress to
/// [`Shape::Null`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Compressor;

/// Stage-1 output: the quantized stream plus everything needed to lay out
/// the compact buffer.
#[derive(Debug, Default)]
struct QuantizedGeometry {
    /// Point counts of each part, one table per record.
    part_tables: Vec<Vec<u32>>,
    /// Interleaved x/y samples with [`PART_END_RAW`] after each part.
    stream: Vec<i32>,
    /// Per-point Z for Z types, NaN where a record has none.
    z: Vec<f32>,
    /// Per-point M for Z and M types, NaN where a record has none.
    m: Vec<f32>,
}

impl Compressor {
    pub fn new() -> Self {
        Self
    }
}

impl Converter for Compressor {
    type Output = Vec<u8>;

    fn convert(&self, data: &ShapefileData) -> ShpzResult<Self::Output> {
        let shape_type = select_shape_type(data);
        let geometry = quantize_records(data, shape_type);

        let version = if data.records.iter().any(|r| carries_z_or_m(&r.shape)) {
            VERSION_ZM
        } else {
            VERSION_PLAIN
        };
        debug!("Compact version {} for {}", version, shape_type);

        let stream = requantize(&geometry.stream);
        let fields = delta_encode(&stream);
        let payload = pack(&fields);

        let mut buf = Vec::with_capacity(COMPACT_HEADER_LEN + payload.len());
        buf.write_u8(version)?;
        buf.write_u8(shape_type.as_i32() as u8)?;
        buf.write_u32::<LittleEndian>(data.records.len() as u32)?;
        buf.write_i32::<LittleEndian>(data.file_code)?;
        buf.write_i32::<LittleEndian>(data.version)?;

        for (i, table) in geometry.part_tables.iter().enumerate() {
            let part_count = u16::try_from(table.len()).map_err(|_| {
                ShpzError::Format(format!("record {} has {} parts (max 65535)", i + 1, table.len()))
            })?;
            buf.write_u16::<LittleEndian>(part_count)?;
            for &count in table {
                buf.write_u32::<LittleEndian>(count)?;
            }
        }

        buf.extend_from_slice(&payload);

        if version == VERSION_ZM {
            for &v in geometry.z.iter().chain(&geometry.m) {
                buf.write_f32::<LittleEndian>(v)?;
            }
        }

        info!(
            "Compressed {} records ({} fields) into {} bytes",
            data.records.len(),
            fields.len(),
            buf.len()
        );
        Ok(buf)
    }
}

/// Compresses a model into the compact representation.
pub fn compress(data: &ShapefileData) -> ShpzResult<Vec<u8>> {
    Compressor::new().convert(data)
}

/// Uses the file's shape type, falling back to the first non-null record.
fn select_shape_type(data: &ShapefileData) -> ShapeType {
    if data.shape_type != ShapeType::Null {
        return data.shape_type;
    }
    data.records
        .iter()
        .map(|r| r.shape.shape_type())
        .find(|t| *t != ShapeType::Null)
        .unwrap_or(ShapeType::Null)
}

fn carries_z_or_m(shape: &Shape) -> bool {
    match shape {
        Shape::PointM { .. } | Shape::PointZ { .. } => true,
        _ => shape
            .poly()
            .is_some_and(|c| c.z.is_some() || c.m.is_some()),
    }
}

/// Stage 1: walks every compressible record, quantizing its points and
/// collecting per-part counts and Z/M values.
fn quantize_records(data: &ShapefileData, shape_type: ShapeType) -> QuantizedGeometry {
    let mut geometry = QuantizedGeometry::default();
    let compressible = shape_type.is_compressible();

    for record in &data.records {
        let content = match record.shape.poly() {
            Some(content) if compressible && record.shape.shape_type() == shape_type => content,
            _ => {
                if !record.shape.is_null() {
                    debug!(
                        "Record {}: {} is not compressible as {}, skipping",
                        record.number,
                        record.shape.shape_type(),
                        shape_type
                    );
                }
                geometry.part_tables.push(Vec::new());
                continue;
            }
        };

        let mut table = Vec::with_capacity(content.part_count());
        for range in content.part_ranges() {
            table.push(range.len() as u32);
            for i in range {
                let point = content.points[i];
                geometry.stream.push(quantize(point.x));
                geometry.stream.push(quantize(point.y));

                if shape_type.has_z() {
                    geometry.z.push(value_at(&content.z, i));
                }
                if shape_type.has_m() {
                    geometry.m.push(value_at(&content.m, i));
                }
            }
            geometry.stream.push(PART_END_RAW);
        }

        trace!("Record {}: parts {:?}", record.number, table);
        geometry.part_tables.push(table);
    }

    geometry
}

fn value_at(values: &Option<ValueArray>, i: usize) -> f32 {
    values
        .as_ref()
        .and_then(|v| v.values.get(i))
        .map_or(f32::NAN, |&v| v as f32)
}

/// Stage 2: divides every sample by 16, truncating toward zero.
fn requantize(stream: &[i32]) -> Vec<i32> {
    stream.iter().map(|&v| v / STAGE2_DIVISOR).collect()
}

/// Turns the stage-2 stream into anchors, deltas and terminators.
fn delta_encode(stream: &[i32]) -> Vec<Field> {
    let mut fields = Vec::with_capacity(stream.len());
    // Running position of the open span, if any.
    let mut current: Option<(i32, i32)> = None;

    let mut samples = stream.iter().copied();
    while let Some(x) = samples.next() {
        if x == PART_END {
            if current.take().is_some() {
                fields.push(Field::Narrow(SPAN_END));
            }
            fields.push(Field::Wide(PART_END));
            continue;
        }
        let Some(y) = samples.next() else {
            break;
        };

        match current {
            Some((cx, cy)) if fits_delta(x - cx, y - cy) => {
                fields.push(Field::Narrow(x - cx));
                fields.push(Field::Narrow(y - cy));
            }
            Some(_) => {
                trace!("Span break at ({}, {})", x, y);
                fields.push(Field::Narrow(SPAN_END));
                fields.push(Field::Wide(x));
                fields.push(Field::Wide(y));
            }
            None => {
                fields.push(Field::Wide(x));
                fields.push(Field::Wide(y));
            }
        }
        current = Some((x, y));
    }

    fields
}

/// Packs fields into a `u32` bit-length prefix followed by exactly
/// `ceil(bits / 8)` bytes.
fn pack(fields: &[Field]) -> Vec<u8> {
    let bit_len: usize = fields.iter().map(|f| f.width()).sum();
    let mut view = BitView::with_bit_len(bit_len);

    let mut pos = 0;
    for field in fields {
        match *field {
            Field::Wide(v) => view.set_int12(pos, v),
            Field::Narrow(v) => view.set_int6(pos, v),
        }
        pos += field.width();
    }

    let mut buf = Vec::with_capacity(4 + view.as_bytes().len());
    buf.extend_from_slice(&(bit_len as u32).to_le_bytes());
    buf.extend_from_slice(view.as_bytes());
    buf
}
