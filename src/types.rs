//! Shapefile data types and structures.
//!
//! This module defines the in-memory geometry model shared by the container
//! parser/writer and both halves of the compression codec: the shape type
//! enumeration, the shape variants, records, and the file-level model.

use std::fmt;
use std::ops::Range;

/// Magic number at the start of every Shapefile container.
pub const FILE_CODE: i32 = 9994;
/// Size of the fixed container header in bytes.
pub const HEADER_LEN: usize = 100;
/// Size of each record header (number + content length) in bytes.
pub const RECORD_HEADER_LEN: usize = 8;
/// Shapefile version written by every producer.
pub const SHAPEFILE_VERSION: i32 = 1000;

/// ESRI shape type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShapeType {
    #[default]
    Null = 0,
    Point = 1,
    PolyLine = 3,
    Polygon = 5,
    MultiPoint = 8,
    PointZ = 11,
    PolyLineZ = 13,
    PolygonZ = 15,
    MultiPointZ = 18,
    PointM = 21,
    PolyLineM = 23,
    PolygonM = 25,
    MultiPointM = 28,
    MultiPatch = 31,
}

impl ShapeType {
    /// Maps a wire code to a shape type, or `None` if the code is unknown.
    pub fn from_i32(value: i32) -> Option<ShapeType> {
        let shape_type = match value {
            0 => ShapeType::Null,
            1 => ShapeType::Point,
            3 => ShapeType::PolyLine,
            5 => ShapeType::Polygon,
            8 => ShapeType::MultiPoint,
            11 => ShapeType::PointZ,
            13 => ShapeType::PolyLineZ,
            15 => ShapeType::PolygonZ,
            18 => ShapeType::MultiPointZ,
            21 => ShapeType::PointM,
            23 => ShapeType::PolyLineM,
            25 => ShapeType::PolygonM,
            28 => ShapeType::MultiPointM,
            31 => ShapeType::MultiPatch,
            _ => return None,
        };
        Some(shape_type)
    }

    /// Returns the wire code.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// True if shapes of this type carry a Z block.
    pub fn has_z(self) -> bool {
        matches!(
            self,
            ShapeType::PointZ
                | ShapeType::PolyLineZ
                | ShapeType::PolygonZ
                | ShapeType::MultiPointZ
                | ShapeType::MultiPatch
        )
    }

    /// True if shapes of this type may carry an M block.
    pub fn has_m(self) -> bool {
        self.has_z()
            || matches!(
                self,
                ShapeType::PointM
                    | ShapeType::PolyLineM
                    | ShapeType::PolygonM
                    | ShapeType::MultiPointM
            )
    }

    /// True if the shape body is a [`PolyContent`].
    pub fn is_poly(self) -> bool {
        !matches!(
            self,
            ShapeType::Null | ShapeType::Point | ShapeType::PointM | ShapeType::PointZ
        )
    }

    /// True if the shape body has a part table.
    pub fn has_parts(self) -> bool {
        self.is_poly() && !self.is_multipoint()
    }

    fn is_multipoint(self) -> bool {
        matches!(
            self,
            ShapeType::MultiPoint | ShapeType::MultiPointM | ShapeType::MultiPointZ
        )
    }

    /// True for the polygon/polyline family handled by the compact codec.
    pub fn is_compressible(self) -> bool {
        matches!(
            self,
            ShapeType::PolyLine
                | ShapeType::Polygon
                | ShapeType::PolyLineZ
                | ShapeType::PolygonZ
                | ShapeType::PolyLineM
                | ShapeType::PolygonM
        )
    }
}

impl fmt::Display for ShapeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShapeType::Null => "Null",
            ShapeType::Point => "Point",
            ShapeType::PolyLine => "PolyLine",
            ShapeType::Polygon => "Polygon",
            ShapeType::MultiPoint => "MultiPoint",
            ShapeType::PointZ => "PointZ",
            ShapeType::PolyLineZ => "PolyLineZ",
            ShapeType::PolygonZ => "PolygonZ",
            ShapeType::MultiPointZ => "MultiPointZ",
            ShapeType::PointM => "PointM",
            ShapeType::PolyLineM => "PolyLineM",
            ShapeType::PolygonM => "PolygonM",
            ShapeType::MultiPointM => "MultiPointM",
            ShapeType::MultiPatch => "MultiPatch",
        };
        write!(f, "{}", name)
    }
}

/// A 2-D point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Creates a new point with the given coordinates.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Clamps the point to longitude `[-180, 180]` and latitude `[-90, 90]`.
    pub fn clamped(self) -> Self {
        Self {
            x: self.x.clamp(-180.0, 180.0),
            y: self.y.clamp(-90.0, 90.0),
        }
    }
}

/// An x/y bounding box. All zero when it encloses nothing.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Computes the bounding box of `points`.
    pub fn from_points<'a, I>(points: I) -> Self
    where
        I: IntoIterator<Item = &'a Point>,
    {
        let mut iter = points.into_iter();
        let Some(first) = iter.next() else {
            return Self::default();
        };

        let mut bbox = Self {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        for p in iter {
            bbox.min_x = bbox.min_x.min(p.x);
            bbox.min_y = bbox.min_y.min(p.y);
            bbox.max_x = bbox.max_x.max(p.x);
            bbox.max_y = bbox.max_y.max(p.y);
        }
        bbox
    }
}

/// A min/max range over Z or M values. All zero when empty.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    /// Computes the range of `values`.
    pub fn from_values<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a f64>,
    {
        let mut iter = values.into_iter();
        let Some(&first) = iter.next() else {
            return Self::default();
        };

        iter.fold(Self { min: first, max: first }, |range, &v| Self {
            min: range.min.min(v),
            max: range.max.max(v),
        })
    }
}

/// Per-point Z or M values with their range.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValueArray {
    pub range: ValueRange,
    pub values: Vec<f64>,
}

impl ValueArray {
    /// Wraps `values`, computing their range.
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            range: ValueRange::from_values(&values),
            values,
        }
    }
}

/// Shared body of the multi-point, polyline, polygon and multipatch shapes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PolyContent {
    /// Bounding box of the points.
    pub bbox: BoundingBox,
    /// Index of the first point of each part; empty for multipoints.
    pub parts: Vec<u32>,
    /// One patch tag per part (MultiPatch only).
    pub part_types: Option<Vec<i32>>,
    pub points: Vec<Point>,
    /// Z values, one per point (Z variants and MultiPatch).
    pub z: Option<ValueArray>,
    /// M values, one per point (M and Z variants, optional).
    pub m: Option<ValueArray>,
}

impl PolyContent {
    /// Builds content from per-part point lists, computing the part table
    /// and the bounding box.
    pub fn from_parts(parts: Vec<Vec<Point>>, z: Option<Vec<f64>>, m: Option<Vec<f64>>) -> Self {
        let mut offsets = Vec::with_capacity(parts.len());
        let mut points = Vec::new();
        for part in parts {
            offsets.push(points.len() as u32);
            points.extend(part);
        }

        Self {
            bbox: BoundingBox::from_points(&points),
            parts: offsets,
            part_types: None,
            points,
            z: z.map(ValueArray::new),
            m: m.map(ValueArray::new),
        }
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Yields the point range `[parts[k], parts[k + 1])` of every part; the
    /// last part ends at the point count.
    ///
    /// Offsets are clamped to the point count so a corrupt part table can
    /// never produce an out-of-bounds range.
    pub fn part_ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        let count = self.points.len();
        self.parts.iter().enumerate().map(move |(k, &start)| {
            let end = self
                .parts
                .get(k + 1)
                .map_or(count, |&next| (next as usize).min(count));
            let start = (start as usize).min(end);
            start..end
        })
    }
}

/// A single shape, tagged by its ESRI type.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Null,
    Point(Point),
    PointM { point: Point, m: f64 },
    PointZ { point: Point, z: f64, m: Option<f64> },
    MultiPoint(PolyContent),
    MultiPointM(PolyContent),
    MultiPointZ(PolyContent),
    PolyLine(PolyContent),
    PolyLineM(PolyContent),
    PolyLineZ(PolyContent),
    Polygon(PolyContent),
    PolygonM(PolyContent),
    PolygonZ(PolyContent),
    MultiPatch(PolyContent),
}

impl Shape {
    /// Wraps poly content in the variant for `shape_type`, or returns `None`
    /// if that type has no poly body.
    pub fn from_poly(shape_type: ShapeType, content: PolyContent) -> Option<Shape> {
        let shape = match shape_type {
            ShapeType::MultiPoint => Shape::MultiPoint(content),
            ShapeType::MultiPointM => Shape::MultiPointM(content),
            ShapeType::MultiPointZ => Shape::MultiPointZ(content),
            ShapeType::PolyLine => Shape::PolyLine(content),
            ShapeType::PolyLineM => Shape::PolyLineM(content),
            ShapeType::PolyLineZ => Shape::PolyLineZ(content),
            ShapeType::Polygon => Shape::Polygon(content),
            ShapeType::PolygonM => Shape::PolygonM(content),
            ShapeType::PolygonZ => Shape::PolygonZ(content),
            ShapeType::MultiPatch => Shape::MultiPatch(content),
            ShapeType::Null | ShapeType::Point | ShapeType::PointM | ShapeType::PointZ => {
                return None
            }
        };
        Some(shape)
    }

    pub fn shape_type(&self) -> ShapeType {
        match self {
            Shape::Null => ShapeType::Null,
            Shape::Point(_) => ShapeType::Point,
            Shape::PointM { .. } => ShapeType::PointM,
            Shape::PointZ { .. } => ShapeType::PointZ,
            Shape::MultiPoint(_) => ShapeType::MultiPoint,
            Shape::MultiPointM(_) => ShapeType::MultiPointM,
            Shape::MultiPointZ(_) => ShapeType::MultiPointZ,
            Shape::PolyLine(_) => ShapeType::PolyLine,
            Shape::PolyLineM(_) => ShapeType::PolyLineM,
            Shape::PolyLineZ(_) => ShapeType::PolyLineZ,
            Shape::Polygon(_) => ShapeType::Polygon,
            Shape::PolygonM(_) => ShapeType::PolygonM,
            Shape::PolygonZ(_) => ShapeType::PolygonZ,
            Shape::MultiPatch(_) => ShapeType::MultiPatch,
        }
    }

    /// Returns the poly body, if this shape has one.
    pub fn poly(&self) -> Option<&PolyContent> {
        match self {
            Shape::MultiPoint(c)
            | Shape::MultiPointM(c)
            | Shape::MultiPointZ(c)
            | Shape::PolyLine(c)
            | Shape::PolyLineM(c)
            | Shape::PolyLineZ(c)
            | Shape::Polygon(c)
            | Shape::PolygonM(c)
            | Shape::PolygonZ(c)
            | Shape::MultiPatch(c) => Some(c),
            Shape::Null | Shape::Point(_) | Shape::PointM { .. } | Shape::PointZ { .. } => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Shape::Null)
    }

    /// All x/y points of the shape.
    pub fn points(&self) -> &[Point] {
        match self {
            Shape::Null => &[],
            Shape::Point(point) | Shape::PointM { point, .. } | Shape::PointZ { point, .. } => {
                std::slice::from_ref(point)
            }
            _ => match self.poly() {
                Some(content) => &content.points,
                None => &[],
            },
        }
    }

    /// All Z values of the shape.
    pub fn z_values(&self) -> &[f64] {
        match self {
            Shape::PointZ { z, .. } => std::slice::from_ref(z),
            _ => match self.poly().and_then(|c| c.z.as_ref()) {
                Some(z) => &z.values,
                None => &[],
            },
        }
    }

    /// All M values of the shape.
    pub fn m_values(&self) -> &[f64] {
        match self {
            Shape::PointM { m, .. } => std::slice::from_ref(m),
            Shape::PointZ { m, .. } => m.as_slice(),
            _ => match self.poly().and_then(|c| c.m.as_ref()) {
                Some(m) => &m.values,
                None => &[],
            },
        }
    }

    /// Size of the encoded shape content in bytes, shape type tag included.
    ///
    /// A Z block is always counted for Z types; an M block only when values
    /// are present.
    pub fn content_length_bytes(&self) -> usize {
        match self {
            Shape::Null => 4,
            Shape::Point(_) => 4 + 16,
            Shape::PointM { .. } => 4 + 16 + 8,
            Shape::PointZ { m, .. } => 4 + 16 + 8 + if m.is_some() { 8 } else { 0 },
            _ => {
                let shape_type = self.shape_type();
                let Some(content) = self.poly() else {
                    return 4;
                };
                let n = content.point_count();
                let parts = content.part_count();

                let mut len = 4 + 32 + 4 + 16 * n;
                if shape_type.has_parts() {
                    len += 4 + 4 * parts;
                }
                if shape_type == ShapeType::MultiPatch {
                    len += 4 * parts;
                }
                if shape_type.has_z() {
                    len += 16 + 8 * n;
                }
                if shape_type.has_m() && content.m.is_some() {
                    len += 16 + 8 * n;
                }
                len
            }
        }
    }

    /// Size of the encoded shape content in 16-bit words.
    pub fn content_length_words(&self) -> i32 {
        (self.content_length_bytes() / 2) as i32
    }
}

/// A numbered record in the container.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeRecord {
    /// 1-based record number.
    pub number: i32,
    /// Content length in 16-bit words, excluding the record header.
    pub length: i32,
    pub shape: Shape,
}

/// A parsed (or reconstructed) Shapefile.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapefileData {
    /// Magic number, always [`FILE_CODE`] for valid files.
    pub file_code: i32,
    /// Total file length in 16-bit words, header included.
    pub word_length: i32,
    pub version: i32,
    /// Shape type shared by all non-null records.
    pub shape_type: ShapeType,
    pub bbox: BoundingBox,
    pub z_range: ValueRange,
    pub m_range: ValueRange,
    pub records: Vec<ShapeRecord>,
}

impl ShapefileData {
    /// Assembles a model from shapes, numbering records from 1 and
    /// computing record lengths, the file length and the file bounds.
    pub fn from_shapes(shape_type: ShapeType, version: i32, shapes: Vec<Shape>) -> Self {
        let records: Vec<ShapeRecord> = shapes
            .into_iter()
            .enumerate()
            .map(|(i, shape)| ShapeRecord {
                number: i as i32 + 1,
                length: shape.content_length_words(),
                shape,
            })
            .collect();

        let byte_length = HEADER_LEN
            + records
                .iter()
                .map(|r| RECORD_HEADER_LEN + r.length as usize * 2)
                .sum::<usize>();

        let shapes = records.iter().map(|r| &r.shape);
        let bbox = BoundingBox::from_points(shapes.clone().flat_map(Shape::points));
        let z_range = ValueRange::from_values(shapes.clone().flat_map(Shape::z_values));
        let m_range = ValueRange::from_values(shapes.flat_map(Shape::m_values));

        Self {
            file_code: FILE_CODE,
            word_length: (byte_length / 2) as i32,
            version,
            shape_type,
            bbox,
            z_range,
            m_range,
            records,
        }
    }

    /// Total file length in bytes.
    pub fn byte_length(&self) -> usize {
        self.word_length.max(0) as usize * 2
    }

    pub fn total_points(&self) -> usize {
        self.records.iter().map(|r| r.shape.points().len()).sum()
    }

    pub fn total_parts(&self) -> usize {
        self.records
            .iter()
            .filter_map(|r| r.shape.poly())
            .map(PolyContent::part_count)
            .sum()
    }
}

impl fmt::Display for ShapefileData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "file_code: {}", self.file_code)?;
        writeln!(f, "file_length: {} bytes", self.byte_length())?;
        writeln!(f, "version: {}", self.version)?;
        writeln!(f, "shape_type: {}", self.shape_type)?;
        writeln!(
            f,
            "bbox: [{}, {}] - [{}, {}]",
            self.bbox.min_x, self.bbox.min_y, self.bbox.max_x, self.bbox.max_y
        )?;
        writeln!(f, "z_range: [{}, {}]", self.z_range.min, self.z_range.max)?;
        writeln!(f, "m_range: [{}, {}]", self.m_range.min, self.m_range.max)?;
        write!(
            f,
            "records: {} ({} parts, {} points)",
            self.records.len(),
            self.total_parts(),
            self.total_points()
        )
    }
}
