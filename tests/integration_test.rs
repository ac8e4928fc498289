//! Integration tests for the container and compact codecs.
//!
//! Containers are built through the writer, parsed back, compressed and
//! decompressed, checking the properties the compact format guarantees.

use pretty_assertions::assert_eq;
use shpz::*;

/// Largest coordinate error the two quantization stages can introduce.
const TOLERANCE: f64 = 0.1;

fn points(coords: &[(f64, f64)]) -> Vec<Point> {
    coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
}

fn square() -> Vec<Point> {
    points(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)])
}

/// A polygon with an outer ring and a hole, plus a fine-grained coastline
/// that exercises long delta spans.
fn sample_model() -> ShapefileData {
    let outer = points(&[(-120.0, 30.0), (-100.0, 30.0), (-100.0, 45.0), (-120.0, 45.0), (-120.0, 30.0)]);
    let hole = points(&[(-115.0, 35.0), (-110.0, 35.0), (-110.0, 40.0), (-115.0, 35.0)]);
    let coast: Vec<Point> = (0..200)
        .map(|i| {
            let t = i as f64 * 0.05;
            Point::new(10.0 + t, -20.0 + (t * 3.0).sin())
        })
        .collect();

    ShapefileData::from_shapes(
        ShapeType::Polygon,
        SHAPEFILE_VERSION,
        vec![
            Shape::Polygon(PolyContent::from_parts(vec![outer, hole], None, None)),
            Shape::Null,
            Shape::Polygon(PolyContent::from_parts(vec![coast], None, None)),
        ],
    )
}

fn assert_close(restored: &[Point], original: &[Point]) {
    assert_eq!(restored.len(), original.len());
    for (r, o) in restored.iter().zip(original) {
        assert!(
            (r.x - o.x).abs() < TOLERANCE && (r.y - o.y).abs() < TOLERANCE,
            "{:?} too far from {:?}",
            r,
            o
        );
    }
}

// ============================================================================
// Container Tests
// ============================================================================

#[test]
fn test_container_round_trip() {
    let model = sample_model();
    let bytes = encode(&model).expect("Failed to encode model");
    assert_eq!(bytes.len(), model.byte_length());

    let parsed = parse(&bytes).expect("Failed to parse container");
    assert_eq!(parsed, model);
}

#[test]
fn test_byte_length_invariant() {
    let parsed = parse(&encode(&sample_model()).unwrap()).unwrap();

    let expected: usize = 100
        + parsed
            .records
            .iter()
            .map(|r| 8 + r.length as usize * 2)
            .sum::<usize>();
    assert_eq!(parsed.byte_length(), expected);
}

#[test]
fn test_parse_rejects_bad_magic() {
    let mut bytes = encode(&sample_model()).unwrap();
    bytes[0..4].copy_from_slice(&9995i32.to_be_bytes());

    let err = parse(&bytes).unwrap_err();
    assert!(err.is_format_error());
    assert!(matches!(err, ShpzError::InvalidFileCode(9995)));
}

#[test]
fn test_malformed_record_is_not_fatal() {
    let mut bytes = encode(&sample_model()).unwrap();
    // Corrupt the shape type tag of the first record's content.
    bytes[108..112].copy_from_slice(&77i32.to_le_bytes());

    let parsed = parse(&bytes).unwrap();
    assert_eq!(parsed.records.len(), 3);
    assert!(parsed.records[0].shape.is_null());
    assert_eq!(parsed.records[2].shape, sample_model().records[2].shape);
}

// ============================================================================
// Compact Codec Tests
// ============================================================================

#[test]
fn test_square_scenario() {
    let model = ShapefileData::from_shapes(
        ShapeType::Polygon,
        SHAPEFILE_VERSION,
        vec![Shape::Polygon(PolyContent::from_parts(vec![square()], None, None))],
    );

    let compact = compress(&model).unwrap();
    // One part of length five in the part table.
    assert_eq!(&compact[14..16], &1u16.to_le_bytes());
    assert_eq!(&compact[16..20], &5u32.to_le_bytes());

    let restored = decompress(&compact).unwrap();
    let Shape::Polygon(content) = &restored.records[0].shape else {
        panic!("Expected polygon, got {:?}", restored.records[0].shape);
    };
    assert_eq!(content.parts, vec![0]);
    assert_close(&content.points, &square());
}

#[test]
fn test_round_trip_preserves_structure() {
    let model = sample_model();
    let restored = decompress(&compress(&model).unwrap()).unwrap();

    assert_eq!(restored.shape_type, model.shape_type);
    assert_eq!(restored.records.len(), model.records.len());
    for (r, o) in restored.records.iter().zip(&model.records) {
        assert_eq!(r.number, o.number);
        assert_eq!(r.shape.shape_type(), o.shape.shape_type());
        assert_eq!(r.shape.points().len(), o.shape.points().len());
        assert_eq!(
            r.shape.poly().map(|c| c.parts.clone()),
            o.shape.poly().map(|c| c.parts.clone())
        );
        assert_close(r.shape.points(), o.shape.points());
    }
}

#[test]
fn test_round_trip_error_bound_across_globe() {
    let grid: Vec<Point> = (-18..=18)
        .flat_map(|i| (-9..=9).map(move |j| Point::new(i as f64 * 10.0 - 0.37, j as f64 * 10.0 + 0.21)))
        .map(Point::clamped)
        .collect();
    let model = ShapefileData::from_shapes(
        ShapeType::PolyLine,
        SHAPEFILE_VERSION,
        vec![Shape::PolyLine(PolyContent::from_parts(vec![grid.clone()], None, None))],
    );

    let restored = decompress(&compress(&model).unwrap()).unwrap();
    assert_close(restored.records[0].shape.points(), &grid);
}

#[test]
fn test_bounds_are_recomputed() {
    let restored = decompress(&compress(&sample_model()).unwrap()).unwrap();

    let all_points: Vec<Point> = restored
        .records
        .iter()
        .flat_map(|r| r.shape.points().iter().copied())
        .collect();
    assert_eq!(restored.bbox, BoundingBox::from_points(&all_points));

    for record in &restored.records {
        if let Some(content) = record.shape.poly() {
            assert_eq!(content.bbox, BoundingBox::from_points(&content.points));
        }
    }
}

#[test]
fn test_null_record_round_trip() {
    let restored = decompress(&compress(&sample_model()).unwrap()).unwrap();

    assert_eq!(restored.records[1].shape, Shape::Null);
    assert!(restored.records[1].shape.points().is_empty());
}

#[test]
fn test_version_tagging() {
    let plain = compress(&sample_model()).unwrap();
    assert_eq!(plain[0], 1);

    let z = vec![100.0, 200.0, 300.0, 400.0, 500.0];
    let m = vec![1.0, 2.0, 3.0, 4.0, 5.0];
    let model = ShapefileData::from_shapes(
        ShapeType::PolygonZ,
        SHAPEFILE_VERSION,
        vec![Shape::PolygonZ(PolyContent::from_parts(vec![square()], Some(z), Some(m)))],
    );
    assert_eq!(compress(&model).unwrap()[0], 2);
}

#[test]
fn test_z_and_m_round_trip() {
    let z = vec![100.25, 200.5, 300.75, 400.0, 100.25];
    let m = vec![0.1, 0.2, 0.3, 0.4, 0.5];
    let model = ShapefileData::from_shapes(
        ShapeType::PolygonZ,
        SHAPEFILE_VERSION,
        vec![
            Shape::PolygonZ(PolyContent::from_parts(vec![square()], Some(z.clone()), Some(m.clone()))),
            Shape::Null,
            Shape::PolygonZ(PolyContent::from_parts(vec![square()], Some(z.clone()), Some(m.clone()))),
        ],
    );

    let restored = decompress(&compress(&model).unwrap()).unwrap();
    for index in [0, 2] {
        let Shape::PolygonZ(content) = &restored.records[index].shape else {
            panic!("Expected PolygonZ");
        };
        let rz = &content.z.as_ref().unwrap().values;
        let rm = &content.m.as_ref().unwrap().values;
        for i in 0..5 {
            assert_eq!(rz[i], z[i] as f32 as f64);
            assert_eq!(rm[i], m[i] as f32 as f64);
        }
        assert_eq!(content.z.as_ref().unwrap().range, ValueRange { min: 100.25, max: 400.0 });
    }
    assert_eq!(restored.z_range, ValueRange { min: 100.25, max: 400.0 });
}

#[test]
fn test_decompress_rejects_bad_version() {
    let mut compact = compress(&sample_model()).unwrap();
    compact[0] = 3;

    assert!(matches!(
        decompress(&compact),
        Err(ShpzError::UnsupportedVersion(3))
    ));
}

#[test]
fn test_truncated_compact_buffer() {
    let compact = compress(&sample_model()).unwrap();

    for len in [0, 5, 13, 20, compact.len() - 1] {
        assert!(decompress(&compact[..len]).is_err(), "length {}", len);
    }
}

#[test]
fn test_non_compressible_type_passes_through_as_null() {
    let model = ShapefileData::from_shapes(
        ShapeType::MultiPoint,
        SHAPEFILE_VERSION,
        vec![Shape::MultiPoint(PolyContent {
            bbox: BoundingBox::from_points(&square()),
            points: square(),
            ..Default::default()
        })],
    );

    let restored = decompress(&compress(&model).unwrap()).unwrap();
    assert_eq!(restored.shape_type, ShapeType::MultiPoint);
    assert_eq!(restored.records.len(), 1);
    assert!(restored.records[0].shape.is_null());
}

#[test]
fn test_full_pipeline_back_to_container() {
    let original = parse(&encode(&sample_model()).unwrap()).unwrap();
    let restored = decompress(&compress(&original).unwrap()).unwrap();

    let rebuilt = parse(&encode(&restored).unwrap()).unwrap();
    assert_eq!(rebuilt, restored);
    assert_eq!(rebuilt.total_points(), original.total_points());
    assert_eq!(rebuilt.total_parts(), original.total_parts());
}

#[test]
fn test_compact_is_smaller() {
    let model = sample_model();
    let container = encode(&model).unwrap();
    let compact = compress(&model).unwrap();

    assert!(compact.len() * 4 < container.len());
}
