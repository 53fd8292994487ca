//! Tests for the worker wire protocol

use bincode::Options;
use fieldsplit_core_rs::protocol::{
    decode_fields, decode_request, encode_fields, encode_request, read_fields, read_request,
    write_fields, write_request, FrameKind, ProtocolError, FORMAT_VERSION, HEADER_LEN, MAGIC,
};
use fieldsplit_core_rs::{BinaryType, FieldName, Fields, Grid, InterpolationRequest, FIELD_COUNT};
use proptest::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

fn sample_request() -> InterpolationRequest {
    let grid = Grid::new(vec![0.0, 1.5, -2.0], vec![0.25, 0.5, 0.75], vec![9.0, 8.0, 7.0]).unwrap();
    InterpolationRequest::new(BinaryType::Bhns, grid, "/data/bhns/run.info")
        .with_interpolation_offset(0.125)
        .with_interpolation_order(6)
        .with_relative_dr_spacing(0.2)
}

fn sample_fields(n: usize) -> Fields {
    Fields::from_fn(n, |name, i| name.index() as f64 + i as f64 / 8.0).unwrap()
}

/// Frame an arbitrary body the way the codec does
fn frame<T: Serialize>(kind: FrameKind, body: &T) -> Vec<u8> {
    let mut bytes = MAGIC.to_vec();
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes.push(kind as u8);
    bytes.extend(
        bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .with_little_endian()
            .serialize(body)
            .unwrap(),
    );
    bytes
}

/// Request body with every field spelled out, for crafting bad payloads
#[derive(Serialize)]
struct RawRequest {
    binary_type: u32,
    grid: RawGrid,
    info_filename: String,
    interpolation_offset: f64,
    interpolation_order: i32,
    relative_dr_spacing: f64,
}

#[derive(Serialize)]
struct RawGrid {
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
}

fn raw_request(x: Vec<f64>, y: Vec<f64>, z: Vec<f64>) -> RawRequest {
    RawRequest {
        binary_type: 0,
        grid: RawGrid { x, y, z },
        info_filename: "bns.info".to_string(),
        interpolation_offset: 0.0,
        interpolation_order: 8,
        relative_dr_spacing: 0.3,
    }
}

// ============================================================================
// Round trips
// ============================================================================

#[test]
fn test_request_round_trip() {
    let request = sample_request();
    let bytes = encode_request(&request).unwrap();
    assert_eq!(&bytes[..4], &MAGIC);
    assert_eq!(bytes[6], FrameKind::Request as u8);
    assert_eq!(decode_request(&bytes).unwrap(), request);
}

#[test]
fn test_fields_round_trip() {
    let fields = sample_fields(5);
    let bytes = encode_fields(&fields).unwrap();
    assert_eq!(decode_fields(&bytes).unwrap(), fields);
}

#[test]
fn test_hand_built_request_body_is_accepted() {
    let bytes = frame(
        FrameKind::Request,
        &raw_request(vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]),
    );
    let request = decode_request(&bytes).unwrap();
    assert_eq!(request.binary_type, BinaryType::Bns);
    assert_eq!(request.grid.y(), &[3.0, 4.0]);
    assert_eq!(request.interpolation_order, 8);
}

#[test]
fn test_stream_helpers() {
    let request = sample_request();
    let mut buffer = Vec::new();
    write_request(&mut buffer, &request).unwrap();
    assert_eq!(read_request(buffer.as_slice()).unwrap(), request);

    let fields = sample_fields(2);
    let mut buffer = Vec::new();
    write_fields(&mut buffer, &fields).unwrap();
    assert_eq!(read_fields(buffer.as_slice()).unwrap(), fields);
}

// ============================================================================
// Header failures
// ============================================================================

#[test]
fn test_empty_input_is_truncated_header() {
    assert!(matches!(
        decode_request(&[]),
        Err(ProtocolError::TruncatedHeader { actual: 0 })
    ));
    assert!(matches!(
        decode_fields(&MAGIC),
        Err(ProtocolError::TruncatedHeader { actual: 4 })
    ));
}

#[test]
fn test_bad_magic() {
    let mut bytes = encode_request(&sample_request()).unwrap();
    bytes[0] = b'X';
    assert!(matches!(
        decode_request(&bytes),
        Err(ProtocolError::BadMagic { found }) if &found == b"XSPL"
    ));
}

#[test]
fn test_unsupported_version() {
    let mut bytes = encode_fields(&sample_fields(1)).unwrap();
    bytes[4..6].copy_from_slice(&(FORMAT_VERSION + 1).to_le_bytes());
    assert!(matches!(
        decode_fields(&bytes),
        Err(ProtocolError::UnsupportedVersion { found }) if found == FORMAT_VERSION + 1
    ));
}

#[test]
fn test_frame_kinds_are_not_interchangeable() {
    let request_bytes = encode_request(&sample_request()).unwrap();
    assert!(matches!(
        decode_fields(&request_bytes),
        Err(ProtocolError::UnexpectedFrame {
            expected: FrameKind::Fields,
            found: FrameKind::Request
        })
    ));

    let mut bytes = request_bytes;
    bytes[6] = 42;
    assert!(matches!(
        decode_request(&bytes),
        Err(ProtocolError::UnknownFrameKind(42))
    ));
}

// ============================================================================
// Body failures
// ============================================================================

#[test]
fn test_truncated_body() {
    let bytes = encode_fields(&sample_fields(4)).unwrap();
    for cut in [HEADER_LEN, HEADER_LEN + 3, bytes.len() - 1] {
        assert!(
            matches!(
                decode_fields(&bytes[..cut]),
                Err(ProtocolError::TruncatedBody { kind: FrameKind::Fields })
            ),
            "cut at {cut}"
        );
    }
}

#[test]
fn test_trailing_bytes_rejected() {
    let mut bytes = encode_request(&sample_request()).unwrap();
    bytes.push(0);
    assert!(matches!(decode_request(&bytes), Err(ProtocolError::Malformed { .. })));
}

#[test]
fn test_unknown_binary_type_tag() {
    let mut bytes = encode_request(&sample_request()).unwrap();
    bytes[HEADER_LEN..HEADER_LEN + 4].copy_from_slice(&9u32.to_le_bytes());
    assert!(matches!(
        decode_request(&bytes),
        Err(ProtocolError::Malformed { kind: FrameKind::Request, .. })
    ));
}

#[test]
fn test_invalid_grids_rejected() {
    let ragged = frame(
        FrameKind::Request,
        &raw_request(vec![1.0, 2.0], vec![1.0], vec![1.0, 2.0]),
    );
    assert!(matches!(decode_request(&ragged), Err(ProtocolError::Malformed { .. })));

    let empty = frame(FrameKind::Request, &raw_request(vec![], vec![], vec![]));
    assert!(matches!(decode_request(&empty), Err(ProtocolError::Malformed { .. })));
}

#[test]
fn test_unknown_field_name_rejected() {
    let mut bytes = encode_fields(&sample_fields(2)).unwrap();
    let at = bytes
        .windows(5)
        .position(|window| window == b"alpha")
        .unwrap();
    bytes[at..at + 5].copy_from_slice(b"alphz");
    let err = decode_fields(&bytes).unwrap_err();
    assert!(matches!(err, ProtocolError::Malformed { .. }));
    assert!(err.to_string().contains("alphz"));
}

#[test]
fn test_missing_field_rejected() {
    let mut columns: BTreeMap<&str, Vec<f64>> = FieldName::ALL
        .into_iter()
        .map(|name| (name.as_str(), vec![1.0, 2.0]))
        .collect();
    columns.remove("pressure");
    let err = decode_fields(&frame(FrameKind::Fields, &columns)).unwrap_err();
    assert!(err.to_string().contains("pressure"), "{err}");
}

#[test]
fn test_repeated_field_rejected() {
    // Same bytes as a map body: entry count, then name/value pairs.
    let mut entries: Vec<(&str, Vec<f64>)> = FieldName::ALL
        .into_iter()
        .map(|name| (name.as_str(), vec![1.0]))
        .collect();
    entries.push(("alpha", vec![2.0]));
    assert_eq!(entries.len(), FIELD_COUNT + 1);

    let err = decode_fields(&frame(FrameKind::Fields, &entries)).unwrap_err();
    assert!(matches!(err, ProtocolError::Malformed { kind: FrameKind::Fields, .. }));
    assert!(err.to_string().contains("more than once"), "{err}");
}

#[test]
fn test_unequal_field_lengths_rejected() {
    let mut columns: BTreeMap<&str, Vec<f64>> = FieldName::ALL
        .into_iter()
        .map(|name| (name.as_str(), vec![1.0, 2.0, 3.0]))
        .collect();
    columns.insert("K_yz", vec![1.0]);
    assert_eq!(columns.len(), FIELD_COUNT);
    assert!(matches!(
        decode_fields(&frame(FrameKind::Fields, &columns)),
        Err(ProtocolError::Malformed { .. })
    ));
}

#[cfg(unix)]
#[test]
fn test_non_utf8_path_fails_to_encode() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let mut request = sample_request();
    request.info_filename = OsStr::from_bytes(b"/data/\xff.info").into();
    let err = encode_request(&request).unwrap_err();
    assert!(err.is_encode());
}

// ============================================================================
// Properties
// ============================================================================

fn bits(values: &[f64]) -> Vec<u64> {
    values.iter().map(|v| v.to_bits()).collect()
}

fn binary_type() -> impl Strategy<Value = BinaryType> {
    prop_oneof![
        Just(BinaryType::Bns),
        Just(BinaryType::Bbh),
        Just(BinaryType::Bhns)
    ]
}

proptest! {
    #[test]
    fn prop_request_round_trip_is_bit_exact(
        coords in prop::collection::vec((any::<f64>(), any::<f64>(), any::<f64>()), 1..64),
        kind in binary_type(),
        path in "[a-zA-Z0-9_/.]{1,40}",
        offset in any::<f64>(),
        order in any::<i32>(),
        spacing in any::<f64>(),
    ) {
        let x: Vec<f64> = coords.iter().map(|c| c.0).collect();
        let y: Vec<f64> = coords.iter().map(|c| c.1).collect();
        let z: Vec<f64> = coords.iter().map(|c| c.2).collect();
        let request = InterpolationRequest::new(kind, Grid::new(x, y, z).unwrap(), path)
            .with_interpolation_offset(offset)
            .with_interpolation_order(order)
            .with_relative_dr_spacing(spacing);

        let decoded = decode_request(&encode_request(&request).unwrap()).unwrap();
        prop_assert_eq!(decoded.binary_type, request.binary_type);
        prop_assert_eq!(&decoded.info_filename, &request.info_filename);
        prop_assert_eq!(decoded.interpolation_order, request.interpolation_order);
        prop_assert_eq!(decoded.interpolation_offset.to_bits(), offset.to_bits());
        prop_assert_eq!(decoded.relative_dr_spacing.to_bits(), spacing.to_bits());
        prop_assert_eq!(bits(decoded.grid.x()), bits(request.grid.x()));
        prop_assert_eq!(bits(decoded.grid.y()), bits(request.grid.y()));
        prop_assert_eq!(bits(decoded.grid.z()), bits(request.grid.z()));
    }

    #[test]
    fn prop_fields_round_trip_is_bit_exact(
        values in prop::collection::vec(any::<f64>(), FIELD_COUNT..FIELD_COUNT * 16),
    ) {
        let n = values.len() / FIELD_COUNT;
        let fields = Fields::from_fn(n, |name, i| values[name.index() * n + i]).unwrap();

        let decoded = decode_fields(&encode_fields(&fields).unwrap()).unwrap();
        prop_assert_eq!(decoded.n_points(), n);
        for name in FieldName::ALL {
            prop_assert_eq!(bits(decoded.get(name)), bits(fields.get(name)));
        }
    }
}
