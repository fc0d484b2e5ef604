use nd_bridge::{ArrayAdapter, ArrayInterface, BridgeError, DType, NativeArray};
use pretty_assertions::assert_eq;

fn be_bytes(values: &[i32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

#[test]
fn test_json_document_round_trip() {
    let adapter = ArrayAdapter::new();
    let source = NativeArray::from_shape_vec(&[2, 2], vec![1.5f32, -2.0, 0.0, 8.25]).unwrap();

    let handle = adapter.create(&source).unwrap();
    let json = adapter.to_interface(&handle).unwrap().to_json().unwrap();

    let parsed = ArrayInterface::from_json(&json).unwrap();
    assert_eq!(parsed.version, 3);
    assert_eq!(parsed.shape, vec![2, 2]);
    assert_eq!(parsed.dtype().unwrap().0, DType::Float32);

    let rebuilt = adapter.create_from_interface(&parsed).unwrap();
    assert_eq!(adapter.to_native(&rebuilt).unwrap(), source);
}

#[test]
fn test_minimal_json_document() {
    let json = r#"{"shape": [3], "typestr": "|u1", "data": [7, 8, 9]}"#;
    let iface = ArrayInterface::from_json(json).unwrap();
    assert_eq!(iface.strides, None);
    assert_eq!(iface.offset, 0);

    let native = ArrayAdapter::new()
        .to_native(&ArrayAdapter::new().create_from_interface(&iface).unwrap())
        .unwrap();
    assert_eq!(native.to_flat_vec::<u8>().unwrap(), vec![7, 8, 9]);
}

#[test]
fn test_big_endian_document() {
    let iface = ArrayInterface::new(vec![3], ">i4", be_bytes(&[1, -2, 300]));

    let handle = ArrayAdapter::new().create_from_interface(&iface).unwrap();
    assert_eq!(handle.dtype(), DType::Int32);
    assert_eq!(handle.to_ndarray::<i32>().unwrap().iter().copied().collect::<Vec<_>>(), vec![1, -2, 300]);
}

#[test]
fn test_offset_and_negative_strides() {
    let data: Vec<u8> = (0u8..6).collect();
    // Reversed view over elements 1..=4
    let iface = ArrayInterface::new(vec![4], "|u1", data)
        .with_strides(vec![-1])
        .with_offset(4);

    let native = ArrayAdapter::new()
        .to_native(&ArrayAdapter::new().create_from_interface(&iface).unwrap())
        .unwrap();
    assert_eq!(native.to_flat_vec::<u8>().unwrap(), vec![4, 3, 2, 1]);
}

#[test]
fn test_rejected_documents() {
    let adapter = ArrayAdapter::new();

    let cases = vec![
        (ArrayInterface::new(vec![1], "<c16", vec![0; 16]), "unsupported"),
        (ArrayInterface::new(vec![1], "<f2", vec![0; 2]), "unsupported"),
        (ArrayInterface::new(vec![1], "<U4", vec![0; 16]), "unsupported"),
        (ArrayInterface::new(vec![2, -1], "<f8", vec![]), "shape"),
        (ArrayInterface::new(vec![4], "<f8", vec![0; 16]), "shape"),
        (ArrayInterface::new(vec![2, 2], "|u1", vec![0; 4]).with_strides(vec![1]), "shape"),
    ];

    for (iface, kind) in cases {
        let err = adapter.create_from_interface(&iface).unwrap_err();
        match kind {
            "unsupported" => assert!(
                matches!(err, BridgeError::UnsupportedDtype { .. }),
                "{}: {err}",
                iface.typestr
            ),
            _ => assert!(matches!(err, BridgeError::InvalidShape { .. }), "{:?}: {err}", iface.shape),
        }
    }
}

#[test]
fn test_dtype_checked_before_shape() {
    let iface = ArrayInterface::new(vec![-1], "<c8", vec![]);
    let err = ArrayAdapter::new().create_from_interface(&iface).unwrap_err();
    assert!(matches!(err, BridgeError::UnsupportedDtype { .. }));
}

#[test]
fn test_malformed_json() {
    let err = ArrayInterface::from_json(r#"{"shape": "wide"}"#).unwrap_err();
    assert!(matches!(err, BridgeError::Serialization { .. }));
}

#[test]
fn test_oversized_metadata_is_rejected() {
    let adapter = ArrayAdapter::new();

    let cases = vec![
        ArrayInterface::new(vec![1 << 61], "<f8", vec![]),
        ArrayInterface::new(vec![(1 << 62) + 1], "<i4", vec![0; 4]),
        ArrayInterface::new(vec![3], "<f8", vec![0; 24]).with_strides(vec![isize::MAX]),
        ArrayInterface::new(vec![1 << 40, 1 << 40], "|u1", vec![0; 8]).with_strides(vec![0, 0]),
    ];

    for iface in cases {
        let err = adapter.create_from_interface(&iface).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidShape { .. }), "{:?}: {err}", iface.shape);
    }
}

#[test]
fn test_zero_strides_broadcast() {
    let iface = ArrayInterface::new(vec![2, 3], "|i1", vec![5]).with_strides(vec![0, 0]);

    let native = ArrayAdapter::new()
        .to_native(&ArrayAdapter::new().create_from_interface(&iface).unwrap())
        .unwrap();
    assert_eq!(native.to_flat_vec::<i8>().unwrap(), vec![5; 6]);
}
