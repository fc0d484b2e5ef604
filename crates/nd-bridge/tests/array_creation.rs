use nd_bridge::{create, to_native, ArrayHandle, BridgeError, DType, NativeArray};
use ndarray::{Array, ArrayD, Axis, IxDyn};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SEED: u64 = 0x5EED_0A11;

struct Fixture {
    x_native: NativeArray,
    x_handle: ArrayHandle,
    x_native_2: NativeArray,
}

fn random_floats(rng: &mut StdRng, shape: &[usize]) -> ArrayD<f64> {
    let len = shape.iter().product();
    let values: Vec<f64> = (0..len).map(|_| rng.gen::<f64>()).collect();
    ArrayD::from_shape_vec(IxDyn(shape), values).unwrap()
}

fn setup(shape: &[usize]) -> Fixture {
    let mut rng = StdRng::seed_from_u64(SEED);
    let x_native = NativeArray::from(random_floats(&mut rng, shape));
    let x_handle = create(&x_native).unwrap();
    let x_native_2 = to_native(&x_handle).unwrap();

    Fixture {
        x_native,
        x_handle,
        x_native_2,
    }
}

#[test]
fn test_array_creation() {
    let fx = setup(&[100, 32, 16]);

    assert_eq!(fx.x_handle.shape(), &[100, 32, 16]);
    assert_eq!(fx.x_native_2.shape(), fx.x_native.shape());

    let original = fx.x_native.to_flat_vec::<f64>().unwrap();
    let exported = fx.x_native_2.to_flat_vec::<f64>().unwrap();
    assert_eq!(exported.len(), 100 * 32 * 16);
    assert!(original.iter().all(|v| (0.0..1.0).contains(v)));
    assert_eq!(exported, original);
}

#[test]
fn test_source_is_untouched() {
    let fx = setup(&[100, 32, 16]);
    let before = fx.x_native.clone();

    let _again = create(&fx.x_native).unwrap();
    assert_eq!(fx.x_native, before);
}

#[test]
fn test_export_twice_is_equal() {
    let fx = setup(&[100, 32, 16]);
    let second = to_native(&fx.x_handle).unwrap();
    assert_eq!(second, fx.x_native_2);
}

#[test]
fn test_empty_array() {
    let fx = setup(&[0]);

    assert_eq!(fx.x_handle.shape(), &[0]);
    assert_eq!(fx.x_handle.size(), 0);
    assert_eq!(fx.x_native_2.shape(), &[0]);
    assert!(fx.x_native_2.to_flat_vec::<f64>().unwrap().is_empty());
}

#[test]
fn test_empty_inner_dimension() {
    let source = NativeArray::from(ArrayD::<i32>::zeros(IxDyn(&[4, 0, 3])));
    let exported = to_native(&create(&source).unwrap()).unwrap();

    assert_eq!(exported.shape(), &[4, 0, 3]);
    assert!(exported.is_empty());
}

#[test]
fn test_zero_dimensional_array() {
    let source = NativeArray::from_shape_vec(&[], vec![0.25f64]).unwrap();
    let handle = create(&source).unwrap();
    let exported = to_native(&handle).unwrap();

    assert_eq!(handle.ndim(), 0);
    assert_eq!(handle.size(), 1);
    assert_eq!(exported.shape(), &[] as &[usize]);
    assert_eq!(exported.to_flat_vec::<f64>().unwrap(), vec![0.25]);
}

#[test]
fn test_fortran_ordered_source() {
    let mut rng = StdRng::seed_from_u64(SEED);
    let c_order = random_floats(&mut rng, &[6, 5, 4]);
    // Same logical array, column-major storage
    let f_order = c_order.t().as_standard_layout().reversed_axes().into_owned();
    assert!(!f_order.is_standard_layout());

    let source = NativeArray::from(f_order);
    let exported = to_native(&create(&source).unwrap()).unwrap();

    assert_eq!(exported.shape(), &[6, 5, 4]);
    assert!(exported.is_standard_layout());
    assert_eq!(
        exported.to_flat_vec::<f64>().unwrap(),
        c_order.iter().copied().collect::<Vec<_>>()
    );
}

#[test]
fn test_strided_view_source() {
    let base = Array::from_shape_fn((8, 6), |(i, j)| (i * 10 + j) as u16);
    let every_other = base.slice(ndarray::s![..;2, 1..;2]);

    let handle = nd_bridge::ArrayAdapter::new().create_from_array(&every_other).unwrap();
    assert_eq!(handle.shape(), &[4, 3]);
    assert_eq!(handle.dtype(), DType::UInt16);

    let exported = to_native(&handle).unwrap();
    assert_eq!(
        exported.to_flat_vec::<u16>().unwrap(),
        vec![1, 3, 5, 21, 23, 25, 41, 43, 45, 61, 63, 65]
    );
}

#[test]
fn test_random_shapes_round_trip() {
    let mut rng = StdRng::seed_from_u64(SEED ^ 0xFF);

    for _ in 0..32 {
        let ndim = rng.gen_range(0..=4);
        let shape: Vec<usize> = (0..ndim).map(|_| rng.gen_range(0..=5)).collect();
        let source = NativeArray::from(random_floats(&mut rng, &shape));

        let exported = to_native(&create(&source).unwrap()).unwrap();
        assert_eq!(exported.shape(), shape.as_slice());
        assert_eq!(exported, source, "shape {:?}", shape);
    }
}

#[test]
fn test_handle_outlives_source() {
    let handle = {
        let fx = setup(&[3, 3]);
        fx.x_handle
    };

    let exported = to_native(&handle).unwrap();
    assert_eq!(exported.shape(), &[3, 3]);
}

#[test]
fn test_views_export_their_own_elements() {
    let source = NativeArray::from_shape_vec(&[2, 3], vec![1i64, 2, 3, 4, 5, 6]).unwrap();
    let handle = create(&source).unwrap();

    let transposed = handle.transpose();
    assert!(transposed.shares_buffer_with(&handle));
    assert_eq!(
        to_native(&transposed).unwrap().to_flat_vec::<i64>().unwrap(),
        vec![1, 4, 2, 5, 3, 6]
    );

    let row = handle.slice(&[1, 0], &[2, 3]).unwrap();
    assert_eq!(to_native(&row).unwrap().to_flat_vec::<i64>().unwrap(), vec![4, 5, 6]);

    let summed: i64 = to_native(&handle)
        .unwrap()
        .into_typed::<i64>()
        .unwrap()
        .sum_axis(Axis(0))
        .iter()
        .sum();
    assert_eq!(summed, 21);
}

#[test]
fn test_wrong_element_type_on_export() {
    let fx = setup(&[2]);
    let err = fx.x_native_2.to_flat_vec::<f32>().unwrap_err();
    assert!(matches!(err, BridgeError::DtypeMismatch { .. }));
    assert!(err.is_type_error());
}
