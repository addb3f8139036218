use gradix::approx::{approx_eq, DEVICE_PARITY_ERROR};
use gradix::check::ErrorKind;
use gradix::expr::{DeviceMatrix, Expr};
use gradix::matrix::Matrix;
use gradix::prim::{head, sum};
use gradix::tape::Context;
use gradix::vector;

#[test]
fn test_head_size_column() {
    let v = Matrix::column(vec![0.0; 3]);
    assert_eq!(head(&v, 0).unwrap().len(), 0);
    assert_eq!(head(&v, 3).unwrap().len(), 3);
    let err = head(&v, 4).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Range);
}

#[test]
fn test_head_size_row() {
    let rv = Matrix::row(vec![0.0; 3]);
    assert_eq!(head(&rv, 0).unwrap().len(), 0);
    assert_eq!(head(&rv, 3).unwrap().len(), 3);
    assert!(head(&rv, 4).is_err());
}

#[test]
fn test_head_size_tracked() {
    let ctx = Context::new();
    let v = ctx.matrix(Matrix::column(vec![0.0; 3]));
    assert_eq!(head(&v, 0).unwrap().len(), 0);
    assert_eq!(head(&v, 3).unwrap().len(), 3);
    assert!(head(&v, 4).is_err());
}

#[test]
fn test_head_size_device_tracked() {
    let ctx = Context::new();
    let v = ctx.device_matrix(DeviceMatrix::new(3, 1, vec![0.0; 3]));
    assert_eq!(head(&v, 0).unwrap().len(), 0);
    assert_eq!(head(&v, 3).unwrap().len(), 3);
    assert!(head(&v, 4).is_err());

    let rv = ctx.device_matrix(DeviceMatrix::new(1, 3, vec![0.0; 3]));
    assert_eq!(head(&rv, 0).unwrap().len(), 0);
    assert_eq!(head(&rv, 3).unwrap().len(), 3);
    assert!(head(&rv, 4).is_err());
}

#[test]
fn test_head_values_and_orientation() {
    let v = vector![1.0, 2.0, 3.0];
    let h = head(&v, 2).unwrap();
    assert_eq!(h.rows(), 2);
    assert_eq!(h.cols(), 1);
    assert_eq!(h.as_slice(), &[1.0, 2.0]);

    let rv = Matrix::row(vec![1.0, 2.0, 3.0]);
    let rh = head(&rv, 2).unwrap();
    assert_eq!(rh.rows(), 1);
    assert_eq!(rh.cols(), 2);
    assert_eq!(rh.as_slice(), &[1.0, 2.0]);
}

#[test]
fn test_head_of_empty_vector() {
    let v = Matrix::column(Vec::new());
    let h = head(&v, 0).unwrap();
    assert!(h.is_empty());
}

#[test]
fn test_head_non_vector_rejected() {
    let m = Matrix::new(2, 2, vec![1.0, 2.0, 3.0, 4.0]);
    let err = head(&m, 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SizeMismatch);
}

#[test]
fn test_head_out_of_range_leaves_tape_unchanged() {
    let ctx = Context::new();
    let v = ctx.matrix(vector![1.0, 2.0, 3.0]);
    assert!(head(&v, 10).is_err());
    assert_eq!(ctx.node_count(), 0);
}

#[test]
fn test_head_host_device_parity_column() {
    let m1: Vec<f64> = (1..=9).map(|v| v as f64).collect();

    let host = head(&Matrix::column(m1.clone()), 5).unwrap();
    let dm = DeviceMatrix::new(9, 1, m1.clone());
    let dev = head(&Expr::load(&dm), 5).unwrap().eval();
    assert!(approx_eq(&host, &dev.to_matrix(), DEVICE_PARITY_ERROR));

    let ctx = Context::new();
    let m2 = ctx.matrix(Matrix::column(m1.clone()));
    let m3 = ctx.device_matrix(DeviceMatrix::new(9, 1, m1.clone()));
    let m2_res = head(&m2, 5).unwrap();
    let m3_res = head(&m3, 5).unwrap();
    assert!(approx_eq(
        m2_res.value(),
        &m3_res.value().to_matrix(),
        DEVICE_PARITY_ERROR
    ));

    let s = &sum(&m2_res) + &sum(&m3_res);
    s.backward();
    assert!(approx_eq(&m2.adjoint(), &m3.adjoint(), DEVICE_PARITY_ERROR));
    assert_eq!(
        m2.adjoint().as_slice(),
        &[1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0]
    );
}

#[test]
fn test_head_host_device_parity_row() {
    let m1: Vec<f64> = (1..=9).map(|v| v as f64).collect();

    let host = head(&Matrix::row(m1.clone()), 5).unwrap();
    let dm = DeviceMatrix::new(1, 9, m1.clone());
    let dev = head(&Expr::load(&dm), 5).unwrap().eval();
    assert_eq!(dev.rows(), 1);
    assert_eq!(dev.cols(), 5);
    assert!(approx_eq(&host, &dev.to_matrix(), DEVICE_PARITY_ERROR));

    let ctx = Context::new();
    let m2 = ctx.matrix(Matrix::row(m1.clone()));
    let m3 = ctx.device_matrix(DeviceMatrix::new(1, 9, m1));
    let m2_res = head(&m2, 5).unwrap();
    let m3_res = head(&m3, 5).unwrap();
    let s = &sum(&m2_res) + &sum(&m3_res);
    s.backward();
    assert!(approx_eq(&m2.adjoint(), &m3.adjoint(), DEVICE_PARITY_ERROR));
}

#[test]
fn test_block_bounds_validated_eagerly() {
    let dm = DeviceMatrix::new(3, 2, vec![0.0; 6]);
    let e = Expr::load(&dm);
    assert_eq!(e.rows(), 3);
    assert_eq!(e.cols(), 2);
    assert!(e.block(0, 0, 3, 2).is_ok());
    let err = e.block(2, 0, 2, 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Range);
    assert!(e.block(0, 1, 1, 2).is_err());
}

#[test]
fn test_fused_expression_single_evaluation() {
    let a = DeviceMatrix::new(4, 1, vec![1.0, 2.0, 3.0, 4.0]);
    let b = DeviceMatrix::new(2, 1, vec![10.0, 20.0]);
    let fused = head(&Expr::load(&a), 2)
        .unwrap()
        .add(&Expr::load(&b))
        .unwrap()
        .scale(0.5);
    assert_eq!(fused.rows(), 2);
    assert_eq!(fused.cols(), 1);
    let out = fused.eval();
    assert_eq!(out.as_slice(), &[5.5, 11.0]);
}

#[test]
fn test_elementwise_sub_mul() {
    let a = DeviceMatrix::new(2, 2, vec![5.0, 6.0, 7.0, 8.0]);
    let b = DeviceMatrix::new(2, 2, vec![1.0, 2.0, 3.0, 4.0]);
    let e = Expr::load(&a)
        .sub(&Expr::load(&b))
        .unwrap()
        .mul(&Expr::load(&b))
        .unwrap();
    assert_eq!(e.eval().as_slice(), &[4.0, 8.0, 12.0, 16.0]);
}

#[test]
fn test_elementwise_size_mismatch() {
    let a = DeviceMatrix::new(2, 2, vec![0.0; 4]);
    let c = DeviceMatrix::new(3, 1, vec![0.0; 3]);
    let err = Expr::load(&a).add(&Expr::load(&c)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SizeMismatch);
}

#[test]
fn test_backend_selector_roundtrip() {
    use gradix::backend::{get_backend, set_backend, Backend};
    set_backend(Backend::Wgpu);
    assert_eq!(get_backend(), Backend::Wgpu);
    set_backend(Backend::Cpu);
    assert_eq!(get_backend(), Backend::Cpu);
}
