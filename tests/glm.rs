use gradix::approx::{approx_eq, FINITE_DIFF_ERROR};
use gradix::check::ErrorKind;
use gradix::matrix::Matrix;
use gradix::prim::normal_id_glm_lpdf;
use gradix::tape::Context;
use gradix::{matrix, vector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn scenario_expected() -> f64 {
    -1.5 * (2.0 * std::f64::consts::PI).ln() - 1.0
}

#[test]
fn test_concrete_scenario_plain() {
    let y = vector![1.0, 2.0, 3.0];
    let x = matrix!([[1.0], [1.0], [1.0]]);
    let logp = normal_id_glm_lpdf::<false, _, _, _, _, _>(&y, &x, &0.0, &2.0, &1.0).unwrap();
    assert!((logp - scenario_expected()).abs() < 1e-12);
}

#[test]
fn test_concrete_scenario_tracked_beta() {
    let ctx = Context::new();
    let y = vector![1.0, 2.0, 3.0];
    let x = matrix!([[1.0], [1.0], [1.0]]);
    let beta = ctx.matrix(vector![2.0]);
    let logp = normal_id_glm_lpdf::<false, _, _, _, _, _>(&y, &x, &0.0, &beta, &1.0).unwrap();
    assert!((logp.value() - scenario_expected()).abs() < 1e-12);
    assert_eq!(ctx.node_count(), 1);
    logp.backward();
    // residuals [-1, 0, 1] against a constant feature sum to zero
    assert!(approx_eq(&beta.adjoint().as_slice()[0], &0.0, 1e-12));
}

#[test]
fn test_propto_gradients_match() {
    let y_data = vec![0.5, 1.8, 3.2, 2.2];
    let x_data = matrix!([[1.0, 0.5], [1.0, -0.3], [1.0, 0.9], [1.0, 0.1]]);

    let run = |propto: bool| -> (f64, Vec<f64>) {
        let ctx = Context::new();
        let y = ctx.matrix(Matrix::column(y_data.clone()));
        let x = ctx.matrix(x_data.clone());
        let alpha = ctx.scalar(0.4);
        let beta = ctx.matrix(vector![1.5, -0.7]);
        let sigma = ctx.scalar(1.3);
        let logp = if propto {
            normal_id_glm_lpdf::<true, _, _, _, _, _>(&y, &x, &alpha, &beta, &sigma).unwrap()
        } else {
            normal_id_glm_lpdf::<false, _, _, _, _, _>(&y, &x, &alpha, &beta, &sigma).unwrap()
        };
        logp.backward();
        let mut grads = Vec::new();
        grads.extend_from_slice(y.adjoint().as_slice());
        grads.extend_from_slice(x.adjoint().as_slice());
        grads.push(alpha.adjoint());
        grads.extend_from_slice(beta.adjoint().as_slice());
        grads.push(sigma.adjoint());
        (logp.value(), grads)
    };

    let (value_full, grads_full) = run(false);
    let (value_propto, grads_propto) = run(true);

    // gradients are identical; the values differ by the dropped constant
    assert_eq!(grads_full, grads_propto);
    let dropped = -2.0 * (2.0 * std::f64::consts::PI).ln();
    assert!((value_full - value_propto - dropped).abs() < 1e-12);
}

#[test]
fn test_zero_length_short_circuit_skips_validation() {
    let y = Matrix::column(Vec::new());
    let x = Matrix::new(0, 1, Vec::new());
    // sigma is invalid but unused: the short-circuit precedes validation
    let logp = normal_id_glm_lpdf::<false, _, _, _, _, _>(&y, &x, &0.0, &1.0, &-1.0).unwrap();
    assert_eq!(logp, 0.0);
}

#[test]
fn test_zero_length_short_circuit_tracked() {
    let ctx = Context::new();
    let y = ctx.matrix(Matrix::column(Vec::new()));
    let x = Matrix::new(0, 1, Vec::new());
    let logp = normal_id_glm_lpdf::<false, _, _, _, _, _>(&y, &x, &0.0, &1.0, &1.0).unwrap();
    assert_eq!(logp.value(), 0.0);
}

#[test]
fn test_nonpositive_scale_is_domain_error_without_tape_mutation() {
    let ctx = Context::new();
    let y = ctx.matrix(vector![1.0, 2.0]);
    let x = matrix!([[1.0], [1.0]]);
    let before = ctx.node_count();
    let err = normal_id_glm_lpdf::<false, _, _, _, _, _>(&y, &x, &0.0, &2.0, &0.0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Domain);
    assert_eq!(err.name(), "Scale vector");
    assert_eq!(ctx.node_count(), before);
}

#[test]
fn test_non_finite_y_is_domain_error() {
    let y = vector![1.0, f64::NAN];
    let x = matrix!([[1.0], [1.0]]);
    let err = normal_id_glm_lpdf::<false, _, _, _, _, _>(&y, &x, &0.0, &2.0, &1.0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Domain);
    assert_eq!(err.name(), "Vector of dependent variables");
}

#[test]
fn test_size_mismatch_names_argument() {
    let y = vector![1.0, 2.0];
    let x = matrix!([[1.0], [1.0], [1.0]]);
    let err = normal_id_glm_lpdf::<false, _, _, _, _, _>(&y, &x, &0.0, &2.0, &1.0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SizeMismatch);
    assert_eq!(err.name(), "Vector of dependent variables");
}

#[test]
fn test_propto_all_plain_is_zero() {
    let y = vector![1.0, 2.0, 3.0];
    let x = matrix!([[1.0], [1.0], [1.0]]);
    let logp = normal_id_glm_lpdf::<true, _, _, _, _, _>(&y, &x, &0.0, &2.0, &1.0).unwrap();
    assert_eq!(logp, 0.0);
}

#[test]
fn test_vector_alpha_and_heteroskedastic_sigma() {
    let ctx = Context::new();
    let y = vector![1.0, 2.0, 3.0];
    let x = matrix!([[1.0], [1.0], [1.0]]);
    let alpha = ctx.matrix(vector![0.1, -0.2, 0.3]);
    let sigma = ctx.matrix(vector![1.0, 2.0, 0.5]);
    let logp = normal_id_glm_lpdf::<false, _, _, _, _, _>(&y, &x, &alpha, &2.0, &sigma).unwrap();
    logp.backward();

    let y_v = [1.0, 2.0, 3.0];
    let s_v = [1.0, 2.0, 0.5];
    let mu = [0.1 + 2.0, -0.2 + 2.0, 0.3 + 2.0];
    let z: Vec<f64> = (0..3).map(|i| (y_v[i] - mu[i]) / s_v[i]).collect();

    let expected_alpha: Vec<f64> = (0..3).map(|i| z[i] / s_v[i]).collect();
    assert!(approx_eq(
        alpha.adjoint().as_slice(),
        expected_alpha.as_slice(),
        1e-12
    ));

    let expected_sigma: Vec<f64> = (0..3).map(|i| (z[i] * z[i] - 1.0) / s_v[i]).collect();
    assert!(approx_eq(
        sigma.adjoint().as_slice(),
        expected_sigma.as_slice(),
        1e-12
    ));

    let expected_value = -1.5 * (2.0 * std::f64::consts::PI).ln()
        - s_v.iter().map(|s| s.ln()).sum::<f64>()
        - 0.5 * z.iter().map(|v| v * v).sum::<f64>();
    assert!((logp.value() - expected_value).abs() < 1e-12);
}

#[test]
fn test_gradients_match_finite_differences() {
    let mut rng = StdRng::seed_from_u64(42);
    let n = 5;
    let m = 3;
    let y_data: Vec<f64> = (0..n).map(|_| rng.random_range(-2.0..2.0)).collect();
    let x_data: Vec<f64> = (0..n * m).map(|_| rng.random_range(-1.0..1.0)).collect();
    let beta_data: Vec<f64> = (0..m).map(|_| rng.random_range(-1.0..1.0)).collect();
    let alpha0 = 0.3;
    let sigma0 = 0.9;

    let eval = |beta_v: &[f64]| -> f64 {
        let y = Matrix::column(y_data.clone());
        let x = Matrix::new(n, m, x_data.clone());
        let beta = Matrix::column(beta_v.to_vec());
        normal_id_glm_lpdf::<false, _, _, _, _, _>(&y, &x, &alpha0, &beta, &sigma0).unwrap()
    };

    let ctx = Context::new();
    let y = Matrix::column(y_data.clone());
    let x = Matrix::new(n, m, x_data.clone());
    let beta = ctx.matrix(Matrix::column(beta_data.clone()));
    let logp = normal_id_glm_lpdf::<false, _, _, _, _, _>(&y, &x, &alpha0, &beta, &sigma0).unwrap();
    logp.backward();
    let grad = beta.adjoint();

    let eps = 1e-6;
    for k in 0..m {
        let mut plus = beta_data.clone();
        plus[k] += eps;
        let mut minus = beta_data.clone();
        minus[k] -= eps;
        let fd = (eval(&plus) - eval(&minus)) / (2.0 * eps);
        assert!(
            approx_eq(&grad.as_slice()[k], &fd, FINITE_DIFF_ERROR),
            "gradient {k}: analytic {} vs finite difference {fd}",
            grad.as_slice()[k]
        );
    }
}
