//! Log-density of the normal linear model with identity link.

use crate::check::{
    check_consistent_size, check_finite, check_positive_finite, check_vector, MathError,
};
use crate::kind::{DesignMatrix, LpdfKind, Operand, Or, Or2, OutputKind};
use crate::matrix::Matrix;
use crate::partials::OperandsAndPartials;

const FUNCTION: &str = "normal_id_glm_lpdf";

const NEG_LOG_SQRT_TWO_PI: f64 = -0.918_938_533_204_672_741_8;

/// Returns the log density of the generalized linear model with normal
/// distribution and identity link: the observations `y` around the
/// predicted mean `alpha + x * beta` with scale `sigma`, summed over
/// observations.
///
/// Computes a more efficient version of a normal log-density over
/// `alpha + x * beta` by using analytically simplified gradients: however
/// many observations and features there are, one call records one tape
/// node.
///
/// Every argument is independently plain or tracked; `alpha`, `beta` and
/// `sigma` may each be a scalar or a vector (a vector `alpha` gives
/// per-observation intercepts, a vector `sigma` heteroskedasticity).
/// Scalars broadcast. The result is plain iff every argument is plain.
///
/// With `PROPTO = true`, additive terms that do not depend on any tracked
/// argument are omitted; gradients are unaffected, only the returned
/// value differs by a constant offset.
///
/// If `y`, `x`, `beta`, or `sigma` has length zero the result is exactly
/// 0, before any validation of the remaining arguments.
///
/// # Errors
/// - Domain error if `y`, `x`, `alpha`, or `beta` is non-finite, or if
///   any `sigma` is not strictly positive finite.
/// - Size-mismatch error if a vector argument's length is inconsistent
///   with the extents of `x`.
///
/// A failed call leaves the tape untouched.
///
/// # Example
/// ```
/// use gradix::prim::normal_id_glm_lpdf;
/// use gradix::{matrix, vector};
///
/// let y = vector![1.0, 2.0, 3.0];
/// let x = matrix!([[1.0], [1.0], [1.0]]);
/// let logp = normal_id_glm_lpdf::<false, _, _, _, _, _>(&y, &x, &0.0, &2.0, &1.0).unwrap();
/// let expected = -1.5 * (2.0 * std::f64::consts::PI).ln() - 1.0;
/// assert!((logp - expected).abs() < 1e-12);
/// ```
pub fn normal_id_glm_lpdf<const PROPTO: bool, Y, X, A, B, S>(
    y: &Y,
    x: &X,
    alpha: &A,
    beta: &B,
    sigma: &S,
) -> Result<<LpdfKind<Y, X, A, B, S> as OutputKind>::Output, MathError>
where
    Y: Operand,
    X: DesignMatrix,
    A: Operand,
    B: Operand,
    S: Operand,
    Y::Kind: Or<X::Kind>,
    Or2<Y::Kind, X::Kind>: Or<A::Kind>,
    Or2<Or2<Y::Kind, X::Kind>, A::Kind>: Or<B::Kind>,
    Or2<Or2<Or2<Y::Kind, X::Kind>, A::Kind>, B::Kind>: Or<S::Kind>,
    LpdfKind<Y, X, A, B, S>: OutputKind,
{
    let n_obs = x.rows();
    let n_feat = x.cols();

    let ctx = y
        .context()
        .or_else(|| x.context())
        .or_else(|| alpha.context())
        .or_else(|| beta.context())
        .or_else(|| sigma.context());
    let mut partials = OperandsAndPartials::new(ctx);

    // Zero-length containers short-circuit to exactly zero before any
    // validation of the remaining arguments.
    if y.len() == Some(0) || n_obs * n_feat == 0 || beta.len() == Some(0) || sigma.len() == Some(0)
    {
        return Ok(partials.build::<LpdfKind<Y, X, A, B, S>>(0.0));
    }

    let y_val = operand_values(y);
    let beta_val = operand_values(beta);
    let alpha_val = operand_values(alpha);
    let sigma_val = operand_values(sigma);
    let mut x_val = Vec::with_capacity(n_obs * n_feat);
    for i in 0..n_obs {
        for m in 0..n_feat {
            x_val.push(x.value_at(i, m));
        }
    }

    if let Some((r, c)) = y.dims() {
        check_vector(FUNCTION, "Vector of dependent variables", r, c)?;
    }
    if let Some((r, c)) = alpha.dims() {
        check_vector(FUNCTION, "Vector of intercepts", r, c)?;
    }
    if let Some((r, c)) = beta.dims() {
        check_vector(FUNCTION, "Weight vector", r, c)?;
    }
    if let Some((r, c)) = sigma.dims() {
        check_vector(FUNCTION, "Vector of scale parameters", r, c)?;
    }

    check_finite(FUNCTION, "Vector of dependent variables", &y_val)?;
    check_finite(FUNCTION, "Weight vector", &beta_val)?;
    check_finite(FUNCTION, "Intercept", &alpha_val)?;
    check_positive_finite(FUNCTION, "Scale vector", &sigma_val)?;
    check_finite(FUNCTION, "Matrix of independent variables", &x_val)?;

    if Y::VECTOR {
        check_consistent_size(FUNCTION, "Vector of dependent variables", y_val.len(), n_obs)?;
    }
    if B::VECTOR {
        check_consistent_size(FUNCTION, "Weight vector", beta_val.len(), n_feat)?;
    }
    if S::VECTOR {
        check_consistent_size(
            FUNCTION,
            "Vector of scale parameters",
            sigma_val.len(),
            n_obs,
        )?;
    }
    if A::VECTOR {
        check_consistent_size(FUNCTION, "Vector of intercepts", alpha_val.len(), n_obs)?;
    }

    let any_tracked = <Y::Kind as OutputKind>::TRACKED
        || <X::Kind as OutputKind>::TRACKED
        || <A::Kind as OutputKind>::TRACKED
        || <B::Kind as OutputKind>::TRACKED
        || <S::Kind as OutputKind>::TRACKED;
    if PROPTO && !any_tracked {
        return Ok(partials.build::<LpdfKind<Y, X, A, B, S>>(0.0));
    }

    // z[i] = (y[i] - mu[i]) / sigma[i], with mu = alpha + x * beta.
    let mut z = vec![0.0; n_obs];
    for i in 0..n_obs {
        let mut mu = alpha.value_at(i);
        for m in 0..n_feat {
            mu += x.value_at(i, m) * beta.value_at(m);
        }
        z[i] = (y.value_at(i) - mu) / sigma.value_at(i);
    }
    let sum_z_sq: f64 = z.iter().map(|v| v * v).sum();

    let mut logp = 0.0;
    if !PROPTO {
        logp += NEG_LOG_SQRT_TWO_PI * n_obs as f64;
    }
    if !PROPTO || <S::Kind as OutputKind>::TRACKED {
        if S::VECTOR {
            logp -= sigma_val.iter().map(|s| s.ln()).sum::<f64>();
        } else {
            logp -= n_obs as f64 * sigma_val[0].ln();
        }
    }
    logp -= 0.5 * sum_z_sq;

    // Partials, batched into one node. d[i] = z[i] / sigma[i] is the
    // derivative of logp with respect to mu[i], negated.
    let mu_tracked = <Y::Kind as OutputKind>::TRACKED
        || <X::Kind as OutputKind>::TRACKED
        || <A::Kind as OutputKind>::TRACKED
        || <B::Kind as OutputKind>::TRACKED;
    if mu_tracked {
        let d: Vec<f64> = (0..n_obs).map(|i| z[i] / sigma.value_at(i)).collect();
        if let Some(slot) = y.slot() {
            partials.edge(slot, operand_partials(y, n_obs, |i| -d[i]));
        }
        if let Some(slot) = x.slot() {
            let mut p = Vec::with_capacity(n_obs * n_feat);
            for i in 0..n_obs {
                for m in 0..n_feat {
                    p.push(d[i] * beta.value_at(m));
                }
            }
            partials.edge(slot, Matrix::new(n_obs, n_feat, p));
        }
        if let Some(slot) = alpha.slot() {
            partials.edge(slot, operand_partials(alpha, n_obs, |i| d[i]));
        }
        if let Some(slot) = beta.slot() {
            partials.edge(
                slot,
                operand_partials(beta, n_feat, |m| {
                    (0..n_obs).map(|i| d[i] * x.value_at(i, m)).sum()
                }),
            );
        }
    }
    if let Some(slot) = sigma.slot() {
        partials.edge(
            slot,
            operand_partials(sigma, n_obs, |i| (z[i] * z[i] - 1.0) / sigma.value_at(i)),
        );
    }

    Ok(partials.build::<LpdfKind<Y, X, A, B, S>>(logp))
}

fn operand_values<T: Operand>(op: &T) -> Vec<f64> {
    let len = op.len().unwrap_or(1);
    (0..len).map(|i| op.value_at(i)).collect()
}

/// Partials shaped like the operand: per-element for a vector, the sum of
/// the per-element contributions for a broadcast scalar.
fn operand_partials<T: Operand>(
    op: &T,
    count: usize,
    per_element: impl Fn(usize) -> f64,
) -> Matrix {
    match op.dims() {
        Some((r, c)) => Matrix::new(r, c, (0..count).map(&per_element).collect()),
        None => Matrix::new(1, 1, vec![(0..count).map(&per_element).sum()]),
    }
}
