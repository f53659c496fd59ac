//! Hybrid direct/iterative linear inner solve for the Newton loop.

use derive_is_enum_variant::is_enum_variant;
use faer::prelude::Solve;
use faer::Mat;
use ndarray::{Array1, Array2};

/// Above this conditioning estimate, the dense direct solve is skipped and
/// SOR is attempted directly rather than wasting an LU factorization that
/// is unlikely to succeed accurately.
const CONDITIONING_CUTOFF: f64 = 1e8;

/// The relative-residual tolerance a linear solve must meet to be accepted.
const RELATIVE_RESIDUAL_TOLERANCE: f64 = 1e-3;

/// SOR relaxation factor.
const SOR_OMEGA: f64 = 1.2;

/// Maximum SOR sweeps before giving up.
const SOR_MAX_SWEEPS: usize = 1000;

/// Which method ultimately produced the returned `δ`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, is_enum_variant)]
pub enum LinearSolveMethod {
    /// Dense `FullPivLu` direct solve.
    DenseLu,
    /// Successive over-relaxation (Gauss–Seidel) fallback.
    Sor,
}

/// Diagnostics returned alongside `δ`, consumed by the Newton loop's gates.
#[derive(Clone, Copy, Debug)]
pub struct LinearSolveDiagnostics {
    /// Relative residual `‖Jδ + R‖ / ‖R‖` of the returned solution.
    pub linear_error: f64,
    /// `δ · (−R)`, the descent value Newton's line search gates on.
    pub descent_value: f64,
    /// The cheap conditioning estimate computed before dispatch.
    pub conditioning_estimate: f64,
    /// Which method produced `δ`.
    pub method_used: LinearSolveMethod,
}

fn to_faer(matrix: &Array2<f64>) -> Mat<f64> {
    let (rows, cols) = matrix.dim();
    Mat::from_fn(rows, cols, |i, j| matrix[[i, j]])
}

fn from_faer_column(matrix: &Mat<f64>) -> Array1<f64> {
    Array1::from_shape_fn(matrix.nrows(), |i| matrix[(i, 0)])
}

fn inf_norm(x: &Array1<f64>) -> f64 {
    x.iter().fold(0.0_f64, |acc, &v| acc.max(v.abs()))
}

fn matrix_inf_norm(matrix: &Array2<f64>) -> f64 {
    matrix
        .rows()
        .into_iter()
        .map(|row| row.iter().map(|v| v.abs()).sum::<f64>())
        .fold(0.0_f64, f64::max)
}

/// Cheap conditioning estimate: `‖J‖_∞ · ‖J⁻¹·1‖_∞`, using one extra solve
/// against a unit RHS rather than a full SVD.
fn estimate_conditioning(jacobian: &Array2<f64>) -> f64 {
    let n = jacobian.nrows();
    let faer_jacobian = to_faer(jacobian);
    let lu = faer_jacobian.full_piv_lu();
    let unit_rhs = Mat::from_fn(n, 1, |_, _| 1.0);
    let y = from_faer_column(&lu.solve(unit_rhs.as_ref()));
    matrix_inf_norm(jacobian) * inf_norm(&y)
}

/// Attempts the dense direct solve, returning `None` if the factorization
/// itself is unusable (the solve call never fails outright with `faer`, but
/// a `NaN`/`Inf` result is treated as failure).
fn try_dense_lu(jacobian: &Array2<f64>, rhs: &Array1<f64>) -> Option<Array1<f64>> {
    let n = rhs.len();
    let faer_jacobian = to_faer(jacobian);
    let lu = faer_jacobian.full_piv_lu();
    let faer_rhs = Mat::from_fn(n, 1, |i, _| rhs[i]);
    let solution = from_faer_column(&lu.solve(faer_rhs.as_ref()));
    if solution.iter().all(|v| v.is_finite()) {
        Some(solution)
    } else {
        None
    }
}

/// Gauss–Seidel with relaxation `ω`, iterating until the relative residual
/// drops below `tolerance` or `SOR_MAX_SWEEPS` sweeps elapse.
fn sor_solve(jacobian: &Array2<f64>, rhs: &Array1<f64>, tolerance: f64) -> Array1<f64> {
    let n = rhs.len();
    let mut x = Array1::zeros(n);
    let rhs_norm = inf_norm(rhs).max(f64::MIN_POSITIVE);

    for _ in 0..SOR_MAX_SWEEPS {
        for i in 0..n {
            let diag = jacobian[[i, i]];
            if diag.abs() < f64::EPSILON {
                continue;
            }
            let off_diag_sum: f64 = (0..n)
                .filter(|&j| j != i)
                .map(|j| jacobian[[i, j]] * x[j])
                .sum();
            let gauss_seidel_update = (rhs[i] - off_diag_sum) / diag;
            x[i] = (1.0 - SOR_OMEGA) * x[i] + SOR_OMEGA * gauss_seidel_update;
        }
        let residual = jacobian.dot(&x) - rhs;
        if inf_norm(&residual) / rhs_norm < tolerance {
            break;
        }
    }
    x
}

/// Solves `J·δ = rhs` (where `rhs = −R`), hybridizing a dense direct solve
/// with an SOR fallback and always returning diagnostics.
///
/// Dispatch: estimate conditioning; if it is `≲ 1e8`, attempt dense LU and
/// accept it if its relative residual is within tolerance; otherwise fall
/// back to SOR.
#[must_use]
pub fn linear_solve(jacobian: &Array2<f64>, rhs: &Array1<f64>) -> (Array1<f64>, LinearSolveDiagnostics) {
    let conditioning_estimate = estimate_conditioning(jacobian);
    let rhs_norm = inf_norm(rhs).max(f64::MIN_POSITIVE);

    let dense_attempt = if conditioning_estimate <= CONDITIONING_CUTOFF {
        try_dense_lu(jacobian, rhs).map(|delta| {
            let residual = jacobian.dot(&delta) - rhs;
            let relative_residual = inf_norm(&residual) / rhs_norm;
            (delta, relative_residual)
        })
    } else {
        None
    };

    let (delta, linear_error, method_used) = match dense_attempt {
        Some((delta, relative_residual)) if relative_residual <= RELATIVE_RESIDUAL_TOLERANCE => {
            (delta, relative_residual, LinearSolveMethod::DenseLu)
        }
        _ => {
            let delta = sor_solve(jacobian, rhs, RELATIVE_RESIDUAL_TOLERANCE);
            let residual = jacobian.dot(&delta) - rhs;
            let relative_residual = inf_norm(&residual) / rhs_norm;
            (delta, relative_residual, LinearSolveMethod::Sor)
        }
    };

    let descent_value = delta.dot(rhs);
    let diagnostics = LinearSolveDiagnostics {
        linear_error,
        descent_value,
        conditioning_estimate,
        method_used,
    };
    (delta, diagnostics)
}
