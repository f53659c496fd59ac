//! Scaled Newton–Raphson solver with per-variable convergence, a descent
//! gate, a linear-error gate, and a physicality-checked line search.

use derive_is_enum_variant::is_enum_variant;
use ndarray::Array1;

use crate::jacobian::JacobianStrategy;
use crate::linear::{linear_solve, LinearSolveMethod};
use crate::profiles::StateLayout;

/// Per-variable convergence tolerances, in physical (unscaled) units.
#[derive(Clone, Copy, Debug)]
pub struct ConvergenceTolerances {
    /// Ion temperature residual tolerance, eV.
    pub ti: f64,
    /// Electron temperature residual tolerance, eV.
    pub te: f64,
    /// Electron density residual tolerance, m⁻³.
    pub ne: f64,
    /// Poloidal flux residual tolerance, Wb.
    pub psi: f64,
}

impl Default for ConvergenceTolerances {
    /// `Ti, Te` tol = 10 eV, `ne` tol = 0.1 m⁻³, `ψ` tol = 1e-3 Wb.
    fn default() -> Self {
        Self {
            ti: 10.0,
            te: 10.0,
            ne: 0.1,
            psi: 1e-3,
        }
    }
}

/// Why a Newton solve did not converge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, is_enum_variant)]
pub enum NewtonFailureReason {
    /// The solve converged; this is the "no failure" placeholder so
    /// [`NewtonResult::reason`] always has a value.
    None,
    /// The linear inner solve's relative residual exceeded its tolerance.
    LinearError,
    /// The computed step `δ` was not a descent direction (`δ·(−R) ≤ 0`).
    Descent,
    /// The line search exhausted `α` without finding an accepted step.
    LineSearch,
    /// The iteration count reached `max_iter` without converging.
    MaxIter,
}

/// Structured metadata carried alongside a [`NewtonResult`], enabling
/// post-mortem diagnosis without string parsing.
#[derive(Clone, Copy, Debug)]
pub struct NewtonDiagnostics {
    /// The last linear solve's relative residual.
    pub linear_error: f64,
    /// The last linear solve's descent value `δ·(−R)`.
    pub descent_value: f64,
    /// Which failure mode, if any, terminated the solve.
    pub failure_type: NewtonFailureReason,
    /// Which method the last linear solve used.
    pub last_linear_method: Option<LinearSolveMethod>,
}

/// The outcome of a Newton–Raphson solve.
#[derive(Clone, Debug)]
pub struct NewtonResult {
    /// Whether the solve converged.
    pub converged: bool,
    /// The (possibly still-improving) state at return, unscaled.
    pub state: Array1<f64>,
    /// Number of iterations performed.
    pub iterations: usize,
    /// The residual norm at return.
    pub residual_norm: f64,
    /// Why the solve stopped, if it did not converge.
    pub reason: NewtonFailureReason,
    /// Structured diagnostics for post-mortem logging.
    pub metadata: NewtonDiagnostics,
}

const MAX_LINE_SEARCH_HALVINGS: u32 = 20;
const LINEAR_ERROR_GATE: f64 = 1e-3;

/// Checks `Tᵢ, Tₑ, nₑ > 0`, `ψ` finite, no NaN/Inf anywhere in the state.
#[must_use]
pub fn is_physical(x: &Array1<f64>, layout: &StateLayout) -> bool {
    if x.iter().any(|v| !v.is_finite()) {
        return false;
    }
    x.slice(ndarray::s![layout.ti_range()]).iter().all(|&v| v > 0.0)
        && x.slice(ndarray::s![layout.te_range()]).iter().all(|&v| v > 0.0)
        && x.slice(ndarray::s![layout.ne_range()]).iter().all(|&v| v > 0.0)
}

/// Checks that each of `Tᵢ, Tₑ, nₑ, ψ` independently satisfies its own
/// tolerance. A single summed norm is insufficient: `Tₑ` typically
/// dominates and would mask the others.
#[must_use]
pub fn per_variable_converged(
    residual: &Array1<f64>,
    layout: &StateLayout,
    tolerances: &ConvergenceTolerances,
) -> bool {
    let norm = |range: std::ops::Range<usize>| -> f64 {
        residual
            .slice(ndarray::s![range])
            .iter()
            .fold(0.0_f64, |acc, &v| acc.max(v.abs()))
    };
    norm(layout.ti_range()) < tolerances.ti
        && norm(layout.te_range()) < tolerances.te
        && norm(layout.ne_range()) < tolerances.ne
        && norm(layout.psi_range()) < tolerances.psi
}

/// Runs scaled Newton–Raphson to solve `residual_fn(x) = 0`, starting from
/// `x_guess` (already in scaled units; the caller owns scaling/unscaling).
///
/// `jacobian_strategy` assembles the Jacobian at each iterate;
/// `residual_fn` evaluates the coupled residual.
#[allow(clippy::too_many_arguments)]
#[must_use]
pub fn newton_solve(
    x_guess: &Array1<f64>,
    layout: &StateLayout,
    residual_fn: &dyn Fn(&Array1<f64>) -> Array1<f64>,
    jacobian_strategy: &dyn JacobianStrategy,
    tolerances: &ConvergenceTolerances,
    max_iter: usize,
) -> NewtonResult {
    let mut x = x_guess.clone();
    let mut last_linear_error = 0.0;
    let mut last_descent_value = 0.0;
    let mut last_method = None;

    for iteration in 0..max_iter {
        let residual = residual_fn(&x);
        let residual_norm = residual.iter().fold(0.0_f64, |acc, &v| acc.max(v.abs()));

        if per_variable_converged(&residual, layout, tolerances) {
            return NewtonResult {
                converged: true,
                state: x,
                iterations: iteration,
                residual_norm,
                reason: NewtonFailureReason::None,
                metadata: NewtonDiagnostics {
                    linear_error: last_linear_error,
                    descent_value: last_descent_value,
                    failure_type: NewtonFailureReason::None,
                    last_linear_method: last_method,
                },
            };
        }

        let jacobian = jacobian_strategy.jacobian(&x, residual_fn);
        let neg_residual = residual.mapv(|v| -v);
        let (delta, diagnostics) = linear_solve(&jacobian, &neg_residual);
        last_linear_error = diagnostics.linear_error;
        last_descent_value = diagnostics.descent_value;
        last_method = Some(diagnostics.method_used);

        if diagnostics.linear_error > LINEAR_ERROR_GATE {
            return failed(
                x,
                iteration,
                residual_norm,
                NewtonFailureReason::LinearError,
                last_linear_error,
                last_descent_value,
                last_method,
            );
        }
        if diagnostics.descent_value <= 0.0 {
            return failed(
                x,
                iteration,
                residual_norm,
                NewtonFailureReason::Descent,
                last_linear_error,
                last_descent_value,
                last_method,
            );
        }

        let mut alpha = 1.0_f64;
        let mut accepted = false;
        for _ in 0..MAX_LINE_SEARCH_HALVINGS {
            let candidate = &x + alpha * &delta;
            if is_physical(&candidate, layout) {
                let candidate_residual = residual_fn(&candidate);
                let candidate_norm = candidate_residual
                    .iter()
                    .fold(0.0_f64, |acc, &v| acc.max(v.abs()));
                if candidate_norm < residual_norm {
                    x = candidate;
                    accepted = true;
                    break;
                }
            }
            alpha /= 2.0;
        }

        if !accepted {
            return failed(
                x,
                iteration,
                residual_norm,
                NewtonFailureReason::LineSearch,
                last_linear_error,
                last_descent_value,
                last_method,
            );
        }
    }

    let final_residual = residual_fn(&x);
    let final_norm = final_residual.iter().fold(0.0_f64, |acc, &v| acc.max(v.abs()));
    failed(
        x,
        max_iter,
        final_norm,
        NewtonFailureReason::MaxIter,
        last_linear_error,
        last_descent_value,
        last_method,
    )
}

#[allow(clippy::too_many_arguments)]
fn failed(
    state: Array1<f64>,
    iterations: usize,
    residual_norm: f64,
    reason: NewtonFailureReason,
    linear_error: f64,
    descent_value: f64,
    last_linear_method: Option<LinearSolveMethod>,
) -> NewtonResult {
    NewtonResult {
        converged: false,
        state,
        iterations,
        residual_norm,
        reason,
        metadata: NewtonDiagnostics {
            linear_error,
            descent_value,
            failure_type: reason,
            last_linear_method,
        },
    }
}
