//! The coupled nonlinear residual for the θ-method.

use ndarray::{concatenate, Array1, Axis};
use plasmacore_common::EvaluatedTensor1;

use crate::boundary::VariableBoundaryConditions;
use crate::coefficients::{Block1DCoeffs, EquationCoeffs};
use crate::fvm::spatial_operator;

/// `R(xⁿ, xⁿ⁺¹) = transientCoeff·(xⁿ⁺¹ − xⁿ)/dt − θ·f(xⁿ⁺¹) − (1 − θ)·f(xⁿ)`
/// for one equation.
fn equation_residual(
    x_n: &Array1<f64>,
    x_np1: &Array1<f64>,
    dt: f64,
    theta: f64,
    coeffs_n: &EquationCoeffs,
    coeffs_np1: &EquationCoeffs,
    bc: &crate::boundary::EdgeBoundary,
    d_rho: f64,
) -> Array1<f64> {
    let transient = coeffs_np1.transient_coeff.value() * (x_np1 - x_n) / dt;
    let f_np1 = spatial_operator(x_np1, coeffs_np1, bc, d_rho);
    let f_n = spatial_operator(x_n, coeffs_n, bc, d_rho);
    transient - theta * f_np1 - (1.0 - theta) * f_n
}

/// The full `4N` residual, concatenating per-equation residuals in layout
/// order `(Ti, Te, ne, ψ)`. Boundary conditions are applied inside
/// [`spatial_operator`] at every call, never materialized separately.
#[must_use]
pub fn residual(
    ti_n: &Array1<f64>,
    ti_np1: &Array1<f64>,
    te_n: &Array1<f64>,
    te_np1: &Array1<f64>,
    ne_n: &Array1<f64>,
    ne_np1: &Array1<f64>,
    psi_n: &Array1<f64>,
    psi_np1: &Array1<f64>,
    dt: f64,
    theta: f64,
    coeffs_n: &Block1DCoeffs,
    coeffs_np1: &Block1DCoeffs,
    bc: &VariableBoundaryConditions,
    d_rho: f64,
) -> EvaluatedTensor1 {
    let r_ti = equation_residual(ti_n, ti_np1, dt, theta, &coeffs_n.ti, &coeffs_np1.ti, &bc.ti, d_rho);
    let r_te = equation_residual(te_n, te_np1, dt, theta, &coeffs_n.te, &coeffs_np1.te, &bc.te, d_rho);
    let r_ne = equation_residual(ne_n, ne_np1, dt, theta, &coeffs_n.ne, &coeffs_np1.ne, &bc.ne, d_rho);
    let r_psi = equation_residual(
        psi_n, psi_np1, dt, theta, &coeffs_n.psi, &coeffs_np1.psi, &bc.psi, d_rho,
    );
    let parts = [r_ti.view(), r_te.view(), r_ne.view(), r_psi.view()];
    let flat = concatenate(Axis(0), &parts).expect("per-equation residuals all share length N");
    EvaluatedTensor1::from_array(flat)
}
