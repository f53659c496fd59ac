//! Finite-volume spatial operator: face interpolation, gradients, flux
//! assembly, and divergence.
//!
//! Everything here is whole-array (`ndarray` slicing/zipping); there are no
//! element-wise scalar loops on the hot path.

use ndarray::Array1;

use crate::boundary::{BoundaryCondition, EdgeBoundary};
use crate::coefficients::EquationCoeffs;

/// The power-law weighting of the local Péclet number `Pe = v·Δρ̂/D`
/// (Patankar's power-law scheme).
///
/// `α` is the fraction of the left cell's value used in the face value:
/// `x_face = α·x_left + (1 − α)·x_right`. Built from Patankar's
/// `A(|Pe|) = max(0, 1 − 0.1|Pe|)⁵` blending function so that `α` is
/// continuous and monotonically increasing in `pe` over the whole real
/// line: `α(0) = ½`, `α(Pe→+∞) = 1`, `α(Pe→−∞) = 0`, pinned to pure
/// upwinding once `|Pe| ≥ 10` (where `A` has already reached zero).
#[must_use]
pub fn power_law_alpha(pe: f64) -> f64 {
    if pe >= 10.0 {
        1.0
    } else if pe <= -10.0 {
        0.0
    } else {
        let a = (1.0 - 0.1 * pe.abs()).max(0.0).powi(5);
        0.5 + 0.5 * pe.signum() * (1.0 - a)
    }
}

/// Interpolates a cell-centered array to faces using the harmonic mean,
/// the default for diffusivities since it avoids over-estimating diffusion
/// across sharp gradients. Boundary faces take the adjacent cell's value.
#[must_use]
pub fn interp_to_faces_harmonic(cell: &Array1<f64>) -> Array1<f64> {
    let n = cell.len();
    Array1::from_shape_fn(n + 1, |i| {
        if i == 0 {
            cell[0]
        } else if i == n {
            cell[n - 1]
        } else {
            let (a, b) = (cell[i - 1], cell[i]);
            if a + b <= 0.0 {
                0.0
            } else {
                2.0 * a * b / (a + b)
            }
        }
    })
}

/// Interior face Péclet numbers, `Pe = v·Δρ̂/D`, for faces `1..N`.
fn interior_peclet(d_face: &Array1<f64>, v_face: &Array1<f64>, d_rho: f64) -> Array1<f64> {
    let n_faces = d_face.len();
    Array1::from_shape_fn(n_faces - 2, |k| {
        let i = k + 1;
        let d = d_face[i];
        if d <= 0.0 {
            if v_face[i] > 0.0 {
                f64::INFINITY
            } else if v_face[i] < 0.0 {
                f64::NEG_INFINITY
            } else {
                0.0
            }
        } else {
            v_face[i] * d_rho / d
        }
    })
}

/// Face values of the state variable, combining power-law-weighted interior
/// faces with boundary-condition-injected edge faces.
///
/// - Dirichlet(v0) on the core edge: `x_face_left = v0`.
/// - Neumann(g) on the core edge: `x_face_left = x[0] - g·Δρ̂/2`.
/// - The edge side mirrors the same rule about the last cell.
#[must_use]
pub fn face_values(
    x: &Array1<f64>,
    d_face: &Array1<f64>,
    v_face: &Array1<f64>,
    d_rho: f64,
    bc: &EdgeBoundary,
) -> Array1<f64> {
    let n = x.len();
    let peclet = interior_peclet(d_face, v_face, d_rho);
    let mut faces = Array1::zeros(n + 1);

    faces[0] = match bc.core {
        BoundaryCondition::Dirichlet(v0) => v0,
        BoundaryCondition::Neumann(g) => x[0] - g * d_rho / 2.0,
    };
    faces[n] = match bc.edge {
        BoundaryCondition::Dirichlet(v0) => v0,
        BoundaryCondition::Neumann(g) => x[n - 1] + g * d_rho / 2.0,
    };
    for i in 1..n {
        let alpha = power_law_alpha(peclet[i - 1]);
        faces[i] = alpha * x[i - 1] + (1.0 - alpha) * x[i];
    }
    faces
}

/// Face gradients of the state variable: forward differences on interior
/// faces, one-sided boundary-condition-adjusted differences at the edges.
///
/// - Dirichlet(v0) on the core edge: `grad_left = (x[0] − v0) / (Δρ̂/2)`.
/// - Neumann(g) on the core edge: `grad_left = g`.
/// - The edge side mirrors the same rule about the last cell.
#[must_use]
pub fn face_gradients(x: &Array1<f64>, d_rho: f64, bc: &EdgeBoundary) -> Array1<f64> {
    let n = x.len();
    let mut grad = Array1::zeros(n + 1);

    grad[0] = match bc.core {
        BoundaryCondition::Dirichlet(v0) => (x[0] - v0) / (d_rho / 2.0),
        BoundaryCondition::Neumann(g) => g,
    };
    grad[n] = match bc.edge {
        BoundaryCondition::Dirichlet(v0) => (v0 - x[n - 1]) / (d_rho / 2.0),
        BoundaryCondition::Neumann(g) => g,
    };
    for i in 1..n {
        grad[i] = (x[i] - x[i - 1]) / d_rho;
    }
    grad
}

/// Total flux `Γ = −D·∇x + v·x_face` at every face.
#[must_use]
pub fn flux(
    d_face: &Array1<f64>,
    v_face: &Array1<f64>,
    grad: &Array1<f64>,
    x_face: &Array1<f64>,
) -> Array1<f64> {
    -d_face * grad + v_face * x_face
}

/// Divergence of a face flux onto cells: `(Γ[1:] − Γ[:−1]) / Δρ̂`.
#[must_use]
pub fn divergence(flux: &Array1<f64>, d_rho: f64) -> Array1<f64> {
    let n = flux.len() - 1;
    (&flux.slice(ndarray::s![1..]) - &flux.slice(ndarray::s![..n])) / d_rho
}

/// The per-equation spatial operator `f(x) = div(Γ) + sourceCell +
/// sourceMatCell`, with boundary conditions applied inside this call every
/// time (never materialized into the residual separately).
///
/// `sourceMatCell` is folded in additively, per this core's resolution of
/// the source-matrix open question (see crate docs).
#[must_use]
pub fn spatial_operator(
    x: &Array1<f64>,
    coeffs: &EquationCoeffs,
    bc: &EdgeBoundary,
    d_rho: f64,
) -> Array1<f64> {
    let d_face = coeffs.d_face.value();
    let v_face = coeffs.v_face.value();
    let x_face = face_values(x, d_face, v_face, d_rho, bc);
    let grad = face_gradients(x, d_rho, bc);
    let gamma = flux(d_face, v_face, &grad, &x_face);
    divergence(&gamma, d_rho) + coeffs.source_cell.value() + coeffs.source_mat_cell.value()
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn power_law_alpha_limits() {
        assert_relative_eq!(power_law_alpha(0.0), 0.5);
        assert_relative_eq!(power_law_alpha(1e6), 1.0);
        assert_relative_eq!(power_law_alpha(-1e6), 0.0);
    }

    #[test]
    fn power_law_alpha_pure_upwind_beyond_ten() {
        assert_relative_eq!(power_law_alpha(11.0), 1.0);
        assert_relative_eq!(power_law_alpha(-11.0), 0.0);
    }

    #[test]
    fn power_law_alpha_is_continuous_and_monotonic_over_intermediate_peclet() {
        let mut prev = power_law_alpha(-10.0);
        for pe in [-9, -5, -1, 0, 1, 5, 9, 10] {
            let alpha = power_law_alpha(f64::from(pe));
            assert!(
                alpha >= prev - 1e-12,
                "power_law_alpha must be monotonically non-decreasing, got {alpha} after {prev} at pe={pe}"
            );
            assert!((0.0..=1.0).contains(&alpha));
            prev = alpha;
        }
        // No jump straddling the positive/negative branches, unlike the
        // previous formula.
        assert_relative_eq!(power_law_alpha(1e-11), 0.5, epsilon = 1e-4);
        assert_relative_eq!(power_law_alpha(-1e-11), 0.5, epsilon = 1e-4);
        // Matches Patankar's A(|Pe|) = max(0, 1 - 0.1|Pe|)^5 directly at pe=5.
        let expected_5 = 0.5 + 0.5 * (1.0 - 0.5_f64.powi(5));
        assert_relative_eq!(power_law_alpha(5.0), expected_5, epsilon = 1e-12);
    }

    #[test]
    fn neumann_zero_core_gives_zero_gradient() {
        let x = Array1::from_vec(vec![1.0, 2.0, 3.0]);
        let bc = EdgeBoundary {
            core: BoundaryCondition::Neumann(0.0),
            edge: BoundaryCondition::Dirichlet(0.0),
        };
        let grad = face_gradients(&x, 0.25, &bc);
        assert_relative_eq!(grad[0], 0.0);
    }

    #[test]
    fn dirichlet_edge_gives_exact_face_value() {
        let x = Array1::from_vec(vec![1.0, 2.0, 3.0]);
        let d_face = Array1::from_elem(4, 1.0);
        let v_face = Array1::zeros(4);
        let bc = EdgeBoundary {
            core: BoundaryCondition::Neumann(0.0),
            edge: BoundaryCondition::Dirichlet(7.0),
        };
        let faces = face_values(&x, &d_face, &v_face, 0.3333, &bc);
        assert_relative_eq!(faces[faces.len() - 1], 7.0);
    }

    #[test]
    fn harmonic_interp_matches_cell_value_at_boundaries() {
        let cell = Array1::from_vec(vec![1.0, 2.0, 4.0]);
        let faces = interp_to_faces_harmonic(&cell);
        assert_relative_eq!(faces[0], 1.0);
        assert_relative_eq!(faces[3], 4.0);
        assert_relative_eq!(faces[1], 2.0 * 1.0 * 2.0 / (1.0 + 2.0));
    }

    #[test]
    fn divergence_of_constant_flux_is_zero() {
        let flux = Array1::from_elem(5, 3.0);
        let div = divergence(&flux, 0.1);
        for &d in &div {
            assert_relative_eq!(d, 0.0);
        }
    }
}
