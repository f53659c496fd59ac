//! Jacobian assembly for the Newton loop.
//!
//! The reference implementation obtains Jacobian rows from reverse-mode
//! vector-Jacobian products (VJPs) against the flattened residual. No
//! VJP/autodiff crate exists anywhere in this pack's dependency trees, and
//! the source spec explicitly sanctions a finite-difference fallback as
//! "slower but semantically equivalent" — so [`FiniteDifferenceJacobian`] is
//! the sole implementor here. [`JacobianStrategy`] is the seam a
//! reverse-mode VJP implementor would plug into without touching
//! [`crate::newton`].

use ndarray::Array2;

/// A pluggable strategy for assembling the residual's Jacobian at a point.
pub trait JacobianStrategy {
    /// Assembles the dense `4N × 4N` Jacobian of `residual_fn` at `x`.
    fn jacobian(&self, x: &ndarray::Array1<f64>, residual_fn: &dyn Fn(&ndarray::Array1<f64>) -> ndarray::Array1<f64>) -> Array2<f64>;
}

/// Builds the Jacobian by forward-difference columns: `J[:, j] = (R(x + h
/// e_j) − R(x)) / h`, with relative step `h = sqrt(EPSILON) * max(|x_j|,
/// 1)`. `O(4N)` residual evaluations, each a single fused spatial-operator
/// pass.
#[derive(Clone, Copy, Debug, Default)]
pub struct FiniteDifferenceJacobian;

impl JacobianStrategy for FiniteDifferenceJacobian {
    fn jacobian(
        &self,
        x: &ndarray::Array1<f64>,
        residual_fn: &dyn Fn(&ndarray::Array1<f64>) -> ndarray::Array1<f64>,
    ) -> Array2<f64> {
        let n = x.len();
        let r0 = residual_fn(x);
        let mut jac = Array2::zeros((n, n));
        let sqrt_eps = f64::EPSILON.sqrt();

        for j in 0..n {
            let h = sqrt_eps * x[j].abs().max(1.0);
            let mut perturbed = x.clone();
            perturbed[j] += h;
            let r_perturbed = residual_fn(&perturbed);
            let column = (&r_perturbed - &r0) / h;
            jac.column_mut(j).assign(&column);
        }
        jac
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array1;

    #[test]
    fn matches_analytic_jacobian_of_a_linear_map() {
        // R(x) = A x for a small fixed A; the FD Jacobian should recover A.
        let a = Array2::from_shape_vec((3, 3), vec![2.0, 0.0, 1.0, 0.0, 3.0, -1.0, 1.0, -1.0, 4.0])
            .unwrap();
        let a_clone = a.clone();
        let residual_fn = move |x: &Array1<f64>| a_clone.dot(x);

        let x0 = Array1::from_vec(vec![1.0, 2.0, 3.0]);
        let jac = FiniteDifferenceJacobian.jacobian(&x0, &residual_fn);

        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(jac[[i, j]], a[[i, j]], epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn jacobian_shape_matches_state_length() {
        let residual_fn = |x: &Array1<f64>| x.mapv(|v| v * v);
        let x0 = Array1::from_vec(vec![1.0, 2.0, 3.0, 4.0]);
        let jac = FiniteDifferenceJacobian.jacobian(&x0, &residual_fn);
        assert_eq!(jac.shape(), &[4, 4]);
    }
}
