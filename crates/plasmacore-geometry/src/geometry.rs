//! Circular-equilibrium tokamak geometry.
//!
//! The full source this solver is distilled from reads geometric factors
//! from an equilibrium reconstruction file; that boundary is out of scope
//! here (see crate docs). What remains in scope is the large-aspect-ratio
//! circular approximation the source falls back to for quick studies and
//! tests, which is self-contained and needs no file I/O.

use std::f64::consts::PI;

use ndarray::Array1;
use plasmacore_common::{EvaluatedTensor1, Meter, Tesla};

use crate::error::GeometryError;
use crate::mesh::Mesh;
use crate::Result;

/// Record of a tokamak's magnetic geometry over the radial mesh.
///
/// Invariants (checked at construction, never re-checked): `n_cells =
/// g0.len() - 1`, `radii` strictly increasing, `volume` entries strictly
/// positive. `safety_factor` is computed once here, by the circular factory,
/// and is never recomputed from `ψ` elsewhere in this crate family: this
/// core treats the safety factor as geometry-owned data.
#[derive(Clone)]
pub struct Geometry {
    mesh: Mesh,
    r_major: Meter,
    r_minor: Meter,
    b_toroidal: Tesla,
    radii: EvaluatedTensor1,
    volume: EvaluatedTensor1,
    g0: EvaluatedTensor1,
    g1: EvaluatedTensor1,
    g2: EvaluatedTensor1,
    g3: EvaluatedTensor1,
    safety_factor: EvaluatedTensor1,
    magnetic_shear: EvaluatedTensor1,
}

impl Geometry {
    /// Builds a circular-equilibrium [`Geometry`] on the given mesh.
    ///
    /// `q(r) = q0 + (q_edge - q0) * (r / a)^2`, the parabolic safety-factor
    /// profile the source uses for its circular test equilibria. `a` is the
    /// minor radius `r_minor`.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::NonPositiveMinorRadius`] if `r_minor <= 0`,
    /// [`GeometryError::NonPositiveMajorRadius`] if `r_major <= 0`,
    /// [`GeometryError::NonPositiveAxialField`] if `b_toroidal <= 0`,
    /// [`GeometryError::NonMonotonicRadii`] if the computed cell-center
    /// radii are not strictly increasing, or
    /// [`GeometryError::NonPositiveVolume`] if a computed cell volume is not
    /// strictly positive.
    ///
    /// # Example
    ///
    /// ```
    /// # use plasmacore_geometry::{Geometry, Mesh};
    /// # fn main() -> Result<(), plasmacore_geometry::GeometryError> {
    /// let mesh = Mesh::uniform(50)?;
    /// let geom = Geometry::circular(mesh, 6.2, 2.0, 5.3, 1.0, 3.0)?;
    /// assert_eq!(geom.safety_factor().value().len(), 50);
    /// # Ok(())
    /// # }
    /// ```
    pub fn circular(
        mesh: Mesh,
        r_major: Meter,
        r_minor: Meter,
        b_toroidal: Tesla,
        q0: f64,
        q_edge: f64,
    ) -> Result<Self> {
        if r_minor <= 0.0 {
            return Err(GeometryError::NonPositiveMinorRadius(r_minor));
        }
        if r_major <= 0.0 {
            return Err(GeometryError::NonPositiveMajorRadius(r_major));
        }
        if b_toroidal <= 0.0 {
            return Err(GeometryError::NonPositiveAxialField(b_toroidal));
        }

        let n_cells = mesh.n_cells();
        let radii = mesh.cell_centers().value().mapv(|rho| rho * r_minor);

        // Large-aspect-ratio circular cross section: V(r) = 2 pi^2 R r^2,
        // so the flux-surface area element is dV/dr = 4 pi^2 R r.
        let face_radii = mesh.face_centers().value().mapv(|rho| rho * r_minor);
        let surface_element = face_radii.mapv(|r| 4.0 * PI * PI * r_major * r);
        let volume = Array1::from_shape_fn(n_cells, |i| {
            let v_lo = 2.0 * PI * PI * r_major * face_radii[i].powi(2);
            let v_hi = 2.0 * PI * PI * r_major * face_radii[i + 1].powi(2);
            v_hi - v_lo
        });

        // g0: |grad rho_hat| weighted surface element, g1: |grad rho_hat|^2
        // weighted, g2: the bare surface element (convective-term weight),
        // g3: 1/R toroidal-field correction. |grad rho_hat| = 1 / r_minor,
        // constant for this circular, large-aspect-ratio model.
        let grad_rho = 1.0 / r_minor;
        let g0 = surface_element.mapv(|s| s * grad_rho);
        let g1 = surface_element.mapv(|s| s * grad_rho * grad_rho);
        let g2 = surface_element.clone();
        let g3 = Array1::from_elem(n_cells + 1, 1.0 / r_major);

        let safety_factor =
            radii.mapv(|r| q0 + (q_edge - q0) * (r / r_minor).powi(2));
        let magnetic_shear = magnetic_shear_from_profile(&radii, &safety_factor);

        for i in 1..radii.len() {
            if radii[i] <= radii[i - 1] {
                return Err(GeometryError::NonMonotonicRadii { index: i });
            }
        }
        for (i, &v) in volume.iter().enumerate() {
            if v <= 0.0 {
                return Err(GeometryError::NonPositiveVolume { index: i, volume: v });
            }
        }

        Ok(Self {
            mesh,
            r_major,
            r_minor,
            b_toroidal,
            radii: EvaluatedTensor1::from_array(radii),
            volume: EvaluatedTensor1::from_array(volume),
            g0: EvaluatedTensor1::from_array(g0),
            g1: EvaluatedTensor1::from_array(g1),
            g2: EvaluatedTensor1::from_array(g2),
            g3: EvaluatedTensor1::from_array(g3),
            safety_factor: EvaluatedTensor1::from_array(safety_factor),
            magnetic_shear: EvaluatedTensor1::from_array(magnetic_shear),
        })
    }

    /// The underlying radial [`Mesh`].
    #[must_use]
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// The device's major radius `R` **in \[m\]**.
    #[must_use]
    pub fn r_major(&self) -> Meter {
        self.r_major
    }

    /// The plasma's minor radius `a` **in \[m\]**.
    #[must_use]
    pub fn r_minor(&self) -> Meter {
        self.r_minor
    }

    /// The vacuum toroidal field on axis `Bt` **in \[T\]**.
    #[must_use]
    pub fn b_toroidal(&self) -> Tesla {
        self.b_toroidal
    }

    /// Cell-center radii **in \[m\]**, length `N`.
    #[must_use]
    pub fn radii(&self) -> &EvaluatedTensor1 {
        &self.radii
    }

    /// Cell volumes, length `N`.
    #[must_use]
    pub fn volume(&self) -> &EvaluatedTensor1 {
        &self.volume
    }

    /// Geometric factor `g0`, on faces, length `N + 1`.
    #[must_use]
    pub fn g0(&self) -> &EvaluatedTensor1 {
        &self.g0
    }

    /// Geometric factor `g1`, on faces, length `N + 1`.
    #[must_use]
    pub fn g1(&self) -> &EvaluatedTensor1 {
        &self.g1
    }

    /// Geometric factor `g2`, on faces, length `N + 1`.
    #[must_use]
    pub fn g2(&self) -> &EvaluatedTensor1 {
        &self.g2
    }

    /// Geometric factor `g3`, on faces, length `N + 1`.
    #[must_use]
    pub fn g3(&self) -> &EvaluatedTensor1 {
        &self.g3
    }

    /// The safety factor `q(r)`, length `N`.
    #[must_use]
    pub fn safety_factor(&self) -> &EvaluatedTensor1 {
        &self.safety_factor
    }

    /// The magnetic shear `s(r) = (r/q) dq/dr`, length `N`.
    #[must_use]
    pub fn magnetic_shear(&self) -> &EvaluatedTensor1 {
        &self.magnetic_shear
    }
}

/// Magnetic shear via central differences in the interior, one-sided at the
/// boundaries.
fn magnetic_shear_from_profile(radii: &Array1<f64>, q: &Array1<f64>) -> Array1<f64> {
    let n = radii.len();
    Array1::from_shape_fn(n, |i| {
        let dq_dr = if n == 1 {
            0.0
        } else if i == 0 {
            (q[1] - q[0]) / (radii[1] - radii[0])
        } else if i == n - 1 {
            (q[n - 1] - q[n - 2]) / (radii[n - 1] - radii[n - 2])
        } else {
            (q[i + 1] - q[i - 1]) / (radii[i + 1] - radii[i - 1])
        };
        radii[i] / q[i] * dq_dr
    })
}

impl std::fmt::Debug for Geometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Geometry")
            .field("n_cells", &self.mesh.n_cells())
            .field("R_major [m]", &format!("{:.7}", self.r_major()))
            .field("r_minor [m]", &format!("{:.7}", self.r_minor()))
            .field("Bt [T]", &format!("{:.7}", self.b_toroidal()))
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn create_geometry() -> Geometry {
        let mesh = Mesh::uniform(20).unwrap();
        Geometry::circular(mesh, 6.2, 2.0, 5.3, 1.0, 3.5).unwrap()
    }

    #[test]
    fn rejects_non_positive_minor_radius() {
        let mesh = Mesh::uniform(4).unwrap();
        let err = Geometry::circular(mesh, 6.2, 0.0, 5.3, 1.0, 3.0).unwrap_err();
        assert!(matches!(err, GeometryError::NonPositiveMinorRadius(_)));
    }

    #[test]
    fn rejects_non_positive_major_radius() {
        let mesh = Mesh::uniform(4).unwrap();
        let err = Geometry::circular(mesh, 0.0, 2.0, 5.3, 1.0, 3.0).unwrap_err();
        assert!(matches!(err, GeometryError::NonPositiveMajorRadius(_)));
    }

    #[test]
    fn rejects_non_positive_field() {
        let mesh = Mesh::uniform(4).unwrap();
        let err = Geometry::circular(mesh, 6.2, 2.0, 0.0, 1.0, 3.0).unwrap_err();
        assert!(matches!(err, GeometryError::NonPositiveAxialField(_)));
    }

    #[test]
    fn radii_are_strictly_increasing() {
        let geom = create_geometry();
        let radii = geom.radii().value();
        for i in 1..radii.len() {
            assert!(radii[i] > radii[i - 1]);
        }
    }

    #[test]
    fn volumes_are_strictly_positive() {
        let geom = create_geometry();
        for &v in geom.volume().value() {
            assert!(v > 0.0);
        }
    }

    #[test]
    fn safety_factor_matches_parabolic_profile_at_axis_and_edge() {
        let geom = create_geometry();
        let q = geom.safety_factor().value();
        assert!(q[0] > 1.0 && q[0] < 3.5);
        assert_relative_eq!(q[q.len() - 1], 3.5, max_relative = 0.05);
    }

    #[test]
    fn shear_is_positive_for_increasing_q() {
        let geom = create_geometry();
        let shear = geom.magnetic_shear().value();
        for &s in shear {
            assert!(s >= 0.0);
        }
    }

    #[test]
    fn face_arrays_have_n_plus_one_length() {
        let geom = create_geometry();
        assert_eq!(geom.g0().value().len(), geom.mesh().n_faces());
        assert_eq!(geom.g1().value().len(), geom.mesh().n_faces());
        assert_eq!(geom.g2().value().len(), geom.mesh().n_faces());
        assert_eq!(geom.g3().value().len(), geom.mesh().n_faces());
    }
}
