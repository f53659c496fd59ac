//! The radial mesh: a uniform 1D grid on the normalized minor radius.

use ndarray::Array1;
use plasmacore_common::EvaluatedTensor1;

use crate::error::GeometryError;
use crate::Result;

/// A uniform 1D radial grid on `ρ̂ ∈ [0, 1]`.
///
/// `N` cells span the domain, with cell centers at `(i + 1/2) * dρ̂` and
/// `N + 1` faces at `i * dρ̂`. Every array this type exposes is an
/// [`EvaluatedTensor1`]: a mesh crosses module boundaries constantly (into
/// the coefficient builder, the FVM operator, the orchestrator) and each of
/// those hand-offs is where a lazy backend would be forced.
#[derive(Clone, Debug)]
pub struct Mesh {
    n_cells: usize,
    d_rho: f64,
    cell_centers: EvaluatedTensor1,
    face_centers: EvaluatedTensor1,
}

impl Mesh {
    /// Builds a uniform mesh of `n_cells` cells on `ρ̂ ∈ [0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::EmptyMesh`] if `n_cells == 0`.
    pub fn uniform(n_cells: usize) -> Result<Self> {
        if n_cells == 0 {
            return Err(GeometryError::EmptyMesh(n_cells));
        }

        let d_rho = 1.0 / n_cells as f64;
        let cell_centers = Array1::from_shape_fn(n_cells, |i| (i as f64 + 0.5) * d_rho);
        let face_centers = Array1::from_shape_fn(n_cells + 1, |i| i as f64 * d_rho);

        Ok(Self {
            n_cells,
            d_rho,
            cell_centers: EvaluatedTensor1::from_array(cell_centers),
            face_centers: EvaluatedTensor1::from_array(face_centers),
        })
    }

    /// The number of cells, `N`.
    #[must_use]
    pub fn n_cells(&self) -> usize {
        self.n_cells
    }

    /// The number of faces, `N + 1`.
    #[must_use]
    pub fn n_faces(&self) -> usize {
        self.n_cells + 1
    }

    /// The uniform cell spacing `dρ̂ = 1 / N`.
    #[must_use]
    pub fn d_rho(&self) -> f64 {
        self.d_rho
    }

    /// Cell-center coordinates, length `N`.
    #[must_use]
    pub fn cell_centers(&self) -> &EvaluatedTensor1 {
        &self.cell_centers
    }

    /// Face coordinates, length `N + 1`.
    #[must_use]
    pub fn face_centers(&self) -> &EvaluatedTensor1 {
        &self.face_centers
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rejects_empty_mesh() {
        assert!(matches!(Mesh::uniform(0), Err(GeometryError::EmptyMesh(0))));
    }

    #[test]
    fn cell_and_face_counts() {
        let mesh = Mesh::uniform(10).unwrap();
        assert_eq!(mesh.n_cells(), 10);
        assert_eq!(mesh.n_faces(), 11);
        assert_relative_eq!(mesh.d_rho(), 0.1);
    }

    #[test]
    fn cell_centers_are_midpoints_of_faces() {
        let mesh = Mesh::uniform(4).unwrap();
        let faces = mesh.face_centers().value();
        let centers = mesh.cell_centers().value();
        for i in 0..mesh.n_cells() {
            assert_relative_eq!(centers[i], 0.5 * (faces[i] + faces[i + 1]));
        }
    }

    #[test]
    fn faces_span_the_unit_interval() {
        let mesh = Mesh::uniform(7).unwrap();
        let faces = mesh.face_centers().value();
        assert_relative_eq!(faces[0], 0.0);
        assert_relative_eq!(faces[faces.len() - 1], 1.0);
    }
}
