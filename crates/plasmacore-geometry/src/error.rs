/// Custom error types for mesh and geometry construction.
#[derive(thiserror::Error, Debug)]
pub enum GeometryError {
    /// From [`plasmacore_common::CommonError`].
    #[error("{0}")]
    Common(#[from] plasmacore_common::CommonError),

    /// A mesh was requested with fewer than one cell.
    #[error("mesh must have at least one cell, got {0}")]
    EmptyMesh(usize),

    /// A mesh's outer radius must exceed its inner radius.
    #[error("mesh outer radius {r_max} must exceed inner radius {r_min}")]
    InvertedRadii {
        /// The inner radius that was supplied.
        r_min: f64,
        /// The outer radius that was supplied.
        r_max: f64,
    },

    /// A circular-equilibrium geometry was given a non-positive minor radius.
    #[error("minor radius must be positive, got {0}")]
    NonPositiveMinorRadius(f64),

    /// A circular-equilibrium geometry was given a non-positive major radius.
    #[error("major radius must be positive, got {0}")]
    NonPositiveMajorRadius(f64),

    /// A circular-equilibrium geometry was given a non-positive axial field.
    #[error("axial field strength must be positive, got {0}")]
    NonPositiveAxialField(f64),

    /// A safety-factor evaluation was requested outside the mesh domain.
    #[error("radius {radius} lies outside the mesh domain [{r_min}, {r_max}]")]
    RadiusOutOfBounds {
        /// The radius that was requested.
        radius: f64,
        /// The mesh's inner radius.
        r_min: f64,
        /// The mesh's outer radius.
        r_max: f64,
    },

    /// Cell-center radii computed at construction were not strictly
    /// increasing.
    #[error("geometry radii must be strictly increasing, found a non-increasing step at index {index}")]
    NonMonotonicRadii {
        /// The index of the first offending step.
        index: usize,
    },

    /// A cell volume computed at construction was not strictly positive.
    #[error("geometry cell volumes must be strictly positive, found {volume} at index {index}")]
    NonPositiveVolume {
        /// The index of the offending cell.
        index: usize,
        /// The non-positive volume that was computed.
        volume: f64,
    },
}
