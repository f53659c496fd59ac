/// Custom error types for the transport core.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    /// From [`plasmacore_common::CommonError`].
    #[error("{0}")]
    Common(#[from] plasmacore_common::CommonError),

    /// From [`plasmacore_geometry::GeometryError`].
    #[error("{0}")]
    Geometry(#[from] plasmacore_geometry::GeometryError),

    /// A non-finite or out-of-physical-range value was found at a boundary
    /// (shape mismatch, non-positive temperature/density, conflicting or
    /// non-finite boundary condition).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A source term tagged in one unit reached a code path that expected
    /// another, without going through the conversion boundary.
    #[error("unit mismatch: expected {expected}, got {actual}")]
    UnitMismatch {
        /// The unit the call site required.
        expected: &'static str,
        /// The unit that was actually supplied.
        actual: &'static str,
    },

    /// A step failed terminally: Newton did not converge within the retry
    /// budget, or `dt` fell below `effective_min_dt` before convergence.
    #[error("step failed at t={time}, last dt={last_dt}: {reason}")]
    StepFailed {
        /// The simulation time at which the step was abandoned.
        time: f64,
        /// The last timestep size that was attempted.
        last_dt: f64,
        /// Why the step could not be completed.
        reason: String,
    },

    /// The tensor backend failed to allocate or execute a kernel. Not
    /// recoverable; surfaced directly.
    #[error("resource failure: {0}")]
    Resource(String),
}
