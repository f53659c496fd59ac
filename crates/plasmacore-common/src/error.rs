/// Errors shared across the `plasmacore` crate family.
///
/// Crate-specific error enums (`GeometryError`, `TransportError`, ...) wrap
/// this one with `#[from]` rather than duplicating its variants.
#[derive(thiserror::Error, Debug)]
pub enum CommonError {
    /// A tensor was given a shape incompatible with the operation.
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// The shape the caller required.
        expected: Vec<usize>,
        /// The shape that was actually supplied.
        actual: Vec<usize>,
    },

    /// ndarray's own shape error, surfaced verbatim.
    #[error("{0}")]
    NdarrayShape(#[from] ndarray::ShapeError),
}
