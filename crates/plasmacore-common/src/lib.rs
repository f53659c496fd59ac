//! Evaluated-tensor wrapper, physical unit aliases and shared errors for the
//! `plasmacore` crate family.

mod error;
mod tensor;
mod units;

pub use error::CommonError;
pub use tensor::{EvaluatedTensor, EvaluatedTensor1, EvaluatedTensor2, EvaluatedTensorDyn, LazyTensor};
pub use units::{
    to_native_source_unit, ElectronVolt, MegawattsPerCubicMeter, Meter, PerCubicMeter, Second,
    SourceUnit, Tesla, Weber, MW_M3_TO_EV_M3_S,
};

/// The result type used at API boundaries throughout the `plasmacore-common`
/// crate.
pub type Result<T> = std::result::Result<T, CommonError>;
