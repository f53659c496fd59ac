//! The coupled-PDE transport core: finite-volume discretization of `{Ti,
//! Te, ne, ψ}`, θ-method time discretization, scaled Newton–Raphson with a
//! pluggable Jacobian strategy, and adaptive timestep control, driven by an
//! [`orchestrator`] that owns one simulation's mutable state end to end.
//!
//! This crate defines no physics of its own beyond the FVM/Newton/timestep
//! machinery: transport coefficients, sources, and pedestal/MHD/neoclassical
//! adjustments are supplied by the caller through [`contracts`]'s physics
//! model traits.

mod boundary;
mod cache;
mod coefficients;
mod contracts;
mod error;
mod fvm;
mod jacobian;
mod linear;
mod newton;
mod orchestrator;
mod params;
mod profiles;
mod residual;
mod snapshot;
mod timestep;

pub use boundary::{BoundaryCondition, EdgeBoundary, VariableBoundaryConditions};
pub use cache::CoefficientCache;
pub use coefficients::{Block1DCoeffs, CoefficientBuilder, EquationCoeffs, DENSITY_FLOOR};
pub use contracts::{
    Equation, MHDModel, NeoclassicalModel, PedestalModel, SourceModel, SourceTerm, TransportCoeffs,
    TransportModel,
};
pub use error::TransportError;
pub use jacobian::{FiniteDifferenceJacobian, JacobianStrategy};
pub use linear::{linear_solve, LinearSolveDiagnostics, LinearSolveMethod};
pub use newton::{
    is_physical, newton_solve, per_variable_converged, ConvergenceTolerances, NewtonDiagnostics,
    NewtonFailureReason, NewtonResult,
};
pub use orchestrator::{
    run_many, CancellationToken, DynamicParamsProvider, Orchestrator, OrchestratorConfig, StepOutcome,
};
pub use params::{AdaptiveTimestepConfig, DynamicParams, StaticParams, Theta};
pub use profiles::{CoreProfiles, FlattenedState, ScaledState, StateLayout};
pub use residual::residual;
pub use snapshot::{
    derive_scalars, DerivedScalars, ProgressInfo, SerializedProfiles, SimTime, SimulationResult,
    SimulationSnapshot, SimulationState, SimulationStatistics, StepEvent, StepEventKind,
};
pub use timestep::TimestepController;

/// The result type used throughout this crate's public API.
pub type Result<T> = std::result::Result<T, TransportError>;
