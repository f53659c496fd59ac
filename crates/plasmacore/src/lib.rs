//! Umbrella crate re-exporting the `plasmacore` crate family: shared
//! tensor/unit types, radial mesh and circular-equilibrium geometry, and the
//! coupled-PDE transport core.
//!
//! Downstream consumers depend on this crate alone; the `plasmacore-*`
//! crates stay independently versioned and tested.

pub use plasmacore_common::{
    to_native_source_unit, CommonError, ElectronVolt, EvaluatedTensor, EvaluatedTensor1, EvaluatedTensor2,
    EvaluatedTensorDyn, LazyTensor, MegawattsPerCubicMeter, Meter, PerCubicMeter, Second, SourceUnit,
    Tesla, Weber, MW_M3_TO_EV_M3_S,
};
pub use plasmacore_geometry::{Geometry, GeometryError, Mesh};
pub use plasmacore_transport::{
    derive_scalars, is_physical, linear_solve, newton_solve, per_variable_converged, residual, run_many,
    AdaptiveTimestepConfig, Block1DCoeffs, BoundaryCondition, CancellationToken, CoefficientBuilder,
    CoefficientCache, ConvergenceTolerances, CoreProfiles, DerivedScalars, DynamicParams,
    DynamicParamsProvider, EdgeBoundary, Equation, EquationCoeffs, FiniteDifferenceJacobian,
    FlattenedState, JacobianStrategy, LinearSolveDiagnostics, LinearSolveMethod, MHDModel,
    NeoclassicalModel, NewtonDiagnostics, NewtonFailureReason, NewtonResult, Orchestrator,
    OrchestratorConfig, PedestalModel, ProgressInfo, ScaledState, SerializedProfiles, SimTime,
    SimulationResult, SimulationSnapshot, SimulationState, SimulationStatistics, SourceModel,
    SourceTerm, StateLayout, StaticParams, StepEvent, StepEventKind, StepOutcome, Theta,
    TimestepController, TransportCoeffs, TransportError, TransportModel, VariableBoundaryConditions,
    DENSITY_FLOOR,
};
