//! The orchestrator boundary: per-step dataflow, the dt-halving retry
//! ladder, cooperative cancellation/pause, and throttled progress.
//!
//! `run_many` drives several independent [`Orchestrator`] instances
//! concurrently with `rayon`'s `par_iter_mut`, grounded in this teacher's
//! own pattern for driving many independent stateful units to completion in
//! parallel (`Heap::poincare`'s `particles.par_iter_mut().try_for_each`).
//! Each simulation owns its state; nothing is shared across the parallel
//! iteration.

use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ndarray::Array1;
use plasmacore_common::EvaluatedTensor1;
use plasmacore_geometry::Geometry;
use rayon::iter::{IntoParallelRefMutIterator, ParallelIterator};

use crate::cache::CoefficientCache;
use crate::coefficients::CoefficientBuilder;
use crate::contracts::{MHDModel, NeoclassicalModel, PedestalModel, SourceModel, TransportModel};
use crate::error::TransportError;
use crate::jacobian::JacobianStrategy;
use crate::newton::{newton_solve, ConvergenceTolerances};
use crate::params::{DynamicParams, StaticParams};
use crate::profiles::{CoreProfiles, FlattenedState, ScaledState, StateLayout};
use crate::snapshot::{
    derive_scalars, SimulationSnapshot, SimulationState, SimulationStatistics, StepEvent, StepEventKind,
};
use crate::timestep::TimestepController;
use crate::Result;

/// A cooperative cancellation flag, cheap to clone and share across threads.
///
/// Polled at each outer-loop iteration and before each retry attempt within
/// a step; cancellation is never surfaced as an `Err` (it unwinds cleanly
/// and preserves the last committed state).
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Builds a fresh, un-cancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Supplies the boundary conditions and plasma current in effect at a given
/// simulation time. Implementors must be stateless functions of `time`: the
/// orchestrator may call this more than once per step (once at `t`, once
/// per retry at `t + dt`).
pub trait DynamicParamsProvider: Send + Sync {
    /// Builds the [`DynamicParams`] in effect at `time`, for a trial step of
    /// size `dt`.
    fn at(&self, time: f64, dt: f64) -> DynamicParams;
}

/// The outcome of one call to [`Orchestrator::step`].
#[derive(Debug)]
pub enum StepOutcome {
    /// A step was committed; carries the accepted snapshot.
    Committed(SimulationSnapshot),
    /// The step was abandoned due to cancellation; the last committed state
    /// is unchanged.
    Cancelled,
    /// The orchestrator is paused; no work was attempted.
    Paused,
    /// The step failed terminally: retries exhausted, or `dt` fell below
    /// `effective_min_dt` before convergence.
    Failed(TransportError),
}

/// Throttling configuration for progress emission.
#[derive(Clone, Copy, Debug)]
pub struct OrchestratorConfig {
    /// A [`crate::snapshot::ProgressInfo`] is due at most every
    /// `every_k_steps` committed steps (see [`Orchestrator::progress_due`]).
    pub every_k_steps: usize,
    /// Whether to compute and attach [`crate::snapshot::DerivedScalars`] to
    /// each snapshot.
    pub compute_derived: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            every_k_steps: 10,
            compute_derived: true,
        }
    }
}

fn unflatten(x: &Array1<f64>, layout: &StateLayout) -> CoreProfiles {
    FlattenedState::from_values(EvaluatedTensor1::from_array(x.clone()), *layout).unflatten()
}

/// Drives one simulation forward, one step at a time.
///
/// Pure advancement given `(xⁿ, staticParams, dynamicParams)`: all mutable
/// state lives in `self.state`, owned exclusively by this orchestrator.
pub struct Orchestrator<'m> {
    geometry: Geometry,
    static_params: StaticParams,
    transport: &'m dyn TransportModel,
    sources: Vec<&'m dyn SourceModel>,
    pedestal: Option<&'m dyn PedestalModel>,
    mhd: Option<&'m dyn MHDModel>,
    neoclassical: Option<&'m dyn NeoclassicalModel>,
    dynamic_params_provider: &'m dyn DynamicParamsProvider,
    jacobian_strategy: &'m dyn JacobianStrategy,
    timestep_controller: TimestepController,
    tolerances: ConvergenceTolerances,
    scale: ScaledState,
    config: OrchestratorConfig,
    paused: bool,
    state: SimulationState,
}

impl<'m> Orchestrator<'m> {
    /// Builds an [`Orchestrator`] from its physics models, geometry, and
    /// initial profiles. `initial_dt` seeds the first CFL proposal's growth
    /// cap.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        geometry: Geometry,
        static_params: StaticParams,
        transport: &'m dyn TransportModel,
        sources: Vec<&'m dyn SourceModel>,
        pedestal: Option<&'m dyn PedestalModel>,
        mhd: Option<&'m dyn MHDModel>,
        neoclassical: Option<&'m dyn NeoclassicalModel>,
        dynamic_params_provider: &'m dyn DynamicParamsProvider,
        jacobian_strategy: &'m dyn JacobianStrategy,
        timestep_controller: TimestepController,
        scale: ScaledState,
        initial_profiles: CoreProfiles,
        initial_dt: f64,
    ) -> Self {
        Self {
            geometry,
            static_params,
            transport,
            sources,
            pedestal,
            mhd,
            neoclassical,
            dynamic_params_provider,
            jacobian_strategy,
            timestep_controller,
            tolerances: ConvergenceTolerances::default(),
            scale,
            config: OrchestratorConfig::default(),
            paused: false,
            state: SimulationState::initial(initial_profiles, initial_dt),
        }
    }

    /// The current (last-committed) simulation state.
    #[must_use]
    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Pauses the orchestrator; subsequent [`Orchestrator::step`] calls
    /// return [`StepOutcome::Paused`] without attempting work.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resumes a paused orchestrator.
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Whether the orchestrator is currently paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    fn layout(&self) -> StateLayout {
        StateLayout::new(self.static_params.n_cells)
    }

    /// Attempts one step: build `dynamicParams` at `t` and `t+dt`, propose
    /// `dt`, run Newton, and either commit or retry/fail per the dt-halving
    /// ladder.
    pub fn step(&mut self, cancellation: &CancellationToken) -> StepOutcome {
        if cancellation.is_cancelled() {
            return StepOutcome::Cancelled;
        }
        if self.paused {
            return StepOutcome::Paused;
        }

        let t = self.state.time.value();
        let layout = self.layout();
        let d_rho = self.geometry.mesh().d_rho();
        let theta = self.static_params.theta;

        let dynamic_params_n = self.dynamic_params_provider.at(t, self.state.last_dt);
        let builder_n = CoefficientBuilder {
            transport: self.transport,
            sources: &self.sources,
            pedestal: self.pedestal,
            mhd: self.mhd,
            neoclassical: self.neoclassical,
            dynamic_params: &dynamic_params_n,
        };
        let coeffs_n = match builder_n.build(&self.state.profiles, &self.geometry) {
            Ok(c) => c,
            Err(err) => return StepOutcome::Failed(err),
        };

        let max_diffusivity = [&coeffs_n.ti, &coeffs_n.te, &coeffs_n.ne]
            .iter()
            .flat_map(|eq| eq.d_face.value().iter().copied())
            .fold(0.0_f64, f64::max);

        let mut dt = self
            .timestep_controller
            .propose_dt(d_rho, max_diffusivity, self.state.last_dt);

        // Cloned into owned locals so the residual closure below never
        // borrows `self` directly — it only needs the profiles as they were
        // at the start of the step, which cannot change mid-retry-loop.
        let ti_n = self.state.profiles.ti.value().clone();
        let te_n = self.state.profiles.te.value().clone();
        let ne_n = self.state.profiles.ne.value().clone();
        let psi_n = self.state.profiles.psi.value().clone();

        let x_n = FlattenedState::flatten(&self.state.profiles, &layout);
        let x_n_scaled = self.scale.scale(x_n.values().value(), &layout);
        let scale = self.scale;
        let geometry = self.geometry.clone();
        let transport = self.transport;
        let sources = self.sources.clone();
        let pedestal = self.pedestal;
        let mhd = self.mhd;
        let neoclassical = self.neoclassical;

        let mut attempt = 0_usize;
        loop {
            if cancellation.is_cancelled() {
                return StepOutcome::Cancelled;
            }

            let dynamic_params_np1 = self.dynamic_params_provider.at(t + dt, dt);
            let bc_np1 = dynamic_params_np1.boundary_conditions;
            let builder_np1 = CoefficientBuilder {
                transport,
                sources: &sources,
                pedestal,
                mhd,
                neoclassical,
                dynamic_params: &dynamic_params_np1,
            };
            // A fresh cache per retry attempt: timestep/Newton retries do
            // not share state between attempts, each rebuilds coefficients
            // from scratch. Wrapped in a `RefCell` so the residual closure
            // below can stay a `Fn` (required by `newton_solve`) while still
            // memoizing across the repeated nearby-iterate evaluations
            // within one attempt.
            let coeff_cache = RefCell::new(CoefficientCache::default());

            let residual_fn = |x_tilde: &Array1<f64>| -> Array1<f64> {
                let x_np1 = scale.unscale(x_tilde, &layout);
                let profiles_np1 = unflatten(&x_np1, &layout);
                let mut cache = coeff_cache.borrow_mut();
                let coeffs_np1 = match cache.get(&profiles_np1, dt) {
                    Some(cached) => cached.clone(),
                    None => {
                        let built = builder_np1
                            .build(&profiles_np1, &geometry)
                            .expect("coefficients must build for an internally-consistent candidate state");
                        cache.insert(&profiles_np1, dt, built.clone());
                        built
                    }
                };
                crate::residual::residual(
                    &ti_n,
                    profiles_np1.ti.value(),
                    &te_n,
                    profiles_np1.te.value(),
                    &ne_n,
                    profiles_np1.ne.value(),
                    &psi_n,
                    profiles_np1.psi.value(),
                    dt,
                    theta,
                    &coeffs_n,
                    &coeffs_np1,
                    &bc_np1,
                    d_rho,
                )
                .into_value()
            };

            let result = newton_solve(
                &x_n_scaled,
                &layout,
                &residual_fn,
                self.jacobian_strategy,
                &self.tolerances,
                self.static_params.max_newton_iter,
            );

            if result.converged {
                let x_np1 = self.scale.unscale(&result.state, &layout);
                let profiles_np1 = unflatten(&x_np1, &layout);

                self.state.time.advance(dt);
                self.state.step += 1;
                self.state.last_dt = dt;
                self.state.profiles = profiles_np1.clone();
                self.state.statistics = SimulationStatistics {
                    accepted_steps: self.state.statistics.accepted_steps + 1,
                    retried_steps: self.state.statistics.retried_steps + attempt,
                    last_dt: dt,
                };

                let derived = self
                    .config
                    .compute_derived
                    .then(|| derive_scalars(&profiles_np1, &self.geometry));
                let snapshot = SimulationSnapshot {
                    time: self.state.time.value(),
                    profiles: (&profiles_np1).into(),
                    derived,
                };
                return StepOutcome::Committed(snapshot);
            }

            if attempt >= self.timestep_controller.max_dt_retries() {
                return StepOutcome::Failed(TransportError::StepFailed {
                    time: t,
                    last_dt: dt,
                    reason: format!("{:?}", result.reason),
                });
            }

            match self.timestep_controller.retry_dt(dt) {
                Some(next_dt) => {
                    attempt += 1;
                    self.state.events.push(StepEvent {
                        step: self.state.step,
                        time: t,
                        kind: StepEventKind::Retried {
                            failed_dt: dt,
                            retry_dt: next_dt,
                            attempt,
                        },
                    });
                    dt = next_dt;
                }
                None => {
                    self.state.events.push(StepEvent {
                        step: self.state.step,
                        time: t,
                        kind: StepEventKind::Terminal { last_dt: dt },
                    });
                    return StepOutcome::Failed(TransportError::StepFailed {
                        time: t,
                        last_dt: dt,
                        reason: "dt fell below effective_min_dt before convergence".into(),
                    });
                }
            }
        }
    }

    /// Whether a [`crate::snapshot::ProgressInfo`] is due after this step,
    /// per `every_k_steps` throttling.
    #[must_use]
    pub fn progress_due(&self) -> bool {
        self.config.every_k_steps == 0 || self.state.step % self.config.every_k_steps == 0
    }
}

/// Drives several independent [`Orchestrator`] instances concurrently,
/// each for up to `steps_per_sim` steps (or until cancellation/failure).
///
/// No shared mutable state crosses the parallel iteration: each
/// orchestrator owns its own state and event log.
pub fn run_many<'m>(
    orchestrators: &mut [Orchestrator<'m>],
    steps_per_sim: usize,
    cancellation: &CancellationToken,
) -> Vec<Result<()>> {
    orchestrators
        .par_iter_mut()
        .map(|orchestrator| {
            for _ in 0..steps_per_sim {
                match orchestrator.step(cancellation) {
                    StepOutcome::Committed(_) => continue,
                    StepOutcome::Cancelled | StepOutcome::Paused => break,
                    StepOutcome::Failed(err) => return Err(err),
                }
            }
            Ok(())
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::boundary::VariableBoundaryConditions;
    use crate::contracts::{Equation, SourceTerm, TransportCoeffs};
    use crate::jacobian::FiniteDifferenceJacobian;
    use crate::params::AdaptiveTimestepConfig;
    use approx::assert_relative_eq;
    use plasmacore_common::SourceUnit;
    use plasmacore_geometry::Mesh;

    struct PureDiffusion;
    impl TransportModel for PureDiffusion {
        fn compute(
            &self,
            profiles: &CoreProfiles,
            _geometry: &Geometry,
            _params: &DynamicParams,
        ) -> Result<TransportCoeffs> {
            let n = profiles.n_cells();
            Ok(TransportCoeffs {
                chi_i: EvaluatedTensor1::ones(n),
                chi_e: EvaluatedTensor1::ones(n),
                d: EvaluatedTensor1::zeros(n),
                v: EvaluatedTensor1::zeros(n),
            })
        }
    }

    struct FixedBoundary;
    impl DynamicParamsProvider for FixedBoundary {
        fn at(&self, _time: f64, dt: f64) -> DynamicParams {
            DynamicParams {
                boundary_conditions: VariableBoundaryConditions::typical(1000.0, 1000.0, 5e19, 0.0)
                    .unwrap(),
                dt,
                plasma_current: 1e6,
            }
        }
    }

    fn sample_setup(n: usize) -> (Geometry, StaticParams, CoreProfiles) {
        let mesh = Mesh::uniform(n).unwrap();
        let geometry = Geometry::circular(mesh, 6.2, 2.0, 5.3, 1.0, 3.0).unwrap();
        let static_params = StaticParams {
            n_cells: n,
            ..StaticParams::default()
        };
        let profiles = CoreProfiles::new(
            EvaluatedTensor1::from_array(Array1::from_elem(n, 1000.0)),
            EvaluatedTensor1::from_array(Array1::from_elem(n, 1000.0)),
            EvaluatedTensor1::from_array(Array1::from_elem(n, 5e19)),
            EvaluatedTensor1::zeros(n),
        )
        .unwrap();
        (geometry, static_params, profiles)
    }

    #[test]
    fn step_commits_and_advances_time_for_a_well_posed_diffusion_problem() {
        let (geometry, static_params, profiles) = sample_setup(6);
        let transport = PureDiffusion;
        let provider = FixedBoundary;
        let jacobian_strategy = FiniteDifferenceJacobian;
        let timestep_config = AdaptiveTimestepConfig {
            max_dt: 1e-2,
            ..AdaptiveTimestepConfig::default()
        };
        let controller = TimestepController::new(timestep_config, timestep_config.effective_min_dt());
        let scale = ScaledState::new(1000.0, 1000.0, 5e19, 1.0);

        let mut orchestrator = Orchestrator::new(
            geometry,
            static_params,
            &transport,
            vec![],
            None,
            None,
            None,
            &provider,
            &jacobian_strategy,
            controller,
            scale,
            profiles,
            1e-4,
        );

        let token = CancellationToken::new();
        match orchestrator.step(&token) {
            StepOutcome::Committed(snapshot) => {
                assert!(snapshot.time > 0.0);
                assert_eq!(orchestrator.state().step, 1);
            }
            other => panic!("expected a committed step, got {other:?}"),
        }
    }

    #[test]
    fn paused_orchestrator_does_not_step() {
        let (geometry, static_params, profiles) = sample_setup(4);
        let transport = PureDiffusion;
        let provider = FixedBoundary;
        let jacobian_strategy = FiniteDifferenceJacobian;
        let controller = TimestepController::new(
            AdaptiveTimestepConfig::default(),
            AdaptiveTimestepConfig::default().effective_min_dt(),
        );
        let scale = ScaledState::new(1000.0, 1000.0, 5e19, 1.0);

        let mut orchestrator = Orchestrator::new(
            geometry,
            static_params,
            &transport,
            vec![],
            None,
            None,
            None,
            &provider,
            &jacobian_strategy,
            controller,
            scale,
            profiles,
            1e-4,
        );
        orchestrator.pause();
        let token = CancellationToken::new();
        assert!(matches!(orchestrator.step(&token), StepOutcome::Paused));
    }

    #[test]
    fn cancellation_token_is_observed() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }

    /// A flat diffusivity, independent of the profiles it is handed.
    struct FlatDiffusivity(f64);
    impl TransportModel for FlatDiffusivity {
        fn compute(
            &self,
            profiles: &CoreProfiles,
            _geometry: &Geometry,
            _params: &DynamicParams,
        ) -> Result<TransportCoeffs> {
            let n = profiles.n_cells();
            Ok(TransportCoeffs {
                chi_i: EvaluatedTensor1::from_array(Array1::from_elem(n, self.0)),
                chi_e: EvaluatedTensor1::from_array(Array1::from_elem(n, self.0)),
                d: EvaluatedTensor1::zeros(n),
                v: EvaluatedTensor1::zeros(n),
            })
        }
    }

    /// A uniform, constant-in-time `Ti` source, already in the solver's
    /// native eV·m⁻³·s⁻¹ unit.
    struct UniformTiSource(f64);
    impl SourceModel for UniformTiSource {
        fn compute(
            &self,
            profiles: &CoreProfiles,
            _geometry: &Geometry,
            _params: &DynamicParams,
        ) -> Result<Vec<SourceTerm>> {
            let n = profiles.n_cells();
            Ok(vec![SourceTerm {
                equation: Equation::Ti,
                value: EvaluatedTensor1::from_array(Array1::from_elem(n, self.0)),
                unit: SourceUnit::EvPerCubicMeterPerSecond,
            }])
        }
    }

    struct ZeroEdgeBoundary;
    impl DynamicParamsProvider for ZeroEdgeBoundary {
        fn at(&self, _time: f64, dt: f64) -> DynamicParams {
            DynamicParams {
                boundary_conditions: VariableBoundaryConditions::typical(0.0, 1000.0, 1e19, 0.0)
                    .unwrap(),
                dt,
                plasma_current: 1e6,
            }
        }
    }

    /// Spec §8's E1 scenario: `N = 25`, pure diffusion, 100 steps, checked
    /// against the steady-state analytic parabola.
    ///
    /// A sourceless run never reaches this shape: with `Neumann(0)` at the
    /// core and `Dirichlet` at the edge, zero net source relaxes to whatever
    /// the initial condition's slowest-decaying mode is, not to `Ti`'s
    /// textbook steady conduction profile. The textbook parabola
    /// `T(ρ̂) = Tc·(1 − ρ̂²)` is the steady solution of `D·Ti'' = source_cell`
    /// with a *uniform* volumetric source, so this test supplies the uniform
    /// source `source_cell = D·Ti'' = D·(−2Tc) = −2·D·Tc` that makes the
    /// parabola the exact fixed point, then runs the orchestrator forward
    /// until it relaxes onto it.
    #[test]
    fn diffusion_relaxes_to_the_analytic_parabola() {
        let n = 25;
        let mesh = Mesh::uniform(n).unwrap();
        let rho_hat = mesh.cell_centers().value().clone();
        let r_minor = 1.0;
        let geometry = Geometry::circular(mesh, 6.2, r_minor, 5.3, 1.0, 3.0).unwrap();

        let chi = 1.0;
        let d_face = chi / r_minor;
        let t_center = 1000.0;
        let source = -2.0 * d_face * t_center;

        let static_params = StaticParams {
            n_cells: n,
            r_major: 6.2,
            r_minor,
            b_toroidal: 5.3,
            ..StaticParams::default()
        };
        let profiles = CoreProfiles::new(
            EvaluatedTensor1::from_array(Array1::from_elem(n, 500.0)),
            EvaluatedTensor1::from_array(Array1::from_elem(n, 1000.0)),
            EvaluatedTensor1::from_array(Array1::from_elem(n, 1e19)),
            EvaluatedTensor1::zeros(n),
        )
        .unwrap();

        let transport = FlatDiffusivity(chi);
        let ti_source = UniformTiSource(source);
        let provider = ZeroEdgeBoundary;
        let jacobian_strategy = FiniteDifferenceJacobian;
        // `Ti`'s transient coefficient is `ne` (floored at `DENSITY_FLOOR =
        // 1e19`), so reaching this equation's relaxation time (`~ne/D`)
        // within 100 steps needs a correspondingly large `dt`; θ = 1 is
        // unconditionally stable, so this is just a large implicit step, not
        // an accuracy compromise. The CFL proposal is irrelevant here (it
        // would suggest a far smaller `dt`), so `min_dt` pins every step to
        // this value via the controller's floor clamp.
        let dt = 4e17;
        let timestep_config = AdaptiveTimestepConfig {
            min_dt: Some(dt),
            max_dt: dt,
            ..AdaptiveTimestepConfig::default()
        };
        let controller = TimestepController::new(timestep_config, timestep_config.effective_min_dt());
        let scale = ScaledState::new(1000.0, 1000.0, 1e19, 1.0);

        let sources: Vec<&dyn SourceModel> = vec![&ti_source];
        let mut orchestrator = Orchestrator::new(
            geometry,
            static_params,
            &transport,
            sources,
            None,
            None,
            None,
            &provider,
            &jacobian_strategy,
            controller,
            scale,
            profiles,
            dt,
        );

        let token = CancellationToken::new();
        for _ in 0..100 {
            match orchestrator.step(&token) {
                StepOutcome::Committed(_) => {}
                other => panic!("expected every step to commit, got {other:?}"),
            }
        }

        let ti_final = orchestrator.state().profiles.ti.value();
        for (i, &rho) in rho_hat.iter().enumerate() {
            let analytic = t_center * (1.0 - rho * rho);
            assert_relative_eq!(ti_final[i], analytic, max_relative = 5e-3, epsilon = t_center * 5e-3);
        }
    }
}
