//! Static and dynamic runtime parameters, and the adaptive-timestep config.

use crate::boundary::VariableBoundaryConditions;
use crate::error::TransportError;
use crate::Result;

/// Which time discretization weighting to use. `θ = 1` is the default
/// (L-stable implicit); `θ = 0` is explicit; `θ = 0.5` is Crank–Nicolson.
pub type Theta = f64;

/// Immutable per-session parameters. Changing any field here requires
/// rebuilding the step function: it is not part of the per-step dynamic
/// contract.
#[derive(Clone, Copy, Debug)]
pub struct StaticParams {
    /// Number of radial cells `N`.
    pub n_cells: usize,
    /// Device major radius `R` \[m\].
    pub r_major: f64,
    /// Plasma minor radius `a` \[m\].
    pub r_minor: f64,
    /// Vacuum toroidal field on axis `Bt` \[T\].
    pub b_toroidal: f64,
    /// Whether the `Ti` equation is evolved this session.
    pub evolve_ti: bool,
    /// Whether the `Te` equation is evolved this session.
    pub evolve_te: bool,
    /// Whether the `ne` equation is evolved this session.
    pub evolve_ne: bool,
    /// Whether the `ψ` equation is evolved this session.
    pub evolve_psi: bool,
    /// The θ-method weight.
    pub theta: Theta,
    /// Maximum Newton iterations per step.
    pub max_newton_iter: usize,
}

impl Default for StaticParams {
    /// `θ = 1` (implicit), all four equations evolved, 30 Newton
    /// iterations.
    fn default() -> Self {
        Self {
            n_cells: 25,
            r_major: 6.2,
            r_minor: 2.0,
            b_toroidal: 5.3,
            evolve_ti: true,
            evolve_te: true,
            evolve_ne: true,
            evolve_psi: true,
            theta: 1.0,
            max_newton_iter: 30,
        }
    }
}

/// Per-step parameters that may change without recompiling the step
/// function: boundary conditions, model parameters, and the current `dt`.
#[derive(Clone, Debug)]
pub struct DynamicParams {
    /// Boundary conditions in effect for this step.
    pub boundary_conditions: VariableBoundaryConditions,
    /// The timestep size in effect for this step \[s\].
    pub dt: f64,
    /// Plasma current `Ip` \[A\], used by the `ψ` edge boundary condition
    /// and by neoclassical/MHD models.
    pub plasma_current: f64,
}

/// `{minDt?, minDtFraction?, maxDt, safetyFactor, maxTimestepGrowth}` with
/// `effective_min_dt` derived as a method, never stored, so it can never
/// drift from its own inputs.
#[derive(Clone, Copy, Debug)]
pub struct AdaptiveTimestepConfig {
    /// An explicit floor on `dt`, if set.
    pub min_dt: Option<f64>,
    /// A fraction of `max_dt` to use as the floor when `min_dt` is unset.
    pub min_dt_fraction: f64,
    /// The ceiling on `dt`.
    pub max_dt: f64,
    /// The CFL safety factor applied to the raw CFL-limited proposal.
    pub safety_factor: f64,
    /// The maximum ratio by which `dt` may grow between accepted steps.
    pub max_timestep_growth: f64,
    /// The maximum number of halving retries on a Newton failure.
    pub max_dt_retries: usize,
}

impl AdaptiveTimestepConfig {
    /// `effectiveMinDt = minDt ?? maxDt * minDtFraction`.
    ///
    /// This is the critical invariant the timestep controller is built
    /// around: it is recomputed from `self` every time, so a caller can
    /// never observe one `effective_min_dt` having been wired in from a
    /// stale copy.
    #[must_use]
    pub fn effective_min_dt(&self) -> f64 {
        self.min_dt.unwrap_or(self.max_dt * self.min_dt_fraction)
    }

    /// Validates `effectiveMinDt > 0 ∧ effectiveMinDt < maxDt`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Validation`] if the invariant does not
    /// hold.
    pub fn validate(&self) -> Result<()> {
        let effective_min_dt = self.effective_min_dt();
        if !(effective_min_dt > 0.0 && effective_min_dt < self.max_dt) {
            return Err(TransportError::Validation(format!(
                "effective_min_dt must lie in (0, max_dt): got {effective_min_dt}, max_dt={}",
                self.max_dt
            )));
        }
        Ok(())
    }
}

impl Default for AdaptiveTimestepConfig {
    /// `maxDt = 1.0`, `minDtFraction = 1e-5`, `safetyFactor = 0.5`, growth
    /// cap `1.2`, up to 3 retries.
    fn default() -> Self {
        Self {
            min_dt: None,
            min_dt_fraction: 1e-5,
            max_dt: 1.0,
            safety_factor: 0.5,
            max_timestep_growth: 1.2,
            max_dt_retries: 3,
        }
    }
}
