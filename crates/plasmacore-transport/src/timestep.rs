//! Adaptive timestep control: CFL-limited proposal, growth cap, and the
//! retry/backoff ladder on Newton failure.

use crate::params::AdaptiveTimestepConfig;

/// Proposes and bounds the next timestep.
///
/// Constructed with the caller-supplied `effective_min_dt` as a required
/// argument, never a hardcoded default: mis-wiring the floor is the known
/// historical failure mode this type exists to make impossible to compile.
#[derive(Clone, Copy, Debug)]
pub struct TimestepController {
    config: AdaptiveTimestepConfig,
    effective_min_dt: f64,
}

impl TimestepController {
    /// Builds a [`TimestepController`]. `effective_min_dt` must be supplied
    /// explicitly by the caller (typically `config.effective_min_dt()`) so
    /// the binding between config and controller cannot silently drift.
    #[must_use]
    pub fn new(config: AdaptiveTimestepConfig, effective_min_dt: f64) -> Self {
        Self {
            config,
            effective_min_dt,
        }
    }

    /// The floor this controller enforces.
    #[must_use]
    pub fn effective_min_dt(&self) -> f64 {
        self.effective_min_dt
    }

    /// Proposes the next `dt` from the CFL limit, the growth cap relative to
    /// `last_dt`, and the floor/ceiling.
    ///
    /// `dt_raw = safetyFactor · Δρ̂² / max(χ, D)`; `dt = min(dt_raw, last_dt
    /// · maxTimestepGrowth)`, then clamped to `[effective_min_dt, maxDt]`.
    #[must_use]
    pub fn propose_dt(&self, d_rho: f64, max_diffusivity: f64, last_dt: f64) -> f64 {
        let dt_raw = self.config.safety_factor * d_rho * d_rho / max_diffusivity.max(f64::MIN_POSITIVE);
        let growth_capped = dt_raw.min(last_dt * self.config.max_timestep_growth);
        growth_capped.clamp(self.effective_min_dt, self.config.max_dt)
    }

    /// Halves `dt` for a retry after a Newton failure. Returns `None` if the
    /// halved value would fall below `effective_min_dt`, signaling the
    /// caller should treat the step as a terminal failure.
    #[must_use]
    pub fn retry_dt(&self, dt: f64) -> Option<f64> {
        let halved = dt / 2.0;
        if halved < self.effective_min_dt {
            None
        } else {
            Some(halved)
        }
    }

    /// The maximum number of retries this controller's config allows.
    #[must_use]
    pub fn max_dt_retries(&self) -> usize {
        self.config.max_dt_retries
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn controller(max_dt: f64, growth: f64, min_dt_fraction: f64) -> TimestepController {
        let config = AdaptiveTimestepConfig {
            min_dt: None,
            min_dt_fraction,
            max_dt,
            safety_factor: 0.5,
            max_timestep_growth: growth,
            max_dt_retries: 3,
        };
        let effective_min_dt = config.effective_min_dt();
        TimestepController::new(config, effective_min_dt)
    }

    #[test]
    fn growth_cap_limits_a_large_cfl_proposal() {
        // dt_raw = 0.5 * d_rho^2 / max_diffusivity chosen so the CFL limit
        // alone would exceed last_dt * growth; the cap should bind.
        let controller = controller(1.0, 1.2, 1e-6);
        let d_rho = 0.0358_f64; // chosen so 0.5*d_rho^2/1.0 ~= 6.4e-4
        let last_dt = 1.5e-4;
        let dt = controller.propose_dt(d_rho, 1.0, last_dt);
        assert_relative_eq!(dt, 1.8e-4, max_relative = 1e-2);
    }

    #[test]
    fn dt_never_exceeds_max_dt() {
        let controller = controller(1e-3, 10.0, 1e-6);
        let dt = controller.propose_dt(10.0, 1.0, 1e-3);
        assert!(dt <= 1e-3);
    }

    #[test]
    fn dt_never_falls_below_effective_min_dt() {
        let controller = controller(1.0, 1.2, 1e-2);
        let dt = controller.propose_dt(1e-9, 1e6, 1e-9);
        assert!(dt >= controller.effective_min_dt());
    }

    #[test]
    fn retry_halves_until_below_floor() {
        let config = AdaptiveTimestepConfig {
            min_dt: Some(1e-5),
            min_dt_fraction: 1e-5,
            max_dt: 1.0,
            safety_factor: 0.5,
            max_timestep_growth: 1.2,
            max_dt_retries: 3,
        };
        let controller = TimestepController::new(config, 1e-5);
        let mut dt = 1.8e-4;
        let mut halvings = Vec::new();
        loop {
            match controller.retry_dt(dt) {
                Some(next) => {
                    halvings.push(next);
                    dt = next;
                }
                None => break,
            }
        }
        let expected = vec![9e-5, 4.5e-5, 2.25e-5, 1.125e-5];
        assert_eq!(halvings.len(), expected.len());
        for (got, want) in halvings.iter().zip(expected.iter()) {
            assert_relative_eq!(got, want, max_relative = 1e-6);
        }
    }
}
