//! Plain-data snapshot, progress, and result types emitted across the
//! progress/snapshot port — this core's only outward-facing surface besides
//! the physics-model callbacks it consumes.
//!
//! None of these types carry a serialization format of their own
//! (persistence is out of scope here); `SerializedProfiles` is a plain
//! `Vec<f64>` per variable, ready for an external driver to encode however
//! it likes.

use plasmacore_geometry::Geometry;

use crate::profiles::CoreProfiles;

/// Compensated (Kahan) summation accumulator for simulation time.
///
/// Time must accumulate in higher precision than the working float type;
/// absent a wider float, Kahan summation recovers most of that precision
/// within `f64` alone across the many small `dt` additions a long run
/// performs.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimTime {
    sum: f64,
    compensation: f64,
}

impl SimTime {
    /// Starts the accumulator at `initial`.
    #[must_use]
    pub fn new(initial: f64) -> Self {
        Self {
            sum: initial,
            compensation: 0.0,
        }
    }

    /// The current accumulated time.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.sum
    }

    /// Advances time by `dt` using compensated summation.
    pub fn advance(&mut self, dt: f64) {
        let y = dt - self.compensation;
        let t = self.sum + y;
        self.compensation = (t - self.sum) - y;
        self.sum = t;
    }
}

/// Plain-float snapshot of a [`CoreProfiles`], with no structure of its own
/// beyond the four per-variable arrays.
#[derive(Clone, Debug, PartialEq)]
pub struct SerializedProfiles {
    /// Ion temperature, eV.
    pub ti: Vec<f64>,
    /// Electron temperature, eV.
    pub te: Vec<f64>,
    /// Electron density, m⁻³.
    pub ne: Vec<f64>,
    /// Poloidal flux, Wb.
    pub psi: Vec<f64>,
}

impl From<&CoreProfiles> for SerializedProfiles {
    fn from(profiles: &CoreProfiles) -> Self {
        Self {
            ti: profiles.ti.value().to_vec(),
            te: profiles.te.value().to_vec(),
            ne: profiles.ne.value().to_vec(),
            psi: profiles.psi.value().to_vec(),
        }
    }
}

const EV_TO_JOULE: f64 = 1.602_176_634e-19;

/// Scalar diagnostics derived from a [`CoreProfiles`] against a [`Geometry`];
/// the "derived scalars" the orchestrator publishes alongside each snapshot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DerivedScalars {
    /// Central-cell ion temperature, eV.
    pub central_ti: f64,
    /// Central-cell electron temperature, eV.
    pub central_te: f64,
    /// Central-cell electron density, m⁻³.
    pub central_ne: f64,
    /// Volume-averaged electron density, m⁻³.
    pub volume_averaged_ne: f64,
    /// Total thermal stored energy, `W = (3/2) ∫ nₑ(Tᵢ + Tₑ) dV`, joules.
    pub stored_energy_joules: f64,
}

/// Computes [`DerivedScalars`] from the current profiles and geometry.
#[must_use]
pub fn derive_scalars(profiles: &CoreProfiles, geometry: &Geometry) -> DerivedScalars {
    let ti = profiles.ti.value();
    let te = profiles.te.value();
    let ne = profiles.ne.value();
    let cell_volume = geometry.volume().value();

    let total_volume: f64 = cell_volume.sum();
    let ne_volume_integral: f64 = ne.iter().zip(cell_volume.iter()).map(|(n, v)| n * v).sum();
    let volume_averaged_ne = if total_volume > 0.0 {
        ne_volume_integral / total_volume
    } else {
        0.0
    };

    let energy_density_integral: f64 = ne
        .iter()
        .zip(ti.iter())
        .zip(te.iter())
        .zip(cell_volume.iter())
        .map(|(((n, t_i), t_e), v)| 1.5 * n * (t_i + t_e) * v)
        .sum();
    let stored_energy_joules = energy_density_integral * EV_TO_JOULE;

    DerivedScalars {
        central_ti: ti[0],
        central_te: te[0],
        central_ne: ne[0],
        volume_averaged_ne,
        stored_energy_joules,
    }
}

/// Throttled progress information, emitted at most every `K` steps.
#[derive(Clone, Debug)]
pub struct ProgressInfo {
    /// The step index just committed.
    pub step: usize,
    /// The total planned step count, if known.
    pub total_steps: Option<usize>,
    /// The current simulation time.
    pub current_time: f64,
    /// The current profiles.
    pub profiles: CoreProfiles,
    /// Derived scalars, if a caller requested them.
    pub derived: Option<DerivedScalars>,
}

/// A point-in-time snapshot, emitted once per accepted step.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationSnapshot {
    /// The simulation time this snapshot was taken at.
    pub time: f64,
    /// The serialized profiles at this time.
    pub profiles: SerializedProfiles,
    /// Serialized derived scalars, if requested.
    pub derived: Option<DerivedScalars>,
}

/// Running counters describing a simulation's progress so far.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SimulationStatistics {
    /// Number of steps committed.
    pub accepted_steps: usize,
    /// Number of dt-halving retries performed across the run.
    pub retried_steps: usize,
    /// The most recently accepted `dt`.
    pub last_dt: f64,
}

/// The final result, emitted once at termination.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationResult {
    /// The serialized final profiles.
    pub final_profiles: SerializedProfiles,
    /// The run's accumulated statistics.
    pub statistics: SimulationStatistics,
}

/// What happened during one attempted step, logged for post-mortem
/// diagnosis in lieu of a logging crate (see crate docs).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StepEventKind {
    /// The CFL-raw timestep proposal was capped by the growth limit.
    GrowthCapped {
        /// The CFL-raw proposal before capping.
        dt_raw: f64,
        /// The growth-capped value actually used.
        dt_used: f64,
    },
    /// Newton failed to converge; the step is being retried at a halved
    /// `dt`.
    Retried {
        /// The `dt` that failed to converge.
        failed_dt: f64,
        /// The halved `dt` about to be retried.
        retry_dt: f64,
        /// Which retry attempt this is, 1-indexed.
        attempt: usize,
    },
    /// The step failed terminally: retries exhausted or `dt` fell below
    /// `effective_min_dt`.
    Terminal {
        /// The last `dt` attempted before giving up.
        last_dt: f64,
    },
}

/// One structured event, timestamped by the step and time it occurred at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepEvent {
    /// The step index this event occurred during.
    pub step: usize,
    /// The simulation time at the start of this step.
    pub time: f64,
    /// What happened.
    pub kind: StepEventKind,
}

/// The orchestrator's full mutable state: `{time, lastDt, step, profiles,
/// statistics}` plus the event log.
#[derive(Clone, Debug)]
pub struct SimulationState {
    /// Accumulated simulation time.
    pub time: SimTime,
    /// The most recently accepted `dt`.
    pub last_dt: f64,
    /// The number of steps committed so far.
    pub step: usize,
    /// The current profiles.
    pub profiles: CoreProfiles,
    /// Running statistics.
    pub statistics: SimulationStatistics,
    /// The structured event log.
    pub events: Vec<StepEvent>,
}

impl SimulationState {
    /// Builds the initial state at `t = 0`.
    #[must_use]
    pub fn initial(profiles: CoreProfiles, initial_dt: f64) -> Self {
        Self {
            time: SimTime::new(0.0),
            last_dt: initial_dt,
            step: 0,
            profiles,
            statistics: SimulationStatistics {
                last_dt: initial_dt,
                ..SimulationStatistics::default()
            },
            events: Vec::new(),
        }
    }
}
