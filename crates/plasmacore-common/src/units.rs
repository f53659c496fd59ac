//! Physical unit aliases and the source-term conversion factor.
//!
//! These are plain `f64` aliases, not newtypes: the profile and coefficient
//! arrays that carry them are bulk-processed by `ndarray` and a wrapper type
//! per element would cost a conversion at every FVM face loop. The aliases
//! exist so signatures read as physics rather than as bare `f64`.

use derive_is_enum_variant::is_enum_variant;

/// Temperature, in electron-volts.
pub type ElectronVolt = f64;

/// Number density, in particles per cubic meter.
pub type PerCubicMeter = f64;

/// Time, in seconds.
pub type Second = f64;

/// Length, in meters.
pub type Meter = f64;

/// Magnetic field strength, in tesla.
pub type Tesla = f64;

/// Poloidal flux, in weber.
pub type Weber = f64;

/// Volumetric power density, in megawatts per cubic meter.
pub type MegawattsPerCubicMeter = f64;

/// Converts a source term between the two units it is allowed to arrive in.
///
/// Source models may supply power densities in MW/m^3 (the unit used by
/// experimental and machine-description data) or directly in the solver's
/// internal eV * m^-3 * s^-1 units. The tag makes the call site's intent
/// explicit instead of leaving a bare `f64` to be misinterpreted downstream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, is_enum_variant)]
pub enum SourceUnit {
    /// Megawatts per cubic meter, as commonly tabulated for auxiliary heating.
    MegawattsPerCubicMeter,
    /// Electron-volts per cubic meter per second, the solver's native unit.
    EvPerCubicMeterPerSecond,
}

/// Converts one MW/m^3 into eV * m^-3 * s^-1.
///
/// `1 MW/m^3 = 1e6 J / (s * m^3)`, and `1 eV = 1.602176634e-19 J`, giving
/// `1 / 1.602176634e-19 * 1e6 = 6.2415090744e24`.
pub const MW_M3_TO_EV_M3_S: f64 = 6.241_509_074_4e24;

/// Converts a volumetric source term to the solver's native eV * m^-3 * s^-1
/// unit, given the unit it was supplied in.
#[must_use]
pub fn to_native_source_unit(value: f64, unit: SourceUnit) -> f64 {
    match unit {
        SourceUnit::MegawattsPerCubicMeter => value * MW_M3_TO_EV_M3_S,
        SourceUnit::EvPerCubicMeterPerSecond => value,
    }
}
