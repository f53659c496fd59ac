//! Physics-model contracts.
//!
//! These traits are the only crossing point between this core and a
//! transport/source/pedestal/MHD/neoclassical physics model. The core
//! neither implements nor assumes anything about what is inside a model
//! beyond the shapes and units its callback contract returns.

use plasmacore_common::{EvaluatedTensor1, SourceUnit};
use plasmacore_geometry::Geometry;

use crate::params::DynamicParams;
use crate::profiles::CoreProfiles;
use crate::Result;

/// Transport coefficients returned by a [`TransportModel`], all shape `[N]`.
#[derive(Clone, Debug)]
pub struct TransportCoeffs {
    /// Ion heat diffusivity `χᵢ`.
    pub chi_i: EvaluatedTensor1,
    /// Electron heat diffusivity `χₑ`.
    pub chi_e: EvaluatedTensor1,
    /// Particle diffusivity `D`.
    pub d: EvaluatedTensor1,
    /// Particle pinch/convection velocity `v`.
    pub v: EvaluatedTensor1,
}

/// A source term contribution, tagged with the unit it was computed in.
#[derive(Clone, Debug)]
pub struct SourceTerm {
    /// Which equation this term feeds: `Ti`, `Te`, `ne`, or `ψ`.
    pub equation: Equation,
    /// The per-cell source density, shape `[N]`.
    pub value: EvaluatedTensor1,
    /// The unit `value` is expressed in.
    pub unit: SourceUnit,
}

/// Which of the four coupled equations a per-equation quantity belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, derive_is_enum_variant::is_enum_variant)]
pub enum Equation {
    /// Ion temperature.
    Ti,
    /// Electron temperature.
    Te,
    /// Electron density.
    Ne,
    /// Poloidal flux.
    Psi,
}

/// A transport model: computes diffusivities and pinch velocity from the
/// current profiles and geometry.
pub trait TransportModel: Send + Sync {
    /// Computes `{χᵢ, χₑ, D, v}` from the current profiles and geometry.
    ///
    /// # Errors
    ///
    /// Implementors should return [`crate::error::TransportError::Resource`]
    /// if the model's own backend fails to produce a result.
    fn compute(
        &self,
        profiles: &CoreProfiles,
        geometry: &Geometry,
        params: &DynamicParams,
    ) -> Result<TransportCoeffs>;
}

/// A source model: computes heating/particle/current source densities.
pub trait SourceModel: Send + Sync {
    /// Computes the source terms this model contributes, each tagged with
    /// its unit.
    fn compute(
        &self,
        profiles: &CoreProfiles,
        geometry: &Geometry,
        params: &DynamicParams,
    ) -> Result<Vec<SourceTerm>>;
}

/// An optional, advisory pedestal model.
pub trait PedestalModel: Send + Sync {
    /// Computes advisory pedestal-region source/coefficient adjustments.
    fn compute(
        &self,
        profiles: &CoreProfiles,
        geometry: &Geometry,
        params: &DynamicParams,
    ) -> Result<Vec<SourceTerm>>;
}

/// An optional, advisory MHD model (e.g. sawtooth flattening).
pub trait MHDModel: Send + Sync {
    /// Computes advisory MHD-driven source adjustments.
    fn compute(
        &self,
        profiles: &CoreProfiles,
        geometry: &Geometry,
        params: &DynamicParams,
    ) -> Result<Vec<SourceTerm>>;
}

/// An optional, advisory neoclassical model (e.g. bootstrap current).
pub trait NeoclassicalModel: Send + Sync {
    /// Computes advisory neoclassical source/coefficient adjustments.
    fn compute(
        &self,
        profiles: &CoreProfiles,
        geometry: &Geometry,
        params: &DynamicParams,
    ) -> Result<Vec<SourceTerm>>;
}
