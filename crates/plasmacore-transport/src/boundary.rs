//! Boundary conditions per edge per variable.

use derive_is_enum_variant::is_enum_variant;

use crate::error::TransportError;
use crate::Result;

/// A boundary condition at one mesh edge.
///
/// A tagged variant, not a sentinel value: the exclusivity between a fixed
/// value and a fixed gradient is structural, so "both Dirichlet and Neumann,
/// or neither" can't arise at the type level.
#[derive(Clone, Copy, Debug, PartialEq, is_enum_variant)]
pub enum BoundaryCondition {
    /// A fixed boundary value.
    Dirichlet(f64),
    /// A fixed boundary gradient.
    Neumann(f64),
}

impl BoundaryCondition {
    /// Validates that a physically-meaningful boundary value was supplied
    /// (finite; `Dirichlet` values for Ti/Te/ne must additionally be
    /// non-negative, checked by the caller since this type has no variable
    /// tag of its own).
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Validation`] if the carried value is not
    /// finite.
    pub fn validate(&self) -> Result<()> {
        let value = match self {
            Self::Dirichlet(v) | Self::Neumann(v) => *v,
        };
        if !value.is_finite() {
            return Err(TransportError::Validation(format!(
                "boundary condition value must be finite, got {value}"
            )));
        }
        Ok(())
    }
}

/// The core- and edge-side boundary conditions for one variable.
#[derive(Clone, Copy, Debug)]
pub struct EdgeBoundary {
    /// The boundary condition at `ρ̂ = 0` (the magnetic axis).
    pub core: BoundaryCondition,
    /// The boundary condition at `ρ̂ = 1` (the plasma edge).
    pub edge: BoundaryCondition,
}

impl EdgeBoundary {
    /// Builds an [`EdgeBoundary`], validating both sides.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Validation`] if either side is non-finite.
    pub fn new(core: BoundaryCondition, edge: BoundaryCondition) -> Result<Self> {
        core.validate()?;
        edge.validate()?;
        Ok(Self { core, edge })
    }
}

/// One [`EdgeBoundary`] for each of the four coupled variables.
#[derive(Clone, Copy, Debug)]
pub struct VariableBoundaryConditions {
    /// Ion temperature boundary conditions.
    pub ti: EdgeBoundary,
    /// Electron temperature boundary conditions.
    pub te: EdgeBoundary,
    /// Electron density boundary conditions.
    pub ne: EdgeBoundary,
    /// Poloidal flux boundary conditions.
    pub psi: EdgeBoundary,
}

impl VariableBoundaryConditions {
    /// The typical default: `Neumann(0)` core / `Dirichlet(edge_value)` edge
    /// for `Ti`, `Te`, `ne`; `Dirichlet(0)` core / `Neumann(ip_gradient)`
    /// edge for `ψ`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Validation`] if any supplied edge value is
    /// non-finite.
    pub fn typical(
        ti_edge: f64,
        te_edge: f64,
        ne_edge: f64,
        psi_edge_gradient: f64,
    ) -> Result<Self> {
        Ok(Self {
            ti: EdgeBoundary::new(
                BoundaryCondition::Neumann(0.0),
                BoundaryCondition::Dirichlet(ti_edge),
            )?,
            te: EdgeBoundary::new(
                BoundaryCondition::Neumann(0.0),
                BoundaryCondition::Dirichlet(te_edge),
            )?,
            ne: EdgeBoundary::new(
                BoundaryCondition::Neumann(0.0),
                BoundaryCondition::Dirichlet(ne_edge),
            )?,
            psi: EdgeBoundary::new(
                BoundaryCondition::Dirichlet(0.0),
                BoundaryCondition::Neumann(psi_edge_gradient),
            )?,
        })
    }
}
