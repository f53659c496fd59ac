//! Per-equation FVM coefficients and the builder that assembles them from
//! physics-model callbacks.

use ndarray::Array1;
use plasmacore_common::{to_native_source_unit, EvaluatedTensor1};
use plasmacore_geometry::Geometry;

use crate::contracts::{
    Equation, MHDModel, NeoclassicalModel, PedestalModel, SourceModel, TransportModel,
};
use crate::error::TransportError;
use crate::fvm::interp_to_faces_harmonic;
use crate::params::DynamicParams;
use crate::profiles::CoreProfiles;
use crate::Result;

/// The density floor applied to `transientCoeff` for the temperature
/// equations, so collision-frequency-like terms stay physical even where
/// `ne` has not yet relaxed to a sane value.
pub const DENSITY_FLOOR: f64 = 1e19;

/// The coefficient block for one equation: `{dFace, vFace, sourceCell,
/// sourceMatCell, transientCoeff}`.
///
/// Invariants: `dFace` entries are all `>= 0`; `transientCoeff` entries are
/// all `> 0`.
#[derive(Clone, Debug)]
pub struct EquationCoeffs {
    /// Face diffusivity, shape `[N + 1]`.
    pub d_face: EvaluatedTensor1,
    /// Face convection velocity, shape `[N + 1]`.
    pub v_face: EvaluatedTensor1,
    /// Explicit per-cell source, shape `[N]`, eV·m⁻³·s⁻¹.
    pub source_cell: EvaluatedTensor1,
    /// Implicit-coupling source-matrix placeholder, shape `[N]`, used
    /// additively. See crate docs for why this stays a placeholder.
    pub source_mat_cell: EvaluatedTensor1,
    /// The transient (time-derivative) coefficient, shape `[N]`.
    pub transient_coeff: EvaluatedTensor1,
}

impl EquationCoeffs {
    /// Returns `Err` if `d_face` has a negative entry or `transient_coeff`
    /// has a non-positive one.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Validation`] if either invariant is
    /// violated.
    pub fn validate(&self) -> Result<()> {
        if self.d_face.value().iter().any(|&d| d < 0.0) {
            return Err(TransportError::Validation(
                "d_face must be non-negative everywhere".into(),
            ));
        }
        if self.transient_coeff.value().iter().any(|&c| c <= 0.0) {
            return Err(TransportError::Validation(
                "transient_coeff must be strictly positive everywhere".into(),
            ));
        }
        Ok(())
    }
}

/// One [`EquationCoeffs`] per equation, sharing the geometry's factors.
#[derive(Clone, Debug)]
pub struct Block1DCoeffs {
    /// Ion temperature coefficients.
    pub ti: EquationCoeffs,
    /// Electron temperature coefficients.
    pub te: EquationCoeffs,
    /// Electron density coefficients.
    pub ne: EquationCoeffs,
    /// Poloidal flux coefficients.
    pub psi: EquationCoeffs,
}

impl Block1DCoeffs {
    /// Validates every equation block.
    ///
    /// # Errors
    ///
    /// Returns the first [`TransportError::Validation`] encountered.
    pub fn validate(&self) -> Result<()> {
        self.ti.validate()?;
        self.te.validate()?;
        self.ne.validate()?;
        self.psi.validate()?;
        Ok(())
    }
}

/// Assembles [`Block1DCoeffs`] from the enabled physics models.
///
/// A closure-captured-callback design: `build(&self, &profiles, &geometry)`
/// is the only signature the residual/Newton code calls, and everything
/// else (static params, model references) is captured here as non-owning
/// references, not threaded through every call site. Pure function of its
/// inputs: no interior mutability, no IO.
pub struct CoefficientBuilder<'a> {
    /// The enabled transport model.
    pub transport: &'a dyn TransportModel,
    /// The enabled source models, summed.
    pub sources: &'a [&'a dyn SourceModel],
    /// An optional advisory pedestal model.
    pub pedestal: Option<&'a dyn PedestalModel>,
    /// An optional advisory MHD model.
    pub mhd: Option<&'a dyn MHDModel>,
    /// An optional advisory neoclassical model.
    pub neoclassical: Option<&'a dyn NeoclassicalModel>,
    /// Per-step dynamic parameters.
    pub dynamic_params: &'a DynamicParams,
}

impl CoefficientBuilder<'_> {
    /// Builds `Block1DCoeffs` from `(profiles, geometry)`; all other
    /// dependencies were captured at construction.
    ///
    /// # Errors
    ///
    /// Propagates any [`TransportError`] a physics model returns, and
    /// returns [`TransportError::Validation`] if the assembled coefficients
    /// violate their invariants.
    pub fn build(&self, profiles: &CoreProfiles, geometry: &Geometry) -> Result<Block1DCoeffs> {
        let transport = self
            .transport
            .compute(profiles, geometry, self.dynamic_params)?;

        let n = profiles.n_cells();
        let g0 = geometry.g0().value();
        let g1 = geometry.g1().value();
        let geometric_factor = g1 / g0;

        let d_face_ti = interp_to_faces_harmonic(transport.chi_i.value()) * &geometric_factor;
        let d_face_te = interp_to_faces_harmonic(transport.chi_e.value()) * &geometric_factor;
        let d_face_ne = interp_to_faces_harmonic(transport.d.value()) * &geometric_factor;
        let v_face = interp_to_faces_harmonic(transport.v.value()) * &geometric_factor;

        let transient_ti = profiles.ne.value().mapv(|ne| ne.max(DENSITY_FLOOR));
        let transient_te = transient_ti.clone();
        let transient_ne = Array1::ones(n);
        // ψ's transient prefactor is the poloidal-flux diffusion time
        // constant; the circular model has no resistivity profile of its
        // own, so it is carried at unity pending a resistivity model.
        let transient_psi = Array1::ones(n);

        let mut source_ti = Array1::zeros(n);
        let mut source_te = Array1::zeros(n);
        let mut source_ne = Array1::zeros(n);
        let mut source_psi = Array1::zeros(n);

        let mut accumulate = |equation: Equation, value: &EvaluatedTensor1, unit| {
            let native = value.value().mapv(|v| to_native_source_unit(v, unit));
            match equation {
                Equation::Ti => source_ti += &native,
                Equation::Te => source_te += &native,
                Equation::Ne => source_ne += &native,
                Equation::Psi => source_psi += &native,
            }
        };

        for source_model in self.sources {
            for term in source_model.compute(profiles, geometry, self.dynamic_params)? {
                accumulate(term.equation, &term.value, term.unit);
            }
        }
        if let Some(pedestal) = self.pedestal {
            for term in pedestal.compute(profiles, geometry, self.dynamic_params)? {
                accumulate(term.equation, &term.value, term.unit);
            }
        }
        if let Some(mhd) = self.mhd {
            for term in mhd.compute(profiles, geometry, self.dynamic_params)? {
                accumulate(term.equation, &term.value, term.unit);
            }
        }
        if let Some(neoclassical) = self.neoclassical {
            for term in neoclassical.compute(profiles, geometry, self.dynamic_params)? {
                accumulate(term.equation, &term.value, term.unit);
            }
        }

        let zero_face = || EvaluatedTensor1::zeros(n + 1);
        let zero_cell = || EvaluatedTensor1::zeros(n);

        let block = Block1DCoeffs {
            ti: EquationCoeffs {
                d_face: EvaluatedTensor1::from_array(d_face_ti),
                v_face: EvaluatedTensor1::from_array(v_face.clone()),
                source_cell: EvaluatedTensor1::from_array(source_ti),
                source_mat_cell: zero_cell(),
                transient_coeff: EvaluatedTensor1::from_array(transient_ti),
            },
            te: EquationCoeffs {
                d_face: EvaluatedTensor1::from_array(d_face_te),
                v_face: EvaluatedTensor1::from_array(v_face.clone()),
                source_cell: EvaluatedTensor1::from_array(source_te),
                source_mat_cell: zero_cell(),
                transient_coeff: EvaluatedTensor1::from_array(transient_te),
            },
            ne: EquationCoeffs {
                d_face: EvaluatedTensor1::from_array(d_face_ne),
                v_face: EvaluatedTensor1::from_array(v_face),
                source_cell: EvaluatedTensor1::from_array(source_ne),
                source_mat_cell: zero_cell(),
                transient_coeff: EvaluatedTensor1::from_array(transient_ne),
            },
            psi: EquationCoeffs {
                d_face: zero_face(),
                v_face: zero_face(),
                source_cell: EvaluatedTensor1::from_array(source_psi),
                source_mat_cell: zero_cell(),
                transient_coeff: EvaluatedTensor1::from_array(transient_psi),
            },
        };
        block.validate()?;
        Ok(block)
    }
}
