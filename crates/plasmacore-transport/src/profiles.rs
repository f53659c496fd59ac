//! Core profiles and the flattened `4N`-length state vector.

use std::ops::Range;

use ndarray::{concatenate, s, Array1, Axis};
use plasmacore_common::{CommonError, EvaluatedTensor1};

use crate::Result;

/// The four coupled profiles this core advances, cell-centered.
///
/// Units are fixed and strict: `ti`/`te` in eV, `ne` in m⁻³, `psi` in Wb.
/// Immutable once built; every solver step produces a new value rather than
/// mutating one in place.
#[derive(Clone, Debug)]
pub struct CoreProfiles {
    /// Ion temperature, eV.
    pub ti: EvaluatedTensor1,
    /// Electron temperature, eV.
    pub te: EvaluatedTensor1,
    /// Electron density, m⁻³.
    pub ne: EvaluatedTensor1,
    /// Poloidal magnetic flux, Wb.
    pub psi: EvaluatedTensor1,
}

impl CoreProfiles {
    /// Builds a [`CoreProfiles`], validating that all four arrays share the
    /// same length.
    ///
    /// # Errors
    ///
    /// Returns [`plasmacore_common::CommonError::ShapeMismatch`] if the four
    /// arrays' lengths disagree, wrapped in [`crate::TransportError::Common`].
    pub fn new(
        ti: EvaluatedTensor1,
        te: EvaluatedTensor1,
        ne: EvaluatedTensor1,
        psi: EvaluatedTensor1,
    ) -> Result<Self> {
        let n = ti.value().len();
        let lengths = [te.value().len(), ne.value().len(), psi.value().len()];
        if lengths.iter().any(|&len| len != n) {
            return Err(CommonError::ShapeMismatch {
                expected: vec![n; 4],
                actual: std::iter::once(n).chain(lengths).collect(),
            }
            .into());
        }
        Ok(Self { ti, te, ne, psi })
    }

    /// The number of radial cells `N`.
    #[must_use]
    pub fn n_cells(&self) -> usize {
        self.ti.value().len()
    }
}

/// Fixes the four contiguous ranges a flattened `4N` state vector is carved
/// into, in `(Ti, Te, ne, ψ)` order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateLayout {
    n: usize,
    ti_range: Range<usize>,
    te_range: Range<usize>,
    ne_range: Range<usize>,
    psi_range: Range<usize>,
}

impl StateLayout {
    /// Builds a [`StateLayout`] for `n` cells per variable.
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self {
            n,
            ti_range: 0..n,
            te_range: n..2 * n,
            ne_range: 2 * n..3 * n,
            psi_range: 3 * n..4 * n,
        }
    }

    /// The per-variable cell count `N`.
    #[must_use]
    pub fn n(&self) -> usize {
        self.n
    }

    /// The total flattened length `4N`.
    #[must_use]
    pub fn total_len(&self) -> usize {
        4 * self.n
    }

    /// The `Ti` slice range.
    #[must_use]
    pub fn ti_range(&self) -> Range<usize> {
        self.ti_range.clone()
    }

    /// The `Te` slice range.
    #[must_use]
    pub fn te_range(&self) -> Range<usize> {
        self.te_range.clone()
    }

    /// The `ne` slice range.
    #[must_use]
    pub fn ne_range(&self) -> Range<usize> {
        self.ne_range.clone()
    }

    /// The `ψ` slice range.
    #[must_use]
    pub fn psi_range(&self) -> Range<usize> {
        self.psi_range.clone()
    }
}

/// A packed `4N`-length state vector plus the [`StateLayout`] describing how
/// to carve it back into per-variable slices.
///
/// Storing one contiguous buffer with offset/length views, rather than four
/// separately allocated arrays, is deliberate: it is the arena layout the
/// Newton loop and the Jacobian assembly both need, and it avoids a
/// pointer-graph of small per-variable allocations.
#[derive(Clone, Debug)]
pub struct FlattenedState {
    values: EvaluatedTensor1,
    layout: StateLayout,
}

impl FlattenedState {
    /// Wraps an already-flattened `4N` buffer with the layout it was cut
    /// under, without routing through a [`CoreProfiles`] first — the shape
    /// the Newton loop's candidate iterates arrive in.
    #[must_use]
    pub fn from_values(values: EvaluatedTensor1, layout: StateLayout) -> Self {
        Self { values, layout }
    }

    /// Flattens a [`CoreProfiles`] into one `4N` buffer, in `(Ti, Te, ne, ψ)`
    /// order.
    #[must_use]
    pub fn flatten(profiles: &CoreProfiles, layout: &StateLayout) -> Self {
        let parts = [
            profiles.ti.value().view(),
            profiles.te.value().view(),
            profiles.ne.value().view(),
            profiles.psi.value().view(),
        ];
        let values = concatenate(Axis(0), &parts).expect("layout lengths already validated");
        Self {
            values: EvaluatedTensor1::from_array(values),
            layout: *layout,
        }
    }

    /// Unflattens back into a [`CoreProfiles`]. Satisfies `flatten ∘
    /// unflatten = id` on any value this type can hold.
    #[must_use]
    pub fn unflatten(&self) -> CoreProfiles {
        let v = self.values.value();
        let layout = &self.layout;
        CoreProfiles {
            ti: EvaluatedTensor1::from_array(v.slice(s![layout.ti_range()]).to_owned()),
            te: EvaluatedTensor1::from_array(v.slice(s![layout.te_range()]).to_owned()),
            ne: EvaluatedTensor1::from_array(v.slice(s![layout.ne_range()]).to_owned()),
            psi: EvaluatedTensor1::from_array(v.slice(s![layout.psi_range()]).to_owned()),
        }
    }

    /// The flattened `4N` values.
    #[must_use]
    pub fn values(&self) -> &EvaluatedTensor1 {
        &self.values
    }

    /// The layout this state vector was flattened under.
    #[must_use]
    pub fn layout(&self) -> &StateLayout {
        &self.layout
    }
}

/// Per-variable reference scaling used by Newton to keep Jacobian
/// conditioning bounded: `x̃ = x / xref`.
///
/// Factored out of the Newton module so its iteration loop doesn't carry
/// unscaling logic inline.
#[derive(Clone, Copy, Debug)]
pub struct ScaledState {
    /// Reference (typical central) ion temperature, eV.
    pub ti_ref: f64,
    /// Reference electron temperature, eV.
    pub te_ref: f64,
    /// Reference electron density, m⁻³.
    pub ne_ref: f64,
    /// Reference poloidal flux, Wb.
    pub psi_ref: f64,
}

impl ScaledState {
    /// Builds a reference scale from representative central values.
    #[must_use]
    pub fn new(ti_ref: f64, te_ref: f64, ne_ref: f64, psi_ref: f64) -> Self {
        Self {
            ti_ref,
            te_ref,
            ne_ref,
            psi_ref,
        }
    }

    /// Returns the per-equation reference value broadcast over `layout`'s
    /// four ranges, for dividing/multiplying the flattened state elementwise.
    #[must_use]
    pub fn broadcast(&self, layout: &StateLayout) -> Array1<f64> {
        let mut scale = Array1::zeros(layout.total_len());
        scale.slice_mut(s![layout.ti_range()]).fill(self.ti_ref);
        scale.slice_mut(s![layout.te_range()]).fill(self.te_ref);
        scale.slice_mut(s![layout.ne_range()]).fill(self.ne_ref);
        scale.slice_mut(s![layout.psi_range()]).fill(self.psi_ref);
        scale
    }

    /// Scales a flattened state: `x̃ = x / xref`.
    #[must_use]
    pub fn scale(&self, x: &Array1<f64>, layout: &StateLayout) -> Array1<f64> {
        x / &self.broadcast(layout)
    }

    /// Unscales a flattened state: `x = x̃ * xref`.
    #[must_use]
    pub fn unscale(&self, x_tilde: &Array1<f64>, layout: &StateLayout) -> Array1<f64> {
        x_tilde * &self.broadcast(layout)
    }
}
