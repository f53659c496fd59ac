//! The evaluated-tensor wrapper.
//!
//! The solver this crate is part of was distilled from a Python program built
//! on a lazy, GPU-capable tensor library. Values crossing an orchestration
//! boundary there had to be forced to concrete data first, or a deferred
//! computation graph could escape and retain memory or get re-executed at an
//! unexpected time. `ndarray` is eager, so there is no deferred graph to leak
//! here — but the *discipline* is still worth keeping: every function that
//! returns a tensor across a module boundary returns an [`EvaluatedTensor`],
//! whose constructor is the one place a `LazyTensor` impl would be forced.

use ndarray::{Array, Array1, Array2, Dimension, IxDyn, ShapeBuilder};

/// Something that defers a computation until forced.
///
/// `ndarray` itself never implements this; the trait exists so a future
/// GPU/lazy backend has a seam to plug into without touching any call site
/// that already holds an [`EvaluatedTensor`].
pub trait LazyTensor<D: Dimension> {
    /// Forces the deferred computation, producing concrete values.
    fn force(&self) -> Array<f64, D>;
}

impl<D: Dimension> LazyTensor<D> for Array<f64, D> {
    fn force(&self) -> Array<f64, D> {
        self.clone()
    }
}

/// A tensor that is guaranteed to hold concrete, already-evaluated data.
///
/// Invariant: no `EvaluatedTensor` instance ever wraps a deferred computation
/// graph. Cheaply cloneable (a deep copy of the buffer, since `ndarray` has
/// no reference-counted storage); `Send + Sync` because `Array<f64, D>` is.
#[derive(Clone, Debug, PartialEq)]
pub struct EvaluatedTensor<D: Dimension> {
    data: Array<f64, D>,
}

/// A 1D evaluated tensor — the shape every radial profile array uses.
pub type EvaluatedTensor1 = EvaluatedTensor<ndarray::Ix1>;
/// A 2D evaluated tensor — the shape the dense Jacobian uses.
pub type EvaluatedTensor2 = EvaluatedTensor<ndarray::Ix2>;

impl<D: Dimension> EvaluatedTensor<D> {
    /// Wraps already-concrete data. This is the common constructor: every
    /// FVM/coefficient routine in this crate family produces `Array<f64, D>`
    /// directly and wraps it here before returning across a module boundary.
    #[must_use]
    pub fn from_array(data: Array<f64, D>) -> Self {
        Self { data }
    }

    /// Forces a [`LazyTensor`] and wraps the result.
    ///
    /// This is the boundary-crossing constructor: if a deferred computation
    /// graph exists anywhere upstream, it is fully forced right here, before
    /// an `EvaluatedTensor` value can exist at all.
    #[must_use]
    pub fn evaluating<L: LazyTensor<D>>(lazy: L) -> Self {
        let data = lazy.force();
        debug_assert_eq!(
            data.shape(),
            lazy.force().shape(),
            "forcing a LazyTensor twice must yield the same shape"
        );
        Self { data }
    }

    /// Returns a reference to the underlying concrete array.
    #[must_use]
    pub fn value(&self) -> &Array<f64, D> {
        &self.data
    }

    /// Consumes the wrapper, returning the underlying concrete array.
    #[must_use]
    pub fn into_value(self) -> Array<f64, D> {
        self.data
    }

    /// Returns the tensor's shape.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Returns the number of dimensions.
    #[must_use]
    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    /// Returns the element dtype name. This crate is `f64`-only; the method
    /// is kept so the wrapper's contract surface matches the source
    /// library's, where dtype can vary.
    #[must_use]
    pub fn dtype(&self) -> &'static str {
        "f64"
    }

    /// Forces evaluation of many lazy tensors at once.
    pub fn batch<L: LazyTensor<D>>(lazies: impl IntoIterator<Item = L>) -> Vec<Self> {
        lazies.into_iter().map(Self::evaluating).collect()
    }
}

impl EvaluatedTensor1 {
    /// An evaluated 1D tensor of zeros with the given length.
    #[must_use]
    pub fn zeros(len: usize) -> Self {
        Self::from_array(Array1::zeros(len))
    }

    /// An evaluated 1D tensor of ones with the given length.
    #[must_use]
    pub fn ones(len: usize) -> Self {
        Self::from_array(Array1::ones(len))
    }
}

impl EvaluatedTensor2 {
    /// An evaluated 2D tensor of zeros with the given shape.
    #[must_use]
    pub fn zeros(shape: (usize, usize)) -> Self {
        Self::from_array(Array2::zeros(shape.f()))
    }
}

/// A type-erased evaluated tensor, for contexts (e.g. snapshot payloads) that
/// do not care about rank at compile time.
pub type EvaluatedTensorDyn = EvaluatedTensor<IxDyn>;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn wraps_concrete_array() {
        let array = Array1::from_vec(vec![1.0, 2.0, 3.0]);
        let tensor = EvaluatedTensor1::from_array(array.clone());
        assert_eq!(tensor.value(), &array);
        assert_eq!(tensor.ndim(), 1);
        assert_eq!(tensor.dtype(), "f64");
    }

    #[test]
    fn evaluating_forces_a_lazy_tensor() {
        let array = Array1::from_vec(vec![4.0, 5.0]);
        let tensor = EvaluatedTensor1::evaluating(array.clone());
        assert_eq!(tensor.value(), &array);
    }

    #[test]
    fn zeros_and_ones() {
        let zeros = EvaluatedTensor1::zeros(4);
        let ones = EvaluatedTensor1::ones(4);
        assert_eq!(zeros.value(), &Array1::from_elem(4, 0.0));
        assert_eq!(ones.value(), &Array1::from_elem(4, 1.0));
    }

    #[test]
    fn batch_evaluates_many() {
        let lazies = vec![
            Array1::from_vec(vec![1.0]),
            Array1::from_vec(vec![2.0]),
            Array1::from_vec(vec![3.0]),
        ];
        let evaluated = EvaluatedTensor1::batch(lazies);
        assert_eq!(evaluated.len(), 3);
        assert_eq!(evaluated[1].value()[0], 2.0);
    }

    #[test]
    fn shape_round_trip() {
        let tensor = EvaluatedTensor2::zeros((3, 5));
        assert_eq!(tensor.shape(), &[3, 5]);
    }
}
