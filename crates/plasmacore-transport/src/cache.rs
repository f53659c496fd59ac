//! A bounded coefficient-builder memoization cache.
//!
//! Keyed on the bitwise content of `(profiles, dt)` rather than on identity,
//! since `CoreProfiles` carries no identity of its own. The hashing scheme
//! (FNV-1a over the `f64` bit patterns) is the same one a sibling example in
//! this pack uses to fingerprint a sparsity pattern before deciding whether
//! to refactorize; the problem here is the same shape — decide cheaply
//! whether two inputs are "the same" before doing expensive work again.

use std::collections::{HashMap, VecDeque};

use crate::coefficients::Block1DCoeffs;
use crate::profiles::CoreProfiles;

/// The default bound on the number of memoized `(profiles, dt) ->
/// Block1DCoeffs` entries.
pub const DEFAULT_CAPACITY: usize = 100;

fn fnv1a64_init() -> u64 {
    0xcbf2_9ce4_8422_2325
}

fn fnv1a64_step(mut h: u64, v: u64) -> u64 {
    h ^= v;
    h.wrapping_mul(0x0000_0100_0000_01b3)
}

fn hash_values(h: &mut u64, values: &ndarray::Array1<f64>) {
    for &v in values {
        *h = fnv1a64_step(*h, v.to_bits());
    }
}

fn content_key(profiles: &CoreProfiles, dt: f64) -> u64 {
    let mut h = fnv1a64_init();
    hash_values(&mut h, profiles.ti.value());
    hash_values(&mut h, profiles.te.value());
    hash_values(&mut h, profiles.ne.value());
    hash_values(&mut h, profiles.psi.value());
    h = fnv1a64_step(h, dt.to_bits());
    h
}

/// A bounded LRU cache from `(profiles, dt)` content-hash to a built
/// [`Block1DCoeffs`].
///
/// Must be cleared between accepted steps (each retry rebuilds coefficients
/// from scratch; caching only helps within one Newton loop's repeated
/// evaluations at nearby iterates).
pub struct CoefficientCache {
    capacity: usize,
    entries: HashMap<u64, Block1DCoeffs>,
    order: VecDeque<u64>,
    hits: usize,
    misses: usize,
}

impl CoefficientCache {
    /// Builds an empty cache bounded to `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// Looks up a previously-built coefficient block for `(profiles, dt)`.
    pub fn get(&mut self, profiles: &CoreProfiles, dt: f64) -> Option<&Block1DCoeffs> {
        let key = content_key(profiles, dt);
        if self.entries.contains_key(&key) {
            self.hits += 1;
            self.entries.get(&key)
        } else {
            self.misses += 1;
            None
        }
    }

    /// Inserts a freshly built coefficient block, evicting the
    /// least-recently-inserted entry if the cache is at capacity.
    pub fn insert(&mut self, profiles: &CoreProfiles, dt: f64, coeffs: Block1DCoeffs) {
        let key = content_key(profiles, dt);
        if !self.entries.contains_key(&key) {
            if self.order.len() >= self.capacity {
                if let Some(evicted) = self.order.pop_front() {
                    self.entries.remove(&evicted);
                }
            }
            self.order.push_back(key);
        }
        self.entries.insert(key, coeffs);
    }

    /// Clears every entry. Called by the orchestrator between accepted
    /// steps.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Returns the cache's hit count.
    #[must_use]
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Returns the cache's miss count.
    #[must_use]
    pub fn misses(&self) -> usize {
        self.misses
    }
}

impl Default for CoefficientCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for CoefficientCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoefficientCache")
            .field("capacity", &self.capacity)
            .field("len", &self.entries.len())
            .field("hits", &self.hits)
            .field("misses", &self.misses)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::coefficients::EquationCoeffs;
    use plasmacore_common::EvaluatedTensor1;

    fn sample_profiles(value: f64) -> CoreProfiles {
        CoreProfiles::new(
            EvaluatedTensor1::from_array(ndarray::Array1::from_elem(3, value)),
            EvaluatedTensor1::from_array(ndarray::Array1::from_elem(3, value)),
            EvaluatedTensor1::from_array(ndarray::Array1::from_elem(3, 1e19)),
            EvaluatedTensor1::zeros(3),
        )
        .unwrap()
    }

    fn dummy_coeffs() -> Block1DCoeffs {
        let eq = EquationCoeffs {
            d_face: EvaluatedTensor1::zeros(4),
            v_face: EvaluatedTensor1::zeros(4),
            source_cell: EvaluatedTensor1::zeros(3),
            source_mat_cell: EvaluatedTensor1::zeros(3),
            transient_coeff: EvaluatedTensor1::ones(3),
        };
        Block1DCoeffs {
            ti: eq.clone(),
            te: eq.clone(),
            ne: eq.clone(),
            psi: eq,
        }
    }

    #[test]
    fn miss_then_hit() {
        let mut cache = CoefficientCache::new(4);
        let profiles = sample_profiles(1000.0);
        assert!(cache.get(&profiles, 1e-3).is_none());
        assert_eq!(cache.misses(), 1);
        cache.insert(&profiles, 1e-3, dummy_coeffs());
        assert!(cache.get(&profiles, 1e-3).is_some());
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn evicts_oldest_entry_past_capacity() {
        let mut cache = CoefficientCache::new(2);
        for i in 0..3 {
            let profiles = sample_profiles(1000.0 + i as f64);
            cache.insert(&profiles, 1e-3, dummy_coeffs());
        }
        assert_eq!(cache.entries.len(), 2);
        let first = sample_profiles(1000.0);
        assert!(cache.get(&first, 1e-3).is_none());
    }

    #[test]
    fn clear_empties_the_cache() {
        let mut cache = CoefficientCache::new(4);
        let profiles = sample_profiles(1000.0);
        cache.insert(&profiles, 1e-3, dummy_coeffs());
        cache.clear();
        assert!(cache.get(&profiles, 1e-3).is_none());
    }
}
