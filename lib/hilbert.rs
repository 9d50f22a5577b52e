//! Ordered collections of labelled basis states.

use std::{ hash::Hash, ops::Deref };
use indexmap::IndexMap;
use ndarray as nd;
use num_complex::Complex64 as C64;

/// A collection of unique basis states with associated energies in units of
/// angular frequency.
///
/// Insertion order fixes each state's index, which is also its row in any
/// matrix built from the basis. The backing [`IndexMap`] is readable through
/// [`Deref`].
#[derive(Clone, Debug, PartialEq)]
pub struct Basis<S>
where S: Clone + Eq + Hash
{
    energies: IndexMap<S, f64>,
}

impl<S> Deref for Basis<S>
where S: Clone + Eq + Hash
{
    type Target = IndexMap<S, f64>;

    fn deref(&self) -> &Self::Target { &self.energies }
}

impl<S> Default for Basis<S>
where S: Clone + Eq + Hash
{
    fn default() -> Self { Self { energies: IndexMap::default() } }
}

impl<S> FromIterator<(S, f64)> for Basis<S>
where S: Clone + Eq + Hash
{
    fn from_iter<I>(iter: I) -> Self
    where I: IntoIterator<Item = (S, f64)>
    {
        Self { energies: iter.into_iter().collect() }
    }
}

impl<S> Basis<S>
where S: Clone + Eq + Hash
{
    /// Create a new, empty basis.
    pub fn new() -> Self { Self::default() }

    /// Add a state, or update its energy if already present. Returns the
    /// state's index.
    pub fn insert(&mut self, state: S, energy: f64) -> usize {
        self.energies.insert_full(state, energy).0
    }

    /// Number of states.
    pub fn num_states(&self) -> usize { self.energies.len() }

    /// Get the energy of a particular basis state.
    pub fn get_energy(&self, state: &S) -> Option<f64> {
        self.energies.get(state).copied()
    }

    /// Get the energy of a particular basis state by index.
    pub fn get_energy_index(&self, index: usize) -> Option<f64> {
        self.energies.get_index(index).map(|(_, e)| *e)
    }

    /// Get the index of a particular basis state.
    pub fn index_of(&self, state: &S) -> Option<usize> {
        self.energies.get_index_of(state)
    }

    /// Get the unit vector for a particular basis state.
    pub fn get_vector(&self, state: &S) -> Option<nd::Array1<C64>> {
        let n = self.energies.len();
        self.energies.get_index_of(state)
            .map(|k| {
                let mut v: nd::Array1<C64> = nd::Array1::zeros(n);
                v[k] = C64::from(1.0);
                v
            })
    }

    /// Diagonal Hamiltonian of the basis energies.
    pub fn diag_hamiltonian(&self) -> nd::Array2<C64> {
        let diag: nd::Array1<C64>
            = self.energies.values()
            .map(|e| C64::from(*e))
            .collect();
        nd::Array2::from_diag(&diag)
    }

    /// Populations of every state, with weights determined by a weighting
    /// function.
    ///
    /// The weighting function is passed a state, its index, and its energy.
    /// The result is not normalized.
    pub fn get_populations<F>(&self, weights: F) -> nd::Array1<f64>
    where F: Fn(&S, usize, f64) -> f64
    {
        self.energies.iter().enumerate()
            .map(|(index, (state, energy))| weights(state, index, *energy))
            .collect()
    }
}
