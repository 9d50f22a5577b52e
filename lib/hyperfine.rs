//! Hyperfine and Zeeman structure of a single fine-structure level.
//!
//! States are written in the uncoupled basis `|J mJ⟩ ⊗ |I mI⟩`, ordered by
//! ascending `mJ` and then ascending `mI`. The Hamiltonian is
//! ```text
//! H = A I·J + B Q + μB B (gJ Jz + gI Iz)
//! Q = [3 (I·J)² + 3/2 (I·J) - I(I + 1) J(J + 1)] / [2I (2I - 1) J (2J - 1)]
//! ```
//! with energies in MHz and the field in gauss. The quadrupole term only
//! exists for `I, J ≥ 1`.

use std::f64::consts::TAU;
use itertools::Itertools;
use ndarray as nd;
use ndarray_linalg::{ Eigh, UPLO };
use num_complex::Complex64 as C64;
use tracing::debug;
use crate::{
    error::{ DensityError, DensityResult },
    hilbert::Basis,
    spin::{ cg, Spin, SpinTotal },
};

/// Bohr magneton in MHz/G.
pub const MU_B: f64 = 1.3996245168425658;

/// Constants describing one hyperfine manifold.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HyperfineParams {
    /// Electronic angular momentum.
    pub j: SpinTotal,
    /// Nuclear spin.
    pub i: SpinTotal,
    /// Magnetic dipole constant (MHz).
    pub a_hfs: f64,
    /// Electric quadrupole constant (MHz).
    pub b_hfs: f64,
    /// Landé g-factor of `J`.
    pub g_j: f64,
    /// Nuclear g-factor, in the same (Bohr magneton) units as `g_j`.
    pub g_i: f64,
}

impl HyperfineParams {
    /// Dimension of the manifold, `(2J + 1)(2I + 1)`.
    pub fn num_states(&self) -> usize {
        self.j.multiplicity() * self.i.multiplicity()
    }

    /// Uncoupled basis states `(|J mJ⟩, |I mI⟩)` in matrix order.
    pub fn uncoupled_states(&self) -> Vec<(Spin, Spin)> {
        self.j.projections()
            .cartesian_product(self.i.projections())
            .collect()
    }

    fn uncoupled_index(&self, mj: Spin, mi: Spin) -> usize {
        let a = (mj.proj().halves() + self.j.halves() as i32) / 2;
        let b = (mi.proj().halves() + self.i.halves() as i32) / 2;
        a as usize * self.i.multiplicity() + b as usize
    }

    /// Allowed total angular momenta `F = |J - I|, ..., J + I`, ascending.
    pub fn f_values(&self) -> impl Iterator<Item = SpinTotal> {
        let lo = self.j.halves().abs_diff(self.i.halves());
        let hi = self.j.halves() + self.i.halves();
        (lo..=hi).step_by(2).map(SpinTotal::new)
    }

    /// Coupled basis states `|F mF⟩`, by ascending `F` and then ascending
    /// `mF`.
    pub fn coupled_states(&self) -> Vec<Spin> {
        self.f_values()
            .flat_map(|f| f.projections())
            .collect()
    }

    fn has_quadrupole(&self) -> bool {
        self.i.halves() >= 2 && self.j.halves() >= 2
    }

    fn quadrupole_denom(&self) -> f64 {
        let i = self.i.f();
        let j = self.j.f();
        2.0 * i * (2.0 * i - 1.0) * j * (2.0 * j - 1.0)
    }

    // I·J = Iz Jz + ½ (J₊ I₋ + J₋ I₊), real symmetric
    fn i_dot_j(&self) -> nd::Array2<f64> {
        let n = self.num_states();
        let mut K: nd::Array2<f64> = nd::Array2::zeros((n, n));
        for (k, (mj, mi)) in self.uncoupled_states().into_iter().enumerate() {
            K[[k, k]] += mj.proj().f() * mi.proj().f();
            if let (Some((mj_up, cj)), Some((mi_dn, ci)))
                = (mj.raised(), mi.lowered())
            {
                let l = self.uncoupled_index(mj_up, mi_dn);
                K[[l, k]] += 0.5 * cj * ci;
                K[[k, l]] += 0.5 * cj * ci;
            }
        }
        K
    }

    /// Hamiltonian (MHz) at magnetic field `field` (G) in the uncoupled basis.
    pub fn hamiltonian(&self, field: f64) -> DensityResult<nd::Array2<C64>> {
        if !field.is_finite() {
            return Err(DensityError::InvalidArgument(format!(
                "magnetic field must be finite, got {}", field)));
        }
        let K = self.i_dot_j();
        let mut H = &K * self.a_hfs;
        if self.has_quadrupole() {
            let c = self.i.casimir() * self.j.casimir();
            let eye: nd::Array2<f64> = nd::Array2::eye(K.nrows());
            let Q
                = (K.dot(&K) * 3.0 + &K * 1.5 - eye * c)
                / self.quadrupole_denom();
            H += &(Q * self.b_hfs);
        }
        for (k, (mj, mi)) in self.uncoupled_states().into_iter().enumerate() {
            H[[k, k]]
                += MU_B * field
                * (self.g_j * mj.proj().f() + self.g_i * mi.proj().f());
        }
        Ok(H.mapv(C64::from))
    }

    /// Diagonalize the Hamiltonian at magnetic field `field` (G).
    pub fn solve(&self, field: f64) -> DensityResult<ZeemanLevels> {
        let H = self.hamiltonian(field)?;
        let (energies, vectors) = H.eigh(UPLO::Lower)?;
        debug!(field, n = energies.len(), "diagonalized hyperfine Hamiltonian");
        Ok(ZeemanLevels { field, energies, vectors })
    }

    fn zero_field_energy_unchecked(&self, f: SpinTotal) -> f64 {
        let K = f.casimir() - self.i.casimir() - self.j.casimir();
        let mut E = self.a_hfs * K / 2.0;
        if self.has_quadrupole() {
            E += self.b_hfs
                * (1.5 * K * (K + 1.0)
                    - 2.0 * self.i.casimir() * self.j.casimir())
                / (2.0 * self.quadrupole_denom());
        }
        E
    }

    /// Zero-field energy (MHz) of the hyperfine level `F`.
    ///
    /// Fails if `F` cannot be formed from `J` and `I`.
    pub fn zero_field_energy(&self, f: SpinTotal) -> DensityResult<f64> {
        if !self.f_values().any(|allowed| allowed == f) {
            return Err(DensityError::InvalidArgument(format!(
                "F = {} cannot be formed from J = {} and I = {}",
                f.f(), self.j.f(), self.i.f(),
            )));
        }
        Ok(self.zero_field_energy_unchecked(f))
    }

    /// Unitary matrix whose columns are the [coupled
    /// states][Self::coupled_states] written in the uncoupled basis.
    pub fn coupled_transform(&self) -> nd::Array2<C64> {
        let uncoupled = self.uncoupled_states();
        let coupled = self.coupled_states();
        nd::Array2::from_shape_fn(
            (uncoupled.len(), coupled.len()),
            |(r, c)| {
                let (mj, mi) = uncoupled[r];
                let fm = coupled[c];
                if mj.proj().halves() + mi.proj().halves() != fm.proj().halves() {
                    C64::from(0.0)
                } else {
                    C64::from(cg(mj, mi, fm))
                }
            },
        )
    }

    /// Coupled states labelled by `|F mF⟩` with their zero-field energies, in
    /// units of angular frequency (rad/μs).
    pub fn coupled_basis(&self) -> Basis<Spin> {
        self.coupled_states().into_iter()
            .map(|s| (s, TAU * self.zero_field_energy_unchecked(s.total())))
            .collect()
    }
}

/// Eigen-decomposition of a hyperfine Hamiltonian at a fixed field.
#[derive(Clone, Debug)]
pub struct ZeemanLevels {
    field: f64,
    energies: nd::Array1<f64>,
    vectors: nd::Array2<C64>,
}

impl ZeemanLevels {
    /// Magnetic field (G).
    pub fn field(&self) -> f64 { self.field }

    /// Number of levels.
    pub fn num_states(&self) -> usize { self.energies.len() }

    /// Energies (MHz), ascending.
    pub fn energies(&self) -> &nd::Array1<f64> { &self.energies }

    /// Eigenvectors as columns, in the uncoupled basis.
    pub fn vectors(&self) -> &nd::Array2<C64> { &self.vectors }

    /// Diagonal Hamiltonian in the eigenbasis, in units of angular frequency
    /// (rad/μs).
    pub fn bare_hamiltonian(&self) -> nd::Array2<C64> {
        nd::Array2::from_diag(&self.energies.mapv(|e| C64::from(TAU * e)))
    }

    /// Eigenstates labelled by index, with energies in units of angular
    /// frequency (rad/μs).
    pub fn basis(&self) -> Basis<usize> {
        self.energies.iter().enumerate()
            .map(|(k, e)| (k, TAU * e))
            .collect()
    }

    /// Transform an operator from the uncoupled basis to the eigenbasis,
    /// `V† op V`.
    pub fn to_eigenbasis<S>(&self, op: &nd::ArrayBase<S, nd::Ix2>)
        -> DensityResult<nd::Array2<C64>>
    where S: nd::Data<Elem = C64>
    {
        let n = self.num_states();
        if op.shape() != [n, n] {
            return Err(DensityError::dim("operator", (n, n), op.shape()));
        }
        let Vh = self.vectors.t().mapv(|z| z.conj());
        Ok(Vh.dot(op).dot(&self.vectors))
    }
}
