//! The state space of a single multilevel atom and the operations that
//! propagate its density matrix.

use std::hash::Hash;
use ndarray as nd;
use num_complex::Complex64 as C64;
use tracing::debug;
use crate::{
    config::SolverConfig,
    error::{ DensityError, DensityResult },
    hilbert::Basis,
    liouville::{ total_lindblad, unitary, unvectorize, vectorize },
    populations::{ SteadyState, Trajectory },
    propagate::{ self, Method, TimeGrid },
};

/// An `n`-level system: bare and coupling Hamiltonians, decay rates, and
/// initial populations.
///
/// Energies and rates are in units of angular frequency. `decay[[g, e]]` is
/// the rate of spontaneous decay from state `e` to state `g`; only entries
/// with `g < e` describe decay channels (see
/// [`total_lindblad`][crate::liouville::total_lindblad]).
///
/// The dissipative part of the Liouvillian depends only on the decay rates and
/// is cached after first use; every method that changes the decay rates
/// discards the cache.
#[derive(Clone, Debug)]
pub struct StateSpace {
    n: usize,
    bare: nd::Array2<C64>,
    coupling: nd::Array2<C64>,
    decay: nd::Array2<f64>,
    init_pop: nd::Array1<f64>,
    lindblad: Option<nd::Array2<C64>>,
    config: SolverConfig,
}

fn check_square<A>(what: &'static str, a: &nd::Array2<A>, n: usize)
    -> DensityResult<()>
{
    if a.shape() != [n, n] {
        return Err(DensityError::dim(what, (n, n), a.shape()));
    }
    Ok(())
}

impl StateSpace {
    /// Create a new `n`-level system with all matrices and populations zeroed.
    ///
    /// Fails if `n == 0`.
    pub fn new(n: usize) -> DensityResult<Self> {
        if n == 0 {
            return Err(DensityError::dim("number of states", ">= 1", n));
        }
        Ok(Self {
            n,
            bare: nd::Array2::zeros((n, n)),
            coupling: nd::Array2::zeros((n, n)),
            decay: nd::Array2::zeros((n, n)),
            init_pop: nd::Array1::zeros(n),
            lindblad: None,
            config: SolverConfig::default(),
        })
    }

    /// Create a new system from its parts, checking that all sizes agree.
    pub fn from_parts(
        bare: nd::Array2<C64>,
        coupling: nd::Array2<C64>,
        decay: nd::Array2<f64>,
        init_pop: nd::Array1<f64>,
    ) -> DensityResult<Self>
    {
        let mut new = Self::new(bare.nrows())?;
        new.set_bare(bare)?;
        new.set_coupling(coupling)?;
        new.set_decay(decay)?;
        new.set_init_pop(init_pop)?;
        Ok(new)
    }

    /// Create a new system whose bare Hamiltonian is diagonal in the energies
    /// of `basis`, with no coupling, decay, or initial population.
    pub fn from_basis<S>(basis: &Basis<S>) -> DensityResult<Self>
    where S: Clone + Eq + Hash
    {
        let mut new = Self::new(basis.num_states())?;
        new.bare = basis.diag_hamiltonian();
        Ok(new)
    }

    /// Use a particular solver configuration.
    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Number of states.
    pub fn num_states(&self) -> usize { self.n }

    /// Bare (field-free) Hamiltonian.
    pub fn bare(&self) -> &nd::Array2<C64> { &self.bare }

    /// Coupling (drive) Hamiltonian.
    pub fn coupling(&self) -> &nd::Array2<C64> { &self.coupling }

    /// Decay rate matrix.
    pub fn decay(&self) -> &nd::Array2<f64> { &self.decay }

    /// Unnormalized initial populations.
    pub fn init_pop(&self) -> &nd::Array1<f64> { &self.init_pop }

    /// Solver configuration.
    pub fn config(&self) -> &SolverConfig { &self.config }

    /// Replace the solver configuration.
    pub fn set_config(&mut self, config: SolverConfig) { self.config = config; }

    /// Replace the bare Hamiltonian.
    pub fn set_bare(&mut self, bare: nd::Array2<C64>) -> DensityResult<()> {
        check_square("bare Hamiltonian", &bare, self.n)?;
        self.bare = bare;
        Ok(())
    }

    /// Replace the coupling Hamiltonian.
    pub fn set_coupling(&mut self, coupling: nd::Array2<C64>)
        -> DensityResult<()>
    {
        check_square("coupling Hamiltonian", &coupling, self.n)?;
        self.coupling = coupling;
        Ok(())
    }

    /// Replace the decay rate matrix.
    pub fn set_decay(&mut self, decay: nd::Array2<f64>) -> DensityResult<()> {
        check_square("decay matrix", &decay, self.n)?;
        self.decay = decay;
        self.invalidate_lindblad();
        Ok(())
    }

    /// Set the rate of decay from state `e` to state `g`.
    pub fn set_decay_rate(&mut self, g: usize, e: usize, rate: f64)
        -> DensityResult<()>
    {
        if g >= self.n || e >= self.n {
            return Err(DensityError::InvalidArgument(format!(
                "decay channel {} -> {} out of range for {} states",
                e, g, self.n,
            )));
        }
        self.decay[[g, e]] = rate;
        self.invalidate_lindblad();
        Ok(())
    }

    /// Replace the initial populations.
    pub fn set_init_pop(&mut self, init_pop: nd::Array1<f64>)
        -> DensityResult<()>
    {
        if init_pop.len() != self.n {
            return Err(DensityError::dim(
                "initial populations", self.n, init_pop.len()));
        }
        self.init_pop = init_pop;
        Ok(())
    }

    /// Discard the cached dissipator so that it is rebuilt on next use.
    pub fn invalidate_lindblad(&mut self) { self.lindblad = None; }

    /// `true` if the dissipator is currently cached.
    pub fn has_cached_lindblad(&self) -> bool { self.lindblad.is_some() }

    /// Total Hamiltonian `bare + coupling`.
    pub fn hamiltonian(&self) -> nd::Array2<C64> { &self.bare + &self.coupling }

    /// Dissipative part of the Liouvillian, built on first use.
    pub fn dissipator(&mut self) -> DensityResult<&nd::Array2<C64>> {
        let L
            = match self.lindblad.take() {
                Some(L) => L,
                None => total_lindblad(&self.decay)?,
            };
        Ok(self.lindblad.insert(L))
    }

    /// Full `n² × n²` Liouvillian.
    ///
    /// The unitary part is rebuilt from the current Hamiltonians on every
    /// call; the dissipative part comes from the cache.
    pub fn liouvillian(&mut self) -> DensityResult<nd::Array2<C64>> {
        let U = unitary(&self.hamiltonian())?;
        let M = U + self.dissipator()?;
        if M.iter().any(|m| !m.is_finite()) {
            return Err(DensityError::Numerical(
                "Liouvillian has non-finite entries".into()));
        }
        Ok(M)
    }

    /// Initial density matrix `diag(p / Σp)`, flattened.
    ///
    /// Fails if any entry is not finite, e.g. when the populations sum to
    /// zero.
    pub fn initial_density(&self) -> DensityResult<nd::Array1<C64>> {
        let total = self.init_pop.sum();
        let rho0 = nd::Array2::from_diag(&self.init_pop.mapv(|p| C64::from(p / total)));
        if rho0.iter().any(|r| !r.is_finite()) {
            return Err(DensityError::Numerical(format!(
                "initial density matrix is not finite (population sum {})",
                total,
            )));
        }
        vectorize(&rho0)
    }

    /// Integrate the master equation from `t = 0` to `duration` in steps of
    /// `dt`.
    pub fn integrate(&mut self, dt: f64, duration: f64, method: Method)
        -> DensityResult<Trajectory>
    {
        let grid = TimeGrid::new(dt, duration)?;
        let v0 = self.initial_density()?;
        let M = self.liouvillian()?;
        debug!(n = self.n, %method, "integrating master equation");
        let rho = propagate::propagate(&M, &v0, &grid, method)?;
        Ok(Trajectory::new(self.n, grid.times(), rho, &self.config))
    }

    /// Like [`Self::integrate`], using the configured method.
    pub fn integrate_default(&mut self, dt: f64, duration: f64)
        -> DensityResult<Trajectory>
    {
        let method = self.config.method;
        self.integrate(dt, duration, method)
    }

    /// Solve for the unique trace-one steady state.
    pub fn solve_steady_state(&mut self) -> DensityResult<SteadyState> {
        let M = self.liouvillian()?;
        let v = propagate::steady_state(&M, self.n, self.config.rank_tol)?;
        let rho = unvectorize(&v, self.n)?;
        Ok(SteadyState::new(rho, &self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::{ Rng, SeedableRng, rngs::StdRng };

    const METHODS: [Method; 2] = [Method::Exponential, Method::ImplicitMidpoint];

    fn c(x: f64) -> C64 { C64::from(x) }

    fn decay_system(omega: f64, gamma: f64, init: [f64; 2]) -> StateSpace {
        StateSpace::from_parts(
            nd::array![[c(0.0), c(0.0)], [c(0.0), c(omega)]],
            nd::Array2::zeros((2, 2)),
            nd::array![[0.0, gamma], [0.0, 0.0]],
            nd::array![init[0], init[1]],
        )
        .unwrap()
    }

    fn rabi_system(rabi: f64) -> StateSpace {
        StateSpace::from_parts(
            nd::Array2::zeros((2, 2)),
            nd::array![[c(0.0), c(rabi / 2.0)], [c(rabi / 2.0), c(0.0)]],
            nd::Array2::zeros((2, 2)),
            nd::array![1.0, 0.0],
        )
        .unwrap()
    }

    fn random_system(n: usize, seed: u64) -> StateSpace {
        let mut rng = StdRng::seed_from_u64(seed);
        let a = nd::Array2::from_shape_fn(
            (n, n),
            |_| C64::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)),
        );
        let coupling = (&a + &a.t().mapv(|z| z.conj())) * 0.5;
        let bare = nd::Array2::from_diag(
            &(0..n).map(|k| c(k as f64)).collect::<nd::Array1<C64>>());
        let mut decay: nd::Array2<f64> = nd::Array2::zeros((n, n));
        for g in 0..n {
            for e in g + 1..n {
                decay[[g, e]] = rng.gen_range(0.1..0.5);
            }
        }
        let init_pop = (0..n).map(|_| rng.gen_range(0.2..1.0)).collect();
        StateSpace::from_parts(bare, coupling, decay, init_pop).unwrap()
    }

    #[test]
    fn new_is_zeroed() {
        let space = StateSpace::new(3).unwrap();
        assert_eq!(space.num_states(), 3);
        assert!(space.bare().iter().all(|z| *z == c(0.0)));
        assert!(space.decay().iter().all(|y| *y == 0.0));
        assert_eq!(space.init_pop().len(), 3);
        assert!(matches!(
            StateSpace::new(0),
            Err(DensityError::InvalidDimension { .. })
        ));
    }

    #[test]
    fn from_basis_sets_bare_energies() {
        let basis: Basis<char> = [('g', 0.0), ('e', 4.0)].into_iter().collect();
        let space = StateSpace::from_basis(&basis).unwrap();
        assert_eq!(space.num_states(), 2);
        assert_eq!(space.bare()[[1, 1]], c(4.0));
        assert_eq!(space.bare()[[0, 1]], c(0.0));
        assert!(matches!(
            StateSpace::from_basis(&Basis::<char>::new()),
            Err(DensityError::InvalidDimension { .. })
        ));
    }

    #[test]
    fn dimension_checks() {
        let mut space = StateSpace::new(2).unwrap();
        assert!(space.set_bare(nd::Array2::zeros((3, 3))).is_err());
        assert!(space.set_coupling(nd::Array2::zeros((2, 3))).is_err());
        assert!(space.set_decay(nd::Array2::zeros((1, 1))).is_err());
        assert!(space.set_init_pop(nd::Array1::zeros(3)).is_err());
        assert!(space.set_decay_rate(0, 2, 1.0).is_err());
        let res = StateSpace::from_parts(
            nd::Array2::zeros((2, 2)),
            nd::Array2::zeros((2, 2)),
            nd::Array2::zeros((3, 3)),
            nd::Array1::zeros(2),
        );
        assert!(matches!(res, Err(DensityError::InvalidDimension { .. })));
    }

    #[test]
    fn lindblad_cache() {
        let mut space = decay_system(1.0, 1.0, [0.0, 1.0]);
        assert!(!space.has_cached_lindblad());
        let M1 = space.liouvillian().unwrap();
        assert!(space.has_cached_lindblad());
        // coupling changes do not touch the cache
        space.set_coupling(nd::array![[c(0.0), c(0.5)], [c(0.5), c(0.0)]])
            .unwrap();
        assert!(space.has_cached_lindblad());
        assert_ne!(space.liouvillian().unwrap(), M1);
        // decay changes do
        space.set_decay_rate(0, 1, 2.0).unwrap();
        assert!(!space.has_cached_lindblad());
        let L = space.dissipator().unwrap().clone();
        assert_eq!(L[[0, 3]], c(2.0));
    }

    #[test]
    fn unknown_method() {
        let mut space = decay_system(1.0, 1.0, [1.0, 0.0]);
        let res = "magnus".parse::<Method>()
            .and_then(|method| space.integrate(0.1, 1.0, method));
        assert!(matches!(res, Err(DensityError::InvalidArgument(_))));
    }

    #[test]
    fn unrepresentable_time_grid() {
        let mut space = decay_system(1.0, 1.0, [1.0, 0.0]);
        for method in METHODS {
            assert!(matches!(
                space.integrate(1e-300, 1.0, method),
                Err(DensityError::InvalidArgument(_))
            ));
            assert!(matches!(
                space.integrate(1e-18, 1.0, method),
                Err(DensityError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn zero_population_is_numerical_error() {
        let mut space = decay_system(1.0, 1.0, [0.0, 0.0]);
        for method in METHODS {
            assert!(matches!(
                space.integrate(0.1, 1.0, method),
                Err(DensityError::Numerical(_))
            ));
        }
    }

    #[test]
    fn populations_normalized() {
        let space = decay_system(1.0, 1.0, [3.0, 1.0]);
        let v0 = space.initial_density().unwrap();
        assert_eq!(v0, nd::array![c(0.75), c(0.0), c(0.0), c(0.25)]);
    }

    #[test]
    fn spontaneous_decay() {
        let (omega, gamma) = (5.0, 0.7);
        let mut space = decay_system(omega, gamma, [0.0, 1.0]);
        for method in METHODS {
            let traj = space.integrate(0.01, 5.0, method).unwrap();
            let pops = traj.populations().unwrap();
            for (k, &t) in traj.time().iter().enumerate() {
                assert_abs_diff_eq!(pops[[1, k]], (-gamma * t).exp(), epsilon = 1e-5);
                assert_abs_diff_eq!(pops[[0, k]] + pops[[1, k]], 1.0, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn ground_state_is_stationary() {
        let mut space = decay_system(2.0, 1.0, [1.0, 0.0]);
        let traj = space.integrate(0.1, 50.0, Method::Exponential).unwrap();
        let pops = traj.populations().unwrap();
        assert_eq!(pops.column(0), nd::array![1.0, 0.0]);
        let last = pops.column(traj.len() - 1);
        assert_abs_diff_eq!(last[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(last[1], 0.0, epsilon = 1e-12);

        let ss = space.solve_steady_state().unwrap();
        let p = ss.populations().unwrap();
        assert_abs_diff_eq!(p[0], 1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(p[1], 0.0, epsilon = 1e-10);
    }

    #[test]
    fn rabi_oscillation() {
        let rabi = 2.0;
        let mut space = rabi_system(rabi);
        let traj = space.integrate(0.01, 10.0, Method::Exponential).unwrap();
        let pops = traj.populations().unwrap();
        for (k, &t) in traj.time().iter().enumerate() {
            let expected = (rabi * t / 2.0).cos().powi(2);
            assert_abs_diff_eq!(pops[[0, k]], expected, epsilon = 1e-8);
            assert_abs_diff_eq!(traj.trace()[k].re, 1.0, epsilon = 1e-10);
        }
        // population returns instead of relaxing monotonically
        let min = pops.row(0).iter().copied().fold(f64::INFINITY, f64::min);
        let last = pops[[0, traj.len() - 1]];
        assert!(min < 1e-3);
        assert!(last > min + 0.1);
    }

    #[test]
    fn rabi_oscillation_implicit_midpoint() {
        let rabi = 2.0;
        let mut space = rabi_system(rabi);
        let traj = space.integrate(0.001, 5.0, Method::ImplicitMidpoint).unwrap();
        let pops = traj.populations().unwrap();
        for (k, &t) in traj.time().iter().enumerate() {
            let expected = (rabi * t / 2.0).cos().powi(2);
            assert_abs_diff_eq!(pops[[0, k]], expected, epsilon = 5e-5);
        }
    }

    #[test]
    fn trace_and_positivity() {
        for (n, seed) in [(2, 1_u64), (3, 2), (4, 3)] {
            let mut space = random_system(n, seed);
            for method in METHODS {
                let traj = space.integrate(0.02, 10.0, method).unwrap();
                for tr in traj.trace().iter() {
                    assert_abs_diff_eq!(tr.re, 1.0, epsilon = 1e-9);
                    assert_abs_diff_eq!(tr.im, 0.0, epsilon = 1e-9);
                }
                let pops = traj.populations().unwrap();
                assert!(pops.iter().all(|p| *p >= -1e-9));
            }
        }
    }

    #[test]
    fn methods_agree_on_random_system() {
        let mut space = random_system(3, 99);
        let mut population_difference = |dt: f64| {
            let a = space.integrate(dt, 2.0, Method::Exponential).unwrap();
            let b = space.integrate(dt, 2.0, Method::ImplicitMidpoint).unwrap();
            (a.populations().unwrap() - b.populations().unwrap())
                .iter()
                .map(|d| d.abs())
                .fold(0.0, f64::max)
        };
        let coarse = population_difference(0.004);
        let fine = population_difference(0.002);
        assert!(fine < 5e-4, "max population difference {}", fine);
        let ratio = coarse / fine;
        assert!(3.5 < ratio && ratio < 4.5, "error ratio {}", ratio);
    }

    #[test]
    fn steady_state_is_fixed_point() {
        let mut space = random_system(4, 12);
        let ss = space.solve_steady_state().unwrap();
        assert_abs_diff_eq!(ss.trace().re, 1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(ss.trace().im, 0.0, epsilon = 1e-10);
        let M = space.liouvillian().unwrap();
        let v = vectorize(ss.density()).unwrap();
        let residual = M.dot(&v).iter().map(|z| z.norm()).fold(0.0, f64::max);
        assert!(residual < 1e-9, "residual {}", residual);
        // long-time integration relaxes onto the same state
        let traj = space.integrate(5.0, 5000.0, Method::Exponential).unwrap();
        let last = traj.density_at(traj.len() - 1).unwrap();
        for (a, b) in last.iter().zip(ss.density().iter()) {
            assert_abs_diff_eq!((a - b).norm(), 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn default_method_from_config() {
        let config = SolverConfig::from_toml_str("method = \"fast\"").unwrap();
        let mut space = rabi_system(1.0).with_config(config);
        assert_eq!(space.config().method, Method::ImplicitMidpoint);
        let a = space.integrate_default(0.1, 1.0).unwrap();
        let b = space.integrate(0.1, 1.0, Method::ImplicitMidpoint).unwrap();
        assert_eq!(a.flattened(), b.flattened());
    }
}
