//! Half-integer angular momentum quantum numbers.
//!
//! All quantities are stored as a whole number of halves so that integer and
//! half-integer spins share one exact representation.

use wigner_symbols::ClebschGordan;

/// A single spin-projection quantum number, stored as a number of halves.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpinProj(i32);

impl SpinProj {
    /// Create a new spin projection from a number of halves.
    pub fn new(m: i32) -> Self { Self(m) }

    /// Return `self` as a bare number of halves.
    pub fn halves(self) -> i32 { self.0 }

    /// Return the numerical value of the projection.
    pub fn f(self) -> f64 { f64::from(self.0) / 2.0 }
}

impl From<SpinProj> for f64 {
    fn from(m: SpinProj) -> Self { m.f() }
}

/// A single total-spin quantum number, stored as a number of halves.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpinTotal(u32);

impl SpinTotal {
    /// Create a new total spin from a number of halves.
    pub fn new(j: u32) -> Self { Self(j) }

    /// Return `self` as a bare number of halves.
    pub fn halves(self) -> u32 { self.0 }

    /// Return the numerical value of the total spin.
    pub fn f(self) -> f64 { f64::from(self.0) / 2.0 }

    /// `j (j + 1)`.
    pub fn casimir(self) -> f64 {
        let j = self.f();
        j * (j + 1.0)
    }

    /// Number of projection states, `2j + 1`.
    pub fn multiplicity(self) -> usize { self.0 as usize + 1 }

    /// Iterate over all [`Spin`]s with this total, by ascending projection.
    pub fn projections(self) -> Projections {
        Projections { total: self, next: Some(-(self.0 as i32)) }
    }
}

impl From<SpinTotal> for f64 {
    fn from(j: SpinTotal) -> Self { j.f() }
}

/// A `(total, projection)` spin quantum number pair.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Spin(SpinTotal, SpinProj);

impl Spin {
    /// Create a new spin from numbers of halves if the projection is valid for
    /// the total.
    pub fn new(j: u32, m: i32) -> Option<Self> {
        let j = i64::from(j);
        let m = i64::from(m);
        ((-j..=j).contains(&m) && (j - m) % 2 == 0)
            .then(|| Self(SpinTotal(j as u32), SpinProj(m as i32)))
    }

    /// Return the [total-spin][SpinTotal] quantum number.
    pub fn total(self) -> SpinTotal { self.0 }

    /// Return the [spin-projection][SpinProj] quantum number.
    pub fn proj(self) -> SpinProj { self.1 }

    /// Return `self` as a bare pair of halves.
    pub fn halves(self) -> (u32, i32) { (self.0.halves(), self.1.halves()) }

    /// Return the numerical values of the total and projection.
    pub fn f(self) -> (f64, f64) { (self.0.f(), self.1.f()) }

    /// Apply the raising operator `J₊`, returning the raised state and the
    /// matrix element `⟨j, m + 1| J₊ |j, m⟩ = sqrt(j(j + 1) - m(m + 1))`.
    ///
    /// Returns `None` if `self` is already stretched upward.
    pub fn raised(self) -> Option<(Self, f64)> {
        let Self(j, m) = self;
        Self::new(j.0, m.0 + 2)
            .map(|up| {
                let mf = m.f();
                (up, (j.casimir() - mf * (mf + 1.0)).sqrt())
            })
    }

    /// Apply the lowering operator `J₋`, returning the lowered state and the
    /// matrix element `⟨j, m - 1| J₋ |j, m⟩ = sqrt(j(j + 1) - m(m - 1))`.
    ///
    /// Returns `None` if `self` is already stretched downward.
    pub fn lowered(self) -> Option<(Self, f64)> {
        let Self(j, m) = self;
        Self::new(j.0, m.0 - 2)
            .map(|dn| {
                let mf = m.f();
                (dn, (j.casimir() - mf * (mf - 1.0)).sqrt())
            })
    }
}

/// Iterator over the projection states of a fixed total spin, in ascending
/// order.
#[derive(Copy, Clone, Debug)]
pub struct Projections {
    total: SpinTotal,
    next: Option<i32>,
}

impl Iterator for Projections {
    type Item = Spin;

    fn next(&mut self) -> Option<Self::Item> {
        let m = self.next?;
        let j = self.total.0 as i32;
        self.next = (m < j).then_some(m + 2);
        Some(Spin(self.total, SpinProj(m)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n
            = self.next
            .map(|m| ((self.total.0 as i32 - m) / 2 + 1) as usize)
            .unwrap_or(0);
        (n, Some(n))
    }
}

impl ExactSizeIterator for Projections { }

/// Clebsch-Gordan coefficient `⟨j1 m1; j2 m2 | j3 m3⟩` for the addition
/// `s1 + s2 = s3`.
pub fn cg(s1: Spin, s2: Spin, s3: Spin) -> f64 {
    ClebschGordan {
        tj1: s1.total().halves() as i32,
        tm1: s1.proj().halves(),
        tj2: s2.total().halves() as i32,
        tm2: s2.proj().halves(),
        tj12: s3.total().halves() as i32,
        tm12: s3.proj().halves(),
    }
    .value()
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn validity() {
        assert!(Spin::new(3, 1).is_some());
        assert!(Spin::new(3, -3).is_some());
        assert!(Spin::new(3, 5).is_none());
        assert!(Spin::new(3, 0).is_none());
        assert!(Spin::new(0, 0).is_some());
    }

    #[test]
    fn projections_include_both_ends() {
        let ms: Vec<i32>
            = SpinTotal::new(3).projections()
            .map(|s| s.proj().halves())
            .collect();
        assert_eq!(ms, vec![-3, -1, 1, 3]);
        assert_eq!(SpinTotal::new(0).projections().count(), 1);
        let mut iter = SpinTotal::new(4).projections();
        assert_eq!(iter.len(), 5);
        iter.next();
        assert_eq!(iter.len(), 4);
    }

    #[test]
    fn ladder_elements() {
        // j = 1: J₊|1, -1⟩ = sqrt(2) |1, 0⟩
        let s = Spin::new(2, -2).unwrap();
        let (up, c) = s.raised().unwrap();
        assert_eq!(up, Spin::new(2, 0).unwrap());
        assert_abs_diff_eq!(c, 2.0_f64.sqrt(), epsilon = 1e-15);
        assert!(Spin::new(2, 2).unwrap().raised().is_none());
        let (dn, c) = Spin::new(1, 1).unwrap().lowered().unwrap();
        assert_eq!(dn, Spin::new(1, -1).unwrap());
        assert_abs_diff_eq!(c, 1.0, epsilon = 1e-15);
        assert!(dn.lowered().is_none());
    }

    #[test]
    fn clebsch_gordan() {
        // ½ ⊗ ½: |1, 0⟩ = (|↑↓⟩ + |↓↑⟩) / sqrt(2), |0, 0⟩ = (|↑↓⟩ - |↓↑⟩) / sqrt(2)
        let up = Spin::new(1, 1).unwrap();
        let dn = Spin::new(1, -1).unwrap();
        let r = 0.5_f64.sqrt();
        assert_abs_diff_eq!(cg(up, dn, Spin::new(2, 0).unwrap()), r, epsilon = 1e-12);
        assert_abs_diff_eq!(cg(dn, up, Spin::new(2, 0).unwrap()), r, epsilon = 1e-12);
        assert_abs_diff_eq!(
            cg(up, dn, Spin::new(0, 0).unwrap()).abs(), r, epsilon = 1e-12);
        assert_abs_diff_eq!(cg(up, up, Spin::new(2, 2).unwrap()), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(cg(up, up, Spin::new(2, 0).unwrap()), 0.0, epsilon = 1e-12);
    }
}
