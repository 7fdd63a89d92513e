//! Variables and literals of the SAT layer.
//!
//! Variables are 1-indexed (0 is reserved), matching DIMACS, so a literal is just a
//! signed non-zero integer.

use std::fmt;
use std::ops::Neg;

/// A propositional variable (1-indexed).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Var(u32);

impl Var {
    /// # Panics
    ///
    /// Panics if `id == 0`.
    pub fn new(id: u32) -> Self {
        assert_ne!(id, 0, "Variable IDs must be >= 1");
        Var(id)
    }

    pub fn id(self) -> u32 {
        self.0
    }

    /// Index into a 0-based model vector.
    pub fn index(self) -> usize {
        self.0 as usize - 1
    }

    pub fn pos(self) -> Lit {
        Lit(self.0 as i32)
    }

    pub fn neg(self) -> Lit {
        Lit(-(self.0 as i32))
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// A signed literal over a [`Var`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Lit(i32);

impl Lit {
    /// # Panics
    ///
    /// Panics if `value == 0`.
    pub fn from_dimacs(value: i32) -> Self {
        assert_ne!(value, 0, "Literal must be non-zero");
        Lit(value)
    }

    pub const fn to_dimacs(self) -> i32 {
        self.0
    }

    pub fn var(self) -> Var {
        Var(self.0.unsigned_abs())
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub const fn negate(self) -> Self {
        Self(-self.0)
    }

    /// The literal whose value is `value` whenever `self` is true.
    pub fn with_sign(self, value: bool) -> Self {
        if value {
            self
        } else {
            -self
        }
    }
}

impl Neg for Lit {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self.negate()
    }
}

impl From<Var> for Lit {
    fn from(var: Var) -> Self {
        var.pos()
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", if self.is_positive() { "" } else { "~" }, self.var())
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_lit() {
        let x = Var::new(3);
        assert_eq!(x.pos().to_dimacs(), 3);
        assert_eq!(x.neg().to_dimacs(), -3);
        assert_eq!(-x.pos(), x.neg());
        assert_eq!(x.neg().var(), x);
        assert_eq!(x.index(), 2);
        assert_eq!(x.neg().to_string(), "~x3");
        assert_eq!(x.pos().with_sign(false), x.neg());
    }

    #[test]
    #[should_panic(expected = "Variable IDs must be >= 1")]
    fn test_var_zero_panics() {
        Var::new(0);
    }
}
