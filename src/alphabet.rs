//! Immutable alphabets with a distinguished epsilon symbol.
//!
//! An [`Alphabet`] doubles as the integer encoder used by the SAT layer: epsilon is
//! always encoded as `0`, and the remaining symbols follow in their natural order
//! starting from `1`. Encoding and decoding are therefore stable for equal alphabets.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::errors::FsaError;

/// Bound for anything usable as a transition label.
///
/// The ordering is only used to make iteration (and hence witnesses) deterministic.
pub trait Symbol: Clone + Eq + Ord + Hash + fmt::Debug {}

impl<T: Clone + Eq + Ord + Hash + fmt::Debug> Symbol for T {}

/// The integer code of epsilon in every alphabet.
pub const EPSILON_INDEX: usize = 0;

#[derive(Debug)]
struct Inner<S> {
    /// `symbols[0]` is epsilon, the rest are sorted.
    symbols: Vec<S>,
    index: HashMap<S, usize>,
}

/// A finite set of symbols plus one epsilon symbol.
///
/// Cloning is cheap: the symbol table is shared.
#[derive(Debug)]
pub struct Alphabet<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for Alphabet<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Symbol> Alphabet<S> {
    /// Creates an alphabet from an epsilon symbol and the proper symbols.
    ///
    /// The epsilon symbol may also appear among `symbols`; it is kept once.
    pub fn new(epsilon: S, symbols: impl IntoIterator<Item = S>) -> Self {
        let rest: BTreeSet<S> = symbols.into_iter().filter(|s| *s != epsilon).collect();
        let mut all = Vec::with_capacity(rest.len() + 1);
        all.push(epsilon);
        all.extend(rest);
        let index = all.iter().enumerate().map(|(i, s)| (s.clone(), i)).collect();
        Self {
            inner: Arc::new(Inner { symbols: all, index }),
        }
    }

    pub fn epsilon(&self) -> &S {
        &self.inner.symbols[EPSILON_INDEX]
    }

    pub fn is_epsilon(&self, symbol: &S) -> bool {
        symbol == self.epsilon()
    }

    /// Number of symbols, epsilon included.
    pub fn len(&self) -> usize {
        self.inner.symbols.len()
    }

    /// Whether the alphabet holds nothing but epsilon.
    pub fn is_empty(&self) -> bool {
        self.len() == 1
    }

    pub fn contains(&self, symbol: &S) -> bool {
        self.inner.index.contains_key(symbol)
    }

    /// Integer code of a symbol, epsilon being `0`.
    pub fn encode(&self, symbol: &S) -> Option<usize> {
        self.inner.index.get(symbol).copied()
    }

    /// Same as [`encode`][Self::encode], but failing with [`FsaError::UnknownSymbol`].
    pub fn try_encode(&self, symbol: &S) -> Result<usize, FsaError> {
        self.encode(symbol)
            .ok_or_else(|| FsaError::UnknownSymbol(format!("{:?}", symbol)))
    }

    /// Symbol with the given integer code.
    ///
    /// # Panics
    ///
    /// Panics if `code >= self.len()`.
    pub fn decode(&self, code: usize) -> &S {
        &self.inner.symbols[code]
    }

    /// All symbols, epsilon first.
    pub fn iter(&self) -> impl Iterator<Item = &S> + '_ {
        self.inner.symbols.iter()
    }

    /// All symbols except epsilon, in order.
    pub fn symbols(&self) -> impl Iterator<Item = &S> + '_ {
        self.inner.symbols[1..].iter()
    }

    /// Strips epsilon letters from a word and checks every other letter belongs here.
    pub fn normalize_word(&self, word: &[S]) -> Result<Vec<S>, FsaError> {
        let mut result = Vec::with_capacity(word.len());
        for symbol in word {
            self.try_encode(symbol)?;
            if !self.is_epsilon(symbol) {
                result.push(symbol.clone());
            }
        }
        Ok(result)
    }

    /// Alphabet of all pairs of proper symbols, with `(ε, ε)` as its epsilon.
    ///
    /// This is the alphabet of length-preserving transducers over `self`.
    pub fn product(&self) -> Alphabet<(S, S)> {
        let epsilon = (self.epsilon().clone(), self.epsilon().clone());
        let pairs = self
            .symbols()
            .flat_map(|a| self.symbols().map(move |b| (a.clone(), b.clone())));
        Alphabet::new(epsilon, pairs)
    }

    /// Pairs `(s, s)` of every symbol, epsilon included.
    pub fn diagonal(&self) -> Vec<(S, S)> {
        self.iter().map(|s| (s.clone(), s.clone())).collect()
    }
}

impl<S: Symbol> PartialEq for Alphabet<S> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner.symbols == other.inner.symbols
    }
}

impl<S: Symbol> Eq for Alphabet<S> {}

impl<S: Symbol> fmt::Display for Alphabet<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, s) in self.symbols().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}", s)?;
        }
        write!(f, "}} / {:?}", self.epsilon())
    }
}
