use std::fmt;

/// A state of an automaton.
///
/// States are indices into the automaton's own state arena, so a `State` is only
/// meaningful together with the automaton (or builder) that produced it.
/// They carry no payload: all structure lives in the transition relation.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct State(u32);

impl State {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the arena index of the state.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<usize> for State {
    fn from(index: usize) -> Self {
        assert!(index <= u32::MAX as usize, "State index overflow");
        State(index as u32)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_state_index() {
        let s = State::from(5);
        assert_eq!(s.index(), 5);
        assert_eq!(s.to_string(), "q5");
        assert!(State::new(1) < State::new(2));
    }
}
