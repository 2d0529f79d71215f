/// Grammar symbols and the reserved branch markers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single grammar token. Identity only; symbols carry no parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol(pub char);

/// Saves the active context onto the branch stack.
pub const BRANCH_OPEN: Symbol = Symbol('[');
/// Restores the most recently saved context.
pub const BRANCH_CLOSE: Symbol = Symbol(']');

impl Symbol {
    /// True for the two reserved branch markers.
    pub fn is_branch_marker(self) -> bool {
        self == BRANCH_OPEN || self == BRANCH_CLOSE
    }
}

impl From<char> for Symbol {
    fn from(c: char) -> Self {
        Symbol(c)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Split a string into one symbol per char.
pub fn symbols(input: &str) -> Vec<Symbol> {
    input.chars().map(Symbol).collect()
}

/// Join a symbol sequence back into a string.
pub fn render(seq: &[Symbol]) -> String {
    seq.iter().map(|s| s.0).collect()
}

/// Net bracket balance of a sequence: `None` if a close marker ever
/// precedes its open, otherwise the number of opens left unclosed.
pub fn branch_balance(seq: &[Symbol]) -> Option<usize> {
    let mut depth = 0usize;
    for &s in seq {
        if s == BRANCH_OPEN {
            depth += 1;
        } else if s == BRANCH_CLOSE {
            depth = depth.checked_sub(1)?;
        }
    }
    Some(depth)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_and_render_agree() {
        let seq = symbols("F[+F]F");
        assert_eq!(seq.len(), 6);
        assert_eq!(seq[1], BRANCH_OPEN);
        assert_eq!(render(&seq), "F[+F]F");
    }

    #[test]
    fn branch_markers_are_reserved() {
        assert!(Symbol('[').is_branch_marker());
        assert!(Symbol(']').is_branch_marker());
        assert!(!Symbol('F').is_branch_marker());
    }

    #[test]
    fn balance_detects_faults() {
        assert_eq!(branch_balance(&symbols("[F[F]]F")), Some(0));
        assert_eq!(branch_balance(&symbols("[[F]")), Some(1));
        assert_eq!(branch_balance(&symbols("F]")), None);
        assert_eq!(branch_balance(&[]), Some(0));
    }
}
