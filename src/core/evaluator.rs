/// Turtle walk over an expanded symbol sequence.
///
/// The walk is a single left-to-right pass. Branch markers save and restore
/// the context on an explicit stack, so nesting depth is bounded by memory
/// rather than by the call stack.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::core::context::{BranchStack, Context};
use crate::core::instruction::{Instruction, InstructionTable};
use crate::schema::space::SpatialState;
use crate::schema::symbol::{Symbol, BRANCH_CLOSE, BRANCH_OPEN};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EvalError {
    #[error("branch close at position {position} has no matching open")]
    UnbalancedBranch { position: usize },
    #[error("{depth} branch(es) still open at end of sequence")]
    UnclosedBranch { depth: usize },
}

/// One recorded step of a traced walk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Visit<S = SpatialState> {
    /// State after the instruction ran.
    pub state: S,
    /// Symbol that produced this state.
    pub symbol: Symbol,
    /// Branch nesting depth at this step (0 = trunk).
    pub depth: usize,
    /// Index of the symbol in the input sequence.
    pub position: usize,
}

/// Stateless driver; each `run` owns its own branch stack.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator;

impl Evaluator {
    /// Walk `symbols` from `initial`, returning one state per non-marker
    /// symbol in input order. Fails without partial output if branch
    /// markers are unbalanced.
    pub fn run<S: Clone + 'static>(
        symbols: &[Symbol],
        initial: Context<S>,
        table: &InstructionTable<S>,
    ) -> Result<Vec<S>, EvalError> {
        let mut out = Vec::with_capacity(symbols.len());
        Self::walk(symbols, initial, table, |visit| out.push(visit.state))?;
        Ok(out)
    }

    /// Like `run`, but each entry also records its symbol, position and
    /// branch depth.
    pub fn run_traced<S: Clone + 'static>(
        symbols: &[Symbol],
        initial: Context<S>,
        table: &InstructionTable<S>,
    ) -> Result<Vec<Visit<S>>, EvalError> {
        let mut out = Vec::with_capacity(symbols.len());
        Self::walk(symbols, initial, table, |visit| out.push(visit))?;
        Ok(out)
    }

    fn walk<S, F>(
        symbols: &[Symbol],
        initial: Context<S>,
        table: &InstructionTable<S>,
        mut emit: F,
    ) -> Result<(), EvalError>
    where
        S: Clone + 'static,
        F: FnMut(Visit<S>),
    {
        let mut stack = BranchStack::new();
        let mut current = initial;
        let mut max_depth = 0usize;

        debug!(symbols = symbols.len(), "evaluation started");

        for (position, &symbol) in symbols.iter().enumerate() {
            if symbol == BRANCH_OPEN {
                stack.push(current.clone());
                max_depth = max_depth.max(stack.depth());
                trace!(position, depth = stack.depth(), "branch push");
            } else if symbol == BRANCH_CLOSE {
                current = match stack.pop() {
                    Some(saved) => saved,
                    None => {
                        warn!(position, "branch close with empty stack");
                        return Err(EvalError::UnbalancedBranch { position });
                    }
                };
                trace!(position, depth = stack.depth(), "branch pop");
            } else {
                current = table.lookup(symbol).evaluate(&current, &stack);
                emit(Visit {
                    state: current.state.clone(),
                    symbol,
                    depth: stack.depth(),
                    position,
                });
            }
        }

        if !stack.is_empty() {
            warn!(depth = stack.depth(), "branches left open");
            return Err(EvalError::UnclosedBranch {
                depth: stack.depth(),
            });
        }

        debug!(max_depth, "evaluation finished");
        Ok(())
    }
}
