/// Instruction contract and the symbol → instruction registry.

use rustc_hash::FxHashMap;
use std::fmt;
use thiserror::Error;

use crate::core::context::{BranchStack, Context};
use crate::schema::space::SpatialState;
use crate::schema::symbol::Symbol;

#[derive(Debug, Error)]
pub enum InstructionError {
    #[error("symbol '{0}' is already claimed by another instruction")]
    DuplicateSymbol(Symbol),
    #[error("symbol '{0}' is a branch marker and cannot carry an instruction")]
    ReservedSymbol(Symbol),
}

/// Behavior bound to one symbol: turns the current context into the next.
///
/// Implementations return a new context and leave their input untouched.
/// The branch stack is read-only here; pushing and popping belongs to the
/// evaluator. Drawing from `context.random` advances the shared stream, so
/// evaluation order is part of reproducibility.
pub trait Instruction<S = SpatialState> {
    fn symbol(&self) -> Symbol;

    fn evaluate(&self, context: &Context<S>, stack: &BranchStack<S>) -> Context<S>;
}

/// Identity instruction for symbols with no registered behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Noop(pub Symbol);

impl<S: Clone> Instruction<S> for Noop {
    fn symbol(&self) -> Symbol {
        self.0
    }

    fn evaluate(&self, context: &Context<S>, _stack: &BranchStack<S>) -> Context<S> {
        context.clone()
    }
}

/// Registry of instructions keyed by their claimed symbol.
pub struct InstructionTable<S = SpatialState> {
    instructions: FxHashMap<Symbol, Box<dyn Instruction<S>>>,
}

impl<S> Default for InstructionTable<S> {
    fn default() -> Self {
        Self {
            instructions: FxHashMap::default(),
        }
    }
}

impl<S: Clone + 'static> InstructionTable<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an instruction. Each symbol may be claimed once, and branch
    /// markers never.
    pub fn register<I>(&mut self, instruction: I) -> Result<(), InstructionError>
    where
        I: Instruction<S> + 'static,
    {
        self.register_boxed(Box::new(instruction))
    }

    pub fn register_boxed(
        &mut self,
        instruction: Box<dyn Instruction<S>>,
    ) -> Result<(), InstructionError> {
        let symbol = instruction.symbol();
        if symbol.is_branch_marker() {
            return Err(InstructionError::ReservedSymbol(symbol));
        }
        if self.instructions.contains_key(&symbol) {
            return Err(InstructionError::DuplicateSymbol(symbol));
        }
        self.instructions.insert(symbol, instruction);
        Ok(())
    }

    /// Instruction for `symbol`, falling back to a `Noop` so unknown
    /// symbols pass through unchanged.
    pub fn lookup(&self, symbol: Symbol) -> Lookup<'_, S> {
        match self.instructions.get(&symbol) {
            Some(instruction) => Lookup::Registered(instruction.as_ref()),
            None => Lookup::Inert(Noop(symbol)),
        }
    }

    pub fn contains(&self, symbol: Symbol) -> bool {
        self.instructions.contains_key(&symbol)
    }

    /// Claimed symbols in sorted order.
    pub fn symbols(&self) -> Vec<Symbol> {
        let mut out: Vec<Symbol> = self.instructions.keys().copied().collect();
        out.sort();
        out
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

impl<S> fmt::Debug for InstructionTable<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut symbols: Vec<char> = self.instructions.keys().map(|s| s.0).collect();
        symbols.sort_unstable();
        f.debug_struct("InstructionTable")
            .field("symbols", &symbols)
            .finish()
    }
}

/// Result of `InstructionTable::lookup`.
pub enum Lookup<'a, S> {
    Registered(&'a dyn Instruction<S>),
    Inert(Noop),
}

impl<S: Clone> Lookup<'_, S> {
    pub fn is_inert(&self) -> bool {
        matches!(self, Lookup::Inert(_))
    }
}

impl<S: Clone> Instruction<S> for Lookup<'_, S> {
    fn symbol(&self) -> Symbol {
        match self {
            Lookup::Registered(i) => i.symbol(),
            Lookup::Inert(noop) => noop.0,
        }
    }

    fn evaluate(&self, context: &Context<S>, stack: &BranchStack<S>) -> Context<S> {
        match self {
            Lookup::Registered(i) => i.evaluate(context, stack),
            Lookup::Inert(noop) => noop.evaluate(context, stack),
        }
    }
}
