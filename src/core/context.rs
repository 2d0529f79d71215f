/// Turtle context and the branch stack of saved contexts.

use crate::core::random::RandomCursor;
use crate::schema::space::SpatialState;

/// The turtle at one point of the walk: a spatial state plus a handle to
/// the shared random stream.
#[derive(Debug, Clone)]
pub struct Context<S = SpatialState> {
    pub state: S,
    pub random: RandomCursor,
}

impl<S: Clone> Context<S> {
    pub fn new(state: S, random: RandomCursor) -> Self {
        Self { state, random }
    }

    /// Same random handle, new state.
    pub fn with_state(&self, state: S) -> Self {
        Self {
            state,
            random: self.random.clone(),
        }
    }
}

/// Saved contexts for enclosing branch scopes, innermost last.
///
/// Only the evaluator pushes and pops; instructions get read access.
#[derive(Debug, Clone)]
pub struct BranchStack<S = SpatialState> {
    frames: Vec<Context<S>>,
}

impl<S> Default for BranchStack<S> {
    fn default() -> Self {
        Self { frames: Vec::new() }
    }
}

impl<S> BranchStack<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Context saved by the innermost open branch.
    pub fn peek(&self) -> Option<&Context<S>> {
        self.frames.last()
    }

    /// Saved contexts, outermost first.
    pub fn iter(&self) -> impl Iterator<Item = &Context<S>> {
        self.frames.iter()
    }

    pub(crate) fn push(&mut self, ctx: Context<S>) {
        self.frames.push(ctx);
    }

    pub(crate) fn pop(&mut self) -> Option<Context<S>> {
        self.frames.pop()
    }
}
