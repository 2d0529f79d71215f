//! L-system engine — stochastic grammar rewriting plus a stack-based turtle.
//!
//! Rewrites an axiom through weighted production rules, then walks the
//! resulting symbols with pluggable per-symbol instructions, saving and
//! restoring the turtle at branch markers. The ordered list of visited
//! states is handed to whatever builds geometry from it.

pub mod core;
pub mod plant;
pub mod schema;
