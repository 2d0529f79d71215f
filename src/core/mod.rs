pub mod context;
pub mod evaluator;
pub mod grammar;
pub mod instruction;
pub mod pipeline;
pub mod random;
