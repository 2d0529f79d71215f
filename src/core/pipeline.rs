/// The main generation pipeline: grammar expansion → turtle evaluation.
///
/// Wires a grammar engine, an instruction table and an initial context
/// together behind one builder.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::core::context::Context;
use crate::core::evaluator::{EvalError, Evaluator, Visit};
use crate::core::grammar::{ExpansionSeed, Grammar, GrammarEngine, GrammarError, RonGrammar};
use crate::core::instruction::{InstructionError, InstructionTable};
use crate::core::random::RandomCursor;
use crate::schema::space::SpatialState;
use crate::schema::symbol::Symbol;

#[derive(Debug, Error)]
pub enum LSystemError {
    #[error("grammar error: {0}")]
    Grammar(#[from] GrammarError),
    #[error("instruction error: {0}")]
    Instruction(#[from] InstructionError),
    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("no grammar configured")]
    MissingGrammar,
}

/// Output of one full expand + evaluate pass.
#[derive(Debug, Clone)]
pub struct Generation<S = SpatialState> {
    pub symbols: Vec<Symbol>,
    pub states: Vec<S>,
}

/// A grammar plus the instructions that interpret it. Built via `LSystem::builder()`.
pub struct LSystem<S = SpatialState> {
    engine: GrammarEngine,
    instructions: InstructionTable<S>,
    initial_state: S,
    seed: u64,
}

/// Builder for constructing an `LSystem`.
pub struct LSystemBuilder<S = SpatialState> {
    grammar: Option<Grammar>,
    grammar_path: Option<PathBuf>,
    generations: Option<u32>,
    instructions: Option<InstructionTable<S>>,
    expansion: ExpansionSeed,
    seed: u64,
    initial_state: Option<S>,
}

impl<S: Clone + Default + 'static> LSystem<S> {
    pub fn builder() -> LSystemBuilder<S> {
        LSystemBuilder {
            grammar: None,
            grammar_path: None,
            generations: None,
            instructions: None,
            expansion: ExpansionSeed::default(),
            seed: 0,
            initial_state: None,
        }
    }

    pub fn grammar(&self) -> &Grammar {
        self.engine.grammar()
    }

    pub fn instructions(&self) -> &InstructionTable<S> {
        &self.instructions
    }

    /// Evaluation seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Expand the grammar into its final symbol sequence.
    pub fn expand(&mut self) -> Vec<Symbol> {
        self.engine.expand()
    }

    /// Starting context with a fresh random stream seeded from `seed`.
    pub fn initial_context(&self) -> Context<S> {
        Context::new(self.initial_state.clone(), RandomCursor::seeded(self.seed))
    }

    /// Walk `symbols` from the initial context.
    pub fn evaluate(&self, symbols: &[Symbol]) -> Result<Vec<S>, EvalError> {
        Evaluator::run(symbols, self.initial_context(), &self.instructions)
    }

    /// Walk `symbols`, keeping symbol, position and depth per state.
    pub fn evaluate_traced(&self, symbols: &[Symbol]) -> Result<Vec<Visit<S>>, EvalError> {
        Evaluator::run_traced(symbols, self.initial_context(), &self.instructions)
    }

    /// Expand then evaluate.
    pub fn generate(&mut self) -> Result<Generation<S>, LSystemError> {
        let symbols = self.expand();
        let states = self.evaluate(&symbols)?;
        debug!(
            symbols = symbols.len(),
            states = states.len(),
            "generated"
        );
        Ok(Generation { symbols, states })
    }

    /// Generate `count` variants, each evaluated with its own seed offset.
    /// Expansion follows the engine's `ExpansionSeed`.
    pub fn generate_variants(&mut self, count: usize) -> Result<Vec<Generation<S>>, LSystemError> {
        let base = self.seed;
        let mut results = Vec::with_capacity(count);
        for i in 0..count {
            self.seed = base.wrapping_add(i as u64);
            match self.generate() {
                Ok(generation) => results.push(generation),
                Err(e) => {
                    self.seed = base;
                    return Err(e);
                }
            }
        }
        self.seed = base;
        Ok(results)
    }
}

impl<S: Clone + Default + 'static> LSystemBuilder<S> {
    /// Provide the grammar directly.
    pub fn grammar(mut self, grammar: Grammar) -> Self {
        self.grammar = Some(grammar);
        self
    }

    /// Load the grammar from a RON file at build time.
    pub fn grammar_file(mut self, path: impl AsRef<Path>) -> Self {
        self.grammar_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Override the grammar's generation count.
    pub fn generations(mut self, generations: u32) -> Self {
        self.generations = Some(generations);
        self
    }

    pub fn instructions(mut self, instructions: InstructionTable<S>) -> Self {
        self.instructions = Some(instructions);
        self
    }

    pub fn expansion(mut self, expansion: ExpansionSeed) -> Self {
        self.expansion = expansion;
        self
    }

    /// Seed for the evaluation random stream.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn initial_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    pub fn build(self) -> Result<LSystem<S>, LSystemError> {
        // A directly provided grammar wins over a file.
        let grammar = match (self.grammar, self.grammar_path) {
            (Some(g), _) => g,
            (None, Some(path)) => Grammar::load_from_ron(&path)?,
            (None, None) => return Err(LSystemError::MissingGrammar),
        };
        let grammar = match self.generations {
            Some(n) => grammar.with_generations(n),
            None => grammar,
        };

        Ok(LSystem {
            engine: GrammarEngine::new(grammar, self.expansion)?,
            instructions: self.instructions.unwrap_or_default(),
            initial_state: self.initial_state.unwrap_or_default(),
            seed: self.seed,
        })
    }
}

/// Complete run configuration as stored on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct LSystemConfig {
    pub grammar: Grammar,
    pub seed: u64,
    pub expansion: ExpansionSeed,
    pub step_length: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename = "Config")]
struct RonConfig {
    grammar: RonGrammar,
    #[serde(default)]
    seed: u64,
    #[serde(default)]
    expansion: ExpansionSeed,
    #[serde(default = "default_step_length")]
    step_length: f64,
}

fn default_step_length() -> f64 {
    1.0
}

impl LSystemConfig {
    pub fn load_from_ron(path: &Path) -> Result<LSystemConfig, LSystemError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<LSystemConfig, LSystemError> {
        let raw: RonConfig = ron::from_str(input)?;
        Ok(LSystemConfig {
            grammar: raw.grammar.into_grammar()?,
            seed: raw.seed,
            expansion: raw.expansion,
            step_length: raw.step_length,
        })
    }

    /// Builder pre-filled from this configuration.
    pub fn builder(self) -> LSystemBuilder<SpatialState> {
        LSystem::builder()
            .grammar(self.grammar)
            .seed(self.seed)
            .expansion(self.expansion)
            .initial_state(SpatialState::new(self.step_length))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::BranchStack;
    use crate::core::grammar::ProductionRule;
    use crate::core::instruction::Instruction;
    use crate::schema::symbol::{render, symbols};

    struct Count;

    impl Instruction<u64> for Count {
        fn symbol(&self) -> Symbol {
            Symbol('F')
        }

        fn evaluate(&self, context: &Context<u64>, _stack: &BranchStack<u64>) -> Context<u64> {
            context.with_state(context.state + 1)
        }
    }

    fn counting_system(generations: u32) -> LSystem<u64> {
        let grammar = Grammar::new(
            symbols("X"),
            vec![ProductionRule::new('X', "F[X]FX", 1.0)],
            generations,
        )
        .unwrap();
        let mut table = InstructionTable::new();
        table.register(Count).unwrap();
        LSystem::builder()
            .grammar(grammar)
            .instructions(table)
            .build()
            .unwrap()
    }

    #[test]
    fn generate_expands_then_evaluates() {
        let mut system = counting_system(1);
        let generation = system.generate().unwrap();
        assert_eq!(render(&generation.symbols), "F[X]FX");
        // X is inert and repeats the state before it.
        assert_eq!(generation.states, vec![1, 1, 2, 2]);
    }

    #[test]
    fn builder_without_grammar_fails() {
        let result = LSystem::<u64>::builder().build();
        assert!(matches!(result, Err(LSystemError::MissingGrammar)));
    }

    #[test]
    fn builder_generation_override() {
        let grammar = Grammar::new(symbols("A"), vec![ProductionRule::new('A', "AA", 1.0)], 1)
            .unwrap();
        let mut system = LSystem::<u64>::builder()
            .grammar(grammar)
            .generations(3)
            .build()
            .unwrap();
        assert_eq!(system.expand().len(), 8);
        assert_eq!(system.grammar().generations(), 3);
    }

    #[test]
    fn builder_with_seed() {
        let system = LSystem::<u64>::builder()
            .grammar(Grammar::new(vec![], vec![], 0).unwrap())
            .seed(12345)
            .build()
            .unwrap();
        assert_eq!(system.seed(), 12345);
        assert!(system.instructions().is_empty());
    }

    #[test]
    fn grammar_file_loaded_at_build() {
        let system = LSystem::<SpatialState>::builder()
            .grammar_file("tests/fixtures/plant.ron")
            .build()
            .unwrap();
        assert_eq!(system.grammar().rules().len(), 3);
    }

    #[test]
    fn missing_grammar_file_is_io_error() {
        let result = LSystem::<SpatialState>::builder()
            .grammar_file("tests/fixtures/does_not_exist.ron")
            .build();
        assert!(matches!(result, Err(LSystemError::Grammar(GrammarError::Io(_)))));
    }

    #[test]
    fn variants_restore_seed() {
        let mut system = counting_system(2);
        let variants = system.generate_variants(3).unwrap();
        assert_eq!(variants.len(), 3);
        assert_eq!(system.seed(), 0);
    }

    #[test]
    fn config_parses_with_defaults() {
        let config = LSystemConfig::parse_ron(
            r#"(
                grammar: (axiom: "F", generations: 2, rules: [(predecessor: "F", replacement: "FF")]),
            )"#,
        )
        .unwrap();
        assert_eq!(config.seed, 0);
        assert_eq!(config.expansion, ExpansionSeed::Fixed(0));
        assert_eq!(config.step_length, 1.0);
        assert_eq!(config.grammar.generations(), 2);
    }

    #[test]
    fn config_parses_all_fields() {
        let config = LSystemConfig::parse_ron(
            r#"(
                grammar: (axiom: "F", rules: []),
                seed: 9,
                expansion: PerCall(4),
                step_length: 0.5,
            )"#,
        )
        .unwrap();
        assert_eq!(config.seed, 9);
        assert_eq!(config.expansion, ExpansionSeed::PerCall(4));
        let system = config.builder().build().unwrap();
        assert_eq!(system.initial_context().state.step_length, 0.5);
    }
}
