/// Stochastic grammar runtime — rules, loading, and generation-by-generation rewriting.

use rand::distributions::{WeightedError, WeightedIndex};
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::schema::symbol::{render, symbols, Symbol};

#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("rule for '{symbol}' has non-positive weight {weight}")]
    NonPositiveWeight { symbol: Symbol, weight: f64 },
    #[error("weights for '{symbol}' sum to {total}, beyond what the sampler can draw from")]
    WeightOverflow { symbol: Symbol, total: f64 },
    #[error("branch marker '{0}' cannot be a rule predecessor")]
    ReservedPredecessor(Symbol),
    #[error("invalid symbol '{0}': expected exactly one character")]
    InvalidSymbol(String),
    #[error("invalid weights for '{symbol}': {source}")]
    Weights {
        symbol: Symbol,
        #[source]
        source: WeightedError,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Ceiling on the summed weight of one predecessor's rules. The weighted
/// sampler scales draws by the total, which must stay finite.
pub const MAX_TOTAL_WEIGHT: f64 = f64::MAX / 2.0;

/// `predecessor → replacement`, chosen with probability proportional to
/// `weight` among the rules sharing its predecessor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionRule {
    pub predecessor: Symbol,
    pub replacement: Vec<Symbol>,
    pub weight: f64,
}

impl ProductionRule {
    pub fn new(predecessor: char, replacement: &str, weight: f64) -> Self {
        Self {
            predecessor: Symbol(predecessor),
            replacement: symbols(replacement),
            weight,
        }
    }
}

/// Axiom, rules and generation count. Validated on construction and
/// immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Grammar {
    axiom: Vec<Symbol>,
    rules: Vec<ProductionRule>,
    generations: u32,
}

// RON shape: symbols are written as strings, so rules need an
// intermediate struct before validation.

#[derive(Debug, Deserialize)]
#[serde(rename = "Rule")]
struct RonRule {
    predecessor: String,
    replacement: String,
    #[serde(default = "default_weight")]
    weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
#[serde(rename = "Grammar")]
pub(crate) struct RonGrammar {
    axiom: String,
    #[serde(default)]
    generations: u32,
    #[serde(default)]
    rules: Vec<RonRule>,
}

impl RonGrammar {
    pub(crate) fn into_grammar(self) -> Result<Grammar, GrammarError> {
        let mut rules = Vec::with_capacity(self.rules.len());
        for rule in self.rules {
            let mut chars = rule.predecessor.chars();
            let predecessor = match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => return Err(GrammarError::InvalidSymbol(rule.predecessor)),
            };
            rules.push(ProductionRule::new(predecessor, &rule.replacement, rule.weight));
        }
        Grammar::new(symbols(&self.axiom), rules, self.generations)
    }
}

impl Grammar {
    /// Fails if any rule has a non-positive (or non-finite) weight,
    /// rewrites a branch marker, or if one predecessor's weights sum past
    /// `MAX_TOTAL_WEIGHT`.
    pub fn new(
        axiom: Vec<Symbol>,
        rules: Vec<ProductionRule>,
        generations: u32,
    ) -> Result<Grammar, GrammarError> {
        let mut totals: FxHashMap<Symbol, f64> = FxHashMap::default();
        for rule in &rules {
            if !(rule.weight > 0.0 && rule.weight.is_finite()) {
                return Err(GrammarError::NonPositiveWeight {
                    symbol: rule.predecessor,
                    weight: rule.weight,
                });
            }
            if rule.predecessor.is_branch_marker() {
                return Err(GrammarError::ReservedPredecessor(rule.predecessor));
            }
            let total = totals.entry(rule.predecessor).or_default();
            *total += rule.weight;
            if *total > MAX_TOTAL_WEIGHT {
                return Err(GrammarError::WeightOverflow {
                    symbol: rule.predecessor,
                    total: *total,
                });
            }
        }
        Ok(Grammar {
            axiom,
            rules,
            generations,
        })
    }

    /// Load a grammar from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<Grammar, GrammarError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a grammar from a RON string.
    pub fn parse_ron(input: &str) -> Result<Grammar, GrammarError> {
        let raw: RonGrammar = ron::from_str(input)?;
        raw.into_grammar()
    }

    pub fn axiom(&self) -> &[Symbol] {
        &self.axiom
    }

    pub fn rules(&self) -> &[ProductionRule] {
        &self.rules
    }

    pub fn generations(&self) -> u32 {
        self.generations
    }

    /// Same axiom and rules, different generation count.
    pub fn with_generations(&self, generations: u32) -> Grammar {
        Grammar {
            generations,
            ..self.clone()
        }
    }

    /// Rules whose predecessor is `symbol`, in declaration order.
    pub fn rules_for(&self, symbol: Symbol) -> impl Iterator<Item = &ProductionRule> {
        self.rules.iter().filter(move |r| r.predecessor == symbol)
    }
}

/// How `GrammarEngine::expand` seeds its rule selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpansionSeed {
    /// Reseed from the same value on every call: repeated expansions agree.
    Fixed(u64),
    /// Seed from `value + call index`: calls differ, but a fresh engine
    /// with the same seed replays the same series.
    PerCall(u64),
    /// OS entropy; not reproducible.
    Entropy,
}

impl Default for ExpansionSeed {
    fn default() -> Self {
        Self::Fixed(0)
    }
}

/// Rewrite alternatives for one predecessor.
#[derive(Debug, Clone)]
struct Alternatives {
    replacements: Vec<Vec<Symbol>>,
    /// `None` for a single rule, which is selected without a draw.
    dist: Option<WeightedIndex<f64>>,
}

impl Alternatives {
    fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> &[Symbol] {
        match &self.dist {
            Some(dist) => &self.replacements[dist.sample(rng)],
            None => &self.replacements[0],
        }
    }
}

/// Expands a grammar's axiom through its generations.
#[derive(Debug, Clone)]
pub struct GrammarEngine {
    grammar: Grammar,
    index: FxHashMap<Symbol, Alternatives>,
    seed: ExpansionSeed,
    expansion_count: u64,
}

impl GrammarEngine {
    pub fn new(grammar: Grammar, seed: ExpansionSeed) -> Result<GrammarEngine, GrammarError> {
        let mut grouped: FxHashMap<Symbol, (Vec<Vec<Symbol>>, Vec<f64>)> = FxHashMap::default();
        for rule in grammar.rules() {
            let entry = grouped.entry(rule.predecessor).or_default();
            entry.0.push(rule.replacement.clone());
            entry.1.push(rule.weight);
        }

        let mut index = FxHashMap::default();
        for (symbol, (replacements, weights)) in grouped {
            let dist = if weights.len() > 1 {
                Some(
                    WeightedIndex::new(&weights)
                        .map_err(|source| GrammarError::Weights { symbol, source })?,
                )
            } else {
                None
            };
            index.insert(symbol, Alternatives { replacements, dist });
        }

        Ok(GrammarEngine {
            grammar,
            index,
            seed,
            expansion_count: 0,
        })
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn seed(&self) -> ExpansionSeed {
        self.seed
    }

    /// Expand the axiom through every generation, seeding per the
    /// engine's `ExpansionSeed`.
    ///
    /// Output grows exponentially with the generation count when
    /// replacements are longer than one symbol; bounding it is up to the caller.
    pub fn expand(&mut self) -> Vec<Symbol> {
        let mut rng = match self.seed {
            ExpansionSeed::Fixed(seed) => StdRng::seed_from_u64(seed),
            ExpansionSeed::PerCall(seed) => {
                StdRng::seed_from_u64(seed.wrapping_add(self.expansion_count))
            }
            ExpansionSeed::Entropy => StdRng::from_entropy(),
        };
        self.expansion_count += 1;
        self.expand_with(&mut rng)
    }

    /// Expand using a caller-supplied random generator.
    pub fn expand_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Symbol> {
        let mut current = self.grammar.axiom().to_vec();
        for generation in 1..=self.grammar.generations() {
            current = self.rewrite(&current, rng);
            debug!(generation, len = current.len(), "rewrote generation");
        }
        current
    }

    /// One generation: every symbol replaced by a chosen replacement,
    /// or by itself when no rule matches.
    pub fn rewrite<R: Rng + ?Sized>(&self, current: &[Symbol], rng: &mut R) -> Vec<Symbol> {
        let mut next = Vec::with_capacity(current.len() * 2);
        for &symbol in current {
            match self.index.get(&symbol) {
                Some(alternatives) => next.extend_from_slice(alternatives.choose(rng)),
                None => next.push(symbol),
            }
        }
        next
    }

    /// Expand and render as a string.
    pub fn expand_to_string(&mut self) -> String {
        render(&self.expand())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(axiom: &str, rules: Vec<ProductionRule>, generations: u32) -> GrammarEngine {
        let grammar = Grammar::new(symbols(axiom), rules, generations).unwrap();
        GrammarEngine::new(grammar, ExpansionSeed::Fixed(1)).unwrap()
    }

    #[test]
    fn zero_generations_returns_axiom() {
        let mut e = engine("FX", vec![ProductionRule::new('X', "[FX]", 1.0)], 0);
        assert_eq!(e.expand_to_string(), "FX");
    }

    #[test]
    fn unmatched_symbols_rewrite_to_themselves() {
        let mut e = engine("X", vec![ProductionRule::new('X', "AB", 1.0)], 2);
        assert_eq!(e.expand_to_string(), "AB");
    }

    #[test]
    fn single_rule_substitution_is_literal() {
        let mut e = engine("A", vec![ProductionRule::new('A', "AB", 1.0)], 3);
        assert_eq!(e.expand_to_string(), "ABBB");
    }

    #[test]
    fn plant_rules_first_generation() {
        let mut e = engine(
            "FFX",
            vec![
                ProductionRule::new('X', "[B-FY][B+FY]FX", 1.0),
                ProductionRule::new('Y', "[B-FY]", 1.0),
                ProductionRule::new('F', "QQQ", 1.0),
            ],
            1,
        );
        assert_eq!(e.expand_to_string(), "QQQQQQ[B-FY][B+FY]FX");
    }

    #[test]
    fn zero_weight_rejected() {
        let err = Grammar::new(symbols("X"), vec![ProductionRule::new('X', "F", 0.0)], 1)
            .unwrap_err();
        assert!(matches!(err, GrammarError::NonPositiveWeight { symbol, .. } if symbol == Symbol('X')));
    }

    #[test]
    fn negative_and_nan_weights_rejected() {
        assert!(Grammar::new(vec![], vec![ProductionRule::new('X', "F", -1.0)], 1).is_err());
        assert!(Grammar::new(vec![], vec![ProductionRule::new('X', "F", f64::NAN)], 1).is_err());
        assert!(Grammar::new(vec![], vec![ProductionRule::new('X', "F", f64::INFINITY)], 1).is_err());
    }

    #[test]
    fn overflowing_weight_total_rejected() {
        let rules = vec![
            ProductionRule::new('A', "x", f64::MAX),
            ProductionRule::new('A', "y", f64::MAX),
        ];
        let err = Grammar::new(symbols("A"), rules, 1).unwrap_err();
        assert!(matches!(err, GrammarError::WeightOverflow { symbol, .. } if symbol == Symbol('A')));
    }

    #[test]
    fn large_weights_within_ceiling_expand() {
        let rules = vec![
            ProductionRule::new('A', "x", 1e300),
            ProductionRule::new('A', "y", 3e300),
            ProductionRule::new('B', "z", MAX_TOTAL_WEIGHT),
        ];
        let grammar = Grammar::new(symbols("AB"), rules, 1).unwrap();
        let mut e = GrammarEngine::new(grammar, ExpansionSeed::Fixed(2)).unwrap();
        let out = e.expand_to_string();
        assert!(out == "xz" || out == "yz", "unexpected expansion {}", out);
    }

    #[test]
    fn branch_markers_cannot_be_rewritten() {
        let err = Grammar::new(vec![], vec![ProductionRule::new('[', "F", 1.0)], 1).unwrap_err();
        assert!(matches!(err, GrammarError::ReservedPredecessor(_)));
    }

    #[test]
    fn fixed_seed_repeats_across_calls() {
        let rules = vec![
            ProductionRule::new('X', "FX", 1.0),
            ProductionRule::new('X', "[+X]", 1.0),
            ProductionRule::new('X', "[-X]", 1.0),
        ];
        let mut e = engine("X", rules, 6);
        let first = e.expand();
        for _ in 0..5 {
            assert_eq!(e.expand(), first);
        }
    }

    #[test]
    fn per_call_seed_varies_but_replays() {
        let rules = vec![
            ProductionRule::new('X', "FX", 1.0),
            ProductionRule::new('X', "[+X]", 1.0),
            ProductionRule::new('X', "[-X]", 1.0),
        ];
        let grammar = Grammar::new(symbols("XX"), rules, 8).unwrap();
        let mut a = GrammarEngine::new(grammar.clone(), ExpansionSeed::PerCall(5)).unwrap();
        let mut b = GrammarEngine::new(grammar, ExpansionSeed::PerCall(5)).unwrap();

        let series_a: Vec<_> = (0..6).map(|_| a.expand()).collect();
        let series_b: Vec<_> = (0..6).map(|_| b.expand()).collect();
        assert_eq!(series_a, series_b);
        assert!(series_a.iter().any(|s| s != &series_a[0]));
    }

    #[test]
    fn parse_ron_grammar() {
        let g = Grammar::parse_ron(
            r#"(
                axiom: "FX",
                generations: 3,
                rules: [
                    (predecessor: "X", replacement: "[+FX][-FX]", weight: 2.0),
                    (predecessor: "X", replacement: "FX"),
                ],
            )"#,
        )
        .unwrap();
        assert_eq!(g.axiom(), symbols("FX").as_slice());
        assert_eq!(g.generations(), 3);
        assert_eq!(g.rules().len(), 2);
        assert_eq!(g.rules()[1].weight, 1.0);
        assert_eq!(g.rules_for(Symbol('X')).count(), 2);
    }

    #[test]
    fn parse_ron_rejects_long_predecessor() {
        let err = Grammar::parse_ron(
            r#"(axiom: "X", rules: [(predecessor: "XY", replacement: "F")])"#,
        )
        .unwrap_err();
        assert!(matches!(err, GrammarError::InvalidSymbol(s) if s == "XY"));
    }

    #[test]
    fn parse_ron_rejects_bad_weight() {
        let err = Grammar::parse_ron(
            r#"(axiom: "X", rules: [(predecessor: "X", replacement: "F", weight: 0.0)])"#,
        )
        .unwrap_err();
        assert!(matches!(err, GrammarError::NonPositiveWeight { .. }));
    }

    #[test]
    fn load_plant_grammar_from_ron() {
        let path = std::path::PathBuf::from("tests/fixtures/plant.ron");
        let g = Grammar::load_from_ron(&path).unwrap();
        assert_eq!(g.generations(), 10);
        assert_eq!(g.rules().len(), 3);
    }

    #[test]
    fn with_generations_keeps_rules() {
        let g = Grammar::new(symbols("X"), vec![ProductionRule::new('X', "FX", 1.0)], 2).unwrap();
        let h = g.with_generations(7);
        assert_eq!(h.generations(), 7);
        assert_eq!(h.rules(), g.rules());
    }
}
