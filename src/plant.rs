//! Plant instruction set and the stock branching-plant system.
//!
//! | Symbol | Instruction      | Effect                                            |
//! |--------|------------------|---------------------------------------------------|
//! | `F`    | `Forward`        | advance one step along local up                   |
//! | `B`    | `Shrink`         | scale step length by [`SHRINK_RATIO`]             |
//! | `Q`    | `Detail`         | jittered micro-step proportional to step length   |
//! | `+`    | `RotatePositive` | random turn in `[0, MAX_ANGLE]` about local Z     |
//! | `-`    | `RotateNegative` | random turn in `[-MAX_ANGLE, 0]` about local Z    |
//! | `X` `Y`| inert            | bookkeeping symbols for the grammar               |

use crate::core::context::{BranchStack, Context};
use crate::core::grammar::{ExpansionSeed, Grammar, GrammarError, ProductionRule};
use crate::core::instruction::{Instruction, InstructionError, InstructionTable, Noop};
use crate::core::pipeline::{LSystem, LSystemError};
use crate::schema::space::{Quat, SpatialState, Vec3};
use crate::schema::symbol::{symbols, Symbol};

/// Step-length ratio applied by `B`.
pub const SHRINK_RATIO: f64 = 0.65;
/// Upper bound (radians) of a random turn.
pub const MAX_ANGLE: f64 = 1.25;

/// Closed set of plant behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlantInstruction {
    Forward,
    Shrink,
    Detail,
    RotatePositive,
    RotateNegative,
}

impl PlantInstruction {
    pub const ALL: [PlantInstruction; 5] = [
        PlantInstruction::Forward,
        PlantInstruction::Shrink,
        PlantInstruction::Detail,
        PlantInstruction::RotatePositive,
        PlantInstruction::RotateNegative,
    ];
}

impl Instruction for PlantInstruction {
    fn symbol(&self) -> Symbol {
        match self {
            Self::Forward => Symbol('F'),
            Self::Shrink => Symbol('B'),
            Self::Detail => Symbol('Q'),
            Self::RotatePositive => Symbol('+'),
            Self::RotateNegative => Symbol('-'),
        }
    }

    fn evaluate(&self, context: &Context, _stack: &BranchStack) -> Context {
        let state = &context.state;
        let next = match self {
            Self::Forward => state.translated_local(Vec3::UP * state.step_length),
            Self::Shrink => state.with_step_length(state.step_length * SHRINK_RATIO),
            Self::Detail => {
                let len = state.step_length;
                let (min, max, spread) = (len / 15.0, len / 3.0, len / 5.0);
                // Jitter is drawn before the step magnitude.
                let jitter = Vec3::new(
                    context.random.real(0.0, 1.0, true),
                    context.random.real(0.0, 1.0, true),
                    context.random.real(0.0, 1.0, true),
                ) * spread;
                let step = Vec3::new(0.0, context.random.real(min, max, true), 0.0);
                state.translated_local(step + jitter)
            }
            Self::RotatePositive => {
                let angle = MAX_ANGLE * context.random.real(0.0, 1.0, true);
                state.rotated(Quat::from_rotation_z(angle))
            }
            Self::RotateNegative => {
                let angle = -MAX_ANGLE * context.random.real(0.0, 1.0, true);
                state.rotated(Quat::from_rotation_z(angle))
            }
        };
        context.with_state(next)
    }
}

/// The five plant instructions plus inert `X` and `Y`.
pub fn plant_instructions() -> Result<InstructionTable, InstructionError> {
    let mut table = InstructionTable::new();
    for instruction in PlantInstruction::ALL {
        table.register(instruction)?;
    }
    table.register(Noop(Symbol('X')))?;
    table.register(Noop(Symbol('Y')))?;
    Ok(table)
}

/// Axiom `FFX`: a trunk that forks into shrinking side branches each
/// generation, with every forward step refined into detail steps.
pub fn plant_grammar(generations: u32) -> Result<Grammar, GrammarError> {
    Grammar::new(
        symbols("FFX"),
        vec![
            ProductionRule::new('X', "[B-FY][B+FY]FX", 1.0),
            ProductionRule::new('Y', "[B-FY]", 1.0),
            ProductionRule::new('F', "QQQ", 1.0),
        ],
        generations,
    )
}

/// The stock plant: 10 generations, unit step, evaluation seed 0.
pub fn plant_system() -> Result<LSystem, LSystemError> {
    LSystem::builder()
        .grammar(plant_grammar(10)?)
        .instructions(plant_instructions()?)
        .expansion(ExpansionSeed::Fixed(0))
        .seed(0)
        .initial_state(SpatialState::new(1.0))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::random::RandomCursor;

    fn ctx(step: f64, seed: u64) -> Context {
        Context::new(SpatialState::new(step), RandomCursor::seeded(seed))
    }

    fn run(instruction: PlantInstruction, input: &Context) -> Context {
        instruction.evaluate(input, &BranchStack::new())
    }

    #[test]
    fn forward_moves_along_local_up() {
        let out = run(PlantInstruction::Forward, &ctx(2.0, 0));
        assert_eq!(out.state.position, Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(out.state.rotation, Quat::IDENTITY);
    }

    #[test]
    fn shrink_only_scales_step() {
        let input = ctx(1.0, 0);
        let out = run(PlantInstruction::Shrink, &input);
        assert!((out.state.step_length - SHRINK_RATIO).abs() < 1e-12);
        assert_eq!(out.state.position, input.state.position);
        assert_eq!(out.state.rotation, input.state.rotation);
    }

    #[test]
    fn detail_step_is_bounded_by_step_length() {
        for seed in 0..50 {
            let len = 3.0;
            let out = run(PlantInstruction::Detail, &ctx(len, seed));
            let p = out.state.position;
            // y in [len/15, len/3] + [0, len/5]; x, z in [0, len/5].
            assert!(p.y >= len / 15.0 - 1e-12 && p.y <= len / 3.0 + len / 5.0 + 1e-12);
            assert!(p.x >= 0.0 && p.x <= len / 5.0 + 1e-12);
            assert!(p.z >= 0.0 && p.z <= len / 5.0 + 1e-12);
        }
    }

    #[test]
    fn detail_consumes_four_draws() {
        let a = ctx(1.0, 9);
        run(PlantInstruction::Detail, &a);
        let b = RandomCursor::seeded(9);
        for _ in 0..4 {
            b.real(0.0, 1.0, true);
        }
        assert_eq!(a.random.real(0.0, 1.0, true), b.real(0.0, 1.0, true));
    }

    #[test]
    fn rotations_turn_in_opposite_senses() {
        let plus = run(PlantInstruction::RotatePositive, &ctx(1.0, 4));
        let minus = run(PlantInstruction::RotateNegative, &ctx(1.0, 4));
        let up_plus = plus.state.rotation.rotate(Vec3::UP);
        let up_minus = minus.state.rotation.rotate(Vec3::UP);
        // Same draw, mirrored about the y axis.
        assert!(up_plus.x <= 0.0 && up_minus.x >= 0.0);
        assert!((up_plus.x + up_minus.x).abs() < 1e-12);
        assert!((up_plus.y - up_minus.y).abs() < 1e-12);
        assert_eq!(plus.state.position, Vec3::ZERO);
    }

    #[test]
    fn rotation_angle_never_exceeds_max() {
        for seed in 0..100 {
            let out = run(PlantInstruction::RotatePositive, &ctx(1.0, seed));
            let up = out.state.rotation.rotate(Vec3::UP);
            let angle = up.y.clamp(-1.0, 1.0).acos();
            assert!(angle <= MAX_ANGLE + 1e-9);
        }
    }

    #[test]
    fn input_context_is_untouched() {
        let input = ctx(1.0, 0);
        let before = input.state;
        run(PlantInstruction::Forward, &input);
        run(PlantInstruction::RotatePositive, &input);
        assert_eq!(input.state, before);
    }

    #[test]
    fn plant_table_claims_expected_symbols() {
        let table = plant_instructions().unwrap();
        assert_eq!(table.symbols(), symbols("+-BFQXY"));
    }
}
