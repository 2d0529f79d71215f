/// Grow — expand and evaluate an L-system with the plant instruction set.
///
/// Usage: grow [--config <file.ron>] [--grammar <file.ron>] [--seed <n>]
///             [--generations <n>] [--symbols] [--states] [--json]
///
/// With no grammar or config, grows the stock plant.
/// Set RUST_LOG=lsystem_engine=debug to see per-generation sizes.

use lsystem_engine::core::pipeline::{Generation, LSystem, LSystemBuilder, LSystemConfig};
use lsystem_engine::plant::{plant_grammar, plant_instructions};
use lsystem_engine::schema::space::{bounding_box, SpatialState};
use lsystem_engine::schema::symbol::render;
use std::path::Path;
use std::process;

struct Options {
    config: Option<String>,
    grammar: Option<String>,
    seed: Option<u64>,
    generations: Option<u32>,
    print_symbols: bool,
    print_states: bool,
    json: bool,
}

fn main() {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return;
    }

    let opts = parse_args(&args[1..]);

    let builder = match make_builder(&opts) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
    };

    let mut system = match builder.build() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("ERROR: Failed to build system: {}", e);
            process::exit(1);
        }
    };

    let generation = match system.generate() {
        Ok(g) => g,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
    };

    if opts.json {
        match serde_json::to_string_pretty(&generation.states) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("ERROR: Failed to serialize states: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    print_summary(&system, &generation);

    if opts.print_symbols {
        println!("\n--- Symbols ---");
        println!("{}", render(&generation.symbols));
    }

    if opts.print_states {
        println!("\n--- States ---");
        for (i, s) in generation.states.iter().enumerate() {
            println!(
                "{:>6}  pos=({:>8.3}, {:>8.3}, {:>8.3})  step={:.4}",
                i, s.position.x, s.position.y, s.position.z, s.step_length
            );
        }
    }
}

fn parse_args(args: &[String]) -> Options {
    let mut opts = Options {
        config: None,
        grammar: None,
        seed: None,
        generations: None,
        print_symbols: false,
        print_states: false,
        json: false,
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                i += 1;
                opts.config = Some(args[i].clone());
            }
            "--grammar" if i + 1 < args.len() => {
                i += 1;
                opts.grammar = Some(args[i].clone());
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                opts.seed = Some(parse_number(&args[i], "--seed"));
            }
            "--generations" if i + 1 < args.len() => {
                i += 1;
                opts.generations = Some(parse_number(&args[i], "--generations"));
            }
            "--symbols" => opts.print_symbols = true,
            "--states" => opts.print_states = true,
            "--json" => opts.json = true,
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }
    opts
}

fn parse_number<T: std::str::FromStr>(value: &str, flag: &str) -> T {
    match value.parse() {
        Ok(n) => n,
        Err(_) => {
            eprintln!("ERROR: {} expects a non-negative integer, got '{}'", flag, value);
            process::exit(1);
        }
    }
}

fn make_builder(opts: &Options) -> Result<LSystemBuilder<SpatialState>, String> {
    let instructions = plant_instructions().map_err(|e| e.to_string())?;

    let mut builder = if let Some(ref path) = opts.config {
        LSystemConfig::load_from_ron(Path::new(path))
            .map_err(|e| format!("Failed to load config '{}': {}", path, e))?
            .builder()
    } else if let Some(ref path) = opts.grammar {
        LSystem::builder().grammar_file(path)
    } else {
        LSystem::builder().grammar(plant_grammar(10).map_err(|e| e.to_string())?)
    };

    builder = builder.instructions(instructions);
    if let Some(seed) = opts.seed {
        builder = builder.seed(seed);
    }
    if let Some(n) = opts.generations {
        builder = builder.generations(n);
    }
    Ok(builder)
}

fn print_summary(system: &LSystem, generation: &Generation) {
    let grammar = system.grammar();
    let max_depth = max_branch_depth(&generation.symbols);

    println!("=== Growth Summary ===\n");
    println!("  Axiom:        {}", render(grammar.axiom()));
    println!("  Rules:        {}", grammar.rules().len());
    println!("  Generations:  {}", grammar.generations());
    println!("  Seed:         {}", system.seed());
    println!("  Symbols:      {}", generation.symbols.len());
    println!("  States:       {}", generation.states.len());
    println!("  Max depth:    {}", max_depth);

    if let Some((lo, hi)) = bounding_box(&generation.states) {
        println!(
            "  Bounds:       ({:.3}, {:.3}, {:.3}) .. ({:.3}, {:.3}, {:.3})",
            lo.x, lo.y, lo.z, hi.x, hi.y, hi.z
        );
    }
}

fn max_branch_depth(symbols: &[lsystem_engine::schema::symbol::Symbol]) -> usize {
    use lsystem_engine::schema::symbol::{BRANCH_CLOSE, BRANCH_OPEN};

    let mut depth = 0usize;
    let mut max = 0usize;
    for &s in symbols {
        if s == BRANCH_OPEN {
            depth += 1;
            max = max.max(depth);
        } else if s == BRANCH_CLOSE {
            depth = depth.saturating_sub(1);
        }
    }
    max
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // Only initialize if RUST_LOG is set
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_level(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn print_usage() {
    println!("Usage: grow [--config <file.ron>] [--grammar <file.ron>] [--seed <n>]");
    println!("            [--generations <n>] [--symbols] [--states] [--json]");
    println!();
    println!("  --config <file>       full run config (grammar, seeds, step length)");
    println!("  --grammar <file>      bare grammar; plant defaults for the rest");
    println!("  --seed <n>            evaluation random seed");
    println!("  --generations <n>     override the grammar's generation count");
    println!("  --symbols             print the expanded symbol string");
    println!("  --states              print every visited state");
    println!("  --json                dump visited states as JSON and exit");
}
