/// Grammar Linter — validates L-system grammars before they are grown.
///
/// Usage: grammar_linter <grammar.ron | grammar_dir>
///
/// Errors: unbalanced branch markers in an axiom or replacement.
/// Warnings: inert symbols (no rule, no plant instruction), rules that are
/// never reached from the axiom, weights that make a rule all but unreachable.

use lsystem_engine::core::grammar::Grammar;
use lsystem_engine::plant::plant_instructions;
use lsystem_engine::schema::symbol::{branch_balance, render, Symbol};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::process;

/// Rules under this share of their predecessor's total weight are flagged.
const MIN_WEIGHT_SHARE: f64 = 0.001;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: grammar_linter <grammar.ron | grammar_dir>");
        process::exit(0);
    }

    let path = Path::new(&args[1]);
    let mut files = Vec::new();
    if path.is_file() {
        files.push(path.to_path_buf());
    } else if path.is_dir() {
        collect_ron_files(path, &mut files);
    } else {
        eprintln!("ERROR: Path '{}' does not exist", args[1]);
        process::exit(1);
    }

    let known: BTreeSet<Symbol> = match plant_instructions() {
        Ok(table) => table.symbols().into_iter().collect(),
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
    };

    let mut total_errors = 0usize;
    let mut total_warnings = 0usize;

    for file in &files {
        println!("\n=== {} ===\n", file.display());
        let grammar = match Grammar::load_from_ron(file) {
            Ok(g) => g,
            Err(e) => {
                println!("ERROR: Failed to load grammar: {}", e);
                total_errors += 1;
                continue;
            }
        };

        let (errors, warnings) = lint_grammar(&grammar, &known);

        if errors.is_empty() && warnings.is_empty() {
            println!("All checks passed!");
        }
        for warning in &warnings {
            println!("WARNING: {}", warning);
        }
        for error in &errors {
            println!("ERROR: {}", error);
        }

        total_errors += errors.len();
        total_warnings += warnings.len();
    }

    println!(
        "\nSummary: {} file(s), {} errors, {} warnings",
        files.len(),
        total_errors,
        total_warnings
    );

    if total_errors == 0 {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn collect_ron_files(dir: &Path, files: &mut Vec<PathBuf>) {
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                collect_ron_files(&path, files);
            } else if path.extension().and_then(|s| s.to_str()) == Some("ron") {
                files.push(path);
            }
        }
    }
    files.sort();
}

fn lint_grammar(grammar: &Grammar, known: &BTreeSet<Symbol>) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    // Branch balance of the axiom and of every replacement
    match branch_balance(grammar.axiom()) {
        Some(0) => {}
        Some(open) => errors.push(format!("Axiom leaves {} branch(es) open", open)),
        None => errors.push("Axiom closes a branch it never opened".to_string()),
    }
    for rule in grammar.rules() {
        match branch_balance(&rule.replacement) {
            Some(0) => {}
            Some(open) => errors.push(format!(
                "Rule '{} → {}' leaves {} branch(es) open",
                rule.predecessor,
                render(&rule.replacement),
                open
            )),
            None => errors.push(format!(
                "Rule '{} → {}' closes a branch it never opened",
                rule.predecessor,
                render(&rule.replacement)
            )),
        }
    }

    // Weight share per predecessor
    let mut totals: HashMap<Symbol, f64> = HashMap::new();
    for rule in grammar.rules() {
        *totals.entry(rule.predecessor).or_default() += rule.weight;
    }
    for rule in grammar.rules() {
        let share = rule.weight / totals[&rule.predecessor];
        if share < MIN_WEIGHT_SHARE {
            warnings.push(format!(
                "Rule '{} → {}' has weight share {:.5}; it will almost never fire",
                rule.predecessor,
                render(&rule.replacement),
                share
            ));
        }
    }

    // Reachability: symbols that can appear from the axiom
    let mut reachable: BTreeSet<Symbol> = grammar.axiom().iter().copied().collect();
    loop {
        let before = reachable.len();
        for rule in grammar.rules() {
            if reachable.contains(&rule.predecessor) {
                reachable.extend(rule.replacement.iter().copied());
            }
        }
        if reachable.len() == before {
            break;
        }
    }

    let predecessors: BTreeSet<Symbol> = grammar.rules().iter().map(|r| r.predecessor).collect();
    for p in &predecessors {
        if !reachable.contains(p) {
            warnings.push(format!("Rule for '{}' is never reached from the axiom", p));
        }
    }

    // Inert symbols: pass through evaluation without effect
    for s in &reachable {
        if s.is_branch_marker() || known.contains(s) || predecessors.contains(s) {
            continue;
        }
        warnings.push(format!(
            "Symbol '{}' has no rule and no instruction; it will be inert",
            s
        ));
    }

    (errors, warnings)
}
