/// Plant example — grows the stock branching plant and prints where it went.
///
/// Run with: cargo run --example plant

use lsystem_engine::plant::plant_system;
use lsystem_engine::schema::space::bounding_box;

fn main() {
    let mut plant = plant_system().expect("Failed to build plant system");

    let symbols = plant.expand();
    let visits = plant
        .evaluate_traced(&symbols)
        .expect("Plant grammar produced unbalanced branches");

    println!("Expanded to {} symbols, {} states\n", symbols.len(), visits.len());

    // A consumer joins consecutive states at the same depth into one
    // segment and starts a new one wherever the depth changes.
    let mut segments = 0usize;
    let mut prev_depth = None;
    for visit in &visits {
        if prev_depth != Some(visit.depth) {
            segments += 1;
        }
        prev_depth = Some(visit.depth);
    }
    println!("Branch segments: {}", segments);

    println!("\nFirst states:");
    for visit in visits.iter().take(12) {
        let p = visit.state.position;
        println!(
            "  {} depth={} pos=({:.3}, {:.3}, {:.3}) step={:.3}",
            visit.symbol, visit.depth, p.x, p.y, p.z, visit.state.step_length
        );
    }

    let states: Vec<_> = visits.into_iter().map(|v| v.state).collect();
    if let Some((lo, hi)) = bounding_box(&states) {
        println!(
            "\nBounds: ({:.3}, {:.3}, {:.3}) .. ({:.3}, {:.3}, {:.3})",
            lo.x, lo.y, lo.z, hi.x, hi.y, hi.z
        );
    }
}
