//! Prefix reduction example: inclusive and exclusive scans over a worker group.
//!
//! Computes prefix sums and running maxima of per-rank values with the tree
//! exchange, then classifies a small terrain profile with the same group size.
//!
//! Run with: cargo run --example prefix_max -- 5

use ferrovis::{render, sequential_visibility, visibility, Options, ReduceOp, Result, World};

fn main() -> Result<()> {
    let size: usize = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(4);
    let world = World::new(size)?;

    // ============================================================
    // Exclusive scan (Sum)
    // ============================================================
    //
    // Rank i contributes (i + 1); it receives the sum over ranks 0..i.
    let sums = world.run(|comm| comm.exscan_scalar(f64::from(comm.rank()) + 1.0, ReduceOp::Sum))?;
    for (rank, &sum) in sums.iter().enumerate() {
        let expected = (rank * (rank + 1) / 2) as f64;
        assert!(
            (sum - expected).abs() < f64::EPSILON,
            "Rank {rank}: exclusive sum mismatch: got {sum}, expected {expected}",
        );
    }
    println!("  Exclusive scan (Sum) passed: {sums:?}");

    // ============================================================
    // Inclusive scan (Max)
    // ============================================================
    //
    // Rank i contributes (size - i), so the running maximum is always `size`.
    let maxima = world.run(|comm| comm.scan_scalar(comm.size() - comm.rank(), ReduceOp::Max))?;
    assert!(maxima.iter().all(|&m| m == size as i32), "scan Max mismatch: {maxima:?}");
    println!("  Inclusive scan (Max) passed: {maxima:?}");

    // ============================================================
    // Visibility
    // ============================================================
    let altitudes = [120, 80, 135, 160, 150, 210, 190, 300, 260, 420];
    let report = visibility(&altitudes, &Options::with_workers(size))?;
    assert_eq!(report.flags, sequential_visibility(&altitudes));
    println!("  Visibility with {size} workers: {}", render(&report.flags));

    println!("\n========================================");
    println!("All prefix examples passed!");
    println!("========================================");

    Ok(())
}
