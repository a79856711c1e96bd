//! Performance benchmarks for critical game systems

use shared::protocol::{default_name, CommandBatch, Snapshot};
use shared::{Engine, GameMode, Rect};
use std::time::Instant;

fn names() -> [String; 2] {
    [default_name(0), default_name(1)]
}

/// Benchmarks rectangle overlap checks
#[test]
fn benchmark_collision_detection() {
    let a = Rect::new(100.0, 100.0, 64.0, 64.0);
    let b = Rect::new(130.0, 150.0, 66.0, 54.0);

    let iterations = 100_000;
    let start = Instant::now();

    let mut hits = 0;
    for _ in 0..iterations {
        if a.overlaps(&b) {
            hits += 1;
        }
    }

    let duration = start.elapsed();
    println!(
        "Collision detection: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert_eq!(hits, iterations);
    // Should complete in under 100ms for 100k iterations
    assert!(duration.as_millis() < 100);
}

/// Benchmarks full engine ticks in a two-player game
#[test]
fn benchmark_engine_update() {
    let mut engine = Engine::with_seed(GameMode::Pair, 9);

    let iterations = 10_000;
    let start = Instant::now();

    for i in 0..iterations {
        if i % 40 == 0 {
            engine.shoot(0);
            engine.shoot(1);
        }
        engine.update(16);
        engine.take_sounds(0);
        engine.take_sounds(1);
    }

    let duration = start.elapsed();
    println!(
        "Engine update: {} ticks in {:?} ({:.2} μs/tick)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert_eq!(engine.clock_ms(), iterations as u64 * 16);
    // Should complete in under 2 seconds
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks snapshot capture and bincode round trips
#[test]
fn benchmark_snapshot_serialization() {
    let mut engine = Engine::with_seed(GameMode::Pair, 9);
    engine.update(16);

    let iterations = 10_000;
    let start = Instant::now();

    let mut largest = 0;
    for _ in 0..iterations {
        let snapshot = Snapshot::capture(&mut engine, 0, true, names());
        let bytes = snapshot.encode().unwrap();
        largest = largest.max(bytes.len());
        let _decoded = Snapshot::decode(&bytes).unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Snapshot serialization: {} iterations in {:?} ({:.2} μs/iter, {} bytes)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64,
        largest
    );

    assert!(largest <= shared::MAX_SNAPSHOT_BYTES);
    // Should complete in under 2 seconds
    assert!(duration.as_millis() < 2000);
}

/// Stress tests command batch parsing under high load
#[test]
fn stress_test_batch_parsing() {
    let texts: Vec<String> = (0..1000)
        .map(|i| match i % 3 {
            0 => format!("get|direction:left|shoot|update:{}|", i),
            1 => format!("get|direction:right|update:{}|", i),
            _ => "get|direction:|".to_string(),
        })
        .collect();

    let start = Instant::now();

    let batches: Vec<CommandBatch> = texts
        .iter()
        .map(|text| CommandBatch::parse(text).unwrap())
        .collect();

    let duration = start.elapsed();
    println!("Batch parsing: {} batches in {:?}", batches.len(), duration);

    for (text, batch) in texts.iter().zip(&batches) {
        assert_eq!(&batch.to_string(), text);
    }
    // Should complete in under 100ms
    assert!(duration.as_millis() < 100);
}
