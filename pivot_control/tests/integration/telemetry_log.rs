//! Durable telemetry log and concurrent observation.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use pivot_common::rotation::RotationConfig;
use pivot_common::telemetry::PIVOT_CHANNELS;
use pivot_control::hal::simulation::{PlantParams, SimulatedPivot};
use pivot_control::sensor::AngleSensor;
use pivot_control::subsystem::PositionSubsystem;
use pivot_control::telemetry::{JsonLinesSink, TelemetryRegistry};
use tempfile::TempDir;

const DT: Duration = Duration::from_millis(20);

/// Parse a JSON-lines telemetry file into `key → [(seq, value)]`.
fn read_log(path: &std::path::Path) -> BTreeMap<String, Vec<(u64, f64)>> {
    let text = std::fs::read_to_string(path).unwrap();
    let mut by_key: BTreeMap<String, Vec<(u64, f64)>> = BTreeMap::new();
    for line in text.lines() {
        let v: serde_json::Value = serde_json::from_str(line).unwrap();
        let key = v["key"].as_str().unwrap().to_string();
        let seq = v["seq"].as_u64().unwrap();
        let value = v["value"].as_f64().unwrap();
        by_key.entry(key).or_default().push((seq, value));
    }
    by_key
}

#[test]
fn durable_log_mirrors_in_memory_logs() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("logs/shooter.jsonl");
    let sink = Arc::new(JsonLinesSink::create(&path).unwrap());
    let registry = TelemetryRegistry::new("/shooter", sink);

    let pivot = SimulatedPivot::new(PlantParams::default());
    let mut sub = PositionSubsystem::new(
        &RotationConfig::default(),
        AngleSensor::new(Box::new(pivot.encoder())),
        Box::new(pivot.motor()),
        &registry,
    );
    sub.command(45.0).unwrap();
    for _ in 0..50 {
        sub.step();
        pivot.advance(DT);
    }
    sub.shutdown();
    registry.flush().unwrap();

    let log = read_log(&path);
    for name in PIVOT_CHANNELS {
        let channel = registry.get(name).unwrap();
        let key = channel.key().to_string();
        let durable = log.get(&key).cloned().unwrap_or_default();
        let memory: Vec<(u64, f64)> = channel.entries().iter().map(|e| (e.seq, e.value)).collect();
        assert_eq!(durable, memory, "channel {key}");
        assert!(durable.windows(2).all(|w| w[0].0 < w[1].0));
    }

    assert_eq!(log["/shooter/encoder_angle"].len(), 50);
    assert_eq!(log["/shooter/rotate_target"].last().unwrap().1, 45.0);
    // Seed + 50 steps + shutdown.
    assert_eq!(log["/shooter/rotate_angle"].len(), 52);
    assert_eq!(log["/shooter/rotate_angle"].last().unwrap().1, 0.0);
}

#[test]
fn set_is_on_disk_without_flush() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shooter.jsonl");
    let registry =
        TelemetryRegistry::new("/shooter", Arc::new(JsonLinesSink::create(&path).unwrap()));
    let target = registry.publish("rotate_target");

    target.set(60.0).unwrap();
    assert_eq!(read_log(&path)["/shooter/rotate_target"], vec![(0, 60.0)]);
    target.set(45.0).unwrap();
    assert_eq!(
        read_log(&path)["/shooter/rotate_target"],
        vec![(0, 60.0), (1, 45.0)]
    );
}

#[test]
fn bounded_memory_log_is_tail_of_durable_log() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shooter.jsonl");
    let registry =
        TelemetryRegistry::new("/shooter", Arc::new(JsonLinesSink::create(&path).unwrap()))
            .with_history_capacity(10);

    let pivot = SimulatedPivot::new(PlantParams::default());
    let mut sub = PositionSubsystem::new(
        &RotationConfig::default(),
        AngleSensor::new(Box::new(pivot.encoder())),
        Box::new(pivot.motor()),
        &registry,
    );
    sub.command(30.0).unwrap();
    for _ in 0..200 {
        sub.step();
        pivot.advance(DT);
    }

    let log = read_log(&path);
    let angle = registry.get("encoder_angle").unwrap();
    let durable = &log["/shooter/encoder_angle"];
    let memory: Vec<(u64, f64)> = angle.entries().iter().map(|e| (e.seq, e.value)).collect();
    assert_eq!(durable.len(), 200);
    assert_eq!(angle.len(), 10);
    assert_eq!(angle.total_written(), 200);
    assert_eq!(memory.as_slice(), &durable[190..]);
}

#[test]
fn reopened_log_appends() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shooter.jsonl");

    for _ in 0..2 {
        let registry =
            TelemetryRegistry::new("/shooter", Arc::new(JsonLinesSink::create(&path).unwrap()));
        registry.publish("rotate_target").set(10.0).unwrap();
        registry.flush().unwrap();
    }

    let log = read_log(&path);
    assert_eq!(log["/shooter/rotate_target"], vec![(0, 10.0), (0, 10.0)]);
}

#[test]
fn concurrent_reader_sees_monotonic_logs() {
    let registry = TelemetryRegistry::in_memory("/shooter");
    let pivot = SimulatedPivot::new(PlantParams::default());
    let mut sub = PositionSubsystem::new(
        &RotationConfig::default(),
        AngleSensor::new(Box::new(pivot.encoder())),
        Box::new(pivot.motor()),
        &registry,
    );
    let angle = registry.get("encoder_angle").unwrap();
    let done = Arc::new(AtomicBool::new(false));

    let reader = {
        let angle = Arc::clone(&angle);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut last_len = 0;
            let mut observations = 0u64;
            loop {
                let finished = done.load(Ordering::Acquire);
                let entries = angle.entries();
                assert!(entries.len() >= last_len, "log shrank");
                assert!(entries.windows(2).all(|w| w[1].seq == w[0].seq + 1));
                if let Some(last) = entries.last() {
                    assert!(angle.len() >= entries.len());
                    assert!(last.value.is_finite());
                }
                last_len = entries.len();
                observations += 1;
                if finished {
                    break;
                }
            }
            observations
        })
    };

    sub.command(80.0).unwrap();
    for _ in 0..2_000 {
        sub.step();
        pivot.advance(DT);
    }
    done.store(true, Ordering::Release);

    let observations = reader.join().unwrap();
    assert!(observations >= 1);
    assert_eq!(angle.len(), 2_000);
    assert_eq!(angle.get(), angle.last_entry().unwrap().value);
}
