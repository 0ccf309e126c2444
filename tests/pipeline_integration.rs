// Integration tests for the full telemetry-to-curve workflow
//
// This suite validates the complete pipeline:
// 1. Replay a recorded session through a telemetry source
// 2. Fetch through the cache (miss, then hit)
// 3. Export the raw samples as CSV and read them back
// 4. Normalize and build both curve types
// 5. Run the same flow through the background fetch with cancellation

use std::sync::Arc;
use std::time::Duration;

use parabolica::cache::{CacheConfig, TelemetryCache};
use parabolica::errors::ParabolicaError;
use parabolica::export;
use parabolica::geometry::{CurveConfig, CurveType};
use parabolica::pipeline::TrackPipeline;
use parabolica::telemetry::{
    FetchOutcome, JsonlTelemetrySource, Sample, SessionKey, SessionType, fetch_in_background,
};
use serde_jsonlines::write_json_lines;
use tempfile::TempDir;

/// A synthetic closed lap: a rough oval sampled at 10Hz, in decimeter
/// coordinates like a real positional feed. Ends within a meter of the start
/// so the closure heuristic fires.
fn oval_lap() -> Vec<Sample> {
    let n = 200;
    (0..n)
        .map(|i| {
            let theta = i as f64 / n as f64 * std::f64::consts::TAU;
            Sample::new(
                i as f64 * 0.1,
                4000.0 * theta.cos(),
                2500.0 * theta.sin(),
            )
            .with_z(30.0 * (2.0 * theta).sin())
            .with_speed(180.0 + 120.0 * theta.sin().abs())
        })
        .collect()
}

fn write_session(dir: &TempDir, key: &SessionKey, samples: &[Sample]) {
    let path = dir.path().join(format!("{}.jsonl", key.slug()));
    write_json_lines(path, samples).unwrap();
}

fn race_key() -> SessionKey {
    SessionKey::new(2024, "Monza", SessionType::Race, "LEC").unwrap()
}

fn test_pipeline(workspace: &TempDir) -> TrackPipeline<JsonlTelemetrySource> {
    let cache = TelemetryCache::new(CacheConfig {
        cache_dir: workspace.path().join("cache"),
        fallback_dir: workspace.path().join("fallback"),
    })
    .unwrap();
    let source = JsonlTelemetrySource::new(workspace.path().join("sessions"));
    TrackPipeline::new(source, cache)
}

#[test]
fn test_full_workflow_replay_to_curve() {
    let workspace = TempDir::new().unwrap();
    let sessions = TempDir::new_in(workspace.path()).unwrap();
    let key = race_key();
    write_session(&sessions, &key, &oval_lap());

    let cache = TelemetryCache::new(CacheConfig {
        cache_dir: workspace.path().join("cache"),
        fallback_dir: workspace.path().join("fallback"),
    })
    .unwrap();
    let source = JsonlTelemetrySource::new(sessions.path().to_path_buf());
    let pipeline = TrackPipeline::new(source, cache);

    // first fetch replays the session and populates the cache
    let seq = pipeline.fetch(&key).unwrap();
    assert_eq!(seq.len(), 200);
    assert!(pipeline.cache().get(&key).is_some());

    // CSV side channel round-trips
    let csv_dir = workspace.path().join("exports");
    let csv_path = pipeline.export_csv(&key, &seq, &csv_dir).unwrap();
    assert_eq!(
        csv_path.file_name().unwrap().to_str().unwrap(),
        "telemetry_2024_monza_r_lec.csv"
    );
    let reread = export::read_csv(&csv_path).unwrap();
    assert_eq!(reread.len(), seq.len());

    // both curve types build from the same sequence
    for curve_type in [CurveType::Nurbs, CurveType::Bezier] {
        let config = CurveConfig {
            curve_type,
            include_speed: true,
            ..Default::default()
        };
        let curve = pipeline.build_curve(&key, &seq, &config).unwrap();
        assert_eq!(curve.name, "Monza_R_LEC");
        assert!(curve.cyclic, "oval lap should close");
        // closure appends one seam point
        assert_eq!(curve.control_points.len(), seq.len() + 1);
        let speeds = curve.speeds.as_ref().unwrap();
        assert_eq!(speeds.len(), curve.control_points.len());
        assert_eq!(speeds.first(), speeds.last());

        let evaluated = curve.evaluate();
        assert!(evaluated.len() > curve.control_points.len());
        // the normalized track is centered, so the polyline straddles origin
        assert!(evaluated.iter().any(|p| p.x < 0.0));
        assert!(evaluated.iter().any(|p| p.x > 0.0));
    }
}

#[test]
fn test_second_fetch_is_served_from_cache() {
    let workspace = TempDir::new().unwrap();
    let sessions = workspace.path().join("sessions");
    std::fs::create_dir_all(&sessions).unwrap();
    let key = race_key();
    write_json_lines(sessions.join(format!("{}.jsonl", key.slug())), &oval_lap()).unwrap();

    let pipeline = test_pipeline(&workspace);
    let first = pipeline.fetch(&key).unwrap();

    // removing the session files proves the second fetch never hits the source
    std::fs::remove_dir_all(&sessions).unwrap();
    let second = pipeline.fetch(&key).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_missing_driver_reported_distinctly_from_missing_session() {
    let workspace = TempDir::new().unwrap();
    let sessions = workspace.path().join("sessions");
    std::fs::create_dir_all(&sessions).unwrap();
    let recorded = SessionKey::new(2024, "Monza", SessionType::Race, "SAI").unwrap();
    write_json_lines(
        sessions.join(format!("{}.jsonl", recorded.slug())),
        &oval_lap(),
    )
    .unwrap();

    let pipeline = test_pipeline(&workspace);

    let wrong_driver = pipeline.fetch(&race_key());
    assert!(matches!(
        wrong_driver,
        Err(ParabolicaError::DriverNotFound { .. })
    ));

    let wrong_event = SessionKey::new(2024, "Suzuka", SessionType::Race, "LEC").unwrap();
    assert!(matches!(
        pipeline.fetch(&wrong_event),
        Err(ParabolicaError::SessionNotFound { .. })
    ));
}

#[test]
fn test_background_fetch_end_to_end() {
    let workspace = TempDir::new().unwrap();
    let sessions = workspace.path().join("sessions");
    std::fs::create_dir_all(&sessions).unwrap();
    let key = race_key();
    write_json_lines(sessions.join(format!("{}.jsonl", key.slug())), &oval_lap()).unwrap();

    let cache = Arc::new(
        TelemetryCache::new(CacheConfig {
            cache_dir: workspace.path().join("cache"),
            fallback_dir: workspace.path().join("fallback"),
        })
        .unwrap(),
    );
    let source = JsonlTelemetrySource::new(sessions);

    let handle = fetch_in_background(source, Arc::clone(&cache), key.clone());
    match handle.wait() {
        FetchOutcome::Completed(seq) => assert_eq!(seq.len(), 200),
        other => panic!("expected completion, got {:?}", other),
    }
    assert!(cache.get(&key).is_some());
}

#[test]
fn test_cancelled_fetch_leaves_no_cache_entry() {
    let workspace = TempDir::new().unwrap();
    let key = race_key();

    let cache = Arc::new(
        TelemetryCache::new(CacheConfig {
            cache_dir: workspace.path().join("cache"),
            fallback_dir: workspace.path().join("fallback"),
        })
        .unwrap(),
    );
    // no session files exist, but cancellation wins before the source reports
    let source = JsonlTelemetrySource::new(workspace.path().join("sessions"));

    let handle = fetch_in_background(source, Arc::clone(&cache), key.clone());
    handle.cancel();

    // either the worker saw the flag (Cancelled) or it lost the race and the
    // source error came back first; a cache entry must not appear either way
    match handle.wait_timeout(Duration::from_secs(5)) {
        Some(FetchOutcome::Cancelled) | Some(FetchOutcome::Failed(_)) => {}
        other => panic!("expected cancellation or failure, got {:?}", other),
    }
    assert!(cache.get(&key).is_none());
}
