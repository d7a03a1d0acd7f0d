use airtime::kernel::aggregator::aggregate;
use airtime::kernel::event::{Observation, Origin};
use airtime::kernel::state::WindowState;
use airtime::kernel::time::Timestamp;
use airtime::kernel::tracker::{ingest, Thresholds};
use airtime::outputs::report::render;
use airtime::outputs::{CsvSink, Sink, SinkError, SinkOutcome, WindowReport};
use chrono::{Local, TimeZone};
use std::fs;
use std::path::PathBuf;

fn window_start() -> Timestamp {
    Local.with_ymd_and_hms(1989, 11, 9, 10, 0, 0).unwrap()
}

fn at(secs: i64) -> Timestamp {
    window_start() + chrono::Duration::seconds(secs)
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("airtime-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn sample_report() -> WindowReport {
    report_flushed_at(4260)
}

fn report_flushed_at(flush_secs: i64) -> WindowReport {
    let thresholds = Thresholds::default();
    let mut window = WindowState::new(window_start());
    ingest(
        &[
            Observation::new("1.2.3.4", Origin::Country("HU".to_string()), 400),
            Observation::new("5.6.7.8", Origin::Unknown, 20),
        ],
        at(600),
        &mut window,
        &thresholds,
    )
    .unwrap();
    ingest(
        &[Observation::new("1.2.3.4", Origin::Country("HU".to_string()), 12)],
        at(630),
        &mut window,
        &thresholds,
    )
    .unwrap();
    let metrics = aggregate(&window, &thresholds);
    WindowReport::new(window, at(flush_secs), metrics)
}

#[test]
fn test_render_rows_then_trailer() {
    let rendered = render(&sample_report());
    let lines: Vec<&str> = rendered.lines().collect();

    assert_eq!(lines[0], "ip;location;connected_time;valid");
    assert_eq!(lines[1], "1.2.3.4;HU;[10:10:00 400s, 10:10:30 12s];0");
    assert_eq!(lines[2], "5.6.7.8;N/A;[10:10:00 20s];0");
    assert_eq!(
        &lines[3..],
        &[
            "Total Listeners;;;2",
            "Total Long Listeners;;;0",
            "Total Short Listeners;;;1",
            "Total N/A entries;;;1",
            "Total Sessions;;;3",
        ]
    );
}

#[test]
fn test_render_quotes_delimiters() {
    let mut window = WindowState::new(window_start());
    ingest(
        &[Observation::new("odd;id", Origin::Country("HU".to_string()), 1)],
        at(60),
        &mut window,
        &Thresholds::default(),
    )
    .unwrap();
    let metrics = aggregate(&window, &Thresholds::default());
    let rendered = render(&WindowReport::new(window, at(120), metrics));
    assert!(rendered.lines().nth(1).unwrap().starts_with("\"odd;id\";HU;"));
}

#[test]
fn test_csv_sink_writes_to_output_dir() {
    let dir = scratch_dir("primary");
    let sink = CsvSink::new(&dir, "lahma");
    let report = sample_report();

    let outcome = sink.write(&report).unwrap();
    let expected = dir.join("lahma_1989-11-09_1111.csv");
    assert!(matches!(outcome, SinkOutcome::Written(_)));
    assert_eq!(outcome.path(), expected.as_path());
    assert_eq!(fs::read_to_string(&expected).unwrap(), render(&report));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_csv_sink_falls_back_when_output_dir_missing() {
    let fallback = scratch_dir("fallback");
    let missing = fallback.join("does-not-exist");
    let sink = CsvSink::new(&missing, "lahma").with_fallback_dir(&fallback);

    let outcome = sink.write(&sample_report()).unwrap();
    match outcome {
        SinkOutcome::Fallback { path, .. } => {
            assert_eq!(path, fallback.join("lahma_1989-11-09_1111.csv"));
            assert!(path.exists());
        }
        other => panic!("expected fallback, got {:?}", other),
    }

    let _ = fs::remove_dir_all(&fallback);
}

#[test]
fn test_csv_sink_reports_loss_when_both_fail() {
    let root = scratch_dir("lost");
    let sink = CsvSink::new(root.join("nope"), "lahma").with_fallback_dir(root.join("also-nope"));

    let err = sink.write(&sample_report()).unwrap_err();
    let SinkError::WriteFailed { primary_path, fallback_path, .. } = err;
    assert_eq!(primary_path, root.join("nope").join("lahma_1989-11-09_1111.csv"));
    assert_eq!(fallback_path, root.join("also-nope").join("lahma_1989-11-09_1111.csv"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn test_csv_sink_keeps_earlier_export_from_same_minute() {
    let dir = scratch_dir("same-minute");
    let sink = CsvSink::new(&dir, "lahma");

    // 11:11:00 and 11:11:40 share the minute key
    let first = sample_report();
    let mut second = report_flushed_at(4300);
    second.records.truncate(1);

    let first_path = sink.write(&first).unwrap().path().to_path_buf();
    let second_path = sink.write(&second).unwrap().path().to_path_buf();

    assert_eq!(first_path, dir.join("lahma_1989-11-09_1111.csv"));
    assert_eq!(second_path, dir.join("lahma_1989-11-09_1111_1.csv"));
    assert_eq!(fs::read_to_string(&first_path).unwrap(), render(&first));
    assert_eq!(fs::read_to_string(&second_path).unwrap(), render(&second));
    assert_eq!(fs::read_dir(&dir).unwrap().count(), 2);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_render_quotes_carriage_returns() {
    let mut window = WindowState::new(window_start());
    ingest(
        &[Observation::new("cr\rid", Origin::Country("HU".to_string()), 1)],
        at(60),
        &mut window,
        &Thresholds::default(),
    )
    .unwrap();
    let metrics = aggregate(&window, &Thresholds::default());
    let rendered = render(&WindowReport::new(window, at(120), metrics));
    let row = rendered.split('\n').nth(1).unwrap();
    assert!(row.starts_with("\"cr\rid\";HU;"), "got {:?}", row);
}
