//! Export operations to time logs and import them back as sessions.

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use std::collections::HashMap;
use timelog::import::{DeviceCatalog, ImportReport, OperationType, ProductAllocation};
use timelog::{
    Ddi, ExportOptions, ImportOptions, LoggedTask, MeterValue, OperationRecord, Point,
    SensorReading, SpatialRow, SpatialSample, TimeLog, TimeTemplate,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn catalog() -> DeviceCatalog {
    let mut catalog = DeviceCatalog::new();
    catalog
        .add_device("DVC-1", Some(1))
        .add_device("DVC-2", Some(5))
        .add_element("DET-1", "DVC-1", None)
        .add_element("DET-2", "DVC-2", None)
        .add_element("DET-3", "DVC-2", Some("DET-2"))
        .add_element("DET-4", "DVC-2", Some("DET-2"));
    catalog
}

fn operation(rows: i64) -> OperationRecord {
    let readings = vec![
        SensorReading::numeric(10, Ddi(397), "DET-1"),
        SensorReading::numeric(20, Ddi(7), "DET-3"),
        SensorReading::enumerated(30, Ddi::ACTUAL_WORK_STATE, "DET-4"),
        SensorReading::numeric(40, Ddi::ACTUAL_WORKING_WIDTH, "DET-2"),
    ];
    let start = NaiveDate::from_ymd_opt(2024, 5, 2)
        .and_then(|d| d.and_hms_milli_opt(14, 30, 0, 250))
        .unwrap();

    let samples = (0..rows)
        .map(|i| {
            let location =
                (i % 5 != 4).then(|| Point { x: -93.25, y: 45.0 + i as f64 * 1e-5, z: Some(271.5) });
            let mut sample = SpatialSample::new(start + Duration::seconds(i), location)
                .with_value(10, MeterValue::Numeric(2_500.0 + i as f64))
                .with_value(40, MeterValue::Numeric(18_000.0));
            if i % 2 == 0 {
                sample = sample.with_value(20, MeterValue::Numeric(-250.0));
            }
            sample.with_value(30, MeterValue::Enumerated((i % 2) as u32))
        })
        .collect();

    OperationRecord { iso_id: None, readings, samples }
}

fn import(
    templates: &HashMap<String, TimeTemplate>,
    task: &LoggedTask,
    dir: &std::path::Path,
    deferred: bool,
) -> ImportReport {
    let catalog = catalog();
    let options = ImportOptions { deferred_execution: deferred };
    TimeLog::importer(templates, &catalog, options).import_task(task, dir)
}

#[test]
fn exported_operation_imports_as_device_sessions() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;

    let exported = TimeLog::exporter(ExportOptions::default())
        .export_time_logs(&[operation(0), operation(20)], dir.path())?;
    assert_eq!(exported.len(), 1);
    let log = &exported[0];
    assert_eq!(log.name, "TLG00001");
    assert!(dir.path().join("TLG00001.bin").exists());

    let templates: HashMap<String, TimeTemplate> =
        exported.iter().map(|log| (log.name.clone(), log.template.clone())).collect();
    let mut task = LoggedTask::new(["TLG00001"]);
    task.product_allocations.push(ProductAllocation::new("PDT-7", "DET-2"));

    let report = import(&templates, &task, dir.path(), true);
    assert!(report.issues.is_empty(), "{:?}", report.issues);
    assert_eq!(report.sessions.len(), 2);

    let tractor = &report.sessions[0];
    let spreader = &report.sessions[1];
    assert_eq!(tractor.device_id, "DVC-1");
    assert_eq!(spreader.device_id, "DVC-2");
    assert_eq!(tractor.coincident, vec![spreader.id]);
    assert_eq!(spreader.coincident, vec![tractor.id]);
    assert_eq!(spreader.operation_type, OperationType::Fertilizing);
    assert_eq!(spreader.max_depth, 1);
    assert_eq!(spreader.product_ids, vec!["PDT-7"]);
    assert_eq!(spreader.geometry["DET-2"].working_width, Some(18_000));
    assert_eq!(report.context.clock_offset(), None);

    let tractor_rows: Vec<SpatialRow> = tractor.rows()?.collect();
    assert_eq!(tractor_rows.len(), 20);
    let first = &tractor_rows[0];
    assert_eq!(first.timestamp.to_string(), "2024-05-02 14:30:00.250");
    assert!((first.latitude().context("first row has a position")? - 45.0).abs() < 1e-7);
    assert!((first.elevation_m().context("first row has elevation")? - 271.5).abs() < 1e-3);
    assert_eq!(first.values.len(), 1);
    assert_eq!(first.values[0].ddi, Ddi(397));
    assert_eq!(first.values[0].value, 2_500.0);
    assert_eq!(tractor_rows[4].latitude(), None);

    let spreader_rows: Vec<SpatialRow> = spreader.rows()?.collect();
    let orders = |row: &SpatialRow| row.values.iter().map(|v| v.order).collect::<Vec<_>>();
    assert_eq!(orders(&spreader_rows[0]), vec![1, 2, 3]);
    assert_eq!(orders(&spreader_rows[1]), vec![2, 3]);
    assert_eq!(spreader_rows[0].values[0].raw, -250);
    assert_eq!(spreader_rows[1].value(2).map(|v| v.raw), Some(1));
    Ok(())
}

#[test]
fn deferred_and_materialized_imports_agree() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let exported =
        TimeLog::exporter(ExportOptions::default()).export_time_logs(&[operation(12)], dir.path())?;
    let templates: HashMap<String, TimeTemplate> =
        exported.iter().map(|log| (log.name.clone(), log.template.clone())).collect();
    let task = LoggedTask::new(["TLG00001"]);

    let deferred = import(&templates, &task, dir.path(), true);
    let materialized = import(&templates, &task, dir.path(), false);

    for (lazy, eager) in deferred.sessions.iter().zip(&materialized.sessions) {
        assert!(lazy.is_deferred());
        assert_eq!(eager.row_count(), Some(12));
        let lazy_rows: Vec<SpatialRow> = lazy.rows()?.collect();
        let eager_rows: Vec<SpatialRow> = eager.rows()?.collect();
        assert_eq!(lazy_rows, eager_rows);
    }
    Ok(())
}

#[test]
fn truncated_binary_keeps_complete_rows() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let exported =
        TimeLog::exporter(ExportOptions::default()).export_time_logs(&[operation(6)], dir.path())?;
    let log = &exported[0];

    let mut bytes = std::fs::read(&log.bin_path)?;
    bytes.truncate(bytes.len() - 3);
    std::fs::write(&log.bin_path, &bytes)?;

    let rows = TimeLog::read_all(&log.bin_path, log.template.clone())?;
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[4].timestamp - rows[0].timestamp, Duration::seconds(4));
    Ok(())
}

#[test]
fn unreadable_time_log_is_reported_and_skipped() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut exporter = TimeLog::exporter(ExportOptions::default());
    let exported = exporter.export_time_logs(&[operation(3), operation(3)], dir.path())?;
    assert_eq!(exported.len(), 2);

    // Only the first time log has a template.
    let templates: HashMap<String, TimeTemplate> =
        exported.iter().take(1).map(|log| (log.name.clone(), log.template.clone())).collect();
    let task = LoggedTask::new(["TLG00002", "TLG00001"]);

    let report = import(&templates, &task, dir.path(), false);
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].time_log, "TLG00002");
    assert_eq!(report.sessions.len(), 2);
    assert!(report.sessions.iter().all(|s| s.time_log == "TLG00001"));
    Ok(())
}
