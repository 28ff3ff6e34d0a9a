use std::collections::BTreeSet;
use std::f64::consts::PI;
use std::path::Path;

use bead_sentry::config::PipelineConfig;
use bead_sentry::data::aggregate::{aggregate, BatchPolicy};
use bead_sentry::data::loader::{list_data_files, FileSource};
use bead_sentry::detect::AnomalyLabel;
use bead_sentry::report::{write_detection, OutputFormat};
use bead_sentry::state::Session;
use bead_sentry::PipelineError;

const BEAD_LEN: usize = 40;

/// Idle gap, bead 1, idle gap, optional bead 2, idle gap.
fn write_recording(path: &Path, index: usize, second_bead: bool, distorted: bool) {
    let mut writer = csv::Writer::from_path(path).unwrap();
    writer.write_record(["time", "power", "intensity"]).unwrap();

    let phase = index as f64 * 0.3;
    let mut rows: Vec<(f64, f64)> = Vec::new();
    let idle = |rows: &mut Vec<(f64, f64)>| rows.extend(std::iter::repeat((0.0, 0.0)).take(10));

    idle(&mut rows);
    for t in 0..BEAD_LEN {
        let t = t as f64;
        rows.push((1.0, 2.0 + 0.4 * (2.0 * PI * t / 10.0 + phase).sin()));
    }
    idle(&mut rows);
    if second_bead {
        for t in 0..BEAD_LEN {
            let t = t as f64;
            let mut intensity =
                2.0 + 0.4 * (2.0 * PI * t / 10.0 + phase).sin() + 0.01 * index as f64;
            if distorted {
                intensity += 3.0 * (2.0 * PI * t / 4.0).sin().max(0.0);
            }
            rows.push((1.0, intensity));
        }
        idle(&mut rows);
    }

    for (i, (power, intensity)) in rows.iter().enumerate() {
        writer
            .write_record([i.to_string(), power.to_string(), intensity.to_string()])
            .unwrap();
    }
    writer.flush().unwrap();
}

/// Ten recordings; `weld_04` has a distorted second bead and `weld_09` has
/// no second bead. `broken.csv` lacks the power column.
fn write_batch(dir: &Path) {
    for i in 0..10 {
        let path = dir.join(format!("weld_{i:02}.csv"));
        write_recording(&path, i, i != 9, i == 4);
    }
    std::fs::write(dir.join("broken.csv"), "time,intensity\n0,1.0\n1,2.0\n").unwrap();
}

fn seeded_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.segmentation.filter_column = "power".into();
    config.segmentation.threshold = 0.5;
    config.detection.forest.seed = Some(2024);
    config.detection.projection_dims = Some(3);
    config
}

#[test]
fn segment_and_detect_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    write_batch(dir.path());

    let files = list_data_files(dir.path()).unwrap();
    assert_eq!(files.len(), 11);

    let mut session = Session::new(files, seeded_config());
    let segmentation = session.segment().unwrap();
    assert_eq!(segmentation.failures.len(), 1);
    assert_eq!(segmentation.failures[0].file_id, "broken.csv");
    assert_eq!(segmentation.beads.len(), 10);
    assert_eq!(segmentation.beads.get("weld_09.csv").unwrap().len(), 1);

    let table = segmentation.length_table();
    assert_eq!(table.bead_numbers, vec![1, 2]);
    let weld_09 = table.rows.iter().find(|(f, _)| f == "weld_09.csv").unwrap();
    assert_eq!(weld_09.1, vec![BEAD_LEN, 0]);

    let report = session.detect("intensity", &BTreeSet::from([2])).unwrap();
    assert_eq!(report.rows.len(), 9);
    assert!(report
        .rows
        .iter()
        .all(|r| r.samples == BEAD_LEN && r.signal.len() == BEAD_LEN));

    let worst = report
        .rows
        .iter()
        .max_by(|a, b| a.score.total_cmp(&b.score))
        .unwrap();
    assert_eq!(worst.file_id, "weld_04.csv");
    assert_eq!(worst.label, AnomalyLabel::Anomalous);

    let mut buf = Vec::new();
    write_detection(&mut buf, report, OutputFormat::Csv).unwrap();
    let text = String::from_utf8(buf).unwrap();
    assert_eq!(text.lines().count(), 10);
    assert!(text.lines().next().unwrap().ends_with("pc1,pc2,pc3"));
}

#[test]
fn detection_is_reproducible_with_seed() {
    let dir = tempfile::tempdir().unwrap();
    write_batch(dir.path());

    let run = || {
        let files = list_data_files(dir.path()).unwrap();
        let mut session = Session::new(files, seeded_config());
        session.segment().unwrap();
        let report = session.detect("intensity", &BTreeSet::from([1, 2])).unwrap();
        report
            .rows
            .iter()
            .map(|r| (r.file_id.clone(), r.bead_number, r.label, r.score))
            .collect::<Vec<_>>()
    };

    let first = run();
    assert_eq!(first.len(), 19);
    assert_eq!(first, run());
}

#[test]
fn fail_fast_stops_on_broken_file() {
    let dir = tempfile::tempdir().unwrap();
    write_batch(dir.path());
    let files: Vec<FileSource> = list_data_files(dir.path()).unwrap();

    let err = aggregate(&files, "power", 0.5, BatchPolicy::FailFast).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::SchemaMismatch { ref file, .. } if file == "broken.csv"
    ));
}
