//! Tabular output for segmentation and detection results.

use std::io::Write;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;

use crate::data::aggregate::{BeadLengthTable, FileFailure};
use crate::pipeline::DetectionReport;
use crate::signal::FEATURE_NAMES;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

#[derive(Serialize)]
struct FailureRecord<'a> {
    file: &'a str,
    error: String,
}

fn failure_records(failures: &[FileFailure]) -> Vec<FailureRecord<'_>> {
    failures
        .iter()
        .map(|f| FailureRecord {
            file: &f.file_id,
            error: f.error.to_string(),
        })
        .collect()
}

/// Write the bead length grid: one row per file, one column per bead number.
pub fn write_length_table<W: Write>(
    out: W,
    table: &BeadLengthTable,
    failures: &[FileFailure],
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            let mut header = vec!["file".to_string()];
            header.extend(table.bead_numbers.iter().map(|n| format!("bead_{n}")));
            writer.write_record(&header)?;
            for (file, lengths) in &table.rows {
                let mut record = vec![file.clone()];
                record.extend(lengths.iter().map(|l| l.to_string()));
                writer.write_record(&record)?;
            }
            writer.flush().context("flushing CSV output")?;
        }
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct Doc<'a> {
                #[serde(flatten)]
                table: &'a BeadLengthTable,
                failures: Vec<FailureRecord<'a>>,
            }
            let doc = Doc {
                table,
                failures: failure_records(failures),
            };
            serde_json::to_writer_pretty(out, &doc).context("writing JSON output")?;
        }
    }
    Ok(())
}

/// Write one row per scored bead with its features, score and label.
///
/// JSON rows also carry the raw bead waveform, for plotting by label.
pub fn write_detection<W: Write>(
    out: W,
    report: &DetectionReport,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Csv => {
            let dims = report
                .rows
                .iter()
                .find_map(|r| r.projection.as_ref().map(Vec::len))
                .unwrap_or(0);

            let mut writer = csv::Writer::from_writer(out);
            let mut header: Vec<String> = ["file", "bead", "samples"]
                .iter()
                .map(|s| s.to_string())
                .collect();
            header.extend(FEATURE_NAMES.iter().map(|s| s.to_string()));
            header.push("score".into());
            header.push("label".into());
            header.extend((1..=dims).map(|d| format!("pc{d}")));
            writer.write_record(&header)?;

            for row in &report.rows {
                let mut record = vec![
                    row.file_id.clone(),
                    row.bead_number.to_string(),
                    row.samples.to_string(),
                ];
                record.extend(row.features.to_array().iter().map(|v| v.to_string()));
                record.push(format!("{:.6}", row.score));
                record.push(row.label.to_string());
                if let Some(p) = &row.projection {
                    record.extend(p.iter().map(|v| format!("{v:.6}")));
                }
                writer.write_record(&record)?;
            }
            writer.flush().context("flushing CSV output")?;
        }
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct Doc<'a> {
                target_column: &'a str,
                bead_numbers: &'a [usize],
                rows: &'a [crate::pipeline::DetectionRow],
                failures: Vec<FailureRecord<'a>>,
            }
            let doc = Doc {
                target_column: &report.target_column,
                bead_numbers: &report.bead_numbers,
                rows: &report.rows,
                failures: failure_records(&report.failures),
            };
            serde_json::to_writer_pretty(out, &doc).context("writing JSON output")?;
        }
    }
    Ok(())
}
