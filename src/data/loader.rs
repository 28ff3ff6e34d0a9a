use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, BooleanArray, Float64Array, Int64Array, LargeStringArray, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use log::debug;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CellValue, Column, Table};

// ---------------------------------------------------------------------------
// Tabular sources
// ---------------------------------------------------------------------------

/// Anything the pipeline can open as a named table of columns.
pub trait TabularSource {
    /// Identifier used in bead maps, reports and error messages.
    fn id(&self) -> &str;

    /// Read the whole table.
    fn load(&self) -> Result<Table>;
}

/// A recording stored on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    pub id: String,
    pub path: PathBuf,
}

impl FileSource {
    /// Use the file name as identifier.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let id = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        FileSource { id, path }
    }
}

impl TabularSource for FileSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn load(&self) -> Result<Table> {
        load_file(&self.path)
    }
}

/// An already-loaded table, mostly for callers that parse data themselves.
#[derive(Debug, Clone)]
pub struct MemorySource {
    pub id: String,
    pub table: Table,
}

impl TabularSource for MemorySource {
    fn id(&self) -> &str {
        &self.id
    }

    fn load(&self) -> Result<Table> {
        Ok(self.table.clone())
    }
}

// ---------------------------------------------------------------------------
// Discovery: folder → data files
// ---------------------------------------------------------------------------

/// A folder of recordings belonging to the same batch.
#[derive(Debug, Clone)]
pub struct FileGroup {
    pub name: String,
    pub files: Vec<FileSource>,
}

/// Whether `path` has an extension [`load_file`] understands.
pub fn is_data_file(path: &Path) -> bool {
    matches!(extension(path).as_str(), "csv" | "json" | "parquet" | "pq")
}

/// Data files directly inside `dir`, sorted by file name.
pub fn list_data_files(dir: &Path) -> Result<Vec<FileSource>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry.context("reading directory entry")?.path();
        if path.is_file() && is_data_file(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths.into_iter().map(FileSource::new).collect())
}

/// List the batches under `root`: the root itself when it holds data files,
/// then every immediate sub-folder that does, in name order.
pub fn discover_groups(root: &Path) -> Result<Vec<FileGroup>> {
    let mut groups = Vec::new();

    let top = list_data_files(root)?;
    if !top.is_empty() {
        groups.push(FileGroup {
            name: ".".to_string(),
            files: top,
        });
    }

    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(root).with_context(|| format!("reading {}", root.display()))? {
        let path = entry.context("reading directory entry")?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();

    for dir in dirs {
        let files = list_data_files(&dir)?;
        if files.is_empty() {
            continue;
        }
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        debug!("group '{name}': {} files", files.len());
        groups.push(FileGroup { name, files });
    }

    Ok(groups)
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a recording from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row with column names, one sample per row
/// * `.json`    – `[{ "power": 0.1, "intensity": 3.2, ... }, ...]`
/// * `.parquet` – one scalar column per signal
pub fn load_file(path: &Path) -> Result<Table> {
    match extension(path).as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let mut columns: Vec<Column> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| Column {
            name: h.trim().to_string(),
            values: Vec::new(),
        })
        .collect();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        for (col, column) in columns.iter_mut().enumerate() {
            column
                .values
                .push(guess_cell_type(record.get(col).unwrap_or("")));
        }
    }

    Ok(Table::from_columns(columns))
}

fn guess_cell_type(s: &str) -> CellValue {
    let s = s.trim();
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    CellValue::Text(s.to_string())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the default `df.to_json(orient='records')`.
/// Keys missing from a record become nulls.
fn load_json(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut columns: Vec<Column> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (row, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {row} is not a JSON object"))?;

        for (key, val) in obj {
            let col = *index.entry(key.clone()).or_insert_with(|| {
                columns.push(Column {
                    name: key.clone(),
                    values: vec![CellValue::Null; row],
                });
                columns.len() - 1
            });
            columns[col].values.push(json_to_cell(val));
        }
        for column in &mut columns {
            column.values.resize(row + 1, CellValue::Null);
        }
    }

    Ok(Table::from_columns(columns))
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::Text(n.to_string())
            }
        }
        JsonValue::String(s) => CellValue::Text(s.clone()),
        JsonValue::Bool(b) => CellValue::Integer(i64::from(*b)),
        JsonValue::Null => CellValue::Null,
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file written by Pandas or Polars with one scalar column
/// per signal.
fn load_parquet(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;

    let mut columns: Vec<Column> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| Column {
            name: f.name().clone(),
            values: Vec::new(),
        })
        .collect();

    let reader = builder.build().context("building parquet reader")?;
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for (col_idx, column) in columns.iter_mut().enumerate() {
            let cells = arrow_column_cells(batch.column(col_idx))
                .with_context(|| format!("column '{}'", column.name))?;
            column.values.extend(cells);
        }
    }

    Ok(Table::from_columns(columns))
}

// -- Parquet / Arrow helpers --

/// Convert one Arrow column of a record batch into cells.
fn arrow_column_cells(col: &Arc<dyn Array>) -> Result<Vec<CellValue>> {
    let data_type = col.data_type().clone();

    if data_type.is_integer() {
        let ints = cast(col, &DataType::Int64).context("casting to Int64")?;
        let arr = ints
            .as_any()
            .downcast_ref::<Int64Array>()
            .context("expected Int64Array")?;
        return Ok(arr
            .iter()
            .map(|v| v.map_or(CellValue::Null, CellValue::Integer))
            .collect());
    }

    if data_type.is_floating() || data_type.is_numeric() {
        let floats = cast(col, &DataType::Float64).context("casting to Float64")?;
        let arr = floats
            .as_any()
            .downcast_ref::<Float64Array>()
            .context("expected Float64Array")?;
        return Ok(arr
            .iter()
            .map(|v| v.map_or(CellValue::Null, CellValue::Float))
            .collect());
    }

    match data_type {
        DataType::Boolean => {
            let arr = col
                .as_any()
                .downcast_ref::<BooleanArray>()
                .context("expected BooleanArray")?;
            Ok(arr
                .iter()
                .map(|v| v.map_or(CellValue::Null, |b| CellValue::Integer(i64::from(b))))
                .collect())
        }
        DataType::LargeUtf8 => {
            let arr = col
                .as_any()
                .downcast_ref::<LargeStringArray>()
                .context("expected LargeStringArray")?;
            Ok(arr
                .iter()
                .map(|v| v.map_or(CellValue::Null, |s| CellValue::Text(s.to_string())))
                .collect())
        }
        _ => {
            // Everything else goes through its string rendering.
            let text = cast(col, &DataType::Utf8)
                .with_context(|| format!("unsupported column type {data_type:?}"))?;
            let arr = text
                .as_any()
                .downcast_ref::<StringArray>()
                .context("expected StringArray")?;
            Ok(arr
                .iter()
                .map(|v| v.map_or(CellValue::Null, |s| CellValue::Text(s.to_string())))
                .collect())
        }
    }
}
