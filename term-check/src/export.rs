//! Writing checked data to files.
//!
//! The format comes from an explicit name or the path's extension and is
//! resolved before the file is created, so an unknown extension never leaves
//! an empty file behind. Writes are synchronous and errors propagate as-is.

use crate::data::Data;
use crate::error::{CheckError, Result};
use arrow::record_batch::RecordBatch;
use std::fmt;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, instrument};

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Tsv,
    Parquet,
    /// Arrow IPC file format (Feather v2).
    Feather,
    /// Arrow IPC streaming format.
    Stream,
    /// Newline-delimited JSON, one object per row.
    Json,
    Xlsx,
}

impl ExportFormat {
    /// Resolves the format from `format` if given, else from the extension
    /// of `path`. Both are case-insensitive and a leading dot is ignored.
    pub fn resolve(path: &Path, format: Option<&str>) -> Result<Self> {
        let token = match format {
            Some(f) => f.trim().trim_start_matches('.').to_lowercase(),
            None => path
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_lowercase)
                .unwrap_or_default(),
        };
        token.parse().map_err(|_| CheckError::UnknownExportFormat {
            path: path.display().to_string(),
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Tsv => "tsv",
            ExportFormat::Parquet => "parquet",
            ExportFormat::Feather => "feather",
            ExportFormat::Stream => "arrows",
            ExportFormat::Json => "ndjson",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    /// Fails for formats compiled out of this build.
    fn ensure_available(self) -> Result<()> {
        match self {
            #[cfg(not(feature = "parquet"))]
            ExportFormat::Parquet => Err(CheckError::NotSupported(
                "parquet export requires the `parquet` feature".to_string(),
            )),
            #[cfg(not(feature = "excel"))]
            ExportFormat::Xlsx => Err(CheckError::NotSupported(
                "xlsx export requires the `excel` feature".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = CheckError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "csv" => Ok(ExportFormat::Csv),
            "tsv" => Ok(ExportFormat::Tsv),
            "parquet" => Ok(ExportFormat::Parquet),
            "feather" | "arrow" | "ipc" => Ok(ExportFormat::Feather),
            "arrows" | "stream" => Ok(ExportFormat::Stream),
            "json" | "ndjson" | "jsonl" => Ok(ExportFormat::Json),
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            other => Err(CheckError::UnknownExportFormat {
                path: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Writes `data` to `path`. A series is written as a one-column table.
#[instrument(skip_all, fields(export.path = %path.display(), export.format = ?format))]
pub fn write(data: &Data, path: &Path, format: Option<&str>) -> Result<ExportFormat> {
    let resolved = ExportFormat::resolve(path, format)?;
    resolved.ensure_available()?;
    let batch = data.to_table()?;

    match resolved {
        ExportFormat::Csv => write_delimited(&batch, path, b',')?,
        ExportFormat::Tsv => write_delimited(&batch, path, b'\t')?,
        ExportFormat::Parquet => write_parquet(&batch, path)?,
        ExportFormat::Feather => {
            let mut writer = arrow::ipc::writer::FileWriter::try_new(File::create(path)?, &batch.schema())?;
            writer.write(&batch)?;
            writer.finish()?;
        }
        ExportFormat::Stream => {
            let mut writer =
                arrow::ipc::writer::StreamWriter::try_new(File::create(path)?, &batch.schema())?;
            writer.write(&batch)?;
            writer.finish()?;
        }
        ExportFormat::Json => {
            let mut writer = arrow::json::LineDelimitedWriter::new(File::create(path)?);
            writer.write(&batch)?;
            writer.finish()?;
        }
        ExportFormat::Xlsx => write_xlsx(&batch, path)?,
    }
    debug!(rows = batch.num_rows(), format = %resolved, "Wrote file");
    Ok(resolved)
}

fn write_delimited(batch: &RecordBatch, path: &Path, delimiter: u8) -> Result<()> {
    let mut writer = arrow::csv::WriterBuilder::new()
        .with_header(true)
        .with_delimiter(delimiter)
        .build(File::create(path)?);
    writer.write(batch)?;
    Ok(())
}

#[cfg(feature = "parquet")]
fn write_parquet(batch: &RecordBatch, path: &Path) -> Result<()> {
    let mut writer = parquet::arrow::ArrowWriter::try_new(File::create(path)?, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

#[cfg(not(feature = "parquet"))]
fn write_parquet(_batch: &RecordBatch, _path: &Path) -> Result<()> {
    ExportFormat::Parquet.ensure_available()
}

#[cfg(feature = "excel")]
fn write_xlsx(batch: &RecordBatch, path: &Path) -> Result<()> {
    use arrow::array::{Array, AsArray};
    use arrow::compute::cast;
    use arrow::datatypes::{DataType, Float64Type};
    use arrow::util::display::{ArrayFormatter, FormatOptions};
    use rust_xlsxwriter::Workbook;

    let xlsx = |e: rust_xlsxwriter::XlsxError| CheckError::Serialization(e.to_string());
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, (field, array)) in batch.schema().fields().iter().zip(batch.columns()).enumerate() {
        let col = u16::try_from(col)
            .map_err(|_| CheckError::NotSupported("more than 65535 columns in xlsx".to_string()))?;
        sheet.write_string(0, col, field.name()).map_err(xlsx)?;

        let row_of = |i: usize| {
            u32::try_from(i + 1)
                .map_err(|_| CheckError::NotSupported("too many rows for xlsx".to_string()))
        };
        match array.data_type() {
            dt if dt.is_numeric() => {
                let floats = cast(array.as_ref(), &DataType::Float64)?;
                let floats = floats.as_primitive::<Float64Type>();
                for i in (0..floats.len()).filter(|i| floats.is_valid(*i)) {
                    sheet.write_number(row_of(i)?, col, floats.value(i)).map_err(xlsx)?;
                }
            }
            DataType::Boolean => {
                let flags = array.as_boolean();
                for i in (0..flags.len()).filter(|i| flags.is_valid(*i)) {
                    sheet.write_boolean(row_of(i)?, col, flags.value(i)).map_err(xlsx)?;
                }
            }
            _ => {
                let options = FormatOptions::default();
                let formatter = ArrayFormatter::try_new(array.as_ref(), &options)?;
                for i in (0..array.len()).filter(|i| array.is_valid(*i)) {
                    sheet
                        .write_string(row_of(i)?, col, formatter.value(i).try_to_string()?)
                        .map_err(xlsx)?;
                }
            }
        }
    }
    workbook.save(path).map_err(xlsx)?;
    Ok(())
}

#[cfg(not(feature = "excel"))]
fn write_xlsx(_batch: &RecordBatch, _path: &Path) -> Result<()> {
    ExportFormat::Xlsx.ensure_available()
}
