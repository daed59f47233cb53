//! Output directory layout: `fact`, `dim<i>` for star schemas and `<i>` for normalized
//! tables, one file each.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use starsplit_columnar::ColumnarTable;
use starsplit_core::StarSchema;

use crate::error::CsvError;
use crate::export::export_csv;
use crate::import::{import_csv_path, CsvOptions};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Csv,
    #[cfg(feature = "parquet")]
    Parquet,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            #[cfg(feature = "parquet")]
            OutputFormat::Parquet => "parquet",
        }
    }

    fn all() -> &'static [OutputFormat] {
        &[
            OutputFormat::Csv,
            #[cfg(feature = "parquet")]
            OutputFormat::Parquet,
        ]
    }
}

pub fn fact_path(dir: &Path, format: OutputFormat) -> PathBuf {
    dir.join(format!("fact.{}", format.extension()))
}

pub fn dim_path(dir: &Path, group_no: usize, format: OutputFormat) -> PathBuf {
    dir.join(format!("dim{group_no}.{}", format.extension()))
}

pub fn normalized_path(dir: &Path, table_no: usize, format: OutputFormat) -> PathBuf {
    dir.join(format!("{table_no}.{}", format.extension()))
}

pub fn write_table(path: &Path, table: &ColumnarTable, format: OutputFormat) -> Result<(), CsvError> {
    let file = File::create(path)?;
    match format {
        OutputFormat::Csv => {
            let mut writer = BufWriter::new(file);
            export_csv(&mut writer, table)?;
            writer.flush()?;
        }
        #[cfg(feature = "parquet")]
        OutputFormat::Parquet => {
            starsplit_columnar::parquet::write_columnar_to_parquet(table, file)?;
        }
    }
    log::debug!("wrote {} rows to {}", table.row_count(), path.display());
    Ok(())
}

/// Load a table written by [`write_table`], picking the reader from the file extension.
pub fn read_table(path: &Path, options: &CsvOptions) -> Result<ColumnarTable, CsvError> {
    match path.extension().and_then(|e| e.to_str()) {
        #[cfg(feature = "parquet")]
        Some("parquet") => Ok(starsplit_columnar::parquet::read_parquet_to_columnar(
            File::open(path)?,
        )?),
        _ => import_csv_path(path, options),
    }
}

/// Write `fact` and `dim0..` into `dir`, creating it if needed. Returns the written paths.
///
/// Fact and dimension files left in `dir` by an earlier split are removed, so the
/// directory always reads back as the schema just written.
pub fn write_star_schema(
    dir: &Path,
    schema: &StarSchema,
    format: OutputFormat,
) -> Result<Vec<PathBuf>, CsvError> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(schema.dims.len() + 1);

    let path = fact_path(dir, format);
    write_table(&path, &schema.fact, format)?;
    written.push(path);
    for (group_no, dim) in schema.dims.iter().enumerate() {
        let path = dim_path(dir, group_no, format);
        write_table(&path, dim, format)?;
        written.push(path);
    }
    remove_stale_outputs(dir, &written)?;
    Ok(written)
}

pub fn write_normalized(
    dir: &Path,
    tables: &[ColumnarTable],
    format: OutputFormat,
) -> Result<Vec<PathBuf>, CsvError> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(tables.len());
    for (table_no, table) in tables.iter().enumerate() {
        let path = normalized_path(dir, table_no, format);
        write_table(&path, table, format)?;
        written.push(path);
    }
    Ok(written)
}

fn is_star_schema_stem(stem: &str) -> bool {
    stem == "fact"
        || stem
            .strip_prefix("dim")
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Delete `fact.*` and `dim<N>.*` files in `dir`, in any known format, that are not in
/// `written`.
fn remove_stale_outputs(dir: &Path, written: &[PathBuf]) -> Result<(), CsvError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || written.contains(&path) {
            continue;
        }
        let stem = path.file_stem().and_then(|s| s.to_str());
        let ext = path.extension().and_then(|e| e.to_str());
        let (Some(stem), Some(ext)) = (stem, ext) else {
            continue;
        };
        if is_star_schema_stem(stem) && OutputFormat::all().iter().any(|f| f.extension() == ext) {
            log::debug!("removing stale output {}", path.display());
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

/// Read back a directory produced by [`write_star_schema`].
///
/// Dimensions are read as `dim0, dim1, ...` up to the first missing index.
pub fn read_star_schema(dir: &Path, options: &CsvOptions) -> Result<StarSchema, CsvError> {
    let format = OutputFormat::all()
        .iter()
        .copied()
        .find(|f| fact_path(dir, *f).is_file())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no fact table in {}", dir.display()),
            )
        })?;

    let fact = read_table(&fact_path(dir, format), options)?;
    let mut dims = Vec::new();
    loop {
        let path = dim_path(dir, dims.len(), format);
        if !path.is_file() {
            break;
        }
        dims.push(read_table(&path, options)?);
    }
    Ok(StarSchema { fact, dims })
}

/// Input and output byte counts of a decomposition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SizeReport {
    pub input_bytes: u64,
    pub output_bytes: u64,
}

impl SizeReport {
    pub fn measure(input: &Path, outputs: &[PathBuf]) -> io::Result<Self> {
        let input_bytes = fs::metadata(input)?.len();
        let mut output_bytes = 0u64;
        for path in outputs {
            output_bytes += fs::metadata(path)?.len();
        }
        Ok(Self {
            input_bytes,
            output_bytes,
        })
    }

    pub fn input_mb(&self) -> f64 {
        self.input_bytes as f64 / 1e6
    }

    pub fn output_mb(&self) -> f64 {
        self.output_bytes as f64 / 1e6
    }

    /// Output size as a fraction of the input size.
    pub fn ratio(&self) -> Option<f64> {
        (self.input_bytes > 0).then(|| self.output_bytes as f64 / self.input_bytes as f64)
    }
}

impl fmt::Display for SizeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "input {:.3} MB, output {:.3} MB", self.input_mb(), self.output_mb())?;
        if let Some(ratio) = self.ratio() {
            write!(f, " ({:.1}% of input)", ratio * 100.0)?;
        }
        Ok(())
    }
}
