use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{ArgAction, Args as ClapArgs, Parser, Subcommand, ValueEnum};
use starsplit_columnar::ColumnarTable;
use starsplit_core::{
    plan_groups, reassemble, split_normalized, split_star_schema, ColumnarEngine, NameMapping,
    Plan, QueryEngine,
};
use starsplit_io::{
    export_csv, import_csv_path, read_star_schema, write_normalized, write_star_schema,
    CsvOptions, OutputFormat, SizeReport,
};

#[derive(Parser, Debug)]
#[command(name = "starsplit", about = "Split flat CSV tables into a star schema.")]
pub struct Args {
    /// Increase log verbosity (`-v` debug, `-vv` trace). `RUST_LOG` overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the column grouping chosen for a table as JSON.
    Plan {
        input: PathBuf,
        /// Write the plan here instead of stdout.
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
        #[command(flatten)]
        csv: CsvArgs,
    },
    /// Decompose a table into `fact` and `dim<i>` files.
    Split {
        input: PathBuf,
        #[arg(long, value_name = "DIR")]
        out_dir: PathBuf,
        /// Use this plan instead of planning from statistics.
        #[arg(long, value_name = "PATH")]
        plan: Option<PathBuf>,
        /// Also save the plan that was used.
        #[arg(long, value_name = "PATH")]
        plan_out: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = Format::Csv)]
        format: Format,
        #[command(flatten)]
        csv: CsvArgs,
    },
    /// Write the distinct combinations of each column group to `<i>` files.
    Normalize {
        input: PathBuf,
        #[arg(long, value_name = "DIR")]
        out_dir: PathBuf,
        /// Comma-separated column names (repeatable, one table per group).
        #[arg(long = "group", value_name = "COLS", required = true)]
        groups: Vec<String>,
        #[arg(long, value_enum, default_value_t = Format::Csv)]
        format: Format,
        #[command(flatten)]
        csv: CsvArgs,
    },
    /// Join a split directory back into one flat CSV table.
    Join {
        dir: PathBuf,
        /// Write the table here instead of stdout.
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
        #[command(flatten)]
        csv: CsvArgs,
    },
}

#[derive(ClapArgs, Debug, Clone)]
struct CsvArgs {
    /// Field delimiter (a single ASCII character).
    #[arg(long, default_value_t = ',')]
    delimiter: char,
    /// The first line is data, not column names.
    #[arg(long)]
    no_header: bool,
    /// Load every column as a string.
    #[arg(long)]
    all_strings: bool,
    /// Additional field value to read as null (repeatable).
    #[arg(long = "null", value_name = "TOKEN")]
    null_values: Vec<String>,
}

impl CsvArgs {
    fn options(&self) -> Result<CsvOptions> {
        if !self.delimiter.is_ascii() {
            anyhow::bail!("delimiter '{}' is not an ASCII character", self.delimiter);
        }
        Ok(CsvOptions {
            delimiter: self.delimiter as u8,
            has_header: !self.no_header,
            infer_types: !self.all_strings,
            null_values: self.null_values.clone(),
            ..CsvOptions::default()
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Csv,
    Parquet,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Csv => OutputFormat::Csv,
            Format::Parquet => OutputFormat::Parquet,
        }
    }
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    run_with_args(args)
}

pub fn run_with_args(args: Args) -> Result<()> {
    crate::logging::init(args.verbose);

    match args.command {
        Command::Plan { input, output, csv } => {
            let table = load(&input, &csv.options()?)?;
            let plan = plan_table(&table)?;
            match output {
                Some(path) => write_plan(&path, &plan),
                None => {
                    let stdout = io::stdout();
                    let mut handle = stdout.lock();
                    serde_json::to_writer(&mut handle, &plan)?;
                    handle.write_all(b"\n")?;
                    Ok(())
                }
            }
        }
        Command::Split {
            input,
            out_dir,
            plan,
            plan_out,
            format,
            csv,
        } => run_split(&input, &out_dir, plan.as_deref(), plan_out.as_deref(), format, &csv),
        Command::Normalize {
            input,
            out_dir,
            groups,
            format,
            csv,
        } => run_normalize(&input, &out_dir, &groups, format, &csv),
        Command::Join { dir, output, csv } => run_join(&dir, output.as_deref(), &csv),
    }
}

fn load(path: &Path, options: &CsvOptions) -> Result<ColumnarTable> {
    let started = Instant::now();
    let table = import_csv_path(path, options)
        .with_context(|| format!("load {}", path.display()))?;
    log::info!(
        "loaded {} rows x {} columns from {} in {:?}",
        table.row_count(),
        table.column_count(),
        path.display(),
        started.elapsed()
    );
    Ok(table)
}

fn plan_table(table: &ColumnarTable) -> Result<Plan> {
    let started = Instant::now();
    let stats = ColumnarEngine
        .column_stats(table)
        .context("collect column statistics")?;
    log::info!("collected statistics in {:?}", started.elapsed());

    let started = Instant::now();
    let plan = plan_groups(&stats).context("plan column groups")?;
    log::info!("planned in {:?}", started.elapsed());
    Ok(plan)
}

fn read_plan(path: &Path) -> Result<Plan> {
    let file = File::open(path).with_context(|| format!("open plan {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parse plan {}", path.display()))
}

fn write_plan(path: &Path, plan: &Plan) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, plan)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

fn run_split(
    input: &Path,
    out_dir: &Path,
    plan_path: Option<&Path>,
    plan_out: Option<&Path>,
    format: Format,
    csv: &CsvArgs,
) -> Result<()> {
    let table = load(input, &csv.options()?)?;
    let plan = match plan_path {
        Some(path) => read_plan(path)?,
        None => plan_table(&table)?,
    };
    if let Some(path) = plan_out {
        write_plan(path, &plan)?;
    }

    if !plan.is_split() {
        log::info!("table not split, retain original CSV");
        return Ok(());
    }

    let started = Instant::now();
    let names = NameMapping::from_columns(table.column_names());
    let schema = split_star_schema(&ColumnarEngine, table, &plan.col_groups, &names)
        .context("split table")?;
    log::info!(
        "split into {} dimension table(s) in {:?}",
        schema.dims.len(),
        started.elapsed()
    );

    let started = Instant::now();
    let written = write_star_schema(out_dir, &schema, format.into())
        .with_context(|| format!("write star schema to {}", out_dir.display()))?;
    log::info!("stored {} file(s) in {:?}", written.len(), started.elapsed());

    let report = SizeReport::measure(input, &written).context("measure output size")?;
    log::info!("{report}");
    Ok(())
}

fn run_normalize(
    input: &Path,
    out_dir: &Path,
    groups: &[String],
    format: Format,
    csv: &CsvArgs,
) -> Result<()> {
    let groups: Vec<Vec<String>> = groups
        .iter()
        .map(|g| g.split(',').map(|c| c.trim().to_string()).collect())
        .collect();

    let table = load(input, &csv.options()?)?;
    let started = Instant::now();
    let tables = split_normalized(&ColumnarEngine, &table, &groups).context("normalize table")?;
    log::info!("normalized into {} table(s) in {:?}", tables.len(), started.elapsed());

    let started = Instant::now();
    let written = write_normalized(out_dir, &tables, format.into())
        .with_context(|| format!("write normalized tables to {}", out_dir.display()))?;
    log::info!("stored {} file(s) in {:?}", written.len(), started.elapsed());

    let report = SizeReport::measure(input, &written).context("measure output size")?;
    log::info!("{report}");
    Ok(())
}

fn run_join(dir: &Path, output: Option<&Path>, csv: &CsvArgs) -> Result<()> {
    let started = Instant::now();
    let schema = read_star_schema(dir, &csv.options()?)
        .with_context(|| format!("read star schema from {}", dir.display()))?;
    let table = reassemble(&ColumnarEngine, &schema).context("join fact and dimension tables")?;
    log::info!(
        "joined {} dimension table(s) into {} rows in {:?}",
        schema.dims.len(),
        table.row_count(),
        started.elapsed()
    );

    match output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            export_csv(&mut writer, &table)?;
            writer.flush()?;
        }
        None => {
            let stdout = io::stdout();
            export_csv(stdout.lock(), &table)?;
        }
    }
    Ok(())
}
