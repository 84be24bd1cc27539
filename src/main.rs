use std::ops::RangeInclusive;
use std::path::PathBuf;

use clap::{Parser as ClapParser, Subcommand, ValueEnum};
use isp_workbook_parser::config::ConfigSource;
use isp_workbook_parser::extract::extract_raw_region;
use isp_workbook_parser::io::csv_write::{table_to_csv_string, write_table_csv};
use isp_workbook_parser::io::excel_read::XlsxWorkbook;
use isp_workbook_parser::model::Table;
use isp_workbook_parser::parser::{Parser, TableSelection};
use isp_workbook_parser::{Result, WorkbookError};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    init_logging()?;
    if !cli.workbook.exists() {
        return Err(WorkbookError::MissingInput(cli.workbook));
    }
    match cli.command {
        Command::Version => {
            let mut workbook = XlsxWorkbook::open(&cli.workbook)?;
            println!(
                "{}",
                isp_workbook_parser::version::detect_version(&mut workbook)?
            );
            Ok(())
        }
        Command::Probe(args) => execute_probe(&cli.workbook, args),
        Command::Tables => {
            let parser = open_parser(&cli.workbook, &cli.config)?;
            for (sheet, names) in parser.table_names_by_sheet() {
                println!("{sheet}");
                for name in names {
                    println!("  {name}");
                }
            }
            Ok(())
        }
        Command::Extract(args) => {
            let mut parser = open_parser(&cli.workbook, &cli.config)?;
            let table = parser.get_table(&args.table, !args.no_checks)?;
            emit_table(&table, args.format, args.output.as_ref())
        }
        Command::Save(args) => {
            let mut parser = open_parser(&cli.workbook, &cli.config)?;
            let selection = if args.table.is_empty() {
                TableSelection::All
            } else {
                TableSelection::Named(args.table)
            };
            let written = parser.save_tables(&args.directory, &selection, !args.no_checks)?;
            for path in written {
                println!("{}", path.display());
            }
            Ok(())
        }
    }
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| WorkbookError::Logging(error.to_string()))
}

fn open_parser(workbook: &std::path::Path, config: &ConfigArgs) -> Result<Parser<XlsxWorkbook>> {
    let source = match (&config.config_dir, &config.config_root) {
        (Some(dir), _) => ConfigSource::Directory(dir.clone()),
        (None, Some(root)) => ConfigSource::Versioned(root.clone()),
        (None, None) => ConfigSource::Versioned(PathBuf::from("config")),
    };
    Parser::open(workbook, source)
}

fn emit_table(table: &Table, format: OutputFormat, output: Option<&PathBuf>) -> Result<()> {
    match (format, output) {
        (OutputFormat::Csv, Some(path)) => write_table_csv(path, table),
        (OutputFormat::Csv, None) => {
            print!("{}", table_to_csv_string(table)?);
            Ok(())
        }
        (OutputFormat::Json, Some(path)) => {
            std::fs::write(path, serde_json::to_string_pretty(table)?)?;
            Ok(())
        }
        (OutputFormat::Json, None) => {
            println!("{}", serde_json::to_string_pretty(table)?);
            Ok(())
        }
    }
}

fn execute_probe(workbook: &std::path::Path, args: ProbeArgs) -> Result<()> {
    let mut source = XlsxWorkbook::open(workbook)?;
    let region = extract_raw_region(&mut source, &args.sheet, args.rows, &args.columns)?;
    for (offset, row) in region.rows.iter().enumerate() {
        let cells: Vec<String> = row.iter().map(|cell| format!("{cell:?}")).collect();
        println!("{:>6}  {}", region.first_row + offset as u32, cells.join(" | "));
    }
    Ok(())
}

fn parse_row_span(value: &str) -> std::result::Result<RangeInclusive<u32>, String> {
    let (start, end) = value
        .split_once(':')
        .ok_or_else(|| format!("'{value}' must look like 5:10"))?;
    let start: u32 = start.trim().parse().map_err(|_| format!("bad start row '{start}'"))?;
    let end: u32 = end.trim().parse().map_err(|_| format!("bad end row '{end}'"))?;
    if start == 0 || start > end {
        return Err(format!("'{value}' must be 1-based with start <= end"));
    }
    Ok(start..=end)
}

#[derive(ClapParser)]
#[command(
    author,
    version,
    about = "Extract typed tables from ISP inputs and assumptions workbooks."
)]
struct Cli {
    /// Workbook to read (.xlsx).
    workbook: PathBuf,

    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct ConfigArgs {
    /// Directory of YAML table configs, used whatever the workbook version.
    #[arg(long, global = true, conflicts_with = "config_root")]
    config_dir: Option<PathBuf>,

    /// Root holding one config directory per workbook version.
    #[arg(long, global = true)]
    config_root: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the workbook version.
    Version,
    /// List configured tables by sheet.
    Tables,
    /// Extract one table.
    Extract(ExtractArgs),
    /// Save tables as CSV files.
    Save(SaveArgs),
    /// Print raw cell values of a block of a sheet.
    Probe(ProbeArgs),
}

#[derive(clap::Args)]
struct ExtractArgs {
    /// Configured table name.
    #[arg(long)]
    table: String,

    /// Skip the boundary checks.
    #[arg(long)]
    no_checks: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// Write to this file instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(clap::Args)]
struct SaveArgs {
    /// Directory to write `<table>.csv` files into.
    #[arg(long)]
    directory: PathBuf,

    /// Tables to save; all configured tables when omitted.
    #[arg(long)]
    table: Vec<String>,

    /// Skip the boundary checks.
    #[arg(long)]
    no_checks: bool,
}

#[derive(clap::Args)]
struct ProbeArgs {
    #[arg(long)]
    sheet: String,

    /// Row span such as `5:10`.
    #[arg(long, value_parser = parse_row_span)]
    rows: RangeInclusive<u32>,

    /// Column span such as `B:D`.
    #[arg(long)]
    columns: String,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}
