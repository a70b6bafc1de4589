//! CLI tool for xlgrid - parses a workbook, optionally merges and sorts it,
//! and writes it out in any export format.
//!
//! Usage:
//!   xlgrid_cli <input> [options]
//!
//! Options:
//!   --sheet NAME      make NAME the active sheet
//!   --merge FILE      merge FILE's active sheet after the input's (repeatable)
//!   --sort COL        sort the active sheet by header name or 0-based index
//!   --format FORMAT   native | csv | json | pdf (default: csv)
//!   -o OUT            write to OUT instead of stdout
//!
//! Set `XLGRID_LOG` to `error`, `warn`, `info`, `debug`, `trace` or `off`.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::process::ExitCode;

use log::{LevelFilter, Metadata, Record};
use xlgrid::{
    export, export_filename, merge_workbooks, parse_file, sort_active, EditError, ExportError,
    ExportFormat, MergeError, ParseError, ParseOptions, Workbook,
};

const USAGE: &str = "Usage: xlgrid_cli <input> [--sheet NAME] [--merge FILE]... [--sort COL] \
                     [--format native|csv|json|pdf] [-o OUT]";

/// Name given to the workbook produced by `--merge`.
const MERGED_NAME: &str = "Merged";

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}\n{USAGE}")]
    Usage(String),

    #[error("{path}: {source}")]
    Io { path: String, source: io::Error },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

#[derive(Debug, Default)]
struct Args {
    input: String,
    sheet: Option<String>,
    merge: Vec<String>,
    sort: Option<String>,
    format: Option<ExportFormat>,
    output: Option<String>,
}

impl Args {
    fn parse(mut raw: impl Iterator<Item = String>) -> Result<Self, CliError> {
        let mut args = Self::default();
        let mut input = None;
        while let Some(arg) = raw.next() {
            let mut value = |flag: &str| {
                raw.next()
                    .ok_or_else(|| CliError::Usage(format!("{flag} needs a value")))
            };
            match arg.as_str() {
                "--sheet" => args.sheet = Some(value("--sheet")?),
                "--merge" => args.merge.push(value("--merge")?),
                "--sort" => args.sort = Some(value("--sort")?),
                "--format" => args.format = Some(value("--format")?.parse()?),
                "-o" | "--output" => args.output = Some(value("-o")?),
                flag if flag.starts_with('-') && flag.len() > 1 => {
                    return Err(CliError::Usage(format!("unknown option {flag}")));
                }
                other if input.is_some() => {
                    return Err(CliError::Usage(format!("unexpected argument {other}")));
                }
                other => input = Some(other.to_string()),
            }
        }
        args.input = input.ok_or_else(|| CliError::Usage("missing input file".to_string()))?;
        Ok(args)
    }
}

struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

fn log_level_from_env() -> LevelFilter {
    match env::var("XLGRID_LOG").as_deref() {
        Ok("error") => LevelFilter::Error,
        Ok("info") => LevelFilter::Info,
        Ok("debug") => LevelFilter::Debug,
        Ok("trace") => LevelFilter::Trace,
        Ok("off") => LevelFilter::Off,
        _ => LevelFilter::Warn,
    }
}

fn init_logging() {
    static LOGGER: StderrLogger = StderrLogger;
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(log_level_from_env());
}

fn load(path: &str) -> Result<Workbook, CliError> {
    let data = fs::read(path).map_err(|source| CliError::Io {
        path: path.to_string(),
        source,
    })?;
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    Ok(parse_file(name, &data, ParseOptions::default())?)
}

/// Resolve `--sort` against the active sheet: an exact header wins over an
/// index.
fn sort_column(workbook: &Workbook, column: &str) -> Result<usize, CliError> {
    let headers = workbook.active_sheet().map(|s| s.headers()).unwrap_or_default();
    if let Some(col) = headers.iter().position(|h| h == column) {
        return Ok(col);
    }
    column
        .parse()
        .map_err(|_| CliError::Usage(format!("no column named '{column}'")))
}

fn run(args: &Args) -> Result<(), CliError> {
    let mut workbook = load(&args.input)?;
    if let Some(sheet) = &args.sheet {
        workbook = workbook.with_active_sheet(sheet)?;
    }

    if !args.merge.is_empty() {
        let others = args
            .merge
            .iter()
            .map(String::as_str)
            .map(load)
            .collect::<Result<Vec<_>, _>>()?;
        let mut inputs = vec![&workbook];
        inputs.extend(others.iter());
        workbook = merge_workbooks(&inputs, MERGED_NAME)?;
    }

    if let Some(column) = &args.sort {
        let col = sort_column(&workbook, column)?;
        workbook = sort_active(&workbook, col)?;
    }

    let format = args.format.unwrap_or(ExportFormat::Csv);
    let bytes = export(&workbook, format)?;

    match &args.output {
        Some(path) => {
            fs::write(path, &bytes).map_err(|source| CliError::Io {
                path: path.clone(),
                source,
            })?;
            eprintln!("Written: {path}");
        }
        None => {
            log::info!("suggested file name: {}", export_filename(&workbook, format));
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(&bytes)
                .and_then(|()| stdout.flush())
                .map_err(|source| CliError::Io {
                    path: "<stdout>".to_string(),
                    source,
                })?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    init_logging();
    let result = Args::parse(env::args().skip(1)).and_then(|args| run(&args));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e @ CliError::Usage(_)) => {
            eprintln!("{e}");
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
