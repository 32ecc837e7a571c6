//! CLI for bibslice - Extract the cited entries of a BibTeX database.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use bibslice::{extract, ExtractError, ExtractReport, MissingInputPolicy, Scanner};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// Extract the entries cited by LaTeX documents from a BibTeX database
#[derive(Parser)]
#[command(name = "bibslice")]
#[command(version)]
#[command(after_help = "\
Examples:
  bibslice paper.tex library.bib paper.bib
  bibslice intro.tex body.tex appendix.tex library.bib paper.bib
  bibslice --strict --json chapters/*.tex library.bib - > paper.bib

Recognised macros: \\cite, \\nocite, \\parencite, \\footfullcite, \\autocite, \\fullcite, \\textcite
Set RUST_LOG=bibslice=debug to list every citation key found.")]
struct Cli {
    /// LaTeX documents to scan, then the input database, then the output file ('-' for stdout)
    #[arg(
        required = true,
        num_args = 3..,
        value_name = "DOCUMENT... INPUT_BIB OUTPUT_BIB"
    )]
    paths: Vec<PathBuf>,

    /// Fail if a document cannot be read instead of skipping it
    #[arg(long)]
    strict: bool,

    /// Print the extraction report as JSON on stderr
    #[arg(long)]
    json: bool,
}

// ---------------------------------------------------------------------------
// AppError — semantic exit codes
// ---------------------------------------------------------------------------

enum AppError {
    /// Exit 10 — document not found / unreadable (with --strict)
    InputFile(String),
    /// Exit 11 — bibliography database not found / unreadable
    BibFile(String),
    /// Exit 12 — database record never closed
    MalformedRecord(String),
    /// Exit 15 — cannot write output file
    OutputFile(String),
}

impl AppError {
    fn exit_code(&self) -> i32 {
        match self {
            AppError::InputFile(_) => 10,
            AppError::BibFile(_) => 11,
            AppError::MalformedRecord(_) => 12,
            AppError::OutputFile(_) => 15,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InputFile(msg) => {
                write!(
                    f,
                    "{}\n  hint: verify the file path is correct, or drop --strict to skip it",
                    msg
                )
            }
            AppError::BibFile(msg) => {
                write!(f, "{}\n  hint: verify the database path is correct", msg)
            }
            AppError::MalformedRecord(msg) => {
                write!(
                    f,
                    "{}\n  hint: check the braces of this entry; the output file is incomplete",
                    msg
                )
            }
            AppError::OutputFile(msg) => {
                write!(
                    f,
                    "{}\n  hint: check that the output directory exists and is writable",
                    msg
                )
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    init_tracing();
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "bibslice=warn".into()),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run() -> Result<(), AppError> {
    let cli = Cli::parse();

    // clap guarantees at least three paths
    let (documents, files) = cli.paths.split_at(cli.paths.len() - 2);
    let (input_bib, output_bib) = (&files[0], &files[1]);

    let policy = if cli.strict {
        MissingInputPolicy::Fail
    } else {
        MissingInputPolicy::Skip
    };

    let report = slice_command(documents, input_bib, output_bib, policy)?;
    print_report(&report, output_bib, cli.json)
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Scan the documents, then copy the cited entries of the database.
fn slice_command(
    documents: &[PathBuf],
    input_bib: &Path,
    output_bib: &Path,
    policy: MissingInputPolicy,
) -> Result<ExtractReport, AppError> {
    // 1. Collect citation keys
    let keys = Scanner::new(policy)
        .scan_documents(documents)
        .map_err(|e| AppError::InputFile(e.to_string()))?;

    // 2. Open the database
    let database = File::open(input_bib)
        .map(BufReader::new)
        .map_err(|e| AppError::BibFile(format!("'{}': {}", input_bib.display(), e)))?;

    // 3. Extract to file or stdout
    let to_stdout = output_bib == Path::new("-");
    let result = if to_stdout {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        extract(database, &keys, &mut handle)
    } else {
        ensure_distinct(input_bib, output_bib)?;
        let file = File::create(output_bib).map_err(|e| {
            AppError::OutputFile(format!("'{}': {}", output_bib.display(), e))
        })?;
        let mut writer = BufWriter::new(file);
        extract(database, &keys, &mut writer)
    };

    result.map_err(|e| map_extract_error(e, input_bib, output_bib))
}

/// Refuses to truncate the database by writing the output over it.
fn ensure_distinct(input_bib: &Path, output_bib: &Path) -> Result<(), AppError> {
    let (Ok(input), Ok(output)) = (fs::canonicalize(input_bib), fs::canonicalize(output_bib))
    else {
        return Ok(());
    };
    if input == output {
        return Err(AppError::OutputFile(format!(
            "'{}': output would overwrite the input database",
            output_bib.display()
        )));
    }
    Ok(())
}

/// Maps an ExtractError to an AppError using type-safe matching.
fn map_extract_error(e: ExtractError, input_bib: &Path, output_bib: &Path) -> AppError {
    match e {
        ExtractError::Read(_) => AppError::BibFile(format!("'{}': {}", input_bib.display(), e)),
        ExtractError::Write(_) => {
            AppError::OutputFile(format!("'{}': {}", output_bib.display(), e))
        }
        ExtractError::UnterminatedRecord { .. } => {
            AppError::MalformedRecord(format!("'{}': {}", input_bib.display(), e))
        }
    }
}

/// Print the run summary on stderr, as one line or as JSON.
fn print_report(report: &ExtractReport, output_bib: &Path, json: bool) -> Result<(), AppError> {
    let stderr = io::stderr();
    let mut handle = stderr.lock();
    let written = if json {
        serde_json::to_string_pretty(report)
            .map_err(io::Error::other)
            .and_then(|text| writeln!(handle, "{}", text))
    } else {
        writeln!(
            handle,
            "copied {} of {} cited entr{} ({} missing), wrote {}",
            report.emitted.len(),
            report.cited,
            if report.cited == 1 { "y" } else { "ies" },
            report.missing.len(),
            if output_bib == Path::new("-") {
                "stdout".to_string()
            } else {
                output_bib.display().to_string()
            }
        )
    };
    written.map_err(|e| AppError::OutputFile(format!("stderr: {}", e)))
}
