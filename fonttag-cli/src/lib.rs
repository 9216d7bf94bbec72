//! fonttag CLI (made by FontLab https://www.fontlab.com/)

use std::fs::{self, File};
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use fonttag_core::exemplars::Exemplars;
use fonttag_core::library::Library;
use fonttag_core::lint::{LintWarning, Severity};
use fonttag_core::output::{write_json_pretty, write_ndjson};
use fonttag_core::registry::Registry;
use fonttag_core::similarity::DEFAULT_NEIGHBOURS;
use fonttag_core::source::{DataFiles, FsSource};

pub mod server;

const DATA_DIR_ENV: &str = "FONTTAG_DATA_DIR";

/// CLI entrypoint for fonttag.
#[derive(Debug, Parser)]
#[command(
    name = "fonttag",
    about = "Font tagging, linting and similarity (made by FontLab https://www.fontlab.com/)"
)]
pub struct Cli {
    #[command(flatten)]
    data: DataArgs,

    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(short = 'v', long = "verbose", global = true, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Where the reference data and the tagging table live.
#[derive(Debug, Clone, Default, Args)]
pub struct DataArgs {
    /// Directory holding family_data.json, embeddings.json and the CSV tables
    #[arg(long = "data", global = true, value_hint = ValueHint::DirPath, env = DATA_DIR_ENV)]
    pub data: Option<PathBuf>,

    /// Tagging table to load instead of <DATA>/families.csv
    #[arg(long = "taggings", global = true, value_hint = ValueHint::FilePath)]
    pub taggings: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check taggings against the rule table
    Lint(LintArgs),
    /// Show high, low and medium examples of a tag
    Exemplars(ExemplarsArgs),
    /// List the families closest in style to a family
    Similar(SimilarArgs),
    /// Write the tagging table in canonical order
    Export(ExportArgs),
    /// Serve the same operations over HTTP
    Serve(ServeArgs),
}

#[derive(Debug, Args)]
struct LintArgs {
    /// Lint one family instead of all of them
    #[arg(long = "family")]
    family: Option<String>,

    /// Emit a single JSON array
    #[arg(long = "json", action = ArgAction::SetTrue, conflicts_with = "ndjson")]
    json: bool,

    /// Emit newline-delimited JSON
    #[arg(long = "ndjson", action = ArgAction::SetTrue)]
    ndjson: bool,

    /// Control colorized output (auto|always|never)
    #[arg(long = "color", default_value_t = ColorChoice::Auto, value_enum)]
    color: ColorChoice,
}

#[derive(Debug, Args)]
struct ExemplarsArgs {
    /// Tag name, e.g. /Expressive/Loud
    tag: String,

    /// Emit JSON
    #[arg(long = "json", action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(Debug, Args)]
struct SimilarArgs {
    family: String,

    /// How many neighbours to rank (the family itself takes a slot)
    #[arg(short = 'k', long = "count", default_value_t = DEFAULT_NEIGHBOURS)]
    count: usize,

    /// Emit JSON
    #[arg(long = "json", action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(Debug, Args)]
struct ExportArgs {
    /// Write to a file instead of stdout
    #[arg(short = 'o', long = "output", value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ServeArgs {
    /// Address to listen on
    #[arg(long = "bind", default_value = "127.0.0.1:8765")]
    bind: String,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

/// Lint results for one family.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FamilyReport {
    pub family: String,
    pub warnings: Vec<LintWarning>,
}

/// Parse CLI args and execute the selected command.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Lint(args) => run_lint(&cli.data, args),
        Command::Exemplars(args) => run_exemplars(&cli.data, args),
        Command::Similar(args) => run_similar(&cli.data, args),
        Command::Export(args) => run_export(&cli.data, args),
        Command::Serve(args) => run_serve(cli.data, args),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A second init (tests) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

impl DataArgs {
    pub fn data_dir(&self) -> PathBuf {
        self.data.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Load the registry from the data directory and the tagging table on top.
///
/// The default `families.csv` may be absent; an explicit `--taggings` file
/// must exist.
pub fn load_library(data: &DataArgs) -> Result<Library> {
    let dir = data.data_dir();
    let files = DataFiles::default();
    let registry = Registry::load(&FsSource::new(&dir), &files)
        .with_context(|| format!("loading reference data from {}", dir.display()))?;
    let mut library = Library::new(Arc::new(registry));

    let taggings = match &data.taggings {
        Some(path) => Some(read_table(path)?),
        None => {
            let path = dir.join(&files.taggings);
            if path.exists() {
                Some(read_table(&path)?)
            } else {
                debug!(path = %path.display(), "no tagging table; starting empty");
                None
            }
        }
    };

    if let Some(text) = taggings {
        let summary = library.import_taggings(&text);
        debug!(added = summary.added, skipped = summary.skipped, "tagging table loaded");
    }

    Ok(library)
}

fn read_table(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn run_lint(data: &DataArgs, args: LintArgs) -> Result<()> {
    let library = load_library(data)?;
    let reports = lint_reports(&library, args.family.as_deref())?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let use_color = match args.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => handle.is_terminal(),
    };

    if args.ndjson {
        write_ndjson(&reports, &mut handle)?;
    } else if args.json {
        write_json_pretty(&reports, &mut handle)?;
    } else {
        write_lint_plain(&reports, &mut handle, use_color)?;
    }

    Ok(())
}

fn lint_reports(library: &Library, family: Option<&str>) -> Result<Vec<FamilyReport>> {
    match family {
        Some(name) => {
            let warnings = library
                .lint(name)
                .ok_or_else(|| anyhow!("unknown family: {name}"))?;
            Ok(vec![FamilyReport {
                family: name.to_string(),
                warnings,
            }])
        }
        None => Ok(library
            .lint_all()
            .into_iter()
            .map(|(family, warnings)| FamilyReport {
                family: family.to_string(),
                warnings,
            })
            .collect()),
    }
}

fn write_lint_plain(reports: &[FamilyReport], mut w: impl Write, color: bool) -> Result<()> {
    for report in reports {
        for warning in &report.warnings {
            let severity = apply_color(
                &format!("{:<5}", warning.severity.as_str()),
                color,
                severity_color(warning.severity),
            );
            writeln!(w, "{}  {severity}  {}", report.family, warning.description)?;
        }
    }
    Ok(())
}

fn run_exemplars(data: &DataArgs, args: ExemplarsArgs) -> Result<()> {
    let mut library = load_library(data)?;
    let exemplars = library
        .exemplars(&args.tag)
        .ok_or_else(|| anyhow!("unknown tag: {}", args.tag))?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if args.json {
        let json = serde_json::to_string_pretty(exemplars)?;
        writeln!(handle, "{json}")?;
    } else {
        write_exemplars_plain(exemplars, &mut handle)?;
    }
    Ok(())
}

fn write_exemplars_plain(exemplars: &Exemplars, mut w: impl Write) -> Result<()> {
    let buckets = [
        ("high", &exemplars.high),
        ("low", &exemplars.low),
        ("medium", &exemplars.medium),
    ];
    for (bucket, taggings) in buckets {
        for tagging in taggings {
            writeln!(w, "{bucket:<6}  {:>5}  {}", tagging.score, tagging.font)?;
        }
    }
    Ok(())
}

fn run_similar(data: &DataArgs, args: SimilarArgs) -> Result<()> {
    let library = load_library(data)?;
    let similar = library.similar_families(&args.family, args.count);

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if args.json {
        write_json_pretty(&similar, &mut handle)?;
    } else {
        for name in &similar {
            writeln!(handle, "{name}")?;
        }
    }
    Ok(())
}

fn run_export(data: &DataArgs, args: ExportArgs) -> Result<()> {
    let library = load_library(data)?;
    let mut text = library.export_taggings();
    if !text.is_empty() {
        text.push('\n');
    }

    match &args.output {
        Some(path) => {
            let mut file =
                File::create(path).with_context(|| format!("creating {}", path.display()))?;
            file.write_all(text.as_bytes())?;
        }
        None => io::stdout().lock().write_all(text.as_bytes())?,
    }
    Ok(())
}

fn run_serve(data: DataArgs, args: ServeArgs) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;
    runtime.block_on(server::serve(&args.bind, data))
}

#[derive(Copy, Clone)]
enum AnsiColor {
    Red,
    Yellow,
    Cyan,
}

fn severity_color(severity: Severity) -> AnsiColor {
    match severity {
        Severity::Error | Severity::Fail => AnsiColor::Red,
        Severity::Warn => AnsiColor::Yellow,
        Severity::Info => AnsiColor::Cyan,
    }
}

fn apply_color(text: &str, color: bool, code: AnsiColor) -> String {
    if !color {
        return text.to_string();
    }

    let code_str = match code {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
        AnsiColor::Cyan => "36",
    };

    format!("\u{1b}[{}m{}\u{1b}[0m", code_str, text)
}
