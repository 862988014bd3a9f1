// Command-line front end for oxircs.
//
// Flat option set: the sources are either snapshot files of one logical
// file (oldest first) or, with `--recurse`, a single directory tree. Each
// invocation either imports (writes revision files) or generates a commit
// information document for later editing.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Parser, ValueEnum, ValueHint};

use crate::delta::{DEFAULT_DIFF_PROGRAM, DiffBackend};
use crate::error::ImportError;
use crate::group::find_copies;
use crate::io::{ImportOptions, ImportStats, import_to_path, import_to_writer, import_tree};
use crate::meta::{History, MetadataResolver, NullResolver};
use crate::rcs::DEFAULT_COMMENT_LEADER;

const BUF_SIZE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Build RCS revision files from numbered backup copies.
#[derive(Parser, Debug)]
#[command(
    name = "oxircs",
    version,
    about = "Build RCS revision files from numbered backup copies",
    arg_required_else_help = true
)]
struct Cli {
    /// Snapshot files, oldest first (or one directory with --recurse).
    #[arg(required = true, value_name = "SOURCE", value_hint = ValueHint::AnyPath)]
    sources: Vec<PathBuf>,

    /// Output file (default: stdout), or output directory with --recurse.
    #[arg(short = 'o', long, value_hint = ValueHint::AnyPath)]
    output: Option<PathBuf>,

    /// Treat the single source as a directory tree and import every file.
    #[arg(short = 'r', long)]
    recurse: bool,

    /// Read author and log messages from a commit information document.
    #[arg(short = 'i', long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    info: Option<PathBuf>,

    /// Only write a commit information document for the sources.
    #[arg(short = 'g', long = "generate-info", conflicts_with = "info")]
    generate_info: bool,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long)]
    force: bool,

    /// Quiet mode (errors only).
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,

    /// Output per-file stats as JSON to stderr.
    #[arg(long = "json")]
    json_output: bool,

    /// Delta backend.
    #[arg(long, value_enum, default_value_t = DiffArg::External)]
    diff: DiffArg,

    /// Program used by the external delta backend.
    #[arg(long = "diff-program", default_value = DEFAULT_DIFF_PROGRAM, value_hint = ValueHint::CommandName)]
    diff_program: PathBuf,

    /// Comment leader written to each file's header.
    #[arg(long, value_name = "LEADER", default_value = DEFAULT_COMMENT_LEADER)]
    comment: String,

    /// Descriptive text written to each file.
    #[arg(long, value_name = "TEXT")]
    description: Option<String>,

    /// Re-read each written file and check every revision.
    #[arg(long)]
    verify: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DiffArg {
    /// Run an external `diff -n` compatible program.
    External,
    /// In-process line diff.
    Builtin,
}

// ---------------------------------------------------------------------------
// Resolved command + options (flattened from Cli)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Import,
    ImportTree,
    GenerateInfo,
    GenerateTreeInfo,
}

#[derive(Debug)]
struct Options {
    command: Command,
    sources: Vec<PathBuf>,
    output: Option<PathBuf>,
    info: Option<PathBuf>,
    quiet: bool,
    verbose: u8,
    json_output: bool,
    import: ImportOptions,
}

fn resolve_options(cli: Cli) -> Options {
    let command = match (cli.recurse, cli.generate_info) {
        (false, false) => Command::Import,
        (true, false) => Command::ImportTree,
        (false, true) => Command::GenerateInfo,
        (true, true) => Command::GenerateTreeInfo,
    };
    let diff = match cli.diff {
        DiffArg::External => DiffBackend::External {
            program: cli.diff_program,
        },
        DiffArg::Builtin => DiffBackend::Builtin,
    };

    Options {
        command,
        sources: cli.sources,
        output: cli.output,
        info: cli.info,
        quiet: cli.quiet,
        verbose: cli.verbose.min(2),
        json_output: cli.json_output,
        import: ImportOptions {
            diff,
            force: cli.force,
            verify: cli.verify,
            comment: cli.comment,
            description: cli.description.unwrap_or_default(),
        },
    }
}

fn log_filter(opts: &Options) -> &'static str {
    match (opts.quiet, opts.verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    }
}

/// Parse arbitrary arguments without exiting; used by the CLI fuzz target.
#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("oxircs".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let opts = resolve_options(cli);
        let _ = log_filter(&opts);
    }
}

// ---------------------------------------------------------------------------
// Import commands
// ---------------------------------------------------------------------------

fn load_resolver(opts: &Options) -> Result<Box<dyn MetadataResolver>, ImportError> {
    match &opts.info {
        Some(path) => {
            let resolver = History::load(path)?.into_resolver();
            log::debug!(
                "{}: commit information for {} snapshots",
                path.display(),
                resolver.len()
            );
            Ok(Box::new(resolver))
        }
        None => Ok(Box::new(NullResolver)),
    }
}

fn cmd_import(opts: &Options) -> i32 {
    let resolver = match load_resolver(opts) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("oxircs: {e}");
            return 1;
        }
    };

    let result = match &opts.output {
        Some(path) => import_to_path(&opts.sources, path, &*resolver, &opts.import),
        None => import_to_writer(
            &opts.sources,
            io::stdout().lock(),
            &*resolver,
            &opts.import,
        ),
    };

    match result {
        Ok(stats) => {
            report(opts, &[stats]);
            0
        }
        Err(e) => {
            eprintln!("oxircs: {e}");
            1
        }
    }
}

fn cmd_import_tree(opts: &Options) -> i32 {
    let source = match tree_source(opts) {
        Some(dir) => dir,
        None => return 1,
    };
    let output = match &opts.output {
        Some(dir) if dir.is_dir() => dir,
        Some(dir) => {
            eprintln!("oxircs: {}: output directory does not exist", dir.display());
            return 1;
        }
        None => {
            eprintln!("oxircs: --recurse requires an output directory (-o)");
            return 1;
        }
    };

    let resolver = match load_resolver(opts) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("oxircs: {e}");
            return 1;
        }
    };

    match import_tree(source, output, &*resolver, &opts.import) {
        Ok(stats) => {
            log::info!("Imported {} files into {}", stats.len(), output.display());
            report(opts, &stats);
            0
        }
        Err(e) => {
            eprintln!("oxircs: {e}");
            1
        }
    }
}

/// The single source directory of a recursive run.
fn tree_source(opts: &Options) -> Option<&Path> {
    match opts.sources.as_slice() {
        [dir] if dir.is_dir() => Some(dir.as_path()),
        [dir] => {
            eprintln!("oxircs: {}: not a directory", dir.display());
            None
        }
        _ => {
            eprintln!("oxircs: --recurse takes exactly one source directory");
            None
        }
    }
}

fn report(opts: &Options, stats: &[ImportStats]) {
    for s in stats {
        let output = s
            .output
            .as_deref()
            .map_or_else(|| "-".to_string(), |p| p.display().to_string());
        log::debug!(
            "{output}: {} revisions, head {}, {} bytes",
            s.revisions,
            s.head,
            s.bytes_written
        );

        if opts.json_output {
            let json = serde_json::json!({
                "command": "import",
                "output": output,
                "revisions": s.revisions,
                "head": s.head.to_string(),
                "bytes_written": s.bytes_written,
                "sha256": s.output_sha256.as_ref().map(hex),
            });
            eprintln!("{json:#}");
        }
    }
}

fn hex(digest: &[u8; 32]) -> String {
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

// ---------------------------------------------------------------------------
// Commit information generation
// ---------------------------------------------------------------------------

fn cmd_generate_info(opts: &Options, history: History) -> i32 {
    let result = match &opts.output {
        Some(path) => write_history_file(&history, path, opts.import.force),
        None => history
            .write_to(io::stdout().lock())
            .map_err(|e| ImportError::write_failure("-", e)),
    };

    match result {
        Ok(()) => {
            log::info!("Generated {} commits", history.history.len());
            0
        }
        Err(e) => {
            eprintln!("oxircs: {e}");
            1
        }
    }
}

fn write_history_file(history: &History, path: &Path, force: bool) -> Result<(), ImportError> {
    if path.exists() && !force {
        return Err(ImportError::OutputExists {
            path: path.to_path_buf(),
        });
    }
    let file = File::create(path).map_err(|e| ImportError::write_failure(path, e))?;
    history
        .write_to(BufWriter::with_capacity(BUF_SIZE, file))
        .map_err(|e| ImportError::write_failure(path, e))
}

fn cmd_generate_tree_info(opts: &Options) -> i32 {
    let source = match tree_source(opts) {
        Some(dir) => dir,
        None => return 1,
    };
    match find_copies(source) {
        Ok(groups) => {
            let history = History::generate(groups.iter().map(|g| g.copies.as_slice()));
            cmd_generate_info(opts, history)
        }
        Err(e) => {
            eprintln!("oxircs: {e}");
            1
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run() -> ! {
    let cli = Cli::parse();
    let opts = resolve_options(cli);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter(&opts)))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let exit_code = match opts.command {
        Command::Import => cmd_import(&opts),
        Command::ImportTree => cmd_import_tree(&opts),
        Command::GenerateInfo => {
            cmd_generate_info(&opts, History::generate([opts.sources.as_slice()]))
        }
        Command::GenerateTreeInfo => cmd_generate_tree_info(&opts),
    };

    // Flush stdout before exit (process::exit skips destructors).
    let _ = io::stdout().flush();
    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
