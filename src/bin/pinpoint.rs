//! Binary entry point for the pinpoint CLI.
//!
//! Loads a source tree into a cache and answers one query per invocation,
//! printing a single JSON response on stdout. Logs go to stderr.
//!
//! ## Usage
//!
//! ```bash
//! # Where is this Text constructed, given the live ancestor chain?
//! pinpoint --root app locate --type Text --ancestor Padding --ancestor Card
//!
//! # Which element did a click at (120, 48) mean?
//! pinpoint resolve --hit-path hits.json --x 120 --y 48
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;

use pinpoint::cache::SourceCache;
use pinpoint::config::{ConfigOverrides, ResolvedConfig};
use pinpoint::correlator::{ancestor_chain_with_cap, find_occurrences, properties_of};
use pinpoint::error::{OutputErrorCode, PinpointError, PinpointResult};
use pinpoint::geometry::Point;
use pinpoint::loader::{load_directory, LoaderOptions};
use pinpoint::output::{
    emit_response, DefinitionsResponse, ErrorResponse, LocateResponse, OccurrenceInfo,
    OccurrencesResponse, ResolveResponse,
};
use pinpoint::resolver::{HitEntry, SpecificityResolver};
use pinpoint::tracker::{ElementRecord, InstanceKey, InstanceTracker};

// ============================================================================
// CLI Structure
// ============================================================================

/// Map a clicked element back to the source that created it.
#[derive(Parser, Debug)]
#[command(name = "pinpoint", version, about = "Map a clicked element back to its source")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Source root to load (default: current directory).
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Project config file (default: pinpoint.json in the root, if present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// File extension to load, without the dot. Repeatable.
    #[arg(long = "ext", global = true, default_values_t = vec!["dart".to_string()])]
    extensions: Vec<String>,

    /// Glob of root-relative paths to skip. Repeatable.
    #[arg(long, global = true)]
    exclude: Vec<String>,

    /// Maximum ancestor chain length.
    #[arg(long, global = true)]
    ancestor_cap: Option<usize>,

    /// Bounds tolerance for instance lookups.
    #[arg(long, global = true)]
    bounds_tolerance: Option<f64>,

    /// Base confidence of cross-file candidates.
    #[arg(long, global = true)]
    base_confidence: Option<f64>,

    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Log format for tracing output.
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Find the construction site of a type.
    Locate {
        /// Type name to look for.
        #[arg(long = "type")]
        type_name: String,
        /// Observed ancestor, nearest first. Repeatable.
        #[arg(long = "ancestor")]
        ancestors: Vec<String>,
        /// Creation-location hint, e.g. `package:app/widgets/x.dart:12:5`.
        #[arg(long)]
        hint: Option<String>,
        /// Restrict the lookup to one file.
        #[arg(long)]
        file: Option<String>,
    },
    /// Find `class <name> extends` declarations.
    Definitions {
        #[arg(long)]
        name: String,
    },
    /// List every construction site of a type in one file.
    Occurrences {
        #[arg(long)]
        file: String,
        #[arg(long = "type")]
        type_name: String,
    },
    /// Pick the element a click meant from a hit-test path.
    Resolve {
        /// JSON file holding the hit path, innermost entry first.
        #[arg(long)]
        hit_path: PathBuf,
        /// JSON file holding the session's element records (default: the hit path).
        #[arg(long)]
        elements: Option<PathBuf>,
        #[arg(long)]
        x: f64,
        #[arg(long)]
        y: f64,
    },
}

// ============================================================================
// Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level, cli.global.log_format);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::new(&err);

            // Errors go to stdout as JSON like every other response
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel, format: LogFormat) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Execute the CLI command.
fn execute(cli: Cli) -> PinpointResult<()> {
    let global = &cli.global;
    match cli.command {
        Command::Locate {
            type_name,
            ancestors,
            hint,
            file,
        } => execute_locate(global, type_name, ancestors, hint, file),
        Command::Definitions { name } => execute_definitions(global, name),
        Command::Occurrences { file, type_name } => execute_occurrences(global, file, type_name),
        Command::Resolve {
            hit_path,
            elements,
            x,
            y,
        } => execute_resolve(global, &hit_path, elements.as_deref(), Point::new(x, y)),
    }
}

// ============================================================================
// Command Executors
// ============================================================================

fn execute_locate(
    global: &GlobalArgs,
    type_name: String,
    ancestors: Vec<String>,
    hint: Option<String>,
    file: Option<String>,
) -> PinpointResult<()> {
    let (_, cache) = open_cache(global)?;
    let chain = (!ancestors.is_empty()).then_some(ancestors.as_slice());

    let found = match &file {
        Some(path) => {
            if !cache.contains(path) {
                return Err(PinpointError::source_not_found(path.clone()));
            }
            cache.find_in_file(path, &type_name, chain)
        }
        None => cache.find_best_match(&type_name, chain, hint.as_deref()),
    }
    .ok_or_else(|| PinpointError::no_match(type_name.clone()))?;

    emit(&LocateResponse::new(type_name, ancestors, hint, found))
}

fn execute_definitions(global: &GlobalArgs, name: String) -> PinpointResult<()> {
    let (_, cache) = open_cache(global)?;
    let definitions = cache.find_class_definitions(&name);
    emit(&DefinitionsResponse::new(name, definitions))
}

fn execute_occurrences(global: &GlobalArgs, file: String, type_name: String) -> PinpointResult<()> {
    let (config, cache) = open_cache(global)?;
    let source = cache
        .get(&file)
        .ok_or_else(|| PinpointError::source_not_found(file.clone()))?;

    let cap = config.ancestor_cap.value;
    let occurrences = find_occurrences(&source.content, &type_name)
        .iter()
        .map(|occurrence| {
            OccurrenceInfo::new(
                occurrence,
                ancestor_chain_with_cap(&source.content, occurrence.boundary.start_offset, cap),
                properties_of(&occurrence.boundary),
            )
        })
        .collect();

    emit(&OccurrencesResponse::new(
        source.path.clone(),
        type_name,
        occurrences,
    ))
}

fn execute_resolve(
    global: &GlobalArgs,
    hit_path_file: &Path,
    elements_file: Option<&Path>,
    click: Point,
) -> PinpointResult<()> {
    let config = resolve_config(global)?;
    let hit_path: Vec<HitEntry> = read_json(hit_path_file)?;

    let resolver = SpecificityResolver::new(config.config.resolver.clone());
    let ranked = resolver.rank(&hit_path, click);
    let selection = resolver
        .resolve(&hit_path, click)
        .ok_or_else(|| PinpointError::no_match("<hit path>"))?;

    let records: Vec<ElementRecord> = match elements_file {
        Some(path) => read_json(path)?,
        None => hit_path
            .iter()
            .map(|entry| ElementRecord::new(entry.type_name.clone(), entry.id, entry.bounds))
            .collect(),
    };
    let mut tracker = InstanceTracker::new(&config.config.tracker);
    tracker.register_session(&records);
    let identity_key = tracker.identity_key(
        &selection.candidate.type_name,
        &InstanceKey::Identity(selection.candidate.id),
    );

    emit(&ResolveResponse::new(click, selection, identity_key, ranked))
}

// ============================================================================
// Helpers
// ============================================================================

fn source_root(global: &GlobalArgs) -> PathBuf {
    global.root.clone().unwrap_or_else(|| PathBuf::from("."))
}

fn resolve_config(global: &GlobalArgs) -> PinpointResult<ResolvedConfig> {
    let overrides = ConfigOverrides {
        config_file: global.config.clone(),
        ancestor_cap: global.ancestor_cap,
        bounds_tolerance: global.bounds_tolerance,
        base_confidence: global.base_confidence,
    };
    ResolvedConfig::resolve(Some(&source_root(global)), &overrides)
}

/// Resolve configuration and load the source root into a fresh cache.
fn open_cache(global: &GlobalArgs) -> PinpointResult<(ResolvedConfig, SourceCache)> {
    let config = resolve_config(global)?;
    let root = source_root(global);

    let mut cache = SourceCache::with_config(&config.config);
    let options = LoaderOptions {
        extensions: global.extensions.clone(),
        exclude: global.exclude.clone(),
        ..LoaderOptions::default()
    };
    let summary = load_directory(&root, &options, &mut cache)?;
    info!(
        loaded = summary.loaded,
        skipped = summary.skipped,
        "source root {}",
        root.display()
    );
    Ok((config, cache))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> PinpointResult<T> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn emit<T: Serialize>(response: &T) -> PinpointResult<()> {
    emit_response(response, &mut io::stdout())?;
    let _ = io::stdout().flush();
    Ok(())
}
