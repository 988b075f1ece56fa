//! Amend CLI
//!
//! Plain-text front end for the amendment engine:
//!
//! - `amend parse` prints the merged change plan for an instruction file
//! - `amend apply` runs the plan against a document file, writes the
//!   amended document and its backup, and prints the report
//!
//! Documents use the line format of [`amend_document::text`].

#![allow(missing_docs)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use tracing_subscriber::EnvFilter;

use amend_change::RawChange;
use amend_core::{AmendConfig, ChangePlan, DocumentProcessor, ProcessingReport, TracingSink};
use amend_document::{text, DocumentId, MemoryStore};

/// Id used when the document path has no usable file stem
const FALLBACK_DOCUMENT_ID: &str = "document";

/// Arguments of `amend parse`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseArgs {
    pub instructions: PathBuf,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub no_llm: bool,
}

/// Arguments of `amend apply`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyArgs {
    pub document: PathBuf,
    pub instructions: PathBuf,
    /// Defaults to overwriting `document`
    pub output: Option<PathBuf>,
    /// Defaults to the document path with the backup suffix before the extension
    pub backup: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub no_llm: bool,
}

/// A parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Parse(ParseArgs),
    Apply(ApplyArgs),
}

/// The `amend` command definition
#[must_use]
pub fn command() -> Command {
    Command::new("amend")
        .version(amend_core::VERSION)
        .about("Apply natural-language amendment instructions to a document")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Write logs as JSON lines"),
        )
        .subcommand(
            Command::new("parse")
                .about("Extract and print the change plan without applying it")
                .arg(path_arg("instructions", "Instruction text file").required(true))
                .arg(path_arg("config", "TOML configuration file"))
                .arg(flag_arg("json", "Print the plan as JSON"))
                .arg(flag_arg("no-llm", "Use pattern extraction only")),
        )
        .subcommand(
            Command::new("apply")
                .about("Apply the instructions to a document")
                .arg(path_arg("document", "Document file to amend").required(true))
                .arg(path_arg("instructions", "Instruction text file").required(true))
                .arg(path_arg("output", "Where to write the amended document"))
                .arg(path_arg("backup", "Where to write the pre-change backup"))
                .arg(path_arg("config", "TOML configuration file"))
                .arg(flag_arg("json", "Print the report as JSON"))
                .arg(flag_arg("no-llm", "Use pattern extraction only")),
        )
}

fn path_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .value_name("FILE")
        .value_parser(value_parser!(PathBuf))
        .help(help)
}

fn flag_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).action(ArgAction::SetTrue).help(help)
}

impl Invocation {
    /// Interpret matches produced by [`command`]
    ///
    /// # Errors
    /// Returns error when no subcommand or a required path is missing.
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        match matches.subcommand() {
            Some(("parse", args)) => Ok(Self::Parse(ParseArgs {
                instructions: required_path(args, "instructions")?,
                config: args.get_one::<PathBuf>("config").cloned(),
                json: args.get_flag("json"),
                no_llm: args.get_flag("no-llm"),
            })),
            Some(("apply", args)) => Ok(Self::Apply(ApplyArgs {
                document: required_path(args, "document")?,
                instructions: required_path(args, "instructions")?,
                output: args.get_one::<PathBuf>("output").cloned(),
                backup: args.get_one::<PathBuf>("backup").cloned(),
                config: args.get_one::<PathBuf>("config").cloned(),
                json: args.get_flag("json"),
                no_llm: args.get_flag("no-llm"),
            })),
            Some((other, _)) => bail!("unknown command: {other}"),
            None => bail!("no command given"),
        }
    }
}

fn required_path(args: &ArgMatches, name: &str) -> Result<PathBuf> {
    args.get_one::<PathBuf>(name)
        .cloned()
        .with_context(|| format!("--{name} is required"))
}

/// Install the global tracing subscriber
///
/// Honours `RUST_LOG`, defaulting to `info`. Logs go to stderr so stdout
/// stays clean for plans and reports.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(err) = installed {
        eprintln!("warning: logging not initialised: {err}");
    }
}

/// Configuration from `path` (or defaults), with the semantic pass
/// switched off when `no_llm` is set
///
/// # Errors
/// Returns error when the configuration file cannot be read or parsed.
pub fn load_config(path: Option<&Path>, no_llm: bool) -> Result<AmendConfig> {
    let config = match path {
        Some(path) => AmendConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => AmendConfig::default(),
    };
    if no_llm {
        let semantic = config.semantic.clone().with_enabled(false);
        return Ok(config.with_semantic(semantic));
    }
    Ok(config)
}

/// Processor over `store`, with the semantic pass when it can be built
///
/// A missing API key or bad client setup is logged and the run continues
/// with pattern extraction only.
pub fn build_processor(store: Arc<MemoryStore>, config: AmendConfig) -> DocumentProcessor {
    let semantic = match config.semantic.extractor() {
        Ok(extractor) => extractor,
        Err(err) => {
            tracing::warn!(error = %err, "semantic extraction disabled, using pattern extraction only");
            None
        }
    };

    let processor = DocumentProcessor::new(store, config).with_progress(Arc::new(TracingSink));
    match semantic {
        Some(extractor) => processor.with_semantic(extractor),
        None => processor,
    }
}

/// Run `amend parse`, printing the plan to `out`
///
/// # Errors
/// Returns error when inputs cannot be read or output cannot be written.
pub async fn run_parse(args: &ParseArgs, out: &mut dyn Write) -> Result<ChangePlan> {
    let instructions = read_file(&args.instructions)?;
    let config = load_config(args.config.as_deref(), args.no_llm)?;
    let processor = build_processor(Arc::new(MemoryStore::new()), config);

    let plan = processor.plan(&instructions).await;
    write_plan(&plan, args.json, out)?;
    Ok(plan)
}

/// Run `amend apply`, writing the backup, the amended document and the
/// report
///
/// # Errors
/// Returns error when inputs cannot be read, the backup cannot be taken or
/// output cannot be written. Failed changes are not errors; they are listed
/// in the report.
pub async fn run_apply(args: &ApplyArgs, out: &mut dyn Write) -> Result<ProcessingReport> {
    let source = read_file(&args.document)?;
    let document = text::parse(&source)
        .with_context(|| format!("failed to parse document {}", args.document.display()))?;
    let instructions = read_file(&args.instructions)?;
    let config = load_config(args.config.as_deref(), args.no_llm)?;
    let backup_suffix = config.backup_suffix.clone();

    let id = document_id(&args.document);
    let store = Arc::new(MemoryStore::new());
    store.insert(id.clone(), document);

    let processor = build_processor(Arc::clone(&store), config);
    let report = processor.process(&id, &instructions).await?;

    let backup = args
        .backup
        .clone()
        .unwrap_or_else(|| backup_path(&args.document, &backup_suffix));
    let output = args.output.clone().unwrap_or_else(|| args.document.clone());
    save(&store, &report.backup_document_id, &backup)?;
    save(&store, &report.processed_document_id, &output)?;
    tracing::info!(output = %output.display(), backup = %backup.display(), "documents written");

    write_report(&report, args.json, out)?;
    Ok(report)
}

/// Document id derived from the file stem
#[must_use]
pub fn document_id(path: &Path) -> DocumentId {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(FALLBACK_DOCUMENT_ID);
    DocumentId::new(stem)
}

/// `dir/name.txt` becomes `dir/name{suffix}.txt`
#[must_use]
pub fn backup_path(document: &Path, suffix: &str) -> PathBuf {
    let stem = document_id(document);
    let name = match document.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}{suffix}.{ext}"),
        None => format!("{stem}{suffix}"),
    };
    document.with_file_name(name)
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn save(store: &MemoryStore, id: &DocumentId, path: &Path) -> Result<()> {
    let document = store
        .get(id)
        .with_context(|| format!("document {id} missing from store"))?;
    std::fs::write(path, text::render(&document))
        .with_context(|| format!("failed to write {}", path.display()))
}

fn write_plan(plan: &ChangePlan, json: bool, out: &mut dyn Write) -> Result<()> {
    if json {
        let changes: Vec<RawChange> = plan.changes.iter().map(RawChange::from).collect();
        let value = serde_json::json!({
            "changes": changes,
            "pattern_candidates": plan.pattern_candidates,
            "semantic_candidates": plan.semantic_candidates,
            "token_usage": plan.usage,
            "warnings": plan.warnings,
        });
        writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
        return Ok(());
    }

    for change in &plan.changes {
        writeln!(
            out,
            "{}  {:<18}  {}",
            change.change_id,
            change.operation().to_string(),
            change.description
        )?;
    }
    writeln!(
        out,
        "{} changes ({} from patterns, {} from the language model)",
        plan.len(),
        plan.pattern_candidates,
        plan.semantic_candidates
    )?;
    for warning in &plan.warnings {
        writeln!(out, "warning: {warning}")?;
    }
    Ok(())
}

fn write_report(report: &ProcessingReport, json: bool, out: &mut dyn Write) -> Result<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(report)?)?;
        return Ok(());
    }

    for outcome in &report.changes {
        let detail = match (outcome.details.error, outcome.details.message.as_deref()) {
            (Some(code), Some(message)) => format!("{code}: {message}"),
            (Some(code), None) => code.to_string(),
            (None, Some(message)) => message.to_string(),
            (None, None) => String::new(),
        };
        writeln!(
            out,
            "{}  {:<7}  {}  {}",
            outcome.change_id, outcome.status.to_string(), outcome.description, detail
        )?;
    }
    writeln!(out, "{}", report.summary())?;
    if let Some(ref warning) = report.warning {
        writeln!(out, "warning: {warning}")?;
    }
    Ok(())
}
