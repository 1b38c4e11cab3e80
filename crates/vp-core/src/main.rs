//! vp-core CLI entry point.
//!
//! Fixed-point visit classification (in-person vs. remote) with a
//! sequential, owner-gated model and a hash-chained audit trail.

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use std::io::IsTerminal;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use tracing::field::display;
use vp_common::error::format_error_human;
use vp_common::{Error, OutputFormat, Principal, StructuredError, VisitClass, SCHEMA_VERSION};
use vp_core::audit::{audit_path_in, verify_log, JsonlAuditLog};
use vp_core::config::{load_config, ConfigError, ConfigOptions};
use vp_core::exit_codes::ExitCode;
use vp_core::inference;
use vp_core::lock::DataDirLock;
use vp_core::log_event;
use vp_core::logging::{
    event_names, generate_run_id, get_host_id, init_logging, LogConfig, LogContext, LogFormat,
    Stage,
};
use vp_core::schema::{available_schemas, generate_all_schemas, generate_schema};
use vp_core::store::{resolve_data_dir, JsonFileStore};
use vp_core::{Engine, EvidenceVector, InvocationContext, Proximity};
use vp_math::LikelihoodRatio;

/// Visit Predict - Bayesian visit modality classifier
#[derive(Parser)]
#[command(name = "vp-core")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Directory holding priors.json and engine.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to priors.json
    #[arg(long, global = true)]
    priors: Option<PathBuf>,

    /// Path to engine.json
    #[arg(long, global = true)]
    engine: Option<PathBuf>,

    /// Directory for model state and the audit log
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Identity the command runs as
    #[arg(long, global = true, env = "VP_CALLER")]
    caller: Option<String>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log line format on stderr
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Name the deployment owner (once)
    Init(InitArgs),

    /// Classify a visit and record the decision
    Predict(EvidenceArgs),

    /// Posterior of one class for the given evidence (records nothing)
    Posterior(PosteriorArgs),

    /// Fold one evidence item into the sequential model
    Submit(SubmitArgs),

    /// Submit evidence under the identifier of a numeric evidence type
    SubmitType(SubmitTypeArgs),

    /// Derive a ratio from the workload and submit it (owner only)
    ComplexInference(ComplexInferenceArgs),

    /// Restart the sequential model from a new prior (owner only)
    Reset(ResetArgs),

    /// Show the sequential model state
    State,

    /// Show one ledger entry
    Evidence(EvidenceIndexArgs),

    /// Hand ownership to another principal (owner only)
    TransferOwner(TransferArgs),

    /// Show the current owner
    Owner,

    /// Validate configuration, data directory and audit log
    Check,

    /// Print JSON schemas for configuration and output types
    Schema(SchemaArgs),

    /// Audit log tools
    Audit(AuditArgs),

    /// Print version information
    Version,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Init(_) => "init",
            Commands::Predict(_) => "predict",
            Commands::Posterior(_) => "posterior",
            Commands::Submit(_) => "submit",
            Commands::SubmitType(_) => "submit-type",
            Commands::ComplexInference(_) => "complex-inference",
            Commands::Reset(_) => "reset",
            Commands::State => "state",
            Commands::Evidence(_) => "evidence",
            Commands::TransferOwner(_) => "transfer-owner",
            Commands::Owner => "owner",
            Commands::Check => "check",
            Commands::Schema(_) => "schema",
            Commands::Audit(_) => "audit",
            Commands::Version => "version",
        }
    }
}

#[derive(Args, Debug)]
struct InitArgs {
    /// Principal that will own protected operations
    #[arg(long)]
    owner: String,
}

/// Observed evidence. Omitted channels contribute nothing.
#[derive(Args, Debug, Clone)]
struct EvidenceArgs {
    #[arg(long, value_enum)]
    proximity: Option<Proximity>,

    #[arg(long)]
    confirmation: Option<bool>,

    #[arg(long)]
    prescription: Option<bool>,

    #[arg(long)]
    device_data: Option<bool>,
}

impl EvidenceArgs {
    fn to_vector(&self) -> EvidenceVector {
        EvidenceVector {
            proximity: self.proximity,
            confirmation: self.confirmation,
            prescription: self.prescription,
            device_data: self.device_data,
        }
    }
}

#[derive(Args, Debug)]
struct PosteriorArgs {
    #[arg(long, value_enum)]
    class: VisitClass,

    #[command(flatten)]
    evidence: EvidenceArgs,
}

#[derive(Args, Debug)]
struct SubmitArgs {
    /// Evidence identifier (unique per model)
    #[arg(long)]
    id: String,

    /// Likelihood ratio in scale units (SCALE = 1.0)
    #[arg(long)]
    ratio: u32,
}

#[derive(Args, Debug)]
struct SubmitTypeArgs {
    /// 1 proximity, 2 confirmation, 3 device data, 4 prescription
    #[arg(long = "type", allow_negative_numbers = true)]
    type_code: i64,

    #[arg(long)]
    ratio: u32,
}

#[derive(Args, Debug)]
struct ComplexInferenceArgs {
    #[arg(long)]
    id: String,
}

#[derive(Args, Debug)]
struct ResetArgs {
    /// New prior in scale units
    #[arg(long)]
    prior: u32,
}

#[derive(Args, Debug)]
struct EvidenceIndexArgs {
    #[arg(long)]
    index: usize,
}

#[derive(Args, Debug)]
struct TransferArgs {
    #[arg(long)]
    to: String,
}

#[derive(Args, Debug)]
struct SchemaArgs {
    /// Type name to generate schema for
    #[arg(value_name = "TYPE")]
    type_name: Option<String>,

    /// List available types
    #[arg(long)]
    list: bool,

    /// Generate schemas for all types
    #[arg(long)]
    all: bool,
}

#[derive(Args, Debug)]
struct AuditArgs {
    #[command(subcommand)]
    command: AuditCommands,
}

#[derive(Subcommand, Debug)]
enum AuditCommands {
    /// Check self-hashes and chain links of the audit log
    Verify(VerifyArgs),
}

#[derive(Args, Debug)]
struct VerifyArgs {
    /// Log to verify (defaults to the data directory's log)
    #[arg(long)]
    path: Option<PathBuf>,
}

/// Why a command could not produce its payload.
enum CliError {
    Usage(String),
    Config(ConfigError),
    Engine(Error),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::Config(err)
    }
}

impl From<Error> for CliError {
    fn from(err: Error) -> Self {
        CliError::Engine(err)
    }
}

type CliResult = Result<ExitCode, CliError>;
type CliEngine = Engine<JsonFileStore, JsonlAuditLog>;

/// Engine that holds the data-directory lock for as long as it lives.
///
/// Fields drop in declaration order: the engine goes first, then the lock.
struct LockedEngine {
    engine: CliEngine,
    _lock: DataDirLock,
}

impl Deref for LockedEngine {
    type Target = CliEngine;

    fn deref(&self) -> &CliEngine {
        &self.engine
    }
}

impl DerefMut for LockedEngine {
    fn deref_mut(&mut self) -> &mut CliEngine {
        &mut self.engine
    }
}

fn main() {
    let cli = Cli::parse();

    let log_config = LogConfig::from_env(cli.global.verbose, cli.global.quiet, cli.global.log_format);
    init_logging(&log_config);
    let log = LogContext::new(generate_run_id(), get_host_id());

    log_event!(log, DEBUG, event_names::RUN_STARTED, Stage::Init, "vp-core started",
        command = cli.command.name(),
        format = display(&cli.global.format));

    let global = &cli.global;
    let result = match &cli.command {
        Commands::Init(args) => run_init(global, &log, args),
        Commands::Predict(args) => run_predict(global, &log, args),
        Commands::Posterior(args) => run_posterior(global, &log, args),
        Commands::Submit(args) => run_submit(global, &log, args),
        Commands::SubmitType(args) => run_submit_type(global, &log, args),
        Commands::ComplexInference(args) => run_complex_inference(global, &log, args),
        Commands::Reset(args) => run_reset(global, &log, args),
        Commands::State => run_state(global, &log),
        Commands::Evidence(args) => run_evidence(global, &log, args),
        Commands::TransferOwner(args) => run_transfer(global, &log, args),
        Commands::Owner => run_owner(global, &log),
        Commands::Check => run_check(global),
        Commands::Schema(args) => run_schema(global, args),
        Commands::Audit(args) => match &args.command {
            AuditCommands::Verify(verify) => run_audit_verify(global, verify),
        },
        Commands::Version => {
            print_version(global);
            Ok(ExitCode::Clean)
        }
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(err) => output_error(global, &log, err),
    };

    log_event!(log, DEBUG, event_names::RUN_FINISHED, Stage::Init, "vp-core finished",
        exit_code = exit_code.as_i32());
    std::process::exit(exit_code.as_i32());
}

// ============================================================================
// Plumbing
// ============================================================================

fn config_options(global: &GlobalOpts) -> ConfigOptions {
    ConfigOptions {
        config_dir: global.config.clone(),
        priors_path: global.priors.clone(),
        engine_path: global.engine.clone(),
    }
}

fn data_dir(global: &GlobalOpts) -> Result<PathBuf, CliError> {
    match &global.data_dir {
        Some(dir) => Ok(dir.clone()),
        None => Ok(resolve_data_dir().map_err(Error::from)?),
    }
}

fn invocation(global: &GlobalOpts) -> Result<InvocationContext, CliError> {
    global
        .caller
        .as_deref()
        .map(str::trim)
        .filter(|caller| !caller.is_empty())
        .map(|caller| InvocationContext::now(Principal::new(caller)))
        .ok_or_else(|| CliError::Usage("no caller: pass --caller or set VP_CALLER".to_string()))
}

/// Load configuration, then lock the data directory and open the engine.
///
/// The lock is taken before the first read of stored state or the audit
/// tail, so whole commands run one at a time per data directory.
fn open_engine(global: &GlobalOpts, log: &LogContext) -> Result<LockedEngine, CliError> {
    let config = load_config(&config_options(global))?;
    if config.snapshot.priors_path.is_none() && config.snapshot.engine_path.is_none() {
        log_event!(log, DEBUG, event_names::CONFIG_DEFAULT_USED, Stage::Init,
            "no configuration files found; using built-in defaults");
    }
    log_event!(log, DEBUG, event_names::CONFIG_LOADED, Stage::Init, "configuration loaded",
        config_id = config.snapshot.short_id(),
        scale = config.priors.scale);

    let root = data_dir(global)?;
    let lock = DataDirLock::acquire(&root).map_err(Error::from)?;
    log_event!(log, DEBUG, event_names::STATE_LOCKED, Stage::Persist, "data directory locked",
        path = display(lock.path().display()));

    let store = JsonFileStore::new(&root);
    let sink = JsonlAuditLog::open(audit_path_in(&root)).map_err(Error::from)?;
    let engine = Engine::new(config.priors, config.engine, store, sink)?;
    Ok(LockedEngine {
        engine: engine.with_log_context(log.clone()),
        _lock: lock,
    })
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Print a command payload in the selected format.
///
/// JSON formats get the payload's fields merged into a common envelope.
fn emit(global: &GlobalOpts, command: &str, payload: Value, summary: String, markdown: Vec<String>) {
    let mut response = serde_json::json!({
        "schema_version": SCHEMA_VERSION,
        "command": command,
        "generated_at": chrono::Utc::now().to_rfc3339(),
    });
    if let (Some(envelope), Value::Object(fields)) = (response.as_object_mut(), payload) {
        envelope.extend(fields);
    }

    match global.format {
        OutputFormat::Json => println!("{}", pretty(&response)),
        OutputFormat::Jsonl => println!("{}", response),
        OutputFormat::Summary => println!("{}", summary),
        OutputFormat::Exitcode => {}
        OutputFormat::Md => {
            println!("# vp-core {}", command);
            println!();
            for line in markdown {
                println!("{}", line);
            }
        }
    }
}

fn output_error(global: &GlobalOpts, log: &LogContext, failure: CliError) -> ExitCode {
    let (err, exit_code) = match failure {
        CliError::Usage(message) => (Error::Config(message), ExitCode::ArgsError),
        CliError::Config(config_err) => {
            let exit_code = if config_err.is_version_mismatch() {
                ExitCode::VersionError
            } else if matches!(config_err, ConfigError::Io { .. }) {
                ExitCode::IoError
            } else {
                ExitCode::ArgsError
            };
            log_event!(log, WARN, event_names::CONFIG_ERROR, Stage::Init,
                "configuration rejected",
                error = display(&config_err));
            (Error::from(config_err), exit_code)
        }
        CliError::Engine(err) => {
            let exit_code = ExitCode::for_error(&err);
            if exit_code.is_internal_error() {
                log_event!(log, ERROR, event_names::INTERNAL_ERROR, Stage::Init,
                    "command failed",
                    error = display(&err),
                    code = err.code());
            }
            (err, exit_code)
        }
    };

    match global.format {
        OutputFormat::Json | OutputFormat::Jsonl => {
            let response = serde_json::json!({
                "schema_version": SCHEMA_VERSION,
                "status": "error",
                "exit_code": exit_code.as_i32(),
                "exit_code_name": exit_code.code_name(),
                "error": StructuredError::from(&err),
            });
            if global.format == OutputFormat::Json {
                eprintln!("{}", pretty(&response));
            } else {
                eprintln!("{}", response);
            }
        }
        OutputFormat::Summary => eprintln!("error {}: {}", err.code(), err),
        OutputFormat::Exitcode => {}
        OutputFormat::Md => eprintln!("{}", format_error_human(&err, std::io::stderr().is_terminal())),
    }

    exit_code
}

fn state_lines(state: &vp_core::sequential::ModelSnapshot, scale: u32) -> Vec<String> {
    vec![
        format!("- step: {}", state.step),
        format!("- prior: {} / {}", state.prior, scale),
        format!("- posterior: {} / {}", state.posterior, scale),
        format!("- complexity: {}", state.complexity),
        format!("- evidence: {}", state.evidence_count),
    ]
}

fn state_summary(state: &vp_core::sequential::ModelSnapshot) -> String {
    format!(
        "step={} posterior={} complexity={}",
        state.step, state.posterior, state.complexity
    )
}

// ============================================================================
// Commands
// ============================================================================

fn run_init(global: &GlobalOpts, log: &LogContext, args: &InitArgs) -> CliResult {
    let ctx = invocation(global)?;
    let mut engine = open_engine(global, log)?;
    let owner = Principal::new(args.owner.trim());
    if owner.as_str().is_empty() {
        return Err(CliError::Usage("owner must not be empty".to_string()));
    }
    engine.initialize(&ctx, owner.clone())?;

    emit(
        global,
        "init",
        serde_json::json!({ "owner": owner }),
        format!("owner: {}", owner),
        vec![format!("Owner initialized: `{}`", owner)],
    );
    Ok(ExitCode::Clean)
}

fn run_predict(global: &GlobalOpts, log: &LogContext, args: &EvidenceArgs) -> CliResult {
    let ctx = invocation(global)?;
    let mut engine = open_engine(global, log)?;
    let evidence = args.to_vector();
    let result = engine.predict_visit(&ctx, &evidence)?;
    let scale = engine.scale().get();

    emit(
        global,
        "predict",
        serde_json::json!({
            "scale": scale,
            "evidence": to_json(&evidence),
            "result": to_json(&result),
        }),
        format!(
            "{} ({}/{})",
            result.predicted,
            result.confidence(),
            scale
        ),
        vec![
            format!(
                "Predicted: **{}** ({})",
                result.predicted.label().to_uppercase(),
                result.predicted.describe()
            ),
            String::new(),
            "| class | likelihood | joint | posterior |".to_string(),
            "|-------|-----------:|------:|----------:|".to_string(),
            format!(
                "| pph | {} | {} | {} |",
                result.likelihood.pph, result.joint.pph, result.posterior.pph
            ),
            format!(
                "| ppr | {} | {} | {} |",
                result.likelihood.ppr, result.joint.ppr, result.posterior.ppr
            ),
            String::new(),
            format!("Marginal: {} (scale {})", result.marginal, scale),
        ],
    );
    Ok(ExitCode::Clean)
}

fn run_posterior(global: &GlobalOpts, _log: &LogContext, args: &PosteriorArgs) -> CliResult {
    let config = load_config(&config_options(global))?;
    let evidence = args.evidence.to_vector();
    let posterior = inference::posterior_probability(&config.priors, &evidence, args.class)?;

    emit(
        global,
        "posterior",
        serde_json::json!({
            "class": args.class,
            "posterior": posterior,
            "scale": config.priors.scale,
            "evidence": to_json(&evidence),
        }),
        format!("{}={}", args.class, posterior),
        vec![format!(
            "P({} | evidence) = {} / {}",
            args.class.label().to_uppercase(),
            posterior,
            config.priors.scale
        )],
    );
    Ok(ExitCode::Clean)
}

fn run_submit(global: &GlobalOpts, log: &LogContext, args: &SubmitArgs) -> CliResult {
    let ctx = invocation(global)?;
    let mut engine = open_engine(global, log)?;
    let state = engine.submit_evidence(&ctx, &args.id, LikelihoodRatio::new(args.ratio))?;
    let scale = engine.scale().get();

    emit(
        global,
        "submit",
        serde_json::json!({ "evidence_id": args.id, "state": to_json(&state) }),
        state_summary(&state),
        state_lines(&state, scale),
    );
    Ok(ExitCode::Clean)
}

fn run_submit_type(global: &GlobalOpts, log: &LogContext, args: &SubmitTypeArgs) -> CliResult {
    let ctx = invocation(global)?;
    let mut engine = open_engine(global, log)?;
    let state =
        engine.submit_evidence_by_type(&ctx, args.type_code, LikelihoodRatio::new(args.ratio))?;
    let scale = engine.scale().get();

    emit(
        global,
        "submit-type",
        serde_json::json!({ "evidence_type": args.type_code, "state": to_json(&state) }),
        state_summary(&state),
        state_lines(&state, scale),
    );
    Ok(ExitCode::Clean)
}

fn run_complex_inference(
    global: &GlobalOpts,
    log: &LogContext,
    args: &ComplexInferenceArgs,
) -> CliResult {
    let ctx = invocation(global)?;
    let mut engine = open_engine(global, log)?;
    let outcome = engine.perform_complex_inference(&ctx, &args.id)?;
    let scale = engine.scale().get();

    let mut lines = vec![
        format!("- derived ratio: {}", outcome.ratio),
        format!("- workload iterations: {}", outcome.iterations),
    ];
    lines.extend(state_lines(&outcome.state, scale));
    emit(
        global,
        "complex-inference",
        to_json(&outcome),
        format!("ratio={} {}", outcome.ratio, state_summary(&outcome.state)),
        lines,
    );
    Ok(ExitCode::Clean)
}

fn run_reset(global: &GlobalOpts, log: &LogContext, args: &ResetArgs) -> CliResult {
    let ctx = invocation(global)?;
    let mut engine = open_engine(global, log)?;
    let state = engine.reset_model(&ctx, args.prior)?;
    let scale = engine.scale().get();

    emit(
        global,
        "reset",
        serde_json::json!({ "state": to_json(&state) }),
        state_summary(&state),
        state_lines(&state, scale),
    );
    Ok(ExitCode::Clean)
}

fn run_state(global: &GlobalOpts, log: &LogContext) -> CliResult {
    let ctx = invocation(global)?;
    let engine = open_engine(global, log)?;
    let state = engine.model_state(&ctx)?;
    let scale = engine.scale().get();

    emit(
        global,
        "state",
        serde_json::json!({ "scale": scale, "state": to_json(&state) }),
        state_summary(&state),
        state_lines(&state, scale),
    );
    Ok(ExitCode::Clean)
}

fn run_evidence(global: &GlobalOpts, log: &LogContext, args: &EvidenceIndexArgs) -> CliResult {
    let ctx = invocation(global)?;
    let engine = open_engine(global, log)?;
    let record = engine.evidence_at(&ctx, args.index)?;

    emit(
        global,
        "evidence",
        serde_json::json!({ "index": args.index, "record": to_json(&record) }),
        format!("{} {}", record.id, record.ratio),
        vec![
            format!("- index: {}", args.index),
            format!("- id: `{}`", record.id),
            format!("- ratio: {}", record.ratio),
        ],
    );
    Ok(ExitCode::Clean)
}

fn run_transfer(global: &GlobalOpts, log: &LogContext, args: &TransferArgs) -> CliResult {
    let ctx = invocation(global)?;
    let mut engine = open_engine(global, log)?;
    let new_owner = Principal::new(args.to.trim());
    if new_owner.as_str().is_empty() {
        return Err(CliError::Usage("new owner must not be empty".to_string()));
    }
    let previous = engine.transfer_ownership(&ctx, new_owner.clone())?;

    emit(
        global,
        "transfer-owner",
        serde_json::json!({ "from": previous, "to": new_owner }),
        format!("{} -> {}", previous, new_owner),
        vec![format!("Ownership transferred: `{}` → `{}`", previous, new_owner)],
    );
    Ok(ExitCode::Clean)
}

fn run_owner(global: &GlobalOpts, log: &LogContext) -> CliResult {
    let engine = open_engine(global, log)?;
    let owner = engine.owner()?;

    let summary = match &owner {
        Some(o) => format!("owner: {}", o),
        None => "owner: (none)".to_string(),
    };
    emit(
        global,
        "owner",
        serde_json::json!({ "initialized": owner.is_some(), "owner": owner }),
        summary.clone(),
        vec![summary],
    );
    Ok(ExitCode::Clean)
}

fn run_check(global: &GlobalOpts) -> CliResult {
    let mut checks: Vec<Value> = Vec::new();
    let mut all_ok = true;

    match load_config(&config_options(global)) {
        Ok(config) => {
            let snapshot = &config.snapshot;
            checks.push(serde_json::json!({
                "check": "priors",
                "status": "ok",
                "source": snapshot.priors_path,
                "using_defaults": snapshot.priors_path.is_none(),
                "scale": config.priors.scale,
            }));
            checks.push(serde_json::json!({
                "check": "engine",
                "status": "ok",
                "source": snapshot.engine_path,
                "using_defaults": snapshot.engine_path.is_none(),
                "tenancy": snapshot.summary.tenancy,
                "complexity_overflow": snapshot.summary.complexity_overflow,
            }));
        }
        Err(e) => {
            all_ok = false;
            checks.push(serde_json::json!({
                "check": "config",
                "status": "error",
                "error": e.to_string(),
            }));
        }
    }

    match data_dir(global) {
        Ok(root) => {
            let log_path = audit_path_in(&root);
            checks.push(serde_json::json!({
                "check": "data_dir",
                "status": "ok",
                "path": root.display().to_string(),
                "exists": root.exists(),
            }));
            match verify_log(&log_path) {
                Ok(result) => {
                    all_ok &= result.is_valid;
                    checks.push(serde_json::json!({
                        "check": "audit",
                        "status": if result.is_valid { "ok" } else { "error" },
                        "entries": result.entries_verified,
                        "path": log_path.display().to_string(),
                    }));
                }
                Err(e) => {
                    all_ok = false;
                    checks.push(serde_json::json!({
                        "check": "audit",
                        "status": "error",
                        "error": e.to_string(),
                    }));
                }
            }
        }
        Err(_) => {
            all_ok = false;
            checks.push(serde_json::json!({
                "check": "data_dir",
                "status": "error",
                "error": "no data directory could be determined",
            }));
        }
    }

    let markdown = checks
        .iter()
        .map(|c| {
            let name = c.get("check").and_then(Value::as_str).unwrap_or("?");
            let status = c.get("status").and_then(Value::as_str).unwrap_or("?");
            let symbol = if status == "ok" { "✓" } else { "✗" };
            match c.get("error").and_then(Value::as_str) {
                Some(error) => format!("{} {}: {} ({})", symbol, name, status, error),
                None => format!("{} {}: {}", symbol, name, status),
            }
        })
        .collect();

    emit(
        global,
        "check",
        serde_json::json!({
            "status": if all_ok { "ok" } else { "error" },
            "checks": checks,
        }),
        format!("check: {}", if all_ok { "OK" } else { "FAILED" }),
        markdown,
    );

    Ok(if all_ok {
        ExitCode::Clean
    } else {
        ExitCode::ArgsError
    })
}

fn run_schema(global: &GlobalOpts, args: &SchemaArgs) -> CliResult {
    if args.list || (args.type_name.is_none() && !args.all) {
        let schemas: Vec<Value> = available_schemas()
            .into_iter()
            .map(|(name, description)| serde_json::json!({ "name": name, "description": description }))
            .collect();
        let names = available_schemas()
            .into_iter()
            .map(|(name, _)| name)
            .collect::<Vec<_>>()
            .join(", ");
        let markdown = available_schemas()
            .into_iter()
            .map(|(name, description)| format!("- `{}`: {}", name, description))
            .collect();
        emit(
            global,
            "schema",
            serde_json::json!({ "schemas": schemas }),
            names,
            markdown,
        );
        return Ok(ExitCode::Clean);
    }

    let schema = if args.all {
        to_json(&generate_all_schemas())
    } else {
        let name = args.type_name.as_deref().unwrap_or_default();
        generate_schema(name)
            .ok_or_else(|| CliError::Usage(format!("unknown schema type: {}", name)))?
    };

    // Schemas are printed raw so they can be piped straight into validators.
    match global.format {
        OutputFormat::Exitcode => {}
        OutputFormat::Jsonl => println!("{}", schema),
        _ => println!("{}", pretty(&schema)),
    }
    Ok(ExitCode::Clean)
}

fn run_audit_verify(global: &GlobalOpts, args: &VerifyArgs) -> CliResult {
    let path = match &args.path {
        Some(path) => path.clone(),
        None => audit_path_in(&data_dir(global)?),
    };
    let result = verify_log(&path).map_err(Error::from)?;

    let mut markdown = vec![
        format!("- log: `{}`", path.display()),
        format!("- entries verified: {}", result.entries_verified),
        format!("- state hash: `{}`", result.state_hash),
        format!("- valid: {}", result.is_valid),
    ];
    if let Some(link) = &result.broken_link {
        markdown.push(format!(
            "- broken link at line {}: {:?}",
            link.line, link.break_type
        ));
    }
    for tampered in &result.tampered_entries {
        markdown.push(format!(
            "- tampered entry at line {} (seq {}, {})",
            tampered.line, tampered.seq, tampered.kind
        ));
    }

    emit(
        global,
        "audit verify",
        serde_json::json!({
            "path": path.display().to_string(),
            "verification": to_json(&result),
        }),
        format!(
            "audit: {} ({} entries)",
            if result.is_valid { "valid" } else { "BROKEN" },
            result.entries_verified
        ),
        markdown,
    );

    Ok(if result.is_valid {
        ExitCode::Clean
    } else {
        ExitCode::Rejected
    })
}

fn print_version(global: &GlobalOpts) {
    let version_info = serde_json::json!({
        "schema_version": SCHEMA_VERSION,
        "vp_core_version": env!("CARGO_PKG_VERSION"),
        "rust_version": env!("CARGO_PKG_RUST_VERSION"),
    });

    match global.format {
        OutputFormat::Json => println!("{}", pretty(&version_info)),
        OutputFormat::Jsonl => println!("{}", version_info),
        OutputFormat::Exitcode => {}
        _ => {
            println!("vp-core {}", env!("CARGO_PKG_VERSION"));
            println!("schema version: {}", SCHEMA_VERSION);
        }
    }
}
