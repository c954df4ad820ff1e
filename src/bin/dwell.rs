//! dwell CLI - Command-line driver for dwell-rank
//!
//! Commands:
//! - rank: Group page views into sessions and rank pages by dwell time
//! - validate: Validate page view records
//! - schema: Print input/output schema information
//! - check-shape: Check a declared input tuple shape

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};

use dwell_rank::encoder::to_bag_notation;
use dwell_rank::schema::shape::{
    check_view_shape, parse_shape, ranked_bag_declaration, ranking_payload_json_schema,
    render_tuple, view_record_json_schema, VIEW_SHAPE,
};
use dwell_rank::schema::{ViewAdapter, ViewRecord, RECORD_VERSION};
use dwell_rank::{
    DwellProcessor, OrderingPolicy, RankError, RankerConfig, RankingPayload, TieBreak,
    TimestampUnit, DWELL_VERSION,
};

/// Environment variable holding the log filter
const LOG_ENV: &str = "DWELL_LOG";

/// dwell - rank pages of each session by time spent
#[derive(Parser)]
#[command(name = "dwell")]
#[command(version = DWELL_VERSION)]
#[command(about = "Rank session pages by dwell time", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Group page views into sessions and rank each session's pages
    Rank {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Ranker config file (JSON); flags below override it
        #[arg(long)]
        config: Option<PathBuf>,

        /// Fail on decreasing timestamps instead of producing negative durations
        #[arg(long)]
        strict_ordering: bool,

        /// Ordering among pages with equal dwell time
        #[arg(long)]
        tie_break: Option<TieBreakArg>,

        /// Unit for RFC 3339 timestamps
        #[arg(long)]
        timestamp_unit: Option<UnitArg>,

        /// Trust input order within each session instead of sorting by timestamp
        #[arg(long)]
        presorted: bool,
    },

    /// Validate page view records
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Unit for RFC 3339 timestamps
        #[arg(long, default_value = "seconds")]
        timestamp_unit: UnitArg,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },

    /// Check that a declared input tuple, e.g. "(ts:chararray,page:chararray)", is rankable
    CheckShape {
        /// Tuple declaration
        declaration: String,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
    /// Tab-separated `[session]\ttimestamp\tpage` lines
    Tsv,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one payload per session)
    Ndjson,
    /// JSON array of payloads
    Json,
    /// Pretty-printed JSON
    JsonPretty,
    /// One `session<TAB>{(rank,duration,page),...}` line per session
    Bag,
}

#[derive(Clone, Copy, ValueEnum)]
enum TieBreakArg {
    FirstSeen,
    PageName,
}

impl From<TieBreakArg> for TieBreak {
    fn from(arg: TieBreakArg) -> Self {
        match arg {
            TieBreakArg::FirstSeen => TieBreak::FirstSeen,
            TieBreakArg::PageName => TieBreak::PageName,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum UnitArg {
    Seconds,
    Millis,
}

impl From<UnitArg> for TimestampUnit {
    fn from(arg: UnitArg) -> Self {
        match arg {
            UnitArg::Seconds => TimestampUnit::Seconds,
            UnitArg::Millis => TimestampUnit::Millis,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Input schema (dwell.page_view.v1)
    Input,
    /// Output schema (dwell.session_ranking.v1)
    Output,
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), DwellCliError> {
    match cli.command {
        Commands::Rank {
            input,
            output,
            input_format,
            output_format,
            config,
            strict_ordering,
            tie_break,
            timestamp_unit,
            presorted,
        } => {
            let config = build_config(config.as_deref(), strict_ordering, tie_break, timestamp_unit)?;
            cmd_rank(&input, &output, input_format, output_format, config, presorted)
        }

        Commands::Validate {
            input,
            input_format,
            timestamp_unit,
            json,
        } => cmd_validate(&input, input_format, timestamp_unit.into(), json),

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),

        Commands::CheckShape { declaration } => cmd_check_shape(&declaration),
    }
}

fn build_config(
    path: Option<&Path>,
    strict_ordering: bool,
    tie_break: Option<TieBreakArg>,
    timestamp_unit: Option<UnitArg>,
) -> Result<RankerConfig, DwellCliError> {
    let mut config = match path {
        Some(path) => {
            let json = fs::read_to_string(path)?;
            RankerConfig::from_json(&json)?
        }
        None => RankerConfig::default(),
    };

    if strict_ordering {
        config = config.with_ordering(OrderingPolicy::Reject);
    }
    if let Some(tie_break) = tie_break {
        config = config.with_tie_break(tie_break.into());
    }
    if let Some(unit) = timestamp_unit {
        config = config.with_timestamp_unit(unit.into());
    }

    debug!(?config, "ranker config");
    Ok(config)
}

fn cmd_rank(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    config: RankerConfig,
    presorted: bool,
) -> Result<(), DwellCliError> {
    let input_data = read_input(input)?;
    let records = parse_records(&input_data, &input_format)?;

    if records.is_empty() {
        return Err(DwellCliError::NoRecords);
    }

    let mut processor = DwellProcessor::with_config(config);
    let payloads = processor.process_records(&records, presorted)?;
    info!(
        records = records.len(),
        sessions = processor.sessions_processed(),
        "ranked sessions"
    );

    let output_data = format_output(&payloads, &output_format)?;

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_validate(
    input: &Path,
    input_format: InputFormat,
    unit: TimestampUnit,
    json: bool,
) -> Result<(), DwellCliError> {
    let input_data = read_input(input)?;
    let records = parse_records(&input_data, &input_format)?;

    let issues = ViewAdapter::validate_records(&records, unit);

    let report = ValidationReport {
        total_records: records.len(),
        valid_records: records.len() - issues.len(),
        invalid_records: issues.len(),
        errors: issues
            .iter()
            .map(|issue| ValidationErrorDetail {
                index: issue.index,
                session_id: issue.session_id.clone(),
                error: issue.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records:   {}", report.total_records);
        println!("Valid records:   {}", report.valid_records);
        println!("Invalid records: {}", report.invalid_records);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Record {} (session {}): {}",
                    err.index,
                    err.session_id.as_deref().unwrap_or("default"),
                    err.error
                );
            }
        }
    }

    if report.invalid_records > 0 {
        Err(DwellCliError::ValidationFailed(report.invalid_records))
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), DwellCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", serde_json::to_string_pretty(&view_record_json_schema())?);
            } else {
                println!("Input Schema: {}", RECORD_VERSION);
                println!();
                println!("Tuple: {}", render_tuple(VIEW_SHAPE));
                println!();
                println!("Each record is one page view:");
                println!("- session_id: optional session key (records without one share \"default\")");
                println!("- timestamp:  integer, integer string, or RFC 3339 string");
                println!("- page:       non-empty page identifier");
                println!();
                println!("Within a session, views are sorted by timestamp unless --presorted is given.");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", serde_json::to_string_pretty(&ranking_payload_json_schema())?);
            } else {
                println!("Output Schema: {}", dwell_rank::encoder::RANKING_VERSION);
                println!();
                println!("Declared shape: {}", ranked_bag_declaration());
                println!();
                println!("One payload per session:");
                println!("- schema_version, producer {{ name, version, instance_id }}");
                println!("- session_id, computed_at_utc, view_count");
                println!("- pages: [{{ rank, duration, page }}] sorted by duration, descending");
            }
        }
    }

    Ok(())
}

fn cmd_check_shape(declaration: &str) -> Result<(), DwellCliError> {
    let fields = parse_shape(declaration)?;
    check_view_shape(&fields)?;
    println!("OK {} -> {}", render_tuple(&fields), ranked_bag_declaration());
    Ok(())
}

// Helper functions

fn read_input(input: &Path) -> Result<String, DwellCliError> {
    if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err(DwellCliError::InteractiveStdin);
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn parse_records(data: &str, format: &InputFormat) -> Result<Vec<ViewRecord>, DwellCliError> {
    let records = match format {
        InputFormat::Ndjson => ViewAdapter::parse_ndjson(data)?,
        InputFormat::Json => ViewAdapter::parse_array(data)?,
        InputFormat::Tsv => ViewAdapter::parse_tsv(data)?,
    };
    Ok(records)
}

fn format_output(payloads: &[RankingPayload], format: &OutputFormat) -> Result<String, DwellCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for payload in payloads {
                lines.push(serde_json::to_string(payload)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(payloads)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(payloads)?),
        OutputFormat::Bag => {
            let lines: Vec<String> = payloads
                .iter()
                .map(|p| format!("{}\t{}", p.session_id, to_bag_notation(&p.pages)))
                .collect();
            Ok(lines.join("\n") + "\n")
        }
    }
}

// Error types

#[derive(Debug)]
enum DwellCliError {
    Io(io::Error),
    Rank(RankError),
    Json(serde_json::Error),
    NoRecords,
    InteractiveStdin,
    ValidationFailed(usize),
}

impl From<io::Error> for DwellCliError {
    fn from(e: io::Error) -> Self {
        DwellCliError::Io(e)
    }
}

impl From<RankError> for DwellCliError {
    fn from(e: RankError) -> Self {
        DwellCliError::Rank(e)
    }
}

impl From<serde_json::Error> for DwellCliError {
    fn from(e: serde_json::Error) -> Self {
        DwellCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<DwellCliError> for CliError {
    fn from(e: DwellCliError) -> Self {
        match e {
            DwellCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            DwellCliError::Rank(e) => {
                let (code, hint) = match &e {
                    RankError::InvalidOrdering { .. } => (
                        "INVALID_ORDERING",
                        "Drop --strict-ordering/--presorted or fix the upstream sort",
                    ),
                    RankError::SchemaMismatch(_) => (
                        "SCHEMA_MISMATCH",
                        "Declare (timestamp, page) with timestamp as long or chararray and page as chararray",
                    ),
                    RankError::InvalidTimestamp { .. } | RankError::MissingField(_) => {
                        ("VALIDATION_ERROR", "Run 'dwell validate' for details")
                    }
                    _ => ("PARSE_ERROR", "Ensure input matches dwell.page_view.v1 schema"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            DwellCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            DwellCliError::NoRecords => CliError {
                code: "NO_RECORDS".to_string(),
                message: "No page views found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            DwellCliError::InteractiveStdin => CliError {
                code: "NO_INPUT".to_string(),
                message: "stdin is a terminal, nothing to read".to_string(),
                hint: Some("Pipe records in or pass --input <file>".to_string()),
            },
            DwellCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} records failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_records: usize,
    valid_records: usize,
    invalid_records: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    session_id: Option<String>,
    error: String,
}
