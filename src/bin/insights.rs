//! Insights CLI - Command-line interface for Lifestyle Insights
//!
//! Commands:
//! - analyze: Run every analysis and print the full report
//! - correlate: Rank factor correlations with happiness and stress
//! - compose: Per-day composition of lifestyle metrics
//! - histogram: Fixed-bin distribution of one factor
//! - series: Per-day series of one factor
//! - validate: Validate record shape
//! - doctor: Diagnose configuration and environment
//! - schema: Print input and output schema information

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use lifestyle_insights::catalog::{BuiltinFactor, FactorCatalog};
use lifestyle_insights::ingest::{RecordAdapter, ValidationError};
use lifestyle_insights::types::DailyRecord;
use lifestyle_insights::{
    AnalyticsConfig, AnalyticsError, InsightsProcessor, INSIGHTS_VERSION, PRODUCER_NAME,
};

/// Insights - On-device analytics for daily lifestyle records
#[derive(Parser)]
#[command(name = "insights")]
#[command(version = INSIGHTS_VERSION)]
#[command(about = "Correlate, compose and bin daily lifestyle records", long_about = None)]
struct Cli {
    /// Analytics configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimum valid pairs per correlation (overrides the config file)
    #[arg(long, global = true)]
    min_samples: Option<usize>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every analysis and print the full report
    Analyze {
        #[command(flatten)]
        input: InputArgs,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Pretty-print the report
        #[arg(long)]
        pretty: bool,
    },

    /// Rank factor correlations with happiness and stress
    Correlate {
        #[command(flatten)]
        input: InputArgs,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Per-day composition of lifestyle metrics
    Compose {
        #[command(flatten)]
        input: InputArgs,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,
    },

    /// Fixed-bin distribution of one factor
    Histogram {
        #[command(flatten)]
        input: InputArgs,

        /// Factor id (built-in or custom category id)
        #[arg(short, long)]
        factor: String,

        /// Pretty-print the histogram
        #[arg(long)]
        pretty: bool,
    },

    /// Per-day series of one factor
    Series {
        #[command(flatten)]
        input: InputArgs,

        /// Factor id (built-in or custom category id)
        #[arg(short, long)]
        factor: String,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,
    },

    /// Validate record shape
    Validate {
        #[command(flatten)]
        input: InputArgs,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Output as JSON
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
}

#[derive(clap::Args)]
struct InputArgs {
    /// Input file path (use - for stdin)
    #[arg(short, long, default_value = "-")]
    input: PathBuf,

    /// Input format
    #[arg(long, default_value = "auto")]
    input_format: InputFormat,
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Detect JSON array or NDJSON from the first character
    Auto,
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one item per line)
    Ndjson,
    /// JSON array
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Input schema (daily records)
    Input,
    /// Output schema (insights report)
    Output,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn run(cli: Cli) -> Result<(), InsightsCliError> {
    let Cli {
        config,
        min_samples,
        command,
        ..
    } = cli;
    let processor = || -> Result<InsightsProcessor, InsightsCliError> {
        let config = load_config(config.as_deref(), min_samples)?;
        Ok(InsightsProcessor::with_config(config)?)
    };

    match command {
        Commands::Analyze {
            input,
            output,
            pretty,
        } => cmd_analyze(&processor()?, &input, &output, pretty),

        Commands::Correlate {
            input,
            output_format,
        } => {
            let processor = processor()?;
            let records = read_records(&input)?;
            let results = processor.correlations(&records);
            print!("{}", format_output(&results, &output_format)?);
            Ok(())
        }

        Commands::Compose {
            input,
            output_format,
        } => {
            let processor = processor()?;
            let records = read_records(&input)?;
            let frames = processor.composition(&records);
            print!("{}", format_output(&frames, &output_format)?);
            Ok(())
        }

        Commands::Histogram {
            input,
            factor,
            pretty,
        } => {
            let processor = processor()?;
            let records = read_records(&input)?;
            let histogram = processor.histogram(&records, &factor)?;
            if pretty {
                println!("{}", serde_json::to_string_pretty(&histogram)?);
            } else {
                println!("{}", serde_json::to_string(&histogram)?);
            }
            Ok(())
        }

        Commands::Series {
            input,
            factor,
            output_format,
        } => {
            let processor = processor()?;
            let records = read_records(&input)?;
            let points = processor.series(&records, &factor)?;
            print!("{}", format_output(&points, &output_format)?);
            Ok(())
        }

        Commands::Validate { input, json } => cmd_validate(&input, json),

        Commands::Doctor { json } => cmd_doctor(config.as_deref(), json),

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),
    }
}

fn cmd_analyze(
    processor: &InsightsProcessor,
    input: &InputArgs,
    output: &Path,
    pretty: bool,
) -> Result<(), InsightsCliError> {
    let records = read_records(input)?;
    let report = processor.analyze(&records);
    let output_data = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };

    if output.to_string_lossy() == "-" {
        println!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }
    Ok(())
}

fn cmd_validate(input: &InputArgs, json: bool) -> Result<(), InsightsCliError> {
    let records = parse_records(input)?;
    let results = RecordAdapter::validate_records(&records);

    let report = ValidationReport {
        total_records: records.len(),
        valid_records: records.len() - results.len(),
        invalid_records: results.len(),
        errors: results
            .iter()
            .map(|r| ValidationErrorDetail {
                index: r.index,
                record_id: r.record_id.clone(),
                error: r.error.to_string(),
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
                let id = if err.record_id.is_empty() {
                    "unknown"
                } else {
                    err.record_id.as_str()
                };
                println!("  - Record {} (index {}): {}", id, err.index, err.error);
            }
        }
    }

    if report.invalid_records > 0 {
        Err(InsightsCliError::ValidationFailed(report.invalid_records))
    } else {
        Ok(())
    }
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), InsightsCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "insights_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Insights version {}", INSIGHTS_VERSION),
    });

    checks.push(DoctorCheck {
        name: "builtin_factors".to_string(),
        status: CheckStatus::Ok,
        message: format!(
            "{} built-in factors ({} correlatable)",
            BuiltinFactor::ALL.len(),
            FactorCatalog::build(&[]).correlatable().len()
        ),
    });

    if let Some(config_path) = config {
        if config_path.exists() {
            match fs::read_to_string(config_path) {
                Ok(content) => match AnalyticsConfig::from_json(&content) {
                    Ok(config) => checks.push(DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Ok,
                        message: format!(
                            "Config valid (min_samples {}, {} composition metrics, {} histogram overrides)",
                            config.min_samples,
                            config.composition_metrics.len(),
                            config.histogram_overrides.len()
                        ),
                    }),
                    Err(e) => checks.push(DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Error,
                        message: format!("Invalid config: {}", e),
                    }),
                },
                Err(e) => checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Cannot read config file: {}", e),
                }),
            }
        } else {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Config file does not exist; defaults will be used".to_string(),
            });
        }
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (pass --input <file>)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (records can be piped in)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: INSIGHTS_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Insights Doctor Report");
        println!("======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(InsightsCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), InsightsCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", get_input_json_schema());
            } else {
                println!("Input: daily records (JSON array or NDJSON)");
                println!();
                println!("Required:");
                println!("- id, date (YYYY-MM-DD or RFC 3339)");
                println!("- exercise, alcohol, substance, meditation (booleans)");
                println!();
                println!("Optional numbers (null or absent = missing):");
                println!("- sleep_hours, sleep_quality, exercise_minutes, alcohol_units");
                println!("- substance_amount, meditation_minutes, social_hours, work_hours");
                println!("- meals, food_quality, stress_level (1-10), happiness (1-10)");
                println!();
                println!("custom_values: [{{ category_id, name?, value?, kind: numeric|scale|boolean }}]");
                println!();
                println!("Built-in factors:");
                for factor in BuiltinFactor::ALL {
                    println!("  {:<20} {}", factor.id(), factor.display_name());
                }
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", get_output_json_schema());
            } else {
                println!("Output: insights report");
                println!();
                println!("- producer: {{ name, version, instance_id }}");
                println!("- computed_at_utc, record_count, day_count");
                println!("- correlations: [{{ factor_id, display_name, kind,");
                println!("    correlation_with_happiness, correlation_with_stress?,");
                println!("    happiness_samples, stress_samples? }}] ranked by |r|");
                println!("- composition: [{{ date, has_data, proportions: [{{ metric_id, proportion }}] }}]");
                println!("- histograms: [{{ factor_id, labels, counts, total }}]");
            }
        }
    }

    Ok(())
}

// Helper functions

fn load_config(
    path: Option<&Path>,
    min_samples: Option<usize>,
) -> Result<AnalyticsConfig, InsightsCliError> {
    let mut config = match path {
        Some(path) => AnalyticsConfig::from_json(&fs::read_to_string(path)?)?,
        None => AnalyticsConfig::default(),
    };
    if let Some(min_samples) = min_samples {
        config.min_samples = min_samples;
    }
    Ok(config)
}

fn parse_records(input: &InputArgs) -> Result<Vec<DailyRecord>, InsightsCliError> {
    let input_data = if input.input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(&input.input)?
    };

    let records = match input.input_format {
        InputFormat::Auto => RecordAdapter::parse_auto(&input_data)?,
        InputFormat::Ndjson => RecordAdapter::parse_ndjson(&input_data)?,
        InputFormat::Json => RecordAdapter::parse_array(&input_data)?,
    };
    Ok(records)
}

fn read_records(input: &InputArgs) -> Result<Vec<DailyRecord>, InsightsCliError> {
    let records = parse_records(input)?;
    if records.is_empty() {
        return Err(InsightsCliError::NoRecords);
    }
    if let Some(failure) = RecordAdapter::validate_records(&records).into_iter().next() {
        return Err(InsightsCliError::Validation(failure.error));
    }
    Ok(records)
}

fn format_output<T: Serialize>(items: &[T], format: &OutputFormat) -> Result<String, InsightsCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for item in items {
                lines.push(serde_json::to_string(item)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(items)? + "\n"),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(items)? + "\n"),
    }
}

fn get_input_json_schema() -> String {
    let optional_number = serde_json::json!({ "type": ["number", "null"] });
    let rating = serde_json::json!({ "type": ["number", "null"], "minimum": 1, "maximum": 10 });

    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "lifestyle.daily_record",
        "description": "One user-entered day of lifestyle data",
        "type": "object",
        "required": ["id", "date", "exercise", "alcohol", "substance", "meditation"],
        "properties": {
            "id": { "type": "string", "minLength": 1 },
            "date": { "type": "string", "description": "YYYY-MM-DD or RFC 3339" },
            "sleep_hours": optional_number,
            "sleep_quality": optional_number,
            "exercise": { "type": "boolean" },
            "exercise_minutes": optional_number,
            "alcohol": { "type": "boolean" },
            "alcohol_units": optional_number,
            "substance": { "type": "boolean" },
            "substance_amount": optional_number,
            "meditation": { "type": "boolean" },
            "meditation_minutes": optional_number,
            "social_hours": optional_number,
            "work_hours": optional_number,
            "meals": optional_number,
            "food_quality": optional_number,
            "stress_level": rating,
            "happiness": rating,
            "notes": { "type": ["string", "null"] },
            "custom_values": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["category_id", "kind"],
                    "properties": {
                        "category_id": { "type": "string", "minLength": 1 },
                        "name": { "type": ["string", "null"] },
                        "value": optional_number,
                        "kind": { "type": "string", "enum": ["numeric", "scale", "boolean"] }
                    }
                }
            }
        }
    })
    .to_string()
}

fn get_output_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "lifestyle.insights_report",
        "type": "object",
        "required": ["producer", "computed_at_utc", "record_count", "day_count", "correlations", "composition", "histograms"],
        "properties": {
            "producer": {
                "type": "object",
                "required": ["name", "version", "instance_id"],
                "properties": {
                    "name": { "type": "string" },
                    "version": { "type": "string" },
                    "instance_id": { "type": "string", "format": "uuid" }
                }
            },
            "computed_at_utc": { "type": "string", "format": "date-time" },
            "record_count": { "type": "integer", "minimum": 0 },
            "day_count": { "type": "integer", "minimum": 0 },
            "correlations": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["factor_id", "kind", "correlation_with_happiness", "happiness_samples"],
                    "properties": {
                        "factor_id": { "type": "string" },
                        "display_name": { "type": "string" },
                        "kind": { "type": "string", "enum": ["numeric", "boolean"] },
                        "correlation_with_happiness": { "type": "number", "minimum": -1, "maximum": 1 },
                        "correlation_with_stress": { "type": "number", "minimum": -1, "maximum": 1 },
                        "happiness_samples": { "type": "integer" },
                        "stress_samples": { "type": "integer" }
                    }
                }
            },
            "composition": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["date", "has_data", "proportions"],
                    "properties": {
                        "date": { "type": "string", "format": "date" },
                        "has_data": { "type": "boolean" },
                        "proportions": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "metric_id": { "type": "string" },
                                    "proportion": { "type": "number" }
                                }
                            }
                        }
                    }
                }
            },
            "histograms": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["labels", "counts", "total"],
                    "properties": {
                        "factor_id": { "type": "string" },
                        "labels": { "type": "array", "items": { "type": "string" } },
                        "counts": { "type": "array", "items": { "type": "integer", "minimum": 0 } },
                        "total": { "type": "integer", "minimum": 0 }
                    }
                }
            }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum InsightsCliError {
    Io(io::Error),
    Analytics(AnalyticsError),
    Json(serde_json::Error),
    Validation(ValidationError),
    NoRecords,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for InsightsCliError {
    fn from(e: io::Error) -> Self {
        InsightsCliError::Io(e)
    }
}

impl From<AnalyticsError> for InsightsCliError {
    fn from(e: AnalyticsError) -> Self {
        InsightsCliError::Analytics(e)
    }
}

impl From<serde_json::Error> for InsightsCliError {
    fn from(e: serde_json::Error) -> Self {
        InsightsCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<InsightsCliError> for CliError {
    fn from(e: InsightsCliError) -> Self {
        match e {
            InsightsCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            InsightsCliError::Analytics(e) => {
                let (code, hint) = match &e {
                    AnalyticsError::UnknownFactor(_) => (
                        "UNKNOWN_FACTOR",
                        "Run 'insights schema input' to list factor ids",
                    ),
                    AnalyticsError::UnsupportedFactor(_) => (
                        "UNSUPPORTED_FACTOR",
                        "Histograms need a numeric factor",
                    ),
                    AnalyticsError::InvalidConfig(_) | AnalyticsError::InvalidBinning(_) => (
                        "CONFIG_ERROR",
                        "Run 'insights doctor --config <file>' for details",
                    ),
                    _ => ("PARSE_ERROR", "Ensure input matches 'insights schema input'"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            InsightsCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            InsightsCliError::Validation(e) => CliError {
                code: "VALIDATION_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'insights validate' for details".to_string()),
            },
            InsightsCliError::NoRecords => CliError {
                code: "NO_RECORDS".to_string(),
                message: "No records found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            InsightsCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} records failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            InsightsCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(Serialize)]
struct ValidationReport {
    total_records: usize,
    valid_records: usize,
    invalid_records: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(Serialize)]
struct ValidationErrorDetail {
    index: usize,
    record_id: String,
    error: String,
}

#[derive(Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
