//! Viewpulse CLI - Command-line interface for the view engagement engine
//!
//! Commands:
//! - replay: Re-process a recorded view event log into engagement reports
//! - score: Compute an engagement score from raw counters
//! - schema: Print event-log and report schema information

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use viewpulse::replay::{parse_array, parse_ndjson, replay};
use viewpulse::{EngagementReport, EngagementScore, TrackError, TrackerConfig, PRODUCER_NAME, VERSION};

/// Viewpulse - client-side view engagement measurement engine
#[derive(Parser)]
#[command(name = "viewpulse")]
#[command(author = "Synheart AI Inc")]
#[command(version = VERSION)]
#[command(about = "Measure and score view engagement", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Re-process a recorded view event log into engagement reports
    Replay {
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

        /// Idle threshold in milliseconds
        #[arg(long, default_value = "60000")]
        idle_threshold_ms: u64,

        /// Periodic flush interval in milliseconds
        #[arg(long, default_value = "10000")]
        flush_interval_ms: u64,

        /// Accrual tick interval in milliseconds
        #[arg(long, default_value = "1000")]
        tick_interval_ms: u64,

        /// Ambient page referrer to attach to every report
        #[arg(long)]
        referrer: Option<String>,
    },

    /// Compute an engagement score from raw counters
    Score {
        /// Credited active time in milliseconds
        #[arg(long)]
        duration_ms: u64,

        /// Raw interaction count
        #[arg(long)]
        interactions: u32,

        /// Maximum scroll depth percent (0-100)
        #[arg(long)]
        scroll_depth: u8,

        /// Output the component breakdown as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one event per line)
    Ndjson,
    /// JSON array of events
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one report per line)
    Ndjson,
    /// JSON array of reports
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Recorded event log schema
    Input,
    /// Engagement report schema
    Output,
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();

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

fn run(cli: Cli) -> Result<(), ViewpulseCliError> {
    match cli.command {
        Commands::Replay {
            input,
            output,
            input_format,
            output_format,
            idle_threshold_ms,
            flush_interval_ms,
            tick_interval_ms,
            referrer,
        } => {
            let mut config = TrackerConfig::new()
                .with_idle_threshold_ms(idle_threshold_ms)
                .with_flush_interval_ms(flush_interval_ms)
                .with_tick_interval_ms(tick_interval_ms);
            if let Some(referrer) = referrer {
                config = config.with_referrer(referrer);
            }
            cmd_replay(&input, &output, input_format, output_format, config)
        }

        Commands::Score {
            duration_ms,
            interactions,
            scroll_depth,
            json,
        } => cmd_score(duration_ms, interactions, scroll_depth, json),

        Commands::Schema { schema_type } => cmd_schema(schema_type),
    }
}

fn cmd_replay(
    input: &PathBuf,
    output: &PathBuf,
    input_format: InputFormat,
    output_format: OutputFormat,
    config: TrackerConfig,
) -> Result<(), ViewpulseCliError> {
    let input_data = if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            eprintln!("reading event log from terminal; pipe a log or pass --input <file>");
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let events = match input_format {
        InputFormat::Ndjson => parse_ndjson(&input_data)?,
        InputFormat::Json => parse_array(&input_data)?,
    };

    if events.is_empty() {
        return Err(ViewpulseCliError::NoEvents);
    }

    let reports = replay(&events, config)?;
    let output_data = format_output(&reports, &output_format)?;

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_score(
    duration_ms: u64,
    interactions: u32,
    scroll_depth: u8,
    json: bool,
) -> Result<(), ViewpulseCliError> {
    let score = EngagementScore::compute(duration_ms, interactions, scroll_depth);

    if json {
        println!("{}", serde_json::to_string_pretty(&score)?);
    } else {
        println!("{:.1}", score.total);
    }

    Ok(())
}

fn cmd_schema(schema_type: SchemaType) -> Result<(), ViewpulseCliError> {
    match schema_type {
        SchemaType::Input => {
            println!("Input Schema: recorded view events");
            println!();
            println!("One JSON object per event:");
            println!();
            println!("  timestamp   RFC 3339 instant the event was observed");
            println!("  event_type  shown | hidden | interaction | scroll | unload");
            println!("  item_id     required for shown events");
            println!("  scroll      required for scroll events:");
            println!("              {{ scrollTop, documentHeight, viewportHeight }}");
            println!("  device      optional environment snapshot for shown events");
            println!();
            println!("Live wiring treats a scroll gesture as an interaction too;");
            println!("recorders should emit an interaction record next to each");
            println!("scroll record.");
        }
        SchemaType::Output => {
            println!("Output Schema: engagement reports");
            println!();
            println!("One JSON object per report:");
            println!();
            println!("  viewId            UUID, stable across one session's reports");
            println!("  itemId            item under observation");
            println!("  duration          credited active milliseconds");
            println!("  interactionCount  raw interaction events");
            println!("  scrollDepth       maximum scroll depth percent (0-100)");
            println!("  engagementScore   bounded 0-10 composite, one decimal");
            println!("  viewedAt          session start, RFC 3339");
            println!("  deviceInfo        environment snapshot from session start");
            println!("  referrer          ambient page referrer, when known");
            println!("  finalUpdate       true on the closing report of a session");
            println!();
            println!("Producer: {} {}", PRODUCER_NAME, VERSION);
        }
    }

    Ok(())
}

fn format_output(
    reports: &[EngagementReport],
    format: &OutputFormat,
) -> Result<String, ViewpulseCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for report in reports {
                lines.push(serde_json::to_string(report)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(reports)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(reports)?),
    }
}

// Error types

#[derive(Debug)]
enum ViewpulseCliError {
    Io(io::Error),
    Track(TrackError),
    Json(serde_json::Error),
    NoEvents,
}

impl From<io::Error> for ViewpulseCliError {
    fn from(e: io::Error) -> Self {
        ViewpulseCliError::Io(e)
    }
}

impl From<TrackError> for ViewpulseCliError {
    fn from(e: TrackError) -> Self {
        ViewpulseCliError::Track(e)
    }
}

impl From<serde_json::Error> for ViewpulseCliError {
    fn from(e: serde_json::Error) -> Self {
        ViewpulseCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<ViewpulseCliError> for CliError {
    fn from(e: ViewpulseCliError) -> Self {
        match e {
            ViewpulseCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            ViewpulseCliError::Track(e) => CliError {
                code: "TRACK_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'viewpulse schema input' for the event log format".to_string()),
            },
            ViewpulseCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            ViewpulseCliError::NoEvents => CliError {
                code: "NO_EVENTS".to_string(),
                message: "No events found in input".to_string(),
                hint: Some("Ensure the event log is not empty".to_string()),
            },
        }
    }
}
