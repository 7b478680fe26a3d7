//! flowscope entrypoint: run one detector over a flow or packet file and
//! write its alerts to the configured sink.

use clap::Parser;
use flowscope::{
    config::EngineConfig,
    detectors::{self, DetectorKind, Epoching},
    ingest::{self, InputFormat, IngestStats, PacketReader, WaltsReader},
    logging::StructuredLogger,
    sink::{self, OutputFormat},
};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "flowscope", version, about = "Windowed anomaly detection over network flows")]
struct Cli {
    /// JSON configuration file
    #[arg(long, env = "FLOWSCOPE_CONFIG", default_value = "flowscope.json")]
    config: PathBuf,

    /// Input file (stdin when omitted)
    #[arg(long)]
    input: Option<PathBuf>,

    #[arg(long, value_enum)]
    input_format: Option<InputFormat>,

    #[arg(long, value_enum)]
    detector: Option<DetectorKind>,

    #[arg(long)]
    threshold: Option<i64>,

    /// Window packets into epochs of this width
    #[arg(long)]
    epoch_width: Option<f64>,

    /// Output file (stdout when omitted)
    #[arg(long)]
    output: Option<PathBuf>,

    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Print flush contexts
    #[arg(long)]
    show_reset: bool,
}

impl Cli {
    fn apply(&self, config: &mut EngineConfig) {
        if let Some(path) = &self.input {
            config.input.path = Some(path.clone());
        }
        if let Some(format) = self.input_format {
            config.input.format = format;
        }
        if let Some(kind) = self.detector {
            config.detector.kind = kind;
        }
        if let Some(threshold) = self.threshold {
            config.detector.threshold = Some(threshold);
        }
        if let Some(width) = self.epoch_width {
            config.detector.epoch = Some(Epoching::Windowed { width });
        }
        if let Some(path) = &self.output {
            config.output.path = Some(path.clone());
        }
        if let Some(format) = self.format {
            config.output.format = format;
        }
        if self.show_reset {
            config.output.show_reset = true;
        }
        // Flow rows carry their epoch; the detector must not window them again.
        if config.input.format == InputFormat::WaltsCsv {
            config.detector.epoch_field = config.input.epoch_field.clone();
            if config.detector.epoch.is_none() {
                config.detector.epoch = Some(Epoching::Stamped);
            }
        }
    }
}

fn open_input(config: &EngineConfig) -> io::Result<Box<dyn BufRead>> {
    Ok(match &config.input.path {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(io::stdin().lock()),
    })
}

fn run(config: &EngineConfig) -> Result<IngestStats, Box<dyn std::error::Error + Send + Sync>> {
    let out = sink::build(&config.output, &config.detector.epoch_field)?;
    let detector = detectors::build(&config.detector, out)?;
    let mut pipeline = detector.into_single();
    let input = open_input(config)?;

    let stats = match config.input.format {
        InputFormat::WaltsCsv => ingest::drive_flows(
            WaltsReader::new(input, config.input.epoch_field.clone()),
            pipeline.as_mut(),
            config.input.on_malformed,
        )?,
        InputFormat::JsonLines => ingest::drive_packets(
            PacketReader::new(input, config.detector.time_field.clone()),
            pipeline.as_mut(),
            config.input.on_malformed,
        )?,
    };
    Ok(stats)
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let mut config = EngineConfig::load(&cli.config)?;
    cli.apply(&mut config);

    StructuredLogger::init(config.log.json, &config.log.level);

    info!(
        detector = config.detector.kind.name(),
        input = ?config.input.path,
        input_format = ?config.input.format,
        output_format = ?config.output.format,
        "flowscope starting"
    );

    let stats = run(&config)?;

    info!(
        rows = stats.rows,
        accepted = stats.accepted,
        skipped = stats.skipped,
        flushes = stats.flushes,
        "flowscope run complete"
    );
    Ok(())
}
