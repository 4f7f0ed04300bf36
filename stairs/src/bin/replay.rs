use std::{
    fs::File,
    io::{Read, Write},
    path::PathBuf,
};

use stairs::{
    ConfigError, ConfigPatch, DetectorConfig, IterSource, MotionSample, StairDetector, drive,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, serde::Deserialize)]
struct SampleCsv {
    timestamp_ms: u64,
    vertical_acceleration: Option<f64>,
    tilt_degrees: Option<f64>,
}

impl From<SampleCsv> for MotionSample {
    fn from(
        SampleCsv {
            timestamp_ms,
            vertical_acceleration,
            tilt_degrees,
        }: SampleCsv,
    ) -> Self {
        Self {
            timestamp_ms,
            vertical_acceleration,
            tilt_degrees,
        }
    }
}

#[derive(Debug, clap::Parser)]
pub struct Args {
    /// Input csv file with `timestamp_ms,vertical_acceleration,tilt_degrees` columns
    #[arg(default_value_os_t = std::env::current_dir().unwrap_or_default().join("motion.csv"), required = false)]
    pub input: PathBuf,
    /// Output csv file with one row per step. _Note_: will truncate old file if exists
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Json file with detector thresholds, missing fields keep their defaults
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub window: Option<usize>,
    #[arg(long)]
    pub peak: Option<f64>,
    #[arg(long)]
    pub valley: Option<f64>,
    #[arg(long)]
    pub min_cycle_ms: Option<u64>,
    #[arg(long)]
    pub tilt_min: Option<f64>,
    #[arg(long)]
    pub tilt_max: Option<f64>,
    #[arg(long)]
    pub idle_ms: Option<u64>,
    /// Print steps to stdout
    #[arg(short, long, default_value_t = false, required = false)]
    pub print: bool,
}

impl Args {
    fn patch(&self) -> ConfigPatch {
        ConfigPatch {
            window_size: self.window,
            peak_threshold: self.peak,
            valley_threshold: self.valley,
            min_cycle_time_ms: self.min_cycle_ms,
            tilt_min_degrees: self.tilt_min,
            tilt_max_degrees: self.tilt_max,
            idle_timeout_ms: self.idle_ms,
        }
    }
}

fn load_patch(reader: impl Read) -> Result<ConfigPatch, serde_json::Error> {
    serde_json::from_reader(reader)
}

/// Defaults, then the json file, then command line flags.
fn resolve_config(file: ConfigPatch, cli: ConfigPatch) -> Result<DetectorConfig, ConfigError> {
    if !file.is_empty() {
        info!(?file, "config file overrides");
    }

    if !cli.is_empty() {
        info!(?cli, "command line overrides");
    }

    DetectorConfig::default().merged(&file.and(cli))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = <Args as clap::Parser>::parse();

    let file_patch = match &args.config {
        Some(path) => load_patch(
            File::open(path).map_err(|e| format!("Failed to open config. Reason: {e}"))?,
        )
        .map_err(|e| format!("Failed to parse config. Reason: {e}"))?,
        None => ConfigPatch::default(),
    };

    let config = resolve_config(file_patch, args.patch())
        .map_err(|e| format!("Invalid detector config. Reason: {e}"))?;

    let mut rdr = csv::Reader::from_reader(
        File::open(&args.input).map_err(|e| format!("Failed to read input file. Reason: {e}"))?,
    );

    let samples = rdr
        .deserialize::<SampleCsv>()
        .map(|this| this.map(MotionSample::from))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("Failed to parse input file. Reason: {e}"))?;

    println!("Total: {} samples", samples.len());

    let last_timestamp_ms = samples.last().map(|this| this.timestamp_ms);

    let mut detector = StairDetector::new(config)?;
    let events = drive(&mut IterSource::new(samples), &mut detector)?;

    if args.print {
        let io = std::io::stdout();
        let mut io = io.lock();

        io.write_all(b"timestamp_ms,step_count,total_elevation_meters\n")?;

        for event in &events {
            io.write_fmt(format_args!(
                "{},{},{:.2}\n",
                event.timestamp_ms, event.step_count, event.total_elevation_meters
            ))?;
        }
    }

    if let Some(output) = &args.output {
        let mut wrt = csv::Writer::from_path(output)
            .map_err(|e| format!("Failed to create output file. Reason: {e}"))?;

        for event in &events {
            wrt.serialize(event)?;
        }

        println!("Saving to {}", output.to_string_lossy());
        wrt.flush()?;
    }

    let report = detector.snapshot();

    println!(
        "Steps: {} | elevation: {:.2} m | active at {}: {}",
        report.step_count,
        report.total_elevation_meters,
        last_timestamp_ms.unwrap_or_default(),
        report.is_active
    );

    Ok(())
}
