use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::info;

use parabolica::cache::{CacheConfig, TelemetryCache};
use parabolica::errors::ParabolicaError;
use parabolica::export;
use parabolica::geometry::{CurveBuilder, CurveConfig, CurveType, Normalizer};
use parabolica::telemetry::{
    FetchOutcome, JsonlTelemetrySource, SessionKey, SessionType, fetch_in_background,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch session telemetry into the cache and export it as CSV
    Fetch {
        #[arg(long)]
        season: u16,

        #[arg(long)]
        event: String,

        #[arg(long, value_enum, default_value_t = SessionType::Race)]
        session: SessionType,

        /// Three-letter driver code (e.g. VER, HAM)
        #[arg(long)]
        driver: String,

        /// Directory of recorded JSONL session files to replay
        #[arg(short, long)]
        input: PathBuf,

        /// Preferred cache directory; system temp is the fallback
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Where the CSV lands (default: current directory)
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
    /// Build a track curve from an exported telemetry CSV
    Curve {
        #[arg(short, long)]
        input: PathBuf,

        /// Curve geometry JSON for the presentation layer
        #[arg(short, long)]
        output: PathBuf,

        /// Curve object name; defaults to the CSV file stem
        #[arg(long)]
        name: Option<String>,

        #[arg(long, default_value_t = 10.0)]
        scale_factor: f64,

        #[arg(long, value_enum, default_value_t = CurveType::Nurbs)]
        curve_type: CurveType,

        #[arg(long, default_value_t = 0.05)]
        thickness: f64,

        #[arg(long, default_value_t = 12)]
        resolution: u32,

        /// Attach per-point speed for color mapping
        #[arg(long)]
        include_speed: bool,
    },
}

#[allow(clippy::too_many_arguments)]
fn fetch(
    season: u16,
    event: String,
    session: SessionType,
    driver: String,
    input: PathBuf,
    cache_dir: Option<PathBuf>,
    output: PathBuf,
    interrupted: Arc<AtomicBool>,
) -> Result<(), ParabolicaError> {
    let key = SessionKey::new(season, event, session, driver)?;
    let cache = Arc::new(match cache_dir {
        Some(dir) => TelemetryCache::new(CacheConfig::with_cache_dir(dir))?,
        None => TelemetryCache::new_default()?,
    });
    if cache.used_fallback() {
        info!("Using fallback cache directory {:?}", cache.active_dir());
    }

    let source = JsonlTelemetrySource::new(input);
    let handle = fetch_in_background(source, Arc::clone(&cache), key.clone());

    let seq = loop {
        if interrupted.load(Ordering::SeqCst) {
            handle.cancel();
        }
        match handle.wait_timeout(Duration::from_millis(100)) {
            Some(FetchOutcome::Completed(seq)) => break seq,
            Some(FetchOutcome::Cancelled) => return Err(ParabolicaError::FetchCancelled),
            Some(FetchOutcome::Failed(e)) => return Err(e),
            None => continue,
        }
    };

    std::fs::create_dir_all(&output).map_err(|e| ParabolicaError::CsvWriteError {
        source: csv::Error::from(e),
    })?;
    let csv_path = output.join(format!("telemetry_{}.csv", key.slug()));
    export::write_csv(&csv_path, &seq)?;
    println!(
        "Fetched {} samples for {}; CSV written to {}",
        seq.len(),
        key,
        csv_path.display()
    );
    Ok(())
}

fn curve(
    input: PathBuf,
    output: PathBuf,
    name: Option<String>,
    config: CurveConfig,
) -> Result<(), ParabolicaError> {
    let seq = export::read_csv(&input)?;
    let name = name.unwrap_or_else(|| {
        input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("track")
            .to_string()
    });

    let track = Normalizer::new().normalize(&seq, &config)?;
    let curve = CurveBuilder::new().build(name, &track, &config)?;

    let file =
        File::create(&output).map_err(|e| ParabolicaError::CurveWriteError { source: e })?;
    serde_json::to_writer_pretty(file, &curve)
        .map_err(|e| ParabolicaError::TelemetrySerializeError { source: e })?;

    println!(
        "Built {:?} curve '{}': {} control points ({}), geometry written to {}",
        curve.curve_type,
        curve.name,
        curve.control_points.len(),
        if curve.cyclic { "closed circuit" } else { "open track" },
        output.display()
    );
    Ok(())
}

fn main() {
    colog::init();

    let cli = Args::parse();

    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupt_flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || {
        println!("Cancelling...");
        interrupt_flag.store(true, Ordering::SeqCst);
    })
    .expect("Could not set Ctrl-C handler");

    match cli.command {
        Commands::Fetch {
            season,
            event,
            session,
            driver,
            input,
            cache_dir,
            output,
        } => {
            fetch(
                season,
                event,
                session,
                driver,
                input,
                cache_dir,
                output,
                interrupted,
            )
            .expect("Error while fetching telemetry");
        }
        Commands::Curve {
            input,
            output,
            name,
            scale_factor,
            curve_type,
            thickness,
            resolution,
            include_speed,
        } => {
            let config = CurveConfig {
                scale_factor,
                curve_type,
                thickness,
                resolution,
                include_speed,
            };
            curve(input, output, name, config).expect("Error while building track curve");
        }
    };
}
