//! Run a small synthetic observation and print per-exposure statistics.
//!
//! Demonstration driver only; real configuration enters the library as
//! plain structured values, not through this CLI.

use std::sync::Arc;

use clap::Parser;
use log::info;

use wayne::detector::{models::NIR_256, seeded_flat_field};
use wayne::exposure::{ExposureConfig, NoiseToggles, PersistenceParams, SubSlicePolicy};
use wayne::instrument::models::NIR_GRISM;
use wayne::photometry::{FlatSpectrum, TransitSource, TrapezoidTransit};
use wayne::scan::ScanProfile;
use wayne::units::{Temperature, TemperatureExt};
use wayne::{FailurePolicy, ObservationPlan, ObservationRunner};

#[derive(Parser, Debug)]
#[command(about = "Synthesize raw detector ramps for a transit observation")]
struct Args {
    /// Number of exposures in the observation
    #[arg(long, default_value_t = 8)]
    exposures: usize,

    /// Exposure duration in seconds
    #[arg(long, default_value_t = 30.0)]
    duration: f64,

    /// Number of non-destructive reads per exposure
    #[arg(long, default_value_t = 4)]
    reads: usize,

    /// Scan rate in pixels per second (0 for staring mode)
    #[arg(long, default_value_t = 0.5)]
    scan_rate: f64,

    /// Transit depth as a fraction, e.g. 0.01 for 1%
    #[arg(long, default_value_t = 0.01)]
    depth: f64,

    /// Global random seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Run exposures across the rayon worker pool
    #[arg(long, default_value_t = false)]
    parallel: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let detector = NIR_256.clone();
    let shape = detector.geometry.shape();

    let read_step = args.duration / args.reads as f64;
    let read_times_s: Vec<f64> = (1..=args.reads).map(|i| i as f64 * read_step).collect();

    let scan = if args.scan_rate > 0.0 {
        ScanProfile::linear(args.scan_rate, args.duration)
    } else {
        ScanProfile::staring()
    };

    let cadence_s = args.duration + 15.0;
    let observation_span = cadence_s * args.exposures as f64;

    let exposure = ExposureConfig {
        detector,
        duration_s: args.duration,
        read_times_s,
        scan,
        flat_field: seeded_flat_field(shape, 0.015, args.seed),
        temperature: Temperature::from_celsius(-128.0),
        cosmic_ray_rate: 1.5,
        sub_slice: SubSlicePolicy::default(),
        noise: NoiseToggles::all(),
        intrapixel_amplitude: 0.01,
        persistence: PersistenceParams::default(),
    };

    let spectrum = Arc::new(
        FlatSpectrum::new(1100.0, 1680.0, 4.0e4, 120).expect("valid spectrum parameters"),
    );
    let transit = TrapezoidTransit::new(
        observation_span / 2.0,
        args.depth,
        observation_span / 2.0,
        observation_span / 12.0,
        observation_span,
    );
    let source = TransitSource::new(spectrum, Arc::new(transit));

    let plan = ObservationPlan {
        exposure,
        n_exposures: args.exposures,
        start_time_s: 0.0,
        cadence_s,
        seed: args.seed,
        failure_policy: FailurePolicy::SkipExposure,
        parallel: args.parallel,
    };

    let runner = ObservationRunner::new(plan, source, NIR_GRISM.clone());
    let observation = match runner.run() {
        Ok(observation) => observation,
        Err(e) => {
            eprintln!("observation failed: {e}");
            std::process::exit(1);
        }
    };

    info!("seed {} produced {} exposures", observation.global_seed(), observation.len());
    println!("exposure  start[s]  reads  electrons       saturated");
    for frames in observation.completed() {
        println!(
            "{:>8}  {:>8.1}  {:>5}  {:>14.1}  {:>9}",
            frames.index,
            frames.start_time_s,
            frames.n_reads(),
            frames.total_electrons(),
            frames.saturated_pixels(),
        );
    }
    if observation.failed_count() > 0 {
        println!("{} exposure(s) failed", observation.failed_count());
    }
}
