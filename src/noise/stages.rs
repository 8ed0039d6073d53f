//! The individual noise-pipeline stages.
//!
//! Each stage is a small value type implementing [`FrameTransform`]; the
//! pipeline owns the ordering. Stochastic stages draw from per-(read,
//! stage) seeds through the chunked parallel helper so results do not
//! depend on thread scheduling.

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, Poisson};

use crate::algo::process_array_in_parallel_chunks;
use crate::detector::FrameState;
use crate::exposure::{ExposureConfig, PersistenceParams};
use crate::scan::ScanProfile;

use super::{FrameTransform, ReadContext};

/// Means below this are sampled from the exact Poisson distribution; above
/// it the Gaussian approximation is both faster and numerically stable.
const POISSON_EXACT_LIMIT: f64 = 20.0;

/// Draw from Poisson(`mean`), switching to the Gaussian approximation for
/// large means.
fn sample_poisson(mean: f64, rng: &mut StdRng) -> f64 {
    if mean <= 0.0 {
        return 0.0;
    }
    if mean < POISSON_EXACT_LIMIT {
        let poisson = Poisson::new(mean).expect("positive finite mean");
        poisson.sample(rng)
    } else {
        let normal = Normal::new(mean, mean.sqrt()).expect("positive finite mean");
        normal.sample(rng).max(0.0)
    }
}

/// Stage 1: per-pixel multiplicative flat-field non-uniformity.
pub struct FlatFieldStage {
    map: Array2<f64>,
}

impl FlatFieldStage {
    pub fn new(map: Array2<f64>) -> Self {
        Self { map }
    }
}

impl FrameTransform for FlatFieldStage {
    fn name(&self) -> &'static str {
        "flat_field"
    }

    fn apply(&self, state: &mut FrameState, _ctx: &ReadContext, _seed: u64) {
        ndarray::Zip::from(&mut state.data)
            .and(&self.map)
            .for_each(|px, &factor| *px *= factor);
    }
}

/// Stage 2: dark-current accumulation, a Poisson draw with mean
/// `rate × elapsed time` per pixel.
pub struct DarkCurrentStage {
    rate_e_s: f64,
}

impl DarkCurrentStage {
    pub fn new(rate_e_s: f64) -> Self {
        Self { rate_e_s }
    }
}

impl FrameTransform for DarkCurrentStage {
    fn name(&self) -> &'static str {
        "dark_current"
    }

    fn apply(&self, state: &mut FrameState, ctx: &ReadContext, seed: u64) {
        let mean = self.rate_e_s * ctx.read_time_s;
        if mean <= 0.0 {
            return;
        }
        state.data = process_array_in_parallel_chunks(
            std::mem::replace(&mut state.data, Array2::zeros((0, 0))),
            seed,
            None,
            |chunk, rng| {
                chunk.iter_mut().for_each(|px| *px += sample_poisson(mean, rng));
            },
        );
    }
}

/// One cosmic-ray impact, drawn once per exposure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CosmicHit {
    pub row: usize,
    pub col: usize,
    /// Impact time, seconds from exposure start
    pub time_s: f64,
    /// Deposited charge, electrons
    pub electrons: f64,
    /// Whether the deposit spills into the 4-neighborhood
    pub cluster: bool,
}

/// Charge range deposited by a single hit, electrons.
const HIT_ELECTRONS_MIN: f64 = 1.0e3;
const HIT_ELECTRONS_MAX: f64 = 3.0e4;

/// Fraction of a clustered hit landing on the impact pixel; the remainder
/// splits evenly over the 4-neighborhood.
const CLUSTER_CORE_FRACTION: f64 = 0.6;

/// Probability that a hit spreads into a small cluster.
const CLUSTER_PROBABILITY: f64 = 0.3;

/// Stage 3: cosmic-ray hits. The hit list is exposure-level state: a hit at
/// time t appears in every read with timestamp ≥ t, making it irreversible
/// within the exposure.
pub struct CosmicRayStage {
    hits: Vec<CosmicHit>,
}

impl CosmicRayStage {
    /// Draw the exposure's hit list from the exposure seed.
    pub fn draw(config: &ExposureConfig, exposure_seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(exposure_seed.wrapping_add(0xC0));
        let (rows, cols) = config.detector.geometry.shape();

        let count = if config.cosmic_ray_rate > 0.0 {
            let poisson = Poisson::new(config.cosmic_ray_rate).expect("validated rate");
            poisson.sample(&mut rng) as usize
        } else {
            0
        };

        let hits = (0..count)
            .map(|_| CosmicHit {
                row: rng.gen_range(0..rows),
                col: rng.gen_range(0..cols),
                time_s: rng.gen_range(0.0..config.duration_s),
                electrons: rng.gen_range(HIT_ELECTRONS_MIN..HIT_ELECTRONS_MAX),
                cluster: rng.gen_bool(CLUSTER_PROBABILITY),
            })
            .collect();

        Self { hits }
    }

    pub fn hits(&self) -> &[CosmicHit] {
        &self.hits
    }
}

impl FrameTransform for CosmicRayStage {
    fn name(&self) -> &'static str {
        "cosmic_rays"
    }

    fn apply(&self, state: &mut FrameState, ctx: &ReadContext, _seed: u64) {
        let (rows, cols) = state.data.dim();
        for hit in &self.hits {
            if hit.time_s > ctx.read_time_s {
                continue;
            }
            if hit.cluster {
                state.data[[hit.row, hit.col]] += hit.electrons * CLUSTER_CORE_FRACTION;
                let spill = hit.electrons * (1.0 - CLUSTER_CORE_FRACTION) / 4.0;
                let neighbors = [
                    (hit.row.wrapping_sub(1), hit.col),
                    (hit.row + 1, hit.col),
                    (hit.row, hit.col.wrapping_sub(1)),
                    (hit.row, hit.col + 1),
                ];
                for (r, c) in neighbors {
                    if r < rows && c < cols {
                        state.data[[r, c]] += spill;
                    }
                }
            } else {
                state.data[[hit.row, hit.col]] += hit.electrons;
            }
        }
    }
}

/// Stage 4: shot noise. Each pixel becomes a Poisson draw governed by its
/// accumulated electron count as the mean.
pub struct ShotNoiseStage;

impl FrameTransform for ShotNoiseStage {
    fn name(&self) -> &'static str {
        "shot_noise"
    }

    fn apply(&self, state: &mut FrameState, _ctx: &ReadContext, seed: u64) {
        state.data = process_array_in_parallel_chunks(
            std::mem::replace(&mut state.data, Array2::zeros((0, 0))),
            seed,
            None,
            |chunk, rng| {
                chunk.iter_mut().for_each(|px| *px = sample_poisson(*px, rng));
            },
        );
    }
}

/// Stage 5: intrapixel sensitivity variation.
///
/// Response dips as the scanned trace centroid approaches pixel
/// boundaries. The correction is a whole-frame factor derived from the
/// scan's sub-pixel phase at the read timestamp; unity when the trace is
/// pixel-centered, `1 − amplitude` at a pixel edge.
pub struct IntrapixelStage {
    amplitude: f64,
    scan: ScanProfile,
}

impl IntrapixelStage {
    pub fn new(amplitude: f64, scan: ScanProfile) -> Self {
        Self { amplitude, scan }
    }

    fn factor_at(&self, time_s: f64) -> f64 {
        let position = self.scan.position_at(time_s);
        let phase = position - position.round();
        1.0 - self.amplitude * (2.0 * phase).powi(2)
    }
}

impl FrameTransform for IntrapixelStage {
    fn name(&self) -> &'static str {
        "intrapixel"
    }

    fn apply(&self, state: &mut FrameState, ctx: &ReadContext, _seed: u64) {
        let factor = self.factor_at(ctx.read_time_s);
        state.data.mapv_inplace(|px| px * factor);
    }
}

/// Stage 6: zero-mean Gaussian read noise, independent per read.
pub struct ReadNoiseStage {
    sigma_e: f64,
}

impl ReadNoiseStage {
    pub fn new(sigma_e: f64) -> Self {
        Self { sigma_e }
    }
}

impl FrameTransform for ReadNoiseStage {
    fn name(&self) -> &'static str {
        "read_noise"
    }

    fn apply(&self, state: &mut FrameState, _ctx: &ReadContext, seed: u64) {
        if self.sigma_e <= 0.0 {
            return;
        }
        let sigma = self.sigma_e;
        state.data = process_array_in_parallel_chunks(
            std::mem::replace(&mut state.data, Array2::zeros((0, 0))),
            seed,
            None,
            |chunk, rng| {
                let dist = Normal::new(0.0, sigma).expect("positive sigma");
                chunk.iter_mut().for_each(|px| *px += dist.sample(rng));
            },
        );
    }
}

/// Stage 7: conversion gain, electrons → ADU.
pub struct GainStage {
    gain_e_per_adu: f64,
}

impl GainStage {
    pub fn new(gain_e_per_adu: f64) -> Self {
        Self { gain_e_per_adu }
    }
}

impl FrameTransform for GainStage {
    fn name(&self) -> &'static str {
        "gain"
    }

    fn requires_non_negative(&self) -> bool {
        false
    }

    fn apply(&self, state: &mut FrameState, _ctx: &ReadContext, _seed: u64) {
        let gain = self.gain_e_per_adu;
        state.data.mapv_inplace(|px| px / gain);
    }
}

/// Stage 8: full-well saturation. Values above the limit are clamped
/// exactly to it and flagged; this models irreversible charge overflow,
/// not wraparound.
pub struct SaturationStage {
    limit: f64,
}

impl SaturationStage {
    pub fn new(limit: f64) -> Self {
        Self { limit }
    }
}

impl FrameTransform for SaturationStage {
    fn name(&self) -> &'static str {
        "saturation"
    }

    fn requires_non_negative(&self) -> bool {
        false
    }

    fn apply(&self, state: &mut FrameState, _ctx: &ReadContext, _seed: u64) {
        ndarray::Zip::from(&mut state.data)
            .and(&mut state.saturated)
            .for_each(|px, flag| {
                if *px > self.limit {
                    *px = self.limit;
                    *flag = true;
                }
            });
    }
}

/// Stage 9: persistence/ramp settling. Charge traps suppress the response
/// early in the exposure and settle exponentially.
pub struct PersistenceStage {
    params: PersistenceParams,
}

impl PersistenceStage {
    pub fn new(params: PersistenceParams) -> Self {
        Self { params }
    }

    fn factor_at(&self, time_s: f64) -> f64 {
        1.0 - self.params.amplitude * (-time_s / self.params.timescale_s).exp()
    }
}

impl FrameTransform for PersistenceStage {
    fn name(&self) -> &'static str {
        "persistence"
    }

    fn requires_non_negative(&self) -> bool {
        false
    }

    fn apply(&self, state: &mut FrameState, ctx: &ReadContext, _seed: u64) {
        let factor = self.factor_at(ctx.read_time_s);
        state.data.mapv_inplace(|px| px * factor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{
        uniform_flat_field, DarkCurrentModel, DetectorConfig, DetectorGeometry,
    };
    use crate::exposure::config::{NoiseToggles, SubSlicePolicy};
    use crate::units::{Length, LengthExt, Temperature, TemperatureExt};
    use approx::assert_relative_eq;

    fn ctx(read_index: usize, read_time_s: f64) -> ReadContext {
        ReadContext {
            read_index,
            read_time_s,
        }
    }

    fn state_of(value: f64, shape: (usize, usize)) -> FrameState {
        FrameState::from_electrons(Array2::from_elem(shape, value))
    }

    fn cosmic_config(rate: f64, duration_s: f64) -> ExposureConfig {
        let detector = DetectorConfig::new(
            "test",
            DetectorGeometry::of_rows_cols(32, 32, Length::from_micrometers(18.0)),
            2.0,
            60_000.0,
            8.0,
            DarkCurrentModel::from_reference_point(0.1, Temperature::from_celsius(-100.0)),
            16,
        );
        let shape = detector.geometry.shape();
        ExposureConfig {
            detector,
            duration_s,
            read_times_s: vec![duration_s],
            scan: ScanProfile::staring(),
            flat_field: uniform_flat_field(shape),
            temperature: Temperature::from_celsius(-100.0),
            cosmic_ray_rate: rate,
            sub_slice: SubSlicePolicy::Fixed { slices: 4 },
            noise: NoiseToggles::all(),
            intrapixel_amplitude: 0.01,
            persistence: PersistenceParams::default(),
        }
    }

    #[test]
    fn test_flat_field_multiplies() {
        let mut map = uniform_flat_field((4, 4));
        map[[1, 1]] = 0.9;
        map[[2, 3]] = 1.1;
        let stage = FlatFieldStage::new(map);

        let mut state = state_of(100.0, (4, 4));
        stage.apply(&mut state, &ctx(0, 1.0), 0);

        assert_relative_eq!(state.data[[0, 0]], 100.0);
        assert_relative_eq!(state.data[[1, 1]], 90.0);
        assert_relative_eq!(state.data[[2, 3]], 110.0);
    }

    #[test]
    fn test_dark_current_mean_level() {
        let stage = DarkCurrentStage::new(5.0);
        let mut state = state_of(0.0, (64, 64));
        stage.apply(&mut state, &ctx(0, 10.0), 11);

        // mean 50 e-/px, sigma/sqrt(N) ≈ 0.11
        let mean = state.data.mean().unwrap();
        assert_relative_eq!(mean, 50.0, epsilon = 1.0);
    }

    #[test]
    fn test_dark_current_zero_elapsed_is_noop() {
        let stage = DarkCurrentStage::new(5.0);
        let mut state = state_of(7.0, (8, 8));
        stage.apply(&mut state, &ctx(0, 0.0), 11);
        assert!(state.data.iter().all(|&v| v == 7.0));
    }

    #[test]
    fn test_shot_noise_preserves_mean() {
        let stage = ShotNoiseStage;
        let mut state = state_of(400.0, (64, 64));
        stage.apply(&mut state, &ctx(0, 1.0), 3);

        let mean = state.data.mean().unwrap();
        // sigma/sqrt(N) = 20/64 ≈ 0.31
        assert_relative_eq!(mean, 400.0, epsilon = 2.0);
        // And it actually injected scatter
        assert!(state.data.std(0.0) > 10.0);
    }

    #[test]
    fn test_shot_noise_zero_stays_zero() {
        let stage = ShotNoiseStage;
        let mut state = state_of(0.0, (8, 8));
        stage.apply(&mut state, &ctx(0, 1.0), 3);
        assert!(state.data.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_read_noise_statistics() {
        let stage = ReadNoiseStage::new(8.0);
        let mut state = state_of(1000.0, (128, 128));
        stage.apply(&mut state, &ctx(0, 1.0), 5);

        let mean = state.data.mean().unwrap();
        let std = state.data.std(0.0);
        assert_relative_eq!(mean, 1000.0, epsilon = 0.5);
        assert_relative_eq!(std, 8.0, epsilon = 0.3);
    }

    #[test]
    fn test_read_noise_independent_between_reads() {
        let stage = ReadNoiseStage::new(8.0);
        let mut a = state_of(0.0, (16, 16));
        let mut b = state_of(0.0, (16, 16));
        stage.apply(&mut a, &ctx(0, 1.0), 100);
        stage.apply(&mut b, &ctx(1, 2.0), 200);
        assert_ne!(a.data, b.data);
    }

    #[test]
    fn test_gain_converts_to_adu() {
        let stage = GainStage::new(2.5);
        let mut state = state_of(1000.0, (4, 4));
        stage.apply(&mut state, &ctx(0, 1.0), 0);
        assert!(state.data.iter().all(|&v| v == 400.0));
    }

    #[test]
    fn test_saturation_clamps_and_flags() {
        let stage = SaturationStage::new(500.0);
        let mut state = state_of(0.0, (2, 2));
        state.data[[0, 0]] = 499.9;
        state.data[[0, 1]] = 500.0;
        state.data[[1, 0]] = 500.1;
        state.data[[1, 1]] = 9000.0;

        stage.apply(&mut state, &ctx(0, 1.0), 0);

        assert_eq!(state.data[[0, 0]], 499.9);
        assert_eq!(state.data[[0, 1]], 500.0);
        assert_eq!(state.data[[1, 0]], 500.0);
        assert_eq!(state.data[[1, 1]], 500.0);
        assert!(!state.saturated[[0, 0]]);
        assert!(!state.saturated[[0, 1]]);
        assert!(state.saturated[[1, 0]]);
        assert!(state.saturated[[1, 1]]);
    }

    #[test]
    fn test_intrapixel_factor_depends_on_phase() {
        // Scan crossing half a pixel by t=1
        let scan = ScanProfile::linear(0.5, 1.0);
        let stage = IntrapixelStage::new(0.04, scan);

        // t=0: centered, unity response
        assert_relative_eq!(stage.factor_at(0.0), 1.0);
        // t=1: offset 0.5px, at the pixel boundary, full dip
        assert_relative_eq!(stage.factor_at(1.0), 0.96);
    }

    #[test]
    fn test_persistence_settles_over_time() {
        let stage = PersistenceStage::new(PersistenceParams {
            amplitude: 0.01,
            timescale_s: 10.0,
        });
        assert_relative_eq!(stage.factor_at(0.0), 0.99);
        assert!(stage.factor_at(100.0) > 0.9999);
        assert!(stage.factor_at(5.0) > stage.factor_at(1.0));
    }

    #[test]
    fn test_cosmic_hits_respect_read_time() {
        let config = cosmic_config(20.0, 100.0);
        let stage = CosmicRayStage::draw(&config, 5);
        assert!(!stage.hits().is_empty());

        let mut early = state_of(0.0, (32, 32));
        let mut late = state_of(0.0, (32, 32));
        stage.apply(&mut early, &ctx(0, 0.0), 0);
        stage.apply(&mut late, &ctx(1, 100.0), 0);

        // Nothing lands before any hit time; everything lands by the end
        assert_eq!(early.data.sum(), 0.0);
        let expected: f64 = stage.hits().iter().map(|h| h.electrons).sum();
        // Cluster spill can fall off the detector edge
        assert!(late.data.sum() > 0.5 * expected);
        assert!(late.data.sum() <= expected + 1e-9);
    }

    #[test]
    fn test_cosmic_hits_cumulative_across_reads() {
        let config = cosmic_config(10.0, 100.0);
        let stage = CosmicRayStage::draw(&config, 19);

        let mut mid = state_of(0.0, (32, 32));
        let mut end = state_of(0.0, (32, 32));
        stage.apply(&mut mid, &ctx(0, 50.0), 0);
        stage.apply(&mut end, &ctx(1, 100.0), 0);
        assert!(end.data.sum() >= mid.data.sum());
    }

    #[test]
    fn test_cosmic_draw_deterministic() {
        let config = cosmic_config(5.0, 10.0);
        let a = CosmicRayStage::draw(&config, 123);
        let b = CosmicRayStage::draw(&config, 123);
        assert_eq!(a.hits(), b.hits());
    }

    #[test]
    fn test_cosmic_rate_zero_gives_no_hits() {
        let config = cosmic_config(0.0, 10.0);
        let stage = CosmicRayStage::draw(&config, 77);
        assert!(stage.hits().is_empty());
    }
}
