//! Noise and systematics injection.
//!
//! Transforms an idealized accumulated frame into a realistic raw detector
//! read. The corruptions are modeled as an ordered list of stateless
//! [`FrameTransform`] values rather than one monolithic procedure, so any
//! effect can be disabled and unit-tested in isolation. The order is fixed
//! and preserved for reproducibility and physical correctness:
//!
//! 1. flat-field multiplication
//! 2. dark-current accumulation
//! 3. cosmic-ray hits
//! 4. shot (Poisson) noise
//! 5. intrapixel sensitivity variation
//! 6. read noise
//! 7. gain conversion (electrons → ADU)
//! 8. saturation clamp + flagging
//! 9. persistence/ramp settling
//!
//! A pipeline is instantiated per exposure: exposure-level stochastic state
//! (the cosmic-ray hit list) is drawn once at construction so hits are
//! irreversible across that exposure's reads. Per-read randomness derives
//! deterministic seeds from the exposure seed, read index, and stage slot,
//! giving byte-identical output for a fixed global seed regardless of
//! scheduling.

pub mod stages;

use crate::detector::{DetectorFrame, FrameState, InvalidFrameStateError, RawFrame};
use crate::exposure::ExposureConfig;

pub use stages::{
    CosmicHit, CosmicRayStage, DarkCurrentStage, FlatFieldStage, GainStage, IntrapixelStage,
    PersistenceStage, ReadNoiseStage, SaturationStage, ShotNoiseStage,
};

/// Seed stride between reads; must exceed `stages × STAGE_SEED_STRIDE`.
const READ_SEED_STRIDE: u64 = 1024;

/// Seed stride between stages; must exceed the row-chunk count of a frame.
const STAGE_SEED_STRIDE: u64 = 64;

/// Per-read context handed to every stage.
#[derive(Debug, Clone, Copy)]
pub struct ReadContext {
    /// Index of the read within the exposure's schedule
    pub read_index: usize,
    /// Read timestamp, seconds from exposure start
    pub read_time_s: f64,
}

/// One stateless detector corruption applied to a whole frame.
pub trait FrameTransform: Send + Sync {
    /// Stable stage name, used in diagnostics and error reports.
    fn name(&self) -> &'static str;

    /// Whether negative input pixels indicate corrupt upstream state for
    /// this stage. Stages downstream of zero-mean noise return `false`.
    fn requires_non_negative(&self) -> bool {
        true
    }

    /// Apply the corruption in place. `seed` is unique per (exposure, read,
    /// stage) and already accounts for parallel chunking strides.
    fn apply(&self, state: &mut FrameState, ctx: &ReadContext, seed: u64);
}

/// Ordered noise pipeline for one exposure.
pub struct NoisePipeline {
    stages: Vec<Box<dyn FrameTransform>>,
    exposure_seed: u64,
}

impl NoisePipeline {
    /// Build the pipeline for one exposure, drawing exposure-level
    /// stochastic state (cosmic-ray hits) from `exposure_seed`.
    pub fn for_exposure(config: &ExposureConfig, exposure_seed: u64) -> Self {
        let toggles = &config.noise;
        let mut stages: Vec<Box<dyn FrameTransform>> = Vec::new();

        if toggles.flat_field {
            stages.push(Box::new(FlatFieldStage::new(config.flat_field.clone())));
        }
        if toggles.dark_current {
            stages.push(Box::new(DarkCurrentStage::new(config.dark_rate_e_s())));
        }
        if toggles.cosmic_rays {
            stages.push(Box::new(CosmicRayStage::draw(config, exposure_seed)));
        }
        if toggles.shot_noise {
            stages.push(Box::new(ShotNoiseStage));
        }
        if toggles.intrapixel {
            stages.push(Box::new(IntrapixelStage::new(
                config.intrapixel_amplitude,
                config.scan.clone(),
            )));
        }
        if toggles.read_noise {
            stages.push(Box::new(ReadNoiseStage::new(config.detector.read_noise_e)));
        }
        if toggles.gain {
            stages.push(Box::new(GainStage::new(config.detector.gain_e_per_adu)));
        }
        if toggles.saturation {
            // The clamp applies after gain conversion, so express the
            // electron-denominated full well in the pipeline's units there.
            let limit = if toggles.gain {
                config.detector.full_well_adu()
            } else {
                config.detector.full_well_e
            };
            stages.push(Box::new(SaturationStage::new(limit)));
        }
        if toggles.persistence {
            stages.push(Box::new(PersistenceStage::new(config.persistence)));
        }

        Self {
            stages,
            exposure_seed,
        }
    }

    /// Names of the enabled stages, in application order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run the pipeline over one finalized read.
    ///
    /// Frame state is validated before every stage; NaN or unexpectedly
    /// negative values fail the exposure with [`InvalidFrameStateError`]
    /// before corruption propagates.
    pub fn apply_to_read(&self, frame: &DetectorFrame) -> Result<RawFrame, InvalidFrameStateError> {
        let mut state = FrameState::from_electrons(frame.electrons().clone());
        let ctx = ReadContext {
            read_index: frame.read_index(),
            read_time_s: frame.read_time_s(),
        };

        for (slot, stage) in self.stages.iter().enumerate() {
            state.validate(stage.name(), stage.requires_non_negative())?;
            let seed = self
                .exposure_seed
                .wrapping_add((ctx.read_index as u64).wrapping_mul(READ_SEED_STRIDE))
                .wrapping_add((slot as u64).wrapping_mul(STAGE_SEED_STRIDE));
            stage.apply(&mut state, &ctx, seed);
        }
        state.validate("finalize", false)?;

        Ok(RawFrame {
            adu: state.data,
            saturated: state.saturated,
            read_index: ctx.read_index,
            read_time_s: ctx.read_time_s,
        })
    }
}
