//! Exposure orchestration: sequencing, seeding, and failure policy.
//!
//! The runner drives each exposure through an explicit state machine
//! (`Idle → ConfiguringExposure → Accumulating → Reading… → Finalizing →
//! Complete`), derives a deterministic per-exposure seed from the global
//! seed plus the exposure index, and applies the configured failure policy.
//! Exposures are independent given their start times, so skip-mode runs can
//! fan out over a rayon worker pool without affecting reproducibility.

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detector::InvalidFrameStateError;
use crate::exposure::{AccumulationError, ExposureConfig, ExposureConfigError, FrameAccumulator};
use crate::instrument::InstrumentModel;
use crate::noise::NoisePipeline;
use crate::observation::{ExposureFrames, ExposureOutcome, Observation};
use crate::photometry::TransitSource;

/// What to do when an exposure fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Stop the observation at the first failed exposure.
    AbortObservation,
    /// Record the failure and continue with the next exposure.
    SkipExposure,
}

/// Orchestrator states for one exposure.
#[derive(Debug, Clone, PartialEq)]
pub enum ExposureState {
    Idle,
    ConfiguringExposure,
    Accumulating,
    Reading { read_index: usize },
    Finalizing,
    Complete,
}

/// Per-exposure state tracker; transitions are logged for traceability.
struct ExposureDriver {
    index: usize,
    state: ExposureState,
}

impl ExposureDriver {
    fn new(index: usize) -> Self {
        Self {
            index,
            state: ExposureState::Idle,
        }
    }

    fn advance(&mut self, next: ExposureState) {
        debug!("exposure {}: {:?} -> {:?}", self.index, self.state, next);
        self.state = next;
    }
}

/// Structural plan errors; fatal before any simulation work.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("observation needs at least one exposure")]
    NoExposures,

    #[error("cadence {cadence_s}s is shorter than the exposure duration {duration_s}s")]
    CadenceShorterThanExposure { cadence_s: f64, duration_s: f64 },

    #[error(transparent)]
    Exposure(#[from] ExposureConfigError),
}

/// Unrecovered failure of a single exposure.
#[derive(Debug, Error)]
pub enum ExposureError {
    #[error(transparent)]
    Accumulation(#[from] AccumulationError),

    #[error(transparent)]
    FrameState(#[from] InvalidFrameStateError),
}

/// Observation-level failures.
#[derive(Debug, Error)]
pub enum ObservationError {
    #[error("invalid observation plan: {0}")]
    InvalidPlan(#[from] PlanError),

    #[error("exposure {index} failed: {source}")]
    ExposureFailed {
        index: usize,
        #[source]
        source: ExposureError,
    },
}

/// Observation parameters: identical exposures on a regular cadence.
#[derive(Debug, Clone)]
pub struct ObservationPlan {
    /// Configuration applied to every exposure
    pub exposure: ExposureConfig,
    /// Number of exposures in the observation
    pub n_exposures: usize,
    /// Absolute start time of the first exposure, seconds
    pub start_time_s: f64,
    /// Start-to-start spacing between exposures, seconds
    pub cadence_s: f64,
    /// Global random seed; exposure `i` uses `seed.wrapping_add(i)`
    pub seed: u64,
    /// What to do when an exposure fails
    pub failure_policy: FailurePolicy,
    /// Fan exposures out over the rayon pool (skip-mode only; abort mode
    /// runs sequentially so it can stop at the first failure)
    pub parallel: bool,
}

impl ObservationPlan {
    /// Validate the plan; structural errors halt before any simulation.
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.n_exposures == 0 {
            return Err(PlanError::NoExposures);
        }
        if self.n_exposures > 1 && self.cadence_s < self.exposure.duration_s {
            return Err(PlanError::CadenceShorterThanExposure {
                cadence_s: self.cadence_s,
                duration_s: self.exposure.duration_s,
            });
        }
        self.exposure.validate()?;
        Ok(())
    }

    /// Absolute start time of exposure `index`.
    pub fn exposure_start_s(&self, index: usize) -> f64 {
        self.start_time_s + index as f64 * self.cadence_s
    }

    /// Deterministic seed for exposure `index`.
    pub fn exposure_seed(&self, index: usize) -> u64 {
        self.seed.wrapping_add(index as u64)
    }
}

/// Drives the full pipeline across one observation.
pub struct ObservationRunner {
    plan: ObservationPlan,
    source: TransitSource,
    instrument: InstrumentModel,
}

impl ObservationRunner {
    pub fn new(plan: ObservationPlan, source: TransitSource, instrument: InstrumentModel) -> Self {
        Self {
            plan,
            source,
            instrument,
        }
    }

    /// Run the observation and hand back the finalized result.
    ///
    /// Under [`FailurePolicy::AbortObservation`], the first failed exposure
    /// aborts the run with [`ObservationError::ExposureFailed`]. Under
    /// [`FailurePolicy::SkipExposure`], failures become
    /// [`ExposureOutcome::Failed`] records and the run continues.
    pub fn run(&self) -> Result<Observation, ObservationError> {
        self.plan.validate()?;
        let n = self.plan.n_exposures;
        info!(
            "starting observation: {} exposure(s) of {:.1}s on {}",
            n, self.plan.exposure.duration_s, self.instrument.name
        );

        let outcomes = match self.plan.failure_policy {
            FailurePolicy::AbortObservation => {
                let mut outcomes = Vec::with_capacity(n);
                for index in 0..n {
                    match self.run_exposure(index) {
                        Ok(frames) => outcomes.push(ExposureOutcome::Completed(frames)),
                        Err(source) => {
                            warn!("exposure {index} failed, aborting observation");
                            return Err(ObservationError::ExposureFailed { index, source });
                        }
                    }
                }
                outcomes
            }
            FailurePolicy::SkipExposure => {
                if self.plan.parallel {
                    (0..n)
                        .into_par_iter()
                        .map(|index| self.exposure_outcome(index))
                        .collect()
                } else {
                    (0..n).map(|index| self.exposure_outcome(index)).collect()
                }
            }
        };

        let observation = Observation::new(self.plan.seed, outcomes);
        info!(
            "observation complete: {}/{} exposures succeeded",
            observation.len() - observation.failed_count(),
            observation.len()
        );
        Ok(observation)
    }

    fn exposure_outcome(&self, index: usize) -> ExposureOutcome {
        match self.run_exposure(index) {
            Ok(frames) => ExposureOutcome::Completed(frames),
            Err(error) => {
                warn!("exposure {index} failed, skipping: {error}");
                ExposureOutcome::Failed {
                    index,
                    start_time_s: self.plan.exposure_start_s(index),
                    error: error.to_string(),
                }
            }
        }
    }

    /// One exposure through the full state machine.
    fn run_exposure(&self, index: usize) -> Result<ExposureFrames, ExposureError> {
        let mut driver = ExposureDriver::new(index);
        let start_time_s = self.plan.exposure_start_s(index);
        let exposure_seed = self.plan.exposure_seed(index);

        driver.advance(ExposureState::ConfiguringExposure);
        let accumulator =
            FrameAccumulator::new(&self.plan.exposure, &self.source, &self.instrument);
        let pipeline = NoisePipeline::for_exposure(&self.plan.exposure, exposure_seed);

        driver.advance(ExposureState::Accumulating);
        let ideal = accumulator.accumulate(start_time_s)?;

        let mut raw = Vec::with_capacity(ideal.len());
        for frame in &ideal {
            driver.advance(ExposureState::Reading {
                read_index: frame.read_index(),
            });
            raw.push(pipeline.apply_to_read(frame)?);
        }

        driver.advance(ExposureState::Finalizing);
        let frames = ExposureFrames {
            index,
            start_time_s,
            ideal,
            raw,
        };
        debug!(
            "exposure {index}: {:.0}e- accumulated, {} saturated px",
            frames.total_electrons(),
            frames.saturated_pixels()
        );

        driver.advance(ExposureState::Complete);
        Ok(frames)
    }
}
