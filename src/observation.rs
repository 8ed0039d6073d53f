//! Observation results: per-exposure ramps and their outcomes.
//!
//! An [`Observation`] is created by the orchestrator, populated exposure by
//! exposure, and handed to the external output packager once complete. It
//! is immutable from the caller's perspective; failed exposures stay in the
//! record rather than being silently dropped or zeroed.

use crate::detector::{DetectorFrame, RawFrame};

/// The full ramp produced by one successful exposure.
#[derive(Debug, Clone)]
pub struct ExposureFrames {
    /// Exposure index within the observation
    pub index: usize,
    /// Absolute exposure start time, seconds
    pub start_time_s: f64,
    /// Idealized accumulated frames, one per non-destructive read
    pub ideal: Vec<DetectorFrame>,
    /// Raw detector reads after the noise pipeline, same schedule
    pub raw: Vec<RawFrame>,
}

impl ExposureFrames {
    /// Number of non-destructive reads in the ramp.
    pub fn n_reads(&self) -> usize {
        self.raw.len()
    }

    /// Total idealized charge at the final read.
    pub fn total_electrons(&self) -> f64 {
        self.ideal.last().map(|f| f.total_electrons()).unwrap_or(0.0)
    }

    /// Saturated pixels in the final raw read.
    pub fn saturated_pixels(&self) -> usize {
        self.raw.last().map(|f| f.saturated_count()).unwrap_or(0)
    }
}

/// Result of one exposure attempt.
#[derive(Debug, Clone)]
pub enum ExposureOutcome {
    /// The exposure completed and produced its full ramp.
    Completed(ExposureFrames),
    /// The exposure failed; the error is retained, the frames are not.
    Failed {
        index: usize,
        start_time_s: f64,
        error: String,
    },
}

impl ExposureOutcome {
    pub fn index(&self) -> usize {
        match self {
            ExposureOutcome::Completed(frames) => frames.index,
            ExposureOutcome::Failed { index, .. } => *index,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, ExposureOutcome::Completed(_))
    }
}

/// A finalized observation: the ordered exposure outcomes plus the seed
/// that reproduces them.
#[derive(Debug, Clone)]
pub struct Observation {
    global_seed: u64,
    outcomes: Vec<ExposureOutcome>,
}

impl Observation {
    pub(crate) fn new(global_seed: u64, outcomes: Vec<ExposureOutcome>) -> Self {
        Self {
            global_seed,
            outcomes,
        }
    }

    /// Seed the observation was generated from.
    pub fn global_seed(&self) -> u64 {
        self.global_seed
    }

    /// All exposure outcomes, in observation order.
    pub fn outcomes(&self) -> &[ExposureOutcome] {
        &self.outcomes
    }

    /// Successfully completed exposures, in order.
    pub fn completed(&self) -> impl Iterator<Item = &ExposureFrames> {
        self.outcomes.iter().filter_map(|o| match o {
            ExposureOutcome::Completed(frames) => Some(frames),
            ExposureOutcome::Failed { .. } => None,
        })
    }

    /// Number of exposures attempted.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Number of failed exposures.
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_completed()).count()
    }
}
