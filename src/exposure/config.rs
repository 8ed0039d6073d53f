//! Exposure configuration: timing, read schedule, slicing policy, and
//! noise-stage parameters.
//!
//! All values are plain structured data; nothing here depends on how the
//! caller parsed them. Validation happens once, up front, and any
//! structural error halts construction before simulation work begins.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detector::DetectorConfig;
use crate::scan::ScanProfile;
use crate::units::Temperature;

/// Structural configuration errors; fatal at construction.
#[derive(Debug, Error)]
pub enum ExposureConfigError {
    #[error("exposure duration must be positive, got {0}s")]
    NonPositiveDuration(f64),

    #[error("read schedule must contain at least one read")]
    NoReads,

    #[error("read timestamps must be strictly increasing (violation at index {0})")]
    ReadsNotIncreasing(usize),

    #[error("read at {read_s}s is outside the exposure duration {duration_s}s")]
    ReadAfterExposureEnd { read_s: f64, duration_s: f64 },

    #[error("read timestamps must be positive (violation at index {0})")]
    NonPositiveRead(usize),

    #[error("flat-field shape ({0}, {1}) does not match detector shape ({2}, {3})")]
    FlatShapeMismatch(usize, usize, usize, usize),

    #[error("flat-field factors must be finite and positive")]
    InvalidFlatField,

    #[error("gain must be positive, got {0}")]
    NonPositiveGain(f64),

    #[error("cosmic-ray rate must be finite and non-negative, got {0}")]
    InvalidCosmicRayRate(f64),
}

/// Sub-integration slicing policy.
///
/// The slice width is the key accuracy/cost tradeoff of the synthesis: the
/// scan must not move appreciably within one slice. No single correct value
/// exists without instrument calibration, so this is a required input with
/// a documented default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SubSlicePolicy {
    /// Choose the slice count so the scan displacement per slice stays at
    /// or below `max_step_px`, with at least `min_slices` slices.
    MaxScanStep { max_step_px: f64, min_slices: usize },
    /// Fixed number of equal slices.
    Fixed { slices: usize },
}

impl Default for SubSlicePolicy {
    /// 0.05px per slice, floored at 32 slices for staring exposures.
    fn default() -> Self {
        SubSlicePolicy::MaxScanStep {
            max_step_px: 0.05,
            min_slices: 32,
        }
    }
}

impl SubSlicePolicy {
    /// Resolve the policy to a slice count for a given scan span.
    pub fn slice_count(&self, scan_span_px: f64) -> usize {
        match *self {
            SubSlicePolicy::MaxScanStep {
                max_step_px,
                min_slices,
            } => {
                let needed = (scan_span_px / max_step_px).ceil() as usize;
                needed.max(min_slices)
            }
            SubSlicePolicy::Fixed { slices } => slices.max(1),
        }
    }
}

/// Per-stage enable flags for the noise pipeline, so individual effects can
/// be tested in isolation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseToggles {
    pub flat_field: bool,
    pub dark_current: bool,
    pub cosmic_rays: bool,
    pub shot_noise: bool,
    pub intrapixel: bool,
    pub read_noise: bool,
    pub gain: bool,
    pub saturation: bool,
    pub persistence: bool,
}

impl NoiseToggles {
    /// Every stage enabled.
    pub fn all() -> Self {
        Self {
            flat_field: true,
            dark_current: true,
            cosmic_rays: true,
            shot_noise: true,
            intrapixel: true,
            read_noise: true,
            gain: true,
            saturation: true,
            persistence: true,
        }
    }

    /// Every stage disabled; the pipeline becomes the identity.
    pub fn none() -> Self {
        Self {
            flat_field: false,
            dark_current: false,
            cosmic_rays: false,
            shot_noise: false,
            intrapixel: false,
            read_noise: false,
            gain: false,
            saturation: false,
            persistence: false,
        }
    }
}

impl Default for NoiseToggles {
    fn default() -> Self {
        Self::all()
    }
}

/// Persistence/ramp systematic parameters: charge traps suppress response
/// early in the exposure and settle with time constant `timescale_s`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersistenceParams {
    /// Fractional response deficit at exposure start
    pub amplitude: f64,
    /// Settling time constant, seconds
    pub timescale_s: f64,
}

impl Default for PersistenceParams {
    fn default() -> Self {
        Self {
            amplitude: 0.002,
            timescale_s: 50.0,
        }
    }
}

/// Complete description of one exposure.
#[derive(Debug, Clone)]
pub struct ExposureConfig {
    /// Detector under simulation
    pub detector: DetectorConfig,
    /// Exposure duration, seconds
    pub duration_s: f64,
    /// Non-destructive read timestamps, seconds from exposure start;
    /// strictly increasing, all within the duration
    pub read_times_s: Vec<f64>,
    /// Target trajectory during the exposure
    pub scan: ScanProfile,
    /// Per-pixel multiplicative response map, detector shaped
    pub flat_field: Array2<f64>,
    /// Detector operating temperature (sets the dark-current rate)
    pub temperature: Temperature,
    /// Expected cosmic-ray hits per exposure
    pub cosmic_ray_rate: f64,
    /// Sub-integration slicing policy
    pub sub_slice: SubSlicePolicy,
    /// Noise-stage enable flags
    pub noise: NoiseToggles,
    /// Intrapixel sensitivity variation amplitude
    pub intrapixel_amplitude: f64,
    /// Persistence/ramp systematic parameters
    pub persistence: PersistenceParams,
}

impl ExposureConfig {
    /// Validate the structural invariants; called by the orchestrator before
    /// any accumulation work.
    pub fn validate(&self) -> Result<(), ExposureConfigError> {
        if !(self.duration_s > 0.0) {
            return Err(ExposureConfigError::NonPositiveDuration(self.duration_s));
        }
        if self.read_times_s.is_empty() {
            return Err(ExposureConfigError::NoReads);
        }
        for (i, &t) in self.read_times_s.iter().enumerate() {
            if !(t > 0.0) {
                return Err(ExposureConfigError::NonPositiveRead(i));
            }
            if i > 0 && t <= self.read_times_s[i - 1] {
                return Err(ExposureConfigError::ReadsNotIncreasing(i));
            }
            if t > self.duration_s {
                return Err(ExposureConfigError::ReadAfterExposureEnd {
                    read_s: t,
                    duration_s: self.duration_s,
                });
            }
        }

        let (rows, cols) = self.detector.geometry.shape();
        let (frows, fcols) = self.flat_field.dim();
        if (frows, fcols) != (rows, cols) {
            return Err(ExposureConfigError::FlatShapeMismatch(
                frows, fcols, rows, cols,
            ));
        }
        if self.flat_field.iter().any(|&f| !f.is_finite() || f <= 0.0) {
            return Err(ExposureConfigError::InvalidFlatField);
        }
        if !(self.detector.gain_e_per_adu > 0.0) {
            return Err(ExposureConfigError::NonPositiveGain(
                self.detector.gain_e_per_adu,
            ));
        }
        if !self.cosmic_ray_rate.is_finite() || self.cosmic_ray_rate < 0.0 {
            return Err(ExposureConfigError::InvalidCosmicRayRate(
                self.cosmic_ray_rate,
            ));
        }
        Ok(())
    }

    /// Number of scheduled non-destructive reads.
    pub fn n_reads(&self) -> usize {
        self.read_times_s.len()
    }

    /// Dark-current rate at the configured operating temperature, e⁻/px/s.
    pub fn dark_rate_e_s(&self) -> f64 {
        self.detector.dark_current.rate_at(self.temperature)
    }
}
