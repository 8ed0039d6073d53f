//! Scan trajectory model: target motion across the detector during an
//! exposure.
//!
//! Spatial scanning sweeps the spectral trace along the cross-dispersion
//! (row) axis during a single exposure to spread charge over more pixels.
//! The trajectory is an ordered set of `(time, row offset)` samples with
//! linear interpolation between them; a staring exposure is the degenerate
//! zero-offset case.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected scan-profile input; a configuration error, surfaced before any
/// simulation work begins.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum InvalidScanProfileError {
    #[error("scan profile needs at least 2 samples")]
    TooFewSamples,

    #[error("scan profile must start at time offset 0, got {0}")]
    NonZeroStart(f64),

    #[error("time offsets must be strictly increasing (violation at index {0})")]
    TimeNotIncreasing(usize),

    #[error("row offsets must be monotonic for scan mode (direction reversal at index {0})")]
    NonMonotonicOffset(usize),

    #[error("scan profile contains a non-finite value at index {0}")]
    NonFinite(usize),
}

/// One trajectory sample: elapsed exposure time and sub-pixel row offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanSample {
    /// Time offset from exposure start, seconds
    pub time_s: f64,
    /// Target row offset from the nominal trace, pixels
    pub row_offset_px: f64,
}

/// Target trajectory during one exposure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanProfile {
    samples: Vec<ScanSample>,
}

impl ScanProfile {
    /// Staring-mode trajectory: zero offset for the whole exposure.
    pub fn staring() -> Self {
        Self {
            samples: vec![
                ScanSample {
                    time_s: 0.0,
                    row_offset_px: 0.0,
                },
            ],
        }
    }

    /// Constant-rate scan over `duration_s` seconds.
    pub fn linear(rate_px_per_s: f64, duration_s: f64) -> Self {
        Self {
            samples: vec![
                ScanSample {
                    time_s: 0.0,
                    row_offset_px: 0.0,
                },
                ScanSample {
                    time_s: duration_s,
                    row_offset_px: rate_px_per_s * duration_s,
                },
            ],
        }
    }

    /// Build a scan-mode trajectory from explicit samples, enforcing the
    /// profile invariants.
    pub fn from_samples(samples: Vec<(f64, f64)>) -> Result<Self, InvalidScanProfileError> {
        if samples.len() < 2 {
            return Err(InvalidScanProfileError::TooFewSamples);
        }
        if samples[0].0 != 0.0 {
            return Err(InvalidScanProfileError::NonZeroStart(samples[0].0));
        }

        let mut direction = 0.0_f64;
        for (i, &(t, y)) in samples.iter().enumerate() {
            if !t.is_finite() || !y.is_finite() {
                return Err(InvalidScanProfileError::NonFinite(i));
            }
            if i == 0 {
                continue;
            }
            if t <= samples[i - 1].0 {
                return Err(InvalidScanProfileError::TimeNotIncreasing(i));
            }
            let step = y - samples[i - 1].1;
            if step != 0.0 {
                if direction != 0.0 && step.signum() != direction {
                    return Err(InvalidScanProfileError::NonMonotonicOffset(i));
                }
                direction = step.signum();
            }
        }

        Ok(Self {
            samples: samples
                .into_iter()
                .map(|(time_s, row_offset_px)| ScanSample {
                    time_s,
                    row_offset_px,
                })
                .collect(),
        })
    }

    /// Sub-pixel row offset at `time_s`, linearly interpolated between
    /// samples and held constant beyond the last one.
    pub fn position_at(&self, time_s: f64) -> f64 {
        let samples = &self.samples;
        if samples.len() == 1 || time_s <= samples[0].time_s {
            return samples[0].row_offset_px;
        }
        let last = &samples[samples.len() - 1];
        if time_s >= last.time_s {
            return last.row_offset_px;
        }

        let idx = samples
            .partition_point(|s| s.time_s <= time_s)
            .clamp(1, samples.len() - 1);
        let a = &samples[idx - 1];
        let b = &samples[idx];
        let t = (time_s - a.time_s) / (b.time_s - a.time_s);
        a.row_offset_px + t * (b.row_offset_px - a.row_offset_px)
    }

    /// Total row displacement covered by the profile, pixels.
    pub fn span_px(&self) -> f64 {
        let first = self.samples[0].row_offset_px;
        let last = self.samples[self.samples.len() - 1].row_offset_px;
        (last - first).abs()
    }

    /// True for the degenerate zero-motion trajectory.
    pub fn is_staring(&self) -> bool {
        self.span_px() == 0.0
    }

    pub fn samples(&self) -> &[ScanSample] {
        &self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_staring_is_zero_everywhere() {
        let scan = ScanProfile::staring();
        assert_eq!(scan.position_at(0.0), 0.0);
        assert_eq!(scan.position_at(100.0), 0.0);
        assert!(scan.is_staring());
        assert_eq!(scan.span_px(), 0.0);
    }

    #[test]
    fn test_linear_scan_interpolation() {
        let scan = ScanProfile::linear(0.5, 10.0);
        assert_relative_eq!(scan.position_at(0.0), 0.0);
        assert_relative_eq!(scan.position_at(4.0), 2.0);
        assert_relative_eq!(scan.position_at(10.0), 5.0);
        // Held constant past the end
        assert_relative_eq!(scan.position_at(12.0), 5.0);
        assert_relative_eq!(scan.span_px(), 5.0);
        assert!(!scan.is_staring());
    }

    #[test]
    fn test_piecewise_profile() {
        let scan =
            ScanProfile::from_samples(vec![(0.0, 0.0), (2.0, 1.0), (6.0, 5.0)]).unwrap();
        assert_relative_eq!(scan.position_at(1.0), 0.5);
        assert_relative_eq!(scan.position_at(4.0), 3.0);
    }

    #[test]
    fn test_reversal_rejected() {
        let result = ScanProfile::from_samples(vec![(0.0, 0.0), (1.0, 2.0), (2.0, 1.0)]);
        assert!(matches!(
            result,
            Err(InvalidScanProfileError::NonMonotonicOffset(2))
        ));
    }

    #[test]
    fn test_descending_scan_allowed() {
        let scan = ScanProfile::from_samples(vec![(0.0, 0.0), (1.0, -2.0), (2.0, -4.0)]).unwrap();
        assert_relative_eq!(scan.span_px(), 4.0);
    }

    #[test]
    fn test_time_violations_rejected() {
        assert!(matches!(
            ScanProfile::from_samples(vec![(1.0, 0.0), (2.0, 1.0)]),
            Err(InvalidScanProfileError::NonZeroStart(_))
        ));
        assert!(matches!(
            ScanProfile::from_samples(vec![(0.0, 0.0), (0.0, 1.0)]),
            Err(InvalidScanProfileError::TimeNotIncreasing(1))
        ));
        assert!(matches!(
            ScanProfile::from_samples(vec![(0.0, 0.0)]),
            Err(InvalidScanProfileError::TooFewSamples)
        ));
    }

    #[test]
    fn test_non_finite_rejected() {
        let result = ScanProfile::from_samples(vec![(0.0, 0.0), (1.0, f64::NAN)]);
        assert!(matches!(result, Err(InvalidScanProfileError::NonFinite(1))));
    }
}
