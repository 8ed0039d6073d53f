//! Detector frame types: idealized ramps, raw outputs, and the mutable
//! state threaded through the noise pipeline.

use ndarray::Array2;
use thiserror::Error;

/// Numerically corrupt frame state; fatal, signals an upstream modeling bug.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum InvalidFrameStateError {
    #[error("non-finite value {value} at pixel ({row}, {col}) entering stage '{stage}'")]
    NonFinite {
        stage: &'static str,
        row: usize,
        col: usize,
        value: f64,
    },

    #[error("negative value {value} at pixel ({row}, {col}) entering stage '{stage}'")]
    Negative {
        stage: &'static str,
        row: usize,
        col: usize,
        value: f64,
    },

    #[error("frame shape ({found_rows}, {found_cols}) does not match detector shape ({expected_rows}, {expected_cols})")]
    ShapeMismatch {
        expected_rows: usize,
        expected_cols: usize,
        found_rows: usize,
        found_cols: usize,
    },
}

/// One finalized non-destructive read of idealized accumulated charge.
///
/// Produced exclusively by the frame accumulator; immutable once snapshot.
#[derive(Debug, Clone)]
pub struct DetectorFrame {
    electrons: Array2<f64>,
    read_index: usize,
    read_time_s: f64,
}

impl DetectorFrame {
    /// Normally produced by the frame accumulator at read snapshots; public
    /// so hand-built ramps can drive the noise pipeline directly.
    pub fn new(electrons: Array2<f64>, read_index: usize, read_time_s: f64) -> Self {
        Self {
            electrons,
            read_index,
            read_time_s,
        }
    }

    /// Accumulated electrons per pixel.
    pub fn electrons(&self) -> &Array2<f64> {
        &self.electrons
    }

    /// Index of this read within the exposure's read schedule.
    pub fn read_index(&self) -> usize {
        self.read_index
    }

    /// Read timestamp as an offset from exposure start, seconds.
    pub fn read_time_s(&self) -> f64 {
        self.read_time_s
    }

    /// Total accumulated charge across the frame.
    pub fn total_electrons(&self) -> f64 {
        self.electrons.sum()
    }
}

/// One raw detector read after the full noise pipeline: ADU values plus the
/// saturation flag mask.
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Pixel values in ADU (f64; quantization is a view, not a loss)
    pub adu: Array2<f64>,
    /// Pixels clamped at the full-well limit
    pub saturated: Array2<bool>,
    /// Index of this read within the exposure's read schedule
    pub read_index: usize,
    /// Read timestamp as an offset from exposure start, seconds
    pub read_time_s: f64,
}

impl RawFrame {
    /// Number of saturated pixels in this read.
    pub fn saturated_count(&self) -> usize {
        self.saturated.iter().filter(|&&s| s).count()
    }

    /// Quantize to unsigned integers, clipping at the ADC ceiling for the
    /// given bit depth.
    pub fn quantized(&self, bit_depth: u8) -> Array2<u16> {
        let max_adu = ((1u32 << bit_depth) - 1) as f64;
        self.adu.mapv(|v| v.clamp(0.0, max_adu).round() as u16)
    }
}

/// Mutable frame state owned by the noise pipeline while stages run.
#[derive(Debug, Clone)]
pub struct FrameState {
    /// Pixel values; electrons until the gain stage, ADU after
    pub data: Array2<f64>,
    /// Saturation flags, set by the saturation stage
    pub saturated: Array2<bool>,
}

impl FrameState {
    pub fn from_electrons(electrons: Array2<f64>) -> Self {
        let shape = electrons.raw_dim();
        Self {
            data: electrons,
            saturated: Array2::from_elem(shape, false),
        }
    }

    /// Reject NaN/negative numeric state before corruption propagates.
    ///
    /// Non-finite values are always fatal; negative values are fatal only
    /// for stages that interpret pixel values as Poisson means or physical
    /// charge (`require_non_negative`).
    pub fn validate(
        &self,
        stage: &'static str,
        require_non_negative: bool,
    ) -> Result<(), InvalidFrameStateError> {
        for ((row, col), &value) in self.data.indexed_iter() {
            if !value.is_finite() {
                return Err(InvalidFrameStateError::NonFinite {
                    stage,
                    row,
                    col,
                    value,
                });
            }
            if require_non_negative && value < 0.0 {
                return Err(InvalidFrameStateError::Negative {
                    stage,
                    row,
                    col,
                    value,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_accessors() {
        let frame = DetectorFrame::new(Array2::from_elem((4, 4), 2.5), 1, 10.0);
        assert_eq!(frame.read_index(), 1);
        assert_eq!(frame.read_time_s(), 10.0);
        assert_eq!(frame.total_electrons(), 40.0);
    }

    #[test]
    fn test_validate_catches_nan() {
        let mut state = FrameState::from_electrons(Array2::zeros((3, 3)));
        state.data[[1, 2]] = f64::NAN;
        let err = state.validate("shot_noise", true).unwrap_err();
        assert!(matches!(
            err,
            InvalidFrameStateError::NonFinite { row: 1, col: 2, .. }
        ));
    }

    #[test]
    fn test_validate_negative_policy() {
        let mut state = FrameState::from_electrons(Array2::zeros((3, 3)));
        state.data[[0, 0]] = -1.0;

        assert!(matches!(
            state.validate("dark_current", true),
            Err(InvalidFrameStateError::Negative { .. })
        ));
        // Zero-mean noise stages tolerate negative inputs
        assert!(state.validate("gain", false).is_ok());
    }

    #[test]
    fn test_quantized_clips_to_bit_depth() {
        let raw = RawFrame {
            adu: ndarray::array![[-5.0, 100.4, 70000.0]],
            saturated: Array2::from_elem((1, 3), false),
            read_index: 0,
            read_time_s: 1.0,
        };
        let q = raw.quantized(16);
        assert_eq!(q[[0, 0]], 0);
        assert_eq!(q[[0, 1]], 100);
        assert_eq!(q[[0, 2]], 65535);

        let q8 = raw.quantized(8);
        assert_eq!(q8[[0, 2]], 255);
    }

    #[test]
    fn test_saturated_count() {
        let mut saturated = Array2::from_elem((2, 2), false);
        saturated[[0, 1]] = true;
        saturated[[1, 1]] = true;
        let raw = RawFrame {
            adu: Array2::zeros((2, 2)),
            saturated,
            read_index: 0,
            read_time_s: 0.0,
        };
        assert_eq!(raw.saturated_count(), 2);
    }
}
