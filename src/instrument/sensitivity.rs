//! Wavelength-dependent instrument sensitivity.
//!
//! The sensitivity curve folds together optical throughput and detector
//! quantum efficiency into one probability in `[0, 1]` that a photon of a
//! given wavelength is converted to a photo-electron. Curves are piecewise
//! linear tables, precomputed from calibration data at construction time.

use thiserror::Error;

use crate::algo::interp;

/// Errors raised while validating a sensitivity table.
#[derive(Debug, Error)]
pub enum SensitivityError {
    #[error("wavelength and sensitivity tables must have the same length")]
    LengthMismatch,

    #[error("sensitivity curve needs at least 2 points")]
    InsufficientData,

    #[error("wavelengths must be strictly ascending")]
    NotAscending,

    #[error("sensitivity values must be within [0, 1]")]
    OutOfRange,
}

/// Piecewise-linear sensitivity curve over the calibrated band.
#[derive(Debug, Clone)]
pub struct SensitivityCurve {
    wavelengths_nm: Vec<f64>,
    sensitivities: Vec<f64>,
}

impl SensitivityCurve {
    /// Build a curve from calibration tables, validating the invariants.
    pub fn from_table(
        wavelengths_nm: Vec<f64>,
        sensitivities: Vec<f64>,
    ) -> Result<Self, SensitivityError> {
        if wavelengths_nm.len() != sensitivities.len() {
            return Err(SensitivityError::LengthMismatch);
        }
        if wavelengths_nm.len() < 2 {
            return Err(SensitivityError::InsufficientData);
        }
        for i in 1..wavelengths_nm.len() {
            if wavelengths_nm[i] <= wavelengths_nm[i - 1] {
                return Err(SensitivityError::NotAscending);
            }
        }
        if sensitivities
            .iter()
            .any(|&s| !s.is_finite() || !(0.0..=1.0).contains(&s))
        {
            return Err(SensitivityError::OutOfRange);
        }

        Ok(Self {
            wavelengths_nm,
            sensitivities,
        })
    }

    /// Constant sensitivity across `[lower_nm, upper_nm]`.
    pub fn flat(lower_nm: f64, upper_nm: f64, value: f64) -> Result<Self, SensitivityError> {
        Self::from_table(vec![lower_nm, upper_nm], vec![value, value])
    }

    /// Sensitivity at `wavelength_nm`; zero outside the calibrated range.
    pub fn at(&self, wavelength_nm: f64) -> f64 {
        interp(wavelength_nm, &self.wavelengths_nm, &self.sensitivities).unwrap_or(0.0)
    }

    /// Calibrated wavelength coverage `(lower_nm, upper_nm)`.
    pub fn band(&self) -> (f64, f64) {
        (
            self.wavelengths_nm[0],
            self.wavelengths_nm[self.wavelengths_nm.len() - 1],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_interpolated_lookup() {
        let curve = SensitivityCurve::from_table(
            vec![1100.0, 1400.0, 1700.0],
            vec![0.2, 0.8, 0.4],
        )
        .unwrap();

        assert_relative_eq!(curve.at(1100.0), 0.2);
        assert_relative_eq!(curve.at(1250.0), 0.5);
        assert_relative_eq!(curve.at(1550.0), 0.6);
    }

    #[test]
    fn test_zero_outside_range() {
        let curve = SensitivityCurve::flat(1100.0, 1700.0, 0.75).unwrap();
        assert_eq!(curve.at(1000.0), 0.0);
        assert_eq!(curve.at(1800.0), 0.0);
        assert_relative_eq!(curve.at(1400.0), 0.75);
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let result = SensitivityCurve::from_table(vec![1100.0, 1700.0], vec![0.5, 1.5]);
        assert!(matches!(result, Err(SensitivityError::OutOfRange)));

        let result = SensitivityCurve::from_table(vec![1100.0, 1700.0], vec![-0.1, 0.5]);
        assert!(matches!(result, Err(SensitivityError::OutOfRange)));
    }

    #[test]
    fn test_rejects_unsorted() {
        let result = SensitivityCurve::from_table(vec![1700.0, 1100.0], vec![0.5, 0.5]);
        assert!(matches!(result, Err(SensitivityError::NotAscending)));
    }

    #[test]
    fn test_rejects_mismatched_lengths() {
        let result = SensitivityCurve::from_table(vec![1100.0, 1400.0, 1700.0], vec![0.5, 0.5]);
        assert!(matches!(result, Err(SensitivityError::LengthMismatch)));
    }
}
