//! Linear interpolation over calibration tables.
//!
//! Dispersion solutions, sensitivity curves, PSF width tables, and scan
//! profiles are all stored as sampled curves; this module provides the one
//! interpolation routine they share, with typed errors so callers can
//! distinguish out-of-range queries from malformed tables.

use thiserror::Error;

/// Errors that can occur during interpolation operations.
#[derive(Error, Debug)]
pub enum InterpError {
    #[error("value {0} is out of bounds for interpolation range [{1}, {2}]")]
    OutOfBounds(f64, f64, f64),
    #[error("input tables must have at least 2 points")]
    InsufficientData,
    #[error("input tables must have the same length")]
    MismatchedLengths,
    #[error("x values must be sorted in strictly ascending order")]
    UnsortedData,
}

/// Performs linear interpolation on 1D data using binary search.
///
/// # Arguments
///
/// * `x` - The x-coordinate at which to interpolate
/// * `xs` - Array of x-coordinates (must be sorted in strictly ascending order)
/// * `ys` - Array of corresponding y-values (must match length of xs)
///
/// # Returns
///
/// * `Ok(f64)` - The interpolated y-value at position x
/// * `Err(InterpError)` - Detailed error if interpolation fails
pub fn interp(x: f64, xs: &[f64], ys: &[f64]) -> Result<f64, InterpError> {
    if xs.len() != ys.len() {
        return Err(InterpError::MismatchedLengths);
    }

    if xs.len() < 2 {
        return Err(InterpError::InsufficientData);
    }

    for i in 1..xs.len() {
        if xs[i] <= xs[i - 1] {
            return Err(InterpError::UnsortedData);
        }
    }

    let min_x = xs[0];
    let max_x = xs[xs.len() - 1];

    if x < min_x || x > max_x {
        return Err(InterpError::OutOfBounds(x, min_x, max_x));
    }

    // Binary search for the bracketing interval
    let idx = match xs.binary_search_by(|probe| probe.partial_cmp(&x).unwrap()) {
        Ok(exact_idx) => return Ok(ys[exact_idx]),
        Err(insert_idx) => insert_idx,
    };

    let x1 = xs[idx - 1];
    let x2 = xs[idx];
    let y1 = ys[idx - 1];
    let y2 = ys[idx];

    let t = (x - x1) / (x2 - x1);
    Ok(y1 + t * (y2 - y1))
}

/// Like [`interp`], but clamps out-of-range queries to the table endpoints.
///
/// Used for curves that vary smoothly and where the nearest calibrated value
/// is a better answer than a hard failure (e.g. PSF width just past the last
/// calibration wavelength). Structural errors still surface.
pub fn interp_clamped(x: f64, xs: &[f64], ys: &[f64]) -> Result<f64, InterpError> {
    match interp(x, xs, ys) {
        Err(InterpError::OutOfBounds(_, lo, _)) => {
            if x < lo {
                Ok(ys[0])
            } else {
                Ok(ys[ys.len() - 1])
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        let xs = vec![1.0, 2.0, 3.0, 4.0];
        let ys = vec![10.0, 20.0, 30.0, 40.0];
        assert_eq!(interp(2.0, &xs, &ys).unwrap(), 20.0);
    }

    #[test]
    fn test_linear_interpolation() {
        let xs = vec![1.0, 2.0, 3.0];
        let ys = vec![10.0, 20.0, 30.0];
        assert_eq!(interp(1.5, &xs, &ys).unwrap(), 15.0);
        assert_eq!(interp(2.5, &xs, &ys).unwrap(), 25.0);
    }

    #[test]
    fn test_out_of_bounds() {
        let xs = vec![1.0, 2.0, 3.0];
        let ys = vec![10.0, 20.0, 30.0];
        assert!(matches!(
            interp(0.5, &xs, &ys),
            Err(InterpError::OutOfBounds(_, _, _))
        ));
        assert!(matches!(
            interp(3.5, &xs, &ys),
            Err(InterpError::OutOfBounds(_, _, _))
        ));
    }

    #[test]
    fn test_mismatched_lengths() {
        let xs = vec![1.0, 2.0, 3.0];
        let ys = vec![10.0, 20.0];
        assert!(matches!(
            interp(1.5, &xs, &ys),
            Err(InterpError::MismatchedLengths)
        ));
    }

    #[test]
    fn test_insufficient_data() {
        let xs = vec![1.0];
        let ys = vec![10.0];
        assert!(matches!(
            interp(1.0, &xs, &ys),
            Err(InterpError::InsufficientData)
        ));
    }

    #[test]
    fn test_unsorted_data() {
        let xs = vec![2.0, 1.0, 3.0];
        let ys = vec![20.0, 10.0, 30.0];
        assert!(matches!(
            interp(1.5, &xs, &ys),
            Err(InterpError::UnsortedData)
        ));
    }

    #[test]
    fn test_clamped_endpoints() {
        let xs = vec![1.0, 2.0, 3.0];
        let ys = vec![10.0, 20.0, 30.0];
        assert_eq!(interp_clamped(0.0, &xs, &ys).unwrap(), 10.0);
        assert_eq!(interp_clamped(9.0, &xs, &ys).unwrap(), 30.0);
        assert_eq!(interp_clamped(2.5, &xs, &ys).unwrap(), 25.0);
    }
}
