//! Stellar spectral energy distributions as sampled photon-rate curves.
//!
//! A spectrum is an ordered sequence of `(wavelength, photon rate)` samples
//! with strictly increasing wavelengths. The frame accumulator walks these
//! samples directly, so the sample grid doubles as the spectral resolution
//! of the synthesis: one sample maps to one dispersed column contribution.
//!
//! Wavelengths are nanometers throughout; photon rates are detected photons
//! per second attributed to the sample, before instrument sensitivity.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::algo::interp;

/// Errors raised while validating spectral tables.
#[derive(Debug, Error)]
pub enum SpectrumError {
    #[error("wavelength and flux tables must have the same length")]
    LengthMismatch,

    #[error("spectrum needs at least 2 samples, got {0}")]
    TooFewSamples(usize),

    #[error("wavelengths must be strictly ascending (violation at index {0})")]
    NotAscending(usize),

    #[error("flux density must be finite and non-negative (violation at index {0})")]
    InvalidFlux(usize),
}

/// One sample of a stellar spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectrumSample {
    /// Wavelength in nanometers
    pub wavelength_nm: f64,
    /// Photon rate attributed to this sample, photons/s
    pub flux_density: f64,
}

/// Universal interface for stellar spectral energy distributions.
///
/// Implementations own an immutable sample grid; the accumulator iterates
/// `samples()` per sub-integration slice, and `flux_density_at` provides
/// interpolated lookups for diagnostics and tests.
pub trait StellarSpectrum: Send + Sync {
    /// The full ordered sample grid.
    fn samples(&self) -> &[SpectrumSample];

    /// Interpolated photon rate at an arbitrary wavelength, `None` outside
    /// the sampled range.
    fn flux_density_at(&self, wavelength_nm: f64) -> Option<f64> {
        let samples = self.samples();
        let xs: Vec<f64> = samples.iter().map(|s| s.wavelength_nm).collect();
        let ys: Vec<f64> = samples.iter().map(|s| s.flux_density).collect();
        interp(wavelength_nm, &xs, &ys).ok()
    }

    /// Wavelength coverage as `(lower_nm, upper_nm)`.
    fn band(&self) -> (f64, f64) {
        let samples = self.samples();
        (
            samples[0].wavelength_nm,
            samples[samples.len() - 1].wavelength_nm,
        )
    }
}

/// Validate a sample sequence against the spectrum invariants.
fn validate_samples(samples: &[SpectrumSample]) -> Result<(), SpectrumError> {
    if samples.len() < 2 {
        return Err(SpectrumError::TooFewSamples(samples.len()));
    }
    for (i, s) in samples.iter().enumerate() {
        if !s.flux_density.is_finite() || s.flux_density < 0.0 {
            return Err(SpectrumError::InvalidFlux(i));
        }
        if !s.wavelength_nm.is_finite() {
            return Err(SpectrumError::NotAscending(i));
        }
        if i > 0 && s.wavelength_nm <= samples[i - 1].wavelength_nm {
            return Err(SpectrumError::NotAscending(i));
        }
    }
    Ok(())
}

/// Spectrum built from explicit wavelength/flux tables.
#[derive(Debug, Clone)]
pub struct TabulatedSpectrum {
    samples: Vec<SpectrumSample>,
}

impl TabulatedSpectrum {
    /// Build a spectrum from matching wavelength and flux tables.
    ///
    /// Fails with [`SpectrumError`] if the tables are malformed; validation
    /// happens here so the accumulation loop never has to re-check.
    pub fn from_table(
        wavelengths_nm: Vec<f64>,
        flux_densities: Vec<f64>,
    ) -> Result<Self, SpectrumError> {
        if wavelengths_nm.len() != flux_densities.len() {
            return Err(SpectrumError::LengthMismatch);
        }
        let samples: Vec<SpectrumSample> = wavelengths_nm
            .into_iter()
            .zip(flux_densities)
            .map(|(wavelength_nm, flux_density)| SpectrumSample {
                wavelength_nm,
                flux_density,
            })
            .collect();
        validate_samples(&samples)?;
        Ok(Self { samples })
    }
}

impl StellarSpectrum for TabulatedSpectrum {
    fn samples(&self) -> &[SpectrumSample] {
        &self.samples
    }
}

/// Wavelength-independent spectrum over a band, mainly for calibration-style
/// scenarios and tests.
#[derive(Debug, Clone)]
pub struct FlatSpectrum {
    samples: Vec<SpectrumSample>,
}

impl FlatSpectrum {
    /// Constant photon rate per sample across `[lower_nm, upper_nm]` with
    /// `n_samples` evenly spaced samples.
    pub fn new(
        lower_nm: f64,
        upper_nm: f64,
        flux_density: f64,
        n_samples: usize,
    ) -> Result<Self, SpectrumError> {
        if n_samples < 2 {
            return Err(SpectrumError::TooFewSamples(n_samples));
        }
        let step = (upper_nm - lower_nm) / (n_samples - 1) as f64;
        let samples: Vec<SpectrumSample> = (0..n_samples)
            .map(|i| SpectrumSample {
                wavelength_nm: lower_nm + i as f64 * step,
                flux_density,
            })
            .collect();
        validate_samples(&samples)?;
        Ok(Self { samples })
    }
}

impl StellarSpectrum for FlatSpectrum {
    fn samples(&self) -> &[SpectrumSample] {
        &self.samples
    }
}
