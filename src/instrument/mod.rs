//! Instrument response model: dispersion, sensitivity, and PSF.
//!
//! The three response functions are independent capability interfaces so
//! instrument modes can swap implementations without subclass hierarchies.
//! [`InstrumentModel`] bundles one of each, constructed once from
//! calibration data and shared read-only across exposure workers.

pub mod dispersion;
pub mod psf;
pub mod sensitivity;

use std::sync::Arc;

use once_cell::sync::Lazy;

pub use dispersion::{DispersionError, DispersionSolution, OutOfBandError, PolynomialDispersion};
pub use psf::{fwhm_to_sigma, sigma_to_fwhm, GaussianPsf, PsfKernel, PsfModel, FWHM_PER_SIGMA};
pub use sensitivity::{SensitivityCurve, SensitivityError};

/// Complete spectroscopic instrument response for one observing mode.
#[derive(Clone)]
pub struct InstrumentModel {
    /// Instrument/mode name
    pub name: String,
    /// Wavelength → pixel mapping
    pub dispersion: Arc<dyn DispersionSolution>,
    /// Wavelength → conversion probability
    pub sensitivity: SensitivityCurve,
    /// Wavelength → PSF kernel
    pub psf: Arc<dyn PsfModel>,
}

impl InstrumentModel {
    pub fn new(
        name: impl Into<String>,
        dispersion: Arc<dyn DispersionSolution>,
        sensitivity: SensitivityCurve,
        psf: Arc<dyn PsfModel>,
    ) -> Self {
        Self {
            name: name.into(),
            dispersion,
            sensitivity,
            psf,
        }
    }

    /// Calibrated wavelength coverage of the dispersion solution.
    pub fn band(&self) -> (f64, f64) {
        self.dispersion.band()
    }
}

/// Standard instrument modes
pub mod models {
    use super::*;

    /// Near-infrared slitless grism mode covering 1075-1700nm at
    /// ~4.65nm/px, representative of an HST/WFC3 G141-style element.
    pub static NIR_GRISM: Lazy<InstrumentModel> = Lazy::new(|| {
        let dispersion = PolynomialDispersion::linear(
            30.0,
            1.0 / 4.65,
            1075.0,
            (1075.0, 1700.0),
            128.0,
        )
        .expect("preset dispersion coefficients are valid");

        // Throughput curve shape: rises from the blue cutoff, broad plateau,
        // falls toward the red cutoff.
        let sensitivity = SensitivityCurve::from_table(
            vec![1075.0, 1125.0, 1200.0, 1350.0, 1500.0, 1625.0, 1700.0],
            vec![0.10, 0.32, 0.41, 0.45, 0.44, 0.35, 0.12],
        )
        .expect("preset sensitivity table is valid");

        let psf = GaussianPsf::with_fwhm_table(
            vec![1075.0, 1400.0, 1700.0],
            vec![1.02, 1.14, 1.30],
        );

        InstrumentModel::new("NIR_GRISM", Arc::new(dispersion), sensitivity, Arc::new(psf))
    });
}
