//! Gaussian point-spread-function kernels with wavelength-dependent width.
//!
//! The PSF is parametrized by its FWHM in pixels, which may vary smoothly
//! across the band via a calibration table. Kernels are realized as small
//! normalized weight grids positioned at the sub-pixel trace location, so
//! depositing `kernel × electrons` conserves flux exactly whenever the
//! footprint lies fully on the detector.

use ndarray::Array2;

use crate::algo::interp::interp_clamped;

/// FWHM of a Gaussian divided by its standard deviation: `2·sqrt(2·ln 2)`.
pub const FWHM_PER_SIGMA: f64 = 2.354_820_045_030_949_3;

/// Convert a Gaussian FWHM to its standard deviation.
pub fn fwhm_to_sigma(fwhm: f64) -> f64 {
    fwhm / FWHM_PER_SIGMA
}

/// Convert a Gaussian standard deviation to its FWHM.
pub fn sigma_to_fwhm(sigma: f64) -> f64 {
    sigma * FWHM_PER_SIGMA
}

/// A realized PSF kernel: a normalized weight grid anchored in detector
/// pixel coordinates.
///
/// `weights[[r, c]]` applies to detector pixel
/// `(min_row + r, min_col + c)`; weights sum to 1 within floating-point
/// tolerance.
#[derive(Debug, Clone)]
pub struct PsfKernel {
    weights: Array2<f64>,
    min_row: i64,
    min_col: i64,
}

impl PsfKernel {
    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    /// Detector row of the kernel grid's first row.
    pub fn min_row(&self) -> i64 {
        self.min_row
    }

    /// Detector column of the kernel grid's first column.
    pub fn min_col(&self) -> i64 {
        self.min_col
    }
}

/// Capability interface for wavelength-dependent PSF generation.
pub trait PsfModel: Send + Sync {
    /// PSF FWHM in pixels at `wavelength_nm`.
    fn fwhm_at(&self, wavelength_nm: f64) -> f64;

    /// Realize a normalized kernel centered at the sub-pixel position
    /// `(column, row)`.
    fn kernel_at(&self, wavelength_nm: f64, column: f64, row: f64) -> PsfKernel;

    /// Half-width of the kernel footprint in pixels at `wavelength_nm`.
    fn footprint_radius(&self, wavelength_nm: f64) -> i64;
}

/// Circular Gaussian PSF with FWHM interpolated from a calibration table.
#[derive(Debug, Clone)]
pub struct GaussianPsf {
    wavelengths_nm: Vec<f64>,
    fwhms_px: Vec<f64>,
    /// Kernel footprint extends this many sigmas from the center.
    footprint_sigmas: f64,
}

impl GaussianPsf {
    /// Default footprint cutoff; 4σ captures all but ~6e-5 of the flux.
    pub const DEFAULT_FOOTPRINT_SIGMAS: f64 = 4.0;

    /// Wavelength-independent PSF.
    pub fn with_constant_fwhm(fwhm_px: f64) -> Self {
        Self {
            wavelengths_nm: vec![0.0, f64::MAX],
            fwhms_px: vec![fwhm_px, fwhm_px],
            footprint_sigmas: Self::DEFAULT_FOOTPRINT_SIGMAS,
        }
    }

    /// FWHM varying across the band via linear interpolation; lookups clamp
    /// to the table endpoints.
    ///
    /// Malformed tables are programming errors and panic here rather than
    /// surfacing mid-exposure.
    pub fn with_fwhm_table(wavelengths_nm: Vec<f64>, fwhms_px: Vec<f64>) -> Self {
        if wavelengths_nm.len() != fwhms_px.len() {
            panic!("FWHM table lengths differ");
        }
        if wavelengths_nm.len() < 2 {
            panic!("FWHM table needs at least 2 points");
        }
        if wavelengths_nm.windows(2).any(|w| w[1] <= w[0]) {
            panic!("FWHM table wavelengths must be strictly ascending");
        }
        if fwhms_px.iter().any(|&f| !f.is_finite() || f <= 0.0) {
            panic!("FWHM values must be finite and positive");
        }
        Self {
            wavelengths_nm,
            fwhms_px,
            footprint_sigmas: Self::DEFAULT_FOOTPRINT_SIGMAS,
        }
    }

    pub fn with_footprint_sigmas(mut self, footprint_sigmas: f64) -> Self {
        self.footprint_sigmas = footprint_sigmas;
        self
    }
}

impl PsfModel for GaussianPsf {
    fn fwhm_at(&self, wavelength_nm: f64) -> f64 {
        interp_clamped(wavelength_nm, &self.wavelengths_nm, &self.fwhms_px)
            .expect("FWHM table validated at construction")
    }

    fn footprint_radius(&self, wavelength_nm: f64) -> i64 {
        let sigma = fwhm_to_sigma(self.fwhm_at(wavelength_nm));
        (self.footprint_sigmas * sigma).ceil().max(1.0) as i64
    }

    fn kernel_at(&self, wavelength_nm: f64, column: f64, row: f64) -> PsfKernel {
        let sigma = fwhm_to_sigma(self.fwhm_at(wavelength_nm));
        let radius = self.footprint_radius(wavelength_nm);

        let center_row = row.round() as i64;
        let center_col = column.round() as i64;
        let size = (2 * radius + 1) as usize;

        let min_row = center_row - radius;
        let min_col = center_col - radius;

        let inv_two_sigma_sq = 1.0 / (2.0 * sigma * sigma);
        let mut weights = Array2::<f64>::zeros((size, size));
        for r in 0..size {
            let dy = (min_row + r as i64) as f64 - row;
            for c in 0..size {
                let dx = (min_col + c as i64) as f64 - column;
                weights[[r, c]] = (-(dx * dx + dy * dy) * inv_two_sigma_sq).exp();
            }
        }

        // Normalize so the discrete kernel deposits exactly the flux handed
        // to it when fully on-detector.
        let total = weights.sum();
        if total > 0.0 {
            weights.mapv_inplace(|w| w / total);
        }

        PsfKernel {
            weights,
            min_row,
            min_col,
        }
    }
}
