//! Detector configuration and per-pixel calibration products.

pub mod frame;

use ndarray::Array2;
use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::units::{Length, LengthExt, Temperature, TemperatureExt};

pub use frame::{DetectorFrame, FrameState, InvalidFrameStateError, RawFrame};

/// Physical pixel grid of a detector.
#[derive(Debug, Clone)]
pub struct DetectorGeometry {
    rows: usize,
    cols: usize,
    pixel_pitch: Length,
}

impl DetectorGeometry {
    pub fn of_rows_cols(rows: usize, cols: usize, pixel_pitch: Length) -> Self {
        Self {
            rows,
            cols,
            pixel_pitch,
        }
    }

    /// Grid shape as `(rows, cols)`, matching `ndarray` dimension order.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn pixel_pitch(&self) -> Length {
        self.pixel_pitch
    }

    /// Physical dimensions in micrometers as `(width_um, height_um)`.
    pub fn dimensions_um(&self) -> (f64, f64) {
        let pitch_um = self.pixel_pitch.as_micrometers();
        (self.cols as f64 * pitch_um, self.rows as f64 * pitch_um)
    }
}

/// Temperature-dependent dark current model.
///
/// Thermal dark current roughly doubles for every fixed temperature
/// increase; the model fixes the rate at a reference temperature and
/// extrapolates with a configurable doubling interval.
#[derive(Debug, Clone)]
pub struct DarkCurrentModel {
    reference_rate_e_s: f64,
    reference_temp: Temperature,
    doubling_celsius: f64,
}

impl DarkCurrentModel {
    /// Conventional doubling interval for silicon-class detectors.
    pub const DEFAULT_DOUBLING_CELSIUS: f64 = 8.0;

    pub fn from_reference_point(reference_rate_e_s: f64, reference_temp: Temperature) -> Self {
        Self {
            reference_rate_e_s,
            reference_temp,
            doubling_celsius: Self::DEFAULT_DOUBLING_CELSIUS,
        }
    }

    pub fn with_doubling_interval(mut self, doubling_celsius: f64) -> Self {
        self.doubling_celsius = doubling_celsius;
        self
    }

    /// Dark current in e⁻/pixel/s at `temperature`.
    pub fn rate_at(&self, temperature: Temperature) -> f64 {
        let delta = temperature.as_celsius() - self.reference_temp.as_celsius();
        self.reference_rate_e_s * 2.0_f64.powf(delta / self.doubling_celsius)
    }
}

/// Static description of one detector.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Name/model of the detector
    pub name: String,
    /// Pixel grid geometry
    pub geometry: DetectorGeometry,
    /// Conversion gain, electrons per ADU
    pub gain_e_per_adu: f64,
    /// Full-well saturation limit, electrons
    pub full_well_e: f64,
    /// Read noise RMS, electrons per read
    pub read_noise_e: f64,
    /// Dark current model
    pub dark_current: DarkCurrentModel,
    /// ADC bit depth
    pub bit_depth: u8,
}

impl DetectorConfig {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        geometry: DetectorGeometry,
        gain_e_per_adu: f64,
        full_well_e: f64,
        read_noise_e: f64,
        dark_current: DarkCurrentModel,
        bit_depth: u8,
    ) -> Self {
        Self {
            name: name.into(),
            geometry,
            gain_e_per_adu,
            full_well_e,
            read_noise_e,
            dark_current,
            bit_depth,
        }
    }

    /// Saturation limit expressed in post-gain ADU.
    pub fn full_well_adu(&self) -> f64 {
        self.full_well_e / self.gain_e_per_adu
    }
}

/// Unit-response flat field: every pixel at exactly 1.0.
pub fn uniform_flat_field(shape: (usize, usize)) -> Array2<f64> {
    Array2::from_elem(shape, 1.0)
}

/// Flat field with Gaussian pixel-to-pixel response scatter around 1.0,
/// clamped away from zero. Deterministic for a fixed seed.
pub fn seeded_flat_field(shape: (usize, usize), scatter: f64, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let dist = Normal::new(1.0, scatter).expect("scatter must be non-negative");
    Array2::from_shape_fn(shape, |_| dist.sample(&mut rng).max(0.01))
}

/// Standard detector models
pub mod models {
    use super::*;

    /// HgCdTe near-infrared array in a 256×256 spectroscopy subarray
    /// readout, representative of an HST/WFC3-IR-class detector.
    pub static NIR_256: Lazy<DetectorConfig> = Lazy::new(|| {
        DetectorConfig::new(
            "NIR_256",
            DetectorGeometry::of_rows_cols(256, 256, Length::from_micrometers(18.0)),
            2.5,
            78_000.0,
            20.0,
            DarkCurrentModel::from_reference_point(0.05, Temperature::from_celsius(-128.0)),
            16,
        )
    });
}
