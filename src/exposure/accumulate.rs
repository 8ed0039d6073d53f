//! Frame accumulation: the exposure-synthesis inner loop.
//!
//! The accumulator partitions an exposure into sub-integration slices short
//! enough that the scan barely moves within one slice, evaluates the
//! transit-dimmed spectrum at each slice midpoint, disperses every spectral
//! sample to its trace position, offsets the row by the instantaneous scan
//! position, and spreads the incremental charge onto the pixel grid through
//! the wavelength-dependent PSF kernel. Scheduled read timestamps snapshot
//! the running buffer as finalized [`DetectorFrame`]s without resetting it
//! (non-destructive reads).
//!
//! Accumulation stays in floating-point electrons with no clamping;
//! saturation and every other detector effect is applied downstream by the
//! noise pipeline.

use log::debug;
use ndarray::Array2;
use thiserror::Error;

use crate::detector::DetectorFrame;
use crate::instrument::{InstrumentModel, PsfKernel};
use crate::photometry::{InvalidTimeError, TransitSource};

use super::config::ExposureConfig;

/// Tolerance when matching slice edges against scheduled read timestamps.
const EDGE_EPS: f64 = 1e-9;

/// Failures during frame accumulation.
#[derive(Debug, Error)]
pub enum AccumulationError {
    #[error(transparent)]
    InvalidTime(#[from] InvalidTimeError),
}

/// Produces the sequence of idealized detector frames for one exposure.
pub struct FrameAccumulator<'a> {
    config: &'a ExposureConfig,
    source: &'a TransitSource,
    instrument: &'a InstrumentModel,
}

impl<'a> FrameAccumulator<'a> {
    pub fn new(
        config: &'a ExposureConfig,
        source: &'a TransitSource,
        instrument: &'a InstrumentModel,
    ) -> Self {
        Self {
            config,
            source,
            instrument,
        }
    }

    /// Number of sub-integration slices this exposure resolves to.
    pub fn slice_count(&self) -> usize {
        self.config.sub_slice.slice_count(self.config.scan.span_px())
    }

    /// Integrate the exposure starting at absolute time `exposure_start_s`,
    /// returning one finalized frame per scheduled read.
    pub fn accumulate(
        &self,
        exposure_start_s: f64,
    ) -> Result<Vec<DetectorFrame>, AccumulationError> {
        let shape = self.config.detector.geometry.shape();
        let mut buffer = Array2::<f64>::zeros(shape);
        let mut frames = Vec::with_capacity(self.config.n_reads());

        let edges = self.time_edges();
        let mut next_read = 0;
        let mut dropped_samples = 0_usize;

        for window in edges.windows(2) {
            let (t0, t1) = (window[0], window[1]);
            let dt = t1 - t0;
            if dt <= 0.0 {
                continue;
            }
            let t_mid = (t0 + t1) / 2.0;

            let spectrum = self.source.spectrum_at(exposure_start_s + t_mid)?;
            let scan_offset = self.config.scan.position_at(t_mid);

            for sample in &spectrum {
                if sample.flux_density <= 0.0 {
                    continue;
                }
                // Out-of-band samples are excluded, never extrapolated.
                let (col, row) = match self.instrument.dispersion.pixel_at(sample.wavelength_nm) {
                    Ok(pos) => pos,
                    Err(_) => {
                        dropped_samples += 1;
                        continue;
                    }
                };

                let sensitivity = self.instrument.sensitivity.at(sample.wavelength_nm);
                let electrons = sample.flux_density * sensitivity * dt;
                if electrons <= 0.0 {
                    continue;
                }

                let kernel = self.instrument.psf.kernel_at(
                    sample.wavelength_nm,
                    col,
                    row + scan_offset,
                );
                deposit(&mut buffer, &kernel, electrons);
            }

            // Snapshot at scheduled read boundaries; accumulation continues
            // afterwards without resetting.
            while next_read < self.config.read_times_s.len()
                && (t1 - self.config.read_times_s[next_read]).abs() < EDGE_EPS
            {
                frames.push(DetectorFrame::new(
                    buffer.clone(),
                    next_read,
                    self.config.read_times_s[next_read],
                ));
                next_read += 1;
            }
        }

        if dropped_samples > 0 {
            debug!(
                "excluded {dropped_samples} out-of-band sample contributions during accumulation"
            );
        }

        Ok(frames)
    }

    /// Segment boundaries: uniform slice edges merged with the read schedule
    /// so snapshots land exactly on their timestamps.
    fn time_edges(&self) -> Vec<f64> {
        let n_slices = self.slice_count();
        let duration = self.config.duration_s;

        let mut edges: Vec<f64> = (0..=n_slices)
            .map(|i| duration * i as f64 / n_slices as f64)
            .collect();
        edges.extend(self.config.read_times_s.iter().copied());
        edges.sort_by(|a, b| a.partial_cmp(b).unwrap());
        edges.dedup_by(|a, b| (*a - *b).abs() < EDGE_EPS);
        edges
    }
}

/// Add `kernel × electrons` into the buffer, dropping any footprint that
/// falls off the detector.
fn deposit(buffer: &mut Array2<f64>, kernel: &PsfKernel, electrons: f64) {
    let (rows, cols) = buffer.dim();
    for ((r, c), &w) in kernel.weights().indexed_iter() {
        let row = kernel.min_row() + r as i64;
        let col = kernel.min_col() + c as i64;
        if row < 0 || col < 0 || row >= rows as i64 || col >= cols as i64 {
            continue;
        }
        buffer[[row as usize, col as usize]] += w * electrons;
    }
}
