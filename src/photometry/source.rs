//! Transit-dimmed spectral source: the spectral model provider.
//!
//! Combines an immutable stellar spectrum with a light-curve model. The
//! depth multiplier is wavelength-independent unless a transmission
//! spectrum is attached, in which case each sample is dimmed by its own
//! per-wavelength depth.

use std::sync::Arc;

use super::lightcurve::{InvalidTimeError, LightCurve, TransmissionSpectrum};
use super::spectrum::{SpectrumSample, StellarSpectrum};

/// Pure function of time plus immutable spectrum/orbit parameters; no
/// side effects, freely shareable across exposure workers.
#[derive(Clone)]
pub struct TransitSource {
    spectrum: Arc<dyn StellarSpectrum>,
    light_curve: Arc<dyn LightCurve>,
    transmission: Option<TransmissionSpectrum>,
}

impl TransitSource {
    pub fn new(spectrum: Arc<dyn StellarSpectrum>, light_curve: Arc<dyn LightCurve>) -> Self {
        Self {
            spectrum,
            light_curve,
            transmission: None,
        }
    }

    /// Attach a chromatic transmission spectrum; transit depth then varies
    /// per wavelength sample.
    pub fn with_transmission(mut self, transmission: TransmissionSpectrum) -> Self {
        self.transmission = Some(transmission);
        self
    }

    /// Wavelength coverage of the underlying stellar spectrum.
    pub fn band(&self) -> (f64, f64) {
        self.spectrum.band()
    }

    /// The transit-dimmed spectrum at `time_s`.
    ///
    /// Fails with [`InvalidTimeError`] when `time_s` lies outside the light
    /// curve's supported orbital-phase domain.
    pub fn spectrum_at(&self, time_s: f64) -> Result<Vec<SpectrumSample>, InvalidTimeError> {
        let base_flux = self.light_curve.relative_flux(time_s)?;
        let occulted = 1.0 - base_flux;

        let samples = self
            .spectrum
            .samples()
            .iter()
            .map(|s| {
                let dimming = match &self.transmission {
                    Some(t) => 1.0 - t.scale_at(s.wavelength_nm) * occulted,
                    None => base_flux,
                };
                SpectrumSample {
                    wavelength_nm: s.wavelength_nm,
                    flux_density: s.flux_density * dimming.max(0.0),
                }
            })
            .collect();

        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photometry::lightcurve::{ConstantLightCurve, TrapezoidTransit};
    use crate::photometry::spectrum::FlatSpectrum;
    use approx::assert_relative_eq;

    fn flat_source(light_curve: Arc<dyn LightCurve>) -> TransitSource {
        let spectrum = Arc::new(FlatSpectrum::new(1100.0, 1700.0, 100.0, 7).unwrap());
        TransitSource::new(spectrum, light_curve)
    }

    #[test]
    fn test_out_of_transit_passthrough() {
        let source = flat_source(Arc::new(ConstantLightCurve));
        let samples = source.spectrum_at(0.0).unwrap();
        assert_eq!(samples.len(), 7);
        assert!(samples.iter().all(|s| s.flux_density == 100.0));
    }

    #[test]
    fn test_achromatic_dimming() {
        let transit = TrapezoidTransit::new(0.0, 0.02, 100.0, 10.0, 300.0);
        let source = flat_source(Arc::new(transit));
        let samples = source.spectrum_at(0.0).unwrap();
        for s in samples {
            assert_relative_eq!(s.flux_density, 98.0);
        }
    }

    #[test]
    fn test_chromatic_dimming_varies_with_wavelength() {
        let transit = TrapezoidTransit::new(0.0, 0.02, 100.0, 10.0, 300.0);
        let transmission =
            TransmissionSpectrum::from_table(vec![1100.0, 1700.0], vec![1.0, 2.0]).unwrap();
        let source = flat_source(Arc::new(transit)).with_transmission(transmission);

        let samples = source.spectrum_at(0.0).unwrap();
        // Blue end: nominal depth; red end: doubled depth
        assert_relative_eq!(samples[0].flux_density, 98.0);
        assert_relative_eq!(samples[6].flux_density, 96.0);
    }

    #[test]
    fn test_invalid_time_propagates() {
        let transit = TrapezoidTransit::new(0.0, 0.02, 100.0, 10.0, 300.0);
        let source = flat_source(Arc::new(transit));
        assert!(source.spectrum_at(1e6).is_err());
    }
}
