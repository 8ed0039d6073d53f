//! Transit light-curve interface and chromatic depth tables.
//!
//! The orbital/light-curve physics lives in an external library; the
//! simulator only consumes `relative_flux(time) -> [0, 1]` over a declared
//! time domain. A trapezoid model is provided so demos and tests do not need
//! the external dependency, and a [`TransmissionSpectrum`] table turns the
//! achromatic light curve into per-wavelength transit depths.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::algo::interp::interp_clamped;
use crate::algo::InterpError;

/// Query time outside the orbital-phase domain supported by the light curve.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
#[error("time {time_s:.3}s outside supported orbital-phase domain [{start_s:.3}s, {end_s:.3}s]")]
pub struct InvalidTimeError {
    /// The offending query time, seconds.
    pub time_s: f64,
    /// Domain lower bound, seconds.
    pub start_s: f64,
    /// Domain upper bound, seconds.
    pub end_s: f64,
}

/// External light-curve model seam.
///
/// Implementations are pure functions of time plus immutable orbital
/// parameters and must be shareable across exposure workers.
pub trait LightCurve: Send + Sync {
    /// Supported time domain as `(start_s, end_s)`.
    fn domain(&self) -> (f64, f64);

    /// Relative stellar flux in `[0, 1]` at `time_s`.
    fn relative_flux(&self, time_s: f64) -> Result<f64, InvalidTimeError>;

    /// Domain check shared by implementations.
    fn check_time(&self, time_s: f64) -> Result<(), InvalidTimeError> {
        let (start_s, end_s) = self.domain();
        if time_s < start_s || time_s > end_s {
            return Err(InvalidTimeError {
                time_s,
                start_s,
                end_s,
            });
        }
        Ok(())
    }
}

/// Out-of-transit source: relative flux 1.0 everywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantLightCurve;

impl LightCurve for ConstantLightCurve {
    fn domain(&self) -> (f64, f64) {
        (f64::NEG_INFINITY, f64::INFINITY)
    }

    fn relative_flux(&self, _time_s: f64) -> Result<f64, InvalidTimeError> {
        Ok(1.0)
    }
}

/// Trapezoidal transit: linear ingress, flat bottom, linear egress.
///
/// Not a physical limb-darkened model; a stand-in with the right gross
/// shape for exercising the pipeline without the external orbit library.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrapezoidTransit {
    /// Transit center, seconds.
    pub mid_time_s: f64,
    /// Fractional depth at mid-transit, e.g. 0.01 for 1%.
    pub depth: f64,
    /// First-to-fourth-contact duration, seconds.
    pub total_duration_s: f64,
    /// Ingress (= egress) duration, seconds.
    pub ingress_s: f64,
    /// Supported domain half-width around mid-transit, seconds.
    pub domain_half_width_s: f64,
}

impl TrapezoidTransit {
    pub fn new(
        mid_time_s: f64,
        depth: f64,
        total_duration_s: f64,
        ingress_s: f64,
        domain_half_width_s: f64,
    ) -> Self {
        Self {
            mid_time_s,
            depth,
            total_duration_s,
            ingress_s,
            domain_half_width_s,
        }
    }
}

impl LightCurve for TrapezoidTransit {
    fn domain(&self) -> (f64, f64) {
        (
            self.mid_time_s - self.domain_half_width_s,
            self.mid_time_s + self.domain_half_width_s,
        )
    }

    fn relative_flux(&self, time_s: f64) -> Result<f64, InvalidTimeError> {
        self.check_time(time_s)?;

        let dt = (time_s - self.mid_time_s).abs();
        let half_total = self.total_duration_s / 2.0;
        let half_flat = (half_total - self.ingress_s).max(0.0);

        let occulted = if dt >= half_total {
            0.0
        } else if dt <= half_flat {
            1.0
        } else {
            // Inside ingress or egress ramp
            (half_total - dt) / self.ingress_s
        };

        Ok(1.0 - self.depth * occulted)
    }
}

/// Per-wavelength transit-depth scaling relative to the light curve's
/// nominal depth.
///
/// A scale of 1.0 reproduces the achromatic light curve; larger values
/// deepen the transit at that wavelength (a transmission-spectrum feature).
/// Lookups clamp to the table endpoints since the depth curve varies slowly
/// compared to the instrument band.
#[derive(Debug, Clone)]
pub struct TransmissionSpectrum {
    wavelengths_nm: Vec<f64>,
    depth_scales: Vec<f64>,
}

impl TransmissionSpectrum {
    pub fn from_table(
        wavelengths_nm: Vec<f64>,
        depth_scales: Vec<f64>,
    ) -> Result<Self, InterpError> {
        if wavelengths_nm.len() < 2 {
            return Err(InterpError::InsufficientData);
        }
        // Probe once so malformed tables fail at construction, not mid-exposure.
        interp_clamped(wavelengths_nm[0], &wavelengths_nm, &depth_scales)?;
        Ok(Self {
            wavelengths_nm,
            depth_scales,
        })
    }

    /// Depth scale factor at `wavelength_nm`.
    pub fn scale_at(&self, wavelength_nm: f64) -> f64 {
        interp_clamped(wavelength_nm, &self.wavelengths_nm, &self.depth_scales)
            .expect("table validated at construction")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn transit() -> TrapezoidTransit {
        TrapezoidTransit::new(1000.0, 0.01, 200.0, 20.0, 600.0)
    }

    #[test]
    fn test_out_of_transit_flux_is_unity() {
        let t = transit();
        assert_relative_eq!(t.relative_flux(700.0).unwrap(), 1.0);
        assert_relative_eq!(t.relative_flux(1300.0).unwrap(), 1.0);
    }

    #[test]
    fn test_mid_transit_depth() {
        let t = transit();
        assert_relative_eq!(t.relative_flux(1000.0).unwrap(), 0.99);
    }

    #[test]
    fn test_ingress_is_linear() {
        let t = transit();
        // Halfway through ingress: contact 1 at t=900, contact 2 at t=920
        assert_relative_eq!(t.relative_flux(910.0).unwrap(), 1.0 - 0.005, epsilon = 1e-12);
    }

    #[test]
    fn test_time_outside_domain_rejected() {
        let t = transit();
        let err = t.relative_flux(2000.0).unwrap_err();
        assert_relative_eq!(err.time_s, 2000.0);
        assert_relative_eq!(err.end_s, 1600.0);
        assert!(t.relative_flux(100.0).is_err());
    }

    #[test]
    fn test_constant_curve_never_fails() {
        let c = ConstantLightCurve;
        assert_eq!(c.relative_flux(-1e12).unwrap(), 1.0);
        assert_eq!(c.relative_flux(1e12).unwrap(), 1.0);
    }

    #[test]
    fn test_transmission_scale_lookup() {
        let ts =
            TransmissionSpectrum::from_table(vec![1100.0, 1400.0, 1700.0], vec![1.0, 1.2, 0.9])
                .unwrap();
        assert_relative_eq!(ts.scale_at(1100.0), 1.0);
        assert_relative_eq!(ts.scale_at(1250.0), 1.1);
        // Clamped beyond table ends
        assert_relative_eq!(ts.scale_at(900.0), 1.0);
        assert_relative_eq!(ts.scale_at(2000.0), 0.9);
    }
}
