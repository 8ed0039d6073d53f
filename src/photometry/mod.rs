//! Stellar spectra and transit light-curve modulation.
//!
//! The spectral model provider supplies a wavelength-indexed photon rate for
//! the host star; combined with a transit light curve it yields the dimmed
//! spectrum at any time inside the supported orbital-phase window.

pub mod lightcurve;
pub mod source;
pub mod spectrum;

pub use lightcurve::{
    ConstantLightCurve, InvalidTimeError, LightCurve, TransmissionSpectrum, TrapezoidTransit,
};
pub use source::TransitSource;
pub use spectrum::{FlatSpectrum, SpectrumError, SpectrumSample, StellarSpectrum, TabulatedSpectrum};
