//! Exposure definition and the frame accumulation engine.

pub mod accumulate;
pub mod config;

pub use accumulate::{AccumulationError, FrameAccumulator};
pub use config::{
    ExposureConfig, ExposureConfigError, NoiseToggles, PersistenceParams, SubSlicePolicy,
};
