//! Numerical support routines shared across the simulation pipeline.

pub mod interp;
pub mod parallel;

pub use interp::{interp, InterpError};
pub use parallel::process_array_in_parallel_chunks;
