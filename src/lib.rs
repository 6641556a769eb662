pub mod cascade;
pub mod component;
pub mod config;
pub mod error;
pub mod field;
pub mod geometry;
pub mod integrator;
pub mod interactive;
pub mod particle;
pub mod profiler;
pub mod pulse;
pub mod scenario;
pub mod sey;
pub mod units;
pub mod vector;

pub use error::{PmtError, Result};

#[cfg(feature = "profiling")]
use once_cell::sync::Lazy;
#[cfg(feature = "profiling")]
use parking_lot::Mutex;

#[cfg(feature = "profiling")]
pub static PROFILER: Lazy<Mutex<profiler::Profiler>> =
    Lazy::new(|| Mutex::new(profiler::Profiler::new()));
