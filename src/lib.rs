#![warn(missing_docs)]
#![warn(clippy::missing_safety_doc)]
#![warn(clippy::missing_errors_doc)]

//! Selfcal isolates the interference fringes of a single baseline of a bolometric
//! interferometer by observing the horn array in seven aperture mask configurations and
//! combining the focal plane power.
//!
//! # Examples
//!
//! Here's how to recover the fringes of baseline (46, 64) on the technological demonstrator,
//! an 8x8 horn array.
//!
//! ```rust
//! use selfcal::{
//!     aperture::Baseline,
//!     combine,
//!     grid::GridSpec,
//!     instrument::PointSourceArray,
//!     pointing::{Irradiance, Pointings},
//! };
//!
//! // a synthetic linear instrument with all 64 horns open
//! let mut instrument = PointSourceArray::td();
//!
//! // sample a 20x20 pixel grid, 12cm across, at a single on-axis pointing
//! let grid = GridSpec::new(20, -0.06, 0.06).unwrap();
//! let pointings = Pointings::from_angles(&[0.], &[0.]).unwrap();
//! let baseline = Baseline::new(46, 64, 64).unwrap();
//!
//! let data = combine(
//!     &mut instrument,
//!     &baseline,
//!     &grid,
//!     &pointings,
//!     &Irradiance::Uniform(1.),
//! )
//! .unwrap();
//!
//! // the combination of all configurations reproduces the baseline alone
//! let scale = data.sij.iter().cloned().fold(0., f64::max);
//! assert!(data.max_abs_residual() < 1e-9 * scale);
//! ```
//!
//! # Details
//!
//! The instrument is anything implementing [`instrument::Instrument`]: a horn array whose
//! aperture mask can be set, and which can compute the complex field on the focal plane for a
//! set of source pointings. [`sampler::sample_power`] turns that field into a power cube, and
//! [`combine`] drives the instrument through the [`configuration::Configuration`]s.

pub use ndarray;
pub use num_complex::Complex;

#[cfg(test)]
#[macro_use]
mod test_common;

pub mod aperture;
pub mod configuration;
pub mod constants;
pub mod error;
pub use error::SelfCalError;
pub mod grid;
pub mod instrument;
pub mod pointing;
pub mod sampler;
pub mod selfcal;
pub use selfcal::{combine, combine_parallel, SelfCalContext, SelfCalContextBuilder, SelfCalData};

#[cfg(feature = "cli")]
pub mod cli;

/// Time the statements in the macro body, adding the elapsed time to the entry `$name` of
/// the duration map `$durs`. Evaluates to the value of the last statement.
#[macro_export]
macro_rules! with_increment_duration {
    ($durs:expr, $name:expr, $($s:stmt);+ $(;)?) => {
        {
            let _now = std::time::Instant::now();
            let _res = {
                $(
                    $s
                );*
            };
            *$durs.entry($name.into()).or_insert(std::time::Duration::default()) +=
                _now.elapsed();
            _res
        }
    };
}
