//! Errors that can occur in selfcal

use thiserror::Error;

use crate::{instrument::InstrumentError, pointing::PointingError};

#[derive(Error, Debug)]
/// Errors from parsing the command line
pub enum CLIError {
    #[error("Invalid Command Line Argument {option}\nexpected: {expected}\nreceived: {received}")]
    /// When a bad value is provided to a command line argument
    InvalidCommandLineArgument {
        /// The argument name within the parser
        option: String,
        /// The type of value that was expected
        expected: String,
        /// The value that was received instead
        received: String,
    },
}

#[derive(Error, Debug)]
/// An enum of all the errors possible in selfcal
pub enum SelfCalError {
    #[error("invalid focal plane grid nn={nn} xmin={xmin} xmax={xmax}. need nn > 0 and finite xmin < xmax")]
    /// Error when the focal plane grid can't be constructed.
    InvalidGrid {
        /// The number of pixels on one side of the grid
        nn: usize,
        /// The lower bound of both grid axes [m]
        xmin: f64,
        /// The upper bound of both grid axes [m]
        xmax: f64,
    },

    #[error(transparent)]
    /// Error for a bad pointing sequence or irradiance
    InvalidPointing(#[from] PointingError),

    #[error("invalid baseline ({i}, {j}). horns must differ and lie in [1, {num_apertures}]")]
    /// Error for a baseline which repeats a horn or addresses a horn that doesn't exist
    InvalidBaseline {
        /// First horn identity (1-indexed)
        i: usize,
        /// Second horn identity (1-indexed)
        j: usize,
        /// The number of horns in the instrument
        num_apertures: usize,
    },

    #[error(transparent)]
    /// Error raised by the instrument model, passed through untouched
    Instrument(#[from] InstrumentError),

    #[error(transparent)]
    /// Error derived from [`CLIError`]
    CLIError(#[from] CLIError),

    #[cfg(feature = "cli")]
    #[error(transparent)]
    /// Error derived from [`clap::Error`]
    ClapError(#[from] clap::Error),

    #[error("Dry run")]
    /// Not an error, the caller asked to stop after printing the summary
    DryRun {},
}
