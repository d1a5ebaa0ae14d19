//! Errors that can occur within an instrument model

use thiserror::Error;

#[derive(Error, Debug)]
/// All the errors an instrument model can raise
pub enum InstrumentError {
    #[error("aperture mask covers {received} horns, but the instrument has {expected}")]
    /// The mask doesn't have one flag per horn
    MaskLength {
        /// number of horns in the instrument
        expected: usize,
        /// number of flags in the mask
        received: usize,
    },

    #[error("bad array shape supplied to argument {argument} of function {function}. expected {expected}, received {received}")]
    /// Error for bad array shape in provided argument
    BadArrayShape {
        /// The argument name within the function
        argument: String,
        /// The function name
        function: String,
        /// The expected shape
        expected: String,
        /// The shape that was received instead
        received: String,
    },

    #[error("horn index {index} is outside of the {num_horns} horn array")]
    /// A horn index which doesn't map onto the array
    HornIndex {
        /// the offending index
        index: usize,
        /// number of horns in the array
        num_horns: usize,
    },

    #[error("instrument model failure: {0}")]
    /// Any other failure from an external instrument model
    Model(Box<dyn std::error::Error + Send + Sync>),
}
