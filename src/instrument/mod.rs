//! The instrument model boundary.
//!
//! The self calibration engine never looks inside the physics of the instrument. All it needs
//! is an aperture mask that can be replaced wholesale, and the complex field on a set of focal
//! plane positions for a set of source pointings. Anything else (detector area, filter band,
//! horn geometry, primary and secondary beams) belongs to the model.

pub mod error;
pub mod point_source;

pub use error::InstrumentError;
pub use point_source::PointSourceArray;

use crate::{
    aperture::ApertureMask,
    ndarray::{Array2, ArrayView2},
    pointing::{Irradiance, Pointings},
    Complex,
};

/// An instrument whose horn array can be masked, and which can compute the field its open
/// horns produce on the focal plane.
pub trait Instrument {
    /// The number of horns in the array. Horn identities run from 1 to this number.
    fn num_apertures(&self) -> usize;

    /// The current open / closed state of every horn.
    fn aperture_mask(&self) -> &ApertureMask;

    /// Replace the whole aperture mask.
    ///
    /// # Errors
    ///
    /// Implementations should return [`InstrumentError::MaskLength`] if the mask doesn't have
    /// exactly [`Instrument::num_apertures`] flags.
    fn set_aperture_mask(&mut self, mask: ApertureMask) -> Result<(), InstrumentError>;

    /// Compute the complex field produced by the currently open horns.
    ///
    /// `positions` has dimensions `[point][xyz]` in metres. The result must have dimensions
    /// `[point][pointing]`.
    ///
    /// # Errors
    ///
    /// Whatever the model can't handle, e.g. malformed geometry.
    fn response(
        &self,
        pointings: &Pointings,
        irradiance: &Irradiance,
        positions: ArrayView2<f64>,
    ) -> Result<Array2<Complex<f64>>, InstrumentError>;
}

/// Check that a mask fits an instrument with `num_apertures` horns.
///
/// # Errors
///
/// [`InstrumentError::MaskLength`] if it doesn't.
pub fn check_mask_len(mask: &ApertureMask, num_apertures: usize) -> Result<(), InstrumentError> {
    if mask.len() != num_apertures {
        return Err(InstrumentError::MaskLength {
            expected: num_apertures,
            received: mask.len(),
        });
    }
    Ok(())
}
