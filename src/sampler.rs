//! Sampling the power an instrument delivers to the focal plane.

use log::trace;

use crate::{
    grid::GridSpec,
    instrument::{Instrument, InstrumentError},
    ndarray::Array3,
    pointing::{Irradiance, Pointings},
    SelfCalError,
};

/// Power on the focal plane, dimensions `[row][col][pointing]`.
pub type PowerCube = Array3<f64>;

/// Check the sampling inputs without touching the instrument.
///
/// # Errors
///
/// [`SelfCalError::InvalidGrid`] for a bad grid, [`SelfCalError::InvalidPointing`] for a bad
/// irradiance.
pub fn validate_sampling(
    grid: &GridSpec,
    pointings: &Pointings,
    irradiance: &Irradiance,
) -> Result<(), SelfCalError> {
    grid.validate()?;
    irradiance.validate(pointings.len())?;
    Ok(())
}

/// Compute the power on the focal plane for each pointing of the source, with the horn array
/// in whatever configuration the instrument currently holds.
///
/// The grid has `grid.nn` pixels on each side and sits at the detector plane. The result has
/// dimensions `[row][col][pointing]`, where pointing `k` is `pointings[k]`.
///
/// The instrument is only read, never modified.
///
/// # Errors
///
/// - [`SelfCalError::InvalidGrid`] or [`SelfCalError::InvalidPointing`] before the instrument
///   is queried
/// - [`SelfCalError::Instrument`] with the instrument's own error if the response fails, or
///   [`InstrumentError::BadArrayShape`] if the response doesn't cover every point and pointing.
///
/// # Examples
///
/// ```rust
/// use selfcal::{
///     grid::GridSpec,
///     instrument::PointSourceArray,
///     pointing::{Irradiance, Pointings},
///     sampler::sample_power,
/// };
///
/// let instrument = PointSourceArray::td();
/// let grid = GridSpec::new(10, -0.06, 0.06).unwrap();
/// let pointings = Pointings::sweep(0., 0.8, 0.2).unwrap();
///
/// let power = sample_power(&instrument, &grid, &pointings, &Irradiance::Uniform(1.)).unwrap();
/// assert_eq!(power.dim(), (10, 10, 4));
/// ```
pub fn sample_power<I>(
    instrument: &I,
    grid: &GridSpec,
    pointings: &Pointings,
    irradiance: &Irradiance,
) -> Result<PowerCube, SelfCalError>
where
    I: Instrument + ?Sized,
{
    validate_sampling(grid, pointings, irradiance)?;

    let nn = grid.nn;
    let num_pointings = pointings.len();
    let positions = grid.positions();
    trace!(
        "sampling {} points x {} pointings with mask {}",
        grid.num_points(),
        num_pointings,
        instrument.aperture_mask()
    );

    let field = instrument.response(pointings, irradiance, positions.view())?;
    if field.dim() != (grid.num_points(), num_pointings) {
        return Err(InstrumentError::BadArrayShape {
            argument: "field".into(),
            function: "Instrument::response".into(),
            expected: format!("{:?}", (grid.num_points(), num_pointings)),
            received: format!("{:?}", field.dim()),
        }
        .into());
    }

    Ok(Array3::from_shape_fn(
        (nn, nn, num_pointings),
        |(row, col, ptg)| field[(row * nn + col, ptg)].norm_sqr(),
    ))
}
