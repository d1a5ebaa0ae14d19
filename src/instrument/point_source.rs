//! A synthetic, perfectly linear instrument.
//!
//! Each horn re-emits the incoming plane wave as an isotropic point source. The field at a
//! focal plane position is the plain sum of the open horns' contributions with no coupling
//! between horns, so the self calibration combination recovers a baseline's fringes exactly.
//! Useful for validating the engine and for quick looks at fringe patterns.

use std::f64::consts::PI;

use log::trace;

use crate::{
    aperture::ApertureMask,
    constants::{
        DEFAULT_DETECTOR_AREA_M2, DEFAULT_FILTER_FREQUENCY_HZ, TD_HORNS_PER_SIDE,
        TD_HORN_SPACING_M, VEL_C,
    },
    ndarray::{Array2, ArrayView1, ArrayView2, Axis, Zip},
    pointing::{Irradiance, Pointings},
    Complex,
};

use super::{check_mask_len, Instrument, InstrumentError};

/// An array of point-like horns in the `z = 0` plane.
#[derive(Debug, Clone, PartialEq)]
pub struct PointSourceArray {
    /// horn positions, dimensions `[horn][xyz]` in metres
    horn_positions: Array2<f64>,
    mask: ApertureMask,
    /// centre of the filter band [Hz]
    pub frequency_hz: f64,
    /// collecting area of a detector [m^2]
    pub detector_area_m2: f64,
}

impl PointSourceArray {
    /// Create an array from explicit horn positions, all horns open.
    ///
    /// # Errors
    ///
    /// [`InstrumentError::BadArrayShape`] if `horn_positions` isn't `[horn][xyz]`, or holds a
    /// non-finite coordinate.
    pub fn new(horn_positions: Array2<f64>) -> Result<Self, InstrumentError> {
        let (num_horns, num_coords) = horn_positions.dim();
        if num_coords != 3 || horn_positions.iter().any(|c| !c.is_finite()) {
            return Err(InstrumentError::BadArrayShape {
                argument: "horn_positions".into(),
                function: "PointSourceArray::new".into(),
                expected: "(num_horns, 3), all finite".into(),
                received: format!("{:?}", horn_positions.dim()),
            });
        }
        Ok(Self {
            horn_positions,
            mask: ApertureMask::all_open(num_horns),
            frequency_hz: DEFAULT_FILTER_FREQUENCY_HZ,
            detector_area_m2: DEFAULT_DETECTOR_AREA_M2,
        })
    }

    /// A square array of `horns_per_side * horns_per_side` horns centred on the optical axis.
    ///
    /// Horns are numbered row by row: horn 1 is at the lowest x and y, horn `horns_per_side`
    /// ends the first row.
    pub fn square(horns_per_side: usize, spacing_m: f64) -> Self {
        let centre = (horns_per_side as f64 - 1.) / 2.;
        let horn_positions =
            Array2::from_shape_fn((horns_per_side * horns_per_side, 3), |(horn_idx, coord)| {
                match coord {
                    0 => ((horn_idx % horns_per_side) as f64 - centre) * spacing_m,
                    1 => ((horn_idx / horns_per_side) as f64 - centre) * spacing_m,
                    _ => 0.,
                }
            });
        let num_horns = horn_positions.dim().0;
        Self {
            horn_positions,
            mask: ApertureMask::all_open(num_horns),
            frequency_hz: DEFAULT_FILTER_FREQUENCY_HZ,
            detector_area_m2: DEFAULT_DETECTOR_AREA_M2,
        }
    }

    /// The 8x8 horn technological demonstrator.
    pub fn td() -> Self {
        Self::square(TD_HORNS_PER_SIDE, TD_HORN_SPACING_M)
    }

    /// Set the centre of the filter band [Hz]
    pub fn with_frequency_hz(mut self, frequency_hz: f64) -> Self {
        self.frequency_hz = frequency_hz;
        self
    }

    /// Set the detector collecting area [m^2]
    pub fn with_detector_area_m2(mut self, detector_area_m2: f64) -> Self {
        self.detector_area_m2 = detector_area_m2;
        self
    }

    /// Horn positions, dimensions `[horn][xyz]`
    pub fn horn_positions(&self) -> ArrayView2<f64> {
        self.horn_positions.view()
    }

    fn wavenumber(&self) -> f64 {
        2. * PI * self.frequency_hz / VEL_C
    }
}

impl Instrument for PointSourceArray {
    fn num_apertures(&self) -> usize {
        self.horn_positions.dim().0
    }

    fn aperture_mask(&self) -> &ApertureMask {
        &self.mask
    }

    fn set_aperture_mask(&mut self, mask: ApertureMask) -> Result<(), InstrumentError> {
        check_mask_len(&mask, self.num_apertures())?;
        self.mask = mask;
        Ok(())
    }

    fn response(
        &self,
        pointings: &Pointings,
        irradiance: &Irradiance,
        positions: ArrayView2<f64>,
    ) -> Result<Array2<Complex<f64>>, InstrumentError> {
        if positions.dim().1 != 3 {
            return Err(InstrumentError::BadArrayShape {
                argument: "positions".into(),
                function: "PointSourceArray::response".into(),
                expected: "(num_points, 3)".into(),
                received: format!("{:?}", positions.dim()),
            });
        }
        let wavenumber = self.wavenumber();
        let open_horns: Vec<[f64; 3]> = self
            .horn_positions
            .axis_iter(Axis(0))
            .zip(self.mask.as_slice())
            .filter(|&(_, &open)| open)
            .map(|(pos, _)| [pos[0], pos[1], pos[2]])
            .collect();
        trace!(
            "point source response: {} open horns, {} points, {} pointings",
            open_horns.len(),
            positions.dim().0,
            pointings.len()
        );

        // a point on a horn has no finite field
        for (point_idx, position) in positions.axis_iter(Axis(0)).enumerate() {
            if let Some(horn) = open_horns
                .iter()
                .find(|h| distance(position, h) == 0.)
            {
                return Err(InstrumentError::Model(
                    format!("focal plane point {point_idx} lies on the horn at {horn:?}").into(),
                ));
            }
        }

        // per pointing: amplitude and the incoming wave's phase delay at each open horn
        let pointing_terms: Vec<(f64, Vec<f64>)> = pointings
            .iter()
            .enumerate()
            .map(|(ptg_idx, pointing)| {
                let amplitude = (irradiance.at(ptg_idx) * self.detector_area_m2).sqrt();
                let n = pointing.direction();
                let delays = open_horns
                    .iter()
                    .map(|h| wavenumber * (n[0] * h[0] + n[1] * h[1] + n[2] * h[2]))
                    .collect();
                (amplitude, delays)
            })
            .collect();

        let mut field = Array2::<Complex<f64>>::zeros((positions.dim().0, pointings.len()));
        Zip::from(field.axis_iter_mut(Axis(0)))
            .and(positions.axis_iter(Axis(0)))
            .par_for_each(|mut field_row, position| {
                // distance from each open horn to this point
                let paths: Vec<f64> = open_horns
                    .iter()
                    .map(|h| distance(position, h))
                    .collect();
                for (value, (amplitude, delays)) in field_row.iter_mut().zip(&pointing_terms) {
                    *value = paths
                        .iter()
                        .zip(delays)
                        .map(|(&path, &delay)| {
                            Complex::from_polar(amplitude / path, delay + wavenumber * path)
                        })
                        .sum();
                }
            });
        Ok(field)
    }
}

fn distance(position: ArrayView1<f64>, horn: &[f64; 3]) -> f64 {
    let (dx, dy, dz) = (
        position[0] - horn[0],
        position[1] - horn[1],
        position[2] - horn[2],
    );
    (dx * dx + dy * dy + dz * dz).sqrt()
}
