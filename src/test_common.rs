use std::sync::{Arc, Mutex};

use crate::{
    aperture::ApertureMask,
    instrument::{check_mask_len, Instrument, InstrumentError, PointSourceArray},
    ndarray::{Array2, ArrayView2},
    pointing::{Irradiance, Pointing, Pointings},
    sampler::PowerCube,
    Complex,
};

/// Assert two power cubes agree to within `rel` of the largest value in `expected`.
#[macro_export]
macro_rules! assert_cube_close {
    ($result:expr, $expected:expr, $rel:expr) => {{
        let result = &$result;
        let expected = &$expected;
        assert_eq!(result.dim(), expected.dim());
        let scale = expected.iter().fold(0_f64, |acc, &p| acc.max(p.abs()));
        approx::assert_abs_diff_eq!(result, expected, epsilon = $rel * scale.max(f64::MIN_POSITIVE));
    }};
}

pub fn zenith() -> Pointings {
    Pointings::new(vec![Pointing::new(0., 0.)]).unwrap()
}

pub fn unit_irradiance() -> Irradiance {
    Irradiance::Uniform(1.)
}

pub fn max_abs(cube: &PowerCube) -> f64 {
    cube.iter().fold(0., |acc: f64, &p| acc.max(p.abs()))
}

/// A point source array which records the aperture mask in use each time it's sampled.
///
/// Clones share the same record.
#[derive(Debug, Clone)]
pub struct SpyInstrument {
    pub inner: PointSourceArray,
    pub sampled_masks: Arc<Mutex<Vec<ApertureMask>>>,
}

impl SpyInstrument {
    pub fn new(inner: PointSourceArray) -> Self {
        Self {
            inner,
            sampled_masks: Arc::new(Mutex::new(vec![])),
        }
    }

    pub fn sampled_masks(&self) -> Vec<ApertureMask> {
        self.sampled_masks.lock().unwrap().clone()
    }
}

impl Instrument for SpyInstrument {
    fn num_apertures(&self) -> usize {
        self.inner.num_apertures()
    }

    fn aperture_mask(&self) -> &ApertureMask {
        self.inner.aperture_mask()
    }

    fn set_aperture_mask(&mut self, mask: ApertureMask) -> Result<(), InstrumentError> {
        self.inner.set_aperture_mask(mask)
    }

    fn response(
        &self,
        pointings: &Pointings,
        irradiance: &Irradiance,
        positions: ArrayView2<f64>,
    ) -> Result<Array2<Complex<f64>>, InstrumentError> {
        self.sampled_masks
            .lock()
            .unwrap()
            .push(self.aperture_mask().clone());
        self.inner.response(pointings, irradiance, positions)
    }
}

/// An instrument whose response always fails.
#[derive(Debug, Clone)]
pub struct FailingInstrument {
    mask: ApertureMask,
    pub num_calls: Arc<Mutex<usize>>,
}

impl FailingInstrument {
    pub fn new(num_apertures: usize) -> Self {
        Self {
            mask: ApertureMask::all_open(num_apertures),
            num_calls: Arc::new(Mutex::new(0)),
        }
    }
}

impl Instrument for FailingInstrument {
    fn num_apertures(&self) -> usize {
        self.mask.len()
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
        _pointings: &Pointings,
        _irradiance: &Irradiance,
        _positions: ArrayView2<f64>,
    ) -> Result<Array2<Complex<f64>>, InstrumentError> {
        *self.num_calls.lock().unwrap() += 1;
        Err(InstrumentError::Model("malformed horn geometry".into()))
    }
}

/// An instrument which forgets the last focal plane point.
#[derive(Debug, Clone)]
pub struct ShortInstrument {
    mask: ApertureMask,
}

impl ShortInstrument {
    pub fn new(num_apertures: usize) -> Self {
        Self {
            mask: ApertureMask::all_open(num_apertures),
        }
    }
}

impl Instrument for ShortInstrument {
    fn num_apertures(&self) -> usize {
        self.mask.len()
    }

    fn aperture_mask(&self) -> &ApertureMask {
        &self.mask
    }

    fn set_aperture_mask(&mut self, mask: ApertureMask) -> Result<(), InstrumentError> {
        self.mask = mask;
        Ok(())
    }

    fn response(
        &self,
        pointings: &Pointings,
        _irradiance: &Irradiance,
        positions: ArrayView2<f64>,
    ) -> Result<Array2<Complex<f64>>, InstrumentError> {
        Ok(Array2::zeros((
            positions.dim().0.saturating_sub(1),
            pointings.len(),
        )))
    }
}
