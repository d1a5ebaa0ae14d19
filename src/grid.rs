//! The focal plane sampling grid.
//!
//! The grid is a square of `nn * nn` points spanning `[xmin, xmax)` on both axes, at the
//! detector plane depth [`DETECTOR_PLANE_Z_M`]. Points are laid out row-major: the point at
//! `(row, col)` has flat index `row * nn + col`, `x` increases along a row and `y` increases
//! down the columns.

use crate::{constants::DETECTOR_PLANE_Z_M, ndarray::Array2, SelfCalError};
use std::fmt::Display;

/// Describes a square grid of sample points on the focal plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    /// number of pixels on one side of the focal plane image
    pub nn: usize,
    /// position of the lower border of the image, relative to the centre [m]
    pub xmin: f64,
    /// position of the upper border of the image, relative to the centre [m]
    pub xmax: f64,
}

impl GridSpec {
    /// Create a validated [`GridSpec`].
    ///
    /// # Errors
    ///
    /// Returns [`SelfCalError::InvalidGrid`] if `nn` is zero, if either bound is not finite, if
    /// `xmin >= xmax`, or if the span between the bounds overflows.
    pub fn new(nn: usize, xmin: f64, xmax: f64) -> Result<Self, SelfCalError> {
        let grid = Self { nn, xmin, xmax };
        grid.validate()?;
        Ok(grid)
    }

    /// Check the grid can be sampled.
    ///
    /// # Errors
    ///
    /// see [`GridSpec::new`]
    pub fn validate(&self) -> Result<(), SelfCalError> {
        if self.nn == 0
            || !self.xmin.is_finite()
            || !self.xmax.is_finite()
            || self.xmin >= self.xmax
            || !self.step().is_finite()
        {
            return Err(SelfCalError::InvalidGrid {
                nn: self.nn,
                xmin: self.xmin,
                xmax: self.xmax,
            });
        }
        Ok(())
    }

    /// Distance between neighbouring pixels [m]
    pub fn step(&self) -> f64 {
        (self.xmax - self.xmin) / self.nn as f64
    }

    /// Total number of sample points
    pub fn num_points(&self) -> usize {
        self.nn * self.nn
    }

    /// The pixel coordinates along one axis.
    pub fn axis(&self) -> Vec<f64> {
        let step = self.step();
        (0..self.nn)
            .map(|idx| self.xmin + idx as f64 * step)
            .collect()
    }

    /// Build the 3D sample positions, dimensions `[point][xyz]`.
    pub fn positions(&self) -> Array2<f64> {
        let axis = self.axis();
        Array2::from_shape_fn((self.num_points(), 3), |(point_idx, coord)| {
            let (row, col) = (point_idx / self.nn, point_idx % self.nn);
            match coord {
                0 => axis[col],
                1 => axis[row],
                _ => DETECTOR_PLANE_Z_M,
            }
        })
    }
}

impl Display for GridSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{nn}x{nn} pixels over [{xmin}, {xmax}) m, step {step:.6} m",
            nn = self.nn,
            xmin = self.xmin,
            xmax = self.xmax,
            step = self.step(),
        )
    }
}
