//! Source pointings and irradiance.
//!
//! The source is moved rather than the instrument, so a pointing is the direction of the
//! source relative to the instrument boresight. Pointing `k` in a [`Pointings`] maps to slice
//! `k` of the last axis of every power cube.

use std::{fmt::Display, ops::Index};

use thiserror::Error;

use crate::constants::MAX_SWEEP_POINTINGS;

#[derive(Error, Debug, Clone, PartialEq)]
/// Errors for a malformed pointing sequence or irradiance
pub enum PointingError {
    #[error("no pointings were provided")]
    /// The pointing sequence is empty
    Empty,

    #[error("pointing {index} has a non-finite direction theta={theta} phi={phi}")]
    /// A zenith or azimuth angle is NaN or infinite
    NonFinite {
        /// index of the offending pointing
        index: usize,
        /// zenith angle [rad]
        theta: f64,
        /// azimuth angle [rad]
        phi: f64,
    },

    #[error("received {thetas} zenith angles but {phis} azimuth angles")]
    /// Zenith and azimuth angles don't pair up
    AngleLength {
        /// number of zenith angles
        thetas: usize,
        /// number of azimuth angles
        phis: usize,
    },

    #[error("a sweep of {requested} pointings exceeds the limit of {max}")]
    /// A sweep whose step is too small for its range
    TooManyPointings {
        /// number of pointings the range and step would produce
        requested: f64,
        /// largest number of pointings a sweep may produce
        max: usize,
    },

    #[error("irradiance {value} for pointing {index} is negative or not finite")]
    /// Irradiance must be a finite, non-negative number
    NegativeIrradiance {
        /// index of the offending pointing
        index: usize,
        /// the value that was received
        value: f64,
    },

    #[error("expected irradiance for {expected} pointings, received {received}")]
    /// Per-pointing irradiance doesn't line up with the pointings
    IrradianceLength {
        /// number of pointings
        expected: usize,
        /// number of irradiance values
        received: usize,
    },
}

/// The direction of the source relative to the instrument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pointing {
    /// The source zenith angle [rad]
    pub theta: f64,
    /// The source azimuthal angle [rad]
    pub phi: f64,
}

impl Pointing {
    /// Create a new pointing from a zenith and azimuth angle in radians.
    pub fn new(theta: f64, phi: f64) -> Self {
        Self { theta, phi }
    }

    /// Unit vector towards the source.
    pub fn direction(&self) -> [f64; 3] {
        let (s_theta, c_theta) = self.theta.sin_cos();
        let (s_phi, c_phi) = self.phi.sin_cos();
        [s_theta * c_phi, s_theta * s_phi, c_theta]
    }

    fn is_finite(&self) -> bool {
        self.theta.is_finite() && self.phi.is_finite()
    }
}

impl Display for Pointing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(theta={:.4}, phi={:.4}) rad", self.theta, self.phi)
    }
}

/// An ordered, validated, non-empty sequence of pointings.
#[derive(Debug, Clone, PartialEq)]
pub struct Pointings(Vec<Pointing>);

impl Pointings {
    /// Validate a sequence of pointings.
    ///
    /// # Errors
    ///
    /// [`PointingError::Empty`] if there are no pointings, [`PointingError::NonFinite`] for the
    /// first pointing with a NaN or infinite angle.
    pub fn new(pointings: Vec<Pointing>) -> Result<Self, PointingError> {
        if pointings.is_empty() {
            return Err(PointingError::Empty);
        }
        if let Some((index, pointing)) = pointings.iter().enumerate().find(|(_, p)| !p.is_finite())
        {
            return Err(PointingError::NonFinite {
                index,
                theta: pointing.theta,
                phi: pointing.phi,
            });
        }
        Ok(Self(pointings))
    }

    /// Pair up zenith and azimuth angles.
    ///
    /// # Errors
    ///
    /// As [`Pointings::new`], or [`PointingError::AngleLength`] if `thetas` and `phis` differ
    /// in length.
    pub fn from_angles(thetas: &[f64], phis: &[f64]) -> Result<Self, PointingError> {
        if thetas.len() != phis.len() {
            return Err(PointingError::AngleLength {
                thetas: thetas.len(),
                phis: phis.len(),
            });
        }
        Self::new(
            thetas
                .iter()
                .zip(phis)
                .map(|(&theta, &phi)| Pointing::new(theta, phi))
                .collect(),
        )
    }

    /// A diagonal sweep where `theta = phi = start, start + step, ...` for all values `< stop`,
    /// like `numpy.arange`.
    ///
    /// # Errors
    ///
    /// [`PointingError::Empty`] if the range contains no values (including a non-positive
    /// `step`), [`PointingError::NonFinite`] for non-finite bounds,
    /// [`PointingError::TooManyPointings`] if the sweep would exceed [`MAX_SWEEP_POINTINGS`].
    pub fn sweep(start: f64, stop: f64, step: f64) -> Result<Self, PointingError> {
        if !(start.is_finite() && stop.is_finite() && step.is_finite()) {
            return Err(PointingError::NonFinite {
                index: 0,
                theta: start,
                phi: stop,
            });
        }
        if step <= 0. || stop <= start {
            return Err(PointingError::Empty);
        }
        let requested = ((stop - start) / step).ceil();
        if !requested.is_finite() || requested > MAX_SWEEP_POINTINGS as f64 {
            return Err(PointingError::TooManyPointings {
                requested,
                max: MAX_SWEEP_POINTINGS,
            });
        }
        let num = requested as usize;
        Self::new(
            (0..num)
                .map(|idx| {
                    let angle = start + idx as f64 * step;
                    Pointing::new(angle, angle)
                })
                .collect(),
        )
    }

    /// The number of pointings
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no pointings. Always false for a validated [`Pointings`].
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the pointings in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Pointing> {
        self.0.iter()
    }

    /// The pointings as a slice
    pub fn as_slice(&self) -> &[Pointing] {
        &self.0
    }
}

impl Index<usize> for Pointings {
    type Output = Pointing;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<'a> IntoIterator for &'a Pointings {
    type Item = &'a Pointing;
    type IntoIter = std::slice::Iter<'a, Pointing>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// The source spectral irradiance [W/m^2/Hz], either the same for every pointing or given
/// separately for each.
#[derive(Debug, Clone, PartialEq)]
pub enum Irradiance {
    /// One value for all pointings
    Uniform(f64),
    /// One value per pointing, in pointing order
    PerPointing(Vec<f64>),
}

impl Default for Irradiance {
    fn default() -> Self {
        Self::Uniform(1.)
    }
}

impl Irradiance {
    /// Check the irradiance is usable with `num_pointings` pointings.
    ///
    /// # Errors
    ///
    /// [`PointingError::NegativeIrradiance`] for negative, NaN or infinite values,
    /// [`PointingError::IrradianceLength`] if a per-pointing irradiance has the wrong length.
    pub fn validate(&self, num_pointings: usize) -> Result<(), PointingError> {
        match self {
            Self::Uniform(value) => check_irradiance(0, *value),
            Self::PerPointing(values) => {
                if values.len() != num_pointings {
                    return Err(PointingError::IrradianceLength {
                        expected: num_pointings,
                        received: values.len(),
                    });
                }
                values
                    .iter()
                    .enumerate()
                    .try_for_each(|(index, &value)| check_irradiance(index, value))
            }
        }
    }

    /// Irradiance at pointing `index`.
    ///
    /// Only meaningful after [`Irradiance::validate`] has succeeded.
    pub fn at(&self, index: usize) -> f64 {
        match self {
            Self::Uniform(value) => *value,
            Self::PerPointing(values) => values[index],
        }
    }
}

fn check_irradiance(index: usize, value: f64) -> Result<(), PointingError> {
    if value.is_finite() && value >= 0. {
        Ok(())
    } else {
        Err(PointingError::NegativeIrradiance { index, value })
    }
}

impl Display for Irradiance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uniform(value) => write!(f, "{value} W/m^2/Hz"),
            Self::PerPointing(values) => write!(f, "{values:?} W/m^2/Hz"),
        }
    }
}
