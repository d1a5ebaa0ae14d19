// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Useful constants.
//!
//! All constants *must* be double precision.

/// Distance of the detector plane below the focal plane reference [m]. Every
/// sampled grid point sits at this z coordinate.
pub const DETECTOR_PLANE_Z_M: f64 = -0.3;

/// Number of horns in the technological demonstrator (TD) array.
pub const TD_NUM_HORNS: usize = 64;

/// The TD horns form a square of this many horns per side.
pub const TD_HORNS_PER_SIDE: usize = 8;

/// Simulation index of TD horn 1 within the full horn array.
pub const TD_SIMULATION_INDEX_OFFSET: usize = 161;

/// Number of horns per row of the full simulated horn array.
pub const SIMULATION_HORNS_PER_ROW: usize = 22;

/// Distance between neighbouring TD horns [m].
pub const TD_HORN_SPACING_M: f64 = 0.014;

/// Centre of the default filter band [Hz].
pub const DEFAULT_FILTER_FREQUENCY_HZ: f64 = 150e9;

/// Default collecting area of a single detector [m^2].
pub const DEFAULT_DETECTOR_AREA_M2: f64 = 2.6e-6;

/// Speed of light in vacuum [m/s].
pub const VEL_C: f64 = 299_792_458.0;

/// Default number of pixels on one side of the focal plane image.
pub const DEFAULT_GRID_NN: usize = 200;

/// Default lower bound of the focal plane image [m].
pub const DEFAULT_GRID_XMIN_M: f64 = -0.06;

/// Default upper bound of the focal plane image [m].
pub const DEFAULT_GRID_XMAX_M: f64 = 0.06;

/// Default TD baseline (1-indexed horn identities).
pub const DEFAULT_TD_BASELINE: (usize, usize) = (46, 64);

/// Largest number of pointings a sweep may produce.
pub const MAX_SWEEP_POINTINGS: usize = 1 << 16;
