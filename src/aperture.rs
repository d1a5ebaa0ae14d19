//! Horn (aperture) masks, baselines and horn index bookkeeping.
//!
//! Horns are addressed by a 1-indexed identity in `[1, N]`, the same numbering used when
//! manipulating the real horn switches. Internally a mask stores one flag per horn, in
//! identity order.

use std::fmt::Display;

use itertools::Itertools;

use crate::{
    constants::{
        SIMULATION_HORNS_PER_ROW, TD_HORNS_PER_SIDE, TD_NUM_HORNS, TD_SIMULATION_INDEX_OFFSET,
    },
    instrument::InstrumentError,
    SelfCalError,
};

/// The open / closed state of every horn in the array.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApertureMask(Vec<bool>);

impl ApertureMask {
    /// A mask with every horn open
    pub fn all_open(num_apertures: usize) -> Self {
        Self(vec![true; num_apertures])
    }

    /// A mask with every horn closed
    pub fn all_closed(num_apertures: usize) -> Self {
        Self(vec![false; num_apertures])
    }

    /// Build a mask from scratch by asking `is_open` about every horn identity.
    pub fn from_fn<F>(num_apertures: usize, is_open: F) -> Self
    where
        F: Fn(usize) -> bool,
    {
        Self((1..=num_apertures).map(is_open).collect())
    }

    /// Number of horns covered by the mask
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the mask covers no horns
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether horn `id` (1-indexed) is open. Horns outside the mask are reported closed.
    pub fn is_open(&self, id: usize) -> bool {
        id.checked_sub(1)
            .and_then(|idx| self.0.get(idx))
            .copied()
            .unwrap_or(false)
    }

    /// Number of open horns
    pub fn num_open(&self) -> usize {
        self.0.iter().filter(|&&open| open).count()
    }

    /// Identities of the open horns, in order
    pub fn open_ids(&self) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter(|&(_, &open)| open)
            .map(|(idx, _)| idx + 1)
            .collect()
    }

    /// Identities of the closed horns, in order
    pub fn closed_ids(&self) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter(|&(_, &open)| !open)
            .map(|(idx, _)| idx + 1)
            .collect()
    }

    /// The flags in identity order
    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }
}

impl From<Vec<bool>> for ApertureMask {
    fn from(flags: Vec<bool>) -> Self {
        Self(flags)
    }
}

impl Display for ApertureMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let num_open = self.num_open();
        let num = self.len();
        if num_open == num {
            write!(f, "all {num} open")
        } else if num_open == 0 {
            write!(f, "all {num} closed")
        } else if num_open * 2 <= num {
            write!(f, "open [{}] of {num}", self.open_ids().iter().join(", "))
        } else {
            write!(f, "closed [{}] of {num}", self.closed_ids().iter().join(", "))
        }
    }
}

/// A pair of distinct horns whose fringes we want to isolate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Baseline {
    /// first horn identity (1-indexed)
    pub i: usize,
    /// second horn identity (1-indexed)
    pub j: usize,
}

impl Baseline {
    /// Create a baseline within an array of `num_apertures` horns.
    ///
    /// # Errors
    ///
    /// [`SelfCalError::InvalidBaseline`] if `i == j` or either identity is outside
    /// `[1, num_apertures]`.
    pub fn new(i: usize, j: usize, num_apertures: usize) -> Result<Self, SelfCalError> {
        let baseline = Self { i, j };
        baseline.validate(num_apertures)?;
        Ok(baseline)
    }

    /// Check the baseline can be used on an array of `num_apertures` horns.
    ///
    /// # Errors
    ///
    /// see [`Baseline::new`]
    pub fn validate(&self, num_apertures: usize) -> Result<(), SelfCalError> {
        let in_range = |id: usize| (1..=num_apertures).contains(&id);
        if self.i == self.j || !in_range(self.i) || !in_range(self.j) {
            return Err(SelfCalError::InvalidBaseline {
                i: self.i,
                j: self.j,
                num_apertures,
            });
        }
        Ok(())
    }

    /// The same baseline with the horns in the other order
    pub fn swapped(&self) -> Self {
        Self {
            i: self.j,
            j: self.i,
        }
    }

    /// Whether horn `id` is one of the pair
    pub fn contains(&self, id: usize) -> bool {
        id == self.i || id == self.j
    }

    /// Map a TD baseline onto horn indices of the full simulated array.
    ///
    /// # Errors
    ///
    /// [`InstrumentError::HornIndex`] if either horn is not a TD horn.
    pub fn to_simulation(&self) -> Result<Self, InstrumentError> {
        Ok(Self {
            i: td_to_simulation_index(self.i)?,
            j: td_to_simulation_index(self.j)?,
        })
    }
}

impl Display for Baseline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.i, self.j)
    }
}

/// Convert the identity of a TD horn (1 to 64, numbered row by row) into its index in the
/// full simulated horn array, where the TD occupies an 8x8 corner.
///
/// # Errors
///
/// [`InstrumentError::HornIndex`] if `td_horn` is not in `[1, 64]`.
pub fn td_to_simulation_index(td_horn: usize) -> Result<usize, InstrumentError> {
    if !(1..=TD_NUM_HORNS).contains(&td_horn) {
        return Err(InstrumentError::HornIndex {
            index: td_horn,
            num_horns: TD_NUM_HORNS,
        });
    }
    let row = (td_horn - 1) / TD_HORNS_PER_SIDE;
    let col = (td_horn - 1) % TD_HORNS_PER_SIDE;
    Ok(TD_SIMULATION_INDEX_OFFSET + row * SIMULATION_HORNS_PER_ROW + col)
}

/// The inverse of [`td_to_simulation_index`].
///
/// # Errors
///
/// [`InstrumentError::HornIndex`] if `simulation_index` does not belong to a TD horn.
pub fn simulation_to_td_index(simulation_index: usize) -> Result<usize, InstrumentError> {
    let err = || InstrumentError::HornIndex {
        index: simulation_index,
        num_horns: TD_NUM_HORNS,
    };
    let offset = simulation_index
        .checked_sub(TD_SIMULATION_INDEX_OFFSET)
        .ok_or_else(err)?;
    let row = offset / SIMULATION_HORNS_PER_ROW;
    let col = offset % SIMULATION_HORNS_PER_ROW;
    if row >= TD_HORNS_PER_SIDE || col >= TD_HORNS_PER_SIDE {
        return Err(err());
    }
    Ok(row * TD_HORNS_PER_SIDE + col + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_from_fn() {
        let mask = ApertureMask::from_fn(5, |id| id % 2 == 0);
        assert_eq!(mask.as_slice(), &[false, true, false, true, false]);
        assert_eq!(mask.open_ids(), vec![2, 4]);
        assert_eq!(mask.closed_ids(), vec![1, 3, 5]);
        assert_eq!(mask.num_open(), 2);
        assert!(mask.is_open(2));
        assert!(!mask.is_open(0));
        assert!(!mask.is_open(6));
    }

    #[test]
    fn test_mask_display() {
        assert_eq!(format!("{}", ApertureMask::all_open(4)), "all 4 open");
        assert_eq!(format!("{}", ApertureMask::all_closed(4)), "all 4 closed");
        let mask = ApertureMask::from_fn(6, |id| id != 3);
        assert_eq!(format!("{mask}"), "closed [3] of 6");
        let mask = ApertureMask::from_fn(6, |id| id == 3 || id == 5);
        assert_eq!(format!("{mask}"), "open [3, 5] of 6");
    }

    #[test]
    fn test_baseline_validation() {
        assert!(Baseline::new(1, 2, 2).is_ok());
        assert!(Baseline::new(46, 64, 64).is_ok());
        assert!(matches!(
            Baseline::new(3, 3, 64),
            Err(SelfCalError::InvalidBaseline { i: 3, j: 3, .. })
        ));
        assert!(matches!(
            Baseline::new(0, 3, 64),
            Err(SelfCalError::InvalidBaseline { .. })
        ));
        assert!(matches!(
            Baseline::new(1, 65, 64),
            Err(SelfCalError::InvalidBaseline { .. })
        ));
    }

    #[test]
    fn test_baseline_swapped() {
        let baseline = Baseline { i: 46, j: 64 };
        assert_eq!(baseline.swapped(), Baseline { i: 64, j: 46 });
        assert_eq!(baseline.swapped().swapped(), baseline);
        assert!(baseline.contains(46));
        assert!(!baseline.contains(45));
    }

    #[test]
    fn test_td_to_simulation_index() {
        assert_eq!(td_to_simulation_index(1).unwrap(), 161);
        assert_eq!(td_to_simulation_index(8).unwrap(), 168);
        assert_eq!(td_to_simulation_index(9).unwrap(), 183);
        assert_eq!(td_to_simulation_index(16).unwrap(), 190);
        assert_eq!(td_to_simulation_index(46).unwrap(), 161 + 5 * 22 + 5);
        assert_eq!(td_to_simulation_index(64).unwrap(), 161 + 7 * 22 + 7);
        assert!(matches!(
            td_to_simulation_index(0),
            Err(InstrumentError::HornIndex { index: 0, .. })
        ));
        assert!(matches!(
            td_to_simulation_index(65),
            Err(InstrumentError::HornIndex { index: 65, .. })
        ));
    }

    #[test]
    fn test_simulation_to_td_index_inverts() {
        for td_horn in 1..=TD_NUM_HORNS {
            let simulation_index = td_to_simulation_index(td_horn).unwrap();
            assert_eq!(simulation_to_td_index(simulation_index).unwrap(), td_horn);
        }
        assert!(simulation_to_td_index(160).is_err());
        // col 8 of the first row is outside the TD
        assert!(simulation_to_td_index(169).is_err());
        assert!(simulation_to_td_index(161 + 8 * 22).is_err());
    }

    #[test]
    fn test_baseline_to_simulation() {
        let baseline = Baseline { i: 46, j: 64 }.to_simulation().unwrap();
        assert_eq!(baseline, Baseline { i: 276, j: 322 });
        assert!(Baseline { i: 46, j: 70 }.to_simulation().is_err());
    }
}
