//! The seven horn array configurations used for self calibration.
//!
//! For a baseline `(i, j)` the horn array is observed with:
//!
//! | configuration | open horns                  |
//! |---------------|-----------------------------|
//! | `S`           | all                         |
//! | `C-i`         | all except `i`              |
//! | `C-j`         | all except `j`              |
//! | `S-ij`        | all except `i` and `j`      |
//! | `Ci`          | only `i`                    |
//! | `Cj`          | only `j`                    |
//! | `Sij`         | only `i` and `j`            |
//!
//! Each configuration derives the complete mask from scratch, it never edits the mask of a
//! previous configuration.

use std::fmt::Display;

use crate::aperture::{ApertureMask, Baseline};

/// One of the seven canonical horn array configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Configuration {
    /// `S`: every horn open
    AllOpen,
    /// `C-i`: all horns open except `i`
    AllExceptI,
    /// `C-j`: all horns open except `j`
    AllExceptJ,
    /// `S-ij`: all horns open except `i` and `j`
    AllExceptBaseline,
    /// `Ci`: only `i` open
    OnlyI,
    /// `Cj`: only `j` open
    OnlyJ,
    /// `Sij`: only `i` and `j` open
    OnlyBaseline,
}

impl Configuration {
    /// Every configuration, in the order they are observed.
    pub const ALL: [Self; 7] = [
        Self::AllOpen,
        Self::AllExceptI,
        Self::AllExceptJ,
        Self::AllExceptBaseline,
        Self::OnlyI,
        Self::OnlyJ,
        Self::OnlyBaseline,
    ];

    /// Whether horn `id` is open in this configuration.
    pub fn is_open(&self, id: usize, baseline: &Baseline) -> bool {
        let is_i = id == baseline.i;
        let is_j = id == baseline.j;
        match self {
            Self::AllOpen => true,
            Self::AllExceptI => !is_i,
            Self::AllExceptJ => !is_j,
            Self::AllExceptBaseline => !(is_i || is_j),
            Self::OnlyI => is_i,
            Self::OnlyJ => is_j,
            Self::OnlyBaseline => is_i || is_j,
        }
    }

    /// The complete aperture mask for this configuration on an array of `num_apertures` horns.
    pub fn mask(&self, baseline: &Baseline, num_apertures: usize) -> ApertureMask {
        ApertureMask::from_fn(num_apertures, |id| self.is_open(id, baseline))
    }

    /// Short name, as used in the literature
    pub fn label(&self) -> &'static str {
        match self {
            Self::AllOpen => "S",
            Self::AllExceptI => "C-i",
            Self::AllExceptJ => "C-j",
            Self::AllExceptBaseline => "S-ij",
            Self::OnlyI => "Ci",
            Self::OnlyJ => "Cj",
            Self::OnlyBaseline => "Sij",
        }
    }

    /// Whether this configuration can be realised on the real instrument. Closing all but one
    /// or two horns isn't practical, so those configurations only exist in simulation.
    pub fn is_realizable(&self) -> bool {
        matches!(
            self,
            Self::AllOpen | Self::AllExceptI | Self::AllExceptJ | Self::AllExceptBaseline
        )
    }

    /// Weight of this configuration in the full fringe estimate
    /// `S + Ci + Cj - C-i - C-j + S-ij`.
    pub fn coefficient(&self) -> f64 {
        match self {
            Self::AllOpen | Self::AllExceptBaseline | Self::OnlyI | Self::OnlyJ => 1.,
            Self::AllExceptI | Self::AllExceptJ => -1.,
            Self::OnlyBaseline => 0.,
        }
    }

    /// Weight of this configuration in the realistic fringe estimate `S - C-i - C-j + S-ij`,
    /// which only uses realizable configurations.
    pub fn realistic_coefficient(&self) -> f64 {
        if self.is_realizable() {
            self.coefficient()
        } else {
            0.
        }
    }
}

impl Display for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_ids(config: Configuration, baseline: &Baseline, num: usize) -> Vec<usize> {
        config.mask(baseline, num).open_ids()
    }

    #[test]
    fn test_masks_match_table() {
        let baseline = Baseline::new(2, 4, 5).unwrap();
        assert_eq!(
            open_ids(Configuration::AllOpen, &baseline, 5),
            vec![1, 2, 3, 4, 5]
        );
        assert_eq!(
            open_ids(Configuration::AllExceptI, &baseline, 5),
            vec![1, 3, 4, 5]
        );
        assert_eq!(
            open_ids(Configuration::AllExceptJ, &baseline, 5),
            vec![1, 2, 3, 5]
        );
        assert_eq!(
            open_ids(Configuration::AllExceptBaseline, &baseline, 5),
            vec![1, 3, 5]
        );
        assert_eq!(open_ids(Configuration::OnlyI, &baseline, 5), vec![2]);
        assert_eq!(open_ids(Configuration::OnlyJ, &baseline, 5), vec![4]);
        assert_eq!(open_ids(Configuration::OnlyBaseline, &baseline, 5), vec![2, 4]);
    }

    #[test]
    fn test_masks_with_two_horns() {
        let baseline = Baseline::new(1, 2, 2).unwrap();
        assert_eq!(
            Configuration::AllExceptBaseline.mask(&baseline, 2),
            ApertureMask::all_closed(2)
        );
        assert_eq!(
            Configuration::OnlyBaseline.mask(&baseline, 2),
            ApertureMask::all_open(2)
        );
    }

    #[test]
    fn test_masks_dont_depend_on_order() {
        let baseline = Baseline::new(46, 64, 64).unwrap();
        let forward: Vec<_> = Configuration::ALL
            .iter()
            .map(|config| config.mask(&baseline, 64))
            .collect();
        let backward: Vec<_> = Configuration::ALL
            .iter()
            .rev()
            .map(|config| config.mask(&baseline, 64))
            .collect();
        assert_eq!(
            forward,
            backward.into_iter().rev().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_coefficients() {
        let full: Vec<f64> = Configuration::ALL.iter().map(|c| c.coefficient()).collect();
        assert_eq!(full, vec![1., -1., -1., 1., 1., 1., 0.]);
        let realistic: Vec<f64> = Configuration::ALL
            .iter()
            .map(|c| c.realistic_coefficient())
            .collect();
        assert_eq!(realistic, vec![1., -1., -1., 1., 0., 0., 0.]);
    }

    #[test]
    fn test_labels() {
        let labels: Vec<String> = Configuration::ALL.iter().map(|c| c.to_string()).collect();
        assert_eq!(labels, vec!["S", "C-i", "C-j", "S-ij", "Ci", "Cj", "Sij"]);
    }
}
