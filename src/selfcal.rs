//! Self calibration of a single baseline by combining horn array configurations.
//!
//! The power for a baseline `(i, j)` alone, `Sij`, can't be measured on the real instrument
//! without closing every other horn. Instead we observe the seven [`Configuration`]s and
//! combine them. With `A` the summed field of every horn except `i` and `j`, and `ei`, `ej` the
//! fields of the baseline horns:
//!
//! ```text
//! S - C-i - C-j + S-ij = |A + ei + ej|² - |A + ej|² - |A + ei|² + |A|² = 2 Re(ei ej*)
//! S + Ci + Cj - C-i - C-j + S-ij = |ei|² + |ej|² + 2 Re(ei ej*) = Sij
//! ```
//!
//! so for a linear instrument the full estimate reproduces `Sij` exactly, and the realistic
//! estimate, which only needs configurations the hardware can reach, gives the fringe term.

use std::{collections::HashMap, fmt::Display, time::Duration};

use derive_builder::Builder;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, trace};
use rayon::prelude::*;

use crate::{
    aperture::Baseline,
    configuration::Configuration,
    grid::GridSpec,
    instrument::{Instrument, InstrumentError},
    ndarray::Zip,
    pointing::{Irradiance, Pointings},
    sampler::{sample_power, validate_sampling, PowerCube},
    with_increment_duration, SelfCalError,
};

/// The power cubes of all seven configurations for one baseline, and their combinations.
///
/// All cubes have dimensions `[row][col][pointing]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SelfCalData {
    /// the baseline the configurations were built around
    pub baseline: Baseline,
    /// number of horns in the instrument
    pub num_apertures: usize,
    /// all horns open
    pub s: PowerCube,
    /// all open except `i`
    pub cminus_i: PowerCube,
    /// all open except `j`
    pub cminus_j: PowerCube,
    /// all open except `i` and `j`
    pub sminus_ij: PowerCube,
    /// only `i` open
    pub ci: PowerCube,
    /// only `j` open
    pub cj: PowerCube,
    /// only `i` and `j` open
    pub sij: PowerCube,
    /// `S + Ci + Cj - C-i - C-j + S-ij`, equal to `Sij` for a linear instrument
    pub fringe_estimate: PowerCube,
    /// `S - C-i - C-j + S-ij`, only uses configurations the hardware can reach
    pub realistic_fringe_estimate: PowerCube,
}

/// Summary statistics of one configuration's power cube
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfigurationStats {
    /// which configuration
    pub configuration: Configuration,
    /// number of open horns
    pub num_open: usize,
    /// smallest power
    pub min: f64,
    /// largest power
    pub max: f64,
    /// mean power
    pub mean: f64,
}

impl SelfCalData {
    /// Assemble the data from one cube per configuration, in [`Configuration::ALL`] order, and
    /// compute both fringe estimates.
    ///
    /// # Errors
    ///
    /// [`InstrumentError::BadArrayShape`] wrapped in [`SelfCalError::Instrument`] unless there
    /// are exactly seven cubes of identical shape.
    pub fn from_cubes(
        baseline: Baseline,
        num_apertures: usize,
        cubes: Vec<PowerCube>,
    ) -> Result<Self, SelfCalError> {
        let num_cubes = cubes.len();
        let [s, cminus_i, cminus_j, sminus_ij, ci, cj, sij]: [PowerCube; 7] =
            cubes.try_into().map_err(|_| InstrumentError::BadArrayShape {
                argument: "cubes".into(),
                function: "SelfCalData::from_cubes".into(),
                expected: format!("{} cubes", Configuration::ALL.len()),
                received: format!("{num_cubes} cubes"),
            })?;

        let dim = s.dim();
        for cube in [&cminus_i, &cminus_j, &sminus_ij, &ci, &cj, &sij] {
            if cube.dim() != dim {
                return Err(InstrumentError::BadArrayShape {
                    argument: "cubes".into(),
                    function: "SelfCalData::from_cubes".into(),
                    expected: format!("{dim:?}"),
                    received: format!("{:?}", cube.dim()),
                }
                .into());
            }
        }

        // swapped terms are summed in pairs so (i, j) and (j, i) give identical bits
        let mut realistic_fringe_estimate = PowerCube::zeros(dim);
        Zip::from(&mut realistic_fringe_estimate)
            .and(&s)
            .and(&sminus_ij)
            .and(&cminus_i)
            .and(&cminus_j)
            .par_for_each(|out, &s, &sminus_ij, &cminus_i, &cminus_j| {
                *out = (s + sminus_ij) - (cminus_i + cminus_j);
            });
        let mut fringe_estimate = &ci + &cj;
        Zip::from(&mut fringe_estimate)
            .and(&s)
            .and(&sminus_ij)
            .and(&cminus_i)
            .and(&cminus_j)
            .par_for_each(|out, &s, &sminus_ij, &cminus_i, &cminus_j| {
                *out = (s + sminus_ij) + *out - (cminus_i + cminus_j);
            });

        Ok(Self {
            baseline,
            num_apertures,
            s,
            cminus_i,
            cminus_j,
            sminus_ij,
            ci,
            cj,
            sij,
            fringe_estimate,
            realistic_fringe_estimate,
        })
    }

    /// The power cube observed in `configuration`
    pub fn get(&self, configuration: Configuration) -> &PowerCube {
        match configuration {
            Configuration::AllOpen => &self.s,
            Configuration::AllExceptI => &self.cminus_i,
            Configuration::AllExceptJ => &self.cminus_j,
            Configuration::AllExceptBaseline => &self.sminus_ij,
            Configuration::OnlyI => &self.ci,
            Configuration::OnlyJ => &self.cj,
            Configuration::OnlyBaseline => &self.sij,
        }
    }

    /// Dimensions shared by every cube, `(nn, nn, num_pointings)`
    pub fn dim(&self) -> (usize, usize, usize) {
        self.s.dim()
    }

    /// `fringe_estimate - Sij`, zero for a linear noiseless instrument
    pub fn residual(&self) -> PowerCube {
        &self.fringe_estimate - &self.sij
    }

    /// Largest absolute value of [`SelfCalData::residual`]
    pub fn max_abs_residual(&self) -> f64 {
        max_abs_diff(&self.fringe_estimate, &self.sij)
    }

    /// The pure interference term of the baseline, `Sij - Ci - Cj`. This is what the realistic
    /// estimate recovers.
    pub fn interference(&self) -> PowerCube {
        let dim = self.dim();
        weighted_sum(dim, &[(1., &self.sij), (-1., &self.ci), (-1., &self.cj)])
    }

    /// Largest absolute difference between the realistic estimate and
    /// [`SelfCalData::interference`]
    pub fn max_abs_realistic_residual(&self) -> f64 {
        max_abs_diff(&self.realistic_fringe_estimate, &self.interference())
    }

    /// Summary statistics for each configuration, in [`Configuration::ALL`] order
    pub fn stats(&self) -> Vec<ConfigurationStats> {
        Configuration::ALL
            .iter()
            .map(|&configuration| {
                let cube = self.get(configuration);
                ConfigurationStats {
                    configuration,
                    num_open: configuration
                        .mask(&self.baseline, self.num_apertures)
                        .num_open(),
                    min: cube.iter().copied().fold(f64::INFINITY, f64::min),
                    max: cube.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                    mean: cube.mean().unwrap_or(0.),
                }
            })
            .collect()
    }

    /// Split into `(S, C-i, C-j, S-ij, Ci, Cj, Sij, fringe_estimate)`.
    #[allow(clippy::type_complexity)]
    pub fn into_parts(
        self,
    ) -> (
        PowerCube,
        PowerCube,
        PowerCube,
        PowerCube,
        PowerCube,
        PowerCube,
        PowerCube,
        PowerCube,
    ) {
        (
            self.s,
            self.cminus_i,
            self.cminus_j,
            self.sminus_ij,
            self.ci,
            self.cj,
            self.sij,
            self.fringe_estimate,
        )
    }
}

/// Elementwise `sum(weight * cube)`, in parallel over the cube.
///
/// Every cube must have dimensions `dim`.
pub fn weighted_sum(dim: (usize, usize, usize), terms: &[(f64, &PowerCube)]) -> PowerCube {
    let mut result = PowerCube::zeros(dim);
    for &(weight, cube) in terms {
        Zip::from(&mut result)
            .and(cube)
            .par_for_each(|out, &power| *out += weight * power);
    }
    result
}

fn max_abs_diff(a: &PowerCube, b: &PowerCube) -> f64 {
    Zip::from(a)
        .and(b)
        .fold(0., |acc: f64, &x, &y| acc.max((x - y).abs()))
}

fn validate_combination(
    num_apertures: usize,
    baseline: &Baseline,
    grid: &GridSpec,
    pointings: &Pointings,
    irradiance: &Irradiance,
) -> Result<(), SelfCalError> {
    baseline.validate(num_apertures)?;
    validate_sampling(grid, pointings, irradiance)
}

fn new_progress(draw_progress: bool) -> ProgressBar {
    let draw_target = if draw_progress {
        ProgressDrawTarget::stderr()
    } else {
        ProgressDrawTarget::hidden()
    };
    let progress =
        ProgressBar::with_draw_target(Some(Configuration::ALL.len() as u64), draw_target);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{msg:16}: [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta:5})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    progress.set_message("configurations");
    progress
}

fn combine_sequential<I>(
    instrument: &mut I,
    baseline: &Baseline,
    grid: &GridSpec,
    pointings: &Pointings,
    irradiance: &Irradiance,
    progress: &ProgressBar,
    durations: &mut HashMap<String, Duration>,
) -> Result<SelfCalData, SelfCalError>
where
    I: Instrument + ?Sized,
{
    let num_apertures = instrument.num_apertures();
    validate_combination(num_apertures, baseline, grid, pointings, irradiance)?;

    let mut cubes = Vec::with_capacity(Configuration::ALL.len());
    for config in Configuration::ALL {
        let mask = config.mask(baseline, num_apertures);
        debug!("configuration {config} for baseline {baseline}: {mask}");
        instrument.set_aperture_mask(mask)?;

        trace!("start sampling {config}");
        let cube = with_increment_duration!(durations, config.label(), {
            sample_power(&*instrument, grid, pointings, irradiance)
        })?;
        trace!("end sampling {config}");
        cubes.push(cube);
        progress.inc(1);
    }
    progress.finish();

    with_increment_duration!(durations, "combine", {
        SelfCalData::from_cubes(*baseline, num_apertures, cubes)
    })
}

fn combine_cloned<I>(
    instrument: &I,
    baseline: &Baseline,
    grid: &GridSpec,
    pointings: &Pointings,
    irradiance: &Irradiance,
    progress: &ProgressBar,
    durations: &mut HashMap<String, Duration>,
) -> Result<SelfCalData, SelfCalError>
where
    I: Instrument + Clone + Send + Sync,
{
    let num_apertures = instrument.num_apertures();
    validate_combination(num_apertures, baseline, grid, pointings, irradiance)?;

    let timed_cubes = Configuration::ALL[..]
        .par_iter()
        .map(|config| {
            let mut instrument = instrument.clone();
            let mask = config.mask(baseline, num_apertures);
            debug!("configuration {config} for baseline {baseline}: {mask}");
            instrument.set_aperture_mask(mask)?;

            let mut config_durations: HashMap<String, Duration> = HashMap::new();
            let cube = with_increment_duration!(config_durations, config.label(), {
                sample_power(&instrument, grid, pointings, irradiance)
            })?;
            progress.inc(1);
            Ok((cube, config_durations))
        })
        .collect::<Result<Vec<_>, SelfCalError>>()?;
    progress.finish();

    let mut cubes = Vec::with_capacity(timed_cubes.len());
    for (cube, config_durations) in timed_cubes {
        for (name, duration) in config_durations {
            *durations.entry(name).or_insert(Duration::ZERO) += duration;
        }
        cubes.push(cube);
    }

    with_increment_duration!(durations, "combine", {
        SelfCalData::from_cubes(*baseline, num_apertures, cubes)
    })
}

/// Observe the seven horn array configurations of `baseline` and combine them.
///
/// Before each observation the complete aperture mask of the configuration is set on the
/// instrument. The instrument is left in the last configuration (`Sij`), callers shouldn't
/// rely on that.
///
/// # Errors
///
/// - [`SelfCalError::InvalidBaseline`], [`SelfCalError::InvalidGrid`] or
///   [`SelfCalError::InvalidPointing`] before the instrument is touched
/// - [`SelfCalError::Instrument`] from the first configuration that fails. No partial data is
///   returned.
///
/// # Examples
///
/// ```rust
/// use selfcal::{
///     aperture::Baseline,
///     combine,
///     grid::GridSpec,
///     instrument::PointSourceArray,
///     pointing::{Irradiance, Pointings},
/// };
///
/// let mut instrument = PointSourceArray::td();
/// let baseline = Baseline::new(46, 64, 64).unwrap();
/// let grid = GridSpec::new(10, -0.06, 0.06).unwrap();
/// let pointings = Pointings::sweep(0., 0.4, 0.2).unwrap();
///
/// let data = combine(&mut instrument, &baseline, &grid, &pointings, &Irradiance::Uniform(1.))
///     .unwrap();
/// assert_eq!(data.dim(), (10, 10, 2));
/// assert!(data.max_abs_residual() < 1e-9 * data.sij.iter().cloned().fold(0., f64::max));
/// ```
pub fn combine<I>(
    instrument: &mut I,
    baseline: &Baseline,
    grid: &GridSpec,
    pointings: &Pointings,
    irradiance: &Irradiance,
) -> Result<SelfCalData, SelfCalError>
where
    I: Instrument + ?Sized,
{
    let mut durations = HashMap::new();
    combine_sequential(
        instrument,
        baseline,
        grid,
        pointings,
        irradiance,
        &ProgressBar::hidden(),
        &mut durations,
    )
}

/// Like [`combine`], but each configuration is observed in parallel on its own clone of
/// `instrument`. The caller's instrument is never modified.
///
/// # Errors
///
/// see [`combine`]
pub fn combine_parallel<I>(
    instrument: &I,
    baseline: &Baseline,
    grid: &GridSpec,
    pointings: &Pointings,
    irradiance: &Irradiance,
) -> Result<SelfCalData, SelfCalError>
where
    I: Instrument + Clone + Send + Sync,
{
    let mut durations = HashMap::new();
    combine_cloned(
        instrument,
        baseline,
        grid,
        pointings,
        irradiance,
        &ProgressBar::hidden(),
        &mut durations,
    )
}

/// Options for a self calibration run of a single baseline
#[derive(Builder, Debug, Clone)]
pub struct SelfCalContext {
    /// The baseline to isolate
    pub baseline: Baseline,
    /// The focal plane sampling grid
    pub grid: GridSpec,
    /// The source pointings
    pub pointings: Pointings,
    /// The source irradiance
    #[builder(default)]
    pub irradiance: Irradiance,

    /// Whether to observe the configurations in parallel on cloned instruments
    #[builder(default = "false")]
    pub parallel: bool,

    /// Whether to draw progress bars
    #[builder(default = "true")]
    pub draw_progress: bool,
}

impl Display for SelfCalContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Baseline:             {}", self.baseline)?;
        writeln!(f, "Focal plane grid:     {}", self.grid)?;
        writeln!(
            f,
            "Pointings ({}):       {}",
            self.pointings.len(),
            self.pointings
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )?;
        writeln!(f, "Irradiance:           {}", self.irradiance)?;
        writeln!(
            f,
            "Will observe {} configurations {}.",
            Configuration::ALL.len(),
            if self.parallel {
                "in parallel on cloned instruments"
            } else {
                "sequentially"
            }
        )?;
        Ok(())
    }
}

impl SelfCalContext {
    /// Observe and combine the seven configurations on `instrument`, adding the time spent on
    /// each step to `durations`.
    ///
    /// When `parallel` is unset the instrument's mask is changed in place, otherwise it is left
    /// alone.
    ///
    /// # Errors
    ///
    /// see [`combine`]
    pub fn run<I>(
        &self,
        instrument: &mut I,
        durations: &mut HashMap<String, Duration>,
    ) -> Result<SelfCalData, SelfCalError>
    where
        I: Instrument + Clone + Send + Sync,
    {
        let progress = new_progress(self.draw_progress);
        if self.parallel {
            combine_cloned(
                instrument,
                &self.baseline,
                &self.grid,
                &self.pointings,
                &self.irradiance,
                &progress,
                durations,
            )
        } else {
            combine_sequential(
                instrument,
                &self.baseline,
                &self.grid,
                &self.pointings,
                &self.irradiance,
                &progress,
                durations,
            )
        }
    }
}
