//! Command Line Interface helpers for selfcal

use crate::{
    aperture::Baseline,
    constants::TD_NUM_HORNS,
    error::{CLIError::InvalidCommandLineArgument, SelfCalError, SelfCalError::DryRun},
    grid::GridSpec,
    instrument::{Instrument, PointSourceArray},
    pointing::{Irradiance, Pointings},
    selfcal::{SelfCalContext, SelfCalContextBuilder, SelfCalData},
};
use clap::{
    arg, command,
    ErrorKind::{ArgumentNotFound, DisplayHelp, DisplayVersion},
};
use log::{debug, info, trace, warn};
use prettytable::{format as prettyformat, row, table, Table};
use std::{
    collections::HashMap,
    ffi::OsString,
    fmt::{Debug, Display},
    time::Duration,
};

/// Residuals above this fraction of the peak `Sij` power mean the instrument isn't linear.
const RESIDUAL_WARN_FRACTION: f64 = 1e-6;

/// Args for a self calibration run on the synthetic instrument.
pub struct SelfCalCliContext {
    /// The instrument to observe with
    pub instrument: PointSourceArray,
    /// Horn spacing of the instrument [m]
    pub horn_spacing_m: f64,
    /// Self calibration parameters
    pub selfcal_ctx: SelfCalContext,
}

// Add build-time information from the "built" crate.
include!(concat!(env!("OUT_DIR"), "/built.rs"));

/// Write many info-level log lines of how this executable was compiled.
///
/// # Errors
///
/// propagates writeln! fails
pub fn fmt_build_info(f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match (GIT_HEAD_REF, GIT_COMMIT_HASH) {
        (Some(hr), Some(hash)) => {
            let dirty = GIT_DIRTY.unwrap_or(false);
            writeln!(
                f,
                "Compiled on git commit hash: {}{}",
                hash,
                if dirty { " (dirty)" } else { "" }
            )?;
            writeln!(f, "            git head ref: {}", hr)?;
        }
        _ => writeln!(f, "Compiled on git commit hash: <no git info>")?,
    }
    writeln!(f, "            {}", BUILT_TIME_UTC)?;
    writeln!(f, "         with compiler {}", RUSTC_VERSION)?;
    writeln!(f)?;
    Ok(())
}

impl Display for SelfCalCliContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{} version {}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
        )?;
        fmt_build_info(f)?;
        let num_horns = self.instrument.num_apertures();
        writeln!(
            f,
            "Instrument:           {} point source horns, spacing {} m, {:.3} GHz",
            num_horns,
            self.horn_spacing_m,
            self.instrument.frequency_hz / 1e9
        )?;
        if num_horns == TD_NUM_HORNS {
            if let Ok(simulation) = self.selfcal_ctx.baseline.to_simulation() {
                writeln!(f, "Simulation baseline:  {}", simulation)?;
            }
        }
        write!(f, "{}", self.selfcal_ctx)?;
        Ok(())
    }
}

/// Tabulate the per-configuration statistics of a run.
pub fn stats_table(data: &SelfCalData) -> Table {
    let mut stats_table = table!(["config", "open", "min", "max", "mean"]);
    stats_table.set_format(*prettyformat::consts::FORMAT_CLEAN);
    for stats in data.stats() {
        stats_table.add_row(row![
            stats.configuration.label(),
            stats.num_open,
            format!("{:.6e}", stats.min),
            format!("{:.6e}", stats.max),
            format!("{:.6e}", stats.mean),
        ]);
    }
    stats_table
}

/// Parse `name` as a `T`, falling back to `default` when it isn't given.
fn value_or<T>(matches: &clap::ArgMatches, name: &str, default: T) -> Result<T, SelfCalError>
where
    T: std::str::FromStr,
    <T as std::str::FromStr>::Err: Display,
{
    match matches.value_of_t::<T>(name) {
        Ok(value) => Ok(value),
        Err(err) if err.kind() == ArgumentNotFound => Ok(default),
        Err(err) => Err(err.into()),
    }
}

/// Parse every value of `name` as a `T`, `None` when it isn't given.
fn values_of<T>(matches: &clap::ArgMatches, name: &str) -> Result<Option<Vec<T>>, SelfCalError>
where
    T: std::str::FromStr,
    <T as std::str::FromStr>::Err: Display,
{
    match matches.values_of_t::<T>(name) {
        Ok(values) => Ok(Some(values)),
        Err(err) if err.kind() == ArgumentNotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

impl SelfCalCliContext {
    fn get_matches<I, T>(args: I) -> Result<clap::ArgMatches, SelfCalError>
    where
        I: IntoIterator<Item = T> + Debug,
        T: Into<OsString> + Clone,
    {
        let app = command!()
            .next_line_help(false)
            .allow_negative_numbers(true)
            .about("Isolate the fringes of a single baseline of a bolometric interferometer \
                    by combining aperture mask configurations.")
            .args(&[
                // instrument options
                arg!(--"num-horns" <COUNT> "Number of horns in the square array")
                    .help_heading("INSTRUMENT")
                    .required(false)
                    .default_value("64"),
                arg!(--"horn-spacing" <METRES> "Distance between neighbouring horns [m]")
                    .help_heading("INSTRUMENT")
                    .required(false)
                    .default_value("0.014"),
                arg!(--"frequency-hz" <HZ> "Centre of the filter band [Hz]")
                    .help_heading("INSTRUMENT")
                    .required(false)
                    .default_value("150e9"),
                arg!(--baseline "Horn identities (1-indexed) of the baseline to isolate")
                    .help_heading("INSTRUMENT")
                    .value_names(&["I", "J"])
                    .number_of_values(2)
                    .required(false)
                    .default_values(&["46", "64"]),

                // focal plane options
                arg!(--nn <PIXELS> "Number of pixels on each side of the focal plane grid")
                    .help_heading("FOCAL PLANE")
                    .required(false)
                    .default_value("200"),
                arg!(--xmin <METRES> "Lower bound of both focal plane axes [m]")
                    .help_heading("FOCAL PLANE")
                    .required(false)
                    .default_value("-0.06"),
                arg!(--xmax <METRES> "Upper bound of both focal plane axes [m]")
                    .help_heading("FOCAL PLANE")
                    .required(false)
                    .default_value("0.06"),

                // source options
                arg!(--theta <RAD>... "Source zenith angles [rad]")
                    .help_heading("SOURCE")
                    .multiple_values(true)
                    .required(false),
                arg!(--phi <RAD>... "Source azimuth angles [rad], one per zenith angle")
                    .help_heading("SOURCE")
                    .multiple_values(true)
                    .required(false)
                    .requires("theta"),
                arg!(--"pointing-sweep" "Sweep theta = phi from START up to STOP [rad]")
                    .help_heading("SOURCE")
                    .value_names(&["START", "STOP", "STEP"])
                    .number_of_values(3)
                    .required(false)
                    .conflicts_with_all(&["theta", "phi"]),
                arg!(--irradiance <WATTS>... "Source irradiance, once or once per pointing [W/m^2/Hz]")
                    .help_heading("SOURCE")
                    .multiple_values(true)
                    .required(false),

                // processing options
                arg!(--parallel "Observe the configurations in parallel on cloned instruments"),
                arg!(--"dry-run" "Just print the summary and exit"),
                arg!(--"no-draw-progress" "do not show progress bars"),
            ]);
        let matches = app.try_get_matches_from(args)?;
        Ok(matches)
    }

    fn parse_instrument_matches(
        matches: &clap::ArgMatches,
    ) -> Result<(PointSourceArray, f64), SelfCalError> {
        let num_horns: usize = value_or(matches, "num-horns", TD_NUM_HORNS)?;
        let horns_per_side = (num_horns as f64).sqrt().round() as usize;
        if num_horns < 2 || horns_per_side * horns_per_side != num_horns {
            return Err(SelfCalError::CLIError(InvalidCommandLineArgument {
                option: "--num-horns <COUNT>".into(),
                expected: "a square number of horns, at least 4".into(),
                received: format!("{}", num_horns),
            }));
        }
        let horn_spacing_m: f64 = matches.value_of_t("horn-spacing")?;
        if !(horn_spacing_m.is_finite() && horn_spacing_m > 0.) {
            return Err(SelfCalError::CLIError(InvalidCommandLineArgument {
                option: "--horn-spacing <METRES>".into(),
                expected: "a positive distance".into(),
                received: format!("{}", horn_spacing_m),
            }));
        }
        let frequency_hz: f64 = matches.value_of_t("frequency-hz")?;
        if !(frequency_hz.is_finite() && frequency_hz > 0.) {
            return Err(SelfCalError::CLIError(InvalidCommandLineArgument {
                option: "--frequency-hz <HZ>".into(),
                expected: "a positive frequency".into(),
                received: format!("{}", frequency_hz),
            }));
        }
        let instrument = PointSourceArray::square(horns_per_side, horn_spacing_m)
            .with_frequency_hz(frequency_hz);
        Ok((instrument, horn_spacing_m))
    }

    fn parse_baseline_matches(
        matches: &clap::ArgMatches,
        num_horns: usize,
    ) -> Result<Baseline, SelfCalError> {
        match values_of::<usize>(matches, "baseline")?.as_deref() {
            Some(&[i, j]) => Baseline::new(i, j, num_horns),
            Some(other) => Err(SelfCalError::CLIError(InvalidCommandLineArgument {
                option: "--baseline <I> <J>".into(),
                expected: "two horn identities".into(),
                received: format!("{:?}", other),
            })),
            None => unreachable!("--baseline has a default, enforced by clap"),
        }
    }

    fn parse_grid_matches(matches: &clap::ArgMatches) -> Result<GridSpec, SelfCalError> {
        let nn: usize = matches.value_of_t("nn")?;
        let xmin: f64 = matches.value_of_t("xmin")?;
        let xmax: f64 = matches.value_of_t("xmax")?;
        GridSpec::new(nn, xmin, xmax)
    }

    fn parse_source_matches(
        matches: &clap::ArgMatches,
    ) -> Result<(Pointings, Irradiance), SelfCalError> {
        let pointings = match values_of::<f64>(matches, "pointing-sweep")? {
            Some(sweep) => match sweep.as_slice() {
                &[start, stop, step] => Pointings::sweep(start, stop, step)?,
                other => {
                    return Err(SelfCalError::CLIError(InvalidCommandLineArgument {
                        option: "--pointing-sweep <START> <STOP> <STEP>".into(),
                        expected: "three angles".into(),
                        received: format!("{:?}", other),
                    }))
                }
            },
            None => {
                let thetas = values_of::<f64>(matches, "theta")?.unwrap_or_else(|| vec![0.]);
                let phis =
                    values_of::<f64>(matches, "phi")?.unwrap_or_else(|| vec![0.; thetas.len()]);
                Pointings::from_angles(&thetas, &phis)?
            }
        };
        let irradiance = match values_of::<f64>(matches, "irradiance")? {
            None => Irradiance::default(),
            Some(values) if values.len() == 1 => Irradiance::Uniform(values[0]),
            Some(values) => Irradiance::PerPointing(values),
        };
        irradiance.validate(pointings.len())?;
        Ok((pointings, irradiance))
    }

    /// Parse an iterator of arguments, `args` into a `SelfCalCliContext`.
    ///
    /// # Errors
    ///
    /// Can raise:
    /// - `clap::Error` if clap cannot parse `args`
    /// - `SelfCalError::CLIError` if the instrument arguments are invalid.
    /// - `SelfCalError::InvalidBaseline`, `InvalidGrid` or `InvalidPointing` for bad inputs
    /// - `SelfCalError::DryRun` if `--dry-run` was given, after the summary is logged.
    pub fn from_args<I, T>(args: I) -> Result<Self, SelfCalError>
    where
        I: IntoIterator<Item = T> + Debug,
        T: Into<OsString> + Clone,
    {
        debug!("args:\n{:?}", &args);

        let matches = Self::get_matches(args)?;
        trace!("arg matches:\n{:?}", &matches);

        let (instrument, horn_spacing_m) = Self::parse_instrument_matches(&matches)?;
        let baseline = Self::parse_baseline_matches(&matches, instrument.num_apertures())?;
        let grid = Self::parse_grid_matches(&matches)?;
        let (pointings, irradiance) = Self::parse_source_matches(&matches)?;

        let selfcal_ctx = SelfCalContextBuilder::default()
            .baseline(baseline)
            .grid(grid)
            .pointings(pointings)
            .irradiance(irradiance)
            .parallel(matches.is_present("parallel"))
            .draw_progress(!matches.is_present("no-draw-progress"))
            .build()
            .map_err(|err| {
                SelfCalError::CLIError(InvalidCommandLineArgument {
                    option: "<ARGS>".into(),
                    expected: "a complete set of self calibration options".into(),
                    received: err.to_string(),
                })
            })?;

        let result = Self {
            instrument,
            horn_spacing_m,
            selfcal_ctx,
        };

        info!("{}", &result);

        if matches.is_present("dry-run") {
            return Err(DryRun {});
        }

        Ok(result)
    }

    /// Observe and combine the configurations, then report on the result.
    ///
    /// # Errors
    ///
    /// see [`crate::combine`]
    pub fn run(self) -> Result<(SelfCalData, HashMap<String, Duration>), SelfCalError> {
        let SelfCalCliContext {
            mut instrument,
            selfcal_ctx,
            ..
        } = self;

        // used to time large operations
        let mut durations = HashMap::<String, Duration>::new();

        let data = selfcal_ctx.run(&mut instrument, &mut durations)?;

        info!("Configuration power:\n{}", stats_table(&data));

        let scale = data.sij.iter().fold(0_f64, |acc, &p| acc.max(p.abs()));
        let residual = data.max_abs_residual();
        let realistic_residual = data.max_abs_realistic_residual();
        info!("max |fringe estimate - Sij| = {:e} (peak Sij {:e})", residual, scale);
        info!(
            "max |realistic estimate - interference| = {:e}",
            realistic_residual
        );
        if residual > RESIDUAL_WARN_FRACTION * scale {
            warn!(
                "fringe estimate residual {:e} exceeds {:e} of peak, the instrument is not linear",
                residual, RESIDUAL_WARN_FRACTION
            );
        }

        Ok((data, durations))
    }
}

/// Parse `args`, run, and report. Returns the exit code.
pub fn main_with_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T> + Debug,
    T: Into<OsString> + Clone,
{
    let cli_ctx = match SelfCalCliContext::from_args(args) {
        Ok(cli_ctx) => cli_ctx,
        Err(DryRun {}) => {
            info!("Dry run. No configurations will be observed.");
            return 0;
        }
        Err(SelfCalError::ClapError(inner)) => {
            // Swallow broken pipe errors
            trace!("clap error: {:?}", inner.kind());
            let _ = inner.print();
            match inner.kind() {
                DisplayHelp | DisplayVersion => return 0,
                _ => return 1,
            }
        }
        Err(e) => {
            eprintln!("error parsing args: {e}");
            return 1;
        }
    };

    match cli_ctx.run() {
        Ok((_, durations)) => {
            info!(
                "total duration: {:?}",
                durations.into_iter().fold(
                    Duration::ZERO,
                    |duration_sum, (name, duration)| {
                        info!("{} duration: {:?}", name, duration);
                        duration_sum + duration
                    }
                )
            );
            0
        }
        Err(e) => {
            eprintln!("selfcal failed: {e}");
            1
        }
    }
}

#[cfg(test)]
mod argparse_tests {
    use approx::assert_abs_diff_eq;

    use crate::{
        aperture::Baseline,
        cli::{main_with_args, stats_table, SelfCalCliContext},
        constants::{
            DEFAULT_FILTER_FREQUENCY_HZ, DEFAULT_GRID_NN, DEFAULT_GRID_XMAX_M,
            DEFAULT_GRID_XMIN_M, DEFAULT_TD_BASELINE, TD_HORN_SPACING_M,
        },
        error::{CLIError, SelfCalError},
        instrument::Instrument,
        pointing::{Irradiance, PointingError},
    };

    #[test]
    fn test_parse_defaults() {
        let ctx = SelfCalCliContext::from_args(["selfcal"]).unwrap();
        assert_eq!(ctx.instrument.num_apertures(), 64);
        assert_abs_diff_eq!(ctx.horn_spacing_m, TD_HORN_SPACING_M);
        assert_abs_diff_eq!(ctx.instrument.frequency_hz, DEFAULT_FILTER_FREQUENCY_HZ);
        let sctx = &ctx.selfcal_ctx;
        assert_eq!(
            sctx.baseline,
            Baseline {
                i: DEFAULT_TD_BASELINE.0,
                j: DEFAULT_TD_BASELINE.1
            }
        );
        assert_eq!(sctx.grid.nn, DEFAULT_GRID_NN);
        assert_abs_diff_eq!(sctx.grid.xmin, DEFAULT_GRID_XMIN_M);
        assert_abs_diff_eq!(sctx.grid.xmax, DEFAULT_GRID_XMAX_M);
        assert_eq!(sctx.pointings.len(), 1);
        assert_eq!(sctx.irradiance, Irradiance::Uniform(1.));
        assert!(sctx.draw_progress);
        assert!(!sctx.parallel);
    }

    #[test]
    fn test_parse_context_display_doesnt_crash() {
        let ctx = SelfCalCliContext::from_args(["selfcal", "--no-draw-progress"]).unwrap();
        let display = format!("{}", &ctx);
        assert!(display.contains("64 point source horns"));
        assert!(display.contains("Baseline:             (46, 64)"));
        // TD horns 46 and 64 in the full simulated array
        assert!(display.contains("Simulation baseline:  (276, 322)"));
        assert!(display.contains("sequentially"));
    }

    #[test]
    fn test_parse_valid_options() {
        #[rustfmt::skip]
        let args = [
            "selfcal",
            "--num-horns", "9",
            "--horn-spacing", "0.02",
            "--baseline", "2", "7",
            "--nn", "12",
            "--xmin", "-0.05",
            "--xmax", "0.04",
            "--theta", "0.1", "0.2",
            "--phi", "0.3", "0.4",
            "--irradiance", "1.5", "2.5",
            "--parallel",
            "--no-draw-progress",
        ];
        let ctx = SelfCalCliContext::from_args(args).unwrap();
        assert_eq!(ctx.instrument.num_apertures(), 9);
        let sctx = &ctx.selfcal_ctx;
        assert_eq!(sctx.baseline, Baseline { i: 2, j: 7 });
        assert_eq!(sctx.grid.nn, 12);
        assert_abs_diff_eq!(sctx.grid.xmin, -0.05);
        assert_abs_diff_eq!(sctx.grid.xmax, 0.04);
        assert_eq!(sctx.pointings.len(), 2);
        assert_abs_diff_eq!(sctx.pointings[1].theta, 0.2);
        assert_abs_diff_eq!(sctx.pointings[1].phi, 0.4);
        assert_eq!(sctx.irradiance, Irradiance::PerPointing(vec![1.5, 2.5]));
        assert!(sctx.parallel);
        assert!(!sctx.draw_progress);
    }

    #[test]
    fn test_parse_pointing_sweep() {
        let args = ["selfcal", "--pointing-sweep", "0", "0.8", "0.2"];
        let ctx = SelfCalCliContext::from_args(args).unwrap();
        let pointings = &ctx.selfcal_ctx.pointings;
        assert_eq!(pointings.len(), 4);
        assert_abs_diff_eq!(pointings[3].theta, 0.6, epsilon = 1e-12);
        assert_abs_diff_eq!(pointings[3].phi, 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_parse_sweep_conflicts_with_theta() {
        let args = [
            "selfcal",
            "--pointing-sweep",
            "0",
            "0.8",
            "0.2",
            "--theta",
            "0.1",
        ];
        assert!(matches!(
            SelfCalCliContext::from_args(args),
            Err(SelfCalError::ClapError(_))
        ));
    }

    #[test]
    fn test_parse_invalid_num_horns() {
        match SelfCalCliContext::from_args(["selfcal", "--num-horns", "10"]) {
            Err(SelfCalError::CLIError(CLIError::InvalidCommandLineArgument { option, .. })) => {
                assert_eq!(option, "--num-horns <COUNT>")
            }
            Err(e) => panic!("expected invalid command line argument, not {}", e),
            Ok(_) => panic!("expected error, but got Ok(_)"),
        }
    }

    #[test]
    fn test_parse_invalid_baseline() {
        assert!(matches!(
            SelfCalCliContext::from_args(["selfcal", "--baseline", "3", "3"]),
            Err(SelfCalError::InvalidBaseline { i: 3, j: 3, .. })
        ));
        assert!(matches!(
            SelfCalCliContext::from_args(["selfcal", "--baseline", "1", "65"]),
            Err(SelfCalError::InvalidBaseline {
                num_apertures: 64,
                ..
            })
        ));
    }

    #[test]
    fn test_parse_invalid_grid() {
        assert!(matches!(
            SelfCalCliContext::from_args(["selfcal", "--nn", "0"]),
            Err(SelfCalError::InvalidGrid { nn: 0, .. })
        ));
        assert!(matches!(
            SelfCalCliContext::from_args(["selfcal", "--xmin", "0.1", "--xmax", "0.05"]),
            Err(SelfCalError::InvalidGrid { .. })
        ));
        assert!(matches!(
            SelfCalCliContext::from_args(["selfcal", "--nn", "many"]),
            Err(SelfCalError::ClapError(_))
        ));
    }

    #[test]
    fn test_parse_invalid_source() {
        assert!(matches!(
            SelfCalCliContext::from_args(["selfcal", "--irradiance", "-1"]),
            Err(SelfCalError::InvalidPointing(
                PointingError::NegativeIrradiance { .. }
            ))
        ));
        assert!(matches!(
            SelfCalCliContext::from_args(["selfcal", "--irradiance", "1", "2", "3"]),
            Err(SelfCalError::InvalidPointing(
                PointingError::IrradianceLength {
                    expected: 1,
                    received: 3
                }
            ))
        ));
        assert!(matches!(
            SelfCalCliContext::from_args(["selfcal", "--theta", "0.1", "--phi", "0.1", "0.2"]),
            Err(SelfCalError::InvalidPointing(PointingError::AngleLength {
                thetas: 1,
                phis: 2
            }))
        ));
        assert!(matches!(
            SelfCalCliContext::from_args(["selfcal", "--pointing-sweep", "0", "1", "1e-300"]),
            Err(SelfCalError::InvalidPointing(
                PointingError::TooManyPointings { .. }
            ))
        ));
    }

    #[test]
    fn test_parse_dry_run() {
        assert!(matches!(
            SelfCalCliContext::from_args(["selfcal", "--dry-run"]),
            Err(SelfCalError::DryRun {})
        ));
    }

    #[test]
    fn test_run_small_array() {
        #[rustfmt::skip]
        let args = [
            "selfcal",
            "--num-horns", "16",
            "--baseline", "1", "16",
            "--nn", "8",
            "--pointing-sweep", "0", "0.2", "0.1",
            "--no-draw-progress",
        ];
        let ctx = SelfCalCliContext::from_args(args).unwrap();
        let (data, durations) = ctx.run().unwrap();
        assert_eq!(data.dim(), (8, 8, 2));
        let scale = data.sij.iter().fold(0_f64, |acc, &p| acc.max(p));
        assert!(data.max_abs_residual() <= 1e-9 * scale);
        assert!(durations.contains_key("S"));
        assert!(durations.contains_key("combine"));

        let table = stats_table(&data).to_string();
        for label in ["S", "C-i", "C-j", "S-ij", "Ci", "Cj", "Sij"] {
            assert!(table.contains(label));
        }
    }

    #[test]
    fn test_main_exit_codes() {
        assert_eq!(main_with_args(["selfcal", "--version"]), 0);
        assert_eq!(main_with_args(["selfcal", "--help"]), 0);
        assert_eq!(main_with_args(["selfcal", "--dry-run"]), 0);
        assert_eq!(main_with_args(["selfcal", "--nn", "0"]), 1);
        assert_eq!(main_with_args(["selfcal", "--bogus"]), 1);
    }
}
