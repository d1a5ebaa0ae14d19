use log::trace;
use selfcal::cli::main_with_args;
use std::env;

fn main() {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );
    trace!("start main");
    let retcode = main_with_args(env::args());
    trace!("end main");
    std::process::exit(retcode);
}

#[cfg(test)]
mod tests {
    use super::main_with_args;

    #[test]
    fn main_with_version_succeeds() {
        assert_eq!(main_with_args(["selfcal", "--version"]), 0);
    }

    #[test]
    fn main_with_help_succeeds() {
        assert_eq!(main_with_args(["selfcal", "--help"]), 0);
    }

    #[test]
    fn main_with_dry_run_doesnt_crash() {
        #[rustfmt::skip]
        assert_eq!(
            main_with_args([
                "selfcal",
                "--baseline", "1", "2",
                "--pointing-sweep", "0", "0.8", "0.2",
                "--dry-run",
            ]),
            0
        );
    }

    #[test]
    fn main_with_bad_arg_returns_1() {
        #[rustfmt::skip]
        assert_ne!(
            main_with_args([
                "selfcal",
                "--baseline", "46", "46",
            ]),
            0
        );
    }

    #[test]
    fn main_succesful_small_run() {
        #[rustfmt::skip]
        assert_eq!(
            main_with_args([
                "selfcal",
                "--nn", "6",
                "--no-draw-progress",
            ]),
            0
        );
    }

    #[test]
    fn main_succesful_parallel_run() {
        #[rustfmt::skip]
        assert_eq!(
            main_with_args([
                "selfcal",
                "--num-horns", "9",
                "--baseline", "3", "7",
                "--nn", "6",
                "--theta", "0.0", "0.1",
                "--parallel",
                "--no-draw-progress",
            ]),
            0
        );
    }
}
