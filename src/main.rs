//! ft - atomic multi-file commits against GitHub's git data API

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use forgetree::cli::{self, Cli};
use forgetree::ui::output;

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("forgetree=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_tracing(cli.debug);

    match cli::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
