use clap::Parser;
use portsweep::cli::Cli;
use portsweep::output::print_error;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so they never mix with results. `RUST_LOG` wins over
/// the verbosity flags.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "portsweep=info",
        _ => "portsweep=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
