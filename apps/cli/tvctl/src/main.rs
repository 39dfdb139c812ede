use tvctl::cli::Cli;
use tvctl::logger::FILE_ONLY_TARGET;
use tvctl::runner::run;

use std::process::ExitCode;

use clap::Parser;
use log::error;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(target: FILE_ONLY_TARGET, "{e}");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
