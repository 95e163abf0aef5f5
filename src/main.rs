use std::process::ExitCode;

use crate::cli::run;

pub mod batch;
pub mod cli;
pub mod codec;
mod config;
pub mod domain;
pub mod edit;
pub mod storage;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
