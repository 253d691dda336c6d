use std::path::Path;
use std::process::ExitCode;

use uta_lib::Config;

use crate::commands::render_error;

/// Load, validate and summarize the layered configuration.
pub fn run_check_config(config_dir: &Path, verbose: bool) -> ExitCode {
    let config = match Config::load(config_dir) {
        Ok(config) => config,
        Err(err) => return render_error(err),
    };

    println!("{}", config.effective_summary(config_dir));
    if verbose {
        match config.credentials() {
            Ok(credentials) => println!("default account: {}", credentials.username),
            Err(_) => println!("default account: not configured"),
        }
    }
    ExitCode::SUCCESS
}
