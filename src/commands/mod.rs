//! Subcommand implementations.

mod check;
mod smoke;
mod storage_state;

pub use check::run_check_config;
pub use smoke::run_smoke;
pub use storage_state::run_generate_storage_state;

use std::process::ExitCode;

use uta_lib::UtaError;

/// Print an error with its remediation hint and return the fatal exit code.
/// Exit code 2 is reserved for fatal/config errors; failing cases use 1.
pub(crate) fn render_error(err: UtaError) -> ExitCode {
    let payload = err.to_payload();
    eprintln!("error: {}", payload.message);
    if let Some(remediation) = payload.remediation {
        eprintln!("hint: {remediation}");
    }
    ExitCode::from(2)
}
