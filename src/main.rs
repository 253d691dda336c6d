mod cli;
mod commands;

use std::process::ExitCode;

use cli::Commands;
use commands::{run_check_config, run_generate_storage_state, run_smoke};

#[tokio::main]
async fn main() -> ExitCode {
    run().await
}

async fn run() -> ExitCode {
    let args = cli::parse();

    match args.command {
        Commands::Smoke {
            headless,
            record_har,
            record_video,
            skip_negative,
        } => {
            run_smoke(
                &args.config_dir,
                args.verbose,
                headless,
                record_har,
                record_video,
                skip_negative,
            )
            .await
        }
        Commands::GenerateStorageState { output } => {
            run_generate_storage_state(&args.config_dir, args.verbose, output).await
        }
        Commands::CheckConfig => run_check_config(&args.config_dir, args.verbose),
    }
}
