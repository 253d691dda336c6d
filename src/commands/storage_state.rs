use std::path::{Path, PathBuf};
use std::process::ExitCode;

use uta_lib::{logging, BrowserSession, Config, ContextOptions, LoginFlow, StorageState};

use crate::commands::render_error;

/// One-shot tool: log in with the default account and persist the
/// authenticated cookies/localStorage so later runs can skip the login UI.
pub async fn run_generate_storage_state(
    config_dir: &Path,
    verbose: bool,
    output: PathBuf,
) -> ExitCode {
    let config = match Config::load(config_dir) {
        Ok(config) => config,
        Err(err) => return render_error(err),
    };
    if verbose {
        eprintln!("{}", config.effective_summary(config_dir));
    }

    let _log_guard = match logging::init(&config.report) {
        Ok(guard) => guard,
        Err(err) => return render_error(err),
    };

    let session = match BrowserSession::start(&config) {
        Ok(session) => session,
        Err(err) => return render_error(err),
    };

    let context = match session
        .new_context("generate_storage_state", ContextOptions::default())
        .await
    {
        Ok(context) => context,
        Err(err) => return render_error(err),
    };

    let result = async {
        LoginFlow::new(context.page(), &config)
            .login_with_default_account()
            .await?;
        let state = StorageState::capture(context.page().cdp_page()).await?;
        state.save(&output)?;
        Ok::<_, uta_lib::UtaError>(())
    }
    .await;

    context.teardown().await;
    session.close();

    match result {
        Ok(()) => {
            println!("storage state saved to {}", output.display());
            ExitCode::SUCCESS
        }
        Err(err) => render_error(err),
    }
}
