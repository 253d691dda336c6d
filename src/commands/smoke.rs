use std::path::Path;
use std::process::ExitCode;

use uta_lib::{Config, ContextOptions, LoginFlow, TestSession};

use crate::commands::render_error;

/// Failure-matrix inputs: username, password, and the case name.
const NEGATIVE_CASES: &[(&str, &str, &str)] = &[
    ("not_exist_user", "wrong_password", "login_fails_with_wrong_credentials"),
    ("", "Aa123456", "login_fails_with_empty_username"),
    ("not_exist_user", "", "login_fails_with_empty_password"),
];

/// Run the login smoke suite and write the HTML report.
#[allow(clippy::fn_params_excessive_bools)]
pub async fn run_smoke(
    config_dir: &Path,
    verbose: bool,
    headless: Option<bool>,
    record_har: bool,
    record_video: bool,
    skip_negative: bool,
) -> ExitCode {
    let mut config = match Config::load(config_dir) {
        Ok(config) => config,
        Err(err) => return render_error(err),
    };
    if let Some(headless) = headless {
        config.browser.headless = headless;
    }
    if verbose {
        eprintln!("{}", config.effective_summary(config_dir));
    }

    let mut session = match TestSession::start(config, "login smoke") {
        Ok(session) => session,
        Err(err) => return render_error(err),
    };

    let mut options = ContextOptions::from_env();
    options.record_har |= record_har;
    options.record_video |= record_video;

    session
        .run_case(
            "login_with_default_account_succeeds",
            options.clone(),
            |page, config| async move {
                LoginFlow::new(&page, &config).login_should_succeed(None).await
            },
        )
        .await;

    if !skip_negative {
        for &(username, password, case_name) in NEGATIVE_CASES {
            let (username, password) = (username.to_string(), password.to_string());
            session
                .run_case(case_name, options.clone(), move |page, config| async move {
                    LoginFlow::new(&page, &config)
                        .login_should_fail(&username, &password)
                        .await
                })
                .await;
        }
    }

    let report = match session.finish() {
        Ok(report) => report,
        Err(err) => return render_error(err),
    };
    println!("{}", report.summary());
    if report.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
