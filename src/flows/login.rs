//! Login business flow.

use tracing::info;

use crate::browser::{PageHandle, WaitUntil};
use crate::config::{Config, Credentials, TimeoutTier};
use crate::error::{Result, UtaError};
use crate::flows::step;
use crate::pages::LoginPage;

pub struct LoginFlow<'a> {
    page: &'a PageHandle,
    config: &'a Config,
}

impl<'a> LoginFlow<'a> {
    pub fn new(page: &'a PageHandle, config: &'a Config) -> Self {
        Self { page, config }
    }

    fn login_page(&self) -> LoginPage<'a> {
        LoginPage::new(self.page, &self.config.app)
    }

    /// Perform the login steps without judging the outcome; assertion is
    /// the caller's job.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let tracer = self.page.tracer();
        let login_page = self.login_page();

        step(tracer, "open login page");
        login_page.open().await?;

        step(tracer, &format!("enter username '{username}'"));
        login_page.enter_username(username).await?;

        step(tracer, "enter password");
        login_page.enter_password(password).await?;

        step(tracer, "click login button");
        login_page.submit().await?;

        step(tracer, "wait for the page to settle");
        self.page
            .wait_for_load_state(WaitUntil::NetworkIdle, Some(TimeoutTier::Long))
            .await?;

        info!("login steps completed; outcome not asserted");
        Ok(())
    }

    /// Log in with the default account (env vars over config file).
    pub async fn login_with_default_account(&self) -> Result<()> {
        let credentials = self.config.credentials()?;
        info!(username = %credentials.username, "logging in with default account");
        self.login(&credentials.username, &credentials.password)
            .await
    }

    /// Login that must succeed. With no credentials given, the default
    /// account is resolved; missing credentials fail fast before any
    /// browser work.
    pub async fn login_should_succeed(&self, credentials: Option<Credentials>) -> Result<()> {
        let credentials = match credentials {
            Some(credentials) => credentials,
            None => self.config.credentials()?,
        };
        self.login(&credentials.username, &credentials.password)
            .await?;

        if self.login_page().is_logged_in().await? {
            info!("login succeeded");
            Ok(())
        } else {
            Err(UtaError::assertion(
                "expected login to succeed, but the logged-in marker never appeared",
            ))
        }
    }

    /// Login that must fail, asserting the indicator matching the input
    /// shape: empty username and empty password both fall through to the
    /// global error, a single empty field expects its form validation
    /// message.
    pub async fn login_should_fail(&self, username: &str, password: &str) -> Result<()> {
        info!(username, "running login expected to fail");
        self.login(username, password).await?;
        let login_page = self.login_page();

        if username.is_empty() && !password.is_empty() {
            if !login_page.is_username_required_visible().await? {
                return Err(UtaError::assertion(
                    "expected the 'Username is required' validation message, but it never appeared",
                ));
            }
        } else if !username.is_empty() && password.is_empty() {
            if !login_page.is_password_required_visible().await? {
                return Err(UtaError::assertion(
                    "expected the 'Password is required' validation message, but it never appeared",
                ));
            }
        } else if !login_page.is_global_error_visible().await? {
            return Err(UtaError::assertion(
                "expected the 'Incorrect username or password' error, but it never appeared",
            ));
        }
        Ok(())
    }
}
