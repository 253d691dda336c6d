//! Login page object.
//!
//! Locators prefer stable accessible attributes (placeholder, role) over
//! markup position; the outcome indicators are the three validation states
//! the app renders plus the post-login user marker.

use crate::browser::{PageHandle, WaitUntil};
use crate::config::{AppConfig, TimeoutTier};
use crate::error::Result;
use crate::locator::Locator;

pub struct LoginPage<'a> {
    page: &'a PageHandle,
    app: AppConfig,
}

impl<'a> LoginPage<'a> {
    pub fn new(page: &'a PageHandle, app: &AppConfig) -> Self {
        Self {
            page,
            app: app.clone(),
        }
    }

    pub fn username_input() -> Locator {
        Locator::placeholder("Username")
    }

    pub fn password_input() -> Locator {
        Locator::placeholder("Password")
    }

    pub fn login_button() -> Locator {
        Locator::role("button", "Log in")
    }

    /// Marker that only renders for an authenticated user.
    pub fn logged_in_marker() -> Locator {
        Locator::css(".userName")
    }

    pub fn success_message() -> Locator {
        Locator::text("Login successful")
    }

    pub fn global_error() -> Locator {
        Locator::text("Incorrect username or password")
    }

    pub fn username_required_message() -> Locator {
        Locator::text("Username is required")
    }

    pub fn password_required_message() -> Locator {
        Locator::text("Password is required")
    }

    /// Open the login page, waiting for the document to load.
    pub async fn open(&self) -> Result<()> {
        self.page
            .goto(&self.app.login_url(), WaitUntil::Load)
            .await
    }

    pub async fn enter_username(&self, username: &str) -> Result<()> {
        self.page
            .fill(&Self::username_input(), username, None)
            .await
    }

    pub async fn enter_password(&self, password: &str) -> Result<()> {
        self.page
            .fill(&Self::password_input(), password, None)
            .await
    }

    pub async fn submit(&self) -> Result<()> {
        self.page.click(&Self::login_button(), None).await
    }

    pub async fn is_logged_in(&self) -> Result<bool> {
        self.page.is_visible(&Self::logged_in_marker(), None).await
    }

    pub async fn success_message_text(&self) -> Result<String> {
        self.page.inner_text(&Self::success_message(), None).await
    }

    pub async fn error_message_text(&self) -> Result<String> {
        self.page.inner_text(&Self::global_error(), None).await
    }

    pub async fn is_global_error_visible(&self) -> Result<bool> {
        self.page.is_visible(&Self::global_error(), None).await
    }

    /// Form validation shows quickly or not at all, so these use the short
    /// budget.
    pub async fn is_username_required_visible(&self) -> Result<bool> {
        self.page
            .is_visible(&Self::username_required_message(), Some(TimeoutTier::Short))
            .await
    }

    pub async fn is_password_required_visible(&self) -> Result<bool> {
        self.page
            .is_visible(&Self::password_required_message(), Some(TimeoutTier::Short))
            .await
    }
}
