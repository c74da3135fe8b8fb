//! Page objects for the login and dashboard views
//!
//! Page objects do not talk to a browser themselves. They emit [`TestStep`]s,
//! so the same flow runs unchanged on every driver backend.

use loginlab_common::{Locale, Messages};

use crate::spec::TestStep;

/// Stable element locators. XPath selectors carry an `xpath=` prefix.
pub mod selectors {
    pub const USERNAME_INPUT: &str = r#"[data-testid="username-input"]"#;
    pub const PASSWORD_INPUT: &str = r#"[data-testid="password-input"]"#;
    pub const SUBMIT_BUTTON: &str = r#"[data-testid="submit-button"]"#;
    pub const LOGIN_HEADING: &str = r#"xpath=//h1[text()="Login"]"#;
    pub const DASHBOARD_TITLE: &str = r#"[data-testid="dashboard-title"]"#;
    pub const WELCOME_MESSAGE: &str = r#"[data-testid="welcome-message"]"#;
}

pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/dashboard";
pub const LOGIN_API_PATH: &str = "/api/login";

/// Accounts on the built-in allow-list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidUser {
    Admin,
    Jvh,
}

impl ValidUser {
    /// Demo accounts use the username as password
    pub fn username(&self) -> &'static str {
        match self {
            ValidUser::Admin => "admin",
            ValidUser::Jvh => "jvh",
        }
    }
}

fn visible(selector: &str) -> TestStep {
    TestStep::Assert {
        selector: selector.to_string(),
        visible: Some(true),
        text: None,
        text_contains: None,
        count: None,
        timeout_ms: 5000,
    }
}

/// The login form at `/login`
#[derive(Debug, Clone, Copy)]
pub struct LoginPage {
    messages: &'static Messages,
}

impl LoginPage {
    pub fn new(locale: Locale) -> Self {
        Self {
            messages: locale.messages(),
        }
    }

    pub fn goto(&self) -> Vec<TestStep> {
        vec![TestStep::Navigate {
            url: LOGIN_PATH.to_string(),
            wait_for_selector: Some(selectors::SUBMIT_BUTTON.to_string()),
        }]
    }

    pub fn login(&self, username: &str, password: &str) -> Vec<TestStep> {
        vec![
            TestStep::Fill {
                selector: selectors::USERNAME_INPUT.to_string(),
                value: username.to_string(),
            },
            TestStep::Fill {
                selector: selectors::PASSWORD_INPUT.to_string(),
                value: password.to_string(),
            },
            TestStep::Click {
                selector: selectors::SUBMIT_BUTTON.to_string(),
                timeout_ms: None,
            },
        ]
    }

    pub fn login_with_valid_credentials(&self, user: ValidUser) -> Vec<TestStep> {
        self.login(user.username(), user.username())
    }

    pub fn expect_login_page_to_be_visible(&self) -> Vec<TestStep> {
        [
            selectors::LOGIN_HEADING,
            selectors::USERNAME_INPUT,
            selectors::PASSWORD_INPUT,
            selectors::SUBMIT_BUTTON,
        ]
        .into_iter()
        .map(visible)
        .collect()
    }

    pub fn expect_to_stay_on_login_page(&self) -> Vec<TestStep> {
        vec![TestStep::ExpectUrl {
            path: LOGIN_PATH.to_string(),
            timeout_ms: 5000,
        }]
    }

    /// Blocking alert with the given text, acknowledged once seen
    pub fn expect_alert(&self, message: &str) -> Vec<TestStep> {
        vec![TestStep::ExpectDialog {
            message: message.to_string(),
            timeout_ms: 2000,
        }]
    }

    /// The shared rejection alert for unknown user or wrong password
    pub fn expect_user_not_found_alert(&self) -> Vec<TestStep> {
        self.expect_alert(self.messages.user_not_found)
    }

    pub fn click_submit_without_filling(&self) -> Vec<TestStep> {
        vec![TestStep::Click {
            selector: selectors::SUBMIT_BUTTON.to_string(),
            timeout_ms: None,
        }]
    }

    pub fn expect_no_login_request(&self) -> Vec<TestStep> {
        vec![TestStep::ExpectNoRequest {
            path: LOGIN_API_PATH.to_string(),
            settle_ms: 500,
        }]
    }
}

/// The landing view at `/dashboard`
#[derive(Debug, Clone, Copy)]
pub struct DashboardPage {
    messages: &'static Messages,
}

impl DashboardPage {
    pub fn new(locale: Locale) -> Self {
        Self {
            messages: locale.messages(),
        }
    }

    pub fn expect_to_be_on_dashboard(&self) -> Vec<TestStep> {
        vec![
            TestStep::ExpectUrl {
                path: DASHBOARD_PATH.to_string(),
                timeout_ms: 5000,
            },
            visible(selectors::DASHBOARD_TITLE),
            TestStep::Assert {
                selector: selectors::DASHBOARD_TITLE.to_string(),
                visible: None,
                text: Some("Dashboard".to_string()),
                text_contains: None,
                count: None,
                timeout_ms: 5000,
            },
        ]
    }

    pub fn expect_welcome_message_to_be_visible(&self) -> Vec<TestStep> {
        vec![TestStep::Assert {
            selector: selectors::WELCOME_MESSAGE.to_string(),
            visible: Some(true),
            text: None,
            text_contains: Some(self.messages.welcome.to_string()),
            count: None,
            timeout_ms: 5000,
        }]
    }
}
