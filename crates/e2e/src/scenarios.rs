//! The login contract as driver-independent test specs
//!
//! Every backend consumes the same list, so the assertions live here once.

use loginlab_common::Locale;

use crate::pages::{DashboardPage, LoginPage, ValidUser};
use crate::spec::{TestSpec, TestStep};

fn chain(parts: Vec<Vec<TestStep>>) -> Vec<TestStep> {
    parts.into_iter().flatten().collect()
}

/// Build the full login suite for the locale the server runs with
pub fn login_scenarios(locale: Locale) -> Vec<TestSpec> {
    let login = LoginPage::new(locale);
    let dashboard = DashboardPage::new(locale);

    let successful = |user: ValidUser| {
        TestSpec::new(
            format!("login-succeeds-{}", user.username()),
            format!(
                "{0}/{0} redirects to the dashboard titled Dashboard",
                user.username()
            ),
            chain(vec![
                login.goto(),
                login.login_with_valid_credentials(user),
                dashboard.expect_to_be_on_dashboard(),
                dashboard.expect_welcome_message_to_be_visible(),
            ]),
        )
        .with_tags(&["login", "success", "smoke"])
    };

    let rejected = |name: &str, description: &str, username: &str, password: &str| {
        TestSpec::new(
            name,
            description,
            chain(vec![
                login.goto(),
                login.login(username, password),
                login.expect_user_not_found_alert(),
                login.expect_to_stay_on_login_page(),
            ]),
        )
        .with_tags(&["login", "rejected"])
    };

    vec![
        TestSpec::new(
            "login-form-visible",
            "Heading, both inputs and the submit button are visible",
            chain(vec![login.goto(), login.expect_login_page_to_be_visible()]),
        )
        .with_tags(&["login", "smoke"]),
        successful(ValidUser::Admin),
        successful(ValidUser::Jvh),
        rejected(
            "login-rejects-wrong-password",
            "Known user with a wrong password gets the shared rejection alert",
            "admin",
            "wrongpass",
        ),
        rejected(
            "login-rejects-unknown-user",
            "Unknown user and password get the shared rejection alert",
            "usuario_invalido",
            "password_invalido",
        ),
        rejected(
            "login-rejects-unknown-user-valid-password",
            "A valid password does not help an unknown user",
            "usuario_invalido",
            "admin",
        ),
        rejected(
            "login-rejects-whitespace",
            "Whitespace-only credentials are sent untrimmed and rejected",
            "   ",
            "   ",
        ),
        rejected(
            "login-is-case-sensitive",
            "Usernames are matched exactly",
            "ADMIN",
            "admin",
        ),
        TestSpec::new(
            "login-empty-fields-blocked",
            "Required-field validation stops the submit before any request",
            chain(vec![
                login.goto(),
                login.click_submit_without_filling(),
                login.expect_no_login_request(),
                login.expect_to_stay_on_login_page(),
            ]),
        )
        .with_tags(&["login", "validation"]),
    ]
}
