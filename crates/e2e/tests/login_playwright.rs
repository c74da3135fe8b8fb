//! Login suite on Playwright
//!
//! Needs Node with `@playwright/test` and its browsers installed:
//! `npm i -D @playwright/test && npx playwright install chromium`, then
//! `cargo test -p loginlab-e2e --test login_playwright -- --ignored`.

mod support;

use loginlab_common::Locale;
use loginlab_e2e::playwright::{PlaywrightConfig, PlaywrightHandle};
use loginlab_e2e::server::ServerHandle;
use std::path::PathBuf;

async fn setup(locale: Locale) -> Option<(ServerHandle, PlaywrightHandle)> {
    let server = support::start_server(locale).await?;

    let config = PlaywrightConfig {
        base_url: server.base_url().to_string(),
        screenshot_dir: std::env::temp_dir().join("loginlab-playwright"),
        work_dir: std::env::var("LOGINLAB_NODE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".")),
        ..Default::default()
    };

    match PlaywrightHandle::new(config) {
        Ok(handle) => Some((server, handle)),
        Err(e) => {
            eprintln!("skipping: {}", e);
            None
        }
    }
}

async fn login_contract(locale: Locale) {
    let Some((_server, playwright)) = setup(locale).await else {
        return;
    };
    support::run_login_contract(&playwright, locale).await;
}

#[tokio::test]
#[ignore]
async fn login_contract_english() {
    login_contract(Locale::En).await;
}

#[tokio::test]
#[ignore]
async fn login_contract_spanish() {
    login_contract(Locale::Es).await;
}
