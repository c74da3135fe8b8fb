//! loginlab E2E Test Framework
//!
//! This crate drives real browsers against the login demo:
//! - Spawns `loginlab-web` as a subprocess and waits for `/api/health`
//! - Describes the login contract once, as page-object steps
//! - Executes it through Playwright (generated Node script) or any
//!   W3C WebDriver endpoint (chromedriver, geckodriver)
//! - Accepts extra declarative YAML specs
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                    │
//! ├──────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                  │
//! │    ├── start_server() -> ServerHandle                        │
//! │    ├── specs() -> login_scenarios() + YAML specs             │
//! │    └── run_specs() -> dyn SpecExecutor                       │
//! │          ├── PlaywrightHandle    (one Node script / spec)    │
//! │          └── WebDriverExecutor   (one session / spec)        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  LoginPage / DashboardPage -> Vec<TestStep>                  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod pages;
pub mod playwright;
pub mod runner;
pub mod scenarios;
pub mod server;
pub mod spec;
pub mod webdriver;

pub use error::{E2eError, E2eResult};
pub use pages::{DashboardPage, LoginPage, ValidUser};
pub use runner::{Driver, RunnerConfig, SpecExecutor, TestRunner, TestSuiteResult};
pub use scenarios::login_scenarios;
pub use spec::{StepResult, TestSpec, TestStep};
