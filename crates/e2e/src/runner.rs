//! Main test runner that orchestrates the server and a browser backend

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::error::{E2eError, E2eResult};
use crate::playwright::{PlaywrightConfig, PlaywrightHandle};
use crate::scenarios::login_scenarios;
use crate::server::{ServerConfig, ServerHandle};
use crate::spec::{StepResult, TestSpec};
use crate::webdriver::{WebDriverConfig, WebDriverExecutor};

/// Browser automation backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Driver {
    #[default]
    Playwright,
    WebDriver,
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Driver::Playwright => write!(f, "playwright"),
            Driver::WebDriver => write!(f, "webdriver"),
        }
    }
}

impl std::str::FromStr for Driver {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "playwright" => Ok(Driver::Playwright),
            "webdriver" | "selenium" => Ok(Driver::WebDriver),
            other => Err(format!("unknown driver '{}', expected playwright or webdriver", other)),
        }
    }
}

/// Runs one spec in a fresh browser context and reports per-step results
#[async_trait]
pub trait SpecExecutor: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(&self, spec: &TestSpec) -> E2eResult<Vec<StepResult>>;
}

/// Result of running a single test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub error: Option<String>,
}

/// Result of running all tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub driver: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn summary(&self) -> String {
        format!(
            "[{}] {} passed, {} failed, {} skipped ({} ms)",
            self.driver, self.passed, self.failed, self.skipped, self.duration_ms
        )
    }
}

/// Configuration for the test runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub server: ServerConfig,
    pub driver: Driver,
    pub playwright: PlaywrightConfig,
    pub webdriver: WebDriverConfig,
    /// Extra YAML specs run after the built-in login suite
    pub specs_dir: Option<PathBuf>,
    pub output_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            driver: Driver::default(),
            playwright: PlaywrightConfig::default(),
            webdriver: WebDriverConfig::default(),
            specs_dir: None,
            output_dir: PathBuf::from("test-results"),
        }
    }
}

/// Main E2E test runner
pub struct TestRunner {
    config: RunnerConfig,

    /// Running server handle (if any)
    server: Option<ServerHandle>,
}

impl TestRunner {
    /// Create a new test runner with default configuration
    pub fn new() -> Self {
        Self::with_config(RunnerConfig::default())
    }

    /// Create a test runner with custom configuration
    pub fn with_config(config: RunnerConfig) -> Self {
        Self {
            config,
            server: None,
        }
    }

    pub fn driver(&self) -> Driver {
        self.config.driver
    }

    /// Start the server
    pub async fn start_server(&mut self) -> E2eResult<()> {
        if self.server.is_some() {
            return Ok(()); // Already running
        }

        let server = ServerHandle::spawn(self.config.server.clone()).await?;

        // Point both backends at the actual server URL
        self.config.playwright.base_url = server.base_url().to_string();
        self.config.webdriver.base_url = server.base_url().to_string();

        self.server = Some(server);
        Ok(())
    }

    /// Stop the server
    pub fn stop_server(&mut self) -> E2eResult<()> {
        if let Some(mut server) = self.server.take() {
            server.stop()?;
        }
        Ok(())
    }

    /// Built-in login suite plus any YAML specs
    pub fn specs(&self) -> E2eResult<Vec<TestSpec>> {
        let mut specs = login_scenarios(self.config.server.locale);
        if let Some(dir) = &self.config.specs_dir {
            specs.extend(TestSpec::load_all(dir)?);
        }
        Ok(specs)
    }

    /// Run every spec
    pub async fn run_all(&mut self) -> E2eResult<TestSuiteResult> {
        let specs = self.specs()?;
        self.run_specs(&specs).await
    }

    /// Specs carrying `tag`, in suite order
    pub fn tagged_specs(&self, tag: &str) -> E2eResult<Vec<TestSpec>> {
        let specs = self.specs()?;
        Ok(TestSpec::filter_by_tag(&specs, tag)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Run tests matching a tag
    pub async fn run_tagged(&mut self, tag: &str) -> E2eResult<TestSuiteResult> {
        let filtered = self.tagged_specs(tag)?;
        self.run_specs(&filtered).await
    }

    /// Run a specific test by name
    pub async fn run_test(&mut self, name: &str) -> E2eResult<TestSuiteResult> {
        let spec = self
            .specs()?
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| E2eError::SpecParse(format!("Test not found: {}", name)))?;

        self.run_specs(std::slice::from_ref(&spec)).await
    }

    /// Build the configured backend against the running server
    async fn executor(&self) -> E2eResult<Box<dyn SpecExecutor>> {
        match self.config.driver {
            Driver::Playwright => Ok(Box::new(PlaywrightHandle::new(self.config.playwright.clone())?)),
            Driver::WebDriver => {
                let executor = WebDriverExecutor::new(self.config.webdriver.clone())?;
                executor.ensure_available().await?;
                Ok(Box::new(executor))
            }
        }
    }

    /// Run a list of test specs
    pub async fn run_specs(&mut self, specs: &[TestSpec]) -> E2eResult<TestSuiteResult> {
        // Ensure server is running
        self.start_server().await?;

        let executor = self.executor().await?;
        Ok(Self::execute_specs(executor.as_ref(), specs).await)
    }

    /// Run specs one after another on `executor`, continuing past failures
    pub async fn execute_specs(executor: &dyn SpecExecutor, specs: &[TestSpec]) -> TestSuiteResult {
        let start = Instant::now();
        let mut results = Vec::new();
        let mut passed = 0;
        let mut failed = 0;
        let skipped = 0;

        info!("Running {} test(s) with {}...", specs.len(), executor.name());

        for spec in specs {
            let result = Self::run_spec(executor, spec).await;
            if result.success {
                passed += 1;
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                failed += 1;
                error!(
                    "✗ {} - {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(result);
        }

        let suite = TestSuiteResult {
            driver: executor.name().to_string(),
            total: specs.len(),
            passed,
            failed,
            skipped,
            duration_ms: start.elapsed().as_millis() as u64,
            results,
        };

        info!("Test Results: {}", suite.summary());
        suite
    }

    /// Run a single test spec
    pub async fn run_spec(executor: &dyn SpecExecutor, spec: &TestSpec) -> TestResult {
        let start = Instant::now();
        debug!("Running test: {}", spec.name);

        let (steps, error) = match executor.execute(spec).await {
            Ok(steps) => {
                let error = match steps.iter().find(|s| !s.success) {
                    Some(step) => Some(format!(
                        "{}: {}",
                        step.step_name,
                        step.error.as_deref().unwrap_or("failed")
                    )),
                    None if steps.len() < spec.steps.len() => Some(format!(
                        "only {} of {} steps reported",
                        steps.len(),
                        spec.steps.len()
                    )),
                    None => None,
                };
                (steps, error)
            }
            Err(e) => (Vec::new(), Some(e.to_string())),
        };

        TestResult {
            name: spec.name.clone(),
            success: error.is_none(),
            duration_ms: start.elapsed().as_millis() as u64,
            steps,
            error,
        }
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TestRunner {
    fn drop(&mut self) {
        let _ = self.stop_server();
    }
}
