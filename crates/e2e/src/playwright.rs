//! Playwright browser automation
//!
//! Each spec becomes one Node script driving `@playwright/test`. The script
//! prints one JSON line per executed step on stdout, which is parsed back
//! into [`StepResult`]s.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tokio::process::Command as TokioCommand;
use tracing::{debug, info};

use crate::error::{E2eError, E2eResult};
use crate::runner::SpecExecutor;
use crate::spec::{StepResult, TestSpec, TestStep};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(E2eError::Playwright(format!("unknown browser: {}", other))),
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub base_url: String,
    pub screenshot_dir: PathBuf,
    pub browser: Browser,
    pub headless: bool,
    /// Directory whose `node_modules` provides `@playwright/test`
    pub work_dir: PathBuf,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            screenshot_dir: PathBuf::from("test-results/screenshots"),
            browser: Browser::Chromium,
            headless: true,
            work_dir: PathBuf::from("."),
        }
    }
}

/// One line of script output
#[derive(Debug, Deserialize)]
struct ScriptStepReport {
    step: usize,
    ok: bool,
    duration_ms: u64,
    #[serde(default)]
    error: Option<String>,
}

/// Playwright browser handle
pub struct PlaywrightHandle {
    config: PlaywrightConfig,
}

impl PlaywrightHandle {
    /// Create a new Playwright handle
    pub fn new(config: PlaywrightConfig) -> E2eResult<Self> {
        // Verify playwright is installed
        Self::check_playwright_installed(&config)?;

        std::fs::create_dir_all(&config.screenshot_dir)?;

        Ok(Self { config })
    }

    /// Check if Playwright is installed
    fn check_playwright_installed(config: &PlaywrightConfig) -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .current_dir(&config.work_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    /// Build the Playwright script for a spec
    pub fn build_script(&self, spec: &TestSpec) -> String {
        let mut script = String::new();

        // Header
        script.push_str(&format!(
            r#"const pw = require(require.resolve('@playwright/test', {{ paths: [process.cwd()] }}));
const {{ expect }} = pw;

function report(step, name, ok, started, error) {{
  console.log(JSON.stringify({{ step, name, ok, duration_ms: Date.now() - started, error: error || null }}));
}}

(async () => {{
  const browser = await pw.{browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const page = await context.newPage();
  const baseUrl = {base_url};

  const dialogs = [];
  let dialogCursor = 0;
  page.on('dialog', async (dialog) => {{
    dialogs.push({{ type: dialog.type(), message: dialog.message() }});
    await dialog.accept();
  }});

  const requests = [];
  page.on('request', (request) => {{
    requests.push(new URL(request.url()).pathname);
  }});

  const steps = [
"#,
            browser = self.config.browser.as_str(),
            headless = self.config.headless,
            width = spec.viewport.width,
            height = spec.viewport.height,
            base_url = js_str(&self.config.base_url),
        ));

        // Generate step code
        for (i, step) in spec.steps.iter().enumerate() {
            script.push_str(&format!(
                "    // Step {}: {}\n    [{}, async () => {{\n{}\n    }}],\n",
                i + 1,
                step.name().replace('\n', " "),
                js_str(&step.name()),
                self.step_to_js(step)
            ));
        }

        // Footer
        script.push_str(
            r#"  ];

  let failed = false;
  try {
    for (let i = 0; i < steps.length; i++) {
      const [name, run] = steps[i];
      const started = Date.now();
      try {
        await run();
        report(i, name, true, started);
      } catch (error) {
        report(i, name, false, started, error.message);
        failed = true;
        break;
      }
    }
  } finally {
    await browser.close();
  }
  process.exit(failed ? 1 : 0);
})().catch((error) => {
  console.error(JSON.stringify({ success: false, error: error.message, stack: error.stack }));
  process.exit(2);
});
"#,
        );

        script
    }

    /// Convert a step to the body of an async JavaScript function
    fn step_to_js(&self, step: &TestStep) -> String {
        match step {
            TestStep::Navigate { url, wait_for_selector } => {
                let wait = wait_for_selector
                    .as_ref()
                    .map(|s| format!("\n      await page.locator({}).first().waitFor();", js_str(s)))
                    .unwrap_or_default();
                format!("      await page.goto(baseUrl + {});{}", js_str(url), wait)
            }
            TestStep::Click { selector, timeout_ms } => {
                format!(
                    "      await page.locator({}).click({{ timeout: {} }});",
                    js_str(selector),
                    timeout_ms.unwrap_or(5000)
                )
            }
            TestStep::Fill { selector, value } => {
                format!("      await page.locator({}).fill({});", js_str(selector), js_str(value))
            }
            TestStep::Wait { selector, timeout_ms, state } => {
                format!(
                    "      await page.locator({}).first().waitFor({{ state: '{}', timeout: {} }});",
                    js_str(selector),
                    state.as_str(),
                    timeout_ms
                )
            }
            TestStep::Sleep { ms } => {
                format!("      await page.waitForTimeout({});", ms)
            }
            TestStep::Assert { selector, visible, text, text_contains, count, timeout_ms } => {
                let locator = format!("page.locator({})", js_str(selector));
                let mut assertions = Vec::new();

                if let Some(vis) = visible {
                    let matcher = if *vis { "toBeVisible" } else { "toBeHidden" };
                    assertions.push(format!(
                        "      await expect({}).{}({{ timeout: {} }});",
                        locator, matcher, timeout_ms
                    ));
                }

                if let Some(t) = text {
                    assertions.push(format!(
                        "      await expect({}).toHaveText({}, {{ timeout: {} }});",
                        locator,
                        js_str(t),
                        timeout_ms
                    ));
                }

                if let Some(tc) = text_contains {
                    assertions.push(format!(
                        "      await expect({}).toContainText({}, {{ timeout: {} }});",
                        locator,
                        js_str(tc),
                        timeout_ms
                    ));
                }

                if let Some(c) = count {
                    assertions.push(format!(
                        "      await expect({}).toHaveCount({}, {{ timeout: {} }});",
                        locator, c, timeout_ms
                    ));
                }

                assertions.join("\n")
            }
            TestStep::ExpectUrl { path, timeout_ms } => {
                format!(
                    "      await expect(page).toHaveURL(baseUrl + {}, {{ timeout: {} }});",
                    js_str(path),
                    timeout_ms
                )
            }
            TestStep::ExpectDialog { message, timeout_ms } => {
                format!(
                    r#"      const expected = {message};
      const deadline = Date.now() + {timeout};
      while (dialogs.length <= dialogCursor) {{
        if (Date.now() > deadline) throw new Error('Timeout waiting for dialog');
        await page.waitForTimeout(50);
      }}
      const dialog = dialogs[dialogCursor++];
      if (dialog.type !== 'alert') throw new Error('Expected an alert but got ' + dialog.type);
      if (dialog.message !== expected) {{
        throw new Error('Expected dialog ' + JSON.stringify(expected) + ' but got ' + JSON.stringify(dialog.message));
      }}"#,
                    message = js_str(message),
                    timeout = timeout_ms
                )
            }
            TestStep::ExpectNoRequest { path, settle_ms } => {
                format!(
                    r#"      await page.waitForTimeout({settle});
      if (requests.includes({path})) throw new Error('Unexpected request to ' + {path});"#,
                    settle = settle_ms,
                    path = js_str(path)
                )
            }
            TestStep::Screenshot { name, full_page } => {
                let path = self.screenshot_path(name);
                format!(
                    "      await page.screenshot({{ path: {}, fullPage: {} }});",
                    js_str(&path.to_string_lossy()),
                    full_page
                )
            }
            TestStep::Log { message } => {
                format!("      console.error('[TEST] ' + {});", js_str(message))
            }
        }
    }

    fn screenshot_path(&self, name: &str) -> PathBuf {
        self.config.screenshot_dir.join(format!("{}.png", name))
    }

    /// Execute a generated script and return its raw output
    pub async fn run_script(&self, script: &str) -> E2eResult<std::process::Output> {
        // Write script to temp file
        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("spec.js");
        std::fs::write(&script_path, script)?;

        debug!("Running Playwright script: {}", script_path.display());

        let output = TokioCommand::new("node")
            .arg(&script_path)
            .current_dir(&self.config.work_dir)
            .output()
            .await?;

        Ok(output)
    }

    /// Turn script output into step results
    pub fn parse_results(&self, spec: &TestSpec, output: &std::process::Output) -> E2eResult<Vec<StepResult>> {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut results = Vec::new();

        for line in stdout.lines() {
            let Ok(report) = serde_json::from_str::<ScriptStepReport>(line.trim()) else {
                continue;
            };
            let Some(step) = spec.steps.get(report.step) else {
                continue;
            };

            let screenshot_path = match step {
                TestStep::Screenshot { name, .. } if report.ok => Some(self.screenshot_path(name)),
                _ => None,
            };

            results.push(StepResult {
                success: report.ok,
                step_name: step.name(),
                duration_ms: report.duration_ms,
                error: report.error,
                screenshot_path,
            });
        }

        let failed_step = results.iter().any(|r| !r.success);
        if !output.status.success() && !failed_step {
            // The script died outside of a step (launch failure, syntax error).
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(E2eError::Playwright(format!(
                "Script failed:\nstdout: {}\nstderr: {}",
                stdout, stderr
            )));
        }

        Ok(results)
    }
}

#[async_trait]
impl SpecExecutor for PlaywrightHandle {
    fn name(&self) -> &'static str {
        "playwright"
    }

    async fn execute(&self, spec: &TestSpec) -> E2eResult<Vec<StepResult>> {
        info!("[playwright] {}", spec.name);
        let script = self.build_script(spec);
        let output = self.run_script(&script).await?;
        self.parse_results(spec, &output)
    }
}

/// Quote a string as a JavaScript literal
fn js_str(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::LoginPage;
    use loginlab_common::Locale;

    #[cfg(unix)]
    use std::os::unix::process::ExitStatusExt;

    fn handle() -> PlaywrightHandle {
        // Bypass the installation check; only script generation is exercised.
        PlaywrightHandle {
            config: PlaywrightConfig {
                base_url: "http://127.0.0.1:4321".to_string(),
                ..Default::default()
            },
        }
    }

    fn spec(steps: Vec<TestStep>) -> TestSpec {
        TestSpec::new("t", "", steps)
    }

    #[test]
    fn test_script_header() {
        let script = handle().build_script(&spec(LoginPage::new(Locale::En).goto()));
        assert!(script.contains("const baseUrl = \"http://127.0.0.1:4321\";"));
        assert!(script.contains("pw.chromium.launch({ headless: true })"));
        assert!(script.contains("viewport: { width: 1280, height: 720 }"));
        assert!(script.contains("page.on('dialog'"));
        assert!(script.contains("await page.goto(baseUrl + \"/login\");"));
    }

    #[test]
    fn test_values_are_escaped() {
        let steps = vec![TestStep::Fill {
            selector: r#"[data-testid="username-input"]"#.to_string(),
            value: "it's \"quoted\"".to_string(),
        }];
        let script = handle().build_script(&spec(steps));
        assert!(script.contains(
            r#"await page.locator("[data-testid=\"username-input\"]").fill("it's \"quoted\"");"#
        ));
    }

    #[test]
    fn test_dialog_and_request_checks() {
        let login = LoginPage::new(Locale::Es);
        let mut steps = login.expect_user_not_found_alert();
        steps.extend(login.expect_no_login_request());
        let script = handle().build_script(&spec(steps));

        assert!(script.contains(r#"const expected = "usuario no existe";"#));
        assert!(script.contains("const deadline = Date.now() + 2000;"));
        assert!(script.contains(r#"requests.includes("/api/login")"#));
    }

    #[test]
    fn test_assert_generates_each_matcher() {
        let steps = vec![TestStep::Assert {
            selector: "h1".to_string(),
            visible: Some(true),
            text: Some("Dashboard".to_string()),
            text_contains: None,
            count: Some(1),
            timeout_ms: 3000,
        }];
        let js = handle().step_to_js(&steps[0]);
        assert!(js.contains(r#"expect(page.locator("h1")).toBeVisible({ timeout: 3000 })"#));
        assert!(js.contains(r#"toHaveText("Dashboard", { timeout: 3000 })"#));
        assert!(js.contains("toHaveCount(1, { timeout: 3000 })"));
    }

    #[cfg(unix)]
    #[test]
    fn test_parse_results() {
        let spec = spec(vec![
            TestStep::Sleep { ms: 1 },
            TestStep::Screenshot { name: "shot".to_string(), full_page: false },
            TestStep::Log { message: "never".to_string() },
        ]);
        let output = std::process::Output {
            status: std::process::ExitStatus::from_raw(1 << 8),
            stdout: concat!(
                "{\"step\":0,\"name\":\"sleep:1ms\",\"ok\":true,\"duration_ms\":3,\"error\":null}\n",
                "noise\n",
                "{\"step\":1,\"name\":\"screenshot:shot\",\"ok\":false,\"duration_ms\":7,\"error\":\"boom\"}\n",
            )
            .as_bytes()
            .to_vec(),
            stderr: Vec::new(),
        };

        let results = handle().parse_results(&spec, &output).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert_eq!(results[1].error.as_deref(), Some("boom"));
        assert_eq!(results[1].screenshot_path, None);
    }

    #[cfg(unix)]
    #[test]
    fn test_crash_without_step_is_an_error() {
        let output = std::process::Output {
            status: std::process::ExitStatus::from_raw(2 << 8),
            stdout: Vec::new(),
            stderr: b"Cannot find module '@playwright/test'".to_vec(),
        };
        let err = handle()
            .parse_results(&spec(vec![TestStep::Sleep { ms: 1 }]), &output)
            .unwrap_err();
        assert!(matches!(err, E2eError::Playwright(msg) if msg.contains("Cannot find module")));
    }

    #[test]
    fn test_browser_parse() {
        assert_eq!("firefox".parse::<Browser>().unwrap(), Browser::Firefox);
        assert!("lynx".parse::<Browser>().is_err());
    }
}
