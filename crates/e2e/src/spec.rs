//! Declarative YAML test specification

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{E2eError, E2eResult};

/// A complete test specification parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSpec {
    /// Unique name for this test
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering tests
    #[serde(default)]
    pub tags: Vec<String>,

    /// Viewport size for the browser
    #[serde(default = "default_viewport")]
    pub viewport: Viewport,

    /// Steps to execute in order
    pub steps: Vec<TestStep>,
}

fn default_viewport() -> Viewport {
    Viewport { width: 1280, height: 720 }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        default_viewport()
    }
}

/// A single step in a test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TestStep {
    /// Navigate to a URL (relative to base)
    Navigate {
        url: String,
        #[serde(default)]
        wait_for_selector: Option<String>,
    },

    /// Click an element
    Click {
        selector: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Replace the content of an input field
    Fill {
        selector: String,
        value: String,
    },

    /// Wait for an element to reach a state
    Wait {
        selector: String,
        #[serde(default = "default_wait_timeout")]
        timeout_ms: u64,
        #[serde(default)]
        state: WaitState,
    },

    /// Wait for a fixed amount of time (use sparingly)
    Sleep {
        ms: u64,
    },

    /// Assert something about an element
    Assert {
        selector: String,
        #[serde(default)]
        visible: Option<bool>,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        text_contains: Option<String>,
        #[serde(default)]
        count: Option<usize>,
        #[serde(default = "default_wait_timeout")]
        timeout_ms: u64,
    },

    /// Assert the current URL path, waiting for navigation to settle
    ExpectUrl {
        path: String,
        #[serde(default = "default_wait_timeout")]
        timeout_ms: u64,
    },

    /// Wait for a blocking alert, check its text and accept it
    ExpectDialog {
        message: String,
        #[serde(default = "default_dialog_timeout")]
        timeout_ms: u64,
    },

    /// Assert that the page never requested `path`
    ExpectNoRequest {
        path: String,
        #[serde(default = "default_settle")]
        settle_ms: u64,
    },

    /// Take a screenshot
    Screenshot {
        name: String,
        #[serde(default)]
        full_page: bool,
    },

    /// Log a message (for debugging)
    Log {
        message: String,
    },
}

fn default_wait_timeout() -> u64 {
    5000 // 5 seconds default
}

fn default_dialog_timeout() -> u64 {
    2000
}

fn default_settle() -> u64 {
    500
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    #[default]
    Visible,
    Hidden,
    Attached,
    Detached,
}

impl WaitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitState::Visible => "visible",
            WaitState::Hidden => "hidden",
            WaitState::Attached => "attached",
            WaitState::Detached => "detached",
        }
    }
}

impl TestStep {
    /// Short label used in logs and results
    pub fn name(&self) -> String {
        match self {
            TestStep::Navigate { url, .. } => format!("navigate:{}", url),
            TestStep::Click { selector, .. } => format!("click:{}", selector),
            TestStep::Fill { selector, .. } => format!("fill:{}", selector),
            TestStep::Wait { selector, .. } => format!("wait:{}", selector),
            TestStep::Sleep { ms } => format!("sleep:{}ms", ms),
            TestStep::Assert { selector, .. } => format!("assert:{}", selector),
            TestStep::ExpectUrl { path, .. } => format!("expect_url:{}", path),
            TestStep::ExpectDialog { message, .. } => format!("expect_dialog:{}", message),
            TestStep::ExpectNoRequest { path, .. } => format!("expect_no_request:{}", path),
            TestStep::Screenshot { name, .. } => format!("screenshot:{}", name),
            TestStep::Log { message } => {
                format!("log:{}", message.chars().take(30).collect::<String>())
            }
        }
    }
}

/// Result of executing a test step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    pub step_name: String,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub screenshot_path: Option<PathBuf>,
}

impl TestSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, steps: Vec<TestStep>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            tags: Vec::new(),
            viewport: Viewport::default(),
            steps,
        }
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Parse a test spec from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let spec: Self = serde_yaml::from_str(yaml)?;
        if spec.steps.is_empty() {
            return Err(E2eError::SpecParse(format!("spec '{}' has no steps", spec.name)));
        }
        Ok(spec)
    }

    /// Parse a test spec from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::SpecParse(format!("{}: {}", path.display(), e)))
    }

    /// Load all test specs from a directory, sorted by path
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut paths: Vec<PathBuf> = walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| {
                p.extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        paths.iter().map(|p| Self::from_file(p)).collect()
    }

    /// Filter specs by tag
    pub fn filter_by_tag<'a>(specs: &'a [Self], tag: &str) -> Vec<&'a Self> {
        specs.iter().filter(|s| s.has_tag(tag)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_spec() {
        let yaml = r#"
name: login-form
description: The login form renders
tags:
  - login
  - smoke
steps:
  - action: navigate
    url: /login
    wait_for_selector: '[data-testid="username-input"]'
  - action: fill
    selector: '[data-testid="username-input"]'
    value: admin
  - action: expect_dialog
    message: user does not exist
  - action: screenshot
    name: login-form
"#;
        let spec = TestSpec::from_yaml(yaml).unwrap();
        assert_eq!(spec.name, "login-form");
        assert_eq!(spec.steps.len(), 4);
        assert_eq!(spec.viewport, Viewport { width: 1280, height: 720 });
        assert_eq!(
            spec.steps[2],
            TestStep::ExpectDialog {
                message: "user does not exist".to_string(),
                timeout_ms: 2000
            }
        );
    }

    #[test]
    fn test_defaults_for_waits() {
        let yaml = r#"
name: waits
steps:
  - action: wait
    selector: h1
  - action: expect_no_request
    path: /api/login
  - action: assert
    selector: h1
    text: Login
"#;
        let spec = TestSpec::from_yaml(yaml).unwrap();
        assert_eq!(
            spec.steps[0],
            TestStep::Wait {
                selector: "h1".to_string(),
                timeout_ms: 5000,
                state: WaitState::Visible
            }
        );
        assert!(matches!(spec.steps[1], TestStep::ExpectNoRequest { settle_ms: 500, .. }));
        assert!(matches!(spec.steps[2], TestStep::Assert { timeout_ms: 5000, visible: None, .. }));
    }

    #[test]
    fn test_empty_steps_rejected() {
        let err = TestSpec::from_yaml("name: nothing\nsteps: []\n").unwrap_err();
        assert!(matches!(err, E2eError::SpecParse(_)));
    }

    #[test]
    fn test_unknown_action_rejected() {
        let yaml = "name: bad\nsteps:\n  - action: teleport\n";
        assert!(TestSpec::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_load_all_and_filter() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("b.yaml"),
            "name: b\ntags: [smoke]\nsteps:\n  - action: sleep\n    ms: 1\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a.yml"),
            "name: a\nsteps:\n  - action: log\n    message: hi\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let specs = TestSpec::load_all(dir.path()).unwrap();
        let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(TestSpec::filter_by_tag(&specs, "smoke").len(), 1);
    }

    #[test]
    fn test_shipped_specs_parse() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("specs");
        let specs = TestSpec::load_all(&dir).unwrap();
        let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["smoke-root-redirect"]);

        let smoke = &specs[0];
        assert!(smoke.has_tag("smoke"));
        assert_eq!(
            smoke.steps[1],
            TestStep::ExpectUrl {
                path: "/login".to_string(),
                timeout_ms: 5000
            }
        );
    }

    #[test]
    fn test_step_names() {
        let step = TestStep::Log {
            message: "x".repeat(100),
        };
        assert_eq!(step.name().len(), "log:".len() + 30);
        assert_eq!(
            TestStep::ExpectUrl { path: "/dashboard".into(), timeout_ms: 1 }.name(),
            "expect_url:/dashboard"
        );
    }
}
