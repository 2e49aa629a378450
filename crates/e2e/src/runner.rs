//! Scenario runner: drives a browser session through each scenario's steps

use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::browser::{Browser, By, ElementRef};
use crate::driver::{DriverConfig, DriverHandle};
use crate::error::{E2eError, E2eResult};
use crate::menu;
use crate::pam::{self, Dialog};
use crate::scenario::{AttributeAssertion, Scenario, Step, NO_DIALOG};
use crate::theme;
use crate::wait::{Settle, NOMINAL_SETTLE};
use crate::webdriver::{BrowserOptions, WebDriverSession};

/// Result of running a single step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    pub step_name: String,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub error: Option<String>,
}

/// Result of running all scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl SuiteResult {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// How steps are carried out against a page
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Base URL of the PAM instance under test
    pub base_url: String,

    /// How helpers wait for UI transitions
    pub settle: Settle,

    /// Pause after the last step of a passing scenario
    pub final_wait: Duration,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            base_url: pam::DEFAULT_URL.to_string(),
            settle: Settle::default(),
            final_wait: NOMINAL_SETTLE,
        }
    }
}

/// Final wait from a seconds value such as the `FT` setting
pub fn final_wait_from_secs(secs: f64) -> E2eResult<Duration> {
    Duration::try_from_secs_f64(secs)
        .map_err(|e| E2eError::Config(format!("final timeout {} s: {}", secs, e)))
}

/// Configuration for the test runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub driver: DriverConfig,

    /// Use an already running driver instead of spawning one
    pub webdriver_url: Option<String>,

    pub browser: BrowserOptions,
    pub execution: ExecutionConfig,
    pub scenarios_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            driver: DriverConfig::default(),
            webdriver_url: None,
            browser: BrowserOptions::default(),
            execution: ExecutionConfig::default(),
            scenarios_dir: PathBuf::from("scenarios"),
            output_dir: PathBuf::from("test-results"),
        }
    }
}

/// Main E2E test runner
pub struct TestRunner {
    config: RunnerConfig,

    /// Running driver handle (if we spawned one)
    driver: Option<DriverHandle>,
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
            driver: None,
        }
    }

    /// Start chromedriver unless an external driver was configured
    pub async fn start_driver(&mut self) -> E2eResult<()> {
        if self.config.webdriver_url.is_some() || self.driver.is_some() {
            return Ok(());
        }

        let driver = DriverHandle::spawn(self.config.driver.clone()).await?;
        self.driver = Some(driver);
        Ok(())
    }

    /// Stop the driver
    pub fn stop_driver(&mut self) -> E2eResult<()> {
        if let Some(mut driver) = self.driver.take() {
            driver.stop()?;
        }
        Ok(())
    }

    fn driver_url(&self) -> E2eResult<String> {
        if let Some(url) = &self.config.webdriver_url {
            return Ok(url.clone());
        }
        self.driver
            .as_ref()
            .map(|driver| driver.base_url().to_string())
            .ok_or_else(|| E2eError::DriverStartup("driver has not been started".to_string()))
    }

    /// Load every scenario in the scenarios directory
    pub fn load_scenarios(&self) -> E2eResult<Vec<Scenario>> {
        Scenario::load_all(&self.config.scenarios_dir)
    }

    /// Run all scenarios in the scenarios directory
    pub async fn run_all(&mut self) -> E2eResult<SuiteResult> {
        let scenarios = self.load_scenarios()?;
        self.run_scenarios(&scenarios).await
    }

    /// Run scenarios matching a tag
    pub async fn run_tagged(&mut self, tag: &str) -> E2eResult<SuiteResult> {
        let scenarios = self.load_scenarios()?;
        let filtered: Vec<Scenario> = Scenario::filter_by_tag(&scenarios, tag)
            .into_iter()
            .cloned()
            .collect();
        self.run_scenarios(&filtered).await
    }

    /// Run a specific scenario by name
    pub async fn run_named(&mut self, name: &str) -> E2eResult<ScenarioResult> {
        let scenario = self
            .load_scenarios()?
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| E2eError::SpecParse(format!("Scenario not found: {}", name)))?;

        self.run_scenario(&scenario).await
    }

    /// Run a list of scenarios
    pub async fn run_scenarios(&mut self, scenarios: &[Scenario]) -> E2eResult<SuiteResult> {
        let start = Instant::now();
        let mut results = Vec::new();
        let mut passed = 0;
        let mut failed = 0;

        self.start_driver().await?;

        info!("Running {} scenario(s)...", scenarios.len());

        for scenario in scenarios {
            match self.run_scenario(scenario).await {
                Ok(result) => {
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
                Err(e) => {
                    failed += 1;
                    error!("✗ {} - {}", scenario.name, e);
                    results.push(ScenarioResult {
                        name: scenario.name.clone(),
                        success: false,
                        duration_ms: 0,
                        steps: vec![],
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Results: {} passed, {} failed ({} ms)",
            passed, failed, duration_ms
        );

        Ok(SuiteResult {
            total: scenarios.len(),
            passed,
            failed,
            skipped: 0,
            duration_ms,
            results,
        })
    }

    /// Run a single scenario in a fresh browser session
    pub async fn run_scenario(&mut self, scenario: &Scenario) -> E2eResult<ScenarioResult> {
        self.start_driver().await?;
        let driver_url = self.driver_url()?;
        debug!("Running scenario: {}", scenario.name);

        let mut options = self.config.browser.clone();
        options.window_size = Some((scenario.viewport.width, scenario.viewport.height));

        let session = WebDriverSession::start(&driver_url, &options).await?;
        let result = execute(&session, scenario, &self.config.execution).await;

        if let Err(e) = session.quit().await {
            warn!("Failed to end session for '{}': {}", scenario.name, e);
        }
        Ok(result)
    }

    /// Write suite results to JSON file
    pub fn write_results(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        write_results(&self.config.output_dir, results)
    }
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TestRunner {
    fn drop(&mut self) {
        let _ = self.stop_driver();
    }
}

/// Write `results` to `test-results.json` under `output_dir`
pub fn write_results(output_dir: &std::path::Path, results: &SuiteResult) -> E2eResult<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let path = output_dir.join("test-results.json");
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(&path, json)?;

    info!("Results written to: {}", path.display());
    Ok(path)
}

/// Page state carried from one step to the next
#[derive(Debug, Default)]
struct StepContext {
    /// Dialog opened by the last `choose_menu`
    dialog: Option<ElementRef>,

    /// Window the scenario navigated in
    main_window: Option<String>,
}

/// Run `scenario` against an open page, stopping at the first failing step
pub async fn execute(
    page: &dyn Browser,
    scenario: &Scenario,
    config: &ExecutionConfig,
) -> ScenarioResult {
    let start = Instant::now();
    let mut context = StepContext::default();
    let mut steps = Vec::with_capacity(scenario.steps.len());
    let mut failure = None;

    for step in &scenario.steps {
        let step_start = Instant::now();
        let step_name = step.name();
        debug!("Executing step: {}", step_name);

        let outcome = execute_step(page, step, config, &mut context).await;
        let duration_ms = step_start.elapsed().as_millis() as u64;

        match outcome {
            Ok(()) => steps.push(StepResult {
                success: true,
                step_name,
                duration_ms,
                error: None,
            }),
            Err(e) => {
                let failed = E2eError::StepFailed {
                    step: step_name.clone(),
                    reason: e.to_string(),
                };
                steps.push(StepResult {
                    success: false,
                    step_name,
                    duration_ms,
                    error: Some(e.to_string()),
                });
                failure = Some(failed.to_string());
                break; // Stop on first failure
            }
        }
    }

    if failure.is_none() && !config.final_wait.is_zero() {
        sleep(config.final_wait).await;
    }

    ScenarioResult {
        name: scenario.name.clone(),
        success: failure.is_none(),
        duration_ms: start.elapsed().as_millis() as u64,
        steps,
        error: failure,
    }
}

async fn execute_step(
    page: &dyn Browser,
    step: &Step,
    config: &ExecutionConfig,
    context: &mut StepContext,
) -> E2eResult<()> {
    let settle = config.settle;

    match step {
        Step::Navigate { url } => {
            let target = resolve_url(&config.base_url, url.as_deref());
            page.goto(&target).await?;
            context.main_window = Some(page.window_handle().await?);
            context.dialog = None;
            settle.pause().await;
        }
        Step::SetTheme { theme } => {
            theme::set_theme(page, *theme, settle).await?;
        }
        Step::ToggleTheme => {
            theme::toggle_theme(page, settle).await?;
        }
        Step::ChooseMenu { option, dialog } => {
            let modal = menu::choose_menu_option(page, option, settle).await?;
            if let Some(expected) = dialog.as_deref() {
                check_dialog(page, option, modal.as_ref(), expected).await?;
            }
            context.dialog = modal;
        }
        Step::Click {
            selector,
            in_dialog,
        } => {
            let element = locate(page, context, selector, *in_dialog).await?;
            page.click(&element).await?;
        }
        Step::Type {
            selector,
            text,
            in_dialog,
        } => {
            let element = locate(page, context, selector, *in_dialog).await?;
            page.send_keys(&element, text).await?;
        }
        Step::Assert {
            selector,
            in_dialog,
            visible,
            text_contains,
            attribute,
            count,
        } => {
            if let Some(expected) = count {
                let found = locate_all(page, context, selector, *in_dialog).await?;
                if found.len() != *expected {
                    return Err(E2eError::AssertionFailed(format!(
                        "{} matches {} elements, expected {}",
                        selector,
                        found.len(),
                        expected
                    )));
                }
            }

            if visible.is_none() && text_contains.is_none() && attribute.is_none() {
                return Ok(());
            }

            let element = locate(page, context, selector, *in_dialog).await?;
            if let Some(expected) = visible {
                let shown = page.is_displayed(&element).await?;
                if shown != *expected {
                    return Err(E2eError::AssertionFailed(format!(
                        "{} visible is {}, expected {}",
                        selector, shown, expected
                    )));
                }
            }
            if let Some(needle) = text_contains {
                let text = page.text(&element).await?;
                if !text.contains(needle.as_str()) {
                    return Err(E2eError::AssertionFailed(format!(
                        "{} text '{}' does not contain '{}'",
                        selector, text, needle
                    )));
                }
            }
            if let Some(assertion) = attribute {
                check_attribute(page, &element, selector, assertion).await?;
            }
        }
        Step::CloseDialog => {
            let element = context
                .dialog
                .take()
                .ok_or_else(|| E2eError::AssertionFailed("no dialog is open".to_string()))?;
            Dialog::new(page, element, settle).await?.close().await?;
        }
        Step::AcceptAlert { text_contains } => {
            let text = settle
                .wait_for("alert", move || async move { page.alert_text().await.map(Some) })
                .await?
                .ok_or(E2eError::NoAlert)?;
            if let Some(needle) = text_contains {
                if !text.contains(needle.as_str()) {
                    return Err(E2eError::AssertionFailed(format!(
                        "alert '{}' does not contain '{}'",
                        text, needle
                    )));
                }
            }
            page.accept_alert().await?;
        }
        Step::LoadExampleRecords {
            count,
            first_contains,
        } => {
            let titles = pam::load_example_records(page, settle).await?;
            if let Some(expected) = count {
                if titles.len() != *expected {
                    return Err(E2eError::AssertionFailed(format!(
                        "loaded {} records, expected {}",
                        titles.len(),
                        expected
                    )));
                }
            }
            if let Some(needle) = first_contains {
                let first = titles.first().map(String::as_str).unwrap_or_default();
                if !first.contains(needle.as_str()) {
                    return Err(E2eError::AssertionFailed(format!(
                        "first record is '{}', expected it to contain '{}'",
                        first, needle
                    )));
                }
            }
            context.dialog = None;
        }
        Step::ExpectWindows { count } => {
            let expected = *count;
            let seen = settle
                .wait_for(&format!("{} windows", expected), move || async move {
                    let handles = page.window_handles().await?;
                    Ok((handles.len() == expected).then_some(()))
                })
                .await?;
            if seen.is_none() {
                let actual = page.window_handles().await?.len();
                return Err(E2eError::AssertionFailed(format!(
                    "{} windows open, expected {}",
                    actual, expected
                )));
            }
        }
        Step::CloseOtherWindows => {
            let main = match &context.main_window {
                Some(handle) => handle.clone(),
                None => page.window_handle().await?,
            };
            for handle in page.window_handles().await? {
                if handle != main {
                    pam::close_window_and_return(page, &handle, &main).await?;
                }
            }
        }
        Step::Sleep { ms } => {
            sleep(Duration::from_millis(*ms)).await;
        }
        Step::Log { message } => {
            info!("[scenario] {}", message);
        }
    }

    Ok(())
}

/// Check the dialog a menu entry opened against the expected id
async fn check_dialog(
    page: &dyn Browser,
    option: &str,
    modal: Option<&ElementRef>,
    expected: &str,
) -> E2eResult<()> {
    match (modal, expected) {
        (None, NO_DIALOG) => Ok(()),
        (Some(modal), NO_DIALOG) => Err(E2eError::AssertionFailed(format!(
            "'{}' opened a dialog ({}), expected none",
            option, modal
        ))),
        (None, _) => Err(E2eError::NoDialog(option.to_string())),
        (Some(modal), expected) => {
            let id = page.attribute(modal, "id").await?.unwrap_or_default();
            if id == expected {
                Ok(())
            } else {
                Err(E2eError::AssertionFailed(format!(
                    "'{}' opened #{}, expected #{}",
                    option, id, expected
                )))
            }
        }
    }
}

async fn check_attribute(
    page: &dyn Browser,
    element: &ElementRef,
    selector: &str,
    assertion: &AttributeAssertion,
) -> E2eResult<()> {
    let actual = page.attribute(element, &assertion.name).await?;

    if let Some(expected) = &assertion.value {
        if actual.as_deref() != Some(expected.as_str()) {
            return Err(E2eError::AssertionFailed(format!(
                "{} [{}] is {:?}, expected '{}'",
                selector, assertion.name, actual, expected
            )));
        }
    }
    if let Some(needle) = &assertion.contains {
        if !actual.as_deref().unwrap_or_default().contains(needle.as_str()) {
            return Err(E2eError::AssertionFailed(format!(
                "{} [{}] is {:?}, expected it to contain '{}'",
                selector, assertion.name, actual, needle
            )));
        }
    }
    Ok(())
}

fn dialog_scope(context: &StepContext) -> E2eResult<&ElementRef> {
    context
        .dialog
        .as_ref()
        .ok_or_else(|| E2eError::AssertionFailed("no dialog is open".to_string()))
}

async fn locate(
    page: &dyn Browser,
    context: &StepContext,
    selector: &str,
    in_dialog: bool,
) -> E2eResult<ElementRef> {
    let by = By::parse(selector);
    if in_dialog {
        page.find_in(dialog_scope(context)?, &by).await
    } else {
        page.find(&by).await
    }
}

async fn locate_all(
    page: &dyn Browser,
    context: &StepContext,
    selector: &str,
    in_dialog: bool,
) -> E2eResult<Vec<ElementRef>> {
    let by = By::parse(selector);
    if in_dialog {
        page.find_all_in(dialog_scope(context)?, &by).await
    } else {
        page.find_all(&by).await
    }
}

/// Resolve a step URL against the base URL
fn resolve_url(base: &str, url: Option<&str>) -> String {
    match url {
        None => base.to_string(),
        Some(url) if url.starts_with("http://") || url.starts_with("https://") => url.to_string(),
        Some(path) => format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPage;
    use crate::theme::Theme;

    fn config() -> ExecutionConfig {
        ExecutionConfig {
            base_url: "http://pam.test:8081/".to_string(),
            settle: Settle::poll(),
            final_wait: Duration::ZERO,
        }
    }

    #[test]
    fn test_resolve_url() {
        assert_eq!(resolve_url("http://h:1/", None), "http://h:1/");
        assert_eq!(resolve_url("http://h:1/", Some("/help/")), "http://h:1/help/");
        assert_eq!(resolve_url("http://h:1", Some("help")), "http://h:1/help");
        assert_eq!(resolve_url("http://h:1/", Some("https://x/")), "https://x/");
    }

    #[test]
    fn test_final_wait_from_secs() {
        assert_eq!(final_wait_from_secs(0.25).unwrap(), Duration::from_millis(250));
        assert_eq!(final_wait_from_secs(0.0).unwrap(), Duration::ZERO);

        for bad in [f64::INFINITY, f64::NAN, -1.0] {
            assert!(matches!(final_wait_from_secs(bad), Err(E2eError::Config(_))));
        }
    }

    #[tokio::test]
    async fn test_execute_about_scenario() {
        let scenario = Scenario::from_yaml(
            r#"
name: about
steps:
  - action: navigate
  - action: set_theme
    theme: light
  - action: choose_menu
    option: About
    dialog: menuAboutDlg
  - action: assert
    selector: .x-fld-record-close
    in_dialog: true
    visible: true
    text_contains: Close
  - action: close_dialog
  - action: assert
    selector: body
    attribute:
      name: data-bs-theme
      value: light
"#,
        )
        .unwrap();
        let page = MockPage::pam();

        let result = execute(&page, &scenario, &config()).await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.steps.len(), 6);
        assert_eq!(page.url().as_deref(), Some("http://pam.test:8081/"));
        assert_eq!(
            crate::theme::current_theme(&page).await.unwrap(),
            Some(Theme::Light)
        );
    }

    #[tokio::test]
    async fn test_execute_stops_at_first_failure() {
        let scenario = Scenario::from_yaml(
            r#"
name: wrong-dialog
steps:
  - action: navigate
  - action: choose_menu
    option: About
    dialog: menuPrefsDlg
  - action: close_dialog
"#,
        )
        .unwrap();
        let page = MockPage::pam();

        let result = execute(&page, &scenario, &config()).await;

        assert!(!result.success);
        assert_eq!(result.steps.len(), 2);
        assert!(!result.steps[1].success);
        let error = result.error.unwrap();
        assert!(error.contains("choose_menu:About"), "{}", error);
        assert!(error.contains("menuPrefsDlg"), "{}", error);
    }

    #[tokio::test]
    async fn test_execute_help_window_scenario() {
        let scenario = Scenario::from_yaml(
            r#"
name: help
steps:
  - action: navigate
  - action: choose_menu
    option: Help
    dialog: none
  - action: expect_windows
    count: 2
  - action: close_other_windows
  - action: expect_windows
    count: 1
"#,
        )
        .unwrap();
        let page = MockPage::pam();

        let result = execute(&page, &scenario, &config()).await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(page.window_handles().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_execute_example_records_with_alert_step() {
        let scenario = Scenario::from_yaml(
            r#"
name: records
steps:
  - action: navigate
  - action: choose_menu
    option: Load File
    dialog: menuLoadDlg
  - action: click
    selector: .btn-secondary
    in_dialog: true
  - action: accept_alert
    text_contains: Do you really want to
  - action: assert
    selector: .accordion-button
    count: 7
"#,
        )
        .unwrap();
        let page = MockPage::pam();

        let result = execute(&page, &scenario, &config()).await;

        assert!(result.success, "{:?}", result.error);
    }

    #[tokio::test]
    async fn test_in_dialog_without_dialog_fails() {
        let scenario = Scenario::from_yaml(
            r#"
name: orphan
steps:
  - action: click
    selector: .x-fld-record-close
    in_dialog: true
"#,
        )
        .unwrap();
        let page = MockPage::pam();

        let result = execute(&page, &scenario, &config()).await;

        assert!(!result.success);
        assert!(result.error.unwrap().contains("no dialog is open"));
    }

    #[test]
    fn test_write_results() {
        let dir = tempfile::tempdir().unwrap();
        let results = SuiteResult {
            total: 1,
            passed: 1,
            failed: 0,
            skipped: 0,
            duration_ms: 12,
            results: vec![ScenarioResult {
                name: "about".to_string(),
                success: true,
                duration_ms: 12,
                steps: vec![],
                error: None,
            }],
        };

        let path = write_results(&dir.path().join("out"), &results).unwrap();

        assert_eq!(path.file_name().unwrap(), "test-results.json");
        let parsed: SuiteResult =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(parsed.all_passed());
        assert_eq!(parsed.results[0].name, "about");
    }
}
