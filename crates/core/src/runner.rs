//! Runs check suites and collects their outcomes

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::checks::{self, DarkSchemeConfig, SchemeTools};
use crate::diagnostic::Diagnostic;
use crate::error::{CheckError, CheckResult};
use crate::page::{BrowserLauncher, BrowserOptions, Page, Viewport};
use crate::palette::{ImagePalette, PaletteExtractor};
use crate::suite::{CheckSpec, CheckSuite};
use crate::visual::{LayoutComparer, ScreenshotLayoutComparer};

/// Result of running a single check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub check: String,
    pub passed: bool,
    pub diagnostics: Vec<Diagnostic>,
    pub duration_ms: u64,

    /// Set when the check could not be evaluated
    pub error: Option<String>,
}

impl CheckOutcome {
    fn from_result(check: &CheckSpec, started: Instant, result: CheckResult<Vec<Diagnostic>>) -> Self {
        let duration_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(diagnostics) => Self {
                check: check.name().to_string(),
                passed: diagnostics.is_empty(),
                diagnostics,
                duration_ms,
                error: None,
            },
            Err(e) => Self::errored(check, started, e.to_string()),
        }
    }

    fn errored(check: &CheckSpec, started: Instant, reason: String) -> Self {
        Self {
            check: check.name().to_string(),
            passed: false,
            diagnostics: vec![],
            duration_ms: started.elapsed().as_millis() as u64,
            error: Some(reason),
        }
    }
}

/// Result of running one suite
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub name: String,
    pub url: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub duration_ms: u64,
    pub results: Vec<CheckOutcome>,
}

impl SuiteReport {
    pub fn success(&self) -> bool {
        self.failed == 0 && self.errored == 0
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.results.iter().flat_map(|r| r.diagnostics.iter())
    }
}

/// Configuration for the runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub dark_scheme: DarkSchemeConfig,
    pub output_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            dark_scheme: DarkSchemeConfig::default(),
            output_dir: PathBuf::from("test-results"),
        }
    }
}

/// Main check runner
pub struct CheckRunner {
    launcher: Arc<dyn BrowserLauncher>,
    palettes: Box<dyn PaletteExtractor>,
    layout: Box<dyn LayoutComparer>,
    config: RunnerConfig,
}

impl CheckRunner {
    /// Runner that captures and diffs screenshots through `launcher`
    pub fn new(launcher: Arc<dyn BrowserLauncher>, config: RunnerConfig) -> Self {
        let layout = ScreenshotLayoutComparer::new(launcher.clone());
        Self::with_collaborators(launcher, Box::new(ImagePalette::default()), Box::new(layout), config)
    }

    pub fn with_collaborators(
        launcher: Arc<dyn BrowserLauncher>,
        palettes: Box<dyn PaletteExtractor>,
        layout: Box<dyn LayoutComparer>,
        config: RunnerConfig,
    ) -> Self {
        Self {
            launcher,
            palettes,
            layout,
            config,
        }
    }

    /// Run several suites one after another
    pub async fn run_suites(&self, suites: &[CheckSuite]) -> Vec<SuiteReport> {
        let mut reports = Vec::with_capacity(suites.len());
        for suite in suites {
            reports.push(self.run_suite(suite).await);
        }
        reports
    }

    /// Run every check of a suite.
    ///
    /// Page checks share one session; a failure to open it marks each of
    /// them as errored. `switch_scheme` always runs in its own session.
    pub async fn run_suite(&self, suite: &CheckSuite) -> SuiteReport {
        let start = Instant::now();
        info!("Running suite '{}' against {}", suite.name, suite.url);

        let (isolated, shared): (Vec<&CheckSpec>, Vec<&CheckSpec>) =
            suite.checks.iter().partition(|c| c.needs_own_session());

        let mut results = Vec::with_capacity(suite.checks.len());

        if !shared.is_empty() {
            results.extend(self.run_page_checks(suite, &shared).await);
        }

        for check in isolated {
            let started = Instant::now();
            let result = self.switch_scheme(&suite.url).await;
            results.push(CheckOutcome::from_result(check, started, result));
        }

        let mut passed = 0;
        let mut failed = 0;
        let mut errored = 0;
        for outcome in &results {
            if let Some(e) = &outcome.error {
                errored += 1;
                error!("✗ {} - {}", outcome.check, e);
            } else if outcome.passed {
                passed += 1;
                info!("✓ {} ({} ms)", outcome.check, outcome.duration_ms);
            } else {
                failed += 1;
                let ids: Vec<String> = outcome.diagnostics.iter().map(ToString::to_string).collect();
                error!("✗ {} - {}", outcome.check, ids.join("; "));
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Suite '{}': {} passed, {} failed, {} errored ({} ms)",
            suite.name, passed, failed, errored, duration_ms
        );

        SuiteReport {
            name: suite.name.clone(),
            url: suite.url.clone(),
            total: results.len(),
            passed,
            failed,
            errored,
            duration_ms,
            results,
        }
    }

    async fn run_page_checks(&self, suite: &CheckSuite, checks: &[&CheckSpec]) -> Vec<CheckOutcome> {
        let options = BrowserOptions {
            viewport: suite.viewport,
            ..self.config.dark_scheme.browser.clone()
        };

        let started = Instant::now();
        let mut session = match self.launcher.launch(&suite.url, &options).await {
            Ok(session) => session,
            Err(e) => {
                let reason = e.to_string();
                return checks
                    .iter()
                    .map(|check| CheckOutcome::errored(check, started, reason.clone()))
                    .collect();
            }
        };

        let mut outcomes = Vec::with_capacity(checks.len());
        for check in checks {
            let started = Instant::now();
            debug!("Running check {}", check.name());
            let result = run_page_check(session.page(), check).await;
            outcomes.push(CheckOutcome::from_result(check, started, result));
        }

        if let Err(e) = session.close().await {
            error!("Failed to close session for '{}': {}", suite.name, e);
        }

        outcomes
    }

    /// Run one check against `url` in a session of its own.
    ///
    /// Launch and page failures land in [`CheckOutcome::error`] the same
    /// way they do inside a suite.
    pub async fn run_check(&self, url: &str, viewport: Viewport, check: &CheckSpec) -> CheckOutcome {
        let started = Instant::now();
        let result = if check.needs_own_session() {
            self.switch_scheme(url).await
        } else {
            self.page_check_in_session(url, viewport, check).await
        };
        CheckOutcome::from_result(check, started, result)
    }

    async fn page_check_in_session(
        &self,
        url: &str,
        viewport: Viewport,
        check: &CheckSpec,
    ) -> CheckResult<Vec<Diagnostic>> {
        let options = BrowserOptions {
            viewport,
            ..self.config.dark_scheme.browser.clone()
        };
        let mut session = self.launcher.launch(url, &options).await?;
        let result = run_page_check(session.page(), check).await;
        let closed = session.close().await;
        let diagnostics = result?;
        closed?;
        Ok(diagnostics)
    }

    async fn switch_scheme(&self, url: &str) -> CheckResult<Vec<Diagnostic>> {
        let tools = SchemeTools {
            launcher: self.launcher.as_ref(),
            palettes: self.palettes.as_ref(),
            layout: self.layout.as_ref(),
            config: &self.config.dark_scheme,
        };
        Ok(checks::switch_scheme(url, &tools).await?.into_iter().collect())
    }

    /// Write suite reports to JSON file
    pub fn write_results(&self, reports: &[SuiteReport]) -> CheckResult<PathBuf> {
        write_results(&self.config.output_dir, reports)
    }
}

/// Dispatch one page-sharing check
pub async fn run_page_check(page: &dyn Page, check: &CheckSpec) -> CheckResult<Vec<Diagnostic>> {
    match check {
        CheckSpec::ColorScheme => Ok(checks::color_scheme(page).await?.into_iter().collect()),
        CheckSpec::BlockFullScreen { selector } => {
            Ok(checks::block_full_screen(page, selector).await?.into_iter().collect())
        }
        CheckSpec::SemanticTags { tags } => checks::semantic_tags(page, tags.as_slice()).await,
        CheckSpec::ResetMargins { tags } => checks::reset_margins(page, tags.as_slice()).await,
        CheckSpec::BackgroundFixed { selector } => checks::background_fixed(page, selector).await,
        CheckSpec::SwitchScheme => Err(CheckError::SuiteParse(
            "switch_scheme opens its own session and cannot share a page".to_string(),
        )),
    }
}

/// Write reports to `<output_dir>/check-results.json`
pub fn write_results(output_dir: &Path, reports: &[SuiteReport]) -> CheckResult<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let path = output_dir.join("check-results.json");
    let json = serde_json::to_string_pretty(reports)?;
    std::fs::write(&path, json)?;

    info!("Results written to: {}", path.display());
    Ok(path)
}
