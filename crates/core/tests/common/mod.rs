//! In-memory stand-ins for the browser, palette and layout collaborators

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use pagecheck_core::visual::{BeforeScreenshot, LayoutCompareOptions};
use pagecheck_core::{
    BrowserLauncher, BrowserOptions, BrowserSession, CheckError, CheckResult, Color, ColorScheme,
    LayoutComparer, LayoutDiff, Page, PaletteExtractor,
};

/// A page whose DOM answers are configured up front
#[derive(Default)]
pub struct FakePage {
    elements: HashSet<String>,
    styles: HashMap<String, HashMap<String, String>>,
    gaps: HashMap<String, i64>,
    broken: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_element(mut self, selector: &str) -> Self {
        self.elements.insert(selector.to_string());
        self
    }

    pub fn with_style(mut self, selector: &str, property: &str, value: &str) -> Self {
        self.styles
            .entry(selector.to_string())
            .or_default()
            .insert(property.to_string(), value.to_string());
        self
    }

    pub fn with_gap(mut self, selector: &str, gap: i64) -> Self {
        self.elements.insert(selector.to_string());
        self.gaps.insert(selector.to_string(), gap);
        self
    }

    /// Queries against `selector` fail like an invalid selector would
    pub fn with_broken_selector(mut self, selector: &str) -> Self {
        self.broken.insert(selector.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_selector(&self, op: &str, selector: &str) -> CheckResult<()> {
        if self.broken.contains(selector) {
            return Err(CheckError::PageOperation {
                op: op.to_string(),
                reason: format!("'{}' is not a valid selector", selector),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Page for FakePage {
    async fn has_element(&self, selector: &str) -> CheckResult<bool> {
        self.check_selector("hasElement", selector)?;
        Ok(self.elements.contains(selector))
    }

    async fn computed_style(&self, selector: &str, properties: &[&str]) -> CheckResult<Vec<String>> {
        self.check_selector("getStyle", selector)?;
        let Some(styles) = self.styles.get(selector) else {
            return Ok(vec![]);
        };
        Ok(properties
            .iter()
            .map(|p| styles.get(*p).cloned().unwrap_or_default())
            .collect())
    }

    async fn viewport_gap(&self, selector: &str) -> CheckResult<i64> {
        self.check_selector("viewportGap", selector)?;
        self.gaps.get(selector).copied().ok_or_else(|| CheckError::PageOperation {
            op: "viewportGap".to_string(),
            reason: format!("no element matches '{}'", selector),
        })
    }

    async fn emulate_color_scheme(&self, scheme: ColorScheme) -> CheckResult<()> {
        self.record(format!("emulate:{}", scheme.as_str()));
        Ok(())
    }

    async fn remove_elements(&self, selector: &str) -> CheckResult<usize> {
        self.record(format!("remove:{}", selector));
        Ok(0)
    }

    async fn scroll_to_end(&self) -> CheckResult<()> {
        self.record("scroll".to_string());
        Ok(())
    }

    async fn screenshot(&self, path: &Path, full_page: bool) -> CheckResult<()> {
        self.record(format!("screenshot:{}:{}", path.display(), full_page));
        Ok(())
    }
}

/// Hands out sessions over one shared [`FakePage`] and counts them
pub struct FakeLauncher {
    pub page: Arc<FakePage>,
    pub launches: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
    pub fail_launch: bool,
    pub fail_close: bool,
}

impl FakeLauncher {
    pub fn new(page: FakePage) -> Self {
        Self {
            page: Arc::new(page),
            launches: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
            fail_launch: false,
            fail_close: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_launch: true,
            ..Self::new(FakePage::new())
        }
    }

    /// Sessions count their close but report it as failed
    pub fn with_failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self, url: &str, _options: &BrowserOptions) -> CheckResult<Box<dyn BrowserSession>> {
        if self.fail_launch {
            return Err(CheckError::Launch(format!("net::ERR_CONNECTION_REFUSED at {}", url)));
        }
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            page: self.page.clone(),
            closes: self.closes.clone(),
            closed: false,
            fail_close: self.fail_close,
        }))
    }
}

struct FakeSession {
    page: Arc<FakePage>,
    closes: Arc<AtomicUsize>,
    closed: bool,
    fail_close: bool,
}

#[async_trait]
impl BrowserSession for FakeSession {
    fn page(&self) -> &dyn Page {
        self.page.as_ref()
    }

    async fn close(&mut self) -> CheckResult<()> {
        if !self.closed {
            self.closed = true;
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
        if self.fail_close {
            return Err(CheckError::SessionClosed);
        }
        Ok(())
    }
}

/// Palettes keyed by image path
#[derive(Default)]
pub struct FakePalettes {
    palettes: HashMap<PathBuf, Vec<Color>>,
}

impl FakePalettes {
    pub fn with(mut self, path: &str, colors: Vec<Color>) -> Self {
        self.palettes.insert(PathBuf::from(path), colors);
        self
    }
}

impl PaletteExtractor for FakePalettes {
    fn extract(&self, path: &Path, count: usize) -> CheckResult<Vec<Color>> {
        let colors = self
            .palettes
            .get(path)
            .ok_or_else(|| CheckError::BaselineNotFound(path.display().to_string()))?;
        Ok(colors.iter().take(count).copied().collect())
    }
}

/// Records comparisons and runs the hook against its own page
pub struct FakeLayout {
    pub page: FakePage,
    pub compared: AtomicUsize,
    pub matches: bool,
}

impl FakeLayout {
    pub fn new(matches: bool) -> Self {
        Self {
            page: FakePage::new(),
            compared: AtomicUsize::new(0),
            matches,
        }
    }

    pub fn compared(&self) -> usize {
        self.compared.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LayoutComparer for FakeLayout {
    async fn compare_layout(
        &self,
        _url: &str,
        options: &LayoutCompareOptions,
        hook: &dyn BeforeScreenshot,
    ) -> CheckResult<LayoutDiff> {
        self.compared.fetch_add(1, Ordering::SeqCst);
        hook.before_screenshot(&self.page).await?;
        self.page.screenshot(&options.page_image, true).await?;
        Ok(LayoutDiff {
            matches: self.matches,
            diff_percent: if self.matches { 0.0 } else { 12.5 },
            diff_pixels: if self.matches { 0 } else { 8 },
            total_pixels: 64,
            output_image: None,
            actual_hash: "a".repeat(64),
            canonical_hash: "b".repeat(64),
        })
    }
}

pub fn dark_palette() -> Vec<Color> {
    vec![
        Color::rgb(18, 18, 20),
        Color::rgb(40, 42, 54),
        Color::rgb(230, 230, 230),
        Color::rgb(187, 134, 252),
    ]
}

pub fn light_palette() -> Vec<Color> {
    vec![
        Color::rgb(255, 255, 255),
        Color::rgb(240, 240, 240),
        Color::rgb(33, 33, 33),
        Color::rgb(98, 0, 238),
    ]
}
