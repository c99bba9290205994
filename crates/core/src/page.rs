//! Capability traits for the rendered page and the browser that owns it

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CheckResult;

/// A loaded, renderable document.
///
/// Queries never report rule violations; an `Err` means the page could not
/// answer (closed session, bad selector syntax, driver crash).
#[async_trait]
pub trait Page: Send + Sync {
    /// Whether at least one element matches `selector`.
    async fn has_element(&self, selector: &str) -> CheckResult<bool>;

    /// Computed style values of the first match, one per property in order.
    /// Empty when nothing matches.
    async fn computed_style(&self, selector: &str, properties: &[&str]) -> CheckResult<Vec<String>>;

    /// `window.innerHeight - element.clientHeight` for the first match.
    async fn viewport_gap(&self, selector: &str) -> CheckResult<i64>;

    /// Emulate the `prefers-color-scheme` media feature.
    async fn emulate_color_scheme(&self, scheme: ColorScheme) -> CheckResult<()>;

    /// Remove every element matching `selector`; returns how many were removed.
    async fn remove_elements(&self, selector: &str) -> CheckResult<usize>;

    /// Scroll the window to the end of the document.
    async fn scroll_to_end(&self) -> CheckResult<()>;

    async fn screenshot(&self, path: &Path, full_page: bool) -> CheckResult<()>;
}

/// An isolated browser session with a single page.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    fn page(&self) -> &dyn Page;

    /// Release the browser. Calling it twice is not an error.
    async fn close(&mut self) -> CheckResult<()>;
}

/// Opens fresh browser sessions at a URL.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, url: &str, options: &BrowserOptions) -> CheckResult<Box<dyn BrowserSession>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorScheme {
    #[default]
    Light,
    Dark,
    NoPreference,
}

impl ColorScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorScheme::Light => "light",
            ColorScheme::Dark => "dark",
            ColorScheme::NoPreference => "no-preference",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { width: 1024, height: 768 }
    }
}

/// How a session's browser is started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserOptions {
    #[serde(default)]
    pub viewport: Viewport,

    /// Extra command-line flags for the browser process
    #[serde(default = "default_launch_args")]
    pub args: Vec<String>,

    #[serde(default = "default_headless")]
    pub headless: bool,
}

fn default_launch_args() -> Vec<String> {
    vec!["--no-sandbox".to_string(), "--disable-setuid-sandbox".to_string()]
}

fn default_headless() -> bool {
    true
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            args: default_launch_args(),
            headless: default_headless(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_options_default() {
        let options = BrowserOptions::default();
        assert_eq!(options.viewport, Viewport { width: 1024, height: 768 });
        assert_eq!(options.args, ["--no-sandbox", "--disable-setuid-sandbox"]);
        assert!(options.headless);
    }

    #[test]
    fn test_browser_options_partial_yaml() {
        let options: BrowserOptions = serde_yaml::from_str("viewport: { width: 1280, height: 720 }").unwrap();
        assert_eq!(options.viewport.width, 1280);
        assert_eq!(options.args.len(), 2);
    }
}
