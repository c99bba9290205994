//! Layout and theme checks
//!
//! Every check answers `Ok(None)` / `Ok(vec![])` when the page follows the
//! rule and a [`Diagnostic`] when it does not. `Err` only surfaces when the
//! page or one of its collaborators could not be queried.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::{debug, info, warn};

use crate::color::palettes_match;
use crate::diagnostic::Diagnostic;
use crate::error::CheckResult;
use crate::page::{BrowserLauncher, BrowserOptions, ColorScheme, Page};
use crate::palette::PaletteExtractor;
use crate::visual::{BeforeScreenshot, LayoutCompareOptions, LayoutComparer};

/// Matches a colour-scheme meta tag that lists both themes
pub const COLOR_SCHEME_SELECTOR: &str =
    r#"meta[name=color-scheme]:is([content~="dark"]):is([content~="light"])"#;

/// The header button that switches the page to the dark theme
pub const DARK_TOGGLE_SELECTOR: &str =
    ".header__theme-menu-button.header__theme-menu-button_type_dark";

const RESET_PROPERTIES: [&str; 2] = ["margin", "padding"];

/// Settings for [`switch_scheme`]
#[derive(Debug, Clone)]
pub struct DarkSchemeConfig {
    pub toggle_selector: String,
    pub browser: BrowserOptions,

    /// Wait before capturing so transitions finish
    pub settle_delay: Duration,

    pub palette_size: usize,

    /// Per-channel tolerance when comparing palettes
    pub tolerance: u8,

    /// Screenshot taken for the palette comparison
    pub palette_image: PathBuf,
    pub canonical_palette_image: PathBuf,

    pub layout_image: PathBuf,
    pub canonical_layout_image: PathBuf,
    pub layout_output_image: PathBuf,

    /// Allowed share of differing pixels in the layout diff (percent)
    pub layout_threshold: f64,
}

impl Default for DarkSchemeConfig {
    fn default() -> Self {
        Self {
            toggle_selector: DARK_TOGGLE_SELECTOR.to_string(),
            browser: BrowserOptions::default(),
            settle_delay: Duration::from_millis(2000),
            palette_size: 4,
            tolerance: 35,
            palette_image: PathBuf::from("layout-dark.jpg"),
            canonical_palette_image: PathBuf::from("layout-canonical-dark.jpg"),
            layout_image: PathBuf::from("layout-dark-full.jpg"),
            canonical_layout_image: PathBuf::from("layout-canonical-dark-full.jpg"),
            layout_output_image: PathBuf::from("output-dark.jpg"),
            layout_threshold: 0.5,
        }
    }
}

impl DarkSchemeConfig {
    pub fn layout_options(&self) -> LayoutCompareOptions {
        LayoutCompareOptions {
            canonical_image: self.canonical_layout_image.clone(),
            page_image: self.layout_image.clone(),
            output_image: self.layout_output_image.clone(),
            browser: self.browser.clone(),
            threshold: self.layout_threshold,
        }
    }
}

/// Collaborators [`switch_scheme`] needs besides the URL
pub struct SchemeTools<'a> {
    pub launcher: &'a dyn BrowserLauncher,
    pub palettes: &'a dyn PaletteExtractor,
    pub layout: &'a dyn LayoutComparer,
    pub config: &'a DarkSchemeConfig,
}

/// Emulates dark mode, scrolls to the end and waits for the page to settle.
pub struct DarkModeCapture {
    pub settle_delay: Duration,
}

#[async_trait]
impl BeforeScreenshot for DarkModeCapture {
    async fn before_screenshot(&self, page: &dyn Page) -> CheckResult<()> {
        page.emulate_color_scheme(ColorScheme::Dark).await?;
        page.scroll_to_end().await?;
        tokio::time::sleep(self.settle_delay).await;
        Ok(())
    }
}

/// The document must declare support for both light and dark themes.
pub async fn color_scheme(page: &dyn Page) -> CheckResult<Option<Diagnostic>> {
    if page.has_element(COLOR_SCHEME_SELECTOR).await? {
        return Ok(None);
    }

    Ok(Some(Diagnostic::NotColorScheme))
}

/// Open `url` in a fresh browser and check that its dark theme keeps the
/// canonical palette.
///
/// A full-page layout diff is written to `config.layout_output_image` as a
/// side artefact whenever the toggle exists; it does not affect the result.
pub async fn switch_scheme(url: &str, tools: &SchemeTools<'_>) -> CheckResult<Option<Diagnostic>> {
    let config = tools.config;
    let mut session = tools.launcher.launch(url, &config.browser).await?;

    let outcome = dark_palette_matches(session.page(), tools).await;
    let closed = session.close().await;
    let Some(palette_ok) = outcome? else {
        closed?;
        info!("Dark theme toggle '{}' not found", config.toggle_selector);
        return Ok(Some(Diagnostic::SwitchButtonsChanged));
    };
    closed?;

    let hook = DarkModeCapture {
        settle_delay: config.settle_delay,
    };
    let diff = tools
        .layout
        .compare_layout(url, &config.layout_options(), &hook)
        .await?;
    debug!(
        "Dark layout diff: {:.2}% of {} pixels, matches={}",
        diff.diff_percent, diff.total_pixels, diff.matches
    );

    if !palette_ok {
        warn!("Dark palette of {} drifted from canonical", url);
        return Ok(Some(Diagnostic::NotDarkColorScheme));
    }

    Ok(None)
}

/// `None` when the toggle is missing, otherwise whether palettes match.
async fn dark_palette_matches(page: &dyn Page, tools: &SchemeTools<'_>) -> CheckResult<Option<bool>> {
    let config = tools.config;

    if !page.has_element(&config.toggle_selector).await? {
        return Ok(None);
    }

    page.emulate_color_scheme(ColorScheme::Dark).await?;
    let removed = page.remove_elements("img").await?;
    debug!("Removed {} images before capture", removed);
    page.scroll_to_end().await?;
    tokio::time::sleep(config.settle_delay).await;
    page.screenshot(&config.palette_image, true).await?;

    let canonical = tools
        .palettes
        .extract(&config.canonical_palette_image, config.palette_size)?;
    let actual = tools.palettes.extract(&config.palette_image, config.palette_size)?;

    Ok(Some(palettes_match(&canonical, &actual, config.tolerance)))
}

/// A present block must be exactly as tall as the viewport.
pub async fn block_full_screen(page: &dyn Page, selector: &str) -> CheckResult<Option<Diagnostic>> {
    if !page.has_element(selector).await? {
        return Ok(None);
    }

    let gap = page.viewport_gap(selector).await?;
    if gap != 0 {
        debug!("Block '{}' is {}px off the viewport height", selector, gap);
        return Ok(Some(Diagnostic::BlockNotFullScreen {
            name: selector.to_string(),
        }));
    }

    Ok(None)
}

/// Every selector must match at least one element.
pub async fn semantic_tags<S: AsRef<str>>(page: &dyn Page, selectors: &[S]) -> CheckResult<Vec<Diagnostic>> {
    let found = try_join_all(selectors.iter().map(|s| page.has_element(s.as_ref()))).await?;

    let missing: Vec<&str> = selectors
        .iter()
        .zip(found)
        .filter(|(_, found)| !found)
        .map(|(selector, _)| selector.as_ref())
        .collect();

    if missing.is_empty() {
        return Ok(vec![]);
    }

    Ok(vec![Diagnostic::SemanticTagsMissing {
        tag_names: missing.join(", "),
    }])
}

/// Margin and padding of every selector must compute to `0px`.
pub async fn reset_margins<S: AsRef<str>>(page: &dyn Page, selectors: &[S]) -> CheckResult<Vec<Diagnostic>> {
    let styles = try_join_all(
        selectors
            .iter()
            .map(|s| page.computed_style(s.as_ref(), &RESET_PROPERTIES)),
    )
    .await?;

    let not_reset: Vec<&str> = selectors
        .iter()
        .zip(styles)
        .filter(|(_, values)| values.iter().any(|v| v != "0px"))
        .map(|(selector, _)| selector.as_ref())
        .collect();

    if not_reset.is_empty() {
        return Ok(vec![]);
    }

    Ok(vec![Diagnostic::NotResetMargins {
        tag_names: not_reset.join(", "),
    }])
}

/// The selector's background must be attached with `fixed`.
pub async fn background_fixed(page: &dyn Page, selector: &str) -> CheckResult<Vec<Diagnostic>> {
    let values = page.computed_style(selector, &["background-attachment"]).await?;

    if values.iter().any(|v| v != "fixed") {
        return Ok(vec![Diagnostic::NotFixedBackground {
            selector: selector.to_string(),
        }]);
    }

    Ok(vec![])
}
