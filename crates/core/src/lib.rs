//! pagecheck core
//!
//! Layout and theme checks run against a rendered web page:
//! - Declares light and dark colour schemes
//! - Keeps the canonical palette when switched to dark mode
//! - Full-screen blocks, semantic tags, reset margins, fixed backgrounds
//!
//! Checks talk to the page through the [`Page`] capability trait. The
//! [`playwright`] module provides the real implementation; tests plug in
//! fakes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    CheckRunner                              │
//! │    ├── run_suite(suite: CheckSuite) -> SuiteReport          │
//! │    └── write_results(reports) -> check-results.json         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  checks                                                     │
//! │    ├── color_scheme(page)            -> Option<Diagnostic>  │
//! │    ├── switch_scheme(url, tools)     -> Option<Diagnostic>  │
//! │    ├── block_full_screen(page, sel)  -> Option<Diagnostic>  │
//! │    ├── semantic_tags(page, sels)     -> Vec<Diagnostic>     │
//! │    ├── reset_margins(page, sels)     -> Vec<Diagnostic>     │
//! │    └── background_fixed(page, sel)   -> Vec<Diagnostic>     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Collaborators                                              │
//! │    ├── BrowserLauncher / BrowserSession / Page (playwright) │
//! │    ├── PaletteExtractor (ImagePalette)                      │
//! │    └── LayoutComparer (ScreenshotLayoutComparer)            │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod checks;
pub mod color;
pub mod diagnostic;
pub mod error;
pub mod page;
pub mod palette;
pub mod playwright;
pub mod runner;
pub mod suite;
pub mod visual;

pub use checks::{
    background_fixed, block_full_screen, color_scheme, reset_margins, semantic_tags, switch_scheme,
    DarkSchemeConfig, SchemeTools,
};
pub use color::{compare_colors, palettes_match, sort_colors, Color};
pub use diagnostic::Diagnostic;
pub use error::{CheckError, CheckResult};
pub use page::{BrowserLauncher, BrowserOptions, BrowserSession, ColorScheme, Page, Viewport};
pub use palette::{ImagePalette, PaletteExtractor};
pub use runner::{CheckRunner, RunnerConfig, SuiteReport};
pub use suite::{CheckSpec, CheckSuite};
pub use visual::{LayoutComparer, LayoutDiff, ScreenshotLayoutComparer};
