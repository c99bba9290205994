//! Full-page layout comparison against a canonical screenshot

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use image::{GenericImageView, Pixel, RgbaImage};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{CheckError, CheckResult};
use crate::page::{BrowserLauncher, BrowserOptions, Page};

/// Result of a layout comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutDiff {
    /// Whether the images match (within threshold)
    pub matches: bool,

    /// Percentage of pixels that differ
    pub diff_percent: f64,

    pub diff_pixels: u64,
    pub total_pixels: u64,

    /// Diff image; `None` when the screenshots are byte-identical
    pub output_image: Option<PathBuf>,

    pub actual_hash: String,
    pub canonical_hash: String,
}

/// Where the comparison reads and writes its images
#[derive(Debug, Clone)]
pub struct LayoutCompareOptions {
    pub canonical_image: PathBuf,
    pub page_image: PathBuf,
    pub output_image: PathBuf,
    pub browser: BrowserOptions,

    /// Allowed share of differing pixels (0.0 - 100.0 percent)
    pub threshold: f64,
}

/// Runs against the page right before the comparison screenshot.
#[async_trait]
pub trait BeforeScreenshot: Send + Sync {
    async fn before_screenshot(&self, page: &dyn Page) -> CheckResult<()>;
}

/// Hook that leaves the page untouched
pub struct NoPreparation;

#[async_trait]
impl BeforeScreenshot for NoPreparation {
    async fn before_screenshot(&self, _page: &dyn Page) -> CheckResult<()> {
        Ok(())
    }
}

/// Visual diff of a page against its canonical render
#[async_trait]
pub trait LayoutComparer: Send + Sync {
    async fn compare_layout(
        &self,
        url: &str,
        options: &LayoutCompareOptions,
        hook: &dyn BeforeScreenshot,
    ) -> CheckResult<LayoutDiff>;
}

/// Captures a fresh full-page screenshot and diffs it pixel by pixel
pub struct ScreenshotLayoutComparer {
    launcher: Arc<dyn BrowserLauncher>,
}

impl ScreenshotLayoutComparer {
    pub fn new(launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self { launcher }
    }
}

#[async_trait]
impl LayoutComparer for ScreenshotLayoutComparer {
    async fn compare_layout(
        &self,
        url: &str,
        options: &LayoutCompareOptions,
        hook: &dyn BeforeScreenshot,
    ) -> CheckResult<LayoutDiff> {
        let mut session = self.launcher.launch(url, &options.browser).await?;

        let captured = async {
            hook.before_screenshot(session.page()).await?;
            session.page().screenshot(&options.page_image, true).await
        }
        .await;
        let closed = session.close().await;
        captured?;
        closed?;

        diff_images(
            &options.canonical_image,
            &options.page_image,
            &options.output_image,
            options.threshold,
        )
    }
}

/// Compare `actual` with `canonical`, painting differing pixels red in `output`.
pub fn diff_images(canonical: &Path, actual: &Path, output: &Path, threshold: f64) -> CheckResult<LayoutDiff> {
    if !canonical.exists() {
        return Err(CheckError::BaselineNotFound(canonical.display().to_string()));
    }

    let actual_img = image::open(actual)?;
    let canonical_img = image::open(canonical)?;

    let actual_hash = hash_file(actual)?;
    let canonical_hash = hash_file(canonical)?;

    // Quick hash comparison
    if actual_hash == canonical_hash {
        debug!("Screenshots match exactly (same hash)");
        if output.exists() {
            std::fs::remove_file(output)?;
        }
        return Ok(LayoutDiff {
            matches: true,
            diff_percent: 0.0,
            diff_pixels: 0,
            total_pixels: u64::from(actual_img.width()) * u64::from(actual_img.height()),
            output_image: None,
            actual_hash,
            canonical_hash,
        });
    }

    if actual_img.dimensions() != canonical_img.dimensions() {
        warn!(
            "Screenshot dimensions differ: actual {:?} vs canonical {:?}",
            actual_img.dimensions(),
            canonical_img.dimensions()
        );
    }

    // Pixels outside the overlap exist in only one image and always differ
    let width = actual_img.width().max(canonical_img.width());
    let height = actual_img.height().max(canonical_img.height());
    let canonical_rgba = canonical_img.to_rgba8();
    let actual_rgba = actual_img.to_rgba8();

    let mut diff_img = RgbaImage::new(width, height);
    let mut diff_pixels = 0u64;
    let total_pixels = u64::from(width) * u64::from(height);

    for y in 0..height {
        for x in 0..width {
            let in_actual = x < actual_rgba.width() && y < actual_rgba.height();
            let in_canonical = x < canonical_rgba.width() && y < canonical_rgba.height();
            if !(in_actual && in_canonical) {
                diff_pixels += 1;
                diff_img.put_pixel(x, y, DIFF_COLOR);
                continue;
            }

            let actual_pixel = actual_rgba.get_pixel(x, y);
            let canonical_pixel = canonical_rgba.get_pixel(x, y);

            if pixels_differ(actual_pixel, canonical_pixel) {
                diff_pixels += 1;
                diff_img.put_pixel(x, y, DIFF_COLOR);
            } else {
                let channels = actual_pixel.channels();
                diff_img.put_pixel(
                    x,
                    y,
                    image::Rgba([channels[0] / 2, channels[1] / 2, channels[2] / 2, 128]),
                );
            }
        }
    }

    let diff_percent = if total_pixels == 0 {
        0.0
    } else {
        (diff_pixels as f64 / total_pixels as f64) * 100.0
    };
    let matches = diff_percent <= threshold;

    // JPEG cannot carry the alpha channel of the diff
    image::DynamicImage::ImageRgba8(diff_img).to_rgb8().save(output)?;

    if matches {
        info!("Layout matches canonical: {:.2}% pixels differ", diff_percent);
    } else {
        warn!(
            "Layout differs from {}: {:.2}% pixels differ (threshold: {:.2}%)",
            canonical.display(),
            diff_percent,
            threshold
        );
    }

    Ok(LayoutDiff {
        matches,
        diff_percent,
        diff_pixels,
        total_pixels,
        output_image: Some(output.to_path_buf()),
        actual_hash,
        canonical_hash,
    })
}

const DIFF_COLOR: image::Rgba<u8> = image::Rgba([255, 0, 0, 255]);

/// Anti-aliasing and JPEG artefacts stay under this per-channel delta
const PIXEL_TOLERANCE: u8 = 5;

fn pixels_differ(a: &image::Rgba<u8>, b: &image::Rgba<u8>) -> bool {
    a.channels()
        .iter()
        .zip(b.channels())
        .any(|(x, y)| x.abs_diff(*y) > PIXEL_TOLERANCE)
}

fn hash_file(path: &Path) -> CheckResult<String> {
    let data = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}
