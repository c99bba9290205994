//! Dominant palette extraction from screenshots

use std::collections::HashMap;
use std::path::Path;

use image::Pixel;
use tracing::debug;

use crate::color::Color;
use crate::error::{CheckError, CheckResult};

/// Produces a short list of dominant colours for an image on disk.
pub trait PaletteExtractor: Send + Sync {
    fn extract(&self, path: &Path, count: usize) -> CheckResult<Vec<Color>>;
}

/// Bucket quantiser over decoded pixels.
///
/// Pixels are grouped by the top `bits` bits of each channel; the `count`
/// most populated buckets are returned as the mean colour of their pixels.
#[derive(Debug, Clone, Copy)]
pub struct ImagePalette {
    bits: u8,
}

impl ImagePalette {
    pub fn new(bits: u8) -> Self {
        Self { bits: bits.clamp(1, 8) }
    }

    fn bucket(&self, channels: &[u8]) -> u32 {
        let shift = 8 - self.bits;
        channels[..3]
            .iter()
            .fold(0u32, |key, c| (key << self.bits) | u32::from(c >> shift))
    }
}

impl Default for ImagePalette {
    fn default() -> Self {
        Self::new(5)
    }
}

#[derive(Default)]
struct Bucket {
    pixels: u64,
    sums: [u64; 3],
}

impl PaletteExtractor for ImagePalette {
    fn extract(&self, path: &Path, count: usize) -> CheckResult<Vec<Color>> {
        if !path.exists() {
            return Err(CheckError::BaselineNotFound(path.display().to_string()));
        }

        let rgb = image::open(path)?.to_rgb8();
        let mut buckets: HashMap<u32, Bucket> = HashMap::new();

        for pixel in rgb.pixels() {
            let channels = pixel.channels();
            let bucket = buckets.entry(self.bucket(channels)).or_default();
            bucket.pixels += 1;
            for (sum, c) in bucket.sums.iter_mut().zip(channels) {
                *sum += u64::from(*c);
            }
        }

        let mut ranked: Vec<(u32, Bucket)> = buckets.into_iter().collect();
        ranked.sort_by(|(ka, a), (kb, b)| b.pixels.cmp(&a.pixels).then(ka.cmp(kb)));

        let colors: Vec<Color> = ranked
            .iter()
            .take(count)
            .map(|(_, bucket)| {
                let mean = |sum: u64| (sum / bucket.pixels) as u8;
                Color::rgb(mean(bucket.sums[0]), mean(bucket.sums[1]), mean(bucket.sums[2]))
            })
            .collect();

        debug!("Palette of {}: {:?}", path.display(), colors);
        Ok(colors)
    }
}
