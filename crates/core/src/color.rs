//! Colour triples and tolerant palette comparison

use serde::{Deserialize, Serialize};

/// An RGB colour sampled from a screenshot.
///
/// The derived ordering is lexicographic over `(r, g, b)`, which is what
/// [`sort_colors`] relies on to line up palettes extracted independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn channels(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<[u8; 3]> for Color {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

/// Order colours so two palettes can be compared position by position.
pub fn sort_colors(mut colors: Vec<Color>) -> Vec<Color> {
    colors.sort_unstable();
    colors
}

/// True when no channel of `a` is further than `tolerance` from `b`.
pub fn compare_colors(a: &Color, b: &Color, tolerance: u8) -> bool {
    a.channels()
        .iter()
        .zip(b.channels().iter())
        .all(|(x, y)| x.abs_diff(*y) <= tolerance)
}

/// Sort both palettes and compare them pairwise.
///
/// A palette with fewer colours than the other never matches.
pub fn palettes_match(canonical: &[Color], actual: &[Color], tolerance: u8) -> bool {
    if canonical.len() != actual.len() {
        return false;
    }

    let canonical = sort_colors(canonical.to_vec());
    let actual = sort_colors(actual.to_vec());

    canonical
        .iter()
        .zip(actual.iter())
        .all(|(a, b)| compare_colors(a, b, tolerance))
}
