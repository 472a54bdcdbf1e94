use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Discrete color bands for cel shading: four colors selected by three
/// strictly descending brightness cut points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    colors: [Vec3; 4],
    thresholds: [f32; 3],
}

impl Palette {
    /// Builds a palette from four band colors (brightest first) and three
    /// descending thresholds.
    ///
    /// Mismatched or non-descending thresholds are a programmer error; this
    /// asserts rather than silently misrendering.
    pub fn new(colors: [Vec3; 4], thresholds: [f32; 3]) -> Self {
        assert!(
            thresholds[0] > thresholds[1] && thresholds[1] > thresholds[2],
            "palette thresholds must be strictly descending: {thresholds:?}"
        );
        Self { colors, thresholds }
    }

    pub fn colors(&self) -> &[Vec3; 4] {
        &self.colors
    }

    pub fn thresholds(&self) -> &[f32; 3] {
        &self.thresholds
    }

    /// Selects the band index for a brightness value in [-1, 1].
    ///
    /// Hard banding, not averaging: band 0 if brightness > t0, band 1 if
    /// > t1, band 2 if > t2, band 3 otherwise. Total and monotonic in
    /// brightness.
    pub fn band(&self, brightness: f32) -> usize {
        self.thresholds
            .iter()
            .position(|&t| brightness > t)
            .unwrap_or(3)
    }

    /// Returns the band color for a brightness value.
    pub fn color_for(&self, brightness: f32) -> Vec3 {
        self.colors[self.band(brightness)]
    }
}

/// Converts a packed `0xRRGGBB` color to linear-ish [0,1] components.
pub fn rgb(hex: u32) -> Vec3 {
    Vec3::new(
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    )
}

/// Near-black ink used for comic outlines and the stylization pass.
pub fn ink() -> Vec3 {
    rgb(0x05010a)
}

/// Pine greens for the tree foliage, brightest band first.
pub fn foliage() -> Palette {
    Palette::new(
        [rgb(0x2f8f4e), rgb(0x277f45), rgb(0x1f6b3a), rgb(0x153f25)],
        [0.72, 0.34, 0.08],
    )
}

/// Warm golds for the tree-top star.
pub fn star() -> Palette {
    Palette::new(
        [rgb(0xffd400), rgb(0xffcf2e), rgb(0xe6b800), rgb(0xb88f00)],
        [0.72, 0.34, 0.08],
    )
}

/// Neon pool the ornament shader draws base and accent colors from.
pub const ORNAMENT_POOL: [u32; 4] = [0xff003b, 0x00eaff, 0xfff200, 0x39ffb3];

/// Shadow tone for an ornament base color.
pub fn ornament_shadow(base: Vec3) -> Vec3 {
    base * 0.62
}

/// Fixed base/ribbon pairs for the five gift boxes.
pub const GIFT_PAIRS: [(u32, u32); 5] = [
    (0xe10600, 0xffd400),
    (0x0047ff, 0xffffff),
    (0xffd400, 0x0047ff),
    (0xb8f4d6, 0xe10600),
    (0xffffff, 0xe10600),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Palette {
        foliage()
    }

    #[test]
    fn banding_is_total_over_brightness_range() {
        let palette = sample();
        let mut b = -1.0f32;
        while b <= 1.0 {
            assert!(palette.band(b) < 4);
            b += 0.01;
        }
    }

    #[test]
    fn banding_is_monotonic() {
        let palette = sample();
        let mut previous = palette.band(-1.0);
        let mut b = -1.0f32;
        while b <= 1.0 {
            let band = palette.band(b);
            // Higher brightness never yields a darker (larger index) band.
            assert!(band <= previous);
            previous = band;
            b += 0.005;
        }
    }

    #[test]
    fn band_edges_are_exclusive() {
        let palette = sample();
        assert_eq!(palette.band(0.72), 1);
        assert_eq!(palette.band(0.7201), 0);
        assert_eq!(palette.band(0.08), 3);
        assert_eq!(palette.band(-1.0), 3);
        assert_eq!(palette.band(1.0), 0);
    }

    #[test]
    #[should_panic(expected = "strictly descending")]
    fn non_descending_thresholds_panic() {
        Palette::new([Vec3::ONE; 4], [0.3, 0.3, 0.1]);
    }

    #[test]
    fn rgb_unpacks_channels() {
        let c = rgb(0xff0080);
        assert_eq!(c.x, 1.0);
        assert_eq!(c.y, 0.0);
        assert!((c.z - 128.0 / 255.0).abs() < 1e-6);
    }
}
