use glam::{Vec2, Vec3};

use crate::palette;

/// Pop-art stylization pass tunables: RGB misregistration shift, posterize,
/// edge ink, halftone dots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StylizeSettings {
    pub time: f32,
    pub resolution: Vec2,
    pub posterize_levels: f32,
    pub halftone_scale: f32,
    pub halftone_strength: f32,
    pub rgb_shift: f32,
    pub edge_strength: f32,
    pub ink: Vec3,
}

impl Default for StylizeSettings {
    fn default() -> Self {
        Self {
            time: 0.0,
            resolution: Vec2::ONE,
            posterize_levels: 7.0,
            halftone_scale: 7.0,
            halftone_strength: 0.12,
            rgb_shift: 0.25,
            edge_strength: 0.95,
            ink: palette::ink(),
        }
    }
}

/// Bloom pass tunables; the threshold is matched to the ornament shader's
/// emissive boost so bulbs glow and nothing else does.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BloomSettings {
    pub resolution: Vec2,
    pub strength: f32,
    pub radius: f32,
    pub threshold: f32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            resolution: Vec2::ONE,
            strength: 0.75,
            radius: 0.28,
            threshold: 0.78,
        }
    }
}

/// Radial darkening from screen center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VignetteSettings {
    pub resolution: Vec2,
    pub offset: f32,
    pub darkness: f32,
}

impl Default for VignetteSettings {
    fn default() -> Self {
        Self {
            resolution: Vec2::ONE,
            offset: 1.0,
            darkness: 1.1,
        }
    }
}

/// Ordered post-process chain: scene color -> stylize -> bloom -> vignette.
///
/// The chain is strictly linear; the output of each pass is the sole color
/// input of the next. Settings live here, CPU-side, so resize behavior and
/// defaults are testable without a GPU; the renderer uploads them verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PostChain {
    pub stylize: StylizeSettings,
    pub bloom: BloomSettings,
    pub vignette: VignetteSettings,
}

impl PostChain {
    pub fn new(width: u32, height: u32) -> Self {
        let mut chain = Self::default();
        chain.resize(width, height);
        chain
    }

    /// Re-derives every resolution-dependent uniform. Must run before the
    /// next frame after a viewport change; no pass may keep a stale size.
    pub fn resize(&mut self, width: u32, height: u32) {
        let resolution = Vec2::new(width.max(1) as f32, height.max(1) as f32);
        self.stylize.resolution = resolution;
        self.bloom.resolution = resolution;
        self.vignette.resolution = resolution;
    }

    /// Advances the shared stylization clock (drives the RGB-shift wobble).
    pub fn set_time(&mut self, elapsed: f32) {
        self.stylize.time = elapsed;
    }
}

/// Rec. 709 luminance, identical to the shader's.
pub fn luma(c: Vec3) -> f32 {
    c.dot(Vec3::new(0.2126, 0.7152, 0.0722))
}

/// Quantizes each channel to `levels` discrete steps. Levels below 2 are
/// clamped so the image never collapses to a single step.
pub fn posterize(c: Vec3, levels: f32) -> Vec3 {
    let levels = levels.max(2.0);
    (c * levels).floor() / levels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_updates_every_pass() {
        let mut chain = PostChain::new(640, 480);
        chain.resize(1920, 1080);
        let expected = Vec2::new(1920.0, 1080.0);
        assert_eq!(chain.stylize.resolution, expected);
        assert_eq!(chain.bloom.resolution, expected);
        assert_eq!(chain.vignette.resolution, expected);
    }

    #[test]
    fn resize_guards_against_zero_extent() {
        let mut chain = PostChain::default();
        chain.resize(0, 0);
        assert_eq!(chain.stylize.resolution, Vec2::ONE);
    }

    #[test]
    fn posterize_two_levels_leaves_no_intermediates() {
        let out = posterize(Vec3::splat(0.5), 2.0);
        assert_eq!(out, Vec3::splat(0.5));
        for i in 0..=100 {
            let c = i as f32 / 100.0;
            let q = posterize(Vec3::splat(c), 2.0).x;
            assert!(
                q == 0.0 || q == 0.5 || q == 1.0,
                "intermediate level survived: {c} -> {q}"
            );
        }
    }

    #[test]
    fn posterize_clamps_degenerate_level_counts() {
        assert_eq!(posterize(Vec3::splat(0.6), 0.0), posterize(Vec3::splat(0.6), 2.0));
    }

    #[test]
    fn luma_is_weighted_green_heavy() {
        assert!(luma(Vec3::new(0.0, 1.0, 0.0)) > luma(Vec3::new(1.0, 0.0, 0.0)));
        assert!((luma(Vec3::ONE) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn time_only_touches_the_stylize_pass() {
        let mut chain = PostChain::default();
        let bloom = chain.bloom;
        let vignette = chain.vignette;
        chain.set_time(4.2);
        assert_eq!(chain.stylize.time, 4.2);
        assert_eq!(chain.bloom, bloom);
        assert_eq!(chain.vignette, vignette);
    }
}
