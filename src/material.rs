use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::palette::{self, Palette};

/// Shading model a mesh is assigned to at load time. Immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaterialKind {
    Foliage,
    Ornament,
}

impl std::fmt::Display for MaterialKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaterialKind::Foliage => f.write_str("foliage"),
            MaterialKind::Ornament => f.write_str("ornament"),
        }
    }
}

/// Maximum bounding-box dimension below which a tree sub-mesh is assumed to
/// be a bauble rather than foliage. Exports disagree on naming, so size is
/// the fallback signal.
pub const ORNAMENT_MAX_DIMENSION: f32 = 0.35;

/// Classifies a tree sub-mesh from its name and bounding-box extent.
///
/// The heuristic is data-driven and deliberately fuzzy: ornament names vary
/// across exports (`Sphere.003`, `bauble_red`, `Ball`), and unnamed small
/// meshes are treated as ornaments too.
pub fn classify(mesh_name: &str, max_dimension: f32) -> MaterialKind {
    let name = mesh_name.to_lowercase();
    let looks_like_ornament = name.starts_with("sphere")
        || name.contains("ornament")
        || name.contains("bauble")
        || name.contains("ball")
        || max_dimension < ORNAMENT_MAX_DIMENSION;
    if looks_like_ornament {
        MaterialKind::Ornament
    } else {
        MaterialKind::Foliage
    }
}

/// Banded cel-shading parameters shared by foliage and the star.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandedParams {
    pub palette: Palette,
    pub light_position: Vec3,
    /// Fresnel ink-outline weight; zero disables the outline entirely.
    pub edge_weight: f32,
    /// Sparse screen-print speck strength.
    pub sparkle: f32,
}

impl BandedParams {
    pub fn foliage() -> Self {
        Self {
            palette: palette::foliage(),
            light_position: Vec3::new(5.0, 10.0, 5.0),
            edge_weight: 0.45,
            sparkle: 0.03,
        }
    }

    pub fn star() -> Self {
        Self {
            palette: palette::star(),
            light_position: Vec3::new(5.0, 10.0, 5.0),
            edge_weight: 0.0,
            sparkle: 0.0,
        }
    }
}

/// Two-tone ornament parameters with an emissive "light bulb" boost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrnamentParams {
    pub base: Vec3,
    pub shadow: Vec3,
    pub accent: Vec3,
    pub ink: Vec3,
}

impl OrnamentParams {
    /// Draws base and accent colors from the neon pool so every bauble reads
    /// differently without extra textures.
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        let base = palette::rgb(palette::ORNAMENT_POOL[rng.gen_range(0..palette::ORNAMENT_POOL.len())]);
        let accent =
            palette::rgb(palette::ORNAMENT_POOL[rng.gen_range(0..palette::ORNAMENT_POOL.len())]);
        Self {
            base,
            shadow: palette::ornament_shadow(base),
            accent,
            ink: palette::ink(),
        }
    }
}

/// Flat two-tone gift shading with a UV-space ribbon cross.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GiftParams {
    pub base: Vec3,
    pub ribbon: Vec3,
}

impl GiftParams {
    pub fn from_pair(pair: (u32, u32)) -> Self {
        Self {
            base: palette::rgb(pair.0),
            ribbon: palette::rgb(pair.1),
        }
    }
}

/// Displaced snow-ground parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnowGroundParams {
    pub color: Vec3,
    pub fog_color: Vec3,
}

impl Default for SnowGroundParams {
    fn default() -> Self {
        Self {
            // Pale peach pastel reads warmer than pure white under the
            // posterize pass.
            color: palette::rgb(0xf4c6b8),
            fog_color: Vec3::new(0.04, 0.04, 0.12),
        }
    }
}

/// Night-sky gradient parameters with procedural star specks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyParams {
    pub top: Vec3,
    pub bottom: Vec3,
    pub offset: f32,
    pub exponent: f32,
}

impl Default for SkyParams {
    fn default() -> Self {
        Self {
            top: palette::rgb(0x01010a),
            bottom: palette::rgb(0x070a24),
            offset: 10.0,
            exponent: 0.8,
        }
    }
}

/// Tagged per-model parameter set. Each shading model carries its own fixed
/// struct of typed parameters, so a missing or extra uniform is a
/// compile-time error rather than a silent render bug.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaterialVariant {
    Foliage(BandedParams),
    Star(BandedParams),
    Ornament(OrnamentParams),
    Gift(GiftParams),
    SnowGround(SnowGroundParams),
    Sky(SkyParams),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn classifies_by_name_prefix() {
        assert_eq!(classify("Sphere.004", 2.0), MaterialKind::Ornament);
        assert_eq!(classify("sphere", 2.0), MaterialKind::Ornament);
    }

    #[test]
    fn kind_displays_lowercase() {
        assert_eq!(MaterialKind::Foliage.to_string(), "foliage");
        assert_eq!(MaterialKind::Ornament.to_string(), "ornament");
    }

    #[test]
    fn classifies_by_name_substring() {
        assert_eq!(classify("red_bauble_01", 2.0), MaterialKind::Ornament);
        assert_eq!(classify("OrnamentTop", 2.0), MaterialKind::Ornament);
        assert_eq!(classify("disco_ball", 2.0), MaterialKind::Ornament);
    }

    #[test]
    fn classifies_small_meshes_as_ornaments() {
        assert_eq!(classify("Cube.017", 0.2), MaterialKind::Ornament);
        assert_eq!(classify("Cube.017", 0.35), MaterialKind::Foliage);
    }

    #[test]
    fn defaults_to_foliage() {
        assert_eq!(classify("trunk", 3.1), MaterialKind::Foliage);
        assert_eq!(classify("branches_low", 1.4), MaterialKind::Foliage);
    }

    #[test]
    fn ornament_colors_come_from_the_pool() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let pool: Vec<_> = palette::ORNAMENT_POOL
            .iter()
            .map(|&hex| palette::rgb(hex))
            .collect();
        for _ in 0..16 {
            let params = OrnamentParams::random(&mut rng);
            assert!(pool.contains(&params.base));
            assert!(pool.contains(&params.accent));
            assert_eq!(params.shadow, params.base * 0.62);
        }
    }
}
