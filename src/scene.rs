use glam::Vec3;
use rand::Rng;

use crate::material::{
    classify, BandedParams, GiftParams, MaterialKind, MaterialVariant, OrnamentParams,
};
use crate::obj::{MeshData, NamedMesh};
use crate::palette::GIFT_PAIRS;
use crate::terrain;

/// Explicit load state per optional component. The update loop skips
/// anything that is not `Ready`, deterministically, instead of nil-checking
/// nullable fields.
#[derive(Debug, Default)]
pub enum Lifecycle<T> {
    #[default]
    NotLoaded,
    Loading,
    Ready(T),
}

impl<T> Lifecycle<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Lifecycle::Ready(_))
    }

    pub fn as_ready(&self) -> Option<&T> {
        match self {
            Lifecycle::Ready(value) => Some(value),
            _ => None,
        }
    }
}

/// Uniform scale applied to the imported tree model.
pub const TREE_SCALE: f32 = 0.8;

/// One classified sub-mesh of the tree.
#[derive(Debug, Clone)]
pub struct TreePart {
    pub name: String,
    pub kind: MaterialKind,
    pub variant: MaterialVariant,
    pub mesh: MeshData,
}

/// The assembled tree: classified parts plus the star seated on top.
#[derive(Debug, Clone)]
pub struct TreeScene {
    pub parts: Vec<TreePart>,
    pub star_position: Vec3,
}

/// Classifies every tree sub-mesh once at load time and seats the star just
/// above the tallest part. Ornament colors are drawn per part so each bauble
/// reads differently.
pub fn assemble_tree<R: Rng>(meshes: Vec<NamedMesh>, rng: &mut R) -> TreeScene {
    let mut parts = Vec::with_capacity(meshes.len());
    let mut top = 0.0f32;
    for named in meshes {
        let kind = classify(&named.name, named.mesh.max_dimension());
        let variant = match kind {
            MaterialKind::Foliage => MaterialVariant::Foliage(BandedParams::foliage()),
            MaterialKind::Ornament => MaterialVariant::Ornament(OrnamentParams::random(rng)),
        };
        top = top.max(named.mesh.max_y() * TREE_SCALE);
        parts.push(TreePart {
            name: named.name,
            kind,
            variant,
            mesh: named.mesh,
        });
    }
    TreeScene {
        parts,
        star_position: Vec3::new(0.0, top + 0.1, 0.0),
    }
}

/// Fixed placement for one gift box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GiftPlacement {
    pub position: Vec3,
    pub rotation_y: f32,
    pub params: GiftParams,
}

pub const GIFT_SIZE: f32 = 0.6;

/// The five gifts around the tree, each seated at half height on the
/// displaced ground surface.
pub fn gift_placements() -> Vec<GiftPlacement> {
    let spots: [(f32, f32, f32); 5] = [
        (-2.5, 2.0, 0.2),
        (-1.8, -2.0, -0.5),
        (2.2, 2.2, 0.8),
        (1.5, -1.5, -0.2),
        (0.0, 2.5, 0.0),
    ];
    spots
        .iter()
        .enumerate()
        .map(|(index, &(x, z, r))| GiftPlacement {
            position: Vec3::new(x, terrain::displacement(x, z) + GIFT_SIZE / 2.0, z),
            rotation_y: r,
            params: GiftParams::from_pair(GIFT_PAIRS[index % GIFT_PAIRS.len()]),
        })
        .collect()
}

/// Cube vertices interleaved as `position.xyz normal.xyz uv.xy`, 36 indices.
/// Each face carries full [0,1] UVs so the gift shader's ribbon cross lands
/// on every side.
pub fn cube(size: f32) -> (Vec<f32>, Vec<u32>) {
    let h = size / 2.0;
    // (normal, tangent, bitangent) per face.
    let faces: [(Vec3, Vec3, Vec3); 6] = [
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
    ];
    let mut vertices = Vec::with_capacity(6 * 4 * 8);
    let mut indices = Vec::with_capacity(36);
    for (face, &(n, u, v)) in faces.iter().enumerate() {
        let origin = n * h;
        let corners = [
            (origin - u * h - v * h, [0.0, 0.0]),
            (origin + u * h - v * h, [1.0, 0.0]),
            (origin + u * h + v * h, [1.0, 1.0]),
            (origin - u * h + v * h, [0.0, 1.0]),
        ];
        for (p, uv) in corners {
            vertices.extend_from_slice(&[p.x, p.y, p.z, n.x, n.y, n.z, uv[0], uv[1]]);
        }
        let base = (face * 4) as u32;
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    (vertices, indices)
}

/// Octahedron with flat per-face normals, interleaved `position normal`.
pub fn octahedron(radius: f32) -> (Vec<f32>, Vec<u32>) {
    let apexes = [Vec3::Y * radius, Vec3::NEG_Y * radius];
    let ring = [
        Vec3::X * radius,
        Vec3::Z * radius,
        Vec3::NEG_X * radius,
        Vec3::NEG_Z * radius,
    ];
    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    for (apex_index, &apex) in apexes.iter().enumerate() {
        for i in 0..4 {
            let (a, b) = if apex_index == 0 {
                (ring[i], ring[(i + 1) % 4])
            } else {
                (ring[(i + 1) % 4], ring[i])
            };
            let normal = (a - apex).cross(b - apex).normalize();
            for p in [apex, a, b] {
                vertices.extend_from_slice(&[p.x, p.y, p.z, normal.x, normal.y, normal.z]);
            }
            let base = (vertices.len() / 6 - 3) as u32;
            indices.extend_from_slice(&[base, base + 1, base + 2]);
        }
    }
    (vertices, indices)
}

/// Flat XZ grid centered on the origin, positions only; displacement and
/// normals happen entirely on the GPU.
pub fn ground_plane(size: f32, segments: u32) -> (Vec<f32>, Vec<u32>) {
    let verts_per_side = segments + 1;
    let mut vertices = Vec::with_capacity((verts_per_side * verts_per_side * 3) as usize);
    for j in 0..verts_per_side {
        for i in 0..verts_per_side {
            let x = (i as f32 / segments as f32 - 0.5) * size;
            let z = (j as f32 / segments as f32 - 0.5) * size;
            vertices.extend_from_slice(&[x, 0.0, z]);
        }
    }
    let mut indices = Vec::with_capacity((segments * segments * 6) as usize);
    for j in 0..segments {
        for i in 0..segments {
            let a = j * verts_per_side + i;
            let b = a + 1;
            let c = a + verts_per_side;
            let d = c + 1;
            indices.extend_from_slice(&[a, c, b, b, c, d]);
        }
    }
    (vertices, indices)
}

pub const GROUND_SIZE: f32 = 40.0;
pub const GROUND_SEGMENTS: u32 = 256;
pub const SKY_SIZE: f32 = 20.0;
pub const STAR_RADIUS: f32 = 0.1;

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn named(name: &str, scale: f32) -> NamedMesh {
        // A triangle stretched to the requested extent.
        let vertices = vec![
            0.0, 0.0, 0.0, 0.0, 0.0, 1.0, //
            scale, 0.0, 0.0, 0.0, 0.0, 1.0, //
            0.0, scale, 0.0, 0.0, 0.0, 1.0,
        ];
        NamedMesh {
            name: name.to_string(),
            mesh: MeshData {
                vertices,
                indices: vec![0, 1, 2],
            },
        }
    }

    #[test]
    fn tree_assembly_classifies_parts() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let scene = assemble_tree(
            vec![named("trunk", 3.0), named("Sphere.001", 0.1)],
            &mut rng,
        );
        assert_eq!(scene.parts[0].kind, MaterialKind::Foliage);
        assert_eq!(scene.parts[1].kind, MaterialKind::Ornament);
        assert!(matches!(scene.parts[1].variant, MaterialVariant::Ornament(_)));
    }

    #[test]
    fn star_sits_above_the_tallest_part() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let scene = assemble_tree(vec![named("trunk", 5.0)], &mut rng);
        let expected = 5.0 * TREE_SCALE + 0.1;
        assert!((scene.star_position.y - expected).abs() < 1e-5);
        assert_eq!(scene.star_position.x, 0.0);
    }

    #[test]
    fn five_gifts_with_fixed_palettes() {
        let gifts = gift_placements();
        assert_eq!(gifts.len(), 5);
        // Each box sits half-buried-free on the displaced surface.
        for g in &gifts {
            let ground = terrain::displacement(g.position.x, g.position.z);
            assert_eq!(g.position.y, ground + GIFT_SIZE / 2.0);
        }
        // Palettes are assigned in order, so the first two must differ.
        assert_ne!(gifts[0].params, gifts[1].params);
    }

    #[test]
    fn cube_has_uvs_on_every_face() {
        let (vertices, indices) = cube(0.6);
        assert_eq!(vertices.len(), 6 * 4 * 8);
        assert_eq!(indices.len(), 36);
        for quad in vertices.chunks_exact(8) {
            assert!((0.0..=1.0).contains(&quad[6]));
            assert!((0.0..=1.0).contains(&quad[7]));
        }
    }

    #[test]
    fn octahedron_normals_are_unit_and_outward() {
        let (vertices, indices) = octahedron(0.1);
        assert_eq!(indices.len(), 24);
        for v in vertices.chunks_exact(6) {
            let p = Vec3::new(v[0], v[1], v[2]);
            let n = Vec3::new(v[3], v[4], v[5]);
            assert!((n.length() - 1.0).abs() < 1e-5);
            // Flat-face normal points away from the center.
            assert!(n.dot(p) > 0.0 || p == Vec3::ZERO);
        }
    }

    #[test]
    fn ground_plane_grid_dimensions() {
        let (vertices, indices) = ground_plane(40.0, 4);
        assert_eq!(vertices.len(), 5 * 5 * 3);
        assert_eq!(indices.len(), 4 * 4 * 6);
        // Corners span the requested size.
        assert_eq!(vertices[0], -20.0);
        assert_eq!(vertices[2], -20.0);
    }

    #[test]
    fn lifecycle_ready_gates_access() {
        let mut state: Lifecycle<u32> = Lifecycle::NotLoaded;
        assert!(!state.is_ready());
        assert!(state.as_ready().is_none());
        state = Lifecycle::Loading;
        assert!(!state.is_ready());
        state = Lifecycle::Ready(7);
        assert_eq!(state.as_ready(), Some(&7));
    }
}
