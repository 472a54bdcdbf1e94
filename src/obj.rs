use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// GPU-ready mesh buffers: vertices interleaved as `position.xyz normal.xyz`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MeshData {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 6
    }

    /// Largest bounding-box dimension, the size signal for material
    /// classification.
    pub fn max_dimension(&self) -> f32 {
        if self.vertices.is_empty() {
            return 0.0;
        }
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for chunk in self.vertices.chunks_exact(6) {
            let p = Vec3::new(chunk[0], chunk[1], chunk[2]);
            min = min.min(p);
            max = max.max(p);
        }
        let size = max - min;
        size.x.max(size.y).max(size.z)
    }

    /// Top of the bounding box; used to seat the star on the tree.
    pub fn max_y(&self) -> f32 {
        self.vertices
            .chunks_exact(6)
            .map(|chunk| chunk[1])
            .fold(f32::NEG_INFINITY, f32::max)
    }
}

/// A sub-mesh split out of an OBJ `o`/`g` group, keeping its authored name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NamedMesh {
    pub name: String,
    pub mesh: MeshData,
}

/// Parses an OBJ file into named sub-meshes, one per `o`/`g` group.
///
/// Position and normal pools are file-global per the OBJ spec; faces are
/// bucketed into whichever group is open when they appear. Files without any
/// group statement yield a single unnamed mesh.
pub fn load_obj_objects(data: &str) -> Result<Vec<NamedMesh>> {
    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut groups: Vec<(String, Vec<[FaceIndex; 3]>)> = Vec::new();

    for (line_no, line) in data.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut parts = trimmed.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };
        match tag {
            "v" => positions.push(
                parse_vec3(parts)
                    .with_context(|| format!("invalid vertex on line {}", line_no + 1))?,
            ),
            "vn" => normals.push(
                parse_vec3(parts)
                    .with_context(|| format!("invalid normal on line {}", line_no + 1))?,
            ),
            "o" | "g" => {
                let name = parts.collect::<Vec<_>>().join(" ");
                groups.push((name, Vec::new()));
            }
            "f" => {
                let polygon = parse_face(parts)
                    .with_context(|| format!("invalid face on line {}", line_no + 1))?;
                if groups.is_empty() {
                    groups.push((String::new(), Vec::new()));
                }
                let faces = &mut groups.last_mut().unwrap().1;
                triangulate(&polygon, faces);
            }
            _ => {}
        }
    }

    if positions.is_empty() {
        return Err(anyhow!("OBJ file does not define any vertices"));
    }

    let mut meshes = Vec::new();
    for (name, faces) in groups {
        if faces.is_empty() {
            continue;
        }
        let mut mesh = build_mesh(&positions, &normals, &faces)?;
        if needs_normals(&mesh.vertices) {
            compute_normals(&mut mesh);
        }
        meshes.push(NamedMesh { name, mesh });
    }
    if meshes.is_empty() {
        return Err(anyhow!("OBJ file does not define any faces"));
    }
    Ok(meshes)
}

/// Parses an OBJ file into one merged mesh, ignoring group structure.
pub fn load_obj_merged(data: &str) -> Result<MeshData> {
    let meshes = load_obj_objects(data)?;
    let mut merged = MeshData::default();
    for named in meshes {
        let base = merged.vertex_count() as u32;
        merged.vertices.extend_from_slice(&named.mesh.vertices);
        merged
            .indices
            .extend(named.mesh.indices.iter().map(|&i| i + base));
    }
    Ok(merged)
}

fn parse_vec3<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Vec3> {
    let x = parts
        .next()
        .ok_or_else(|| anyhow!("missing vector component"))?
        .parse::<f32>()?;
    let y = parts
        .next()
        .ok_or_else(|| anyhow!("missing vector component"))?
        .parse::<f32>()?;
    let z = parts
        .next()
        .ok_or_else(|| anyhow!("missing vector component"))?
        .parse::<f32>()?;
    Ok(Vec3::new(x, y, z))
}

#[derive(Debug, Clone, Copy)]
struct FaceIndex {
    v: i32,
    vn: i32,
}

fn parse_face<'a>(parts: impl Iterator<Item = &'a str>) -> Result<Vec<FaceIndex>> {
    let mut indices = Vec::new();
    for part in parts {
        let mut segments = part.split('/');
        let v = segments
            .next()
            .ok_or_else(|| anyhow!("missing vertex index"))?
            .parse::<i32>()?;
        // The texture-coordinate slot is skipped; normals are the third
        // segment of `v/vt/vn`.
        let vn = segments
            .nth(1)
            .map(|s| {
                if s.is_empty() {
                    0
                } else {
                    s.parse::<i32>().unwrap_or(0)
                }
            })
            .unwrap_or(0);
        indices.push(FaceIndex { v, vn });
    }
    if indices.len() < 3 {
        return Err(anyhow!("faces must reference at least 3 vertices"));
    }
    Ok(indices)
}

fn triangulate(polygon: &[FaceIndex], faces: &mut Vec<[FaceIndex; 3]>) {
    for i in 1..polygon.len().saturating_sub(1) {
        faces.push([polygon[0], polygon[i], polygon[i + 1]]);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Key {
    position: usize,
    normal: Option<usize>,
}

fn build_mesh(positions: &[Vec3], normals: &[Vec3], faces: &[[FaceIndex; 3]]) -> Result<MeshData> {
    let mut lookup: HashMap<Key, u32> = HashMap::new();
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    for face in faces {
        for idx in face {
            let pos_index =
                fix_index(idx.v, positions.len()).ok_or_else(|| anyhow!("invalid vertex index"))?;
            let normal_index = fix_index(idx.vn, normals.len());
            let key = Key {
                position: pos_index,
                normal: normal_index,
            };
            let next_index = (vertices.len() / 6) as u32;
            let entry = lookup.entry(key).or_insert_with(|| {
                let position = positions[pos_index];
                vertices.extend_from_slice(&[position.x, position.y, position.z]);
                let normal = normal_index.map(|i| normals[i]).unwrap_or(Vec3::ZERO);
                vertices.extend_from_slice(&[normal.x, normal.y, normal.z]);
                next_index
            });
            indices.push(*entry);
        }
    }

    Ok(MeshData { vertices, indices })
}

fn fix_index(index: i32, len: usize) -> Option<usize> {
    if index > 0 {
        let zero_based = index as usize - 1;
        (zero_based < len).then_some(zero_based)
    } else if index < 0 {
        let abs = (-index) as usize;
        (abs <= len).then_some(len - abs)
    } else {
        None
    }
}

fn needs_normals(vertices: &[f32]) -> bool {
    vertices
        .chunks_exact(6)
        .any(|chunk| chunk[3] == 0.0 && chunk[4] == 0.0 && chunk[5] == 0.0)
}

fn compute_normals(mesh: &mut MeshData) {
    let vertex_count = mesh.vertex_count();
    let mut accum = vec![Vec3::ZERO; vertex_count];

    for triangle in mesh.indices.chunks_exact(3) {
        let i0 = triangle[0] as usize;
        let i1 = triangle[1] as usize;
        let i2 = triangle[2] as usize;
        let p0 = Vec3::from_slice(&mesh.vertices[i0 * 6..i0 * 6 + 3]);
        let p1 = Vec3::from_slice(&mesh.vertices[i1 * 6..i1 * 6 + 3]);
        let p2 = Vec3::from_slice(&mesh.vertices[i2 * 6..i2 * 6 + 3]);
        let normal = (p1 - p0).cross(p2 - p0);
        if normal.length_squared() > f32::EPSILON {
            let normal = normal.normalize();
            accum[i0] += normal;
            accum[i1] += normal;
            accum[i2] += normal;
        }
    }

    for (i, normal) in accum.into_iter().enumerate() {
        let normal = normal.normalize_or_zero();
        mesh.vertices[i * 6 + 3] = normal.x;
        mesh.vertices[i * 6 + 4] = normal.y;
        mesh.vertices[i * 6 + 5] = normal.z;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_triangle() {
        let obj = "\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let meshes = load_obj_objects(obj).unwrap();
        assert_eq!(meshes.len(), 1);
        assert_eq!(meshes[0].name, "");
        assert_eq!(meshes[0].mesh.indices, vec![0, 1, 2]);
        assert_eq!(meshes[0].mesh.vertices.len(), 18);
    }

    #[test]
    fn splits_named_objects() {
        let obj = "\
v 0 0 0
v 1 0 0
v 0 1 0
v 0 0 1
o trunk
f 1 2 3
o Sphere.001
f 1 2 4
f 2 3 4
";
        let meshes = load_obj_objects(obj).unwrap();
        assert_eq!(meshes.len(), 2);
        assert_eq!(meshes[0].name, "trunk");
        assert_eq!(meshes[1].name, "Sphere.001");
        assert_eq!(meshes[0].mesh.indices.len(), 3);
        assert_eq!(meshes[1].mesh.indices.len(), 6);
    }

    #[test]
    fn computes_missing_normals() {
        let obj = "\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let mesh = load_obj_merged(obj).unwrap();
        for chunk in mesh.vertices.chunks_exact(6) {
            let normal = Vec3::new(chunk[3], chunk[4], chunk[5]);
            assert!((normal.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn negative_indices_resolve_from_the_end() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
        let mesh = load_obj_merged(obj).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2]);
    }

    #[test]
    fn max_dimension_spans_the_bounding_box() {
        let obj = "v 0 0 0\nv 4 0 0\nv 0 1 0\nf 1 2 3\n";
        let mesh = load_obj_merged(obj).unwrap();
        assert_eq!(mesh.max_dimension(), 4.0);
        assert_eq!(mesh.max_y(), 1.0);
    }

    #[test]
    fn merged_load_offsets_indices() {
        let obj = "\
v 0 0 0
v 1 0 0
v 0 1 0
o a
f 1 2 3
o b
f 3 2 1
";
        let mesh = load_obj_merged(obj).unwrap();
        assert_eq!(mesh.indices.len(), 6);
        assert!(mesh.indices[3..].iter().all(|&i| i >= 3));
    }
}
