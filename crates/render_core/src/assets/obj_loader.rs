//! Geometry collaborator and the Wavefront OBJ reference implementation

use std::fs;
use std::path::{Path, PathBuf};

use super::AssetError;

/// One polygon corner: position, normal and texture coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolygonVertex {
    /// Position in model space
    pub position: [f32; 3],
    /// Normal vector
    pub normal: [f32; 3],
    /// Texture coordinate
    pub uv: [f32; 2],
}

/// A polygon as authored; not necessarily a triangle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polygon {
    /// Corners in winding order
    pub vertices: Vec<PolygonVertex>,
}

/// Everything the mesh loader needs from a model file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedGeometry {
    /// Polygons in file order
    pub polygons: Vec<Polygon>,
    /// Diffuse texture referenced by the model, already resolved against the model's directory
    pub texture: Option<PathBuf>,
    /// Shader the model asks to be drawn with, if the format can express one
    pub shader_hint: Option<String>,
}

/// Parses a model file into polygons
///
/// Called exactly once per mesh load.
pub trait GeometrySource {
    /// Parse the file at `path`
    fn parse(&self, path: &Path) -> Result<ParsedGeometry, AssetError>;
}

/// Wavefront OBJ geometry source
///
/// Supports `v`, `vn`, `vt`, `f` (with 1-based or negative indices in `v`, `v/t`,
/// `v//n` and `v/t/n` forms) and `mtllib`, whose first `map_Kd` entry becomes the
/// model's texture. Corners without a normal get `+Y`; corners without a texture
/// coordinate get `(0, 0)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjGeometrySource;

impl GeometrySource for ObjGeometrySource {
    fn parse(&self, path: &Path) -> Result<ParsedGeometry, AssetError> {
        let contents = fs::read_to_string(path).map_err(|source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_obj(&contents, path)
    }
}

impl ObjGeometrySource {
    /// Parse OBJ text; `path` is used for error messages and to resolve `mtllib`
    pub fn parse_obj(contents: &str, path: &Path) -> Result<ParsedGeometry, AssetError> {
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));

        let mut positions: Vec<[f32; 3]> = Vec::new();
        let mut normals: Vec<[f32; 3]> = Vec::new();
        let mut tex_coords: Vec<[f32; 2]> = Vec::new();
        let mut geometry = ParsedGeometry::default();

        for (line_no, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = line.split_whitespace().collect();
            let err =
                |what: &str| AssetError::parse(path, format!("line {}: {}", line_no + 1, what));

            match parts[0] {
                "v" => positions.push(
                    parse_floats::<3>(&parts[1..]).ok_or_else(|| err("invalid vertex position"))?,
                ),
                "vn" => normals.push(
                    parse_floats::<3>(&parts[1..]).ok_or_else(|| err("invalid vertex normal"))?,
                ),
                "vt" => tex_coords.push(
                    parse_floats::<2>(&parts[1..])
                        .ok_or_else(|| err("invalid texture coordinate"))?,
                ),
                "f" => {
                    let mut polygon = Polygon::default();
                    for corner in &parts[1..] {
                        let mut refs = corner.split('/');

                        let pos_idx = refs
                            .next()
                            .and_then(|s| resolve_index(s, positions.len()))
                            .ok_or_else(|| err("invalid position index"))?;
                        let tex_idx = match refs.next() {
                            Some(s) if !s.is_empty() => {
                                let index = resolve_index(s, tex_coords.len())
                                    .ok_or_else(|| err("invalid texture index"))?;
                                Some(index)
                            }
                            _ => None,
                        };
                        let normal_idx = match refs.next() {
                            Some(s) if !s.is_empty() => {
                                let index = resolve_index(s, normals.len())
                                    .ok_or_else(|| err("invalid normal index"))?;
                                Some(index)
                            }
                            _ => None,
                        };

                        polygon.vertices.push(PolygonVertex {
                            position: positions[pos_idx],
                            normal: normal_idx.map_or([0.0, 1.0, 0.0], |i| normals[i]),
                            uv: tex_idx.map_or([0.0, 0.0], |i| tex_coords[i]),
                        });
                    }
                    geometry.polygons.push(polygon);
                }
                "mtllib" if geometry.texture.is_none() => {
                    if let Some(name) = parts.get(1) {
                        geometry.texture = diffuse_texture(&base_dir.join(name));
                    }
                }
                _ => {
                    // Ignore other commands
                }
            }
        }

        if geometry.polygons.is_empty() {
            return Err(AssetError::parse(path, "no faces found in OBJ file"));
        }

        log::debug!(
            "Parsed {:?}: {} positions, {} polygons",
            path,
            positions.len(),
            geometry.polygons.len()
        );
        Ok(geometry)
    }
}

fn parse_floats<const N: usize>(parts: &[&str]) -> Option<[f32; N]> {
    if parts.len() < N {
        return None;
    }
    let mut out = [0.0; N];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = part.parse().ok()?;
    }
    Some(out)
}

// OBJ indices are 1-based; negative values count back from the latest element
fn resolve_index(token: &str, len: usize) -> Option<usize> {
    let index: i64 = token.parse().ok()?;
    let resolved = match index {
        0 => return None,
        i if i > 0 => usize::try_from(i - 1).ok()?,
        i => len.checked_sub(usize::try_from(-i).ok()?)?,
    };
    (resolved < len).then_some(resolved)
}

fn diffuse_texture(mtl_path: &Path) -> Option<PathBuf> {
    let contents = match fs::read_to_string(mtl_path) {
        Ok(c) => c,
        Err(e) => {
            log::warn!("Cannot read material library {:?}: {}", mtl_path, e);
            return None;
        }
    };
    let mtl_dir = mtl_path.parent().unwrap_or_else(|| Path::new(""));

    contents.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        if parts.next()? != "map_Kd" {
            return None;
        }
        // Options such as `-s 1 1 1` precede the file name, which is always last
        parts.last().map(|name| mtl_dir.join(name))
    })
}
