//! Wavefront OBJ import.
//!
//! Supports `v` (with optional per-vertex rgb), `vt`, `vn` and `f` records.
//! Polygons are fan-triangulated, so a quad `a b c d` becomes `a b c` and
//! `a c d`. Other records (`o`, `g`, `s`, `usemtl`, ...) are ignored.
//!
//! Source files are Y-up; [`to_z_up`] maps `(x, y, z)` to `(x, -z, y)`.

use crate::AssetError;
use glam::{Vec2, Vec3};
use std::path::Path;

/// One corner of a triangle: indices into the model's attribute arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Corner {
    pub position: usize,
    pub uv: Option<usize>,
    pub normal: Option<usize>,
}

/// Parsed OBJ contents in source (Y-up) coordinates.
#[derive(Debug, Clone, Default)]
pub struct ObjModel {
    pub positions: Vec<Vec3>,
    pub colors: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub normals: Vec<Vec3>,
    pub triangles: Vec<[Corner; 3]>,
}

/// Convert a Y-up source vector to the engine's Z-up convention.
pub fn to_z_up(v: Vec3) -> Vec3 {
    Vec3::new(v.x, -v.z, v.y)
}

impl ObjModel {
    pub fn load(path: &Path) -> Result<Self, AssetError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, AssetError> {
        let mut model = ObjModel::default();

        for (line_no, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parts: Vec<&str> = line.split_whitespace().collect();
            match parts[0] {
                "v" => {
                    let p = parse_vec3(&parts, line_no)?;
                    model.positions.push(p);
                    let color = if parts.len() >= 7 {
                        Vec3::new(
                            parse_float(parts[4], line_no)?,
                            parse_float(parts[5], line_no)?,
                            parse_float(parts[6], line_no)?,
                        )
                    } else {
                        Vec3::ONE
                    };
                    model.colors.push(color);
                }
                "vt" => {
                    if parts.len() < 3 {
                        return Err(parse_error(line_no, "texture coordinate needs 2 values"));
                    }
                    model.uvs.push(Vec2::new(
                        parse_float(parts[1], line_no)?,
                        parse_float(parts[2], line_no)?,
                    ));
                }
                "vn" => model.normals.push(parse_vec3(&parts, line_no)?),
                "f" => {
                    if parts.len() < 4 {
                        return Err(parse_error(line_no, "face needs at least 3 vertices"));
                    }
                    let corners = parts[1..]
                        .iter()
                        .map(|spec| parse_corner(spec, &model, line_no))
                        .collect::<Result<Vec<_>, _>>()?;
                    for i in 1..corners.len() - 1 {
                        model.triangles.push([corners[0], corners[i], corners[i + 1]]);
                    }
                }
                _ => {}
            }
        }

        if model.triangles.is_empty() {
            return Err(AssetError::EmptyGeometry);
        }
        Ok(model)
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Indexed triangle mesh in Z-up coordinates, as used for collision shapes.
    pub fn indexed_z_up(&self) -> (Vec<Vec3>, Vec<[u32; 3]>) {
        let vertices = self.positions.iter().map(|&p| to_z_up(p)).collect();
        let indices = self
            .triangles
            .iter()
            .map(|t| t.map(|c| c.position as u32))
            .collect();
        (vertices, indices)
    }
}

fn parse_error(line_no: usize, msg: &str) -> AssetError {
    AssetError::Parse(format!("line {}: {msg}", line_no + 1))
}

fn parse_float(s: &str, line_no: usize) -> Result<f32, AssetError> {
    s.parse::<f32>()
        .map_err(|_| parse_error(line_no, &format!("invalid number '{s}'")))
}

fn parse_vec3(parts: &[&str], line_no: usize) -> Result<Vec3, AssetError> {
    if parts.len() < 4 {
        return Err(parse_error(line_no, "expected 3 values"));
    }
    Ok(Vec3::new(
        parse_float(parts[1], line_no)?,
        parse_float(parts[2], line_no)?,
        parse_float(parts[3], line_no)?,
    ))
}

/// Resolve a 1-based (or negative, relative) OBJ index.
fn parse_index(s: &str, count: usize, line_no: usize) -> Result<usize, AssetError> {
    let raw: i64 = s
        .parse()
        .map_err(|_| parse_error(line_no, &format!("invalid index '{s}'")))?;
    let idx = if raw > 0 {
        raw - 1
    } else {
        count as i64 + raw
    };
    if raw == 0 || idx < 0 || idx as usize >= count {
        return Err(parse_error(line_no, &format!("index {raw} out of range")));
    }
    Ok(idx as usize)
}

fn parse_corner(spec: &str, model: &ObjModel, line_no: usize) -> Result<Corner, AssetError> {
    let mut fields = spec.split('/');
    let position = match fields.next() {
        Some(p) if !p.is_empty() => parse_index(p, model.positions.len(), line_no)?,
        _ => return Err(parse_error(line_no, "missing position index")),
    };
    let uv = match fields.next() {
        Some(t) if !t.is_empty() => Some(parse_index(t, model.uvs.len(), line_no)?),
        _ => None,
    };
    let normal = match fields.next() {
        Some(n) if !n.is_empty() => Some(parse_index(n, model.normals.len(), line_no)?),
        _ => None,
    };
    Ok(Corner {
        position,
        uv,
        normal,
    })
}
