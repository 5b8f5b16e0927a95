use crate::AssetError;
use crate::obj::{ObjModel, to_z_up};
use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use std::collections::HashMap;
use std::path::Path;

/// Interleaved vertex layout shared with the GPU backend.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
    pub uv: [f32; 2],
}

/// Triangle-soup geometry: every three vertices form one triangle.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<Vertex>,
}

impl MeshData {
    /// Expand an OBJ model into Z-up triangle soup with flipped V coordinates.
    pub fn from_obj(name: impl Into<String>, model: &ObjModel) -> Self {
        let mut vertices = Vec::with_capacity(model.triangles.len() * 3);
        for triangle in &model.triangles {
            for corner in triangle {
                let position = to_z_up(model.positions[corner.position]);
                let normal = corner
                    .normal
                    .map(|n| to_z_up(model.normals[n]))
                    .unwrap_or(Vec3::Z);
                let color = model
                    .colors
                    .get(corner.position)
                    .copied()
                    .unwrap_or(Vec3::ONE);
                let uv = corner
                    .uv
                    .map(|t| [model.uvs[t].x, 1.0 - model.uvs[t].y])
                    .unwrap_or([0.0, 0.0]);
                vertices.push(Vertex {
                    position: position.to_array(),
                    normal: normal.to_array(),
                    color: color.to_array(),
                    uv,
                });
            }
        }
        Self {
            name: name.into(),
            vertices,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }
}

/// Index of a mesh in a [`MeshLibrary`]. Stable for the library's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshHandle(pub u32);

/// Append-only table of named meshes. Renderers upload entries on demand
/// and look them up by name; nothing is ever evicted.
#[derive(Debug, Default)]
pub struct MeshLibrary {
    meshes: Vec<MeshData>,
    by_name: HashMap<String, MeshHandle>,
}

impl MeshLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an OBJ file under `name`. Loading a name twice keeps the first mesh.
    pub fn load(&mut self, name: &str, path: impl AsRef<Path>) -> Result<MeshHandle, AssetError> {
        if let Some(handle) = self.by_name.get(name) {
            tracing::debug!(mesh = name, "mesh already loaded");
            return Ok(*handle);
        }
        let path = path.as_ref();
        let model = ObjModel::load(path).inspect_err(|e| {
            tracing::warn!(mesh = name, path = %path.display(), "failed to load mesh: {e}");
        })?;
        let handle = self.insert(MeshData::from_obj(name, &model))?;
        tracing::info!(
            mesh = name,
            vertices = self.meshes[handle.0 as usize].vertex_count(),
            "mesh loaded"
        );
        Ok(handle)
    }

    pub fn insert(&mut self, mesh: MeshData) -> Result<MeshHandle, AssetError> {
        if mesh.vertices.is_empty() {
            return Err(AssetError::EmptyGeometry);
        }
        if let Some(handle) = self.by_name.get(&mesh.name) {
            return Ok(*handle);
        }
        let handle = MeshHandle(self.meshes.len() as u32);
        self.by_name.insert(mesh.name.clone(), handle);
        self.meshes.push(mesh);
        Ok(handle)
    }

    pub fn handle(&self, name: &str) -> Option<MeshHandle> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, handle: MeshHandle) -> Option<&MeshData> {
        self.meshes.get(handle.0 as usize)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&MeshData> {
        self.handle(name).and_then(|h| self.get(h))
    }

    pub fn require(&self, name: &str) -> Result<&MeshData, AssetError> {
        self.get_by_name(name)
            .ok_or_else(|| AssetError::UnknownMesh(name.to_owned()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Meshes with a handle at or after `from`, for incremental uploads.
    pub fn since(&self, from: usize) -> impl Iterator<Item = (MeshHandle, &MeshData)> {
        self.meshes
            .iter()
            .enumerate()
            .skip(from)
            .map(|(i, m)| (MeshHandle(i as u32), m))
    }
}
