//! Mesh assets for the kestrel engine.
//!
//! Meshes are imported from OBJ files into Z-up triangle soup and stored in
//! an append-only [`MeshLibrary`] keyed by name. Renderers upload library
//! entries on demand and resolve draw requests by name.
//!
//! # Invariants
//! - A mesh name maps to exactly one mesh for the library's lifetime.
//! - Load failures are reported to the caller and never panic.

pub mod obj;
mod library;
mod sequence;

pub use library::{MeshData, MeshHandle, MeshLibrary, Vertex};
pub use obj::ObjModel;
pub use sequence::{FrameSequence, load_from_list, load_sequence, mesh_name_for};

/// Errors from asset operations.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("OBJ parse error: {0}")]
    Parse(String),
    #[error("mesh has no triangles")]
    EmptyGeometry,
    #[error("unknown mesh '{0}'")]
    UnknownMesh(String),
}

pub fn crate_info() -> &'static str {
    "kestrel-assets v0.1.0"
}
