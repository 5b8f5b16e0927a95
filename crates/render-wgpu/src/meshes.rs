use kestrel_assets::{MeshHandle, MeshLibrary, Vertex};
use wgpu::util::DeviceExt;

pub(crate) struct GpuMesh {
    pub buffer: wgpu::Buffer,
    pub vertex_count: u32,
}

/// Vertex buffers mirroring a [`MeshLibrary`], indexed by the same handles.
/// The library is append-only, so syncing uploads only new entries.
#[derive(Default)]
pub(crate) struct GpuMeshTable {
    meshes: Vec<GpuMesh>,
}

impl GpuMeshTable {
    pub fn sync(&mut self, device: &wgpu::Device, library: &MeshLibrary) {
        for (handle, mesh) in library.since(self.meshes.len()) {
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(mesh.name.as_str()),
                contents: bytemuck::cast_slice(&mesh.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
            tracing::debug!(mesh = %mesh.name, handle = handle.0, vertices = mesh.vertex_count(), "uploaded mesh");
            self.meshes.push(GpuMesh {
                buffer,
                vertex_count: mesh.vertex_count() as u32,
            });
        }
    }

    pub fn get(&self, handle: MeshHandle) -> Option<&GpuMesh> {
        self.meshes.get(handle.0 as usize)
    }
}

pub(crate) fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x3,
        3 => Float32x2,
    ];
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &ATTRIBUTES,
    }
}
