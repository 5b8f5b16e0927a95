use bytemuck::{Pod, Zeroable};
use kestrel_common::DebugLine;
use kestrel_render::{CameraMatrices, DrawItem, OutlineParams};
use std::num::NonZeroU64;

/// Per-draw uniform block shared by the silhouette and main shaders.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub(crate) struct DrawUniforms {
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
    /// x = time, y = silhouette id.
    pub params: [f32; 4],
}

impl DrawUniforms {
    pub fn new(camera: &CameraMatrices, item: &DrawItem, time: f32) -> Self {
        Self {
            projection: camera.projection.to_cols_array_2d(),
            view: camera.view.to_cols_array_2d(),
            model: item.model.to_cols_array_2d(),
            color: item.color.to_array(),
            params: [time, item.silhouette_id, 0.0, 0.0],
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub(crate) struct OutlineUniforms {
    pub color: [f32; 4],
    pub width: f32,
    pub depth_threshold: f32,
    pub _pad: [f32; 2],
}

impl From<OutlineParams> for OutlineUniforms {
    fn from(params: OutlineParams) -> Self {
        Self {
            color: params.color.to_array(),
            width: params.width,
            depth_threshold: params.depth_threshold,
            _pad: [0.0; 2],
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub(crate) struct LineVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

/// Two vertices per line for a line-list draw.
pub(crate) fn line_vertices(lines: &[DebugLine]) -> Vec<LineVertex> {
    lines
        .iter()
        .flat_map(|line| {
            let color = line.color.to_array();
            [
                LineVertex {
                    position: line.start.to_array(),
                    color,
                },
                LineVertex {
                    position: line.end.to_array(),
                    color,
                },
            ]
        })
        .collect()
}

pub(crate) fn aligned_stride(size: u64, alignment: u64) -> u64 {
    size.div_ceil(alignment.max(1)) * alignment.max(1)
}

/// One uniform buffer holding every draw's block at a dynamic offset, so
/// draws sharing a mesh never overwrite each other's transforms.
pub(crate) struct UniformRing {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    stride: u64,
    capacity: usize,
}

impl UniformRing {
    pub const BLOCK_SIZE: u64 = std::mem::size_of::<DrawUniforms>() as u64;

    pub fn layout_entry() -> wgpu::BindGroupLayoutEntry {
        wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: NonZeroU64::new(Self::BLOCK_SIZE),
            },
            count: None,
        }
    }

    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, capacity: usize) -> Self {
        let stride = aligned_stride(
            Self::BLOCK_SIZE,
            device.limits().min_uniform_buffer_offset_alignment as u64,
        );
        let capacity = capacity.max(1);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("draw_uniforms"),
            size: stride * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("draw_uniforms_bind_group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(Self::BLOCK_SIZE),
                }),
            }],
        });
        Self {
            buffer,
            bind_group,
            stride,
            capacity,
        }
    }

    /// Upload `blocks`, growing the buffer first if needed.
    pub fn write(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        blocks: &[DrawUniforms],
    ) {
        if blocks.len() > self.capacity {
            *self = Self::new(device, layout, blocks.len().next_power_of_two());
            tracing::debug!(capacity = self.capacity, "grew draw uniform buffer");
        }
        if blocks.is_empty() {
            return;
        }
        let mut bytes = vec![0u8; self.stride as usize * blocks.len()];
        for (i, block) in blocks.iter().enumerate() {
            let start = i * self.stride as usize;
            bytes[start..start + Self::BLOCK_SIZE as usize]
                .copy_from_slice(bytemuck::bytes_of(block));
        }
        queue.write_buffer(&self.buffer, 0, &bytes);
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub fn offset(&self, index: usize) -> u32 {
        (index as u64 * self.stride) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Vec3, Vec4};
    use kestrel_assets::MeshHandle;

    #[test]
    fn draw_block_fits_one_aligned_slot() {
        assert_eq!(UniformRing::BLOCK_SIZE, 224);
        assert_eq!(aligned_stride(UniformRing::BLOCK_SIZE, 256), 256);
        assert_eq!(aligned_stride(300, 256), 512);
        assert_eq!(aligned_stride(64, 0), 64);
    }

    #[test]
    fn draw_uniforms_carry_id_and_time() {
        let mut world = kestrel_ecs::World::new();
        let object = world.create_object("cube");
        let item = DrawItem {
            object,
            mesh: MeshHandle(0),
            vertex_count: 36,
            model: Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)),
            color: Vec4::new(1.0, 0.5, 0.25, 1.0),
            silhouette_id: 3.0 / 255.0,
        };
        let block = DrawUniforms::new(&CameraMatrices::default(), &item, 2.5);
        assert_eq!(block.params, [2.5, 3.0 / 255.0, 0.0, 0.0]);
        assert_eq!(block.model[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(block.color, [1.0, 0.5, 0.25, 1.0]);
    }

    #[test]
    fn lines_expand_to_vertex_pairs() {
        let lines = [
            DebugLine::new(Vec3::ZERO, Vec3::X, Vec4::ONE),
            DebugLine::new(Vec3::Y, Vec3::Z, Vec4::new(0.0, 1.0, 0.0, 1.0)),
        ];
        let vertices = line_vertices(&lines);
        assert_eq!(vertices.len(), 4);
        assert_eq!(vertices[1].position, [1.0, 0.0, 0.0]);
        assert_eq!(vertices[3].color, [0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn line_vertex_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<LineVertex>(), 28);
    }

    #[test]
    fn outline_uniforms_are_sixteen_byte_aligned() {
        assert_eq!(std::mem::size_of::<OutlineUniforms>(), 32);
        let uniforms = OutlineUniforms::from(OutlineParams::default());
        assert_eq!(uniforms.depth_threshold, 0.003);
    }
}
