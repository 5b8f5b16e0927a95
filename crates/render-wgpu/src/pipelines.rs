use crate::RenderError;
use crate::meshes::vertex_layout;
use crate::shaders::{ShaderLibrary, validated};
use crate::targets::{DEPTH_FORMAT, SILHOUETTE_FORMAT};
use crate::uniforms::{LineVertex, UniformRing};

/// Straight alpha blending for colour, premultiplied-style accumulation for alpha.
pub(crate) const ALPHA_BLEND: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    },
};

fn depth_state() -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: true,
        depth_compare: wgpu::CompareFunction::Less,
        stencil: Default::default(),
        bias: Default::default(),
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn layout(
    device: &wgpu::Device,
    label: &str,
    entries: &[wgpu::BindGroupLayoutEntry],
) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries,
    })
}

pub(crate) struct Layouts {
    pub draw: wgpu::BindGroupLayout,
    pub texture: wgpu::BindGroupLayout,
    pub outline: wgpu::BindGroupLayout,
    pub debug: wgpu::BindGroupLayout,
    pub blit: wgpu::BindGroupLayout,
}

impl Layouts {
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            draw: layout(device, "draw_layout", &[UniformRing::layout_entry()]),
            texture: layout(
                device,
                "texture_layout",
                &[
                    texture_entry(0),
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            ),
            outline: layout(
                device,
                "outline_layout",
                &[texture_entry(0), uniform_entry(1, wgpu::ShaderStages::FRAGMENT)],
            ),
            debug: layout(
                device,
                "debug_layout",
                &[uniform_entry(0, wgpu::ShaderStages::VERTEX)],
            ),
            blit: layout(
                device,
                "blit_layout",
                &[texture_entry(0), uniform_entry(1, wgpu::ShaderStages::FRAGMENT)],
            ),
        }
    }
}

struct PipelineDesc<'a> {
    name: &'a str,
    bind_groups: &'a [&'a wgpu::BindGroupLayout],
    buffers: &'a [wgpu::VertexBufferLayout<'a>],
    format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
    topology: wgpu::PrimitiveTopology,
    depth: Option<wgpu::DepthStencilState>,
}

fn build(
    device: &wgpu::Device,
    shaders: &ShaderLibrary,
    desc: PipelineDesc<'_>,
) -> Result<wgpu::RenderPipeline, RenderError> {
    validated(device, desc.name, || {
        let module = shaders.module(device, desc.name)?;
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(desc.name),
            bind_group_layouts: desc.bind_groups,
            push_constant_ranges: &[],
        });
        Ok(device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(desc.name),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: desc.buffers,
            },
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: desc.format,
                    blend: desc.blend,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: desc.topology,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: desc.depth,
            multisample: Default::default(),
            multiview: None,
            cache: None,
        }))
    })
}

/// One pipeline per pass.
pub(crate) struct Pipelines {
    pub silhouette: wgpu::RenderPipeline,
    pub main: wgpu::RenderPipeline,
    pub outline: wgpu::RenderPipeline,
    pub debug: wgpu::RenderPipeline,
    pub blit: wgpu::RenderPipeline,
}

/// Colour format a pipeline renders into. The scene target is created in
/// the surface format, so only the silhouette pass differs.
pub(crate) fn target_format(pipeline: &str, surface_format: wgpu::TextureFormat) -> wgpu::TextureFormat {
    match pipeline {
        "silhouette" => SILHOUETTE_FORMAT,
        _ => surface_format,
    }
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        shaders: &ShaderLibrary,
        layouts: &Layouts,
        surface_format: wgpu::TextureFormat,
    ) -> Result<Self, RenderError> {
        let mesh_buffers = [vertex_layout()];
        let line_attributes = wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x4];
        let line_buffers = [wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<LineVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &line_attributes,
        }];

        let pipelines = Self {
            silhouette: build(
                device,
                shaders,
                PipelineDesc {
                    name: "silhouette",
                    bind_groups: &[&layouts.draw],
                    buffers: &mesh_buffers,
                    format: target_format("silhouette", surface_format),
                    blend: Some(wgpu::BlendState::REPLACE),
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    depth: Some(depth_state()),
                },
            )?,
            main: build(
                device,
                shaders,
                PipelineDesc {
                    name: "main",
                    bind_groups: &[&layouts.draw, &layouts.texture],
                    buffers: &mesh_buffers,
                    format: target_format("main", surface_format),
                    blend: Some(ALPHA_BLEND),
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    depth: Some(depth_state()),
                },
            )?,
            outline: build(
                device,
                shaders,
                PipelineDesc {
                    name: "outline",
                    bind_groups: &[&layouts.outline],
                    buffers: &[],
                    format: target_format("outline", surface_format),
                    blend: Some(ALPHA_BLEND),
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    depth: None,
                },
            )?,
            debug: build(
                device,
                shaders,
                PipelineDesc {
                    name: "debug",
                    bind_groups: &[&layouts.debug],
                    buffers: &line_buffers,
                    format: target_format("debug", surface_format),
                    blend: Some(ALPHA_BLEND),
                    topology: wgpu::PrimitiveTopology::LineList,
                    depth: None,
                },
            )?,
            blit: build(
                device,
                shaders,
                PipelineDesc {
                    name: "blit",
                    bind_groups: &[&layouts.blit],
                    buffers: &[],
                    format: target_format("blit", surface_format),
                    blend: None,
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    depth: None,
                },
            )?,
        };
        tracing::debug!("render pipelines created");
        Ok(pipelines)
    }
}
