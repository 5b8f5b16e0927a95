use crate::RenderError;
use crate::context::GpuContext;
use crate::meshes::GpuMeshTable;
use crate::overlay::UiOverlay;
use crate::pipelines::{Layouts, Pipelines};
use crate::shaders::ShaderLibrary;
use crate::targets::{RenderTargets, white_texture};
use crate::uniforms::{DrawUniforms, OutlineUniforms, UniformRing, line_vertices};
use glam::Vec2;
use kestrel_render::{
    DrawItem, FrameInput, FrameOutcome, FrameRenderer, PassKind, PassPlan, RenderSettings,
    UiCallback, collect_draw_items,
};
use kestrel_tools::PassTimings;
use std::time::Instant;
use wgpu::util::DeviceExt;

fn clear_color(c: glam::Vec4) -> wgpu::Color {
    wgpu::Color {
        r: c.x as f64,
        g: c.y as f64,
        b: c.z as f64,
        a: c.w as f64,
    }
}

/// The six-pass renderer on wgpu.
///
/// Geometry is drawn at the configured render resolution into offscreen
/// targets; the blit scales the composed frame onto the window surface.
pub struct WgpuRenderer {
    gpu: GpuContext,
    settings: RenderSettings,
    layouts: Layouts,
    pipelines: Pipelines,
    targets: RenderTargets,
    meshes: GpuMeshTable,
    draw_uniforms: UniformRing,
    texture_bind_group: wgpu::BindGroup,
    outline_buffer: wgpu::Buffer,
    outline_bind_group: wgpu::BindGroup,
    debug_buffer: wgpu::Buffer,
    debug_bind_group: wgpu::BindGroup,
    line_buffer: Option<(wgpu::Buffer, u64)>,
    zoom_buffer: wgpu::Buffer,
    blit_bind_group: wgpu::BindGroup,
    overlay: UiOverlay,
    timings: PassTimings,
}

impl WgpuRenderer {
    pub fn new(gpu: GpuContext, settings: RenderSettings) -> Result<Self, RenderError> {
        let device = &gpu.device;
        let color_format = gpu.surface_format();
        let shaders = ShaderLibrary::load(settings.shader_dir.as_deref())?;
        let layouts = Layouts::new(device);
        let pipelines = Pipelines::new(device, &shaders, &layouts, color_format)?;
        let targets = RenderTargets::new(device, settings.width, settings.height, color_format);
        let draw_uniforms = UniformRing::new(device, &layouts.draw, 64);

        let white = white_texture(device, &gpu.queue);
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("default_sampler"),
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let texture_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("default_texture_bind_group"),
            layout: &layouts.texture,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&white),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let outline_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("outline_params"),
            contents: bytemuck::bytes_of(&OutlineUniforms::from(settings.outline())),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let debug_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("debug_uniforms"),
            contents: bytemuck::bytes_of(&glam::Mat4::IDENTITY.to_cols_array_2d()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let debug_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("debug_bind_group"),
            layout: &layouts.debug,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: debug_buffer.as_entire_binding(),
            }],
        });
        let zoom_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("zoom_uniforms"),
            contents: bytemuck::cast_slice(&kestrel_render::ZoomState::default().to_uniform()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let (outline_bind_group, blit_bind_group) =
            Self::target_bind_groups(device, &layouts, &targets, &outline_buffer, &zoom_buffer);

        let (width, height) = gpu.surface_size();
        let overlay = UiOverlay::new(
            device,
            color_format,
            Vec2::new(width as f32, height as f32),
        );

        tracing::info!(
            width = settings.width,
            height = settings.height,
            "renderer ready"
        );
        Ok(Self {
            gpu,
            settings,
            layouts,
            pipelines,
            targets,
            meshes: GpuMeshTable::default(),
            draw_uniforms,
            texture_bind_group,
            outline_buffer,
            outline_bind_group,
            debug_buffer,
            debug_bind_group,
            line_buffer: None,
            zoom_buffer,
            blit_bind_group,
            overlay,
            timings: PassTimings::default(),
        })
    }

    fn target_bind_groups(
        device: &wgpu::Device,
        layouts: &Layouts,
        targets: &RenderTargets,
        outline_buffer: &wgpu::Buffer,
        zoom_buffer: &wgpu::Buffer,
    ) -> (wgpu::BindGroup, wgpu::BindGroup) {
        let outline = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("outline_bind_group"),
            layout: &layouts.outline,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&targets.silhouette),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: outline_buffer.as_entire_binding(),
                },
            ],
        });
        let blit = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("blit_bind_group"),
            layout: &layouts.blit,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&targets.scene_color),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: zoom_buffer.as_entire_binding(),
                },
            ],
        });
        (outline, blit)
    }

    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Resize the window surface. The render resolution is unchanged.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.gpu.resize(width, height);
        self.overlay
            .set_window_size(Vec2::new(width.max(1) as f32, height.max(1) as f32));
    }

    /// The egui context the host should feed window events into.
    pub fn egui_context(&self) -> &egui::Context {
        self.overlay.context()
    }

    /// Input gathered by the host for the next UI run, in window pixels.
    pub fn queue_ui_input(&mut self, raw: egui::RawInput) {
        self.overlay.queue_input(raw);
    }

    /// Cursor changes, clipboard requests and the like from the last UI run.
    pub fn take_platform_output(&mut self) -> Option<egui::PlatformOutput> {
        self.overlay.take_platform_output()
    }

    fn geometry_pass<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        label: &str,
        target: &wgpu::TextureView,
        clear: wgpu::Color,
    ) -> wgpu::RenderPass<'e> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.targets.depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(0),
                    store: wgpu::StoreOp::Store,
                }),
            }),
            ..Default::default()
        })
    }

    fn overlay_pass<'e>(
        encoder: &'e mut wgpu::CommandEncoder,
        label: &str,
        target: &wgpu::TextureView,
    ) -> wgpu::RenderPass<'e> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            ..Default::default()
        })
    }

    fn silhouette_pass(&self, encoder: &mut wgpu::CommandEncoder, draws: &[DrawItem]) {
        let mut pass = self.geometry_pass(
            encoder,
            "silhouette_pass",
            &self.targets.silhouette,
            wgpu::Color::BLACK,
        );
        pass.set_pipeline(&self.pipelines.silhouette);
        self.draw_meshes(&mut pass, draws);
    }

    fn main_pass(&self, encoder: &mut wgpu::CommandEncoder, draws: &[DrawItem]) {
        let mut pass = self.geometry_pass(
            encoder,
            "main_pass",
            &self.targets.scene_color,
            clear_color(self.settings.clear_color),
        );
        pass.set_pipeline(&self.pipelines.main);
        pass.set_bind_group(1, &self.texture_bind_group, &[]);
        self.draw_meshes(&mut pass, draws);
    }

    fn draw_meshes(&self, pass: &mut wgpu::RenderPass<'_>, draws: &[DrawItem]) {
        for (i, item) in draws.iter().enumerate() {
            let Some(mesh) = self.meshes.get(item.mesh) else {
                continue;
            };
            pass.set_bind_group(0, self.draw_uniforms.bind_group(), &[self.draw_uniforms.offset(i)]);
            pass.set_vertex_buffer(0, mesh.buffer.slice(..));
            pass.draw(0..mesh.vertex_count, 0..1);
        }
    }

    fn outline_pass(&self, encoder: &mut wgpu::CommandEncoder) {
        let mut pass = Self::overlay_pass(encoder, "outline_pass", &self.targets.scene_color);
        pass.set_pipeline(&self.pipelines.outline);
        pass.set_bind_group(0, &self.outline_bind_group, &[]);
        pass.draw(0..3, 0..1);
    }

    fn debug_pass(&mut self, encoder: &mut wgpu::CommandEncoder, frame: &FrameInput<'_>) {
        let Some(lines) = frame.debug_lines.filter(|l| !l.is_empty()) else {
            return;
        };
        let vertices = line_vertices(lines);
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        let needed = bytes.len() as u64;
        let fits = self.line_buffer.as_ref().is_some_and(|(_, size)| *size >= needed);
        if !fits {
            let size = needed.next_power_of_two();
            let buffer = self.gpu.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("debug_lines"),
                size,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            self.line_buffer = Some((buffer, size));
        }
        let Some((buffer, _)) = self.line_buffer.as_ref() else {
            return;
        };
        self.gpu.queue.write_buffer(buffer, 0, bytes);
        self.gpu.queue.write_buffer(
            &self.debug_buffer,
            0,
            bytemuck::bytes_of(&frame.camera.view_projection().to_cols_array_2d()),
        );

        let mut pass = Self::overlay_pass(encoder, "debug_pass", &self.targets.scene_color);
        pass.set_pipeline(&self.pipelines.debug);
        pass.set_bind_group(0, &self.debug_bind_group, &[]);
        pass.set_vertex_buffer(0, buffer.slice(..needed));
        pass.draw(0..vertices.len() as u32, 0..1);
    }

    fn blit_pass(&self, encoder: &mut wgpu::CommandEncoder, surface: &wgpu::TextureView) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("blit_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: surface,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            ..Default::default()
        });
        pass.set_pipeline(&self.pipelines.blit);
        pass.set_bind_group(0, &self.blit_bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

impl FrameRenderer for WgpuRenderer {
    fn render(&mut self, frame: &FrameInput<'_>, ui: Option<UiCallback<'_>>) -> FrameOutcome {
        let plan = PassPlan::for_frame(frame.debug_lines.is_some(), ui.is_some());
        self.meshes.sync(&self.gpu.device, frame.meshes);

        let draws: Vec<DrawItem> = collect_draw_items(frame.world, frame.meshes, frame.alpha);
        let blocks: Vec<DrawUniforms> = draws
            .iter()
            .map(|item| DrawUniforms::new(&frame.camera, item, frame.time))
            .collect();
        self.draw_uniforms
            .write(&self.gpu.device, &self.gpu.queue, &self.layouts.draw, &blocks);
        self.gpu.queue.write_buffer(
            &self.zoom_buffer,
            0,
            bytemuck::cast_slice(&frame.zoom.to_uniform()),
        );

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });
        let mut ui = ui;
        let mut before = Vec::new();
        let mut freed = Vec::new();
        let mut surface = None;
        let mut passes = Vec::with_capacity(plan.passes().len());

        for &pass in plan.passes() {
            let start = Instant::now();
            match pass {
                PassKind::Silhouette => self.silhouette_pass(&mut encoder, &draws),
                PassKind::MainColor => self.main_pass(&mut encoder, &draws),
                PassKind::OutlineCompose => self.outline_pass(&mut encoder),
                PassKind::Debug => self.debug_pass(&mut encoder, frame),
                PassKind::UiOverlay => {
                    let Some(callback) = ui.take() else {
                        continue;
                    };
                    let (buffers, free) = self.overlay.paint(
                        &self.gpu.device,
                        &self.gpu.queue,
                        &mut encoder,
                        &self.targets.scene_color,
                        (self.targets.width, self.targets.height),
                        callback,
                    );
                    before = buffers;
                    freed = free;
                }
                PassKind::Present => {
                    let Some(texture) = self.gpu.acquire() else {
                        continue;
                    };
                    let view = texture.texture.create_view(&Default::default());
                    self.blit_pass(&mut encoder, &view);
                    surface = Some(texture);
                }
            }
            self.timings.record(pass, start.elapsed());
            passes.push(pass);
        }

        self.gpu
            .queue
            .submit(before.into_iter().chain(std::iter::once(encoder.finish())));
        self.overlay.free(&freed);
        let presented = surface.is_some();
        if let Some(texture) = surface {
            texture.present();
        }
        if self.settings.log_pass_timings {
            self.timings.end_frame();
        }

        FrameOutcome {
            passes,
            draws: draws.len(),
            presented,
        }
    }

    fn render_size(&self) -> (u32, u32) {
        (self.targets.width, self.targets.height)
    }
}
