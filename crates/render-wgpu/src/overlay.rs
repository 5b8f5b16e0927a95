use glam::Vec2;
use kestrel_render::{UiCallback, fit_ui_input};

/// egui drawn into the low-resolution scene target.
///
/// Window input is queued by the host and rescaled to render resolution
/// before each UI run, so widgets line up with the pixels they are drawn on.
pub(crate) struct UiOverlay {
    ctx: egui::Context,
    renderer: egui_wgpu::Renderer,
    pending: Option<egui::RawInput>,
    window_size: Vec2,
    platform_output: Option<egui::PlatformOutput>,
}

impl UiOverlay {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat, window_size: Vec2) -> Self {
        Self {
            ctx: egui::Context::default(),
            renderer: egui_wgpu::Renderer::new(device, format, None, 1, false),
            pending: None,
            window_size,
            platform_output: None,
        }
    }

    pub fn context(&self) -> &egui::Context {
        &self.ctx
    }

    pub fn set_window_size(&mut self, size: Vec2) {
        self.window_size = size;
    }

    /// Queue input for the next UI run. Events from runs that were skipped
    /// are kept ahead of the new ones.
    pub fn queue_input(&mut self, mut raw: egui::RawInput) {
        if let Some(previous) = self.pending.take() {
            let mut events = previous.events;
            events.append(&mut raw.events);
            raw.events = events;
        }
        self.pending = Some(raw);
    }

    pub fn take_platform_output(&mut self) -> Option<egui::PlatformOutput> {
        self.platform_output.take()
    }

    /// Run the UI callback and record its draw into `encoder`, loading the
    /// current contents of `target`. Returns command buffers that must be
    /// submitted before `encoder`.
    pub fn paint(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        render_size: (u32, u32),
        ui: UiCallback<'_>,
    ) -> (Vec<wgpu::CommandBuffer>, Vec<egui::TextureId>) {
        let size = Vec2::new(render_size.0 as f32, render_size.1 as f32);
        let raw = fit_ui_input(self.pending.take().unwrap_or_default(), self.window_size, size);
        let output = self.ctx.run(raw, |ctx| ui(ctx));
        self.platform_output = Some(output.platform_output);

        let jobs = self.ctx.tessellate(output.shapes, output.pixels_per_point);
        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [render_size.0, render_size.1],
            pixels_per_point: output.pixels_per_point,
        };
        for (id, delta) in &output.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, delta);
        }
        let extra = self
            .renderer
            .update_buffers(device, queue, encoder, &jobs, &screen);
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("ui_pass"),
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
                .forget_lifetime();
            self.renderer.render(&mut pass, &jobs, &screen);
        }
        (extra, output.textures_delta.free)
    }

    /// Release textures egui no longer needs. Call after the frame's
    /// command buffers are submitted.
    pub fn free(&mut self, textures: &[egui::TextureId]) {
        for id in textures {
            self.renderer.free_texture(id);
        }
    }
}
