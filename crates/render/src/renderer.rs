use crate::camera::CameraMatrices;
use crate::draw::{DrawItem, collect_draw_items};
use crate::plan::{PassKind, PassPlan};
use crate::settings::RenderSettings;
use crate::zoom::ZoomState;
use glam::Vec2;
use kestrel_assets::MeshLibrary;
use kestrel_common::DebugLine;
use kestrel_ecs::World;

/// Everything a renderer needs for one frame. Renderers only read the world.
pub struct FrameInput<'a> {
    pub world: &'a World,
    pub meshes: &'a MeshLibrary,
    pub camera: CameraMatrices,
    /// Interpolation factor between the last two physics steps, in `[0, 1)`.
    pub alpha: f32,
    /// Present when collision debug drawing is on.
    pub debug_lines: Option<&'a [DebugLine]>,
    /// Seconds since engine start.
    pub time: f32,
    pub zoom: ZoomState,
}

/// Immediate-mode UI callback run once per frame inside the UI pass.
pub type UiCallback<'a> = &'a mut dyn FnMut(&egui::Context);

/// What a renderer did with a frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutcome {
    pub passes: Vec<PassKind>,
    pub draws: usize,
    /// False if the surface could not be acquired and the blit was skipped.
    pub presented: bool,
}

/// A backend that turns a [`FrameInput`] into a presented image.
pub trait FrameRenderer {
    fn render(&mut self, frame: &FrameInput<'_>, ui: Option<UiCallback<'_>>) -> FrameOutcome;

    /// Internal render resolution.
    fn render_size(&self) -> (u32, u32);
}

/// What the recording renderer saw for one frame.
#[derive(Debug, Clone)]
pub struct FrameRecord {
    pub passes: Vec<PassKind>,
    pub draws: Vec<DrawItem>,
    pub debug_lines: usize,
    pub ui_invoked: bool,
    pub camera: CameraMatrices,
    pub zoom: ZoomState,
    pub time: f32,
}

/// Headless renderer that runs the frame plan and draw extraction without a
/// GPU and records the result. Used by the CLI and tests.
pub struct RecordingRenderer {
    settings: RenderSettings,
    ui: egui::Context,
    frames: Vec<FrameRecord>,
    keep: usize,
}

impl RecordingRenderer {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            settings,
            ui: egui::Context::default(),
            frames: Vec::new(),
            keep: usize::MAX,
        }
    }

    /// Keep only the most recent `frames` records.
    pub fn with_history(mut self, frames: usize) -> Self {
        self.keep = frames.max(1);
        self
    }

    pub fn frames(&self) -> &[FrameRecord] {
        &self.frames
    }

    pub fn last(&self) -> Option<&FrameRecord> {
        self.frames.last()
    }

    fn run_ui(&self, ui: UiCallback<'_>) {
        let size = Vec2::new(self.settings.width as f32, self.settings.height as f32);
        let raw = crate::ui::fit_ui_input(egui::RawInput::default(), size, size);
        let _ = self.ui.run(raw, |ctx| ui(ctx));
    }
}

impl FrameRenderer for RecordingRenderer {
    fn render(&mut self, frame: &FrameInput<'_>, ui: Option<UiCallback<'_>>) -> FrameOutcome {
        let plan = PassPlan::for_frame(frame.debug_lines.is_some(), ui.is_some());
        let draws = collect_draw_items(frame.world, frame.meshes, frame.alpha);
        let ui_invoked = match ui {
            Some(ui) => {
                self.run_ui(ui);
                true
            }
            None => false,
        };

        let outcome = FrameOutcome {
            passes: plan.passes().to_vec(),
            draws: draws.len(),
            presented: true,
        };
        if self.frames.len() >= self.keep {
            self.frames.remove(0);
        }
        self.frames.push(FrameRecord {
            passes: outcome.passes.clone(),
            draws,
            debug_lines: frame.debug_lines.map_or(0, <[DebugLine]>::len),
            ui_invoked,
            camera: frame.camera,
            zoom: frame.zoom,
            time: frame.time,
        });
        tracing::trace!(draws = outcome.draws, "recorded frame");
        outcome
    }

    fn render_size(&self) -> (u32, u32) {
        (self.settings.width, self.settings.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;
    use kestrel_assets::{MeshData, Vertex};
    use kestrel_ecs::MeshComponent;

    fn scene() -> (World, MeshLibrary) {
        let mut world = World::new();
        let id = world.create_object("cube");
        world.insert(id, MeshComponent::new("cube"));
        let mut meshes = MeshLibrary::new();
        meshes
            .insert(MeshData {
                name: "cube".into(),
                vertices: vec![
                    Vertex {
                        position: [0.0; 3],
                        normal: [0.0, 0.0, 1.0],
                        color: [1.0; 3],
                        uv: [0.0; 2],
                    };
                    3
                ],
            })
            .unwrap();
        (world, meshes)
    }

    fn input<'a>(world: &'a World, meshes: &'a MeshLibrary, lines: Option<&'a [DebugLine]>) -> FrameInput<'a> {
        FrameInput {
            world,
            meshes,
            camera: CameraMatrices::default(),
            alpha: 0.0,
            debug_lines: lines,
            time: 1.5,
            zoom: ZoomState::default(),
        }
    }

    #[test]
    fn records_plan_and_draws() {
        let (world, meshes) = scene();
        let mut renderer = RecordingRenderer::new(RenderSettings::default());
        let outcome = renderer.render(&input(&world, &meshes, None), None);
        assert_eq!(outcome.draws, 1);
        assert!(outcome.presented);
        assert_eq!(
            outcome.passes,
            vec![
                PassKind::Silhouette,
                PassKind::MainColor,
                PassKind::OutlineCompose,
                PassKind::Present
            ]
        );
        assert!(!renderer.last().unwrap().ui_invoked);
    }

    #[test]
    fn ui_callback_runs_once_at_render_resolution() {
        let (world, meshes) = scene();
        let mut renderer = RecordingRenderer::new(RenderSettings::default());
        let mut calls = 0;
        let mut width = 0.0;
        let mut ui = |ctx: &egui::Context| {
            calls += 1;
            width = ctx.screen_rect().width();
        };
        let lines = [DebugLine::new(glam::Vec3::ZERO, glam::Vec3::X, Vec4::ONE)];
        let outcome = renderer.render(&input(&world, &meshes, Some(&lines)), Some(&mut ui));
        assert_eq!(calls, 1);
        assert_eq!(width, 640.0);
        assert_eq!(outcome.passes, PassKind::ORDER.to_vec());
        assert_eq!(renderer.last().unwrap().debug_lines, 1);
    }

    #[test]
    fn history_is_bounded() {
        let (world, meshes) = scene();
        let mut renderer = RecordingRenderer::new(RenderSettings::default()).with_history(2);
        for _ in 0..5 {
            renderer.render(&input(&world, &meshes, None), None);
        }
        assert_eq!(renderer.frames().len(), 2);
        assert_eq!(renderer.render_size(), (640, 360));
    }
}
