use crate::clock::{FixedStepClock, TimeConfig};
use crate::context::EngineContext;
use crate::engine::Game;
use kestrel_ecs::{Rigidbody, World};
use kestrel_render::{FrameInput, FrameOutcome, FrameRenderer};

/// What happened during one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    /// Delta actually used, after the fallback for stalled clocks.
    pub delta: f32,
    pub fixed_steps: u32,
    pub alpha: f32,
    /// Contact notifications delivered during the fixed steps.
    pub contacts: usize,
    /// `None` when no renderer was given or there was nothing to look through.
    pub rendered: Option<FrameOutcome>,
}

#[derive(Clone, Copy)]
enum Snapshot {
    Previous,
    Current,
}

/// Record the position of every enabled, simulated rigidbody's owner.
fn snapshot_positions(world: &mut World, slot: Snapshot) {
    for id in world.ids_with::<Rigidbody>() {
        let Some(position) = world.position(id) else {
            continue;
        };
        let Some(rb) = world
            .get_mut::<Rigidbody>(id)
            .filter(|rb| rb.enabled && !rb.is_kinematic)
        else {
            continue;
        };
        match slot {
            Snapshot::Previous => rb.previous_position = position,
            Snapshot::Current => rb.current_position = position,
        }
    }
}

/// Drives one frame: variable update, fixed physics steps, interpolated
/// render.
pub struct FrameScheduler {
    clock: FixedStepClock,
    frame: u64,
}

impl FrameScheduler {
    pub fn new(time: TimeConfig) -> Self {
        Self {
            clock: FixedStepClock::new(time),
            frame: 0,
        }
    }

    pub fn clock(&self) -> &FixedStepClock {
        &self.clock
    }

    pub fn frames(&self) -> u64 {
        self.frame
    }

    /// Run a frame of `dt` seconds. Input must already have been fed into
    /// `cx.input`; its per-frame edges are cleared at the end.
    pub fn run(
        &mut self,
        cx: &mut EngineContext,
        game: &mut dyn Game,
        dt: f32,
        renderer: Option<&mut dyn FrameRenderer>,
    ) -> FrameReport {
        let dt = self.clock.begin_frame(dt);
        cx.set_clock(self.clock.elapsed(), self.frame);

        game.on_update(cx, dt);
        if let Some(scene) = cx.scene_mut() {
            let world = scene.world_mut();
            world.run_update(dt);
            world.update_animators(dt);
        }

        let step = self.clock.fixed_time_step();
        let mut fixed_steps = 0;
        let mut contacts = 0;
        while self.clock.next_step() {
            fixed_steps += 1;
            let Some(scene) = cx.scene_mut() else {
                continue;
            };
            let (world, collision) = scene.parts_mut();
            snapshot_positions(world, Snapshot::Previous);
            world.run_fixed_update(step);
            let events = collision.step(world, step);
            world.dispatch_contacts(&events);
            snapshot_positions(world, Snapshot::Current);
            contacts += events.len();
        }
        let alpha = self.clock.alpha();

        let rendered = renderer.and_then(|r| Self::render(cx, game, alpha, r));
        cx.input.end_frame();

        let report = FrameReport {
            frame: self.frame,
            delta: dt,
            fixed_steps,
            alpha,
            contacts,
            rendered,
        };
        tracing::trace!(
            frame = report.frame,
            dt,
            steps = fixed_steps,
            alpha,
            "frame complete"
        );
        self.frame += 1;
        report
    }

    fn render(
        cx: &mut EngineContext,
        game: &mut dyn Game,
        alpha: f32,
        renderer: &mut dyn FrameRenderer,
    ) -> Option<FrameOutcome> {
        let (width, height) = renderer.render_size();
        let aspect = width as f32 / height.max(1) as f32;
        let Some(camera) = cx.camera_matrices(aspect) else {
            tracing::trace!("no scene or camera, skipping render");
            return None;
        };
        let debug_lines = cx
            .scene_mut()
            .filter(|s| s.collision().debug_draw_enabled())
            .map(|s| s.collision_mut().debug_lines());

        let cx: &EngineContext = cx;
        let scene = cx.scene()?;
        let frame = FrameInput {
            world: scene.world(),
            meshes: &cx.meshes,
            camera,
            alpha,
            debug_lines: debug_lines.as_deref(),
            time: cx.time() as f32,
            zoom: cx.zoom,
        };
        let outcome = if game.draws_ui() {
            let mut ui = |ctx: &egui::Context| game.on_render_ui(ctx, cx);
            renderer.render(&frame, Some(&mut ui))
        } else {
            renderer.render(&frame, None)
        };
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use kestrel_common::Transform;

    #[test]
    fn snapshots_skip_kinematic_and_disabled_bodies() {
        let mut world = World::new();
        let ball = world.spawn("ball", Transform::from_position(Vec3::new(0.0, 0.0, 3.0)));
        world.insert(ball, Rigidbody::default());
        let lift = world.spawn("lift", Transform::from_position(Vec3::new(0.0, 0.0, 7.0)));
        world.insert(lift, Rigidbody::kinematic());
        let off = world.spawn("off", Transform::from_position(Vec3::new(0.0, 0.0, 9.0)));
        let mut rb = Rigidbody::default();
        rb.enabled = false;
        world.insert(off, rb);

        snapshot_positions(&mut world, Snapshot::Previous);
        world.set_position(ball, Vec3::new(0.0, 0.0, 2.0));
        snapshot_positions(&mut world, Snapshot::Current);

        let ball_rb = world.get::<Rigidbody>(ball).unwrap();
        assert_eq!(ball_rb.previous_position.z, 3.0);
        assert_eq!(ball_rb.current_position.z, 2.0);
        assert_eq!(world.get::<Rigidbody>(lift).unwrap().previous_position, Vec3::ZERO);
        assert_eq!(world.get::<Rigidbody>(off).unwrap().current_position, Vec3::ZERO);
    }
}
