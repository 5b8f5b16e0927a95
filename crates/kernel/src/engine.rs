use crate::config::EngineConfig;
use crate::context::EngineContext;
use crate::scheduler::{FrameReport, FrameScheduler};
use kestrel_render::FrameRenderer;
use std::time::Instant;

/// Game-level hooks. Every hook has an empty default.
pub trait Game {
    /// Runs once before the first frame; usually loads the first scene.
    fn on_init(&mut self, _cx: &mut EngineContext) {}

    /// Variable-rate update, before any behaviour's `on_update`.
    fn on_update(&mut self, _cx: &mut EngineContext, _dt: f32) {}

    fn on_shutdown(&mut self, _cx: &mut EngineContext) {}

    /// Whether [`on_render_ui`](Self::on_render_ui) should run. Frames
    /// without UI skip the overlay pass.
    fn draws_ui(&self) -> bool {
        false
    }

    /// Build the overlay. The context is sized to the render resolution.
    fn on_render_ui(&mut self, _ui: &egui::Context, _cx: &EngineContext) {}
}

/// Owns the game, its context and the frame scheduler.
pub struct Engine<G: Game> {
    cx: EngineContext,
    game: G,
    scheduler: FrameScheduler,
    last_frame: Option<Instant>,
    running: bool,
}

impl<G: Game> Engine<G> {
    pub fn new(config: EngineConfig, game: G) -> Self {
        let scheduler = FrameScheduler::new(config.time);
        Self {
            cx: EngineContext::new(config),
            game,
            scheduler,
            last_frame: None,
            running: false,
        }
    }

    pub fn init(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        self.game.on_init(&mut self.cx);
        tracing::info!(
            step = self.scheduler.clock().fixed_time_step(),
            "engine initialized"
        );
    }

    /// Run one frame with an explicit delta.
    pub fn frame(&mut self, dt: f32, renderer: Option<&mut dyn FrameRenderer>) -> FrameReport {
        if !self.running {
            self.init();
        }
        self.scheduler.run(&mut self.cx, &mut self.game, dt, renderer)
    }

    /// Run one frame, measuring the delta from the previous call. The first
    /// frame uses the fallback delta.
    pub fn frame_at(
        &mut self,
        now: Instant,
        renderer: Option<&mut dyn FrameRenderer>,
    ) -> FrameReport {
        let dt = self
            .last_frame
            .map_or(0.0, |last| now.saturating_duration_since(last).as_secs_f32());
        self.last_frame = Some(now);
        self.frame(dt, renderer)
    }

    /// Run the game's shutdown hook and unload the active scene.
    pub fn shutdown(&mut self) {
        if !self.running {
            return;
        }
        self.game.on_shutdown(&mut self.cx);
        self.cx.unload_scene();
        self.running = false;
        tracing::info!(frames = self.scheduler.frames(), "engine shut down");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn should_quit(&self) -> bool {
        self.cx.quit_requested()
    }

    pub fn context(&self) -> &EngineContext {
        &self.cx
    }

    pub fn context_mut(&mut self) -> &mut EngineContext {
        &mut self.cx
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut G {
        &mut self.game
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Scene, SceneScript};
    use glam::Vec3;
    use kestrel_assets::{MeshData, MeshLibrary, Vertex};
    use kestrel_common::{CollisionLayers, ObjectId, Transform};
    use kestrel_ecs::{
        Behaviour, BehaviourContext, Camera, Collider, MeshComponent, Rigidbody, World,
    };
    use kestrel_render::{PassKind, RecordingRenderer, RenderSettings};
    use std::cell::RefCell;
    use std::rc::Rc;

    const STEP: f32 = 1.0 / 60.0;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Tracer {
        log: Log,
    }

    impl Behaviour for Tracer {
        fn on_update(&mut self, _cx: &mut BehaviourContext<'_>, _dt: f32) {
            self.log.borrow_mut().push("behaviour:update".into());
        }

        fn on_fixed_update(&mut self, _cx: &mut BehaviourContext<'_>, _dt: f32) {
            self.log.borrow_mut().push("behaviour:fixed".into());
        }

        fn on_collision_enter(&mut self, _cx: &mut BehaviourContext<'_>, _other: ObjectId) {
            self.log.borrow_mut().push("behaviour:enter".into());
        }

        fn on_trigger_enter(&mut self, _cx: &mut BehaviourContext<'_>, _other: ObjectId) {
            self.log.borrow_mut().push("behaviour:trigger_enter".into());
        }

        fn on_trigger_exit(&mut self, _cx: &mut BehaviourContext<'_>, _other: ObjectId) {
            self.log.borrow_mut().push("behaviour:trigger_exit".into());
        }

        fn on_destroy(&mut self, _cx: &mut BehaviourContext<'_>) {
            self.log.borrow_mut().push("behaviour:destroy".into());
        }
    }

    #[derive(Debug, Clone, Copy)]
    struct Layers {
        ground: CollisionLayers,
        ball: CollisionLayers,
        ball_mask: CollisionLayers,
    }

    impl Default for Layers {
        fn default() -> Self {
            Self {
                ground: CollisionLayers::GROUND,
                ball: CollisionLayers::PLAYER,
                ball_mask: CollisionLayers::ALL,
            }
        }
    }

    /// Ground box, a falling ball with a tracer, an optional trigger zone the
    /// ball falls through, and an optional camera.
    struct DropScene {
        log: Log,
        camera: bool,
        zone: bool,
        layers: Layers,
    }

    impl SceneScript for DropScene {
        fn on_load(&mut self, world: &mut World, meshes: &mut MeshLibrary) {
            if !meshes.contains("ball") {
                meshes
                    .insert(MeshData {
                        name: "ball".into(),
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
            }
            let ground = world.create_object("ground");
            world.insert(
                ground,
                Collider::cuboid(Vec3::new(10.0, 10.0, 1.0)).with_layer(self.layers.ground),
            );
            let ball = world.spawn("ball", Transform::from_position(Vec3::new(0.0, 0.0, 5.5)));
            world.insert(
                ball,
                Collider::sphere(0.5)
                    .with_layer(self.layers.ball)
                    .with_mask(self.layers.ball_mask),
            );
            world.insert(ball, Rigidbody::default());
            world.insert(ball, MeshComponent::new("ball"));
            world.add_behaviour(ball, Tracer { log: self.log.clone() });
            if self.zone {
                let zone = world.spawn("zone", Transform::from_position(Vec3::new(0.0, 0.0, 3.0)));
                world.insert(
                    zone,
                    Collider::cuboid(Vec3::new(4.0, 4.0, 1.0))
                        .with_layer(CollisionLayers::TRIGGER)
                        .trigger(),
                );
            }
            if self.camera {
                let cam = world.create_object("camera");
                world.insert(cam, Camera::default());
            }
        }
    }

    #[derive(Default)]
    struct TestGame {
        log: Log,
        camera: bool,
        zone: bool,
        layers: Layers,
        ui: bool,
        ui_calls: usize,
        debug: bool,
    }

    impl Game for TestGame {
        fn on_init(&mut self, cx: &mut EngineContext) {
            self.log.borrow_mut().push("game:init".into());
            let scene = Scene::with_script(
                "drop",
                cx.config.physics,
                DropScene {
                    log: self.log.clone(),
                    camera: self.camera,
                    zone: self.zone,
                    layers: self.layers,
                },
            );
            cx.load_scene(scene);
            if let Some(scene) = cx.scene_mut() {
                scene.collision_mut().set_debug_draw(self.debug);
            }
        }

        fn on_update(&mut self, _cx: &mut EngineContext, _dt: f32) {
            self.log.borrow_mut().push("game:update".into());
        }

        fn on_shutdown(&mut self, _cx: &mut EngineContext) {
            self.log.borrow_mut().push("game:shutdown".into());
        }

        fn draws_ui(&self) -> bool {
            self.ui
        }

        fn on_render_ui(&mut self, _ui: &egui::Context, _cx: &EngineContext) {
            self.ui_calls += 1;
        }
    }

    fn start(game: TestGame) -> Engine<TestGame> {
        let mut engine = Engine::new(EngineConfig::default(), game);
        engine.init();
        engine
    }

    fn ball(engine: &Engine<TestGame>) -> (Vec3, Rigidbody) {
        let world = engine.context().scene().unwrap().world();
        let id = world.find("ball").unwrap();
        (world.position(id).unwrap(), world.get::<Rigidbody>(id).unwrap().clone())
    }

    #[test]
    fn update_runs_before_fixed_steps() {
        let log = Log::default();
        let mut engine = start(TestGame {
            log: log.clone(),
            ..TestGame::default()
        });
        let report = engine.frame(STEP * 2.0, None);
        assert_eq!(report.fixed_steps, 2);
        assert_eq!(
            *log.borrow(),
            vec![
                "game:init",
                "game:update",
                "behaviour:update",
                "behaviour:fixed",
                "behaviour:fixed"
            ]
        );
    }

    #[test]
    fn stalled_clock_uses_fallback_delta() {
        let mut engine = start(TestGame::default());
        for dt in [0.0, -1.0] {
            let report = engine.frame(dt, None);
            assert_eq!(report.delta, STEP);
            assert_eq!(report.fixed_steps, 1);
        }
    }

    #[test]
    fn ball_settles_on_ground_and_reports_contact() {
        let log = Log::default();
        let mut engine = start(TestGame {
            log: log.clone(),
            ..TestGame::default()
        });
        let mut contacts = 0;
        for _ in 0..180 {
            contacts += engine.frame(STEP, None).contacts;
        }
        let (position, rb) = ball(&engine);
        assert!(rb.is_grounded);
        assert!(rb.ground_normal.z > 0.9);
        assert!((position.z - 1.0).abs() < 0.1, "z = {}", position.z);
        assert!(contacts > 0);
        let log = log.borrow();
        assert_eq!(log.iter().filter(|e| *e == "behaviour:enter").count(), 1);
    }

    #[test]
    fn grounding_flips_when_the_ball_lands() {
        let mut engine = start(TestGame::default());
        let mut landed_at = None;
        for frame in 0..120 {
            engine.frame(STEP, None);
            let (_, rb) = ball(&engine);
            if rb.is_grounded {
                landed_at = Some(frame);
                break;
            }
        }
        // 4.5 units under gravity 30 takes about 33 frames
        let frame = landed_at.expect("ball never grounded");
        assert!(frame > 20, "grounded too early at frame {frame}");
    }

    #[test]
    fn falling_through_a_trigger_notifies_the_ball() {
        let log = Log::default();
        let mut engine = start(TestGame {
            log: log.clone(),
            zone: true,
            ..TestGame::default()
        });
        for _ in 0..120 {
            engine.frame(STEP, None);
        }
        let log = log.borrow();
        let count = |name: &str| log.iter().filter(|e| *e == name).count();
        assert_eq!(count("behaviour:trigger_enter"), 1);
        assert_eq!(count("behaviour:trigger_exit"), 1);
        assert_eq!(count("behaviour:enter"), 1);
        let (position, _) = ball(&engine);
        assert!((position.z - 1.0).abs() < 0.1, "z = {}", position.z);
    }

    #[test]
    fn shared_layer_outside_the_mask_never_collides() {
        let log = Log::default();
        let mut engine = start(TestGame {
            log: log.clone(),
            layers: Layers {
                ground: CollisionLayers::PLAYER,
                ball: CollisionLayers::PLAYER,
                ball_mask: CollisionLayers::GROUND,
            },
            ..TestGame::default()
        });
        let mut contacts = 0;
        for _ in 0..120 {
            contacts += engine.frame(STEP, None).contacts;
        }
        assert_eq!(contacts, 0);
        assert!(!log.borrow().iter().any(|e| e.starts_with("behaviour:enter")));
        let (position, rb) = ball(&engine);
        assert!(!rb.is_grounded);
        assert!(position.z < 0.0, "z = {}", position.z);
    }

    #[test]
    fn render_position_is_interpolated_between_steps() {
        let mut engine = start(TestGame {
            camera: true,
            ..TestGame::default()
        });
        let mut renderer = RecordingRenderer::new(RenderSettings::default());
        engine.frame(STEP, Some(&mut renderer));
        let report = engine.frame(STEP * 1.5, Some(&mut renderer));
        assert_eq!(report.fixed_steps, 1);
        assert!((report.alpha - 0.5).abs() < 1e-3);

        let (position, rb) = ball(&engine);
        assert!(rb.current_position.z < rb.previous_position.z);
        assert_eq!(rb.current_position, position);

        let draw = &renderer.last().unwrap().draws[0];
        let expected = rb.interpolated_position(report.alpha);
        assert!((draw.model.w_axis.truncate() - expected).length() < 1e-5);
        // the transform itself keeps the physics result
        assert!(position.z < draw.model.w_axis.z);
    }

    #[test]
    fn frames_without_camera_skip_render() {
        let mut engine = start(TestGame::default());
        let mut renderer = RecordingRenderer::new(RenderSettings::default());
        let report = engine.frame(STEP, Some(&mut renderer));
        assert!(report.rendered.is_none());
        assert_eq!(report.fixed_steps, 1);
        assert!(renderer.frames().is_empty());
    }

    #[test]
    fn debug_and_ui_passes_follow_flags() {
        let mut engine = start(TestGame {
            camera: true,
            ui: true,
            debug: true,
            ..TestGame::default()
        });
        let mut renderer = RecordingRenderer::new(RenderSettings::default());
        let report = engine.frame(STEP, Some(&mut renderer));
        let outcome = report.rendered.unwrap();
        assert_eq!(outcome.passes, PassKind::ORDER.to_vec());
        assert_eq!(outcome.draws, 1);
        assert_eq!(engine.game().ui_calls, 1);
        assert!(renderer.last().unwrap().debug_lines >= 24);

        let mut plain = start(TestGame {
            camera: true,
            ..TestGame::default()
        });
        let passes = plain.frame(STEP, Some(&mut renderer)).rendered.unwrap().passes;
        assert!(!passes.contains(&PassKind::Debug));
        assert!(!passes.contains(&PassKind::UiOverlay));
    }

    #[test]
    fn shutdown_unloads_the_scene() {
        let log = Log::default();
        let mut engine = start(TestGame {
            log: log.clone(),
            ..TestGame::default()
        });
        engine.frame(STEP, None);
        engine.shutdown();
        assert!(!engine.is_running());
        assert!(engine.context().scene().is_none());
        let log = log.borrow();
        let tail: Vec<&str> = log.iter().rev().take(2).map(String::as_str).collect();
        assert_eq!(tail, vec!["behaviour:destroy", "game:shutdown"]);
    }

    #[test]
    fn input_edges_last_one_frame() {
        let mut engine = start(TestGame::default());
        engine
            .context_mut()
            .input
            .handle_key(kestrel_input::KeyCode::Space, true);
        assert!(engine.context().input.is_key_pressed(kestrel_input::KeyCode::Space));
        engine.frame(STEP, None);
        assert!(!engine.context().input.is_key_pressed(kestrel_input::KeyCode::Space));
        assert!(engine.context().input.is_key_down(kestrel_input::KeyCode::Space));
    }
}
