//! The sandbox game run by the desktop host.

use glam::{Vec3, Vec4};
use kestrel_assets::{MeshData, MeshLibrary, ObjModel};
use kestrel_common::{CollisionLayers, ObjectId, Transform};
use kestrel_ecs::{
    Behaviour, BehaviourContext, Camera, Collider, MeshComponent, Rigidbody, World,
};
use kestrel_input::KeyCode;
use kestrel_kernel::{EngineContext, Game, Scene, SceneScript};
use kestrel_tools::SceneInspector;

const CUBE_OBJ: &str = include_str!("../../../assets/models/cube.obj");
const BALL_OBJ: &str = include_str!("../../../assets/models/ball.obj");

const MOVE_SPEED: f32 = 6.0;
const JUMP_SPEED: f32 = 12.0;
const ZOOM_STEP: f32 = 1.25;

fn load_builtin(meshes: &mut MeshLibrary, name: &str, source: &str) {
    if meshes.contains(name) {
        return;
    }
    let result = ObjModel::parse(source).and_then(|model| meshes.insert(MeshData::from_obj(name, &model)));
    if let Err(e) = result {
        tracing::warn!(mesh = name, "failed to load built-in mesh: {e}");
    }
}

/// Turns its owner about Z at a fixed rate.
pub struct Spinner {
    pub speed: f32,
}

impl Behaviour for Spinner {
    fn on_update(&mut self, cx: &mut BehaviourContext<'_>, dt: f32) {
        if let Some(object) = cx.world.object_mut(cx.owner) {
            object.transform.rotation.z += self.speed * dt;
        }
    }
}

/// Logs what its owner bumps into and tints it while touching something.
pub struct ContactTint {
    pub touching: usize,
    pub idle: Vec4,
    pub hit: Vec4,
}

impl ContactTint {
    fn apply(&self, cx: &mut BehaviourContext<'_>) {
        let color = if self.touching > 0 { self.hit } else { self.idle };
        if let Some(mesh) = cx.world.get_mut::<MeshComponent>(cx.owner) {
            mesh.color = color;
        }
    }
}

impl Behaviour for ContactTint {
    fn on_collision_enter(&mut self, cx: &mut BehaviourContext<'_>, other: ObjectId) {
        self.touching += 1;
        let name = cx.world.object(other).map(|o| o.name.clone()).unwrap_or_default();
        tracing::info!(other = %name, "contact");
        self.apply(cx);
    }

    fn on_collision_exit(&mut self, cx: &mut BehaviourContext<'_>, _other: ObjectId) {
        self.touching = self.touching.saturating_sub(1);
        self.apply(cx);
    }
}

/// Ground, a controllable cube, a ball dropped from above and a spinning
/// pillar, watched by an orthographic camera.
pub struct Sandbox;

impl SceneScript for Sandbox {
    fn on_load(&mut self, world: &mut World, meshes: &mut MeshLibrary) {
        load_builtin(meshes, "cube", CUBE_OBJ);
        load_builtin(meshes, "ball", BALL_OBJ);

        let camera = world.spawn(
            "camera",
            Transform {
                rotation: Vec3::new(-1.0, 0.0, -0.6),
                ..Transform::default()
            },
        );
        world.insert(camera, Camera::default());

        let ground = world.spawn(
            "ground",
            Transform {
                position: Vec3::new(0.0, 0.0, -0.5),
                scale: Vec3::new(20.0, 20.0, 1.0),
                ..Transform::default()
            },
        );
        world.insert(
            ground,
            MeshComponent::new("cube").with_color(Vec4::new(0.35, 0.45, 0.3, 1.0)),
        );
        world.insert(
            ground,
            Collider::cuboid(Vec3::new(20.0, 20.0, 1.0)).with_layer(CollisionLayers::GROUND),
        );

        let player = world.spawn("player", Transform::from_position(Vec3::new(0.0, 0.0, 0.5)));
        world.insert(
            player,
            MeshComponent::new("cube").with_color(Vec4::new(0.9, 0.6, 0.2, 1.0)),
        );
        world.insert(
            player,
            Collider::cuboid(Vec3::ONE).with_layer(CollisionLayers::PLAYER),
        );
        world.insert(player, Rigidbody::default());

        let ball = world.spawn("ball", Transform::from_position(Vec3::new(3.0, 2.0, 8.0)));
        let ball_color = Vec4::new(0.3, 0.5, 0.9, 1.0);
        world.insert(ball, MeshComponent::new("ball").with_color(ball_color));
        world.insert(
            ball,
            Collider::sphere(0.5).with_layer(CollisionLayers::ENEMY),
        );
        world.insert(ball, Rigidbody::default().with_mass(0.5));
        world.add_behaviour(
            ball,
            ContactTint {
                touching: 0,
                idle: ball_color,
                hit: Vec4::new(0.9, 0.2, 0.2, 1.0),
            },
        );

        let pillar = world.spawn(
            "pillar",
            Transform {
                position: Vec3::new(-4.0, -2.0, 1.0),
                scale: Vec3::new(1.0, 1.0, 2.0),
                ..Transform::default()
            },
        );
        world.insert(pillar, MeshComponent::new("cube"));
        world.insert(
            pillar,
            Collider::cuboid(Vec3::new(1.0, 1.0, 2.0)).with_layer(CollisionLayers::WALL),
        );
        world.insert(pillar, Rigidbody::kinematic());
        world.add_behaviour(pillar, Spinner { speed: 1.5 });
    }

    fn on_unload(&mut self, world: &mut World) {
        tracing::debug!(objects = world.object_count(), "unloading sandbox");
    }
}

/// Player movement, zoom and debug hotkeys plus the HUD.
pub struct SandboxGame {
    player: Option<ObjectId>,
    show_hud: bool,
}

impl SandboxGame {
    pub fn new() -> Self {
        Self {
            player: None,
            show_hud: true,
        }
    }

    fn handle_hotkeys(&mut self, cx: &mut EngineContext) {
        if cx.input.is_key_pressed(KeyCode::Escape) {
            cx.request_quit();
        }
        if cx.input.is_key_pressed(KeyCode::KeyH) {
            self.show_hud = !self.show_hud;
        }
        if cx.input.is_key_pressed(KeyCode::KeyE) {
            cx.zoom.set_zoom(cx.zoom.zoom() * ZOOM_STEP);
        }
        if cx.input.is_key_pressed(KeyCode::KeyQ) {
            cx.zoom.set_zoom((cx.zoom.zoom() / ZOOM_STEP).max(1.0));
        }
        if cx.input.is_key_pressed(KeyCode::F1) {
            if let Some(scene) = cx.scene_mut() {
                let collision = scene.collision_mut();
                collision.set_debug_draw(!collision.debug_draw_enabled());
            }
        }
        if cx.input.is_key_pressed(KeyCode::KeyR) {
            self.reload(cx);
        }
    }

    fn reload(&mut self, cx: &mut EngineContext) {
        cx.load_scene(Scene::with_script("sandbox", cx.config.physics, Sandbox));
        self.player = cx.scene().and_then(|scene| scene.world().find("player"));
    }

    fn drive_player(&mut self, cx: &mut EngineContext) {
        let axis = cx.input.movement_axis();
        let jump = cx.input.is_key_pressed(KeyCode::Space);
        let (Some(player), Some(scene)) = (self.player, cx.scene_mut()) else {
            return;
        };
        let (world, collision) = scene.parts_mut();
        let grounded = collision.check_grounded(world, player, 0.1);
        let Some(rb) = world.get_mut::<Rigidbody>(player) else {
            return;
        };
        // screen up is +y in the world
        let planar = Vec3::new(axis.x, -axis.y, 0.0).normalize_or_zero() * MOVE_SPEED;
        rb.velocity.x = planar.x;
        rb.velocity.y = planar.y;
        if jump && grounded {
            rb.velocity.z = JUMP_SPEED;
        }
    }
}

impl Default for SandboxGame {
    fn default() -> Self {
        Self::new()
    }
}

impl Game for SandboxGame {
    fn on_init(&mut self, cx: &mut EngineContext) {
        self.reload(cx);
    }

    fn on_update(&mut self, cx: &mut EngineContext, _dt: f32) {
        self.handle_hotkeys(cx);
        self.drive_player(cx);
    }

    fn on_shutdown(&mut self, cx: &mut EngineContext) {
        tracing::info!(frames = cx.frame(), "sandbox closing");
    }

    fn draws_ui(&self) -> bool {
        self.show_hud
    }

    fn on_render_ui(&mut self, ui: &egui::Context, cx: &EngineContext) {
        let Some(scene) = cx.scene() else {
            return;
        };
        let summary = SceneInspector::summary(scene.world(), Some(scene.collision()));
        let player = self
            .player
            .and_then(|id| SceneInspector::inspect_object(scene.world(), Some(scene.collision()), id));

        egui::Window::new("kestrel")
            .default_pos([8.0, 8.0])
            .resizable(false)
            .show(ui, |ui| {
                ui.label(format!("frame {}  t={:.1}s", cx.frame(), cx.time()));
                ui.label(format!("zoom {:.2}x", cx.zoom.zoom()));
                ui.separator();
                ui.label(format!("objects {}  bodies {}", summary.objects, summary.bodies));
                ui.label(format!("behaviours {}", summary.behaviours));
                if let Some(player) = player {
                    ui.separator();
                    ui.label(format!(
                        "player ({:.1}, {:.1}, {:.1})",
                        player.position.x, player.position.y, player.position.z
                    ));
                    ui.label(format!("grounded {}", player.grounded.unwrap_or(false)));
                }
                ui.separator();
                ui.small("WASD move | Space jump | Q/E zoom | F1 debug | R reset | H hud");
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_kernel::{Engine, EngineConfig};
    use kestrel_render::{FrameRenderer, PassKind, RecordingRenderer};

    #[test]
    fn builtin_meshes_parse() {
        let mut meshes = MeshLibrary::new();
        load_builtin(&mut meshes, "cube", CUBE_OBJ);
        load_builtin(&mut meshes, "ball", BALL_OBJ);
        assert_eq!(meshes.require("cube").unwrap().vertex_count(), 36);
        assert_eq!(meshes.require("ball").unwrap().vertex_count(), 24);
    }

    #[test]
    fn ball_comes_to_rest_on_the_ground() {
        let config = EngineConfig::default();
        let mut renderer = RecordingRenderer::new(config.render.clone()).with_history(1);
        let mut engine = Engine::new(config, SandboxGame::new());
        for _ in 0..300 {
            engine.frame(1.0 / 60.0, Some(&mut renderer as &mut dyn FrameRenderer));
        }

        let scene = engine.context().scene().unwrap();
        let ball = scene.world().find("ball").unwrap();
        let z = scene.world().position(ball).unwrap().z;
        assert!((0.3..0.8).contains(&z), "ball at z={z}");

        let frame = renderer.last().unwrap();
        assert_eq!(frame.draws.len(), 4);
        assert!(frame.passes.contains(&PassKind::UiOverlay));
        assert!(frame.ui_invoked);
    }

    #[test]
    fn hud_toggle_drops_the_ui_pass() {
        let config = EngineConfig::default();
        let mut renderer = RecordingRenderer::new(config.render.clone());
        let mut engine = Engine::new(config, SandboxGame::new());
        engine.context_mut().input.handle_key(KeyCode::KeyH, true);
        engine.frame(1.0 / 60.0, Some(&mut renderer as &mut dyn FrameRenderer));
        engine.frame(1.0 / 60.0, Some(&mut renderer as &mut dyn FrameRenderer));
        assert!(!renderer.last().unwrap().passes.contains(&PassKind::UiOverlay));
    }
}
