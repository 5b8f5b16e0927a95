//! Sphere-on-ground drop, run headless.

use glam::{Vec3, Vec4};
use kestrel_assets::{MeshData, MeshLibrary, ObjModel};
use kestrel_common::{CollisionLayers, ObjectId, Transform};
use kestrel_ecs::{Behaviour, BehaviourContext, Camera, Collider, MeshComponent, Rigidbody, World};
use kestrel_kernel::{EngineContext, Game, Scene, SceneScript};
use std::cell::Cell;
use std::rc::Rc;

const BALL_OBJ: &str = include_str!("../../../assets/models/ball.obj");
const CUBE_OBJ: &str = include_str!("../../../assets/models/cube.obj");

/// Counts collision-enter notifications on its owner.
struct ImpactCounter(Rc<Cell<u32>>);

impl Behaviour for ImpactCounter {
    fn on_collision_enter(&mut self, cx: &mut BehaviourContext<'_>, _other: ObjectId) {
        self.0.set(self.0.get() + 1);
        let z = cx.world.position(cx.owner).map_or(0.0, |p| p.z);
        tracing::debug!(z, "impact");
    }
}

struct DropScene {
    height: f32,
    radius: f32,
    impacts: Rc<Cell<u32>>,
}

impl SceneScript for DropScene {
    fn on_load(&mut self, world: &mut World, meshes: &mut MeshLibrary) {
        for (name, source) in [("ball", BALL_OBJ), ("cube", CUBE_OBJ)] {
            if meshes.contains(name) {
                continue;
            }
            let loaded = ObjModel::parse(source)
                .and_then(|model| meshes.insert(MeshData::from_obj(name, &model)));
            if let Err(e) = loaded {
                tracing::warn!(mesh = name, "{e}");
            }
        }

        let camera = world.create_object("camera");
        world.insert(camera, Camera::default());

        let ground = world.spawn(
            "ground",
            Transform {
                position: Vec3::new(0.0, 0.0, -0.5),
                scale: Vec3::new(10.0, 10.0, 1.0),
                ..Transform::default()
            },
        );
        world.insert(ground, MeshComponent::new("cube"));
        world.insert(
            ground,
            Collider::cuboid(Vec3::new(10.0, 10.0, 1.0)).with_layer(CollisionLayers::GROUND),
        );

        let ball = world.spawn(
            "ball",
            Transform {
                position: Vec3::new(0.0, 0.0, self.height),
                scale: Vec3::splat(self.radius * 2.0),
                ..Transform::default()
            },
        );
        world.insert(
            ball,
            MeshComponent::new("ball").with_color(Vec4::new(0.3, 0.5, 0.9, 1.0)),
        );
        world.insert(
            ball,
            Collider::sphere(self.radius).with_layer(CollisionLayers::PLAYER),
        );
        world.insert(ball, Rigidbody::default());
        world.add_behaviour(ball, ImpactCounter(self.impacts.clone()));
    }
}

/// Loads the drop scene and records the ball's state each frame.
pub struct DropGame {
    pub height: f32,
    pub radius: f32,
    pub debug_draw: bool,
    pub impacts: Rc<Cell<u32>>,
    ball: Option<ObjectId>,
}

/// Ball state after a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BallSample {
    pub z: f32,
    pub velocity_z: f32,
    pub grounded: bool,
}

impl DropGame {
    pub fn new(height: f32, radius: f32) -> Self {
        Self {
            height,
            radius,
            debug_draw: false,
            impacts: Rc::new(Cell::new(0)),
            ball: None,
        }
    }

    pub fn sample(&self, cx: &EngineContext) -> Option<BallSample> {
        let world = cx.scene()?.world();
        let ball = self.ball?;
        let rb = world.get::<Rigidbody>(ball)?;
        Some(BallSample {
            z: world.position(ball)?.z,
            velocity_z: rb.velocity.z,
            grounded: rb.is_grounded,
        })
    }
}

impl Game for DropGame {
    fn on_init(&mut self, cx: &mut EngineContext) {
        let script = DropScene {
            height: self.height,
            radius: self.radius,
            impacts: self.impacts.clone(),
        };
        cx.load_scene(Scene::with_script("drop", cx.config.physics, script));
        if let Some(scene) = cx.scene_mut() {
            scene.collision_mut().set_debug_draw(self.debug_draw);
            self.ball = scene.world().find("ball");
        }
    }
}
