use kestrel_assets::MeshLibrary;
use kestrel_ecs::World;
use kestrel_physics::{CollisionSystem, PhysicsSettings};

/// Content hooks for a scene.
pub trait SceneScript {
    /// Build the scene's objects. Runs before the collision system is
    /// initialized, so every collider created here gets a body.
    fn on_load(&mut self, _world: &mut World, _meshes: &mut MeshLibrary) {}

    /// Runs after the collision system is cleared and before objects are
    /// destroyed.
    fn on_unload(&mut self, _world: &mut World) {}
}

/// A world together with the collision system simulating it. The scene owns
/// both exclusively.
pub struct Scene {
    name: String,
    world: World,
    collision: CollisionSystem,
    script: Option<Box<dyn SceneScript>>,
    loaded: bool,
}

impl Scene {
    pub fn new(name: impl Into<String>, physics: PhysicsSettings) -> Self {
        Self {
            name: name.into(),
            world: World::new(),
            collision: CollisionSystem::new(physics),
            script: None,
            loaded: false,
        }
    }

    pub fn with_script(
        name: impl Into<String>,
        physics: PhysicsSettings,
        script: impl SceneScript + 'static,
    ) -> Self {
        let mut scene = Self::new(name, physics);
        scene.script = Some(Box::new(script));
        scene
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Run the script's `on_load` and create bodies for every collider.
    /// Returns the number of bodies created. Loading twice is a no-op.
    pub fn load(&mut self, meshes: &mut MeshLibrary) -> usize {
        if self.loaded {
            return 0;
        }
        if let Some(script) = self.script.as_mut() {
            script.on_load(&mut self.world, meshes);
        }
        let bodies = self.collision.initialize(&mut self.world);
        self.loaded = true;
        tracing::info!(
            scene = %self.name,
            objects = self.world.object_count(),
            bodies,
            "scene loaded"
        );
        bodies
    }

    /// Tear the scene down: collision bodies first, then the script's
    /// `on_unload`, then every object with its behaviours' `on_destroy`.
    pub fn unload(&mut self) {
        if !self.loaded {
            return;
        }
        self.collision.clear();
        if let Some(script) = self.script.as_mut() {
            script.on_unload(&mut self.world);
        }
        self.world.teardown();
        self.loaded = false;
        tracing::info!(scene = %self.name, "scene unloaded");
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn collision(&self) -> &CollisionSystem {
        &self.collision
    }

    pub fn collision_mut(&mut self) -> &mut CollisionSystem {
        &mut self.collision
    }

    /// Both halves at once, for code that steps physics against the world.
    pub fn parts_mut(&mut self) -> (&mut World, &mut CollisionSystem) {
        (&mut self.world, &mut self.collision)
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        self.unload();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use kestrel_common::Transform;
    use kestrel_ecs::{Behaviour, BehaviourContext, Collider};
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Script {
        log: Log,
    }

    impl SceneScript for Script {
        fn on_load(&mut self, world: &mut World, _meshes: &mut MeshLibrary) {
            let ground = world.create_object("ground");
            world.insert(ground, Collider::cuboid(Vec3::new(10.0, 10.0, 1.0)));
            let probe = world.spawn("probe", Transform::from_position(Vec3::Z));
            world.add_behaviour(probe, Probe { log: self.log.clone() });
            self.log.borrow_mut().push("load".into());
        }

        fn on_unload(&mut self, world: &mut World) {
            let objects = world.object_count();
            self.log.borrow_mut().push(format!("unload:{objects}"));
        }
    }

    struct Probe {
        log: Log,
    }

    impl Behaviour for Probe {
        fn on_destroy(&mut self, _cx: &mut BehaviourContext<'_>) {
            self.log.borrow_mut().push("destroy".into());
        }
    }

    fn scripted(log: &Log) -> Scene {
        Scene::with_script(
            "test",
            PhysicsSettings::default(),
            Script { log: log.clone() },
        )
    }

    #[test]
    fn load_builds_objects_and_bodies_once() {
        let log = Log::default();
        let mut scene = scripted(&log);
        let mut meshes = MeshLibrary::new();
        assert_eq!(scene.load(&mut meshes), 1);
        assert_eq!(scene.load(&mut meshes), 0);
        assert!(scene.is_loaded());
        assert_eq!(scene.world().object_count(), 2);
        assert_eq!(scene.collision().body_count(), 1);
        assert_eq!(*log.borrow(), vec!["load"]);
    }

    #[test]
    fn unload_clears_physics_then_script_then_objects() {
        let log = Log::default();
        let mut scene = scripted(&log);
        scene.load(&mut MeshLibrary::new());
        scene.unload();
        assert_eq!(*log.borrow(), vec!["load", "unload:2", "destroy"]);
        assert_eq!(scene.collision().body_count(), 0);
        assert_eq!(scene.world().object_count(), 0);
        scene.unload();
        assert_eq!(log.borrow().len(), 3);
    }

    #[test]
    fn dropping_a_loaded_scene_unloads_it() {
        let log = Log::default();
        {
            let mut scene = scripted(&log);
            scene.load(&mut MeshLibrary::new());
        }
        assert_eq!(log.borrow().last().map(String::as_str), Some("destroy"));
    }

    #[test]
    fn unloaded_scene_drops_quietly() {
        let log = Log::default();
        drop(scripted(&log));
        assert!(log.borrow().is_empty());
    }
}
