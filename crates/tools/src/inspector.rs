use glam::Vec3;
use kestrel_common::ObjectId;
use kestrel_ecs::{Animator, Camera, Collider, MeshComponent, Rigidbody, World};
use kestrel_physics::{CollisionSystem, MotionType};

/// Read-only queries against a scene for debugging and development UI.
pub struct SceneInspector;

impl SceneInspector {
    pub fn summary(world: &World, physics: Option<&CollisionSystem>) -> SceneSummary {
        SceneSummary {
            objects: world.object_count(),
            active: world.objects().filter(|(_, o)| o.active).count(),
            meshes: world.ids_with::<MeshComponent>().len(),
            colliders: world.ids_with::<Collider>().len(),
            rigidbodies: world.ids_with::<Rigidbody>().len(),
            cameras: world.ids_with::<Camera>().len(),
            behaviours: world.behaviour_count(),
            bodies: physics.map_or(0, CollisionSystem::body_count),
        }
    }

    pub fn inspect_object(
        world: &World,
        physics: Option<&CollisionSystem>,
        id: ObjectId,
    ) -> Option<ObjectInfo> {
        let object = world.object(id)?;
        let mut components = Vec::new();
        if world.has::<MeshComponent>(id) {
            components.push("mesh");
        }
        if world.has::<Collider>(id) {
            components.push("collider");
        }
        if world.has::<Rigidbody>(id) {
            components.push("rigidbody");
        }
        if world.has::<Camera>(id) {
            components.push("camera");
        }
        if world.has::<Animator>(id) {
            components.push("animator");
        }
        Some(ObjectInfo {
            id,
            name: object.name.clone(),
            active: object.active,
            position: object.transform.position,
            rotation: object.transform.rotation,
            scale: object.transform.scale,
            parent: object.parent().and_then(|p| world.object(p)).map(|p| p.name.clone()),
            children: object.children().len(),
            components,
            motion: physics.and_then(|p| p.motion_type(id)),
            grounded: world.get::<Rigidbody>(id).map(|rb| rb.is_grounded),
        })
    }

    /// Every object, in creation order.
    pub fn list_objects(world: &World, physics: Option<&CollisionSystem>) -> Vec<ObjectInfo> {
        world
            .object_ids()
            .into_iter()
            .filter_map(|id| Self::inspect_object(world, physics, id))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneSummary {
    pub objects: usize,
    pub active: usize,
    pub meshes: usize,
    pub colliders: usize,
    pub rigidbodies: usize,
    pub cameras: usize,
    pub behaviours: usize,
    pub bodies: usize,
}

impl std::fmt::Display for SceneSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Scene: objects={} active={} meshes={} colliders={} rigidbodies={} cameras={} behaviours={} bodies={}",
            self.objects,
            self.active,
            self.meshes,
            self.colliders,
            self.rigidbodies,
            self.cameras,
            self.behaviours,
            self.bodies
        )
    }
}

/// Detailed info about a single object.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    pub id: ObjectId,
    pub name: String,
    pub active: bool,
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
    pub parent: Option<String>,
    pub children: usize,
    pub components: Vec<&'static str>,
    pub motion: Option<MotionType>,
    pub grounded: Option<bool>,
}

impl std::fmt::Display for ObjectInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{} pos=({:.2}, {:.2}, {:.2}) scale=({:.2}, {:.2}, {:.2}) [{}]",
            self.name,
            if self.active { "" } else { " (inactive)" },
            self.position.x,
            self.position.y,
            self.position.z,
            self.scale.x,
            self.scale.y,
            self.scale.z,
            self.components.join(", "),
        )?;
        if let Some(motion) = self.motion {
            write!(f, " {motion:?}")?;
        }
        if self.grounded == Some(true) {
            f.write_str(" grounded")?;
        }
        Ok(())
    }
}
