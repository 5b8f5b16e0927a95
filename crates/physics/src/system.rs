use crate::PhysicsSettings;
use crate::contacts::{ContactTracker, StepEvents};
use crate::debug::DebugGeometry;
use crate::shapes::{build_shape, point_to_vec3, pose, to_vec3, to_vector};
use glam::{Mat4, Vec3};
use kestrel_common::{CollisionLayers, DebugLine, ObjectId};
use kestrel_ecs::{self as ecs, ContactEvent, World};
use rapier3d::prelude::*;
use slotmap::SecondaryMap;
use std::collections::HashMap;

/// How a body moves, derived from its object's components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionType {
    /// Collider without a rigidbody. Never moves.
    Static,
    /// Follows its object's transform; pushes others but is not pushed.
    Kinematic,
    /// Simulated; writes position and velocity back to its object.
    Dynamic,
}

impl MotionType {
    pub fn from_rigidbody(rigidbody: Option<&ecs::Rigidbody>) -> Self {
        match rigidbody {
            None => MotionType::Static,
            Some(rb) if rb.is_kinematic => MotionType::Kinematic,
            Some(_) => MotionType::Dynamic,
        }
    }
}

/// Closest hit of a ray query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    pub object: ObjectId,
    pub point: Vec3,
    pub normal: Vec3,
    pub distance: f32,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct BodyRecord {
    pub object: ObjectId,
    pub body: RigidBodyHandle,
    pub collider: ColliderHandle,
    pub motion: MotionType,
    pub center: Vec3,
}

const VELOCITY_EPSILON: f32 = 0.01;
const FORCE_EPSILON: f32 = 0.001;
const BODY_DAMPING: f32 = 0.05;

/// Owns the physics world and keeps it in step with a scene's colliders and
/// rigidbodies.
///
/// Each registered object gets exactly one body. Static and kinematic bodies
/// are driven by their object's transform; dynamic bodies drive it.
pub struct CollisionSystem {
    settings: PhysicsSettings,
    params: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd: CCDSolver,
    queries: QueryPipeline,
    records: SecondaryMap<ObjectId, BodyRecord>,
    owners: HashMap<ColliderHandle, ObjectId>,
    contacts: ContactTracker,
    step_events: StepEvents,
    debug: DebugGeometry,
    debug_draw: bool,
}

impl CollisionSystem {
    pub fn new(settings: PhysicsSettings) -> Self {
        Self {
            settings,
            params: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            queries: QueryPipeline::new(),
            records: SecondaryMap::new(),
            owners: HashMap::new(),
            contacts: ContactTracker::default(),
            step_events: StepEvents::default(),
            debug: DebugGeometry::default(),
            debug_draw: false,
        }
    }

    pub fn settings(&self) -> &PhysicsSettings {
        &self.settings
    }

    /// Create a body for every enabled collider in the world. Returns the
    /// number of bodies created.
    pub fn initialize(&mut self, world: &mut World) -> usize {
        let created = world
            .ids_with::<ecs::Collider>()
            .into_iter()
            .filter(|&id| self.register_collider(world, id))
            .count();
        self.queries.update(&self.colliders);
        tracing::info!(bodies = created, "collision system initialized");
        created
    }

    /// Create the body for one object's collider. Returns false if the object
    /// has no enabled collider or already has a body.
    pub fn register_collider(&mut self, world: &mut World, id: ObjectId) -> bool {
        if self.records.contains_key(id) {
            return false;
        }
        let Some(collider) = world.get::<ecs::Collider>(id).filter(|c| c.enabled).cloned() else {
            return false;
        };
        let Some(transform) = world.object(id).map(|o| o.transform) else {
            return false;
        };
        let Some(start) = world_pose(world, id, collider.center) else {
            return false;
        };
        let rigidbody = world.get::<ecs::Rigidbody>(id).cloned();
        let motion = MotionType::from_rigidbody(rigidbody.as_ref());

        let body = match (&rigidbody, motion) {
            (Some(rb), MotionType::Dynamic) => RigidBodyBuilder::dynamic()
                .linvel(to_vector(rb.velocity))
                .gravity_scale(if rb.use_gravity { 1.0 } else { 0.0 })
                .linear_damping(BODY_DAMPING)
                .angular_damping(BODY_DAMPING)
                .lock_rotations()
                .ccd_enabled(true)
                .can_sleep(false),
            (_, MotionType::Kinematic) => RigidBodyBuilder::kinematic_position_based(),
            _ => RigidBodyBuilder::fixed(),
        }
        .position(start)
        .build();

        let groups = InteractionGroups::new(
            Group::from_bits_truncate(collider.layer.bits()),
            Group::from_bits_truncate(collider.mask.bits()),
        );
        let mut builder = ColliderBuilder::new(build_shape(&collider.shape))
            .collision_groups(groups)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .sensor(collider.is_trigger);
        if collider.is_trigger {
            builder = builder.active_collision_types(ActiveCollisionTypes::all());
        }
        builder = match &rigidbody {
            Some(rb) => {
                let builder = builder.friction(rb.friction).restitution(rb.restitution);
                if motion == MotionType::Dynamic {
                    builder.mass(rb.mass.max(f32::EPSILON))
                } else {
                    builder
                }
            }
            None => builder.friction(0.5).restitution(0.0),
        };

        let body = self.bodies.insert(body);
        let handle = self
            .colliders
            .insert_with_parent(builder.build(), body, &mut self.bodies);
        self.records.insert(
            id,
            BodyRecord {
                object: id,
                body,
                collider: handle,
                motion,
                center: collider.center,
            },
        );
        self.owners.insert(handle, id);
        if motion == MotionType::Static {
            self.debug.invalidate();
        }
        if let Some(rb) = world.get_mut::<ecs::Rigidbody>(id) {
            rb.reset_interpolation(transform.position);
        }

        tracing::debug!(
            object = world.object(id).map(|o| o.name.as_str()).unwrap_or_default(),
            ?motion,
            layer = collider.layer.bits(),
            mask = collider.mask.bits(),
            trigger = collider.is_trigger,
            "registered body"
        );
        true
    }

    /// Advance the simulation by one fixed step and synchronise the world.
    /// Returns the contact notifications produced by this step.
    pub fn step(&mut self, world: &mut World, dt: f32) -> Vec<ContactEvent> {
        self.prune(world);

        for id in world.ids_with::<ecs::Rigidbody>() {
            if let Some(rb) = world.get_mut::<ecs::Rigidbody>(id) {
                rb.is_grounded = false;
            }
        }

        let kinematic_targets = self.push_to_physics(world);

        let substeps = self.settings.substeps.max(1);
        self.params.dt = dt / substeps as f32;
        let gravity = to_vector(self.settings.gravity);
        for i in 0..substeps {
            let t = (i + 1) as f32 / substeps as f32;
            for (handle, start, target) in &kinematic_targets {
                if let Some(body) = self.bodies.get_mut(*handle) {
                    body.set_next_kinematic_position(start.lerp_slerp(target, t));
                }
            }
            self.pipeline.step(
                &gravity,
                &self.params,
                &mut self.islands,
                &mut self.broad_phase,
                &mut self.narrow_phase,
                &mut self.bodies,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                &mut self.ccd,
                Some(&mut self.queries),
                &(),
                &self.step_events,
            );
        }

        self.pull_from_physics(world);

        let started = self.step_events.take();
        let (events, grounded) = self.contacts.update(&self.narrow_phase, &self.owners, started);
        for hit in grounded {
            if let Some(rb) = world.get_mut::<ecs::Rigidbody>(hit.object) {
                rb.is_grounded = true;
                rb.ground_normal = hit.normal;
            }
        }
        events
    }

    /// Push velocities and forces of dynamic bodies. Returns the start and
    /// target poses of kinematic bodies for this step.
    fn push_to_physics(
        &mut self,
        world: &mut World,
    ) -> Vec<(RigidBodyHandle, Isometry<Real>, Isometry<Real>)> {
        let mut kinematic_targets = Vec::new();
        for record in self.records.values() {
            let Some(body) = self.bodies.get_mut(record.body) else {
                continue;
            };
            match record.motion {
                MotionType::Static => {}
                MotionType::Kinematic => {
                    let Some(target) = world_pose(world, record.object, record.center) else {
                        continue;
                    };
                    kinematic_targets.push((record.body, *body.position(), target));
                }
                MotionType::Dynamic => {
                    let Some(rb) = world
                        .get_mut::<ecs::Rigidbody>(record.object)
                        .filter(|rb| rb.enabled)
                    else {
                        continue;
                    };
                    if (rb.velocity - to_vec3(body.linvel())).length() > VELOCITY_EPSILON {
                        body.set_linvel(to_vector(rb.velocity), true);
                    }
                    body.reset_forces(true);
                    if rb.acceleration.length() > FORCE_EPSILON {
                        body.add_force(to_vector(rb.acceleration * rb.mass), true);
                    }
                    rb.acceleration = Vec3::ZERO;
                }
            }
        }
        kinematic_targets
    }

    fn pull_from_physics(&mut self, world: &mut World) {
        for record in self.records.values() {
            let Some(body) = self.bodies.get_mut(record.body) else {
                continue;
            };
            match record.motion {
                MotionType::Static | MotionType::Kinematic => {}
                MotionType::Dynamic => {
                    body.reset_forces(false);
                    let position = to_vec3(body.translation()) - record.center;
                    let velocity = to_vec3(body.linvel());
                    let local = parent_matrix(world, record.object)
                        .inverse()
                        .transform_point3(position);
                    world.set_position(record.object, local);
                    if let Some(rb) = world.get_mut::<ecs::Rigidbody>(record.object) {
                        rb.velocity = velocity;
                    }
                }
            }
        }
    }

    /// Remove bodies whose object no longer exists.
    fn prune(&mut self, world: &World) {
        let stale: Vec<ObjectId> = self
            .records
            .keys()
            .filter(|&id| !world.contains(id))
            .collect();
        for id in stale {
            let Some(record) = self.records.remove(id) else {
                continue;
            };
            self.owners.remove(&record.collider);
            self.bodies.remove(
                record.body,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            );
            if record.motion == MotionType::Static {
                self.debug.invalidate();
            }
            tracing::debug!(?id, "removed body of destroyed object");
        }
    }

    /// Closest hit along a ray against colliders whose layer intersects `mask`.
    pub fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: CollisionLayers,
    ) -> Option<RaycastHit> {
        self.cast(origin, direction, max_distance, mask, None)
    }

    fn cast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: CollisionLayers,
        exclude: Option<ColliderHandle>,
    ) -> Option<RaycastHit> {
        let direction = direction.try_normalize()?;
        let ray = Ray::new(
            point![origin.x, origin.y, origin.z],
            to_vector(direction),
        );
        let in_mask = |_: ColliderHandle, c: &Collider| {
            c.collision_groups().memberships.bits() & mask.bits() != 0
        };
        let mut filter = QueryFilter::default().predicate(&in_mask);
        if let Some(handle) = exclude {
            filter = filter.exclude_collider(handle);
        }
        let (handle, hit) = self.queries.cast_ray_and_get_normal(
            &self.bodies,
            &self.colliders,
            &ray,
            max_distance,
            true,
            filter,
        )?;
        Some(RaycastHit {
            object: *self.owners.get(&handle)?,
            point: point_to_vec3(&ray.point_at(hit.time_of_impact)),
            normal: to_vec3(&hit.normal),
            distance: hit.time_of_impact,
        })
    }

    /// Probe the ground layer within `distance` below the object's collider
    /// and record the result on its rigidbody.
    pub fn check_grounded(&self, world: &mut World, id: ObjectId, distance: f32) -> bool {
        let Some(record) = self.records.get(id) else {
            return false;
        };
        let Some(collider) = self.colliders.get(record.collider) else {
            return false;
        };
        let origin = to_vec3(&collider.position().translation.vector);
        let bottom = collider.compute_aabb().mins.z;
        let reach = (origin.z - bottom) + distance;
        let hit = self.cast(
            origin,
            Vec3::NEG_Z,
            reach,
            CollisionLayers::GROUND,
            Some(record.collider),
        );
        if let Some(rb) = world.get_mut::<ecs::Rigidbody>(id) {
            rb.is_grounded = hit.is_some();
            if let Some(hit) = hit {
                rb.ground_normal = hit.normal;
            }
        }
        hit.is_some()
    }

    /// Objects overlapping a box. Shape overlap queries are not supported
    /// yet; this always returns an empty list.
    pub fn overlap_box(&self, center: Vec3, half_extents: Vec3, mask: CollisionLayers) -> Vec<ObjectId> {
        tracing::debug!(?center, ?half_extents, mask = mask.bits(), "overlap_box is not supported");
        Vec::new()
    }

    /// Objects overlapping a sphere. Not supported yet; always empty.
    pub fn overlap_sphere(&self, center: Vec3, radius: f32, mask: CollisionLayers) -> Vec<ObjectId> {
        tracing::debug!(?center, radius, mask = mask.bits(), "overlap_sphere is not supported");
        Vec::new()
    }

    pub fn set_debug_draw(&mut self, enabled: bool) {
        self.debug_draw = enabled;
    }

    pub fn debug_draw_enabled(&self) -> bool {
        self.debug_draw
    }

    /// Wireframes of all bodies: triangle edges or bounds for static bodies,
    /// bounds for moving ones.
    pub fn debug_lines(&mut self) -> Vec<DebugLine> {
        let records: Vec<BodyRecord> = self.records.values().copied().collect();
        self.debug.lines(&self.colliders, &records)
    }

    pub fn motion_type(&self, id: ObjectId) -> Option<MotionType> {
        self.records.get(id).map(|r| r.motion)
    }

    pub fn is_registered(&self, id: ObjectId) -> bool {
        self.records.contains_key(id)
    }

    pub fn object_for_body(&self, handle: RigidBodyHandle) -> Option<ObjectId> {
        self.records
            .values()
            .find(|r| r.body == handle)
            .map(|r| r.object)
    }

    pub fn body_for_object(&self, id: ObjectId) -> Option<RigidBodyHandle> {
        self.records.get(id).map(|r| r.body)
    }

    pub fn body_count(&self) -> usize {
        self.records.len()
    }

    /// Remove every body. The system can be initialised again afterwards.
    pub fn clear(&mut self) {
        let ids: Vec<ObjectId> = self.records.keys().collect();
        for id in ids {
            if let Some(record) = self.records.remove(id) {
                self.bodies.remove(
                    record.body,
                    &mut self.islands,
                    &mut self.colliders,
                    &mut self.impulse_joints,
                    &mut self.multibody_joints,
                    true,
                );
            }
        }
        self.owners.clear();
        self.contacts.clear();
        self.debug.invalidate();
        self.queries.update(&self.colliders);
    }
}

impl Default for CollisionSystem {
    fn default() -> Self {
        Self::new(PhysicsSettings::default())
    }
}

fn parent_matrix(world: &World, id: ObjectId) -> Mat4 {
    world
        .object(id)
        .and_then(|o| o.parent())
        .and_then(|p| world.world_matrix(p))
        .unwrap_or(Mat4::IDENTITY)
}

/// Collider pose in world space: the object's world transform with the
/// collider centre added to its position.
fn world_pose(world: &World, id: ObjectId, center: Vec3) -> Option<Isometry<Real>> {
    let object = world.object(id)?;
    let parent = parent_matrix(world, id);
    let (_, parent_rotation, _) = parent.to_scale_rotation_translation();
    Some(pose(
        parent.transform_point3(object.transform.position) + center,
        parent_rotation * object.transform.orientation(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_common::Transform;
    use kestrel_ecs::{Collider as ColliderComponent, ContactKind, Rigidbody};

    const DT: f32 = 1.0 / 60.0;

    fn ground(world: &mut World) -> ObjectId {
        let id = world.spawn("ground", Transform::default());
        world.insert(
            id,
            ColliderComponent::cuboid(Vec3::new(10.0, 10.0, 1.0))
                .with_layer(CollisionLayers::GROUND),
        );
        id
    }

    fn ball(world: &mut World, z: f32, layer: CollisionLayers) -> ObjectId {
        let id = world.spawn("ball", Transform::from_position(Vec3::new(0.0, 0.0, z)));
        world.insert(id, ColliderComponent::sphere(0.5).with_layer(layer));
        world.insert(id, Rigidbody::default());
        id
    }

    fn run(system: &mut CollisionSystem, world: &mut World, steps: usize) -> Vec<ContactEvent> {
        let mut all = Vec::new();
        for _ in 0..steps {
            all.extend(system.step(world, DT));
        }
        all
    }

    #[test]
    fn motion_type_follows_components() {
        let mut world = World::new();
        let wall = world.create_object("wall");
        world.insert(wall, ColliderComponent::cuboid(Vec3::ONE));
        let lift = world.create_object("lift");
        world.insert(lift, ColliderComponent::cuboid(Vec3::ONE));
        world.insert(lift, Rigidbody::kinematic());
        let crate_ = world.create_object("crate");
        world.insert(crate_, ColliderComponent::cuboid(Vec3::ONE));
        world.insert(crate_, Rigidbody::default());

        let mut system = CollisionSystem::default();
        assert_eq!(system.initialize(&mut world), 3);
        assert_eq!(system.motion_type(wall), Some(MotionType::Static));
        assert_eq!(system.motion_type(lift), Some(MotionType::Kinematic));
        assert_eq!(system.motion_type(crate_), Some(MotionType::Dynamic));
    }

    #[test]
    fn disabled_colliders_get_no_body() {
        let mut world = World::new();
        let id = world.create_object("ghost");
        let mut collider = ColliderComponent::sphere(1.0);
        collider.enabled = false;
        world.insert(id, collider);
        let mut system = CollisionSystem::default();
        assert_eq!(system.initialize(&mut world), 0);
        assert!(!system.is_registered(id));
    }

    #[test]
    fn sphere_comes_to_rest_on_ground() {
        let mut world = World::new();
        let ground = ground(&mut world);
        let ball = ball(&mut world, 5.0, CollisionLayers::PLAYER);
        let mut system = CollisionSystem::default();
        system.initialize(&mut world);

        let events = run(&mut system, &mut world, 240);
        let z = world.position(ball).unwrap().z;
        assert!((z - 1.0).abs() < 0.05, "ball rests at z={z}");
        let rb = world.get::<Rigidbody>(ball).unwrap();
        assert!(rb.is_grounded);
        assert!(rb.ground_normal.z > 0.9);
        assert!(events.iter().any(|e| e.kind == ContactKind::CollisionEnter
            && e.object == ball
            && e.other == ground));
    }

    #[test]
    fn resting_contact_reports_stay_after_enter() {
        let mut world = World::new();
        ground(&mut world);
        let ball = ball(&mut world, 1.0, CollisionLayers::PLAYER);
        let mut system = CollisionSystem::default();
        system.initialize(&mut world);
        run(&mut system, &mut world, 60);
        let events = system.step(&mut world, DT);
        assert!(
            events
                .iter()
                .any(|e| e.kind == ContactKind::CollisionStay && e.object == ball)
        );
        assert!(!events.iter().any(|e| e.kind == ContactKind::CollisionEnter));
    }

    #[test]
    fn unlayered_body_falls_through_ground() {
        let mut world = World::new();
        ground(&mut world);
        let ball = ball(&mut world, 2.0, CollisionLayers::NONE);
        let mut system = CollisionSystem::default();
        system.initialize(&mut world);
        let events = run(&mut system, &mut world, 60);
        assert!(world.position(ball).unwrap().z < -1.0);
        assert!(events.is_empty());
    }

    #[test]
    fn mask_excludes_layers() {
        let mut world = World::new();
        ground(&mut world);
        let ball = world.spawn("ball", Transform::from_position(Vec3::new(0.0, 0.0, 2.0)));
        world.insert(
            ball,
            ColliderComponent::sphere(0.5)
                .with_layer(CollisionLayers::PLAYER)
                .with_mask(CollisionLayers::WALL),
        );
        world.insert(ball, Rigidbody::default());
        let mut system = CollisionSystem::default();
        system.initialize(&mut world);
        run(&mut system, &mut world, 60);
        assert!(world.position(ball).unwrap().z < -1.0);
    }

    #[test]
    fn trigger_reports_enter_and_exit_without_blocking() {
        let mut world = World::new();
        let zone = world.spawn("zone", Transform::from_position(Vec3::new(0.0, 0.0, 0.0)));
        world.insert(
            zone,
            ColliderComponent::cuboid(Vec3::new(4.0, 4.0, 1.0))
                .with_layer(CollisionLayers::TRIGGER)
                .trigger(),
        );
        let ball = ball(&mut world, 3.0, CollisionLayers::PLAYER);
        let mut system = CollisionSystem::default();
        system.initialize(&mut world);

        let events = run(&mut system, &mut world, 90);
        let enters: Vec<_> = events
            .iter()
            .filter(|e| e.kind == ContactKind::TriggerEnter)
            .collect();
        assert_eq!(enters.len(), 2);
        assert!(enters.iter().any(|e| e.object == zone && e.other == ball));
        assert!(enters.iter().any(|e| e.object == ball && e.other == zone));
        assert!(events.iter().any(|e| e.kind == ContactKind::TriggerExit));
        assert!(world.position(ball).unwrap().z < -1.0);
    }

    #[test]
    fn kinematic_body_follows_transform() {
        let mut world = World::new();
        let lift = world.create_object("lift");
        world.insert(lift, ColliderComponent::cuboid(Vec3::ONE).with_layer(CollisionLayers::WALL));
        world.insert(lift, Rigidbody::kinematic());
        let mut system = CollisionSystem::default();
        system.initialize(&mut world);

        world.set_position(lift, Vec3::new(3.0, 0.0, 1.0));
        system.step(&mut world, DT);
        let handle = system.body_for_object(lift).unwrap();
        let body = &system.bodies[handle];
        assert!((to_vec3(body.translation()) - Vec3::new(3.0, 0.0, 1.0)).length() < 1e-4);
        assert_eq!(world.position(lift), Some(Vec3::new(3.0, 0.0, 1.0)));
        assert_eq!(system.object_for_body(handle), Some(lift));
    }

    #[test]
    fn kinematic_child_uses_its_world_position() {
        let mut world = World::new();
        let rig = world.spawn("rig", Transform::from_position(Vec3::new(2.0, 0.0, 0.0)));
        let lift = world.spawn("lift", Transform::from_position(Vec3::new(1.0, 0.0, 1.0)));
        world.set_parent(lift, Some(rig));
        world.insert(lift, ColliderComponent::cuboid(Vec3::ONE).with_layer(CollisionLayers::WALL));
        world.insert(lift, Rigidbody::kinematic());
        let mut system = CollisionSystem::default();
        system.initialize(&mut world);
        let handle = system.body_for_object(lift).unwrap();
        assert!((to_vec3(system.bodies[handle].translation()) - Vec3::new(3.0, 0.0, 1.0)).length() < 1e-4);

        world.set_position(rig, Vec3::new(-2.0, 1.0, 0.0));
        system.step(&mut world, DT);
        let expected = Vec3::new(-1.0, 1.0, 1.0);
        assert!((to_vec3(system.bodies[handle].translation()) - expected).length() < 1e-4);
    }

    #[test]
    fn fast_body_crossing_a_thin_trigger_reports_both_edges() {
        let mut world = World::new();
        let gate = world.spawn("gate", Transform::from_position(Vec3::new(0.5, 0.0, 0.0)));
        world.insert(
            gate,
            ColliderComponent::cuboid(Vec3::new(0.2, 4.0, 4.0))
                .with_layer(CollisionLayers::TRIGGER)
                .trigger(),
        );
        let dart = world.create_object("dart");
        world.insert(dart, ColliderComponent::sphere(0.1).with_layer(CollisionLayers::PLAYER));
        let mut rb = Rigidbody::default().without_gravity();
        rb.velocity = Vec3::new(60.0, 0.0, 0.0);
        world.insert(dart, rb);
        let mut system = CollisionSystem::default();
        system.initialize(&mut world);

        let events = system.step(&mut world, DT);
        assert!(world.position(dart).unwrap().x > 0.9);
        for kind in [ContactKind::TriggerEnter, ContactKind::TriggerExit] {
            assert!(events.iter().any(|e| e.kind == kind && e.object == dart && e.other == gate));
            assert!(events.iter().any(|e| e.kind == kind && e.object == gate && e.other == dart));
        }

        let later = run(&mut system, &mut world, 2);
        assert!(later.is_empty(), "{later:?}");
    }

    #[test]
    fn velocity_written_by_gameplay_is_applied() {
        let mut world = World::new();
        let id = world.create_object("puck");
        world.insert(id, ColliderComponent::sphere(0.5).with_layer(CollisionLayers::PLAYER));
        world.insert(id, Rigidbody::default().without_gravity());
        let mut system = CollisionSystem::default();
        system.initialize(&mut world);

        world.get_mut::<Rigidbody>(id).unwrap().velocity = Vec3::new(6.0, 0.0, 0.0);
        run(&mut system, &mut world, 30);
        let x = world.position(id).unwrap().x;
        assert!(x > 2.5 && x < 3.1, "x={x}");
        assert!((world.get::<Rigidbody>(id).unwrap().velocity.x - 6.0).abs() < 0.2);
    }

    #[test]
    fn forces_apply_once_and_clear() {
        let mut world = World::new();
        let id = world.create_object("rocket");
        world.insert(id, ColliderComponent::sphere(0.5).with_layer(CollisionLayers::PLAYER));
        world.insert(id, Rigidbody::default().without_gravity().with_mass(2.0));
        let mut system = CollisionSystem::default();
        system.initialize(&mut world);

        world
            .get_mut::<Rigidbody>(id)
            .unwrap()
            .add_force(Vec3::new(0.0, 120.0, 0.0));
        system.step(&mut world, DT);
        let rb = world.get::<Rigidbody>(id).unwrap();
        assert_eq!(rb.acceleration, Vec3::ZERO);
        // a = 60, one step of 1/60 s gives ~1 unit/s
        assert!((rb.velocity.y - 1.0).abs() < 0.1, "vy={}", rb.velocity.y);
        let before = rb.velocity.y;
        run(&mut system, &mut world, 10);
        assert!(world.get::<Rigidbody>(id).unwrap().velocity.y <= before + 1e-3);
    }

    #[test]
    fn late_colliders_need_explicit_registration() {
        let mut world = World::new();
        ground(&mut world);
        let mut system = CollisionSystem::default();
        system.initialize(&mut world);
        let late = ball(&mut world, 3.0, CollisionLayers::PLAYER);
        run(&mut system, &mut world, 10);
        assert!(!system.is_registered(late));
        assert_eq!(world.position(late).unwrap().z, 3.0);

        assert!(system.register_collider(&mut world, late));
        assert!(!system.register_collider(&mut world, late));
        run(&mut system, &mut world, 10);
        assert!(world.position(late).unwrap().z < 3.0);
    }

    #[test]
    fn destroyed_objects_lose_their_body() {
        let mut world = World::new();
        ground(&mut world);
        let ball = ball(&mut world, 3.0, CollisionLayers::PLAYER);
        let mut system = CollisionSystem::default();
        system.initialize(&mut world);
        assert_eq!(system.body_count(), 2);
        world.destroy_object(ball);
        system.step(&mut world, DT);
        assert_eq!(system.body_count(), 1);
        assert!(!system.is_registered(ball));
    }

    #[test]
    fn raycast_hits_ground_and_respects_mask() {
        let mut world = World::new();
        let ground = ground(&mut world);
        let mut system = CollisionSystem::default();
        system.initialize(&mut world);

        let hit = system
            .raycast(Vec3::new(1.0, 1.0, 5.0), Vec3::NEG_Z, 10.0, CollisionLayers::GROUND)
            .unwrap();
        assert_eq!(hit.object, ground);
        assert!((hit.distance - 4.5).abs() < 1e-4);
        assert!((hit.point - Vec3::new(1.0, 1.0, 0.5)).length() < 1e-4);
        assert!(hit.normal.z > 0.99);

        assert!(
            system
                .raycast(Vec3::new(1.0, 1.0, 5.0), Vec3::NEG_Z, 10.0, CollisionLayers::ENEMY)
                .is_none()
        );
        assert!(
            system
                .raycast(Vec3::new(1.0, 1.0, 5.0), Vec3::NEG_Z, 2.0, CollisionLayers::ALL)
                .is_none()
        );
        assert!(system.raycast(Vec3::ZERO, Vec3::ZERO, 10.0, CollisionLayers::ALL).is_none());
    }

    #[test]
    fn check_grounded_probes_below_the_collider() {
        let mut world = World::new();
        ground(&mut world);
        let ball = ball(&mut world, 1.05, CollisionLayers::PLAYER);
        let high = world.spawn("high", Transform::from_position(Vec3::new(3.0, 0.0, 4.0)));
        world.insert(high, ColliderComponent::sphere(0.5).with_layer(CollisionLayers::PLAYER));
        world.insert(high, Rigidbody::default());
        let mut system = CollisionSystem::default();
        system.initialize(&mut world);

        assert!(system.check_grounded(&mut world, ball, 0.1));
        assert!(world.get::<Rigidbody>(ball).unwrap().is_grounded);
        assert!(!system.check_grounded(&mut world, high, 0.1));
        assert!(!world.get::<Rigidbody>(high).unwrap().is_grounded);
    }

    #[test]
    fn overlap_queries_are_empty() {
        let mut world = World::new();
        ground(&mut world);
        let mut system = CollisionSystem::default();
        system.initialize(&mut world);
        assert!(system.overlap_box(Vec3::ZERO, Vec3::ONE, CollisionLayers::ALL).is_empty());
        assert!(system.overlap_sphere(Vec3::ZERO, 2.0, CollisionLayers::ALL).is_empty());
    }

    #[test]
    fn static_debug_lines_are_built_once() {
        let mut world = World::new();
        ground(&mut world);
        ball(&mut world, 3.0, CollisionLayers::PLAYER);
        let mut system = CollisionSystem::default();
        system.initialize(&mut world);
        system.set_debug_draw(true);
        assert!(system.debug_draw_enabled());

        let first = system.debug_lines();
        run(&mut system, &mut world, 5);
        let second = system.debug_lines();
        assert_eq!(first.len(), 24);
        assert_eq!(second.len(), 24);
        assert_eq!(system.debug.static_builds, 1);
        assert!(second.iter().any(|l| l.color == crate::debug::MOVING_COLOR));
    }

    #[test]
    fn missing_mesh_collider_still_blocks() {
        let mut world = World::new();
        let floor = world.create_object("floor");
        world.insert(
            floor,
            ColliderComponent::mesh("/nonexistent/floor.obj").with_layer(CollisionLayers::GROUND),
        );
        let ball = ball(&mut world, 3.0, CollisionLayers::PLAYER);
        let mut system = CollisionSystem::default();
        system.initialize(&mut world);
        run(&mut system, &mut world, 180);
        let z = world.position(ball).unwrap().z;
        assert!((z - 1.0).abs() < 0.05, "z={z}");
    }

    #[test]
    fn clear_removes_all_bodies() {
        let mut world = World::new();
        ground(&mut world);
        let mut system = CollisionSystem::default();
        system.initialize(&mut world);
        system.clear();
        assert_eq!(system.body_count(), 0);
        assert_eq!(system.initialize(&mut world), 1);
    }
}
