use crate::world::World;
use kestrel_common::ObjectId;
use std::any::Any;

/// Contact notification delivered to the behaviours of both objects in a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactKind {
    CollisionEnter,
    CollisionStay,
    CollisionExit,
    TriggerEnter,
    TriggerExit,
}

/// One side of a contact: `object` is notified about touching `other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactEvent {
    pub kind: ContactKind,
    pub object: ObjectId,
    pub other: ObjectId,
}

/// Mutable view handed to a behaviour while one of its hooks runs.
///
/// The running behaviour is detached from the world for the duration of the
/// call, so it can freely mutate other objects and components.
pub struct BehaviourContext<'w> {
    pub owner: ObjectId,
    pub world: &'w mut World,
}

/// Downcasting support for behaviours stored as trait objects.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Game logic attached to a game object.
///
/// Every hook has an empty default; implement only what the behaviour needs.
pub trait Behaviour: AsAny {
    fn on_init(&mut self, _cx: &mut BehaviourContext<'_>) {}

    /// Variable-rate update, once per frame.
    fn on_update(&mut self, _cx: &mut BehaviourContext<'_>, _dt: f32) {}

    /// Fixed-rate update, once per physics step, before the step runs.
    fn on_fixed_update(&mut self, _cx: &mut BehaviourContext<'_>, _dt: f32) {}

    fn on_destroy(&mut self, _cx: &mut BehaviourContext<'_>) {}

    fn on_collision_enter(&mut self, _cx: &mut BehaviourContext<'_>, _other: ObjectId) {}

    fn on_collision_stay(&mut self, _cx: &mut BehaviourContext<'_>, _other: ObjectId) {}

    fn on_collision_exit(&mut self, _cx: &mut BehaviourContext<'_>, _other: ObjectId) {}

    fn on_trigger_enter(&mut self, _cx: &mut BehaviourContext<'_>, _other: ObjectId) {}

    fn on_trigger_exit(&mut self, _cx: &mut BehaviourContext<'_>, _other: ObjectId) {}
}

pub(crate) fn dispatch_contact(
    behaviour: &mut dyn Behaviour,
    cx: &mut BehaviourContext<'_>,
    kind: ContactKind,
    other: ObjectId,
) {
    match kind {
        ContactKind::CollisionEnter => behaviour.on_collision_enter(cx, other),
        ContactKind::CollisionStay => behaviour.on_collision_stay(cx, other),
        ContactKind::CollisionExit => behaviour.on_collision_exit(cx, other),
        ContactKind::TriggerEnter => behaviour.on_trigger_enter(cx, other),
        ContactKind::TriggerExit => behaviour.on_trigger_exit(cx, other),
    }
}
