use crate::animation::Animator;
use crate::behaviour::{Behaviour, BehaviourContext, ContactEvent, dispatch_contact};
use crate::components::{Camera, Collider, MeshComponent, Rigidbody};
use glam::Mat4;
use kestrel_common::{BehaviourId, ObjectId, Transform};
use slotmap::{SecondaryMap, SlotMap};
use std::any::TypeId;
use std::collections::HashMap;

/// A named node in the scene hierarchy.
#[derive(Debug, Clone)]
pub struct GameObject {
    pub name: String,
    pub transform: Transform,
    pub active: bool,
    parent: Option<ObjectId>,
    children: Vec<ObjectId>,
}

impl GameObject {
    fn new(name: String, transform: Transform) -> Self {
        Self {
            name,
            transform,
            active: true,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    pub fn children(&self) -> &[ObjectId] {
        &self.children
    }
}

/// Per-type component tables keyed by owning object.
#[derive(Default)]
pub struct ComponentStorage {
    meshes: SecondaryMap<ObjectId, MeshComponent>,
    colliders: SecondaryMap<ObjectId, Collider>,
    rigidbodies: SecondaryMap<ObjectId, Rigidbody>,
    cameras: SecondaryMap<ObjectId, Camera>,
    animators: SecondaryMap<ObjectId, Animator>,
}

impl ComponentStorage {
    fn remove_all(&mut self, id: ObjectId) {
        self.meshes.remove(id);
        self.colliders.remove(id);
        self.rigidbodies.remove(id);
        self.cameras.remove(id);
        self.animators.remove(id);
    }
}

mod sealed {
    pub trait Sealed {}
}

/// A built-in data component with its own typed table in the world.
pub trait Component: sealed::Sealed + Sized + 'static {
    #[doc(hidden)]
    fn storage(components: &ComponentStorage) -> &SecondaryMap<ObjectId, Self>;
    #[doc(hidden)]
    fn storage_mut(components: &mut ComponentStorage) -> &mut SecondaryMap<ObjectId, Self>;
}

macro_rules! component_table {
    ($ty:ty, $field:ident) => {
        impl sealed::Sealed for $ty {}

        impl Component for $ty {
            fn storage(components: &ComponentStorage) -> &SecondaryMap<ObjectId, Self> {
                &components.$field
            }

            fn storage_mut(
                components: &mut ComponentStorage,
            ) -> &mut SecondaryMap<ObjectId, Self> {
                &mut components.$field
            }
        }
    };
}

component_table!(MeshComponent, meshes);
component_table!(Collider, colliders);
component_table!(Rigidbody, rigidbodies);
component_table!(Camera, cameras);
component_table!(Animator, animators);

struct BehaviourSlot {
    owner: ObjectId,
    type_id: TypeId,
    enabled: bool,
    /// `None` while the behaviour is running one of its own hooks.
    instance: Option<Box<dyn Behaviour>>,
}

/// Arena of game objects, their components and behaviours.
///
/// Objects and behaviours are addressed by generation-checked ids, so a
/// stale id never aliases a newer object. Iteration follows creation order.
#[derive(Default)]
pub struct World {
    objects: SlotMap<ObjectId, GameObject>,
    order: Vec<ObjectId>,
    components: ComponentStorage,
    behaviours: SlotMap<BehaviourId, BehaviourSlot>,
    behaviour_order: Vec<BehaviourId>,
    attached: SecondaryMap<ObjectId, Vec<BehaviourId>>,
    by_type: HashMap<(ObjectId, TypeId), BehaviourId>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_object(&mut self, name: impl Into<String>) -> ObjectId {
        self.spawn(name, Transform::default())
    }

    pub fn spawn(&mut self, name: impl Into<String>, transform: Transform) -> ObjectId {
        let id = self.objects.insert(GameObject::new(name.into(), transform));
        self.order.push(id);
        self.attached.insert(id, Vec::new());
        id
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    pub fn object(&self, id: ObjectId) -> Option<&GameObject> {
        self.objects.get(id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut GameObject> {
        self.objects.get_mut(id)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Objects in creation order.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &GameObject)> {
        self.order
            .iter()
            .filter_map(|&id| self.objects.get(id).map(|o| (id, o)))
    }

    pub fn object_ids(&self) -> Vec<ObjectId> {
        self.order.clone()
    }

    /// First object (in creation order) with the given name.
    pub fn find(&self, name: &str) -> Option<ObjectId> {
        self.objects()
            .find(|(_, o)| o.name == name)
            .map(|(id, _)| id)
    }

    pub fn position(&self, id: ObjectId) -> Option<glam::Vec3> {
        self.objects.get(id).map(|o| o.transform.position)
    }

    pub fn set_position(&mut self, id: ObjectId, position: glam::Vec3) -> bool {
        match self.objects.get_mut(id) {
            Some(object) => {
                object.transform.position = position;
                true
            }
            None => false,
        }
    }

    /// Re-parent `child`. Fails if either object is missing or the link
    /// would create a cycle.
    pub fn set_parent(&mut self, child: ObjectId, parent: Option<ObjectId>) -> bool {
        if !self.objects.contains_key(child) {
            return false;
        }
        if let Some(p) = parent {
            if !self.objects.contains_key(p) || self.is_ancestor_or_self(child, p) {
                return false;
            }
        }

        if let Some(old) = self.objects[child].parent {
            if let Some(old_parent) = self.objects.get_mut(old) {
                old_parent.children.retain(|&c| c != child);
            }
        }
        self.objects[child].parent = parent;
        if let Some(p) = parent {
            self.objects[p].children.push(child);
        }
        true
    }

    fn is_ancestor_or_self(&self, ancestor: ObjectId, mut node: ObjectId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.objects.get(node).and_then(|o| o.parent) {
                Some(p) => node = p,
                None => return false,
            }
        }
    }

    /// World matrix = parent world matrix * local matrix.
    pub fn world_matrix(&self, id: ObjectId) -> Option<Mat4> {
        let object = self.objects.get(id)?;
        let local = object.transform.local_matrix();
        match object.parent {
            Some(parent) => Some(self.world_matrix(parent).unwrap_or(Mat4::IDENTITY) * local),
            None => Some(local),
        }
    }

    /// Destroy an object and its whole subtree. Behaviours of every removed
    /// object receive `on_destroy` before their components are freed.
    pub fn destroy_object(&mut self, id: ObjectId) -> bool {
        if !self.objects.contains_key(id) {
            return false;
        }
        if let Some(parent) = self.objects[id].parent {
            if let Some(p) = self.objects.get_mut(parent) {
                p.children.retain(|&c| c != id);
            }
        }

        let mut doomed = vec![id];
        let mut i = 0;
        while i < doomed.len() {
            if let Some(o) = self.objects.get(doomed[i]) {
                doomed.extend(o.children.iter().copied());
            }
            i += 1;
        }

        for &object in &doomed {
            let behaviours = self.attached.get(object).cloned().unwrap_or_default();
            for behaviour in behaviours {
                self.remove_behaviour(behaviour);
            }
        }
        for &object in &doomed {
            self.components.remove_all(object);
            self.attached.remove(object);
            self.objects.remove(object);
        }
        self.order.retain(|o| self.objects.contains_key(*o));
        tracing::debug!(removed = doomed.len(), "destroyed object subtree");
        true
    }

    // --- Data components ---

    /// Attach a component, replacing and returning any previous one of the same type.
    pub fn insert<T: Component>(&mut self, id: ObjectId, component: T) -> Option<T> {
        if !self.objects.contains_key(id) {
            tracing::warn!("insert on missing object ignored");
            return None;
        }
        T::storage_mut(&mut self.components).insert(id, component)
    }

    pub fn get<T: Component>(&self, id: ObjectId) -> Option<&T> {
        T::storage(&self.components).get(id)
    }

    pub fn get_mut<T: Component>(&mut self, id: ObjectId) -> Option<&mut T> {
        T::storage_mut(&mut self.components).get_mut(id)
    }

    pub fn has<T: Component>(&self, id: ObjectId) -> bool {
        T::storage(&self.components).contains_key(id)
    }

    pub fn remove<T: Component>(&mut self, id: ObjectId) -> Option<T> {
        T::storage_mut(&mut self.components).remove(id)
    }

    /// Ids of objects carrying `T`, in creation order.
    pub fn ids_with<T: Component>(&self) -> Vec<ObjectId> {
        let table = T::storage(&self.components);
        self.order
            .iter()
            .copied()
            .filter(|&id| table.contains_key(id))
            .collect()
    }

    /// Objects carrying `T`, in creation order.
    pub fn iter<T: Component>(&self) -> impl Iterator<Item = (ObjectId, &GameObject, &T)> {
        let table = T::storage(&self.components);
        self.order.iter().filter_map(move |&id| {
            let component = table.get(id)?;
            let object = self.objects.get(id)?;
            Some((id, object, component))
        })
    }

    // --- Behaviours ---

    /// Attach a behaviour and run its `on_init`. An object holds at most one
    /// behaviour per type; a second one replaces the first.
    pub fn add_behaviour<B: Behaviour>(&mut self, owner: ObjectId, behaviour: B) -> Option<BehaviourId> {
        if !self.objects.contains_key(owner) {
            tracing::warn!("add_behaviour on missing object ignored");
            return None;
        }
        let type_id = TypeId::of::<B>();
        if let Some(previous) = self.by_type.get(&(owner, type_id)).copied() {
            self.remove_behaviour(previous);
        }

        let id = self.behaviours.insert(BehaviourSlot {
            owner,
            type_id,
            enabled: true,
            instance: Some(Box::new(behaviour)),
        });
        self.behaviour_order.push(id);
        if let Some(list) = self.attached.get_mut(owner) {
            list.push(id);
        }
        self.by_type.insert((owner, type_id), id);
        self.invoke(id, |b, cx| b.on_init(cx));
        Some(id)
    }

    pub fn behaviour<B: Behaviour>(&self, owner: ObjectId) -> Option<&B> {
        let id = self.by_type.get(&(owner, TypeId::of::<B>()))?;
        let instance = self.behaviours.get(*id)?.instance.as_ref()?;
        (**instance).as_any().downcast_ref::<B>()
    }

    pub fn behaviour_mut<B: Behaviour>(&mut self, owner: ObjectId) -> Option<&mut B> {
        let id = self.by_type.get(&(owner, TypeId::of::<B>()))?;
        let instance = self.behaviours.get_mut(*id)?.instance.as_mut()?;
        (**instance).as_any_mut().downcast_mut::<B>()
    }

    pub fn behaviour_count(&self) -> usize {
        self.behaviours.len()
    }

    pub fn set_behaviour_enabled(&mut self, id: BehaviourId, enabled: bool) -> bool {
        match self.behaviours.get_mut(id) {
            Some(slot) => {
                slot.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Detach a behaviour, running its `on_destroy` first.
    pub fn remove_behaviour(&mut self, id: BehaviourId) -> bool {
        let Some(slot) = self.behaviours.remove(id) else {
            return false;
        };
        self.behaviour_order.retain(|&b| b != id);
        if let Some(list) = self.attached.get_mut(slot.owner) {
            list.retain(|&b| b != id);
        }
        if self.by_type.get(&(slot.owner, slot.type_id)) == Some(&id) {
            self.by_type.remove(&(slot.owner, slot.type_id));
        }
        // A behaviour removing itself from inside a hook is finished by `invoke`.
        if let Some(mut instance) = slot.instance {
            let mut cx = BehaviourContext {
                owner: slot.owner,
                world: self,
            };
            instance.on_destroy(&mut cx);
        }
        true
    }

    /// Run `on_update` on every enabled behaviour of an active object.
    pub fn run_update(&mut self, dt: f32) {
        for id in self.behaviour_order.clone() {
            if self.is_runnable(id) {
                self.invoke(id, |b, cx| b.on_update(cx, dt));
            }
        }
    }

    /// Run `on_fixed_update` on every enabled behaviour of an active object.
    pub fn run_fixed_update(&mut self, dt: f32) {
        for id in self.behaviour_order.clone() {
            if self.is_runnable(id) {
                self.invoke(id, |b, cx| b.on_fixed_update(cx, dt));
            }
        }
    }

    /// Deliver contact notifications to the behaviours of each notified object.
    pub fn dispatch_contacts(&mut self, events: &[ContactEvent]) {
        for event in events {
            let targets = self.attached.get(event.object).cloned().unwrap_or_default();
            for id in targets {
                if self.is_runnable(id) {
                    self.invoke(id, |b, cx| dispatch_contact(b, cx, event.kind, event.other));
                }
            }
        }
    }

    /// Fire `on_destroy` for every behaviour and free all objects. Safe to
    /// call more than once.
    pub fn teardown(&mut self) {
        for id in self.behaviour_order.clone() {
            self.remove_behaviour(id);
        }
        self.objects.clear();
        self.order.clear();
        self.attached.clear();
        self.by_type.clear();
        self.components = ComponentStorage::default();
    }

    fn is_runnable(&self, id: BehaviourId) -> bool {
        self.behaviours.get(id).is_some_and(|slot| {
            slot.enabled && self.objects.get(slot.owner).is_some_and(|o| o.active)
        })
    }

    fn invoke(
        &mut self,
        id: BehaviourId,
        f: impl FnOnce(&mut dyn Behaviour, &mut BehaviourContext<'_>),
    ) {
        let Some(slot) = self.behaviours.get_mut(id) else {
            return;
        };
        let owner = slot.owner;
        let Some(mut instance) = slot.instance.take() else {
            return;
        };

        let mut cx = BehaviourContext { owner, world: self };
        f(instance.as_mut(), &mut cx);

        match self.behaviours.get_mut(id) {
            Some(slot) => slot.instance = Some(instance),
            None => {
                // Removed while running; finish its lifecycle now.
                let mut cx = BehaviourContext { owner, world: self };
                instance.on_destroy(&mut cx);
            }
        }
    }
}
