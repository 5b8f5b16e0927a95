use crate::shapes::to_vec3;
use glam::Vec3;
use kestrel_common::ObjectId;
use kestrel_ecs::{ContactEvent, ContactKind};
use rapier3d::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// A contact normal steeper than this (cosine against +Z) counts as ground.
pub const GROUND_COS: f32 = 0.6;

type Pair = (ColliderHandle, ColliderHandle);

/// A body found resting on something during the last step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Grounding {
    pub object: ObjectId,
    pub normal: Vec3,
}

/// A pair that started touching or overlapping during a substep.
#[derive(Debug, Clone)]
pub(crate) struct PairStart {
    pub pair: Pair,
    pub sensor: bool,
    /// Manifold normals, from `pair.0` towards `pair.1`.
    pub normals: Vec<Vec3>,
}

/// Collects pair starts raised by the physics pipeline across the substeps
/// of one step, so pairs that open and close again inside the step are not
/// lost to the end-of-step diff.
#[derive(Debug, Default)]
pub(crate) struct StepEvents {
    started: Mutex<Vec<PairStart>>,
}

impl StepEvents {
    pub fn take(&mut self) -> Vec<PairStart> {
        self.started
            .get_mut()
            .map(std::mem::take)
            .unwrap_or_default()
    }
}

impl EventHandler for StepEvents {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        contact_pair: Option<&ContactPair>,
    ) {
        let CollisionEvent::Started(h1, h2, flags) = event else {
            return;
        };
        let start = match contact_pair {
            Some(contact) => PairStart {
                pair: (contact.collider1, contact.collider2),
                sensor: flags.contains(CollisionEventFlags::SENSOR),
                normals: contact
                    .manifolds
                    .iter()
                    .filter(|m| !m.points.is_empty())
                    .map(|m| to_vec3(&m.data.normal))
                    .collect(),
            },
            None => PairStart {
                pair: (h1, h2),
                sensor: flags.contains(CollisionEventFlags::SENSOR),
                normals: Vec::new(),
            },
        };
        if let Ok(mut started) = self.started.lock() {
            started.push(start);
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}

/// Turns the narrow phase's current pair state into enter/stay/exit events by
/// diffing against the previous step. Pairs that started during the step but
/// are gone by its end report enter and exit together.
#[derive(Debug, Default)]
pub(crate) struct ContactTracker {
    touching: HashSet<Pair>,
    overlapping: HashSet<Pair>,
}

impl ContactTracker {
    pub fn update(
        &mut self,
        narrow_phase: &NarrowPhase,
        owners: &HashMap<ColliderHandle, ObjectId>,
        started: Vec<PairStart>,
    ) -> (Vec<ContactEvent>, Vec<Grounding>) {
        let mut events = Vec::new();
        let mut grounded = Vec::new();
        let owner_pair = |pair: &Pair| Some((*owners.get(&pair.0)?, *owners.get(&pair.1)?));

        let mut touching = HashSet::new();
        for contact in narrow_phase.contact_pairs() {
            if !contact.has_any_active_contact {
                continue;
            }
            let pair = (contact.collider1, contact.collider2);
            let Some((a, b)) = owner_pair(&pair) else {
                continue;
            };
            let key = unordered(pair);
            touching.insert(key);
            let kind = if self.touching.contains(&key) {
                ContactKind::CollisionStay
            } else {
                ContactKind::CollisionEnter
            };
            push_both(&mut events, kind, a, b);

            let normals = contact
                .manifolds
                .iter()
                .filter(|m| !m.data.solver_contacts.is_empty())
                .map(|m| to_vec3(&m.data.normal));
            ground(&mut grounded, a, b, normals);
        }

        let mut overlapping = HashSet::new();
        for (h1, h2, intersecting) in narrow_phase.intersection_pairs() {
            if !intersecting {
                continue;
            }
            let Some((a, b)) = owner_pair(&(h1, h2)) else {
                continue;
            };
            let key = unordered((h1, h2));
            overlapping.insert(key);
            if !self.overlapping.contains(&key) {
                push_both(&mut events, ContactKind::TriggerEnter, a, b);
            }
        }

        let mut transient = HashSet::new();
        for start in started {
            let key = unordered(start.pair);
            let (now, before) = if start.sensor {
                (&overlapping, &self.overlapping)
            } else {
                (&touching, &self.touching)
            };
            if now.contains(&key) || before.contains(&key) || !transient.insert(key) {
                continue;
            }
            let Some((a, b)) = owner_pair(&start.pair) else {
                continue;
            };
            if start.sensor {
                push_both(&mut events, ContactKind::TriggerEnter, a, b);
                push_both(&mut events, ContactKind::TriggerExit, a, b);
            } else {
                push_both(&mut events, ContactKind::CollisionEnter, a, b);
                push_both(&mut events, ContactKind::CollisionExit, a, b);
                ground(&mut grounded, a, b, start.normals.into_iter());
            }
        }

        for key in self.touching.difference(&touching) {
            if let Some((a, b)) = owner_pair(key) {
                push_both(&mut events, ContactKind::CollisionExit, a, b);
            }
        }
        for key in self.overlapping.difference(&overlapping) {
            if let Some((a, b)) = owner_pair(key) {
                push_both(&mut events, ContactKind::TriggerExit, a, b);
            }
        }

        self.touching = touching;
        self.overlapping = overlapping;
        (events, grounded)
    }

    pub fn clear(&mut self) {
        self.touching.clear();
        self.overlapping.clear();
    }
}

/// The same key for a pair whichever collider comes first.
fn unordered((a, b): Pair) -> Pair {
    if a.into_raw_parts() <= b.into_raw_parts() {
        (a, b)
    } else {
        (b, a)
    }
}

/// Ground whichever body a steep normal pushes upward. Normals point from
/// `a` towards `b`.
fn ground(grounded: &mut Vec<Grounding>, a: ObjectId, b: ObjectId, normals: impl Iterator<Item = Vec3>) {
    for normal in normals {
        if normal.z < -GROUND_COS {
            grounded.push(Grounding {
                object: a,
                normal: -normal,
            });
        } else if normal.z > GROUND_COS {
            grounded.push(Grounding { object: b, normal });
        }
    }
}

fn push_both(events: &mut Vec<ContactEvent>, kind: ContactKind, a: ObjectId, b: ObjectId) {
    events.push(ContactEvent {
        kind,
        object: a,
        other: b,
    });
    events.push(ContactEvent {
        kind,
        object: b,
        other: a,
    });
}
