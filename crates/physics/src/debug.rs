use crate::shapes::{aabb_edges, point_to_vec3};
use crate::system::{BodyRecord, MotionType};
use glam::Vec4;
use kestrel_common::DebugLine;
use rapier3d::prelude::*;

pub const STATIC_COLOR: Vec4 = Vec4::new(1.0, 1.0, 0.0, 1.0);
pub const MOVING_COLOR: Vec4 = Vec4::new(0.0, 1.0, 0.0, 1.0);

/// Wireframe geometry for physics bodies. Static geometry never moves, so its
/// lines are built once and reused.
#[derive(Debug, Default)]
pub(crate) struct DebugGeometry {
    static_lines: Option<Vec<DebugLine>>,
    pub(crate) static_builds: usize,
}

impl DebugGeometry {
    pub fn lines(&mut self, colliders: &ColliderSet, records: &[BodyRecord]) -> Vec<DebugLine> {
        if self.static_lines.is_none() {
            let mut lines = Vec::new();
            for record in records.iter().filter(|r| r.motion == MotionType::Static) {
                if let Some(collider) = colliders.get(record.collider) {
                    static_collider_lines(collider, &mut lines);
                }
            }
            tracing::debug!(lines = lines.len(), "built static debug geometry");
            self.static_lines = Some(lines);
            self.static_builds += 1;
        }

        let mut out = self.static_lines.clone().unwrap_or_default();
        for record in records.iter().filter(|r| r.motion != MotionType::Static) {
            if let Some(collider) = colliders.get(record.collider) {
                let aabb = collider.compute_aabb();
                out.extend(aabb_edges(
                    point_to_vec3(&aabb.mins),
                    point_to_vec3(&aabb.maxs),
                    MOVING_COLOR,
                ));
            }
        }
        out
    }

    /// Drop the cached static lines, e.g. after bodies were added or removed.
    pub fn invalidate(&mut self) {
        self.static_lines = None;
    }
}

fn static_collider_lines(collider: &Collider, out: &mut Vec<DebugLine>) {
    match collider.shape().as_trimesh() {
        Some(trimesh) => {
            let pose = collider.position();
            for triangle in trimesh.triangles() {
                let [a, b, c] = [triangle.a, triangle.b, triangle.c].map(|p| point_to_vec3(&(pose * p)));
                out.push(DebugLine::new(a, b, STATIC_COLOR));
                out.push(DebugLine::new(b, c, STATIC_COLOR));
                out.push(DebugLine::new(c, a, STATIC_COLOR));
            }
        }
        None => {
            let aabb = collider.compute_aabb();
            out.extend(aabb_edges(
                point_to_vec3(&aabb.mins),
                point_to_vec3(&aabb.maxs),
                STATIC_COLOR,
            ));
        }
    }
}
