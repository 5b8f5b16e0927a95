use glam::{Quat, Vec3, Vec4};
use kestrel_assets::{AssetError, ObjModel};
use kestrel_common::DebugLine;
use kestrel_ecs::ColliderShape;
use rapier3d::na::Quaternion;
use rapier3d::prelude::*;
use std::path::Path;

const MIN_EXTENT: f32 = 1e-3;

/// Build the physics shape for a collider. Triangle meshes that cannot be
/// loaded fall back to a unit box.
pub(crate) fn build_shape(shape: &ColliderShape) -> SharedShape {
    match shape {
        ColliderShape::Box { size } => {
            let half = (*size * 0.5).max(Vec3::splat(MIN_EXTENT));
            SharedShape::cuboid(half.x, half.y, half.z)
        }
        ColliderShape::Sphere { radius } => SharedShape::ball(radius.max(MIN_EXTENT)),
        ColliderShape::Capsule { radius, height } => {
            SharedShape::capsule_z((height * 0.5).max(0.0), radius.max(MIN_EXTENT))
        }
        ColliderShape::Mesh { path } => match load_triangle_mesh(path) {
            Ok(shape) => shape,
            Err(e) => {
                tracing::warn!(path = %path.display(), "mesh collider falls back to a box: {e}");
                SharedShape::cuboid(0.5, 0.5, 0.5)
            }
        },
    }
}

fn load_triangle_mesh(path: &Path) -> Result<SharedShape, AssetError> {
    let model = ObjModel::load(path)?;
    let (vertices, indices) = model.indexed_z_up();
    let points = vertices.iter().map(|v| point![v.x, v.y, v.z]).collect();
    tracing::debug!(
        path = %path.display(),
        triangles = indices.len(),
        "built triangle mesh collider"
    );
    Ok(SharedShape::trimesh(points, indices))
}

pub(crate) fn to_vector(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

pub(crate) fn to_vec3(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

pub(crate) fn point_to_vec3(p: &Point<Real>) -> Vec3 {
    Vec3::new(p.x, p.y, p.z)
}

/// Pose from a position and Euler angles applied X, then Y, then Z.
pub(crate) fn pose(position: Vec3, rotation: Quat) -> Isometry<Real> {
    Isometry::from_parts(
        Translation::new(position.x, position.y, position.z),
        Rotation::from_quaternion(Quaternion::new(rotation.w, rotation.x, rotation.y, rotation.z)),
    )
}

/// The 12 edges of an axis-aligned box.
pub(crate) fn aabb_edges(min: Vec3, max: Vec3, color: Vec4) -> [DebugLine; 12] {
    let c = |x: f32, y: f32, z: f32| Vec3::new(x, y, z);
    let corners = [
        c(min.x, min.y, min.z),
        c(max.x, min.y, min.z),
        c(max.x, max.y, min.z),
        c(min.x, max.y, min.z),
        c(min.x, min.y, max.z),
        c(max.x, min.y, max.z),
        c(max.x, max.y, max.z),
        c(min.x, max.y, max.z),
    ];
    const EDGES: [(usize, usize); 12] = [
        (0, 1),
        (1, 2),
        (2, 3),
        (3, 0),
        (4, 5),
        (5, 6),
        (6, 7),
        (7, 4),
        (0, 4),
        (1, 5),
        (2, 6),
        (3, 7),
    ];
    EDGES.map(|(a, b)| DebugLine::new(corners[a], corners[b], color))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_uses_half_extents() {
        let shape = build_shape(&ColliderShape::Box {
            size: Vec3::new(10.0, 10.0, 1.0),
        });
        let cuboid = shape.as_cuboid().map(|c| c.half_extents);
        assert_eq!(cuboid, Some(vector![5.0, 5.0, 0.5]));
    }

    #[test]
    fn capsule_uses_half_height() {
        let shape = build_shape(&ColliderShape::Capsule {
            radius: 0.5,
            height: 2.0,
        });
        let capsule = shape.as_capsule().map(|c| (c.half_height(), c.radius));
        assert_eq!(capsule, Some((1.0, 0.5)));
    }

    #[test]
    fn missing_mesh_falls_back_to_box() {
        let shape = build_shape(&ColliderShape::Mesh {
            path: "/nonexistent/level.obj".into(),
        });
        assert_eq!(
            shape.as_cuboid().map(|c| c.half_extents),
            Some(vector![0.5, 0.5, 0.5])
        );
    }

    #[test]
    fn mesh_file_becomes_z_up_trimesh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ramp.obj");
        std::fs::write(&path, "v 0 0 0\nv 1 0 0\nv 1 2 0\nv 0 2 0\nf 1 2 3 4\n").unwrap();
        let shape = build_shape(&ColliderShape::Mesh { path });
        let trimesh = shape.as_trimesh().unwrap();
        assert_eq!(trimesh.indices().len(), 2);
        // source y=2 becomes z=2
        assert!(trimesh.vertices().iter().any(|p| (p.z - 2.0).abs() < 1e-6));
    }

    #[test]
    fn aabb_has_twelve_edges_on_the_box() {
        let edges = aabb_edges(Vec3::ZERO, Vec3::ONE, Vec4::ONE);
        assert_eq!(edges.len(), 12);
        for e in edges {
            assert!(((e.end - e.start).length() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn pose_matches_transform_orientation() {
        let euler = Vec3::new(0.3, -0.2, 1.2);
        let t = kestrel_common::Transform {
            rotation: euler,
            ..Default::default()
        };
        let iso = pose(Vec3::ZERO, t.orientation());
        let v = Vec3::new(1.0, 2.0, 3.0);
        let by_iso = to_vec3(&(iso * to_vector(v)));
        assert!((by_iso - t.orientation() * v).length() < 1e-5);
    }
}
