use glam::{Mat4, Vec3, Vec4};
use kestrel_common::{CollisionLayers, Transform};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Renderable reference to a named mesh plus a tint colour. Purely visual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshComponent {
    pub mesh: String,
    pub color: Vec4,
    pub enabled: bool,
}

impl MeshComponent {
    pub fn new(mesh: impl Into<String>) -> Self {
        Self {
            mesh: mesh.into(),
            color: Vec4::ONE,
            enabled: true,
        }
    }

    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color;
        self
    }
}

/// Physics shape descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColliderShape {
    /// Full extents; the physics body uses half of each.
    Box { size: Vec3 },
    Sphere { radius: f32 },
    /// Capsule along the world up axis; `height` is the cylinder length.
    Capsule { radius: f32, height: f32 },
    /// Triangle mesh loaded from an OBJ file. Falls back to a unit box when
    /// the file cannot be turned into geometry.
    Mesh { path: PathBuf },
}

impl Default for ColliderShape {
    fn default() -> Self {
        Self::Box { size: Vec3::ONE }
    }
}

/// Collision shape, filtering and trigger flag for a game object.
///
/// The physics body realized for this collider is owned by the scene's
/// collision system and looked up by the owning object id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    pub shape: ColliderShape,
    /// Offset of the body from the owner's position.
    pub center: Vec3,
    pub is_trigger: bool,
    pub layer: CollisionLayers,
    pub mask: CollisionLayers,
    pub enabled: bool,
}

impl Default for Collider {
    fn default() -> Self {
        Self {
            shape: ColliderShape::default(),
            center: Vec3::ZERO,
            is_trigger: false,
            layer: CollisionLayers::NONE,
            mask: CollisionLayers::ALL,
            enabled: true,
        }
    }
}

impl Collider {
    pub fn cuboid(size: Vec3) -> Self {
        Self {
            shape: ColliderShape::Box { size },
            ..Self::default()
        }
    }

    pub fn sphere(radius: f32) -> Self {
        Self {
            shape: ColliderShape::Sphere { radius },
            ..Self::default()
        }
    }

    pub fn capsule(radius: f32, height: f32) -> Self {
        Self {
            shape: ColliderShape::Capsule { radius, height },
            ..Self::default()
        }
    }

    pub fn mesh(path: impl Into<PathBuf>) -> Self {
        Self {
            shape: ColliderShape::Mesh { path: path.into() },
            ..Self::default()
        }
    }

    pub fn with_layer(mut self, layer: CollisionLayers) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_mask(mut self, mask: CollisionLayers) -> Self {
        self.mask = mask;
        self
    }

    pub fn with_center(mut self, center: Vec3) -> Self {
        self.center = center;
        self
    }

    pub fn trigger(mut self) -> Self {
        self.is_trigger = true;
        self
    }
}

/// Rigid body state mirrored between the game object and the physics world.
///
/// `previous_position` and `current_position` are the physics positions at
/// the start and end of the latest fixed step, used only for interpolation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rigidbody {
    pub velocity: Vec3,
    pub acceleration: Vec3,
    pub mass: f32,
    pub drag: f32,
    pub restitution: f32,
    pub friction: f32,
    pub use_gravity: bool,
    pub is_kinematic: bool,
    pub is_grounded: bool,
    pub ground_normal: Vec3,
    pub ground_check_distance: f32,
    pub previous_position: Vec3,
    pub current_position: Vec3,
    pub enabled: bool,
}

impl Default for Rigidbody {
    fn default() -> Self {
        Self {
            velocity: Vec3::ZERO,
            acceleration: Vec3::ZERO,
            mass: 1.0,
            drag: 6.0,
            restitution: 0.0,
            friction: 0.5,
            use_gravity: true,
            is_kinematic: false,
            is_grounded: false,
            ground_normal: Vec3::Z,
            ground_check_distance: 0.1,
            previous_position: Vec3::ZERO,
            current_position: Vec3::ZERO,
            enabled: true,
        }
    }
}

impl Rigidbody {
    pub fn kinematic() -> Self {
        Self {
            is_kinematic: true,
            ..Self::default()
        }
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    pub fn without_gravity(mut self) -> Self {
        self.use_gravity = false;
        self
    }

    /// Accumulate a force; it is applied on the next physics step and then cleared.
    pub fn add_force(&mut self, force: Vec3) {
        if self.mass > 0.0 {
            self.acceleration += force / self.mass;
        }
    }

    pub fn add_impulse(&mut self, impulse: Vec3) {
        self.velocity += impulse;
    }

    /// Seed both interpolation snapshots so the first frame renders in place.
    pub fn reset_interpolation(&mut self, position: Vec3) {
        self.previous_position = position;
        self.current_position = position;
    }

    pub fn interpolated_position(&self, alpha: f32) -> Vec3 {
        self.previous_position.lerp(self.current_position, alpha)
    }
}

/// Camera projection model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Projection {
    Orthographic {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
    },
    Perspective {
        fov_y_degrees: f32,
    },
}

/// Camera component. The owning object's transform positions and orients it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub projection: Projection,
    pub near: f32,
    pub far: f32,
    pub enabled: bool,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            projection: Projection::Orthographic {
                left: -13.333 * 1.2,
                right: 13.333 * 1.2,
                bottom: 7.5 * 1.2,
                top: -7.5 * 1.2,
            },
            near: -150.0,
            far: 100.0,
            enabled: true,
        }
    }
}

impl Camera {
    pub fn perspective(fov_y_degrees: f32, near: f32, far: f32) -> Self {
        Self {
            projection: Projection::Perspective { fov_y_degrees },
            near,
            far,
            enabled: true,
        }
    }

    /// View matrix: pulled back 5 units, tilted about X, turned about Z, then
    /// offset by the camera position.
    pub fn view_matrix(&self, transform: &Transform) -> Mat4 {
        Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0))
            * Mat4::from_rotation_x(transform.rotation.x)
            * Mat4::from_rotation_z(transform.rotation.z)
            * Mat4::from_translation(-transform.position)
    }

    /// Left-handed projection with a 0..1 depth range.
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        match self.projection {
            Projection::Orthographic {
                left,
                right,
                bottom,
                top,
            } => Mat4::orthographic_lh(left, right, bottom, top, self.near, self.far),
            Projection::Perspective { fov_y_degrees } => Mat4::perspective_lh(
                fov_y_degrees.to_radians(),
                aspect,
                self.near.max(1e-3),
                self.far,
            ),
        }
    }
}
