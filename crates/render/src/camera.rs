use glam::Mat4;
use kestrel_common::ObjectId;
use kestrel_ecs::{Camera, World};

/// View and projection for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraMatrices {
    pub view: Mat4,
    pub projection: Mat4,
}

impl CameraMatrices {
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}

impl Default for CameraMatrices {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        }
    }
}

/// First active object carrying an enabled camera.
pub fn find_main_camera(world: &World) -> Option<ObjectId> {
    world
        .iter::<Camera>()
        .find(|(_, object, camera)| object.active && camera.enabled)
        .map(|(id, _, _)| id)
}

/// Matrices for the camera on `id`, or `None` if it has no usable camera.
pub fn camera_matrices(world: &World, id: ObjectId, aspect: f32) -> Option<CameraMatrices> {
    let object = world.object(id).filter(|o| o.active)?;
    let camera = world.get::<Camera>(id).filter(|c| c.enabled)?;
    Some(CameraMatrices {
        view: camera.view_matrix(&object.transform),
        projection: camera.projection_matrix(aspect),
    })
}
