use glam::{Mat4, Vec4};
use kestrel_assets::{MeshHandle, MeshLibrary};
use kestrel_common::ObjectId;
use kestrel_ecs::{MeshComponent, Rigidbody, World};

/// Distinct ids the silhouette encoding can hold; later objects share the last id.
pub const MAX_SILHOUETTE_IDS: usize = 255;

/// Silhouette id for the `index`-th drawn object, normalised to 0..=1.
pub fn silhouette_id(index: usize) -> f32 {
    (index + 1).min(MAX_SILHOUETTE_IDS) as f32 / MAX_SILHOUETTE_IDS as f32
}

/// One mesh draw shared by the silhouette and main passes.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    pub object: ObjectId,
    pub mesh: MeshHandle,
    pub vertex_count: u32,
    pub model: Mat4,
    pub color: Vec4,
    pub silhouette_id: f32,
}

/// Collect draws for every active object with an enabled mesh, in creation
/// order. Objects whose mesh is not in the library are skipped.
///
/// Simulated bodies are placed between their last two physics positions
/// according to `alpha`.
pub fn collect_draw_items(world: &World, meshes: &MeshLibrary, alpha: f32) -> Vec<DrawItem> {
    let mut items = Vec::new();
    for (id, object) in world.objects() {
        if !object.active {
            continue;
        }
        let Some(mesh) = world.get::<MeshComponent>(id).filter(|m| m.enabled) else {
            continue;
        };
        let Some(handle) = meshes.handle(&mesh.mesh) else {
            tracing::trace!(object = %object.name, mesh = %mesh.mesh, "mesh not loaded, skipping draw");
            continue;
        };
        let vertex_count = meshes
            .get(handle)
            .map(|m| m.vertex_count() as u32)
            .unwrap_or_default();

        let mut local = object.transform;
        if let Some(rb) = world
            .get::<Rigidbody>(id)
            .filter(|rb| rb.enabled && !rb.is_kinematic)
        {
            local.position = rb.interpolated_position(alpha);
        }
        let parent = object
            .parent()
            .and_then(|p| world.world_matrix(p))
            .unwrap_or(Mat4::IDENTITY);

        items.push(DrawItem {
            object: id,
            mesh: handle,
            vertex_count,
            model: parent * local.local_matrix(),
            color: mesh.color,
            silhouette_id: silhouette_id(items.len()),
        });
    }
    items
}
