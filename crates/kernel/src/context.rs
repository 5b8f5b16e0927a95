use crate::config::EngineConfig;
use crate::scene::Scene;
use kestrel_assets::MeshLibrary;
use kestrel_common::ObjectId;
use kestrel_input::InputState;
use kestrel_render::{CameraMatrices, ZoomState, camera_matrices, find_main_camera};

/// Engine-wide state handed to game code. There is exactly one per engine
/// and it is passed explicitly; nothing here is global.
pub struct EngineContext {
    pub config: EngineConfig,
    pub input: InputState,
    pub meshes: MeshLibrary,
    pub zoom: ZoomState,
    /// Camera used for rendering. Picked from the scene on load when unset.
    pub main_camera: Option<ObjectId>,
    scene: Option<Scene>,
    time: f64,
    frame: u64,
    quit: bool,
}

impl EngineContext {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            input: InputState::new(),
            meshes: MeshLibrary::new(),
            zoom: ZoomState::default(),
            main_camera: None,
            scene: None,
            time: 0.0,
            frame: 0,
            quit: false,
        }
    }

    /// Replace the active scene. The previous scene is unloaded first, then
    /// the new one is loaded and its first enabled camera becomes the main
    /// camera.
    pub fn load_scene(&mut self, mut scene: Scene) {
        self.unload_scene();
        scene.load(&mut self.meshes);
        self.main_camera = find_main_camera(scene.world());
        if self.main_camera.is_none() {
            tracing::warn!(scene = %scene.name(), "scene has no camera, frames will not render");
        }
        self.scene = Some(scene);
    }

    pub fn unload_scene(&mut self) {
        if let Some(mut previous) = self.scene.take() {
            previous.unload();
        }
        self.main_camera = None;
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn scene_mut(&mut self) -> Option<&mut Scene> {
        self.scene.as_mut()
    }

    /// Matrices for the main camera, if it still exists and is enabled.
    pub fn camera_matrices(&self, aspect: f32) -> Option<CameraMatrices> {
        let scene = self.scene.as_ref()?;
        camera_matrices(scene.world(), self.main_camera?, aspect)
    }

    /// Seconds of game time since the engine started.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Index of the current frame, starting at 0.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn request_quit(&mut self) {
        self.quit = true;
    }

    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    pub(crate) fn set_clock(&mut self, time: f64, frame: u64) {
        self.time = time;
        self.frame = frame;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneScript;
    use kestrel_ecs::{Camera, World};
    use kestrel_physics::PhysicsSettings;

    struct WithCamera;

    impl SceneScript for WithCamera {
        fn on_load(&mut self, world: &mut World, _meshes: &mut MeshLibrary) {
            let cam = world.create_object("camera");
            world.insert(cam, Camera::default());
        }
    }

    #[test]
    fn load_scene_picks_main_camera() {
        let mut cx = EngineContext::new(EngineConfig::default());
        cx.load_scene(Scene::with_script("a", PhysicsSettings::default(), WithCamera));
        let cam = cx.main_camera.unwrap();
        assert_eq!(cx.scene().unwrap().world().object(cam).unwrap().name, "camera");
        assert!(cx.camera_matrices(16.0 / 9.0).is_some());
    }

    #[test]
    fn replacing_a_scene_unloads_the_old_one() {
        let mut cx = EngineContext::new(EngineConfig::default());
        cx.load_scene(Scene::with_script("a", PhysicsSettings::default(), WithCamera));
        cx.load_scene(Scene::new("empty", PhysicsSettings::default()));
        assert_eq!(cx.scene().unwrap().name(), "empty");
        assert!(cx.main_camera.is_none());
        assert!(cx.camera_matrices(1.0).is_none());
    }

    #[test]
    fn quit_is_sticky() {
        let mut cx = EngineContext::new(EngineConfig::default());
        assert!(!cx.quit_requested());
        cx.request_quit();
        assert!(cx.quit_requested());
    }
}
