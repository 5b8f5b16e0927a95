use crate::components::MeshComponent;
use crate::world::World;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A flip-book of meshes played at a fixed frame rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationClip {
    pub name: String,
    /// Mesh names, one per frame.
    pub frames: Vec<String>,
    pub frame_rate: f32,
    pub looping: bool,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, frames: Vec<String>) -> Self {
        Self {
            name: name.into(),
            frames,
            frame_rate: 24.0,
            looping: true,
        }
    }

    pub fn duration(&self) -> f32 {
        if self.frame_rate <= 0.0 {
            return 0.0;
        }
        self.frames.len() as f32 / self.frame_rate
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AnimationError {
    #[error("animation clip not found: {0}")]
    ClipNotFound(String),
    #[error("no clip is playing")]
    NoClip,
    #[error("frame {frame} out of bounds for clip {clip} ({len} frames)")]
    FrameOutOfBounds {
        clip: String,
        frame: usize,
        len: usize,
    },
}

/// Plays mesh-sequence clips by swapping the owner's `MeshComponent` mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animator {
    clips: HashMap<String, AnimationClip>,
    current: Option<String>,
    time: f32,
    frame: usize,
    speed: f32,
    playing: bool,
    paused: bool,
    /// Set when the displayed frame changed and the mesh must be swapped.
    dirty: bool,
    pub enabled: bool,
}

impl Default for Animator {
    fn default() -> Self {
        Self {
            clips: HashMap::new(),
            current: None,
            time: 0.0,
            frame: 0,
            speed: 1.0,
            playing: false,
            paused: false,
            dirty: false,
            enabled: true,
        }
    }
}

impl Animator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_clip(&mut self, clip: AnimationClip) {
        self.clips.insert(clip.name.clone(), clip);
    }

    pub fn has_clip(&self, name: &str) -> bool {
        self.clips.contains_key(name)
    }

    pub fn clip(&self, name: &str) -> Option<&AnimationClip> {
        self.clips.get(name)
    }

    /// Start playing `name` from frame 0. Replaying the current clip is a
    /// no-op unless `force_restart` is set.
    pub fn play(&mut self, name: &str, force_restart: bool) -> Result<(), AnimationError> {
        if !self.clips.contains_key(name) {
            return Err(AnimationError::ClipNotFound(name.to_owned()));
        }
        if self.playing && !force_restart && self.current.as_deref() == Some(name) {
            return Ok(());
        }
        self.current = Some(name.to_owned());
        self.time = 0.0;
        self.frame = 0;
        self.playing = true;
        self.paused = false;
        self.dirty = true;
        Ok(())
    }

    pub fn stop(&mut self) {
        self.playing = false;
        self.paused = false;
        self.time = 0.0;
        self.frame = 0;
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn is_playing(&self) -> bool {
        self.playing && !self.paused
    }

    pub fn current_clip(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current_frame(&self) -> usize {
        self.frame
    }

    /// Advance playback time. Returns true when the displayed frame changed.
    pub fn advance(&mut self, dt: f32) -> bool {
        if !self.playing || self.paused {
            return false;
        }
        let Some(clip) = self.current.as_ref().and_then(|n| self.clips.get(n)) else {
            return false;
        };
        if clip.frame_rate <= 0.0 || clip.frames.is_empty() {
            return false;
        }
        let len = clip.frames.len();
        let looping = clip.looping;
        let duration = clip.duration();
        let frame_duration = 1.0 / clip.frame_rate;

        self.time += dt * self.speed;
        let mut next = (self.time / frame_duration).max(0.0) as usize;
        if next >= len {
            if looping {
                self.time %= duration;
                next = ((self.time / frame_duration) as usize).min(len - 1);
            } else {
                next = len - 1;
                self.playing = false;
            }
        }

        if next != self.frame {
            self.frame = next;
            self.dirty = true;
        }
        std::mem::take(&mut self.dirty)
    }

    /// Mesh name for the current frame.
    pub fn frame_mesh(&self) -> Result<&str, AnimationError> {
        let name = self.current.as_ref().ok_or(AnimationError::NoClip)?;
        let clip = self
            .clips
            .get(name)
            .ok_or_else(|| AnimationError::ClipNotFound(name.clone()))?;
        clip.frames
            .get(self.frame)
            .map(String::as_str)
            .ok_or_else(|| AnimationError::FrameOutOfBounds {
                clip: name.clone(),
                frame: self.frame,
                len: clip.frames.len(),
            })
    }
}

impl World {
    /// Start a clip and swap the owner's mesh immediately.
    pub fn play_animation(
        &mut self,
        id: kestrel_common::ObjectId,
        clip: &str,
        force_restart: bool,
    ) -> bool {
        let Some(animator) = self.get_mut::<Animator>(id) else {
            tracing::warn!(clip, "play_animation on object without an Animator");
            return false;
        };
        if let Err(e) = animator.play(clip, force_restart) {
            tracing::warn!("{e}");
            return false;
        }
        animator.dirty = false;
        self.apply_animation_frame(id);
        true
    }

    /// Advance every enabled animator on an active object and swap meshes
    /// whose frame changed.
    pub fn update_animators(&mut self, dt: f32) {
        for id in self.ids_with::<Animator>() {
            let active = self.object(id).is_some_and(|o| o.active);
            let Some(animator) = self.get_mut::<Animator>(id) else {
                continue;
            };
            if !active || !animator.enabled {
                continue;
            }
            if animator.advance(dt) {
                self.apply_animation_frame(id);
            }
        }
    }

    fn apply_animation_frame(&mut self, id: kestrel_common::ObjectId) {
        let mesh = match self.get::<Animator>(id).map(Animator::frame_mesh) {
            Some(Ok(mesh)) => mesh.to_owned(),
            Some(Err(e)) => {
                tracing::error!("{e}");
                return;
            }
            None => return,
        };
        match self.get_mut::<MeshComponent>(id) {
            Some(component) => component.mesh = mesh,
            None => tracing::error!(mesh = %mesh, "animated object has no MeshComponent"),
        }
    }
}
