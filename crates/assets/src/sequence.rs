use crate::library::MeshLibrary;
use kestrel_ecs::AnimationClip;
use std::path::Path;

/// A numbered run of mesh files such as `models/frog/hop_001.obj ..= hop_012.obj`.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSequence {
    pub clip_name: String,
    /// Path and file prefix; the padded frame number and extension are appended.
    pub prefix: String,
    pub start: u32,
    pub end: u32,
    pub extension: String,
    pub padding: usize,
    pub frame_rate: f32,
    pub looping: bool,
}

impl FrameSequence {
    pub fn new(clip_name: impl Into<String>, prefix: impl Into<String>, start: u32, end: u32) -> Self {
        Self {
            clip_name: clip_name.into(),
            prefix: prefix.into(),
            start,
            end,
            extension: ".obj".into(),
            padding: 3,
            frame_rate: 24.0,
            looping: true,
        }
    }

    pub fn frame_path(&self, frame: u32) -> String {
        format!(
            "{}{:0width$}{}",
            self.prefix,
            frame,
            self.extension,
            width = self.padding
        )
    }

    pub fn paths(&self) -> Vec<String> {
        (self.start..=self.end).map(|f| self.frame_path(f)).collect()
    }
}

/// Mesh name for a frame file: the file name without directory or extension.
pub fn mesh_name_for(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_owned())
}

/// Load every frame of `sequence` into `library` and build a clip over them.
pub fn load_sequence(library: &mut MeshLibrary, sequence: &FrameSequence) -> AnimationClip {
    tracing::debug!(
        clip = %sequence.clip_name,
        first = %sequence.frame_path(sequence.start),
        last = %sequence.frame_path(sequence.end),
        "loading frame sequence"
    );
    load_from_list(
        library,
        &sequence.clip_name,
        &sequence.paths(),
        sequence.frame_rate,
        sequence.looping,
    )
}

/// Load the listed mesh files in order and build a clip over them. Frames
/// that fail to load are logged and left out.
pub fn load_from_list(
    library: &mut MeshLibrary,
    clip_name: &str,
    paths: &[String],
    frame_rate: f32,
    looping: bool,
) -> AnimationClip {
    let mut frames = Vec::with_capacity(paths.len());
    for path in paths {
        let name = mesh_name_for(path);
        match library.load(&name, path) {
            Ok(_) => frames.push(name),
            Err(e) => tracing::warn!(clip = clip_name, frame = %path, "skipping frame: {e}"),
        }
    }
    tracing::info!(clip = clip_name, frames = frames.len(), frame_rate, "animation loaded");
    AnimationClip {
        name: clip_name.to_owned(),
        frames,
        frame_rate,
        looping,
    }
}
