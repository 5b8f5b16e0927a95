use crate::RenderError;
use std::collections::HashMap;
use std::path::Path;

/// Built-in WGSL sources, by pass name.
const EMBEDDED: [(&str, &str); 5] = [
    ("silhouette", include_str!("../shaders/silhouette.wgsl")),
    ("main", include_str!("../shaders/main.wgsl")),
    ("outline", include_str!("../shaders/outline.wgsl")),
    ("debug", include_str!("../shaders/debug.wgsl")),
    ("blit", include_str!("../shaders/blit.wgsl")),
];

/// WGSL sources for every pass. Sources can be overridden per pass from a
/// directory of `<name>.wgsl` files; missing files keep the built-in source.
#[derive(Debug, Clone)]
pub struct ShaderLibrary {
    sources: HashMap<&'static str, String>,
}

impl Default for ShaderLibrary {
    fn default() -> Self {
        Self {
            sources: EMBEDDED
                .iter()
                .map(|(name, source)| (*name, (*source).to_owned()))
                .collect(),
        }
    }
}

impl ShaderLibrary {
    pub fn names() -> impl Iterator<Item = &'static str> {
        EMBEDDED.iter().map(|(name, _)| *name)
    }

    /// Built-in sources, with overrides from `dir` when given.
    pub fn load(dir: Option<&Path>) -> Result<Self, RenderError> {
        let mut library = Self::default();
        let Some(dir) = dir else {
            return Ok(library);
        };
        for name in Self::names() {
            let path = dir.join(format!("{name}.wgsl"));
            match std::fs::read_to_string(&path) {
                Ok(source) => {
                    tracing::info!(shader = name, path = %path.display(), "shader override loaded");
                    library.sources.insert(name, source);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(shader = name, "no override, using built-in source");
                }
                Err(e) => {
                    return Err(RenderError::Shader {
                        name: name.to_owned(),
                        message: format!("failed to read {}: {e}", path.display()),
                    });
                }
            }
        }
        Ok(library)
    }

    pub fn source(&self, name: &str) -> Result<&str, RenderError> {
        self.sources
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| RenderError::ShaderNotFound(name.to_owned()))
    }

    pub(crate) fn module(
        &self,
        device: &wgpu::Device,
        name: &str,
    ) -> Result<wgpu::ShaderModule, RenderError> {
        let source = self.source(name)?;
        Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(name),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        }))
    }
}

/// Run `f` inside a validation error scope and turn a captured error into a
/// [`RenderError::Shader`] for `name`.
pub(crate) fn validated<T>(
    device: &wgpu::Device,
    name: &str,
    f: impl FnOnce() -> Result<T, RenderError>,
) -> Result<T, RenderError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let result = f();
    let error = pollster::block_on(device.pop_error_scope());
    let value = result?;
    match error {
        Some(e) => Err(RenderError::Shader {
            name: name.to_owned(),
            message: e.to_string(),
        }),
        None => Ok(value),
    }
}
