//! Ordered pass plan with explicit target dependencies.

use std::fmt;

/// Textures the passes exchange within one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTarget {
    /// Per-pixel object id, depth and coverage.
    Silhouette,
    Depth,
    /// Low-resolution composed frame.
    SceneColor,
    /// The presentable window surface.
    Surface,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    Silhouette,
    MainColor,
    OutlineCompose,
    Debug,
    UiOverlay,
    Present,
}

impl PassKind {
    /// Every pass in mandatory execution order.
    pub const ORDER: [PassKind; 6] = [
        PassKind::Silhouette,
        PassKind::MainColor,
        PassKind::OutlineCompose,
        PassKind::Debug,
        PassKind::UiOverlay,
        PassKind::Present,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PassKind::Silhouette => "silhouette",
            PassKind::MainColor => "main",
            PassKind::OutlineCompose => "outline",
            PassKind::Debug => "debug",
            PassKind::UiOverlay => "ui",
            PassKind::Present => "blit",
        }
    }

    /// Targets whose previous contents this pass depends on.
    pub fn reads(self) -> &'static [RenderTarget] {
        match self {
            PassKind::Silhouette | PassKind::MainColor => &[],
            PassKind::OutlineCompose => &[RenderTarget::Silhouette, RenderTarget::SceneColor],
            PassKind::Debug | PassKind::UiOverlay | PassKind::Present => {
                &[RenderTarget::SceneColor]
            }
        }
    }

    pub fn writes(self) -> &'static [RenderTarget] {
        match self {
            PassKind::Silhouette => &[RenderTarget::Silhouette, RenderTarget::Depth],
            PassKind::MainColor => &[RenderTarget::SceneColor, RenderTarget::Depth],
            PassKind::OutlineCompose | PassKind::Debug | PassKind::UiOverlay => {
                &[RenderTarget::SceneColor]
            }
            PassKind::Present => &[RenderTarget::Surface],
        }
    }

    /// Whether the pass clears what it writes instead of loading it.
    pub fn clears(self) -> bool {
        matches!(self, PassKind::Silhouette | PassKind::MainColor)
    }

    /// Passes that only run when the frame asks for them.
    pub fn is_optional(self) -> bool {
        matches!(self, PassKind::Debug | PassKind::UiOverlay)
    }
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("pass '{pass}' reads {target:?} before any pass writes it")]
    UnwrittenRead { pass: PassKind, target: RenderTarget },
    #[error("pass '{0}' appears more than once")]
    Duplicate(PassKind),
}

/// The passes one frame will execute, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassPlan {
    passes: Vec<PassKind>,
}

impl PassPlan {
    /// Standard plan for a frame; debug lines and UI are conditional.
    pub fn for_frame(debug: bool, ui: bool) -> Self {
        let passes = PassKind::ORDER
            .into_iter()
            .filter(|p| match p {
                PassKind::Debug => debug,
                PassKind::UiOverlay => ui,
                _ => true,
            })
            .collect();
        Self { passes }
    }

    /// Build an arbitrary plan, checking that each read follows a write.
    pub fn from_passes(passes: Vec<PassKind>) -> Result<Self, PlanError> {
        let plan = Self { passes };
        plan.validate()?;
        Ok(plan)
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        let mut written = Vec::new();
        for (i, &pass) in self.passes.iter().enumerate() {
            if self.passes[..i].contains(&pass) {
                return Err(PlanError::Duplicate(pass));
            }
            if let Some(&target) = pass.reads().iter().find(|t| !written.contains(*t)) {
                return Err(PlanError::UnwrittenRead { pass, target });
            }
            written.extend_from_slice(pass.writes());
        }
        Ok(())
    }

    pub fn passes(&self) -> &[PassKind] {
        &self.passes
    }

    pub fn contains(&self, pass: PassKind) -> bool {
        self.passes.contains(&pass)
    }
}
