use crate::foundation::core::SurfaceSize;
use crate::foundation::error::ConfigError;
use crate::render::backend::{BackendFactory, BackendKind, SurfaceConfig, WindowHandle};
use crate::session::capture::CaptureBuffer;

const VALID_SAMPLES: [u32; 5] = [0, 1, 2, 4, 8];

/// Render context configuration.
///
/// A plain value object: build it in code or load it from JSON, then hand it to
/// [`crate::RenderContext::configure`], which validates it before touching any state.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Rendering API selector.
    pub backend: BackendKind,
    /// Host window for onscreen rendering.
    pub window: Option<WindowHandle>,
    /// Render into a fixed-size offscreen surface.
    pub offscreen: bool,
    pub width: u32,
    pub height: u32,
    /// MSAA sample count, one of 0, 1, 2, 4, 8.
    pub samples: u32,
    /// Forward the draw time to `present` as the presentation timestamp.
    pub set_surface_pts: bool,
    /// Straight-alpha RGBA, each component in `[0, 1]`.
    pub clear_color: [f32; 4],
    /// Host buffer to bind as part of this configuration.
    #[serde(skip)]
    pub capture_buffer: Option<CaptureBuffer>,
    /// Overlay a diagnostics strip on every frame.
    pub hud: bool,
    pub hud_scale: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::Auto,
            window: None,
            offscreen: true,
            width: 0,
            height: 0,
            samples: 0,
            set_surface_pts: false,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            capture_buffer: None,
            hud: false,
            hud_scale: 1,
        }
    }
}

impl Config {
    /// Offscreen configuration of the given size, other fields at their defaults.
    pub fn offscreen(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn size(&self) -> SurfaceSize {
        SurfaceSize::new(self.width, self.height)
    }

    /// Check every field against the rules a context enforces, including backend support.
    pub fn validate(&self, factory: &dyn BackendFactory) -> Result<(), ConfigError> {
        if self.offscreen && self.size().is_empty() {
            return Err(ConfigError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        match (self.offscreen, self.window.is_some()) {
            (false, false) => return Err(ConfigError::MissingWindow),
            (true, true) => return Err(ConfigError::UnexpectedWindow),
            _ => {}
        }
        if !VALID_SAMPLES.contains(&self.samples) {
            return Err(ConfigError::InvalidSamples(self.samples));
        }
        if self
            .clear_color
            .iter()
            .any(|c| !c.is_finite() || !(0.0..=1.0).contains(c))
        {
            return Err(ConfigError::InvalidClearColor(self.clear_color));
        }
        if self.hud_scale < 1 {
            return Err(ConfigError::InvalidHudScale(self.hud_scale));
        }
        if !factory.supports(self.backend) {
            return Err(ConfigError::UnsupportedBackend(self.backend));
        }
        Ok(())
    }

    pub(crate) fn surface_config(&self) -> SurfaceConfig {
        SurfaceConfig {
            size: self.size(),
            offscreen: self.offscreen,
            window: self.window,
            samples: self.samples,
            clear_color: self.clear_color,
            hud: self.hud,
            hud_scale: self.hud_scale,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/config.rs"]
mod tests;
