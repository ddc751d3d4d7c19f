use winit::dpi::LogicalSize;

use crate::device::BackendKind;
use crate::logging::LoggingConfig;

use super::{AudioSettings, RenderSettings};

/// Main window parameters.
#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    pub fullscreen: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "kestrel".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
            fullscreen: false,
        }
    }
}

/// Everything `Runtime::run` needs to bring the engine up.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub window: WindowConfig,
    pub render: RenderSettings,
    pub backend: BackendKind,
    pub audio: AudioSettings,

    /// Spawn the gamepad polling thread.
    pub gamepads: bool,

    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Applies `KESTREL_*` variables from the process environment.
    ///
    /// Recognised: `KESTREL_BACKEND` (`wgpu`|`null`), `KESTREL_VSYNC` (`0`|`1`),
    /// `KESTREL_MSAA` (sample count), `KESTREL_DEBUG_RENDERER` (`0`|`1`).
    /// Malformed values are logged and ignored.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Same as [`with_env_overrides`](Self::with_env_overrides) with an explicit lookup.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup("KESTREL_BACKEND") {
            match v.parse::<BackendKind>() {
                Ok(kind) => self.backend = kind,
                Err(e) => log::warn!("ignoring KESTREL_BACKEND: {e}"),
            }
        }

        if let Some(v) = lookup("KESTREL_VSYNC") {
            match parse_flag(&v) {
                Some(on) => self.render.vertical_sync = on,
                None => log::warn!("ignoring KESTREL_VSYNC={v:?}: expected 0 or 1"),
            }
        }

        if let Some(v) = lookup("KESTREL_MSAA") {
            match v.trim().parse::<u32>() {
                Ok(n) if n > 0 => self.render.sample_count = n,
                _ => log::warn!("ignoring KESTREL_MSAA={v:?}: expected a positive sample count"),
            }
        }

        if let Some(v) = lookup("KESTREL_DEBUG_RENDERER") {
            match parse_flag(&v) {
                Some(on) => self.render.debug_renderer = on,
                None => log::warn!("ignoring KESTREL_DEBUG_RENDERER={v:?}: expected 0 or 1"),
            }
        }

        self
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" => Some(true),
        "0" | "false" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn apply(vars: &[(&str, &str)]) -> EngineConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EngineConfig::default().with_overrides(|k| vars.get(k).cloned())
    }

    #[test]
    fn no_variables_keeps_defaults() {
        let cfg = apply(&[]);
        assert_eq!(cfg.backend, BackendKind::default());
        assert_eq!(cfg.render, RenderSettings::default());
    }

    #[rstest]
    #[case::null("null", BackendKind::Null)]
    #[case::upper("NULL", BackendKind::Null)]
    fn backend_override(#[case] raw: &str, #[case] expected: BackendKind) {
        assert_eq!(apply(&[("KESTREL_BACKEND", raw)]).backend, expected);
    }

    #[cfg(feature = "wgpu-backend")]
    #[test]
    fn wgpu_backend_override() {
        let cfg = apply(&[("KESTREL_BACKEND", "null")]).with_overrides(|k| {
            (k == "KESTREL_BACKEND").then(|| "wgpu".to_string())
        });
        assert_eq!(cfg.backend, BackendKind::Wgpu);
    }

    #[test]
    fn unknown_backend_is_ignored() {
        let cfg = apply(&[("KESTREL_BACKEND", "vulkan-please")]);
        assert_eq!(cfg.backend, BackendKind::default());
    }

    #[rstest]
    #[case::zero("0", false)]
    #[case::one("1", true)]
    #[case::word("off", false)]
    fn vsync_override(#[case] raw: &str, #[case] expected: bool) {
        assert_eq!(apply(&[("KESTREL_VSYNC", raw)]).render.vertical_sync, expected);
    }

    #[rstest]
    #[case::four("4", 4)]
    #[case::padded(" 8 ", 8)]
    #[case::zero("0", 1)]
    #[case::garbage("lots", 1)]
    fn msaa_override(#[case] raw: &str, #[case] expected: u32) {
        assert_eq!(apply(&[("KESTREL_MSAA", raw)]).render.sample_count, expected);
    }

    #[test]
    fn debug_renderer_override() {
        let cfg = apply(&[("KESTREL_DEBUG_RENDERER", "1"), ("KESTREL_VSYNC", "maybe")]);
        assert!(cfg.render.debug_renderer);
        assert!(cfg.render.vertical_sync);
    }
}
