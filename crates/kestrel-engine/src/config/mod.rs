//! Engine configuration.
//!
//! Plain structs with defaults; callers override fields directly. The only
//! outside source consulted is the process environment, through
//! [`EngineConfig::with_env_overrides`].

mod audio;
mod engine;
mod render;

pub use audio::AudioSettings;
pub use engine::{EngineConfig, WindowConfig};
pub use render::{RenderSettings, TextureFilter};
