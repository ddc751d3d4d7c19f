//! Kestrel engine crate.
//!
//! This crate owns the render device and its command pipeline, plus the audio
//! streaming and input plumbing that share the same "owning thread + queue" shape.

pub mod audio;
pub mod command;
pub mod config;
pub mod coords;
pub mod core;
pub mod device;
pub mod input;
pub mod logging;
pub mod shader;
pub mod window;
