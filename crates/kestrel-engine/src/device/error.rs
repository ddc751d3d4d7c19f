use std::fmt;

use crate::command::{CommandBuffer, ResourceId};
use crate::coords::Size2;

use super::caps::ApiVersion;

/// Failure of a single backend call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("{0} is not supported by this backend")]
    Unsupported(&'static str),

    #[error("unknown resource {0}")]
    UnknownResource(ResourceId),

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("surface lost")]
    SurfaceLost,

    #[error("frame skipped: {0}")]
    FrameSkipped(String),

    #[error("out of memory")]
    OutOfMemory,

    #[error("backend panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Failed(String),
}

/// Step of `RenderDevice::init` that acquires a platform handle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum InitStage {
    Display,
    Surface,
    Config,
    Context,
}

impl fmt::Display for InitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InitStage::Display => "open display",
            InitStage::Surface => "create surface",
            InitStage::Config => "choose frame-buffer configuration",
            InitStage::Context => "create context",
        })
    }
}

/// Fatal initialisation error. Never retried.
#[derive(Debug, thiserror::Error)]
pub enum ContextCreationError {
    #[error("failed to {stage}: {source}")]
    Stage {
        stage: InitStage,
        #[source]
        source: BackendError,
    },

    #[error("no context version configured")]
    NoCandidateVersions,

    #[error("no supported context version among {tried:?}: {last}")]
    NoSupportedVersion {
        tried: Vec<ApiVersion>,
        #[source]
        last: BackendError,
    },

    #[error("failed to bind the context on the render thread: {0}")]
    MakeCurrent(#[source] BackendError),

    #[error("failed to spawn the render thread: {0}")]
    ThreadSpawn(#[source] std::io::Error),
}

impl ContextCreationError {
    pub(crate) fn stage(stage: InitStage) -> impl FnOnce(BackendError) -> Self {
        move |source| ContextCreationError::Stage { stage, source }
    }
}

/// Buffer swap failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PresentError {
    #[error("no context to present from")]
    NoContext,

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Per-buffer failure reported by the render thread. Always recoverable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("command #{index} ({command}) failed: {source}")]
    Command {
        index: usize,
        command: &'static str,
        #[source]
        source: BackendError,
    },

    #[error("present (command #{index}) failed: {source}")]
    Present {
        index: usize,
        #[source]
        source: PresentError,
    },

    #[error("resize to {size} failed: {source}")]
    Resize {
        size: Size2,
        #[source]
        source: BackendError,
    },
}

/// Returned by `RenderDevice::submit` once the render thread no longer accepts work.
///
/// Carries the rejected buffer back to the caller.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("render device is stopped")]
    Stopped(CommandBuffer),
}
