//! Error Types
//!
//! This module defines the error types used throughout the engine facade.
//!
//! # Overview
//!
//! Internal operations return [`Result<T>`], an alias for
//! `std::result::Result<T, VizError>`. The host-facing [`Engine`](crate::Engine)
//! never propagates these: it logs them and hands back the sentinel contract
//! of the ABI (an invalid [`Vid`], `None`, or a [`VzResult`] code).
//!
//! | Error class          | Surfaced to the host as          |
//! |----------------------|----------------------------------|
//! | not found            | `INVALID_VID` / `None` / `Fail`  |
//! | precondition failure | `Fail` or `Warning` + log line   |
//! | not ready            | `JobWait` (retry next tick)      |

use thiserror::Error;

use crate::core::Vid;

/// Stable result codes of the host ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum VzResult {
    /// Operation completed.
    Ok = 0,
    /// Hard failure; nothing was changed unless documented otherwise.
    Fail = 1,
    /// The engine is still warming up; retry on the next tick.
    JobWait = 2,
    /// Soft failure, the operation was partially or entirely a no-op.
    Warning = 3,
}

impl VzResult {
    #[inline]
    #[must_use]
    pub fn is_ok(self) -> bool {
        self == VzResult::Ok
    }

    #[inline]
    #[must_use]
    pub fn is_fail(self) -> bool {
        self == VzResult::Fail
    }
}

/// The main error type of the facade.
#[derive(Error, Debug)]
pub enum VizError {
    // ========================================================================
    // Not Found
    // ========================================================================
    /// The handle does not name a live scene.
    #[error("Scene not found: {0}")]
    SceneNotFound(Vid),

    /// The handle does not name a live entity of the requested kind.
    #[error("Entity not found: {0}")]
    EntityNotFound(Vid),

    /// No renderer is bound to the camera handle.
    #[error("No renderer bound to camera {0}")]
    NoRenderer(Vid),

    /// The handle is not a camera in any live scene.
    #[error("Camera {0} does not resolve to a camera in any live scene")]
    CameraNotResolved(Vid),

    // ========================================================================
    // Precondition Violations
    // ========================================================================
    /// A live scene already uses this name.
    #[error("'{0}' is already registered as a scene")]
    DuplicateSceneName(String),

    /// A renderer is already bound to the camera.
    #[error("Renderer already bound to camera {0}")]
    RendererAlreadyBound(Vid),

    /// Invalid hierarchy edge (self-parenting, cycle or cross-scene parent).
    #[error("Cannot attach entity {entity} to parent {parent}")]
    InvalidParent {
        /// Child entity
        entity: Vid,
        /// Requested parent
        parent: Vid,
    },

    /// The component kind cannot be created through this entry point.
    #[error("Component kind {0:?} cannot be created directly")]
    UnsupportedKind(crate::core::ComponentKind),

    /// Both merge operands name the same scene.
    #[error("Cannot merge scene {0} into itself")]
    SelfMerge(Vid),

    /// The handle space is exhausted.
    #[error("VID space exhausted")]
    HandleSpaceExhausted,

    // ========================================================================
    // Lifecycle
    // ========================================================================
    /// Engine library already initialized.
    #[error("Engine already initialized")]
    AlreadyInitialized,

    /// Engine library not initialized, or the device is still warming up.
    #[error("Engine not initialized")]
    NotInitialized,

    // ========================================================================
    // Loading
    // ========================================================================
    /// The file extension is not a supported scene format.
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// No importer has been registered for this format.
    #[error("No importer registered for {0}")]
    ImporterMissing(String),

    /// The importer reported a failure.
    #[error("Import failed: {0}")]
    Import(String),

    /// The load job was cancelled before it could be installed.
    #[error("Load cancelled")]
    LoadCancelled,

    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing error (settings files).
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    // ========================================================================
    // Camera Control
    // ========================================================================
    /// The arcball has no stage or no drag in progress.
    #[error("Arcball not ready: {0}")]
    ArcballNotReady(&'static str),

    /// The camera's screen/world transform is singular or non-finite.
    #[error("Singular screen-to-world transform")]
    SingularTransform,

    // ========================================================================
    // Device
    // ========================================================================
    /// The graphics device rejected a request.
    #[error("Graphics device error: {0}")]
    Device(String),
}

impl VizError {
    /// Maps the error onto the host result code.
    #[must_use]
    pub fn code(&self) -> VzResult {
        match self {
            VizError::AlreadyInitialized => VzResult::Warning,
            VizError::NotInitialized => VzResult::JobWait,
            _ => VzResult::Fail,
        }
    }
}

/// Alias for `Result<T, VizError>`.
pub type Result<T> = std::result::Result<T, VizError>;
