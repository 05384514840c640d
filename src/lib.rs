#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod controls;
pub mod core;
pub mod engine;
pub mod errors;
pub mod gpu;
pub mod loader;
pub mod registry;
pub mod renderer;
pub mod scene;
pub mod settings;

pub use controls::ArcBall;
pub use self::core::{ComponentKind, EntityAllocator, INVALID_VID, Timestamp, Vid};
pub use engine::{Engine, SharedRenderTarget};
pub use errors::{Result, VizError, VzResult};
pub use gpu::{ColorSpace, GraphicsDevice, HeadlessDevice, TextureId};
pub use loader::{FileType, LoadTicket, SceneImporter};
pub use registry::{ComponentWrapper, Registry};
pub use renderer::{InfoDisplay, Renderer, RendererOptions, RendererState};
pub use scene::{Camera, Projection, SceneStore};
pub use settings::EngineSettings;
