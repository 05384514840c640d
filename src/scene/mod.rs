//! Scene Storage
//!
//! The engine-side data the facade wraps:
//! - [`SceneStore`]: per-scene entity and component tables, hierarchy, merge
//! - [`Transform`]: TRS component with cached matrices
//! - [`Camera`]: projection and pose derived from the world transform
//! - [`components`]: light, emitter, animation, collider, weather and resource data
//! - [`transform_system`]: world matrix propagation

pub mod camera;
pub mod components;
pub mod store;
pub mod transform;
pub mod transform_system;

pub use camera::{Camera, Projection};
pub use components::{
    Animation, Collider, ColliderShape, Emitter, Light, LightType, Material, Mesh, Object, Weather,
};
pub use store::{ComponentTable, SceneStore};
pub use transform::Transform;
