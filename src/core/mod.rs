//! Core Vocabulary
//!
//! Handle space and shared enumerations used by every other module:
//!
//! - [`Vid`]: 32-bit opaque handle for scenes, entities and resources
//! - [`ComponentKind`]: closed set of wrapper kinds exposed to the host
//! - [`EntityAllocator`]: thread-safe handle minting shared with load workers
//! - [`math`]: small matrix helpers exposed through the public API

pub mod math;

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

/// Opaque handle naming a scene, a scene entity or a resource.
pub type Vid = u32;

/// Reserved "none" handle. Never names a live object.
pub const INVALID_VID: Vid = 0;

/// Mutation timestamp stamped on wrappers by their setters.
pub type Timestamp = std::time::Instant;

/// Kind tag of a component wrapper.
///
/// Discriminants follow the host ABI ordering and must not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u32)]
pub enum ComponentKind {
    #[default]
    Undefined = 0,
    Base,
    Camera,
    Actor,
    Geometry,
    Material,
    Light,
    Emitter,
    Animation,
    Weather,
    Collider,
}

impl ComponentKind {
    /// All kinds that can be held by a wrapper, in ABI order.
    pub const WRAPPABLE: [ComponentKind; 10] = [
        ComponentKind::Base,
        ComponentKind::Camera,
        ComponentKind::Actor,
        ComponentKind::Geometry,
        ComponentKind::Material,
        ComponentKind::Light,
        ComponentKind::Emitter,
        ComponentKind::Animation,
        ComponentKind::Weather,
        ComponentKind::Collider,
    ];

    /// Converts a raw ABI value. Unknown values map to [`ComponentKind::Undefined`].
    #[must_use]
    pub fn from_raw(value: u32) -> Self {
        Self::WRAPPABLE
            .iter()
            .copied()
            .find(|k| *k as u32 == value)
            .unwrap_or(ComponentKind::Undefined)
    }

    /// Resources are not part of the transform hierarchy.
    #[inline]
    #[must_use]
    pub fn is_resource(self) -> bool {
        matches!(self, ComponentKind::Geometry | ComponentKind::Material)
    }
}

/// Monotonic handle allocator.
///
/// Cloning shares the underlying counter, so load workers running off the
/// main thread mint handles from the same space as the registry.
/// Handles are never handed out twice.
#[derive(Debug, Clone)]
pub struct EntityAllocator {
    next: Arc<AtomicU32>,
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next: Arc::new(AtomicU32::new(1)),
        }
    }

    /// Returns a fresh handle, or [`INVALID_VID`] once the space is exhausted.
    pub fn allocate(&self) -> Vid {
        let result = self
            .next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |cur| {
                (cur != INVALID_VID).then(|| cur.wrapping_add(1))
            });
        match result {
            Ok(vid) => vid,
            Err(_) => {
                log::error!("VID space exhausted, no further entities can be created");
                INVALID_VID
            }
        }
    }

    /// Number of handles issued so far.
    #[must_use]
    pub fn issued(&self) -> u32 {
        self.next.load(Ordering::Relaxed).wrapping_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_never_returns_invalid_or_duplicates() {
        let alloc = EntityAllocator::new();
        let a = alloc.allocate();
        let b = alloc.allocate();
        assert_ne!(a, INVALID_VID);
        assert_ne!(a, b);
        assert_eq!(alloc.issued(), 2);
    }

    #[test]
    fn allocator_clones_share_counter() {
        let alloc = EntityAllocator::new();
        let worker = alloc.clone();
        let a = alloc.allocate();
        let b = worker.allocate();
        assert_eq!(b, a + 1);
    }

    #[test]
    fn allocator_exhaustion_yields_invalid() {
        let alloc = EntityAllocator {
            next: Arc::new(AtomicU32::new(u32::MAX)),
        };
        assert_eq!(alloc.allocate(), u32::MAX);
        assert_eq!(alloc.allocate(), INVALID_VID);
        assert_eq!(alloc.allocate(), INVALID_VID);
    }

    #[test]
    fn component_kind_raw_round_trip() {
        assert_eq!(ComponentKind::from_raw(2), ComponentKind::Camera);
        assert_eq!(ComponentKind::from_raw(10), ComponentKind::Collider);
        assert_eq!(ComponentKind::from_raw(99), ComponentKind::Undefined);
    }
}
