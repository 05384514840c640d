//! Transform System
//!
//! Propagates world matrices down the entity hierarchy. Kept separate from
//! [`SceneStore`](super::SceneStore) so it only borrows the tables it needs.
//!
//! Traversal uses an explicit stack instead of recursion so deep hierarchies
//! from imported files cannot overflow the call stack. Parents are always
//! visited before their children.

use glam::Affine3A;
use rustc_hash::FxHashMap;

use crate::core::Vid;
use crate::scene::camera::Camera;
use crate::scene::store::{ChildList, ComponentTable};
use crate::scene::transform::Transform;

/// Updates world matrices for every subtree rooted at `roots`.
///
/// Cameras attached to a refreshed entity get their pose re-derived.
pub fn update_hierarchy(
    transforms: &mut ComponentTable<Transform>,
    cameras: &mut ComponentTable<Camera>,
    children: &FxHashMap<Vid, ChildList>,
    roots: &[Vid],
) {
    // (entity, parent world, parent changed)
    let mut stack: Vec<(Vid, Affine3A, bool)> = Vec::with_capacity(64);

    for &root in roots.iter().rev() {
        stack.push((root, Affine3A::IDENTITY, false));
    }

    while let Some((vid, parent_world, parent_changed)) = stack.pop() {
        let Some(transform) = transforms.get_mut(vid) else {
            continue;
        };

        let local_changed = transform.update_local_matrix();
        let world_needs_update = local_changed || parent_changed;

        if world_needs_update {
            let new_world = parent_world * *transform.local_matrix();
            transform.set_world_matrix(new_world);

            if let Some(camera) = cameras.get_mut(vid) {
                camera.update_from_world(&new_world);
            }
        }

        let current_world = *transform.world_matrix();
        if let Some(kids) = children.get(&vid) {
            for &child in kids.iter().rev() {
                stack.push((child, current_world, world_needs_update));
            }
        }
    }
}
