use glam::Affine3A;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::core::{ComponentKind, EntityAllocator, INVALID_VID, Vid};
use crate::errors::{Result, VizError};
use crate::scene::camera::Camera;
use crate::scene::components::{
    Animation, Collider, Emitter, Light, Material, Mesh, Object, Weather,
};
use crate::scene::transform::Transform;
use crate::scene::transform_system;

/// Children of one entity, in attach order.
pub type ChildList = SmallVec<[Vid; 4]>;

// ============================================================================
// ComponentTable
// ============================================================================

/// Per-kind component storage keyed by entity handle.
///
/// Keeps insertion order so enumeration follows creation order.
#[derive(Debug, Clone)]
pub struct ComponentTable<T> {
    order: Vec<Vid>,
    data: FxHashMap<Vid, T>,
}

impl<T> Default for ComponentTable<T> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            data: FxHashMap::default(),
        }
    }
}

impl<T> ComponentTable<T> {
    pub fn insert(&mut self, vid: Vid, value: T) {
        if self.data.insert(vid, value).is_none() {
            self.order.push(vid);
        }
    }

    pub fn remove(&mut self, vid: Vid) -> Option<T> {
        let value = self.data.remove(&vid)?;
        self.order.retain(|v| *v != vid);
        Some(value)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, vid: Vid) -> Option<&T> {
        self.data.get(&vid)
    }

    #[inline]
    pub fn get_mut(&mut self, vid: Vid) -> Option<&mut T> {
        self.data.get_mut(&vid)
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, vid: Vid) -> bool {
        self.data.contains_key(&vid)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Handles in insertion order.
    #[inline]
    #[must_use]
    pub fn vids(&self) -> &[Vid] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = (Vid, &T)> {
        self.order.iter().filter_map(|v| self.data.get(v).map(|c| (*v, c)))
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.data.values_mut()
    }

    /// Moves every entry of `other` to the end of `self`.
    pub fn append(&mut self, other: &mut Self) {
        for vid in other.order.drain(..) {
            if let Some(value) = other.data.remove(&vid) {
                self.insert(vid, value);
            }
        }
    }
}

// ============================================================================
// SceneStore
// ============================================================================

#[derive(Debug, Clone)]
struct EntityRecord {
    name: String,
    kind: ComponentKind,
}

/// Engine-side storage of one scene's entities and components.
///
/// Every entity has a name and a primary [`ComponentKind`]. Entities of
/// hierarchy kinds also carry a [`Transform`]; resources (meshes, materials),
/// animations and weather entries do not.
#[derive(Debug, Clone)]
pub struct SceneStore {
    allocator: EntityAllocator,

    entities: ComponentTable<EntityRecord>,
    transforms: ComponentTable<Transform>,
    parents: FxHashMap<Vid, Vid>,
    children: FxHashMap<Vid, ChildList>,

    cameras: ComponentTable<Camera>,
    lights: ComponentTable<Light>,
    emitters: ComponentTable<Emitter>,
    animations: ComponentTable<Animation>,
    objects: ComponentTable<Object>,
    meshes: ComponentTable<Mesh>,
    materials: ComponentTable<Material>,
    colliders: ComponentTable<Collider>,
    weathers: ComponentTable<Weather>,

    /// Active weather of the scene.
    pub weather: Weather,
    time: f32,
}

macro_rules! table_accessors {
    ($($field:ident: $ty:ty => $get:ident, $get_mut:ident;)*) => {
        $(
            #[inline]
            #[must_use]
            pub fn $get(&self, vid: Vid) -> Option<&$ty> {
                self.$field.get(vid)
            }

            #[inline]
            pub fn $get_mut(&mut self, vid: Vid) -> Option<&mut $ty> {
                self.$field.get_mut(vid)
            }
        )*
    };
}

impl SceneStore {
    #[must_use]
    pub fn new(allocator: EntityAllocator) -> Self {
        Self {
            allocator,
            entities: ComponentTable::default(),
            transforms: ComponentTable::default(),
            parents: FxHashMap::default(),
            children: FxHashMap::default(),
            cameras: ComponentTable::default(),
            lights: ComponentTable::default(),
            emitters: ComponentTable::default(),
            animations: ComponentTable::default(),
            objects: ComponentTable::default(),
            meshes: ComponentTable::default(),
            materials: ComponentTable::default(),
            colliders: ComponentTable::default(),
            weathers: ComponentTable::default(),
            weather: Weather::default(),
            time: 0.0,
        }
    }

    /// Allocator shared with the registry.
    #[inline]
    #[must_use]
    pub fn allocator(&self) -> &EntityAllocator {
        &self.allocator
    }

    // ========================================================================
    // Entity factories
    // ========================================================================

    fn spawn(&mut self, name: &str, kind: ComponentKind, with_transform: bool) -> Result<Vid> {
        let vid = self.allocator.allocate();
        if vid == INVALID_VID {
            return Err(VizError::HandleSpaceExhausted);
        }
        self.entities.insert(
            vid,
            EntityRecord {
                name: name.to_string(),
                kind,
            },
        );
        if with_transform {
            self.transforms.insert(vid, Transform::new());
        }
        Ok(vid)
    }

    /// Transform-only entity.
    pub fn create_node(&mut self, name: &str) -> Result<Vid> {
        self.spawn(name, ComponentKind::Base, true)
    }

    pub fn create_camera(&mut self, name: &str) -> Result<Vid> {
        let vid = self.spawn(name, ComponentKind::Camera, true)?;
        self.cameras.insert(vid, Camera::new());
        Ok(vid)
    }

    pub fn create_object(&mut self, name: &str) -> Result<Vid> {
        let vid = self.spawn(name, ComponentKind::Actor, true)?;
        self.objects.insert(
            vid,
            Object {
                visible: true,
                ..Default::default()
            },
        );
        Ok(vid)
    }

    pub fn create_light(&mut self, name: &str) -> Result<Vid> {
        let vid = self.spawn(name, ComponentKind::Light, true)?;
        self.lights.insert(vid, Light::default());
        Ok(vid)
    }

    pub fn create_emitter(&mut self, name: &str) -> Result<Vid> {
        let vid = self.spawn(name, ComponentKind::Emitter, true)?;
        self.emitters.insert(vid, Emitter::default());
        Ok(vid)
    }

    pub fn create_collider(&mut self, name: &str) -> Result<Vid> {
        let vid = self.spawn(name, ComponentKind::Collider, true)?;
        self.colliders.insert(vid, Collider::default());
        Ok(vid)
    }

    pub fn create_animation(&mut self, name: &str) -> Result<Vid> {
        let vid = self.spawn(name, ComponentKind::Animation, false)?;
        self.animations.insert(vid, Animation::default());
        Ok(vid)
    }

    pub fn create_mesh(&mut self, name: &str) -> Result<Vid> {
        let vid = self.spawn(name, ComponentKind::Geometry, false)?;
        self.meshes.insert(vid, Mesh::default());
        Ok(vid)
    }

    pub fn create_material(&mut self, name: &str) -> Result<Vid> {
        let vid = self.spawn(name, ComponentKind::Material, false)?;
        self.materials.insert(vid, Material::default());
        Ok(vid)
    }

    /// Weather preset entry. Activate with [`set_weather_preset`](Self::set_weather_preset).
    pub fn create_weather(&mut self, name: &str) -> Result<Vid> {
        let vid = self.spawn(name, ComponentKind::Weather, false)?;
        self.weathers.insert(vid, Weather::default());
        Ok(vid)
    }

    // ========================================================================
    // Hierarchy
    // ========================================================================

    /// Attaches `child` under `parent`, keeping the child's world pose.
    ///
    /// Rejects self-parenting, entities without transforms, parents outside
    /// this store and cycles.
    pub fn attach(&mut self, child: Vid, parent: Vid) -> Result<()> {
        let invalid = VizError::InvalidParent {
            entity: child,
            parent,
        };
        if child == parent || !self.transforms.contains(child) || !self.transforms.contains(parent)
        {
            return Err(invalid);
        }
        if self.parents.get(&child) == Some(&parent) {
            return Ok(());
        }
        if self.is_descendant_of(parent, child) {
            return Err(invalid);
        }

        let child_world = self.world_matrix_of(child);
        let parent_world = self.world_matrix_of(parent);
        self.unlink(child);
        self.parents.insert(child, parent);
        self.children.entry(parent).or_default().push(child);

        if let Some(t) = self.transforms.get_mut(child) {
            t.apply_local_matrix(parent_world.inverse() * child_world);
        }
        Ok(())
    }

    /// Detaches `child` from its parent, keeping its world pose.
    pub fn detach(&mut self, child: Vid) {
        if !self.parents.contains_key(&child) {
            return;
        }
        let world = self.world_matrix_of(child);
        self.unlink(child);
        if let Some(t) = self.transforms.get_mut(child) {
            t.apply_local_matrix(world);
        }
    }

    fn unlink(&mut self, child: Vid) {
        if let Some(old) = self.parents.remove(&child)
            && let Some(siblings) = self.children.get_mut(&old)
        {
            siblings.retain(|c| *c != child);
        }
    }

    /// Whether `vid` lies in the subtree rooted at `ancestor` (inclusive).
    #[must_use]
    pub fn is_descendant_of(&self, vid: Vid, ancestor: Vid) -> bool {
        let mut cur = Some(vid);
        while let Some(v) = cur {
            if v == ancestor {
                return true;
            }
            cur = self.parents.get(&v).copied();
        }
        false
    }

    #[inline]
    #[must_use]
    pub fn parent_of(&self, vid: Vid) -> Option<Vid> {
        self.parents.get(&vid).copied()
    }

    #[must_use]
    pub fn children_of(&self, vid: Vid) -> &[Vid] {
        self.children.get(&vid).map_or(&[][..], |c| c.as_slice())
    }

    /// World matrix composed from the current local TRS of the ancestor chain.
    #[must_use]
    pub fn world_matrix_of(&self, vid: Vid) -> Affine3A {
        let mut world = Affine3A::IDENTITY;
        let mut cur = Some(vid);
        while let Some(v) = cur {
            if let Some(t) = self.transforms.get(v) {
                world = t.compose_local() * world;
            }
            cur = self.parents.get(&v).copied();
        }
        world
    }

    // ========================================================================
    // Removal
    // ========================================================================

    /// Removes `vid` and all of its descendants.
    ///
    /// Returns every removed handle, `vid` first. Empty when `vid` is unknown.
    pub fn remove_entity(&mut self, vid: Vid) -> Vec<Vid> {
        if !self.entities.contains(vid) {
            return Vec::new();
        }
        self.unlink(vid);

        let mut removed = vec![vid];
        let mut i = 0;
        while i < removed.len() {
            if let Some(kids) = self.children.remove(&removed[i]) {
                removed.extend(kids);
            }
            i += 1;
        }

        for &v in &removed {
            self.parents.remove(&v);
            self.entities.remove(v);
            self.transforms.remove(v);
            self.cameras.remove(v);
            self.lights.remove(v);
            self.emitters.remove(v);
            self.animations.remove(v);
            self.objects.remove(v);
            self.meshes.remove(v);
            self.materials.remove(v);
            self.colliders.remove(v);
            self.weathers.remove(v);
        }
        removed
    }

    // ========================================================================
    // Queries
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn contains(&self, vid: Vid) -> bool {
        self.entities.contains(vid)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Every entity in creation order.
    #[must_use]
    pub fn find_all_entities(&self) -> &[Vid] {
        self.entities.vids()
    }

    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<Vid> {
        self.entities
            .iter()
            .find(|(_, rec)| rec.name == name)
            .map(|(vid, _)| vid)
    }

    #[must_use]
    pub fn find_all_by_name(&self, name: &str) -> Vec<Vid> {
        self.entities
            .iter()
            .filter(|(_, rec)| rec.name == name)
            .map(|(vid, _)| vid)
            .collect()
    }

    #[must_use]
    pub fn name_of(&self, vid: Vid) -> Option<&str> {
        self.entities.get(vid).map(|rec| rec.name.as_str())
    }

    pub fn set_name(&mut self, vid: Vid, name: &str) -> bool {
        match self.entities.get_mut(vid) {
            Some(rec) => {
                rec.name = name.to_string();
                true
            }
            None => false,
        }
    }

    /// Primary kind of an entity.
    #[must_use]
    pub fn kind_of(&self, vid: Vid) -> Option<ComponentKind> {
        self.entities.get(vid).map(|rec| rec.kind)
    }

    /// Handles of a component kind in creation order.
    ///
    /// `Base` lists every entity that carries a transform.
    #[must_use]
    pub fn entities_of(&self, kind: ComponentKind) -> Vec<Vid> {
        match kind {
            ComponentKind::Base => self.transforms.vids().to_vec(),
            ComponentKind::Camera => self.cameras.vids().to_vec(),
            ComponentKind::Actor => self.objects.vids().to_vec(),
            ComponentKind::Geometry => self.meshes.vids().to_vec(),
            ComponentKind::Material => self.materials.vids().to_vec(),
            ComponentKind::Light => self.lights.vids().to_vec(),
            ComponentKind::Emitter => self.emitters.vids().to_vec(),
            ComponentKind::Animation => self.animations.vids().to_vec(),
            ComponentKind::Weather => self.weathers.vids().to_vec(),
            ComponentKind::Collider => self.colliders.vids().to_vec(),
            ComponentKind::Undefined => Vec::new(),
        }
    }

    /// Roots of the transform hierarchy in creation order.
    #[must_use]
    pub fn roots(&self) -> Vec<Vid> {
        self.transforms
            .vids()
            .iter()
            .copied()
            .filter(|v| !self.parents.contains_key(v))
            .collect()
    }

    table_accessors! {
        transforms: Transform => transform, transform_mut;
        cameras: Camera => camera, camera_mut;
        lights: Light => light, light_mut;
        emitters: Emitter => emitter, emitter_mut;
        animations: Animation => animation, animation_mut;
        objects: Object => object, object_mut;
        meshes: Mesh => mesh, mesh_mut;
        materials: Material => material, material_mut;
        colliders: Collider => collider, collider_mut;
        weathers: Weather => weather_entry, weather_entry_mut;
    }

    // ========================================================================
    // Weather
    // ========================================================================

    /// Copies the `index`-th weather entry into the active weather.
    pub fn set_weather_preset(&mut self, index: usize) -> bool {
        let Some(&vid) = self.weathers.vids().get(index) else {
            return false;
        };
        match self.weathers.get(vid) {
            Some(w) => {
                self.weather = w.clone();
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Merge & Update
    // ========================================================================

    /// Moves every entity of `src` into `self`, leaving `src` empty.
    ///
    /// Handles are preserved. The active weather of `self` is kept.
    pub fn merge(&mut self, src: &mut SceneStore) {
        self.entities.append(&mut src.entities);
        self.transforms.append(&mut src.transforms);
        self.parents.extend(src.parents.drain());
        for (parent, kids) in src.children.drain() {
            self.children.entry(parent).or_default().extend(kids);
        }
        self.cameras.append(&mut src.cameras);
        self.lights.append(&mut src.lights);
        self.emitters.append(&mut src.emitters);
        self.animations.append(&mut src.animations);
        self.objects.append(&mut src.objects);
        self.meshes.append(&mut src.meshes);
        self.materials.append(&mut src.materials);
        self.colliders.append(&mut src.colliders);
        self.weathers.append(&mut src.weathers);
    }

    /// Re-derives one camera's pose from its world transform.
    pub fn refresh_camera(&mut self, vid: Vid) -> bool {
        if !self.cameras.contains(vid) {
            return false;
        }
        let world = self.world_matrix_of(vid);
        if let Some(t) = self.transforms.get_mut(vid) {
            t.set_world_matrix(world);
        }
        if let Some(cam) = self.cameras.get_mut(vid) {
            cam.update_from_world(&world);
        }
        true
    }

    /// Advances scene simulation by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        self.time += dt;
        let roots = self.roots();
        transform_system::update_hierarchy(
            &mut self.transforms,
            &mut self.cameras,
            &self.children,
            &roots,
        );
        for anim in self.animations.values_mut() {
            anim.advance(dt);
        }
    }

    /// Accumulated simulation time in seconds.
    #[inline]
    #[must_use]
    pub fn time(&self) -> f32 {
        self.time
    }
}
