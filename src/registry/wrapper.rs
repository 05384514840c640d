use std::time::Instant;

use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::{ComponentKind, Timestamp, Vid};

/// Host-visible record of one exposed scene object.
///
/// A wrapper does not own engine state; typed views re-resolve the engine
/// component through the registry on every call. Change detection relies on
/// [`last_modified`](Self::last_modified), which every successful setter
/// stamps.
#[derive(Debug, Clone)]
pub struct ComponentWrapper {
    handle: Vid,
    kind: ComponentKind,
    last_modified: Timestamp,
    attributes: FxHashMap<String, Value>,
}

impl ComponentWrapper {
    #[must_use]
    pub fn new(handle: Vid, kind: ComponentKind) -> Self {
        Self {
            handle,
            kind,
            last_modified: Instant::now(),
            attributes: FxHashMap::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> Vid {
        self.handle
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn last_modified(&self) -> Timestamp {
        self.last_modified
    }

    #[inline]
    pub fn touch(&mut self) {
        self.last_modified = Instant::now();
    }

    // -- Attribute bag --

    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Reads an attribute as `T`; `None` when missing or of another shape.
    #[must_use]
    pub fn attribute_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| T::deserialize(v).ok())
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
        self.touch();
    }

    pub fn remove_attribute(&mut self, key: &str) -> Option<Value> {
        let removed = self.attributes.remove(key);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    pub fn clear_attributes(&mut self) {
        self.attributes.clear();
        self.touch();
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_round_trip_and_stamp() {
        let mut w = ComponentWrapper::new(5, ComponentKind::Light);
        let before = w.last_modified();
        w.set_attribute("tag", "key-light");
        w.set_attribute("priority", 3);
        assert!(w.last_modified() >= before);
        assert_eq!(w.attribute_as::<String>("tag").as_deref(), Some("key-light"));
        assert_eq!(w.attribute_as::<u32>("priority"), Some(3));
        assert_eq!(w.attribute_as::<u32>("tag"), None);
        assert!(w.remove_attribute("tag").is_some());
        assert!(w.attribute("tag").is_none());
    }
}
