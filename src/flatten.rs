//! Flattening an element subtree into nested ordered maps.

use crate::document::Document;
use crate::element::Element;
use crate::tree::XmlTree;
use indexmap::IndexMap;
use std::fmt;

/// Key under which [`FlattenMode::Corrected`] keeps an element's attributes.
pub const ATTRIBUTES_KEY: &str = "@attributes";

/// How [`to_array`] treats attributes and nested children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlattenMode {
    /// Reproduces the historical output byte for byte: attributes are lost,
    /// and an element with child elements gets a second copy of its own
    /// map under the positional key `0`.
    Parity,
    /// Attributes are kept under [`ATTRIBUTES_KEY`], no duplicate copies.
    #[default]
    Corrected,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Name(String),
    Position(usize),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(name) => f.write_str(name),
            Key::Position(pos) => write!(f, "{}", pos),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Map(Array),
    Text(String),
}

impl Value {
    pub fn as_map(&self) -> Option<&Array> {
        match self {
            Value::Map(map) => Some(map),
            Value::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            Value::Map(_) => None,
        }
    }
}

/// An ordered map of [`Key`] to [`Value`]. Equality ignores order; compare
/// [`Array::keys`] to check it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Array {
    entries: IndexMap<Key, Value>,
}

impl Array {
    pub fn new() -> Array {
        Array::default()
    }

    /// Entry for the element or attribute `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(&Key::Name(name.to_string()))
    }

    pub fn get_key(&self, key: &Key) -> Option<&Value> {
        self.entries.get(key)
    }

    /// The map stored under `name`, if it is one.
    pub fn map(&self, name: &str) -> Option<&Array> {
        self.get(name).and_then(Value::as_map)
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or replace. A replaced key keeps its position.
    pub fn insert(&mut self, key: Key, value: Value) {
        self.entries.insert(key, value);
    }

    /// Insert under the next free positional key.
    pub fn push(&mut self, value: Value) {
        let next = self
            .entries
            .keys()
            .filter_map(|key| match key {
                Key::Position(pos) => Some(pos + 1),
                Key::Name(_) => None,
            })
            .max()
            .unwrap_or(0);
        self.entries.insert(Key::Position(next), value);
    }
}

/// Map each direct child element of `node` to its own flattened map, keyed
/// by element name. Later children replace earlier ones of the same name.
/// Text content is not captured.
pub fn to_array<T: XmlTree>(tree: &T, node: T::Node, mode: FlattenMode) -> Array {
    let mut arr = Array::new();
    for child in tree.child_nodes(node) {
        let name = Key::Name(tree.node_name(child).to_string());
        match mode {
            FlattenMode::Parity => {
                let mut value = to_array(tree, child, mode);
                if !tree.child_nodes(child).is_empty() {
                    let copy = value.clone();
                    value.push(Value::Map(copy));
                }
                arr.insert(name, Value::Map(value));
            }
            FlattenMode::Corrected => {
                let mut value = Array::new();
                let attributes = tree.attribute_pairs(child);
                if !attributes.is_empty() {
                    let mut attr_map = Array::new();
                    for (key, val) in attributes {
                        attr_map.insert(Key::Name(key), Value::Text(val));
                    }
                    value.insert(Key::Name(ATTRIBUTES_KEY.to_string()), Value::Map(attr_map));
                }
                for (key, val) in to_array(tree, child, mode).entries {
                    value.insert(key, val);
                }
                arr.insert(name, Value::Map(value));
            }
        }
    }
    arr
}

impl Element {
    /// See [`to_array`].
    pub fn to_array(&self, document: &Document, mode: FlattenMode) -> Array {
        to_array(document, *self, mode)
    }
}

#[cfg(feature = "serde")]
mod ser {
    use super::{Array, Value};
    use serde::ser::{Serialize, SerializeMap, Serializer};

    impl Serialize for Array {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut map = serializer.serialize_map(Some(self.len()))?;
            for (key, value) in self.iter() {
                map.serialize_entry(&key.to_string(), value)?;
            }
            map.end()
        }
    }

    impl Serialize for Value {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            match self {
                Value::Map(map) => map.serialize(serializer),
                Value::Text(text) => serializer.serialize_str(text),
            }
        }
    }
}
