//! Deserializer over a configuration section.
//!
//! Every configuration value is a string. Leaves are parsed only when the
//! target field asks for a number, a bool or a char; string fields receive
//! the raw text, so `"0025"` stays `"0025"`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, DeserializeSeed, Deserializer, IntoDeserializer, MapAccess, SeqAccess, Visitor};

/// A section tree built from `a:b:c` keys.
pub(crate) enum Node {
    Leaf(String),
    Section(BTreeMap<String, Node>),
}

impl Node {
    pub(crate) fn section() -> Self {
        Node::Section(BTreeMap::new())
    }

    /// Stores `value` under `path`, turning leaves on the way into sections.
    pub(crate) fn insert(&mut self, path: &[&str], value: String) {
        let (head, rest) = match path.split_first() {
            Some(split) => split,
            None => return,
        };
        if let Node::Leaf(_) = self {
            *self = Node::section();
        }
        if let Node::Section(children) = self {
            if rest.is_empty() {
                // A key that already holds a nested section keeps it
                children.entry(head.to_string()).or_insert(Node::Leaf(value));
            } else {
                children
                    .entry(head.to_string())
                    .or_insert_with(Node::section)
                    .insert(rest, value);
            }
        }
    }

    fn into_leaf(self) -> Result<String, BindError> {
        match self {
            Node::Leaf(value) => Ok(value),
            Node::Section(_) => Err(BindError("expected a value, found a section".to_string())),
        }
    }

    fn parse<T>(self) -> Result<T, BindError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let raw = self.into_leaf()?;
        raw.trim()
            .parse()
            .map_err(|e| BindError(format!("invalid value '{}': {}", raw, e)))
    }

    /// Children of a section whose keys are `0`, `1`, ... in numeric order.
    fn into_items(self) -> Result<Vec<Node>, BindError> {
        match self {
            Node::Leaf(value) if value.is_empty() => Ok(Vec::new()),
            Node::Leaf(value) => Err(BindError(format!("expected a list, found '{}'", value))),
            Node::Section(children) => {
                let mut indexed = Vec::with_capacity(children.len());
                for (key, node) in children {
                    let index: usize = key
                        .parse()
                        .map_err(|_| BindError(format!("list index '{}' is not a number", key)))?;
                    indexed.push((index, node));
                }
                indexed.sort_by_key(|(index, _)| *index);
                Ok(indexed.into_iter().map(|(_, node)| node).collect())
            }
        }
    }
}

#[derive(Debug)]
pub(crate) struct BindError(String);

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for BindError {}

impl de::Error for BindError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        BindError(msg.to_string())
    }
}

macro_rules! parse_leaf {
    ($de:lifetime; $($method:ident => $visit:ident($ty:ty)),* $(,)?) => {
        $(
            fn $method<V: Visitor<$de>>(self, visitor: V) -> Result<V::Value, BindError> {
                visitor.$visit(self.parse::<$ty>()?)
            }
        )*
    };
}

impl<'de> Deserializer<'de> for Node {
    type Error = BindError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        match self {
            Node::Leaf(value) => visitor.visit_string(value),
            Node::Section(children) => visitor.visit_map(SectionAccess::new(children)),
        }
    }

    parse_leaf! { 'de;
        deserialize_i8 => visit_i8(i8),
        deserialize_i16 => visit_i16(i16),
        deserialize_i32 => visit_i32(i32),
        deserialize_i64 => visit_i64(i64),
        deserialize_i128 => visit_i128(i128),
        deserialize_u8 => visit_u8(u8),
        deserialize_u16 => visit_u16(u16),
        deserialize_u32 => visit_u32(u32),
        deserialize_u64 => visit_u64(u64),
        deserialize_u128 => visit_u128(u128),
        deserialize_f32 => visit_f32(f32),
        deserialize_f64 => visit_f64(f64),
        deserialize_char => visit_char(char),
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        let raw = self.into_leaf()?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" => visitor.visit_bool(true),
            "false" => visitor.visit_bool(false),
            _ => Err(BindError(format!("invalid value '{}': expected true or false", raw))),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        visitor.visit_string(self.into_leaf()?)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        visitor.visit_string(self.into_leaf()?)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        visitor.visit_byte_buf(self.into_leaf()?.into_bytes())
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        match self {
            Node::Leaf(value) if value.is_empty() => visitor.visit_none(),
            node => visitor.visit_some(node),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, BindError> {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, BindError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        visitor.visit_seq(ItemsAccess(self.into_items()?.into_iter()))
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, BindError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, BindError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        match self {
            Node::Leaf(value) if value.is_empty() => visitor.visit_map(SectionAccess::new(BTreeMap::new())),
            Node::Leaf(value) => Err(BindError(format!("expected a section, found '{}'", value))),
            Node::Section(children) => visitor.visit_map(SectionAccess::new(children)),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, BindError> {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, BindError> {
        let variant: de::value::StringDeserializer<BindError> = self.into_leaf()?.into_deserializer();
        visitor.visit_enum(variant)
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        self.deserialize_string(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        visitor.visit_unit()
    }
}

struct SectionAccess {
    children: std::collections::btree_map::IntoIter<String, Node>,
    pending: Option<Node>,
}

impl SectionAccess {
    fn new(children: BTreeMap<String, Node>) -> Self {
        SectionAccess { children: children.into_iter(), pending: None }
    }
}

impl<'de> MapAccess<'de> for SectionAccess {
    type Error = BindError;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>, BindError> {
        match self.children.next() {
            Some((key, node)) => {
                self.pending = Some(node);
                let key: de::value::StringDeserializer<BindError> = key.into_deserializer();
                seed.deserialize(key).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, BindError> {
        match self.pending.take() {
            Some(node) => seed.deserialize(node),
            None => Err(BindError("value requested before key".to_string())),
        }
    }
}

struct ItemsAccess(std::vec::IntoIter<Node>);

impl<'de> SeqAccess<'de> for ItemsAccess {
    type Error = BindError;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>, BindError> {
        self.0.next().map(|node| seed.deserialize(node)).transpose()
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.0.len())
    }
}
