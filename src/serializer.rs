//! Serialization layer. JSON via serde_json, pretty-printed by default.
//!
//! Implement [`Serializer`] if you need a different format. Encoding takes an
//! ordered snapshot and decoding keeps the order the keys appear in, so the
//! record order survives a save/load cycle.

use crate::error::{Error, Result};
use serde::de::{self, DeserializeOwned, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// What a backing file decoded into.
#[derive(Debug, Clone, PartialEq)]
pub enum Document<V> {
    /// A top-level object, in key order as written.
    Records(Vec<(String, V)>),
    /// A top-level list. Its contents are discarded.
    List,
}

/// Converts record snapshots to/from bytes for persistence.
pub trait Serializer: Send + Sync {
    /// Encode entries as a single top-level object, keeping their order.
    fn serialize<V>(&self, entries: &[(String, V)]) -> Result<Vec<u8>>
    where
        V: Serialize;

    /// Decode bytes into a [`Document`].
    fn deserialize<V>(&self, bytes: &[u8]) -> Result<Document<V>>
    where
        V: DeserializeOwned;
}

/// JSON serializer with optional pretty-printing (two-space indent).
#[derive(Debug, Clone, Default)]
pub struct JsonSerializer {
    pretty: bool,
}

impl JsonSerializer {
    /// Compact JSON (single line, no extra whitespace).
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretty-printed JSON, easier to read and diff by hand.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

}

impl Serializer for JsonSerializer {
    fn serialize<V>(&self, entries: &[(String, V)]) -> Result<Vec<u8>>
    where
        V: Serialize,
    {
        let snapshot = Snapshot(entries);
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(&snapshot)
        } else {
            serde_json::to_vec(&snapshot)
        };
        bytes.map_err(|e| Error::Serialize(e.to_string()))
    }

    fn deserialize<V>(&self, bytes: &[u8]) -> Result<Document<V>>
    where
        V: DeserializeOwned,
    {
        match serde_json::from_slice::<Decoded<V>>(bytes)? {
            Decoded::Records(entries) => Ok(Document::Records(entries)),
            Decoded::List => Ok(Document::List),
            Decoded::Scalar => Err(Error::UnexpectedShape("a scalar value")),
        }
    }
}

// ---- ordered encode ------------------------------------------------------------

struct Snapshot<'a, V>(&'a [(String, V)]);

impl<V: Serialize> Serialize for Snapshot<'_, V> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

// ---- ordered decode ------------------------------------------------------------

/// Every top-level shape, so a scalar is a value to match on rather than a
/// serde error.
enum Decoded<V> {
    Records(Vec<(String, V)>),
    List,
    Scalar,
}

impl<'de, V> Deserialize<'de> for Decoded<V>
where
    V: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(DecodedVisitor(PhantomData))
    }
}

struct DecodedVisitor<V>(PhantomData<V>);

impl<'de, V> Visitor<'de> for DecodedVisitor<V>
where
    V: Deserialize<'de>,
{
    type Value = Decoded<V>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> std::result::Result<Self::Value, E> {
        Ok(Decoded::Scalar)
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> std::result::Result<Self::Value, E> {
        Ok(Decoded::Scalar)
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> std::result::Result<Self::Value, E> {
        Ok(Decoded::Scalar)
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> std::result::Result<Self::Value, E> {
        Ok(Decoded::Scalar)
    }

    fn visit_str<E: de::Error>(self, _: &str) -> std::result::Result<Self::Value, E> {
        Ok(Decoded::Scalar)
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(Decoded::Scalar)
    }

    fn visit_map<A>(self, mut access: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((k, v)) = access.next_entry::<String, V>()? {
            entries.push((k, v));
        }
        Ok(Decoded::Records(entries))
    }

    fn visit_seq<A>(self, mut access: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        while access.next_element::<IgnoredAny>()?.is_some() {}
        Ok(Decoded::List)
    }
}
