//! Dynamic value tree shared by the parser, evaluator and serializer.
//!
//! The same [`Value`] type is both program and data: a `List` is a call
//! form when evaluated and an ordinary sequence when stored in state.

use std::fmt;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// Integer and floating numbers stay distinct but interoperate in arithmetic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(value) => value as f64,
            Number::Float(value) => value,
        }
    }

    pub fn is_zero(self) -> bool {
        match self {
            Number::Int(value) => value == 0,
            Number::Float(value) => value == 0.0,
        }
    }

    /// Numeric equality across the integer/float split.
    pub fn numeric_eq(self, other: Number) -> bool {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a == b,
            (a, b) => a.as_f64() == b.as_f64(),
        }
    }

    pub fn checked_add(self, other: Number) -> Number {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a
                .checked_add(b)
                .map_or(Number::Float(a as f64 + b as f64), Number::Int),
            (a, b) => Number::Float(a.as_f64() + b.as_f64()),
        }
    }

    pub fn checked_sub(self, other: Number) -> Number {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a
                .checked_sub(b)
                .map_or(Number::Float(a as f64 - b as f64), Number::Int),
            (a, b) => Number::Float(a.as_f64() - b.as_f64()),
        }
    }

    pub fn checked_mul(self, other: Number) -> Number {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a
                .checked_mul(b)
                .map_or(Number::Float(a as f64 * b as f64), Number::Int),
            (a, b) => Number::Float(a.as_f64() * b.as_f64()),
        }
    }

    pub fn negate(self) -> Number {
        match self {
            Number::Int(value) => value
                .checked_neg()
                .map_or(Number::Float(-(value as f64)), Number::Int),
            Number::Float(value) => Number::Float(-value),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(value) => write!(f, "{value}"),
            // Debug keeps a trailing ".0" so floats re-parse as floats.
            Number::Float(value) => write!(f, "{value:?}"),
        }
    }
}

/// String-keyed map that keeps insertion order for stable rendering.
///
/// Lookups are linear; skill state and emission maps hold a handful of
/// entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueMap {
    entries: Vec<(String, Value)>,
}

impl ValueMap {
    pub fn new() -> Self {
        ValueMap {
            entries: Vec::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find_map(|(k, v)| if k == key { Some(v) } else { None })
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Inserts or overwrites in place, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            return Some(std::mem::replace(&mut slot.1, value));
        }
        self.entries.push((key, value));
        None
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    /// Shallow union; keys from `other` win on conflict.
    pub fn merged(&self, other: &ValueMap) -> ValueMap {
        let mut merged = self.clone();
        for (key, value) in other.iter() {
            merged.insert(key, value.clone());
        }
        merged
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut map = ValueMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl IntoIterator for ValueMap {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(Number),
    Str(String),
    /// Keyword name without its leading `:`.
    Keyword(String),
    Symbol(String),
    List(Vec<Value>),
    Map(ValueMap),
    Vector(Vec<Value>),
}

impl Value {
    pub fn int(value: i64) -> Value {
        Value::Number(Number::Int(value))
    }

    pub fn float(value: f64) -> Value {
        Value::Number(Number::Float(value))
    }

    pub fn str(text: impl Into<String>) -> Value {
        Value::Str(text.into())
    }

    /// Builds a keyword, accepting the name with or without its `:`.
    pub fn keyword(name: impl AsRef<str>) -> Value {
        let name = name.as_ref();
        Value::Keyword(name.strip_prefix(':').unwrap_or(name).to_string())
    }

    pub fn symbol(name: impl Into<String>) -> Value {
        Value::Symbol(name.into())
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Value {
        Value::List(items.into_iter().collect())
    }

    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Value {
        Value::Map(entries.into_iter().collect())
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Number(number) => Some(*number),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Value::Symbol(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Items of a List or Vector.
    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Vector(items) => Some(items),
            _ => None,
        }
    }

    /// True when this is a List whose head is the symbol `name`.
    pub fn is_form(&self, name: &str) -> bool {
        matches!(self, Value::List(items) if items.first().and_then(Value::as_symbol) == Some(name))
    }

    /// Nil, false, zero, "" and empty collections are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(value) => *value,
            Value::Number(number) => !number.is_zero(),
            Value::Str(text) => !text.is_empty(),
            Value::List(items) | Value::Vector(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
            Value::Keyword(_) | Value::Symbol(_) => true,
        }
    }

    /// Key text used for map, state and channel lookups.
    pub fn key_text(&self) -> String {
        match self {
            Value::Keyword(name) | Value::Symbol(name) | Value::Str(name) => name.clone(),
            other => other.to_string(),
        }
    }

    /// Plain text for string concatenation: strings unquoted, all else as DSL.
    pub fn to_text(&self) -> String {
        match self {
            Value::Str(text) => text.clone(),
            other => other.to_string(),
        }
    }

    /// Structural equality, except numbers compare across int/float.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.numeric_eq(*b),
            (Value::List(a), Value::List(b)) | (Value::Vector(a), Value::Vector(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(key, x)| b.get(key).is_some_and(|y| x.loose_eq(y)))
            }
            (a, b) => a == b,
        }
    }

    /// Converts a JSON document into a value tree; objects become maps.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Nil,
            serde_json::Value::Bool(value) => Value::Bool(*value),
            serde_json::Value::Number(number) => match number.as_i64() {
                Some(int) => Value::int(int),
                None => Value::float(number.as_f64().unwrap_or(0.0)),
            },
            serde_json::Value::String(text) => Value::Str(text.clone()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(object) => Value::Map(
                object
                    .iter()
                    .map(|(key, value)| (key.clone(), Value::from_json(value)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::float(value)
    }
}

impl From<ValueMap> for Value {
    fn from(map: ValueMap) -> Self {
        Value::Map(map)
    }
}

/// Canonical DSL text, identical to what the serializer emits.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::generator::format_value(self))
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Nil => serializer.serialize_unit(),
            Value::Bool(value) => serializer.serialize_bool(*value),
            Value::Number(Number::Int(value)) => serializer.serialize_i64(*value),
            Value::Number(Number::Float(value)) => serializer.serialize_f64(*value),
            Value::Str(text) | Value::Symbol(text) => serializer.serialize_str(text),
            Value::Keyword(name) => serializer.serialize_str(&format!(":{name}")),
            Value::List(items) | Value::Vector(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(map) => map.serialize(serializer),
        }
    }
}

impl Serialize for ValueMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut out = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            out.serialize_entry(key, value)?;
        }
        out.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_follows_falsy_table() {
        for falsy in [
            Value::Nil,
            Value::Bool(false),
            Value::int(0),
            Value::float(0.0),
            Value::str(""),
            Value::List(Vec::new()),
            Value::Vector(Vec::new()),
            Value::Map(ValueMap::new()),
        ] {
            assert!(!falsy.is_truthy(), "{falsy:?} should be falsy");
        }
        assert!(Value::keyword("a").is_truthy());
        assert!(Value::symbol("x").is_truthy());
        assert!(Value::float(-0.5).is_truthy());
    }

    #[test]
    fn map_insert_overwrites_in_place() {
        let mut map = ValueMap::new();
        map.insert("a", Value::int(1));
        map.insert("b", Value::int(2));
        assert_eq!(map.insert("a", Value::int(3)), Some(Value::int(1)));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(map.get("a"), Some(&Value::int(3)));
    }

    #[test]
    fn merged_prefers_right_hand_keys() {
        let left: ValueMap = [("a", Value::int(1)), ("b", Value::int(2))].into_iter().collect();
        let right: ValueMap = [("b", Value::int(9))].into_iter().collect();
        let merged = left.merged(&right);
        assert_eq!(merged.get("b"), Some(&Value::int(9)));
        assert_eq!(merged.len(), 2);
        assert_eq!(left.get("b"), Some(&Value::int(2)));
    }

    #[test]
    fn integer_overflow_promotes_to_float() {
        let sum = Number::Int(i64::MAX).checked_add(Number::Int(1));
        assert!(matches!(sum, Number::Float(_)));
        assert_eq!(Number::Int(2).checked_mul(Number::Int(3)), Number::Int(6));
        assert_eq!(Number::Int(2).checked_add(Number::Float(0.5)), Number::Float(2.5));
    }

    #[test]
    fn loose_eq_crosses_number_kinds() {
        assert!(Value::int(45).loose_eq(&Value::float(45.0)));
        assert!(!Value::int(45).loose_eq(&Value::str("45")));
        let a = Value::map([("x", Value::int(1))]);
        let b = Value::map([("x", Value::float(1.0))]);
        assert!(a.loose_eq(&b));
    }

    #[test]
    fn json_round_trip_keeps_shape() {
        let json: serde_json::Value =
            serde_json::from_str(r#"{"base-days": 100, "pct": 0.5, "tags": ["a", null]}"#)
                .expect("json");
        let value = Value::from_json(&json);
        let map = value.as_map().expect("map");
        assert_eq!(map.get("base-days"), Some(&Value::int(100)));
        assert_eq!(map.get("pct"), Some(&Value::float(0.5)));
        assert_eq!(
            map.get("tags"),
            Some(&Value::list([Value::str("a"), Value::Nil]))
        );
        let back = serde_json::to_value(&value).expect("serialize");
        assert_eq!(back, json);
    }

    #[test]
    fn keywords_serialize_with_colon() {
        let json = serde_json::to_string(&Value::keyword(":total")).expect("serialize");
        assert_eq!(json, "\":total\"");
    }
}
