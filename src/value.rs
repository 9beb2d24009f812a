//! Binding values.
//!
//! Props and bound signals carry a dynamically-typed [`Value`]. Equality is
//! identity-style: numbers compare like `Object.is`, strings by content,
//! lists and records by allocation. Stringification matches what a browser
//! writes into an attribute.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::dom::NodeId;

#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    List(Rc<[Value]>),
    Record(Rc<BTreeMap<String, Value>>),
    /// A rendered node, for expression regions that insert markup.
    Template(NodeId),
}

impl Value {
    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Self::List(items.into_iter().collect())
    }

    pub fn record<K: Into<String>>(fields: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::Record(Rc::new(
            fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    /// The items when this is a list. Anything else is not iterable.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Record(fields) => fields.get(name),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => same_number(*a, *b),
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b)) => Rc::ptr_eq(a, b),
            (Self::Record(a), Self::Record(b)) => Rc::ptr_eq(a, b),
            (Self::Template(a), Self::Template(b)) => a == b,
            _ => false,
        }
    }
}

fn same_number(a: f64, b: f64) -> bool {
    if a.is_nan() && b.is_nan() {
        return true;
    }
    a.to_bits() == b.to_bits()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write_number(f, *n),
            Self::Str(s) => f.write_str(s),
            Self::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    // null entries print as empty, like Array.prototype.join
                    if !item.is_null() {
                        write!(f, "{item}")?;
                    }
                }
                Ok(())
            }
            Self::Record(_) => f.write_str("[object Object]"),
            Self::Template(_) => Ok(()),
        }
    }
}

fn write_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.is_nan() {
        f.write_str("NaN")
    } else if n.is_infinite() {
        f.write_str(if n > 0.0 { "Infinity" } else { "-Infinity" })
    } else if n == 0.0 {
        f.write_str("0")
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        write!(f, "{n:.0}")
    } else {
        write!(f, "{n}")
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(Rc::from(s))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(Rc::from(items))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

// =============================================================================
// Item Keys
// =============================================================================

/// Identity of a list item across reconciliations.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ItemKey {
    Null,
    Bool(bool),
    Number(u64),
    Str(Rc<str>),
    /// Allocation address of a list or record.
    Ref(usize),
    Node(NodeId),
}

impl ItemKey {
    /// Identity key, consistent with `Value` equality.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) if n.is_nan() => Self::Number(f64::NAN.to_bits()),
            Value::Number(n) => Self::Number(n.to_bits()),
            Value::Str(s) => Self::Str(s.clone()),
            Value::List(items) => Self::Ref(items.as_ptr() as usize),
            Value::Record(fields) => Self::Ref(Rc::as_ptr(fields) as usize),
            Value::Template(node) => Self::Node(*node),
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(bits) => write_number(f, f64::from_bits(*bits)),
            Self::Str(s) => f.write_str(s),
            Self::Ref(addr) => write!(f, "ref@{addr:#x}"),
            Self::Node(node) => write!(f, "node#{}", node.index()),
        }
    }
}

/// How list items are keyed.
#[derive(Clone, Default)]
pub enum KeyExtractor {
    /// The item itself.
    #[default]
    Identity,
    /// A record field. Items without the field fall back to identity.
    Field(String),
    Custom(Rc<dyn Fn(&Value) -> ItemKey>),
}

impl KeyExtractor {
    pub fn key(&self, item: &Value) -> ItemKey {
        match self {
            Self::Identity => ItemKey::of(item),
            Self::Field(name) => item.field(name).map_or_else(|| ItemKey::of(item), ItemKey::of),
            Self::Custom(f) => f(item),
        }
    }
}

impl fmt::Debug for KeyExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity => f.write_str("Identity"),
            Self::Field(name) => f.debug_tuple("Field").field(name).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
