//! Scalar field values carried by records.

use serde::{Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::Ipv4Addr;

/// Closed set of field value cases. There is no Int/Float coercion.
#[derive(Debug, Clone, Copy)]
pub enum Value {
    Float(f64),
    Int(i64),
    Ipv4(Ipv4Addr),
    Mac([u8; 6]),
    Empty,
}

impl Value {
    /// Case name used in type-mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Float(_) => "float",
            Value::Int(_) => "int",
            Value::Ipv4(_) => "ipv4",
            Value::Mac(_) => "mac",
            Value::Empty => "empty",
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_ipv4(&self) -> Option<Ipv4Addr> {
        match self {
            Value::Ipv4(a) => Some(*a),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Parse `aa:bb:cc:dd:ee:ff` (case-insensitive hex).
    pub fn parse_mac(s: &str) -> Option<Value> {
        let mut out = [0u8; 6];
        let mut parts = s.split(':');
        for slot in out.iter_mut() {
            let part = parts.next()?;
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            *slot = u8::from_str_radix(part, 16).ok()?;
        }
        if parts.next().is_some() {
            return None;
        }
        Some(Value::Mac(out))
    }
}

// Floats compare by stored bits so that keys hash and compare deterministically.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Ipv4(a), Value::Ipv4(b)) => a == b,
            (Value::Mac(a), Value::Mac(b)) => a == b,
            (Value::Empty, Value::Empty) => true,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Float(f) => f.to_bits().hash(state),
            Value::Int(n) => n.hash(state),
            Value::Ipv4(a) => a.hash(state),
            Value::Mac(m) => m.hash(state),
            Value::Empty => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Float(v) => write!(f, "{}", v),
            Value::Int(n) => write!(f, "{}", n),
            Value::Ipv4(a) => write!(f, "{}", a),
            Value::Mac(m) => write!(
                f,
                "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
                m[0], m[1], m[2], m[3], m[4], m[5]
            ),
            Value::Empty => f.write_str("Empty"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Ipv4(_) | Value::Mac(_) => serializer.collect_str(self),
            Value::Empty => serializer.serialize_unit(),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<Ipv4Addr> for Value {
    fn from(a: Ipv4Addr) -> Self {
        Value::Ipv4(a)
    }
}

impl From<[u8; 6]> for Value {
    fn from(m: [u8; 6]) -> Self {
        Value::Mac(m)
    }
}
