//! Typed payloads for match contexts and recipe data

use crate::pattern::CapabilitySlot;
use crate::pos::BlockPos;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Positions(BTreeSet<BlockPos>),
    Counts(BTreeMap<String, u32>),
    Slots(Vec<CapabilitySlot>),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_positions(&self) -> Option<&BTreeSet<BlockPos>> {
        match self {
            Value::Positions(set) => Some(set),
            _ => None,
        }
    }

    pub fn as_counts(&self) -> Option<&BTreeMap<String, u32>> {
        match self {
            Value::Counts(counts) => Some(counts),
            _ => None,
        }
    }

    pub fn as_slots(&self) -> Option<&[CapabilitySlot]> {
        match self {
            Value::Slots(slots) => Some(slots),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}
