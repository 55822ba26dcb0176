//! The dynamically-typed object model
//!
//! Values are plain data. They hold no traversal or reclamation logic; array
//! slots reference other values by [`Handle`] without owning them.

use crate::handle::Handle;
use std::mem::size_of;

/// A value stored on the heap
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i32),
    Float(f64),
    /// Owned byte buffer. The length is the buffer length; no terminator.
    String(Box<[u8]>),
    /// Fixed-length sequence of references. `None` is an empty slot.
    Array(Box<[Option<Handle>]>),
}

/// Discriminant of a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Integer,
    Float,
    String,
    Array,
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Integer(_) => ValueKind::Integer,
            Value::Float(_) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
        }
    }

    pub fn as_integer(&self) -> Option<i32> {
        match *self {
            Value::Integer(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match *self {
            Value::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::String(bytes) => Some(&bytes[..]),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Option<Handle>]> {
        match self {
            Value::Array(slots) => Some(&slots[..]),
            _ => None,
        }
    }

    pub(crate) fn as_array_mut(&mut self) -> Option<&mut [Option<Handle>]> {
        match self {
            Value::Array(slots) => Some(&mut slots[..]),
            _ => None,
        }
    }

    /// Bytes held outside the node itself
    pub(crate) fn payload_size(&self) -> usize {
        match self {
            Value::Integer(_) | Value::Float(_) => 0,
            Value::String(bytes) => bytes.len(),
            Value::Array(slots) => slots.len() * size_of::<Option<Handle>>(),
        }
    }
}

/// Slot buffer size for an array of `len`, `None` if it overflows
#[inline]
pub(crate) const fn array_payload_size(len: usize) -> Option<usize> {
    len.checked_mul(size_of::<Option<Handle>>())
}
