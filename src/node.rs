//! Registry node layout
//!
//! Each registered value lives in exactly one `HeapNode`, which also carries
//! its mark color and the arena indices of its registry neighbours.

use crate::color::Color;
use crate::value::Value;
use std::mem::size_of;

#[derive(Debug)]
pub struct HeapNode {
    pub(crate) value: Value,
    pub(crate) color: Color,
    pub(crate) prev: Option<u32>,
    pub(crate) next: Option<u32>,
}

impl HeapNode {
    /// Accounted cost of a node, excluding its payload
    pub const SIZE: usize = size_of::<HeapNode>();

    pub(crate) fn new(value: Value, prev: Option<u32>) -> Self {
        Self {
            value,
            color: Color::White,
            prev,
            next: None,
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn color(&self) -> Color {
        self.color
    }

    /// Total accounted bytes for this node and its payload
    pub(crate) fn footprint(&self) -> usize {
        Self::SIZE + self.value.payload_size()
    }
}

/// An arena slot. `node` is `None` while the slot sits on the free list.
#[derive(Debug)]
pub(crate) struct Slot {
    pub(crate) generation: u32,
    pub(crate) node: Option<HeapNode>,
}
