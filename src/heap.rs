//! Heap registry, mark and sweep
//!
//! Every value is owned by exactly one [`HeapNode`] stored in an index-stable
//! arena. Live nodes form a doubly-linked list in insertion order, threaded
//! through arena indices, so appending and unlinking are O(1) and need no
//! search. Reclaimed slots go on a free list with their generation bumped.

use crate::color::Color;
use crate::error::{GcError, Result};
use crate::handle::Handle;
use crate::node::{HeapNode, Slot};
use crate::trace::{Trace, Tracer};
use crate::value::{Value, array_payload_size};
use std::iter;
use std::sync::atomic::{AtomicU32, Ordering};

/// Source of per-heap identities stamped into every handle
static NEXT_HEAP_ID: AtomicU32 = AtomicU32::new(0);

/// Outcome of one mark and sweep cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionStats {
    /// Values found reachable
    pub marked: usize,
    /// Values reclaimed
    pub freed: usize,
    /// Accounted bytes released
    pub bytes_freed: usize,
}

/// The garbage collected heap
///
/// Owns every value, tracks the accounted byte total against an optional
/// limit, and implements the mark and sweep phases.
#[derive(Debug)]
pub struct Heap {
    /// Identity shared by every handle this heap hands out
    id: u32,
    slots: Vec<Slot>,
    /// Indices of vacant slots
    free: Vec<u32>,
    head: Option<u32>,
    tail: Option<u32>,
    len: usize,
    bytes_allocated: usize,
    memory_limit: Option<usize>,
}

impl Heap {
    pub(crate) fn new(memory_limit: Option<usize>) -> Self {
        Self {
            id: NEXT_HEAP_ID.fetch_add(1, Ordering::Relaxed),
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
            bytes_allocated: 0,
            memory_limit,
        }
    }

    /// Number of registered values
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Accounted bytes of all registered nodes and their payloads
    pub fn bytes_allocated(&self) -> usize {
        self.bytes_allocated
    }

    pub fn memory_limit(&self) -> Option<usize> {
        self.memory_limit
    }

    /// Oldest registered value
    pub fn head(&self) -> Option<Handle> {
        self.head.map(|index| self.handle_at(index))
    }

    /// Most recently registered value
    pub fn tail(&self) -> Option<Handle> {
        self.tail.map(|index| self.handle_at(index))
    }

    /// Walk the registry from head to tail
    pub fn handles(&self) -> impl Iterator<Item = Handle> + '_ {
        iter::successors(self.head, |&index| self.linked(index).and_then(|node| node.next))
            .map(|index| self.handle_at(index))
    }

    /// Walk the registry from tail to head
    pub fn handles_rev(&self) -> impl Iterator<Item = Handle> + '_ {
        iter::successors(self.tail, |&index| self.linked(index).and_then(|node| node.prev))
            .map(|index| self.handle_at(index))
    }

    pub fn node(&self, handle: Handle) -> Option<&HeapNode> {
        if handle.heap != self.id {
            return None;
        }
        self.slots
            .get(handle.index())
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, handle: Handle) -> Option<&mut HeapNode> {
        if handle.heap != self.id {
            return None;
        }
        self.slots
            .get_mut(handle.index())
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    pub fn get(&self, handle: Handle) -> Option<&Value> {
        self.node(handle).map(HeapNode::value)
    }

    pub(crate) fn get_mut(&mut self, handle: Handle) -> Option<&mut Value> {
        self.node_mut(handle).map(|node| &mut node.value)
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.node(handle).is_some()
    }

    fn handle_at(&self, index: u32) -> Handle {
        Handle::new(self.id, index, self.slots[index as usize].generation)
    }

    /// Node at an index reached through registry links. Links only ever
    /// point at occupied slots.
    fn linked(&self, index: u32) -> Option<&HeapNode> {
        let node = self.slots.get(index as usize).and_then(|slot| slot.node.as_ref());
        debug_assert!(node.is_some(), "registry link to vacant slot {index}");
        node
    }

    fn linked_mut(&mut self, index: u32) -> Option<&mut HeapNode> {
        let node = self.slots.get_mut(index as usize).and_then(|slot| slot.node.as_mut());
        debug_assert!(node.is_some(), "registry link to vacant slot {index}");
        node
    }

    // -----------------------------------------------------------------------
    // Raw allocation
    // -----------------------------------------------------------------------

    /// Check that `bytes` more would fit under the memory limit
    fn charge(&self, bytes: usize) -> Result<()> {
        match self.memory_limit {
            Some(limit) if self.bytes_allocated.saturating_add(bytes) > limit => {
                Err(GcError::AllocationFailure { requested: bytes })
            }
            _ => Ok(()),
        }
    }

    /// Make room for one more node so that [`Heap::append`] cannot fail
    pub(crate) fn reserve_node(&mut self) -> Result<()> {
        let failure = GcError::AllocationFailure {
            requested: HeapNode::SIZE,
        };
        self.charge(HeapNode::SIZE)?;
        if self.free.is_empty() {
            if self.slots.len() >= u32::MAX as usize {
                return Err(failure);
            }
            self.slots.try_reserve(1).map_err(|_| failure)?;
        }
        Ok(())
    }

    /// Copy `bytes` into a new string buffer
    pub(crate) fn alloc_bytes(&mut self, bytes: &[u8]) -> Result<Box<[u8]>> {
        let mut buffer = self.alloc_buffer(bytes.len(), bytes.len())?;
        buffer.extend_from_slice(bytes);
        Ok(buffer.into_boxed_slice())
    }

    /// Copy `elements` into a new array slot buffer
    pub(crate) fn alloc_slots(&mut self, elements: &[Option<Handle>]) -> Result<Box<[Option<Handle>]>> {
        let len = elements.len();
        let bytes = array_payload_size(len).ok_or(GcError::CapacityOverflow { len })?;
        let mut buffer = self.alloc_buffer(len, bytes)?;
        buffer.extend_from_slice(elements);
        Ok(buffer.into_boxed_slice())
    }

    /// A slot buffer of `len` empty slots
    pub(crate) fn alloc_empty_slots(&mut self, len: usize) -> Result<Box<[Option<Handle>]>> {
        let bytes = array_payload_size(len).ok_or(GcError::CapacityOverflow { len })?;
        let mut buffer = self.alloc_buffer(len, bytes)?;
        buffer.resize(len, None);
        Ok(buffer.into_boxed_slice())
    }

    fn alloc_buffer<T>(&mut self, capacity: usize, bytes: usize) -> Result<Vec<T>> {
        self.charge(bytes)?;
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(capacity)
            .map_err(|_| GcError::AllocationFailure { requested: bytes })?;
        Ok(buffer)
    }

    // -----------------------------------------------------------------------
    // Registry
    // -----------------------------------------------------------------------

    /// Register `value` at the tail of the list
    pub(crate) fn append(&mut self, value: Value) -> Handle {
        let prev = self.tail;
        let node = HeapNode::new(value, prev);
        self.bytes_allocated += node.footprint();

        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index as usize].node = Some(node);
                index
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                index
            }
        };

        match prev.and_then(|tail| self.linked_mut(tail)) {
            Some(tail) => tail.next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.len += 1;
        self.handle_at(index)
    }

    /// Replace the value of a registered node, keeping byte accounting exact
    pub(crate) fn replace(&mut self, handle: Handle, value: Value) -> Option<Value> {
        let node = self.node_mut(handle)?;
        let added = value.payload_size();
        let old = std::mem::replace(&mut node.value, value);
        self.bytes_allocated = self.bytes_allocated - old.payload_size() + added;
        Some(old)
    }

    /// Detach the node at `index` from the list by pointer surgery on its
    /// neighbours. Head and tail are repaired when the node sat at either end.
    /// Vacant slots are left alone.
    fn unlink(&mut self, index: u32) -> Option<HeapNode> {
        let node = self.slots.get_mut(index as usize)?.node.take()?;

        match node.prev.and_then(|prev| self.linked_mut(prev)) {
            Some(prev) => prev.next = node.next,
            None => self.head = node.next,
        }
        match node.next.and_then(|next| self.linked_mut(next)) {
            Some(next) => next.prev = node.prev,
            None => self.tail = node.prev,
        }
        self.len -= 1;
        Some(node)
    }

    /// Return an unlinked node's slot to the free list. Dropping the node
    /// releases only its own buffer; values it references are separate
    /// registry entries.
    fn release(&mut self, index: u32, node: HeapNode) -> usize {
        let bytes = node.footprint();
        self.bytes_allocated -= bytes;
        let slot = &mut self.slots[index as usize];
        // a slot whose generation would wrap is retired, never reused
        if let Some(generation) = slot.generation.checked_add(1) {
            slot.generation = generation;
            self.free.push(index);
        }
        bytes
    }

    /// Unregister and free a single value
    pub(crate) fn remove(&mut self, handle: Handle) -> bool {
        if !self.contains(handle) {
            return false;
        }
        match self.unlink(handle.index) {
            Some(node) => {
                self.release(handle.index, node);
                true
            }
            None => false,
        }
    }

    /// Free every registered value exactly once, ignoring mark state
    pub(crate) fn clear(&mut self) -> usize {
        let mut freed = 0;
        let mut current = self.head;
        while let Some(index) = current {
            let Some(node) = self.unlink(index) else {
                break;
            };
            current = node.next;
            self.release(index, node);
            freed += 1;
        }
        debug_assert!(self.head.is_none() && self.tail.is_none());
        debug_assert_eq!(self.bytes_allocated, 0);
        freed
    }

    // -----------------------------------------------------------------------
    // Collection
    // -----------------------------------------------------------------------

    /// Run a full mark and sweep cycle from `roots`
    pub(crate) fn collect(&mut self, roots: impl IntoIterator<Item = Handle>) -> CollectionStats {
        let marked = self.mark(roots);
        let (freed, bytes_freed) = self.sweep();
        CollectionStats {
            marked,
            freed,
            bytes_freed,
        }
    }

    /// Shade every value reachable from `roots`
    ///
    /// Uses an explicit gray list instead of recursion, so graph depth is
    /// bounded by heap size rather than stack size. Stale handles and empty
    /// slots are skipped; already shaded values stop the walk, which also
    /// terminates cycles.
    pub(crate) fn mark(&mut self, roots: impl IntoIterator<Item = Handle>) -> usize {
        let mut tracer = Tracer::new();
        for root in roots {
            tracer.mark(root);
        }

        let mut marked = 0;
        loop {
            self.shade(&mut tracer);
            let Some(index) = tracer.pop_gray() else {
                break;
            };
            let Some(node) = self.linked_mut(index) else {
                continue;
            };
            node.value.trace(&mut tracer);
            node.color = Color::Black;
            marked += 1;
        }
        marked
    }

    /// White to gray for every reported handle that names a live value
    fn shade(&mut self, tracer: &mut Tracer) {
        while let Some(handle) = tracer.pop_reported() {
            if let Some(node) = self.node_mut(handle)
                && node.color == Color::White
            {
                node.color = Color::Gray;
                tracer.push_gray(handle.index);
            }
        }
    }

    /// Reclaim every white node and reset survivors to white
    pub(crate) fn sweep(&mut self) -> (usize, usize) {
        let mut freed = 0;
        let mut bytes_freed = 0;
        let mut current = self.head;

        while let Some(index) = current {
            let Some(node) = self.linked_mut(index) else {
                break;
            };
            let next = node.next;
            if node.color.is_marked() {
                node.color = Color::White;
            } else if let Some(node) = self.unlink(index) {
                tracing::trace!(index, kind = ?node.value.kind(), "reclaim");
                bytes_freed += self.release(index, node);
                freed += 1;
            }
            current = next;
        }

        (freed, bytes_freed)
    }
}
