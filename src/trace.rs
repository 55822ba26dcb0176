//! Trace trait for garbage collection
//!
//! Heap types that hold [`Handle`]s implement [`Trace`] so the mark phase can
//! find the edges of the object graph. Tracing only reports handles; deciding
//! whether a handle still names a live, unmarked value is the heap's job.

use crate::handle::Handle;
use crate::value::Value;

/// Collects edges discovered during the mark phase
///
/// Holds two work lists: handles reported by [`Trace`] implementations that
/// have not been checked yet, and arena indices already shaded gray that are
/// waiting to be scanned.
#[derive(Debug, Default)]
pub(crate) struct Tracer {
    reported: Vec<Handle>,
    gray: Vec<u32>,
}

impl Tracer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Report an edge to `handle`
    #[inline]
    pub(crate) fn mark(&mut self, handle: Handle) {
        self.reported.push(handle);
    }

    pub(crate) fn pop_reported(&mut self) -> Option<Handle> {
        self.reported.pop()
    }

    pub(crate) fn push_gray(&mut self, index: u32) {
        self.gray.push(index);
    }

    pub(crate) fn pop_gray(&mut self) -> Option<u32> {
        self.gray.pop()
    }
}

/// Trait for types that can contain references to heap values
pub(crate) trait Trace {
    /// Report every handle held by `self`
    fn trace(&self, tracer: &mut Tracer);
}

impl Trace for Handle {
    #[inline]
    fn trace(&self, tracer: &mut Tracer) {
        tracer.mark(*self);
    }
}

impl<T: Trace> Trace for Option<T> {
    #[inline]
    fn trace(&self, tracer: &mut Tracer) {
        if let Some(value) = self {
            value.trace(tracer);
        }
    }
}

impl<T: Trace> Trace for [T] {
    fn trace(&self, tracer: &mut Tracer) {
        for item in self {
            item.trace(tracer);
        }
    }
}

impl<T: Trace + ?Sized> Trace for Box<T> {
    #[inline]
    fn trace(&self, tracer: &mut Tracer) {
        T::trace(&**self, tracer);
    }
}

impl Trace for Value {
    fn trace(&self, tracer: &mut Tracer) {
        match self {
            // scalars have no edges
            Value::Integer(_) | Value::Float(_) | Value::String(_) => {}
            Value::Array(slots) => slots.trace(tracer),
        }
    }
}
