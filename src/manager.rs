//! Collector manager and main API
//!
//! A [`Manager`] is one independent heap: it owns every value, the single
//! root, and the threshold that drives automatic collection. It is an
//! ordinary owned value threaded through every call, so several managers can
//! coexist without sharing state.

use crate::error::{GcError, Result};
use crate::handle::Handle;
use crate::heap::{CollectionStats, Heap};
use crate::options::GcOptions;
use crate::value::{Value, ValueKind};
use tracing::{debug, trace, warn};

/// Cumulative counters for one manager
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcStats {
    /// Collections of any kind
    pub collections: usize,
    /// Collections started because the heap outgrew the threshold
    pub threshold_collections: usize,
    /// Collections started because a raw allocation failed
    pub failure_collections: usize,
    pub objects_allocated: usize,
    pub objects_freed: usize,
}

/// Owner of a garbage collected heap
///
/// # Example
///
/// ```
/// use kehricht::Manager;
///
/// let mut manager = Manager::new();
/// let list = manager.allocate_array(2)?;
/// let number = manager.allocate_integer(42)?;
/// manager.set_element(list, 0, Some(number))?;
/// manager.set_root(Some(list));
///
/// let garbage = manager.allocate_string(b"unreachable")?;
/// manager.collect();
///
/// assert!(manager.is_live(number));
/// assert!(!manager.is_live(garbage));
/// # Ok::<(), kehricht::GcError>(())
/// ```
#[derive(Debug)]
pub struct Manager {
    heap: Heap,
    root: Option<Handle>,
    threshold: usize,
    options: GcOptions,
    /// Value registered but not yet fully built; kept alive by collections
    /// that run while its payload is being allocated.
    pending: Option<Handle>,
    stats: GcStats,
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

impl Manager {
    /// Create a manager with [`GcOptions::DEFAULT`]
    pub fn new() -> Self {
        Self::with_options(GcOptions::DEFAULT)
    }

    pub fn with_options(options: GcOptions) -> Self {
        debug!(
            threshold = options.initial_threshold,
            memory_limit = ?options.memory_limit,
            "init manager"
        );
        Self {
            heap: Heap::new(options.memory_limit),
            root: None,
            threshold: options.initial_threshold,
            options,
            pending: None,
            stats: GcStats::default(),
        }
    }

    /// Free every value and consume the manager
    pub fn destroy(self) {
        // teardown happens in Drop
    }

    /// Free every value and return to the freshly initialized state
    pub fn reset(&mut self) {
        self.teardown();
        self.threshold = self.options.initial_threshold;
        self.stats = GcStats::default();
    }

    fn teardown(&mut self) {
        let freed = self.heap.clear();
        debug!(freed, "teardown");
        self.root = None;
        self.pending = None;
        self.threshold = self.options.initial_threshold;
    }

    // -----------------------------------------------------------------------
    // Collection
    // -----------------------------------------------------------------------

    /// Run a full mark and sweep cycle
    ///
    /// Every value not reachable from the root through array slots is freed.
    /// Does not change the threshold.
    pub fn collect(&mut self) -> CollectionStats {
        debug!(live = self.heap.len(), root = ?self.root, "start collection");
        let roots = self.root.into_iter().chain(self.pending);
        let stats = self.heap.collect(roots);
        self.stats.collections += 1;
        self.stats.objects_freed += stats.freed;
        debug!(
            marked = stats.marked,
            freed = stats.freed,
            bytes_freed = stats.bytes_freed,
            "end collection"
        );
        stats
    }

    /// Collect if the heap has outgrown the threshold, then double it
    fn maybe_collect(&mut self) {
        if self.heap.len() > self.threshold {
            self.stats.threshold_collections += 1;
            self.collect();
            let next = self.threshold.saturating_mul(2);
            debug!(from = self.threshold, to = next, "grow threshold");
            self.threshold = next;
        }
    }

    /// Attempt a raw allocation, collecting and retrying once on failure
    fn allocate_raw<T>(&mut self, mut alloc: impl FnMut(&mut Heap) -> Result<T>) -> Result<T> {
        match alloc(&mut self.heap) {
            Ok(memory) => Ok(memory),
            // collecting cannot make an impossible size fit
            Err(err @ GcError::CapacityOverflow { .. }) => Err(err),
            Err(err) => {
                debug!(%err, "allocation failed, collecting before retry");
                self.stats.failure_collections += 1;
                self.collect();
                alloc(&mut self.heap).inspect_err(|err| warn!(%err, "allocation failed after collection"))
            }
        }
    }

    /// Register a new node holding `value`
    fn register(&mut self, value: Value) -> Result<Handle> {
        self.maybe_collect();
        self.allocate_raw(Heap::reserve_node)?;
        let handle = self.heap.append(value);
        self.stats.objects_allocated += 1;
        trace!(?handle, "register");
        Ok(handle)
    }

    /// Allocate the payload of an already registered node
    ///
    /// The node stays rooted while its payload is allocated. If the payload
    /// cannot be allocated the node is unregistered again.
    fn populate<T>(
        &mut self,
        handle: Handle,
        alloc: impl FnMut(&mut Heap) -> Result<T>,
        wrap: impl FnOnce(T) -> Value,
    ) -> Result<Handle> {
        self.pending = Some(handle);
        let payload = self.allocate_raw(alloc);
        self.pending = None;

        match payload {
            Ok(payload) => {
                self.heap.replace(handle, wrap(payload));
                Ok(handle)
            }
            Err(err) => {
                self.heap.remove(handle);
                self.stats.objects_freed += 1;
                Err(err)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    pub fn allocate_integer(&mut self, value: i32) -> Result<Handle> {
        self.register(Value::Integer(value))
    }

    pub fn allocate_float(&mut self, value: f64) -> Result<Handle> {
        self.register(Value::Float(value))
    }

    /// Allocate a string holding a copy of `bytes`
    pub fn allocate_string(&mut self, bytes: &[u8]) -> Result<Handle> {
        let handle = self.register(Value::String(Box::default()))?;
        self.populate(handle, |heap| heap.alloc_bytes(bytes), Value::String)
    }

    /// Allocate an array of `len` empty slots
    pub fn allocate_array(&mut self, len: usize) -> Result<Handle> {
        let handle = self.register(Value::Array(Box::default()))?;
        self.populate(handle, |heap| heap.alloc_empty_slots(len), Value::Array)
    }

    /// Allocate an array holding a copy of `elements`
    pub fn allocate_array_from(&mut self, elements: &[Option<Handle>]) -> Result<Handle> {
        let handle = self.register(Value::Array(Box::default()))?;
        self.populate(handle, |heap| heap.alloc_slots(elements), Value::Array)
    }

    // -----------------------------------------------------------------------
    // Graph access
    // -----------------------------------------------------------------------

    /// Designate the reachability root. Never triggers a collection.
    pub fn set_root(&mut self, root: Option<Handle>) {
        self.root = root;
    }

    pub fn root(&self) -> Option<Handle> {
        self.root
    }

    pub fn get(&self, handle: Handle) -> Option<&Value> {
        self.heap.get(handle)
    }

    pub fn kind(&self, handle: Handle) -> Option<ValueKind> {
        self.get(handle).map(Value::kind)
    }

    /// Whether `handle` still names a registered value
    pub fn is_live(&self, handle: Handle) -> bool {
        self.heap.contains(handle)
    }

    /// Read slot `index` of an array. `None` for stale handles, scalars,
    /// out-of-range indices and empty slots alike.
    pub fn element(&self, array: Handle, index: usize) -> Option<Handle> {
        self.get(array)?.as_array()?.get(index).copied().flatten()
    }

    /// Assign slot `index` of an array
    pub fn set_element(&mut self, array: Handle, index: usize, value: Option<Handle>) -> Result<()> {
        let slots = self
            .heap
            .get_mut(array)
            .ok_or(GcError::StaleHandle)?
            .as_array_mut()
            .ok_or(GcError::NotAnArray)?;
        let len = slots.len();
        let slot = slots
            .get_mut(index)
            .ok_or(GcError::IndexOutOfBounds { index, len })?;
        *slot = value;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    /// Number of registered values
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn bytes_allocated(&self) -> usize {
        self.heap.bytes_allocated()
    }

    /// Live count above which the next construction collects first
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn options(&self) -> &GcOptions {
        &self.options
    }

    pub fn stats(&self) -> &GcStats {
        &self.stats
    }

    /// Get reference to the underlying heap (for advanced use)
    pub fn heap(&self) -> &Heap {
        &self.heap
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        self.teardown();
    }
}
