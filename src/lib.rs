//! Kehricht - A mark and sweep garbage collector for a small dynamic object model
//!
//! This library manages integers, floats, byte strings and fixed-length arrays
//! on a heap owned by a [`Manager`]. Values unreachable from the manager's
//! single root are reclaimed by a stop-the-world mark and sweep collection.
//!
//! # Features
//!
//! - **Handle-based graph**: arrays reference other values by [`Handle`], an
//!   arena index plus generation, so cycles are allowed and stale handles are
//!   detected instead of dangling
//! - **Tri-color marking**: marking uses an explicit gray work list, so deep or
//!   cyclic graphs never exhaust the call stack
//! - **Adaptive threshold**: construction collects once the live count exceeds
//!   the threshold, then doubles it
//! - **Allocation recovery**: a failed raw allocation collects and retries once
//!   before reporting [`GcError::AllocationFailure`]
//!
//! # Example
//!
//! ```
//! use kehricht::Manager;
//!
//! let mut manager = Manager::new();
//!
//! let root = manager.allocate_array(2)?;
//! let text = manager.allocate_string(b"Hello, GC!")?;
//! manager.set_element(root, 0, Some(text))?;
//! manager.set_element(root, 1, Some(root))?; // cycles are fine
//! manager.set_root(Some(root));
//!
//! let temp = manager.allocate_float(2.5)?;
//! let stats = manager.collect();
//!
//! assert_eq!(stats.freed, 1);
//! assert!(!manager.is_live(temp));
//! assert_eq!(manager.len(), 2);
//! # Ok::<(), kehricht::GcError>(())
//! ```

mod color;
mod error;
mod handle;
mod heap;
mod manager;
mod node;
mod options;
mod sync;
mod trace;
mod value;

pub use color::Color;
pub use error::{GcError, Result};
pub use handle::Handle;
pub use heap::{CollectionStats, Heap};
pub use manager::{GcStats, Manager};
pub use node::HeapNode;
pub use options::GcOptions;
pub use sync::SharedManager;
pub use value::{Value, ValueKind};
