//! Device-memory sub-allocation for vulkan resources.
//!
//! Native device-memory allocations are few, large and expensive: each one
//! pins a driver-tracked handle and counts against a hard device quota.
//! Resources, on the other hand, are numerous and small. The
//! [`memory_manager::MemoryManager`] amortizes native allocations into
//! chunks and hands out non-overlapping committed ranges from them;
//! a [`memory_commit::MemoryCommit`] returns its range to the owning chunk
//! when dropped, and offers scoped host access through a
//! [`memory_map::MemoryMap`].

pub use ash;

pub mod buffer;
pub mod device;
pub mod image;
pub mod instance;
pub mod memory_allocation;
pub mod memory_allocator;
pub mod memory_commit;
pub mod memory_manager;
pub mod memory_map;
pub mod memory_properties;
pub mod memory_requiring;
pub mod prelude;
pub mod utils;
