use std::sync::Arc;

use crate::{
    memory_allocation::MemoryAllocation,
    memory_allocator::MemoryRange,
    memory_map::MemoryMap,
    prelude::{FrameworkError, VulkanResult},
};

/// A reserved, non-overlapping byte range inside one chunk, handed to a
/// resource. Dropping the commit returns the range to the owning chunk,
/// where it merges with any adjacent free space.
pub struct MemoryCommit {
    allocation: Arc<MemoryAllocation>,
    range: MemoryRange,
}

impl Drop for MemoryCommit {
    fn drop(&mut self) {
        self.allocation.release(self.range);
    }
}

impl MemoryCommit {
    pub(crate) fn new(allocation: Arc<MemoryAllocation>, range: MemoryRange) -> Self {
        Self { allocation, range }
    }

    /// The native memory handle backing this commit.
    pub fn memory_handle(&self) -> ash::vk::DeviceMemory {
        self.allocation.ash_handle()
    }

    /// Start of the commit relative to its chunk.
    pub fn offset(&self) -> u64 {
        self.range.begin()
    }

    pub fn size(&self) -> u64 {
        self.range.size()
    }

    /// Maps `size` bytes of the commit starting at `offset`. A `size` of
    /// zero maps the remainder of the commit from `offset`.
    ///
    /// The underlying chunk admits one live mapping at a time, commits
    /// sharing it included: a second map anywhere on the chunk fails with
    /// `InvalidMapState` until the first [`MemoryMap`] is released. Mapping
    /// may block until the device is idle; keep it off latency-sensitive
    /// paths.
    pub fn map(&self, offset: u64, size: u64) -> VulkanResult<MemoryMap<'_>> {
        let length = match size {
            0 => self.size().checked_sub(offset).filter(|length| *length > 0),
            _ => offset
                .checked_add(size)
                .filter(|end| *end <= self.size())
                .map(|_| size),
        };

        let Some(length) = length else {
            return Err(FrameworkError::UserInput(Some(format!(
                "cannot map {size} bytes at offset {offset} of a {} bytes commit",
                self.size()
            )))
            .into());
        };

        let address = self
            .allocation
            .map_view(self.range.begin() + offset, length)?;

        Ok(MemoryMap::new(self, address, length as usize))
    }

    /// Maps the whole commit.
    pub fn map_whole(&self) -> VulkanResult<MemoryMap<'_>> {
        self.map(0, 0)
    }

    /// Releases the chunk view if one is open. Safe to call repeatedly.
    pub(crate) fn unmap(&self) {
        self.allocation.unmap_view()
    }
}
