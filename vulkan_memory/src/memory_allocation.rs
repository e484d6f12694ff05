use std::ptr::NonNull;
use std::sync::{Arc, Mutex};

use crate::{
    device::MemoryDeviceTrait,
    memory_allocator::{MemoryRange, RangeAllocator},
    memory_properties::MemoryPropertyFlags,
    prelude::{FrameworkError, VulkanResult},
};

/// One native device-memory chunk plus its free-space tracker.
///
/// Chunks are grow-only: the manager never returns one to the device while
/// it lives. The native memory is freed when the last handle to the chunk
/// (manager or outstanding commit) drops.
pub struct MemoryAllocation {
    device: Arc<dyn MemoryDeviceTrait>,
    memory: ash::vk::DeviceMemory,
    type_index: u32,
    property_flags: MemoryPropertyFlags,
    size: u64,
    ranges: Mutex<RangeAllocator>,
    // the device permits a single outstanding host mapping for the whole
    // chunk, not one per commit
    mapped: Mutex<bool>,
}

impl Drop for MemoryAllocation {
    fn drop(&mut self) {
        self.device.free_memory(self.memory);
    }
}

impl MemoryAllocation {
    pub(crate) fn new(
        device: Arc<dyn MemoryDeviceTrait>,
        type_index: u32,
        property_flags: MemoryPropertyFlags,
        size: u64,
    ) -> VulkanResult<Arc<Self>> {
        let memory = match device.allocate_memory(type_index, size) {
            Ok(memory) => memory,
            Err(_err) => {
                #[cfg(debug_assertions)]
                println!(
                    "Error allocating a {size} bytes chunk on memory type {type_index}: {_err}"
                );

                return Err(FrameworkError::OutOfDeviceMemory.into());
            }
        };

        Ok(Arc::new(Self {
            device,
            memory,
            type_index,
            property_flags,
            size,
            ranges: Mutex::new(RangeAllocator::new(size)),
            mapped: Mutex::new(false),
        }))
    }

    pub(crate) fn ash_handle(&self) -> ash::vk::DeviceMemory {
        self.memory
    }

    pub fn type_index(&self) -> u32 {
        self.type_index
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// A chunk serves a request when its type bit is in the compatibility
    /// mask and its properties cover the wanted set.
    pub(crate) fn is_compatible(&self, wanted: &MemoryPropertyFlags, type_mask: u32) -> bool {
        let type_bit = match 1u32.checked_shl(self.type_index) {
            Some(bit) => bit,
            None => return false,
        };

        (type_mask & type_bit) != 0 && self.property_flags.contains(wanted)
    }

    pub(crate) fn try_reserve(&self, size: u64, alignment: u64) -> Option<MemoryRange> {
        self.ranges.lock().unwrap().try_reserve(size, alignment)
    }

    pub(crate) fn release(&self, range: MemoryRange) {
        self.ranges.lock().unwrap().release(range)
    }

    /// Opens the single host-visible view this chunk may have.
    ///
    /// `offset` is absolute within the chunk. Fails with `InvalidMapState`
    /// when any commit of this chunk already holds a live mapping.
    pub(crate) fn map_view(&self, offset: u64, size: u64) -> VulkanResult<NonNull<u8>> {
        let mut mapped = self.mapped.lock().unwrap();
        if *mapped {
            return Err(FrameworkError::InvalidMapState.into());
        }

        let address = self.device.map_memory(self.memory, offset, size)?;
        *mapped = true;
        Ok(address)
    }

    /// Closes the chunk view. A chunk with no live view is left untouched,
    /// so repeated unmaps are no-ops.
    pub(crate) fn unmap_view(&self) {
        let mut mapped = self.mapped.lock().unwrap();
        if *mapped {
            self.device.unmap_memory(self.memory);
            *mapped = false;
        }
    }
}
