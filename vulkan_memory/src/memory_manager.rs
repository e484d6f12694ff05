use std::sync::Arc;

use crate::{
    device::MemoryDeviceTrait,
    memory_allocation::MemoryAllocation,
    memory_commit::MemoryCommit,
    memory_properties::{MemoryProperties, MemoryPropertyFlag, MemoryPropertyFlags},
    memory_requiring::{MemoryBindable, MemoryRequirements},
    prelude::{FrameworkError, VulkanError, VulkanResult},
    utils::aligned_size_u64,
};

/// Preferred size of a newly grown chunk; larger requests get a chunk of
/// their own size.
const DEFAULT_CHUNK_SIZE: u64 = 256 * 1024 * 1024;

/// Chunk sizes are rounded up to this granularity.
const CHUNK_GRANULARITY: u64 = 256;

/// Owns the set of chunks carved out of native device memory and serves
/// committed ranges from them.
///
/// Native allocations are few, large and expensive (each one holds a
/// driver-tracked handle and counts against the heap quota), while
/// resources are numerous and small; the manager amortizes the former into
/// chunks and hands out ranges from them, reclaiming and coalescing ranges
/// as commits drop.
pub struct MemoryManager {
    device: Arc<dyn MemoryDeviceTrait>,
    properties: MemoryProperties,
    allocations: Vec<Arc<MemoryAllocation>>,
    chunk_size: u64,
}

impl MemoryManager {
    pub fn new(device: Arc<dyn MemoryDeviceTrait>) -> Self {
        Self::with_chunk_size(device, DEFAULT_CHUNK_SIZE)
    }

    /// `chunk_size` is the preferred size of newly grown chunks.
    pub fn with_chunk_size(device: Arc<dyn MemoryDeviceTrait>, chunk_size: u64) -> Self {
        let properties = device.memory_properties();

        Self {
            device,
            properties,
            allocations: vec![],
            chunk_size: aligned_size_u64(chunk_size.max(CHUNK_GRANULARITY), CHUNK_GRANULARITY),
        }
    }

    pub fn memory_properties(&self) -> &MemoryProperties {
        &self.properties
    }

    /// Number of chunks allocated from the device so far.
    pub fn allocation_count(&self) -> usize {
        self.allocations.len()
    }

    /// Commits a range satisfying `requirements`.
    ///
    /// With `host_visible` the committed range is guaranteed to be mappable
    /// (host-visible and host-coherent memory); otherwise device-local
    /// memory is preferred, and silently given up when the compatibility
    /// mask offers none.
    pub fn commit(
        &mut self,
        requirements: &MemoryRequirements,
        host_visible: bool,
    ) -> VulkanResult<MemoryCommit> {
        let wanted = match host_visible {
            true => MemoryPropertyFlags::from_flags(&[
                MemoryPropertyFlag::HostVisible,
                MemoryPropertyFlag::HostCoherent,
            ]),
            false => MemoryPropertyFlags::from_flags(&[MemoryPropertyFlag::DeviceLocal]),
        };

        match self.try_commit(requirements, &wanted) {
            Err(VulkanError::Framework(FrameworkError::NoSuitableMemoryTypeFound))
                if !host_visible =>
            {
                // device-local is a preference, not a contract: retry once
                // against any type in the mask
                self.try_commit(requirements, &MemoryPropertyFlags::empty())
            }
            result => result,
        }
    }

    /// Commits memory required by `resource` and binds it.
    ///
    /// A bind failure releases the freshly reserved range before surfacing.
    pub fn commit_resource(
        &mut self,
        resource: &dyn MemoryBindable,
        host_visible: bool,
    ) -> VulkanResult<MemoryCommit> {
        let requirements = resource.memory_requirements();
        let commit = self.commit(&requirements, host_visible)?;

        if let Err(err) = resource.bind_memory(commit.memory_handle(), commit.offset()) {
            // the commit drops here, returning the range to its chunk
            return Err(FrameworkError::BindFail(Some(err.to_string())).into());
        }

        Ok(commit)
    }

    fn try_commit(
        &mut self,
        requirements: &MemoryRequirements,
        wanted: &MemoryPropertyFlags,
    ) -> VulkanResult<MemoryCommit> {
        for allocation in self.allocations.iter() {
            if !allocation.is_compatible(wanted, requirements.memory_type_bits()) {
                continue;
            }

            if let Some(range) =
                allocation.try_reserve(requirements.size(), requirements.alignment())
            {
                return Ok(MemoryCommit::new(allocation.clone(), range));
            }
        }

        self.grow(requirements, wanted)
    }

    /// Allocates a fresh chunk able to hold `requirements` and reserves
    /// from it.
    fn grow(
        &mut self,
        requirements: &MemoryRequirements,
        wanted: &MemoryPropertyFlags,
    ) -> VulkanResult<MemoryCommit> {
        let type_index = self
            .properties
            .find_type_index(requirements.memory_type_bits(), wanted)
            .ok_or(FrameworkError::NoSuitableMemoryTypeFound)?;
        let property_flags = self.properties.types()[type_index as usize].property_flags();

        let size = aligned_size_u64(
            requirements.size().max(self.chunk_size),
            CHUNK_GRANULARITY,
        );
        let allocation = MemoryAllocation::new(self.device.clone(), type_index, property_flags, size)?;

        // a fresh chunk sized for the request can still come up short when
        // alignment padding eats into it
        let range = allocation
            .try_reserve(requirements.size(), requirements.alignment())
            .ok_or(FrameworkError::MallocFail)?;

        self.allocations.push(allocation.clone());
        Ok(MemoryCommit::new(allocation, range))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::ptr::NonNull;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::Mutex;

    use ash::vk::Handle;

    use super::*;
    use crate::memory_properties::{MemoryHeapInfo, MemoryTypeInfo};
    use crate::memory_requiring::MemoryRequiring;

    const MIB: u64 = 1024 * 1024;

    fn device_local() -> MemoryPropertyFlags {
        MemoryPropertyFlags::from_flags(&[MemoryPropertyFlag::DeviceLocal])
    }

    fn host_visible_coherent() -> MemoryPropertyFlags {
        MemoryPropertyFlags::from_flags(&[
            MemoryPropertyFlag::HostVisible,
            MemoryPropertyFlag::HostCoherent,
        ])
    }

    /// Host-memory stand-in for the native allocation primitives.
    struct FakeDevice {
        properties: MemoryProperties,
        backing: Mutex<HashMap<u64, Box<[u8]>>>,
        next_handle: AtomicU64,
        allocations: Mutex<Vec<(u32, u64)>>,
        maps: Mutex<Vec<(u64, u64)>>,
        fail_allocations: AtomicBool,
    }

    impl FakeDevice {
        fn new(type_flags: &[MemoryPropertyFlags]) -> Arc<Self> {
            let types = type_flags
                .iter()
                .map(|flags| MemoryTypeInfo::new(*flags, 0))
                .collect();
            let heaps = vec![MemoryHeapInfo::new(256 * MIB, true)];

            Arc::new(Self {
                properties: MemoryProperties::new(types, heaps),
                backing: Mutex::new(HashMap::new()),
                next_handle: AtomicU64::new(1),
                allocations: Mutex::new(vec![]),
                maps: Mutex::new(vec![]),
                fail_allocations: AtomicBool::new(false),
            })
        }

        fn allocations_made(&self) -> Vec<(u32, u64)> {
            self.allocations.lock().unwrap().clone()
        }

        fn maps_made(&self) -> Vec<(u64, u64)> {
            self.maps.lock().unwrap().clone()
        }

        fn refuse_allocations(&self) {
            self.fail_allocations.store(true, Ordering::Relaxed);
        }
    }

    impl MemoryDeviceTrait for FakeDevice {
        fn memory_properties(&self) -> MemoryProperties {
            self.properties.clone()
        }

        fn allocate_memory(&self, type_index: u32, size: u64) -> VulkanResult<ash::vk::DeviceMemory> {
            if self.fail_allocations.load(Ordering::Relaxed) {
                return Err(VulkanError::Vulkan(-2, Some("no memory left".to_owned())));
            }

            let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
            self.backing
                .lock()
                .unwrap()
                .insert(handle, vec![0u8; size as usize].into_boxed_slice());
            self.allocations.lock().unwrap().push((type_index, size));

            Ok(ash::vk::DeviceMemory::from_raw(handle))
        }

        fn free_memory(&self, memory: ash::vk::DeviceMemory) {
            self.backing.lock().unwrap().remove(&memory.as_raw());
        }

        fn map_memory(
            &self,
            memory: ash::vk::DeviceMemory,
            offset: u64,
            size: u64,
        ) -> VulkanResult<NonNull<u8>> {
            let mut backing = self.backing.lock().unwrap();
            let bytes = backing
                .get_mut(&memory.as_raw())
                .ok_or(VulkanError::Vulkan(-1, Some("unknown memory".to_owned())))?;
            assert!(offset + size <= bytes.len() as u64);

            self.maps.lock().unwrap().push((offset, size));
            NonNull::new(unsafe { bytes.as_mut_ptr().add(offset as usize) })
                .ok_or_else(|| FrameworkError::MapMemoryError.into())
        }

        fn unmap_memory(&self, _memory: ash::vk::DeviceMemory) {}
    }

    struct FakeResource {
        requirements: MemoryRequirements,
        refuse_bind: bool,
        bound: Mutex<Option<(u64, u64)>>,
    }

    impl FakeResource {
        fn new(requirements: MemoryRequirements, refuse_bind: bool) -> Self {
            Self {
                requirements,
                refuse_bind,
                bound: Mutex::new(None),
            }
        }
    }

    impl MemoryRequiring for FakeResource {
        fn memory_requirements(&self) -> MemoryRequirements {
            self.requirements
        }
    }

    impl MemoryBindable for FakeResource {
        fn bind_memory(&self, memory: ash::vk::DeviceMemory, offset: u64) -> VulkanResult<()> {
            if self.refuse_bind {
                return Err(VulkanError::Vulkan(-1, Some("bind refused".to_owned())));
            }

            *self.bound.lock().unwrap() = Some((memory.as_raw(), offset));
            Ok(())
        }
    }

    #[test]
    fn single_type_commit_lands_in_a_default_sized_chunk() {
        let device = FakeDevice::new(&[device_local()]);
        let mut manager = MemoryManager::with_chunk_size(device.clone(), MIB);

        let commit = manager
            .commit(&MemoryRequirements::new(0b1, 1024, 256), false)
            .unwrap();

        assert_eq!(commit.offset(), 0);
        assert_eq!(commit.size(), 1024);
        assert_eq!(manager.allocation_count(), 1);
        assert_eq!(device.allocations_made(), vec![(0, MIB)]);
    }

    #[test]
    fn oversized_requests_get_a_chunk_of_their_own_size() {
        let device = FakeDevice::new(&[device_local()]);
        let mut manager = MemoryManager::with_chunk_size(device.clone(), 2048);

        let commit = manager
            .commit(&MemoryRequirements::new(0b1, 3000, 1), false)
            .unwrap();

        assert_eq!(commit.size(), 3000);
        // 3000 rounded up to the chunk granularity
        assert_eq!(device.allocations_made(), vec![(0, 3072)]);
    }

    #[test]
    fn exhausted_chunk_grows_a_new_one() {
        let device = FakeDevice::new(&[device_local()]);
        let mut manager = MemoryManager::with_chunk_size(device.clone(), 2048);

        let first = manager
            .commit(&MemoryRequirements::new(0b1, 1200, 1), false)
            .unwrap();
        assert_eq!((first.offset(), first.size()), (0, 1200));

        // 848 bytes left in the first chunk: the second request must not fit
        let second = manager
            .commit(&MemoryRequirements::new(0b1, 1200, 1), false)
            .unwrap();
        assert_eq!(second.offset(), 0);
        assert_eq!(manager.allocation_count(), 2);
        assert_eq!(device.allocations_made().len(), 2);
    }

    #[test]
    fn released_commits_are_reused_without_growing() {
        let device = FakeDevice::new(&[device_local()]);
        let mut manager = MemoryManager::with_chunk_size(device.clone(), 2048);

        let commit = manager
            .commit(&MemoryRequirements::new(0b1, 1024, 1), false)
            .unwrap();
        drop(commit);

        let reused = manager
            .commit(&MemoryRequirements::new(0b1, 1024, 1), false)
            .unwrap();
        assert_eq!(reused.offset(), 0);
        assert_eq!(manager.allocation_count(), 1);
    }

    #[test]
    fn adjacent_releases_coalesce_into_one_interval() {
        let device = FakeDevice::new(&[device_local()]);
        let mut manager = MemoryManager::with_chunk_size(device.clone(), 2048);

        let left = manager
            .commit(&MemoryRequirements::new(0b1, 1000, 1), false)
            .unwrap();
        let right = manager
            .commit(&MemoryRequirements::new(0b1, 1000, 1), false)
            .unwrap();
        drop(left);
        drop(right);

        // the combined hole must serve a request neither half could
        let combined = manager
            .commit(&MemoryRequirements::new(0b1, 2000, 1), false)
            .unwrap();
        assert_eq!(combined.offset(), 0);
        assert_eq!(manager.allocation_count(), 1);
    }

    #[test]
    fn device_local_wins_when_host_visibility_is_not_required() {
        let device = FakeDevice::new(&[device_local(), host_visible_coherent()]);
        let mut manager = MemoryManager::with_chunk_size(device.clone(), 2048);

        manager
            .commit(&MemoryRequirements::new(0b11, 256, 1), false)
            .unwrap();

        assert_eq!(device.allocations_made(), vec![(0, 2048)]);
    }

    #[test]
    fn host_visible_requests_skip_device_local_types() {
        let device = FakeDevice::new(&[device_local(), host_visible_coherent()]);
        let mut manager = MemoryManager::with_chunk_size(device.clone(), 2048);

        manager
            .commit(&MemoryRequirements::new(0b11, 256, 1), true)
            .unwrap();

        assert_eq!(device.allocations_made(), vec![(1, 2048)]);
    }

    #[test]
    fn device_local_preference_relaxes_to_any_type() {
        let device = FakeDevice::new(&[host_visible_coherent()]);
        let mut manager = MemoryManager::with_chunk_size(device.clone(), 2048);

        manager
            .commit(&MemoryRequirements::new(0b1, 256, 1), false)
            .unwrap();

        assert_eq!(device.allocations_made(), vec![(0, 2048)]);
    }

    #[test]
    fn host_visibility_is_a_hard_requirement() {
        let device = FakeDevice::new(&[device_local()]);
        let mut manager = MemoryManager::with_chunk_size(device, 2048);

        let result = manager.commit(&MemoryRequirements::new(0b1, 256, 1), true);

        assert_eq!(
            result.err(),
            Some(FrameworkError::NoSuitableMemoryTypeFound.into())
        );
    }

    #[test]
    fn type_mask_excludes_incompatible_types() {
        let device = FakeDevice::new(&[device_local(), device_local()]);
        let mut manager = MemoryManager::with_chunk_size(device.clone(), 2048);

        manager
            .commit(&MemoryRequirements::new(0b10, 256, 1), false)
            .unwrap();

        assert_eq!(device.allocations_made(), vec![(1, 2048)]);
    }

    #[test]
    fn refused_chunk_allocation_surfaces_out_of_device_memory() {
        let device = FakeDevice::new(&[device_local()]);
        let mut manager = MemoryManager::with_chunk_size(device.clone(), 2048);
        device.refuse_allocations();

        let result = manager.commit(&MemoryRequirements::new(0b1, 256, 1), false);

        // allocation failure must not trigger the relaxed retry
        assert_eq!(result.err(), Some(FrameworkError::OutOfDeviceMemory.into()));
    }

    #[test]
    fn chunk_mapping_is_exclusive_across_commits() {
        let device = FakeDevice::new(&[host_visible_coherent()]);
        let mut manager = MemoryManager::with_chunk_size(device, 4096);

        let first = manager
            .commit(&MemoryRequirements::new(0b1, 512, 1), true)
            .unwrap();
        let second = manager
            .commit(&MemoryRequirements::new(0b1, 512, 1), true)
            .unwrap();
        assert_eq!(first.memory_handle(), second.memory_handle());

        let view = first.map_whole().unwrap();
        assert_eq!(
            second.map_whole().err(),
            Some(FrameworkError::InvalidMapState.into())
        );
        // a second map on the mapped commit itself is rejected just the same
        assert_eq!(
            first.map(0, 16).err(),
            Some(FrameworkError::InvalidMapState.into())
        );

        view.release();
        second.map_whole().unwrap();
    }

    #[test]
    fn whole_commit_map_covers_exactly_its_range() {
        let device = FakeDevice::new(&[host_visible_coherent()]);
        let mut manager = MemoryManager::with_chunk_size(device.clone(), 2048);

        let _head = manager
            .commit(&MemoryRequirements::new(0b1, 100, 1), true)
            .unwrap();
        let commit = manager
            .commit(&MemoryRequirements::new(0b1, 400, 1), true)
            .unwrap();
        assert_eq!((commit.offset(), commit.size()), (100, 400));

        let view = commit.map_whole().unwrap();
        assert_eq!(view.len(), 400);
        drop(view);

        assert_eq!(device.maps_made(), vec![(100, 400)]);
    }

    #[test]
    fn partial_maps_are_offset_into_the_commit() {
        let device = FakeDevice::new(&[host_visible_coherent()]);
        let mut manager = MemoryManager::with_chunk_size(device.clone(), 2048);

        let commit = manager
            .commit(&MemoryRequirements::new(0b1, 512, 1), true)
            .unwrap();

        commit.map(64, 128).unwrap().release();
        // zero size maps the remainder from the offset
        commit.map(64, 0).unwrap().release();

        assert_eq!(device.maps_made(), vec![(64, 128), (64, 448)]);
    }

    #[test]
    fn out_of_range_maps_are_rejected() {
        let device = FakeDevice::new(&[host_visible_coherent()]);
        let mut manager = MemoryManager::with_chunk_size(device, 2048);

        let commit = manager
            .commit(&MemoryRequirements::new(0b1, 512, 1), true)
            .unwrap();

        assert!(commit.map(0, 513).is_err());
        assert!(commit.map(512, 0).is_err());
        assert!(commit.map(500, 13).is_err());

        // rejected maps must not poison the chunk's exclusive-map state
        commit.map_whole().unwrap();
    }

    #[test]
    fn mapped_writes_read_back() {
        let device = FakeDevice::new(&[host_visible_coherent()]);
        let mut manager = MemoryManager::with_chunk_size(device, 2048);

        let commit = manager
            .commit(&MemoryRequirements::new(0b1, 256, 1), true)
            .unwrap();

        {
            let mut view = commit.map_whole().unwrap();
            view.span_mut().fill(0x5a);
        }

        let view = commit.map_whole().unwrap();
        assert!(view.span().iter().all(|byte| *byte == 0x5a));
    }

    #[test]
    fn resources_are_bound_to_their_committed_range() {
        let device = FakeDevice::new(&[host_visible_coherent()]);
        let mut manager = MemoryManager::with_chunk_size(device, 2048);

        let _head = manager
            .commit(&MemoryRequirements::new(0b1, 100, 1), true)
            .unwrap();
        let resource = FakeResource::new(MemoryRequirements::new(0b1, 256, 4), false);

        let commit = manager.commit_resource(&resource, true).unwrap();

        let bound = resource.bound.lock().unwrap().unwrap();
        assert_eq!(bound, (commit.memory_handle().as_raw(), commit.offset()));
    }

    #[test]
    fn failed_binds_release_the_reserved_range() {
        let device = FakeDevice::new(&[host_visible_coherent()]);
        let mut manager = MemoryManager::with_chunk_size(device.clone(), 2048);

        let resource = FakeResource::new(MemoryRequirements::new(0b1, 512, 1), true);
        let result = manager.commit_resource(&resource, true);
        assert!(matches!(
            result.err(),
            Some(VulkanError::Framework(FrameworkError::BindFail(_)))
        ));

        // the reserved range must be free again: an equal request reuses it
        let commit = manager
            .commit(&MemoryRequirements::new(0b1, 512, 1), true)
            .unwrap();
        assert_eq!(commit.offset(), 0);
        assert_eq!(manager.allocation_count(), 1);
        assert_eq!(device.allocations_made().len(), 1);
    }
}
