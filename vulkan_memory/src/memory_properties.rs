#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MemoryPropertyFlag {
    DeviceLocal,
    HostVisible,
    HostCoherent,
    HostCached,
    LazilyAllocated,
    Protected,
}

/// Framework-managed mirror of `VkMemoryPropertyFlags`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryPropertyFlags {
    device_local: bool,
    host_visible: bool,
    host_coherent: bool,
    host_cached: bool,
    lazily_allocated: bool,
    protected: bool,
}

impl MemoryPropertyFlags {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_flags(flags: &[MemoryPropertyFlag]) -> Self {
        Self {
            device_local: flags.contains(&MemoryPropertyFlag::DeviceLocal),
            host_visible: flags.contains(&MemoryPropertyFlag::HostVisible),
            host_coherent: flags.contains(&MemoryPropertyFlag::HostCoherent),
            host_cached: flags.contains(&MemoryPropertyFlag::HostCached),
            lazily_allocated: flags.contains(&MemoryPropertyFlag::LazilyAllocated),
            protected: flags.contains(&MemoryPropertyFlag::Protected),
        }
    }

    pub fn device_local(&self) -> bool {
        self.device_local
    }

    pub fn host_visible(&self) -> bool {
        self.host_visible
    }

    pub fn host_coherent(&self) -> bool {
        self.host_coherent
    }

    /// Superset test: every property set in `wanted` is also set in `self`.
    pub fn contains(&self, wanted: &MemoryPropertyFlags) -> bool {
        (!wanted.device_local || self.device_local)
            && (!wanted.host_visible || self.host_visible)
            && (!wanted.host_coherent || self.host_coherent)
            && (!wanted.host_cached || self.host_cached)
            && (!wanted.lazily_allocated || self.lazily_allocated)
            && (!wanted.protected || self.protected)
    }

    pub fn ash_flags(&self) -> ash::vk::MemoryPropertyFlags {
        (match self.device_local {
            true => ash::vk::MemoryPropertyFlags::DEVICE_LOCAL,
            false => ash::vk::MemoryPropertyFlags::empty(),
        }) | (match self.host_visible {
            true => ash::vk::MemoryPropertyFlags::HOST_VISIBLE,
            false => ash::vk::MemoryPropertyFlags::empty(),
        }) | (match self.host_coherent {
            true => ash::vk::MemoryPropertyFlags::HOST_COHERENT,
            false => ash::vk::MemoryPropertyFlags::empty(),
        }) | (match self.host_cached {
            true => ash::vk::MemoryPropertyFlags::HOST_CACHED,
            false => ash::vk::MemoryPropertyFlags::empty(),
        }) | (match self.lazily_allocated {
            true => ash::vk::MemoryPropertyFlags::LAZILY_ALLOCATED,
            false => ash::vk::MemoryPropertyFlags::empty(),
        }) | (match self.protected {
            true => ash::vk::MemoryPropertyFlags::PROTECTED,
            false => ash::vk::MemoryPropertyFlags::empty(),
        })
    }
}

impl From<ash::vk::MemoryPropertyFlags> for MemoryPropertyFlags {
    fn from(flags: ash::vk::MemoryPropertyFlags) -> Self {
        Self {
            device_local: flags.contains(ash::vk::MemoryPropertyFlags::DEVICE_LOCAL),
            host_visible: flags.contains(ash::vk::MemoryPropertyFlags::HOST_VISIBLE),
            host_coherent: flags.contains(ash::vk::MemoryPropertyFlags::HOST_COHERENT),
            host_cached: flags.contains(ash::vk::MemoryPropertyFlags::HOST_CACHED),
            lazily_allocated: flags.contains(ash::vk::MemoryPropertyFlags::LAZILY_ALLOCATED),
            protected: flags.contains(ash::vk::MemoryPropertyFlags::PROTECTED),
        }
    }
}

/// One hardware memory type: its property flags and the heap backing it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MemoryTypeInfo {
    property_flags: MemoryPropertyFlags,
    heap_index: u32,
}

impl MemoryTypeInfo {
    pub fn new(property_flags: MemoryPropertyFlags, heap_index: u32) -> Self {
        Self {
            property_flags,
            heap_index,
        }
    }

    pub fn property_flags(&self) -> MemoryPropertyFlags {
        self.property_flags
    }

    pub fn heap_index(&self) -> u32 {
        self.heap_index
    }
}

/// A pool of device memory with a fixed capacity, backing one or more types.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MemoryHeapInfo {
    size: u64,
    device_local: bool,
}

impl MemoryHeapInfo {
    pub fn new(size: u64, device_local: bool) -> Self {
        Self { size, device_local }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn device_local(&self) -> bool {
        self.device_local
    }
}

/// The physical device memory table, queried once and immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoryProperties {
    types: Vec<MemoryTypeInfo>,
    heaps: Vec<MemoryHeapInfo>,
}

impl MemoryProperties {
    pub fn new(types: Vec<MemoryTypeInfo>, heaps: Vec<MemoryHeapInfo>) -> Self {
        Self { types, heaps }
    }

    pub fn types(&self) -> &[MemoryTypeInfo] {
        &self.types
    }

    pub fn heaps(&self) -> &[MemoryHeapInfo] {
        &self.heaps
    }

    /// First type whose bit is set in `type_mask` and whose flags cover
    /// `wanted`, in table order.
    pub(crate) fn find_type_index(
        &self,
        type_mask: u32,
        wanted: &MemoryPropertyFlags,
    ) -> Option<u32> {
        self.types.iter().enumerate().find_map(|(index, info)| {
            let type_bit = 1u32.checked_shl(index as u32)?;
            ((type_mask & type_bit) != 0 && info.property_flags().contains(wanted))
                .then_some(index as u32)
        })
    }
}

impl From<&ash::vk::PhysicalDeviceMemoryProperties> for MemoryProperties {
    fn from(properties: &ash::vk::PhysicalDeviceMemoryProperties) -> Self {
        let types = properties.memory_types[..properties.memory_type_count as usize]
            .iter()
            .map(|memory_type| {
                MemoryTypeInfo::new(
                    MemoryPropertyFlags::from(memory_type.property_flags),
                    memory_type.heap_index,
                )
            })
            .collect();

        let heaps = properties.memory_heaps[..properties.memory_heap_count as usize]
            .iter()
            .map(|heap| {
                MemoryHeapInfo::new(
                    heap.size,
                    heap.flags.contains(ash::vk::MemoryHeapFlags::DEVICE_LOCAL),
                )
            })
            .collect();

        Self { types, heaps }
    }
}
