use crate::prelude::VulkanResult;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct MemoryRequirements {
    memory_type_bits: u32,
    size: u64,
    alignment: u64,
}

impl MemoryRequirements {
    pub fn new(memory_type_bits: u32, size: u64, alignment: u64) -> Self {
        Self {
            memory_type_bits,
            size,
            alignment,
        }
    }

    pub fn memory_type_bits(&self) -> u32 {
        self.memory_type_bits
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn alignment(&self) -> u64 {
        self.alignment
    }
}

impl From<ash::vk::MemoryRequirements> for MemoryRequirements {
    fn from(requirements: ash::vk::MemoryRequirements) -> Self {
        Self {
            memory_type_bits: requirements.memory_type_bits,
            size: requirements.size,
            alignment: requirements.alignment,
        }
    }
}

/// A resource that needs device memory before it can be used.
pub trait MemoryRequiring {
    fn memory_requirements(&self) -> MemoryRequirements;
}

/// A resource that can be bound to a committed range of device memory.
///
/// Binding is a one-shot operation on the device side: the caller is
/// expected to bind a resource at most once, to a range satisfying its own
/// [`MemoryRequiring::memory_requirements`].
pub trait MemoryBindable: MemoryRequiring {
    fn bind_memory(&self, memory: ash::vk::DeviceMemory, offset: u64) -> VulkanResult<()>;
}
