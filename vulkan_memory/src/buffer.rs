use std::sync::Arc;

use smallvec::SmallVec;

use crate::{
    device::{Device, DeviceOwned},
    instance::InstanceOwned,
    memory_requiring::{MemoryBindable, MemoryRequirements, MemoryRequiring},
    prelude::{VulkanError, VulkanResult},
};

#[derive(Copy, Clone, PartialEq, Eq)]
pub enum BufferUsageFlag {
    TransferSrc,
    TransferDst,
    UniformTexelBuffer,
    StorageTexelBuffer,
    UniformBuffer,
    StorageBuffer,
    IndexBuffer,
    VertexBuffer,
    IndirectBuffer,
}

impl BufferUsageFlag {
    pub(crate) fn ash_flags(&self) -> ash::vk::BufferUsageFlags {
        match self {
            Self::TransferSrc => ash::vk::BufferUsageFlags::TRANSFER_SRC,
            Self::TransferDst => ash::vk::BufferUsageFlags::TRANSFER_DST,
            Self::UniformTexelBuffer => ash::vk::BufferUsageFlags::UNIFORM_TEXEL_BUFFER,
            Self::StorageTexelBuffer => ash::vk::BufferUsageFlags::STORAGE_TEXEL_BUFFER,
            Self::UniformBuffer => ash::vk::BufferUsageFlags::UNIFORM_BUFFER,
            Self::StorageBuffer => ash::vk::BufferUsageFlags::STORAGE_BUFFER,
            Self::IndexBuffer => ash::vk::BufferUsageFlags::INDEX_BUFFER,
            Self::VertexBuffer => ash::vk::BufferUsageFlags::VERTEX_BUFFER,
            Self::IndirectBuffer => ash::vk::BufferUsageFlags::INDIRECT_BUFFER,
        }
    }
}

/// Buffer usage as either framework-managed flags or a raw vulkan bitmask.
#[derive(Clone, PartialEq, Eq)]
pub enum BufferUsage {
    Managed(SmallVec<[BufferUsageFlag; 4]>),
    Unmanaged(u32),
}

impl BufferUsage {
    pub fn from_flags(flags: &[BufferUsageFlag]) -> Self {
        Self::Managed(flags.into())
    }

    pub fn from_raw(flags: u32) -> Self {
        Self::Unmanaged(flags)
    }

    pub(crate) fn ash_usage(&self) -> ash::vk::BufferUsageFlags {
        match self {
            Self::Managed(flags) => flags
                .iter()
                .fold(ash::vk::BufferUsageFlags::empty(), |usage, flag| {
                    usage | flag.ash_flags()
                }),
            Self::Unmanaged(raw) => ash::vk::BufferUsageFlags::from_raw(*raw),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ConcreteBufferDescriptor {
    usage: BufferUsage,
    size: ash::vk::DeviceSize,
}

impl ConcreteBufferDescriptor {
    pub fn new(usage: BufferUsage, size: u64) -> Self {
        Self {
            usage,
            size: size as ash::vk::DeviceSize,
        }
    }

    pub(crate) fn ash_size(&self) -> ash::vk::DeviceSize {
        self.size
    }

    pub(crate) fn ash_usage(&self) -> ash::vk::BufferUsageFlags {
        self.usage.ash_usage()
    }
}

pub struct Buffer {
    device: Arc<Device>,
    descriptor: ConcreteBufferDescriptor,
    buffer: ash::vk::Buffer,
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            self.device.ash_handle().destroy_buffer(
                self.buffer,
                self.device.get_parent_instance().get_alloc_callbacks(),
            )
        }
    }
}

impl DeviceOwned for Buffer {
    fn get_parent_device(&self) -> Arc<Device> {
        self.device.clone()
    }
}

impl Buffer {
    pub fn native_handle(&self) -> u64 {
        ash::vk::Handle::as_raw(self.buffer)
    }

    pub fn size(&self) -> u64 {
        self.descriptor.ash_size()
    }

    pub fn new(device: Arc<Device>, descriptor: ConcreteBufferDescriptor) -> VulkanResult<Self> {
        assert!(descriptor.ash_size() > 0);

        let create_info = ash::vk::BufferCreateInfo::default()
            .size(descriptor.ash_size())
            .usage(descriptor.ash_usage())
            .sharing_mode(ash::vk::SharingMode::EXCLUSIVE);

        let buffer = match unsafe {
            device.ash_handle().create_buffer(
                &create_info,
                device.get_parent_instance().get_alloc_callbacks(),
            )
        } {
            Ok(buffer) => buffer,
            Err(err) => {
                return Err(VulkanError::Vulkan(
                    err.as_raw(),
                    Some(format!("Error creating the buffer: {err}")),
                ))
            }
        };

        Ok(Self {
            device,
            descriptor,
            buffer,
        })
    }
}

impl MemoryRequiring for Buffer {
    fn memory_requirements(&self) -> MemoryRequirements {
        let requirements = unsafe {
            self.device
                .ash_handle()
                .get_buffer_memory_requirements(self.buffer)
        };

        MemoryRequirements::from(requirements)
    }
}

impl MemoryBindable for Buffer {
    fn bind_memory(&self, memory: ash::vk::DeviceMemory, offset: u64) -> VulkanResult<()> {
        unsafe {
            self.device
                .ash_handle()
                .bind_buffer_memory(self.buffer, memory, offset)
        }
        .map_err(|err| {
            VulkanError::Vulkan(
                err.as_raw(),
                Some(format!("Error binding the buffer to its memory: {err}")),
            )
        })
    }
}
